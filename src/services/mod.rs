// src/services/mod.rs
pub mod background_remover;
pub mod image_processor;
pub mod metadata;
pub mod pipeline;
pub mod storage;
pub mod validator;

pub use pipeline::IntakePipeline;
