// src/config.rs
use anyhow::{Context, bail};
use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10_485_760;
pub const DEFAULT_ALLOWED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
pub const DEFAULT_REMOVE_BG_URL: &str = "https://api.remove.bg/v1.0/removebg";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload: UploadConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Public storage directory; everything in it is served under `public_path`.
    pub dir: PathBuf,
    pub public_path: String,
    /// Scratch space for provider input, never served.
    pub temp_dir: PathBuf,
    pub max_size: usize,
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public/uploads"),
            public_path: "/uploads".to_string(),
            temp_dir: std::env::temp_dir(),
            max_size: DEFAULT_MAX_UPLOAD_SIZE,
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    RemoveBg,
    Mock,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub api_url: String,
    pub mock_delay_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests can feed a map
    /// instead of mutating the process environment.
    pub fn from_source<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = UploadConfig::default();

        let port = match lookup("APP_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid APP_PORT: {}", raw))?,
            None => 8080,
        };

        let max_size = match lookup("APP_MAX_UPLOAD_SIZE") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid APP_MAX_UPLOAD_SIZE: {}", raw))?,
            None => defaults.max_size,
        };

        let allowed_types = match lookup("APP_ALLOWED_TYPES") {
            Some(raw) => {
                let types: Vec<String> = raw
                    .split(',')
                    .map(|t| t.trim().to_ascii_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect();
                if types.is_empty() {
                    bail!("APP_ALLOWED_TYPES must list at least one MIME type");
                }
                types
            }
            None => defaults.allowed_types,
        };

        let kind = match lookup("APP_BG_PROVIDER").as_deref() {
            None | Some("removebg") => ProviderKind::RemoveBg,
            Some("mock") => ProviderKind::Mock,
            Some(other) => bail!("Unknown APP_BG_PROVIDER: {}", other),
        };

        let api_key = lookup("REMOVE_BG_API_KEY").filter(|k| !k.is_empty());
        if kind == ProviderKind::RemoveBg && api_key.is_none() {
            bail!("REMOVE_BG_API_KEY must be set when APP_BG_PROVIDER is removebg");
        }

        let mock_delay_ms = match lookup("APP_MOCK_DELAY_MS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid APP_MOCK_DELAY_MS: {}", raw))?,
            None => 2000,
        };

        Ok(AppConfig {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            upload: UploadConfig {
                dir: lookup("APP_UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.dir),
                public_path: lookup("APP_PUBLIC_PATH").unwrap_or(defaults.public_path),
                temp_dir: lookup("APP_TEMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.temp_dir),
                max_size,
                allowed_types,
            },
            provider: ProviderConfig {
                kind,
                api_key,
                api_url: lookup("REMOVE_BG_API_URL")
                    .unwrap_or_else(|| DEFAULT_REMOVE_BG_URL.to_string()),
                mock_delay_ms,
            },
        })
    }
}
