// src/services/storage.rs
use crate::errors::IntakeError;
use crate::models::StoredImage;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

// Upper bound on timestamp bumps when a name is already taken.
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// Flat, write-once image directory served to clients under `public_path`.
pub struct ImageStore {
    dir: PathBuf,
    public_path: String,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_path: public_path.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), IntakeError> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            IntakeError::Storage(format!(
                "Failed to create upload directory {}: {}",
                self.dir.display(),
                e
            ))
        })
    }

    /// Writes `data` as `<prefix>-<unix millis>.<extension>`. Existing files are
    /// never overwritten; a taken name moves the timestamp forward instead.
    pub async fn persist(
        &self,
        prefix: &str,
        extension: &str,
        data: &[u8],
    ) -> Result<StoredImage, IntakeError> {
        self.ensure_dir().await?;

        let timestamp = Utc::now().timestamp_millis();
        for offset in 0..MAX_NAME_ATTEMPTS {
            let id = format!("{}-{}.{}", prefix, timestamp + offset, extension);
            let path = self.dir.join(&id);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(IntakeError::Storage(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )));
                }
            };

            file.write_all(data).await.map_err(|e| {
                IntakeError::Storage(format!("Failed to write {}: {}", path.display(), e))
            })?;
            file.flush().await.map_err(|e| {
                IntakeError::Storage(format!("Failed to flush {}: {}", path.display(), e))
            })?;

            log::debug!("Stored {} ({} bytes)", path.display(), data.len());

            return Ok(StoredImage {
                url: self.url_for(&id),
                id,
                path,
            });
        }

        Err(IntakeError::Storage(format!(
            "No free file name for prefix '{}' near timestamp {}",
            prefix, timestamp
        )))
    }

    /// Resolves a stored identifier to an existing file inside the directory.
    /// Anything other than a single plain file name never resolves.
    pub async fn locate(&self, id: &str) -> Result<(PathBuf, std::fs::Metadata), IntakeError> {
        let mut components = Path::new(id).components();
        let is_plain_name = !id.contains('\0')
            && !id.ends_with('/')
            && matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            );
        if !is_plain_name {
            return Err(IntakeError::NotFound(id.to_string()));
        }

        let path = self.dir.join(id);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok((path, meta)),
            Ok(_) => Err(IntakeError::NotFound(id.to_string())),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::NotFound
                        | ErrorKind::InvalidInput
                        | ErrorKind::NotADirectory
                        | ErrorKind::InvalidFilename
                ) =>
            {
                Err(IntakeError::NotFound(id.to_string()))
            }
            Err(e) => Err(IntakeError::Storage(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn url_for(&self, id: &str) -> String {
        format!("{}/{}", self.public_path.trim_end_matches('/'), id)
    }
}
