use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::StorageConfig;
use crate::error::StorageError;

/// Highest numeric suffix tried before giving up on a name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Names and writes every artifact a job produces.
#[derive(Debug, Clone)]
pub struct ArtifactStorage {
    config: StorageConfig,
}

impl ArtifactStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Creates every storage directory.
    pub fn prepare(&self) -> Result<(), StorageError> {
        for dir in [
            &self.config.originals,
            &self.config.intermediate,
            &self.config.finals,
            &self.config.captions,
            &self.config.metadata,
        ] {
            ensure_directory(dir)?;
        }
        Ok(())
    }

    pub fn cut_path(&self, job_id: i64) -> PathBuf {
        self.config
            .intermediate
            .join(format!("job_{}_cut.mp4", job_id))
    }

    pub fn formatted_path(&self, job_id: i64) -> PathBuf {
        self.config
            .intermediate
            .join(format!("job_{}_formatted.mp4", job_id))
    }

    pub fn captioned_path(&self, job_id: i64) -> PathBuf {
        self.config
            .intermediate
            .join(format!("job_{}_captioned.mp4", job_id))
    }

    pub fn caption_file(&self, job_id: i64) -> PathBuf {
        self.config
            .captions
            .join(format!("job_{}_captions.json", job_id))
    }

    pub fn metadata_file(&self, job_id: i64) -> PathBuf {
        self.config
            .metadata
            .join(format!("job_{}_metadata.json", job_id))
    }

    pub fn final_path(&self, job_id: i64) -> PathBuf {
        self.config.finals.join(format!("job_{}_final.mp4", job_id))
    }

    /// Copies an inbox file into the originals directory under a name that
    /// does not clash with an existing file: `clip.mp4`, then `clip_1.mp4`,
    /// `clip_2.mp4` and so on.
    pub fn store_original(&self, source: &Path) -> Result<PathBuf, StorageError> {
        if !source.is_file() {
            return Err(StorageError::SourceMissing(source.to_path_buf()));
        }
        ensure_directory(&self.config.originals)?;

        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string());

        let (target, mut file) = create_unique(&self.config.originals, &filename)?;
        let copied = File::open(source).and_then(|mut reader| std::io::copy(&mut reader, &mut file));
        if let Err(e) = copied {
            // Do not leave an empty placeholder behind.
            let _ = std::fs::remove_file(&target);
            return Err(StorageError::CopyFile {
                from: source.to_path_buf(),
                to: target,
                source: e,
            });
        }

        Ok(target)
    }

    /// Serializes `value` as pretty JSON to `path`, creating its directory.
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            ensure_directory(parent)?;
        }
        let body = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, body).map_err(|e| StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

pub(crate) fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Creates a new file in `dir` with `filename` or the first free numbered
/// variant of it. `create_new` makes the check-and-create atomic.
fn create_unique(dir: &Path, filename: &str) -> Result<(PathBuf, File), StorageError> {
    let (base, ext) = match filename.rfind('.') {
        Some(dot) if dot > 0 => (&filename[..dot], Some(&filename[dot..])),
        _ => (filename, None),
    };

    for counter in 0..=MAX_NAME_ATTEMPTS {
        let candidate = match (counter, ext) {
            (0, _) => filename.to_string(),
            (n, Some(ext)) => format!("{}_{}{}", base, n, ext),
            (n, None) => format!("{}_{}", base, n),
        };
        let path = dir.join(&candidate);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(StorageError::WriteFile { path, source: e });
            }
        }
    }

    Err(StorageError::FileExists(dir.join(filename)))
}

/// Writes `content` to a file, replacing what was there.
pub(crate) fn write_bytes(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    let mut file = File::create(path).map_err(|e| StorageError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    file.write_all(content).map_err(|e| StorageError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}
