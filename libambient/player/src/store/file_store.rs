use std::fs::create_dir_all;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyre::{Context, Result};
use serde_json::Value;

use super::{KeyValueStore, StoreError};

/// Keeps each key in its own JSON file inside a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn try_new() -> Result<Self, StoreError> {
        let proj_dirs =
            directories::ProjectDirs::from("", "", "ambient").ok_or(StoreError::NoHomeDir)?;
        Self::new_from_path(proj_dirs.data_dir())
    }

    pub fn new_from_path<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let dir_string = dir.to_string_lossy().to_string();
        if dir.exists() && !dir.is_dir() {
            return Err(StoreError::NotADirectory(dir_string));
        }
        create_dir_all(dir).map_err(|e| StoreError::DirCreationFailed(dir_string, e))?;

        Ok(Self {
            dir: dir.to_owned(),
        })
    }

    // Reversible, so distinct keys never share a file
    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn put(&self, key: &str, value: Value) -> Result<()> {
        let path = self.key_path(key);
        let temp_path = path.with_extension("json.tmp");
        let contents = serde_json::to_vec(&value).wrap_err("Error serializing value")?;

        tokio::fs::write(&temp_path, contents)
            .await
            .wrap_err_with(|| format!("Error writing to {temp_path:?}"))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .wrap_err_with(|| format!("Error replacing {path:?}"))
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).wrap_err_with(|| format!("Error reading {path:?}")),
        };
        let value = serde_json::from_slice(&contents)
            .wrap_err_with(|| format!("{path:?} does not contain valid JSON"))?;
        Ok(Some(value))
    }
}
