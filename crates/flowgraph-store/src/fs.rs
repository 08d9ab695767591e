use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use crate::error::StoreError;
use crate::kv::KvStore;

const EXTENSION: &str = "kv";

/// Filesystem-based KV store.
///
/// Each key is one file under the root directory:
/// ```text
/// {root}/
/// ├── flow%3AInventory%20check.kv
/// └── flow%3Alinear.kv
/// ```
/// Characters outside `[A-Za-z0-9._~-]` are percent-encoded in file names.
pub struct FsKvStore {
  root: PathBuf,
}

impl FsKvStore {
  /// Create a store rooted at the given directory. The directory is created
  /// on first write.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.root.join(format!("{}.{}", encode_key(key), EXTENSION))
  }
}

fn encode_key(key: &str) -> String {
  urlencoding::encode(key).into_owned()
}

fn decode_key(encoded: &str) -> Result<String, std::string::FromUtf8Error> {
  urlencoding::decode(encoded).map(|key| key.into_owned())
}

#[async_trait]
impl KvStore for FsKvStore {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(self.path_for(key)).await {
      Ok(bytes) => Ok(Some(bytes)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
    fs::create_dir_all(&self.root).await?;

    // Write to a sibling file first so readers never see a partial value.
    let path = self.path_for(key);
    let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
    fs::write(&tmp, value).await?;
    fs::rename(&tmp, &path).await?;
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    match fs::remove_file(self.path_for(key)).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
    let mut entries = match fs::read_dir(&self.root).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(e.into()),
    };

    let mut keys = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
        continue;
      }
      let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        continue;
      };
      match decode_key(stem) {
        Ok(key) if key.starts_with(prefix) => keys.push(key),
        Ok(_) => {}
        Err(e) => warn!(file = %path.display(), error = %e, "skipping file with undecodable key"),
      }
    }
    keys.sort();
    Ok(keys)
  }
}
