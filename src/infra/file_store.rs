//! Directory-backed [`KvStore`].
//!
//! Each key is one file named by the SHA-256 digest of the key, so cache keys
//! of any length (`dashboard?end=...&start=...`) map to fixed-length portable
//! file names. The file holds the original key next to the value so `keys()`
//! can list it.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::{KvStore, StoreError};
use crate::util::lock;

const SOURCE: &str = "infra::file_store";
const ITEM_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";
const DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, Deserialize)]
struct StoredItem {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct StoredItemRef<'a> {
    key: &'a str,
    value: &'a str,
}

/// Filesystem-backed key-value store with an optional quota on total value
/// bytes.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    quota_bytes: Option<u64>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open storage rooted at `root`, creating the directory if necessary.
    pub fn open(root: impl Into<PathBuf>, quota_bytes: Option<u64>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            quota_bytes,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.root.join(item_file_name(key))
    }

    /// Stored items in the directory, skipping anything this store did not
    /// write.
    fn items(&self) -> Result<Vec<StoredItem>, StoreError> {
        let mut items = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !is_item_file(&path) {
                continue;
            }
            if let Some(item) = read_item(&path)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    fn used_bytes(&self) -> Result<u64, StoreError> {
        Ok(self
            .items()?
            .iter()
            .map(|item| item.value.len() as u64)
            .sum())
    }
}

pub(crate) fn item_file_name(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    format!("{}.{ITEM_EXTENSION}", hex::encode(&digest[..]))
}

fn is_item_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ITEM_EXTENSION)
        && path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| {
                stem.len() == DIGEST_HEX_LEN && stem.bytes().all(|b| b.is_ascii_hexdigit())
            })
}

/// `None` when the file is missing or is not one of ours.
fn read_item(path: &Path) -> Result<Option<StoredItem>, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    match serde_json::from_str::<StoredItem>(&contents) {
        Ok(item) => Ok(Some(item)),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Ignoring unreadable store file");
            Ok(None)
        }
    }
}

impl KvStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(read_item(&self.item_path(key))?
            .filter(|item| item.key == key)
            .map(|item| item.value))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = lock::lock(&self.write_lock, SOURCE, "set_item");
        let path = self.item_path(key);

        if let Some(quota) = self.quota_bytes {
            let used = self.used_bytes()?;
            let replaced = read_item(&path)?.map_or(0, |item| item.value.len() as u64);
            let needed = value.len() as u64;
            let available = quota.saturating_sub(used.saturating_sub(replaced));
            if needed > available {
                return Err(StoreError::QuotaExceeded { needed, available });
            }
        }

        let contents = serde_json::to_string(&StoredItemRef { key, value })
            .map_err(|err| StoreError::unavailable(format!("failed to encode item: {err}")))?;
        let temp = path.with_extension(TEMP_EXTENSION);
        fs::write(&temp, contents)?;
        if let Err(err) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }
        debug!(key, bytes = value.len(), "Stored item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let _guard = lock::lock(&self.write_lock, SOURCE, "remove_item");
        match fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.items()?.into_iter().map(|item| item.key).collect();
        keys.sort();
        Ok(keys)
    }
}
