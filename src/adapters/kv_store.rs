//! Key-value storage adapters.
//!
//! Implements [`StoragePort`] twice and [`ConfigPort`] once on top of any
//! storage backend:
//!
//! | Type              | Implements  | Backing                          |
//! |-------------------|-------------|----------------------------------|
//! | `MemoryStorage`   | StoragePort | `RefCell<HashMap>` (tests)       |
//! | `FileStorage`     | StoragePort | one file per key under a dir     |
//! | `KvConfigStore<S>`| ConfigPort  | postcard blob in any StoragePort |
//!
//! - Config validation: every field is range-checked before persistence
//!   and again after loading.
//! - Namespace isolation: each subsystem uses its own namespace.
//! - Atomic writes: `FileStorage` writes a temp file and renames it over
//!   the target.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::ControllerConfig;

const CONFIG_NAMESPACE: &str = "tankguard";
const CONFIG_KEY: &str = "ctlcfg";
const MAX_BLOB_SIZE: usize = 512;

// ───────────────────────────────────────────────────────────────
// In-memory backend
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStorage {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

impl StoragePort for MemoryStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let store = self.store.borrow();
        let data = store
            .get(&Self::composite_key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        if data.len() > buf.len() {
            return Err(StorageError::BufferTooSmall);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store
            .borrow()
            .contains_key(&Self::composite_key(namespace, key))
    }
}

// ───────────────────────────────────────────────────────────────
// File backend
// ───────────────────────────────────────────────────────────────

/// Stores each value in `<root>/<namespace>/<key>.bin`.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Use `root` as the data directory, creating it if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            warn!("FileStorage: cannot create {}: {}", root.display(), e);
            StorageError::IoError
        })?;
        info!("FileStorage: data directory {}", root.display());
        Ok(Self { root })
    }

    fn path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{}.bin", key))
    }
}

fn io_error(e: std::io::Error) -> StorageError {
    match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound,
        ErrorKind::StorageFull => StorageError::Full,
        _ => StorageError::IoError,
    }
}

impl StoragePort for FileStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = fs::read(self.path(namespace, key)).map_err(io_error)?;
        if data.len() > buf.len() {
            return Err(StorageError::BufferTooSmall);
        }
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path(namespace, key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_error)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data).map_err(io_error)?;
        fs::rename(&tmp, &path).map_err(io_error)?;
        debug!("FileStorage: wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(namespace, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.path(namespace, key).is_file()
    }
}

// ───────────────────────────────────────────────────────────────
// Config store
// ───────────────────────────────────────────────────────────────

/// [`ConfigPort`] that keeps the config as a postcard blob.
pub struct KvConfigStore<S: StoragePort> {
    storage: S,
}

impl<S: StoragePort> KvConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Remove the stored config (next boot installs defaults).
    pub fn erase(&self) -> Result<(), ConfigError> {
        self.storage.delete(CONFIG_NAMESPACE, CONFIG_KEY)?;
        info!("KvConfigStore: config erased");
        Ok(())
    }
}

impl<S: StoragePort> ConfigPort for KvConfigStore<S> {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let len = self.storage.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf)?;
        let cfg: ControllerConfig =
            postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("KvConfigStore: loaded config ({} bytes)", len);
        Ok(cfg)
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }
        self.storage.write(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)?;
        info!("KvConfigStore: saved config ({} bytes)", bytes.len());
        Ok(())
    }
}
