//! NVS (Non-Volatile Storage) adapter, in-memory backend.
//!
//! Implements [`StoragePort`] for the simulator and the tests; the
//! on-device flash backend implements the same trait.  Entries are kept
//! per `(namespace, key)` pair.
//!
//! An optional byte budget makes the partition fill up like real flash,
//! so the flight log's `StorageError::Full` path can be exercised.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::app::ports::{StorageError, StoragePort};

type EntryKey = (String, String);

pub struct NvsAdapter {
    entries: BTreeMap<EntryKey, Vec<u8>>,
    /// Sum of all stored value lengths.
    used: usize,
    capacity: Option<usize>,
}

impl NvsAdapter {
    pub fn new() -> Self {
        info!("NvsAdapter: simulation backend");
        Self {
            entries: BTreeMap::new(),
            used: 0,
            capacity: None,
        }
    }

    /// A partition that holds at most `bytes` of values in total.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            capacity: Some(bytes),
            ..Self::new()
        }
    }

    fn entry_key(namespace: &str, key: &str) -> EntryKey {
        (namespace.to_owned(), key.to_owned())
    }

    /// Bytes in use, if `key` were replaced by a value of `new_len`.
    fn used_after_write(&self, key: &EntryKey, new_len: usize) -> usize {
        let old_len = self.entries.get(key).map_or(0, Vec::len);
        self.used - old_len + new_len
    }

    /// Bytes currently stored across every namespace.
    pub fn used_bytes(&self) -> usize {
        self.used
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let value = self
            .entries
            .get(&Self::entry_key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        if value.len() > buf.len() {
            return Err(StorageError::IoError);
        }
        buf[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let entry = Self::entry_key(namespace, key);
        let used = self.used_after_write(&entry, data.len());
        if self.capacity.is_some_and(|cap| used > cap) {
            debug!("NvsAdapter: {}/{} rejected, would use {} bytes", namespace, key, used);
            return Err(StorageError::Full);
        }
        self.entries.insert(entry, data.to_vec());
        self.used = used;
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        if let Some(old) = self.entries.remove(&Self::entry_key(namespace, key)) {
            self.used -= old.len();
        }
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.entries.contains_key(&Self::entry_key(namespace, key))
    }

    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        let before = self.entries.len();
        self.entries.retain(|(ns, _), _| ns != namespace);
        self.used = self.entries.values().map(Vec::len).sum();
        info!(
            "NvsAdapter: erased {} key(s) in '{}'",
            before - self.entries.len(),
            namespace
        );
        Ok(())
    }
}
