// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem Durable Store
//!
//! One file per key under a root directory. Keys are flattened into a single
//! percent-encoded file name so prefix listing is a directory scan.
//!
//! Writes go to a hidden temp file in the same directory and are renamed into
//! place, so a reader sees either the old value or the new one.
//!
//! **Limitations:**
//! - Single node only (files live on the local machine)
//! - No fsync of the parent directory after rename
//! - Encoded file names are capped at [`MAX_FILE_NAME`] bytes; longer keys
//!   are rejected with `StorageError::InvalidKey`

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::storage::{DurableStore, StorageError, StorageKey};

/// Common `NAME_MAX` across Linux, macOS and Windows filesystems.
pub const MAX_FILE_NAME: usize = 255;

pub struct LocalDurableStore {
    root: PathBuf,
}

impl LocalDurableStore {
    /// Create the store, creating `root` if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::Backend(format!(
                "Failed to create storage root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &StorageKey) -> Result<PathBuf, StorageError> {
        let rendered = key.render();
        let name = encode_key(&rendered);
        if name.len() > MAX_FILE_NAME {
            return Err(StorageError::InvalidKey(format!(
                "'{}' encodes to {} bytes, over the {} byte file name limit",
                rendered,
                name.len(),
                MAX_FILE_NAME
            )));
        }
        Ok(self.root.join(name))
    }
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl DurableStore for LocalDurableStore {
    async fn put(&self, key: &StorageKey, value: Vec<u8>) -> Result<(), StorageError> {
        let target = self.path_for(key)?;
        let tmp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));

        tokio::fs::write(&tmp, &value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn get(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(self.path_for(key)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut keys = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = decode_key(name) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
