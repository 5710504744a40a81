//! Device-type cache storage.
//!
//! Detection results are written once per host and read on every later
//! operation. The store is injected into the resolver so the backing
//! storage can be swapped: [`MemoryDeviceTypeStore`] keeps records in a
//! moka cache, [`JsonlDeviceTypeStore`] appends them to a JSON-lines file.
//! Neither evicts entries.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, trace, warn};
use moka::future::Cache;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::NetconfError;
use crate::family::DeviceFamily;

/// One cached detection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeviceTypeRecord {
    pub host: String,
    pub device_family: DeviceFamily,
}

impl DeviceTypeRecord {
    pub fn new(host: &str, device_family: DeviceFamily) -> Self {
        Self {
            host: host.to_string(),
            device_family,
        }
    }
}

/// Storage for detected device families.
#[async_trait]
pub trait DeviceTypeStore: Send + Sync {
    /// Cached family for `host`, if any.
    async fn fetch(&self, host: &str) -> Result<Option<DeviceFamily>, NetconfError>;

    /// Records a detection result.
    async fn insert(&self, record: DeviceTypeRecord) -> Result<(), NetconfError>;
}

/// In-memory store backed by a moka cache.
#[derive(Clone)]
pub struct MemoryDeviceTypeStore {
    cache: Cache<String, DeviceFamily>,
}

impl MemoryDeviceTypeStore {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }
}

impl Default for MemoryDeviceTypeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTypeStore for MemoryDeviceTypeStore {
    async fn fetch(&self, host: &str) -> Result<Option<DeviceFamily>, NetconfError> {
        let family = self.cache.get(host).await;
        if let Some(family) = family {
            debug!("Cache hit: {} is {}", host, family);
        }
        Ok(family)
    }

    async fn insert(&self, record: DeviceTypeRecord) -> Result<(), NetconfError> {
        self.cache.insert(record.host, record.device_family).await;
        Ok(())
    }
}

/// Append-only JSON-lines file store.
///
/// Each insert appends one record. On fetch the last record for a host wins.
/// A missing file reads as empty. Lines that do not decode, such as a torn
/// append or a family this build does not know, are skipped with a warning.
pub struct JsonlDeviceTypeStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlDeviceTypeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All readable records in file order.
    pub async fn records(&self) -> Result<Vec<DeviceTypeRecord>, NetconfError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DeviceTypeRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "{} line {}: skipping invalid device type record: {e}",
                    self.path.display(),
                    idx + 1
                ),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl DeviceTypeStore for JsonlDeviceTypeStore {
    async fn fetch(&self, host: &str) -> Result<Option<DeviceFamily>, NetconfError> {
        let family = self
            .records()
            .await?
            .into_iter()
            .rev()
            .find(|record| record.host == host)
            .map(|record| record.device_family);
        trace!("{} lookup for {}: {:?}", self.path.display(), host, family);
        Ok(family)
    }

    async fn insert(&self, record: DeviceTypeRecord) -> Result<(), NetconfError> {
        let mut line = serde_json::to_string(&record).map_err(|e| {
            NetconfError::InternalServerError(format!("device type record encode error: {e}"))
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;
        // Terminate a torn last line so this record stays on its own line.
        if file.metadata().await?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                line.insert(0, '\n');
            }
        }
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
