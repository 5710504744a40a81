//! Device-family detection with a per-host cache.
//!
//! A cache hit costs no session. A miss opens one session with the generic
//! device tag, matches the advertised capabilities against the capability
//! table, records the result and closes the session.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::ConnectionDefaults;
use crate::credentials::Credentials;
use crate::device::ConnectionParams;
use crate::error::NetconfError;
use crate::family::{CAPABILITY_TABLE, CapabilityEntry, DeviceFamily, match_capabilities};
use crate::session::{Connector, ProtocolSession};
use crate::store::{DeviceTypeRecord, DeviceTypeStore};

/// Resolves the device family of a host.
#[derive(Clone)]
pub struct DeviceTypeResolver {
    store: Arc<dyn DeviceTypeStore>,
    connector: Arc<dyn Connector>,
    table: &'static [CapabilityEntry],
    defaults: ConnectionDefaults,
}

impl DeviceTypeResolver {
    pub fn new(store: Arc<dyn DeviceTypeStore>, connector: Arc<dyn Connector>) -> Self {
        Self {
            store,
            connector,
            table: CAPABILITY_TABLE,
            defaults: ConnectionDefaults::default(),
        }
    }

    /// Replaces the capability table. Entries are matched in order.
    pub fn with_capability_table(mut self, table: &'static [CapabilityEntry]) -> Self {
        self.table = table;
        self
    }

    pub fn with_defaults(mut self, defaults: ConnectionDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Connection defaults applied to detection and to resolved devices.
    pub fn defaults(&self) -> &ConnectionDefaults {
        &self.defaults
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    /// Returns the cached family for `host`, detecting it on a miss.
    ///
    /// A store read failure is treated as a miss. A store write failure is
    /// logged and the detected family is still returned.
    pub async fn resolve(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<DeviceFamily, NetconfError> {
        match self.store.fetch(host).await {
            Ok(Some(family)) => return Ok(family),
            Ok(None) => debug!("No cached device type for {host}"),
            Err(err) => warn!("Device type store read failed for {host}: {err}"),
        }

        let family = self.detect(host, credentials).await?;
        let profile = family.profile();
        info!(
            "Detected device type {family} ({} {}) for {host}",
            profile.vendor, profile.platform
        );
        if let Err(err) = self
            .store
            .insert(DeviceTypeRecord::new(host, family))
            .await
        {
            warn!("Failed to cache device type for {host}: {err}");
        }
        Ok(family)
    }

    /// Opens a session with the generic device tag and matches capabilities.
    pub async fn detect(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<DeviceFamily, NetconfError> {
        let params = ConnectionParams::new(host, credentials, &self.defaults, None);
        let session = ProtocolSession::open(self.connector.as_ref(), &params).await?;
        let matched = match_capabilities(self.table, session.capabilities())
            .ok_or_else(|| NetconfError::UnknownDeviceType(host.to_string()));
        session.finish(matched).await
    }
}
