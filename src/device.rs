//! Device descriptors and the connection parameters derived from them.

use std::fmt;
use std::time::Duration;

use crate::config::{ConnectionDefaults, GENERIC_DEVICE_TAG};
use crate::credentials::{CredentialSource, Credentials};
use crate::error::NetconfError;
use crate::family::DeviceFamily;
use crate::resolver::DeviceTypeResolver;

/// Everything needed to open a NETCONF session to one host.
///
/// Built from a [`Device`] (or, during detection, from a bare host) plus the
/// resolved credentials. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
    pub verify_host_key: bool,
    pub use_known_keys: bool,
    /// `None` while the family is still being detected.
    pub device_family: Option<DeviceFamily>,
}

impl ConnectionParams {
    pub fn new(
        host: &str,
        credentials: &Credentials,
        defaults: &ConnectionDefaults,
        device_family: Option<DeviceFamily>,
    ) -> Self {
        Self {
            host: host.to_string(),
            port: defaults.port,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            timeout_seconds: defaults.timeout_secs,
            verify_host_key: defaults.verify_host_key,
            use_known_keys: defaults.use_known_keys,
            device_family,
        }
    }

    /// Device tag sent with the session: the family, or `default`.
    pub fn device_tag(&self) -> &'static str {
        self.device_family
            .map(DeviceFamily::as_str)
            .unwrap_or(GENERIC_DEVICE_TAG)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// `user@host:port`, used in logs and recordings.
    pub fn device_addr(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("verify_host_key", &self.verify_host_key)
            .field("use_known_keys", &self.use_known_keys)
            .field("device_family", &self.device_family)
            .finish()
    }
}

/// A device addressed by one inbound operation.
///
/// The family is fixed at construction, either detected through a
/// [`DeviceTypeResolver`] or supplied by the caller.
#[derive(Debug, Clone)]
pub struct Device {
    host: String,
    credential_ref: String,
    device_family: DeviceFamily,
    params: ConnectionParams,
}

impl Device {
    /// Resolves credentials and the device family, then builds the device.
    pub async fn resolve(
        host: &str,
        credential_ref: &str,
        credentials: &dyn CredentialSource,
        resolver: &DeviceTypeResolver,
    ) -> Result<Self, NetconfError> {
        let creds = credentials.resolve_credentials(credential_ref)?;
        let family = resolver.resolve(host, &creds).await?;
        Ok(Self::with_family(
            host,
            credential_ref,
            family,
            &creds,
            resolver.defaults(),
        ))
    }

    /// Builds a device whose family is already known.
    pub fn with_family(
        host: &str,
        credential_ref: &str,
        device_family: DeviceFamily,
        credentials: &Credentials,
        defaults: &ConnectionDefaults,
    ) -> Self {
        Self {
            host: host.to_string(),
            credential_ref: credential_ref.to_string(),
            device_family,
            params: ConnectionParams::new(host, credentials, defaults, Some(device_family)),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn credential_ref(&self) -> &str {
        &self.credential_ref
    }

    pub fn device_family(&self) -> DeviceFamily {
        self.device_family
    }

    pub fn connection_params(&self) -> &ConnectionParams {
        &self.params
    }
}
