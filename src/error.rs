//! Error types for NETCONF sessions, device detection and interface management.
//!
//! Every failure is returned to the immediate caller; nothing is retried.
//! [`NetconfError::kind`] collapses the variants into the small taxonomy an
//! HTTP-facing layer needs to pick a status code.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::Operation;

/// Errors that can occur while detecting devices and managing interfaces.
#[derive(Error, Debug)]
pub enum NetconfError {
    /// The named credential is not configured in the environment.
    #[error("invalid credential {0}: username or password not configured")]
    InvalidCredential(String),

    /// Capability negotiation matched no known device family.
    #[error("could not determine a device type for host {0}")]
    UnknownDeviceType(String),

    /// No payload template exists for this device family and operation.
    #[error("device type {family} does not support {operation}")]
    UnsupportedDeviceType { family: String, operation: String },

    /// A rendering parameter is missing or malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The decoded response lacks the presence key of its device family.
    ///
    /// Interface lookups also use this to signal that the interface does not
    /// exist on the device.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The existence precondition of a create or delete failed.
    #[error("cannot edit: {0}")]
    CannotEdit(String),

    /// Session, framing or commit failure.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The device answered an RPC with an `<rpc-error>`.
    #[error("rpc error {tag}: {message}")]
    RpcError { tag: String, message: String },

    /// Connect or RPC exchange did not finish in time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// A recorded session did not contain the requested exchange.
    #[error("replay mismatch: {0}")]
    ReplayMismatch(String),

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2Error(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    RusshError(#[from] russh::Error),

    /// Malformed XML received from the device.
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Local storage I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    InternalServerError(String),
}

/// Coarse classification of [`NetconfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidCredential,
    UnknownDeviceType,
    /// Rendering failed: unsupported family or bad parameters.
    Configuration,
    InvalidData,
    CannotEdit,
    Protocol,
    Internal,
}

impl NetconfError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetconfError::InvalidCredential(_) => ErrorKind::InvalidCredential,
            NetconfError::UnknownDeviceType(_) => ErrorKind::UnknownDeviceType,
            NetconfError::UnsupportedDeviceType { .. } | NetconfError::InvalidParameter(_) => {
                ErrorKind::Configuration
            }
            NetconfError::InvalidData(_) => ErrorKind::InvalidData,
            NetconfError::CannotEdit(_) => ErrorKind::CannotEdit,
            NetconfError::Protocol(_)
            | NetconfError::RpcError { .. }
            | NetconfError::Timeout(_)
            | NetconfError::ReplayMismatch(_)
            | NetconfError::Ssh2Error(_)
            | NetconfError::RusshError(_)
            | NetconfError::Xml(_) => ErrorKind::Protocol,
            NetconfError::Io(_) | NetconfError::InternalServerError(_) => ErrorKind::Internal,
        }
    }

    /// Returns true for transport, session and commit failures.
    pub fn is_protocol(&self) -> bool {
        self.kind() == ErrorKind::Protocol
    }

    /// Suggested HTTP status code for this error raised by `operation`.
    ///
    /// A missing interface is 404. A create conflict is 409 and a delete of
    /// a missing interface is 404. Bad credential references are client
    /// errors; everything else is a server error.
    pub fn http_status(&self, operation: Operation) -> u16 {
        match self.kind() {
            ErrorKind::InvalidData if operation == Operation::GetOne => 404,
            ErrorKind::CannotEdit => match operation {
                Operation::Delete => 404,
                _ => 409,
            },
            ErrorKind::InvalidCredential => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_classify_as_protocol() {
        let err = NetconfError::Timeout(Duration::from_secs(30));
        assert!(err.is_protocol());
        let err = NetconfError::RpcError {
            tag: "in-use".to_string(),
            message: "candidate locked".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn unsupported_device_type_is_configuration_error() {
        let err = NetconfError::UnsupportedDeviceType {
            family: "iosxe".to_string(),
            operation: "create".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.is_protocol());
    }

    #[test]
    fn cannot_edit_status_depends_on_operation() {
        let err = NetconfError::CannotEdit("Interface vlan1 already exists".to_string());
        assert_eq!(err.http_status(Operation::Create), 409);
        assert_eq!(err.http_status(Operation::Delete), 404);
    }

    #[test]
    fn missing_interface_maps_to_not_found_only_for_get_one() {
        let err = NetconfError::InvalidData("no interface-configurations".to_string());
        assert_eq!(err.http_status(Operation::GetOne), 404);
        assert_eq!(err.http_status(Operation::GetAll), 500);
    }
}
