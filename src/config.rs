//! NETCONF protocol constants, per-session defaults and SSH algorithm lists.
//!
//! The algorithm lists come in two profiles: a secure one used by default and
//! a legacy one that keeps every algorithm russh can negotiate, for older
//! devices that only speak SHA-1 key exchange or CBC ciphers.

use russh::keys::{Algorithm, EcdsaCurve, HashAlg};
use russh::{cipher, compression, kex, mac};
use serde::{Deserialize, Serialize};

/// IANA port for NETCONF over SSH.
pub const DEFAULT_PORT: u16 = 830;

/// Connect and per-RPC timeout applied when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// SSH subsystem carrying NETCONF.
pub const NETCONF_SUBSYSTEM: &str = "netconf";

/// NETCONF base namespace.
pub const NETCONF_BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Capability for end-of-message framing.
pub const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";

/// Capability for chunked framing.
pub const BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";

/// Capabilities this client advertises in its hello.
pub const CLIENT_CAPABILITIES: &[&str] = &[BASE_1_0, BASE_1_1];

/// Delimiter terminating a base:1.0 message.
pub const END_OF_MESSAGE: &[u8] = b"]]>]]>";

/// Device-family tag used before the real family is known.
pub const GENERIC_DEVICE_TAG: &str = "default";

/// Per-session connection defaults.
///
/// Applied to every [`ConnectionParams`](crate::device::ConnectionParams)
/// built for a device. Host-key verification and key-file lookup are off by
/// default, matching how lab and sandbox devices are usually reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionDefaults {
    pub port: u16,
    pub timeout_secs: u64,
    pub verify_host_key: bool,
    pub use_known_keys: bool,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_host_key: false,
            use_known_keys: false,
        }
    }
}

/// Modern key exchange algorithms only.
pub const SECURE_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
];

/// AEAD and CTR ciphers.
pub const SECURE_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
];

pub const SECURE_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
];

pub const SECURE_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
];

/// Every key exchange algorithm, including SHA-1 Diffie-Hellman groups.
pub const LEGACY_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::DH_GEX_SHA1,
    kex::DH_GEX_SHA256,
    kex::DH_G1_SHA1,
    kex::DH_G14_SHA1,
    kex::DH_G14_SHA256,
    kex::DH_G15_SHA512,
    kex::DH_G16_SHA512,
    kex::DH_G17_SHA512,
    kex::DH_G18_SHA512,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
];

/// Every cipher, including CBC modes.
pub const LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::AES_128_CTR,
    cipher::AES_192_CTR,
    cipher::AES_256_CTR,
    cipher::AES_256_GCM,
    cipher::AES_128_CBC,
    cipher::AES_192_CBC,
    cipher::AES_256_CBC,
    cipher::CHACHA20_POLY1305,
];

pub const LEGACY_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA1,
    mac::HMAC_SHA256,
    mac::HMAC_SHA512,
    mac::HMAC_SHA1_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512_ETM,
];

pub const LEGACY_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Dsa,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Ed25519,
    Algorithm::Rsa { hash: None },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
];

pub const DEFAULT_COMPRESSION_ALGORITHMS: &[compression::Name] = &[
    compression::NONE,
    compression::ZLIB,
    compression::ZLIB_LEGACY,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_netconf_port_and_thirty_second_timeout() {
        let defaults = ConnectionDefaults::default();
        assert_eq!(defaults.port, 830);
        assert_eq!(defaults.timeout_secs, 30);
        assert!(!defaults.verify_host_key);
        assert!(!defaults.use_known_keys);
    }

    #[test]
    fn partial_defaults_fill_missing_fields() {
        let defaults: ConnectionDefaults =
            serde_json::from_str(r#"{"timeout_secs": 10}"#).expect("parse defaults");
        assert_eq!(defaults.timeout_secs, 10);
        assert_eq!(defaults.port, DEFAULT_PORT);
    }
}
