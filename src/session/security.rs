use super::*;

/// Security level used for SSH algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum SecurityLevel {
    /// Strict modern algorithms (default).
    #[default]
    Secure,
    /// Maximum compatibility with legacy devices.
    LegacyCompatible,
}

/// Connection security options for SSH establishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSecurityOptions {
    /// SSH algorithm policy.
    pub level: SecurityLevel,
    /// Server host key verification method.
    pub server_check: ServerCheckMethod,
}

impl Default for ConnectionSecurityOptions {
    fn default() -> Self {
        Self::secure_default()
    }
}

impl ConnectionSecurityOptions {
    /// Modern algorithms, host key checked against `~/.ssh/known_hosts`.
    pub fn secure_default() -> Self {
        Self {
            level: SecurityLevel::Secure,
            server_check: ServerCheckMethod::DefaultKnownHostsFile,
        }
    }

    /// Legacy compatibility profile for older devices.
    pub fn legacy_compatible() -> Self {
        Self {
            level: SecurityLevel::LegacyCompatible,
            server_check: ServerCheckMethod::NoCheck,
        }
    }

    /// Options for one connection: algorithms from `level`, host key
    /// checking from the connection's `verify_host_key` flag.
    pub fn for_params(level: SecurityLevel, params: &ConnectionParams) -> Self {
        let server_check = if params.verify_host_key {
            ServerCheckMethod::DefaultKnownHostsFile
        } else {
            ServerCheckMethod::NoCheck
        };
        Self {
            level,
            server_check,
        }
    }

    pub(super) fn preferred(&self) -> Preferred {
        match self.level {
            SecurityLevel::Secure => Preferred {
                kex: Cow::Borrowed(config::SECURE_KEX_ORDER),
                key: Cow::Borrowed(config::SECURE_KEY_TYPES),
                cipher: Cow::Borrowed(config::SECURE_CIPHERS),
                mac: Cow::Borrowed(config::SECURE_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityLevel::LegacyCompatible => Preferred {
                kex: Cow::Borrowed(config::LEGACY_KEX_ORDER),
                key: Cow::Borrowed(config::LEGACY_KEY_TYPES),
                cipher: Cow::Borrowed(config::LEGACY_CIPHERS),
                mac: Cow::Borrowed(config::LEGACY_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionSecurityOptions, SecurityLevel};
    use crate::config::ConnectionDefaults;
    use crate::credentials::Credentials;
    use crate::device::ConnectionParams;
    use async_ssh2_tokio::ServerCheckMethod;
    use russh::{cipher, kex, mac};

    fn params(verify_host_key: bool) -> ConnectionParams {
        let defaults = ConnectionDefaults {
            verify_host_key,
            ..ConnectionDefaults::default()
        };
        ConnectionParams::new("r1", &Credentials::new("admin", "secret"), &defaults, None)
    }

    #[test]
    fn default_security_options_are_secure() {
        let options = ConnectionSecurityOptions::default();
        assert_eq!(options.level, SecurityLevel::Secure);
        assert!(matches!(
            options.server_check,
            ServerCheckMethod::DefaultKnownHostsFile
        ));
    }

    #[test]
    fn host_key_check_follows_connection_params() {
        let options = ConnectionSecurityOptions::for_params(SecurityLevel::Secure, &params(false));
        assert!(matches!(options.server_check, ServerCheckMethod::NoCheck));

        let options = ConnectionSecurityOptions::for_params(
            SecurityLevel::LegacyCompatible,
            &params(true),
        );
        assert_eq!(options.level, SecurityLevel::LegacyCompatible);
        assert!(matches!(
            options.server_check,
            ServerCheckMethod::DefaultKnownHostsFile
        ));
    }

    #[test]
    fn secure_profile_excludes_weak_algorithms() {
        let preferred = ConnectionSecurityOptions::secure_default().preferred();

        assert!(preferred.kex.iter().all(|alg| *alg != kex::DH_G1_SHA1));
        assert!(preferred.cipher.iter().all(|alg| *alg != cipher::AES_128_CBC));
        assert!(preferred.mac.iter().all(|alg| *alg != mac::HMAC_SHA1));
    }

    #[test]
    fn legacy_profile_keeps_sha1_and_cbc() {
        let preferred = ConnectionSecurityOptions::legacy_compatible().preferred();

        assert!(preferred.kex.contains(&kex::DH_G1_SHA1));
        assert!(preferred.cipher.contains(&cipher::AES_256_CBC));
        assert!(preferred.mac.contains(&mac::HMAC_SHA1));
    }
}
