//! Credential lookup.
//!
//! A credential reference such as `DEFAULT` names a pair of environment
//! variables, `DEFAULT_USERNAME` and `DEFAULT_PASSWORD`. The lookup sits
//! behind [`CredentialSource`] so embedders and tests can supply their own.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::NetconfError;

/// Valid credential references: they become part of variable names.
static CREDENTIAL_REF: Lazy<Regex> = Lazy::new(|| match Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$") {
    Ok(re) => re,
    Err(err) => panic!("invalid CREDENTIAL_REF regex: {err}"),
});

/// Credential references accepted at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CredentialType {
    #[default]
    Default,
    Nexus,
}

impl CredentialType {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialType::Default => "DEFAULT",
            CredentialType::Nexus => "NEXUS",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialType {
    type Err = NetconfError;

    /// Parses a reference name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(CredentialType::Default),
            "NEXUS" => Ok(CredentialType::Nexus),
            _ => Err(NetconfError::InvalidCredential(s.to_string())),
        }
    }
}

/// Username and password for one device login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolves a credential reference to a username and password.
pub trait CredentialSource: Send + Sync {
    fn resolve_credentials(&self, credential_ref: &str) -> Result<Credentials, NetconfError>;
}

/// Reads `<REF>_USERNAME` and `<REF>_PASSWORD` from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    /// Variable names for a credential reference.
    pub fn variable_names(credential_ref: &str) -> (String, String) {
        let prefix = credential_ref.to_ascii_uppercase();
        (format!("{prefix}_USERNAME"), format!("{prefix}_PASSWORD"))
    }
}

impl CredentialSource for EnvCredentials {
    fn resolve_credentials(&self, credential_ref: &str) -> Result<Credentials, NetconfError> {
        if !CREDENTIAL_REF.is_match(credential_ref) {
            return Err(NetconfError::InvalidCredential(credential_ref.to_string()));
        }
        let (user_var, pass_var) = Self::variable_names(credential_ref);
        let username = std::env::var(&user_var)
            .map_err(|_| NetconfError::InvalidCredential(credential_ref.to_string()))?;
        let password = std::env::var(&pass_var)
            .map_err(|_| NetconfError::InvalidCredential(credential_ref.to_string()))?;
        Ok(Credentials { username, password })
    }
}

/// Fixed in-memory credentials, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: HashMap<String, Credentials>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, credential_ref: &str, credentials: Credentials) -> Self {
        self.entries
            .insert(credential_ref.to_ascii_uppercase(), credentials);
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn resolve_credentials(&self, credential_ref: &str) -> Result<Credentials, NetconfError> {
        self.entries
            .get(&credential_ref.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| NetconfError::InvalidCredential(credential_ref.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_names_are_upper_cased() {
        let (user, pass) = EnvCredentials::variable_names("nexus");
        assert_eq!(user, "NEXUS_USERNAME");
        assert_eq!(pass, "NEXUS_PASSWORD");
    }

    #[test]
    fn missing_environment_is_invalid_credential() {
        let err = EnvCredentials
            .resolve_credentials("RNETCONF_TEST_UNSET_REF")
            .expect_err("variables are not set");
        assert!(matches!(err, NetconfError::InvalidCredential(_)));
    }

    #[test]
    fn malformed_reference_is_rejected() {
        let err = EnvCredentials
            .resolve_credentials("bad ref=")
            .expect_err("not a variable name");
        assert!(matches!(err, NetconfError::InvalidCredential(_)));
    }

    #[test]
    fn static_credentials_resolve_case_insensitively() {
        let source = StaticCredentials::new().with("default", Credentials::new("admin", "secret"));
        let creds = source.resolve_credentials("DEFAULT").expect("resolve");
        assert_eq!(creds.username, "admin");
        assert!(source.resolve_credentials("NEXUS").is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", Credentials::new("admin", "hunter2"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn credential_type_uses_upper_case_names() {
        let json = serde_json::to_string(&CredentialType::Nexus).expect("encode");
        assert_eq!(json, "\"NEXUS\"");
        assert_eq!(CredentialType::default().as_str(), "DEFAULT");
    }

    #[test]
    fn credential_type_parses_known_references() {
        assert_eq!("nexus".parse::<CredentialType>().expect("parse"), CredentialType::Nexus);
        assert_eq!(" DEFAULT ".parse::<CredentialType>().expect("parse"), CredentialType::Default);
        let err = "LAB".parse::<CredentialType>().expect_err("unknown reference");
        assert_eq!(err.http_status(crate::render::Operation::GetOne), 400);
    }
}
