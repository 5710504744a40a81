//! Device families and the capability table used to detect them.
//!
//! Each family has one [`FamilyProfile`] row holding everything the crate
//! dispatches on: the capability signature that identifies it, the presence
//! key path that proves an interface lookup found something, and the payload
//! templates used to talk to it. Supporting another family means adding a
//! variant and a row.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::NetconfError;
use crate::render::{IOSXR_TEMPLATES, NEXUS_TEMPLATES, PayloadTemplates};

/// Vendor/platform family selecting templates and validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    /// Cisco IOS-XR, native `Cisco-IOS-XR-ifmgr-cfg` model.
    Iosxr,
    /// Cisco NX-OS, OpenConfig interfaces model.
    Nexus,
    /// Cisco IOS-XE. Detected, but no payload templates yet.
    Iosxe,
}

/// Static description of one device family.
#[derive(Debug, Clone, Copy)]
pub struct FamilyProfile {
    pub family: DeviceFamily,
    pub vendor: &'static str,
    pub platform: &'static str,
    /// Substring of an advertised capability identifying this family.
    pub signature: &'static str,
    /// Path from the document root to the key that must be non-empty.
    pub presence_path: &'static [&'static str],
    pub templates: Option<&'static PayloadTemplates>,
}

/// One row of the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityEntry {
    pub family: DeviceFamily,
    pub signature: &'static str,
}

const IOSXR_PROFILE: FamilyProfile = FamilyProfile {
    family: DeviceFamily::Iosxr,
    vendor: "Cisco",
    platform: "IOS-XR",
    signature: "http://cisco.com/ns/yang/Cisco-IOS-XR",
    presence_path: &["data", "interface-configurations"],
    templates: Some(&IOSXR_TEMPLATES),
};

const NEXUS_PROFILE: FamilyProfile = FamilyProfile {
    family: DeviceFamily::Nexus,
    vendor: "Cisco",
    platform: "NX-OS",
    signature: "http://cisco.com/ns/yang/cisco-nx-os-device",
    presence_path: &["data", "interfaces", "interface"],
    templates: Some(&NEXUS_TEMPLATES),
};

const IOSXE_PROFILE: FamilyProfile = FamilyProfile {
    family: DeviceFamily::Iosxe,
    vendor: "Cisco",
    platform: "IOS-XE",
    signature: "http://cisco.com/ns/yang/Cisco-IOS-XE",
    presence_path: &["data", "native", "interface"],
    templates: None,
};

/// Capability signatures in match order. First match wins.
pub static CAPABILITY_TABLE: &[CapabilityEntry] = &[
    CapabilityEntry {
        family: DeviceFamily::Iosxr,
        signature: IOSXR_PROFILE.signature,
    },
    CapabilityEntry {
        family: DeviceFamily::Nexus,
        signature: NEXUS_PROFILE.signature,
    },
    CapabilityEntry {
        family: DeviceFamily::Iosxe,
        signature: IOSXE_PROFILE.signature,
    },
];

impl DeviceFamily {
    pub const ALL: &'static [DeviceFamily] =
        &[DeviceFamily::Iosxr, DeviceFamily::Nexus, DeviceFamily::Iosxe];

    /// Returns the profile row for this family.
    pub fn profile(self) -> &'static FamilyProfile {
        match self {
            DeviceFamily::Iosxr => &IOSXR_PROFILE,
            DeviceFamily::Nexus => &NEXUS_PROFILE,
            DeviceFamily::Iosxe => &IOSXE_PROFILE,
        }
    }

    /// Device tag understood by the device (e.g. `iosxr`).
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceFamily::Iosxr => "iosxr",
            DeviceFamily::Nexus => "nexus",
            DeviceFamily::Iosxe => "iosxe",
        }
    }

    pub fn presence_path(self) -> &'static [&'static str] {
        self.profile().presence_path
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceFamily {
    type Err = NetconfError;

    /// Parses a family tag (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        DeviceFamily::ALL
            .iter()
            .copied()
            .find(|family| family.as_str() == key)
            .ok_or_else(|| NetconfError::InvalidParameter(format!("unknown device family {s}")))
    }
}

/// Walks `table` in order and returns the first family whose signature is a
/// substring of any advertised capability.
pub fn match_capabilities<S: AsRef<str>>(
    table: &[CapabilityEntry],
    capabilities: &[S],
) -> Option<DeviceFamily> {
    table
        .iter()
        .find(|entry| {
            capabilities
                .iter()
                .any(|cap| cap.as_ref().contains(entry.signature))
        })
        .map(|entry| entry.family)
}
