//! Protocol payload rendering.
//!
//! A [`RequestRenderer`] turns `(device family, operation, parameters)` into
//! the XML handed to the device: a `<filter>` for reads and a `<config>` for
//! edits. The built-in [`TemplateRenderer`] fills `{name}` placeholders in
//! the templates attached to each family's profile. Every interpolated
//! value is XML-escaped.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::NetconfError;
use crate::family::DeviceFamily;

/// Matches `{name}` placeholders in payload templates.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| match Regex::new(r"\{([a-z_]+)\}") {
    Ok(re) => re,
    Err(err) => panic!("invalid PLACEHOLDER regex: {err}"),
});

/// Interface operations a payload can be rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    GetOne,
    GetAll,
    Create,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GetOne => "get_one",
            Operation::GetAll => "get_all",
            Operation::Create => "create",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One template per operation for a device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadTemplates {
    pub get_one: &'static str,
    pub get_all: &'static str,
    pub create: &'static str,
    pub delete: &'static str,
}

impl PayloadTemplates {
    pub fn get(&self, operation: Operation) -> &'static str {
        match operation {
            Operation::GetOne => self.get_one,
            Operation::GetAll => self.get_all,
            Operation::Create => self.create,
            Operation::Delete => self.delete,
        }
    }

    /// True if the template for `operation` has a `{name}` placeholder.
    pub fn uses(&self, operation: Operation, name: &str) -> bool {
        PLACEHOLDER
            .captures_iter(self.get(operation))
            .any(|caps| &caps[1] == name)
    }
}

/// Named string parameters for a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderParams(BTreeMap<String, String>);

impl RenderParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters naming a single interface.
    pub fn for_interface(interface_name: &str) -> Self {
        Self::new().with("interface_name", interface_name)
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Renders protocol payloads.
///
/// Implementations must be deterministic. A family without a template for
/// the operation must fail with [`NetconfError::UnsupportedDeviceType`].
pub trait RequestRenderer: Send + Sync {
    fn render(
        &self,
        family: DeviceFamily,
        operation: Operation,
        params: &RenderParams,
    ) -> Result<String, NetconfError>;
}

/// Renderer backed by the templates in each family profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl RequestRenderer for TemplateRenderer {
    fn render(
        &self,
        family: DeviceFamily,
        operation: Operation,
        params: &RenderParams,
    ) -> Result<String, NetconfError> {
        let templates =
            family
                .profile()
                .templates
                .ok_or_else(|| NetconfError::UnsupportedDeviceType {
                    family: family.to_string(),
                    operation: operation.to_string(),
                })?;
        render_template(templates.get(operation), params)
    }
}

/// Replaces every `{name}` in `template` with the escaped parameter value.
pub fn render_template(template: &str, params: &RenderParams) -> Result<String, NetconfError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];
        let value = params
            .get(name)
            .ok_or_else(|| NetconfError::InvalidParameter(format!("missing parameter {name}")))?;
        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&escape(value));
        last = whole.end();
    }
    rendered.push_str(&template[last..]);
    Ok(rendered)
}

/// Converts a dotted netmask into a prefix length.
///
/// Non-contiguous masks such as `255.0.255.0` are rejected.
pub fn netmask_prefix_length(netmask: &str) -> Result<u32, NetconfError> {
    let mask: Ipv4Addr = netmask
        .trim()
        .parse()
        .map_err(|_| NetconfError::InvalidParameter(format!("invalid netmask {netmask}")))?;
    let bits = u32::from(mask);
    let prefix = bits.leading_ones();
    if bits.checked_shl(prefix).unwrap_or(0) != 0 {
        return Err(NetconfError::InvalidParameter(format!(
            "netmask {netmask} is not contiguous"
        )));
    }
    Ok(prefix)
}

pub const IOSXR_TEMPLATES: PayloadTemplates = PayloadTemplates {
    get_one: r#"<filter type="subtree">
    <interface-configurations xmlns="http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg">
        <interface-configuration>
            <interface-name>{interface_name}</interface-name>
        </interface-configuration>
    </interface-configurations>
</filter>"#,
    get_all: r#"<filter type="subtree">
    <interface-configurations xmlns="http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg"/>
</filter>"#,
    create: r#"<config>
    <interface-configurations xmlns="http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg">
        <interface-configuration>
            <active>{active}</active>
            <interface-name>{interface_name}</interface-name>
            <interface-virtual/>
            <ipv4-network xmlns="http://cisco.com/ns/yang/Cisco-IOS-XR-ipv4-io-cfg">
                <addresses>
                    <primary>
                        <address>{address}</address>
                        <netmask>{netmask}</netmask>
                    </primary>
                </addresses>
            </ipv4-network>
        </interface-configuration>
    </interface-configurations>
</config>"#,
    delete: r#"<config xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0">
    <interface-configurations xmlns="http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg">
        <interface-configuration nc:operation="delete">
            <active>act</active>
            <interface-name>{interface_name}</interface-name>
        </interface-configuration>
    </interface-configurations>
</config>
"#,
};

pub const NEXUS_TEMPLATES: PayloadTemplates = PayloadTemplates {
    get_one: r#"<filter type="subtree">
    <interfaces xmlns="http://openconfig.net/yang/interfaces">
        <interface>
            <name>{interface_name}</name>
        </interface>
    </interfaces>
</filter>"#,
    get_all: r#"<filter type="subtree">
    <interfaces xmlns="http://openconfig.net/yang/interfaces"/>
</filter>"#,
    create: r#"<config>
    <interfaces xmlns="http://openconfig.net/yang/interfaces">
        <interface>
            <name>{interface_name}</name>
            <config>
                <name>{interface_name}</name>
                <enabled>true</enabled>
            </config>
            <subinterfaces>
                <subinterface>
                    <index>0</index>
                    <ipv4 xmlns="http://openconfig.net/yang/interfaces/ip">
                        <addresses>
                            <address>
                                <ip>{address}</ip>
                                <config>
                                    <ip>{address}</ip>
                                    <prefix-length>{prefix_length}</prefix-length>
                                </config>
                            </address>
                        </addresses>
                    </ipv4>
                </subinterface>
            </subinterfaces>
        </interface>
    </interfaces>
</config>"#,
    delete: r#"<config xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0">
    <interfaces xmlns="http://openconfig.net/yang/interfaces">
        <interface nc:operation="delete">
            <name>{interface_name}</name>
        </interface>
    </interfaces>
</config>
"#,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_one_renders_interface_filter() {
        let payload = TemplateRenderer
            .render(
                DeviceFamily::Iosxr,
                Operation::GetOne,
                &RenderParams::for_interface("Loopback0"),
            )
            .expect("render get_one");
        assert!(payload.starts_with("<filter type=\"subtree\">"));
        assert!(payload.contains("<interface-name>Loopback0</interface-name>"));
    }

    #[test]
    fn get_all_needs_no_parameters() {
        let payload = TemplateRenderer
            .render(DeviceFamily::Nexus, Operation::GetAll, &RenderParams::new())
            .expect("render get_all");
        assert!(payload.contains("http://openconfig.net/yang/interfaces"));
    }

    #[test]
    fn only_nexus_create_takes_a_prefix_length() {
        assert!(NEXUS_TEMPLATES.uses(Operation::Create, "prefix_length"));
        assert!(!NEXUS_TEMPLATES.uses(Operation::Delete, "prefix_length"));
        assert!(!IOSXR_TEMPLATES.uses(Operation::Create, "prefix_length"));
        assert!(IOSXR_TEMPLATES.uses(Operation::Create, "netmask"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let params = RenderParams::for_interface("vlan1");
        let first = TemplateRenderer
            .render(DeviceFamily::Iosxr, Operation::Delete, &params)
            .expect("render");
        let second = TemplateRenderer
            .render(DeviceFamily::Iosxr, Operation::Delete, &params)
            .expect("render");
        assert_eq!(first, second);
    }

    #[test]
    fn family_without_templates_is_unsupported() {
        let err = TemplateRenderer
            .render(
                DeviceFamily::Iosxe,
                Operation::GetAll,
                &RenderParams::new(),
            )
            .expect_err("iosxe has no templates");
        assert!(matches!(err, NetconfError::UnsupportedDeviceType { .. }));
    }

    #[test]
    fn missing_parameter_is_reported_by_name() {
        let err = TemplateRenderer
            .render(DeviceFamily::Iosxr, Operation::GetOne, &RenderParams::new())
            .expect_err("interface_name is required");
        match err {
            NetconfError::InvalidParameter(msg) => assert!(msg.contains("interface_name")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn values_are_xml_escaped() {
        let payload = render_template(
            "<name>{interface_name}</name>",
            &RenderParams::for_interface("a<b&c"),
        )
        .expect("render");
        assert_eq!(payload, "<name>a&lt;b&amp;c</name>");
    }

    #[test]
    fn netmask_converts_to_prefix_length() {
        assert_eq!(netmask_prefix_length("255.255.255.255").ok(), Some(32));
        assert_eq!(netmask_prefix_length("255.255.255.0").ok(), Some(24));
        assert_eq!(netmask_prefix_length("0.0.0.0").ok(), Some(0));
        assert!(netmask_prefix_length("255.0.255.0").is_err());
        assert!(netmask_prefix_length("not-a-mask").is_err());
    }
}
