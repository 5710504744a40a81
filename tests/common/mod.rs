#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use rnetconf::config::{BASE_1_0, BASE_1_1, ConnectionDefaults};
use rnetconf::credentials::Credentials;
use rnetconf::device::{ConnectionParams, Device};
use rnetconf::error::NetconfError;
use rnetconf::family::DeviceFamily;
use rnetconf::session::{Connector, Datastore, Transport};

pub const IOSXR_CAPABILITY: &str =
    "http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg?module=Cisco-IOS-XR-ifmgr-cfg&revision=2017-09-07";
pub const NEXUS_CAPABILITY: &str =
    "http://cisco.com/ns/yang/cisco-nx-os-device?revision=2021-06-29&module=Cisco-NX-OS-device";

static INTERFACE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<interface-name>([^<]+)</interface-name>").expect("regex"));
static ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<address>([^<]+)</address>").expect("regex"));
static NETMASK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<netmask>([^<]+)</netmask>").expect("regex"));
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"<name>([^<]+)</name>").expect("regex"));
static IP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<ip>([^<]+)</ip>").expect("regex"));
static PREFIX_LENGTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<prefix-length>([^<]+)</prefix-length>").expect("regex"));

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|caps| caps[1].to_string())
}

pub fn credentials() -> Credentials {
    Credentials::new("admin", "C1sco12345")
}

pub fn iosxr_device(host: &str) -> Device {
    Device::with_family(
        host,
        "DEFAULT",
        DeviceFamily::Iosxr,
        &credentials(),
        &ConnectionDefaults::default(),
    )
}

pub fn nexus_device(host: &str) -> Device {
    Device::with_family(
        host,
        "NEXUS",
        DeviceFamily::Nexus,
        &credentials(),
        &ConnectionDefaults::default(),
    )
}

#[derive(Debug, Default)]
pub struct Counters {
    pub connects: AtomicUsize,
    pub get_configs: AtomicUsize,
    pub edits: AtomicUsize,
    pub commits: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
enum PendingEdit {
    Create {
        name: String,
        address: String,
        mask: String,
    },
    Delete {
        name: String,
    },
}

/// Interface name, address and mask as found in a payload of one family.
struct Markup {
    name: &'static Lazy<Regex>,
    address: &'static Lazy<Regex>,
    mask: &'static Lazy<Regex>,
}

static IOSXR_MARKUP: Markup = Markup {
    name: &INTERFACE_NAME,
    address: &ADDRESS,
    mask: &NETMASK,
};

static NEXUS_MARKUP: Markup = Markup {
    name: &NAME,
    address: &IP,
    mask: &PREFIX_LENGTH,
};

/// Interface address and mask. The mask is a dotted netmask on IOS-XR and
/// a prefix length on NX-OS.
#[derive(Debug, Default)]
struct DeviceState {
    interfaces: BTreeMap<String, (String, String)>,
    fail_commit: bool,
}

/// A device holding interface configuration in memory.
///
/// Speaks the IOS-XR or the NX-OS payloads. Edits land in a per-session
/// candidate and apply on commit.
#[derive(Clone)]
pub struct FakeDevice {
    family: DeviceFamily,
    state: Arc<Mutex<DeviceState>>,
    pub counters: Arc<Counters>,
    capabilities: Vec<String>,
}

impl FakeDevice {
    fn new(family: DeviceFamily, capability: &str) -> Self {
        Self {
            family,
            state: Arc::new(Mutex::new(DeviceState::default())),
            counters: Arc::new(Counters::default()),
            capabilities: vec![
                BASE_1_0.to_string(),
                BASE_1_1.to_string(),
                "urn:ietf:params:netconf:capability:candidate:1.0".to_string(),
                capability.to_string(),
            ],
        }
    }

    pub fn iosxr() -> Self {
        Self::new(DeviceFamily::Iosxr, IOSXR_CAPABILITY)
    }

    pub fn nexus() -> Self {
        Self::new(DeviceFamily::Nexus, NEXUS_CAPABILITY)
    }

    fn markup(&self) -> &'static Markup {
        match self.family {
            DeviceFamily::Nexus => &NEXUS_MARKUP,
            _ => &IOSXR_MARKUP,
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_interface(self, name: &str, address: &str, mask: &str) -> Self {
        self.state
            .lock()
            .expect("lock")
            .interfaces
            .insert(name.to_string(), (address.to_string(), mask.to_string()));
        self
    }

    pub fn fail_commits(&self) {
        self.state.lock().expect("lock").fail_commit = true;
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.state.lock().expect("lock").interfaces.contains_key(name)
    }

    pub fn connects(&self) -> usize {
        Counters::get(&self.counters.connects)
    }

    pub fn edits(&self) -> usize {
        Counters::get(&self.counters.edits)
    }

    pub fn commits(&self) -> usize {
        Counters::get(&self.counters.commits)
    }

    pub fn closes(&self) -> usize {
        Counters::get(&self.counters.closes)
    }

    fn render_data(&self, only: Option<&str>) -> String {
        let state = self.state.lock().expect("lock");
        let mut body = String::new();
        for (name, (address, mask)) in &state.interfaces {
            if only.is_some_and(|wanted| wanted != name) {
                continue;
            }
            let entry = match self.family {
                DeviceFamily::Nexus => nexus_interface(name, address, mask),
                _ => iosxr_interface(name, address, mask),
            };
            body.push_str(&entry);
        }
        if body.is_empty() {
            return r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"/>"#.to_string();
        }
        let container = match self.family {
            DeviceFamily::Nexus => r#"<interfaces xmlns="http://openconfig.net/yang/interfaces">"#,
            _ => r#"<interface-configurations xmlns="http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg">"#,
        };
        let close = match self.family {
            DeviceFamily::Nexus => "</interfaces>",
            _ => "</interface-configurations>",
        };
        format!(
            r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  {container}{body}
  {close}
 </data>"#
        )
    }
}

fn iosxr_interface(name: &str, address: &str, netmask: &str) -> String {
    format!(
        r#"
   <interface-configuration>
    <active>act</active>
    <interface-name>{name}</interface-name>
    <interface-virtual/>
    <ipv4-network xmlns="http://cisco.com/ns/yang/Cisco-IOS-XR-ipv4-io-cfg">
     <addresses>
      <primary>
       <address>{address}</address>
       <netmask>{netmask}</netmask>
      </primary>
     </addresses>
    </ipv4-network>
   </interface-configuration>"#
    )
}

fn nexus_interface(name: &str, ip: &str, prefix_length: &str) -> String {
    format!(
        r#"
   <interface>
    <name>{name}</name>
    <config>
     <name>{name}</name>
     <enabled>true</enabled>
    </config>
    <subinterfaces>
     <subinterface>
      <index>0</index>
      <ipv4 xmlns="http://openconfig.net/yang/interfaces/ip">
       <addresses>
        <address>
         <ip>{ip}</ip>
         <config>
          <ip>{ip}</ip>
          <prefix-length>{prefix_length}</prefix-length>
         </config>
        </address>
       </addresses>
      </ipv4>
     </subinterface>
    </subinterfaces>
   </interface>"#
    )
}

#[async_trait]
impl Connector for FakeDevice {
    async fn connect(&self, _params: &ConnectionParams) -> Result<Box<dyn Transport>, NetconfError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            device: self.clone(),
            candidate: Vec::new(),
        }))
    }
}

struct FakeSession {
    device: FakeDevice,
    candidate: Vec<PendingEdit>,
}

#[async_trait]
impl Transport for FakeSession {
    fn capabilities(&self) -> &[String] {
        &self.device.capabilities
    }

    async fn get_config(&mut self, source: Datastore, filter: &str) -> Result<String, NetconfError> {
        assert_eq!(source, Datastore::Running);
        self.device.counters.get_configs.fetch_add(1, Ordering::SeqCst);
        let only = capture(self.device.markup().name, filter);
        Ok(self.device.render_data(only.as_deref()))
    }

    async fn edit_config(&mut self, target: Datastore, config: &str) -> Result<(), NetconfError> {
        assert_eq!(target, Datastore::Candidate);
        self.device.counters.edits.fetch_add(1, Ordering::SeqCst);
        let markup = self.device.markup();
        let name = capture(markup.name, config).ok_or_else(|| NetconfError::RpcError {
            tag: "missing-element".to_string(),
            message: "interface name".to_string(),
        })?;
        let edit = if config.contains(r#"nc:operation="delete""#) {
            PendingEdit::Delete { name }
        } else {
            PendingEdit::Create {
                name,
                address: capture(markup.address, config).unwrap_or_default(),
                mask: capture(markup.mask, config).unwrap_or_default(),
            }
        };
        self.candidate.push(edit);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), NetconfError> {
        self.device.counters.commits.fetch_add(1, Ordering::SeqCst);
        let mut state = self.device.state.lock().expect("lock");
        if state.fail_commit {
            self.candidate.clear();
            return Err(NetconfError::RpcError {
                tag: "operation-failed".to_string(),
                message: "commit rejected".to_string(),
            });
        }
        for edit in self.candidate.drain(..) {
            match edit {
                PendingEdit::Create {
                    name,
                    address,
                    mask,
                } => {
                    state.interfaces.insert(name, (address, mask));
                }
                PendingEdit::Delete { name } => {
                    state.interfaces.remove(&name);
                }
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), NetconfError> {
        self.device.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
