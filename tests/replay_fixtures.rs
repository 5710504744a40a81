mod common;

use std::sync::Arc;

use common::{FakeDevice, credentials, iosxr_device};
use rnetconf::decode::{self, Presence};
use rnetconf::device::Device;
use rnetconf::error::NetconfError;
use rnetconf::family::DeviceFamily;
use rnetconf::interface::{InterfaceConfig, InterfaceManager};
use rnetconf::resolver::DeviceTypeResolver;
use rnetconf::session::{RecordingConnector, ReplayConnector, SessionEvent, SessionRecorder};
use rnetconf::store::MemoryDeviceTypeStore;

const DETECT_GET_ALL: &str = include_str!("fixtures/iosxr_detect_get_all.jsonl");
const IOSXR_LOOPBACK0: &str = include_str!("fixtures/iosxr_loopback0.xml");
const IOSXR_MISSING: &str = include_str!("fixtures/iosxr_missing.xml");
const NEXUS_INTERFACES: &str = include_str!("fixtures/nexus_interfaces.xml");

#[tokio::test]
async fn fixture_replays_detection_and_get_all_without_ssh() {
    let connector = Arc::new(ReplayConnector::from_jsonl(DETECT_GET_ALL).expect("load fixture"));
    let resolver =
        DeviceTypeResolver::new(Arc::new(MemoryDeviceTypeStore::new()), connector.clone());
    let manager = InterfaceManager::new(connector.clone());

    let family = resolver
        .resolve("sandbox-iosxr-1.cisco.com", &credentials())
        .await
        .expect("detect from recording");
    assert_eq!(family, DeviceFamily::Iosxr);

    let device = Device::with_family(
        "sandbox-iosxr-1.cisco.com",
        "DEFAULT",
        family,
        &credentials(),
        resolver.defaults(),
    );
    let response = manager.get_all(&device).await.expect("get all");
    assert_eq!(
        response.data["data"]["interface-configurations"]["interface-configuration"]
            ["interface-name"],
        "Loopback0"
    );
    assert!(connector.is_exhausted());
}

#[tokio::test]
async fn fixture_rejects_requests_it_did_not_record() {
    let connector = Arc::new(ReplayConnector::from_jsonl(DETECT_GET_ALL).expect("load fixture"));
    let manager = InterfaceManager::new(connector);

    // The recording opens with a detection session, not a get-one.
    let err = manager
        .get_one(&iosxr_device("sandbox-iosxr-1.cisco.com"), "Loopback0")
        .await
        .expect_err("not recorded");
    assert!(matches!(err, NetconfError::ReplayMismatch(_)));
}

#[tokio::test]
async fn recorded_lifecycle_replays_offline() {
    let fake = FakeDevice::iosxr();
    let recorder = SessionRecorder::default();
    let recording = Arc::new(RecordingConnector::new(
        Arc::new(fake.clone()),
        recorder.clone(),
    ));
    let live = InterfaceManager::new(recording);
    let device = iosxr_device("r1");
    let config = InterfaceConfig::new("Loopback432", "10.1.1.2", "255.255.255.255");

    live.create(&device, &config, false).await.expect("create");
    live.delete(&device, "Loopback432", false)
        .await
        .expect("delete");

    let entries = recorder.entries().expect("entries");
    let commits = entries
        .iter()
        .filter(|entry| matches!(entry.event, SessionEvent::Commit { success: true, .. }))
        .count();
    assert_eq!(commits, 2);
    assert_eq!(fake.connects(), 4);

    let jsonl = recorder.to_jsonl().expect("export");
    let replay = Arc::new(ReplayConnector::from_jsonl(&jsonl).expect("import"));
    let offline = InterfaceManager::new(replay.clone());
    offline
        .create(&device, &config, false)
        .await
        .expect("replayed create");
    offline
        .delete(&device, "Loopback432", false)
        .await
        .expect("replayed delete");
    assert!(replay.is_exhausted());
    assert_eq!(fake.connects(), 4);
}

#[test]
fn iosxr_fixture_has_presence_key() {
    let data = decode::decode(IOSXR_LOOPBACK0).expect("decode");
    assert_eq!(decode::presence(&data, DeviceFamily::Iosxr), Presence::Present);
    assert_eq!(
        data["data"]["interface-configurations"]["interface-configuration"]["interface-virtual"],
        serde_json::Value::Null
    );
}

#[test]
fn iosxr_missing_fixture_is_invalid_data() {
    let err = decode::decode_and_validate(IOSXR_MISSING.to_string(), DeviceFamily::Iosxr)
        .expect_err("no interface-configurations");
    assert!(matches!(err, NetconfError::InvalidData(_)));
}

#[test]
fn nexus_fixture_decodes_interface_list() {
    let response = decode::decode_and_validate(NEXUS_INTERFACES.to_string(), DeviceFamily::Nexus)
        .expect("valid nexus data");
    let interfaces = response.data["data"]["interfaces"]["interface"]
        .as_array()
        .expect("two interfaces");
    assert_eq!(interfaces.len(), 2);
    assert_eq!(interfaces[0]["name"], "mgmt0");
    assert_eq!(
        interfaces[1]["subinterfaces"]["subinterface"]["ipv4"]["@xmlns"],
        "http://openconfig.net/yang/interfaces/ip"
    );
    assert_eq!(
        decode::presence(&response.data, DeviceFamily::Iosxr),
        Presence::Absent
    );
}
