//! # rnetconf - NETCONF Interface Lifecycle Management
//!
//! `rnetconf` reads, creates and deletes interface configuration on network
//! devices over NETCONF. It detects each device's family from the
//! capabilities advertised at session setup, caches the result per host, and
//! runs every change as an existence check followed by an edit of the
//! candidate datastore and a commit.
//!
//! ## Features
//!
//! - **Capability Detection**: Ordered signature table, first match wins
//! - **Pluggable Cache**: Device types kept in a moka cache or a JSONL file
//! - **Check-Then-Act Edits**: Create refuses existing interfaces, delete refuses missing ones
//! - **Dry Run**: Render the payload without touching the device
//! - **Session Recording**: Capture sessions as JSONL and replay them offline
//! - **Async/Await**: Built on Tokio, NETCONF over SSH via async-ssh2-tokio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rnetconf::credentials::EnvCredentials;
//! use rnetconf::device::Device;
//! use rnetconf::interface::{InterfaceConfig, InterfaceManager};
//! use rnetconf::resolver::DeviceTypeResolver;
//! use rnetconf::session::SshConnector;
//! use rnetconf::store::MemoryDeviceTypeStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = Arc::new(SshConnector::default());
//!     let resolver =
//!         DeviceTypeResolver::new(Arc::new(MemoryDeviceTypeStore::new()), connector.clone());
//!     let manager = InterfaceManager::new(connector);
//!
//!     // Reads DEFAULT_USERNAME / DEFAULT_PASSWORD.
//!     let device =
//!         Device::resolve("sandbox-iosxr-1.cisco.com", "DEFAULT", &EnvCredentials, &resolver)
//!             .await?;
//!
//!     let config = InterfaceConfig::new("Loopback432", "10.1.1.2", "255.255.255.255");
//!     let outcome = manager.create(&device, &config, false).await?;
//!     println!("{}", outcome.detail());
//!
//!     let response = manager.get_one(&device, "Loopback432").await?;
//!     println!("{}", response.data);
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`resolver::DeviceTypeResolver`] - Detects and caches device families
//! - [`session::ProtocolSession`] - One NETCONF session, always closed
//! - [`render::RequestRenderer`] - Renders filters and edit payloads per family
//! - [`decode`] - XML to mapping conversion and presence validation
//! - [`interface::InterfaceManager`] - get-one, get-all, create, delete
//! - [`error::NetconfError`] - Error types with a coarse [`error::ErrorKind`]

pub mod config;
pub mod credentials;
pub mod decode;
pub mod device;
pub mod error;
pub mod family;
pub mod interface;
pub mod render;
pub mod resolver;
pub mod session;
pub mod store;
