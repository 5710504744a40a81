//! NETCONF sessions.
//!
//! A session is opened per operation and closed when the operation ends,
//! whatever its outcome. Nothing is pooled or reused.
//!
//! # Main Components
//!
//! - [`Connector`] / [`Transport`] - seams between the operations and the wire
//! - [`ProtocolSession`] - one open session with timeouts and guaranteed close
//! - [`SshConnector`] - NETCONF over the SSH `netconf` subsystem
//! - [`SessionRecorder`] / [`ReplayConnector`] - capture and offline replay

use async_ssh2_tokio::client::{AuthMethod, Client};
use async_ssh2_tokio::{Config, ServerCheckMethod};
use async_trait::async_trait;
use log::{debug, trace, warn};
use russh::client::Msg;
use russh::{Channel, ChannelMsg, Preferred};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config;
use crate::device::ConnectionParams;
use crate::error::NetconfError;

pub use client::{SshConnector, SshTransport};
pub use framing::{FrameDecoder, Framing};
pub use recording::{
    RecordingConnector, ReplayConnector, SessionEvent, SessionRecordEntry, SessionRecordLevel,
    SessionRecorder,
};
pub use rpc::{Hello, RpcReply};
pub use security::{ConnectionSecurityOptions, SecurityLevel};

/// Configuration datastores used by the interface operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Datastore {
    Running,
    Candidate,
}

impl Datastore {
    pub fn as_str(self) -> &'static str {
        match self {
            Datastore::Running => "running",
            Datastore::Candidate => "candidate",
        }
    }
}

/// One established NETCONF session on the wire.
///
/// Calls are issued sequentially; a transport is never shared between tasks.
#[async_trait]
pub trait Transport: Send {
    /// Capabilities the device advertised in its hello.
    fn capabilities(&self) -> &[String];

    /// Runs `<get-config>` and returns the outer XML of the `<data>` element.
    async fn get_config(&mut self, source: Datastore, filter: &str)
    -> Result<String, NetconfError>;

    async fn edit_config(&mut self, target: Datastore, config: &str) -> Result<(), NetconfError>;

    async fn commit(&mut self) -> Result<(), NetconfError>;

    /// Ends the session. Called exactly once.
    async fn close(&mut self) -> Result<(), NetconfError>;
}

/// Opens transports. Implementations are shared across concurrent operations.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Transport>, NetconfError>;
}

async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, NetconfError>
where
    F: Future<Output = Result<T, NetconfError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| NetconfError::Timeout(timeout))?
}

/// An open session bound to one operation.
///
/// Consumed by [`ProtocolSession::close`] or [`ProtocolSession::finish`].
pub struct ProtocolSession {
    transport: Option<Box<dyn Transport>>,
    device_addr: String,
    timeout: Duration,
}

impl ProtocolSession {
    /// Connects and completes the hello exchange within the params' timeout.
    pub async fn open(
        connector: &dyn Connector,
        params: &ConnectionParams,
    ) -> Result<Self, NetconfError> {
        let timeout = params.timeout();
        let device_addr = params.device_addr();
        debug!("{} opening NETCONF session ({})", device_addr, params.device_tag());
        let transport = with_timeout(timeout, connector.connect(params)).await?;
        debug!(
            "{} NETCONF session open, {} capabilities",
            device_addr,
            transport.capabilities().len()
        );
        Ok(Self {
            transport: Some(transport),
            device_addr,
            timeout,
        })
    }

    pub fn device_addr(&self) -> &str {
        &self.device_addr
    }

    fn transport(&mut self) -> Result<&mut Box<dyn Transport>, NetconfError> {
        self.transport
            .as_mut()
            .ok_or_else(|| NetconfError::Protocol("session already closed".to_string()))
    }

    pub fn capabilities(&self) -> &[String] {
        self.transport
            .as_ref()
            .map(|t| t.capabilities())
            .unwrap_or(&[])
    }

    /// Reads the running datastore through `filter`.
    pub async fn get_config(&mut self, filter: &str) -> Result<String, NetconfError> {
        let timeout = self.timeout;
        trace!("{} get-config filter: {}", self.device_addr, filter);
        let transport = self.transport()?;
        with_timeout(timeout, transport.get_config(Datastore::Running, filter)).await
    }

    /// Edits the candidate datastore, then commits.
    ///
    /// A commit failure after a successful edit is reported as a protocol
    /// error; the uncommitted candidate is left for the device to discard.
    pub async fn edit_config(&mut self, config: &str) -> Result<(), NetconfError> {
        let timeout = self.timeout;
        let device_addr = self.device_addr.clone();
        trace!("{} edit-config payload: {}", device_addr, config);
        let transport = self.transport()?;
        with_timeout(timeout, transport.edit_config(Datastore::Candidate, config)).await?;
        with_timeout(timeout, transport.commit())
            .await
            .map_err(|err| {
                warn!("{device_addr} commit failed after edit-config: {err}");
                NetconfError::Protocol(format!("commit failed after edit-config: {err}"))
            })?;
        debug!("{device_addr} candidate committed");
        Ok(())
    }

    /// Closes the session and returns `result` unchanged.
    ///
    /// Close failures are logged, never surfaced: the operation outcome has
    /// already been decided.
    pub async fn finish<T>(
        self,
        result: Result<T, NetconfError>,
    ) -> Result<T, NetconfError> {
        let device_addr = self.device_addr.clone();
        if let Err(err) = self.close().await {
            warn!("{device_addr} failed to close NETCONF session: {err}");
        }
        result
    }

    pub async fn close(mut self) -> Result<(), NetconfError> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };
        let result = with_timeout(self.timeout, transport.close()).await;
        debug!("{} NETCONF session closed", self.device_addr);
        result
    }
}

impl Drop for ProtocolSession {
    fn drop(&mut self) {
        if self.transport.is_some() {
            warn!(
                "{} NETCONF session dropped without close",
                self.device_addr
            );
        }
    }
}

mod client;
mod framing;
mod recording;
pub(crate) mod rpc;
mod security;
