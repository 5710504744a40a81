//! Interface lifecycle operations.
//!
//! Every operation opens its own session and closes it before returning.
//! `create` and `delete` first run an existence check in one session and
//! then mutate in a second one. Nothing guards the window between the two:
//! a concurrent change on the device can still make the commit fail.

use std::sync::Arc;

use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::decode::{ProtocolResponse, decode_and_validate};
use crate::device::Device;
use crate::error::NetconfError;
use crate::family::DeviceFamily;
use crate::render::{
    Operation, RenderParams, RequestRenderer, TemplateRenderer, netmask_prefix_length,
};
use crate::session::{Connector, ProtocolSession};

fn default_active() -> String {
    "act".to_string()
}

/// Input for creating an interface.
///
/// `netmask` is passed through as given to families whose create payload
/// carries a dotted netmask. Families that take a prefix length need a
/// contiguous netmask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InterfaceConfig {
    pub interface_name: String,
    pub address: String,
    pub netmask: String,
    /// Activation flag written with the interface. Defaults to `act`.
    #[serde(default = "default_active")]
    pub active: String,
}

impl InterfaceConfig {
    pub fn new(interface_name: &str, address: &str, netmask: &str) -> Self {
        Self {
            interface_name: interface_name.to_string(),
            address: address.to_string(),
            netmask: netmask.to_string(),
            active: default_active(),
        }
    }

    /// Create parameters for `family`.
    ///
    /// The prefix length is derived only when the family's create template
    /// asks for it.
    pub fn render_params(&self, family: DeviceFamily) -> Result<RenderParams, NetconfError> {
        let mut params = RenderParams::for_interface(&self.interface_name)
            .with("address", self.address.as_str())
            .with("netmask", self.netmask.as_str())
            .with("active", self.active.as_str());
        let needs_prefix = family
            .profile()
            .templates
            .is_some_and(|templates| templates.uses(Operation::Create, "prefix_length"));
        if needs_prefix {
            let prefix_length = netmask_prefix_length(&self.netmask)?;
            params = params.with("prefix_length", prefix_length.to_string());
        }
        Ok(params)
    }
}

/// Kind of change an edit made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    Created,
    Deleted,
}

/// Result of a create or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    /// The rendered payload; nothing was sent to the device.
    DryRun { payload: String },
    /// The payload was edited into the candidate and committed.
    Committed {
        interface_name: String,
        action: EditAction,
    },
}

impl EditOutcome {
    /// Caller-facing message for a committed edit, or the dry-run payload.
    pub fn detail(&self) -> String {
        match self {
            EditOutcome::DryRun { payload } => payload.clone(),
            EditOutcome::Committed {
                interface_name,
                action: EditAction::Created,
            } => format!("Successfully created {interface_name}"),
            EditOutcome::Committed {
                interface_name,
                action: EditAction::Deleted,
            } => format!("Successfully deleted {interface_name}"),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, EditOutcome::DryRun { .. })
    }
}

/// Reads, creates and deletes interfaces on resolved devices.
#[derive(Clone)]
pub struct InterfaceManager {
    connector: Arc<dyn Connector>,
    renderer: Arc<dyn RequestRenderer>,
}

impl InterfaceManager {
    /// Manager using the built-in payload templates.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_renderer(connector, Arc::new(TemplateRenderer))
    }

    pub fn with_renderer(connector: Arc<dyn Connector>, renderer: Arc<dyn RequestRenderer>) -> Self {
        Self {
            connector,
            renderer,
        }
    }

    async fn read(
        &self,
        device: &Device,
        operation: Operation,
        params: &RenderParams,
    ) -> Result<ProtocolResponse, NetconfError> {
        let family = device.device_family();
        let filter = self.renderer.render(family, operation, params)?;
        let mut session =
            ProtocolSession::open(self.connector.as_ref(), device.connection_params()).await?;
        let result = session
            .get_config(&filter)
            .await
            .and_then(|raw| decode_and_validate(raw, family));
        session.finish(result).await
    }

    async fn apply(&self, device: &Device, payload: &str) -> Result<(), NetconfError> {
        let mut session =
            ProtocolSession::open(self.connector.as_ref(), device.connection_params()).await?;
        let result = session.edit_config(payload).await;
        session.finish(result).await
    }

    /// Configuration of one interface.
    ///
    /// Fails with [`NetconfError::InvalidData`] when the device returns
    /// nothing for `interface_name`; callers treat that as "not found".
    pub async fn get_one(
        &self,
        device: &Device,
        interface_name: &str,
    ) -> Result<ProtocolResponse, NetconfError> {
        self.read(device, Operation::GetOne, &RenderParams::for_interface(interface_name))
            .await
    }

    /// Like [`InterfaceManager::get_one`], with absence reported as `None`.
    pub async fn find_one(
        &self,
        device: &Device,
        interface_name: &str,
    ) -> Result<Option<ProtocolResponse>, NetconfError> {
        match self.get_one(device, interface_name).await {
            Ok(response) => Ok(Some(response)),
            Err(NetconfError::InvalidData(reason)) => {
                debug!("{} has no interface {}: {}", device.host(), interface_name, reason);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Configuration of every interface.
    pub async fn get_all(&self, device: &Device) -> Result<ProtocolResponse, NetconfError> {
        self.read(device, Operation::GetAll, &RenderParams::new()).await
    }

    /// True iff a lookup of `interface_name` finds a non-empty configuration.
    pub async fn exists(&self, device: &Device, interface_name: &str) -> Result<bool, NetconfError> {
        Ok(self.find_one(device, interface_name).await?.is_some())
    }

    /// Creates an interface unless it already exists.
    ///
    /// With `dry_run` the rendered payload is returned and nothing is written.
    pub async fn create(
        &self,
        device: &Device,
        config: &InterfaceConfig,
        dry_run: bool,
    ) -> Result<EditOutcome, NetconfError> {
        if self.exists(device, &config.interface_name).await? {
            return Err(NetconfError::CannotEdit(format!(
                "Interface {} already exists",
                config.interface_name
            )));
        }

        let payload = self.renderer.render(
            device.device_family(),
            Operation::Create,
            &config.render_params(device.device_family())?,
        )?;
        if dry_run {
            return Ok(EditOutcome::DryRun { payload });
        }

        self.apply(device, &payload).await?;
        info!("{} created interface {}", device.host(), config.interface_name);
        Ok(EditOutcome::Committed {
            interface_name: config.interface_name.clone(),
            action: EditAction::Created,
        })
    }

    /// Deletes an interface if it exists.
    pub async fn delete(
        &self,
        device: &Device,
        interface_name: &str,
        dry_run: bool,
    ) -> Result<EditOutcome, NetconfError> {
        if !self.exists(device, interface_name).await? {
            return Err(NetconfError::CannotEdit(format!(
                "Interface {interface_name} does not exist"
            )));
        }

        let payload = self.renderer.render(
            device.device_family(),
            Operation::Delete,
            &RenderParams::for_interface(interface_name),
        )?;
        if dry_run {
            return Ok(EditOutcome::DryRun { payload });
        }

        self.apply(device, &payload).await?;
        info!("{} deleted interface {}", device.host(), interface_name);
        Ok(EditOutcome::Committed {
            interface_name: interface_name.to_string(),
            action: EditAction::Deleted,
        })
    }
}
