//! Per-device collection: connect, enable, prime, run the role's command
//! sequence, disconnect.
//!
//! Records are appended to a per-device [`RecordTables`] as each step
//! finishes, so a transport failure part-way through keeps everything the
//! earlier steps produced. Output the template cannot match, or a command
//! the device rejects, contributes zero records for that step and the
//! sequence continues.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Serialize;

use crate::error::Error;
use crate::inventory::{DeviceTarget, Role};
use crate::parser::{Record, RecordParser, TemplateId, fields};
use crate::registry::VrfRegistry;
use crate::session::{DeviceSession, SessionConnector};

/// Record tables gathered from one device, or from all of them once merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordTables {
    /// `show ip vrf` (routers).
    pub vrf_entries: Vec<Record>,
    /// `show ip arp vrfid <id>` (routers), tagged with `VRF_ID`.
    pub arp: Vec<Record>,
    /// `show running-config module vlan` (routers).
    pub vlan_config: Vec<Record>,
    /// `show vlan advance` (routers).
    pub vlan_advance: Vec<Record>,
    /// `show mac-address-table` (switches).
    pub mac_table: Vec<Record>,
    /// `show interface name` (switches).
    pub port_list: Vec<Record>,
    /// `show interfaces` (switches).
    pub port_status: Vec<Record>,
}

impl RecordTables {
    /// Total number of records across all tables.
    pub fn record_count(&self) -> usize {
        self.vrf_entries.len()
            + self.arp.len()
            + self.vlan_config.len()
            + self.vlan_advance.len()
            + self.mac_table.len()
            + self.port_list.len()
            + self.port_status.len()
    }

    /// Append another device's tables.
    pub fn extend_from(&mut self, other: &RecordTables) {
        self.vrf_entries.extend_from_slice(&other.vrf_entries);
        self.arp.extend_from_slice(&other.arp);
        self.vlan_config.extend_from_slice(&other.vlan_config);
        self.vlan_advance.extend_from_slice(&other.vlan_advance);
        self.mac_table.extend_from_slice(&other.mac_table);
        self.port_list.extend_from_slice(&other.port_list);
        self.port_status.extend_from_slice(&other.port_status);
    }

    /// Concatenate the tables of every outcome, in outcome order.
    pub fn merge<'a>(outcomes: impl IntoIterator<Item = &'a DeviceOutcome>) -> Self {
        let mut merged = Self::default();
        for outcome in outcomes {
            merged.extend_from(&outcome.tables);
        }
        merged
    }
}

/// Where a device's collection stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "detail", rename_all = "snake_case")]
pub enum FailureStage {
    /// TCP/SSH connection or authentication.
    Connect,
    /// Entering privileged mode.
    Enable,
    /// A collection command; holds the command text.
    Step(String),
    /// The worker task itself panicked or was aborted.
    Worker,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Connect => f.write_str("connect"),
            FailureStage::Enable => f.write_str("enable"),
            FailureStage::Step(command) => write!(f, "'{command}'"),
            FailureStage::Worker => f.write_str("worker"),
        }
    }
}

/// Final state of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Completed,
    Failed { stage: FailureStage, cause: String },
}

/// Everything one device contributed to the run.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceOutcome {
    pub target: DeviceTarget,
    pub status: DeviceStatus,
    /// Records collected before completion or failure.
    pub tables: RecordTables,
    pub elapsed: Duration,
}

impl DeviceOutcome {
    /// A failed outcome with no records.
    pub fn failed(target: DeviceTarget, stage: FailureStage, cause: impl Into<String>) -> Self {
        Self {
            target,
            status: DeviceStatus::Failed {
                stage,
                cause: cause.into(),
            },
            tables: RecordTables::default(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeviceStatus::Completed
    }
}

/// A step whose command broke the session.
#[derive(Debug)]
struct StepFailure {
    command: String,
    error: Error,
}

/// Runs the role-specific command sequence against one device.
pub struct DeviceCollector<C, P> {
    connector: Arc<C>,
    parser: Arc<P>,
    registry: Arc<VrfRegistry>,
}

impl<C, P> Clone for DeviceCollector<C, P> {
    fn clone(&self) -> Self {
        Self {
            connector: self.connector.clone(),
            parser: self.parser.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<C: SessionConnector, P: RecordParser> DeviceCollector<C, P> {
    pub fn new(connector: Arc<C>, parser: Arc<P>, registry: Arc<VrfRegistry>) -> Self {
        Self {
            connector,
            parser,
            registry,
        }
    }

    /// The VRF registry router collectors write to.
    pub fn registry(&self) -> &Arc<VrfRegistry> {
        &self.registry
    }

    /// Collect from one device. Never fails; failures are reported in the outcome.
    pub async fn collect(&self, target: DeviceTarget) -> DeviceOutcome {
        let start = Instant::now();
        let mut tables = RecordTables::default();
        let status = self.run(&target, &mut tables).await;

        DeviceOutcome {
            target,
            status,
            tables,
            elapsed: start.elapsed(),
        }
    }

    async fn run(&self, target: &DeviceTarget, tables: &mut RecordTables) -> DeviceStatus {
        let mut session = match self.connector.connect(target).await {
            Ok(session) => session,
            Err(e) => {
                return DeviceStatus::Failed {
                    stage: FailureStage::Connect,
                    cause: e.to_string(),
                };
            }
        };

        if let Err(e) = session.enable().await {
            if let Err(close_err) = session.disconnect().await {
                debug!("{}: disconnect after enable failure: {}", target.host, close_err);
            }
            return DeviceStatus::Failed {
                stage: FailureStage::Enable,
                cause: e.to_string(),
            };
        }

        self.prime(&mut session, target).await;

        let sequence = match target.role {
            Role::Router => self.collect_router(&mut session, target, tables).await,
            Role::Switch => self.collect_switch(&mut session, target, tables).await,
        };

        if let Err(e) = session.disconnect().await {
            warn!("{}: disconnect failed: {}", target.host, e);
        }

        match sequence {
            Ok(()) => DeviceStatus::Completed,
            Err(failure) => DeviceStatus::Failed {
                stage: FailureStage::Step(failure.command),
                cause: failure.error.to_string(),
            },
        }
    }

    /// Paging and terminal normalization. Failures are logged and ignored.
    async fn prime(&self, session: &mut C::Session, target: &DeviceTarget) {
        // Commands an older release does not know are expected to be rejected.
        for command in session.prime_commands() {
            let command = command.as_str();
            match session.send_command(command).await {
                Ok(response) if !response.is_success() => {
                    debug!("{}: '{}' not supported", target.host, command);
                }
                Ok(_) => {}
                Err(e) => warn!("{}: priming with '{}' failed: {}", target.host, command, e),
            }
        }
    }

    async fn collect_router(
        &self,
        session: &mut C::Session,
        target: &DeviceTarget,
        tables: &mut RecordTables,
    ) -> Result<(), StepFailure> {
        let mut discovered = HashSet::new();
        for mut record in self
            .run_step(session, target, "show ip vrf", TemplateId::VrfList)
            .await?
        {
            if let Some(vrf_id) = record.get(fields::VRF_ID).filter(|id| !id.is_empty()) {
                self.registry.add(vrf_id.clone());
                discovered.insert(vrf_id.clone());
            }
            tag_device(&mut record, target);
            tables.vrf_entries.push(record);
        }

        // Read back after this device's own inserts. IDs other routers added
        // in the meantime are not queried here.
        let own_ids = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|id| discovered.contains(id));
        for vrf_id in own_ids {
            let command = format!("show ip arp vrfid {vrf_id}");
            for mut record in self
                .run_step(session, target, &command, TemplateId::ArpByVrf)
                .await?
            {
                record.insert(fields::VRF_ID.to_string(), vrf_id.clone());
                tag_device(&mut record, target);
                tables.arp.push(record);
            }
        }

        for mut record in self
            .run_step(
                session,
                target,
                "show running-config module vlan",
                TemplateId::VlanConfig,
            )
            .await?
        {
            tag_device(&mut record, target);
            tables.vlan_config.push(record);
        }

        for mut record in self
            .run_step(session, target, "show vlan advance", TemplateId::VlanAdvance)
            .await?
        {
            tag_device(&mut record, target);
            tables.vlan_advance.push(record);
        }

        Ok(())
    }

    async fn collect_switch(
        &self,
        session: &mut C::Session,
        target: &DeviceTarget,
        tables: &mut RecordTables,
    ) -> Result<(), StepFailure> {
        let mac_table = self
            .run_step(session, target, "show mac-address-table", TemplateId::MacTable)
            .await?;
        tables.mac_table.extend(mac_table);

        let port_list = self
            .run_step(session, target, "show interface name", TemplateId::InterfaceNames)
            .await?;
        tables
            .port_list
            .extend(port_list.into_iter().map(split_unit_port));

        let port_status = self
            .run_step(session, target, "show interfaces", TemplateId::InterfaceStatus)
            .await?;
        tables
            .port_status
            .extend(port_status.into_iter().map(split_unit_port));

        Ok(())
    }

    /// Send one command and parse its output.
    async fn run_step(
        &self,
        session: &mut C::Session,
        target: &DeviceTarget,
        command: &str,
        template: TemplateId,
    ) -> Result<Vec<Record>, StepFailure> {
        let response = session
            .send_command(command)
            .await
            .map_err(|error| StepFailure {
                command: command.to_string(),
                error,
            })?;

        if let Some(message) = &response.failure_message {
            warn!("{}: '{}' rejected by device ({})", target.host, command, message);
            return Ok(vec![]);
        }

        match self.parser.parse(&response.result, template) {
            Ok(records) => {
                debug!(
                    "{}: '{}' -> {} record(s) in {:?}",
                    target.host,
                    command,
                    records.len(),
                    response.elapsed
                );
                Ok(records)
            }
            Err(e) => {
                warn!("{}: could not parse '{}': {}", target.host, command, e);
                Ok(vec![])
            }
        }
    }
}

fn tag_device(record: &mut Record, target: &DeviceTarget) {
    record.insert(fields::DEVICE.to_string(), target.host.clone());
}

/// Split a combined `UNIT_PORT` value (`"1/12"`) into `UNIT` and `PORT`.
///
/// Values without exactly one `/` leave `UNIT` empty and become the `PORT`.
/// Records without a `UNIT_PORT` value are returned unchanged.
pub fn split_unit_port(mut record: Record) -> Record {
    let Some(unit_port) = record
        .get(fields::UNIT_PORT)
        .filter(|value| !value.is_empty())
        .cloned()
    else {
        return record;
    };

    let (unit, port) = match unit_port.split_once('/') {
        Some((unit, port)) if !port.contains('/') => (unit.to_string(), port.to_string()),
        _ => (String::new(), unit_port),
    };
    record.insert(fields::UNIT.to_string(), unit);
    record.insert(fields::PORT.to_string(), port);
    record
}
