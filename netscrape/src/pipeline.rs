//! One full run: collect, merge, correlate, probe, normalize.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::collector::{DeviceOutcome, DeviceStatus, RecordTables};
use crate::coordinator::Coordinator;
use crate::correlate::{apply_ping_results, correlate, distinct_addresses};
use crate::export::ExportBundle;
use crate::inventory::DeviceTarget;
use crate::liveness::{LivenessProber, PingStatus, ReachabilityProbe};
use crate::normalize::AuxiliaryTables;
use crate::parser::RecordParser;
use crate::session::SessionConnector;

/// Per-run counts for the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub devices: usize,
    pub succeeded: usize,
    /// `(host, reason)` of every failed device.
    pub failures: Vec<(String, String)>,
    pub unified_rows: usize,
    pub probed: usize,
    pub reachable: usize,
    /// `(table, error)` of every auxiliary table that failed normalization.
    pub skipped_tables: Vec<(&'static str, String)>,
    pub elapsed: Duration,
}

impl RunReport {
    fn new(outcomes: &[DeviceOutcome], bundle: &ExportBundle, elapsed: Duration) -> Self {
        let failures = outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                DeviceStatus::Completed => None,
                DeviceStatus::Failed { stage, cause } => Some((
                    outcome.target.host.clone(),
                    format!("{stage}: {cause}"),
                )),
            })
            .collect::<Vec<_>>();

        let probed: Vec<_> = bundle
            .ports
            .iter()
            .filter_map(|row| Some((row.ip_address.as_deref()?, row.ping_status?)))
            .collect::<std::collections::HashMap<_, _>>()
            .into_values()
            .collect();

        Self {
            devices: outcomes.len(),
            succeeded: outcomes.len() - failures.len(),
            failures,
            unified_rows: bundle.ports.len(),
            probed: probed.len(),
            reachable: probed.iter().filter(|s| **s == PingStatus::Good).count(),
            skipped_tables: bundle
                .auxiliary
                .named()
                .into_iter()
                .filter_map(|(name, table)| table.as_ref().err().map(|e| (name, e.to_string())))
                .collect(),
            elapsed,
        }
    }

    /// Nothing was collected from any device.
    pub fn is_total_failure(&self) -> bool {
        self.devices > 0 && self.succeeded == 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} of {} device(s) collected in {:.1?}",
            self.succeeded, self.devices, self.elapsed
        )?;
        for (host, reason) in &self.failures {
            writeln!(f, "  failed: {host} ({reason})")?;
        }
        writeln!(f, "{} unified row(s)", self.unified_rows)?;
        if self.probed > 0 {
            writeln!(f, "{} of {} address(es) reachable", self.reachable, self.probed)?;
        }
        for (table, error) in &self.skipped_tables {
            writeln!(f, "  not exported: {table} ({error})")?;
        }
        Ok(())
    }
}

/// Result of [`Pipeline::run`].
#[derive(Debug)]
pub struct RunOutput {
    pub outcomes: Vec<DeviceOutcome>,
    pub bundle: ExportBundle,
    pub report: RunReport,
}

/// Wires the stages together.
pub struct Pipeline<C, P, R> {
    coordinator: Coordinator<C, P>,
    prober: Option<LivenessProber<R>>,
    vrf_snapshot: Option<PathBuf>,
}

impl<C, P, R> Pipeline<C, P, R>
where
    C: SessionConnector,
    P: RecordParser,
    R: ReachabilityProbe,
{
    pub fn new(coordinator: Coordinator<C, P>) -> Self {
        Self {
            coordinator,
            prober: None,
            vrf_snapshot: None,
        }
    }

    /// Probe resolved addresses after correlation.
    pub fn with_prober(mut self, prober: LivenessProber<R>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Write the VRF ID snapshot to `path` once collection finishes.
    pub fn with_vrf_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.vrf_snapshot = Some(path.into());
        self
    }

    pub async fn run(&self, targets: Vec<DeviceTarget>) -> RunOutput {
        let start = Instant::now();

        let outcomes = self.coordinator.run(targets).await;
        let tables = RecordTables::merge(&outcomes);
        info!(
            "Collection finished: {} record(s) from {} device(s)",
            tables.record_count(),
            outcomes.len()
        );

        if let Some(path) = &self.vrf_snapshot {
            let registry = self.coordinator.collector().registry();
            match registry.write_snapshot(path) {
                Ok(()) => info!("Wrote {} VRF ID(s) to {}", registry.len(), path.display()),
                Err(e) => warn!("Could not write VRF snapshot {}: {}", path.display(), e),
            }
        }

        let mut ports = correlate(
            &tables.port_list,
            &tables.mac_table,
            &tables.arp,
            &tables.port_status,
        );

        if let Some(prober) = &self.prober {
            let addresses = distinct_addresses(&ports);
            let results = prober.probe_all(&addresses).await;
            apply_ping_results(&mut ports, &results);
        }

        let bundle = ExportBundle {
            ports,
            auxiliary: AuxiliaryTables::build(&tables),
        };
        let report = RunReport::new(&outcomes, &bundle, start.elapsed());

        RunOutput {
            outcomes,
            bundle,
            report,
        }
    }
}
