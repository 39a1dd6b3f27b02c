//! Bounded concurrent collection across the inventory.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use log::{error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::collector::{DeviceCollector, DeviceOutcome, DeviceStatus, FailureStage};
use crate::inventory::DeviceTarget;
use crate::parser::RecordParser;
use crate::session::SessionConnector;

/// Default number of devices collected at once.
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Runs one collector per device with at most `concurrency` in flight.
pub struct Coordinator<C, P> {
    collector: DeviceCollector<C, P>,
    concurrency: usize,
}

impl<C: SessionConnector, P: RecordParser> Coordinator<C, P> {
    pub fn new(collector: DeviceCollector<C, P>) -> Self {
        Self {
            collector,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit the number of simultaneous device sessions. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn collector(&self) -> &DeviceCollector<C, P> {
        &self.collector
    }

    /// Collect from every target and wait for all of them.
    ///
    /// Outcomes are returned in input order. A device that fails, or whose
    /// worker panics, produces a failed outcome without affecting the others.
    pub async fn run(&self, targets: Vec<DeviceTarget>) -> Vec<DeviceOutcome> {
        if targets.is_empty() {
            warn!("No devices to collect from");
            return vec![];
        }

        info!(
            "Collecting from {} device(s), {} at a time",
            targets.len(),
            self.concurrency
        );

        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, target) in targets.iter().cloned().enumerate() {
            let collector = self.collector.clone();
            let limiter = limiter.clone();
            tasks.spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let _permit = limiter.acquire_owned().await.ok();
                let outcome = AssertUnwindSafe(collector.collect(target.clone()))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        DeviceOutcome::failed(target, FailureStage::Worker, panic_message(&*panic))
                    });
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<DeviceOutcome>> = targets.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    log_outcome(&outcome);
                    slots[index] = Some(outcome);
                }
                Err(e) => error!("Device worker aborted: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(targets)
            .map(|(slot, target)| {
                slot.unwrap_or_else(|| {
                    DeviceOutcome::failed(target, FailureStage::Worker, "worker task aborted")
                })
            })
            .collect()
    }
}

fn log_outcome(outcome: &DeviceOutcome) {
    let host = &outcome.target.host;
    let records = outcome.tables.record_count();
    match &outcome.status {
        DeviceStatus::Completed => {
            info!("{}: {} record(s) in {:.1?}", host, records, outcome.elapsed);
        }
        DeviceStatus::Failed { stage, cause } => {
            error!(
                "{}: failed at {}: {} ({} record(s) kept)",
                host, stage, cause, records
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
