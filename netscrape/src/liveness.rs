//! ICMP reachability checks for addresses found by correlation.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use log::{debug, info, trace, warn};
use serde::Serialize;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::ProbeError;

/// Echo requests sent per address.
pub const PROBE_COUNT: u8 = 4;

/// Upper bound on one address's whole probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of addresses probed at once.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 64;

const PAYLOAD: [u8; 56] = [0; 56];

/// Reachability classification of one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PingStatus {
    /// Every echo request was answered.
    Good,
    /// At least one request went unanswered, or the probe could not run.
    Bad,
}

impl fmt::Display for PingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingStatus::Good => f.write_str("Good"),
            PingStatus::Bad => f.write_str("Bad"),
        }
    }
}

/// Replies received for one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub sent: u8,
    pub received: u8,
}

/// Sends echo requests to one address.
pub trait ReachabilityProbe: Send + Sync + 'static {
    fn probe(
        &self,
        addr: IpAddr,
        count: u8,
        timeout: Duration,
    ) -> impl Future<Output = Result<ProbeReport, ProbeError>> + Send;
}

/// `Good` only when all `expected` replies arrived.
pub fn classify(report: &Result<ProbeReport, ProbeError>, expected: u8) -> PingStatus {
    match report {
        Ok(report) if report.received >= expected && expected > 0 => PingStatus::Good,
        _ => PingStatus::Bad,
    }
}

/// ICMP echo via `surge-ping`.
///
/// Raw or datagram ICMP sockets need privileges on most systems. A family
/// whose socket could not be opened makes every probe to it fail, which the
/// prober classifies as `Bad`.
pub struct IcmpProbe {
    v4: Option<Client>,
    v6: Option<Client>,
    next_id: AtomicU16,
}

impl IcmpProbe {
    /// Open ICMP sockets. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let v4 = Client::new(&Config::default())
            .map_err(|e| warn!("ICMPv4 client unavailable: {}", e))
            .ok();
        let v6 = Client::new(&Config::builder().kind(ICMP::V6).build())
            .map_err(|e| debug!("ICMPv6 client unavailable: {}", e))
            .ok();

        Self {
            v4,
            v6,
            next_id: AtomicU16::new(std::process::id() as u16),
        }
    }
}

impl Default for IcmpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityProbe for IcmpProbe {
    async fn probe(
        &self,
        addr: IpAddr,
        count: u8,
        timeout: Duration,
    ) -> Result<ProbeReport, ProbeError> {
        let client = match addr {
            IpAddr::V4(_) => self.v4.as_ref().ok_or(ProbeError::ClientUnavailable("IPv4"))?,
            IpAddr::V6(_) => self.v6.as_ref().ok_or(ProbeError::ClientUnavailable("IPv6"))?,
        };

        let identifier = PingIdentifier(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut pinger = client.pinger(addr, identifier).await;
        pinger.timeout(timeout / u32::from(count.max(1)));

        let mut received = 0;
        for sequence in 0..count {
            match pinger.ping(PingSequence(u16::from(sequence)), &PAYLOAD).await {
                Ok((_, rtt)) => {
                    trace!("{}: reply {} in {:?}", addr, sequence, rtt);
                    received += 1;
                }
                Err(e) => trace!("{}: request {} failed: {}", addr, sequence, e),
            }
        }

        Ok(ProbeReport {
            sent: count,
            received,
        })
    }
}

/// Probes many addresses with bounded concurrency.
pub struct LivenessProber<R> {
    probe: Arc<R>,
    count: u8,
    timeout: Duration,
    concurrency: usize,
}

impl<R: ReachabilityProbe> LivenessProber<R> {
    pub fn new(probe: R) -> Self {
        Self {
            probe: Arc::new(probe),
            count: PROBE_COUNT,
            timeout: PROBE_TIMEOUT,
            concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }

    /// Limit simultaneous probes. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Classify every target. Never fails; every target gets a status.
    pub async fn probe_all(&self, targets: &[String]) -> HashMap<String, PingStatus> {
        if targets.is_empty() {
            return HashMap::new();
        }
        info!(
            "Probing {} address(es), {} at a time",
            targets.len(),
            self.concurrency
        );

        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for target in targets.iter().cloned() {
            let probe = self.probe.clone();
            let limiter = limiter.clone();
            let (count, timeout) = (self.count, self.timeout);
            tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await.ok();
                let status = probe_target(probe.as_ref(), &target, count, timeout).await;
                (target, status)
            });
        }

        let mut results = HashMap::with_capacity(targets.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((target, status)) => {
                    results.insert(target, status);
                }
                Err(e) => warn!("Probe task aborted: {}", e),
            }
        }

        // An aborted task leaves its address unclassified.
        for target in targets {
            results.entry(target.clone()).or_insert(PingStatus::Bad);
        }

        let good = results.values().filter(|s| **s == PingStatus::Good).count();
        info!("{} of {} address(es) reachable", good, results.len());
        results
    }
}

async fn probe_target<R: ReachabilityProbe>(
    probe: &R,
    target: &str,
    count: u8,
    timeout: Duration,
) -> PingStatus {
    let report = match target.parse::<IpAddr>() {
        Ok(addr) => tokio::time::timeout(timeout, probe.probe(addr, count, timeout))
            .await
            .unwrap_or(Err(ProbeError::Timeout(timeout))),
        Err(_) => Err(ProbeError::InvalidAddress(target.to_string())),
    };

    if let Err(e) = &report {
        debug!("{}: {}", target, e);
    }
    classify(&report, count)
}
