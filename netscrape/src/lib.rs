//! # Netscrape
//!
//! Concurrent SSH collector for Extreme/Avaya ERS and VOSS networks.
//!
//! Netscrape logs into every router and switch in an inventory, runs a fixed
//! set of `show` commands, parses the output with TextFSM templates and joins
//! the results into one row per switch port and learned MAC address:
//!
//! ```text
//! UNIT  PORT  NAME    VLAN  MAC                IP_ADDRESS  OPER  SPEED    PING_STATUS  VRF_ID
//! 1     1     server  30    00-11-22-33-44-55  10.1.1.10   Up    1000Mbps Good         1
//! ```
//!
//! The VLAN configuration, VRF list and VLAN-advance tables from the routers
//! are exported alongside it.
//!
//! ## Stages
//!
//! - [`coordinator`] runs a [`collector::DeviceCollector`] per device with
//!   bounded concurrency. Each device returns its own [`collector::RecordTables`].
//! - [`correlate`] joins switch ports, MAC table, ARP and port status.
//! - [`liveness`] probes the resolved addresses over ICMP.
//! - [`normalize`] deduplicates and sorts the auxiliary tables.
//! - [`export`] writes a styled XLSX workbook, CSV or JSON.
//!
//! [`pipeline::Pipeline`] wires them together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netscrape::{
//!     AuthMethod, Coordinator, DeviceCollector, DeviceTarget, IcmpProbe, LivenessProber,
//!     Pipeline, SessionSettings, SshConnector, TextFsmParser, VrfRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let auth = AuthMethod::Password("secret".to_string().into());
//!     let settings = SessionSettings::new("admin", auth);
//!     let collector = DeviceCollector::new(
//!         Arc::new(SshConnector::new(settings)),
//!         Arc::new(TextFsmParser::new()),
//!         Arc::new(VrfRegistry::new()),
//!     );
//!     let pipeline = Pipeline::new(Coordinator::new(collector))
//!         .with_prober(LivenessProber::new(IcmpProbe::new()));
//!
//!     let output = pipeline
//!         .run(vec![DeviceTarget::router("10.0.0.1"), DeviceTarget::switch("10.0.0.2")])
//!         .await;
//!     println!("{}", output.report);
//! }
//! ```

pub mod channel;
pub mod cli;
pub mod collector;
pub mod config;
pub mod coordinator;
pub mod correlate;
pub mod error;
pub mod export;
pub mod inventory;
pub mod liveness;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use collector::{DeviceCollector, DeviceOutcome, DeviceStatus, RecordTables};
pub use coordinator::Coordinator;
pub use correlate::UnifiedPortRecord;
pub use error::Error;
pub use export::{ExportBundle, ExportFormat, Exporter};
pub use inventory::{DeviceTarget, Role};
pub use liveness::{IcmpProbe, LivenessProber, PingStatus, ReachabilityProbe};
pub use parser::{Record, RecordParser, TemplateId, TextFsmParser};
pub use pipeline::{Pipeline, RunReport};
pub use registry::VrfRegistry;
pub use session::{DeviceSession, SessionConnector, SessionSettings, SshConnector};
pub use transport::{AuthMethod, SshConfig};
