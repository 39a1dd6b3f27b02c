//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::export::ExportFormat;

/// Collect port, MAC, ARP and VLAN data from ERS/VOSS routers and switches
/// and export a unified per-port inventory.
#[derive(Parser, Debug, Default)]
#[command(name = "netscrape", author, version, about, long_about = None)]
pub struct Cli {
    /// TOML file supplying any of the options below
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Router host list, one per line [default: Router.txt]
    #[arg(long, value_name = "FILE")]
    pub routers: Option<PathBuf>,

    /// Switch host list, one per line [default: Switch.txt]
    #[arg(long, value_name = "FILE")]
    pub switches: Option<PathBuf>,

    /// SSH username
    #[arg(short, long, env = "NETSCRAPE_USERNAME")]
    pub username: Option<String>,

    /// SSH password, also used for enable when no enable password is set
    #[arg(long, env = "NETSCRAPE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Enable password
    #[arg(long, env = "NETSCRAPE_ENABLE_PASSWORD", hide_env_values = true)]
    pub enable_password: Option<String>,

    /// Private key used instead of a password
    #[arg(long, value_name = "FILE")]
    pub private_key: Option<PathBuf>,

    /// SSH port [default: 22]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Output file [default: netscrape_<timestamp>.<format>]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format [default: xlsx]
    #[arg(short, long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Devices collected at once [default: 100]
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Addresses probed at once [default: 64]
    #[arg(long)]
    pub probe_concurrency: Option<usize>,

    /// Skip ICMP reachability checks
    #[arg(long)]
    pub no_ping: bool,

    /// Directory of TextFSM templates overriding the built-in ones
    #[arg(long, value_name = "DIR")]
    pub template_dir: Option<PathBuf>,

    /// Write discovered VRF IDs to this file
    #[arg(long, value_name = "FILE")]
    pub vrf_snapshot: Option<PathBuf>,

    /// Write each device's raw session to log_<host>.txt in this directory
    #[arg(long, value_name = "DIR")]
    pub session_log_dir: Option<PathBuf>,

    /// Seconds to wait for each command's prompt [default: 60]
    #[arg(long, value_name = "SECS")]
    pub command_timeout: Option<u64>,

    /// Seconds to wait for the SSH connection [default: 30]
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Verify host keys against ~/.ssh/known_hosts
    #[arg(long)]
    pub strict_host_keys: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
