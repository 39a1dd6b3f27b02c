//! Device inventory: the router and switch host lists.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{InventoryError, Result};

/// What a device is collected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// VRF, ARP, VLAN configuration and VLAN-advance tables.
    Router,
    /// MAC table, interface names and port status.
    Switch,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Router => f.write_str("router"),
            Role::Switch => f.write_str("switch"),
        }
    }
}

/// One device to collect from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceTarget {
    /// Hostname or IP address.
    pub host: String,
    pub role: Role,
}

impl DeviceTarget {
    pub fn new(host: impl Into<String>, role: Role) -> Self {
        Self {
            host: host.into(),
            role,
        }
    }

    pub fn router(host: impl Into<String>) -> Self {
        Self::new(host, Role::Router)
    }

    pub fn switch(host: impl Into<String>) -> Self {
        Self::new(host, Role::Switch)
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.host, self.role)
    }
}

/// Parse a newline-delimited host list.
///
/// Blank lines and `#` comments are skipped; surrounding whitespace is trimmed.
pub fn parse_host_list(text: &str, role: Role) -> Vec<DeviceTarget> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|host| DeviceTarget::new(host, role))
        .collect()
}

/// Read one host list file.
pub fn read_host_list(path: &Path, role: Role) -> Result<Vec<DeviceTarget>> {
    let text = fs::read_to_string(path).map_err(|source| InventoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_host_list(&text, role))
}

/// Load routers then switches into a single target list.
pub fn load_inventory(routers: &Path, switches: &Path) -> Result<Vec<DeviceTarget>> {
    let mut targets = read_host_list(routers, Role::Router)?;
    targets.extend(read_host_list(switches, Role::Switch)?);
    Ok(targets)
}
