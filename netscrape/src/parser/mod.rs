//! Command output parsing into field-named records.
//!
//! A [`Record`] is one parsed output line: an ordered map from upper-case
//! field name to value, in template declaration order. Downstream stages rely
//! on the field names listed in [`fields`].

mod textfsm;

pub use textfsm::TextFsmParser;

use std::fmt;

use indexmap::IndexMap;

use crate::error::ParseError;

/// One parsed output line.
pub type Record = IndexMap<String, String>;

/// Field names emitted by the templates or added by the collector.
pub mod fields {
    pub const UNIT: &str = "UNIT";
    pub const PORT: &str = "PORT";
    pub const UNIT_PORT: &str = "UNIT_PORT";
    pub const NAME: &str = "NAME";
    pub const MAC_ADDRESS: &str = "MAC_ADDRESS";
    pub const VID: &str = "VID";
    pub const IP_ADDRESS: &str = "IP_ADDRESS";
    pub const VRF_ID: &str = "VRF_ID";
    pub const VRF_NAME: &str = "VRF_NAME";
    pub const OPER_STATUS: &str = "OPER_STATUS";
    pub const SPEED: &str = "SPEED";
    pub const VLAN_ID: &str = "VLAN_ID";
    pub const SUBNET_MASK: &str = "SUBNET_MASK";
    pub const IP: &str = "IP";
    pub const PREFIX: &str = "PREFIX";
    /// Added by the collector to router-originated records.
    pub const DEVICE: &str = "DEVICE";
}

/// The template used for each collection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    /// `show ip vrf`
    VrfList,
    /// `show ip arp vrfid <id>`
    ArpByVrf,
    /// `show running-config module vlan`
    VlanConfig,
    /// `show vlan advance`
    VlanAdvance,
    /// `show mac-address-table`
    MacTable,
    /// `show interface name`
    InterfaceNames,
    /// `show interfaces`
    InterfaceStatus,
}

impl TemplateId {
    pub const ALL: [TemplateId; 7] = [
        TemplateId::VrfList,
        TemplateId::ArpByVrf,
        TemplateId::VlanConfig,
        TemplateId::VlanAdvance,
        TemplateId::MacTable,
        TemplateId::InterfaceNames,
        TemplateId::InterfaceStatus,
    ];

    /// File name of the template, used for on-disk overrides.
    pub fn file_name(self) -> &'static str {
        match self {
            TemplateId::VrfList => "extreme_ers_show_ip_vrf.textfsm",
            TemplateId::ArpByVrf => "extreme_ers_show_ip_arp_vrfid.textfsm",
            TemplateId::VlanConfig => "extreme_ers_show_running_config_vlan.textfsm",
            TemplateId::VlanAdvance => "extreme_ers_show_vlan_advance.textfsm",
            TemplateId::MacTable => "extreme_ers_show_mac-address-table.textfsm",
            TemplateId::InterfaceNames => "extreme_ers_show_interface_name.textfsm",
            TemplateId::InterfaceStatus => "extreme_ers_show_interfaces.textfsm",
        }
    }

    /// Template text shipped with the binary.
    pub fn builtin(self) -> &'static str {
        match self {
            TemplateId::VrfList => include_str!("../../templates/extreme_ers_show_ip_vrf.textfsm"),
            TemplateId::ArpByVrf => {
                include_str!("../../templates/extreme_ers_show_ip_arp_vrfid.textfsm")
            }
            TemplateId::VlanConfig => {
                include_str!("../../templates/extreme_ers_show_running_config_vlan.textfsm")
            }
            TemplateId::VlanAdvance => {
                include_str!("../../templates/extreme_ers_show_vlan_advance.textfsm")
            }
            TemplateId::MacTable => {
                include_str!("../../templates/extreme_ers_show_mac-address-table.textfsm")
            }
            TemplateId::InterfaceNames => {
                include_str!("../../templates/extreme_ers_show_interface_name.textfsm")
            }
            TemplateId::InterfaceStatus => {
                include_str!("../../templates/extreme_ers_show_interfaces.textfsm")
            }
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Turns raw command output into records.
///
/// Output that matches no template line yields an empty vector, not an error.
pub trait RecordParser: Send + Sync + 'static {
    fn parse(&self, output: &str, template: TemplateId) -> Result<Vec<Record>, ParseError>;
}
