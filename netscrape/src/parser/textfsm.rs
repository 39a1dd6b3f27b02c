//! TextFSM-backed record parser.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, info};
use textfsm_rust::Template;

use super::{Record, RecordParser, TemplateId};
use crate::error::ParseError;

/// Value options that may precede the value name in a template.
const VALUE_OPTIONS: &[&str] = &["Filldown", "Fillup", "Key", "List", "Required"];

/// Parses output with TextFSM templates, built-in or loaded from a directory.
#[derive(Debug, Clone)]
pub struct TextFsmParser {
    templates: HashMap<TemplateId, String>,
}

impl TextFsmParser {
    /// Parser using the templates compiled into the binary.
    pub fn new() -> Self {
        let templates = TemplateId::ALL
            .iter()
            .map(|id| (*id, id.builtin().to_string()))
            .collect();
        Self { templates }
    }

    /// Parser preferring templates found in `dir` (matched by file name),
    /// falling back to the built-in ones.
    pub fn with_template_dir(dir: &Path) -> Result<Self, ParseError> {
        let mut parser = Self::new();
        for id in TemplateId::ALL {
            let path = dir.join(id.file_name());
            if !path.is_file() {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|source| ParseError::Read {
                path: path.clone(),
                source,
            })?;
            info!("Using template override {}", path.display());
            parser.templates.insert(id, text);
        }
        Ok(parser)
    }

    fn source(&self, id: TemplateId) -> &str {
        self.templates
            .get(&id)
            .map(String::as_str)
            .unwrap_or_else(|| id.builtin())
    }
}

impl Default for TextFsmParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser for TextFsmParser {
    fn parse(&self, output: &str, template_id: TemplateId) -> Result<Vec<Record>, ParseError> {
        let source = self.source(template_id);

        let template = Template::parse_str(source).map_err(|e| ParseError::Template {
            template: template_id.to_string(),
            message: e.to_string(),
        })?;
        let mut parser = template.parser();
        let rows = parser
            .parse_text_to_dicts(output)
            .map_err(|e| ParseError::Output {
                template: template_id.to_string(),
                message: e.to_string(),
            })?;

        let header = value_names(source);
        let records: Vec<Record> = rows
            .into_iter()
            .map(|row| order_fields(&header, row))
            .collect();

        debug!("{}: {} record(s)", template_id, records.len());
        Ok(records)
    }
}

/// Value names declared by a template, upper-cased, in declaration order.
pub(crate) fn value_names(template: &str) -> Vec<String> {
    template
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("Value "))
        .filter_map(|rest| {
            let mut tokens = rest.split_whitespace();
            let first = tokens.next()?;
            let is_options = first
                .split(',')
                .all(|option| VALUE_OPTIONS.contains(&option));
            let name = if is_options { tokens.next()? } else { first };
            Some(name.to_ascii_uppercase())
        })
        .collect()
}

/// Re-key a parsed row into a [`Record`] following the template's value order.
fn order_fields(header: &[String], row: HashMap<String, String>) -> Record {
    let mut by_name: HashMap<String, String> = row
        .into_iter()
        .map(|(name, value)| (name.to_ascii_uppercase(), value))
        .collect();

    let mut record = Record::with_capacity(by_name.len());
    for name in header {
        if let Some(value) = by_name.remove(name) {
            record.insert(name.clone(), value.trim().to_string());
        }
    }
    // Anything the header scan missed keeps a stable, if arbitrary, position.
    let mut rest: Vec<_> = by_name.into_iter().collect();
    rest.sort();
    for (name, value) in rest {
        record.insert(name, value.trim().to_string());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::fields;

    #[test]
    fn test_value_names_skip_options() {
        let template = "Value Required VLAN_ID (\\d+)\nValue Filldown,Key name (\\S+)\nValue IP (\\S+)\n\nStart\n";
        assert_eq!(value_names(template), vec!["VLAN_ID", "NAME", "IP"]);
    }

    #[test]
    fn test_builtin_templates_declare_contract_fields() {
        let vrf = value_names(TemplateId::VrfList.builtin());
        assert!(vrf.contains(&fields::VRF_NAME.to_string()));
        assert!(vrf.contains(&fields::VRF_ID.to_string()));

        let arp = value_names(TemplateId::ArpByVrf.builtin());
        assert!(arp.contains(&fields::IP_ADDRESS.to_string()));
        assert!(arp.contains(&fields::MAC_ADDRESS.to_string()));

        let mac = value_names(TemplateId::MacTable.builtin());
        for field in [fields::UNIT, fields::PORT, fields::VID, fields::MAC_ADDRESS] {
            assert!(mac.contains(&field.to_string()), "mac table missing {field}");
        }

        let names = value_names(TemplateId::InterfaceNames.builtin());
        for field in [fields::UNIT, fields::PORT, fields::NAME] {
            assert!(names.contains(&field.to_string()), "interface names missing {field}");
        }

        let status = value_names(TemplateId::InterfaceStatus.builtin());
        for field in [fields::UNIT_PORT, fields::OPER_STATUS, fields::SPEED] {
            assert!(status.contains(&field.to_string()), "interfaces missing {field}");
        }

        let vlan = value_names(TemplateId::VlanConfig.builtin());
        for field in [fields::VLAN_ID, fields::IP, fields::SUBNET_MASK] {
            assert!(vlan.contains(&field.to_string()), "vlan config missing {field}");
        }

        let advance = value_names(TemplateId::VlanAdvance.builtin());
        assert!(advance.contains(&fields::VLAN_ID.to_string()));
    }

    #[test]
    fn test_order_fields_follows_header() {
        let header = vec!["VRF_NAME".to_string(), "VRF_ID".to_string()];
        let row = HashMap::from([
            ("vrf_id".to_string(), "1 ".to_string()),
            ("vrf_name".to_string(), "corp_users".to_string()),
        ]);
        let record = order_fields(&header, row);
        let keys: Vec<_> = record.keys().cloned().collect();
        assert_eq!(keys, vec!["VRF_NAME", "VRF_ID"]);
        assert_eq!(record["VRF_ID"], "1");
    }

    #[test]
    fn test_parse_vrf_list() {
        let output = "\
================================================================================
                                 VRF INFORMATION
================================================================================
VRF                              VRF    VRRP    RIP     OSPF    BGP     PIM
NAME                             ID     COUNT   COUNT   COUNT   COUNT   COUNT
--------------------------------------------------------------------------------
GlobalRouter                     0      2       0       1       0       0
corp_users                       1      18      0       0       0       1
pci_vrf                          2      1       0       0       0       0
";
        let parser = TextFsmParser::new();
        let records = parser.parse(output, TemplateId::VrfList).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r[fields::VRF_ID].as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert_eq!(records[1][fields::VRF_NAME], "corp_users");
    }

    fn parse(output: &str, id: TemplateId) -> Vec<Record> {
        TextFsmParser::new().parse(output, id).unwrap()
    }

    fn column<'a>(records: &'a [Record], field: &str) -> Vec<&'a str> {
        records.iter().map(|r| r[field].as_str()).collect()
    }

    #[test]
    fn test_parse_mac_table_two_entries_per_line() {
        let output = "\
Mac Address Table Aging Time: 300
Number of addresses: 4

   MAC Address    Vid  Source           MAC Address    Vid  Source
-----------------  ---- ---------        -----------------  ---- ---------
00-00-5E-00-01-01    1   Port: 1/48     00-00-5E-00-01-03    1   Port: 1/48
00-1B-4F-AA-BB-CC   10   Port: 1/5
F8-15-47-11-22-33   20   Port: 12
";
        let records = parse(output, TemplateId::MacTable);

        assert_eq!(
            column(&records, fields::MAC_ADDRESS),
            vec![
                "00-00-5E-00-01-01",
                "00-00-5E-00-01-03",
                "00-1B-4F-AA-BB-CC",
                "F8-15-47-11-22-33"
            ]
        );
        assert_eq!(column(&records, fields::VID), vec!["1", "1", "10", "20"]);
        assert_eq!(column(&records, fields::UNIT), vec!["1", "1", "1", ""]);
        assert_eq!(column(&records, fields::PORT), vec!["48", "48", "5", "12"]);
    }

    #[test]
    fn test_parse_arp_table() {
        let output = "\
================================================================================
                           IP Arp - VRF corp_users
================================================================================
IP_ADDRESS      MAC_ADDRESS        VLAN    PORT    TYPE        TTL(10 Sec)    TUNNEL
--------------------------------------------------------------------------------
10.6.10.1       00:00:5e:00:01:0a  10      -       LOCAL       2160
10.6.10.25      00:1b:4f:aa:bb:cc  10      1/1     DYNAMIC     2093

2 out of 2 ARP entries displayed
";
        let records = parse(output, TemplateId::ArpByVrf);

        assert_eq!(column(&records, fields::IP_ADDRESS), vec!["10.6.10.1", "10.6.10.25"]);
        assert_eq!(records[1][fields::MAC_ADDRESS], "00:1b:4f:aa:bb:cc");
        assert_eq!(records[1]["PORT"], "1/1");
        let keys: Vec<_> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["IP_ADDRESS", "MAC_ADDRESS", "VLAN", "PORT", "TYPE"]);
    }

    #[test]
    fn test_parse_interface_names() {
        let output = "\
Port Name
---- --------------------------------
1/1  server-room
1/2
1/3  Uplink to core
";
        let records = parse(output, TemplateId::InterfaceNames);

        assert_eq!(column(&records, fields::UNIT), vec!["1", "1", "1"]);
        assert_eq!(column(&records, fields::PORT), vec!["1", "2", "3"]);
        assert_eq!(
            column(&records, fields::NAME),
            vec!["server-room", "", "Uplink to core"]
        );
    }

    #[test]
    fn test_parse_interfaces() {
        let output = "\
                                          Status        Auto                   Flow
Port Trunk Admin   Oper Link LinkTrap Negotiation  Speed    Duplex  Control
---- ----- ------- ---- ---- -------- ----------- -------- ------- -------
1/1          Enable  Up   Up   Enabled  Enabled     1000Mbps Full    Symmetric
1/2          Enable  Down Down Enabled  Enabled
1/3    2     Enable  Up   Up   Enabled  Enabled     100Mbps  Half    Disable
";
        let records = parse(output, TemplateId::InterfaceStatus);

        assert_eq!(column(&records, fields::UNIT_PORT), vec!["1/1", "1/2", "1/3"]);
        assert_eq!(column(&records, fields::OPER_STATUS), vec!["Up", "Down", "Up"]);
        assert_eq!(column(&records, fields::SPEED), vec!["1000Mbps", "", "100Mbps"]);
    }

    #[test]
    fn test_parse_vlan_advance() {
        let output = "\
Id   Name                 IfIndex Qos Level  Aging  MAC Address
---- -------------------- ------- ---------- ------ -----------------
1    VLAN #1              10001   0          0      00:1b:4f:00:00:01
10   users                10010   0          0      00:1b:4f:00:00:0a
";
        let records = parse(output, TemplateId::VlanAdvance);

        assert_eq!(column(&records, fields::VLAN_ID), vec!["1", "10"]);
        assert_eq!(column(&records, fields::NAME), vec!["VLAN #1", "users"]);
        assert_eq!(records[0]["IF_INDEX"], "10001");
    }

    #[test]
    fn test_parse_running_config_vlans() {
        let output = r#"
Preparing to Display Configuration...
#
# box type             : VSP-8404C
# software version     : 8.10.1.0
#
config terminal

#
# VLAN CONFIGURATION
#

vlan members remove 1 1/1-1/18,3/1-3/18 portmember
vlan create 10 name "Signage/PA" type port-mstprstp 1
vlan mlt 10 2
vlan members 10 1/1,3/1 portmember
vlan i-sid 10 1700010
interface Vlan 10

vrf corp_users
ip address 10.6.10.3 255.255.254.0 1
ip spb-multicast enable
ip igmp snoop-querier-addr 10.6.10.3
ip vrrp address 10 10.6.10.1
ip vrrp 10 enable
exit
vlan create 19 name "Management" type port-mstprstp 1
vlan i-sid 19 1700019
interface Vlan 19
ip address 10.6.24.3 255.255.255.128 4
ip vrrp address 19 10.6.24.1
exit
vlan create 42 name "Police_Radio" type port-mstprstp 1
vlan i-sid 42 12990042
interface Vlan 42

vrf police_radio
exit
vlan create 530 name "FirstNet530" type port-mstprstp 1
vlan i-sid 530 12990530
vlan create 531 name "FirstNet531" type port-mstprstp 1
vlan i-sid 531 12990531
vlan create 535 name " FirstNet535" type port-mstprstp 1
vlan i-sid 535 12990535
vlan create 4000 name "IST" type port-mstprstp 1
vlan i-sid 4000 1704000
interface Vlan 4000
ip address 10.29.2.81 255.255.255.252 0
exit
vlan create 4050 name "BVLAN-1" type spbm-bvlan
vlan create 4051 name "BVLAN-2" type spbm-bvlan
"#;
        let records = parse(output, TemplateId::VlanConfig);

        assert_eq!(
            column(&records, fields::VLAN_ID),
            vec!["10", "19", "42", "530", "531", "535", "4000", "4050", "4051"]
        );

        let signage = &records[0];
        assert_eq!(signage[fields::NAME], "Signage/PA");
        assert_eq!(signage["VRF"], "corp_users");
        assert_eq!(signage[fields::IP], "10.6.10.3");
        assert_eq!(signage[fields::SUBNET_MASK], "255.255.254.0");

        let management = &records[1];
        assert_eq!(management["VRF"], "");
        assert_eq!(management[fields::SUBNET_MASK], "255.255.255.128");

        let radio = &records[2];
        assert_eq!(radio["VRF"], "police_radio");
        assert_eq!(radio[fields::IP], "");

        assert_eq!(records[3][fields::IP], "");
        assert_eq!(records[5][fields::NAME], "FirstNet535");
        assert_eq!(records[6][fields::SUBNET_MASK], "255.255.255.252");
        assert_eq!(records[8][fields::NAME], "BVLAN-2");
    }

    #[test]
    fn test_parse_unmatched_output_is_empty() {
        let parser = TextFsmParser::new();
        let records = parser
            .parse("no entries found\n", TemplateId::MacTable)
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_template_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(TemplateId::VrfList.file_name()),
            "Value VRF_NAME (\\S+)\nValue VRF_ID (\\d+)\n\nStart\n  ^vrf ${VRF_NAME} id ${VRF_ID} -> Record\n",
        )
        .unwrap();

        let parser = TextFsmParser::with_template_dir(dir.path()).unwrap();
        let records = parser.parse("vrf blue id 7\n", TemplateId::VrfList).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0][fields::VRF_NAME], "blue");
        assert_eq!(records[0][fields::VRF_ID], "7");
    }
}
