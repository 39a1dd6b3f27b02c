//! Joins the switch and router tables into one row per port and MAC.
//!
//! ```text
//! port_list ──(UNIT,PORT)──► mac_table      one row per match, or one bare row
//!     row ──normalized MAC──► arp           first match sets IP_ADDRESS, VRF_ID
//!     row ──(UNIT,PORT)─────► port_status   first match sets OPER, SPEED
//! ```
//!
//! Missing join keys never fail; the row just stays unenriched.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use log::debug;
use serde::Serialize;

use crate::liveness::PingStatus;
use crate::parser::{Record, fields};

/// Column headers of the unified table, in export order.
pub const COLUMNS: [&str; 10] = [
    "UNIT",
    "PORT",
    "NAME",
    "VLAN",
    "MAC",
    "IP_ADDRESS",
    "OPER",
    "SPEED",
    "PING_STATUS",
    "VRF_ID",
];

/// One port, or one MAC learned on a port, with everything known about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct UnifiedPortRecord {
    pub unit: String,
    pub port: String,
    pub name: String,
    pub vlan: Option<String>,
    /// Normalized with [`normalize_mac`].
    pub mac: Option<String>,
    pub ip_address: Option<String>,
    pub oper: Option<String>,
    pub speed: Option<String>,
    pub ping_status: Option<PingStatus>,
    pub vrf_id: Option<String>,
}

impl UnifiedPortRecord {
    /// Cell values in [`COLUMNS`] order; absent values are empty.
    pub fn cells(&self) -> [String; 10] {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        [
            self.unit.clone(),
            self.port.clone(),
            self.name.clone(),
            text(&self.vlan),
            text(&self.mac),
            text(&self.ip_address),
            text(&self.oper),
            text(&self.speed),
            self.ping_status.map(|s| s.to_string()).unwrap_or_default(),
            text(&self.vrf_id),
        ]
    }
}

/// Canonical MAC form: lower-case hex octets separated by `-`.
///
/// Accepts `AA:BB:CC:DD:EE:FF`, `aa-bb-cc-dd-ee-ff`, `aabb.ccdd.eeff` and
/// bare hex. Anything that is not twelve hex digits is lower-cased with `:`
/// and `.` replaced by `-`. Applying it twice gives the same result.
pub fn normalize_mac(mac: &str) -> String {
    let digits: String = mac
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();

    if digits.len() == 12 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        let digits = digits.to_ascii_lowercase();
        let mut out = String::with_capacity(17);
        for (i, octet) in digits.as_bytes().chunks(2).enumerate() {
            if i > 0 {
                out.push('-');
            }
            out.push(octet[0] as char);
            out.push(octet[1] as char);
        }
        return out;
    }

    mac.trim().to_lowercase().replace([':', '.'], "-")
}

/// `(UNIT, PORT)` of a record; a missing `UNIT` counts as empty.
fn port_key(record: &Record) -> Option<(&str, &str)> {
    let port = record.get(fields::PORT)?;
    let unit = record.get(fields::UNIT).map(String::as_str).unwrap_or("");
    Some((unit, port.as_str()))
}

/// Build the unified table.
///
/// Row order follows `port_list`, then `mac_table` order within a port.
pub fn correlate(
    port_list: &[Record],
    mac_table: &[Record],
    arp: &[Record],
    port_status: &[Record],
) -> Vec<UnifiedPortRecord> {
    let mut macs_by_port: HashMap<(&str, &str), Vec<&Record>> = HashMap::new();
    for entry in mac_table {
        if let Some(key) = port_key(entry) {
            macs_by_port.entry(key).or_default().push(entry);
        }
    }

    // First entry in collection order wins.
    let mut arp_by_mac: HashMap<String, &Record> = HashMap::new();
    for entry in arp {
        if let Some(mac) = entry.get(fields::MAC_ADDRESS) {
            if let Entry::Vacant(slot) = arp_by_mac.entry(normalize_mac(mac)) {
                slot.insert(entry);
            }
        }
    }

    let mut status_by_port: HashMap<(&str, &str), &Record> = HashMap::new();
    for entry in port_status {
        if let Some(key) = port_key(entry) {
            status_by_port.entry(key).or_insert(entry);
        }
    }

    let mut rows = Vec::with_capacity(port_list.len());
    for port in port_list {
        let Some(key) = port_key(port) else {
            debug!("Skipping interface record without PORT: {:?}", port);
            continue;
        };

        let base = UnifiedPortRecord {
            unit: key.0.to_string(),
            port: key.1.to_string(),
            name: port.get(fields::NAME).cloned().unwrap_or_default(),
            vlan: None,
            mac: None,
            ip_address: None,
            oper: None,
            speed: None,
            ping_status: None,
            vrf_id: None,
        };

        match macs_by_port.get(&key) {
            Some(matches) => rows.extend(matches.iter().map(|entry| UnifiedPortRecord {
                vlan: entry.get(fields::VID).cloned(),
                mac: entry.get(fields::MAC_ADDRESS).map(|mac| normalize_mac(mac)),
                ..base.clone()
            })),
            None => rows.push(base),
        }
    }

    for row in &mut rows {
        if let Some(entry) = row.mac.as_ref().and_then(|mac| arp_by_mac.get(mac)) {
            row.ip_address = entry.get(fields::IP_ADDRESS).cloned();
            row.vrf_id = entry.get(fields::VRF_ID).cloned();
        }
        if let Some(status) = status_by_port.get(&(row.unit.as_str(), row.port.as_str())) {
            row.oper = status.get(fields::OPER_STATUS).cloned();
            row.speed = status.get(fields::SPEED).cloned();
        }
    }

    debug!(
        "Correlated {} interface(s), {} MAC entries, {} ARP entries into {} row(s)",
        port_list.len(),
        mac_table.len(),
        arp.len(),
        rows.len()
    );
    rows
}

/// Distinct, non-empty addresses in first-seen order.
pub fn distinct_addresses(rows: &[UnifiedPortRecord]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    rows.iter()
        .filter_map(|row| row.ip_address.as_deref())
        .filter(|ip| !ip.is_empty())
        .filter(|ip| seen.insert(*ip))
        .map(str::to_string)
        .collect()
}

/// Copy probe results onto every row carrying the probed address.
pub fn apply_ping_results(rows: &mut [UnifiedPortRecord], results: &HashMap<String, PingStatus>) {
    for row in rows {
        if let Some(ip) = &row.ip_address {
            row.ping_status = results.get(ip).copied();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_mac() {
        assert_eq!(normalize_mac("AA:BB:CC:DD:EE:FF"), "aa-bb-cc-dd-ee-ff");
        assert_eq!(normalize_mac("aabb.ccdd.eeff"), "aa-bb-cc-dd-ee-ff");
        assert_eq!(normalize_mac("00-1A-2B-3C-4D-5E"), "00-1a-2b-3c-4d-5e");
        assert_eq!(normalize_mac("Incomplete"), "incomplete");
    }

    #[test]
    fn test_normalize_mac_is_idempotent() {
        for mac in ["AA:BB:CC:DD:EE:FF", "aabb.ccdd.eeff", "00-1A-2B-3C-4D-5E", "A.B:c", ""] {
            let once = normalize_mac(mac);
            assert_eq!(normalize_mac(&once), once, "not idempotent for {mac:?}");
        }
    }

    #[test]
    fn test_port_with_two_macs_fans_out() {
        let ports = vec![record(&[("UNIT", "1"), ("PORT", "1"), ("NAME", "uplink")])];
        let macs = vec![
            record(&[
                ("MAC_ADDRESS", "AA:AA:AA:AA:AA:01"),
                ("VID", "10"),
                ("UNIT", "1"),
                ("PORT", "1"),
            ]),
            record(&[
                ("MAC_ADDRESS", "AA:AA:AA:AA:AA:02"),
                ("VID", "20"),
                ("UNIT", "1"),
                ("PORT", "1"),
            ]),
        ];

        let rows = correlate(&ports, &macs, &[], &[]);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.name == "uplink"));
        assert_eq!(rows[0].vlan.as_deref(), Some("10"));
        assert_eq!(rows[0].mac.as_deref(), Some("aa-aa-aa-aa-aa-01"));
        assert_eq!(rows[1].vlan.as_deref(), Some("20"));
    }

    #[test]
    fn test_port_without_macs_yields_one_bare_row() {
        let ports = vec![record(&[("UNIT", "1"), ("PORT", "5"), ("NAME", "")])];
        let macs = vec![record(&[
            ("MAC_ADDRESS", "aa-aa-aa-aa-aa-01"),
            ("UNIT", "1"),
            ("PORT", "6"),
        ])];

        let rows = correlate(&ports, &macs, &[], &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].port, "5");
        assert_eq!(rows[0].vlan, None);
        assert_eq!(rows[0].mac, None);
    }

    #[test]
    fn test_missing_unit_matches_missing_unit() {
        let ports = vec![record(&[("PORT", "7"), ("NAME", "p7")])];
        let macs = vec![
            record(&[("MAC_ADDRESS", "aa-aa-aa-aa-aa-07"), ("PORT", "7")]),
            record(&[("MAC_ADDRESS", "aa-aa-aa-aa-aa-08"), ("UNIT", "2"), ("PORT", "7")]),
        ];
        let status = vec![record(&[("UNIT", ""), ("PORT", "7"), ("OPER_STATUS", "Up")])];

        let rows = correlate(&ports, &macs, &[], &status);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].unit, "");
        assert_eq!(rows[0].mac.as_deref(), Some("aa-aa-aa-aa-aa-07"));
        assert_eq!(rows[0].oper.as_deref(), Some("Up"));
    }

    #[test]
    fn test_port_record_without_port_is_skipped() {
        let ports = vec![record(&[("UNIT", "1"), ("NAME", "orphan")])];
        assert!(correlate(&ports, &[], &[], &[]).is_empty());
    }

    #[test]
    fn test_arp_join_uses_normalized_mac_and_first_match() {
        let ports = vec![record(&[("UNIT", "1"), ("PORT", "1"), ("NAME", "")])];
        let macs = vec![record(&[
            ("MAC_ADDRESS", "aa-bb-cc-dd-ee-ff"),
            ("VID", "10"),
            ("UNIT", "1"),
            ("PORT", "1"),
        ])];
        let arp = vec![
            record(&[
                ("IP_ADDRESS", "10.0.0.5"),
                ("MAC_ADDRESS", "AA:BB:CC:DD:EE:FF"),
                ("VRF_ID", "1"),
            ]),
            record(&[
                ("IP_ADDRESS", "10.9.9.9"),
                ("MAC_ADDRESS", "aa-bb-cc-dd-ee-ff"),
                ("VRF_ID", "2"),
            ]),
        ];

        let rows = correlate(&ports, &macs, &arp, &[]);
        assert_eq!(rows[0].ip_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(rows[0].vrf_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_end_to_end_with_ping_results() {
        let ports = vec![
            record(&[("UNIT", "1"), ("PORT", "1"), ("NAME", "server")]),
            record(&[("UNIT", "1"), ("PORT", "2"), ("NAME", "printer")]),
        ];
        let macs = vec![record(&[
            ("MAC_ADDRESS", "00:11:22:33:44:55"),
            ("VID", "30"),
            ("UNIT", "1"),
            ("PORT", "1"),
        ])];
        let arp = vec![record(&[
            ("IP_ADDRESS", "10.1.1.10"),
            ("MAC_ADDRESS", "0011.2233.4455"),
            ("VRF_ID", "0"),
        ])];
        let status = vec![
            record(&[
                ("UNIT_PORT", "1/1"),
                ("UNIT", "1"),
                ("PORT", "1"),
                ("OPER_STATUS", "Up"),
                ("SPEED", "1000Mbps"),
            ]),
            record(&[
                ("UNIT_PORT", "1/2"),
                ("UNIT", "1"),
                ("PORT", "2"),
                ("OPER_STATUS", "Down"),
                ("SPEED", ""),
            ]),
        ];

        let mut rows = correlate(&ports, &macs, &arp, &status);
        assert_eq!(distinct_addresses(&rows), vec!["10.1.1.10"]);

        let results = HashMap::from([("10.1.1.10".to_string(), PingStatus::Good)]);
        apply_ping_results(&mut rows, &results);

        assert_eq!(
            rows[0],
            UnifiedPortRecord {
                unit: "1".into(),
                port: "1".into(),
                name: "server".into(),
                vlan: Some("30".into()),
                mac: Some("00-11-22-33-44-55".into()),
                ip_address: Some("10.1.1.10".into()),
                oper: Some("Up".into()),
                speed: Some("1000Mbps".into()),
                ping_status: Some(PingStatus::Good),
                vrf_id: Some("0".into()),
            }
        );
        assert_eq!(rows[1].oper.as_deref(), Some("Down"));
        assert_eq!(rows[1].ping_status, None);
        assert_eq!(rows[1].cells()[8], "");
    }

    #[test]
    fn test_distinct_addresses_dedups() {
        let ports = vec![record(&[("UNIT", "1"), ("PORT", "1"), ("NAME", "")])];
        let macs = vec![
            record(&[("MAC_ADDRESS", "aa-aa-aa-aa-aa-01"), ("UNIT", "1"), ("PORT", "1")]),
            record(&[("MAC_ADDRESS", "aa-aa-aa-aa-aa-02"), ("UNIT", "1"), ("PORT", "1")]),
        ];
        let arp = vec![
            record(&[("IP_ADDRESS", "10.0.0.1"), ("MAC_ADDRESS", "aa-aa-aa-aa-aa-01")]),
            record(&[("IP_ADDRESS", "10.0.0.1"), ("MAC_ADDRESS", "aa-aa-aa-aa-aa-02")]),
        ];
        let rows = correlate(&ports, &macs, &arp, &[]);
        assert_eq!(distinct_addresses(&rows), vec!["10.0.0.1"]);
    }

    #[test]
    fn test_serialized_field_names() {
        let rows = correlate(&[record(&[("PORT", "3"), ("NAME", "x")])], &[], &[], &[]);
        let json = serde_json::to_value(&rows[0]).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        for column in COLUMNS {
            assert!(keys.contains(&column.to_string()), "missing {column}");
        }
    }
}
