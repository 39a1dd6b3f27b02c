//! Deduplication, numeric ordering and column layout of the auxiliary tables.

use std::collections::HashSet;

use log::warn;
use serde::Serialize;
use serde::ser::{SerializeSeq, Serializer};

use crate::collector::RecordTables;
use crate::error::FormatError;
use crate::parser::{Record, fields};

/// Drop duplicate records, then sort by the integer value of `sort_key`.
///
/// Records are duplicates when every field name and value matches in the same
/// order; the first occurrence is kept. The sort is stable.
pub fn normalize(records: &[Record], sort_key: &str) -> Result<Vec<Record>, FormatError> {
    let mut seen = HashSet::new();
    let unique: Vec<&Record> = records
        .iter()
        .filter(|record| seen.insert(record.iter().collect::<Vec<_>>()))
        .collect();

    let mut keyed = Vec::with_capacity(unique.len());
    for (index, record) in unique.into_iter().enumerate() {
        let value = record.get(sort_key).ok_or_else(|| FormatError::MissingKey {
            field: sort_key.to_string(),
            index,
        })?;
        let key: i64 = value.trim().parse().map_err(|_| FormatError::NotInteger {
            field: sort_key.to_string(),
            value: value.clone(),
            index,
        })?;
        keyed.push((key, record.clone()));
    }

    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, record)| record).collect())
}

/// Prefix length of a dotted-quad mask: `255.255.255.224` → `/27`.
///
/// Returns `None` for an empty mask or anything that is not four octets.
pub fn mask_to_prefix(mask: &str) -> Option<String> {
    let octets: Vec<u8> = mask
        .trim()
        .split('.')
        .map(|octet| octet.parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;
    if octets.len() != 4 {
        return None;
    }
    let bits: u32 = octets.iter().map(|octet| octet.count_ones()).sum();
    Some(format!("/{bits}"))
}

/// A rectangular table with named columns. Absent cells are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Project `records` onto `columns`.
    pub fn from_records(columns: Vec<String>, records: &[Record]) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).cloned())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Serialized as an array of objects keyed by column.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            let object: indexmap::IndexMap<&str, &Option<String>> = self
                .columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect();
            seq.serialize_element(&object)?;
        }
        seq.end()
    }
}

/// Field names across `records` in first-seen order, minus `exclude`.
fn observed_columns(records: &[Record], exclude: &[&str]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for name in records.iter().flat_map(|record| record.keys()) {
        if !exclude.contains(&name.as_str()) && !columns.contains(name) {
            columns.push(name.clone());
        }
    }
    columns
}

/// Drop the collector's `DEVICE` tag so identical rows from different
/// routers deduplicate.
fn without_device(records: &[Record]) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            record.shift_remove(fields::DEVICE);
            record
        })
        .collect()
}

/// VLAN configuration table with `PREFIX` right after `IP`.
pub fn vlan_config_table(records: &[Record]) -> Result<Table, FormatError> {
    let sorted = normalize(&without_device(records), fields::VLAN_ID)?;

    let mut columns = observed_columns(&sorted, &[fields::PREFIX]);
    let at = columns
        .iter()
        .position(|c| c == fields::IP)
        .map(|i| i + 1)
        .unwrap_or(columns.len());
    columns.insert(at, fields::PREFIX.to_string());

    let with_prefix: Vec<Record> = sorted
        .into_iter()
        .map(|mut record| {
            let mask = record.get(fields::SUBNET_MASK).map(|m| m.trim()).unwrap_or("");
            if !mask.is_empty() {
                match mask_to_prefix(mask) {
                    Some(prefix) => {
                        record.insert(fields::PREFIX.to_string(), prefix);
                    }
                    None => warn!(
                        "VLAN {}: malformed subnet mask '{}'",
                        record.get(fields::VLAN_ID).map(String::as_str).unwrap_or("?"),
                        mask
                    ),
                }
            }
            record
        })
        .collect();

    Ok(Table::from_records(columns, &with_prefix))
}

/// VRF name and ID, one row per distinct VRF.
pub fn vrf_table(records: &[Record]) -> Result<Table, FormatError> {
    let projected: Vec<Record> = records
        .iter()
        .map(|record| {
            [fields::VRF_NAME, fields::VRF_ID]
                .into_iter()
                .filter_map(|field| record.get(field).map(|v| (field.to_string(), v.clone())))
                .collect()
        })
        .collect();
    let sorted = normalize(&projected, fields::VRF_ID)?;
    Ok(Table::from_records(
        vec![fields::VRF_NAME.to_string(), fields::VRF_ID.to_string()],
        &sorted,
    ))
}

/// VLAN-advance table, columns as the template declares them.
pub fn vlan_advance_table(records: &[Record]) -> Result<Table, FormatError> {
    let sorted = normalize(&without_device(records), fields::VLAN_ID)?;
    let columns = observed_columns(&sorted, &[]);
    Ok(Table::from_records(columns, &sorted))
}

/// The three auxiliary tables. Each one fails independently.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryTables {
    pub vlan_config: Result<Table, FormatError>,
    pub vrf_entries: Result<Table, FormatError>,
    pub vlan_advance: Result<Table, FormatError>,
}

impl AuxiliaryTables {
    pub fn build(tables: &RecordTables) -> Self {
        let built = Self {
            vlan_config: vlan_config_table(&tables.vlan_config),
            vrf_entries: vrf_table(&tables.vrf_entries),
            vlan_advance: vlan_advance_table(&tables.vlan_advance),
        };
        for (name, table) in built.named() {
            if let Err(e) = table {
                warn!("{} table will not be exported: {}", name, e);
            }
        }
        built
    }

    /// Tables with their export names, in layout order.
    pub fn named(&self) -> [(&'static str, &Result<Table, FormatError>); 3] {
        [
            ("vlan_config", &self.vlan_config),
            ("vrf_entries", &self.vrf_entries),
            ("vlan_advance", &self.vlan_advance),
        ]
    }
}
