//! Writing the unified inventory and auxiliary tables to disk.

mod csv;
mod json;
mod layout;
mod xlsx;

pub use self::csv::CsvExporter;
pub use self::json::JsonExporter;
pub use self::layout::{Grid, Placement, SheetLayout};
pub use self::xlsx::{CellStyle, XlsxExporter, cell_styles};

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Deserialize;

use crate::correlate::UnifiedPortRecord;
use crate::error::ExportError;
use crate::normalize::AuxiliaryTables;

/// Everything one run exports.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub ports: Vec<UnifiedPortRecord>,
    pub auxiliary: AuxiliaryTables,
}

/// Renders an [`ExportBundle`] to a file.
pub trait Exporter {
    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    fn export(&self, bundle: &ExportBundle, path: &Path) -> Result<(), ExportError>;
}

/// Output format selectable from the command line or config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Styled workbook.
    #[default]
    Xlsx,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn exporter(self) -> Box<dyn Exporter> {
        match self {
            ExportFormat::Xlsx => Box::new(XlsxExporter::new()),
            ExportFormat::Csv => Box::new(CsvExporter::new()),
            ExportFormat::Json => Box::new(JsonExporter::new()),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Xlsx => f.write_str("xlsx"),
            ExportFormat::Csv => f.write_str("csv"),
            ExportFormat::Json => f.write_str("json"),
        }
    }
}

/// `netscrape_<MM-DD-YYYY_HHh-MMm-SSs>.<extension>` in `dir`.
pub fn default_output_path(dir: &Path, extension: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "netscrape_{}.{}",
        at.format("%m-%d-%Y_%Hh-%Mm-%Ss"),
        extension
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::error::FormatError;
    use crate::liveness::PingStatus;
    use crate::normalize::Table;

    pub(crate) fn sample_bundle() -> ExportBundle {
        let port = UnifiedPortRecord {
            unit: "1".into(),
            port: "1".into(),
            name: "server".into(),
            vlan: Some("10".into()),
            mac: Some("aa-bb-cc-dd-ee-ff".into()),
            ip_address: Some("10.0.0.5".into()),
            oper: Some("Up".into()),
            speed: Some("1000Mbps".into()),
            ping_status: Some(PingStatus::Good),
            vrf_id: Some("1".into()),
        };
        let bare = UnifiedPortRecord {
            port: "2".into(),
            name: String::new(),
            vlan: None,
            mac: None,
            ip_address: None,
            oper: Some("Down".into()),
            speed: None,
            ping_status: None,
            vrf_id: None,
            ..port.clone()
        };

        let column = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        let cell = |v: &str| Some(v.to_string());

        ExportBundle {
            ports: vec![port, bare],
            auxiliary: AuxiliaryTables {
                vlan_config: Ok(Table {
                    columns: column(&["VLAN_ID", "NAME", "VRF", "IP", "PREFIX", "SUBNET_MASK"]),
                    rows: vec![vec![
                        cell("10"),
                        cell("users"),
                        cell("corp"),
                        cell("10.0.0.1"),
                        cell("/24"),
                        cell("255.255.255.0"),
                    ]],
                }),
                vrf_entries: Ok(Table {
                    columns: column(&["VRF_NAME", "VRF_ID"]),
                    rows: vec![
                        vec![cell("GlobalRouter"), cell("0")],
                        vec![cell("corp"), cell("1")],
                        vec![cell("pci"), cell("2")],
                    ],
                }),
                vlan_advance: Err(FormatError::MissingKey {
                    field: "VLAN_ID".into(),
                    index: 0,
                }),
            },
        }
    }

    #[test]
    fn test_default_output_path() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        let path = default_output_path(Path::new("out"), "csv", at);
        assert_eq!(path, Path::new("out").join("netscrape_03-07-2024_09h-05m-02s.csv"));
    }

    #[test]
    fn test_format_selects_exporter() {
        assert_eq!(ExportFormat::Xlsx.exporter().extension(), "xlsx");
        assert_eq!(ExportFormat::Csv.exporter().extension(), "csv");
        assert_eq!(ExportFormat::Json.exporter().extension(), "json");
        assert_eq!(ExportFormat::default(), ExportFormat::Xlsx);
    }
}
