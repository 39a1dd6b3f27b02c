//! JSON export: the four tables as named arrays.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use super::{ExportBundle, Exporter};
use crate::correlate::UnifiedPortRecord;
use crate::error::ExportError;
use crate::normalize::Table;

#[derive(Serialize)]
struct Document<'a> {
    ports: &'a [UnifiedPortRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    vlan_config: Option<&'a Table>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vrf_entries: Option<&'a Table>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vlan_advance: Option<&'a Table>,
}

impl<'a> Document<'a> {
    fn new(bundle: &'a ExportBundle) -> Self {
        let aux = &bundle.auxiliary;
        for (name, table) in aux.named() {
            if let Err(e) = table {
                warn!("Omitting {} from export: {}", name, e);
            }
        }
        Self {
            ports: &bundle.ports,
            vlan_config: aux.vlan_config.as_ref().ok(),
            vrf_entries: aux.vrf_entries.as_ref().ok(),
            vlan_advance: aux.vlan_advance.as_ref().ok(),
        }
    }
}

/// Pretty-printed JSON object with `ports`, `vlan_config`, `vrf_entries`
/// and `vlan_advance` arrays. Failed tables are left out.
#[derive(Debug, Clone, Default)]
pub struct JsonExporter;

impl JsonExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for JsonExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn export(&self, bundle: &ExportBundle, path: &Path) -> Result<(), ExportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &Document::new(bundle))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!("Wrote {} row(s) to {}", bundle.ports.len(), path.display());
        Ok(())
    }
}
