//! CSV export: all tables side by side on one sheet.

use std::path::Path;

use ::csv::Writer;
use log::info;

use super::{ExportBundle, Exporter, Grid, SheetLayout};
use crate::error::ExportError;

/// Writes the [`Grid`] layout as CSV. Separator columns are empty cells.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    layout: SheetLayout,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: SheetLayout) -> Self {
        self.layout = layout;
        self
    }

    fn write<W: std::io::Write>(
        &self,
        bundle: &ExportBundle,
        writer: W,
    ) -> Result<(), ExportError> {
        let grid = Grid::build(bundle, self.layout);
        let mut writer = Writer::from_writer(writer);
        for row in &grid.cells {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Exporter for CsvExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn export(&self, bundle: &ExportBundle, path: &Path) -> Result<(), ExportError> {
        let file = std::fs::File::create(path)?;
        self.write(bundle, std::io::BufWriter::new(file))?;
        info!("Wrote {} row(s) to {}", bundle.ports.len(), path.display());
        Ok(())
    }
}
