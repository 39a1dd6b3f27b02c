//! Side-by-side sheet layout.
//!
//! ```text
//!  A..J          K   L..            S   T..      V   W..
//!  unified       |   vlan_config    |   vrf      |   vlan_advance
//! ```
//!
//! Columns are 1-based, as in a spreadsheet. Each auxiliary table starts at
//! its fixed column, or two past the previous table when that one is wider
//! than its slot, so tables never overlap. The column before each auxiliary
//! table is a blank separator.

use log::warn;

use super::ExportBundle;
use crate::correlate::COLUMNS;
use crate::normalize::Table;

/// Fixed starting columns of the auxiliary tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub vlan_config: usize,
    pub vrf_entries: usize,
    pub vlan_advance: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            vlan_config: 12,
            vrf_entries: 20,
            vlan_advance: 23,
        }
    }
}

/// Where one table landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub name: &'static str,
    /// First column, 1-based.
    pub column: usize,
    pub width: usize,
}

impl Placement {
    /// The blank column before the table. `None` for a table at column 1.
    pub fn separator(&self) -> Option<usize> {
        self.column.checked_sub(1).filter(|c| *c > 0)
    }
}

/// A rectangular block of text cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    pub cells: Vec<Vec<String>>,
    pub placements: Vec<Placement>,
}

impl Grid {
    /// Lay out the bundle. Failed auxiliary tables are left out.
    pub fn build(bundle: &ExportBundle, layout: SheetLayout) -> Self {
        let mut grid = Grid::default();

        let unified = Table {
            columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: bundle
                .ports
                .iter()
                .map(|row| row.cells().into_iter().map(Some).collect())
                .collect(),
        };
        grid.place("unified", 1, &unified);

        let mut next_free = unified.width() + 2;
        let slots = [layout.vlan_config, layout.vrf_entries, layout.vlan_advance];
        for ((name, table), fixed) in bundle.auxiliary.named().into_iter().zip(slots) {
            let table = match table {
                Ok(table) => table,
                Err(e) => {
                    warn!("Omitting {} from export: {}", name, e);
                    continue;
                }
            };
            let column = fixed.max(next_free);
            if column != fixed {
                warn!(
                    "{} moved from column {} to {} to avoid overlap",
                    name, fixed, column
                );
            }
            grid.place(name, column, table);
            next_free = column + table.width() + 1;
        }

        grid
    }

    fn place(&mut self, name: &'static str, column: usize, table: &Table) {
        let offset = column.saturating_sub(1);
        let needed_rows = table.len() + 1;
        let needed_width = offset + table.width();

        if self.cells.len() < needed_rows {
            let width = self.width();
            self.cells.resize(needed_rows, vec![String::new(); width]);
        }
        if self.width() < needed_width {
            for row in &mut self.cells {
                row.resize(needed_width, String::new());
            }
        }

        for (i, header) in table.columns.iter().enumerate() {
            self.cells[0][offset + i] = header.clone();
        }
        for (r, row) in table.rows.iter().enumerate() {
            for (i, value) in row.iter().enumerate() {
                self.cells[r + 1][offset + i] = value.clone().unwrap_or_default();
            }
        }

        self.placements.push(Placement {
            name,
            column,
            width: table.width(),
        });
    }

    pub fn width(&self) -> usize {
        self.cells.first().map(Vec::len).unwrap_or(0)
    }

    pub fn placement(&self, name: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_bundle;
    use crate::normalize::Table;

    #[test]
    fn test_default_offsets() {
        let grid = Grid::build(&sample_bundle(), SheetLayout::default());

        let vlan = grid.placement("vlan_config").unwrap();
        assert_eq!((vlan.column, vlan.separator()), (12, Some(11)));
        let vrf = grid.placement("vrf_entries").unwrap();
        assert_eq!((vrf.column, vrf.separator()), (20, Some(19)));

        let header = &grid.cells[0];
        assert_eq!(header[0], "UNIT");
        assert_eq!(header[9], "VRF_ID");
        assert_eq!(header[10], "");
        assert_eq!(header[11], "VLAN_ID");
        assert_eq!(header[15], "PREFIX");
        assert_eq!(header[18], "");
        assert_eq!(header[19], "VRF_NAME");
        assert_eq!(header[20], "VRF_ID");
    }

    #[test]
    fn test_failed_table_is_omitted() {
        let grid = Grid::build(&sample_bundle(), SheetLayout::default());
        assert!(grid.placement("vlan_advance").is_none());
        assert_eq!(grid.width(), 21);
    }

    #[test]
    fn test_rows_padded_to_tallest_table() {
        let grid = Grid::build(&sample_bundle(), SheetLayout::default());
        // Header plus three VRF rows; two port rows.
        assert_eq!(grid.cells.len(), 4);
        assert!(grid.cells.iter().all(|row| row.len() == grid.width()));
        assert_eq!(grid.cells[1][8], "Good");
        assert_eq!(grid.cells[2][6], "Down");
        assert_eq!(grid.cells[3][0], "");
        assert_eq!(grid.cells[3][19], "pci");
    }

    #[test]
    fn test_vlan_advance_at_column_w() {
        let mut bundle = sample_bundle();
        bundle.auxiliary.vlan_advance = Ok(Table {
            columns: vec!["VLAN_ID".into(), "NAME".into()],
            rows: vec![vec![Some("10".into()), Some("users".into())]],
        });
        let grid = Grid::build(&bundle, SheetLayout::default());
        let advance = grid.placement("vlan_advance").unwrap();
        assert_eq!((advance.column, advance.separator()), (23, Some(22)));
        assert_eq!(grid.cells[0][22], "VLAN_ID");
    }

    #[test]
    fn test_zero_columns_pack_after_unified_table() {
        let layout = SheetLayout {
            vlan_config: 0,
            vrf_entries: 0,
            vlan_advance: 0,
        };
        let grid = Grid::build(&sample_bundle(), layout);

        assert_eq!(grid.placement("unified").unwrap().separator(), None);
        let vlan = grid.placement("vlan_config").unwrap();
        assert_eq!((vlan.column, vlan.separator()), (12, Some(11)));
        // Six VLAN columns (L..Q), then a separator at R.
        let vrf = grid.placement("vrf_entries").unwrap();
        assert_eq!((vrf.column, vrf.separator()), (19, Some(18)));
        assert_eq!(grid.cells[0][18], "VRF_NAME");
    }

    #[test]
    fn test_wide_table_pushes_next_table_right() {
        let mut bundle = sample_bundle();
        bundle.auxiliary.vlan_config = Ok(Table {
            columns: (0..9).map(|i| format!("C{i}")).collect(),
            rows: vec![],
        });
        let grid = Grid::build(&bundle, SheetLayout::default());
        // L..T is taken, so the VRF table starts after a separator at U.
        let vrf = grid.placement("vrf_entries").unwrap();
        assert_eq!(vrf.column, 22);
    }
}
