//! Styled XLSX export.
//!
//! Same [`Grid`] as the CSV writer, plus:
//! - `OPER` and `PING_STATUS` cells filled green for `Up`/`Good` and red for
//!   `Down`/`Bad`
//! - separator columns filled black from the header down
//! - a bold, grey, bordered header row
//! - thin borders on every body cell
//! - column widths sized to the longest value

use std::collections::HashSet;
use std::path::Path;

use log::info;
use rust_xlsxwriter::{
    ColNum, Color, Format, FormatAlign, FormatBorder, RowNum, Workbook, XlsxError,
};

use super::{ExportBundle, Exporter, Grid, SheetLayout};
use crate::correlate::COLUMNS;
use crate::error::ExportError;

const SHEET_NAME: &str = "Inventory";

/// Visual class of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Header,
    Separator,
    Positive,
    Negative,
    Body,
}

/// Decides the [`CellStyle`] of each grid cell.
struct Styler {
    separators: HashSet<usize>,
    status_columns: HashSet<usize>,
}

impl Styler {
    fn new(grid: &Grid) -> Self {
        // Unified table is at column 1, so its indices are grid indices.
        let status_columns = ["OPER", "PING_STATUS"]
            .iter()
            .filter_map(|name| COLUMNS.iter().position(|c| c == name))
            .collect();
        let separators = grid
            .placements
            .iter()
            .filter_map(|p| p.separator())
            .map(|column| column - 1)
            .collect();
        Self {
            separators,
            status_columns,
        }
    }

    fn style(&self, row: usize, col: usize, value: &str) -> CellStyle {
        if self.separators.contains(&col) {
            return CellStyle::Separator;
        }
        if row == 0 {
            return CellStyle::Header;
        }
        if self.status_columns.contains(&col) {
            match value {
                "Up" | "Good" => return CellStyle::Positive,
                "Down" | "Bad" => return CellStyle::Negative,
                _ => {}
            }
        }
        CellStyle::Body
    }
}

/// Cell styles for the whole grid, row-major.
pub fn cell_styles(grid: &Grid) -> Vec<Vec<CellStyle>> {
    let styler = Styler::new(grid);
    grid.cells
        .iter()
        .enumerate()
        .map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(|(c, value)| styler.style(r, c, value))
                .collect()
        })
        .collect()
}

struct Formats {
    header: Format,
    separator: Format,
    positive: Format,
    negative: Format,
    body: Format,
}

impl Formats {
    fn new() -> Self {
        let body = Format::new()
            .set_font_name("Calibri")
            .set_font_size(11)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin);
        Self {
            header: body
                .clone()
                .set_bold()
                .set_text_wrap()
                .set_background_color(Color::RGB(0xCCCCCC))
                .set_border(FormatBorder::Medium),
            separator: Format::new().set_background_color(Color::Black),
            positive: body.clone().set_background_color(Color::RGB(0x00FF00)),
            negative: body.clone().set_background_color(Color::RGB(0xFF0000)),
            body,
        }
    }

    fn get(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Header => &self.header,
            CellStyle::Separator => &self.separator,
            CellStyle::Positive => &self.positive,
            CellStyle::Negative => &self.negative,
            CellStyle::Body => &self.body,
        }
    }
}

/// Writes the [`Grid`] layout to a single styled worksheet.
#[derive(Debug, Clone, Default)]
pub struct XlsxExporter {
    layout: SheetLayout,
}

impl XlsxExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: SheetLayout) -> Self {
        self.layout = layout;
        self
    }

    fn workbook(&self, bundle: &ExportBundle) -> Result<Workbook, XlsxError> {
        let grid = Grid::build(bundle, self.layout);
        let styles = cell_styles(&grid);
        let formats = Formats::new();

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (r, (row, row_styles)) in grid.cells.iter().zip(&styles).enumerate() {
            // Out-of-range indices are rejected by the writer rather than truncated.
            let xr = RowNum::try_from(r).unwrap_or(RowNum::MAX);
            for (c, (value, style)) in row.iter().zip(row_styles).enumerate() {
                let xc = ColNum::try_from(c).unwrap_or(ColNum::MAX);
                let format = formats.get(*style);
                if value.is_empty() {
                    sheet.write_blank(xr, xc, format)?;
                } else {
                    sheet.write_string_with_format(xr, xc, value.as_str(), format)?;
                }
            }
        }

        for (c, width) in column_widths(&grid).into_iter().enumerate() {
            let xc = ColNum::try_from(c).unwrap_or(ColNum::MAX);
            sheet.set_column_width(xc, width as f64)?;
        }

        Ok(workbook)
    }
}

/// Longest value in each column plus two characters of padding.
fn column_widths(grid: &Grid) -> Vec<usize> {
    (0..grid.width())
        .map(|c| {
            grid.cells
                .iter()
                .map(|row| row[c].chars().count())
                .max()
                .unwrap_or(0)
                + 2
        })
        .collect()
}

impl Exporter for XlsxExporter {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn export(&self, bundle: &ExportBundle, path: &Path) -> Result<(), ExportError> {
        let mut workbook = self.workbook(bundle)?;
        workbook.save(path)?;
        info!("Wrote {} row(s) to {}", bundle.ports.len(), path.display());
        Ok(())
    }
}
