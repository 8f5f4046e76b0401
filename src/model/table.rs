//! Table grid types produced by the table builder.

use serde::{Deserialize, Serialize};

use super::{BoundingBox, Page};

/// A reconstructed table grid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Rows, top to bottom
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row to the table.
    pub fn add_row(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns, counting column spans of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.col_span).sum::<usize>())
            .max()
            .unwrap_or(0)
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check if the table has merged cells.
    pub fn has_merged_cells(&self) -> bool {
        self.cells().any(|c| c.is_merged())
    }

    /// Number of filler cells inserted for gaps in the grid.
    pub fn synthetic_cell_count(&self) -> usize {
        self.cells().filter(|c| c.is_empty).count()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.rows.iter().flat_map(|r| r.cells.iter())
    }

    /// Get a cell by row and position within the row.
    pub fn cell(&self, row: usize, index: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cells.get(index))
    }

    /// Plain text of the table: one line per row, cells separated by tabs.
    pub fn plain_text(&self, page: &Page) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(|c| page.text(c.start..c.end))
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// Cells, left to right
    pub cells: Vec<TableCell>,

    /// Bounds of the row's content, excluding cells spanning down from it
    pub bounding_box: BoundingBox,
}

impl TableRow {
    /// Create a new row with cells.
    pub fn new(cells: Vec<TableCell>, bounding_box: BoundingBox) -> Self {
        Self {
            cells,
            bounding_box,
        }
    }
}

/// A table cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    /// Cell bounds
    pub bounding_box: BoundingBox,

    /// First word index of the cell content (absolute, on the owning page)
    pub start: usize,

    /// One past the last word index
    pub end: usize,

    /// Number of rows this cell spans
    pub row_span: usize,

    /// Number of columns this cell spans
    pub col_span: usize,

    /// Index of the grid column the cell starts in
    #[serde(default)]
    pub column: usize,

    /// Whether this is a filler cell with no content
    pub is_empty: bool,
}

impl TableCell {
    /// Create a cell over existing content.
    pub fn new(bounding_box: BoundingBox, start: usize, end: usize) -> Self {
        Self {
            bounding_box,
            start,
            end,
            row_span: 1,
            col_span: 1,
            column: 0,
            is_empty: false,
        }
    }

    /// Create a filler cell.
    pub fn filler(bounding_box: BoundingBox) -> Self {
        Self {
            is_empty: true,
            ..Self::new(bounding_box, 0, 0)
        }
    }

    /// Set colspan and return self.
    pub fn colspan(mut self, span: usize) -> Self {
        self.col_span = span.max(1);
        self
    }

    /// Set rowspan and return self.
    pub fn rowspan(mut self, span: usize) -> Self {
        self.row_span = span.max(1);
        self
    }

    /// Set the starting grid column and return self.
    pub fn at_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    /// Check if this cell spans multiple rows or columns.
    pub fn is_merged(&self) -> bool {
        self.row_span > 1 || self.col_span > 1
    }
}
