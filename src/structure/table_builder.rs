//! Table grid reconstruction from scattered cell boxes.
//!
//! Grid lines are recovered from passages: strips between two cells that no
//! other cell crosses. Passages are refined against the whole table, merged,
//! and their midpoints become row and column lines. Rows are then peeled off
//! along the row lines, spans are measured against the other rows, and holes
//! in the grid are filled with empty cells.

use crate::model::{BoundingBox, Page, Region, RegionType, Table, TableCell, TableRow};

use super::interval::{subtract_all, union_all, Interval};
use super::{region_at, region_at_mut, RegionPath};

/// Direction a passage sweep runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Sweep left to right, producing column lines (x positions)
    Columns,
    /// Sweep top to bottom, producing row lines (y positions)
    Rows,
}

impl Axis {
    /// Extent of a box along the sweep direction.
    fn sweep(self, bbox: &BoundingBox) -> Interval {
        match self {
            Axis::Columns => bbox.horizontal(),
            Axis::Rows => bbox.vertical(),
        }
    }

    /// Extent of a box across the sweep direction.
    fn cross(self, bbox: &BoundingBox) -> Interval {
        match self {
            Axis::Columns => bbox.vertical(),
            Axis::Rows => bbox.horizontal(),
        }
    }
}

/// A rectangular strip between cells.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Passage {
    sweep: Interval,
    cross: Interval,
    /// Clear across the table's entire cross extent
    full: bool,
}

impl Passage {
    fn blocked_by(&self, bbox: &BoundingBox, axis: Axis) -> bool {
        self.sweep.overlaps(&axis.sweep(bbox)) && self.cross.overlaps(&axis.cross(bbox))
    }
}

/// Table builder configuration.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Minimum number of cells a table region needs
    pub min_cells: usize,
    /// How far (pixels) a cell may bleed into a passage without breaking a full pass
    pub full_pass_tolerance: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_cells: 2,
            full_pass_tolerance: 2.0,
        }
    }
}

/// A cell of a reconstructed grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    /// Index of the input box, `None` for a filler
    pub source: Option<usize>,
    /// Cell bounds
    pub bounding_box: BoundingBox,
    /// Rows spanned
    pub row_span: usize,
    /// Columns spanned
    pub col_span: usize,
    /// Grid column the cell starts in
    pub column: usize,
}

impl GridCell {
    /// Check if this is a synthetic filler.
    pub fn is_filler(&self) -> bool {
        self.source.is_none()
    }
}

/// A row of a reconstructed grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    /// Cells, left to right
    pub cells: Vec<GridCell>,
    /// Row bounds, tightened to exclude cells spanning further down
    pub bounding_box: BoundingBox,
}

/// Geometry of a reconstructed table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    /// Rows, top to bottom
    pub rows: Vec<GridRow>,
    /// Column lines (x positions), left to right
    pub column_lines: Vec<f32>,
    /// Row lines (y positions), top to bottom
    pub row_lines: Vec<f32>,
}

impl Grid {
    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of grid columns.
    pub fn column_count(&self) -> usize {
        self.column_lines.len() + 1
    }

    /// Number of synthetic filler cells.
    pub fn filler_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter(|c| c.is_filler())
            .count()
    }
}

/// Outcome of running the builder over one page.
#[derive(Debug, Clone, Default)]
pub struct TablePass {
    /// Tables that were rebuilt
    pub tables: Vec<Table>,
    /// Table regions left as plain text
    pub skipped: usize,
}

/// Rebuilds table regions into `tr`/`td` grids.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    config: TableConfig,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Create a new table builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: TableConfig::default(),
        }
    }

    /// Create a new table builder with custom configuration.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Rebuild every table region on the page.
    pub fn build_page(&self, page: &mut Page) -> TablePass {
        let mut paths = Vec::new();
        collect_table_paths(&page.regions, &mut Vec::new(), &mut paths);

        let mut pass = TablePass::default();
        for path in paths {
            let already_built = region_at(&page.regions, &path)
                .map(|r| r.children.iter().any(|c| c.kind == RegionType::TableRow))
                .unwrap_or(false);
            if already_built {
                log::debug!("TableBuilder: region {:?} on page {} already has rows", path, page.id);
                continue;
            }
            match self.build(page, &path) {
                Some(table) => pass.tables.push(table),
                None => pass.skipped += 1,
            }
        }
        pass
    }

    /// Rebuild the table region at `path`.
    ///
    /// The region's words are reordered row-major and its children replaced
    /// by `tr` rows holding `td` cells. Returns `None`, leaving the region
    /// untouched, when it has too few cells or a cell without a box.
    pub fn build(&self, page: &mut Page, path: &[usize]) -> Option<Table> {
        let region = region_at(&page.regions, path)?;
        if region.children.len() < self.config.min_cells {
            log::warn!(
                "Skipping table on page {}: {} cells (need {})",
                page.id,
                region.children.len(),
                self.config.min_cells
            );
            return None;
        }

        let mut boxes = Vec::with_capacity(region.children.len());
        let mut spans = Vec::with_capacity(region.children.len());
        for child in &region.children {
            let Some(bbox) = child.bounding_box() else {
                log::warn!(
                    "Skipping table on page {}: cell {}..{} has no bounding box",
                    page.id,
                    child.start,
                    child.end
                );
                return None;
            };
            boxes.push(bbox);
            spans.push((child.start, child.end));
        }
        let end = region.end.min(page.words.len());
        let range = region.start.min(end)..end;

        let grid = self.reconstruct(&boxes)?;

        // Row-major word order; words outside every cell trail the rows.
        let mut used = vec![false; range.len()];
        let mut order = Vec::with_capacity(range.len());
        let mut placed = vec![(0usize, 0usize); boxes.len()];
        for cell in grid.rows.iter().flat_map(|r| r.cells.iter()) {
            let Some(source) = cell.source else { continue };
            let (start, end) = spans[source];
            let begin = range.start + order.len();
            for index in start.max(range.start)..end.min(range.end) {
                if !used[index - range.start] {
                    used[index - range.start] = true;
                    order.push(index);
                }
            }
            placed[source] = (begin, range.start + order.len());
        }
        for (offset, taken) in used.iter().enumerate() {
            if !taken {
                order.push(range.start + offset);
            }
        }
        page.reorder_range(range.clone(), &order);

        let mut table = Table::new();
        let mut row_regions = Vec::with_capacity(grid.rows.len());
        for row in &grid.rows {
            let row_start = row
                .cells
                .iter()
                .filter_map(|c| c.source.map(|s| placed[s].0))
                .min()
                .unwrap_or(range.start);
            let row_end = row
                .cells
                .iter()
                .filter_map(|c| c.source.map(|s| placed[s].1))
                .max()
                .unwrap_or(row_start);

            let mut cells = Vec::with_capacity(row.cells.len());
            let mut cell_regions = Vec::with_capacity(row.cells.len());
            let mut cursor = row_start;
            for cell in &row.cells {
                let (start, end) = match cell.source {
                    Some(source) => placed[source],
                    None => (cursor, cursor),
                };
                cursor = end;

                let mut td = Region::new(RegionType::TableCell, start, end).with_box(cell.bounding_box);
                if cell.col_span > 1 {
                    td.set_attribute("colSpan", cell.col_span.to_string());
                }
                if cell.row_span > 1 {
                    td.set_attribute("rowSpan", cell.row_span.to_string());
                }
                let model_cell = if cell.is_filler() {
                    td.set_attribute("isEmpty", "true");
                    TableCell::filler(cell.bounding_box)
                } else {
                    TableCell::new(cell.bounding_box, start, end)
                };
                cells.push(
                    model_cell
                        .colspan(cell.col_span)
                        .rowspan(cell.row_span)
                        .at_column(cell.column),
                );
                cell_regions.push(td);
            }

            let mut tr = Region::new(RegionType::TableRow, row_start, row_end).with_box(row.bounding_box);
            tr.children = cell_regions;
            row_regions.push(tr);
            table.add_row(TableRow::new(cells, row.bounding_box));
        }

        let region = region_at_mut(&mut page.regions, path)?;
        region.children = row_regions;
        log::debug!(
            "TableBuilder: page {} table {}x{} ({} fillers)",
            page.id,
            table.row_count(),
            grid.column_count(),
            table.synthetic_cell_count()
        );
        Some(table)
    }

    /// Reconstruct the grid geometry of a set of cell boxes.
    pub fn reconstruct(&self, cells: &[BoundingBox]) -> Option<Grid> {
        if cells.len() < self.config.min_cells {
            return None;
        }

        // Step 1: Grid lines in both directions
        let column_lines = self.grid_lines(cells, Axis::Columns);
        let row_lines = self.grid_lines(cells, Axis::Rows);
        log::debug!(
            "TableBuilder: {} cells, column lines {:?}, row lines {:?}",
            cells.len(),
            column_lines,
            row_lines
        );

        // Step 2: Peel rows off along the row lines
        let groups = group_rows(cells, &row_lines);
        let row_tops: Vec<f32> = groups
            .iter()
            .map(|g| g.iter().map(|&i| cells[i].top).fold(f32::INFINITY, f32::min))
            .collect();

        // Step 3: Spans
        let mut rows: Vec<Vec<GridCell>> = Vec::with_capacity(groups.len());
        for (r, group) in groups.iter().enumerate() {
            let row = group
                .iter()
                .map(|&i| {
                    let bbox = cells[i];
                    let col_span = groups
                        .iter()
                        .enumerate()
                        .filter(|(other, _)| *other != r)
                        .map(|(_, g)| {
                            g.iter()
                                .filter(|&&k| cells[k].horizontal().overlaps(&bbox.horizontal()))
                                .count()
                        })
                        .max()
                        .unwrap_or(1)
                        .max(1);
                    let row_span = 1 + row_tops[r + 1..].iter().filter(|top| **top < bbox.bottom).count();
                    GridCell {
                        source: Some(i),
                        bounding_box: bbox,
                        row_span,
                        col_span,
                        column: column_index(&column_lines, bbox.left),
                    }
                })
                .collect();
            rows.push(row);
        }
        let bounds: Vec<BoundingBox> = rows.iter().map(|row| tightened_bounds(row)).collect();

        // Step 4: Fill holes
        let extent = BoundingBox::union_all(cells)?;
        for r in 0..rows.len() {
            let fillers = self.fillers_for_row(r, &rows, &groups, cells, &bounds[r], &extent, &column_lines);
            if fillers.is_empty() {
                continue;
            }
            log::debug!("TableBuilder: row {} gets {} filler cells", r, fillers.len());
            rows[r].extend(fillers);
            rows[r].sort_by(|a, b| a.bounding_box.left.total_cmp(&b.bounding_box.left));
        }

        let rows = rows
            .into_iter()
            .zip(bounds)
            .map(|(cells, bounding_box)| GridRow { cells, bounding_box })
            .collect();
        Some(Grid {
            rows,
            column_lines,
            row_lines,
        })
    }

    /// Grid lines along `axis`: midpoints of the surviving passages.
    pub fn grid_lines(&self, cells: &[BoundingBox], axis: Axis) -> Vec<f32> {
        let Some(extent) = cells.iter().map(|c| axis.cross(c)).reduce(|a, b| a.hull(&b)) else {
            return Vec::new();
        };

        let mut order: Vec<usize> = (0..cells.len()).collect();
        order.sort_by(|&a, &b| axis.cross(&cells[a]).start.total_cmp(&axis.cross(&cells[b]).start));

        let mut raw: Vec<Passage> = Vec::new();
        for &i in &order {
            for &j in &order {
                if i == j {
                    continue;
                }
                let Some(sweep) = axis.sweep(&cells[i]).gap_to(&axis.sweep(&cells[j])) else {
                    continue;
                };
                let passage = Passage {
                    sweep,
                    cross: axis.cross(&cells[i]).hull(&axis.cross(&cells[j])),
                    full: false,
                };
                let blocked = cells
                    .iter()
                    .enumerate()
                    .any(|(k, c)| k != i && k != j && passage.blocked_by(c, axis));
                if !blocked && !raw.contains(&passage) {
                    raw.push(passage);
                }
            }
        }
        log::debug!("TableBuilder: {} raw passages along {:?}", raw.len(), axis);

        let refined: Vec<Passage> = raw
            .iter()
            .map(|p| self.refine(p, cells, axis, extent))
            .collect();
        intersect_passages(refined)
            .iter()
            .map(|p| p.sweep.midpoint())
            .collect()
    }

    /// Restrict a passage to its full-pass sub-range, or failing that split
    /// it around spanning cells and cut it against the cells beside it.
    fn refine(&self, passage: &Passage, cells: &[BoundingBox], axis: Axis, extent: Interval) -> Passage {
        let tolerance = self.config.full_pass_tolerance;
        let everywhere: Vec<Interval> = cells
            .iter()
            .map(|c| axis.sweep(c))
            .filter(|s| s.len() > 2.0 * tolerance)
            .map(|s| Interval::new(s.start + tolerance, s.end - tolerance))
            .collect();
        if let Some(sweep) = widest(subtract_all(passage.sweep, &everywhere)) {
            return Passage {
                sweep,
                cross: extent,
                full: true,
            };
        }

        // (a) split around cells spanning the whole passage
        let spanning: Vec<Interval> = cells
            .iter()
            .filter(|c| {
                let s = axis.sweep(c);
                s.overlaps(&passage.sweep) && s.contains(&passage.sweep)
            })
            .map(|c| axis.cross(c))
            .collect();
        let anchor = passage.cross.midpoint();
        let cross = subtract_all(extent, &spanning)
            .into_iter()
            .find(|segment| segment.contains_point(anchor))
            .unwrap_or(passage.cross);

        // (b) cut against cells still reaching into the segment
        let beside: Vec<Interval> = cells
            .iter()
            .filter(|c| axis.cross(c).overlaps(&cross))
            .map(|c| axis.sweep(c))
            .collect();
        match widest(subtract_all(passage.sweep, &beside)) {
            Some(sweep) => Passage {
                sweep,
                cross,
                full: false,
            },
            None => *passage,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fillers_for_row(
        &self,
        r: usize,
        rows: &[Vec<GridCell>],
        groups: &[Vec<usize>],
        cells: &[BoundingBox],
        bounds: &BoundingBox,
        extent: &BoundingBox,
        column_lines: &[f32],
    ) -> Vec<GridCell> {
        let mut occupied: Vec<Interval> = rows[r].iter().map(|c| c.bounding_box.horizontal()).collect();
        for (earlier, row) in rows.iter().enumerate().take(r) {
            occupied.extend(
                row.iter()
                    .filter(|c| earlier + c.row_span > r)
                    .map(|c| c.bounding_box.horizontal()),
            );
        }
        let occupied = union_all(occupied);

        let mut fillers = Vec::new();
        for gap in subtract_all(extent.horizontal(), &occupied) {
            let inside: Vec<Interval> = groups
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != r)
                .flat_map(|(_, g)| g.iter())
                .map(|&k| cells[k].horizontal())
                .filter(|h| gap.contains(h))
                .collect();
            for column in union_all(inside) {
                let bbox = BoundingBox::new(column.start, column.end, bounds.top, bounds.bottom);
                fillers.push(GridCell {
                    source: None,
                    bounding_box: bbox,
                    row_span: 1,
                    col_span: 1,
                    column: column_index(column_lines, column.start),
                });
            }
        }
        fillers
    }
}

/// Paths of all table regions, not descending into tables.
fn collect_table_paths(regions: &[Region], prefix: &mut RegionPath, out: &mut Vec<RegionPath>) {
    for (i, region) in regions.iter().enumerate() {
        prefix.push(i);
        if region.kind == RegionType::Table {
            out.push(prefix.clone());
        } else {
            collect_table_paths(&region.children, prefix, out);
        }
        prefix.pop();
    }
}

/// Group cells into rows: each row line takes the unassigned cells whose
/// top lies above it; the rest form the last row.
fn group_rows(cells: &[BoundingBox], row_lines: &[f32]) -> Vec<Vec<usize>> {
    let mut remaining: Vec<usize> = (0..cells.len()).collect();
    remaining.sort_by(|&a, &b| {
        cells[a]
            .left
            .total_cmp(&cells[b].left)
            .then(cells[a].top.total_cmp(&cells[b].top))
    });

    let mut rows = Vec::with_capacity(row_lines.len() + 1);
    for &line in row_lines {
        let (row, rest): (Vec<usize>, Vec<usize>) = remaining.into_iter().partition(|&i| cells[i].top < line);
        remaining = rest;
        if !row.is_empty() {
            rows.push(row);
        }
    }
    if !remaining.is_empty() {
        rows.push(remaining);
    }
    rows
}

/// Row bounds over the cells that end in this row.
fn tightened_bounds(row: &[GridCell]) -> BoundingBox {
    let all: Vec<BoundingBox> = row.iter().map(|c| c.bounding_box).collect();
    let single: Vec<BoundingBox> = row
        .iter()
        .filter(|c| c.row_span == 1)
        .map(|c| c.bounding_box)
        .collect();
    let hull = BoundingBox::union_all(&all).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0));
    let bottom = if single.is_empty() {
        all.iter().map(|b| b.bottom).fold(f32::INFINITY, f32::min)
    } else {
        single.iter().map(|b| b.bottom).fold(f32::NEG_INFINITY, f32::max)
    };
    BoundingBox::new(hull.left, hull.right, hull.top, bottom.max(hull.top))
}

/// Number of column lines at or left of `x`.
fn column_index(column_lines: &[f32], x: f32) -> usize {
    column_lines.iter().filter(|line| **line <= x).count()
}

/// Widest interval, the first one on ties.
fn widest(pieces: Vec<Interval>) -> Option<Interval> {
    pieces.into_iter().fold(None, |best: Option<Interval>, p| match best {
        Some(b) if b.len() >= p.len() => Some(b),
        _ => Some(p),
    })
}

/// Merge passages whose sweep intervals touch. Full passes win over partial
/// ones; passages of the same kind shrink to their common sub-interval.
fn intersect_passages(mut passages: Vec<Passage>) -> Vec<Passage> {
    passages.sort_by(|a, b| {
        a.sweep
            .start
            .total_cmp(&b.sweep.start)
            .then(a.sweep.end.total_cmp(&b.sweep.end))
    });

    let mut merged: Vec<Passage> = Vec::with_capacity(passages.len());
    for passage in passages {
        match merged.last_mut() {
            Some(last) if last.sweep.touches(&passage.sweep) => match (last.full, passage.full) {
                (true, false) => {}
                (false, true) => *last = passage,
                _ => {
                    if let Some(common) = last.sweep.intersect(&passage.sweep) {
                        last.sweep = common;
                        last.cross = last.cross.hull(&passage.cross);
                    }
                }
            },
            _ => merged.push(passage),
        }
    }
    merged
}
