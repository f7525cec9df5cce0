mod props;

pub use props::TableProps;

use crate::{
    constraint::TableConstraint,
    container::{DataContainer, SimpleSurface, SurfaceSource},
    error::{ContainerError, DataError, ExprError},
    filters::{IssueFilterSet, RowFilterSet},
    result::QaError,
    scheduler::TileInfo,
    tables::{RowRef, TableFilter, TableHandle},
    value::TextMode,
};
use std::rc::Rc;
use tileqa_geom::{Envelope, Geometry, relate};

///
/// Admission
///
/// Outcome of the per-row gating pipeline. Plain control flow, never an
/// error: `Skip` drops the row for good, `Defer` parks it for the tile
/// it belongs to.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admission {
    Admit,
    Skip,
    Defer,
}

///
/// CheckBase
///
/// Shared state and configuration surface of every check: involved
/// tables with per-occurrence properties, area of interest, surface
/// dependencies, and search distance.
///

pub struct CheckBase {
    name: String,
    tables: Vec<TableProps>,
    area_of_interest: Option<Geometry>,
    surfaces: Vec<Rc<dyn SurfaceSource>>,
    search_distance: f64,
}

impl CheckBase {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            area_of_interest: None,
            surfaces: Vec::new(),
            search_distance: 0.0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Involve `table` with an attribute constraint. Returns the new
    /// occurrence index.
    pub fn add_table(
        &mut self,
        table: TableHandle,
        constraint: &str,
        text_mode: TextMode,
    ) -> Result<usize, ExprError> {
        let constraint = TableConstraint::new(constraint, text_mode, table.as_ref())?;
        self.tables.push(TableProps::new(table, constraint));
        Ok(self.tables.len() - 1)
    }

    /// Replace the constraint of one occurrence.
    pub fn set_constraint(&mut self, occurrence: usize, expression: &str) -> Result<(), ExprError> {
        let props = &mut self.tables[occurrence];
        props.constraint =
            TableConstraint::new(expression, props.constraint.text_mode(), props.table.as_ref())?;
        Ok(())
    }

    pub fn set_queried_only(&mut self, occurrence: usize, queried_only: bool) {
        self.tables[occurrence].queried_only = queried_only;
    }

    pub fn set_row_filters(&mut self, occurrence: usize, filters: RowFilterSet) {
        self.tables[occurrence].row_filters = Some(filters);
    }

    pub fn set_issue_filters(&mut self, occurrence: usize, filters: IssueFilterSet) {
        self.tables[occurrence].issue_filters = Some(filters);
    }

    pub fn set_area_of_interest(&mut self, polygon: Geometry) {
        self.area_of_interest = Some(polygon);
    }

    pub fn add_surface(&mut self, surface: Rc<dyn SurfaceSource>) {
        self.surfaces.push(surface);
    }

    pub fn set_search_distance(&mut self, distance: f64) {
        self.search_distance = distance;
    }

    #[must_use]
    pub const fn search_distance(&self) -> f64 {
        self.search_distance
    }

    #[must_use]
    pub fn tables(&self) -> &[TableProps] {
        &self.tables
    }

    #[must_use]
    pub fn surfaces(&self) -> &[Rc<dyn SurfaceSource>] {
        &self.surfaces
    }

    #[must_use]
    pub fn uses_surfaces(&self) -> bool {
        !self.surfaces.is_empty()
    }

    /// All tables the check touches: involved tables plus the tables
    /// their row filters read. The scheduler wires the tile cache to the
    /// transitive closure of this set.
    #[must_use]
    pub fn involved_tables(&self) -> Vec<TableHandle> {
        let mut tables = Vec::new();
        for props in &self.tables {
            tables.push(Rc::clone(&props.table));
            if let Some(filters) = &props.row_filters {
                tables.extend(filters.involved_tables());
            }
        }
        tables
    }

    /// Gate one row: constraint match, area-of-interest membership, then
    /// row-filter admission.
    #[must_use]
    pub fn admit(&self, occurrence: usize, row: &RowRef) -> Admission {
        let Some(props) = self.tables.get(occurrence) else {
            return Admission::Skip;
        };

        if !props.constraint.matches(props.table.as_ref(), row) {
            return Admission::Skip;
        }

        if let (Some(aoi), Some(shape)) = (&self.area_of_interest, &row.shape) {
            if !relate::intersects(aoi, shape) {
                return Admission::Skip;
            }
        }

        if let Some(filters) = &props.row_filters {
            if !filters.admits(&props.table, row) {
                return Admission::Skip;
            }
        }

        Admission::Admit
    }

    /// Route a finding through the configured issue filters, then to the
    /// reporter. Returns 1 when the finding was accepted, 0 when it was
    /// cancelled or deduplicated.
    pub fn report(&self, reporter: &mut dyn IssueReporter, issue: QaError) -> usize {
        for props in &self.tables {
            if let Some(filters) = &props.issue_filters {
                if !filters.keeps(&issue) {
                    reporter.cancelled(&issue);
                    return 0;
                }
            }
        }

        usize::from(reporter.accept(issue))
    }
}

///
/// IssueReporter
///
/// Reporting surface handed to checks. The tiled scheduler's
/// implementation deduplicates, fires events, and applies the geometry
/// release policy; tests use [`IssueCollector`].
///

pub trait IssueReporter {
    /// `false` when the finding was rejected (duplicate or vetoed).
    fn accept(&mut self, issue: QaError) -> bool;

    /// A finding was cancelled before reaching the collection.
    fn cancelled(&mut self, _issue: &QaError) {}
}

///
/// IssueCollector
///

#[derive(Default)]
pub struct IssueCollector {
    pub issues: Vec<QaError>,
    pub cancelled: usize,
}

impl IssueCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IssueReporter for IssueCollector {
    fn accept(&mut self, issue: QaError) -> bool {
        self.issues.push(issue);
        true
    }

    fn cancelled(&mut self, _issue: &QaError) {
        self.cancelled += 1;
    }
}

///
/// CheckContext
///
/// Per-call execution context: cache-preferring searches and surface
/// access when a container is attached (tiled runs), plus the reporting
/// surface.
///

pub struct CheckContext<'a> {
    container: Option<&'a mut DataContainer>,
    pub reporter: &'a mut dyn IssueReporter,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        container: Option<&'a mut DataContainer>,
        reporter: &'a mut dyn IssueReporter,
    ) -> Self {
        Self {
            container,
            reporter,
        }
    }

    /// Rows matching `filter`, from the tile cache when it covers the
    /// request, otherwise enumerated directly (recycling disabled so row
    /// identity stays comparable).
    #[must_use]
    pub fn search(&self, table: &TableHandle, filter: &TableFilter) -> Vec<RowRef> {
        if let Some(container) = &self.container {
            if let Some(rows) = container.search(table, filter) {
                return rows;
            }
        }
        table.enum_rows(filter)
    }

    /// Tile-scoped surface access; fails outside the tiled scheduler.
    pub fn simple_surface(
        &mut self,
        source: &dyn SurfaceSource,
        extent: &Envelope,
    ) -> Result<Rc<SimpleSurface>, DataError> {
        match &mut self.container {
            Some(container) => container.simple_surface(source, extent),
            None => Err(DataError::table(
                source.name(),
                "surfaces are only available in tiled execution",
            )),
        }
    }

    /// Stable surrogate id for a row without native identity; `None`
    /// outside the tiled scheduler.
    pub fn unique_id(&mut self, table: &TableHandle, row: &RowRef) -> Option<i64> {
        self.container
            .as_mut()
            .map(|container| container.unique_ids(table).unique_id(row))
    }
}

///
/// Check
///
/// One quality rule. The scheduler drives it through the tile state
/// machine: `begin_tile`, `execute_row` per admitted row, then
/// `complete_tile` (which may itself report, e.g. for cross-tile
/// topology closure). `execute_row` returns the number of findings it
/// reported.
///

pub trait Check {
    fn base(&self) -> &CheckBase;

    fn base_mut(&mut self) -> &mut CheckBase;

    fn begin_tile(&mut self, _tile: &TileInfo) -> Result<(), DataError> {
        Ok(())
    }

    fn execute_row(
        &mut self,
        context: &mut CheckContext<'_>,
        occurrence: usize,
        row: &RowRef,
    ) -> Result<usize, DataError>;

    fn complete_tile(
        &mut self,
        _context: &mut CheckContext<'_>,
        _tile: &TileInfo,
    ) -> Result<usize, DataError> {
        Ok(0)
    }
}

fn require_no_surfaces(check: &dyn Check) -> Result<(), ContainerError> {
    if check.base().uses_surfaces() {
        return Err(ContainerError::SurfaceRequiresTiling {
            check: check.base().name().to_string(),
        });
    }
    Ok(())
}

fn execute_filtered(
    check: &mut dyn Check,
    reporter: &mut dyn IssueReporter,
    filter: &TableFilter,
    polygon: Option<&Geometry>,
) -> Result<usize, ContainerError> {
    require_no_surfaces(check)?;

    let mut reported = 0;
    for occurrence in 0..check.base().tables().len() {
        let props = &check.base().tables()[occurrence];
        if props.queried_only {
            continue;
        }

        let rows = props.table.enum_rows(filter);
        let mut context = CheckContext::new(None, reporter);

        for row in rows {
            if let (Some(polygon), Some(shape)) = (polygon, &row.shape) {
                if !relate::intersects(polygon, shape) {
                    continue;
                }
            }
            if check.base().admit(occurrence, &row) != Admission::Admit {
                continue;
            }
            reported += check
                .execute_row(&mut context, occurrence, &row)
                .map_err(ContainerError::Data)?;
        }
    }

    Ok(reported)
}

/// Non-tiled execution over every row of the involved tables.
pub fn execute_whole_table(
    check: &mut dyn Check,
    reporter: &mut dyn IssueReporter,
) -> Result<usize, ContainerError> {
    execute_filtered(check, reporter, &TableFilter::all(), None)
}

/// Non-tiled execution bounded by an envelope.
pub fn execute_extent(
    check: &mut dyn Check,
    extent: &Envelope,
    reporter: &mut dyn IssueReporter,
) -> Result<usize, ContainerError> {
    execute_filtered(check, reporter, &TableFilter::extent(*extent), None)
}

/// Non-tiled execution bounded by a polygon.
pub fn execute_polygon(
    check: &mut dyn Check,
    polygon: &Geometry,
    reporter: &mut dyn IssueReporter,
) -> Result<usize, ContainerError> {
    let filter = polygon
        .envelope()
        .map_or_else(TableFilter::all, TableFilter::extent);
    execute_filtered(check, reporter, &filter, Some(polygon))
}

/// Non-tiled execution of an explicit row list against one occurrence.
pub fn execute_rows(
    check: &mut dyn Check,
    occurrence: usize,
    rows: &[RowRef],
    reporter: &mut dyn IssueReporter,
) -> Result<usize, ContainerError> {
    require_no_surfaces(check)?;

    let mut reported = 0;
    let mut context = CheckContext::new(None, reporter);

    for row in rows {
        if check.base().admit(occurrence, row) != Admission::Admit {
            continue;
        }
        reported += check
            .execute_row(&mut context, occurrence, row)
            .map_err(ContainerError::Data)?;
    }

    Ok(reported)
}
