mod progress;
mod tile;

pub use progress::{Progress, ProgressStep, RowAction};
pub use tile::{TileGrid, TileInfo};

use crate::{
    check::{Admission, Check, CheckContext, IssueReporter},
    container::{DataContainer, collect_dependent_tables},
    error::ContainerError,
    involved::{ENTIRE_TABLE, Involved},
    result::{AddOutcome, ErrorAdmin, QaError},
    tables::{RowRef, TableFilter, TableHandle},
};
use std::{collections::HashMap, rc::Rc};
use tileqa_geom::Envelope;
use tracing::{debug, warn};

pub type ProgressFn = dyn FnMut(&Progress);
pub type IssueFn = dyn FnMut(&QaError);
pub type TestingRowFn = dyn FnMut(&str, &RowRef) -> RowAction;
pub type PostProcessFn = dyn FnMut(&QaError) -> bool;

///
/// RunReport
///
/// Outcome of one run. `issues` holds the accepted findings in
/// acceptance order; cancelled covers vetoed, filtered, and duplicate
/// findings.
///

#[derive(Debug, Default)]
pub struct RunReport {
    pub tiles_processed: usize,
    pub rows_executed: usize,
    pub rows_deferred: usize,
    pub rows_skipped: usize,
    pub issues: Vec<QaError>,
    pub issues_cancelled: usize,
    pub failed_checks: Vec<String>,
    pub stopped: bool,
}

impl RunReport {
    #[must_use]
    pub fn issues_found(&self) -> usize {
        self.issues.len()
    }
}

///
/// CheckRunner
///
/// Drives a tiled run: computes the run envelope, iterates tiles
/// bottom-left first, loads the data container per tile, feeds admitted
/// rows to every check, and evicts findings behind the frontier after
/// each tile.
///

pub struct CheckRunner {
    checks: Vec<Box<dyn Check>>,
    tile_size: f64,
    keep_issue_geometry: bool,
    progress: Option<Box<ProgressFn>>,
    on_issue: Option<Box<IssueFn>>,
    testing_row: Option<Box<TestingRowFn>>,
    post_process: Option<Box<PostProcessFn>>,
}

impl CheckRunner {
    #[must_use]
    pub fn new(tile_size: f64) -> Self {
        Self {
            checks: Vec::new(),
            tile_size,
            keep_issue_geometry: false,
            progress: None,
            on_issue: None,
            testing_row: None,
            post_process: None,
        }
    }

    pub fn add_check(&mut self, check: Box<dyn Check>) -> usize {
        self.checks.push(check);
        self.checks.len() - 1
    }

    /// Keep raw finding geometries instead of reducing them to their
    /// envelope once the finding has been surfaced.
    pub fn keep_issue_geometry(&mut self, keep: bool) {
        self.keep_issue_geometry = keep;
    }

    pub fn on_progress(&mut self, callback: Box<ProgressFn>) {
        self.progress = Some(callback);
    }

    /// Fires once per accepted (non-duplicate) finding, before its
    /// geometry is reduced.
    pub fn on_issue(&mut self, callback: Box<IssueFn>) {
        self.on_issue = Some(callback);
    }

    /// Per-row hook; may skip a row or stop the run at the next row
    /// boundary.
    pub fn on_testing_row(&mut self, callback: Box<TestingRowFn>) {
        self.testing_row = Some(callback);
    }

    /// Veto hook over findings before they are recorded.
    pub fn on_post_process(&mut self, callback: Box<PostProcessFn>) {
        self.post_process = Some(callback);
    }

    /// Union of the involved tables' and surfaces' extents, when no
    /// explicit run extent is given.
    #[must_use]
    pub fn full_extent(&self) -> Option<Envelope> {
        let mut extent: Option<Envelope> = None;
        let mut merge = |env: Option<Envelope>| {
            if let Some(env) = env {
                extent = Some(match extent {
                    Some(acc) => acc.union(&env),
                    None => env,
                });
            }
        };

        for check in &self.checks {
            for props in check.base().tables() {
                merge(props.table.extent());
            }
            for surface in check.base().surfaces() {
                merge(surface.extent());
            }
        }

        extent
    }

    pub fn run(&mut self, extent: Option<Envelope>) -> Result<RunReport, ContainerError> {
        let run_envelope = match extent {
            Some(extent) => extent,
            None => self.full_extent().ok_or(ContainerError::NoExtent)?,
        };

        let grid = TileGrid::new(run_envelope, self.tile_size);
        let tables = self.wired_tables();
        let tables_by_name: HashMap<String, TableHandle> = tables
            .iter()
            .map(|t| (t.name().to_string(), Rc::clone(t)))
            .collect();
        let max_search = self
            .checks
            .iter()
            .map(|c| c.base().search_distance())
            .fold(0.0, f64::max);

        let mut admin = ErrorAdmin::new();
        let mut container = DataContainer::new();
        let mut report = RunReport::default();
        let mut active = vec![true; self.checks.len()];
        let mut processed: Option<Envelope> = None;

        self.notify(Progress {
            step: ProgressStep::RunBegin,
            current: 0,
            total: grid.count(),
            envelope: Some(run_envelope),
        });

        for index in 0..grid.count() {
            let tile = grid.envelope(index);
            let cumulative = match processed {
                Some(acc) => acc.union(&tile),
                None => tile,
            };
            processed = Some(cumulative);

            let info = TileInfo {
                index,
                total: grid.count(),
                envelope: tile,
                processed: cumulative,
                run_envelope,
            };

            self.notify(Progress {
                step: ProgressStep::TileProcessing,
                current: index,
                total: grid.count(),
                envelope: Some(tile),
            });
            debug!(tile = index, total = grid.count(), "processing tile");

            let load_extent = tile.expanded(max_search);
            container.begin_tile(tile, load_extent, &tables);

            let stopped = self.process_tile(
                &info,
                load_extent,
                &mut container,
                &mut admin,
                &mut report,
                &mut active,
                &tables_by_name,
            );

            container.complete_tile();

            self.notify(Progress {
                step: ProgressStep::TileCompleting,
                current: index,
                total: grid.count(),
                envelope: Some(tile),
            });

            // everything at least one search distance below the current
            // row of tiles can no longer change
            let frontier_y = (tile.y_min - max_search).next_down();
            let evicted = admin.clear(run_envelope.x_max, frontier_y, Some(&run_envelope));
            if evicted > 0 {
                debug!(evicted, pending = admin.len(), "evicted settled findings");
            }

            report.tiles_processed += 1;
            if stopped {
                report.stopped = true;
                break;
            }
        }

        self.notify(Progress {
            step: ProgressStep::RunCompleted,
            current: report.tiles_processed,
            total: grid.count(),
            envelope: Some(run_envelope),
        });

        Ok(report)
    }

    /// The transitive closure of tables any check or row filter reads.
    fn wired_tables(&self) -> Vec<TableHandle> {
        let roots: Vec<TableHandle> = self
            .checks
            .iter()
            .flat_map(|c| c.base().involved_tables())
            .collect();
        collect_dependent_tables(&roots)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_tile(
        &mut self,
        info: &TileInfo,
        load_extent: Envelope,
        container: &mut DataContainer,
        admin: &mut ErrorAdmin,
        report: &mut RunReport,
        active: &mut [bool],
        tables_by_name: &HashMap<String, TableHandle>,
    ) -> bool {
        let mut reporter = RunReporter {
            admin,
            issues: &mut report.issues,
            cancelled: &mut report.issues_cancelled,
            keep_geometry: self.keep_issue_geometry,
            on_issue: self.on_issue.as_deref_mut(),
            post_process: self.post_process.as_deref_mut(),
            tables_by_name,
        };
        let mut stop = false;

        for check_index in 0..self.checks.len() {
            if !active[check_index] {
                continue;
            }
            if let Err(err) = self.checks[check_index].begin_tile(info) {
                quarantine(
                    &mut self.checks,
                    check_index,
                    active,
                    &mut report.failed_checks,
                    &mut reporter,
                    &err,
                );
            }
        }

        'checks: for check_index in 0..self.checks.len() {
            if !active[check_index] {
                continue;
            }
            let check_name = self.checks[check_index].base().name().to_string();
            let occurrence_count = self.checks[check_index].base().tables().len();

            for occurrence in 0..occurrence_count {
                let (table, queried_only) = {
                    let props = &self.checks[check_index].base().tables()[occurrence];
                    (Rc::clone(&props.table), props.queried_only)
                };
                if queried_only {
                    continue;
                }

                let filter = TableFilter::extent(load_extent);
                let rows = container
                    .search(&table, &filter)
                    .unwrap_or_else(|| table.enum_rows(&filter));
                let mut context = CheckContext::new(Some(&mut *container), &mut reporter);

                for row in rows {
                    // rows without geometry run once, in the first tile
                    if row.envelope().is_none() && !info.is_first() {
                        continue;
                    }

                    if let Some(hook) = &mut self.testing_row {
                        match hook(&check_name, &row) {
                            RowAction::Continue => {}
                            RowAction::Skip => {
                                report.rows_skipped += 1;
                                continue;
                            }
                            RowAction::Stop => {
                                stop = true;
                                break 'checks;
                            }
                        }
                    }

                    let check = &mut self.checks[check_index];
                    let admission = match row.envelope() {
                        // loaded for cross-tile searches only; its own
                        // tile will execute it
                        Some(env) if !env.intersects(&info.envelope) => Admission::Defer,
                        _ => check.base().admit(occurrence, &row),
                    };
                    match admission {
                        Admission::Skip => continue,
                        Admission::Defer => {
                            report.rows_deferred += 1;
                            continue;
                        }
                        Admission::Admit => {}
                    }

                    report.rows_executed += 1;
                    if let Err(err) = check.execute_row(&mut context, occurrence, &row) {
                        drop(context);
                        quarantine(
                            &mut self.checks,
                            check_index,
                            active,
                            &mut report.failed_checks,
                            &mut reporter,
                            &err,
                        );
                        continue 'checks;
                    }
                }
            }
        }

        for check_index in 0..self.checks.len() {
            if !active[check_index] {
                continue;
            }
            let mut context = CheckContext::new(Some(&mut *container), &mut reporter);
            if let Err(err) = self.checks[check_index].complete_tile(&mut context, info) {
                drop(context);
                quarantine(
                    &mut self.checks,
                    check_index,
                    active,
                    &mut report.failed_checks,
                    &mut reporter,
                    &err,
                );
            }
        }

        stop
    }

    fn notify(&mut self, progress: Progress) {
        if let Some(callback) = &mut self.progress {
            callback(&progress);
        }
    }
}

/// Disable a failing check for the rest of the run and surface the
/// failure as a finding with the offending row's provenance.
fn quarantine(
    checks: &mut [Box<dyn Check>],
    check_index: usize,
    active: &mut [bool],
    failed: &mut Vec<String>,
    reporter: &mut dyn IssueReporter,
    err: &crate::error::DataError,
) {
    let name = checks[check_index].base().name().to_string();
    warn!(check = name.as_str(), error = %err, "check failed and was disabled");

    active[check_index] = false;
    failed.push(name.clone());

    let issue = QaError::new(
        name,
        format!("check failed and was disabled: {err}"),
        vec![Involved::row(&err.table, err.object_id)],
    );
    reporter.accept(issue);
}

struct RunReporter<'a> {
    admin: &'a mut ErrorAdmin,
    issues: &'a mut Vec<QaError>,
    cancelled: &'a mut usize,
    keep_geometry: bool,
    on_issue: Option<&'a mut IssueFn>,
    post_process: Option<&'a mut PostProcessFn>,
    tables_by_name: &'a HashMap<String, TableHandle>,
}

impl IssueReporter for RunReporter<'_> {
    fn accept(&mut self, mut issue: QaError) -> bool {
        if let Some(veto) = &mut self.post_process {
            if !veto(&issue) {
                *self.cancelled += 1;
                return false;
            }
        }

        if issue.eviction_extent.is_none() {
            issue.eviction_extent = involved_extent(self.tables_by_name, &issue.involved);
        }

        // the administrator only needs the envelope for dedup/eviction
        let mut admin_copy = issue.clone();
        admin_copy.reduce_geometry();

        match self.admin.add(admin_copy) {
            AddOutcome::Duplicate(_) => {
                debug!(check = issue.check_name.as_str(), "duplicate finding dropped");
                *self.cancelled += 1;
                false
            }
            AddOutcome::Added => {
                if let Some(hook) = &mut self.on_issue {
                    hook(&issue);
                }
                if !self.keep_geometry {
                    issue.reduce_geometry();
                }
                self.issues.push(issue);
                true
            }
        }
    }

    fn cancelled(&mut self, _issue: &QaError) {
        *self.cancelled += 1;
    }
}

/// Union of the involved rows' envelopes, for frontier eviction of
/// findings that carry no geometry of their own.
fn involved_extent(
    tables: &HashMap<String, TableHandle>,
    involved: &[Involved],
) -> Option<Envelope> {
    let mut leaves = Vec::new();
    for node in involved {
        node.leaves(&mut leaves);
    }

    let mut extent: Option<Envelope> = None;
    for (table, object_id) in leaves {
        if object_id == ENTIRE_TABLE {
            continue;
        }
        let Some(env) = tables
            .get(table)
            .and_then(|t| t.row_by_id(object_id))
            .and_then(|r| r.envelope())
        else {
            continue;
        };
        extent = Some(match extent {
            Some(acc) => acc.union(&env),
            None => env,
        });
    }

    extent
}

#[cfg(test)]
mod tests {
    use super::CheckRunner;
    use crate::{
        check::{Check, CheckBase, CheckContext},
        error::{ContainerError, DataError},
        tables::{MemoryTable, RowRef, TableHandle, TableRow},
        value::TextMode,
    };
    use std::rc::Rc;
    use tileqa_geom::{Envelope, Geometry};

    struct NoopCheck {
        base: CheckBase,
    }

    impl NoopCheck {
        fn new(table: TableHandle) -> Self {
            let mut base = CheckBase::new("noop");
            base.add_table(table, "", TextMode::Ci).unwrap();
            Self { base }
        }
    }

    impl Check for NoopCheck {
        fn base(&self) -> &CheckBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut CheckBase {
            &mut self.base
        }

        fn execute_row(
            &mut self,
            _context: &mut CheckContext<'_>,
            _occurrence: usize,
            _row: &RowRef,
        ) -> Result<usize, DataError> {
            Ok(0)
        }
    }

    fn point_table(name: &str, coords: &[(f64, f64)]) -> TableHandle {
        let mut table = MemoryTable::new(name, vec![]);
        for (i, (x, y)) in (0i64..).zip(coords.iter()) {
            table.add_row(TableRow::new(i, vec![]).with_shape(Geometry::point(*x, *y)));
        }
        Rc::new(table)
    }

    #[test]
    fn full_extent_unions_all_involved_tables() {
        let mut runner = CheckRunner::new(100.0);
        runner.add_check(Box::new(NoopCheck::new(point_table(
            "a",
            &[(0.0, 0.0), (10.0, 10.0)],
        ))));
        runner.add_check(Box::new(NoopCheck::new(point_table("b", &[(50.0, -5.0)]))));

        assert_eq!(
            runner.full_extent(),
            Some(Envelope::new(0.0, -5.0, 50.0, 10.0))
        );
    }

    #[test]
    fn run_without_any_extent_fails() {
        let mut runner = CheckRunner::new(100.0);
        assert!(matches!(runner.run(None), Err(ContainerError::NoExtent)));
    }

    #[test]
    fn run_covers_every_tile() {
        let table = point_table("a", &[(5.0, 5.0), (95.0, 95.0)]);
        let mut runner = CheckRunner::new(50.0);
        runner.add_check(Box::new(NoopCheck::new(table)));

        let report = runner.run(None).unwrap();

        assert_eq!(report.tiles_processed, 4);
        assert_eq!(report.rows_executed, 2);
        assert!(!report.stopped);
    }
}
