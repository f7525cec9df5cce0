//! End-to-end tiled runs: tile coverage, cross-tile deduplication,
//! deferral, quarantine, and the geometry release policy.

use std::{cell::RefCell, rc::Rc};
use tileqa_core::{
    check::{Check, CheckBase, CheckContext},
    error::DataError,
    result::QaError,
    scheduler::{CheckRunner, ProgressStep, RowAction},
    tables::{MemoryTable, RowRef, TableHandle, TableRow, involved_for_row},
    value::{TextMode, Value},
};
use tileqa_geom::{Envelope, Geometry};

/// Reports one finding per admitted row whose first value exceeds a
/// threshold; optionally fails on one configured row.
struct ThresholdCheck {
    base: CheckBase,
    threshold: f64,
    fail_on: Option<i64>,
}

impl ThresholdCheck {
    fn new(table: TableHandle, threshold: f64) -> Self {
        let mut base = CheckBase::new("threshold");
        base.add_table(table, "", TextMode::Ci).unwrap();
        Self {
            base,
            threshold,
            fail_on: None,
        }
    }

    fn failing_on(mut self, object_id: i64) -> Self {
        self.fail_on = Some(object_id);
        self
    }
}

impl Check for ThresholdCheck {
    fn base(&self) -> &CheckBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CheckBase {
        &mut self.base
    }

    fn execute_row(
        &mut self,
        context: &mut CheckContext<'_>,
        occurrence: usize,
        row: &RowRef,
    ) -> Result<usize, DataError> {
        if self.fail_on == Some(row.object_id) {
            return Err(DataError::new(
                self.base.tables()[occurrence].table.name(),
                row.object_id,
                "unreadable row",
            ));
        }

        let above = row
            .values
            .first()
            .and_then(Value::as_f64)
            .is_some_and(|v| v > self.threshold);
        if !above {
            return Ok(0);
        }

        let props = &self.base.tables()[occurrence];
        let mut issue = QaError::new(
            self.base.name(),
            format!("value above {}", self.threshold),
            vec![involved_for_row(props.table.as_ref(), row)],
        );
        if let Some(shape) = &row.shape {
            issue = issue.with_geometry(shape.clone());
        }

        Ok(self.base.report(context.reporter, issue))
    }
}

/// Points spread over a 100x100 extent, one per 20-unit step, each
/// carrying its x coordinate as the checked value.
fn point_grid(name: &str) -> TableHandle {
    let mut table = MemoryTable::new(name, vec!["v".to_string()]);
    let mut id = 0;
    for ix in 0..5 {
        for iy in 0..5 {
            let x = f64::from(ix).mul_add(20.0, 5.0);
            let y = f64::from(iy).mul_add(20.0, 5.0);
            table.add_row(
                TableRow::new(id, vec![Value::Float(x)]).with_shape(Geometry::point(x, y)),
            );
            id += 1;
        }
    }
    Rc::new(table)
}

fn run_extent() -> Envelope {
    Envelope::new(0.0, 0.0, 100.0, 100.0)
}

#[test]
fn tiled_run_visits_every_row_exactly_once() {
    let table = point_grid("obs");
    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(ThresholdCheck::new(table, -1.0)));

    let report = runner.run(Some(run_extent())).unwrap();

    assert_eq!(report.tiles_processed, 4);
    assert_eq!(report.rows_executed, 25);
    assert_eq!(report.issues_found(), 25);
    assert_eq!(report.issues_cancelled, 0);
    assert!(report.failed_checks.is_empty());
}

#[test]
fn boundary_crossing_feature_is_reported_once() {
    // one rectangle straddling the x=50 tile boundary
    let mut table = MemoryTable::new("parcels", vec!["v".to_string()]);
    table.add_row(
        TableRow::new(1, vec![Value::Float(10.0)])
            .with_shape(Geometry::rectangle(&Envelope::new(45.0, 10.0, 55.0, 20.0))),
    );
    let table: TableHandle = Rc::new(table);

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(ThresholdCheck::new(table, 0.0)));

    let report = runner.run(Some(run_extent())).unwrap();

    // executed in both intersecting tiles, deduplicated by the
    // administrator on the second report
    assert_eq!(report.rows_executed, 2);
    assert_eq!(report.issues_found(), 1);
    assert_eq!(report.issues_cancelled, 1);
}

#[test]
fn search_distance_defers_rows_to_their_own_tile() {
    // a point 3 units left of the x=50 boundary; with a 5-unit search
    // distance the right-hand tiles load it but must not execute it
    let mut table = MemoryTable::new("obs", vec!["v".to_string()]);
    table.add_row(
        TableRow::new(1, vec![Value::Float(10.0)]).with_shape(Geometry::point(47.0, 10.0)),
    );
    let table: TableHandle = Rc::new(table);

    let mut check = ThresholdCheck::new(table, 0.0);
    check.base_mut().set_search_distance(5.0);

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(check));

    let report = runner.run(Some(run_extent())).unwrap();

    assert_eq!(report.rows_executed, 1);
    assert_eq!(report.rows_deferred, 1);
    assert_eq!(report.issues_found(), 1);
}

#[test]
fn rows_without_geometry_run_in_the_first_tile_only() {
    let mut table = MemoryTable::new("metadata", vec!["v".to_string()]);
    table.add_row(TableRow::new(1, vec![Value::Float(10.0)]));
    table.add_row(TableRow::new(2, vec![Value::Float(-10.0)]));
    let table: TableHandle = Rc::new(table);

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(ThresholdCheck::new(table, 0.0)));

    let report = runner.run(Some(run_extent())).unwrap();

    assert_eq!(report.tiles_processed, 4);
    assert_eq!(report.rows_executed, 2);
    assert_eq!(report.issues_found(), 1);
}

#[test]
fn constraints_gate_rows_before_execution() {
    let table = point_grid("obs");
    let mut check = ThresholdCheck::new(table, -1.0);
    check.base_mut().set_constraint(0, "v > 50").unwrap();

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(check));

    let report = runner.run(Some(run_extent())).unwrap();

    // only the two rightmost columns (x = 65, 85) pass the constraint
    assert_eq!(report.issues_found(), 10);
}

#[test]
fn issue_geometry_is_reduced_unless_kept() {
    let table = point_grid("obs");

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(ThresholdCheck::new(Rc::clone(&table), -1.0)));
    let report = runner.run(Some(run_extent())).unwrap();

    let geometry = report.issues[0].geometry.as_ref().unwrap();
    assert!(geometry.is_reduced());
    assert!(geometry.envelope().is_some());

    let mut keeping = CheckRunner::new(50.0);
    keeping.keep_issue_geometry(true);
    keeping.add_check(Box::new(ThresholdCheck::new(table, -1.0)));
    let report = keeping.run(Some(run_extent())).unwrap();

    assert!(report.issues[0].geometry.as_ref().unwrap().geometry().is_ok());
}

#[test]
fn issue_event_fires_once_per_accepted_finding_with_full_geometry() {
    let table = point_grid("obs");
    let seen = Rc::new(RefCell::new(0usize));
    let seen_hook = Rc::clone(&seen);

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(ThresholdCheck::new(table, 50.0)));
    runner.on_issue(Box::new(move |issue| {
        assert!(issue.geometry.as_ref().unwrap().geometry().is_ok());
        *seen_hook.borrow_mut() += 1;
    }));

    let report = runner.run(Some(run_extent())).unwrap();

    assert_eq!(*seen.borrow(), report.issues_found());
}

#[test]
fn post_process_veto_cancels_findings() {
    let table = point_grid("obs");

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(ThresholdCheck::new(table, -1.0)));
    runner.on_post_process(Box::new(|issue| {
        issue.envelope().is_some_and(|env| env.x_min < 50.0)
    }));

    let report = runner.run(Some(run_extent())).unwrap();

    // three of five columns lie left of x=50
    assert_eq!(report.issues_found(), 15);
    assert_eq!(report.issues_cancelled, 10);
}

#[test]
fn stop_request_halts_the_run_at_the_next_row() {
    let table = point_grid("obs");

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(ThresholdCheck::new(table, -1.0)));
    runner.on_testing_row(Box::new(|_, _| RowAction::Stop));

    let report = runner.run(Some(run_extent())).unwrap();

    assert!(report.stopped);
    assert_eq!(report.tiles_processed, 1);
    assert_eq!(report.rows_executed, 0);
}

#[test]
fn skip_requests_are_counted_and_not_executed() {
    let table = point_grid("obs");

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(ThresholdCheck::new(table, -1.0)));
    runner.on_testing_row(Box::new(|_, row| {
        if row.object_id % 2 == 0 {
            RowAction::Skip
        } else {
            RowAction::Continue
        }
    }));

    let report = runner.run(Some(run_extent())).unwrap();

    assert_eq!(report.rows_skipped, 13);
    assert_eq!(report.rows_executed, 12);
}

#[test]
fn failing_check_is_quarantined_and_surfaced_as_finding() {
    let table = point_grid("obs");

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(
        ThresholdCheck::new(Rc::clone(&table), 1000.0).failing_on(0),
    ));
    runner.add_check(Box::new(ThresholdCheck::new(table, -1.0)));

    let report = runner.run(Some(run_extent())).unwrap();

    assert_eq!(report.failed_checks, vec!["threshold".to_string()]);

    // the failure itself becomes a finding naming the offending row
    let failure = report
        .issues
        .iter()
        .find(|i| i.description.contains("disabled"))
        .unwrap();
    assert!(failure.description.contains("unreadable row"));

    // the healthy check still covers every row
    assert_eq!(report.issues_found(), 26);
}

#[test]
fn progress_brackets_the_run_and_counts_tiles() {
    let table = point_grid("obs");
    let steps = Rc::new(RefCell::new(Vec::new()));
    let steps_hook = Rc::clone(&steps);

    let mut runner = CheckRunner::new(50.0);
    runner.add_check(Box::new(ThresholdCheck::new(table, 1000.0)));
    runner.on_progress(Box::new(move |progress| {
        steps_hook.borrow_mut().push(progress.step);
    }));

    runner.run(Some(run_extent())).unwrap();

    let steps = steps.borrow();
    assert_eq!(steps.first(), Some(&ProgressStep::RunBegin));
    assert_eq!(steps.last(), Some(&ProgressStep::RunCompleted));
    assert_eq!(
        steps
            .iter()
            .filter(|s| **s == ProgressStep::TileProcessing)
            .count(),
        4
    );
}

#[test]
fn run_extent_defaults_to_the_data_extent() {
    let table = point_grid("obs");
    let mut runner = CheckRunner::new(1000.0);
    runner.add_check(Box::new(ThresholdCheck::new(table, -1.0)));

    let report = runner.run(None).unwrap();

    assert_eq!(report.tiles_processed, 1);
    assert_eq!(report.issues_found(), 25);
}
