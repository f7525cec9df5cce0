use crate::{involved::compare_involved_sets, result::qa_error::QaError};
use std::cmp::Ordering;
use tileqa_geom::Envelope;

///
/// AddOutcome
///

#[derive(Debug)]
pub enum AddOutcome {
    Added,
    /// An equal finding was already present; the rejected one is handed
    /// back with its duplicate flag set.
    Duplicate(QaError),
}

impl AddOutcome {
    #[must_use]
    pub const fn is_added(&self) -> bool {
        matches!(self, Self::Added)
    }
}

///
/// ErrorAdmin
///
/// The run-global, sorted, duplicate-rejecting collection of findings.
///
/// Ordering: findings group by the order their check was first
/// encountered; within one check they order by involved-row count, then
/// tolerance-aware envelope, then description, then canonical provenance.
/// Structural equality under this ordering is the duplicate test.
///

#[derive(Default)]
pub struct ErrorAdmin {
    errors: Vec<QaError>,
    /// First-encounter order of check names.
    check_order: Vec<String>,
}

impl ErrorAdmin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QaError> {
        self.errors.iter()
    }

    /// Insert `error` at its sorted position, or reject it as a
    /// duplicate of an equal finding already present.
    pub fn add(&mut self, mut error: QaError) -> AddOutcome {
        self.register_check(&error.check_name);

        match self
            .errors
            .binary_search_by(|existing| self.compare(existing, &error))
        {
            Ok(_) => {
                error.duplicate = true;
                AddOutcome::Duplicate(error)
            }
            Err(position) => {
                self.errors.insert(position, error);
                AddOutcome::Added
            }
        }
    }

    /// Evict every finding that is fully behind the frontier and can no
    /// longer be re-raised. Returns the number of evicted findings.
    pub fn clear(
        &mut self,
        frontier_x: f64,
        frontier_y: f64,
        run_envelope: Option<&Envelope>,
    ) -> usize {
        let before = self.errors.len();
        self.errors
            .retain(|e| !e.is_fully_processed(frontier_x, frontier_y, run_envelope));
        before - self.errors.len()
    }

    fn register_check(&mut self, check_name: &str) {
        if !self.check_order.iter().any(|n| n == check_name) {
            self.check_order.push(check_name.to_string());
        }
    }

    fn check_rank(&self, check_name: &str) -> usize {
        self.check_order
            .iter()
            .position(|n| n == check_name)
            .unwrap_or(usize::MAX)
    }

    fn compare(&self, a: &QaError, b: &QaError) -> Ordering {
        self.check_rank(&a.check_name)
            .cmp(&self.check_rank(&b.check_name))
            .then_with(|| a.involved.len().cmp(&b.involved.len()))
            .then_with(|| compare_geometry(a, b))
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| compare_involved_sets(&a.involved, &b.involved))
    }
}

fn compare_geometry(a: &QaError, b: &QaError) -> Ordering {
    match (&a.geometry, &b.geometry) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(ga), Some(gb)) => ga.compare_envelope(gb),
    }
}

#[cfg(test)]
mod tests {
    use super::{AddOutcome, ErrorAdmin};
    use crate::{involved::Involved, result::qa_error::QaError};
    use proptest::prelude::*;
    use tileqa_geom::{Envelope, Geometry};

    fn finding(check: &str, description: &str, id: i64) -> QaError {
        QaError::new(check, description, vec![Involved::row("roads", id)])
    }

    fn spatial_finding(check: &str, env: Envelope) -> QaError {
        QaError::new(check, "finding", vec![Involved::row("roads", 1)])
            .with_geometry(Geometry::rectangle(&env))
    }

    #[test]
    fn add_is_idempotent_and_marks_duplicates() {
        let mut admin = ErrorAdmin::new();

        assert!(admin.add(finding("c1", "gap", 1)).is_added());
        assert_eq!(admin.len(), 1);

        let outcome = admin.add(finding("c1", "gap", 1));
        let AddOutcome::Duplicate(dup) = outcome else {
            panic!("expected a duplicate");
        };
        assert!(dup.duplicate);
        assert_eq!(admin.len(), 1);
    }

    #[test]
    fn distinct_provenance_produces_distinct_entries() {
        let mut admin = ErrorAdmin::new();

        assert!(admin.add(finding("c1", "gap", 1)).is_added());
        assert!(admin.add(finding("c1", "gap", 2)).is_added());
        assert_eq!(admin.len(), 2);
    }

    #[test]
    fn findings_group_by_check_first_encounter_order() {
        let mut admin = ErrorAdmin::new();
        admin.add(finding("late", "z", 1));
        admin.add(finding("early", "a", 1));
        admin.add(finding("late", "a", 2));

        let checks: Vec<&str> = admin.iter().map(|e| e.check_name.as_str()).collect();
        assert_eq!(checks, vec!["late", "late", "early"]);
    }

    #[test]
    fn envelope_equality_within_tolerance_deduplicates() {
        let mut admin = ErrorAdmin::new();
        let base = Envelope::new(0.0, 0.0, 100.0, 100.0);
        // shift far below the projected-range fallback tolerance (1e-3)
        let shifted = Envelope::new(0.0, 0.0, 100.000_000_1, 100.0);

        assert!(admin.add(spatial_finding("c", base)).is_added());
        assert!(!admin.add(spatial_finding("c", shifted)).is_added());
    }

    #[test]
    fn clear_evicts_only_fully_processed_findings() {
        let mut admin = ErrorAdmin::new();
        admin.add(spatial_finding("c", Envelope::new(0.0, 0.0, 10.0, 10.0)));
        admin.add(spatial_finding("c", Envelope::new(0.0, 0.0, 10.0, 60.0)));
        admin.add(finding("c", "no geometry", 9));

        let evicted = admin.clear(50.0, 50.0, None);

        assert_eq!(evicted, 1);
        assert_eq!(admin.len(), 2);
        assert!(
            admin
                .iter()
                .all(|e| !e.is_fully_processed(50.0, 50.0, None))
        );
    }

    proptest! {
        #[test]
        fn add_never_stores_equal_findings_twice(ids in prop::collection::vec(0i64..20, 0..40)) {
            let mut admin = ErrorAdmin::new();
            let mut unique = std::collections::BTreeSet::new();

            for id in ids {
                admin.add(finding("c", "gap", id));
                unique.insert(id);
            }

            prop_assert_eq!(admin.len(), unique.len());
        }

        #[test]
        fn eviction_is_monotonic(frontier in 0.0f64..200.0) {
            let mut admin = ErrorAdmin::new();
            for i in 0..10 {
                let offset = f64::from(i) * 15.0;
                admin.add(spatial_finding(
                    "c",
                    Envelope::new(offset, offset, offset + 10.0, offset + 10.0),
                ));
            }

            admin.clear(frontier, frontier, None);
            let remaining = admin.len();

            // advancing the frontier further can only evict more
            admin.clear(frontier + 20.0, frontier + 20.0, None);
            prop_assert!(admin.len() <= remaining);
        }
    }
}
