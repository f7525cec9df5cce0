use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// Sentinel object id meaning "the whole table, not a specific row".
pub const ENTIRE_TABLE: i64 = -1;

///
/// Involved
///
/// Provenance of a finding: the source rows it was derived from. A leaf
/// names a (table, row id) pair; a nested node wraps the constituents of
/// a row that was itself synthesized from other rows (virtual/transform
/// tables), so a finding can point back through arbitrarily many layers.
///
/// Nested equality is order-independent over the children; `Ord` and
/// `Hash` are consistent with that (children are compared and hashed in
/// canonical order).
///

#[derive(Clone, Debug, Deserialize, Eq, Serialize)]
pub enum Involved {
    Row { table: String, object_id: i64 },
    Nested { table: String, children: Vec<Involved> },
}

impl Involved {
    #[must_use]
    pub fn row(table: impl Into<String>, object_id: i64) -> Self {
        Self::Row {
            table: table.into(),
            object_id,
        }
    }

    /// Leaf that refers to a table as a whole.
    #[must_use]
    pub fn entire_table(table: impl Into<String>) -> Self {
        Self::row(table, ENTIRE_TABLE)
    }

    #[must_use]
    pub fn nested(table: impl Into<String>, children: Vec<Self>) -> Self {
        Self::Nested {
            table: table.into(),
            children,
        }
    }

    #[must_use]
    pub const fn table(&self) -> &String {
        match self {
            Self::Row { table, .. } | Self::Nested { table, .. } => table,
        }
    }

    /// Leaf (table, id) pairs in depth-first order, for diagnostics and
    /// extent derivation.
    pub fn leaves<'a>(&'a self, out: &mut Vec<(&'a str, i64)>) {
        match self {
            Self::Row { table, object_id } => out.push((table, *object_id)),
            Self::Nested { children, .. } => {
                for child in children {
                    child.leaves(out);
                }
            }
        }
    }

    /// Canonical ordering: leaves before nested nodes, then by table
    /// name, then by id (leaves) or canonically sorted children (nested).
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Self::Row {
                    table: ta,
                    object_id: ia,
                },
                Self::Row {
                    table: tb,
                    object_id: ib,
                },
            ) => ta.cmp(tb).then_with(|| ia.cmp(ib)),
            (Self::Row { .. }, Self::Nested { .. }) => Ordering::Less,
            (Self::Nested { .. }, Self::Row { .. }) => Ordering::Greater,
            (
                Self::Nested {
                    table: ta,
                    children: ca,
                },
                Self::Nested {
                    table: tb,
                    children: cb,
                },
            ) => ta.cmp(tb).then_with(|| {
                let a = sorted(ca);
                let b = sorted(cb);

                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.canonical_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }),
        }
    }

    fn canonical_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self {
            Self::Row { table, object_id } => {
                0u8.hash(&mut hasher);
                table.hash(&mut hasher);
                object_id.hash(&mut hasher);
            }
            Self::Nested { table, children } => {
                1u8.hash(&mut hasher);
                table.hash(&mut hasher);
                // order-independent combination of the child hashes
                let combined = children
                    .iter()
                    .fold(0u64, |acc, c| acc.wrapping_add(c.canonical_hash()));
                combined.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

fn sorted(children: &[Involved]) -> Vec<&Involved> {
    let mut refs: Vec<&Involved> = children.iter().collect();
    refs.sort_by(|a, b| a.canonical_cmp(b));
    refs
}

impl PartialEq for Involved {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_cmp(other) == Ordering::Equal
    }
}

impl Ord for Involved {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_cmp(other)
    }
}

impl PartialOrd for Involved {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Involved {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.canonical_hash());
    }
}

/// Lexicographic comparison of two provenance lists in canonical order.
#[must_use]
pub fn compare_involved_sets(a: &[Involved], b: &[Involved]) -> Ordering {
    let sa = sorted(a);
    let sb = sorted(b);

    for (x, y) in sa.iter().zip(sb.iter()) {
        let ord = x.canonical_cmp(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    sa.len().cmp(&sb.len())
}

#[cfg(test)]
mod tests {
    use super::{Involved, compare_involved_sets};
    use proptest::prelude::*;
    use std::{
        cmp::Ordering,
        collections::hash_map::DefaultHasher,
        hash::{Hash, Hasher},
    };

    fn hash_of(involved: &Involved) -> u64 {
        let mut hasher = DefaultHasher::new();
        involved.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn nested_equality_is_order_independent() {
        let a = Involved::row("roads", 1);
        let b = Involved::row("roads", 2);

        let ab = Involved::nested("junctions", vec![a.clone(), b.clone()]);
        let ba = Involved::nested("junctions", vec![b, a.clone()]);
        let aa = Involved::nested("junctions", vec![a.clone(), a]);

        assert_eq!(ab, ba);
        assert_eq!(hash_of(&ab), hash_of(&ba));
        assert_ne!(ab, aa);
    }

    #[test]
    fn leaf_identity_is_table_and_id() {
        assert_eq!(Involved::row("roads", 1), Involved::row("roads", 1));
        assert_ne!(Involved::row("roads", 1), Involved::row("roads", 2));
        assert_ne!(Involved::row("roads", 1), Involved::row("rails", 1));
    }

    #[test]
    fn leaves_flatten_depth_first() {
        let nested = Involved::nested(
            "derived",
            vec![
                Involved::row("roads", 7),
                Involved::nested("inner", vec![Involved::row("rails", 3)]),
            ],
        );

        let mut leaves = Vec::new();
        nested.leaves(&mut leaves);
        assert_eq!(leaves, vec![("roads", 7), ("rails", 3)]);
    }

    #[test]
    fn provenance_serializes_as_tagged_tree() {
        let nested = Involved::nested("junctions", vec![Involved::row("roads", 7)]);

        let json = serde_json::to_value(&nested).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Nested": {
                    "table": "junctions",
                    "children": [{ "Row": { "table": "roads", "object_id": 7 } }],
                }
            })
        );

        let back: Involved = serde_json::from_value(json).unwrap();
        assert_eq!(back, nested);
    }

    #[test]
    fn set_comparison_ignores_list_order() {
        let a = vec![Involved::row("t", 1), Involved::row("t", 2)];
        let b = vec![Involved::row("t", 2), Involved::row("t", 1)];
        let c = vec![Involved::row("t", 1), Involved::row("t", 3)];

        assert_eq!(compare_involved_sets(&a, &b), Ordering::Equal);
        assert_ne!(compare_involved_sets(&a, &c), Ordering::Equal);
    }

    fn arb_involved() -> impl Strategy<Value = Involved> {
        let leaf = ("[a-c]{1}", 0i64..5).prop_map(|(t, id)| Involved::row(t, id));
        leaf.prop_recursive(3, 16, 4, |inner| {
            ("[a-c]{1}", prop::collection::vec(inner, 1..4))
                .prop_map(|(t, children)| Involved::nested(t, children))
        })
    }

    proptest! {
        #[test]
        fn equality_is_reflexive_and_permutation_invariant(involved in arb_involved()) {
            prop_assert_eq!(involved.clone(), involved.clone());

            if let Involved::Nested { table, mut children } = involved.clone() {
                children.reverse();
                let reversed = Involved::nested(table, children);
                prop_assert_eq!(involved.clone(), reversed.clone());
                prop_assert_eq!(hash_of(&involved), hash_of(&reversed));
            }
        }

        #[test]
        fn ordering_is_antisymmetric(a in arb_involved(), b in arb_involved()) {
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            if a.cmp(&b) == Ordering::Equal {
                prop_assert_eq!(hash_of(&a), hash_of(&b));
            }
        }
    }
}
