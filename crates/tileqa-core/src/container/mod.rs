mod box_tree;
mod surface;
mod unique_id;

pub use box_tree::BoxTree;
pub use surface::{SimpleSurface, SurfaceSource};
pub use unique_id::UniqueIdProvider;

use crate::{
    error::DataError,
    tables::{RowRef, TableFilter, TableHandle, TableKey, table_key},
};
use std::{collections::HashMap, rc::Rc};
use tileqa_geom::Envelope;
use tracing::debug;

///
/// TableCache
///
/// Rows of one table loaded for the current (expanded) tile: spatial
/// rows in a box tree, rows without geometry alongside.
///

struct TableCache {
    table: TableHandle,
    tree: BoxTree<RowRef>,
    non_spatial: Vec<RowRef>,
    loaded_extent: Envelope,
}

impl TableCache {
    fn load(table: TableHandle, extent: Envelope) -> Self {
        let rows = table.enum_rows(&TableFilter::extent(extent));
        let mut tree = BoxTree::new(extent);
        let mut non_spatial = Vec::new();

        for row in rows {
            match row.envelope() {
                Some(env) => tree.insert(env, row),
                None => non_spatial.push(row),
            }
        }

        Self {
            table,
            tree,
            non_spatial,
            loaded_extent: extent,
        }
    }

    fn search(&self, filter: &TableFilter) -> Option<Vec<RowRef>> {
        let query = filter.extent?;
        if !self.loaded_extent.contains(&query) {
            // the cache does not cover the requested extent
            return None;
        }

        let mut rows: Vec<RowRef> = self
            .tree
            .search(&query)
            .into_iter()
            .map(Rc::clone)
            .chain(self.non_spatial.iter().map(Rc::clone))
            .filter(|row| filter.accepts(self.table.as_ref(), row))
            .collect();
        rows.sort_by_key(|r| r.object_id);
        Some(rows)
    }
}

///
/// DataContainer
///
/// Tile-scoped data owner: per-table row caches, surrogate-id providers,
/// and lazily built surface models. Exclusively owned by the scheduler
/// for the duration of one tile; `complete_tile` disposes everything
/// tile-bound.
///

#[derive(Default)]
pub struct DataContainer {
    caches: HashMap<TableKey, TableCache>,
    unique_ids: HashMap<TableKey, UniqueIdProvider>,
    surfaces: HashMap<String, Rc<SimpleSurface>>,
    current_tile: Option<Envelope>,
}

impl DataContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn current_tile(&self) -> Option<&Envelope> {
        self.current_tile.as_ref()
    }

    /// Load the row caches for a tile. `load_extent` is the tile extent
    /// expanded by the run's maximum search distance, so cross-tile
    /// searches stay cache-resident.
    pub fn begin_tile(&mut self, tile: Envelope, load_extent: Envelope, tables: &[TableHandle]) {
        self.caches.clear();
        self.current_tile = Some(tile);

        for table in tables {
            let cache = TableCache::load(Rc::clone(table), load_extent);
            debug!(
                table = table.name(),
                spatial = cache.tree.len(),
                non_spatial = cache.non_spatial.len(),
                "tile cache loaded"
            );
            self.caches.insert(table_key(table), cache);
        }
    }

    /// Cache-preferring search. `None` signals "not cached here": the
    /// table is not wired to the container or the requested extent is
    /// not covered, and the caller must enumerate the table directly.
    #[must_use]
    pub fn search(&self, table: &TableHandle, filter: &TableFilter) -> Option<Vec<RowRef>> {
        self.caches.get(&table_key(table))?.search(filter)
    }

    /// Surrogate-id provider for rows of `table` lacking native identity.
    /// Providers survive tile boundaries so ids stay stable run-wide.
    pub fn unique_ids(&mut self, table: &TableHandle) -> &mut UniqueIdProvider {
        self.unique_ids.entry(table_key(table)).or_default()
    }

    /// Surface for `source` clipped to `extent`, built on first request
    /// in this tile and shared afterwards.
    pub fn simple_surface(
        &mut self,
        source: &dyn SurfaceSource,
        extent: &Envelope,
    ) -> Result<Rc<SimpleSurface>, DataError> {
        if let Some(surface) = self.surfaces.get(source.name()) {
            return Ok(Rc::clone(surface));
        }

        let surface = Rc::new(source.build(extent)?);
        self.surfaces
            .insert(source.name().to_string(), Rc::clone(&surface));
        Ok(surface)
    }

    /// Dispose all tile-bound state: row caches and surfaces. Surrogate
    /// ids are kept (provenance must stay stable across tiles).
    pub fn complete_tile(&mut self) {
        self.caches.clear();
        self.surfaces.clear();
        self.current_tile = None;
    }
}

/// The transitive closure of tables reachable from `roots` through
/// virtual-table dependencies, in first-visit order. Every table in the
/// result gets a tile cache.
#[must_use]
pub fn collect_dependent_tables(roots: &[TableHandle]) -> Vec<TableHandle> {
    let mut seen: Vec<TableHandle> = Vec::new();
    let mut stack: Vec<TableHandle> = roots.to_vec();

    while let Some(table) = stack.pop() {
        if seen.iter().any(|t| Rc::ptr_eq(t, &table)) {
            continue;
        }
        stack.extend(table.dependent_tables());
        seen.push(table);
    }

    seen
}
