use tileqa_geom::Envelope;

///
/// TileInfo
///
/// What a check sees at tile boundaries: the current tile, the union of
/// everything processed so far, and the overall run envelope.
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileInfo {
    pub index: usize,
    pub total: usize,
    pub envelope: Envelope,
    /// Union of all tiles processed so far, this one included.
    pub processed: Envelope,
    pub run_envelope: Envelope,
}

impl TileInfo {
    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.index == 0
    }

    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

///
/// TileGrid
///
/// Row-major tiling of the run envelope, bottom-left first. The last
/// column/row is clamped to the run envelope, so edge tiles may be
/// smaller than `tile_size`.
///

#[derive(Clone, Copy, Debug)]
pub struct TileGrid {
    run_envelope: Envelope,
    tile_size: f64,
    columns: usize,
    rows: usize,
}

impl TileGrid {
    #[must_use]
    pub fn new(run_envelope: Envelope, tile_size: f64) -> Self {
        let columns = axis_count(run_envelope.width(), tile_size);
        let rows = axis_count(run_envelope.height(), tile_size);

        Self {
            run_envelope,
            tile_size,
            columns,
            rows,
        }
    }

    #[must_use]
    pub const fn run_envelope(&self) -> &Envelope {
        &self.run_envelope
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.columns * self.rows
    }

    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn envelope(&self, index: usize) -> Envelope {
        let column = index % self.columns;
        let row = index / self.columns;

        let x_min = self
            .tile_size
            .mul_add(column as f64, self.run_envelope.x_min);
        let y_min = self.tile_size.mul_add(row as f64, self.run_envelope.y_min);
        let x_max = (x_min + self.tile_size).min(self.run_envelope.x_max);
        let y_max = (y_min + self.tile_size).min(self.run_envelope.y_max);

        Envelope::new(x_min, y_min, x_max, y_max)
    }
}

fn axis_count(extent: f64, tile_size: f64) -> usize {
    if extent <= 0.0 || tile_size <= 0.0 || tile_size >= extent {
        return 1;
    }
    (extent / tile_size).ceil() as usize
}
