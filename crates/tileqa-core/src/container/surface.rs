use crate::error::DataError;
use tileqa_geom::Envelope;

///
/// SimpleSurface
///
/// A surface model (terrain or raster) clipped to one tile: a regular
/// grid of elevation samples over an extent. Built lazily on first
/// request and dropped when the tile completes.
///

#[derive(Debug)]
pub struct SimpleSurface {
    extent: Envelope,
    cell_size: f64,
    columns: usize,
    values: Vec<f64>,
}

impl SimpleSurface {
    pub fn new(extent: Envelope, cell_size: f64, values: Vec<f64>) -> Result<Self, DataError> {
        if cell_size <= 0.0 {
            return Err(DataError::table(
                "surface",
                format!("invalid cell size {cell_size}"),
            ));
        }

        let columns = (extent.width() / cell_size).ceil() as usize + 1;
        let rows = (extent.height() / cell_size).ceil() as usize + 1;
        if values.len() != columns * rows {
            return Err(DataError::table(
                "surface",
                format!(
                    "expected {} samples for a {columns}x{rows} grid, got {}",
                    columns * rows,
                    values.len()
                ),
            ));
        }

        Ok(Self {
            extent,
            cell_size,
            columns,
            values,
        })
    }

    #[must_use]
    pub const fn extent(&self) -> &Envelope {
        &self.extent
    }

    /// Elevation of the nearest sample; `None` outside the extent.
    #[must_use]
    pub fn elevation_at(&self, x: f64, y: f64) -> Option<f64> {
        if !self.extent.contains_coord(x, y) {
            return None;
        }

        let col = ((x - self.extent.x_min) / self.cell_size).round() as usize;
        let row = ((y - self.extent.y_min) / self.cell_size).round() as usize;
        let value = *self.values.get(row * self.columns + col.min(self.columns - 1))?;

        if value.is_nan() { None } else { Some(value) }
    }
}

///
/// SurfaceSource
///
/// Provider of surface models. The engine asks for a surface clipped to
/// an extent once per tile; construction failures are data errors tied
/// to the provider's name.
///

pub trait SurfaceSource {
    fn name(&self) -> &str;

    /// Overall extent of the surface data, for run-extent computation.
    fn extent(&self) -> Option<Envelope>;

    fn build(&self, extent: &Envelope) -> Result<SimpleSurface, DataError>;
}

#[cfg(test)]
mod tests {
    use super::SimpleSurface;
    use tileqa_geom::Envelope;

    #[test]
    fn grid_lookup_returns_nearest_sample() {
        let extent = Envelope::new(0.0, 0.0, 2.0, 2.0);
        let values = vec![
            0.0, 1.0, 2.0, //
            3.0, 4.0, 5.0, //
            6.0, 7.0, 8.0,
        ];
        let surface = SimpleSurface::new(extent, 1.0, values).unwrap();

        assert_eq!(surface.elevation_at(0.0, 0.0), Some(0.0));
        assert_eq!(surface.elevation_at(2.0, 2.0), Some(8.0));
        assert_eq!(surface.elevation_at(1.1, 0.9), Some(4.0));
        assert_eq!(surface.elevation_at(5.0, 5.0), None);
    }

    #[test]
    fn sample_count_mismatch_is_a_data_error() {
        let extent = Envelope::new(0.0, 0.0, 2.0, 2.0);
        assert!(SimpleSurface::new(extent, 1.0, vec![0.0; 4]).is_err());
        assert!(SimpleSurface::new(extent, 0.0, vec![]).is_err());
    }
}
