use std::ops::Range;

use crate::voxel_grid::extent::PartExtent;

/// Tile grid over the normalized build plane plus the z-slab partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
	pub tile_size: usize,       // Side length of a square tile
	pub tile_count_x: usize,    // Tiles along X
	pub tile_count_y: usize,    // Tiles along Y
	pub layers_per_slab: usize, // Layers stored together in one slab container
	pub total_layers: usize,    // Layers scanned for the part
	pub slab_count: usize,      // Slabs covering all layers
}

/// `ceil(span / tile_size)`, never less than one tile.
fn tiles_for_span(span: i64, tile_size: usize) -> usize {
	(span.max(0) as usize).div_ceil(tile_size).max(1)
}

impl TileGrid {
	pub fn new(extent: &PartExtent, tile_size: usize, layers_per_slab: usize, total_layers: usize) -> Self {
		Self {
			tile_size,
			tile_count_x: tiles_for_span(extent.span_x(), tile_size),
			tile_count_y: tiles_for_span(extent.span_y(), tile_size),
			layers_per_slab,
			total_layers,
			slab_count: total_layers.div_ceil(layers_per_slab),
		}
	}

	/// Entries in one dense channel array of a tile
	#[inline]
	pub fn cells_per_tile(&self) -> usize {
		self.tile_size * self.tile_size
	}

	#[inline]
	pub fn tiles_per_layer(&self) -> usize {
		self.tile_count_x * self.tile_count_y
	}

	/// Every (tileX, tileY), Y outer and X inner.
	pub fn tiles(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
		let (count_x, count_y) = (self.tile_count_x, self.tile_count_y);
		(0..count_y).flat_map(move |ty| (0..count_x).map(move |tx| (tx, ty)))
	}

	/// Global layer indices belonging to slab `slab`, clipped to the part.
	pub fn slab_layers(&self, slab: usize) -> Range<usize> {
		let start = (slab * self.layers_per_slab).min(self.total_layers);
		let end = ((slab + 1) * self.layers_per_slab).min(self.total_layers);
		start..end
	}

	/// Index of a global layer inside its slab
	#[inline]
	pub fn local_layer(&self, global: usize) -> usize {
		global % self.layers_per_slab
	}

	/// Tile holding a normalized coordinate, if it lies on the grid.
	pub fn tile_of(&self, x: i64, y: i64) -> Option<(usize, usize)> {
		if x < 0 || y < 0 {
			return None;
		}
		let tx = x as usize / self.tile_size;
		let ty = y as usize / self.tile_size;
		(tx < self.tile_count_x && ty < self.tile_count_y).then_some((tx, ty))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn extent(span_x: i64, span_y: i64) -> PartExtent {
		PartExtent {
			origin_x: -20,
			origin_y: 7,
			max_x: span_x - 20,
			max_y: span_y + 7,
		}
	}

	#[test]
	fn counts_follow_span_and_tile_size() {
		let grid = TileGrid::new(&extent(250, 180), 100, 10, 142);
		assert_eq!((grid.tile_count_x, grid.tile_count_y), (3, 2));
		assert_eq!(grid.slab_count, 15);
		assert_eq!(grid.tiles_per_layer(), 6);
		assert_eq!(grid.cells_per_tile(), 10_000);
	}

	#[test]
	fn span_on_tile_boundary_adds_no_tile() {
		let grid = TileGrid::new(&extent(200, 100), 100, 10, 10);
		assert_eq!((grid.tile_count_x, grid.tile_count_y), (2, 1));
		assert_eq!(grid.tile_of(199, 99), Some((1, 0)));
		assert_eq!(grid.tile_of(200, 0), None);
		assert_eq!(grid.tile_of(0, 100), None);
	}

	#[test]
	fn zero_span_keeps_one_tile() {
		let grid = TileGrid::new(&extent(0, 0), 100, 10, 10);
		assert_eq!((grid.tile_count_x, grid.tile_count_y), (1, 1));
		assert_eq!(grid.tile_of(0, 0), Some((0, 0)));
	}

	#[test]
	fn last_slab_is_clipped() {
		let grid = TileGrid::new(&extent(10, 10), 4, 10, 25);
		assert_eq!(grid.slab_count, 3);
		assert_eq!(grid.slab_layers(0), 0..10);
		assert_eq!(grid.slab_layers(2), 20..25);
		assert_eq!(grid.local_layer(23), 3);
		assert!(grid.slab_layers(7).is_empty());
	}

	#[test]
	fn tiles_iterate_y_outer() {
		let grid = TileGrid::new(&extent(150, 150), 100, 1, 1);
		let tiles: Vec<_> = grid.tiles().collect();
		assert_eq!(tiles, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
	}

	#[test]
	fn tile_of_rejects_off_grid() {
		let grid = TileGrid::new(&extent(250, 180), 100, 10, 10);
		assert_eq!(grid.tile_of(105, 20), Some((1, 0)));
		assert_eq!(grid.tile_of(-1, 20), None);
		assert_eq!(grid.tile_of(305, 20), None);
	}
}
