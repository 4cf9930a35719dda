use std::collections::HashMap;

use bitvec::vec::BitVec;

use crate::voxel_grid::grid::TileGrid;
use crate::voxel_grid::sample::Sample;

/// Dense per-layer content of one tile.
///
/// Arrays are flattened x-offset major: entry `dx * tile_size + dy` holds the
/// cell at `(tile_x * tile_size + dx, tile_y * tile_size + dy)`.
#[derive(Debug, Clone)]
pub struct DenseTile {
	pub tile_x: usize,
	pub tile_y: usize,
	pub tile_size: usize,
	pub area: Vec<f64>,
	pub intensity: Vec<f64>,
	pub filled: BitVec, // 1 bit per cell that received a real sample
}

impl DenseTile {
	/// All-zero tile
	pub fn empty(tile_x: usize, tile_y: usize, tile_size: usize) -> Self {
		let cells = tile_size * tile_size;
		Self {
			tile_x,
			tile_y,
			tile_size,
			area: vec![0.0; cells],
			intensity: vec![0.0; cells],
			filled: BitVec::repeat(false, cells),
		}
	}

	#[inline]
	pub fn cell_index(&self, dx: usize, dy: usize) -> usize {
		dx * self.tile_size + dy
	}

	#[inline]
	pub fn index_to_cell(&self, index: usize) -> (usize, usize) {
		(index / self.tile_size, index % self.tile_size)
	}

	fn set(&mut self, index: usize, area: f64, intensity: f64) {
		self.area[index] = area;
		self.intensity[index] = intensity;
		self.filled.set(index, true);
	}

	/// Number of cells backed by a real sample
	pub fn sample_count(&self) -> usize {
		self.filled.count_ones()
	}

	pub fn is_empty(&self) -> bool {
		self.filled.not_any()
	}

	/// Absolute normalized X coordinate of every cell, in array order.
	pub fn x_axis(&self) -> Vec<f64> {
		let base = self.tile_x * self.tile_size;
		(0..self.area.len())
			.map(|i| (base + self.index_to_cell(i).0) as f64)
			.collect()
	}

	/// Absolute normalized Y coordinate of every cell, in array order.
	pub fn y_axis(&self) -> Vec<f64> {
		let base = self.tile_y * self.tile_size;
		(0..self.area.len())
			.map(|i| (base + self.index_to_cell(i).1) as f64)
			.collect()
	}
}

/// One sample already resolved to its tile-local cell.
#[derive(Debug, Clone, Copy)]
struct Cell {
	index: usize,
	area: f64,
	intensity: f64,
}

/// Deduplicated samples of one layer, bucketed by tile.
///
/// Built once per layer; a tile is filled from its own bucket only.
#[derive(Debug)]
pub struct LayerIndex {
	grid: TileGrid,
	buckets: HashMap<(usize, usize), Vec<Cell>>,
	off_grid: usize,
}

impl LayerIndex {
	/// Samples must be normalized and carry unique coordinates.
	pub fn build(samples: &[Sample], grid: &TileGrid) -> Self {
		let size = grid.tile_size;
		let mut buckets: HashMap<(usize, usize), Vec<Cell>> = HashMap::new();
		let mut off_grid = 0usize;

		for sample in samples {
			let Some((tx, ty)) = grid.tile_of(sample.x, sample.y) else {
				off_grid += 1;
				continue;
			};
			let dx = sample.x as usize - tx * size;
			let dy = sample.y as usize - ty * size;
			buckets.entry((tx, ty)).or_default().push(Cell {
				index: dx * size + dy,
				area: sample.area,
				intensity: sample.intensity,
			});
		}

		Self {
			grid: *grid,
			buckets,
			off_grid,
		}
	}

	/// Samples that fell outside the tile grid and were ignored.
	pub fn off_grid(&self) -> usize {
		self.off_grid
	}

	/// Tiles holding at least one sample.
	pub fn occupied_tiles(&self) -> usize {
		self.buckets.len()
	}

	/// Dense arrays for tile (tile_x, tile_y), zero where no sample exists.
	pub fn tile(&self, tile_x: usize, tile_y: usize) -> DenseTile {
		let mut tile = DenseTile::empty(tile_x, tile_y, self.grid.tile_size);
		if let Some(cells) = self.buckets.get(&(tile_x, tile_y)) {
			for cell in cells {
				tile.set(cell.index, cell.area, cell.intensity);
			}
		}
		tile
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::voxel_grid::extent::PartExtent;

	fn grid(span_x: i64, span_y: i64, tile_size: usize) -> TileGrid {
		let extent = PartExtent {
			origin_x: 0,
			origin_y: 0,
			max_x: span_x,
			max_y: span_y,
		};
		TileGrid::new(&extent, tile_size, 1, 1)
	}

	#[test]
	fn single_sample_lands_in_one_tile() {
		let grid = grid(250, 180, 100);
		let index = LayerIndex::build(&[Sample::new(105, 20, 3.0, 9.0)], &grid);

		for (tx, ty) in grid.tiles() {
			let tile = index.tile(tx, ty);
			assert_eq!(tile.area.len(), 10_000);
			assert_eq!(tile.intensity.len(), 10_000);
			if (tx, ty) == (1, 0) {
				let at = tile.cell_index(5, 20);
				assert_eq!(tile.area[at], 3.0);
				assert_eq!(tile.intensity[at], 9.0);
				assert_eq!(tile.sample_count(), 1);
				assert_eq!(tile.area.iter().filter(|&&v| v != 0.0).count(), 1);
			} else {
				assert!(tile.is_empty());
				assert!(tile.area.iter().chain(&tile.intensity).all(|&v| v == 0.0));
			}
		}
	}

	#[test]
	fn window_is_closed_low_open_high() {
		let grid = grid(20, 9, 10);
		let samples = [Sample::new(9, 0, 1.0, 1.0), Sample::new(10, 0, 2.0, 2.0)];
		let index = LayerIndex::build(&samples, &grid);

		let first = index.tile(0, 0);
		assert_eq!(first.area[first.cell_index(9, 0)], 1.0);
		assert_eq!(first.sample_count(), 1);

		let second = index.tile(1, 0);
		assert_eq!(second.area[second.cell_index(0, 0)], 2.0);
		assert_eq!(second.sample_count(), 1);
	}

	#[test]
	fn axes_match_array_order() {
		let grid = grid(5, 5, 3);
		let tile = LayerIndex::build(&[], &grid).tile(1, 1);
		let xs = tile.x_axis();
		let ys = tile.y_axis();
		assert_eq!(xs, vec![3.0, 3.0, 3.0, 4.0, 4.0, 4.0, 5.0, 5.0, 5.0]);
		assert_eq!(ys, vec![3.0, 4.0, 5.0, 3.0, 4.0, 5.0, 3.0, 4.0, 5.0]);
	}

	#[test]
	fn tile_size_is_independent_of_sample_count() {
		let grid = grid(7, 7, 4);
		let crowded: Vec<Sample> = (0..8)
			.flat_map(|x| (0..8).map(move |y| Sample::new(x, y, 1.0, 2.0)))
			.collect();
		let index = LayerIndex::build(&crowded, &grid);
		assert_eq!(index.occupied_tiles(), 4);
		for (tx, ty) in grid.tiles() {
			let tile = index.tile(tx, ty);
			assert_eq!(tile.area.len(), 16);
			assert_eq!(tile.sample_count(), 16);
		}
		assert!(LayerIndex::build(&[], &grid).tile(0, 0).area.len() == 16);
	}

	#[test]
	fn off_grid_samples_are_counted() {
		let grid = grid(9, 9, 10);
		let samples = [Sample::new(-1, 0, 1.0, 1.0), Sample::new(0, 10, 1.0, 1.0), Sample::new(2, 2, 1.0, 1.0)];
		let index = LayerIndex::build(&samples, &grid);
		assert_eq!(index.off_grid(), 2);
		assert_eq!(index.tile(0, 0).sample_count(), 1);
	}

	#[test]
	fn far_edge_on_tile_boundary_is_off_grid() {
		let grid = grid(20, 10, 10);
		let samples = [Sample::new(20, 5, 1.0, 1.0), Sample::new(19, 9, 2.0, 2.0)];
		let index = LayerIndex::build(&samples, &grid);
		assert_eq!(index.off_grid(), 1);
		let tile = index.tile(1, 0);
		assert_eq!(tile.area[tile.cell_index(9, 9)], 2.0);
	}
}
