use log::info;

use crate::voxel_grid::grid::TileGrid;

/// Channels persisted per tile layer: two axes, area and intensity.
const DATASETS_PER_TILE_LAYER: usize = 4;

/// Format large numbers with KB, MB, GB, TB suffixes
pub fn format_bytes(bytes: usize) -> String {
	const KB: usize = 1024;
	const MB: usize = KB * 1024;
	const GB: usize = MB * 1024;
	const TB: usize = GB * 1024;

	if bytes >= TB {
		format!("{:.2} TB", bytes as f64 / TB as f64)
	} else if bytes >= GB {
		format!("{:.2} GB", bytes as f64 / GB as f64)
	} else if bytes >= MB {
		format!("{:.2} MB", bytes as f64 / MB as f64)
	} else if bytes >= KB {
		format!("{:.2} KB", bytes as f64 / KB as f64)
	} else {
		format!("{} bytes", bytes)
	}
}

impl TileGrid {
	/// Upper bound of dataset bytes written for one full slab in dense mode.
	pub fn dense_bytes_per_slab(&self) -> usize {
		self.tiles_per_layer()
			* self.layers_per_slab
			* self.cells_per_tile()
			* DATASETS_PER_TILE_LAYER
			* size_of::<f64>()
	}

	/// Log grid dimensions and the expected output size
	pub fn report(&self) {
		let per_slab = self.dense_bytes_per_slab();
		info!("Tile Grid Report:");
		info!("-------------------------");
		info!("  Tiles: {} x {} ({} per layer)", self.tile_count_x, self.tile_count_y, self.tiles_per_layer());
		info!("  Tile Size: {} x {}", self.tile_size, self.tile_size);
		info!("  Slabs: {} x {} layers ({} layers total)", self.slab_count, self.layers_per_slab, self.total_layers);
		info!("  Dense Bytes per Slab: {}", format_bytes(per_slab));
		info!("  Dense Bytes Total: {}", format_bytes(per_slab * self.slab_count));
		info!("-------------------------");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::voxel_grid::extent::PartExtent;

	#[test]
	fn bytes_are_scaled() {
		assert_eq!(format_bytes(512), "512 bytes");
		assert_eq!(format_bytes(2048), "2.00 KB");
		assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
	}

	#[test]
	fn dense_slab_size() {
		let extent = PartExtent {
			origin_x: 0,
			origin_y: 0,
			max_x: 9,
			max_y: 9,
		};
		let grid = TileGrid::new(&extent, 10, 2, 4);
		// one tile, two layers, 100 cells, four f64 datasets
		assert_eq!(grid.dense_bytes_per_slab(), 2 * 100 * 4 * 8);
	}
}
