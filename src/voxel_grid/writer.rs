use crate::voxel_grid::container::{Container, join_path};
use crate::voxel_grid::error::Result;
use crate::voxel_grid::extent::PartExtent;
use crate::voxel_grid::grid::TileGrid;
use crate::voxel_grid::partition::DenseTile;
use crate::voxel_grid::source::{AREA, INTENSITY, X_AXIS, Y_AXIS};

/// Group holding every layer of tile (tile_x, tile_y) within slab `slab`
pub fn tile_group_name(tile_x: usize, tile_y: usize, slab: usize) -> String {
	format!("voxel_{}_{}_{}", tile_x, tile_y, slab)
}

/// Sub-group of a tile group for one slab-local layer
pub fn layer_group_name(local_layer: usize) -> String {
	format!("slice_{}", local_layer)
}

/// Persists dense tiles of one slab into its container.
pub struct SlabWriter<C: Container> {
	container: C,
	slab: usize,
	reduce_empty: bool,
	tiles_written: usize,
	samples_written: usize,
}

impl<C: Container> SlabWriter<C> {
	/// `reduce_empty` stores zero-length datasets for tiles without samples.
	pub fn new(container: C, slab: usize, reduce_empty: bool) -> Self {
		Self {
			container,
			slab,
			reduce_empty,
			tiles_written: 0,
			samples_written: 0,
		}
	}

	/// Record the part extent and grid layout on the container root.
	pub fn write_metadata(&mut self, extent: &PartExtent, grid: &TileGrid) -> Result<()> {
		let first_layer = grid.slab_layers(self.slab).start;
		let attrs = [
			("originX", extent.origin_x as f64),
			("originY", extent.origin_y as f64),
			("spanX", extent.span_x() as f64),
			("spanY", extent.span_y() as f64),
			("tileSize", grid.tile_size as f64),
			("layersPerSlab", grid.layers_per_slab as f64),
			("slabIndex", self.slab as f64),
			("firstLayer", first_layer as f64),
		];
		for (name, value) in attrs {
			self.container.set_attribute("", name, value)?;
		}
		Ok(())
	}

	/// Write one tile for one slab-local layer.
	///
	/// The tile group is created on first use; the layer sub-group must not
	/// exist yet, rewriting a layer fails with `OutputWriteConflict`.
	pub fn write_tile(&mut self, tile: &DenseTile, local_layer: usize) -> Result<()> {
		let tile_group = tile_group_name(tile.tile_x, tile.tile_y, self.slab);
		self.container.ensure_group(&tile_group)?;
		let layer_group = join_path(&tile_group, &layer_group_name(local_layer));
		self.container.create_group(&layer_group)?;

		if self.reduce_empty && tile.is_empty() {
			for name in [X_AXIS, Y_AXIS, AREA, INTENSITY] {
				self.container.write_dataset(&join_path(&layer_group, name), &[])?;
			}
		} else {
			self.container.write_dataset(&join_path(&layer_group, X_AXIS), &tile.x_axis())?;
			self.container.write_dataset(&join_path(&layer_group, Y_AXIS), &tile.y_axis())?;
			self.container.write_dataset(&join_path(&layer_group, AREA), &tile.area)?;
			self.container.write_dataset(&join_path(&layer_group, INTENSITY), &tile.intensity)?;
		}

		self.tiles_written += 1;
		self.samples_written += tile.sample_count();
		Ok(())
	}

	pub fn tiles_written(&self) -> usize {
		self.tiles_written
	}

	pub fn samples_written(&self) -> usize {
		self.samples_written
	}

	pub fn container_mut(&mut self) -> &mut C {
		&mut self.container
	}

	pub fn into_inner(self) -> C {
		self.container
	}
}
