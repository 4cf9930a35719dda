use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::voxel_grid::error::{Result, VoxelError};

/// How samples sharing one (x, y) coordinate are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
	/// Keep the largest area and the largest intensity of the group.
	#[default]
	Max,
	/// Arithmetic mean of the group, truncated to an integer.
	Mean,
}

/// Immutable run configuration, validated once and shared by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoxelConfig {
	pub source: PathBuf,
	pub output_dir: PathBuf,
	pub part_name: String,
	pub tile_size: usize,
	pub layers_per_slab: usize,
	pub total_layers: usize,
	pub dedup_mode: DedupMode,
	/// Store zero-length datasets for tiles without any sample in a layer.
	pub reduce_empty_tiles: bool,
	/// Run the empty-voxel pruner after each slab completes.
	pub prune: bool,
	/// Discard an existing slab container instead of refusing to run.
	pub overwrite: bool,
}

impl VoxelConfig {
	pub fn new(
		source: impl Into<PathBuf>,
		output_dir: impl Into<PathBuf>,
		part_name: impl Into<String>,
		tile_size: usize,
		layers_per_slab: usize,
		total_layers: usize,
	) -> Result<Self> {
		let config = Self {
			source: source.into(),
			output_dir: output_dir.into(),
			part_name: part_name.into(),
			tile_size,
			layers_per_slab,
			total_layers,
			dedup_mode: DedupMode::default(),
			reduce_empty_tiles: false,
			prune: false,
			overwrite: false,
		};
		config.validate()?;
		Ok(config)
	}

	pub fn with_dedup_mode(mut self, mode: DedupMode) -> Self {
		self.dedup_mode = mode;
		self
	}

	pub fn with_reduce_empty_tiles(mut self, reduce: bool) -> Self {
		self.reduce_empty_tiles = reduce;
		self
	}

	pub fn with_prune(mut self, prune: bool) -> Self {
		self.prune = prune;
		self
	}

	pub fn with_overwrite(mut self, overwrite: bool) -> Self {
		self.overwrite = overwrite;
		self
	}

	pub fn validate(&self) -> Result<()> {
		if self.tile_size == 0 {
			return Err(VoxelError::InvalidConfig("tile size must be at least 1".into()));
		}
		if self.layers_per_slab == 0 {
			return Err(VoxelError::InvalidConfig("layers per slab must be at least 1".into()));
		}
		if self.total_layers == 0 {
			return Err(VoxelError::InvalidConfig("total layer count must be at least 1".into()));
		}
		if self.part_name.is_empty() || self.part_name.contains('/') {
			return Err(VoxelError::InvalidConfig(format!(
				"part name `{}` is not a valid group name",
				self.part_name
			)));
		}
		Ok(())
	}

	/// Directory of the container holding slab `slab_index`.
	pub fn slab_path(&self, slab_index: usize) -> PathBuf {
		self.output_dir.join(format!("voxel_layer_{}", slab_index))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_zero_sizes() {
		assert!(VoxelConfig::new("in", "out", "part", 0, 10, 5).is_err());
		assert!(VoxelConfig::new("in", "out", "part", 100, 0, 5).is_err());
		assert!(VoxelConfig::new("in", "out", "part", 100, 10, 0).is_err());
	}

	#[test]
	fn rejects_nested_part_name() {
		let err = VoxelConfig::new("in", "out", "a/b", 100, 10, 5).unwrap_err();
		assert!(matches!(err, VoxelError::InvalidConfig(_)));
	}

	#[test]
	fn slab_path_is_indexed() {
		let config = VoxelConfig::new("in", "out", "part", 100, 10, 5).unwrap();
		assert_eq!(config.slab_path(3), PathBuf::from("out").join("voxel_layer_3"));
		assert_eq!(config.dedup_mode, DedupMode::Max);
	}

	#[test]
	fn dedup_mode_serializes_lowercase() {
		let text = serde_json::to_string(&DedupMode::Mean).unwrap();
		assert_eq!(text, "\"mean\"");
	}
}
