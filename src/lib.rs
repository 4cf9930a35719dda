pub mod voxel_grid {
	pub mod info;
	pub mod error;
	pub mod config;
	pub mod container;
	pub mod source;
	pub mod sample;
	pub mod extent;
	pub mod dedup;
	pub mod grid;
	pub mod utils;
	pub mod partition;
	pub mod writer;
	pub mod prune;
	pub mod pipeline;
}
