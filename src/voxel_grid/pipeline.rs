use std::fs;
use std::time::Instant;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::voxel_grid::config::VoxelConfig;
use crate::voxel_grid::container::{Container, DirContainer};
use crate::voxel_grid::dedup::deduplicate;
use crate::voxel_grid::error::{Result, VoxelError};
use crate::voxel_grid::extent::{PartExtent, scan_extent};
use crate::voxel_grid::grid::TileGrid;
use crate::voxel_grid::partition::LayerIndex;
use crate::voxel_grid::prune::prune_empty_voxels;
use crate::voxel_grid::sample::{normalize, reconcile_layer};
use crate::voxel_grid::source::{LayerSource, layer_name};
use crate::voxel_grid::writer::SlabWriter;

/// What one slab run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlabReport {
	pub slab: usize,
	pub layers_read: usize,
	pub layers_missing: usize,
	pub samples_written: usize,
	pub tiles_written: usize,
	pub tiles_pruned: usize,
	pub elapsed_secs: f64,
}

#[derive(Debug)]
pub struct SlabFailure {
	pub slab: usize,
	pub error: VoxelError,
}

/// Per-slab outcomes of a run, in slab order.
#[derive(Debug, Default)]
pub struct RunReport {
	pub completed: Vec<SlabReport>,
	pub failed: Vec<SlabFailure>,
}

impl RunReport {
	pub fn is_success(&self) -> bool {
		self.failed.is_empty()
	}

	pub fn samples_written(&self) -> usize {
		self.completed.iter().map(|r| r.samples_written).sum()
	}
}

/// Drives extent scan, then per-slab reconcile → normalize → dedup →
/// partition → write, optionally followed by pruning.
///
/// Slabs share nothing but the configuration, the read-only source and the
/// part extent, so they run as an independent parallel map.
pub struct Pipeline<'a, C: Container> {
	config: &'a VoxelConfig,
	source: LayerSource<'a, C>,
	extent: Option<PartExtent>,
	progress: MultiProgress,
}

impl<'a, C: Container + Sync> Pipeline<'a, C> {
	pub fn new(config: &'a VoxelConfig, source: LayerSource<'a, C>) -> Self {
		Self {
			config,
			source,
			extent: None,
			progress: MultiProgress::new(),
		}
	}

	/// Suppress progress bars (logging is unaffected).
	pub fn quiet(self) -> Self {
		self.progress.set_draw_target(ProgressDrawTarget::hidden());
		self
	}

	/// Use an extent computed elsewhere instead of scanning.
	pub fn with_extent(mut self, extent: PartExtent) -> Self {
		self.extent = Some(extent);
		self
	}

	pub fn extent(&self) -> Option<&PartExtent> {
		self.extent.as_ref()
	}

	/// Run the global extent scan over every configured layer.
	pub fn scan(&mut self) -> Result<PartExtent> {
		let extent = scan_extent(&self.source, self.config.total_layers)?;
		self.extent = Some(extent);
		Ok(extent)
	}

	/// Tile grid for the scanned extent.
	pub fn grid(&self) -> Result<TileGrid> {
		let extent = self.extent.ok_or(VoxelError::ExtentNotComputed)?;
		Ok(TileGrid::new(
			&extent,
			self.config.tile_size,
			self.config.layers_per_slab,
			self.config.total_layers,
		))
	}

	fn progress_bar(&self, slab: usize, layers: usize) -> ProgressBar {
		let pb = self.progress.add(ProgressBar::new(layers as u64));
		pb.set_style(
			ProgressStyle::default_bar()
				.template("Slab {prefix:>4}: [{bar:40.cyan/blue}] {pos}/{len} layers ({eta})")
				.unwrap_or_else(|_| ProgressStyle::default_bar())
				.progress_chars("#>-"),
		);
		pb.set_prefix(slab.to_string());
		pb
	}

	/// Voxelize every layer of `slab` into `output`, layer by layer.
	pub fn process_slab<O: Container>(&self, slab: usize, output: O) -> Result<(SlabReport, O)> {
		let extent = self.extent.ok_or(VoxelError::ExtentNotComputed)?;
		let grid = self.grid()?;
		if slab >= grid.slab_count {
			return Err(VoxelError::InvalidConfig(format!(
				"slab {} is out of range, the part has {} slabs",
				slab, grid.slab_count
			)));
		}

		let start_time = Instant::now();
		let layers = grid.slab_layers(slab);
		let mut report = SlabReport {
			slab,
			..SlabReport::default()
		};
		let mut writer = SlabWriter::new(output, slab, self.config.reduce_empty_tiles);
		writer.write_metadata(&extent, &grid)?;

		let pb = self.progress_bar(slab, layers.len());
		for global in layers {
			let name = layer_name(global);
			let samples = match self.source.read_layer(global)? {
				Some(raw) => {
					report.layers_read += 1;
					reconcile_layer(&name, raw)
				}
				None => {
					debug!("{}: absent, treated as empty", name);
					report.layers_missing += 1;
					Vec::new()
				}
			};
			let samples = normalize(samples, extent.origin_x, extent.origin_y);
			let dedup = deduplicate(&samples, self.config.dedup_mode);
			if dedup.collapsed > 0 {
				debug!("{}: collapsed {} duplicate samples", name, dedup.collapsed);
			}

			let index = LayerIndex::build(&dedup.samples, &grid);
			if index.off_grid() > 0 {
				warn!("{}: {} samples outside the tile grid were ignored", name, index.off_grid());
			}
			let local = grid.local_layer(global);
			for (tile_x, tile_y) in grid.tiles() {
				writer.write_tile(&index.tile(tile_x, tile_y), local)?;
			}
			pb.inc(1);
		}
		pb.finish_and_clear();

		report.tiles_written = writer.tiles_written();
		report.samples_written = writer.samples_written();
		if self.config.prune {
			let pruned = prune_empty_voxels(writer.container_mut())?;
			report.tiles_pruned = pruned.removed.len();
		}
		report.elapsed_secs = start_time.elapsed().as_secs_f64();

		info!(
			"slab {} done: {} layers ({} missing), {} samples, {} tile layers, {} tiles pruned in {:.3} s",
			slab,
			report.layers_read + report.layers_missing,
			report.layers_missing,
			report.samples_written,
			report.tiles_written,
			report.tiles_pruned,
			report.elapsed_secs
		);
		Ok((report, writer.into_inner()))
	}

	/// Voxelize one slab into its own container under the output directory.
	pub fn run_slab(&self, slab: usize) -> Result<SlabReport> {
		self.grid()?;
		let path = self.config.slab_path(slab);
		if path.exists() {
			if !self.config.overwrite {
				return Err(VoxelError::OutputExists {
					path: path.display().to_string(),
				});
			}
			fs::remove_dir_all(&path)?;
		}
		let container = DirContainer::create(&path)?;
		let (report, _) = self.process_slab(slab, container)?;
		Ok(report)
	}

	/// Run the given slabs in parallel and collect their outcomes.
	pub fn run_slabs(&self, slabs: &[usize]) -> Result<RunReport> {
		let grid = self.grid()?;
		grid.report();
		fs::create_dir_all(&self.config.output_dir)?;

		let outcomes: Vec<(usize, Result<SlabReport>)> = slabs
			.par_iter()
			.map(|&slab| (slab, self.run_slab(slab)))
			.collect();

		let mut run = RunReport::default();
		for (slab, outcome) in outcomes {
			match outcome {
				Ok(report) => run.completed.push(report),
				Err(error) => {
					warn!("slab {} failed: {}", slab, error);
					run.failed.push(SlabFailure { slab, error });
				}
			}
		}
		Ok(run)
	}

	/// Run every slab of the part.
	pub fn run(&self) -> Result<RunReport> {
		let grid = self.grid()?;
		let slabs: Vec<usize> = (0..grid.slab_count).collect();
		self.run_slabs(&slabs)
	}
}
