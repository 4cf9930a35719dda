use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::info;

use layer_voxelizer::voxel_grid::config::{DedupMode, VoxelConfig};
use layer_voxelizer::voxel_grid::container::DirContainer;
use layer_voxelizer::voxel_grid::info;
use layer_voxelizer::voxel_grid::pipeline::Pipeline;
use layer_voxelizer::voxel_grid::prune::prune_empty_voxels;
use layer_voxelizer::voxel_grid::source::LayerSource;

#[derive(Parser)]
#[command(version, about = "Convert per-layer point measurements into slab voxel containers")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Scan the part extent and write every slab
	Run(RunArgs),
	/// Scan the part extent and print the tile grid
	Extent(GridArgs),
	/// Delete empty tile groups from a finished slab container
	Prune {
		/// Slab container directory
		slab: PathBuf,
	},
	/// Print part dimensions from the part attributes
	Dimensions(PartArgs),
}

#[derive(Args)]
struct PartArgs {
	/// Input container directory
	#[arg(long)]
	source: PathBuf,
	/// Part group inside the input container
	#[arg(long)]
	part: String,
}

#[derive(Args)]
struct GridArgs {
	#[command(flatten)]
	part: PartArgs,
	/// Layers to scan; derived from the part attributes when omitted
	#[arg(long)]
	layers: Option<usize>,
	#[arg(long, default_value_t = 100)]
	tile_size: usize,
	#[arg(long, default_value_t = 10)]
	layers_per_slab: usize,
}

#[derive(Args)]
struct RunArgs {
	#[command(flatten)]
	grid: GridArgs,
	/// Directory receiving one container per slab
	#[arg(long)]
	output: PathBuf,
	#[arg(long, value_enum, default_value_t = DedupMode::Max)]
	dedup: DedupMode,
	/// Prune empty tile groups after each slab
	#[arg(long)]
	prune: bool,
	/// Store tiles without samples as zero-length datasets
	#[arg(long)]
	reduce_empty_tiles: bool,
	/// Only run this slab
	#[arg(long)]
	slab: Option<usize>,
	/// Worker threads (defaults to all cores)
	#[arg(long)]
	jobs: Option<usize>,
	/// Replace existing slab containers
	#[arg(long)]
	overwrite: bool,
	/// Hide progress bars
	#[arg(long)]
	quiet: bool,
}

fn resolve_layers(source: &LayerSource<'_, DirContainer>, layers: Option<usize>) -> Result<usize> {
	if let Some(layers) = layers {
		return Ok(layers);
	}
	let dims = source
		.dimensions()
		.context("--layers not given and the part attributes do not define a layer count")?;
	info!("layer count {} taken from part attributes", dims.layer_count);
	Ok(dims.layer_count)
}

fn config_for(grid: &GridArgs, output: PathBuf, layers: usize) -> Result<VoxelConfig> {
	Ok(VoxelConfig::new(
		&grid.part.source,
		output,
		&grid.part.part,
		grid.tile_size,
		grid.layers_per_slab,
		layers,
	)?)
}

fn run(args: RunArgs) -> Result<()> {
	if let Some(jobs) = args.jobs {
		rayon::ThreadPoolBuilder::new()
			.num_threads(jobs)
			.build_global()
			.context("failed to configure worker threads")?;
	}

	let container = DirContainer::open(&args.grid.part.source)
		.with_context(|| format!("cannot open source {}", args.grid.part.source.display()))?;
	let source = LayerSource::new(&container, &args.grid.part.part)?;
	let layers = resolve_layers(&source, args.grid.layers)?;
	let config = config_for(&args.grid, args.output, layers)?
		.with_dedup_mode(args.dedup)
		.with_prune(args.prune)
		.with_reduce_empty_tiles(args.reduce_empty_tiles)
		.with_overwrite(args.overwrite);

	let mut pipeline = Pipeline::new(&config, source);
	if args.quiet {
		pipeline = pipeline.quiet();
	}
	pipeline.scan().context("extent scan failed; no output was written")?;

	let report = match args.slab {
		Some(slab) => pipeline.run_slabs(&[slab])?,
		None => pipeline.run()?,
	};
	info!(
		"{} slabs completed, {} samples written",
		report.completed.len(),
		report.samples_written()
	);
	if !report.is_success() {
		for failure in &report.failed {
			log::error!("slab {}: {}", failure.slab, failure.error);
		}
		let slabs: Vec<String> = report.failed.iter().map(|f| f.slab.to_string()).collect();
		bail!(
			"{} slab(s) failed: {}; discard their output and re-run with --slab <n> --overwrite",
			slabs.len(),
			slabs.join(", ")
		);
	}
	Ok(())
}

fn extent(args: GridArgs) -> Result<()> {
	let container = DirContainer::open(&args.part.source)
		.with_context(|| format!("cannot open source {}", args.part.source.display()))?;
	let source = LayerSource::new(&container, &args.part.part)?;
	let layers = resolve_layers(&source, args.layers)?;
	let config = config_for(&args, PathBuf::new(), layers)?;

	let mut pipeline = Pipeline::new(&config, source);
	let extent = pipeline.scan()?;
	println!("originX {}", extent.origin_x);
	println!("originY {}", extent.origin_y);
	println!("spanX {}", extent.span_x());
	println!("spanY {}", extent.span_y());
	let grid = pipeline.grid()?;
	println!("tiles {} x {}", grid.tile_count_x, grid.tile_count_y);
	println!("slabs {}", grid.slab_count);
	Ok(())
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	info::print_banner();
	info::print_compile_info();

	match Cli::parse().command {
		Command::Run(args) => run(args),
		Command::Extent(args) => extent(args),
		Command::Prune { slab } => {
			let mut container = DirContainer::open(&slab)
				.with_context(|| format!("cannot open slab {}", slab.display()))?;
			let report = prune_empty_voxels(&mut container)?;
			println!("removed {} of {} tile groups", report.removed.len(), report.inspected);
			Ok(())
		}
		Command::Dimensions(args) => {
			let container = DirContainer::open(&args.source)?;
			let dims = LayerSource::new(&container, &args.part)?.dimensions()?;
			println!("lengthX {}", dims.length_x);
			println!("lengthY {}", dims.length_y);
			println!("height {}", dims.height);
			println!("minX {}", dims.min_x);
			println!("minY {}", dims.min_y);
			println!("layers {}", dims.layer_count);
			Ok(())
		}
	}
}
