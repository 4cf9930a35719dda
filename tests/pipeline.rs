use std::path::Path;

use layer_voxelizer::voxel_grid::config::{DedupMode, VoxelConfig};
use layer_voxelizer::voxel_grid::container::{Container, DirContainer, join_path};
use layer_voxelizer::voxel_grid::error::VoxelError;
use layer_voxelizer::voxel_grid::pipeline::Pipeline;
use layer_voxelizer::voxel_grid::prune::prune_empty_voxels;
use layer_voxelizer::voxel_grid::source::{LayerSource, layer_name};

struct Layer<'a> {
	x: &'a [f64],
	y: &'a [f64],
	area: &'a [f64],
	intensity: &'a [f64],
}

fn write_layer(c: &mut DirContainer, part: &str, index: usize, layer: Layer<'_>) {
	let group = join_path(part, &layer_name(index));
	c.create_group(&group).unwrap();
	c.write_dataset(&join_path(&group, "X-Axis"), layer.x).unwrap();
	c.write_dataset(&join_path(&group, "Y-Axis"), layer.y).unwrap();
	c.write_dataset(&join_path(&group, "Area"), layer.area).unwrap();
	c.write_dataset(&join_path(&group, "Intensity"), layer.intensity).unwrap();
}

/// Part spanning 250 x 180 from origin (-50, 100), with a ragged layer,
/// duplicates and a missing layer (index 2).
fn build_source(root: &Path) -> DirContainer {
	let mut c = DirContainer::create(root).unwrap();
	c.create_group("part").unwrap();
	for (key, value) in [
		("minX", -50.0),
		("maxX", 200.0),
		("minY", 100.0),
		("maxY", 280.0),
		("minZ", 0.0),
		("maxZ", 2.0),
		("layerThickness", 0.5),
	] {
		c.set_attribute("part", key, value).unwrap();
	}
	write_layer(&mut c, "part", 0, Layer {
		x: &[-50.0, 200.0],
		y: &[100.0, 280.0],
		area: &[1.0, 2.0],
		intensity: &[1.0, 2.0],
	});
	// single sample normalizing to (105, 20); the ragged tail is dropped
	write_layer(&mut c, "part", 1, Layer {
		x: &[55.0, 55.0, 60.0],
		y: &[120.0, 120.0, 130.0],
		area: &[3.0, 5.0],
		intensity: &[4.0, 6.0, 9.0],
	});
	write_layer(&mut c, "part", 3, Layer {
		x: &[0.0],
		y: &[150.0],
		area: &[0.0],
		intensity: &[0.0],
	});
	c
}

fn config(source: &Path, output: &Path) -> VoxelConfig {
	VoxelConfig::new(source, output, "part", 100, 2, 4).unwrap()
}

#[test]
fn end_to_end_dense_run() {
	let dir = tempfile::tempdir().unwrap();
	let container = build_source(&dir.path().join("source"));
	let config = config(&dir.path().join("source"), &dir.path().join("out")).with_dedup_mode(DedupMode::Mean);

	let source = LayerSource::new(&container, "part").unwrap();
	let mut pipeline = Pipeline::new(&config, source).quiet();
	let extent = pipeline.scan().unwrap();
	assert_eq!((extent.origin_x, extent.origin_y), (-50, 100));
	assert_eq!((extent.span_x(), extent.span_y()), (250, 180));
	let grid = pipeline.grid().unwrap();
	assert_eq!((grid.tile_count_x, grid.tile_count_y, grid.slab_count), (3, 2, 2));

	let report = pipeline.run().unwrap();
	assert!(report.is_success());
	assert_eq!(report.completed.len(), 2);
	assert_eq!(report.completed[1].layers_missing, 1);

	let slab0 = DirContainer::open(config.slab_path(0)).unwrap();
	assert_eq!(slab0.list_groups("").unwrap().len(), 6);
	for tile in slab0.list_groups("").unwrap() {
		for layer in ["slice_0", "slice_1"] {
			let path = join_path(&join_path(&tile, layer), "Area");
			assert_eq!(slab0.dataset_len(&path).unwrap(), Some(10_000), "{}", path);
		}
	}

	let area = slab0.read_dataset("voxel_1_0_0/slice_1/Area").unwrap().unwrap();
	let intensity = slab0.read_dataset("voxel_1_0_0/slice_1/Intensity").unwrap().unwrap();
	assert_eq!(area[5 * 100 + 20], 4.0);
	assert_eq!(intensity[5 * 100 + 20], 5.0);
	assert_eq!(area.iter().filter(|&&v| v != 0.0).count(), 1);
	for tile in ["voxel_0_0_0", "voxel_2_0_0", "voxel_0_1_0", "voxel_1_1_0", "voxel_2_1_0"] {
		let path = join_path(tile, "slice_1/Area");
		let values = slab0.read_dataset(&path).unwrap().unwrap();
		assert!(values.iter().all(|&v| v == 0.0), "{} should be empty", path);
	}

	let x_axis = slab0.read_dataset("voxel_1_0_0/slice_1/X-Axis").unwrap().unwrap();
	let y_axis = slab0.read_dataset("voxel_1_0_0/slice_1/Y-Axis").unwrap().unwrap();
	assert_eq!((x_axis[5 * 100 + 20], y_axis[5 * 100 + 20]), (105.0, 20.0));

	let attrs = slab0.attributes("").unwrap();
	assert_eq!(attrs.get("originX"), Some(&-50.0));
	assert_eq!(attrs.get("tileSize"), Some(&100.0));
}

#[test]
fn reduced_run_with_pruning_keeps_only_occupied_tiles() {
	let dir = tempfile::tempdir().unwrap();
	let container = build_source(&dir.path().join("source"));
	let config = config(&dir.path().join("source"), &dir.path().join("out"))
		.with_reduce_empty_tiles(true)
		.with_prune(true);

	let mut pipeline = Pipeline::new(&config, LayerSource::new(&container, "part").unwrap()).quiet();
	pipeline.scan().unwrap();
	let report = pipeline.run().unwrap();
	assert!(report.is_success());

	let slab0 = DirContainer::open(config.slab_path(0)).unwrap();
	assert_eq!(
		slab0.list_groups("").unwrap(),
		vec!["voxel_0_0_0".to_string(), "voxel_1_0_0".to_string(), "voxel_2_1_0".to_string()]
	);
	// layer 3 holds only background, layer 2 is absent
	let slab1 = DirContainer::open(config.slab_path(1)).unwrap();
	assert!(slab1.list_groups("").unwrap().is_empty());
	assert_eq!(report.completed[1].tiles_pruned, 6);
}

#[test]
fn existing_slab_output_needs_overwrite() {
	let dir = tempfile::tempdir().unwrap();
	let container = build_source(&dir.path().join("source"));
	let config = config(&dir.path().join("source"), &dir.path().join("out"));

	let mut pipeline = Pipeline::new(&config, LayerSource::new(&container, "part").unwrap()).quiet();
	pipeline.scan().unwrap();
	assert!(pipeline.run().unwrap().is_success());

	let rerun = pipeline.run_slabs(&[1]).unwrap();
	assert_eq!(rerun.failed.len(), 1);
	assert!(matches!(rerun.failed[0].error, VoxelError::OutputExists { .. }));

	let config = config.clone().with_overwrite(true);
	let mut pipeline = Pipeline::new(&config, LayerSource::new(&container, "part").unwrap()).quiet();
	pipeline.scan().unwrap();
	let rerun = pipeline.run_slabs(&[1]).unwrap();
	assert!(rerun.is_success());
	assert_eq!(rerun.completed[0].slab, 1);
}

#[test]
fn no_output_without_extent() {
	let dir = tempfile::tempdir().unwrap();
	let container = build_source(&dir.path().join("source"));
	let config = config(&dir.path().join("source"), &dir.path().join("out"));

	let pipeline = Pipeline::new(&config, LayerSource::new(&container, "part").unwrap()).quiet();
	assert!(matches!(pipeline.run(), Err(VoxelError::ExtentNotComputed)));
	assert!(matches!(pipeline.run_slab(0), Err(VoxelError::ExtentNotComputed)));
	assert!(!dir.path().join("out").exists());
}

#[test]
fn dense_output_is_never_pruned() {
	let dir = tempfile::tempdir().unwrap();
	let container = build_source(&dir.path().join("source"));
	let config = config(&dir.path().join("source"), &dir.path().join("out"));

	let mut pipeline = Pipeline::new(&config, LayerSource::new(&container, "part").unwrap()).quiet();
	pipeline.scan().unwrap();
	pipeline.run_slab(1).unwrap();

	let mut slab1 = DirContainer::open(config.slab_path(1)).unwrap();
	let report = prune_empty_voxels(&mut slab1).unwrap();
	assert_eq!(report.inspected, 6);
	assert!(report.removed.is_empty());
}

#[test]
fn layer_count_from_attributes() {
	let dir = tempfile::tempdir().unwrap();
	let container = build_source(&dir.path().join("source"));
	let dims = LayerSource::new(&container, "part").unwrap().dimensions().unwrap();
	assert_eq!(dims.layer_count, 4);
	assert_eq!((dims.length_x, dims.length_y), (250.0, 180.0));
}

#[test]
fn pruning_counts_every_layer_of_a_tile() {
	let dir = tempfile::tempdir().unwrap();
	let mut slab = DirContainer::create(dir.path().join("voxel_layer_0")).unwrap();
	for group in ["voxel_0_0_0", "voxel_0_0_0/slice_0", "voxel_0_0_0/slice_15", "voxel_1_0_0", "voxel_1_0_0/slice_0"] {
		slab.create_group(group).unwrap();
	}
	slab.write_dataset("voxel_0_0_0/slice_0/Area", &[]).unwrap();
	slab.write_dataset("voxel_0_0_0/slice_0/Intensity", &[]).unwrap();
	slab.write_dataset("voxel_0_0_0/slice_15/Area", &[1.0, 2.0]).unwrap();
	slab.write_dataset("voxel_0_0_0/slice_15/Intensity", &[3.0, 4.0]).unwrap();

	let report = prune_empty_voxels(&mut slab).unwrap();
	assert_eq!(report.removed, vec!["voxel_1_0_0".to_string()]);
	assert_eq!(slab.list_groups("").unwrap(), vec!["voxel_0_0_0".to_string()]);
	let area = slab.read_dataset("voxel_0_0_0/slice_15/Area").unwrap().unwrap();
	assert_eq!(area, vec![1.0, 2.0]);
}
