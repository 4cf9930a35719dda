use std::sync::OnceLock;

use log::{debug, info};
use regex::Regex;

use crate::voxel_grid::container::{Container, join_path};
use crate::voxel_grid::error::{Result, VoxelError};
use crate::voxel_grid::source::{AREA, INTENSITY};

static TILE_GROUP: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

fn tile_group_regex() -> Result<&'static Regex> {
	TILE_GROUP
		.get_or_init(|| Regex::new(r"^voxel_(\d+)_(\d+)_(\d+)$"))
		.as_ref()
		.map_err(|e| VoxelError::Pattern(e.clone()))
}

/// Parse `voxel_{x}_{y}_{slab}` into its indices.
pub fn parse_tile_group(name: &str) -> Result<Option<(usize, usize, usize)>> {
	let Some(caps) = tile_group_regex()?.captures(name) else {
		return Ok(None);
	};
	let field = |i: usize| -> Option<usize> { caps.get(i)?.as_str().parse().ok() };
	Ok(field(1).zip(field(2)).zip(field(3)).map(|((x, y), z)| (x, y, z)))
}

/// Outcome of one pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
	pub inspected: usize,
	pub removed: Vec<String>,
}

/// Total area-dataset size of a tile group over every layer sub-group it
/// holds.
///
/// A sub-group without datasets counts as zero. Area and intensity must
/// agree in size in every layer.
fn tile_size_total<C: Container>(container: &C, group: &str) -> Result<usize> {
	let mut total = 0usize;
	for child in container.list_groups(group)? {
		let layer = join_path(group, &child);
		let area = container.dataset_len(&join_path(&layer, AREA))?.unwrap_or(0);
		let intensity = container.dataset_len(&join_path(&layer, INTENSITY))?.unwrap_or(0);
		if area != intensity {
			return Err(VoxelError::ChannelSizeMismatch {
				group: layer,
				area,
				intensity,
			});
		}
		total += area;
	}
	Ok(total)
}

/// Delete every tile group whose datasets are empty across all its layers.
///
/// Only run on a slab whose layers have all been written: a tile may gain
/// samples on any later layer.
pub fn prune_empty_voxels<C: Container>(container: &mut C) -> Result<PruneReport> {
	let mut report = PruneReport::default();
	for name in container.list_groups("")? {
		if parse_tile_group(&name)?.is_none() {
			continue;
		}
		report.inspected += 1;
		if tile_size_total(container, &name)? == 0 {
			container.remove_group(&name)?;
			debug!("pruned empty tile group {}", name);
			report.removed.push(name);
		}
	}
	info!(
		"pruned {} of {} tile groups",
		report.removed.len(),
		report.inspected
	);
	Ok(report)
}
