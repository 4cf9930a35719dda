use log::{debug, info};
use rayon::prelude::*;

use crate::voxel_grid::container::Container;
use crate::voxel_grid::error::{Result, VoxelError};
use crate::voxel_grid::source::{LayerSource, layer_name};

/// Part-wide coordinate bounds. Computed once, read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartExtent {
	pub origin_x: i64,
	pub origin_y: i64,
	pub max_x: i64,
	pub max_y: i64,
}

impl PartExtent {
	#[inline]
	pub fn span_x(&self) -> i64 {
		self.max_x.saturating_sub(self.origin_x)
	}

	#[inline]
	pub fn span_y(&self) -> i64 {
		self.max_y.saturating_sub(self.origin_y)
	}
}

/// Running min/max over x and y values, mergeable across workers.
#[derive(Debug, Clone, Default)]
pub struct ExtentScanner {
	x: Option<(i64, i64)>,
	y: Option<(i64, i64)>,
}

fn widen(bounds: Option<(i64, i64)>, value: i64) -> Option<(i64, i64)> {
	match bounds {
		Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
		None => Some((value, value)),
	}
}

fn union(a: Option<(i64, i64)>, b: Option<(i64, i64)>) -> Option<(i64, i64)> {
	match (a, b) {
		(Some((alo, ahi)), Some((blo, bhi))) => Some((alo.min(blo), ahi.max(bhi))),
		(a, None) => a,
		(None, b) => b,
	}
}

impl ExtentScanner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fold one layer's coordinate channels into the running bounds.
	pub fn observe(&mut self, xs: &[f64], ys: &[f64]) {
		for &x in xs {
			self.x = widen(self.x, x as i64);
		}
		for &y in ys {
			self.y = widen(self.y, y as i64);
		}
	}

	pub fn merge(self, other: Self) -> Self {
		Self {
			x: union(self.x, other.x),
			y: union(self.y, other.y),
		}
	}

	/// The extent, or `None` if no coordinate was ever observed.
	pub fn finish(&self) -> Option<PartExtent> {
		let (origin_x, max_x) = self.x?;
		let (origin_y, max_y) = self.y?;
		Some(PartExtent {
			origin_x,
			origin_y,
			max_x,
			max_y,
		})
	}
}

/// Scan layers `0..total_layers` of a part for its true extent.
///
/// Layers are read in parallel and reduced; absent layers are skipped. This
/// must finish before any layer is normalized or partitioned.
pub fn scan_extent<C: Container + Sync>(
	source: &LayerSource<'_, C>,
	total_layers: usize,
) -> Result<PartExtent> {
	let scanner = (0..total_layers)
		.into_par_iter()
		.map(|index| -> Result<ExtentScanner> {
			let mut scanner = ExtentScanner::new();
			match source.read_coordinates(index)? {
				Some((xs, ys)) => scanner.observe(&xs, &ys),
				None => debug!("{}: absent, skipped in extent scan", layer_name(index)),
			}
			Ok(scanner)
		})
		.try_reduce(ExtentScanner::new, |a, b| Ok(a.merge(b)))?;

	let extent = scanner
		.finish()
		.ok_or_else(|| VoxelError::EmptyPart(source.part().to_string()))?;
	info!(
		"part `{}` extent: x {}..={} (span {}), y {}..={} (span {})",
		source.part(),
		extent.origin_x,
		extent.max_x,
		extent.span_x(),
		extent.origin_y,
		extent.max_y,
		extent.span_y()
	);
	Ok(extent)
}
