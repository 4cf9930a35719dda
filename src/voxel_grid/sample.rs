use log::warn;

use crate::voxel_grid::source::RawLayer;

/// One measurement on the integer build-plane grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
	pub x: i64,
	pub y: i64,
	pub area: f64,
	pub intensity: f64,
}

impl Sample {
	pub fn new(x: i64, y: i64, area: f64, intensity: f64) -> Self {
		Self { x, y, area, intensity }
	}

	/// Both channels zero: background without material.
	#[inline]
	pub fn is_background(&self) -> bool {
		self.area == 0.0 && self.intensity == 0.0
	}
}

/// Truncate all four channels to the shortest one, dropping tail elements.
/// Returns the total number of values dropped across the channels.
pub fn reconcile(layer: &mut RawLayer) -> usize {
	let lengths = layer.lengths();
	let min_len = lengths.iter().copied().min().unwrap_or(0);
	let dropped: usize = lengths.iter().map(|len| len - min_len).sum();
	if dropped > 0 {
		layer.x.truncate(min_len);
		layer.y.truncate(min_len);
		layer.area.truncate(min_len);
		layer.intensity.truncate(min_len);
	}
	dropped
}

/// Reconcile a layer and read its channels in lock-step as samples.
/// Coordinates are truncated toward zero onto the integer grid.
pub fn reconcile_layer(name: &str, mut layer: RawLayer) -> Vec<Sample> {
	let lengths = layer.lengths();
	let dropped = reconcile(&mut layer);
	if dropped > 0 {
		warn!(
			"{}: channel lengths differ (x={}, y={}, area={}, intensity={}); dropped {} trailing values",
			name, lengths[0], lengths[1], lengths[2], lengths[3], dropped
		);
	}

	layer
		.x
		.iter()
		.zip(&layer.y)
		.zip(layer.area.iter().zip(&layer.intensity))
		.map(|((&x, &y), (&area, &intensity))| Sample::new(x as i64, y as i64, area, intensity))
		.collect()
}

/// Shift samples so the part-wide origin maps to (0, 0).
///
/// A sample whose offset from the origin does not fit in an `i64` cannot
/// land on the grid and is dropped.
pub fn normalize(samples: Vec<Sample>, origin_x: i64, origin_y: i64) -> Vec<Sample> {
	let total = samples.len();
	let shifted: Vec<Sample> = samples
		.into_iter()
		.filter_map(|s| {
			let x = s.x.checked_sub(origin_x)?;
			let y = s.y.checked_sub(origin_y)?;
			debug_assert!(x >= 0 && y >= 0, "sample below part origin");
			Some(Sample { x, y, ..s })
		})
		.collect();
	if shifted.len() < total {
		warn!("{} samples too far from the part origin were dropped", total - shifted.len());
	}
	shifted
}
