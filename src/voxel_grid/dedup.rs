use std::collections::HashMap;

use crate::voxel_grid::config::DedupMode;
use crate::voxel_grid::sample::Sample;

/// Result of collapsing a layer onto unique coordinates.
#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
	/// One sample per (x, y), in first-seen order.
	pub samples: Vec<Sample>,
	/// Background samples (area and intensity both zero) that were discarded.
	pub background: usize,
	/// Samples folded into an earlier sample at the same coordinate.
	pub collapsed: usize,
}

struct Group {
	first: Sample,
	count: usize,
	area: f64,
	intensity: f64,
}

impl Group {
	fn new(sample: Sample) -> Self {
		Self {
			first: sample,
			count: 1,
			area: sample.area,
			intensity: sample.intensity,
		}
	}

	fn add(&mut self, sample: &Sample, mode: DedupMode) {
		self.count += 1;
		match mode {
			DedupMode::Max => {
				self.area = self.area.max(sample.area);
				self.intensity = self.intensity.max(sample.intensity);
			}
			DedupMode::Mean => {
				self.area += sample.area;
				self.intensity += sample.intensity;
			}
		}
	}

	fn resolve(self, mode: DedupMode) -> Sample {
		if self.count == 1 {
			return self.first;
		}
		let (area, intensity) = match mode {
			DedupMode::Max => (self.area, self.intensity),
			DedupMode::Mean => {
				let n = self.count as f64;
				((self.area / n).trunc(), (self.intensity / n).trunc())
			}
		};
		Sample { area, intensity, ..self.first }
	}
}

/// Drop background samples and collapse samples sharing a coordinate.
///
/// Groups are keyed on exact integer (x, y) in a single hashed pass; the
/// aggregation only ever sees the members of one group.
pub fn deduplicate(samples: &[Sample], mode: DedupMode) -> Deduplicated {
	let mut index: HashMap<(i64, i64), usize> = HashMap::with_capacity(samples.len());
	let mut groups: Vec<Group> = Vec::with_capacity(samples.len());
	let mut background = 0usize;

	for sample in samples {
		if sample.is_background() {
			background += 1;
			continue;
		}
		match index.get(&(sample.x, sample.y)) {
			Some(&slot) => groups[slot].add(sample, mode),
			None => {
				index.insert((sample.x, sample.y), groups.len());
				groups.push(Group::new(*sample));
			}
		}
	}

	let collapsed = samples.len() - background - groups.len();
	Deduplicated {
		samples: groups.into_iter().map(|g| g.resolve(mode)).collect(),
		background,
		collapsed,
	}
}
