use crate::voxel_grid::container::{Container, join_path};
use crate::voxel_grid::error::{Result, VoxelError};

pub const X_AXIS: &str = "X-Axis";
pub const Y_AXIS: &str = "Y-Axis";
pub const AREA: &str = "Area";
pub const INTENSITY: &str = "Intensity";

/// Storage name of a 0-based layer index: `Slice00001` for layer 0.
pub fn layer_name(index: usize) -> String {
	format!("Slice{:05}", index + 1)
}

/// The four channel arrays of one layer exactly as stored, possibly ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLayer {
	pub x: Vec<f64>,
	pub y: Vec<f64>,
	pub area: Vec<f64>,
	pub intensity: Vec<f64>,
}

impl RawLayer {
	pub fn lengths(&self) -> [usize; 4] {
		[self.x.len(), self.y.len(), self.area.len(), self.intensity.len()]
	}
}

/// Part dimensions derived from the optional per-part attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PartDimensions {
	pub length_x: f64,
	pub length_y: f64,
	pub height: f64,
	pub min_x: f64,
	pub min_y: f64,
	pub layer_count: usize,
}

/// Read access to one part inside an acquisition container.
pub struct LayerSource<'a, C: Container> {
	container: &'a C,
	part: String,
}

impl<'a, C: Container> LayerSource<'a, C> {
	pub fn new(container: &'a C, part: &str) -> Result<Self> {
		if !container.has_group(part) {
			return Err(VoxelError::MissingGroup { path: part.to_string() });
		}
		Ok(Self {
			container,
			part: part.to_string(),
		})
	}

	pub fn part(&self) -> &str {
		&self.part
	}

	fn layer_group(&self, index: usize) -> Option<String> {
		let group = join_path(&self.part, &layer_name(index));
		self.container.has_group(&group).then_some(group)
	}

	fn channel(&self, group: &str, name: &str) -> Result<Vec<f64>> {
		Ok(self
			.container
			.read_dataset(&join_path(group, name))?
			.unwrap_or_default())
	}

	/// All four channels of a layer, or `None` if the layer is absent.
	pub fn read_layer(&self, index: usize) -> Result<Option<RawLayer>> {
		let Some(group) = self.layer_group(index) else {
			return Ok(None);
		};
		Ok(Some(RawLayer {
			x: self.channel(&group, X_AXIS)?,
			y: self.channel(&group, Y_AXIS)?,
			area: self.channel(&group, AREA)?,
			intensity: self.channel(&group, INTENSITY)?,
		}))
	}

	/// Only the coordinate channels of a layer, for the extent scan.
	pub fn read_coordinates(&self, index: usize) -> Result<Option<(Vec<f64>, Vec<f64>)>> {
		let Some(group) = self.layer_group(index) else {
			return Ok(None);
		};
		Ok(Some((self.channel(&group, X_AXIS)?, self.channel(&group, Y_AXIS)?)))
	}

	/// Dimensions from the part's `minX`/`maxX`/... attributes.
	pub fn dimensions(&self) -> Result<PartDimensions> {
		let attrs = self.container.attributes(&self.part)?;
		let get = |key: &str| {
			attrs
				.get(key)
				.copied()
				.ok_or_else(|| VoxelError::MissingAttribute(key.to_string()))
		};
		let (min_x, max_x) = (get("minX")?, get("maxX")?);
		let (min_y, max_y) = (get("minY")?, get("maxY")?);
		let (min_z, max_z) = (get("minZ")?, get("maxZ")?);
		let thickness = get("layerThickness")?;
		if thickness <= 0.0 {
			return Err(VoxelError::InvalidConfig(format!(
				"layer thickness must be positive, got {}",
				thickness
			)));
		}
		let height = (max_z - min_z).abs();
		Ok(PartDimensions {
			length_x: (max_x - min_x).abs(),
			length_y: (max_y - min_y).abs(),
			height,
			min_x,
			min_y,
			layer_count: (height / thickness) as usize,
		})
	}
}
