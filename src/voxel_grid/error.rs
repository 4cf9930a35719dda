use thiserror::Error;

/// Errors raised by the voxelization pipeline.
///
/// Missing layers, ragged channel arrays and duplicate coordinates are not
/// errors: they are recovered where they occur and only logged.
#[derive(Debug, Error)]
pub enum VoxelError {
	/// A group or dataset that must be written fresh already exists.
	#[error("output already written at `{path}`")]
	OutputWriteConflict { path: String },

	/// Partitioning was requested before the part extent was scanned.
	#[error("part extent has not been computed; run the extent scan first")]
	ExtentNotComputed,

	/// No layer of the part holds a single sample.
	#[error("part `{0}` has no samples in any layer")]
	EmptyPart(String),

	/// Area and intensity datasets of one layer group disagree in length.
	#[error("channel size mismatch in `{group}`: area has {area}, intensity has {intensity}")]
	ChannelSizeMismatch {
		group: String,
		area: usize,
		intensity: usize,
	},

	/// A slab container is already present and overwriting was not requested.
	#[error("slab output `{path}` already exists")]
	OutputExists { path: String },

	#[error("group `{path}` does not exist")]
	MissingGroup { path: String },

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("missing part attribute `{0}`")]
	MissingAttribute(String),

	#[error("invalid tile group pattern: {0}")]
	Pattern(#[from] regex::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VoxelError>;
