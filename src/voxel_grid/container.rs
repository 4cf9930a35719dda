use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::voxel_grid::error::{Result, VoxelError};

const DATASET_EXT: &str = "f64";
const ATTRS_FILE: &str = ".attrs.json";

/// Named numeric attributes attached to a group.
pub type Attributes = BTreeMap<String, f64>;

/// Hierarchical store of numeric datasets under `/`-separated group paths.
///
/// The root group is the empty path and always exists.
pub trait Container {
	fn has_group(&self, path: &str) -> bool;

	/// Create a group; fails with `OutputWriteConflict` if it already exists.
	fn create_group(&mut self, path: &str) -> Result<()>;

	/// Create a group unless it already exists.
	fn ensure_group(&mut self, path: &str) -> Result<()> {
		if self.has_group(path) {
			return Ok(());
		}
		self.create_group(path)
	}

	/// Names of the direct child groups of `path`, sorted.
	fn list_groups(&self, path: &str) -> Result<Vec<String>>;

	/// Delete a group and everything below it.
	fn remove_group(&mut self, path: &str) -> Result<()>;

	/// Write a new dataset; an existing dataset is never overwritten.
	fn write_dataset(&mut self, path: &str, data: &[f64]) -> Result<()>;

	fn read_dataset(&self, path: &str) -> Result<Option<Vec<f64>>>;

	/// Number of elements in a dataset without reading its contents.
	fn dataset_len(&self, path: &str) -> Result<Option<usize>>;

	fn attributes(&self, path: &str) -> Result<Attributes>;

	fn set_attribute(&mut self, path: &str, name: &str, value: f64) -> Result<()>;
}

/// Join a parent group path and a child name.
pub fn join_path(parent: &str, child: &str) -> String {
	let parent = normalize(parent);
	if parent.is_empty() {
		normalize(child).to_string()
	} else {
		format!("{}/{}", parent, normalize(child))
	}
}

fn normalize(path: &str) -> &str {
	path.trim_matches('/')
}

fn parent_of(path: &str) -> &str {
	let path = normalize(path);
	path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

/// Container stored as a directory tree: groups are directories, datasets are
/// little-endian `f64` files, attributes live in a JSON file per group.
#[derive(Debug, Clone)]
pub struct DirContainer {
	root: PathBuf,
}

impl DirContainer {
	/// Create the container root, reusing it if present.
	pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
		let root = root.into();
		fs::create_dir_all(&root)?;
		Ok(Self { root })
	}

	/// Open an existing container.
	pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
		let root = root.into();
		if !root.is_dir() {
			return Err(VoxelError::MissingGroup {
				path: root.display().to_string(),
			});
		}
		Ok(Self { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn group_dir(&self, path: &str) -> PathBuf {
		let path = normalize(path);
		if path.is_empty() {
			self.root.clone()
		} else {
			self.root.join(path)
		}
	}

	fn dataset_file(&self, path: &str) -> PathBuf {
		let mut file = self.group_dir(path).into_os_string();
		file.push(".");
		file.push(DATASET_EXT);
		PathBuf::from(file)
	}

	fn require_group(&self, path: &str) -> Result<()> {
		if self.has_group(path) {
			Ok(())
		} else {
			Err(VoxelError::MissingGroup {
				path: normalize(path).to_string(),
			})
		}
	}
}

impl Container for DirContainer {
	fn has_group(&self, path: &str) -> bool {
		self.group_dir(path).is_dir()
	}

	fn create_group(&mut self, path: &str) -> Result<()> {
		self.require_group(parent_of(path))?;
		match fs::create_dir(self.group_dir(path)) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(VoxelError::OutputWriteConflict {
				path: normalize(path).to_string(),
			}),
			Err(e) => Err(e.into()),
		}
	}

	fn list_groups(&self, path: &str) -> Result<Vec<String>> {
		self.require_group(path)?;
		let mut names = Vec::new();
		for entry in fs::read_dir(self.group_dir(path))? {
			let entry = entry?;
			if entry.file_type()?.is_dir() {
				if let Some(name) = entry.file_name().to_str() {
					names.push(name.to_string());
				}
			}
		}
		names.sort();
		Ok(names)
	}

	fn remove_group(&mut self, path: &str) -> Result<()> {
		if normalize(path).is_empty() {
			return Err(VoxelError::InvalidConfig("the root group cannot be removed".into()));
		}
		self.require_group(path)?;
		fs::remove_dir_all(self.group_dir(path))?;
		Ok(())
	}

	fn write_dataset(&mut self, path: &str, data: &[f64]) -> Result<()> {
		self.require_group(parent_of(path))?;
		let file = match OpenOptions::new()
			.write(true)
			.create_new(true)
			.open(self.dataset_file(path))
		{
			Ok(file) => file,
			Err(e) if e.kind() == ErrorKind::AlreadyExists => {
				return Err(VoxelError::OutputWriteConflict {
					path: normalize(path).to_string(),
				});
			}
			Err(e) => return Err(e.into()),
		};
		let mut writer = BufWriter::new(file);
		for &value in data {
			writer.write_f64::<LittleEndian>(value)?;
		}
		writer.flush()?;
		Ok(())
	}

	fn read_dataset(&self, path: &str) -> Result<Option<Vec<f64>>> {
		let mut file = match File::open(self.dataset_file(path)) {
			Ok(file) => file,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		let mut bytes = Vec::new();
		file.read_to_end(&mut bytes)?;
		if bytes.len() % 8 != 0 {
			return Err(io::Error::new(
				ErrorKind::InvalidData,
				format!("dataset `{}` is not a whole number of f64 values", path),
			)
			.into());
		}
		let mut values = vec![0.0; bytes.len() / 8];
		LittleEndian::read_f64_into(&bytes, &mut values);
		Ok(Some(values))
	}

	fn dataset_len(&self, path: &str) -> Result<Option<usize>> {
		match fs::metadata(self.dataset_file(path)) {
			Ok(meta) => Ok(Some(meta.len() as usize / 8)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	fn attributes(&self, path: &str) -> Result<Attributes> {
		self.require_group(path)?;
		match fs::read_to_string(self.group_dir(path).join(ATTRS_FILE)) {
			Ok(text) => Ok(serde_json::from_str(&text)?),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(Attributes::new()),
			Err(e) => Err(e.into()),
		}
	}

	fn set_attribute(&mut self, path: &str, name: &str, value: f64) -> Result<()> {
		let mut attrs = self.attributes(path)?;
		attrs.insert(name.to_string(), value);
		let text = serde_json::to_string_pretty(&attrs)?;
		fs::write(self.group_dir(path).join(ATTRS_FILE), text)?;
		Ok(())
	}
}

/// In-memory container with the same semantics as `DirContainer`.
#[derive(Debug, Clone, Default)]
pub struct MemContainer {
	groups: BTreeSet<String>,
	datasets: BTreeMap<String, Vec<f64>>,
	attrs: BTreeMap<String, Attributes>,
}

impl MemContainer {
	pub fn new() -> Self {
		Self::default()
	}

	fn require_group(&self, path: &str) -> Result<()> {
		if self.has_group(path) {
			Ok(())
		} else {
			Err(VoxelError::MissingGroup {
				path: normalize(path).to_string(),
			})
		}
	}
}

fn is_below(candidate: &str, group: &str) -> bool {
	candidate == group
		|| candidate
			.strip_prefix(group)
			.is_some_and(|rest| rest.starts_with('/'))
}

impl Container for MemContainer {
	fn has_group(&self, path: &str) -> bool {
		let path = normalize(path);
		path.is_empty() || self.groups.contains(path)
	}

	fn create_group(&mut self, path: &str) -> Result<()> {
		self.require_group(parent_of(path))?;
		let path = normalize(path);
		if !self.groups.insert(path.to_string()) {
			return Err(VoxelError::OutputWriteConflict { path: path.to_string() });
		}
		Ok(())
	}

	fn list_groups(&self, path: &str) -> Result<Vec<String>> {
		self.require_group(path)?;
		let path = normalize(path);
		Ok(self
			.groups
			.iter()
			.filter(|g| parent_of(g) == path)
			.map(|g| g.rsplit('/').next().unwrap_or(g).to_string())
			.collect())
	}

	fn remove_group(&mut self, path: &str) -> Result<()> {
		let path = normalize(path);
		if path.is_empty() {
			return Err(VoxelError::InvalidConfig("the root group cannot be removed".into()));
		}
		self.require_group(path)?;
		self.groups.retain(|g| !is_below(g, path));
		self.datasets.retain(|d, _| !is_below(parent_of(d), path));
		self.attrs.retain(|g, _| !is_below(g, path));
		Ok(())
	}

	fn write_dataset(&mut self, path: &str, data: &[f64]) -> Result<()> {
		self.require_group(parent_of(path))?;
		let path = normalize(path);
		if self.datasets.contains_key(path) {
			return Err(VoxelError::OutputWriteConflict { path: path.to_string() });
		}
		self.datasets.insert(path.to_string(), data.to_vec());
		Ok(())
	}

	fn read_dataset(&self, path: &str) -> Result<Option<Vec<f64>>> {
		Ok(self.datasets.get(normalize(path)).cloned())
	}

	fn dataset_len(&self, path: &str) -> Result<Option<usize>> {
		Ok(self.datasets.get(normalize(path)).map(Vec::len))
	}

	fn attributes(&self, path: &str) -> Result<Attributes> {
		self.require_group(path)?;
		Ok(self.attrs.get(normalize(path)).cloned().unwrap_or_default())
	}

	fn set_attribute(&mut self, path: &str, name: &str, value: f64) -> Result<()> {
		self.require_group(path)?;
		self.attrs
			.entry(normalize(path).to_string())
			.or_default()
			.insert(name.to_string(), value);
		Ok(())
	}
}
