#[cfg(feature = "json")]
use serde::{
	Deserialize,
	Serialize
};

use conv3d_core::tag4;

use crate::{
	camera::Camera,
	geometry::Geometry,
	header::Header,
	material::Material,
	node::Node,
	version::SchemaVersion
};

pub const MAGIC: u32 = tag4!(b"SC3D");

/// Chunk types understood by the container
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ChunkTag {
	Head = tag4!(b"HEAD"),
	Material = tag4!(b"MATE"),
	Geometry = tag4!(b"GEOM"),
	Camera = tag4!(b"CAME"),
	Node = tag4!(b"NODE"),
	End = tag4!(b"WEND"),
}

impl ChunkTag {
	pub fn from_u32(tag: u32) -> Option<ChunkTag> {
		[
			ChunkTag::Head,
			ChunkTag::Material,
			ChunkTag::Geometry,
			ChunkTag::Camera,
			ChunkTag::Node,
			ChunkTag::End,
		].into_iter().find(|t| *t as u32 == tag)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			ChunkTag::Head => "HEAD",
			ChunkTag::Material => "MATE",
			ChunkTag::Geometry => "GEOM",
			ChunkTag::Camera => "CAME",
			ChunkTag::Node => "NODE",
			ChunkTag::End => "WEND",
		}
	}
}

/// A decoded SCW document
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct ScwFile {
	pub header: Header,
	/// Minor schema version. It is not stored in the binary file, so it has to be supplied when
	/// decoding.
	pub minor_version: u16,
	pub materials: Vec<Material>,
	pub geometries: Vec<Geometry>,
	pub cameras: Vec<Camera>,
	pub nodes: Vec<Node>,
}

impl ScwFile {
	pub fn new(minor_version: u16) -> ScwFile {
		ScwFile {
			minor_version: minor_version,
			..ScwFile::default()
		}
	}

	/// Layout selector for the version-dependent chunk fields
	pub fn version(&self) -> SchemaVersion {
		SchemaVersion::new(self.header.version, self.minor_version)
	}

	#[cfg(feature = "import")]
	pub fn read(data: &[u8], minor_version: u16) -> Result<ScwFile, import::ScwImportError> {
		import::scw(data, minor_version)
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), export::ScwExportError>
	where
		W: byteorder::WriteBytesExt,
	{
		export::scw(self, buf)
	}
}

#[cfg(feature = "import")]
pub mod import {
	use byteorder::{
		BE,
		ReadBytesExt
	};

	use crc32fast::hash;

	use log::{
		debug,
		warn
	};

	use std::io;

	use thiserror::Error;

	use conv3d_core::tag4_str;

	use crate::{
		camera::Camera,
		geometry::Geometry,
		header::Header,
		material::Material,
		node::Node,
		reader::Reader
	};

	use super::{
		ChunkTag,
		MAGIC,
		ScwFile
	};

	#[derive(Debug, Error)]
	pub enum ScwImportError {
		#[error("I/O error")]
		IO {
			source: io::Error,
		},
		#[error("Unexpected end of buffer")]
		ShortBuffer,
		#[error("Not an SCW file: {}", tag4_str(*.0))]
		Magic(u32),
		#[error("Unsupported chunk type: {0}")]
		UnsupportedChunkType(String),
		#[error("Unsupported index width: {0}")]
		UnsupportedIndexWidth(u8),
		#[error("Unsupported node instance type: {0}")]
		UnsupportedInstanceType(String),
		#[error("Chunk {tag} was not decoded in full ({remaining} bytes left)")]
		ChunkBudget {
			tag: String,
			remaining: i64,
		},
	}

	impl From<io::Error> for ScwImportError {
		fn from(e: io::Error) -> Self {
			match e.kind() {
				io::ErrorKind::UnexpectedEof => ScwImportError::ShortBuffer,
				_ => ScwImportError::IO {
					source: e,
				},
			}
		}
	}

	/// Decodes a whole SCW document. `minor_version` selects between the layouts that share a
	/// major version.
	pub fn scw(data: &[u8], minor_version: u16) -> Result<ScwFile, ScwImportError> {
		let mut buf = Reader::new(data);

		let magic = buf.read_u32::<BE>()?;
		if magic != MAGIC {
			return Err(ScwImportError::Magic(magic));
		}

		let mut file = ScwFile::new(minor_version);

		loop {
			let length = buf.read_u32::<BE>()?;
			let start = buf.position();
			let tag = buf.read_u32::<BE>()?;
			buf.set_budget(length);

			let chunk = ChunkTag::from_u32(tag)
				.ok_or_else(|| ScwImportError::UnsupportedChunkType(tag4_str(tag)))?;

			debug!("{} chunk at {:#x}, {} bytes", chunk.as_str(), start, length);

			match chunk {
				ChunkTag::Head => file.header = Header::read(&mut buf)?,
				ChunkTag::Material => {
					let mat = Material::read(file.version(), &mut buf)?;
					file.materials.push(mat);
				},
				ChunkTag::Geometry => {
					let geom = Geometry::read(file.version(), &mut buf)?;
					file.geometries.push(geom);
				},
				ChunkTag::Camera => file.cameras.push(Camera::read(&mut buf)?),
				// A later NODE chunk replaces the scene graph of an earlier one
				ChunkTag::Node => {
					let n = buf.read_u16::<BE>()?;
					let mut nodes = Vec::with_capacity(n as usize);
					for _ in 0..n {
						nodes.push(Node::read(&mut buf)?);
					}
					file.nodes = nodes;
				},
				// Whatever length the terminator declares, it has no payload
				ChunkTag::End => buf.set_budget(0),
			}

			if buf.budget() != 0 {
				return Err(ScwImportError::ChunkBudget {
					tag: chunk.as_str().to_string(),
					remaining: buf.budget(),
				});
			}

			let crc = hash(buf.consumed_since(start));
			let stored = buf.read_u32::<BE>()?;
			if crc != stored {
				warn!("{} chunk at {:#x}: CRC32 mismatch (stored {:#010x}, computed {:#010x})",
					chunk.as_str(), start, stored, crc);
			}

			if chunk == ChunkTag::End {
				break;
			}
		}

		if buf.remaining() > 0 {
			warn!("{} trailing bytes after WEND", buf.remaining());
		}

		Ok(file)
	}
}

#[cfg(feature = "export")]
pub mod export {
	use byteorder::{
		BE,
		WriteBytesExt
	};

	use crc32fast::hash;

	use log::debug;

	use std::io;

	use thiserror::Error;

	use super::{
		ChunkTag,
		MAGIC,
		ScwFile
	};

	#[derive(Debug, Error)]
	pub enum ScwExportError {
		#[error("I/O error")]
		IO {
			#[from]
			source: io::Error,
		},
		#[error("Too many {what} for the format: {count}")]
		Count {
			what: &'static str,
			count: usize,
		},
		#[error("Index array {name} holds {actual} indices, expected {expected}")]
		IndexCount {
			name: String,
			expected: usize,
			actual: usize,
		},
		#[error("Index {index} does not fit in {width} bytes")]
		IndexRange {
			index: u32,
			width: u8,
		},
		#[error("Source {name} holds {len} samples, not a multiple of stride {stride}")]
		SampleCount {
			name: String,
			len: usize,
			stride: u8,
		},
		#[error("Skin weight {0} does not fit in one byte")]
		WeightRange(u16),
	}

	/// Narrows a collection length to the integer type used to store it
	pub fn count<T>(what: &'static str, n: usize) -> Result<T, ScwExportError>
	where
		T: TryFrom<usize>,
	{
		T::try_from(n).map_err(|_| ScwExportError::Count {
			what: what,
			count: n,
		})
	}

	/// Frames one chunk: length, tag, payload and the CRC32 of tag and payload
	fn chunk<W, F>(tag: ChunkTag, buf: &mut W, encode: F) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt,
		F: FnOnce(&mut Vec<u8>) -> Result<(), ScwExportError>,
	{
		let mut scratch = vec![];
		scratch.write_u32::<BE>(tag as u32)?;
		encode(&mut scratch)?;

		let length = scratch.len() - 4;
		debug!("{} chunk, {} bytes", tag.as_str(), length);

		buf.write_u32::<BE>(count("chunk bytes", length)?)?;
		buf.write_all(&scratch)?;
		buf.write_u32::<BE>(hash(&scratch))?;

		Ok(())
	}

	/// Encodes a whole SCW document. Chunks are always emitted in the same order.
	pub fn scw<W>(file: &ScwFile, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt,
	{
		let version = file.version();

		buf.write_u32::<BE>(MAGIC)?;

		chunk(ChunkTag::Head, buf, |out| file.header.write(out))?;

		for mat in file.materials.iter() {
			chunk(ChunkTag::Material, buf, |out| mat.write(version, out))?;
		}

		for cam in file.cameras.iter() {
			chunk(ChunkTag::Camera, buf, |out| cam.write(out))?;
		}

		for geom in file.geometries.iter() {
			chunk(ChunkTag::Geometry, buf, |out| geom.write(version, out))?;
		}

		chunk(ChunkTag::Node, buf, |out| {
			out.write_u16::<BE>(count("nodes", file.nodes.len())?)?;
			for node in file.nodes.iter() {
				node.write(out)?;
			}

			Ok(())
		})?;

		chunk(ChunkTag::End, buf, |_| Ok(()))
	}
}

#[cfg(test)]
pub(crate) fn sample() -> ScwFile {
	use ultraviolet::{
		mat::Mat4,
		vec::{
			Vec3,
			Vec4
		}
	};

	use crate::{
		geometry::{
			IndexArray,
			IndexWidth,
			Joint,
			SourceArray,
			Weight
		},
		material::Variable,
		node::{
			InstanceKind,
			InstanceMaterial,
			KeyFrame,
			NodeInstance,
			ROTATION_SCALE
		}
	};

	let mut geom = Geometry::new("barbarian_geo", "");
	geom.sources.push(SourceArray {
		name: "POSITION".to_string(),
		index: 0,
		source_index: 0,
		stride: 3,
		scale: 0.5,
		data: vec![0.0, 1.5, -2.0, 10.0, 0.5, 3.0, -7.5, 0.0, 1.0],
	});
	geom.bind_matrix = Some(Mat4::identity());
	geom.joints.push(Joint {
		name: "root".to_string(),
		inverse_bind: Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
	});
	geom.weights = vec![Weight {
		joints: [0, 0, 0, 0],
		weights: [0xffff, 0, 0, 0],
	}; 3];
	geom.materials.push(IndexArray {
		name: "barbarian_mat".to_string(),
		triangle_count: 1,
		inputs_count: 1,
		width: IndexWidth::Byte,
		indices: vec![0, 1, 2],
	});

	let rotation = Vec4::new(0.0, 0.0, 0.0, 32512.0 * ROTATION_SCALE);
	let frames = (0..2).map(|i| KeyFrame {
		id: i,
		rotation: rotation,
		translation: Vec3::new(0.0, 2.0, 0.0),
		scale: Vec3::one(),
	}).collect();

	ScwFile {
		header: Header {
			version: 2,
			frame_rate: 30,
			first_frame: 0,
			last_frame: 1,
			materials_file: "sc3d/character_materials.scw".to_string(),
			unknown: Some(0),
		},
		minor_version: 0,
		materials: vec![Material {
			name: "barbarian_mat".to_string(),
			shader_file: "shader/uber.vertex".to_string(),
			diffuse: Variable::Texture("barbarian_tex.ktx".to_string()),
			opacity: 1.0,
			shader_config: 0x8000,
			stencil_scale_offset: [1.0, 1.0, 0.0, 0.0],
			..Material::default()
		}],
		geometries: vec![geom],
		cameras: vec![Camera {
			name: "Camera001".to_string(),
			yfov: 0.5,
			xfov: 0.0,
			aspect_ratio: 1.5,
			near: 0.25,
			far: 1000.0,
		}],
		nodes: vec![
			Node {
				name: "barbarian".to_string(),
				parent: String::new(),
				instances: vec![NodeInstance {
					target: "barbarian_geo".to_string(),
					kind: InstanceKind::Geometry(vec![InstanceMaterial {
						name: "barbarian_mat".to_string(),
						target: "barbarian_mat".to_string(),
					}]),
				}],
				frames: frames,
				frames_flags: 0x7f,
			},
			Node {
				name: "Camera001".to_string(),
				parent: "barbarian".to_string(),
				instances: vec![NodeInstance {
					target: "Camera001".to_string(),
					kind: InstanceKind::Camera("Camera001".to_string()),
				}],
				frames: vec![],
				frames_flags: 0,
			},
		],
	}
}
