use byteorder::{
	BE,
	ReadBytesExt,
	WriteBytesExt
};

use log::trace;

#[cfg(feature = "json")]
use serde::{
	Deserialize,
	Serialize
};

use std::io;

use ultraviolet::mat::Mat4;

use conv3d_core::io_ext::{
	ReadBinExt,
	WriteBinExt
};

use crate::version::{
	SchemaVersion,
	WeightWidth
};

#[cfg(feature = "export")]
use crate::scw::export::{
	count,
	ScwExportError
};
#[cfg(feature = "import")]
use crate::scw::import::ScwImportError;

/// Name of the position stream in current files
pub const SOURCE_POSITION: &str = "POSITION";
/// Name of the position stream in legacy files
pub const SOURCE_VERTEX: &str = "VERTEX";

/// Reads a matrix stored row by row on the wire
#[cfg(feature = "import")]
pub fn read_matrix<R>(buf: &mut R) -> io::Result<Mat4>
where
	R: ReadBytesExt + ReadBinExt,
{
	let r0 = buf.read_vec4_be()?;
	let r1 = buf.read_vec4_be()?;
	let r2 = buf.read_vec4_be()?;
	let r3 = buf.read_vec4_be()?;

	Ok(Mat4::new(r0, r1, r2, r3).transposed())
}

/// Writes a matrix row by row. The matrix itself is left untouched.
#[cfg(feature = "export")]
pub fn write_matrix<W>(m: &Mat4, buf: &mut W) -> io::Result<()>
where
	W: WriteBytesExt + WriteBinExt,
{
	let wire = m.transposed();
	for row in wire.cols.iter() {
		buf.write_vec4_be(*row)?;
	}

	Ok(())
}

/// One vertex attribute stream, stored as 16-bit samples scaled by `scale`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct SourceArray {
	pub name: String,
	pub index: u8,
	pub source_index: u8,
	/// Samples per element
	pub stride: u8,
	pub scale: f32,
	pub data: Vec<f64>,
}

impl SourceArray {
	/// Number of elements described by the samples
	pub fn element_count(&self) -> usize {
		match self.stride {
			0 => 0,
			stride => self.data.len() / stride as usize,
		}
	}

	/// Converts a sample to its stored 16-bit form. Values that were produced by decoding
	/// convert back exactly; anything else is truncated towards zero.
	pub fn quantize(&self, value: f64) -> i16 {
		// Every sample of a zero scale decodes to zero, so the raw value is gone
		if self.scale == 0.0 {
			return 0;
		}

		let q = value / self.scale as f64;
		let nearest = q.round();

		// The division may land a rounding error away from the integer a sample decoded from
		if (q - nearest).abs() < 1e-6 {
			nearest as i16
		} else {
			q as i16
		}
	}

	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<SourceArray, ScwImportError>
	where
		R: ReadBytesExt + ReadBinExt,
	{
		let name = buf.read_utf()?;
		let index = buf.read_u8()?;
		let source_index = buf.read_u8()?;
		let stride = buf.read_u8()?;
		let scale = buf.read_f32::<BE>()?;
		let elements = buf.read_u32::<BE>()? as usize;

		let samples = elements * stride as usize;
		let mut data = Vec::with_capacity(samples.min(buf_hint()));
		for _ in 0..samples {
			data.push(buf.read_i16::<BE>()? as f64 * scale as f64);
		}

		trace!("source {} ({} x {})", name, elements, stride);

		Ok(SourceArray {
			name: name,
			index: index,
			source_index: source_index,
			stride: stride,
			scale: scale,
			data: data,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt + WriteBinExt,
	{
		let stride = self.stride as usize;
		if (stride == 0 && !self.data.is_empty()) || (stride != 0 && self.data.len() % stride != 0) {
			return Err(ScwExportError::SampleCount {
				name: self.name.clone(),
				len: self.data.len(),
				stride: self.stride,
			});
		}

		buf.write_utf(&self.name)?;
		buf.write_u8(self.index)?;
		buf.write_u8(self.source_index)?;
		buf.write_u8(self.stride)?;
		buf.write_f32::<BE>(self.scale)?;
		buf.write_u32::<BE>(count("source elements", self.element_count())?)?;

		for v in self.data.iter() {
			buf.write_i16::<BE>(self.quantize(*v))?;
		}

		Ok(())
	}
}

/// Width of the entries in an index buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(try_from = "u8", into = "u8"))]
#[repr(u8)]
pub enum IndexWidth {
	Byte = 1,
	Short = 2,
	Int = 4,
}

impl IndexWidth {
	/// Largest index representable at this width
	pub fn max_index(&self) -> u32 {
		match self {
			IndexWidth::Byte => u8::MAX as u32,
			IndexWidth::Short => u16::MAX as u32,
			IndexWidth::Int => u32::MAX,
		}
	}
}

impl TryFrom<u8> for IndexWidth {
	type Error = u8;

	fn try_from(width: u8) -> Result<Self, Self::Error> {
		match width {
			1 => Ok(IndexWidth::Byte),
			2 => Ok(IndexWidth::Short),
			4 => Ok(IndexWidth::Int),
			_ => Err(width),
		}
	}
}

impl From<IndexWidth> for u8 {
	fn from(width: IndexWidth) -> u8 {
		width as u8
	}
}

/// Triangle indices bound to one material
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct IndexArray {
	/// Material name
	pub name: String,
	pub triangle_count: u32,
	/// Indices per triangle corner, one per interleaved input
	pub inputs_count: u8,
	pub width: IndexWidth,
	/// `3 * triangle_count * inputs_count` entries
	pub indices: Vec<u32>,
}

impl IndexArray {
	pub fn expected_len(&self) -> usize {
		3 * self.triangle_count as usize * self.inputs_count as usize
	}

	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<IndexArray, ScwImportError>
	where
		R: ReadBytesExt + ReadBinExt,
	{
		let name = buf.read_utf()?;
		let triangle_count = buf.read_u32::<BE>()?;
		let inputs_count = buf.read_u8()?;
		let width = IndexWidth::try_from(buf.read_u8()?)
			.map_err(ScwImportError::UnsupportedIndexWidth)?;

		let total = 3 * triangle_count as usize * inputs_count as usize;
		let mut indices = Vec::with_capacity(total.min(buf_hint()));
		for _ in 0..total {
			indices.push(match width {
				IndexWidth::Byte => buf.read_u8()? as u32,
				IndexWidth::Short => buf.read_u16::<BE>()? as u32,
				IndexWidth::Int => buf.read_u32::<BE>()?,
			});
		}

		Ok(IndexArray {
			name: name,
			triangle_count: triangle_count,
			inputs_count: inputs_count,
			width: width,
			indices: indices,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt + WriteBinExt,
	{
		if self.indices.len() != self.expected_len() {
			return Err(ScwExportError::IndexCount {
				name: self.name.clone(),
				expected: self.expected_len(),
				actual: self.indices.len(),
			});
		}

		buf.write_utf(&self.name)?;
		buf.write_u32::<BE>(self.triangle_count)?;
		buf.write_u8(self.inputs_count)?;
		buf.write_u8(self.width.into())?;

		for index in self.indices.iter().copied() {
			if index > self.width.max_index() {
				return Err(ScwExportError::IndexRange {
					index: index,
					width: self.width.into(),
				});
			}

			match self.width {
				IndexWidth::Byte => buf.write_u8(index as u8)?,
				IndexWidth::Short => buf.write_u16::<BE>(index as u16)?,
				IndexWidth::Int => buf.write_u32::<BE>(index)?,
			}
		}

		Ok(())
	}
}

/// Skin binding of one vertex to up to four joints
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Weight {
	pub joints: [u8; 4],
	pub weights: [u16; 4],
}

impl Weight {
	#[cfg(feature = "import")]
	pub fn read<R>(width: WeightWidth, buf: &mut R) -> Result<Weight, ScwImportError>
	where
		R: ReadBytesExt,
	{
		let mut w = Weight::default();
		buf.read_exact(&mut w.joints)?;

		for v in w.weights.iter_mut() {
			*v = match width {
				WeightWidth::Byte => buf.read_u8()? as u16,
				WeightWidth::Word => buf.read_u16::<BE>()?,
			};
		}

		Ok(w)
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, width: WeightWidth, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt,
	{
		buf.write_all(&self.joints)?;

		for v in self.weights.iter().copied() {
			match width {
				WeightWidth::Byte => {
					let b = u8::try_from(v).map_err(|_| ScwExportError::WeightRange(v))?;
					buf.write_u8(b)?;
				},
				WeightWidth::Word => buf.write_u16::<BE>(v)?,
			}
		}

		Ok(())
	}
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Joint {
	pub name: String,
	pub inverse_bind: Mat4,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Geometry {
	pub name: String,
	pub group: String,
	/// Unused transform only stored by major versions 0 and 1
	pub legacy_matrix: Option<Mat4>,
	pub sources: Vec<SourceArray>,
	pub bind_matrix: Option<Mat4>,
	pub joints: Vec<Joint>,
	pub weights: Vec<Weight>,
	pub materials: Vec<IndexArray>,
}

impl Geometry {
	pub fn new(name: &str, group: &str) -> Geometry {
		Geometry {
			name: name.to_string(),
			group: group.to_string(),
			legacy_matrix: None,
			sources: vec![],
			bind_matrix: None,
			joints: vec![],
			weights: vec![],
			materials: vec![],
		}
	}

	#[cfg(feature = "import")]
	pub fn read<R>(version: SchemaVersion, buf: &mut R) -> Result<Geometry, ScwImportError>
	where
		R: ReadBytesExt + ReadBinExt,
	{
		let mut geom = Geometry::new(&buf.read_utf()?, &buf.read_utf()?);

		if version.has_legacy_matrix() {
			geom.legacy_matrix = Some(read_matrix(buf)?);
		}

		let nsources = buf.read_u8()?;
		for _ in 0..nsources {
			geom.sources.push(SourceArray::read(buf)?);
		}

		if buf.read_bool()? {
			geom.bind_matrix = Some(read_matrix(buf)?);
		}

		let njoints = buf.read_u8()?;
		for _ in 0..njoints {
			geom.joints.push(Joint {
				name: buf.read_utf()?,
				inverse_bind: read_matrix(buf)?,
			});
		}

		let nweights = buf.read_u32::<BE>()? as usize;
		let width = version.weight_width();
		geom.weights.reserve(nweights.min(buf_hint()));
		for _ in 0..nweights {
			geom.weights.push(Weight::read(width, buf)?);
		}

		let nmaterials = buf.read_u8()?;
		for _ in 0..nmaterials {
			geom.materials.push(IndexArray::read(buf)?);
		}

		trace!("geometry {}: {} sources, {} joints, {} weights, {} index arrays", geom.name,
			geom.sources.len(), geom.joints.len(), geom.weights.len(), geom.materials.len());

		Ok(geom)
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, version: SchemaVersion, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt + WriteBinExt,
	{
		buf.write_utf(&self.name)?;
		buf.write_utf(&self.group)?;

		if version.has_legacy_matrix() {
			write_matrix(&self.legacy_matrix.unwrap_or_else(Mat4::identity), buf)?;
		}

		buf.write_u8(count("vertex sources", self.sources.len())?)?;
		for source in self.sources.iter() {
			source.write(buf)?;
		}

		buf.write_bool(self.bind_matrix.is_some())?;
		if let Some(m) = &self.bind_matrix {
			write_matrix(m, buf)?;
		}

		buf.write_u8(count("joints", self.joints.len())?)?;
		for joint in self.joints.iter() {
			buf.write_utf(&joint.name)?;
			write_matrix(&joint.inverse_bind, buf)?;
		}

		let width = version.weight_width();
		buf.write_u32::<BE>(count("skin weights", self.weights.len())?)?;
		for weight in self.weights.iter() {
			weight.write(width, buf)?;
		}

		buf.write_u8(count("index arrays", self.materials.len())?)?;
		for material in self.materials.iter() {
			material.write(buf)?;
		}

		Ok(())
	}
}

/// Caps up-front allocations driven by counts read from the file
#[cfg(feature = "import")]
const fn buf_hint() -> usize {
	1 << 16
}
