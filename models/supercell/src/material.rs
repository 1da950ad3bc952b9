use byteorder::{
	BE,
	ReadBytesExt,
	WriteBytesExt
};

#[cfg(feature = "json")]
use serde::{
	Deserialize,
	Serialize
};

use conv3d_core::io_ext::{
	ReadBinExt,
	WriteBinExt
};

use crate::version::SchemaVersion;

#[cfg(feature = "export")]
use crate::scw::export::ScwExportError;
#[cfg(feature = "import")]
use crate::scw::import::ScwImportError;

/// Shader config bit announcing the four stencil scale/offset floats
pub const SHADER_STENCIL_SCALE_OFFSET: u32 = 0x8000;

pub type Rgba = [u8; 4];

/// A material channel, either sampled from a texture or a flat color
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum Variable {
	Texture(String),
	Color(Rgba),
}

impl Default for Variable {
	fn default() -> Self {
		Variable::Color([0; 4])
	}
}

impl Variable {
	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<Variable, ScwImportError>
	where
		R: ReadBytesExt + ReadBinExt,
	{
		if buf.read_bool()? {
			Ok(Variable::Texture(buf.read_utf()?))
		} else {
			let mut color = [0; 4];
			buf.read_exact(&mut color)?;

			Ok(Variable::Color(color))
		}
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt + WriteBinExt,
	{
		match self {
			Variable::Texture(name) => {
				buf.write_bool(true)?;
				buf.write_utf(name)?;
			},
			Variable::Color(color) => {
				buf.write_bool(false)?;
				buf.write_all(color)?;
			},
		}

		Ok(())
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Material {
	pub name: String,
	pub shader_file: String,
	pub blend_mode: u8,
	pub ambient: Variable,
	pub diffuse: Variable,
	pub specular: Variable,
	pub stencil_texture: String,
	pub normal_texture: String,
	pub colorize: Variable,
	pub emission: Variable,
	pub opacity_texture: String,
	pub opacity: f32,
	pub unknown: f32,
	pub lightmap_texture: String,
	pub lightmap_specular_texture: String,
	/// Only present from major version 2 on, empty otherwise
	pub extra: String,
	pub shader_config: u32,
	/// Only stored when `shader_config` has [`SHADER_STENCIL_SCALE_OFFSET`] set
	pub stencil_scale_offset: [f32; 4],
}

impl Material {
	pub fn has_stencil_scale_offset(&self) -> bool {
		self.shader_config & SHADER_STENCIL_SCALE_OFFSET != 0
	}

	#[cfg(feature = "import")]
	pub fn read<R>(version: SchemaVersion, buf: &mut R) -> Result<Material, ScwImportError>
	where
		R: ReadBytesExt + ReadBinExt,
	{
		let mut mat = Material {
			name: buf.read_utf()?,
			shader_file: buf.read_utf()?,
			blend_mode: buf.read_u8()?,
			ambient: Variable::read(buf)?,
			diffuse: Variable::read(buf)?,
			specular: Variable::read(buf)?,
			stencil_texture: buf.read_utf()?,
			normal_texture: buf.read_utf()?,
			colorize: Variable::read(buf)?,
			emission: Variable::read(buf)?,
			opacity_texture: buf.read_utf()?,
			opacity: buf.read_f32::<BE>()?,
			unknown: buf.read_f32::<BE>()?,
			lightmap_texture: buf.read_utf()?,
			lightmap_specular_texture: buf.read_utf()?,
			..Material::default()
		};

		if version.has_material_extra() {
			mat.extra = buf.read_utf()?;
		}

		mat.shader_config = buf.read_u32::<BE>()?;

		if mat.has_stencil_scale_offset() {
			for v in mat.stencil_scale_offset.iter_mut() {
				*v = buf.read_f32::<BE>()?;
			}
		}

		Ok(mat)
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, version: SchemaVersion, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt + WriteBinExt,
	{
		buf.write_utf(&self.name)?;
		buf.write_utf(&self.shader_file)?;
		buf.write_u8(self.blend_mode)?;

		self.ambient.write(buf)?;
		self.diffuse.write(buf)?;
		self.specular.write(buf)?;

		buf.write_utf(&self.stencil_texture)?;
		buf.write_utf(&self.normal_texture)?;

		self.colorize.write(buf)?;
		self.emission.write(buf)?;

		buf.write_utf(&self.opacity_texture)?;
		buf.write_f32::<BE>(self.opacity)?;
		buf.write_f32::<BE>(self.unknown)?;

		buf.write_utf(&self.lightmap_texture)?;
		buf.write_utf(&self.lightmap_specular_texture)?;

		if version.has_material_extra() {
			buf.write_utf(&self.extra)?;
		}

		buf.write_u32::<BE>(self.shader_config)?;

		if self.has_stencil_scale_offset() {
			for v in self.stencil_scale_offset.iter() {
				buf.write_f32::<BE>(*v)?;
			}
		}

		Ok(())
	}
}
