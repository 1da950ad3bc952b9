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

#[cfg(feature = "export")]
use crate::scw::export::ScwExportError;
#[cfg(feature = "import")]
use crate::scw::import::ScwImportError;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Camera {
	pub name: String,
	pub yfov: f32,
	pub xfov: f32,
	pub aspect_ratio: f32,
	pub near: f32,
	pub far: f32,
}

impl Camera {
	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<Camera, ScwImportError>
	where
		R: ReadBytesExt + ReadBinExt,
	{
		Ok(Camera {
			name: buf.read_utf()?,
			yfov: buf.read_f32::<BE>()?,
			xfov: buf.read_f32::<BE>()?,
			aspect_ratio: buf.read_f32::<BE>()?,
			near: buf.read_f32::<BE>()?,
			far: buf.read_f32::<BE>()?,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt + WriteBinExt,
	{
		buf.write_utf(&self.name)?;
		buf.write_f32::<BE>(self.yfov)?;
		buf.write_f32::<BE>(self.xfov)?;
		buf.write_f32::<BE>(self.aspect_ratio)?;
		buf.write_f32::<BE>(self.near)?;
		buf.write_f32::<BE>(self.far)?;

		Ok(())
	}
}

#[cfg(all(test, feature = "import", feature = "export"))]
mod tests {
	use super::Camera;

	#[test]
	fn test_camera() {
		let cam = Camera {
			name: "Camera001".to_string(),
			yfov: 0.6,
			xfov: 0.0,
			aspect_ratio: 1.777,
			near: 0.1,
			far: 5000.0,
		};

		let mut out = vec![];
		cam.write(&mut out).unwrap();
		assert_eq!(out.len(), 2 + 9 + 5 * 4);
		assert_eq!(Camera::read(&mut out.as_slice()).unwrap(), cam);
	}
}
