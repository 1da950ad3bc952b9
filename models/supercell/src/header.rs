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
use crate::{
	reader::Reader,
	scw::import::ScwImportError
};

/// Document metadata carried by the `HEAD` chunk
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Header {
	/// Major schema version
	pub version: u16,
	pub frame_rate: u16,
	pub first_frame: u16,
	pub last_frame: u16,
	pub materials_file: String,
	/// Trailing byte found in some files, `None` when the chunk ends after the materials file
	pub unknown: Option<u8>,
}

impl Header {
	/// Decodes the chunk payload. Whether the trailing byte exists is only known from the chunk
	/// length, so this reads from the cursor directly rather than any byte source.
	#[cfg(feature = "import")]
	pub fn read(buf: &mut Reader<'_>) -> Result<Header, ScwImportError> {
		let version = buf.read_u16::<BE>()?;
		let frame_rate = buf.read_u16::<BE>()?;
		let first_frame = buf.read_u16::<BE>()?;
		let last_frame = buf.read_u16::<BE>()?;
		let materials_file = buf.read_utf()?;

		let unknown = if buf.budget() >= 1 {
			Some(buf.read_u8()?)
		} else {
			None
		};

		Ok(Header {
			version: version,
			frame_rate: frame_rate,
			first_frame: first_frame,
			last_frame: last_frame,
			materials_file: materials_file,
			unknown: unknown,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt,
	{
		buf.write_u16::<BE>(self.version)?;
		buf.write_u16::<BE>(self.frame_rate)?;
		buf.write_u16::<BE>(self.first_frame)?;
		buf.write_u16::<BE>(self.last_frame)?;
		buf.write_utf(&self.materials_file)?;

		if let Some(unknown) = self.unknown {
			buf.write_u8(unknown)?;
		}

		Ok(())
	}
}
