use byteorder::{
	BE,
	ReadBytesExt,
	WriteBytesExt
};

use std::io::{
	Error,
	ErrorKind,
	Read,
	Result,
	Write
};

use ultraviolet::vec::{
	Vec3,
	Vec4
};

pub trait ReadBinExt: Read {
	/// Reads a fixed number of bytes as a string, as used for 4-character tags
	#[inline]
	fn read_chars(&mut self, length: usize) -> Result<String> {
		if length == 0 {
			return Ok(String::new());
		}

		let mut data = vec![0; length];
		self.read_exact(&mut data)?;

		String::from_utf8(data).map_err(|e| Error::new(ErrorKind::InvalidData, e))
	}

	/// Reads a string prefixed by its big endian 16-bit byte length
	#[inline]
	fn read_utf(&mut self) -> Result<String> {
		let length = self.read_u16::<BE>()?;
		self.read_chars(length as usize)
	}

	/// Reads a byte, treating any nonzero value as true
	#[inline]
	fn read_bool(&mut self) -> Result<bool> {
		Ok(self.read_u8()? != 0)
	}

	/// Reads a big endian 3D vector
	#[inline]
	fn read_vec3_be(&mut self) -> Result<Vec3> {
		let x = self.read_f32::<BE>()?;
		let y = self.read_f32::<BE>()?;
		let z = self.read_f32::<BE>()?;

		Ok(Vec3::new(x, y, z))
	}

	/// Reads a big endian 4D vector
	#[inline]
	fn read_vec4_be(&mut self) -> Result<Vec4> {
		let x = self.read_f32::<BE>()?;
		let y = self.read_f32::<BE>()?;
		let z = self.read_f32::<BE>()?;
		let w = self.read_f32::<BE>()?;

		Ok(Vec4::new(x, y, z, w))
	}
}

impl<R> ReadBinExt for R
where
	R: Read + ?Sized,
{
}

pub trait WriteBinExt: Write {
	/// Writes the raw bytes of a string with no length prefix
	#[inline]
	fn write_chars(&mut self, s: &str) -> Result<()> {
		self.write_all(s.as_bytes())
	}

	/// Writes a string prefixed by its big endian 16-bit byte length
	#[inline]
	fn write_utf(&mut self, s: &str) -> Result<()> {
		let length = u16::try_from(s.len()).map_err(|_| Error::new(ErrorKind::InvalidInput,
			format!("string of {} bytes does not fit a 16-bit length", s.len())))?;

		self.write_u16::<BE>(length)?;
		self.write_chars(s)
	}

	#[inline]
	fn write_bool(&mut self, b: bool) -> Result<()> {
		self.write_u8(b as u8)
	}

	/// Writes a big endian 3D vector
	#[inline]
	fn write_vec3_be(&mut self, v: Vec3) -> Result<()> {
		self.write_f32::<BE>(v.x)?;
		self.write_f32::<BE>(v.y)?;
		self.write_f32::<BE>(v.z)
	}

	/// Writes a big endian 4D vector
	#[inline]
	fn write_vec4_be(&mut self, v: Vec4) -> Result<()> {
		self.write_f32::<BE>(v.x)?;
		self.write_f32::<BE>(v.y)?;
		self.write_f32::<BE>(v.z)?;
		self.write_f32::<BE>(v.w)
	}
}

impl<W> WriteBinExt for W
where
	W: Write + ?Sized,
{
}

#[cfg(test)]
mod tests {
	use std::io::ErrorKind;

	use ultraviolet::vec::{
		Vec3,
		Vec4
	};

	use super::*;

	#[test]
	fn test_read_utf() {
		let mut data = &b"\x00\x04test123"[..];
		assert_eq!("test".to_string(), data.read_utf().unwrap());
		assert_eq!(data, &b"123"[..]);
	}

	#[test]
	fn test_read_utf_empty() {
		// A zero length must not consume anything past the prefix
		let mut data = &b"\x00\x00"[..];
		assert_eq!(String::new(), data.read_utf().unwrap());
		assert!(data.is_empty());
	}

	#[test]
	fn test_read_utf_short() {
		let mut data = &b"\x00\x08abc"[..];
		assert_eq!(data.read_utf().unwrap_err().kind(), ErrorKind::UnexpectedEof);
	}

	#[test]
	fn test_read_chars() {
		let mut data = &b"GEOMrest"[..];
		assert_eq!("GEOM".to_string(), data.read_chars(4).unwrap());
	}

	#[test]
	fn test_read_bool() {
		let mut data = &[0u8, 1, 0x80][..];
		assert!(!data.read_bool().unwrap());
		assert!(data.read_bool().unwrap());
		assert!(data.read_bool().unwrap());
	}

	#[test]
	fn test_read_vecs() {
		let mut vec3: &[u8] = &[0x3f, 0x80, 0, 0, 0xc0, 0, 0, 0, 0x3e, 0x80, 0, 0][..];
		let mut vec4: &[u8] = &[0x3f, 0x80, 0, 0, 0xc0, 0, 0, 0, 0x3e, 0x80, 0, 0, 0, 0, 0, 0][..];
		assert_eq!(Vec3::new(1.0, -2.0, 0.25), vec3.read_vec3_be().unwrap());
		assert_eq!(Vec4::new(1.0, -2.0, 0.25, 0.0), vec4.read_vec4_be().unwrap());
	}

	#[test]
	fn test_write_utf() {
		let mut out = vec![];
		out.write_utf("HEAD").unwrap();
		out.write_utf("").unwrap();
		assert_eq!(out, b"\x00\x04HEAD\x00\x00");
	}

	#[test]
	fn test_write_utf_too_long() {
		let mut out = vec![];
		let long = "x".repeat(u16::MAX as usize + 1);
		assert_eq!(out.write_utf(&long).unwrap_err().kind(), ErrorKind::InvalidInput);
		assert!(out.is_empty());
	}

	#[test]
	fn test_write_vecs() {
		let mut out = vec![];
		out.write_vec3_be(Vec3::new(1.0, -2.0, 0.25)).unwrap();
		out.write_vec4_be(Vec4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
		assert_eq!(&out[..12], &[0x3f, 0x80, 0, 0, 0xc0, 0, 0, 0, 0x3e, 0x80, 0, 0][..]);
		assert_eq!(&out[12..], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x3f, 0x80, 0, 0][..]);
	}
}
