#[cfg(feature = "io_ext")]
pub mod io_ext;

/// Converts a 4-byte string into a 32-bit big endian integer.
/// Byte strings longer than 4 bytes are truncated.
#[macro_export]
macro_rules! tag4 {
	($b4: literal) => {
		u32::from_be_bytes([$b4[0], $b4[1], $b4[2], $b4[3]])
	}
}

/// Renders a big endian tag back into its characters, for diagnostics.
/// Non-printable bytes are escaped.
pub fn tag4_str(tag: u32) -> String {
	tag.to_be_bytes().iter().map(|b| (*b as char).escape_default().to_string()).collect()
}
