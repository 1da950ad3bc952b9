pub mod camera;
pub mod geometry;
pub mod header;
#[cfg(feature = "json")]
pub mod json;
pub mod material;
pub mod migrate;
pub mod node;
pub mod reader;
pub mod scw;
pub mod version;

pub use scw::ScwFile;
pub use version::{
	DEFAULT_MINOR_VERSION,
	SchemaVersion
};

#[cfg(feature = "export")]
use scw::export::ScwExportError;
#[cfg(feature = "import")]
use scw::import::ScwImportError;

/// Decodes an SCW document, assuming the minor version used by most files in circulation
#[cfg(feature = "import")]
pub fn decode_binary(data: &[u8]) -> Result<ScwFile, ScwImportError> {
	decode_binary_with(data, DEFAULT_MINOR_VERSION)
}

#[cfg(feature = "import")]
pub fn decode_binary_with(data: &[u8], minor_version: u16) -> Result<ScwFile, ScwImportError> {
	scw::import::scw(data, minor_version)
}

/// Encodes a document. Nothing is returned unless every chunk encoded.
#[cfg(feature = "export")]
pub fn encode_binary(file: &ScwFile) -> Result<Vec<u8>, ScwExportError> {
	let mut out = vec![];
	scw::export::scw(file, &mut out)?;

	Ok(out)
}

/// Returns a copy of `file` migrated to the given schema version
pub fn migrate_version(file: &ScwFile, major: u16, minor: u16) -> ScwFile {
	let mut out = file.clone();
	out.migrate(SchemaVersion::new(major, minor));
	out
}

#[cfg(all(test, feature = "import", feature = "export"))]
mod tests {
	use super::*;

	#[test]
	fn test_boundary() {
		let file = scw::sample();
		let data = encode_binary(&file).unwrap();

		// The sample is a major 2 file, where the minor version does not change the layout
		let decoded = decode_binary(&data).unwrap();
		assert_eq!(decoded.minor_version, DEFAULT_MINOR_VERSION);
		assert_eq!(decoded.nodes, file.nodes);
		assert_eq!(decode_binary_with(&data, file.minor_version).unwrap(), file);
	}

	#[test]
	fn test_migrate_version() {
		let file = scw::sample();
		let legacy = migrate_version(&file, 1, 5);
		assert_eq!(legacy.geometries[0].sources[0].name, "VERTEX");
		assert_eq!(file.geometries[0].sources[0].name, "POSITION");

		let back = migrate_version(&legacy, 2, 0);
		assert_eq!(back, file);
	}

	#[test]
	fn test_weight_layout_by_minor() {
		let mut file = scw::sample();
		file.header.version = 0;
		file.geometries[0].weights.iter_mut().for_each(|w| w.weights = [200, 55, 0, 0]);

		let narrow = {
			let mut f = file.clone();
			f.minor_version = 3;
			encode_binary(&f).unwrap()
		};
		let wide = {
			let mut f = file.clone();
			f.minor_version = 5;
			encode_binary(&f).unwrap()
		};

		// Major 0 carries the legacy matrix and, below minor 5, one-byte weights
		let nweights = file.geometries[0].weights.len();
		assert_eq!(wide.len() - narrow.len(), nweights * 4);

		let decoded = decode_binary_with(&narrow, 3).unwrap();
		assert_eq!(decoded.geometries[0].weights, file.geometries[0].weights);
		assert_eq!(decoded.geometries[0].legacy_matrix, Some(ultraviolet::mat::Mat4::identity()));
	}
}
