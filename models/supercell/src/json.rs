//! Structured mirror of a decoded document, for inspection and hand editing

use crate::scw::ScwFile;

/// Renders a document as indented JSON
pub fn to_json(file: &ScwFile) -> serde_json::Result<String> {
	serde_json::to_string_pretty(file)
}

pub fn from_json(input: &str) -> serde_json::Result<ScwFile> {
	serde_json::from_str(input)
}

#[cfg(all(test, feature = "import", feature = "export"))]
mod tests {
	use crate::{
		geometry::IndexWidth,
		scw::{
			sample,
			ScwFile
		}
	};

	use super::*;

	#[test]
	fn test_mirror_round_trip() {
		let file = sample();
		let text = to_json(&file).unwrap();
		assert!(text.contains("\"materials_file\": \"sc3d/character_materials.scw\""));

		let back = from_json(&text).unwrap();
		assert_eq!(back, file);

		let mut a = vec![];
		file.write(&mut a).unwrap();
		let mut b = vec![];
		back.write(&mut b).unwrap();
		assert_eq!(a, b);
		assert_eq!(ScwFile::read(&b, back.minor_version).unwrap(), file);
	}

	#[test]
	fn test_mirror_keeps_decoded_samples() {
		let mut file = sample();
		for (i, scale) in [0.1f32, 0.0001234, 1.0 / 3.0, 0.00763].into_iter().enumerate() {
			let source = &mut file.geometries[0].sources[0];
			source.scale = scale;
			source.data = (-4i16..5).map(|r| (r as i32 * 37 * (i as i32 + 1)) as i16)
				.map(|r| r as f64 * scale as f64)
				.collect();

			let back = from_json(&to_json(&file).unwrap()).unwrap();
			for (a, b) in back.geometries[0].sources[0].data.iter().zip(file.geometries[0].sources[0].data.iter()) {
				assert_eq!(a.to_bits(), b.to_bits(), "scale {}", scale);
			}
			assert_eq!(back, file);
		}
	}

	#[test]
	fn test_index_width_is_numeric() {
		let text = to_json(&sample()).unwrap();
		assert!(text.contains("\"width\": 1"));

		let bad = text.replace("\"width\": 1", "\"width\": 3");
		assert!(from_json(&bad).is_err());
		assert_eq!(u8::from(IndexWidth::Int), 4);
	}
}
