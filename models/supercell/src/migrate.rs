use log::debug;

use crate::{
	geometry::{
		SOURCE_POSITION,
		SOURCE_VERTEX
	},
	scw::ScwFile,
	version::SchemaVersion
};

/// The two on-disk schema generations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schema {
	/// Major versions 0 and 1, position streams named `VERTEX`
	Legacy,
	/// Major version 2 and later, position streams named `POSITION`
	Current,
}

impl Schema {
	pub fn of(version: SchemaVersion) -> Schema {
		if version.is_legacy() {
			Schema::Legacy
		} else {
			Schema::Current
		}
	}

	pub fn other(&self) -> Schema {
		match self {
			Schema::Legacy => Schema::Current,
			Schema::Current => Schema::Legacy,
		}
	}

	/// Name of the position stream under this schema
	pub fn position_source(&self) -> &'static str {
		match self {
			Schema::Legacy => SOURCE_VERTEX,
			Schema::Current => SOURCE_POSITION,
		}
	}
}

impl ScwFile {
	/// Rewrites the document in place so that it encodes under `target`.
	///
	/// Moving to the current schema adopts the target major and minor version. Moving to the
	/// legacy schema only adopts the minor version; the major version stays whatever the file
	/// had. Either way the header's trailing byte becomes explicit and position streams are
	/// renamed. Migrating twice to the same target changes nothing the second time.
	pub fn migrate(&mut self, target: SchemaVersion) {
		let schema = Schema::of(target);

		if schema == Schema::Current {
			self.header.version = target.major;
		}
		self.minor_version = target.minor;

		if self.header.unknown.is_none() {
			self.header.unknown = Some(0);
		}

		let from = schema.other().position_source();
		let to = schema.position_source();

		let mut renamed = 0;
		for source in self.geometries.iter_mut().flat_map(|g| g.sources.iter_mut()) {
			if source.name == from {
				source.name = to.to_string();
				renamed += 1;
			}
		}

		debug!("migrated to {:?} schema ({}.{}), {} position streams renamed", schema,
			self.header.version, self.minor_version, renamed);
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		geometry::{
			Geometry,
			SourceArray
		},
		scw::ScwFile,
		version::{
			LEGACY_MINOR_VERSION,
			SchemaVersion
		}
	};

	use super::Schema;

	fn source(name: &str) -> SourceArray {
		SourceArray {
			name: name.to_string(),
			index: 0,
			source_index: 0,
			stride: 2,
			scale: 1.0,
			data: vec![1.0, 2.0],
		}
	}

	fn file() -> ScwFile {
		let mut geom = Geometry::new("geo", "");
		geom.sources = vec![source("POSITION"), source("NORMAL"), source("TEXCOORD")];

		let mut file = ScwFile::new(0);
		file.header.version = 2;
		file.geometries = vec![geom.clone(), geom];
		file
	}

	fn names(file: &ScwFile) -> Vec<Vec<&str>> {
		file.geometries.iter()
			.map(|g| g.sources.iter().map(|s| s.name.as_str()).collect())
			.collect()
	}

	#[test]
	fn test_schema() {
		assert_eq!(Schema::of(SchemaVersion::new(0, 5)), Schema::Legacy);
		assert_eq!(Schema::of(SchemaVersion::new(1, 0)), Schema::Legacy);
		assert_eq!(Schema::of(SchemaVersion::CURRENT), Schema::Current);
		assert_eq!(Schema::Legacy.position_source(), "VERTEX");
		assert_eq!(Schema::Legacy.other().position_source(), "POSITION");
	}

	#[test]
	fn test_to_legacy_and_back() {
		let original = file();
		let mut f = original.clone();

		f.migrate(SchemaVersion::new(1, LEGACY_MINOR_VERSION));
		assert_eq!(f.minor_version, 5);
		assert_eq!(f.header.version, 2);
		assert_eq!(f.header.unknown, Some(0));
		assert_eq!(names(&f), vec![vec!["VERTEX", "NORMAL", "TEXCOORD"]; 2]);

		f.migrate(SchemaVersion::CURRENT);
		assert_eq!(f.minor_version, 0);
		assert_eq!(names(&f), names(&original));
		assert_eq!(f.geometries, original.geometries);
	}

	#[test]
	fn test_to_current() {
		let mut f = file();
		f.header.version = 1;
		f.minor_version = 5;
		f.geometries[0].sources[0].name = "VERTEX".to_string();
		f.header.unknown = Some(3);

		f.migrate(SchemaVersion::CURRENT);
		assert_eq!(f.version(), SchemaVersion::CURRENT);
		assert_eq!(f.header.unknown, Some(3));
		assert_eq!(names(&f)[0][0], "POSITION");
	}

	#[test]
	fn test_idempotent() {
		for target in [SchemaVersion::CURRENT, SchemaVersion::new(0, 5)] {
			let mut once = file();
			once.migrate(target);
			let mut twice = once.clone();
			twice.migrate(target);
			assert_eq!(once, twice);
		}
	}
}
