/// Minor version assumed when the caller does not provide one
pub const DEFAULT_MINOR_VERSION: u16 = 5;

/// Minor version conventionally used by legacy files
pub const LEGACY_MINOR_VERSION: u16 = 5;

/// Byte width of a single skin weight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightWidth {
	Byte,
	Word,
}

/// The (major, minor) pair that selects between the historical SCW layouts.
///
/// The major version travels in the `HEAD` chunk; the minor version is not stored anywhere in
/// the file and has to be known by whoever hands the bytes over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchemaVersion {
	pub major: u16,
	pub minor: u16,
}

impl SchemaVersion {
	pub const CURRENT: SchemaVersion = SchemaVersion {
		major: 2,
		minor: 0,
	};

	pub const fn new(major: u16, minor: u16) -> SchemaVersion {
		SchemaVersion {
			major: major,
			minor: minor,
		}
	}

	/// Geometry carries an unused 4x4 matrix right after its group name
	pub const fn has_legacy_matrix(&self) -> bool {
		self.major <= 1
	}

	pub const fn weight_width(&self) -> WeightWidth {
		if self.major == 0 && self.minor != 5 {
			WeightWidth::Byte
		} else {
			WeightWidth::Word
		}
	}

	/// Materials carry one more string between the lightmaps and the shader config
	pub const fn has_material_extra(&self) -> bool {
		self.major >= 2
	}

	pub const fn is_legacy(&self) -> bool {
		self.major < 2
	}
}
