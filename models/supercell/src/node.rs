use bitflags::bitflags;

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

use ultraviolet::vec::{
	Vec3,
	Vec4
};

use conv3d_core::{
	io_ext::{
		ReadBinExt,
		WriteBinExt
	},
	tag4
};

#[cfg(feature = "export")]
use crate::scw::export::{
	count,
	ScwExportError
};
#[cfg(feature = "import")]
use crate::scw::import::ScwImportError;

pub const INSTANCE_GEOMETRY: u32 = tag4!(b"GEOM");
pub const INSTANCE_CONTAINER: u32 = tag4!(b"CONT");
pub const INSTANCE_CAMERA: u32 = tag4!(b"CAME");
pub const INSTANCE_LIGHT: u32 = tag4!(b"LIGH");

/// Step between two quantized rotation components
pub const ROTATION_SCALE: f32 = 0.000030758;

/// Absolute tolerance under which two animated values count as the same
pub const FRAME_TOLERANCE: f64 = 1e-9;

bitflags! {
	/// Properties of a key frame that are stored explicitly after the first frame.
	/// Clear bits are copied from the first frame on decode.
	pub struct KeyFrameFlags: u8 {
		const ROTATION = 1;
		const TRANSLATION_X = 1 << 1;
		const TRANSLATION_Y = 1 << 2;
		const TRANSLATION_Z = 1 << 3;
		const SCALE_X = 1 << 4;
		const SCALE_Y = 1 << 5;
		const SCALE_Z = 1 << 6;
	}
}

/// Computes the flag byte written ahead of a node's frames.
///
/// A bit is set when its property holds the same value in every frame. Nothing is set for a
/// node with fewer than two frames.
pub fn compute_frame_flags(frames: &[KeyFrame]) -> KeyFrameFlags {
	let (first, rest) = match frames.split_first() {
		Some((first, rest)) if !rest.is_empty() => (first, rest),
		_ => return KeyFrameFlags::empty(),
	};

	let constant = |get: fn(&KeyFrame) -> f32| {
		rest.iter().all(|f| (get(f) as f64 - get(first) as f64).abs() <= FRAME_TOLERANCE)
	};

	let mut flags = KeyFrameFlags::empty();

	if constant(|f| f.rotation.x) && constant(|f| f.rotation.y) && constant(|f| f.rotation.z)
		&& constant(|f| f.rotation.w) {
		flags |= KeyFrameFlags::ROTATION;
	}

	flags.set(KeyFrameFlags::TRANSLATION_X, constant(|f| f.translation.x));
	flags.set(KeyFrameFlags::TRANSLATION_Y, constant(|f| f.translation.y));
	flags.set(KeyFrameFlags::TRANSLATION_Z, constant(|f| f.translation.z));
	flags.set(KeyFrameFlags::SCALE_X, constant(|f| f.scale.x));
	flags.set(KeyFrameFlags::SCALE_Y, constant(|f| f.scale.y));
	flags.set(KeyFrameFlags::SCALE_Z, constant(|f| f.scale.z));

	flags
}

#[cfg(feature = "import")]
fn read_rotation_component<R>(buf: &mut R) -> Result<f32, ScwImportError>
where
	R: ReadBytesExt,
{
	Ok(buf.read_i16::<BE>()? as f32 * ROTATION_SCALE)
}

#[cfg(feature = "export")]
fn quantize_rotation(v: f32) -> i16 {
	(v / ROTATION_SCALE).round() as i16
}

/// Reads one animated float, or takes the first frame's value when the frame does not store it
#[cfg(feature = "import")]
fn read_component<R>(inherited: Option<f32>, buf: &mut R) -> Result<f32, ScwImportError>
where
	R: ReadBytesExt,
{
	match inherited {
		Some(v) => Ok(v),
		None => Ok(buf.read_f32::<BE>()?),
	}
}

/// One animation sample
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct KeyFrame {
	pub id: u16,
	/// Quaternion as (x, y, z, w)
	pub rotation: Vec4,
	pub translation: Vec3,
	pub scale: Vec3,
}

impl KeyFrame {
	/// Decodes a frame. `first` is the node's first frame, `None` while decoding that one.
	#[cfg(feature = "import")]
	pub fn read<R>(first: Option<&KeyFrame>, flags: KeyFrameFlags, buf: &mut R)
		-> Result<KeyFrame, ScwImportError>
	where
		R: ReadBytesExt,
	{
		let inherit = |flag: KeyFrameFlags| first.filter(|_| !flags.contains(flag));

		let id = buf.read_u16::<BE>()?;

		let rotation = match inherit(KeyFrameFlags::ROTATION) {
			Some(f) => f.rotation,
			None => {
				let x = read_rotation_component(buf)?;
				let y = read_rotation_component(buf)?;
				let z = read_rotation_component(buf)?;
				let w = read_rotation_component(buf)?;
				Vec4::new(x, y, z, w)
			},
		};

		let tx = read_component(inherit(KeyFrameFlags::TRANSLATION_X).map(|f| f.translation.x), buf)?;
		let ty = read_component(inherit(KeyFrameFlags::TRANSLATION_Y).map(|f| f.translation.y), buf)?;
		let tz = read_component(inherit(KeyFrameFlags::TRANSLATION_Z).map(|f| f.translation.z), buf)?;
		let sx = read_component(inherit(KeyFrameFlags::SCALE_X).map(|f| f.scale.x), buf)?;
		let sy = read_component(inherit(KeyFrameFlags::SCALE_Y).map(|f| f.scale.y), buf)?;
		let sz = read_component(inherit(KeyFrameFlags::SCALE_Z).map(|f| f.scale.z), buf)?;

		Ok(KeyFrame {
			id: id,
			rotation: rotation,
			translation: Vec3::new(tx, ty, tz),
			scale: Vec3::new(sx, sy, sz),
		})
	}

	/// Encodes a frame. The first frame is always written in full.
	#[cfg(feature = "export")]
	pub fn write<W>(&self, is_first: bool, flags: KeyFrameFlags, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt,
	{
		let explicit = |flag: KeyFrameFlags| is_first || flags.contains(flag);

		buf.write_u16::<BE>(self.id)?;

		if explicit(KeyFrameFlags::ROTATION) {
			buf.write_i16::<BE>(quantize_rotation(self.rotation.x))?;
			buf.write_i16::<BE>(quantize_rotation(self.rotation.y))?;
			buf.write_i16::<BE>(quantize_rotation(self.rotation.z))?;
			buf.write_i16::<BE>(quantize_rotation(self.rotation.w))?;
		}

		let components = [
			(KeyFrameFlags::TRANSLATION_X, self.translation.x),
			(KeyFrameFlags::TRANSLATION_Y, self.translation.y),
			(KeyFrameFlags::TRANSLATION_Z, self.translation.z),
			(KeyFrameFlags::SCALE_X, self.scale.x),
			(KeyFrameFlags::SCALE_Y, self.scale.y),
			(KeyFrameFlags::SCALE_Z, self.scale.z),
		];

		for (flag, v) in components.iter() {
			if explicit(*flag) {
				buf.write_f32::<BE>(*v)?;
			}
		}

		Ok(())
	}
}

/// Material binding of an instance: the instance material `name` resolves to `target`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct InstanceMaterial {
	pub name: String,
	pub target: String,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum InstanceKind {
	Geometry(Vec<InstanceMaterial>),
	Container(Vec<InstanceMaterial>),
	Camera(String),
}

impl InstanceKind {
	pub fn tag(&self) -> u32 {
		match self {
			InstanceKind::Geometry(_) => INSTANCE_GEOMETRY,
			InstanceKind::Container(_) => INSTANCE_CONTAINER,
			InstanceKind::Camera(_) => INSTANCE_CAMERA,
		}
	}
}

/// Binding of a node to the resource named `target`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct NodeInstance {
	pub target: String,
	pub kind: InstanceKind,
}

impl NodeInstance {
	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<NodeInstance, ScwImportError>
	where
		R: ReadBytesExt + ReadBinExt,
	{
		let tag = buf.read_u32::<BE>()?;
		let target = buf.read_utf()?;

		let kind = match tag {
			INSTANCE_GEOMETRY => InstanceKind::Geometry(read_bindings(buf)?),
			INSTANCE_CONTAINER => InstanceKind::Container(read_bindings(buf)?),
			INSTANCE_CAMERA => InstanceKind::Camera(buf.read_utf()?),
			// Includes INSTANCE_LIGHT, whose payload layout is unknown
			_ => {
				return Err(ScwImportError::UnsupportedInstanceType(conv3d_core::tag4_str(tag)));
			},
		};

		Ok(NodeInstance {
			target: target,
			kind: kind,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt + WriteBinExt,
	{
		buf.write_u32::<BE>(self.kind.tag())?;
		buf.write_utf(&self.target)?;

		match &self.kind {
			InstanceKind::Geometry(bindings) | InstanceKind::Container(bindings) => {
				buf.write_u16::<BE>(count("instance materials", bindings.len())?)?;
				for b in bindings.iter() {
					buf.write_utf(&b.name)?;
					buf.write_utf(&b.target)?;
				}
			},
			InstanceKind::Camera(target) => buf.write_utf(target)?,
		}

		Ok(())
	}
}

#[cfg(feature = "import")]
fn read_bindings<R>(buf: &mut R) -> Result<Vec<InstanceMaterial>, ScwImportError>
where
	R: ReadBytesExt + ReadBinExt,
{
	let n = buf.read_u16::<BE>()?;

	let mut bindings = Vec::with_capacity(n as usize);
	for _ in 0..n {
		bindings.push(InstanceMaterial {
			name: buf.read_utf()?,
			target: buf.read_utf()?,
		});
	}

	Ok(bindings)
}

/// Scene graph entry
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Node {
	pub name: String,
	/// Empty for root nodes
	pub parent: String,
	pub instances: Vec<NodeInstance>,
	pub frames: Vec<KeyFrame>,
	/// Flag byte found in front of the frames when the node was decoded
	pub frames_flags: u8,
}

impl Node {
	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<Node, ScwImportError>
	where
		R: ReadBytesExt + ReadBinExt,
	{
		let name = buf.read_utf()?;
		let parent = buf.read_utf()?;

		let ninstances = buf.read_u16::<BE>()?;
		let mut instances = Vec::with_capacity(ninstances as usize);
		for _ in 0..ninstances {
			instances.push(NodeInstance::read(buf)?);
		}

		let nframes = buf.read_u16::<BE>()?;
		let mut frames = Vec::with_capacity(nframes as usize);
		let mut frames_flags = 0;

		if nframes > 0 {
			frames_flags = buf.read_u8()?;
			let flags = KeyFrameFlags::from_bits_truncate(frames_flags);

			for _ in 0..nframes {
				let frame = KeyFrame::read(frames.first(), flags, buf)?;
				frames.push(frame);
			}
		}

		trace!("node {} (parent {:?}): {} instances, {} frames, flags {:#04x}", name, parent,
			instances.len(), frames.len(), frames_flags);

		Ok(Node {
			name: name,
			parent: parent,
			instances: instances,
			frames: frames,
			frames_flags: frames_flags,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), ScwExportError>
	where
		W: WriteBytesExt + WriteBinExt,
	{
		buf.write_utf(&self.name)?;
		buf.write_utf(&self.parent)?;

		buf.write_u16::<BE>(count("node instances", self.instances.len())?)?;
		for instance in self.instances.iter() {
			instance.write(buf)?;
		}

		buf.write_u16::<BE>(count("key frames", self.frames.len())?)?;

		if !self.frames.is_empty() {
			let flags = compute_frame_flags(&self.frames);
			buf.write_u8(flags.bits())?;

			for (i, frame) in self.frames.iter().enumerate() {
				frame.write(i == 0, flags, buf)?;
			}
		}

		Ok(())
	}
}

#[cfg(all(test, feature = "import", feature = "export"))]
mod tests {
	use ultraviolet::vec::{
		Vec3,
		Vec4
	};

	use crate::scw::import::ScwImportError;

	use super::*;

	// Identity rotation as it survives quantization
	const W: f32 = 32512.0 * ROTATION_SCALE;

	fn frame(id: u16, t: f32) -> KeyFrame {
		KeyFrame {
			id: id,
			rotation: Vec4::new(0.0, 0.0, 0.0, W),
			translation: Vec3::new(t, 0.0, 0.0),
			scale: Vec3::one(),
		}
	}

	fn node(frames: Vec<KeyFrame>) -> Node {
		Node {
			name: "barbarian".to_string(),
			parent: String::new(),
			instances: vec![NodeInstance {
				target: "barbarian_geo".to_string(),
				kind: InstanceKind::Geometry(vec![InstanceMaterial {
					name: "barbarian_mat".to_string(),
					target: "barbarian_mat".to_string(),
				}]),
			}],
			frames: frames,
			frames_flags: 0,
		}
	}

	#[test]
	fn test_flags_single_constant_track() {
		// Translation X is shared by all three frames, everything else moves
		let frames: Vec<KeyFrame> = (0..3).map(|i| {
			let f = i as f32;
			KeyFrame {
				id: i,
				rotation: Vec4::new(0.1 * f, 0.2 * f, 0.3 * f, 1.0 - 0.1 * f),
				translation: Vec3::new(5.0, f, 2.0 * f),
				scale: Vec3::new(1.0 + f, 2.0 + f, 3.0 + f),
			}
		}).collect();

		let flags = compute_frame_flags(&frames);
		assert_eq!(flags, KeyFrameFlags::TRANSLATION_X);
		assert_eq!(flags.bits(), 0b10);
	}

	#[test]
	fn test_flags_rotation_group() {
		let mut frames = vec![frame(0, 0.0), frame(1, 1.0)];
		assert!(compute_frame_flags(&frames).contains(KeyFrameFlags::ROTATION));

		// One moving component clears the whole rotation bit
		frames[1].rotation.w = 0.5;
		assert!(!compute_frame_flags(&frames).contains(KeyFrameFlags::ROTATION));
	}

	#[test]
	fn test_flags_tolerance() {
		let a = frame(0, 1.0);
		let mut b = frame(1, 1.0);
		b.scale.y = 1.0 + f32::EPSILON;
		let flags = compute_frame_flags(&[a, b]);
		assert!(!flags.contains(KeyFrameFlags::SCALE_Y));
		assert!(flags.contains(KeyFrameFlags::SCALE_X));
	}

	#[test]
	fn test_flags_short() {
		assert_eq!(compute_frame_flags(&[]), KeyFrameFlags::empty());
		assert_eq!(compute_frame_flags(&[frame(0, 3.0)]), KeyFrameFlags::empty());
	}

	#[test]
	fn test_frame_decode_inherits() {
		let first = KeyFrame {
			id: 0,
			rotation: Vec4::new(0.0, 0.0, 0.0, 1.0),
			translation: Vec3::new(1.0, 2.0, 3.0),
			scale: Vec3::new(4.0, 5.0, 6.0),
		};

		// Only translation Y is stored
		let mut data = vec![0, 7];
		data.extend_from_slice(&9.0f32.to_be_bytes());

		let flags = KeyFrameFlags::TRANSLATION_Y;
		let f = KeyFrame::read(Some(&first), flags, &mut data.as_slice()).unwrap();
		assert_eq!(f.id, 7);
		assert_eq!(f.rotation, first.rotation);
		assert_eq!(f.translation, Vec3::new(1.0, 9.0, 3.0));
		assert_eq!(f.scale, first.scale);
	}

	#[test]
	fn test_first_frame_ignores_flags() {
		let mut out = vec![];
		let f = frame(0, 2.0);
		f.write(true, KeyFrameFlags::empty(), &mut out).unwrap();
		assert_eq!(out.len(), 2 + 4 * 2 + 6 * 4);

		let decoded = KeyFrame::read(None, KeyFrameFlags::empty(), &mut out.as_slice()).unwrap();
		assert_eq!(decoded.translation, f.translation);
		assert_eq!(decoded.scale, f.scale);
	}

	#[test]
	fn test_rotation_quantization() {
		let data = [0, 1, 0x7f, 0xff, 0x80, 0x00, 0x00, 0x00, 0x40, 0x00];
		let f = KeyFrame::read(None, KeyFrameFlags::empty(), &mut &data[..]);
		// Translation and scale are missing
		assert!(matches!(f, Err(ScwImportError::ShortBuffer)));

		let mut data = data.to_vec();
		data.extend_from_slice(&[0; 24]);
		let f = KeyFrame::read(None, KeyFrameFlags::empty(), &mut data.as_slice()).unwrap();
		assert_eq!(f.rotation.x, 32767.0 * ROTATION_SCALE);
		assert_eq!(f.rotation.y, -32768.0 * ROTATION_SCALE);
		assert_eq!(f.rotation.z, 0.0);

		let mut out = vec![];
		f.write(true, KeyFrameFlags::empty(), &mut out).unwrap();
		assert_eq!(out, data);
	}

	#[test]
	fn test_node_single_frame() {
		let n = node(vec![frame(0, 4.0)]);
		let mut out = vec![];
		n.write(&mut out).unwrap();

		let decoded = Node::read(&mut out.as_slice()).unwrap();
		assert_eq!(decoded.frames_flags, 0);
		assert_eq!(decoded.frames, n.frames);
		assert_eq!(decoded, n);
	}

	#[test]
	fn test_node_constant_frames() {
		let n = node(vec![frame(0, 4.0), frame(1, 4.0), frame(2, 4.0)]);
		let mut out = vec![];
		n.write(&mut out).unwrap();

		let decoded = Node::read(&mut out.as_slice()).unwrap();
		assert_eq!(decoded.frames_flags, 0x7f);
		assert_eq!(decoded.frames, n.frames);

		// Stable from here on
		let mut again = vec![];
		decoded.write(&mut again).unwrap();
		assert_eq!(again, out);
	}

	#[test]
	fn test_node_moving_track_is_not_stored() {
		// With the flag set for constant tracks, a moving track falls back to the first frame
		let n = node(vec![frame(0, 1.0), frame(1, 2.0), frame(2, 3.0)]);
		let mut out = vec![];
		n.write(&mut out).unwrap();

		let decoded = Node::read(&mut out.as_slice()).unwrap();
		assert_eq!(decoded.frames_flags, 0x7f & !KeyFrameFlags::TRANSLATION_X.bits());
		assert!(decoded.frames.iter().all(|f| f.translation.x == 1.0));
		assert_eq!(decoded.frames[2].id, 2);
	}

	#[test]
	fn test_instances() {
		let instances = vec![
			NodeInstance {
				target: "box".to_string(),
				kind: InstanceKind::Container(vec![]),
			},
			NodeInstance {
				target: "Camera001".to_string(),
				kind: InstanceKind::Camera("Camera001-target".to_string()),
			},
		];

		for instance in instances {
			let mut out = vec![];
			instance.write(&mut out).unwrap();
			assert_eq!(&out[..4], &instance.kind.tag().to_be_bytes()[..]);
			assert_eq!(NodeInstance::read(&mut out.as_slice()).unwrap(), instance);
		}
	}

	#[test]
	fn test_unsupported_instances() {
		for tag in [b"LIGH", b"XXXX"] {
			let mut data = tag.to_vec();
			data.extend_from_slice(b"\x00\x04lamp\x00\x00");

			match NodeInstance::read(&mut data.as_slice()) {
				Err(ScwImportError::UnsupportedInstanceType(t)) => assert_eq!(t.as_bytes(), &tag[..]),
				other => panic!("unexpected result: {:?}", other),
			}
		}
	}
}
