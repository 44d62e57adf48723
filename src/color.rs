use std::{convert::TryFrom, io};
use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::{
	error::Error,
	read_write::{LittleEndianReader, LittleEndianWriter},
};

pub const MIN_KELVIN: u16 = 1500;
pub const MAX_KELVIN: u16 = 9000;
pub const KELVIN_AMBER: u16 = 2000;
pub const KELVIN_NEUTRAL: u16 = 3500;
pub const KELVIN_COOL: u16 = 4000;

/// Controls how/when multizone devices apply color changes
///
/// See also [crate::Message::SetColorZones].
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ApplicationRequest {
	/// Don't apply the requested changes until a message with Apply or ApplyOnly is sent
	NoApply = 0,
	/// Apply the changes immediately and apply any pending changes
	Apply = 1,
	/// Ignore the requested changes in this message and only apply pending changes
	ApplyOnly = 2,
}

impl<T> LittleEndianWriter<ApplicationRequest> for T
where
	T: WriteBytesExt,
{
	fn write_val(&mut self, v: ApplicationRequest) -> Result<(), io::Error> {
		self.write_u8(v as u8)
	}
}

impl TryFrom<u8> for ApplicationRequest {
	type Error = Error;
	fn try_from(val: u8) -> Result<ApplicationRequest, Error> {
		match val {
			0 => Ok(ApplicationRequest::NoApply),
			1 => Ok(ApplicationRequest::Apply),
			2 => Ok(ApplicationRequest::ApplyOnly),
			x => Err(Error::ProtocolError(format!(
				"Unknown application request {}",
				x
			))),
		}
	}
}

/// Firmware-resident periodic animations, invoked with [crate::Message::SetWaveform].
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Waveform {
	Saw = 0,
	Sine = 1,
	HalfSine = 2,
	Triangle = 3,
	Pulse = 4,
}

impl<T> LittleEndianWriter<Waveform> for T
where
	T: WriteBytesExt,
{
	fn write_val(&mut self, v: Waveform) -> Result<(), io::Error> {
		self.write_u8(v as u8)
	}
}

impl TryFrom<u8> for Waveform {
	type Error = Error;
	fn try_from(val: u8) -> Result<Waveform, Error> {
		match val {
			0 => Ok(Waveform::Saw),
			1 => Ok(Waveform::Sine),
			2 => Ok(Waveform::HalfSine),
			3 => Ok(Waveform::Triangle),
			4 => Ok(Waveform::Pulse),
			x => Err(Error::ProtocolError(format!(
				"Unknown waveform value {}",
				x
			))),
		}
	}
}

/// Firmware effects a multizone device can run on its own.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MultiZoneEffectType {
	Off = 0,
	/// Scrolls the current zone colors along the strip
	Move = 1,
}

impl<T> LittleEndianWriter<MultiZoneEffectType> for T
where
	T: WriteBytesExt,
{
	fn write_val(&mut self, v: MultiZoneEffectType) -> Result<(), io::Error> {
		self.write_u8(v as u8)
	}
}

impl TryFrom<u8> for MultiZoneEffectType {
	type Error = Error;
	fn try_from(val: u8) -> Result<MultiZoneEffectType, Error> {
		match val {
			0 => Ok(MultiZoneEffectType::Off),
			1 => Ok(MultiZoneEffectType::Move),
			x => Err(Error::ProtocolError(format!(
				"Unknown multizone effect {}",
				x
			))),
		}
	}
}

/// Firmware effects a matrix device can run on its own.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TileEffectType {
	Off = 0,
	/// Palette colors morphing across the canvas
	Morph = 2,
	/// Fire simulation rising from the bottom edge
	Flame = 3,
}

impl<T> LittleEndianWriter<TileEffectType> for T
where
	T: WriteBytesExt,
{
	fn write_val(&mut self, v: TileEffectType) -> Result<(), io::Error> {
		self.write_u8(v as u8)
	}
}

impl TryFrom<u8> for TileEffectType {
	type Error = Error;
	fn try_from(val: u8) -> Result<TileEffectType, Error> {
		match val {
			0 => Ok(TileEffectType::Off),
			2 => Ok(TileEffectType::Morph),
			3 => Ok(TileEffectType::Flame),
			x => Err(Error::ProtocolError(format!("Unknown tile effect {}", x))),
		}
	}
}

/// Bulb color in wire representation (Hue-Saturation-Brightness-Kelvin).
///
/// All four fields are u16. Hue maps the 0-360 degree circle onto the full u16 range; saturation
/// and brightness map 0.0-1.0 onto it. Kelvin is in plain degrees kelvin.
///
/// When a light is displaying whites, saturation will be zero, hue will be ignored, and only
/// brightness and kelvin will matter.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HSBK {
	pub hue: u16,
	pub saturation: u16,
	pub brightness: u16,
	pub kelvin: u16,
}

impl<R: ReadBytesExt> LittleEndianReader<HSBK> for R {
	fn read_val(&mut self) -> Result<HSBK, io::Error> {
		let hue = self.read_val()?;
		let sat = self.read_val()?;
		let bri = self.read_val()?;
		let kel = self.read_val()?;
		Ok(HSBK {
			hue,
			saturation: sat,
			brightness: bri,
			kelvin: kel,
		})
	}
}

impl<T> LittleEndianWriter<HSBK> for T
where
	T: WriteBytesExt,
{
	fn write_val(&mut self, v: HSBK) -> Result<(), io::Error> {
		self.write_val(v.hue)?;
		self.write_val(v.saturation)?;
		self.write_val(v.brightness)?;
		self.write_val(v.kelvin)?;
		Ok(())
	}
}

/// User-facing color value: hue in degrees, saturation/brightness as fractions, kelvin in kelvin.
///
/// Converting to the wire representation clamps each field into its declared range. Conversion
/// *from* the wire never clamps: devices report out-of-range kelvin values mid-transition and
/// those must be observable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
	/// Hue in degrees, 0.0-360.0
	pub hue: f32,
	/// Saturation, 0.0-1.0
	pub saturation: f32,
	/// Brightness, 0.0-1.0
	pub brightness: f32,
	/// Color temperature in kelvin, nominally 1500-9000
	pub kelvin: u16,
}

const HUE_SCALE: f32 = 65535.0 / 360.0;

impl Color {
	pub const GREEN: Color = Color {
		hue: 120.0,
		saturation: 1.0,
		brightness: 0.8,
		kelvin: KELVIN_NEUTRAL,
	};

	pub fn new(hue: f32, saturation: f32, brightness: f32, kelvin: u16) -> Color {
		Color {
			hue,
			saturation,
			brightness,
			kelvin,
		}
	}

	/// A white at the given color temperature.
	pub fn white(kelvin: u16, brightness: f32) -> Color {
		Color {
			hue: 0.0,
			saturation: 0.0,
			brightness,
			kelvin,
		}
	}

	/// Converts to the wire representation, clamping every field into range.
	pub fn to_hsbk(self) -> HSBK {
		let hue = self.hue.rem_euclid(360.0);
		HSBK {
			hue: (hue * HUE_SCALE).round() as u16,
			saturation: (self.saturation.clamp(0.0, 1.0) * 65535.0).round() as u16,
			brightness: (self.brightness.clamp(0.0, 1.0) * 65535.0).round() as u16,
			kelvin: self.kelvin.clamp(MIN_KELVIN, MAX_KELVIN),
		}
	}

	/// Converts from the wire representation without clamping.
	pub fn from_hsbk(raw: HSBK) -> Color {
		Color {
			hue: raw.hue as f32 / HUE_SCALE,
			saturation: raw.saturation as f32 / 65535.0,
			brightness: raw.brightness as f32 / 65535.0,
			kelvin: raw.kelvin,
		}
	}
}
