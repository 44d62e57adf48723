use std::{convert::TryFrom, io, str::FromStr};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
	error::Error,
	read_write::{LittleEndianReader, LittleEndianWriter},
};

/// A 48-bit device identity (the device MAC address).
///
/// Rendered as 12 lowercase hex characters. On the wire the serial occupies the low six bytes of
/// the 8-byte target field, little-endian aligned; the top two bytes are always zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Serial(pub [u8; 6]);

impl Serial {
	/// The all-zero serial used to address every device on the subnet.
	pub const BROADCAST: Serial = Serial([0; 6]);

	pub fn is_broadcast(&self) -> bool {
		self.0 == [0; 6]
	}

	/// The value of the header target field for this serial.
	pub fn to_target(self) -> u64 {
		let mut b = [0u8; 8];
		b[..6].copy_from_slice(&self.0);
		u64::from_le_bytes(b)
	}

	/// Extracts the serial from a header target field.
	pub fn from_target(target: u64) -> Serial {
		let b = target.to_le_bytes();
		let mut serial = [0u8; 6];
		serial.copy_from_slice(&b[..6]);
		Serial(serial)
	}
}

impl std::fmt::Display for Serial {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		for b in &self.0 {
			write!(f, "{:02x}", b)?;
		}
		Ok(())
	}
}

impl FromStr for Serial {
	type Err = Error;

	fn from_str(s: &str) -> Result<Serial, Error> {
		if s.len() != 12 {
			return Err(Error::ProtocolError(format!(
				"Serial must be 12 hex characters, got {:?}",
				s
			)));
		}
		let mut serial = [0u8; 6];
		for (idx, slot) in serial.iter_mut().enumerate() {
			*slot = u8::from_str_radix(&s[idx * 2..idx * 2 + 2], 16)
				.map_err(|_| Error::ProtocolError(format!("Invalid serial {:?}", s)))?;
		}
		Ok(Serial(serial))
	}
}

/// A 16-byte group or location identity (a raw UUID).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifxIdent(pub [u8; 16]);

impl<R: ReadBytesExt> LittleEndianReader<LifxIdent> for R {
	fn read_val(&mut self) -> Result<LifxIdent, io::Error> {
		let mut val = [0; 16];
		for v in &mut val {
			*v = self.read_val()?;
		}
		Ok(LifxIdent(val))
	}
}

impl<T> LittleEndianWriter<LifxIdent> for T
where
	T: WriteBytesExt,
{
	fn write_val(&mut self, v: LifxIdent) -> Result<(), io::Error> {
		self.write_all(&v.0)
	}
}

#[derive(Copy, Clone)]
pub struct EchoPayload(pub [u8; 64]);

impl std::fmt::Debug for EchoPayload {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
		write!(f, "<EchoPayload>")
	}
}

impl PartialEq for EchoPayload {
	fn eq(&self, other: &EchoPayload) -> bool {
		self.0[..] == other.0[..]
	}
}

impl<R: ReadBytesExt> LittleEndianReader<EchoPayload> for R {
	fn read_val(&mut self) -> Result<EchoPayload, io::Error> {
		let mut val = [0; 64];
		for v in val.iter_mut() {
			*v = self.read_val()?;
		}
		Ok(EchoPayload(val))
	}
}

impl<T> LittleEndianWriter<EchoPayload> for T
where
	T: WriteBytesExt,
{
	fn write_val(&mut self, v: EchoPayload) -> Result<(), io::Error> {
		self.write_all(&v.0)
	}
}

/// A device power level.
///
/// Only 0 (standby) and 65535 (on) are produced by this library, but devices have been observed
/// reporting intermediate values mid-transition, so any u16 round-trips exactly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PowerLevel(pub u16);

impl PowerLevel {
	pub const STANDBY: PowerLevel = PowerLevel(0);
	pub const ENABLED: PowerLevel = PowerLevel(65535);

	pub fn is_on(self) -> bool {
		self.0 != 0
	}
}

impl From<bool> for PowerLevel {
	fn from(on: bool) -> PowerLevel {
		if on {
			PowerLevel::ENABLED
		} else {
			PowerLevel::STANDBY
		}
	}
}

impl<R: ReadBytesExt> LittleEndianReader<PowerLevel> for R {
	fn read_val(&mut self) -> Result<PowerLevel, io::Error> {
		Ok(PowerLevel(self.read_u16::<LittleEndian>()?))
	}
}

impl<T> LittleEndianWriter<PowerLevel> for T
where
	T: WriteBytesExt,
{
	fn write_val(&mut self, v: PowerLevel) -> Result<(), io::Error> {
		self.write_u16::<LittleEndian>(v.0)
	}
}

/// What services are exposed by the device.
///
/// LIFX only documents the UDP service, though bulbs may support other undocumented services.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Service {
	UDP = 1,
}

impl TryFrom<u8> for Service {
	type Error = Error;
	fn try_from(val: u8) -> Result<Service, Error> {
		if val != Service::UDP as u8 {
			Err(Error::ProtocolError(format!(
				"Unknown service value {}",
				val
			)))
		} else {
			Ok(Service::UDP)
		}
	}
}
