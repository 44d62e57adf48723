use std::io;
use byteorder::{ReadBytesExt, WriteBytesExt};
use tracing::warn;

use crate::read_write::{LittleEndianReader, LittleEndianWriter};

/// A fixed-width, NUL-padded UTF-8 string field.
///
/// Device labels occupy 32 bytes on the wire; group and location labels occupy 16. Trailing NUL
/// padding is trimmed on unpack. An all-NUL field unpacks to the empty string, which is a state
/// devices can legitimately be in.
#[derive(Debug, Clone, PartialEq)]
pub struct LifxStr<const N: usize>(pub String);

/// 32-byte device label.
pub type LifxString = LifxStr<32>;

/// 16-byte group/location label.
pub type ShortLifxString = LifxStr<16>;

impl<const N: usize> LifxStr<N> {
	/// Constructs a new label, truncating to the field width on a char boundary.
	pub fn new(s: &str) -> LifxStr<N> {
		LifxStr(truncate_to_width(s, N).to_owned())
	}

	/// The wire width of this field in bytes.
	pub fn width() -> usize {
		N
	}
}

impl<const N: usize> std::fmt::Display for LifxStr<N> {
	fn fmt(&self, fmt: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
		write!(fmt, "{}", self.0)
	}
}

impl<const N: usize> std::cmp::PartialEq<str> for LifxStr<N> {
	fn eq(&self, other: &str) -> bool {
		self.0 == other
	}
}

fn truncate_to_width(s: &str, width: usize) -> &str {
	if s.len() <= width {
		return s;
	}
	let mut end = width;
	while !s.is_char_boundary(end) {
		end -= 1;
	}
	&s[..end]
}

impl<R: ReadBytesExt, const N: usize> LittleEndianReader<LifxStr<N>> for R {
	fn read_val(&mut self) -> Result<LifxStr<N>, io::Error> {
		let mut raw = [0u8; N];
		for slot in raw.iter_mut() {
			*slot = self.read_u8()?;
		}
		let end = raw.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
		Ok(LifxStr(String::from_utf8_lossy(&raw[..end]).into_owned()))
	}
}

impl<T, const N: usize> LittleEndianWriter<LifxStr<N>> for T
where
	T: WriteBytesExt,
{
	fn write_val(&mut self, v: LifxStr<N>) -> Result<(), io::Error> {
		let bytes = v.0.as_bytes();
		if bytes.len() > N {
			warn!(label = %v.0, width = N, "label exceeds field width, truncating");
		}
		let fitted = truncate_to_width(&v.0, N).as_bytes();
		self.write_all(fitted)?;
		for _ in fitted.len()..N {
			self.write_u8(0)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	fn round_trip<const N: usize>(s: &str) -> LifxStr<N> {
		let mut v = Vec::new();
		v.write_val(LifxStr::<N>(s.to_owned())).unwrap();
		assert_eq!(v.len(), N);
		Cursor::new(&v).read_val().unwrap()
	}

	#[test]
	fn trims_trailing_nuls() {
		let label: LifxString = round_trip("Kitchen");
		assert_eq!(label, *"Kitchen");
	}

	#[test]
	fn all_nul_label_is_empty() {
		let v = vec![0u8; 32];
		let label: LifxString = Cursor::new(&v).read_val().unwrap();
		assert_eq!(label.0, "");
	}

	#[test]
	fn overlong_label_truncates() {
		let long = "x".repeat(40);
		let label: LifxString = round_trip(&long);
		assert_eq!(label.0.len(), 32);
	}

	#[test]
	fn truncation_respects_char_boundaries() {
		// 31 ASCII bytes followed by a two-byte char straddling the limit
		let s = format!("{}é", "a".repeat(31));
		let label: LifxString = round_trip(&s);
		assert_eq!(label.0, "a".repeat(31));
	}

	#[test]
	fn short_label_width() {
		let label: ShortLifxString = round_trip("Bedroom");
		assert_eq!(label, *"Bedroom");
		assert_eq!(ShortLifxString::width(), 16);
	}
}
