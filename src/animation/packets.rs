use crate::{
	color::{ApplicationRequest, HSBK},
	error::Error,
	misc::Serial,
	msg::{BuildOptions, Message, RawMessage, EXTENDED_ZONE_SLOTS, TILE_SLOTS},
};

const HEADER_SIZE: usize = 36;

// Payload offsets of the color block inside each frame packet
const SET_COLOR_COLOR_OFFSET: usize = HEADER_SIZE + 1;
const EXT_ZONES_COLOR_OFFSET: usize = HEADER_SIZE + 8;
const SET64_COLOR_OFFSET: usize = HEADER_SIZE + 10;

const ZERO_HSBK: HSBK = HSBK {
	hue: 0,
	saturation: 0,
	brightness: 0,
	kelvin: 0,
};

/// One pre-packed frame packet: a byte buffer whose color block is rewritten in place each frame.
///
/// Everything else in the buffer (header, duration, indices) is fixed at creation, so per-frame
/// work is a memcpy-sized write plus one socket send.
#[derive(Debug, Clone)]
pub struct FrameTemplate {
	buf: Vec<u8>,
	color_offset: usize,
	/// Index into the canvas frame where this packet's pixels start
	frame_start: usize,
	/// Number of pixels this packet carries
	slots: usize,
}

impl FrameTemplate {
	/// Rewrites the color block from the canvas frame.
	pub fn update_colors(&mut self, frame: &[HSBK]) {
		let end = (self.frame_start + self.slots).min(frame.len());
		for (slot, color) in frame[self.frame_start..end].iter().enumerate() {
			let at = self.color_offset + slot * 8;
			self.buf[at..at + 2].copy_from_slice(&color.hue.to_le_bytes());
			self.buf[at + 2..at + 4].copy_from_slice(&color.saturation.to_le_bytes());
			self.buf[at + 4..at + 6].copy_from_slice(&color.brightness.to_le_bytes());
			self.buf[at + 6..at + 8].copy_from_slice(&color.kelvin.to_le_bytes());
		}
	}

	pub fn bytes(&self) -> &[u8] {
		&self.buf
	}
}

fn pack_template(target: Serial, source: u32, msg: Message) -> Result<Vec<u8>, Error> {
	let raw = RawMessage::build(
		&BuildOptions {
			target: Some(target),
			ack_required: false,
			res_required: false,
			sequence: 0,
			source,
		},
		msg,
	)?;
	raw.pack()
}

/// Templates for a single-pixel device: one SetColor per frame.
pub fn light_templates(
	target: Serial,
	source: u32,
	duration_ms: u32,
) -> Result<Vec<FrameTemplate>, Error> {
	let buf = pack_template(
		target,
		source,
		Message::LightSetColor {
			reserved: 0,
			color: ZERO_HSBK,
			duration: duration_ms,
		},
	)?;
	Ok(vec![FrameTemplate {
		buf,
		color_offset: SET_COLOR_COLOR_OFFSET,
		frame_start: 0,
		slots: 1,
	}])
}

/// Templates for a multizone strip: one SetExtendedColorZones per 82-zone block.
pub fn multizone_templates(
	target: Serial,
	source: u32,
	duration_ms: u32,
	zone_count: usize,
) -> Result<Vec<FrameTemplate>, Error> {
	let mut templates = Vec::new();
	let mut zone = 0;
	while zone < zone_count {
		let slots = (zone_count - zone).min(EXTENDED_ZONE_SLOTS);
		let buf = pack_template(
			target,
			source,
			Message::SetExtendedColorZones {
				duration: duration_ms,
				apply: ApplicationRequest::Apply,
				zone_index: zone as u16,
				colors_count: slots as u8,
				colors: Box::new([ZERO_HSBK; EXTENDED_ZONE_SLOTS]),
			},
		)?;
		templates.push(FrameTemplate {
			buf,
			color_offset: EXT_ZONES_COLOR_OFFSET,
			frame_start: zone,
			slots,
		});
		zone += slots;
	}
	Ok(templates)
}

/// Templates for a matrix chain: one Set64 per tile.
///
/// The canvas stacks tiles vertically, so tile `t` reads its 64 pixels from the canvas range
/// starting at `t * tile_width * tile_height`.  That start index is the whole orientation map;
/// it is baked into each template once.
pub fn matrix_templates(
	target: Serial,
	source: u32,
	duration_ms: u32,
	tile_count: usize,
	tile_width: usize,
	tile_height: usize,
) -> Result<Vec<FrameTemplate>, Error> {
	let per_tile = tile_width * tile_height;
	let mut templates = Vec::new();
	for tile in 0..tile_count {
		let buf = pack_template(
			target,
			source,
			Message::Set64 {
				tile_index: tile as u8,
				length: 1,
				x: 0,
				y: 0,
				width: tile_width as u8,
				duration: duration_ms,
				colors: Box::new([ZERO_HSBK; TILE_SLOTS]),
			},
		)?;
		templates.push(FrameTemplate {
			buf,
			color_offset: SET64_COLOR_OFFSET,
			frame_start: tile * per_tile,
			slots: per_tile.min(TILE_SLOTS),
		});
	}
	Ok(templates)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn serial() -> Serial {
		"d073d5010203".parse().unwrap()
	}

	#[test]
	fn light_template_writes_color_in_place() {
		let mut templates = light_templates(serial(), 7, 50).unwrap();
		let frame = [HSBK {
			hue: 0x1234,
			saturation: 0x5678,
			brightness: 0x9abc,
			kelvin: 3500,
		}];
		templates[0].update_colors(&frame);

		let bytes = templates[0].bytes();
		// SetColor payload: reserved u8, then HSBK
		assert_eq!(bytes.len(), 49);
		assert_eq!(&bytes[37..39], &[0x34, 0x12]);
		assert_eq!(&bytes[39..41], &[0x78, 0x56]);

		// The rewritten buffer is still a valid packet
		let raw = RawMessage::unpack(bytes).unwrap();
		match Message::from_raw(&raw).unwrap() {
			Message::LightSetColor { color, duration, .. } => {
				assert_eq!(color.hue, 0x1234);
				assert_eq!(duration, 50);
			}
			other => panic!("wrong message: {:?}", other),
		}
	}

	#[test]
	fn multizone_templates_chunk_large_strips() {
		let templates = multizone_templates(serial(), 7, 75, 100).unwrap();
		assert_eq!(templates.len(), 2);
		assert_eq!(templates[0].slots, 82);
		assert_eq!(templates[1].frame_start, 82);
		assert_eq!(templates[1].slots, 18);
	}

	#[test]
	fn multizone_template_rewrites_only_its_block() {
		let mut templates = multizone_templates(serial(), 7, 75, 16).unwrap();
		let frame: Vec<HSBK> = (0..16)
			.map(|i| HSBK {
				hue: i * 1000,
				saturation: 65535,
				brightness: 65535,
				kelvin: 3500,
			})
			.collect();
		templates[0].update_colors(&frame);

		let raw = RawMessage::unpack(templates[0].bytes()).unwrap();
		match Message::from_raw(&raw).unwrap() {
			Message::SetExtendedColorZones {
				colors,
				colors_count,
				..
			} => {
				assert_eq!(colors_count, 16);
				assert_eq!(colors[3].hue, 3000);
				assert_eq!(colors[20], ZERO_HSBK);
			}
			other => panic!("wrong message: {:?}", other),
		}
	}

	#[test]
	fn matrix_templates_map_canvas_rows_to_tiles() {
		let mut templates = matrix_templates(serial(), 7, 75, 2, 8, 8).unwrap();
		assert_eq!(templates.len(), 2);
		assert_eq!(templates[1].frame_start, 64);

		let frame: Vec<HSBK> = (0..128)
			.map(|i| HSBK {
				hue: i as u16,
				saturation: 0,
				brightness: 0,
				kelvin: 3500,
			})
			.collect();
		templates[1].update_colors(&frame);

		let raw = RawMessage::unpack(templates[1].bytes()).unwrap();
		match Message::from_raw(&raw).unwrap() {
			Message::Set64 {
				tile_index, colors, ..
			} => {
				assert_eq!(tile_index, 1);
				// First pixel of tile 1 is canvas pixel 64
				assert_eq!(colors[0].hue, 64);
				assert_eq!(colors[63].hue, 127);
			}
			other => panic!("wrong message: {:?}", other),
		}
	}
}
