use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
	color::{ApplicationRequest, Color, MultiZoneEffectType, TileEffectType, Waveform},
	error::Error,
	misc::{EchoPayload, LifxIdent, PowerLevel, Serial},
	msg::{
		Message, TileDevice, EFFECT_PARAMETER_SLOTS, EXTENDED_ZONE_SLOTS,
		TILE_EFFECT_PALETTE_SLOTS, TILE_SLOTS,
	},
	net::pool::DeviceConnection,
	product::{get_product_info, ProductCapability},
	string::LifxString,
};

/// Scroll direction of the firmware Move effect.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
	Towards = 0,
	Away = 1,
}

/// Coarse classification of a device, derived from its capability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
	Light,
	Infrared,
	Hev,
	MultiZone,
	Matrix,
	Ceiling,
}

impl DeviceKind {
	pub fn from_capabilities(caps: &ProductCapability) -> DeviceKind {
		if caps.has_ceiling {
			DeviceKind::Ceiling
		} else if caps.has_matrix {
			DeviceKind::Matrix
		} else if caps.has_multizone {
			DeviceKind::MultiZone
		} else if caps.has_hev {
			DeviceKind::Hev
		} else if caps.has_infrared {
			DeviceKind::Infrared
		} else {
			DeviceKind::Light
		}
	}
}

/// Tile-chain geometry of a matrix device.
///
/// The canvas stacks the chain vertically: tile `t` owns rows `[t*tile_height, (t+1)*tile_height)`
/// of a `tile_width`-wide, row-major canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixGeometry {
	pub tile_count: usize,
	pub tile_width: usize,
	pub tile_height: usize,
}

impl MatrixGeometry {
	pub fn canvas_width(&self) -> usize {
		self.tile_width
	}

	pub fn canvas_height(&self) -> usize {
		self.tile_height * self.tile_count
	}

	pub fn pixel_count(&self) -> usize {
		self.canvas_width() * self.canvas_height()
	}
}

struct DeviceInner {
	connection: DeviceConnection,
	capabilities: OnceCell<ProductCapability>,
}

/// A handle to one LIFX device.
///
/// Cheap to clone; all clones share the capability cache and resolve to the same pooled
/// connection.  High-level methods dispatch on the capability record, not on a type hierarchy:
/// a strip, a tile and a plain bulb are all `Device`s whose record says what they can do.
#[derive(Clone)]
pub struct Device {
	inner: Arc<DeviceInner>,
}

impl Device {
	/// Creates a handle for the device at `ip` with the given serial.  No I/O happens until the
	/// first request.
	pub fn connect(ip: IpAddr, serial: Serial) -> Device {
		Device::with_connection(DeviceConnection::new(serial, ip))
	}

	pub fn with_connection(connection: DeviceConnection) -> Device {
		Device {
			inner: Arc::new(DeviceInner {
				connection,
				capabilities: OnceCell::new(),
			}),
		}
	}

	pub fn serial(&self) -> Serial {
		self.inner.connection.serial
	}

	pub fn ip(&self) -> IpAddr {
		self.inner.connection.ip
	}

	pub fn connection(&self) -> &DeviceConnection {
		&self.inner.connection
	}

	/// The device's effective capabilities, fetched once and cached.
	///
	/// Combines the product record (from StateVersion) with the host firmware version, which
	/// gates extended multizone support.
	pub async fn capabilities(&self) -> Result<ProductCapability, Error> {
		let caps = self
			.inner
			.capabilities
			.get_or_try_init(|| async {
				let (vendor, product, _) = self.get_version().await?;
				match get_product_info(vendor, product) {
					Some(info) => {
						let firmware = self.get_host_firmware().await?;
						Ok::<_, Error>(info.capabilities(firmware))
					}
					None => {
						debug!(vendor, product, serial = %self.serial(), "unknown product");
						Ok(ProductCapability::unknown())
					}
				}
			})
			.await?;
		Ok(*caps)
	}

	pub async fn kind(&self) -> Result<DeviceKind, Error> {
		Ok(DeviceKind::from_capabilities(&self.capabilities().await?))
	}

	// ---- plain light operations ----

	pub async fn get_color(&self) -> Result<Color, Error> {
		match self.inner.connection.request(Message::LightGet).await? {
			Message::LightState { color, .. } => Ok(Color::from_hsbk(color)),
			other => Err(unexpected("LightState", &other)),
		}
	}

	/// Color, power and label in one round-trip.
	pub async fn get_light_state(&self) -> Result<(Color, bool, String), Error> {
		match self.inner.connection.request(Message::LightGet).await? {
			Message::LightState {
				color,
				power,
				label,
				..
			} => Ok((Color::from_hsbk(color), power.is_on(), label.0)),
			other => Err(unexpected("LightState", &other)),
		}
	}

	pub async fn set_color(&self, color: Color, duration_ms: u32) -> Result<(), Error> {
		self.inner
			.connection
			.request_ack(Message::LightSetColor {
				reserved: 0,
				color: color.to_hsbk(),
				duration: duration_ms,
			})
			.await
	}

	pub async fn get_power(&self) -> Result<bool, Error> {
		match self.inner.connection.request(Message::GetPower).await? {
			Message::StatePower { level } => Ok(level.is_on()),
			other => Err(unexpected("StatePower", &other)),
		}
	}

	pub async fn set_power(&self, on: bool) -> Result<(), Error> {
		self.inner
			.connection
			.request_ack(Message::SetPower {
				level: PowerLevel::from(on),
			})
			.await
	}

	/// Powers the light on or off with a smooth transition.
	pub async fn set_power_duration(&self, on: bool, duration_ms: u32) -> Result<(), Error> {
		self.inner
			.connection
			.request_ack(Message::LightSetPower {
				level: if on { 65535 } else { 0 },
				duration: duration_ms,
			})
			.await
	}

	pub async fn get_label(&self) -> Result<String, Error> {
		match self.inner.connection.request(Message::GetLabel).await? {
			Message::StateLabel { label } => Ok(label.0),
			other => Err(unexpected("StateLabel", &other)),
		}
	}

	pub async fn set_label(&self, label: &str) -> Result<(), Error> {
		self.inner
			.connection
			.request_ack(Message::SetLabel {
				label: LifxString::new(label),
			})
			.await
	}

	/// Vendor id, product id and hardware version.
	pub async fn get_version(&self) -> Result<(u32, u32, u32), Error> {
		match self.inner.connection.request(Message::GetVersion).await? {
			Message::StateVersion {
				vendor,
				product,
				version,
			} => Ok((vendor, product, version)),
			other => Err(unexpected("StateVersion", &other)),
		}
	}

	/// Host firmware version, major in the high 16 bits.
	pub async fn get_host_firmware(&self) -> Result<u32, Error> {
		match self
			.inner
			.connection
			.request(Message::GetHostFirmware)
			.await?
		{
			Message::StateHostFirmware { version, .. } => Ok(version),
			other => Err(unexpected("StateHostFirmware", &other)),
		}
	}

	/// Host MCU signal strength in milliwatts plus byte counters since power on.
	pub async fn get_host_info(&self) -> Result<(f32, u32, u32), Error> {
		match self.inner.connection.request(Message::GetHostInfo).await? {
			Message::StateHostInfo { signal, tx, rx, .. } => Ok((signal, tx, rx)),
			other => Err(unexpected("StateHostInfo", &other)),
		}
	}

	/// Radio signal strength in milliwatts plus byte counters since power on.
	pub async fn get_wifi_info(&self) -> Result<(f32, u32, u32), Error> {
		match self.inner.connection.request(Message::GetWifiInfo).await? {
			Message::StateWifiInfo { signal, tx, rx, .. } => Ok((signal, tx, rx)),
			other => Err(unexpected("StateWifiInfo", &other)),
		}
	}

	pub async fn get_wifi_firmware(&self) -> Result<u32, Error> {
		match self
			.inner
			.connection
			.request(Message::GetWifiFirmware)
			.await?
		{
			Message::StateWifiFirmware { version, .. } => Ok(version),
			other => Err(unexpected("StateWifiFirmware", &other)),
		}
	}

	/// Device clock, uptime, and last downtime, all in nanoseconds.
	pub async fn get_info(&self) -> Result<(u64, u64, u64), Error> {
		match self.inner.connection.request(Message::GetInfo).await? {
			Message::StateInfo {
				time,
				uptime,
				downtime,
			} => Ok((time, uptime, downtime)),
			other => Err(unexpected("StateInfo", &other)),
		}
	}

	/// Location id and label.
	pub async fn get_location(&self) -> Result<(LifxIdent, String), Error> {
		match self.inner.connection.request(Message::GetLocation).await? {
			Message::StateLocation {
				location, label, ..
			} => Ok((location, label.0)),
			other => Err(unexpected("StateLocation", &other)),
		}
	}

	/// Group id and label.
	pub async fn get_group(&self) -> Result<(LifxIdent, String), Error> {
		match self.inner.connection.request(Message::GetGroup).await? {
			Message::StateGroup { group, label, .. } => Ok((group, label.0)),
			other => Err(unexpected("StateGroup", &other)),
		}
	}

	pub async fn echo(&self, payload: [u8; 64]) -> Result<[u8; 64], Error> {
		match self
			.inner
			.connection
			.request(Message::EchoRequest {
				payload: EchoPayload(payload),
			})
			.await?
		{
			Message::EchoResponse { payload } => Ok(payload.0),
			other => Err(unexpected("EchoResponse", &other)),
		}
	}

	/// Runs a firmware waveform (blink/breathe/etc) on the device.
	#[allow(clippy::too_many_arguments)]
	pub async fn set_waveform(
		&self,
		transient: bool,
		color: Color,
		period_ms: u32,
		cycles: f32,
		skew_ratio: i16,
		waveform: Waveform,
	) -> Result<(), Error> {
		self.inner
			.connection
			.request_ack(Message::SetWaveform {
				reserved: 0,
				transient,
				color: color.to_hsbk(),
				period: period_ms,
				cycles,
				skew_ratio,
				waveform,
			})
			.await
	}

	// ---- infrared ----

	pub async fn get_infrared(&self) -> Result<u16, Error> {
		match self
			.inner
			.connection
			.request(Message::LightGetInfrared)
			.await?
		{
			Message::LightStateInfrared { brightness } => Ok(brightness),
			other => Err(unexpected("LightStateInfrared", &other)),
		}
	}

	pub async fn set_infrared(&self, brightness: u16) -> Result<(), Error> {
		self.inner
			.connection
			.request_ack(Message::LightSetInfrared { brightness })
			.await
	}

	// ---- HEV ----

	/// Configured duration, seconds remaining, and pre-cycle power state.
	pub async fn get_hev_cycle(&self) -> Result<(u32, u32, bool), Error> {
		match self.inner.connection.request(Message::GetHevCycle).await? {
			Message::StateHevCycle {
				duration,
				remaining,
				last_power,
			} => Ok((duration, remaining, last_power)),
			other => Err(unexpected("StateHevCycle", &other)),
		}
	}

	pub async fn set_hev_cycle(&self, enable: bool, duration_s: u32) -> Result<(), Error> {
		self.inner
			.connection
			.request_ack(Message::SetHevCycle {
				enable,
				duration: duration_s,
			})
			.await
	}

	// ---- multizone ----

	/// Reads every zone color on a multizone device.
	///
	/// Uses the extended messages when the firmware supports them; otherwise assembles the legacy
	/// multi-response answer to GetColorZones.
	pub async fn get_zone_colors(&self) -> Result<Vec<Color>, Error> {
		let caps = self.capabilities().await?;
		if !caps.has_multizone {
			return Err(Error::UnsupportedCommand(
				"Device has no zones".to_owned(),
			));
		}
		if caps.has_extended_multizone {
			self.get_zone_colors_extended().await
		} else {
			self.get_zone_colors_legacy().await
		}
	}

	async fn get_zone_colors_extended(&self) -> Result<Vec<Color>, Error> {
		let responses = self
			.inner
			.connection
			.request_all(Message::GetExtendedColorZones)
			.await?;

		let mut zones: Vec<Option<Color>> = Vec::new();
		for response in responses {
			if let Message::StateExtendedColorZones {
				zones_count,
				zone_index,
				colors_count,
				colors,
			} = response
			{
				zones.resize(zones_count as usize, None);
				for offset in 0..(colors_count as usize).min(EXTENDED_ZONE_SLOTS) {
					let idx = zone_index as usize + offset;
					if idx < zones.len() {
						zones[idx] = Some(Color::from_hsbk(colors[offset]));
					}
				}
			}
		}
		finish_zones(zones)
	}

	async fn get_zone_colors_legacy(&self) -> Result<Vec<Color>, Error> {
		let responses = self
			.inner
			.connection
			.request_all(Message::GetColorZones {
				start_index: 0,
				end_index: 255,
			})
			.await?;

		let mut zones: Vec<Option<Color>> = Vec::new();
		for response in responses {
			match response {
				Message::StateZone {
					count,
					index,
					color,
				} => {
					zones.resize(count as usize, None);
					if (index as usize) < zones.len() {
						zones[index as usize] = Some(Color::from_hsbk(color));
					}
				}
				Message::StateMultiZone {
					count,
					index,
					colors,
				} => {
					zones.resize(count as usize, None);
					for (offset, color) in colors.iter().enumerate() {
						let idx = index as usize + offset;
						if idx < zones.len() {
							zones[idx] = Some(Color::from_hsbk(*color));
						}
					}
				}
				_ => {}
			}
		}
		finish_zones(zones)
	}

	/// Writes zone colors with one extended message per 82-zone block, or per-zone legacy
	/// messages on old firmware.
	pub async fn set_zone_colors(&self, colors: &[Color], duration_ms: u32) -> Result<(), Error> {
		let caps = self.capabilities().await?;
		if !caps.has_multizone {
			return Err(Error::UnsupportedCommand(
				"Device has no zones".to_owned(),
			));
		}

		if caps.has_extended_multizone {
			for (block, chunk) in colors.chunks(EXTENDED_ZONE_SLOTS).enumerate() {
				let mut slots = Box::new([Color::white(3500, 0.0).to_hsbk(); EXTENDED_ZONE_SLOTS]);
				for (slot, color) in slots.iter_mut().zip(chunk.iter()) {
					*slot = color.to_hsbk();
				}
				self.inner
					.connection
					.request_ack(Message::SetExtendedColorZones {
						duration: duration_ms,
						apply: ApplicationRequest::Apply,
						zone_index: (block * EXTENDED_ZONE_SLOTS) as u16,
						colors_count: chunk.len() as u8,
						colors: slots,
					})
					.await?;
			}
			Ok(())
		} else {
			let last = colors.len().saturating_sub(1);
			for (idx, color) in colors.iter().enumerate() {
				let apply = if idx == last {
					ApplicationRequest::Apply
				} else {
					ApplicationRequest::NoApply
				};
				self.inner
					.connection
					.request_ack(Message::SetColorZones {
						start_index: idx as u8,
						end_index: idx as u8,
						color: color.to_hsbk(),
						duration: duration_ms,
						apply,
					})
					.await?;
			}
			Ok(())
		}
	}

	/// Starts the firmware Move effect on a multizone device, scrolling its current zone colors.
	///
	/// `speed_ms` is the time for one full scroll; `duration_ns` of zero runs forever.
	pub async fn set_multizone_effect(
		&self,
		effect_type: MultiZoneEffectType,
		speed_ms: u32,
		duration_ns: u64,
		direction: MoveDirection,
	) -> Result<(), Error> {
		if !self.capabilities().await?.has_multizone {
			return Err(Error::UnsupportedCommand(
				"Device has no zones".to_owned(),
			));
		}
		let mut parameters = [0u32; EFFECT_PARAMETER_SLOTS];
		parameters[1] = direction as u32;
		self.inner
			.connection
			.request_ack(Message::SetMultiZoneEffect {
				instanceid: rand::random(),
				effect_type,
				speed: speed_ms,
				duration: duration_ns,
				parameters,
			})
			.await
	}

	/// The firmware effect currently running on a multizone device.
	pub async fn get_multizone_effect(&self) -> Result<MultiZoneEffectType, Error> {
		match self
			.inner
			.connection
			.request(Message::GetMultiZoneEffect)
			.await?
		{
			Message::StateMultiZoneEffect { effect_type, .. } => Ok(effect_type),
			other => Err(unexpected("StateMultiZoneEffect", &other)),
		}
	}

	// ---- matrix ----

	/// The tiles in the device chain, in chain order.
	pub async fn get_device_chain(&self) -> Result<Vec<TileDevice>, Error> {
		match self
			.inner
			.connection
			.request(Message::GetDeviceChain)
			.await?
		{
			Message::StateDeviceChain {
				tile_devices,
				tile_devices_count,
				..
			} => Ok(tile_devices
				.iter()
				.take(tile_devices_count as usize)
				.copied()
				.collect()),
			other => Err(unexpected("StateDeviceChain", &other)),
		}
	}

	/// The canvas geometry of a matrix device.
	pub async fn matrix_geometry(&self) -> Result<MatrixGeometry, Error> {
		let tiles = self.get_device_chain().await?;
		if tiles.is_empty() {
			return Err(Error::UnsupportedCommand(
				"Device reported an empty tile chain".to_owned(),
			));
		}
		Ok(MatrixGeometry {
			tile_count: tiles.len(),
			tile_width: tiles[0].width as usize,
			tile_height: tiles[0].height as usize,
		})
	}

	/// Reads the 64 pixels of one tile.
	pub async fn get64(&self, tile_index: u8) -> Result<Vec<Color>, Error> {
		let responses = self
			.inner
			.connection
			.request_all(Message::Get64 {
				tile_index,
				length: 1,
				x: 0,
				y: 0,
				width: 8,
			})
			.await?;
		for response in responses {
			if let Message::State64 { colors, .. } = response {
				return Ok(colors.iter().map(|c| Color::from_hsbk(*c)).collect());
			}
		}
		Err(Error::ProtocolError("No State64 in reply".to_owned()))
	}

	/// Writes up to 64 pixels to one tile.
	pub async fn set64(
		&self,
		tile_index: u8,
		colors: &[Color],
		duration_ms: u32,
	) -> Result<(), Error> {
		let mut slots = Box::new([Color::white(3500, 0.0).to_hsbk(); TILE_SLOTS]);
		for (slot, color) in slots.iter_mut().zip(colors.iter()) {
			*slot = color.to_hsbk();
		}
		self.inner
			.connection
			.request_ack(Message::Set64 {
				tile_index,
				length: 1,
				x: 0,
				y: 0,
				width: 8,
				duration: duration_ms,
				colors: slots,
			})
			.await
	}

	/// Starts a firmware effect (Morph or Flame) on a matrix device.
	pub async fn set_tile_effect(
		&self,
		effect_type: TileEffectType,
		speed_ms: u32,
		duration_ns: u64,
		palette: &[Color],
	) -> Result<(), Error> {
		if !self.capabilities().await?.has_matrix {
			return Err(Error::UnsupportedCommand(
				"Device has no pixel grid".to_owned(),
			));
		}
		let mut slots = Box::new([Color::white(3500, 0.0).to_hsbk(); TILE_EFFECT_PALETTE_SLOTS]);
		for (slot, color) in slots.iter_mut().zip(palette.iter()) {
			*slot = color.to_hsbk();
		}
		self.inner
			.connection
			.request_ack(Message::SetTileEffect {
				instanceid: rand::random(),
				effect_type,
				speed: speed_ms,
				duration: duration_ns,
				parameters: [0; EFFECT_PARAMETER_SLOTS],
				palette_count: palette.len().min(TILE_EFFECT_PALETTE_SLOTS) as u8,
				palette: slots,
			})
			.await
	}

	/// The firmware effect currently running on a matrix device.
	pub async fn get_tile_effect(&self) -> Result<TileEffectType, Error> {
		match self.inner.connection.request(Message::GetTileEffect).await? {
			Message::StateTileEffect { effect_type, .. } => Ok(effect_type),
			other => Err(unexpected("StateTileEffect", &other)),
		}
	}

	// ---- ceiling ----

	/// The canvas index of the dedicated uplight zone on a ceiling device.
	pub async fn uplight_zone_index(&self) -> Result<usize, Error> {
		let geometry = self.matrix_geometry().await?;
		Ok(geometry.pixel_count() - 1)
	}

	/// Sets the uplight zone of a ceiling device, leaving the downlight untouched.
	pub async fn set_uplight(&self, color: Color, duration_ms: u32) -> Result<(), Error> {
		let geometry = self.matrix_geometry().await?;
		let uplight = geometry.pixel_count() - 1;
		let tile = uplight / (geometry.tile_width * geometry.tile_height);
		let mut pixels = self.get64(tile as u8).await?;
		let within = uplight % (geometry.tile_width * geometry.tile_height);
		if within < pixels.len() {
			pixels[within] = color;
		}
		self.set64(tile as u8, &pixels, duration_ms).await
	}

	/// Sets every downlight zone of a ceiling device to one color.
	pub async fn set_downlight(&self, color: Color, duration_ms: u32) -> Result<(), Error> {
		let geometry = self.matrix_geometry().await?;
		let pixel_count = geometry.pixel_count();
		let per_tile = geometry.tile_width * geometry.tile_height;
		for tile in 0..geometry.tile_count {
			let start = tile * per_tile;
			let mut pixels = vec![color; per_tile];
			// The last canvas pixel is the uplight; keep its current value
			if start + per_tile >= pixel_count {
				let current = self.get64(tile as u8).await?;
				if let Some(last) = current.last() {
					pixels[per_tile - 1] = *last;
				}
			}
			self.set64(tile as u8, &pixels, duration_ms).await?;
		}
		Ok(())
	}
}

impl std::fmt::Debug for Device {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("Device")
			.field("serial", &self.serial().to_string())
			.field("ip", &self.ip())
			.finish()
	}
}

fn unexpected(expected: &str, got: &Message) -> Error {
	Error::ProtocolError(format!("Expected {}, got {:?}", expected, got))
}

fn finish_zones(zones: Vec<Option<Color>>) -> Result<Vec<Color>, Error> {
	if zones.is_empty() {
		return Err(Error::ProtocolError(
			"Device reported no zones".to_owned(),
		));
	}
	Ok(zones
		.into_iter()
		.map(|z| z.unwrap_or(Color::white(3500, 0.0)))
		.collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_prefers_most_specific_capability() {
		let mut caps = ProductCapability::unknown();
		assert_eq!(DeviceKind::from_capabilities(&caps), DeviceKind::Light);

		caps.has_matrix = true;
		assert_eq!(DeviceKind::from_capabilities(&caps), DeviceKind::Matrix);

		caps.has_ceiling = true;
		assert_eq!(DeviceKind::from_capabilities(&caps), DeviceKind::Ceiling);
	}

	#[test]
	fn matrix_canvas_stacks_tiles_vertically() {
		let geometry = MatrixGeometry {
			tile_count: 3,
			tile_width: 8,
			tile_height: 8,
		};
		assert_eq!(geometry.canvas_width(), 8);
		assert_eq!(geometry.canvas_height(), 24);
		assert_eq!(geometry.pixel_count(), 192);
	}
}
