//! A fake LIFX device on a local UDP socket, for driving the connection engine and the
//! conductor without hardware.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use lifx_lan::{
	BuildOptions, ConnectionPool, Device, DeviceConnection, Message, MultiZoneEffectType,
	PowerLevel, RawMessage, Serial, Service, TileDevice, TileEffectType,
	EFFECT_PARAMETER_SLOTS, EXTENDED_ZONE_SLOTS, HSBK, TILE_EFFECT_PALETTE_SLOTS, TILE_SLOTS,
};

pub const WARM_WHITE: HSBK = HSBK {
	hue: 0,
	saturation: 0,
	brightness: 52428,
	kelvin: 2700,
};

/// Starting configuration for a [FakeBulb].
pub struct BulbConfig {
	pub serial: Serial,
	pub vendor: u32,
	pub product: u32,
	pub firmware: u32,
	pub power: bool,
	pub color: HSBK,
	pub label: String,
	/// Non-empty makes the device multizone
	pub zones: Vec<HSBK>,
	/// Non-empty makes the device a matrix; each tile is 64 pixels
	pub tiles: Vec<Vec<HSBK>>,
}

impl BulbConfig {
	pub fn bulb(serial: &str) -> BulbConfig {
		BulbConfig {
			serial: serial.parse().unwrap(),
			vendor: 1,
			product: 27,
			firmware: (3 << 16) | 70,
			power: true,
			color: WARM_WHITE,
			label: "Kitchen".to_owned(),
			zones: Vec::new(),
			tiles: Vec::new(),
		}
	}

	/// A 16-zone Z2 strip with extended multizone firmware.
	pub fn strip(serial: &str) -> BulbConfig {
		let mut config = BulbConfig::bulb(serial);
		config.product = 32;
		config.firmware = (2 << 16) | 80;
		config.zones = (0..16)
			.map(|i| HSBK {
				hue: i * 4096,
				saturation: 65535,
				brightness: 32768,
				kelvin: 3500,
			})
			.collect();
		config
	}

	/// A 16-zone Z strip on firmware too old for the extended messages.
	pub fn legacy_strip(serial: &str) -> BulbConfig {
		let mut config = BulbConfig::strip(serial);
		config.product = 31;
		config.firmware = (2 << 16) | 60;
		config
	}

	/// A single-tile 8x8 matrix device.
	pub fn tile(serial: &str) -> BulbConfig {
		let mut config = BulbConfig::bulb(serial);
		config.product = 55;
		config.tiles = vec![vec![WARM_WHITE; TILE_SLOTS]];
		config
	}
}

struct BulbState {
	serial: Serial,
	port: u16,
	vendor: u32,
	product: u32,
	firmware: u32,
	power: PowerLevel,
	color: HSBK,
	label: String,
	zones: Vec<HSBK>,
	tiles: Vec<Vec<HSBK>>,
	multizone_effect: MultiZoneEffectType,
	tile_effect: TileEffectType,
	received: HashMap<u16, usize>,
	/// Silently swallow this many datagrams (they still count as received)
	drop_requests: usize,
	/// Reply with an off-by-one sequence for this many datagrams
	corrupt_sequence: usize,
	/// Answer this packet type with StateUnhandled
	unhandled_type: Option<u16>,
}

/// A fake device: parses real packets, keeps real state, answers with real packets.
pub struct FakeBulb {
	pub addr: SocketAddr,
	pub serial: Serial,
	state: Arc<Mutex<BulbState>>,
}

impl FakeBulb {
	pub async fn spawn(config: BulbConfig) -> FakeBulb {
		let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let addr = socket.local_addr().unwrap();
		let serial = config.serial;

		let state = Arc::new(Mutex::new(BulbState {
			serial,
			port: addr.port(),
			vendor: config.vendor,
			product: config.product,
			firmware: config.firmware,
			power: PowerLevel::from(config.power),
			color: config.color,
			label: config.label,
			zones: config.zones,
			tiles: config.tiles,
			multizone_effect: MultiZoneEffectType::Off,
			tile_effect: TileEffectType::Off,
			received: HashMap::new(),
			drop_requests: 0,
			corrupt_sequence: 0,
			unhandled_type: None,
		}));

		let task_state = state.clone();
		tokio::spawn(async move {
			let mut buf = [0u8; 1024];
			loop {
				let (nbytes, peer) = match socket.recv_from(&mut buf).await {
					Ok(received) => received,
					Err(_) => return,
				};
				let raw = match RawMessage::unpack(&buf[..nbytes]) {
					Ok(raw) => raw,
					Err(_) => continue,
				};

				let replies = {
					let mut state = task_state.lock().await;
					*state
						.received
						.entry(raw.protocol_header.typ)
						.or_insert(0) += 1;

					if state.drop_requests > 0 {
						state.drop_requests -= 1;
						continue;
					}
					handle(&mut state, &raw)
				};

				for reply in replies {
					let _ = socket.send_to(&reply, peer).await;
				}
			}
		});

		FakeBulb {
			addr,
			serial,
			state,
		}
	}

	/// A device handle talking to this bulb through a private pool.
	pub fn device(&self, pool: &Arc<ConnectionPool>) -> Device {
		let mut connection = DeviceConnection::with_pool(self.serial, self.addr.ip(), pool.clone());
		connection.port = self.addr.port();
		connection.timeout = Duration::from_secs(2);
		connection.max_retries = 3;
		Device::with_connection(connection)
	}

	pub async fn received(&self, pkt_type: u16) -> usize {
		*self.state.lock().await.received.get(&pkt_type).unwrap_or(&0)
	}

	pub async fn power(&self) -> bool {
		self.state.lock().await.power.is_on()
	}

	pub async fn color(&self) -> HSBK {
		self.state.lock().await.color
	}

	pub async fn zones(&self) -> Vec<HSBK> {
		self.state.lock().await.zones.clone()
	}

	pub async fn tile_pixels(&self, tile: usize) -> Vec<HSBK> {
		self.state.lock().await.tiles[tile].clone()
	}

	pub async fn set_power_state(&self, on: bool) {
		self.state.lock().await.power = PowerLevel::from(on);
	}

	pub async fn drop_next(&self, count: usize) {
		self.state.lock().await.drop_requests = count;
	}

	pub async fn corrupt_next(&self, count: usize) {
		self.state.lock().await.corrupt_sequence = count;
	}

	pub async fn refuse(&self, pkt_type: u16) {
		self.state.lock().await.unhandled_type = Some(pkt_type);
	}
}

fn reply(state: &BulbState, incoming: &RawMessage, sequence: u8, msg: Message) -> Vec<u8> {
	RawMessage::build(
		&BuildOptions {
			target: Some(state.serial),
			ack_required: false,
			res_required: false,
			sequence,
			source: incoming.frame.source,
		},
		msg,
	)
	.unwrap()
	.pack()
	.unwrap()
}

fn handle(state: &mut BulbState, raw: &RawMessage) -> Vec<Vec<u8>> {
	let mut sequence = raw.frame_addr.sequence;
	if state.corrupt_sequence > 0 {
		state.corrupt_sequence -= 1;
		sequence = sequence.wrapping_add(1);
	}

	if let Some(unhandled) = state.unhandled_type {
		if raw.protocol_header.typ == unhandled {
			return vec![reply(
				state,
				raw,
				sequence,
				Message::StateUnhandled {
					unhandled_type: unhandled,
				},
			)];
		}
	}

	let msg = match Message::from_raw(raw) {
		Ok(msg) => msg,
		Err(_) => return Vec::new(),
	};

	let mut replies = Vec::new();
	let mut answered = true;

	match msg {
		Message::GetService => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateService {
					service: Service::UDP,
					port: u32::from(state.port),
				},
			));
		}
		Message::GetVersion => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateVersion {
					vendor: state.vendor,
					product: state.product,
					version: 0,
				},
			));
		}
		Message::GetHostFirmware => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateHostFirmware {
					build: 0,
					reserved: 0,
					version: state.firmware,
				},
			));
		}
		Message::GetWifiFirmware => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateWifiFirmware {
					build: 0,
					reserved: 0,
					version: state.firmware,
				},
			));
		}
		Message::GetWifiInfo => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateWifiInfo {
					signal: 1.0e-5,
					tx: 1024,
					rx: 4096,
					reserved: 0,
				},
			));
		}
		Message::GetMultiZoneEffect => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateMultiZoneEffect {
					instanceid: 1,
					effect_type: state.multizone_effect,
					speed: 3000,
					duration: 0,
					parameters: [0; EFFECT_PARAMETER_SLOTS],
				},
			));
		}
		Message::SetMultiZoneEffect { effect_type, .. } => {
			state.multizone_effect = effect_type;
		}
		Message::GetTileEffect => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateTileEffect {
					instanceid: 1,
					effect_type: state.tile_effect,
					speed: 3000,
					duration: 0,
					parameters: [0; EFFECT_PARAMETER_SLOTS],
					palette_count: 0,
					palette: Box::new([WARM_WHITE; TILE_EFFECT_PALETTE_SLOTS]),
				},
			));
		}
		Message::SetTileEffect { effect_type, .. } => {
			state.tile_effect = effect_type;
		}
		Message::GetPower => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StatePower { level: state.power },
			));
		}
		Message::SetPower { level } => {
			state.power = level;
		}
		Message::GetLabel => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateLabel {
					label: lifx_lan::LifxString::new(&state.label),
				},
			));
		}
		Message::LightGet => {
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::LightState {
					color: state.color,
					reserved: 0,
					power: state.power,
					label: lifx_lan::LifxString::new(&state.label),
					reserved2: 0,
				},
			));
		}
		Message::LightSetColor { color, .. } => {
			state.color = color;
		}
		Message::LightSetPower { level, .. } => {
			state.power = PowerLevel(level);
		}
		Message::SetWaveform { .. } => {}
		Message::GetColorZones { .. } => {
			// Legacy multi-response answer: one StateMultiZone per 8 zones
			let count = state.zones.len() as u8;
			for chunk_start in (0..state.zones.len()).step_by(8) {
				let mut colors = Box::new([WARM_WHITE; 8]);
				for offset in 0..8 {
					if let Some(color) = state.zones.get(chunk_start + offset) {
						colors[offset] = *color;
					}
				}
				replies.push(reply(
					state,
					raw,
					sequence,
					Message::StateMultiZone {
						count,
						index: chunk_start as u8,
						colors,
					},
				));
			}
		}
		Message::SetColorZones {
			start_index,
			end_index,
			color,
			..
		} => {
			for idx in start_index..=end_index {
				if let Some(zone) = state.zones.get_mut(idx as usize) {
					*zone = color;
				}
			}
		}
		Message::GetExtendedColorZones => {
			let mut colors = Box::new([WARM_WHITE; EXTENDED_ZONE_SLOTS]);
			for (slot, color) in colors.iter_mut().zip(state.zones.iter()) {
				*slot = *color;
			}
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateExtendedColorZones {
					zones_count: state.zones.len() as u16,
					zone_index: 0,
					colors_count: state.zones.len() as u8,
					colors,
				},
			));
		}
		Message::SetExtendedColorZones {
			zone_index,
			colors_count,
			colors,
			..
		} => {
			for offset in 0..colors_count as usize {
				let idx = zone_index as usize + offset;
				if let Some(zone) = state.zones.get_mut(idx) {
					*zone = colors[offset];
				}
			}
		}
		Message::GetDeviceChain => {
			let mut tile_devices = Box::new([TileDevice::default(); 16]);
			for (slot, _tile) in tile_devices.iter_mut().zip(state.tiles.iter()) {
				*slot = TileDevice {
					width: 8,
					height: 8,
					device_vendor: state.vendor,
					device_product: state.product,
					firmware_version: state.firmware,
					..TileDevice::default()
				};
			}
			replies.push(reply(
				state,
				raw,
				sequence,
				Message::StateDeviceChain {
					start_index: 0,
					tile_devices,
					tile_devices_count: state.tiles.len() as u8,
				},
			));
		}
		Message::Get64 { tile_index, .. } => {
			if let Some(tile) = state.tiles.get(tile_index as usize) {
				let mut colors = Box::new([WARM_WHITE; TILE_SLOTS]);
				for (slot, color) in colors.iter_mut().zip(tile.iter()) {
					*slot = *color;
				}
				replies.push(reply(
					state,
					raw,
					sequence,
					Message::State64 {
						tile_index,
						x: 0,
						y: 0,
						width: 8,
						colors,
					},
				));
			}
		}
		Message::Set64 {
			tile_index, colors, ..
		} => {
			if let Some(tile) = state.tiles.get_mut(tile_index as usize) {
				for (pixel, color) in tile.iter_mut().zip(colors.iter()) {
					*pixel = *color;
				}
			}
		}
		_ => {
			answered = false;
		}
	}

	if raw.frame_addr.ack_required && answered {
		replies.push(reply(
			state,
			raw,
			sequence,
			Message::Acknowledgement { seq: sequence },
		));
	}

	replies
}
