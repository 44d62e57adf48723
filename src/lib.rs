//! Async client for controlling LIFX lights on your LAN.
//!
//! Lights speak a 36-byte-header binary protocol over UDP port 56700.  More info can be found
//! here: https://lan.developer.lifx.com/
//!
//! The crate has three layers:
//!
//! * a wire codec ([RawMessage], [Message]) for bit-exact pack/unpack of headers and typed
//!   payloads,
//! * a connection engine ([DeviceConnection], backed by a pooled per-device [Connection]) that
//!   serializes request streams, demultiplexes responses by sequence number, and retries with
//!   exponential backoff and full jitter,
//! * an effect conductor ([Conductor]) that captures device state, drives per-pixel frame
//!   generators through direct-UDP [Animator]s, and restores state when effects end.
//!
//! # Discovery
//!
//! To discover lights on your LAN, use [discover] (a broadcast [Message::GetService] on port
//! 56700), or [find_by_ip]/[find_by_serial]/[find_by_label] for a specific device.
//!
//! # Reserved fields
//!
//! When *constructing* packets, every reserved field is set to zero.  However, it's possible to
//! receive packets with these fields set to non-zero values.  Be conservative in what you send,
//! and liberal in what you accept.
//!
//! # Unknown values
//!
//! It's common to see packets from LIFX bulbs that don't match the documented protocol.  These
//! are suspected to be internal messages used by official LIFX apps.  They unpack to
//! [Error::UnknownMessageType].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lifx_lan::{discover, Conductor, EffectRainbow};
//!
//! # async fn demo() -> Result<(), lifx_lan::Error> {
//! let lights = discover(Duration::from_secs(3), None).await?.collect().await;
//!
//! let conductor = Conductor::new();
//! let rainbow = Arc::new(EffectRainbow::default());
//! conductor.start(rainbow, &lights).await?;
//!
//! tokio::time::sleep(Duration::from_secs(30)).await;
//! conductor.stop(&lights).await?;
//! # Ok(())
//! # }
//! ```

mod api;
mod color;
mod device;
mod error;
mod misc;
mod msg;
mod product;
mod protocol;
mod read_write;
mod string;

pub mod animation;
pub mod effects;
pub mod net;

pub use api::{
	discover, discover_default, find_by_ip, find_by_label, find_by_serial, DeviceStream,
};
pub use color::{
	ApplicationRequest, Color, MultiZoneEffectType, TileEffectType, Waveform, HSBK,
	KELVIN_AMBER, KELVIN_COOL, KELVIN_NEUTRAL, MAX_KELVIN, MIN_KELVIN,
};
pub use device::{Device, DeviceKind, MatrixGeometry, MoveDirection};
pub use error::Error;
pub use misc::{EchoPayload, LifxIdent, PowerLevel, Serial, Service};
pub use msg::{
	BuildOptions, Message, MessageKind, RawMessage, TileDevice, EFFECT_PARAMETER_SLOTS,
	EXTENDED_ZONE_SLOTS, MAX_TILES_PER_CHAIN, TILE_EFFECT_PALETTE_SLOTS, TILE_SLOTS,
};
pub use product::{get_product_info, ProductCapability, ProductInfo};
pub use protocol::{Frame, FrameAddress, ProtocolHeader};
pub use read_write::{LittleEndianReader, LittleEndianWriter};
pub use string::{LifxStr, LifxString, ShortLifxString};

pub use animation::{Animator, AnimatorStats};
pub use effects::{
	capture_state, restore_state, Conductor, DeviceClass, DeviceSupport, Effect, EffectAurora,
	EffectColorloop, EffectFlame, EffectInfo, EffectProgress, EffectPulse, EffectRainbow,
	EffectRegistry, EffectSunrise, EffectSunset, Foreground, FrameContext, FrameEffect,
	FrameEngine, PreState, PulseMode, SunOrigin,
};
pub use net::{
	discover_devices, Connection, ConnectionPool, ConnectionPoolMetrics, DeviceConnection,
	DiscoveredDevice, MessageBuilder, UdpTransport, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT,
	LIFX_UDP_PORT, MAX_CONNECTIONS,
};
