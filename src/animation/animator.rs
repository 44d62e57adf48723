use std::net::SocketAddr;

use tracing::trace;

use crate::{
	animation::packets::{light_templates, matrix_templates, multizone_templates, FrameTemplate},
	color::HSBK,
	device::{Device, DeviceKind},
	error::Error,
	net::builder::MessageBuilder,
	net::transport::UdpTransport,
};

/// Counters for one animator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimatorStats {
	pub frames_sent: u64,
	pub packets_sent: u64,
}

/// Pushes per-pixel frames to one device with minimum overhead.
///
/// On creation the animator queries the device once for its geometry and pre-packs one byte
/// buffer per frame packet.  Each frame then only rewrites the color bytes in place and fires
/// the datagrams: no ACKs, no retries.  Lost frames are a non-issue at 20-60 FPS.
///
/// The animator owns its UDP socket exclusively for the lifetime of the effect on this device,
/// keeping frame traffic off the request/response socket.
pub struct Animator {
	transport: UdpTransport,
	peer: SocketAddr,
	templates: Vec<FrameTemplate>,
	pixel_count: usize,
	canvas_width: usize,
	canvas_height: usize,
	stats: AnimatorStats,
	closed: bool,
}

impl Animator {
	/// Builds the animator matching the device's kind.
	///
	/// `duration_ms` is the per-frame transition hint baked into every packet; the engine passes
	/// roughly 1.5x the frame interval so firmware interpolation papers over scheduling jitter.
	pub async fn for_device(device: &Device, duration_ms: u32) -> Result<Animator, Error> {
		match device.kind().await? {
			DeviceKind::Matrix | DeviceKind::Ceiling => {
				Animator::for_matrix(device, duration_ms).await
			}
			DeviceKind::MultiZone => Animator::for_multizone(device, duration_ms).await,
			_ => Animator::for_light(device, duration_ms).await,
		}
	}

	/// An animator for a single-pixel light: one SetColor per frame.
	pub async fn for_light(device: &Device, duration_ms: u32) -> Result<Animator, Error> {
		let source = MessageBuilder::new().source();
		let templates = light_templates(device.serial(), source, duration_ms)?;
		Animator::assemble(device, templates, 1, 1, 1).await
	}

	/// An animator for a multizone strip: one extended zone write addressing every zone.
	pub async fn for_multizone(device: &Device, duration_ms: u32) -> Result<Animator, Error> {
		let zone_count = device.get_zone_colors().await?.len();
		let source = MessageBuilder::new().source();
		let templates = multizone_templates(device.serial(), source, duration_ms, zone_count)?;
		Animator::assemble(device, templates, zone_count, zone_count, 1).await
	}

	/// An animator for a matrix chain: one Set64 per tile per frame.
	pub async fn for_matrix(device: &Device, duration_ms: u32) -> Result<Animator, Error> {
		let geometry = device.matrix_geometry().await?;
		let source = MessageBuilder::new().source();
		let templates = matrix_templates(
			device.serial(),
			source,
			duration_ms,
			geometry.tile_count,
			geometry.tile_width,
			geometry.tile_height,
		)?;
		Animator::assemble(
			device,
			templates,
			geometry.pixel_count(),
			geometry.canvas_width(),
			geometry.canvas_height(),
		)
		.await
	}

	async fn assemble(
		device: &Device,
		templates: Vec<FrameTemplate>,
		pixel_count: usize,
		canvas_width: usize,
		canvas_height: usize,
	) -> Result<Animator, Error> {
		let transport = UdpTransport::open(0, false).await?;
		Ok(Animator {
			transport,
			peer: SocketAddr::new(device.ip(), device.connection().port),
			templates,
			pixel_count,
			canvas_width,
			canvas_height,
			stats: AnimatorStats::default(),
			closed: false,
		})
	}

	pub fn pixel_count(&self) -> usize {
		self.pixel_count
	}

	pub fn canvas_width(&self) -> usize {
		self.canvas_width
	}

	pub fn canvas_height(&self) -> usize {
		self.canvas_height
	}

	pub fn stats(&self) -> AnimatorStats {
		self.stats
	}

	/// Sends one frame of wire-format colors.  `frame` must hold [Animator::pixel_count] entries.
	pub fn send_frame(&mut self, frame: &[HSBK]) -> Result<(), Error> {
		if self.closed {
			return Err(Error::ConnectionError("Animator closed".to_owned()));
		}
		if frame.len() != self.pixel_count {
			return Err(Error::ProtocolError(format!(
				"Frame has {} pixels, device has {}",
				frame.len(),
				self.pixel_count
			)));
		}
		for template in self.templates.iter_mut() {
			template.update_colors(frame);
			self.transport.try_send(template.bytes(), self.peer)?;
			self.stats.packets_sent += 1;
		}
		self.stats.frames_sent += 1;
		Ok(())
	}

	/// Drops the socket.  Further sends fail.
	pub fn close(&mut self) {
		if !self.closed {
			self.closed = true;
			trace!(peer = %self.peer, frames = self.stats.frames_sent, "animator closed");
		}
	}
}
