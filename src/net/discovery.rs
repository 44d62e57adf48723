use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use get_if_addrs::{get_if_addrs, IfAddr, Ifv4Addr};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
	error::Error,
	misc::{Serial, Service},
	msg::{Message, RawMessage},
	net::builder::MessageBuilder,
	net::transport::{UdpTransport, LIFX_UDP_PORT},
};

/// Default discovery window.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

// Poll granularity while collecting StateService replies.
const DISCOVERY_POLL: Duration = Duration::from_millis(100);

/// One device found by broadcast discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveredDevice {
	pub serial: Serial,
	pub ip: IpAddr,
	pub port: u16,
}

fn broadcast_addresses(explicit: Option<IpAddr>) -> Result<Vec<SocketAddr>, Error> {
	if let Some(addr) = explicit {
		return Ok(vec![SocketAddr::new(addr, LIFX_UDP_PORT)]);
	}

	let mut addrs = Vec::new();
	for iface in get_if_addrs()
		.map_err(|e| Error::NetworkError(format!("Failed to enumerate interfaces: {}", e)))?
	{
		if let IfAddr::V4(Ifv4Addr {
			broadcast: Some(bcast),
			..
		}) = iface.addr
		{
			if iface.ip().is_loopback() {
				continue;
			}
			addrs.push(SocketAddr::new(IpAddr::V4(bcast), LIFX_UDP_PORT));
		}
	}
	if addrs.is_empty() {
		return Err(Error::NetworkError(
			"No broadcast-capable interfaces found".to_owned(),
		));
	}
	Ok(addrs)
}

/// Broadcasts GetService and collects every distinct device that answers within `timeout`.
///
/// When `broadcast_address` is None, the request goes out on every non-loopback IPv4 interface
/// broadcast address.
pub async fn discover_devices(
	timeout: Duration,
	broadcast_address: Option<IpAddr>,
) -> Result<Vec<DiscoveredDevice>, Error> {
	let mut found = Vec::new();
	let mut stream = discovery_stream(timeout, broadcast_address).await?;
	while let Some(device) = stream.next().await {
		found.push(device);
	}
	Ok(found)
}

/// A stream of devices answering a discovery broadcast, yielded as their replies arrive.
pub struct DiscoveryStream {
	rx: mpsc::Receiver<DiscoveredDevice>,
}

impl DiscoveryStream {
	pub async fn next(&mut self) -> Option<DiscoveredDevice> {
		self.rx.recv().await
	}
}

/// Starts a discovery broadcast and returns the reply stream.
pub async fn discovery_stream(
	timeout: Duration,
	broadcast_address: Option<IpAddr>,
) -> Result<DiscoveryStream, Error> {
	let targets = broadcast_addresses(broadcast_address)?;
	let transport = UdpTransport::open(0, true).await?;
	let builder = MessageBuilder::new();
	let sequence = builder.next_sequence();
	let raw = RawMessage::build(
		&crate::msg::BuildOptions {
			target: None,
			ack_required: false,
			res_required: true,
			sequence,
			source: builder.source(),
		},
		Message::GetService,
	)?;
	let bytes = raw.pack()?;

	for target in &targets {
		debug!(target = %target, "discovering devices");
		transport.send(&bytes, *target).await?;
	}

	let source = builder.source();
	let (tx, rx) = mpsc::channel(32);
	tokio::spawn(async move {
		let deadline = Instant::now() + timeout;
		let mut seen: HashSet<Serial> = HashSet::new();

		loop {
			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				break;
			}
			let (bytes, peer) = match transport.recv(DISCOVERY_POLL.min(remaining)).await {
				Ok(received) => received,
				Err(Error::Timeout(_)) => continue,
				Err(e) => {
					warn!(error = %e, "discovery receive failed");
					break;
				}
			};
			let raw = match RawMessage::unpack(&bytes) {
				Ok(raw) => raw,
				Err(e) => {
					debug!(peer = %peer, error = %e, "ignoring malformed datagram");
					continue;
				}
			};
			// Our own broadcast can loop back; it has no concrete target
			if raw.frame.source != source {
				continue;
			}
			let serial = raw.target_serial();
			if serial.is_broadcast() || !seen.insert(serial) {
				continue;
			}
			match Message::from_raw(&raw) {
				Ok(Message::StateService { service, port }) => {
					if service != Service::UDP || port == 0 {
						continue;
					}
					let device = DiscoveredDevice {
						serial,
						ip: peer.ip(),
						port: port as u16,
					};
					if tx.send(device).await.is_err() {
						break;
					}
				}
				Ok(_) => continue,
				Err(e) => {
					debug!(peer = %peer, error = %e, "ignoring unparseable reply");
					continue;
				}
			}
		}
	});

	Ok(DiscoveryStream { rx })
}
