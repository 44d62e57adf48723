use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::Error;

/// The UDP port LIFX devices listen on.
pub const LIFX_UDP_PORT: u16 = 56700;

// Largest documented message (StateDeviceChain) is 918 bytes including the header.
const RECV_BUF_SIZE: usize = 1024;

/// A single bidirectional UDP socket.
///
/// The transport does not validate peer identity.  Replies are matched by the target serial and
/// sequence number in the header instead, which holds up under NAT, multi-homed hosts, and
/// broadcast reply fan-in where the source address does not.
pub struct UdpTransport {
	socket: UdpSocket,
}

impl UdpTransport {
	/// Binds a socket on the given local port (0 for ephemeral), optionally enabling broadcast.
	pub async fn open(port: u16, broadcast: bool) -> Result<UdpTransport, Error> {
		let socket = UdpSocket::bind(("0.0.0.0", port))
			.await
			.map_err(|e| Error::NetworkError(format!("Failed to bind UDP socket: {}", e)))?;
		if broadcast {
			socket
				.set_broadcast(true)
				.map_err(|e| Error::NetworkError(format!("Failed to enable broadcast: {}", e)))?;
		}
		Ok(UdpTransport { socket })
	}

	pub async fn send(&self, bytes: &[u8], addr: SocketAddr) -> Result<(), Error> {
		self.socket
			.send_to(bytes, addr)
			.await
			.map_err(|e| Error::NetworkError(format!("Failed to send to {}: {}", addr, e)))?;
		Ok(())
	}

	/// Sends without waiting for socket writability.  Frame animators use this path; a dropped
	/// datagram at 20-60 FPS is invisible.
	pub fn try_send(&self, bytes: &[u8], addr: SocketAddr) -> Result<(), Error> {
		match self.socket.try_send_to(bytes, addr) {
			Ok(_) => Ok(()),
			Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(()),
			Err(e) => Err(Error::NetworkError(format!(
				"Failed to send to {}: {}",
				addr, e
			))),
		}
	}

	/// Receives one datagram, failing [Error::Timeout] when none arrives in time.
	pub async fn recv(&self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr), Error> {
		let mut buf = [0u8; RECV_BUF_SIZE];
		match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
			Err(_) => Err(Error::Timeout(format!(
				"No datagram within {:?}",
				timeout
			))),
			Ok(Err(e)) => Err(Error::NetworkError(format!("Receive failed: {}", e))),
			Ok(Ok((nbytes, peer))) => Ok((buf[..nbytes].to_vec(), peer)),
		}
	}
}
