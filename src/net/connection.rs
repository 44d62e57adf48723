use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{
	error::Error,
	misc::Serial,
	msg::{Message, RawMessage},
	net::builder::MessageBuilder,
	net::transport::{UdpTransport, LIFX_UDP_PORT},
};

/// Default number of retry attempts beyond the first send.
pub const DEFAULT_MAX_RETRIES: u32 = 8;

/// Default overall request timeout, spread geometrically across all attempts.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

// Base for the full-jitter retry sleep, in seconds.
const RETRY_SLEEP_BASE: f64 = 0.1;

// Idle receive poll within one attempt; clamped by the remaining attempt budget.
const IDLE_POLL: Duration = Duration::from_millis(100);

const STATE_UNHANDLED: u16 = 223;

/// The outcome of one send attempt.
enum Attempt {
	Responses(Vec<(RawMessage, Message)>),
	TimedOut,
}

/// All traffic to one device.
///
/// A connection owns a UDP socket, a source id, and a wrapping sequence counter.  Requests on one
/// connection are serialized by an internal guard: matching replies by sequence number alone is
/// not sufficient when a late reply from a previous attempt arrives during a retry, so at most one
/// request stream may be active per socket.  Concurrency across devices comes from one connection
/// per device.
pub struct Connection {
	serial: StdMutex<Serial>,
	ip: IpAddr,
	port: u16,
	transport: UdpTransport,
	builder: MessageBuilder,
	request_guard: Mutex<()>,
	open: AtomicBool,
	pub(crate) default_timeout: Duration,
	pub(crate) default_max_retries: u32,
}

impl Connection {
	/// Opens a connection to `ip`, addressed to `serial`.
	///
	/// A broadcast serial is permitted: the concrete serial is adopted from the first reply.
	pub async fn open(
		serial: Serial,
		ip: IpAddr,
		port: u16,
		max_retries: u32,
		timeout: Duration,
	) -> Result<Connection, Error> {
		let transport = UdpTransport::open(0, false).await?;
		let conn = Connection {
			serial: StdMutex::new(serial),
			ip,
			port,
			transport,
			builder: MessageBuilder::new(),
			request_guard: Mutex::new(()),
			open: AtomicBool::new(true),
			default_timeout: timeout,
			default_max_retries: max_retries,
		};
		debug!(serial = %serial, ip = %ip, port, "connection opened");
		Ok(conn)
	}

	pub fn is_open(&self) -> bool {
		self.open.load(Ordering::Acquire)
	}

	pub fn close(&self) {
		if self.open.swap(false, Ordering::AcqRel) {
			debug!(serial = %self.serial(), ip = %self.ip, "connection closed");
		}
	}

	/// The device serial this connection addresses.  Starts as the value given to [open] and is
	/// replaced once if that value was the broadcast placeholder and a reply revealed the real
	/// serial.
	pub fn serial(&self) -> Serial {
		*self.serial.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub fn ip(&self) -> IpAddr {
		self.ip
	}

	pub fn source(&self) -> u32 {
		self.builder.source()
	}

	fn peer(&self) -> SocketAddr {
		SocketAddr::new(self.ip, self.port)
	}

	fn learn_serial(&self, observed: Serial) {
		if observed.is_broadcast() {
			return;
		}
		let mut serial = self.serial.lock().unwrap_or_else(|e| e.into_inner());
		if serial.is_broadcast() {
			debug!(serial = %observed, ip = %self.ip, "adopted serial from reply");
			*serial = observed;
		}
	}

	/// Sends one message with an explicit sequence, without waiting for anything.
	async fn send_packet(
		&self,
		msg: Message,
		ack_required: bool,
		res_required: bool,
		sequence: u8,
	) -> Result<(), Error> {
		if !self.is_open() {
			return Err(Error::ConnectionError("Connection not open".to_owned()));
		}
		let raw = self
			.builder
			.build(msg, self.serial(), ack_required, res_required, sequence)?;
		self.transport.send(&raw.pack()?, self.peer()).await
	}

	fn jitter_sleep(attempt: u32) -> Duration {
		// Full jitter: uniform over the exponential envelope, so synchronized clients
		// decorrelate instead of retrying in bursts.
		let envelope = RETRY_SLEEP_BASE * 2f64.powi(attempt as i32);
		Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..envelope))
	}

	fn base_timeout(overall: Duration, max_retries: u32) -> f64 {
		// Geometric series: 1 + 2 + 4 + ... + 2^n = 2^(n+1) - 1, so the attempts sum to
		// the overall timeout.
		let total_weight = 2f64.powi(max_retries as i32 + 1) - 1.0;
		overall.as_secs_f64() / total_weight
	}

	fn attempt_timeout(base: f64, attempt: u32) -> Duration {
		Duration::from_secs_f64(base * 2f64.powi(attempt as i32))
	}

	/// Sends a GET request and returns every response collected for it, in arrival order.
	///
	/// The first matching response opens a collection window bounded by the attempt deadline, so
	/// multi-response commands (extended zone reads, tile reads) are drained to completion without
	/// a length hint.  Attempts that produce nothing retry on a geometric schedule with
	/// full-jitter sleeps; an exhausted budget fails with [Error::Timeout].
	pub async fn request_stream(
		&self,
		request: Message,
		timeout: Option<Duration>,
		max_retries: Option<u32>,
	) -> Result<Vec<(RawMessage, Message)>, Error> {
		self.request_inner(request, timeout, max_retries, false).await
	}

	/// Like [Connection::request_stream], but returns as soon as the first matching response
	/// arrives instead of draining the collection window.
	///
	/// This is the path for single-response requests, where waiting out the window would only
	/// add latency.
	pub async fn request_first(
		&self,
		request: Message,
		timeout: Option<Duration>,
		max_retries: Option<u32>,
	) -> Result<(RawMessage, Message), Error> {
		let mut responses = self.request_inner(request, timeout, max_retries, true).await?;
		if responses.is_empty() {
			return Err(Error::Timeout(format!("No response from {}", self.ip)));
		}
		Ok(responses.swap_remove(0))
	}

	async fn request_inner(
		&self,
		request: Message,
		timeout: Option<Duration>,
		max_retries: Option<u32>,
		first_only: bool,
	) -> Result<Vec<(RawMessage, Message)>, Error> {
		if !self.is_open() {
			return Err(Error::ConnectionError("Connection not open".to_owned()));
		}
		let timeout = timeout.unwrap_or(self.default_timeout);
		let max_retries = max_retries.unwrap_or(self.default_max_retries);

		// Serialize requests on the same connection to prevent response mixing
		let _guard = self.request_guard.lock().await;

		let base = Self::base_timeout(timeout, max_retries);
		let expected = request.expected_response();

		for attempt in 0..=max_retries {
			let current = Self::attempt_timeout(base, attempt);
			let sequence = self.builder.next_sequence();
			self.send_packet(request.clone(), false, true, sequence)
				.await?;

			match self
				.run_attempt(sequence, current, expected, first_only)
				.await?
			{
				Attempt::Responses(results) => return Ok(results),
				Attempt::TimedOut => {
					trace!(
						attempt = attempt + 1,
						of = max_retries + 1,
						ip = %self.ip,
						"attempt timed out"
					);
					if attempt < max_retries {
						tokio::time::sleep(Self::jitter_sleep(attempt)).await;
					}
				}
			}
		}

		Err(Error::Timeout(format!(
			"No response from {} after {} attempts",
			self.ip,
			max_retries + 1
		)))
	}

	async fn run_attempt(
		&self,
		sequence: u8,
		attempt_timeout: Duration,
		expected: Option<u16>,
		first_only: bool,
	) -> Result<Attempt, Error> {
		let deadline = Instant::now() + attempt_timeout;
		let mut results: Vec<(RawMessage, Message)> = Vec::new();

		loop {
			// The deadline is checked every time control returns here, including right after a
			// receive: a reply can land exactly as the window closes.
			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				if results.is_empty() {
					return Ok(Attempt::TimedOut);
				}
				// Had responses; the collection window is done
				return Ok(Attempt::Responses(results));
			}

			let recv_timeout = IDLE_POLL.min(remaining);
			let (bytes, _peer) = match self.transport.recv(recv_timeout).await {
				Ok(received) => received,
				Err(Error::Timeout(_)) => continue,
				Err(e) => return Err(e),
			};

			let raw = RawMessage::unpack(&bytes)?;

			if raw.frame_addr.sequence != sequence {
				// Not our response (stale attempt or unrelated traffic); drop it
				continue;
			}

			if raw.protocol_header.typ == STATE_UNHANDLED {
				return Err(Error::UnsupportedCommand(
					"Device does not support the requested command (received StateUnhandled)"
						.to_owned(),
				));
			}

			if let Some(expected) = expected {
				if raw.protocol_header.typ != expected {
					return Err(Error::ProtocolError(format!(
						"Received unexpected packet type {} for sequence {}, expected {}",
						raw.protocol_header.typ, sequence, expected
					)));
				}
			}

			self.learn_serial(raw.target_serial());
			let message = Message::from_raw(&raw)?;
			results.push((raw, message));

			if first_only {
				return Ok(Attempt::Responses(results));
			}
		}
	}

	/// Sends a SET request with `ack_required` and returns once any packet with the matching
	/// sequence arrives.  Retry schedule and failure modes match [Connection::request_stream].
	pub async fn request_ack(
		&self,
		request: Message,
		timeout: Option<Duration>,
		max_retries: Option<u32>,
	) -> Result<(), Error> {
		if !self.is_open() {
			return Err(Error::ConnectionError("Connection not open".to_owned()));
		}
		let timeout = timeout.unwrap_or(self.default_timeout);
		let max_retries = max_retries.unwrap_or(self.default_max_retries);

		let _guard = self.request_guard.lock().await;

		let base = Self::base_timeout(timeout, max_retries);

		for attempt in 0..=max_retries {
			let current = Self::attempt_timeout(base, attempt);
			let sequence = self.builder.next_sequence();
			self.send_packet(request.clone(), true, false, sequence)
				.await?;

			let deadline = Instant::now() + current;
			let acked = loop {
				let remaining = deadline.saturating_duration_since(Instant::now());
				if remaining.is_zero() {
					break false;
				}

				let recv_timeout = IDLE_POLL.min(remaining);
				let (bytes, _peer) = match self.transport.recv(recv_timeout).await {
					Ok(received) => received,
					Err(Error::Timeout(_)) => continue,
					Err(e) => return Err(e),
				};

				let raw = RawMessage::unpack(&bytes)?;
				if raw.frame_addr.sequence != sequence {
					continue;
				}
				if raw.protocol_header.typ == STATE_UNHANDLED {
					return Err(Error::UnsupportedCommand(
						"Device does not support the requested command (received StateUnhandled)"
							.to_owned(),
					));
				}

				// Any packet with a matching sequence acknowledges the set
				self.learn_serial(raw.target_serial());
				break true;
			};

			if acked {
				return Ok(());
			}
			if attempt < max_retries {
				tokio::time::sleep(Self::jitter_sleep(attempt)).await;
			}
		}

		Err(Error::Timeout(format!(
			"No acknowledgement from {} after {} attempts",
			self.ip,
			max_retries + 1
		)))
	}

	/// Fires a message without requesting a response or acknowledgement.
	pub async fn send(&self, msg: Message) -> Result<(), Error> {
		let sequence = self.builder.next_sequence();
		self.send_packet(msg, false, false, sequence).await
	}
}

impl std::fmt::Debug for Connection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("Connection")
			.field("serial", &self.serial().to_string())
			.field("ip", &self.ip)
			.field("port", &self.port)
			.field("open", &self.is_open())
			.finish()
	}
}

/// Constructs a connection with library defaults.
pub async fn connect(serial: Serial, ip: IpAddr) -> Result<Connection, Error> {
	Connection::open(
		serial,
		ip,
		LIFX_UDP_PORT,
		DEFAULT_MAX_RETRIES,
		DEFAULT_REQUEST_TIMEOUT,
	)
	.await
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn attempt_timeouts_sum_to_overall() {
		let overall = Duration::from_secs_f64(0.5);
		let max_retries = 2;
		let base = Connection::base_timeout(overall, max_retries);

		let total: f64 = (0..=max_retries)
			.map(|attempt| base * 2f64.powi(attempt as i32))
			.sum();
		assert!((total - overall.as_secs_f64()).abs() < 1e-9);
	}

	#[test]
	fn jitter_stays_inside_envelope() {
		for attempt in 0..5 {
			for _ in 0..100 {
				let sleep = Connection::jitter_sleep(attempt);
				let envelope = RETRY_SLEEP_BASE * 2f64.powi(attempt as i32);
				assert!(sleep.as_secs_f64() < envelope);
			}
		}
	}
}
