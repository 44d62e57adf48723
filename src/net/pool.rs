use std::net::IpAddr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::{
	error::Error,
	misc::Serial,
	msg::{Message, MessageKind, RawMessage},
	net::connection::{Connection, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT},
	net::transport::LIFX_UDP_PORT,
};

/// Default pool capacity.
pub const MAX_CONNECTIONS: usize = 32;

/// Performance counters for the connection pool.
#[derive(Debug, Clone, Default)]
pub struct ConnectionPoolMetrics {
	/// Connection found in the pool and reused
	pub hits: u64,
	/// New connection created
	pub misses: u64,
	/// LRU evictions performed
	pub evictions: u64,
	/// Total connection requests
	pub total_requests: u64,
	/// Duration of each eviction
	pub eviction_times: Vec<Duration>,
}

impl ConnectionPoolMetrics {
	pub fn hit_rate(&self) -> f64 {
		if self.total_requests == 0 {
			return 0.0;
		}
		self.hits as f64 / self.total_requests as f64
	}

	pub fn avg_eviction_time(&self) -> Duration {
		if self.eviction_times.is_empty() {
			return Duration::ZERO;
		}
		self.eviction_times.iter().sum::<Duration>() / self.eviction_times.len() as u32
	}
}

#[derive(Debug)]
struct PoolEntry {
	serial: Serial,
	conn: Arc<Connection>,
	last_used: Instant,
}

#[derive(Debug)]
struct PoolInner {
	// Insertion order doubles as recency order: index 0 is least recently used
	entries: Vec<PoolEntry>,
	metrics: ConnectionPoolMetrics,
}

/// An LRU cache of live [Connection]s, shared by every [DeviceConnection] handle.
///
/// On a miss a new connection is opened; at capacity the least-recently-used connection is closed
/// before the new one is inserted.  Hits bump the entry to most-recently-used.
#[derive(Debug)]
pub struct ConnectionPool {
	max_connections: usize,
	inner: Mutex<PoolInner>,
}

impl ConnectionPool {
	pub fn new(max_connections: usize) -> ConnectionPool {
		debug!(max_connections, "connection pool created");
		ConnectionPool {
			max_connections,
			inner: Mutex::new(PoolInner {
				entries: Vec::new(),
				metrics: ConnectionPoolMetrics::default(),
			}),
		}
	}

	/// Gets the pooled connection for `serial`, opening one if needed.
	pub async fn get_connection(
		&self,
		serial: Serial,
		ip: IpAddr,
		port: u16,
		max_retries: u32,
		timeout: Duration,
	) -> Result<Arc<Connection>, Error> {
		let mut inner = self.inner.lock().await;
		inner.metrics.total_requests += 1;

		if let Some(pos) = inner.entries.iter().position(|e| e.serial == serial) {
			if inner.entries[pos].conn.is_open() {
				inner.metrics.hits += 1;
				// Move to most-recently-used position
				let mut entry = inner.entries.remove(pos);
				entry.last_used = Instant::now();
				let conn = entry.conn.clone();
				inner.entries.push(entry);
				debug!(serial = %serial, ip = %ip, pool_size = inner.entries.len(), "connection reused");
				return Ok(conn);
			}
			// A closed connection is useless; drop the entry and fall through to reopen
			inner.entries.remove(pos);
		}

		inner.metrics.misses += 1;

		let conn = Arc::new(Connection::open(serial, ip, port, max_retries, timeout).await?);

		if inner.entries.len() >= self.max_connections {
			let eviction_start = Instant::now();
			let lru = inner.entries.remove(0);
			lru.conn.close();
			let elapsed = eviction_start.elapsed();
			inner.metrics.evictions += 1;
			inner.metrics.eviction_times.push(elapsed);
			debug!(
				serial = %lru.serial,
				eviction_us = elapsed.as_micros() as u64,
				idle_ms = lru.last_used.elapsed().as_millis() as u64,
				remaining_pool_size = inner.entries.len(),
				"evicted least-recently-used connection"
			);
		}

		inner.entries.push(PoolEntry {
			serial,
			conn: conn.clone(),
			last_used: Instant::now(),
		});
		debug!(serial = %serial, ip = %ip, pool_size = inner.entries.len(), "connection created");
		Ok(conn)
	}

	/// Closes every pooled connection.
	pub async fn close_all(&self) {
		let mut inner = self.inner.lock().await;
		let closed = inner.entries.len();
		for entry in inner.entries.drain(..) {
			entry.conn.close();
		}
		debug!(connections_closed = closed, "pool drained");
	}

	/// A snapshot of the pool counters.
	pub async fn metrics(&self) -> ConnectionPoolMetrics {
		self.inner.lock().await.metrics.clone()
	}

	/// The serials currently pooled, least recently used first.
	pub async fn pooled_serials(&self) -> Vec<Serial> {
		self.inner
			.lock()
			.await
			.entries
			.iter()
			.map(|e| e.serial)
			.collect()
	}

	/// The process-wide pool, created on first use.
	pub fn shared() -> Arc<ConnectionPool> {
		let mut guard = SHARED_POOL.lock().unwrap_or_else(|e| e.into_inner());
		guard
			.get_or_insert_with(|| Arc::new(ConnectionPool::new(MAX_CONNECTIONS)))
			.clone()
	}

	/// Tears down the process-wide pool.  Call at application shutdown.
	pub async fn close_shared() {
		let taken = SHARED_POOL
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.take();
		if let Some(pool) = taken {
			pool.close_all().await;
		}
	}
}

static SHARED_POOL: StdMutex<Option<Arc<ConnectionPool>>> = StdMutex::new(None);

/// A lightweight handle to one device's connection.
///
/// Holds only addressing data and request defaults; the live connection is resolved from the pool
/// on every call.  Many handles may resolve to the same pooled connection, whose internal
/// serialization guard makes that safe.
#[derive(Debug, Clone)]
pub struct DeviceConnection {
	pub serial: Serial,
	pub ip: IpAddr,
	pub port: u16,
	pub max_retries: u32,
	pub timeout: Duration,
	pool: Option<Arc<ConnectionPool>>,
}

impl DeviceConnection {
	pub fn new(serial: Serial, ip: IpAddr) -> DeviceConnection {
		DeviceConnection {
			serial,
			ip,
			port: LIFX_UDP_PORT,
			max_retries: DEFAULT_MAX_RETRIES,
			timeout: DEFAULT_REQUEST_TIMEOUT,
			pool: None,
		}
	}

	/// Uses a private pool instead of the process-wide one.
	pub fn with_pool(serial: Serial, ip: IpAddr, pool: Arc<ConnectionPool>) -> DeviceConnection {
		DeviceConnection {
			pool: Some(pool),
			..DeviceConnection::new(serial, ip)
		}
	}

	fn pool(&self) -> Arc<ConnectionPool> {
		match &self.pool {
			Some(pool) => pool.clone(),
			None => ConnectionPool::shared(),
		}
	}

	async fn resolve(&self) -> Result<Arc<Connection>, Error> {
		self.pool()
			.get_connection(
				self.serial,
				self.ip,
				self.port,
				self.max_retries,
				self.timeout,
			)
			.await
	}

	/// Sends a request and returns the first response.
	///
	/// GET messages travel the response path; SET messages travel the acknowledged path and
	/// return the acknowledgement.
	pub async fn request(&self, msg: Message) -> Result<Message, Error> {
		match msg.kind() {
			MessageKind::Set => {
				let conn = self.resolve().await?;
				conn.request_ack(msg, Some(self.timeout), Some(self.max_retries))
					.await?;
				Ok(Message::Acknowledgement { seq: 0 })
			}
			_ => {
				let conn = self.resolve().await?;
				let (_raw, message) = conn
					.request_first(msg, Some(self.timeout), Some(self.max_retries))
					.await?;
				Ok(message)
			}
		}
	}

	/// Sends a GET request and returns every response collected for it.
	pub async fn request_all(&self, msg: Message) -> Result<Vec<Message>, Error> {
		let conn = self.resolve().await?;
		let responses = conn
			.request_stream(msg, Some(self.timeout), Some(self.max_retries))
			.await?;
		Ok(responses
			.into_iter()
			.map(|(_raw, message)| message)
			.collect())
	}

	/// Like [DeviceConnection::request_all], but also returns the raw frames.
	pub async fn request_raw(&self, msg: Message) -> Result<Vec<(RawMessage, Message)>, Error> {
		let conn = self.resolve().await?;
		conn.request_stream(msg, Some(self.timeout), Some(self.max_retries))
			.await
	}

	/// Sends a SET request and waits for the acknowledgement.
	pub async fn request_ack(&self, msg: Message) -> Result<(), Error> {
		let conn = self.resolve().await?;
		conn.request_ack(msg, Some(self.timeout), Some(self.max_retries))
			.await
	}

	/// Fires a message with no response or acknowledgement requested.
	pub async fn send(&self, msg: Message) -> Result<(), Error> {
		let conn = self.resolve().await?;
		conn.send(msg).await
	}
}
