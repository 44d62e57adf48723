use std::net::IpAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::{
	device::Device,
	error::Error,
	misc::Serial,
	msg::Message,
	net::connection::Connection,
	net::discovery::{discovery_stream, DEFAULT_DISCOVERY_TIMEOUT},
	net::pool::DeviceConnection,
	net::transport::LIFX_UDP_PORT,
};

/// A stream of [Device]s found by broadcast discovery, yielded as replies arrive.
pub struct DeviceStream {
	rx: mpsc::Receiver<Device>,
}

impl DeviceStream {
	pub async fn next(&mut self) -> Option<Device> {
		self.rx.recv().await
	}

	/// Drains the stream into a list.
	pub async fn collect(mut self) -> Vec<Device> {
		let mut devices = Vec::new();
		while let Some(device) = self.next().await {
			devices.push(device);
		}
		devices
	}
}

/// Discovers devices on the local network.
///
/// Broadcasts on `broadcast_address`, or on every non-loopback interface when None.
pub async fn discover(
	timeout: Duration,
	broadcast_address: Option<IpAddr>,
) -> Result<DeviceStream, Error> {
	let mut found = discovery_stream(timeout, broadcast_address).await?;
	let (tx, rx) = mpsc::channel(32);
	tokio::spawn(async move {
		while let Some(discovered) = found.next().await {
			// Honor the port the device advertised in StateService
			let mut connection = DeviceConnection::new(discovered.serial, discovered.ip);
			connection.port = discovered.port;
			let device = Device::with_connection(connection);
			if tx.send(device).await.is_err() {
				break;
			}
		}
	});
	Ok(DeviceStream { rx })
}

/// Resolves the device at a known IP address by asking it directly for its service record.
///
/// The reply teaches us the device serial, so no broadcast is involved.
pub async fn find_by_ip(ip: IpAddr, timeout: Duration) -> Result<Device, Error> {
	let conn = Connection::open(Serial::BROADCAST, ip, LIFX_UDP_PORT, 2, timeout).await?;
	let responses = conn
		.request_stream(Message::GetService, Some(timeout), Some(2))
		.await
		.map_err(|e| match e {
			Error::Timeout(_) => Error::DeviceNotFound(format!("No device at {}", ip)),
			other => other,
		})?;
	conn.close();

	if responses.is_empty() {
		return Err(Error::DeviceNotFound(format!("No device at {}", ip)));
	}
	let serial = conn.serial();
	if serial.is_broadcast() {
		return Err(Error::DeviceNotFound(format!(
			"Device at {} never revealed a serial",
			ip
		)));
	}
	Ok(Device::connect(ip, serial))
}

/// Finds a device by serial via broadcast discovery.
pub async fn find_by_serial(serial: Serial, timeout: Duration) -> Result<Device, Error> {
	let mut stream = discover(timeout, None).await?;
	while let Some(device) = stream.next().await {
		if device.serial() == serial {
			return Ok(device);
		}
	}
	Err(Error::DeviceNotFound(format!(
		"No device with serial {}",
		serial
	)))
}

/// Finds a device by label via broadcast discovery.
///
/// Labels are read from every discovered device; the first match wins.
pub async fn find_by_label(label: &str, timeout: Duration) -> Result<Device, Error> {
	let mut stream = discover(timeout, None).await?;
	let mut lookups = Vec::new();
	while let Some(device) = stream.next().await {
		lookups.push(tokio::spawn(async move {
			match device.get_label().await {
				Ok(label) => Some((device, label)),
				Err(e) => {
					warn!(serial = %device.serial(), error = %e, "label lookup failed");
					None
				}
			}
		}));
	}
	for lookup in lookups {
		if let Ok(Some((device, found))) = lookup.await {
			if found == label {
				return Ok(device);
			}
		}
	}
	Err(Error::DeviceNotFound(format!(
		"No device labelled {:?}",
		label
	)))
}

/// Discovers with the default window on all interfaces.
pub async fn discover_default() -> Result<DeviceStream, Error> {
	discover(DEFAULT_DISCOVERY_TIMEOUT, None).await
}
