use std::io;
use thiserror::Error;

/// Errors raised by the codec, the connection engine, and the effect layer.
#[derive(Error, Debug)]
pub enum Error {
	/// This error means we were unable to parse a raw message because its type is unknown.
	///
	/// LIFX devices are known to send messages that are not officially documented, so this error
	/// type does not necessarily represent a bug.
	#[error("unknown message type: `{0}`")]
	UnknownMessageType(u16),

	/// This error means one of the message fields contains an invalid or unsupported value, or
	/// that a device replied with a packet type we did not ask for.
	#[error("protocol error: `{0}`")]
	ProtocolError(String),

	/// A send or receive failed at the socket level.
	#[error("network error: `{0}`")]
	NetworkError(String),

	/// The connection was used while closed, or could not be opened.
	#[error("connection error: `{0}`")]
	ConnectionError(String),

	/// No response (or acknowledgement) arrived within the retry budget.
	#[error("timed out: `{0}`")]
	Timeout(String),

	/// Discovery or lookup found no matching device.
	#[error("device not found: `{0}`")]
	DeviceNotFound(String),

	/// The device answered with StateUnhandled: it does not implement the command.
	#[error("unsupported command: `{0}`")]
	UnsupportedCommand(String),

	#[error("i/o error")]
	Io(#[from] io::Error),
}

impl From<std::convert::Infallible> for Error {
	fn from(_: std::convert::Infallible) -> Self {
		unreachable!()
	}
}
