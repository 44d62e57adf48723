use std::sync::atomic::{AtomicU8, Ordering};

use rand::Rng;

use crate::{
	error::Error,
	misc::Serial,
	msg::{BuildOptions, Message, RawMessage},
};

/// Assembles [RawMessage]s for one connection: a stable source id plus a wrapping sequence
/// counter.
///
/// The source identifier is chosen at random and is non-zero; a zero source invites broadcast
/// replies that every client on the subnet receives.
pub struct MessageBuilder {
	source: u32,
	sequence: AtomicU8,
}

impl MessageBuilder {
	pub fn new() -> MessageBuilder {
		let mut rng = rand::thread_rng();
		MessageBuilder {
			source: rng.gen_range(1..=u32::MAX),
			sequence: AtomicU8::new(0),
		}
	}

	pub fn source(&self) -> u32 {
		self.source
	}

	/// Allocates the next sequence number, wrapping at 255.
	pub fn next_sequence(&self) -> u8 {
		self.sequence.fetch_add(1, Ordering::Relaxed)
	}

	/// Builds a message addressed to `target` with this builder's source id.
	pub fn build(
		&self,
		msg: Message,
		target: Serial,
		ack_required: bool,
		res_required: bool,
		sequence: u8,
	) -> Result<RawMessage, Error> {
		RawMessage::build(
			&BuildOptions {
				target: Some(target),
				ack_required,
				res_required,
				sequence,
				source: self.source,
			},
			msg,
		)
	}
}

impl Default for MessageBuilder {
	fn default() -> MessageBuilder {
		MessageBuilder::new()
	}
}
