use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::{
	animation::animator::Animator,
	color::{Color, HSBK},
	device::Device,
	effects::base::Effect,
	error::Error,
	misc::Serial,
};

/// Timing and layout handed to [FrameEffect::generate_frame] for one device on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
	/// Seconds since the effect started
	pub elapsed_s: f64,
	/// Index of this device in the participants list
	pub device_index: usize,
	/// Number of pixels (1 for a light, N for zones, W*H for matrix)
	pub pixel_count: usize,
	/// Width in pixels (pixel_count for 1D, W for matrix)
	pub canvas_width: usize,
	/// Height in pixels (1 for 1D, H for matrix)
	pub canvas_height: usize,
}

struct EngineState {
	participants: Vec<Device>,
	animators: Vec<Animator>,
	last_frames: HashMap<Serial, Vec<Color>>,
}

/// Shared runtime state of one frame effect: participants, their animators, the last generated
/// frames, and the stop signal.
///
/// The conductor publishes participants and animators here before the play task starts; the frame
/// loop only ever reads what was published, so `add_lights` appending mid-run is visible at the
/// next tick without any coordination beyond the state lock.
pub struct FrameEngine {
	fps: f64,
	duration: Option<Duration>,
	stop_tx: watch::Sender<bool>,
	stop_rx: watch::Receiver<bool>,
	state: StdMutex<EngineState>,
}

impl FrameEngine {
	pub fn new(fps: f64, duration: Option<Duration>) -> FrameEngine {
		let (stop_tx, stop_rx) = watch::channel(false);
		FrameEngine {
			fps,
			duration,
			stop_tx,
			stop_rx,
			state: StdMutex::new(EngineState {
				participants: Vec::new(),
				animators: Vec::new(),
				last_frames: HashMap::new(),
			}),
		}
	}

	pub fn fps(&self) -> f64 {
		self.fps
	}

	pub fn duration(&self) -> Option<Duration> {
		self.duration
	}

	/// Signals the frame loop to exit; the in-flight sleep wakes immediately.
	pub fn stop(&self) {
		self.stop_tx.send_replace(true);
	}

	fn lock(&self) -> std::sync::MutexGuard<EngineState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Publishes the initial participants and their animators.
	pub fn publish(&self, participants: Vec<Device>, animators: Vec<Animator>) {
		let mut state = self.lock();
		state.participants = participants;
		state.animators = animators;
		state.last_frames.clear();
	}

	/// Appends participants added while the effect runs.
	pub fn extend(&self, participants: Vec<Device>, animators: Vec<Animator>) {
		let mut state = self.lock();
		state.participants.extend(participants);
		state.animators.extend(animators);
	}

	/// Removes one participant, closing and popping its animator by position.  Returns how many
	/// participants remain.
	pub fn remove_participant(&self, serial: Serial) -> usize {
		let mut state = self.lock();
		if let Some(idx) = state
			.participants
			.iter()
			.position(|p| p.serial() == serial)
		{
			state.participants.remove(idx);
			if idx < state.animators.len() {
				let mut animator = state.animators.remove(idx);
				animator.close();
			}
		}
		state.last_frames.remove(&serial);
		state.participants.len()
	}

	/// Closes every animator.  Safe to call more than once.
	pub fn close_animators(&self) {
		let mut state = self.lock();
		for animator in state.animators.iter_mut() {
			animator.close();
		}
		state.animators.clear();
	}

	pub fn participants(&self) -> Vec<Device> {
		self.lock().participants.clone()
	}

	pub fn participant_count(&self) -> usize {
		self.lock().participants.len()
	}

	/// The most recent frame generated for a device, if any.
	pub fn last_frame(&self, serial: Serial) -> Option<Vec<Color>> {
		self.lock().last_frames.get(&serial).cloned()
	}
}

/// A frame-generator effect: fixed FPS, one frame of [Color]s per participant per tick.
pub trait FrameEffect: Effect {
	fn engine(&self) -> &FrameEngine;

	/// Generates one device's frame.  Must return exactly `ctx.pixel_count` colors; anything
	/// else is a contract violation that ends the effect.
	fn generate_frame(&self, ctx: &FrameContext) -> Vec<Color>;
}

/// Runs the fixed-FPS loop for a frame effect until its duration expires or [FrameEngine::stop]
/// fires.
///
/// Each tick walks the participants in order, builds a [FrameContext], generates and converts
/// the frame, and hands it to the participant's animator.  The remaining tick time is spent in a
/// cancellable sleep, which doubles as the cancellation point.
pub async fn run_frame_loop<E>(effect: &E) -> Result<(), Error>
where
	E: FrameEffect + ?Sized,
{
	let engine = effect.engine();
	engine.stop_tx.send_replace(false);
	let mut stop_rx = engine.stop_rx.clone();

	let frame_interval = Duration::from_secs_f64(1.0 / engine.fps());
	let start = Instant::now();

	loop {
		if *stop_rx.borrow() {
			break;
		}

		let tick_start = Instant::now();
		let elapsed_s = (tick_start - start).as_secs_f64();

		if let Some(duration) = engine.duration() {
			if elapsed_s >= duration.as_secs_f64() {
				debug!(effect = effect.name(), elapsed_s, "duration reached");
				break;
			}
		}

		{
			let mut state = engine.lock();
			let EngineState {
				participants,
				animators,
				last_frames,
			} = &mut *state;

			for (idx, animator) in animators.iter_mut().enumerate() {
				let ctx = FrameContext {
					elapsed_s,
					device_index: idx,
					pixel_count: animator.pixel_count(),
					canvas_width: animator.canvas_width(),
					canvas_height: animator.canvas_height(),
				};

				let frame = effect.generate_frame(&ctx);
				if frame.len() != ctx.pixel_count {
					error!(
						effect = effect.name(),
						got = frame.len(),
						expected = ctx.pixel_count,
						"generate_frame violated the pixel-count contract"
					);
					return Err(Error::ProtocolError(format!(
						"Effect {} generated {} pixels for a {}-pixel device",
						effect.name(),
						frame.len(),
						ctx.pixel_count
					)));
				}

				let wire: Vec<HSBK> = frame.iter().map(|c| c.to_hsbk()).collect();
				animator.send_frame(&wire)?;

				if let Some(device) = participants.get(idx) {
					last_frames.insert(device.serial(), frame);
				}
			}
		}

		let spent = tick_start.elapsed();
		let sleep = frame_interval.saturating_sub(spent);
		if !sleep.is_zero() {
			tokio::select! {
				_ = tokio::time::sleep(sleep) => {}
				changed = stop_rx.changed() => {
					if changed.is_err() || *stop_rx.borrow() {
						break;
					}
				}
			}
		}
	}

	Ok(())
}
