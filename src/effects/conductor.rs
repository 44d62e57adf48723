use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::{
	animation::animator::Animator,
	color::Color,
	device::Device,
	effects::base::Effect,
	effects::state::{capture_state, restore_state, PreState},
	error::Error,
	misc::Serial,
};

/// One effect play task, shared by every participant of that effect.
///
/// The handle is taken by whichever path ends the effect first (stop, remove of the last
/// participant); identity comparisons use the Arc pointer.
#[derive(Default)]
pub struct SharedTask {
	handle: StdMutex<Option<JoinHandle<()>>>,
}

impl SharedTask {
	fn take(&self) -> Option<JoinHandle<()>> {
		self.handle.lock().unwrap_or_else(|e| e.into_inner()).take()
	}

	fn put(&self, handle: JoinHandle<()>) {
		self.handle
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.replace(handle);
	}
}

/// What the conductor knows about one participating device.
pub struct RunningEffect {
	pub effect: Arc<dyn Effect>,
	pub prestate: PreState,
	task: Arc<SharedTask>,
}

struct ConductorInner {
	running: Mutex<HashMap<Serial, RunningEffect>>,
}

/// The effect lifecycle authority.
///
/// Captures per-device pre-state before an effect starts, launches one play task per effect,
/// supports adding and removing participants at runtime, and restores captured state when the
/// effect stops or completes.  The `running` map is the single source of truth for what is
/// running where, and is only ever mutated under its lock.
#[derive(Clone)]
pub struct Conductor {
	inner: Arc<ConductorInner>,
}

impl Default for Conductor {
	fn default() -> Conductor {
		Conductor::new()
	}
}

impl Conductor {
	pub fn new() -> Conductor {
		Conductor {
			inner: Arc::new(ConductorInner {
				running: Mutex::new(HashMap::new()),
			}),
		}
	}

	/// The effect currently running on a device, or None when idle.
	pub async fn effect(&self, light: &Device) -> Option<Arc<dyn Effect>> {
		self.inner
			.running
			.lock()
			.await
			.get(&light.serial())
			.map(|running| running.effect.clone())
	}

	/// The most recent frame generated for a device under the current frame effect, or None.
	pub async fn get_last_frame(&self, light: &Device) -> Option<Vec<Color>> {
		let running = self.inner.running.lock().await;
		let effect = &running.get(&light.serial())?.effect;
		effect.frame_engine()?.last_frame(light.serial())
	}

	/// Starts an effect on the given lights.
	///
	/// Incompatible lights are dropped (with a log line); if none remain this is a no-op.
	/// Pre-state is captured for each surviving participant (or inherited from a compatible
	/// running effect), dark participants are powered on when the effect wants that, animators
	/// are built for frame effects, and the play task is launched.
	pub async fn start(
		&self,
		effect: Arc<dyn Effect>,
		participants: &[Device],
	) -> Result<(), Error> {
		let filtered = filter_compatible(&effect, participants).await?;
		if filtered.is_empty() {
			warn!(
				effect = effect.name(),
				total = participants.len(),
				"no compatible participants"
			);
			return Ok(());
		}

		let mut running = self.inner.running.lock().await;

		// Decide per light whether to inherit the current effect's pre-state or capture fresh
		let mut prestates: HashMap<Serial, PreState> = HashMap::new();
		let mut needs_capture: Vec<Device> = Vec::new();
		for light in &filtered {
			let serial = light.serial();
			match running.get(&serial) {
				Some(current) if effect.inherit_prestate(current.effect.as_ref()) => {
					debug!(
						serial = %serial,
						previous = current.effect.name(),
						new = effect.name(),
						"inheriting pre-state"
					);
					prestates.insert(serial, current.prestate.clone());
				}
				_ => needs_capture.push(light.clone()),
			}
		}

		for (serial, prestate) in capture_all(&needs_capture).await? {
			prestates.insert(serial, prestate);
		}

		// Power on dark participants from the effect's chosen starting color
		if effect.power_on() {
			for light in &filtered {
				let prestate = match prestates.get(&light.serial()) {
					Some(prestate) => prestate,
					None => continue,
				};
				if !prestate.power {
					let start_color = effect.from_poweroff_hsbk(light).await;
					light.set_color(start_color, 0).await?;
					light.set_power_duration(true, 0).await?;
				}
			}
		}

		// Frame effects get one animator per participant before the loop starts
		if let Some(engine) = effect.frame_engine() {
			let duration_ms = (1500.0 / engine.fps()) as u32;
			let mut animators = Vec::with_capacity(filtered.len());
			for light in &filtered {
				animators.push(Animator::for_device(light, duration_ms).await?);
			}
			engine.publish(filtered.clone(), animators);
		}

		effect.setup(&filtered).await?;

		// Register before spawning: the task may complete (and purge) arbitrarily soon
		let task = Arc::new(SharedTask::default());
		for light in &filtered {
			let serial = light.serial();
			let prestate = match prestates.get(&serial) {
				Some(prestate) => prestate.clone(),
				None => continue,
			};
			running.insert(
				serial,
				RunningEffect {
					effect: effect.clone(),
					prestate,
					task: task.clone(),
				},
			);
		}

		let handle = tokio::spawn(run_effect_with_cleanup(
			self.inner.clone(),
			effect.clone(),
			filtered.clone(),
		));
		task.put(handle);

		Ok(())
	}

	/// Stops effects on the given lights and restores their pre-state.
	pub async fn stop(&self, lights: &[Device]) -> Result<(), Error> {
		let mut to_restore: Vec<(Device, Arc<dyn Effect>, PreState)> = Vec::new();
		let mut handles: Vec<JoinHandle<()>> = Vec::new();
		let mut stopped_effects: Vec<Arc<dyn Effect>> = Vec::new();

		{
			let mut running = self.inner.running.lock().await;
			for light in lights {
				let serial = light.serial();
				let entry = match running.remove(&serial) {
					Some(entry) => entry,
					None => continue,
				};
				debug!(serial = %serial, effect = entry.effect.name(), "stopping effect");

				if let Some(engine) = entry.effect.frame_engine() {
					engine.stop();
				}
				if let Some(handle) = entry.task.take() {
					handle.abort();
					handles.push(handle);
				}
				if !stopped_effects
					.iter()
					.any(|e| Arc::ptr_eq(e, &entry.effect))
				{
					stopped_effects.push(entry.effect.clone());
				}
				to_restore.push((light.clone(), entry.effect.clone(), entry.prestate));
			}
		}

		// Let cancelled tasks unwind before touching the devices again
		for handle in handles {
			let _ = handle.await;
		}

		// Close each effect's animators exactly once
		for effect in &stopped_effects {
			if let Some(engine) = effect.frame_engine() {
				engine.close_animators();
			}
		}

		restore_all(
			to_restore
				.into_iter()
				.filter(|(_, effect, _)| effect.restore_on_complete())
				.map(|(light, _, prestate)| (light, prestate))
				.collect(),
		)
		.await;

		Ok(())
	}

	/// Adds lights to an already-running effect.
	///
	/// Lights already bound to this effect, and incompatible lights, are skipped.  New
	/// participants get fresh pre-state captures and (for frame effects) their own animators,
	/// and are registered under the existing play task.
	pub async fn add_lights(
		&self,
		effect: &Arc<dyn Effect>,
		lights: &[Device],
	) -> Result<(), Error> {
		let compatible = filter_compatible(effect, lights).await?;
		if compatible.is_empty() {
			return Ok(());
		}

		let mut running = self.inner.running.lock().await;

		let new_lights: Vec<Device> = compatible
			.into_iter()
			.filter(|light| match running.get(&light.serial()) {
				Some(current) => !Arc::ptr_eq(&current.effect, effect),
				None => true,
			})
			.collect();
		if new_lights.is_empty() {
			return Ok(());
		}

		// The effect must already be running somewhere to share its task
		let task = running
			.values()
			.find(|r| Arc::ptr_eq(&r.effect, effect))
			.map(|r| r.task.clone());
		let task = match task {
			Some(task) => task,
			None => {
				warn!(
					effect = effect.name(),
					lights = new_lights.len(),
					"add_lights on an effect that is not running"
				);
				return Ok(());
			}
		};

		let prestates = capture_all(&new_lights).await?;

		if let Some(engine) = effect.frame_engine() {
			let duration_ms = (1500.0 / engine.fps()) as u32;
			let mut animators = Vec::with_capacity(new_lights.len());
			for light in &new_lights {
				animators.push(Animator::for_device(light, duration_ms).await?);
			}
			engine.extend(new_lights.clone(), animators);
		}

		for (serial, prestate) in prestates {
			running.insert(
				serial,
				RunningEffect {
					effect: effect.clone(),
					prestate,
					task: task.clone(),
				},
			);
		}
		debug!(
			effect = effect.name(),
			added = new_lights.len(),
			"added participants"
		);

		Ok(())
	}

	/// Removes lights from whatever effect they run, leaving the other participants going.
	///
	/// Cancels the play task when the last participant of an effect is removed.
	pub async fn remove_lights(&self, lights: &[Device], restore: bool) -> Result<(), Error> {
		let mut to_restore: Vec<(Device, PreState)> = Vec::new();
		let mut handles: Vec<JoinHandle<()>> = Vec::new();

		{
			let mut running = self.inner.running.lock().await;
			for light in lights {
				let serial = light.serial();
				let entry = match running.remove(&serial) {
					Some(entry) => entry,
					None => continue,
				};

				if let Some(engine) = entry.effect.frame_engine() {
					engine.remove_participant(serial);
				}

				if restore {
					to_restore.push((light.clone(), entry.prestate.clone()));
				}

				// Was this the last participant of its effect?
				let remaining = running
					.values()
					.filter(|r| Arc::ptr_eq(&r.task, &entry.task))
					.count();
				if remaining == 0 {
					if let Some(engine) = entry.effect.frame_engine() {
						engine.stop();
					}
					if let Some(handle) = entry.task.take() {
						handle.abort();
						handles.push(handle);
					}
				}

				debug!(serial = %serial, effect = entry.effect.name(), restore, "removed participant");
			}
		}

		for handle in handles {
			let _ = handle.await;
		}

		restore_all(to_restore).await;
		Ok(())
	}
}

/// Runs the effect and unwinds its state afterwards, whichever way it ends.
///
/// A failing effect never propagates to its participants' peers: the error is logged, animators
/// are closed, the registry entries are purged, and pre-state is restored when the effect asks
/// for that.
async fn run_effect_with_cleanup(
	inner: Arc<ConductorInner>,
	effect: Arc<dyn Effect>,
	participants: Vec<Device>,
) {
	let result = effect.play(&participants).await;

	if let Some(engine) = effect.frame_engine() {
		engine.close_animators();
	}

	match &result {
		Ok(()) => debug!(
			effect = effect.name(),
			participants = participants.len(),
			"effect completed"
		),
		Err(e) => error!(
			effect = effect.name(),
			participants = participants.len(),
			error = %e,
			"effect failed"
		),
	}

	// Completion and failure unwind the same way: purge the registry and (when the effect
	// wants it) put the participants back
	let mut to_restore: Vec<(Device, PreState)> = Vec::new();
	{
		let mut running = inner.running.lock().await;
		for light in &participants {
			let serial = light.serial();
			let matches = running
				.get(&serial)
				.map(|r| Arc::ptr_eq(&r.effect, &effect))
				.unwrap_or(false);
			if !matches {
				continue;
			}
			if let Some(entry) = running.remove(&serial) {
				if effect.restore_on_complete() {
					to_restore.push((light.clone(), entry.prestate));
				}
			}
		}
	}
	restore_all(to_restore).await;
}

/// Runs every light through the effect's capability predicate in parallel, preserving order.
async fn filter_compatible(
	effect: &Arc<dyn Effect>,
	lights: &[Device],
) -> Result<Vec<Device>, Error> {
	let mut handles = Vec::with_capacity(lights.len());
	for light in lights {
		let effect = effect.clone();
		let light = light.clone();
		handles.push(tokio::spawn(async move {
			let compatible = effect.is_compatible(&light).await;
			(light, compatible)
		}));
	}

	let mut filtered = Vec::new();
	for handle in handles {
		let (light, compatible) = handle
			.await
			.map_err(|e| Error::ConnectionError(format!("compatibility task failed: {}", e)))?;
		match compatible {
			Ok(true) => filtered.push(light),
			Ok(false) => {
				debug!(serial = %light.serial(), effect = effect.name(), "incompatible, dropped");
			}
			Err(e) => {
				warn!(serial = %light.serial(), error = %e, "compatibility check failed, dropped");
			}
		}
	}
	Ok(filtered)
}

/// Captures pre-state for every light in parallel.
async fn capture_all(lights: &[Device]) -> Result<Vec<(Serial, PreState)>, Error> {
	let mut handles = Vec::with_capacity(lights.len());
	for light in lights {
		let light = light.clone();
		handles.push(tokio::spawn(async move {
			let prestate = capture_state(&light).await;
			(light.serial(), prestate)
		}));
	}

	let mut captured = Vec::new();
	for handle in handles {
		let (serial, prestate) = handle
			.await
			.map_err(|e| Error::ConnectionError(format!("capture task failed: {}", e)))?;
		captured.push((serial, prestate?));
	}
	Ok(captured)
}

/// Restores every (light, prestate) pair in parallel.  Per-device failures are logged and do not
/// abort the peers' restoration.
async fn restore_all(pairs: Vec<(Device, PreState)>) {
	let mut handles = Vec::with_capacity(pairs.len());
	for (light, prestate) in pairs {
		handles.push(tokio::spawn(async move {
			if let Err(e) = restore_state(&light, &prestate).await {
				warn!(serial = %light.serial(), error = %e, "restore failed");
			}
		}));
	}
	for handle in handles {
		let _ = handle.await;
	}
}
