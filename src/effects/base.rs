use async_trait::async_trait;

use crate::{color::Color, device::Device, effects::frame::FrameEngine, error::Error};

/// A light effect the [crate::effects::Conductor] can run.
///
/// Two concrete kinds exist: frame effects, which expose a [FrameEngine] through
/// [Effect::frame_engine] and generate per-pixel frames at a fixed FPS, and firmware effects
/// (pulse), which fire one waveform packet and wait.  Everything else varies only in the hooks
/// below.
#[async_trait]
pub trait Effect: Send + Sync + 'static {
	/// Stable identifier, e.g. "rainbow".
	fn name(&self) -> &'static str;

	/// Whether dark participants are powered on before the effect starts.
	fn power_on(&self) -> bool {
		true
	}

	/// Whether captured pre-state is restored when the effect completes on its own.
	///
	/// Stopping an effect honours this too.  Sunrise, and sunset when it powers lights off,
	/// override this to leave the final look in place.
	fn restore_on_complete(&self) -> bool {
		true
	}

	/// Whether this effect may take over `previous`'s captured pre-state instead of capturing
	/// fresh state.  Default: effects of the same kind hand state over.
	fn inherit_prestate(&self, previous: &dyn Effect) -> bool {
		self.name() == previous.name()
	}

	/// Whether the effect can run on this device, from its capability record.
	async fn is_compatible(&self, light: &Device) -> Result<bool, Error>;

	/// The color a dark light starts from when the effect powers it on, so the visible
	/// transition begins somewhere sensible.
	async fn from_poweroff_hsbk(&self, light: &Device) -> Color;

	/// One-shot hook run after animators exist and before the play task starts.
	async fn setup(&self, _participants: &[Device]) -> Result<(), Error> {
		Ok(())
	}

	/// The frame engine, for frame-based effects.
	fn frame_engine(&self) -> Option<&FrameEngine> {
		None
	}

	/// Runs the effect to completion (or until cancelled).
	async fn play(&self, participants: &[Device]) -> Result<(), Error>;
}

/// Compatibility helper: the device has color control.
pub async fn requires_color(light: &Device) -> Result<bool, Error> {
	Ok(light.capabilities().await?.has_color)
}

/// Compatibility helper: the device has addressable zones.
pub async fn requires_multizone(light: &Device) -> Result<bool, Error> {
	Ok(light.capabilities().await?.has_multizone)
}

/// Compatibility helper: the device has a 2D pixel grid.
pub async fn requires_matrix(light: &Device) -> Result<bool, Error> {
	Ok(light.capabilities().await?.has_matrix)
}
