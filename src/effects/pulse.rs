use std::time::Duration;

use async_trait::async_trait;

use crate::{
	color::{Color, Waveform, KELVIN_NEUTRAL},
	device::Device,
	effects::base::{requires_color, Effect},
	error::Error,
};

/// How the pulse presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseMode {
	/// Square wave between the current color and the pulse color
	Blink,
	/// Sine wave, a slow fade in and out
	Breathe,
	/// Fast square wave
	Strobe,
	/// One short flash
	Ping,
}

/// Firmware-waveform effect: the device's own blink/breathe/strobe engine does the work.
///
/// One SetWaveform per participant, then the effect just waits out `period * cycles`.  No
/// per-frame traffic at all.
pub struct EffectPulse {
	pub mode: PulseMode,
	/// Seconds per cycle
	pub period: f64,
	pub cycles: f32,
	/// Pulse color; a bright warm white when unset
	pub color: Option<Color>,
	pub power_on: bool,
}

impl EffectPulse {
	pub fn new(mode: PulseMode) -> EffectPulse {
		let period = match mode {
			PulseMode::Strobe => 0.1,
			_ => 1.0,
		};
		EffectPulse {
			mode,
			period,
			cycles: 1.0,
			color: None,
			power_on: true,
		}
	}

	pub fn with_period(mut self, period: f64) -> EffectPulse {
		self.period = period.max(0.001);
		self
	}

	pub fn with_cycles(mut self, cycles: f32) -> EffectPulse {
		self.cycles = cycles.max(1.0);
		self
	}

	pub fn with_color(mut self, color: Color) -> EffectPulse {
		self.color = Some(color);
		self
	}

	fn pulse_color(&self) -> Color {
		self.color
			.unwrap_or_else(|| Color::white(KELVIN_NEUTRAL, 1.0))
	}

	fn waveform(&self) -> Waveform {
		match self.mode {
			PulseMode::Breathe => Waveform::Sine,
			_ => Waveform::Pulse,
		}
	}

	fn effective_cycles(&self) -> f32 {
		match self.mode {
			PulseMode::Ping => 1.0,
			_ => self.cycles,
		}
	}

	/// How long the firmware will animate.
	pub fn duration(&self) -> Duration {
		Duration::from_secs_f64(self.period * f64::from(self.effective_cycles()))
	}
}

#[async_trait]
impl Effect for EffectPulse {
	fn name(&self) -> &'static str {
		"pulse"
	}

	fn power_on(&self) -> bool {
		self.power_on
	}

	async fn is_compatible(&self, light: &Device) -> Result<bool, Error> {
		requires_color(light).await
	}

	async fn from_poweroff_hsbk(&self, _light: &Device) -> Color {
		let mut color = self.pulse_color();
		color.brightness = 0.0;
		color
	}

	async fn play(&self, participants: &[Device]) -> Result<(), Error> {
		let period_ms = (self.period * 1000.0) as u32;
		let cycles = self.effective_cycles();

		for light in participants {
			light
				.set_waveform(
					true,
					self.pulse_color(),
					period_ms,
					cycles,
					0,
					self.waveform(),
				)
				.await?;
		}

		tokio::time::sleep(self.duration()).await;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strobe_defaults_to_a_short_period() {
		let strobe = EffectPulse::new(PulseMode::Strobe);
		assert!(strobe.period < 0.5);
		let blink = EffectPulse::new(PulseMode::Blink);
		assert_eq!(blink.period, 1.0);
	}

	#[test]
	fn ping_is_a_single_cycle() {
		let ping = EffectPulse::new(PulseMode::Ping).with_cycles(10.0);
		assert_eq!(ping.effective_cycles(), 1.0);
	}

	#[test]
	fn duration_covers_all_cycles() {
		let effect = EffectPulse::new(PulseMode::Blink)
			.with_period(0.2)
			.with_cycles(5.0);
		assert_eq!(effect.duration(), Duration::from_secs_f64(1.0));
	}

	#[test]
	fn breathe_uses_a_sine_waveform() {
		assert_eq!(EffectPulse::new(PulseMode::Breathe).waveform(), Waveform::Sine);
		assert_eq!(EffectPulse::new(PulseMode::Blink).waveform(), Waveform::Pulse);
	}
}
