use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use rand::Rng;

use crate::{
	color::{Color, KELVIN_NEUTRAL},
	device::Device,
	effects::base::{requires_color, Effect},
	effects::frame::{run_frame_loop, FrameContext, FrameEffect, FrameEngine},
	error::Error,
};

struct ColorloopState {
	initial_colors: Vec<Color>,
	direction: f64,
}

/// Continuous hue rotation cycling through the color spectrum.
///
/// Each device starts from its current hue and rotates at `360/period` degrees per second in a
/// randomly chosen direction.  In spread mode devices are offset from each other by
/// `device_index * spread` degrees; in synchronized mode every device shows the same hue with an
/// averaged brightness and kelvin.
pub struct EffectColorloop {
	engine: FrameEngine,
	period: f64,
	spread: f64,
	brightness: Option<f64>,
	saturation_min: f64,
	saturation_max: f64,
	synchronized: bool,
	power_on: bool,
	state: StdMutex<ColorloopState>,
}

impl EffectColorloop {
	/// Builds a colorloop.
	///
	/// `period` is seconds per full rotation, `change` the hue step per iteration used to derive
	/// the frame rate, `spread` the per-device hue offset.
	pub fn new(
		period: f64,
		change: f64,
		spread: f64,
		brightness: Option<f64>,
		synchronized: bool,
	) -> Result<EffectColorloop, Error> {
		if period <= 0.0 {
			return Err(Error::ProtocolError(format!(
				"Period must be positive, got {}",
				period
			)));
		}
		if !(0.0..=360.0).contains(&change) {
			return Err(Error::ProtocolError(format!(
				"Change must be 0-360 degrees, got {}",
				change
			)));
		}
		if !(0.0..=360.0).contains(&spread) {
			return Err(Error::ProtocolError(format!(
				"Spread must be 0-360 degrees, got {}",
				spread
			)));
		}
		if let Some(b) = brightness {
			if !(0.0..=1.0).contains(&b) {
				return Err(Error::ProtocolError(format!(
					"Brightness must be 0.0-1.0, got {}",
					b
				)));
			}
		}

		// Steps per second needed for `change`-degree hops, floored at 20 FPS so multizone and
		// matrix devices stay smooth; single lights interpolate via duration_ms anyway.
		let fps = if change > 0.0 {
			(360.0 / change / period).max(20.0)
		} else {
			20.0
		};

		Ok(EffectColorloop {
			engine: FrameEngine::new(fps, None),
			period,
			spread,
			brightness,
			saturation_min: 0.8,
			saturation_max: 1.0,
			synchronized,
			power_on: true,
			state: StdMutex::new(ColorloopState {
				initial_colors: Vec::new(),
				direction: 1.0,
			}),
		})
	}

	pub fn with_saturation_range(mut self, min: f64, max: f64) -> EffectColorloop {
		self.saturation_min = min.clamp(0.0, 1.0);
		self.saturation_max = max.clamp(self.saturation_min, 1.0);
		self
	}

	fn fallback_brightness(&self) -> f64 {
		self.brightness.unwrap_or(0.8)
	}

	fn saturation(&self) -> f64 {
		(self.saturation_min + self.saturation_max) / 2.0
	}

	fn synchronized_color(&self, state: &ColorloopState, degrees_rotated: f64) -> Color {
		let base_hue = state
			.initial_colors
			.first()
			.map(|c| f64::from(c.hue))
			.unwrap_or(0.0);
		let hue = (base_hue + degrees_rotated).rem_euclid(360.0);

		let brightness = match self.brightness {
			Some(b) => b,
			None => {
				let sum: f64 = state
					.initial_colors
					.iter()
					.map(|c| f64::from(c.brightness))
					.sum();
				sum / state.initial_colors.len().max(1) as f64
			}
		};
		let kelvin_sum: f64 = state
			.initial_colors
			.iter()
			.map(|c| f64::from(c.kelvin))
			.sum();
		let kelvin = kelvin_sum / state.initial_colors.len().max(1) as f64;

		Color::new(
			hue as f32,
			self.saturation() as f32,
			brightness as f32,
			kelvin as u16,
		)
	}

	fn spread_color(&self, state: &ColorloopState, degrees_rotated: f64, device_index: usize) -> Color {
		let color_index = device_index.min(state.initial_colors.len().saturating_sub(1));
		let initial = state
			.initial_colors
			.get(color_index)
			.copied()
			.unwrap_or(Color::white(KELVIN_NEUTRAL, 0.8));

		let device_offset = (device_index as f64 * self.spread).rem_euclid(360.0);
		let hue = (f64::from(initial.hue) + degrees_rotated + device_offset).rem_euclid(360.0);
		let brightness = self
			.brightness
			.unwrap_or_else(|| f64::from(initial.brightness));

		Color::new(
			hue as f32,
			self.saturation() as f32,
			brightness as f32,
			initial.kelvin,
		)
	}
}

#[async_trait]
impl Effect for EffectColorloop {
	fn name(&self) -> &'static str {
		"colorloop"
	}

	fn power_on(&self) -> bool {
		self.power_on
	}

	async fn is_compatible(&self, light: &Device) -> Result<bool, Error> {
		requires_color(light).await
	}

	async fn from_poweroff_hsbk(&self, _light: &Device) -> Color {
		let mut rng = rand::thread_rng();
		Color::new(
			rng.gen_range(0.0..360.0),
			rng.gen_range(self.saturation_min..=self.saturation_max) as f32,
			self.fallback_brightness() as f32,
			KELVIN_NEUTRAL,
		)
	}

	async fn setup(&self, participants: &[Device]) -> Result<(), Error> {
		let mut initial_colors = Vec::with_capacity(participants.len());
		for light in participants {
			let mut color = match light.get_color().await {
				Ok(color) => color,
				Err(_) => Color::white(KELVIN_NEUTRAL, self.fallback_brightness() as f32),
			};
			// A dark light would rotate invisibly; substitute the target brightness
			if color.brightness < 0.01 {
				color.brightness = self.fallback_brightness() as f32;
			}
			initial_colors.push(color);
		}

		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		state.initial_colors = initial_colors;
		state.direction = if rand::thread_rng().gen_bool(0.5) {
			1.0
		} else {
			-1.0
		};
		Ok(())
	}

	fn frame_engine(&self) -> Option<&FrameEngine> {
		Some(&self.engine)
	}

	async fn play(&self, _participants: &[Device]) -> Result<(), Error> {
		run_frame_loop(self).await
	}
}

impl FrameEffect for EffectColorloop {
	fn engine(&self) -> &FrameEngine {
		&self.engine
	}

	fn generate_frame(&self, ctx: &FrameContext) -> Vec<Color> {
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		if state.initial_colors.is_empty() {
			// Setup has not run yet
			return vec![
				Color::new(0.0, 1.0, 0.8, KELVIN_NEUTRAL);
				ctx.pixel_count
			];
		}

		let degrees_rotated = ctx.elapsed_s / self.period * 360.0 * state.direction;
		let color = if self.synchronized {
			self.synchronized_color(&state, degrees_rotated)
		} else {
			self.spread_color(&state, degrees_rotated, ctx.device_index)
		};

		vec![color; ctx.pixel_count]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn effect_with_colors(colors: Vec<Color>, spread: f64, synchronized: bool) -> EffectColorloop {
		let effect = EffectColorloop::new(60.0, 20.0, spread, Some(0.8), synchronized).unwrap();
		{
			let mut state = effect.state.lock().unwrap();
			state.initial_colors = colors;
			state.direction = 1.0;
		}
		effect
	}

	fn ctx(elapsed_s: f64, device_index: usize) -> FrameContext {
		FrameContext {
			elapsed_s,
			device_index,
			pixel_count: 4,
			canvas_width: 4,
			canvas_height: 1,
		}
	}

	#[test]
	fn rejects_bad_parameters() {
		assert!(EffectColorloop::new(0.0, 20.0, 30.0, None, false).is_err());
		assert!(EffectColorloop::new(60.0, 400.0, 30.0, None, false).is_err());
		assert!(EffectColorloop::new(60.0, 20.0, 30.0, Some(1.5), false).is_err());
	}

	#[test]
	fn fps_floors_at_twenty() {
		let slow = EffectColorloop::new(60.0, 20.0, 0.0, None, false).unwrap();
		assert_eq!(slow.engine.fps(), 20.0);

		let fast = EffectColorloop::new(0.5, 10.0, 0.0, None, false).unwrap();
		assert_eq!(fast.engine.fps(), 72.0);
	}

	#[test]
	fn frame_fills_every_pixel_with_one_color() {
		let effect = effect_with_colors(
			vec![Color::new(100.0, 1.0, 0.5, 3500)],
			0.0,
			false,
		);
		let frame = effect.generate_frame(&ctx(0.0, 0));
		assert_eq!(frame.len(), 4);
		assert!(frame.iter().all(|c| c == &frame[0]));
	}

	#[test]
	fn hue_returns_to_start_each_period() {
		let effect = effect_with_colors(vec![Color::new(40.0, 1.0, 0.5, 3500)], 0.0, false);
		let at_zero = effect.generate_frame(&ctx(0.0, 0))[0].hue;
		for k in 1..4 {
			let at_period = effect.generate_frame(&ctx(60.0 * k as f64, 0))[0].hue;
			assert!((at_zero - at_period).abs().min(360.0 - (at_zero - at_period).abs()) < 0.01);
		}
	}

	#[test]
	fn devices_offset_by_spread() {
		let effect = effect_with_colors(
			vec![
				Color::new(0.0, 1.0, 0.5, 3500),
				Color::new(0.0, 1.0, 0.5, 3500),
			],
			30.0,
			false,
		);
		let first = effect.generate_frame(&ctx(0.0, 0))[0].hue;
		let second = effect.generate_frame(&ctx(0.0, 1))[0].hue;
		assert!(((second - first).rem_euclid(360.0) - 30.0).abs() < 0.01);
	}

	#[test]
	fn synchronized_mode_averages_brightness() {
		let effect = effect_with_colors(
			vec![
				Color::new(0.0, 1.0, 0.2, 3000),
				Color::new(180.0, 1.0, 0.8, 4000),
			],
			0.0,
			true,
		);
		let mut no_fixed = effect;
		no_fixed.brightness = None;
		let frame_a = no_fixed.generate_frame(&ctx(0.0, 0));
		let frame_b = no_fixed.generate_frame(&ctx(0.0, 1));
		assert_eq!(frame_a[0], frame_b[0]);
		assert!((frame_a[0].brightness - 0.5).abs() < 0.01);
		assert_eq!(frame_a[0].kelvin, 3500);
	}
}
