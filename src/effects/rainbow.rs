use async_trait::async_trait;

use crate::{
	color::{Color, KELVIN_NEUTRAL},
	device::Device,
	effects::base::{requires_color, Effect},
	effects::frame::{run_frame_loop, FrameContext, FrameEffect, FrameEngine},
	error::Error,
};

/// A full 360-degree rainbow spread across the device's pixels, scrolling over time.
///
/// Multi-device setups can offset each device's rainbow by `spread` degrees.  On a single light
/// the one pixel simply cycles through the spectrum.
pub struct EffectRainbow {
	engine: FrameEngine,
	period: f64,
	brightness: f64,
	saturation: f64,
	spread: f64,
	power_on: bool,
}

impl EffectRainbow {
	/// `period` is seconds per full scroll.
	pub fn new(
		period: f64,
		brightness: f64,
		saturation: f64,
		spread: f64,
	) -> Result<EffectRainbow, Error> {
		if period <= 0.0 {
			return Err(Error::ProtocolError(format!(
				"Period must be positive, got {}",
				period
			)));
		}
		if !(0.0..=1.0).contains(&brightness) {
			return Err(Error::ProtocolError(format!(
				"Brightness must be 0.0-1.0, got {}",
				brightness
			)));
		}
		if !(0.0..=1.0).contains(&saturation) {
			return Err(Error::ProtocolError(format!(
				"Saturation must be 0.0-1.0, got {}",
				saturation
			)));
		}
		if !(0.0..=360.0).contains(&spread) {
			return Err(Error::ProtocolError(format!(
				"Spread must be 0-360 degrees, got {}",
				spread
			)));
		}
		Ok(EffectRainbow {
			engine: FrameEngine::new(20.0, None),
			period,
			brightness,
			saturation,
			spread,
			power_on: true,
		})
	}
}

impl Default for EffectRainbow {
	fn default() -> EffectRainbow {
		EffectRainbow::new(10.0, 0.8, 1.0, 0.0).expect("defaults are valid")
	}
}

#[async_trait]
impl Effect for EffectRainbow {
	fn name(&self) -> &'static str {
		"rainbow"
	}

	fn power_on(&self) -> bool {
		self.power_on
	}

	async fn is_compatible(&self, light: &Device) -> Result<bool, Error> {
		requires_color(light).await
	}

	async fn from_poweroff_hsbk(&self, _light: &Device) -> Color {
		Color::new(
			0.0,
			self.saturation as f32,
			self.brightness as f32,
			KELVIN_NEUTRAL,
		)
	}

	fn frame_engine(&self) -> Option<&FrameEngine> {
		Some(&self.engine)
	}

	async fn play(&self, _participants: &[Device]) -> Result<(), Error> {
		run_frame_loop(self).await
	}
}

impl FrameEffect for EffectRainbow {
	fn engine(&self) -> &FrameEngine {
		&self.engine
	}

	fn generate_frame(&self, ctx: &FrameContext) -> Vec<Color> {
		let degrees_scrolled = ctx.elapsed_s / self.period * 360.0;
		let device_offset = (ctx.device_index as f64 * self.spread).rem_euclid(360.0);

		(0..ctx.pixel_count)
			.map(|i| {
				let pixel_offset = i as f64 / ctx.pixel_count as f64 * 360.0;
				let hue = (degrees_scrolled + device_offset + pixel_offset).rem_euclid(360.0);
				Color::new(
					hue as f32,
					self.saturation as f32,
					self.brightness as f32,
					KELVIN_NEUTRAL,
				)
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ctx(elapsed_s: f64, pixel_count: usize) -> FrameContext {
		FrameContext {
			elapsed_s,
			device_index: 0,
			pixel_count,
			canvas_width: pixel_count,
			canvas_height: 1,
		}
	}

	#[test]
	fn spreads_full_circle_across_pixels() {
		let effect = EffectRainbow::new(10.0, 0.8, 1.0, 0.0).unwrap();
		let frame = effect.generate_frame(&ctx(0.0, 16));
		assert_eq!(frame.len(), 16);
		for (i, color) in frame.iter().enumerate() {
			let expected = i as f32 / 16.0 * 360.0;
			assert!((color.hue - expected).abs() < 0.01);
		}
	}

	#[test]
	fn scrolls_half_circle_at_half_period() {
		let effect = EffectRainbow::new(10.0, 0.8, 1.0, 0.0).unwrap();
		let frame = effect.generate_frame(&ctx(5.0, 16));
		for (i, color) in frame.iter().enumerate() {
			let expected = (180.0 + i as f32 / 16.0 * 360.0) % 360.0;
			assert!((color.hue - expected).abs() < 0.01);
		}
	}

	#[test]
	fn hue_wraps_around_after_a_full_pixel_count() {
		// Consecutive pixels step by 360/pixel_count, and the step from the last pixel back
		// to the first closes the circle: pixel i and pixel i + pixel_count share a hue.
		let effect = EffectRainbow::new(10.0, 0.8, 1.0, 0.0).unwrap();
		let frame = effect.generate_frame(&ctx(3.3, 8));
		let step = 360.0 / 8.0;
		for i in 0..8 {
			let next = frame[(i + 1) % 8].hue;
			let diff = (next - frame[i].hue).rem_euclid(360.0);
			assert!((diff - step).abs() < 0.01, "step {} -> {}: {}", i, (i + 1) % 8, diff);
		}
	}

	#[test]
	fn devices_offset_by_spread() {
		let effect = EffectRainbow::new(10.0, 0.8, 1.0, 90.0).unwrap();
		let base = effect.generate_frame(&FrameContext {
			elapsed_s: 0.0,
			device_index: 0,
			pixel_count: 4,
			canvas_width: 4,
			canvas_height: 1,
		});
		let offset = effect.generate_frame(&FrameContext {
			elapsed_s: 0.0,
			device_index: 1,
			pixel_count: 4,
			canvas_width: 4,
			canvas_height: 1,
		});
		assert!(((offset[0].hue - base[0].hue).rem_euclid(360.0) - 90.0).abs() < 0.01);
	}
}
