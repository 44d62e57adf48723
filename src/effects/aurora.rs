use std::f64::consts::PI;

use async_trait::async_trait;

use crate::{
	color::{Color, KELVIN_NEUTRAL},
	device::Device,
	effects::base::{requires_color, Effect},
	effects::frame::{run_frame_loop, FrameContext, FrameEffect, FrameEngine},
	error::Error,
};

const DEFAULT_PALETTE: [f64; 5] = [120.0, 160.0, 200.0, 260.0, 290.0];

/// Northern-lights simulation: flowing colored bands interpolated around a hue palette, with
/// sine-modulated brightness curtains.  On matrix canvases the middle rows are brightest.
pub struct EffectAurora {
	engine: FrameEngine,
	speed: f64,
	brightness: f64,
	palette: Vec<f64>,
	spread: f64,
	power_on: bool,
}

impl EffectAurora {
	pub fn new(
		speed: f64,
		brightness: f64,
		palette: Option<Vec<f64>>,
		spread: f64,
	) -> Result<EffectAurora, Error> {
		if speed <= 0.0 {
			return Err(Error::ProtocolError(format!(
				"Speed must be positive, got {}",
				speed
			)));
		}
		if !(0.0..=1.0).contains(&brightness) {
			return Err(Error::ProtocolError(format!(
				"Brightness must be 0.0-1.0, got {}",
				brightness
			)));
		}
		if !(0.0..=360.0).contains(&spread) {
			return Err(Error::ProtocolError(format!(
				"Spread must be 0-360 degrees, got {}",
				spread
			)));
		}
		let palette = match palette {
			Some(palette) => {
				if palette.len() < 2 {
					return Err(Error::ProtocolError(format!(
						"Palette must have at least 2 entries, got {}",
						palette.len()
					)));
				}
				for &hue in &palette {
					if !(0.0..=360.0).contains(&hue) {
						return Err(Error::ProtocolError(format!(
							"Palette hue values must be 0-360, got {}",
							hue
						)));
					}
				}
				palette
			}
			None => DEFAULT_PALETTE.to_vec(),
		};

		Ok(EffectAurora {
			engine: FrameEngine::new(20.0, None),
			speed,
			brightness,
			palette,
			spread,
			power_on: true,
		})
	}

	/// Interpolates a hue from the palette at a continuous 0.0-1.0 position.
	///
	/// Adjacent stops more than 180 degrees apart interpolate the short way around the wheel.
	fn palette_hue(&self, position: f64) -> f64 {
		let n = self.palette.len();
		let scaled = position * n as f64;
		let idx = (scaled as usize) % n;
		let frac = scaled - scaled.floor();
		let h1 = self.palette[idx];
		let h2 = self.palette[(idx + 1) % n];
		let mut diff = h2 - h1;
		if diff > 180.0 {
			diff -= 360.0;
		} else if diff < -180.0 {
			diff += 360.0;
		}
		(h1 + frac * diff).rem_euclid(360.0)
	}
}

impl Default for EffectAurora {
	fn default() -> EffectAurora {
		EffectAurora::new(1.0, 0.8, None, 0.0).expect("defaults are valid")
	}
}

#[async_trait]
impl Effect for EffectAurora {
	fn name(&self) -> &'static str {
		"aurora"
	}

	fn power_on(&self) -> bool {
		self.power_on
	}

	async fn is_compatible(&self, light: &Device) -> Result<bool, Error> {
		requires_color(light).await
	}

	async fn from_poweroff_hsbk(&self, _light: &Device) -> Color {
		// Aurora green at zero brightness for a smooth fade-in
		Color::new(120.0, 0.8, 0.0, KELVIN_NEUTRAL)
	}

	fn frame_engine(&self) -> Option<&FrameEngine> {
		Some(&self.engine)
	}

	async fn play(&self, _participants: &[Device]) -> Result<(), Error> {
		run_frame_loop(self).await
	}
}

impl FrameEffect for EffectAurora {
	fn engine(&self) -> &FrameEngine {
		&self.engine
	}

	fn generate_frame(&self, ctx: &FrameContext) -> Vec<Color> {
		let t = ctx.elapsed_s * self.speed * 0.05;
		let device_offset = ctx.device_index as f64 * self.spread / 360.0;
		let is_matrix = ctx.canvas_height > 1;

		(0..ctx.pixel_count)
			.map(|i| {
				let along = i as f64 / ctx.pixel_count.max(1) as f64;
				let position = (along + t + device_offset).rem_euclid(1.0);
				let hue = self.palette_hue(position);

				// Sine curtains: bright bands drifting along the strip
				let brightness_mod = 0.5 + 0.5 * (along * PI * 3.0 + t * 6.0).sin();
				let mut pixel_brightness = self.brightness * brightness_mod;

				if is_matrix {
					let y = i / ctx.canvas_width;
					let y_norm = y as f64 / (ctx.canvas_height - 1).max(1) as f64;
					pixel_brightness *= (y_norm * PI).sin();
				}
				pixel_brightness = pixel_brightness.clamp(0.0, 1.0);

				let saturation = 0.7 + 0.3 * (position * 2.0 * PI).sin();

				Color::new(
					hue as f32,
					saturation as f32,
					pixel_brightness as f32,
					KELVIN_NEUTRAL,
				)
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn frame_length_matches_pixel_count() {
		let effect = EffectAurora::default();
		let frame = effect.generate_frame(&FrameContext {
			elapsed_s: 1.0,
			device_index: 0,
			pixel_count: 24,
			canvas_width: 24,
			canvas_height: 1,
		});
		assert_eq!(frame.len(), 24);
	}

	#[test]
	fn palette_interpolates_between_stops() {
		let effect = EffectAurora::new(1.0, 0.8, Some(vec![100.0, 200.0]), 0.0).unwrap();
		// Position 0.25 is halfway between the two stops
		assert!((effect.palette_hue(0.25) - 150.0).abs() < 0.01);
	}

	#[test]
	fn palette_wraps_the_short_way() {
		// 350 -> 10 should pass through 0, not back through 180
		let effect = EffectAurora::new(1.0, 0.8, Some(vec![350.0, 10.0]), 0.0).unwrap();
		let mid = effect.palette_hue(0.25);
		assert!(mid >= 350.0 || mid <= 10.0, "got {}", mid);
	}

	#[test]
	fn matrix_middle_rows_are_brightest() {
		let effect = EffectAurora::default();
		let frame = effect.generate_frame(&FrameContext {
			elapsed_s: 0.0,
			device_index: 0,
			pixel_count: 64,
			canvas_width: 8,
			canvas_height: 8,
		});
		// Compare one column: the top row carries sin(0) = 0 of the gradient
		assert!(frame[8 * 3].brightness > frame[0].brightness);
		assert!(frame[0].brightness < 1e-6);
	}

	#[test]
	fn rejects_single_stop_palettes() {
		assert!(EffectAurora::new(1.0, 0.8, Some(vec![120.0]), 0.0).is_err());
		assert!(EffectAurora::new(1.0, 0.8, Some(vec![120.0, 400.0]), 0.0).is_err());
	}
}
