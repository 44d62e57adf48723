use async_trait::async_trait;

use crate::{
	color::{Color, KELVIN_AMBER, MAX_KELVIN, MIN_KELVIN},
	device::Device,
	effects::base::{requires_color, Effect},
	effects::frame::{run_frame_loop, FrameContext, FrameEffect, FrameEngine},
	error::Error,
};

/// Fire/candle flicker built from layered sine waves.
///
/// Three out-of-phase sines at near-prime frequency ratios give each pixel organic,
/// non-repeating brightness variation; hue and kelvin ride the same flicker scalar so hot
/// moments are yellower.  On 2D canvases a vertical falloff keeps the top rows dimmer.
pub struct EffectFlame {
	engine: FrameEngine,
	intensity: f64,
	speed: f64,
	kelvin_min: u16,
	kelvin_max: u16,
	brightness: f64,
	power_on: bool,
}

impl EffectFlame {
	pub fn new(
		intensity: f64,
		speed: f64,
		kelvin_min: u16,
		kelvin_max: u16,
		brightness: f64,
	) -> Result<EffectFlame, Error> {
		if !(0.0..=1.0).contains(&intensity) {
			return Err(Error::ProtocolError(format!(
				"Intensity must be 0.0-1.0, got {}",
				intensity
			)));
		}
		if speed <= 0.0 {
			return Err(Error::ProtocolError(format!(
				"Speed must be positive, got {}",
				speed
			)));
		}
		if kelvin_min < MIN_KELVIN || kelvin_max > MAX_KELVIN || kelvin_min > kelvin_max {
			return Err(Error::ProtocolError(format!(
				"Kelvin range {}-{} is invalid",
				kelvin_min, kelvin_max
			)));
		}
		if !(0.0..=1.0).contains(&brightness) {
			return Err(Error::ProtocolError(format!(
				"Brightness must be 0.0-1.0, got {}",
				brightness
			)));
		}
		Ok(EffectFlame {
			engine: FrameEngine::new(20.0, None),
			intensity,
			speed,
			kelvin_min,
			kelvin_max,
			brightness,
			power_on: true,
		})
	}

	/// 0.0-1.0 flicker value from three layered sine waves.
	fn flicker(t: f64, seed: f64) -> f64 {
		let v1 = (t * 3.7 + seed * 17.1).sin() * 0.5 + 0.5;
		let v2 = (t * 7.3 + seed * 31.7).sin() * 0.25 + 0.5;
		let v3 = (t * 13.1 + seed * 53.3).sin() * 0.125 + 0.5;
		(v1 + v2 + v3) / 3.0
	}
}

impl Default for EffectFlame {
	fn default() -> EffectFlame {
		EffectFlame::new(0.7, 1.0, 1500, 2500, 0.8).expect("defaults are valid")
	}
}

#[async_trait]
impl Effect for EffectFlame {
	fn name(&self) -> &'static str {
		"flame"
	}

	fn power_on(&self) -> bool {
		self.power_on
	}

	async fn is_compatible(&self, light: &Device) -> Result<bool, Error> {
		requires_color(light).await
	}

	async fn from_poweroff_hsbk(&self, _light: &Device) -> Color {
		// Warm amber at zero brightness for a smooth fade-in
		Color::new(20.0, 1.0, 0.0, KELVIN_AMBER)
	}

	fn frame_engine(&self) -> Option<&FrameEngine> {
		Some(&self.engine)
	}

	async fn play(&self, _participants: &[Device]) -> Result<(), Error> {
		run_frame_loop(self).await
	}
}

impl FrameEffect for EffectFlame {
	fn engine(&self) -> &FrameEngine {
		&self.engine
	}

	fn generate_frame(&self, ctx: &FrameContext) -> Vec<Color> {
		let t = ctx.elapsed_s * self.speed;
		let is_matrix = ctx.canvas_height > 1;
		let kelvin_range = f64::from(self.kelvin_max - self.kelvin_min);

		(0..ctx.pixel_count)
			.map(|i| {
				let seed = i as f64 / ctx.pixel_count.max(1) as f64;
				let flicker = Self::flicker(t, seed);

				let mut pixel_brightness =
					self.brightness * (1.0 - self.intensity + self.intensity * flicker);

				if is_matrix {
					let y = i / ctx.canvas_width;
					let y_factor = 1.0 - (y as f64 / ctx.canvas_height as f64).powf(0.7);
					pixel_brightness *= y_factor;
				}
				pixel_brightness = pixel_brightness.clamp(0.0, 1.0);

				// Red at low flicker, yellow at high
				let hue = (flicker * 40.0).round();
				let saturation = 0.85 + 0.15 * (1.0 - flicker);
				let kelvin = f64::from(self.kelvin_min) + flicker * kelvin_range;

				Color::new(
					hue as f32,
					saturation as f32,
					pixel_brightness as f32,
					kelvin.round() as u16,
				)
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ctx_1d(elapsed_s: f64, pixel_count: usize) -> FrameContext {
		FrameContext {
			elapsed_s,
			device_index: 0,
			pixel_count,
			canvas_width: pixel_count,
			canvas_height: 1,
		}
	}

	fn variance(frame: &[Color]) -> f64 {
		let mean = frame.iter().map(|c| f64::from(c.brightness)).sum::<f64>() / frame.len() as f64;
		frame
			.iter()
			.map(|c| (f64::from(c.brightness) - mean).powi(2))
			.sum::<f64>()
			/ frame.len() as f64
	}

	#[test]
	fn zero_intensity_is_flat() {
		let effect = EffectFlame::new(0.0, 1.0, 1500, 2500, 0.8).unwrap();
		let frame = effect.generate_frame(&ctx_1d(2.5, 32));
		assert_eq!(frame.len(), 32);
		assert!(frame
			.iter()
			.all(|c| (c.brightness - frame[0].brightness).abs() < 1e-6));
	}

	#[test]
	fn full_intensity_varies_more_than_zero() {
		let flat = EffectFlame::new(0.0, 1.0, 1500, 2500, 0.8).unwrap();
		let wild = EffectFlame::new(1.0, 1.0, 1500, 2500, 0.8).unwrap();
		let ctx = ctx_1d(2.5, 32);
		assert!(variance(&wild.generate_frame(&ctx)) > variance(&flat.generate_frame(&ctx)));
	}

	#[test]
	fn hue_stays_in_the_fire_range() {
		let effect = EffectFlame::default();
		for tick in 0..40 {
			let frame = effect.generate_frame(&ctx_1d(tick as f64 * 0.05, 16));
			for color in frame {
				assert!((0.0..=40.0).contains(&color.hue));
				assert!(color.kelvin >= 1500 && color.kelvin <= 2500);
			}
		}
	}

	#[test]
	fn matrix_top_rows_are_dimmer() {
		let effect = EffectFlame::new(0.0, 1.0, 1500, 2500, 0.8).unwrap();
		let frame = effect.generate_frame(&FrameContext {
			elapsed_s: 1.0,
			device_index: 0,
			pixel_count: 64,
			canvas_width: 8,
			canvas_height: 8,
		});
		// With intensity 0 the flicker is uniform, so only the falloff differs by row.
		// y increases downward in canvas order, so row 0 carries the full brightness.
		assert!(frame[0].brightness > frame[63].brightness);
	}

	#[test]
	fn rejects_bad_parameters() {
		assert!(EffectFlame::new(1.5, 1.0, 1500, 2500, 0.8).is_err());
		assert!(EffectFlame::new(0.5, 0.0, 1500, 2500, 0.8).is_err());
		assert!(EffectFlame::new(0.5, 1.0, 2500, 1500, 0.8).is_err());
	}
}
