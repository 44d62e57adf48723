use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::{
	color::{Color, KELVIN_COOL},
	device::Device,
	effects::base::{requires_matrix, Effect},
	effects::frame::{run_frame_loop, FrameContext, FrameEffect, FrameEngine},
	error::Error,
};

/// Where the sun sits on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunOrigin {
	/// Center of the bottom row; suits rectangular tiles
	Bottom,
	/// Middle of the canvas; suits round/oval ceiling lights
	Center,
}

// Radial distance delays each pixel's phase by up to this much progress, so the origin leads
// and the far corners lag, reading as an expanding (or contracting) sun.
const SPREAD: f64 = 0.6;

/// One frame of the sun transition at the given global progress (0 night, 1 day).
fn sun_frame(ctx: &FrameContext, progress: f64, brightness: f64, origin: SunOrigin) -> Vec<Color> {
	let progress = progress.clamp(0.0, 1.0);

	let cx = (ctx.canvas_width - 1) as f64 / 2.0;
	let cy = match origin {
		SunOrigin::Center => (ctx.canvas_height - 1) as f64 / 2.0,
		SunOrigin::Bottom => (ctx.canvas_height - 1) as f64,
	};

	let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

	(0..ctx.pixel_count)
		.map(|i| {
			let x = (i % ctx.canvas_width) as f64;
			let y = (i / ctx.canvas_width) as f64;

			let dx = x - cx;
			let dy = y - cy;
			let norm_dist = (dx * dx + dy * dy).sqrt() / max_dist;

			// Scaling by (1 + SPREAD) guarantees every pixel reaches 1.0 at full progress
			let pp = (progress * (1.0 + SPREAD) - norm_dist * SPREAD).clamp(0.0, 1.0);

			// Perceptual brightness curve (gamma 2.2)
			let pp_bright = pp.powf(2.2);

			let (mut hue, mut saturation, mut pixel_brightness, kelvin) = if pp < 0.2 {
				// Night: deep navy blue
				let phase = pp / 0.2;
				(240.0, 0.8, brightness * 0.02 * (1.0 + phase * 2.0), 1500.0)
			} else if pp < 0.4 {
				// Dawn: purple/magenta horizon
				let phase = (pp - 0.2) / 0.2;
				(
					280.0 + phase * 60.0,
					0.7 + 0.2 * (1.0 - norm_dist),
					brightness * (0.06 + 0.14 * phase),
					1500.0 + phase * 500.0,
				)
			} else if pp < 0.6 {
				// Golden hour: orange/red/gold
				let phase = (pp - 0.4) / 0.2;
				(
					20.0 + phase * 20.0,
					0.8 - 0.2 * phase,
					brightness * pp_bright,
					2000.0 + phase * 1000.0,
				)
			} else if pp < 0.8 {
				// Morning: yellow/warm white
				let phase = (pp - 0.6) / 0.2;
				(
					50.0 + phase * 10.0,
					0.6 - 0.3 * phase,
					brightness * pp_bright,
					3000.0 + phase * 500.0,
				)
			} else {
				// Day: neutral warm white
				let phase = (pp - 0.8) / 0.2;
				(
					60.0,
					(0.3 - 0.2 * phase).max(0.1),
					brightness * pp_bright,
					3500.0 + phase * 500.0,
				)
			};

			// Pixels near the sun are brighter
			let proximity = (1.0 - norm_dist * 1.5).max(0.0);
			pixel_brightness *= 0.5 + 0.5 * proximity;

			// and warmer: redder hue, more saturated
			if norm_dist < 0.5 {
				let warmth = 1.0 - norm_dist * 2.0;
				hue = (hue - warmth * 20.0).max(0.0);
				saturation = (saturation + warmth * 0.2).min(1.0);
			}

			Color::new(
				hue.clamp(0.0, 360.0) as f32,
				saturation as f32,
				pixel_brightness.clamp(0.0, 1.0) as f32,
				kelvin.round() as u16,
			)
		})
		.collect()
}

fn validate(duration: f64, brightness: f64) -> Result<(), Error> {
	if duration <= 0.0 {
		return Err(Error::ProtocolError(format!(
			"Duration must be positive, got {}",
			duration
		)));
	}
	if !(0.0..=1.0).contains(&brightness) {
		return Err(Error::ProtocolError(format!(
			"Brightness must be 0.0-1.0, got {}",
			brightness
		)));
	}
	Ok(())
}

/// Night-to-daylight transition on a matrix canvas: a radial sun grows out of the origin
/// through navy, dawn purple, golden orange, morning yellow and warm white phases.
///
/// Leaves the lights at full daylight: no state restore on completion.
pub struct EffectSunrise {
	engine: FrameEngine,
	duration: f64,
	brightness: f64,
	origin: SunOrigin,
	power_on: bool,
}

impl EffectSunrise {
	pub fn new(duration: f64, brightness: f64, origin: SunOrigin) -> Result<EffectSunrise, Error> {
		validate(duration, brightness)?;
		Ok(EffectSunrise {
			engine: FrameEngine::new(20.0, Some(Duration::from_secs_f64(duration))),
			duration,
			brightness,
			origin,
			power_on: true,
		})
	}
}

#[async_trait]
impl Effect for EffectSunrise {
	fn name(&self) -> &'static str {
		"sunrise"
	}

	fn power_on(&self) -> bool {
		self.power_on
	}

	fn restore_on_complete(&self) -> bool {
		// The whole point is to end at daylight
		false
	}

	async fn is_compatible(&self, light: &Device) -> Result<bool, Error> {
		requires_matrix(light).await
	}

	async fn from_poweroff_hsbk(&self, _light: &Device) -> Color {
		// Deep navy at zero brightness
		Color::new(240.0, 0.8, 0.0, 1500)
	}

	fn frame_engine(&self) -> Option<&FrameEngine> {
		Some(&self.engine)
	}

	async fn play(&self, _participants: &[Device]) -> Result<(), Error> {
		run_frame_loop(self).await
	}
}

impl FrameEffect for EffectSunrise {
	fn engine(&self) -> &FrameEngine {
		&self.engine
	}

	fn generate_frame(&self, ctx: &FrameContext) -> Vec<Color> {
		let progress = ctx.elapsed_s / self.duration;
		sun_frame(ctx, progress, self.brightness, self.origin)
	}
}

/// Daylight-to-night transition: the sun contracts toward the origin, and the lights can be
/// powered off at the end (in which case pre-state is deliberately not restored).
pub struct EffectSunset {
	engine: FrameEngine,
	duration: f64,
	brightness: f64,
	power_off: bool,
	origin: SunOrigin,
	power_on: bool,
}

impl EffectSunset {
	pub fn new(
		duration: f64,
		brightness: f64,
		power_off: bool,
		origin: SunOrigin,
	) -> Result<EffectSunset, Error> {
		validate(duration, brightness)?;
		Ok(EffectSunset {
			engine: FrameEngine::new(20.0, Some(Duration::from_secs_f64(duration))),
			duration,
			brightness,
			power_off,
			origin,
			power_on: false,
		})
	}
}

#[async_trait]
impl Effect for EffectSunset {
	fn name(&self) -> &'static str {
		"sunset"
	}

	fn power_on(&self) -> bool {
		self.power_on
	}

	fn restore_on_complete(&self) -> bool {
		!self.power_off
	}

	async fn is_compatible(&self, light: &Device) -> Result<bool, Error> {
		requires_matrix(light).await
	}

	async fn from_poweroff_hsbk(&self, _light: &Device) -> Color {
		Color::new(60.0, 0.2, self.brightness as f32, KELVIN_COOL)
	}

	fn frame_engine(&self) -> Option<&FrameEngine> {
		Some(&self.engine)
	}

	async fn play(&self, participants: &[Device]) -> Result<(), Error> {
		run_frame_loop(self).await?;

		if self.power_off {
			let lights = self.engine.participants();
			let targets = if lights.is_empty() {
				participants.to_vec()
			} else {
				lights
			};
			for light in targets {
				if let Err(e) = light.set_power_duration(false, 0).await {
					warn!(serial = %light.serial(), error = %e, "sunset power-off failed");
				}
			}
		}
		Ok(())
	}
}

impl FrameEffect for EffectSunset {
	fn engine(&self) -> &FrameEngine {
		&self.engine
	}

	fn generate_frame(&self, ctx: &FrameContext) -> Vec<Color> {
		let progress = 1.0 - ctx.elapsed_s / self.duration;
		sun_frame(ctx, progress, self.brightness, self.origin)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ctx(elapsed_s: f64) -> FrameContext {
		FrameContext {
			elapsed_s,
			device_index: 0,
			pixel_count: 64,
			canvas_width: 8,
			canvas_height: 8,
		}
	}

	fn mean_brightness(frame: &[Color]) -> f64 {
		frame.iter().map(|c| f64::from(c.brightness)).sum::<f64>() / frame.len() as f64
	}

	#[test]
	fn sunrise_starts_dark_and_ends_bright() {
		let effect = EffectSunrise::new(60.0, 1.0, SunOrigin::Bottom).unwrap();

		let night = effect.generate_frame(&ctx(0.0));
		assert_eq!(night.len(), 64);
		assert!(mean_brightness(&night) < 0.05);

		let day = effect.generate_frame(&ctx(60.0));
		assert!(mean_brightness(&day) > 0.30);
	}

	#[test]
	fn pixels_near_the_origin_lead() {
		// 40% through a bottom-origin sunrise: the bottom-center pixel is well into the warm
		// phases while the top corner is still cool and dim
		let effect = EffectSunrise::new(60.0, 1.0, SunOrigin::Bottom).unwrap();
		let frame = effect.generate_frame(&ctx(24.0));

		let top_corner = frame[0];
		let bottom_center = frame[7 * 8 + 3];

		assert!(bottom_center.brightness > top_corner.brightness);
		assert!(top_corner.hue >= 200.0);
		assert!(bottom_center.hue < 70.0);
	}

	#[test]
	fn sunset_runs_the_curve_backwards() {
		let sunrise = EffectSunrise::new(60.0, 1.0, SunOrigin::Bottom).unwrap();
		let sunset = EffectSunset::new(60.0, 1.0, false, SunOrigin::Bottom).unwrap();

		let rising = sunrise.generate_frame(&ctx(15.0));
		let setting = sunset.generate_frame(&ctx(45.0));
		assert_eq!(rising, setting);
	}

	#[test]
	fn center_origin_peaks_in_the_middle() {
		let effect = EffectSunrise::new(60.0, 1.0, SunOrigin::Center).unwrap();
		let frame = effect.generate_frame(&ctx(30.0));
		// Middle of the canvas vs a corner
		let middle = frame[3 * 8 + 3];
		assert!(middle.brightness > frame[0].brightness);
		assert!(middle.brightness > frame[63].brightness);
	}

	#[test]
	fn sunset_with_power_off_skips_restore() {
		let keeps = EffectSunset::new(60.0, 1.0, false, SunOrigin::Bottom).unwrap();
		assert!(keeps.restore_on_complete());

		let darkens = EffectSunset::new(60.0, 1.0, true, SunOrigin::Bottom).unwrap();
		assert!(!darkens.restore_on_complete());
	}

	#[test]
	fn sunrise_never_restores() {
		let effect = EffectSunrise::new(60.0, 1.0, SunOrigin::Bottom).unwrap();
		assert!(!effect.restore_on_complete());
	}

	#[test]
	fn rejects_bad_parameters() {
		assert!(EffectSunrise::new(0.0, 1.0, SunOrigin::Bottom).is_err());
		assert!(EffectSunrise::new(60.0, 1.5, SunOrigin::Bottom).is_err());
	}
}
