use std::f64::consts::PI;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;

use crate::{
	color::{Color, KELVIN_NEUTRAL},
	device::Device,
	effects::base::{requires_multizone, Effect},
	effects::frame::{run_frame_loop, FrameContext, FrameEffect, FrameEngine},
	error::Error,
};

/// The filled region's color: one solid color, or a gradient sampled along the whole bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Foreground {
	Solid(Color),
	/// At least two stops; pixels interpolate by their position across the entire bar, so
	/// growing the bar reveals progressively more of the gradient (thermometer semantics)
	Gradient(Vec<Color>),
}

/// Animated progress bar for multizone strips.
///
/// Pixels up to the current fill show the foreground with a travelling Gaussian-profile bright
/// spot; the rest show the background.  [EffectProgress::set_position] may be called at any time
/// and the bar follows on the next frame.
pub struct EffectProgress {
	engine: FrameEngine,
	start_value: f64,
	end_value: f64,
	position: StdMutex<f64>,
	foreground: Foreground,
	background: Color,
	spot_brightness: f64,
	spot_width: f64,
	spot_speed: f64,
	power_on: bool,
}

impl EffectProgress {
	pub fn new(
		start_value: f64,
		end_value: f64,
		position: f64,
		foreground: Option<Foreground>,
		background: Option<Color>,
	) -> Result<EffectProgress, Error> {
		if start_value >= end_value {
			return Err(Error::ProtocolError(format!(
				"start_value ({}) must be < end_value ({})",
				start_value, end_value
			)));
		}
		if !(start_value..=end_value).contains(&position) {
			return Err(Error::ProtocolError(format!(
				"position ({}) must be between {} and {}",
				position, start_value, end_value
			)));
		}
		let foreground = foreground.unwrap_or(Foreground::Solid(Color::GREEN));
		if let Foreground::Gradient(stops) = &foreground {
			if stops.len() < 2 {
				return Err(Error::ProtocolError(format!(
					"Foreground gradient must have at least 2 stops, got {}",
					stops.len()
				)));
			}
		}

		Ok(EffectProgress {
			engine: FrameEngine::new(20.0, None),
			start_value,
			end_value,
			position: StdMutex::new(position),
			foreground,
			background: background
				.unwrap_or_else(|| Color::new(0.0, 0.0, 0.05, KELVIN_NEUTRAL)),
			spot_brightness: 1.0,
			spot_width: 0.15,
			spot_speed: 1.0,
			power_on: true,
		})
	}

	pub fn with_spot(mut self, brightness: f64, width: f64, speed: f64) -> EffectProgress {
		self.spot_brightness = brightness.clamp(0.0, 1.0);
		self.spot_width = width.clamp(0.0, 1.0);
		self.spot_speed = speed.max(0.001);
		self
	}

	/// Moves the bar; takes effect on the next frame.  Values clamp into the configured range.
	pub fn set_position(&self, position: f64) {
		let clamped = position.clamp(self.start_value, self.end_value);
		*self.position.lock().unwrap_or_else(|e| e.into_inner()) = clamped;
	}

	pub fn position(&self) -> f64 {
		*self.position.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Interpolates a gradient color at a 0.0-1.0 position, hue wrapping the short way.
	fn gradient_color(position: f64, stops: &[Color]) -> Color {
		let position = position.clamp(0.0, 1.0);
		let n = stops.len() - 1;
		let scaled = position * n as f64;
		let idx = (scaled as usize).min(n - 1);
		let frac = scaled - idx as f64;

		let c1 = stops[idx];
		let c2 = stops[idx + 1];

		let mut hue_diff = f64::from(c2.hue) - f64::from(c1.hue);
		if hue_diff > 180.0 {
			hue_diff -= 360.0;
		} else if hue_diff < -180.0 {
			hue_diff += 360.0;
		}
		let hue = (f64::from(c1.hue) + frac * hue_diff).rem_euclid(360.0);

		Color::new(
			hue as f32,
			(f64::from(c1.saturation) + frac * f64::from(c2.saturation - c1.saturation)) as f32,
			(f64::from(c1.brightness) + frac * f64::from(c2.brightness - c1.brightness)) as f32,
			(f64::from(c1.kelvin) + frac * (f64::from(c2.kelvin) - f64::from(c1.kelvin))).round()
				as u16,
		)
	}

	/// The foreground color at a normalized position along the full bar.
	fn foreground_at(&self, position: f64) -> Color {
		match &self.foreground {
			Foreground::Solid(color) => *color,
			Foreground::Gradient(stops) => Self::gradient_color(position, stops),
		}
	}
}

#[async_trait]
impl Effect for EffectProgress {
	fn name(&self) -> &'static str {
		"progress"
	}

	fn power_on(&self) -> bool {
		self.power_on
	}

	async fn is_compatible(&self, light: &Device) -> Result<bool, Error> {
		requires_multizone(light).await
	}

	async fn from_poweroff_hsbk(&self, _light: &Device) -> Color {
		// The bar starts dark
		self.background
	}

	fn frame_engine(&self) -> Option<&FrameEngine> {
		Some(&self.engine)
	}

	async fn play(&self, _participants: &[Device]) -> Result<(), Error> {
		run_frame_loop(self).await
	}
}

impl FrameEffect for EffectProgress {
	fn engine(&self) -> &FrameEngine {
		&self.engine
	}

	fn generate_frame(&self, ctx: &FrameContext) -> Vec<Color> {
		let value_range = self.end_value - self.start_value;
		let fill = if value_range > 0.0 {
			((self.position() - self.start_value) / value_range).clamp(0.0, 1.0)
		} else {
			0.0
		};
		let fill_end = (fill * ctx.pixel_count as f64).round() as usize;

		// The bright spot oscillates within the filled region
		let (spot_pos, spot_pixel_width) = if fill_end > 0 {
			let spot_pos = fill_end as f64
				* (((ctx.elapsed_s * self.spot_speed * 2.0 * PI).sin() + 1.0) / 2.0);
			let width = (self.spot_width * fill_end as f64).max(1.0);
			(spot_pos, width)
		} else {
			(0.0, 1.0)
		};

		(0..ctx.pixel_count)
			.map(|i| {
				if i < fill_end {
					let bar_pos = i as f64 / (ctx.pixel_count - 1).max(1) as f64;
					let base = self.foreground_at(bar_pos);

					let dist = (i as f64 - spot_pos).abs();
					let boost = (-(dist / spot_pixel_width).powi(2)).exp();
					let brightness = f64::from(base.brightness)
						+ boost * (self.spot_brightness - f64::from(base.brightness));

					Color::new(
						base.hue,
						base.saturation,
						brightness.clamp(0.0, 1.0) as f32,
						base.kelvin,
					)
				} else {
					self.background
				}
			})
			.collect()
	}
}
