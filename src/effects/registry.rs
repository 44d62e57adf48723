use crate::{
	device::Device,
	error::Error,
	product::ProductCapability,
};

/// Device categories for effect compatibility classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
	Light,
	MultiZone,
	Matrix,
}

impl DeviceClass {
	pub fn classify(caps: &ProductCapability) -> DeviceClass {
		if caps.has_matrix {
			DeviceClass::Matrix
		} else if caps.has_multizone {
			DeviceClass::MultiZone
		} else {
			DeviceClass::Light
		}
	}
}

/// How well an effect suits a device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSupport {
	Recommended,
	Compatible,
	NotSupported,
}

/// Metadata about one registered effect.
#[derive(Debug, Clone, Copy)]
pub struct EffectInfo {
	/// Effect name, e.g. "flame"
	pub name: &'static str,
	/// Human-readable one-liner
	pub description: &'static str,
	support: [DeviceSupport; 3],
}

impl EffectInfo {
	pub fn support_for(&self, class: DeviceClass) -> DeviceSupport {
		match class {
			DeviceClass::Light => self.support[0],
			DeviceClass::MultiZone => self.support[1],
			DeviceClass::Matrix => self.support[2],
		}
	}
}

use DeviceSupport::{Compatible, NotSupported, Recommended};

// support order: [light, multizone, matrix]
static BUILTIN_EFFECTS: &[EffectInfo] = &[
	EffectInfo {
		name: "pulse",
		description: "Pulse, blink, or breathe effect using firmware waveforms",
		support: [Recommended, Recommended, Recommended],
	},
	EffectInfo {
		name: "colorloop",
		description: "Continuous hue rotation cycling through the color spectrum",
		support: [Recommended, Compatible, Compatible],
	},
	EffectInfo {
		name: "rainbow",
		description: "Animated rainbow spread across device pixels",
		support: [Compatible, Recommended, Recommended],
	},
	EffectInfo {
		name: "flame",
		description: "Fire/candle flicker with warm organic brightness variation",
		support: [Recommended, Recommended, Recommended],
	},
	EffectInfo {
		name: "aurora",
		description: "Northern lights simulation with flowing colored bands",
		support: [Compatible, Recommended, Recommended],
	},
	EffectInfo {
		name: "progress",
		description: "Animated progress bar with traveling bright spot",
		support: [NotSupported, Recommended, NotSupported],
	},
	EffectInfo {
		name: "sunrise",
		description: "Sunrise color transition from night to daylight",
		support: [NotSupported, NotSupported, Recommended],
	},
	EffectInfo {
		name: "sunset",
		description: "Sunset color transition from daylight to night",
		support: [NotSupported, NotSupported, Recommended],
	},
];

/// Enumerates the built-in effects and how well each suits a device class.
pub struct EffectRegistry {
	effects: Vec<EffectInfo>,
}

impl EffectRegistry {
	/// A registry holding every built-in effect.
	pub fn builtin() -> EffectRegistry {
		EffectRegistry {
			effects: BUILTIN_EFFECTS.to_vec(),
		}
	}

	pub fn register(&mut self, info: EffectInfo) {
		self.effects.retain(|e| e.name != info.name);
		self.effects.push(info);
	}

	pub fn effects(&self) -> &[EffectInfo] {
		&self.effects
	}

	pub fn get_effect(&self, name: &str) -> Option<&EffectInfo> {
		self.effects.iter().find(|e| e.name == name)
	}

	/// Effects usable on a device class, recommended ones first.
	pub fn effects_for_class(&self, class: DeviceClass) -> Vec<(EffectInfo, DeviceSupport)> {
		let mut results: Vec<(EffectInfo, DeviceSupport)> = self
			.effects
			.iter()
			.map(|info| (*info, info.support_for(class)))
			.filter(|(_, support)| *support != NotSupported)
			.collect();
		results.sort_by_key(|(_, support)| match support {
			Recommended => 0,
			_ => 1,
		});
		results
	}

	/// Effects usable on a concrete device, classified from its capability record.
	pub async fn effects_for_device(
		&self,
		device: &Device,
	) -> Result<Vec<(EffectInfo, DeviceSupport)>, Error> {
		let caps = device.capabilities().await?;
		Ok(self.effects_for_class(DeviceClass::classify(&caps)))
	}
}

impl Default for EffectRegistry {
	fn default() -> EffectRegistry {
		EffectRegistry::builtin()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtin_registry_knows_all_effects() {
		let registry = EffectRegistry::builtin();
		for name in [
			"pulse",
			"colorloop",
			"rainbow",
			"flame",
			"aurora",
			"progress",
			"sunrise",
			"sunset",
		] {
			assert!(registry.get_effect(name).is_some(), "missing {}", name);
		}
	}

	#[test]
	fn progress_is_multizone_only() {
		let registry = EffectRegistry::builtin();
		let info = registry.get_effect("progress").unwrap();
		assert_eq!(info.support_for(DeviceClass::MultiZone), Recommended);
		assert_eq!(info.support_for(DeviceClass::Light), NotSupported);
		assert_eq!(info.support_for(DeviceClass::Matrix), NotSupported);
	}

	#[test]
	fn recommended_effects_sort_first() {
		let registry = EffectRegistry::builtin();
		let for_strip = registry.effects_for_class(DeviceClass::MultiZone);
		let first_compatible = for_strip
			.iter()
			.position(|(_, s)| *s == Compatible)
			.unwrap_or(for_strip.len());
		assert!(for_strip[..first_compatible]
			.iter()
			.all(|(_, s)| *s == Recommended));
		// Sunrise never shows up for strips
		assert!(for_strip.iter().all(|(info, _)| info.name != "sunrise"));
	}

	#[test]
	fn matrix_class_wins_over_multizone() {
		let mut caps = ProductCapability::unknown();
		caps.has_multizone = true;
		caps.has_matrix = true;
		assert_eq!(DeviceClass::classify(&caps), DeviceClass::Matrix);
	}
}
