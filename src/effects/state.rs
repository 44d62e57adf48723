use tracing::debug;

use crate::{color::Color, device::Device, error::Error};

/// Transition used when putting a device back the way it was.
const RESTORE_TRANSITION_MS: u32 = 500;

/// A device's state as captured at effect start: power, the whole-device color, and the per-zone
/// colors for multizone and matrix devices.
#[derive(Debug, Clone, PartialEq)]
pub struct PreState {
	pub power: bool,
	pub color: Color,
	pub zone_colors: Option<Vec<Color>>,
}

/// Captures everything needed to put the device back afterwards.
///
/// Power and color come from one LightGet; zone colors are fetched for multizone devices (via
/// the extended read) and matrix devices (one Get64 per tile).
pub async fn capture_state(device: &Device) -> Result<PreState, Error> {
	let caps = device.capabilities().await?;
	let (color, power, _label) = device.get_light_state().await?;

	let zone_colors = if caps.has_multizone {
		Some(device.get_zone_colors().await?)
	} else if caps.has_matrix {
		let geometry = device.matrix_geometry().await?;
		let mut pixels = Vec::with_capacity(geometry.pixel_count());
		for tile in 0..geometry.tile_count {
			pixels.extend(device.get64(tile as u8).await?);
		}
		Some(pixels)
	} else {
		None
	};

	debug!(
		serial = %device.serial(),
		power,
		has_zones = zone_colors.is_some(),
		"captured pre-state"
	);

	Ok(PreState {
		power,
		color,
		zone_colors,
	})
}

/// Sends the inverse SETs over the acknowledged path so restore completion is observable.
///
/// Zones first, then the whole-device color, then power, each with a short transition.
pub async fn restore_state(device: &Device, prestate: &PreState) -> Result<(), Error> {
	let caps = device.capabilities().await?;

	if let Some(zones) = &prestate.zone_colors {
		if caps.has_matrix {
			let geometry = device.matrix_geometry().await?;
			let per_tile = geometry.tile_width * geometry.tile_height;
			for (tile, chunk) in zones.chunks(per_tile).enumerate() {
				device
					.set64(tile as u8, chunk, RESTORE_TRANSITION_MS)
					.await?;
			}
		} else {
			device.set_zone_colors(zones, RESTORE_TRANSITION_MS).await?;
		}
	} else {
		device.set_color(prestate.color, RESTORE_TRANSITION_MS).await?;
	}

	device
		.set_power_duration(prestate.power, RESTORE_TRANSITION_MS)
		.await?;

	debug!(serial = %device.serial(), power = prestate.power, "restored pre-state");
	Ok(())
}
