/// Static capability data for one LIFX product.
///
/// Data is taken from https://github.com/LIFX/products/blob/master/products.json
#[derive(Clone, Debug)]
pub struct ProductInfo {
	pub name: &'static str,
	pub color: bool,
	pub infrared: bool,
	pub multizone: bool,
	pub matrix: bool,
	pub chain: bool,
	pub ceiling: bool,
	pub hev: bool,
	pub kelvin_min: u16,
	pub kelvin_max: u16,
	/// Minimum host firmware (major, minor) for the extended multizone messages
	pub min_ext_mz_firmware: Option<(u16, u16)>,
}

/// Effective capabilities of one concrete device: the product record with firmware gating
/// applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProductCapability {
	pub has_color: bool,
	pub has_infrared: bool,
	pub has_multizone: bool,
	pub has_extended_multizone: bool,
	pub has_matrix: bool,
	pub has_chain: bool,
	pub has_ceiling: bool,
	pub has_hev: bool,
	pub kelvin_min: u16,
	pub kelvin_max: u16,
}

impl ProductInfo {
	/// Resolves the effective capabilities given the device's host firmware version.
	///
	/// Extended multizone is cleared when the host firmware predates the product's
	/// `min_ext_mz_firmware` threshold.  This happens here, as part of capability processing,
	/// never at request time.
	pub fn capabilities(&self, firmware_version: u32) -> ProductCapability {
		let firmware = (
			(firmware_version >> 16) as u16,
			(firmware_version & 0xffff) as u16,
		);
		let has_extended_multizone = self.multizone
			&& match self.min_ext_mz_firmware {
				Some(min) => firmware >= min,
				None => false,
			};
		ProductCapability {
			has_color: self.color,
			has_infrared: self.infrared,
			has_multizone: self.multizone,
			has_extended_multizone,
			has_matrix: self.matrix,
			has_chain: self.chain,
			has_ceiling: self.ceiling,
			has_hev: self.hev,
			kelvin_min: self.kelvin_min,
			kelvin_max: self.kelvin_max,
		}
	}
}

impl ProductCapability {
	/// Capabilities to assume when the product is not in the table: a plain color bulb.
	pub fn unknown() -> ProductCapability {
		ProductCapability {
			has_color: true,
			has_infrared: false,
			has_multizone: false,
			has_extended_multizone: false,
			has_matrix: false,
			has_chain: false,
			has_ceiling: false,
			has_hev: false,
			kelvin_min: 1500,
			kelvin_max: 9000,
		}
	}
}

const W: ProductInfo = ProductInfo {
	name: "",
	color: false,
	infrared: false,
	multizone: false,
	matrix: false,
	chain: false,
	ceiling: false,
	hev: false,
	kelvin_min: 2700,
	kelvin_max: 6500,
	min_ext_mz_firmware: None,
};
const C: ProductInfo = ProductInfo {
	color: true,
	kelvin_min: 1500,
	kelvin_max: 9000,
	..W
};
const EXT_MZ: Option<(u16, u16)> = Some((2, 77));

#[rustfmt::skip]
static PRODUCTS: &[(u32, u32, ProductInfo)] = &[
	(1,   1, ProductInfo { name: "Original 1000",      ..C }),
	(1,   3, ProductInfo { name: "Color 650",          ..C }),
	(1,  10, ProductInfo { name: "White 800",          ..W }),
	(1,  22, ProductInfo { name: "Color 1000",         ..C }),
	(1,  27, ProductInfo { name: "LIFX A19",           ..C }),
	(1,  28, ProductInfo { name: "LIFX BR30",          ..C }),
	(1,  29, ProductInfo { name: "LIFX+ A19",          infrared: true, ..C }),
	(1,  30, ProductInfo { name: "LIFX+ BR30",         infrared: true, ..C }),
	(1,  31, ProductInfo { name: "LIFX Z",             multizone: true, min_ext_mz_firmware: EXT_MZ, ..C }),
	(1,  32, ProductInfo { name: "LIFX Z 2",           multizone: true, min_ext_mz_firmware: EXT_MZ, ..C }),
	(1,  36, ProductInfo { name: "LIFX Downlight",     ..C }),
	(1,  38, ProductInfo { name: "LIFX Beam",          multizone: true, min_ext_mz_firmware: EXT_MZ, ..C }),
	(1,  43, ProductInfo { name: "LIFX A19",           ..C }),
	(1,  44, ProductInfo { name: "LIFX BR30",          ..C }),
	(1,  49, ProductInfo { name: "LIFX Mini",          ..C }),
	(1,  51, ProductInfo { name: "LIFX Mini White",    kelvin_min: 2700, kelvin_max: 2700, ..W }),
	(1,  52, ProductInfo { name: "LIFX GU10",          ..C }),
	(1,  55, ProductInfo { name: "LIFX Tile",          matrix: true, chain: true, ..C }),
	(1,  57, ProductInfo { name: "LIFX Candle",        matrix: true, ..C }),
	(1,  59, ProductInfo { name: "LIFX Mini Color",    ..C }),
	(1,  68, ProductInfo { name: "LIFX Candle",        matrix: true, ..C }),
	(1,  90, ProductInfo { name: "LIFX Clean",         hev: true, ..C }),
	(1,  99, ProductInfo { name: "LIFX Clean",         hev: true, ..C }),
	(1, 117, ProductInfo { name: "LIFX Z US",          multizone: true, min_ext_mz_firmware: EXT_MZ, ..C }),
	(1, 118, ProductInfo { name: "LIFX Z Intl",        multizone: true, min_ext_mz_firmware: EXT_MZ, ..C }),
	(1, 161, ProductInfo { name: "LIFX Outdoor Neon",  multizone: true, min_ext_mz_firmware: EXT_MZ, ..C }),
	(1, 173, ProductInfo { name: "LIFX A19 Polychrome", ..C }),
	(1, 176, ProductInfo { name: "LIFX Ceiling",       matrix: true, ceiling: true, ..C }),
	(1, 177, ProductInfo { name: "LIFX Ceiling",       matrix: true, ceiling: true, ..C }),
];

/// Look up info about what a LIFX product supports.
///
/// You can get the vendor and product IDs from a bulb by receiving a [crate::Message::StateVersion]
/// message.
pub fn get_product_info(vendor: u32, product: u32) -> Option<&'static ProductInfo> {
	PRODUCTS
		.iter()
		.find(|(v, p, _)| *v == vendor && *p == product)
		.map(|(_, _, info)| info)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strip_capabilities_gate_on_firmware() {
		let z2 = get_product_info(1, 32).unwrap();

		// firmware 2.60: multizone yes, extended multizone no
		let old = z2.capabilities((2 << 16) | 60);
		assert!(old.has_multizone);
		assert!(!old.has_extended_multizone);

		// firmware 2.77: gate opens
		let new = z2.capabilities((2 << 16) | 77);
		assert!(new.has_extended_multizone);

		// major bump clears it too
		let major = z2.capabilities(3 << 16);
		assert!(major.has_extended_multizone);
	}

	#[test]
	fn matrix_products_have_no_extended_multizone() {
		let tile = get_product_info(1, 55).unwrap();
		let caps = tile.capabilities((3 << 16) | 70);
		assert!(caps.has_matrix);
		assert!(caps.has_chain);
		assert!(!caps.has_multizone);
		assert!(!caps.has_extended_multizone);
	}

	#[test]
	fn ceiling_is_a_matrix_device() {
		let ceiling = get_product_info(1, 176).unwrap();
		let caps = ceiling.capabilities(4 << 16);
		assert!(caps.has_matrix);
		assert!(caps.has_ceiling);
	}

	#[test]
	fn unknown_product_falls_back() {
		assert!(get_product_info(1, 9999).is_none());
		assert!(ProductCapability::unknown().has_color);
	}
}
