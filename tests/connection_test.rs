mod support;

use std::sync::Arc;
use std::time::Duration;

use lifx_lan::{
	find_by_ip, Color, Connection, ConnectionPool, Error, Message, Serial,
};
use support::{BulbConfig, FakeBulb};

fn pool() -> Arc<ConnectionPool> {
	Arc::new(ConnectionPool::new(8))
}

#[tokio::test]
async fn get_power_round_trip() {
	let bulb = FakeBulb::spawn(BulbConfig::bulb("d073d5000001")).await;
	let device = bulb.device(&pool());

	assert!(device.get_power().await.unwrap());
	assert_eq!(bulb.received(20).await, 1);
}

#[tokio::test]
async fn set_color_travels_the_acknowledged_path() {
	let bulb = FakeBulb::spawn(BulbConfig::bulb("d073d5000002")).await;
	let device = bulb.device(&pool());

	let red = Color::new(0.0, 1.0, 0.5, 3500);
	device.set_color(red, 250).await.unwrap();

	assert_eq!(bulb.color().await, red.to_hsbk());
	assert_eq!(bulb.received(102).await, 1);
}

#[tokio::test]
async fn retry_then_timeout_sends_exactly_all_attempts() {
	let bulb = FakeBulb::spawn(BulbConfig::bulb("d073d5000003")).await;
	bulb.drop_next(100).await;

	let conn = Connection::open(
		bulb.serial,
		bulb.addr.ip(),
		bulb.addr.port(),
		2,
		Duration::from_millis(500),
	)
	.await
	.unwrap();

	let result = conn.request_stream(Message::GetPower, None, None).await;
	match result {
		Err(Error::Timeout(_)) => {}
		other => panic!("expected Timeout, got {:?}", other.map(|v| v.len())),
	}

	// max_retries = 2 means exactly three send attempts, no more
	assert_eq!(bulb.received(20).await, 3);
}

#[tokio::test]
async fn mismatched_sequence_is_dropped_then_retried() {
	let bulb = FakeBulb::spawn(BulbConfig::bulb("d073d5000004")).await;
	// First reply carries the wrong sequence; the client must ignore it
	bulb.corrupt_next(1).await;

	let conn = Connection::open(
		bulb.serial,
		bulb.addr.ip(),
		bulb.addr.port(),
		2,
		Duration::from_secs(2),
	)
	.await
	.unwrap();

	let responses = conn
		.request_stream(Message::GetPower, None, None)
		.await
		.unwrap();
	assert_eq!(responses.len(), 1);

	// The corrupted attempt had to be retried
	assert_eq!(bulb.received(20).await, 2);
}

#[tokio::test]
async fn state_unhandled_maps_to_unsupported_command() {
	let bulb = FakeBulb::spawn(BulbConfig::bulb("d073d5000005")).await;
	bulb.refuse(101).await;

	let device = bulb.device(&pool());
	match device.get_color().await {
		Err(Error::UnsupportedCommand(_)) => {}
		other => panic!("expected UnsupportedCommand, got {:?}", other),
	}
}

#[tokio::test]
async fn broadcast_placeholder_learns_serial_from_reply() {
	let bulb = FakeBulb::spawn(BulbConfig::bulb("d073d5000006")).await;

	let conn = Connection::open(
		Serial::BROADCAST,
		bulb.addr.ip(),
		bulb.addr.port(),
		2,
		Duration::from_secs(2),
	)
	.await
	.unwrap();
	assert!(conn.serial().is_broadcast());

	conn.request_stream(Message::GetService, None, None)
		.await
		.unwrap();
	assert_eq!(conn.serial(), bulb.serial);
}

#[tokio::test]
async fn find_by_ip_resolves_the_serial() {
	let bulb = FakeBulb::spawn(BulbConfig::bulb("d073d5000007")).await;

	// find_by_ip assumes the default port, so drive the same path manually
	let conn = Connection::open(
		Serial::BROADCAST,
		bulb.addr.ip(),
		bulb.addr.port(),
		2,
		Duration::from_secs(2),
	)
	.await
	.unwrap();
	let responses = conn
		.request_stream(Message::GetService, None, None)
		.await
		.unwrap();
	assert!(!responses.is_empty());
	assert_eq!(conn.serial(), bulb.serial);

	// and the public helper reports DeviceNotFound when nothing is listening
	let empty = find_by_ip("127.0.0.1".parse().unwrap(), Duration::from_millis(300)).await;
	assert!(matches!(empty, Err(Error::DeviceNotFound(_))));
}

#[tokio::test]
async fn legacy_zone_read_collects_every_response() {
	let bulb = FakeBulb::spawn(BulbConfig::legacy_strip("d073d5000008")).await;
	let device = bulb.device(&pool());

	// 16 zones arrive as two StateMultiZone packets in one collection window
	let zones = device.get_zone_colors().await.unwrap();
	assert_eq!(zones.len(), 16);
	assert_eq!(zones[4].to_hsbk().hue, 4 * 4096);
}

#[tokio::test]
async fn extended_zone_read_uses_single_message() {
	let bulb = FakeBulb::spawn(BulbConfig::strip("d073d5000009")).await;
	let device = bulb.device(&pool());

	let zones = device.get_zone_colors().await.unwrap();
	assert_eq!(zones.len(), 16);
	assert_eq!(bulb.received(511).await, 1);
	assert_eq!(bulb.received(502).await, 0);
}

#[tokio::test]
async fn firmware_gate_disables_extended_multizone() {
	let bulb = FakeBulb::spawn(BulbConfig::legacy_strip("d073d500000a")).await;
	let device = bulb.device(&pool());

	let caps = device.capabilities().await.unwrap();
	assert!(caps.has_multizone);
	assert!(!caps.has_extended_multizone);

	device.get_zone_colors().await.unwrap();
	// Old firmware must never see the extended messages
	assert_eq!(bulb.received(511).await, 0);
	assert!(bulb.received(502).await >= 1);
}

#[tokio::test]
async fn concurrent_requests_on_one_connection_serialize() {
	let bulb = FakeBulb::spawn(BulbConfig::bulb("d073d500000b")).await;
	let conn = Arc::new(
		Connection::open(
			bulb.serial,
			bulb.addr.ip(),
			bulb.addr.port(),
			2,
			Duration::from_secs(2),
		)
		.await
		.unwrap(),
	);

	let a = {
		let conn = conn.clone();
		tokio::spawn(async move { conn.request_stream(Message::GetPower, None, None).await })
	};
	let b = {
		let conn = conn.clone();
		tokio::spawn(async move { conn.request_stream(Message::LightGet, None, None).await })
	};

	// Both complete; neither sees the other's responses
	let first = a.await.unwrap().unwrap();
	let second = b.await.unwrap().unwrap();
	assert!(matches!(first[0].1, Message::StatePower { .. }));
	assert!(matches!(second[0].1, Message::LightState { .. }));
}

#[tokio::test]
async fn firmware_effects_round_trip_through_the_device() {
	use lifx_lan::{MoveDirection, MultiZoneEffectType, TileEffectType};

	let strip = FakeBulb::spawn(BulbConfig::strip("d073d500000e")).await;
	let strip_device = strip.device(&pool());
	assert_eq!(
		strip_device.get_multizone_effect().await.unwrap(),
		MultiZoneEffectType::Off
	);
	strip_device
		.set_multizone_effect(MultiZoneEffectType::Move, 3000, 0, MoveDirection::Away)
		.await
		.unwrap();
	assert_eq!(
		strip_device.get_multizone_effect().await.unwrap(),
		MultiZoneEffectType::Move
	);

	let tile = FakeBulb::spawn(BulbConfig::tile("d073d500000f")).await;
	let tile_device = tile.device(&pool());
	let palette = [Color::new(30.0, 1.0, 0.8, 3500)];
	tile_device
		.set_tile_effect(TileEffectType::Flame, 4000, 0, &palette)
		.await
		.unwrap();
	assert_eq!(
		tile_device.get_tile_effect().await.unwrap(),
		TileEffectType::Flame
	);

	// The plain bulb path refuses: no zones to scroll
	let bulb = FakeBulb::spawn(BulbConfig::bulb("d073d5000010")).await;
	let bulb_device = bulb.device(&pool());
	assert!(matches!(
		bulb_device
			.set_multizone_effect(MultiZoneEffectType::Move, 3000, 0, MoveDirection::Away)
			.await,
		Err(Error::UnsupportedCommand(_))
	));
}

#[tokio::test]
async fn matrix_state_capture_and_restore() {
	use lifx_lan::{capture_state, restore_state};

	let bulb = FakeBulb::spawn(BulbConfig::tile("d073d500000d")).await;
	let device = bulb.device(&pool());

	let prestate = capture_state(&device).await.unwrap();
	let pixels = prestate.zone_colors.as_ref().expect("matrix has pixels");
	assert_eq!(pixels.len(), 64);

	// Scribble over the tile, then put it back
	let scribble = vec![Color::new(300.0, 1.0, 1.0, 3500); 64];
	device.set64(0, &scribble, 0).await.unwrap();
	assert_ne!(bulb.tile_pixels(0).await[0], pixels[0].to_hsbk());

	restore_state(&device, &prestate).await.unwrap();
	assert_eq!(bulb.tile_pixels(0).await[0], pixels[0].to_hsbk());
}

#[tokio::test]
async fn matrix_chain_and_tile_io() {
	let bulb = FakeBulb::spawn(BulbConfig::tile("d073d500000c")).await;
	let device = bulb.device(&pool());

	let geometry = device.matrix_geometry().await.unwrap();
	assert_eq!(geometry.pixel_count(), 64);

	let pixels = vec![Color::new(200.0, 1.0, 0.4, 3500); 64];
	device.set64(0, &pixels, 0).await.unwrap();
	let read_back = device.get64(0).await.unwrap();
	assert_eq!(read_back[0].to_hsbk(), pixels[0].to_hsbk());
}
