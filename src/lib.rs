//! # battreg
//!
//! Persistent device registry for small battery monitor / relay controller
//! units.
//!
//! A monitor unit watches a battery bank through a resistor divider,
//! classifies it as a 12V/24V/48V system, and publishes a charge
//! percentage. Relay units around it ask the monitor for their cutoff over
//! HTTP and switch a load when the charge crosses it. The monitor persists
//! everything it knows in one small non-volatile byte region:
//!
//! - three scalar settings (system type, last charge percentage, fallback
//!   threshold) at fixed offsets, and
//! - a fixed table mapping device ids to per-device integer values.
//!
//! This crate is that region: the [`DeviceRegistry`] store, the durable
//! [`Backing`] seam under it, the battery math that feeds it, and the JSON
//! wire types of the HTTP surface. ADC sampling, displays, GPIO, and Wi-Fi
//! stay in the firmware glue that calls in.
//!
//! ## Quick start
//!
//! ```
//! use battreg::{DeviceRegistry, MemoryBacking, SystemType};
//!
//! let mut registry = DeviceRegistry::open(MemoryBacking::new())?;
//!
//! // Per-device records, committed durably before the call returns.
//! registry.upsert("relay-barn", 45)?;
//! assert_eq!(registry.get("relay-barn"), Some(45));
//!
//! // Unit-wide scalars, owned by the registry.
//! registry.set_system_type(SystemType::V24)?;
//! registry.set_threshold_percentage(50)?;
//! assert_eq!(registry.settings().threshold_percentage, 50);
//! # Ok::<(), battreg::Error>(())
//! ```
//!
//! ## HTTP surface
//!
//! With the `axum` feature, [`axum_ext`] serves the endpoints deployed
//! relay clients expect:
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/setVoltages` | POST | Bulk upsert of `{deviceId: value}` pairs |
//! | `/setPercentageOffs` | POST | Later firmware's name for the same |
//! | `/getVoltageById` | GET | Per-device value, with threshold fallback |
//! | `/deleteDevice` | POST | Remove one device record |
//!
//! ## Storage layout
//!
//! Flat region of [`REGION_SIZE`] bytes, no header or checksum: settings
//! bytes first, then [`MAX_DEVICES`] slots of [`BLOCK_SIZE`] bytes each
//! (zero-padded id, little-endian `i32`). An all-zero id field marks a
//! free slot. The layout is fixed at compile time and never resized.
//!
//! ## Feature flags
//!
//! - `axum` - handlers and router for the HTTP surface

pub mod battery;
mod error;
mod registry;
mod storage;
mod wire;

pub use battery::{charge_percentage, divider_voltage, SystemType};
pub use error::Error;
pub use registry::{DeviceRegistry, Settings};
pub use storage::{Backing, FileBacking, MemoryBacking};
pub use wire::{DeleteRequest, ErrorResponse, StatusResponse, VoltageReading};

/// Slot capacity of the device table.
pub const MAX_DEVICES: usize = 10;

/// Width of the fixed id field within a slot.
pub const DEVICE_ID_SIZE: usize = 16;

/// Width of the stored value (one `i32`).
pub const VALUE_SIZE: usize = 4;

/// Bytes per slot: id field plus value.
pub const BLOCK_SIZE: usize = DEVICE_ID_SIZE + VALUE_SIZE;

/// Reserved leading bytes holding the scalar settings.
pub const SETTINGS_LEN: usize = 4;

/// Total size of the persisted region.
pub const REGION_SIZE: usize = SETTINGS_LEN + MAX_DEVICES * BLOCK_SIZE;

// Re-export axum integration
#[cfg(feature = "axum")]
pub mod axum_ext;
