//! The persistent device registry and its scalar settings.
//!
//! One flat byte region holds everything the unit persists: three settings
//! bytes at fixed offsets, then a fixed table of device slots. Each slot is
//! a zero-padded id field followed by a little-endian `i32` value. A slot
//! whose id field is all zeros is free. Lookups are forward linear scans;
//! inserts claim the first free slot; deletes zero the whole block.
//!
//! Every mutation is committed to the [`Backing`] before the call returns,
//! so a crash immediately after a successful call cannot lose the write.
//! All offset arithmetic lives in this module; callers never compute slot
//! addresses themselves.

use std::ops::Range;

use crate::storage::Backing;
use crate::{Error, SystemType, BLOCK_SIZE, DEVICE_ID_SIZE, MAX_DEVICES, REGION_SIZE, SETTINGS_LEN};

// Reserved settings offsets, ahead of the device table.
const SYSTEM_TYPE_OFFSET: usize = 0;
const LAST_PERCENTAGE_OFFSET: usize = 1;
const THRESHOLD_OFFSET: usize = 2;

/// The process-wide scalar settings persisted ahead of the device table.
///
/// These used to be free-standing globals in the monitor firmware; here
/// they are owned by the registry and only mutated through its setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    /// Detected nominal battery system
    pub system_type: SystemType,

    /// Last computed charge percentage (0-100)
    pub last_percentage: u8,

    /// Cutoff percentage relay clients fall back to when their device id
    /// has no per-device record (0-100)
    pub threshold_percentage: u8,
}

/// Fixed-capacity table of `device id -> i32` records over a durable byte
/// region.
///
/// # Example
///
/// ```
/// use battreg::{DeviceRegistry, MemoryBacking};
///
/// let mut registry = DeviceRegistry::open(MemoryBacking::new())?;
///
/// registry.upsert("dev1", 77)?;
/// assert_eq!(registry.get("dev1"), Some(77));
///
/// assert!(registry.remove("dev1")?);
/// assert_eq!(registry.get("dev1"), None);
/// # Ok::<(), battreg::Error>(())
/// ```
#[derive(Debug)]
pub struct DeviceRegistry<B: Backing> {
    region: Vec<u8>,
    backing: B,
}

impl<B: Backing> DeviceRegistry<B> {
    /// Open the registry over `backing`.
    ///
    /// A backing that has never been committed starts as an all-zero region
    /// (every slot free, all settings 0). Out-of-range settings bytes are
    /// coerced to 0, matching how the firmware validated its EEPROM reads
    /// at boot. A persisted region of the wrong length is refused with
    /// [`Error::Corrupt`].
    pub fn open(mut backing: B) -> Result<Self, Error> {
        let region = match backing.load()? {
            Some(bytes) => {
                if bytes.len() != REGION_SIZE {
                    return Err(Error::Corrupt {
                        expected: REGION_SIZE,
                        found: bytes.len(),
                    });
                }
                bytes
            }
            None => {
                let zeroed = vec![0u8; REGION_SIZE];
                backing.commit(&zeroed)?;
                tracing::info!(slots = MAX_DEVICES, "initialized empty registry region");
                zeroed
            }
        };

        let mut registry = Self { region, backing };
        registry.sanitize_settings()?;
        Ok(registry)
    }

    /// Slot capacity of the table.
    pub fn capacity(&self) -> usize {
        MAX_DEVICES
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        (0..MAX_DEVICES).filter(|&index| !self.slot_is_free(index)).count()
    }

    /// Find the slot holding `device_id`, scanning slots in order.
    ///
    /// Comparison is byte-exact and case-sensitive. Returns the lowest
    /// matching index, or `None` after a full scan.
    pub fn find_slot(&self, device_id: &str) -> Option<usize> {
        if device_id.is_empty() {
            // An empty id would compare equal to every free slot.
            return None;
        }
        (0..MAX_DEVICES).find(|&index| self.stored_id(index) == device_id.as_bytes())
    }

    /// Read the value stored for `device_id`, or `None` if it has no slot.
    pub fn get(&self, device_id: &str) -> Option<i32> {
        self.find_slot(device_id).map(|index| self.stored_value(index))
    }

    /// Insert or update the record for `device_id` and commit it durably.
    ///
    /// An existing record is updated in place (same slot, id untouched); a
    /// new record claims the first free slot. Returns the slot index used.
    ///
    /// # Errors
    ///
    /// [`Error::RegistryFull`] if the id is new and no slot is free (the
    /// region is left byte-for-byte unchanged), [`Error::EmptyDeviceId`] /
    /// [`Error::IdTooLong`] / [`Error::NulInDeviceId`] for ids that cannot
    /// be stored, [`Error::Storage`] if the commit fails (the in-memory
    /// region is rolled back to the durable state).
    pub fn upsert(&mut self, device_id: &str, value: i32) -> Result<usize, Error> {
        check_id(device_id)?;

        let index = match self.find_slot(device_id) {
            Some(index) => index,
            None => self
                .first_free_slot()
                .ok_or(Error::RegistryFull { max: MAX_DEVICES })?,
        };

        let range = slot_range(index);
        let mut previous = [0u8; BLOCK_SIZE];
        previous.copy_from_slice(&self.region[range.clone()]);

        let (id_field, value_field) = self.region[range.clone()].split_at_mut(DEVICE_ID_SIZE);
        id_field.fill(0);
        id_field[..device_id.len()].copy_from_slice(device_id.as_bytes());
        value_field.copy_from_slice(&value.to_le_bytes());

        if let Err(err) = self.backing.commit(&self.region) {
            self.region[range].copy_from_slice(&previous);
            return Err(err);
        }

        tracing::debug!(device = device_id, value, slot = index, "stored device record");
        Ok(index)
    }

    /// Remove the record for `device_id`, zero-filling its block.
    ///
    /// Returns `Ok(true)` if a record was removed and committed, `Ok(false)`
    /// if no slot held the id (the region is untouched).
    pub fn remove(&mut self, device_id: &str) -> Result<bool, Error> {
        let Some(index) = self.find_slot(device_id) else {
            return Ok(false);
        };

        let range = slot_range(index);
        let mut previous = [0u8; BLOCK_SIZE];
        previous.copy_from_slice(&self.region[range.clone()]);

        self.region[range.clone()].fill(0);

        if let Err(err) = self.backing.commit(&self.region) {
            self.region[range].copy_from_slice(&previous);
            return Err(err);
        }

        tracing::debug!(device = device_id, slot = index, "removed device record");
        Ok(true)
    }

    /// Current scalar settings.
    pub fn settings(&self) -> Settings {
        Settings {
            system_type: SystemType::try_from(self.region[SYSTEM_TYPE_OFFSET])
                .unwrap_or_default(),
            last_percentage: self.region[LAST_PERCENTAGE_OFFSET],
            threshold_percentage: self.region[THRESHOLD_OFFSET],
        }
    }

    /// Persist the detected battery system.
    pub fn set_system_type(&mut self, system: SystemType) -> Result<(), Error> {
        self.write_setting(SYSTEM_TYPE_OFFSET, system.nominal_volts())
    }

    /// Persist the fallback threshold percentage (0-100).
    pub fn set_threshold_percentage(&mut self, percentage: u8) -> Result<(), Error> {
        if percentage > 100 {
            return Err(Error::InvalidPercentage { value: percentage });
        }
        self.write_setting(THRESHOLD_OFFSET, percentage)
    }

    /// Cache the most recent computed charge percentage.
    ///
    /// The value is clamped to 0-100 and stored truncated to a whole
    /// percent, as the firmware did.
    pub fn set_last_percentage(&mut self, percentage: f32) -> Result<(), Error> {
        self.write_setting(LAST_PERCENTAGE_OFFSET, percentage.clamp(0.0, 100.0) as u8)
    }

    fn write_setting(&mut self, offset: usize, byte: u8) -> Result<(), Error> {
        let previous = self.region[offset];
        self.region[offset] = byte;
        if let Err(err) = self.backing.commit(&self.region) {
            self.region[offset] = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Coerce out-of-range settings bytes to 0, committing only if
    /// something actually changed.
    fn sanitize_settings(&mut self) -> Result<(), Error> {
        let mut changed = false;

        if SystemType::try_from(self.region[SYSTEM_TYPE_OFFSET]).is_err() {
            tracing::warn!(
                byte = self.region[SYSTEM_TYPE_OFFSET],
                "invalid stored system type, resetting to 0"
            );
            self.region[SYSTEM_TYPE_OFFSET] = 0;
            changed = true;
        }
        for offset in [LAST_PERCENTAGE_OFFSET, THRESHOLD_OFFSET] {
            if self.region[offset] > 100 {
                tracing::warn!(offset, byte = self.region[offset], "invalid stored percentage, resetting to 0");
                self.region[offset] = 0;
                changed = true;
            }
        }

        if changed {
            self.backing.commit(&self.region)?;
        }
        Ok(())
    }

    /// Stored id bytes of a slot, trimmed at the first zero byte.
    fn stored_id(&self, index: usize) -> &[u8] {
        let range = slot_range(index);
        let id_field = &self.region[range.start..range.start + DEVICE_ID_SIZE];
        let len = id_field.iter().position(|&b| b == 0).unwrap_or(DEVICE_ID_SIZE);
        &id_field[..len]
    }

    fn stored_value(&self, index: usize) -> i32 {
        let range = slot_range(index);
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.region[range.start + DEVICE_ID_SIZE..range.end]);
        i32::from_le_bytes(bytes)
    }

    fn slot_is_free(&self, index: usize) -> bool {
        self.stored_id(index).is_empty()
    }

    fn first_free_slot(&self) -> Option<usize> {
        (0..MAX_DEVICES).find(|&index| self.slot_is_free(index))
    }
}

/// Byte range of one slot within the region. The only place slot offsets
/// are computed.
fn slot_range(index: usize) -> Range<usize> {
    debug_assert!(index < MAX_DEVICES);
    let start = SETTINGS_LEN + index * BLOCK_SIZE;
    start..start + BLOCK_SIZE
}

fn check_id(device_id: &str) -> Result<(), Error> {
    if device_id.is_empty() {
        return Err(Error::EmptyDeviceId);
    }
    if device_id.len() > DEVICE_ID_SIZE {
        return Err(Error::IdTooLong {
            len: device_id.len(),
            max: DEVICE_ID_SIZE,
        });
    }
    if device_id.as_bytes().contains(&0) {
        return Err(Error::NulInDeviceId);
    }
    Ok(())
}
