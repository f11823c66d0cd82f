//! Battery system classification and charge math.
//!
//! The monitor hardware samples a 12-bit ADC behind a 100k/10k resistor
//! divider, classifies the pack as a 12V/24V/48V system, and converts the
//! measured voltage to a charge percentage over the working window of that
//! system. The registry only caches the results; the functions here are the
//! pure math those collaborators run.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Divider resistor R1 in ohms.
pub const R1_OHMS: f32 = 100_000.0;

/// Divider resistor R2 in ohms.
pub const R2_OHMS: f32 = 10_000.0;

/// ADC reference voltage.
pub const ADC_VREF: f32 = 3.3;

/// Full-scale count of the 12-bit ADC.
pub const ADC_MAX: u16 = 4095;

/// Nominal battery system class, detected from the measured pack voltage.
///
/// Serializes as the nominal volt count (`0`, `12`, `24`, `48`), which is
/// also the byte the registry persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SystemType {
    /// Voltage did not match any supported system
    #[default]
    Unknown,
    /// 12V system (lead-acid window 8.4V - 10.8V)
    V12,
    /// 24V system
    V24,
    /// 48V system
    V48,
}

impl SystemType {
    /// Classify a measured pack voltage.
    ///
    /// Cutoffs follow the monitor firmware: anything up to 14.4V reads as a
    /// 12V system, up to 28.8V as 24V, up to 57.6V as 48V.
    ///
    /// # Example
    ///
    /// ```
    /// use battreg::SystemType;
    ///
    /// assert_eq!(SystemType::detect(12.8), SystemType::V12);
    /// assert_eq!(SystemType::detect(25.1), SystemType::V24);
    /// assert_eq!(SystemType::detect(51.0), SystemType::V48);
    /// assert_eq!(SystemType::detect(90.0), SystemType::Unknown);
    /// ```
    pub fn detect(voltage: f32) -> Self {
        if voltage <= 14.4 {
            SystemType::V12
        } else if voltage <= 28.8 {
            SystemType::V24
        } else if voltage <= 57.6 {
            SystemType::V48
        } else {
            SystemType::Unknown
        }
    }

    /// Nominal volt count of this system (0 for unknown).
    pub fn nominal_volts(self) -> u8 {
        match self {
            SystemType::Unknown => 0,
            SystemType::V12 => 12,
            SystemType::V24 => 24,
            SystemType::V48 => 48,
        }
    }
}

impl From<SystemType> for u8 {
    fn from(system: SystemType) -> u8 {
        system.nominal_volts()
    }
}

impl TryFrom<u8> for SystemType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(SystemType::Unknown),
            12 => Ok(SystemType::V12),
            24 => Ok(SystemType::V24),
            48 => Ok(SystemType::V48),
            other => Err(Error::UnknownSystemType(other)),
        }
    }
}

/// Convert a raw ADC count to the pack voltage ahead of the divider.
///
/// # Example
///
/// ```
/// use battreg::divider_voltage;
///
/// // Full-scale reads the divider's maximum input.
/// assert!((divider_voltage(4095) - 36.3).abs() < 0.01);
/// assert_eq!(divider_voltage(0), 0.0);
/// ```
pub fn divider_voltage(adc_count: u16) -> f32 {
    let counts = f32::from(adc_count.min(ADC_MAX));
    counts * (ADC_VREF / f32::from(ADC_MAX)) * ((R1_OHMS + R2_OHMS) / R2_OHMS)
}

/// Charge percentage of `voltage` within the working window of `system`.
///
/// The window is 70%-90% of the nominal voltage (e.g. 8.4V-10.8V for a 12V
/// system), clamped to 0-100. An unknown system always reads 0%.
///
/// # Example
///
/// ```
/// use battreg::{charge_percentage, SystemType};
///
/// assert_eq!(charge_percentage(10.8, SystemType::V12), 100);
/// assert_eq!(charge_percentage(9.6, SystemType::V12), 50);
/// assert_eq!(charge_percentage(8.4, SystemType::V12), 0);
/// assert_eq!(charge_percentage(50.0, SystemType::Unknown), 0);
/// ```
pub fn charge_percentage(voltage: f32, system: SystemType) -> u8 {
    let nominal = f32::from(system.nominal_volts());
    if nominal == 0.0 {
        return 0;
    }
    let min = nominal * 0.7;
    let max = nominal * 0.9;
    let percentage = (voltage - min) / (max - min) * 100.0;
    percentage.clamp(0.0, 100.0) as u8
}
