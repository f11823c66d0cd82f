//! Error types for the battreg registry.

use thiserror::Error;

/// Errors that can occur when operating on the device registry.
///
/// Lookup misses are not errors: `get` returns `Option` and `remove`
/// reports a miss as `Ok(false)`.
#[derive(Debug, Error)]
pub enum Error {
    /// Every slot is occupied and the id is not already present
    #[error("device registry full (all {max} slots occupied)")]
    RegistryFull {
        /// Slot capacity of the registry
        max: usize,
    },

    /// Device id does not fit the fixed-width id field
    #[error("device id of {len} bytes exceeds the {max} byte id field")]
    IdTooLong {
        /// Byte length of the rejected id
        len: usize,
        /// Width of the id field
        max: usize,
    },

    /// Empty device id (an all-zero id field marks a free slot)
    #[error("device id must not be empty")]
    EmptyDeviceId,

    /// Device id contains a NUL byte, which terminates the stored id early
    #[error("device id must not contain NUL bytes")]
    NulInDeviceId,

    /// Persisted region does not match the expected layout
    #[error("persisted region is {found} bytes, expected {expected}")]
    Corrupt {
        /// Expected region length
        expected: usize,
        /// Length actually loaded
        found: usize,
    },

    /// Percentage outside 0-100
    #[error("percentage {value} is outside 0-100")]
    InvalidPercentage {
        /// The rejected value
        value: u8,
    },

    /// Stored byte is not a recognized system type
    #[error("byte {0} is not a recognized system type")]
    UnknownSystemType(u8),

    /// Durable commit (or load) against the backing store failed
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::RegistryFull { max: 10 };
        assert!(err.to_string().contains("10 slots"));

        let err = Error::IdTooLong { len: 24, max: 16 };
        assert!(err.to_string().contains("24"));
        assert!(err.to_string().contains("16"));

        let err = Error::Corrupt {
            expected: 204,
            found: 12,
        };
        assert!(err.to_string().contains("204"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io);
        assert!(matches!(err, Error::Storage(_)));
        assert!(err.to_string().contains("denied"));
    }
}
