//! ADS status codes and their classification.

use std::fmt;

/// Raw status code delivered by the substrate alongside a failed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AdsErrorCode(pub u32);

/// Coarse classes this layer distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Device, file or directory not found.
    NotFound,
    /// Invalid index group or index offset.
    InvalidAddressing,
    /// Object already exists.
    AlreadyExists,
    /// Anything else.
    Other,
}

impl AdsErrorCode {
    /// General device error.
    pub const DEVICE_ERROR: Self = Self(0x700);
    /// Service not supported by the server.
    pub const SERVICE_NOT_SUPPORTED: Self = Self(0x701);
    /// Invalid index group.
    pub const INVALID_GROUP: Self = Self(0x702);
    /// Invalid index offset.
    pub const INVALID_OFFSET: Self = Self(0x703);
    /// Reading or writing not permitted.
    pub const INVALID_ACCESS: Self = Self(0x704);
    /// Parameter size not correct.
    pub const INVALID_SIZE: Self = Self(0x705);
    /// Invalid data values.
    pub const INVALID_DATA: Self = Self(0x706);
    /// Device is not ready.
    pub const NOT_READY: Self = Self(0x707);
    /// Device is busy.
    pub const BUSY: Self = Self(0x708);
    /// Invalid parameter values.
    pub const INVALID_PARAMETER: Self = Self(0x70B);
    /// Not found (files, directories, ...).
    pub const DEVICE_NOT_FOUND: Self = Self(0x70C);
    /// Object already exists.
    pub const DEVICE_EXISTS: Self = Self(0x70F);
    /// Device is in an invalid state.
    pub const INVALID_STATE: Self = Self(0x712);
    /// Notification or handle is invalid.
    pub const HANDLE_INVALID: Self = Self(0x714);

    /// Raw code.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Classify the code.
    pub fn class(self) -> ErrorClass {
        match self {
            Self::DEVICE_NOT_FOUND => ErrorClass::NotFound,
            Self::INVALID_GROUP | Self::INVALID_OFFSET => ErrorClass::InvalidAddressing,
            Self::DEVICE_EXISTS => ErrorClass::AlreadyExists,
            _ => ErrorClass::Other,
        }
    }

    /// Short symbolic name, if known.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::DEVICE_ERROR => "device error",
            Self::SERVICE_NOT_SUPPORTED => "service not supported",
            Self::INVALID_GROUP => "invalid index group",
            Self::INVALID_OFFSET => "invalid index offset",
            Self::INVALID_ACCESS => "access not permitted",
            Self::INVALID_SIZE => "invalid size",
            Self::INVALID_DATA => "invalid data",
            Self::NOT_READY => "device not ready",
            Self::BUSY => "device busy",
            Self::INVALID_PARAMETER => "invalid parameter",
            Self::DEVICE_NOT_FOUND => "device not found",
            Self::DEVICE_EXISTS => "device exists",
            Self::INVALID_STATE => "invalid state",
            Self::HANDLE_INVALID => "invalid handle",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for AdsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "0x{:X} ({})", self.0, name),
            None => write!(f, "0x{:X}", self.0),
        }
    }
}
