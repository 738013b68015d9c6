//! Logical roots: predefined remote folders every path is scoped to.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Remote folder scope selected per call.
///
/// The discriminant is the protocol selector. Mode-carrying calls (open,
/// rename) place it in the upper 16 bits of the index offset; root-only calls
/// (find, mkdir, rmdir, delete) send it alone as the offset.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[repr(u16)]
pub enum LogicalRoot {
    /// Absolute paths on the target.
    #[default]
    Generic = 1,
    /// Boot project folder.
    BootProject = 2,
    /// Boot data folder.
    BootData = 3,
    /// Boot folder (`TwinCAT/3.1/Boot`).
    #[strum(to_string = "boot_dir", serialize = "boot")]
    BootDir = 4,
    /// Target folder.
    TargetDir = 5,
    /// Configuration folder.
    #[strum(to_string = "config_dir", serialize = "config")]
    ConfigDir = 6,
    /// Installation folder.
    #[strum(to_string = "install_dir", serialize = "install")]
    InstallDir = 7,
}

impl LogicalRoot {
    /// The 16-bit protocol selector.
    pub fn selector(self) -> u16 {
        self as u16
    }

    /// Offset for calls that carry only the root (find-first, mkdir, rmdir, delete).
    pub fn path_offset(self) -> u32 {
        u32::from(self.selector())
    }

    /// The selector shifted into the upper half of a mode-carrying offset.
    pub fn mode_bits(self) -> u32 {
        u32::from(self.selector()) << 16
    }

    /// Look up a root by its selector.
    pub fn from_selector(selector: u16) -> Option<Self> {
        match selector {
            1 => Some(Self::Generic),
            2 => Some(Self::BootProject),
            3 => Some(Self::BootData),
            4 => Some(Self::BootDir),
            5 => Some(Self::TargetDir),
            6 => Some(Self::ConfigDir),
            7 => Some(Self::InstallDir),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_selector_values() {
        assert_eq!(LogicalRoot::Generic.path_offset(), 1);
        assert_eq!(LogicalRoot::BootDir.path_offset(), 4);
        assert_eq!(LogicalRoot::Generic.mode_bits(), 0x0001_0000);
        assert_eq!(LogicalRoot::BootDir.mode_bits(), 0x0004_0000);
        assert_eq!(LogicalRoot::InstallDir.mode_bits(), 0x0007_0000);
    }

    #[test]
    fn test_from_selector_round_trip() {
        for root in LogicalRoot::iter() {
            assert_eq!(LogicalRoot::from_selector(root.selector()), Some(root));
        }
        assert_eq!(LogicalRoot::from_selector(0), None);
        assert_eq!(LogicalRoot::from_selector(8), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(LogicalRoot::from_str("boot").unwrap(), LogicalRoot::BootDir);
        assert_eq!(LogicalRoot::from_str("BOOT_DIR").unwrap(), LogicalRoot::BootDir);
        assert_eq!(LogicalRoot::from_str("generic").unwrap(), LogicalRoot::Generic);
        assert!(LogicalRoot::from_str("nowhere").is_err());
        assert_eq!(LogicalRoot::ConfigDir.to_string(), "config_dir");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&LogicalRoot::BootProject).unwrap();
        assert_eq!(json, "\"boot_project\"");
        let root: LogicalRoot = serde_json::from_str("\"install_dir\"").unwrap();
        assert_eq!(root, LogicalRoot::InstallDir);
    }
}
