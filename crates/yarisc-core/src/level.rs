//! Feature levels of the machine.

use crate::error::MachineError;

/// Feature level selecting which opcodes are legal on a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum FeatureLevel {
    /// No feature level; used for unassigned instruction table slots.
    None = 0,

    /// Minimalistic feature set that is simple to build in hardware
    /// (YaRISC-min).
    Min = 10,

    /// The first very basic version (YaRISC-1).
    #[default]
    V1 = 100,
}

/// The latest feature level.
pub const FEATURE_LEVEL_LATEST: FeatureLevel = FeatureLevel::V1;

impl FeatureLevel {
    /// Returns the stable integer code of this feature level.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a stable integer code back into a feature level.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidFeatureLevel`] for unknown codes.
    pub fn from_u16(level: u16) -> Result<Self, MachineError> {
        match level {
            0 => Ok(Self::None),
            10 => Ok(Self::Min),
            100 => Ok(Self::V1),
            other => Err(MachineError::InvalidFeatureLevel(other)),
        }
    }
}
