//! Platform log mask.
//!
//! The platform library selects diagnostics with a bit mask: eight debug
//! levels in bits 8..16 and severity flags above bit 16. The mask is kept as
//! explicit state and translated into a `tracing` level filter.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use tracing::level_filters::LevelFilter;

/// Log selection mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LogMask(u32);

impl LogMask {
    /// Nothing is logged.
    pub const NONE: Self = Self(0);
    pub const INFO: Self = Self(0x0080 << 16);
    pub const WARNING: Self = Self(0x0100 << 16);
    pub const ERROR: Self = Self(0x0200 << 16);
    pub const CRITICAL: Self = Self(0x0400 << 16);
    /// All eight debug levels.
    pub const DEBUG_ALL: Self = Self(0x0000_FF00);
    pub const ALL: Self = Self(0xFFFF_FF00);
    /// Info and above.
    pub const DEFAULT: Self =
        Self(Self::INFO.0 | Self::WARNING.0 | Self::ERROR.0 | Self::CRITICAL.0);

    /// Debug level `n` (1..=8). Out-of-range levels select nothing.
    pub const fn debug(n: u32) -> Self {
        if n == 0 || n > 8 {
            return Self::NONE;
        }
        Self((1 << (n - 1)) << 8)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Most verbose `tracing` level selected by the mask.
    ///
    /// Debug levels 5..=8 map to TRACE, 1..=4 to DEBUG.
    pub fn level_filter(self) -> LevelFilter {
        if self.intersects(Self(0x0000_F000)) {
            LevelFilter::TRACE
        } else if self.intersects(Self(0x0000_0F00)) {
            LevelFilter::DEBUG
        } else if self.intersects(Self::INFO) {
            LevelFilter::INFO
        } else if self.intersects(Self::WARNING) {
            LevelFilter::WARN
        } else if self.intersects(Self::ERROR | Self::CRITICAL) {
            LevelFilter::ERROR
        } else {
            LevelFilter::OFF
        }
    }
}

impl BitOr for LogMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LogMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for LogMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogMask({:#010x})", self.0)
    }
}
