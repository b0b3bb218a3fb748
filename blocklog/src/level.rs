//! Defines the levels of verbosity available for logging.
//!
//! ## Logging Levels
//!
//! Defined in [`Level`]. Each level is a bitmask that contains every level
//! below it plus one new bit:
//!
//! * [`Off`] (`0x00`)
//! * [`Fatal`] (`0x01`)
//! * [`Error`] (`0x03`)
//! * [`Warn`] (`0x07`)
//! * [`Info`] (`0x0F`)
//! * [`Debug`] (`0x1F`)
//! * [`Trace`] (`0x3F`)
//! * [`All`] (`0xFF`)
//!
//! The same type is used both for the level a message is logged at and for
//! the threshold (retain mask) it is tested against. A message at level `L`
//! passes threshold `T` when `L & T == L`.
//!
//! ### Compile time filter specification
//!
//! A static ceiling can be set through Cargo features:
//!
//! * `max_level_off`
//! * `max_level_fatal`
//! * `max_level_error`
//! * `max_level_warn`
//! * `max_level_info`
//! * `max_level_debug`
//! * `max_level_trace`
//!
//! These features control the value of the const [`STATIC_MAX_LEVEL`]. The
//! log macros check this value before evaluating any argument. By default, no
//! levels are disabled.
//!
//! ```toml
//! [dependencies]
//! blocklog = { version = "0.1", features = ["max_level_info"] }
//! ```
//!
//! [`Off`]: crate::level::Level::Off
//! [`Fatal`]: crate::level::Level::Fatal
//! [`Error`]: crate::level::Level::Error
//! [`Warn`]: crate::level::Level::Warn
//! [`Info`]: crate::level::Level::Info
//! [`Debug`]: crate::level::Level::Debug
//! [`Trace`]: crate::level::Level::Trace
//! [`All`]: crate::level::Level::All
//! [`STATIC_MAX_LEVEL`]: crate::level::STATIC_MAX_LEVEL

use std::{fmt::Display, str::FromStr};

#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Level {
    /// Nothing is enabled
    Off = 0x0,
    /// Designates failures the process cannot recover from
    Fatal = 0x1,
    /// Designates serious errors
    Error = 0x3,
    /// Designates potentially hazardous situations
    Warn = 0x7,
    /// Designates useful information
    Info = 0xF,
    /// Designates debug information, which is of low priority
    Debug = 0x1F,
    /// Designates trace information, which is of very low priority
    Trace = 0x3F,
    /// Everything is enabled
    All = 0xFF,
}

impl Level {
    /// Every level, from narrowest to widest.
    pub const ALL_LEVELS: [Level; 8] = [
        Level::Off,
        Level::Fatal,
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
        Level::All,
    ];

    #[inline(always)]
    pub const fn mask(self) -> u32 {
        self as u32
    }

    pub const fn label(self) -> &'static str {
        match self {
            Level::Off => "OFF",
            Level::Fatal => "FATAL",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
            Level::All => "ALL",
        }
    }

    /// Whether a message at `self` is retained under `threshold`.
    #[inline(always)]
    pub const fn is_enabled_under(self, threshold: Level) -> bool {
        self.mask() & threshold.mask() == self.mask()
    }

    /// The wider of the two levels.
    pub const fn union(self, other: Level) -> Level {
        if other.is_enabled_under(self) {
            self
        } else {
            other
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown level label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown level `{0}`")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_uppercase().as_str() {
            "OFF" => Level::Off,
            "FATAL" => Level::Fatal,
            "ERROR" | "ERR" => Level::Error,
            "CORE" | "WARN" | "WRN" => Level::Warn,
            "INFO" | "INF" => Level::Info,
            "DEBUG" | "DBG" => Level::Debug,
            "TRACE" | "TRC" => Level::Trace,
            "ALL" => Level::All,
            _ => return Err(ParseLevelError(s.to_string())),
        };

        Ok(level)
    }
}

/// Statically configured maximum level, this is configured from Cargo.toml,
/// by passing in the relevant feature flags.
/// By default, the level would be configured to `Level::All`.
pub const STATIC_MAX_LEVEL: Level = MAX_LEVEL;

// Checks the feature flag specified by the user of the library, and sets the
// const [`MAX_LEVEL`] accordingly. The narrowest requested level wins.
cfg_if::cfg_if! {
    if #[cfg(feature = "max_level_off")] {
        const MAX_LEVEL: Level = Level::Off;
    } else if #[cfg(feature = "max_level_fatal")] {
        const MAX_LEVEL: Level = Level::Fatal;
    } else if #[cfg(feature = "max_level_error")] {
        const MAX_LEVEL: Level = Level::Error;
    } else if #[cfg(feature = "max_level_warn")] {
        const MAX_LEVEL: Level = Level::Warn;
    } else if #[cfg(feature = "max_level_info")] {
        const MAX_LEVEL: Level = Level::Info;
    } else if #[cfg(feature = "max_level_debug")] {
        const MAX_LEVEL: Level = Level::Debug;
    } else if #[cfg(feature = "max_level_trace")] {
        const MAX_LEVEL: Level = Level::Trace;
    } else {
        const MAX_LEVEL: Level = Level::All;
    }
}
