pub mod config;
pub mod fault_log;
pub mod filter;
pub mod status;

pub use config::SpaConfig;
pub use fault_log::SpaFaultLog;
pub use filter::{FilterCycle, SpaFilterSettings};
pub use status::{SpaState, StatusDecoder};

use crate::frame::Frame;
use crate::protocol::TelegramKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a value inside a telegram: absolute frame offset plus a bit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: usize,
    pub shift: u8,
    pub width: u8,
}

impl Field {
    pub const fn byte(offset: usize) -> Self {
        Self { offset, shift: 0, width: 8 }
    }

    pub const fn bit(offset: usize, bit: u8) -> Self {
        Self { offset, shift: bit, width: 1 }
    }

    pub const fn bits(offset: usize, shift: u8, width: u8) -> Self {
        Self { offset, shift, width }
    }

    pub fn mask(&self) -> u8 {
        if self.width >= 8 {
            0xFF
        } else {
            (1u8 << self.width) - 1
        }
    }

    pub fn extract(&self, frame: &Frame) -> Option<u8> {
        frame.get(self.offset).map(|byte| (byte >> self.shift) & self.mask())
    }

    pub fn flag(&self, frame: &Frame) -> Option<bool> {
        self.extract(frame).map(|value| value != 0)
    }
}

/// Fails with `Truncated` unless the frame carries every byte up to `last_offset`.
pub(crate) fn require(frame: &Frame, telegram: TelegramKind, last_offset: usize) -> Result<(), DecodeError> {
    if frame.get(last_offset).is_some() {
        Ok(())
    } else {
        Err(DecodeError::Truncated {
            telegram,
            declared: frame.declared_len(),
            required: last_offset + 1,
        })
    }
}

/// Temperature unit reported by the mainboard; it also fixes the raw resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TempScale {
    /// Whole degrees.
    #[default]
    Fahrenheit,
    /// Half degrees: raw values are doubled.
    Celsius,
}

impl TempScale {
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            TempScale::Celsius
        } else {
            TempScale::Fahrenheit
        }
    }

    pub fn to_degrees(self, raw: u8) -> f32 {
        match self {
            TempScale::Fahrenheit => f32::from(raw),
            TempScale::Celsius => f32::from(raw) / 2.0,
        }
    }

    pub fn to_raw(self, degrees: f32) -> u8 {
        match self {
            TempScale::Fahrenheit => degrees as u8,
            TempScale::Celsius => (degrees * 2.0) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempRange {
    pub min: f32,
    pub max: f32,
}

impl TempRange {
    pub fn contains(&self, degrees: f32) -> bool {
        (self.min..=self.max).contains(&degrees)
    }

    /// False for an empty or NaN range.
    pub fn is_ordered(&self) -> bool {
        self.min < self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureLimits {
    pub celsius: TempRange,
    pub fahrenheit: TempRange,
}

impl TemperatureLimits {
    pub fn for_scale(&self, scale: TempScale) -> TempRange {
        match scale {
            TempScale::Celsius => self.celsius,
            TempScale::Fahrenheit => self.fahrenheit,
        }
    }
}

impl Default for TemperatureLimits {
    fn default() -> Self {
        // TODO: Fahrenheit bounds mirror the Celsius ones; real panels accept roughly 50-104 °F
        Self {
            celsius: TempRange { min: 7.0, max: 40.0 },
            fahrenheit: TempRange { min: 7.0, max: 40.0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{telegram:?} telegram too short: declared length {declared}, need {required}")]
    Truncated {
        telegram: TelegramKind,
        declared: usize,
        required: usize,
    },
}
