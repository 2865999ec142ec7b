use super::{require, DecodeError, Field};
use crate::frame::Frame;
use crate::protocol::TelegramKind;
use serde::{Deserialize, Serialize};

const FILTER1_HOUR: Field = Field::byte(5);
const FILTER1_MINUTE: Field = Field::byte(6);
const FILTER1_DURATION_HOUR: Field = Field::byte(7);
const FILTER1_DURATION_MINUTE: Field = Field::byte(8);
// Cycle 2 packs its enable flag into the top bit of the start hour
const FILTER2_ENABLED: Field = Field::bit(9, 7);
const FILTER2_HOUR: Field = Field::bits(9, 0, 7);
const FILTER2_MINUTE: Field = Field::byte(10);
const FILTER2_DURATION_HOUR: Field = Field::byte(11);
const FILTER2_DURATION_MINUTE: Field = Field::byte(12);

const LAST_OFFSET: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterCycle {
    pub start_hour: u8,
    pub start_minute: u8,
    pub duration_hours: u8,
    pub duration_minutes: u8,
}

impl core::fmt::Display for FilterCycle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "start {:02}:{:02}, duration {:02}:{:02}",
            self.start_hour, self.start_minute, self.duration_hours, self.duration_minutes
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpaFilterSettings {
    pub filter1: FilterCycle,
    pub filter2: FilterCycle,
    pub filter2_enabled: bool,
}

impl SpaFilterSettings {
    pub fn decode(frame: &Frame) -> Result<Self, DecodeError> {
        require(frame, TelegramKind::FilterSettings, LAST_OFFSET)?;

        let value = |field: Field| field.extract(frame).unwrap_or_default();

        Ok(Self {
            filter1: FilterCycle {
                start_hour: value(FILTER1_HOUR),
                start_minute: value(FILTER1_MINUTE),
                duration_hours: value(FILTER1_DURATION_HOUR),
                duration_minutes: value(FILTER1_DURATION_MINUTE),
            },
            filter2: FilterCycle {
                start_hour: value(FILTER2_HOUR),
                start_minute: value(FILTER2_MINUTE),
                duration_hours: value(FILTER2_DURATION_HOUR),
                duration_minutes: value(FILTER2_DURATION_MINUTE),
            },
            filter2_enabled: FILTER2_ENABLED.flag(frame).unwrap_or_default(),
        })
    }
}
