use super::{require, DecodeError, Field, TempScale};
use crate::frame::Frame;
use crate::protocol::TelegramKind;
use serde::{Deserialize, Serialize};

const PUMP1: Field = Field::bits(5, 0, 2);
const PUMP2: Field = Field::bits(5, 2, 2);
const PUMP3: Field = Field::bits(5, 4, 2);
const PUMP4: Field = Field::bits(5, 6, 2);
const PUMP5: Field = Field::bits(6, 0, 2);
const PUMP6: Field = Field::bits(6, 6, 2);
const LIGHT1: Field = Field::bits(7, 0, 2);
const LIGHT2: Field = Field::bits(7, 2, 2);
const CIRCULATION: Field = Field::bit(8, 7);
const BLOWER: Field = Field::bits(8, 0, 2);
const MISTER: Field = Field::bits(9, 4, 2);
const AUX1: Field = Field::bit(9, 0);
const AUX2: Field = Field::bit(9, 1);
const TEMP_SCALE: Field = Field::bit(3, 0);

const LAST_OFFSET: usize = 9;

/// Equipment fitted to the spa, as reported once per session by the mainboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpaConfig {
    pub pump1: u8, // Speeds 0-3
    pub pump2: u8,
    pub pump3: u8,
    pub pump4: u8,
    pub pump5: u8,
    pub pump6: u8,
    pub light1: bool,
    pub light2: bool,
    pub circulation: bool,
    pub blower: bool,
    pub mister: bool,
    pub aux1: bool,
    pub aux2: bool,
    pub temp_scale: TempScale,
}

impl SpaConfig {
    pub fn decode(frame: &Frame) -> Result<Self, DecodeError> {
        require(frame, TelegramKind::Configuration, LAST_OFFSET)?;

        // Every field lies at or before LAST_OFFSET, so extraction cannot miss
        let value = |field: Field| field.extract(frame).unwrap_or_default();
        let flag = |field: Field| field.flag(frame).unwrap_or_default();

        Ok(Self {
            pump1: value(PUMP1),
            pump2: value(PUMP2),
            pump3: value(PUMP3),
            pump4: value(PUMP4),
            pump5: value(PUMP5),
            pump6: value(PUMP6),
            light1: flag(LIGHT1),
            light2: flag(LIGHT2),
            circulation: flag(CIRCULATION),
            blower: flag(BLOWER),
            mister: flag(MISTER),
            aux1: flag(AUX1),
            aux2: flag(AUX2),
            temp_scale: TempScale::from_flag(flag(TEMP_SCALE)),
        })
    }

    pub fn pump_count(&self) -> usize {
        [self.pump1, self.pump2, self.pump3, self.pump4, self.pump5, self.pump6]
            .iter()
            .filter(|&&speeds| speeds > 0)
            .count()
    }
}
