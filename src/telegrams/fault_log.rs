use super::{require, DecodeError, Field};
use crate::frame::Frame;
use crate::protocol::TelegramKind;
use serde::Serialize;

const TOTAL_ENTRIES: Field = Field::byte(5);
const CURRENT_ENTRY: Field = Field::byte(6);
const FAULT_CODE: Field = Field::byte(7);
const DAYS_AGO: Field = Field::byte(8);
const HOUR: Field = Field::byte(9);
const MINUTE: Field = Field::byte(10);

const LAST_OFFSET: usize = 10;

pub const UNKNOWN_FAULT_MESSAGE: &str = "Unknown error";

const FAULT_MESSAGES: [(u8, &str); 19] = [
    (15, "Sensors are out of sync"),
    (16, "The water flow is low"),
    (17, "The water flow has failed"),
    (18, "The settings have been reset"),
    (19, "Priming Mode"),
    (20, "The clock has failed"),
    (21, "The settings have been reset"),
    (22, "Program memory failure"),
    (26, "Sensors are out of sync -- Call for service"),
    (27, "The heater is dry"),
    (28, "The heater may be dry"),
    (29, "The water is too hot"),
    (30, "The heater is too hot"),
    (31, "Sensor A Fault"),
    (32, "Sensor B Fault"),
    (34, "A pump may be stuck on"),
    (35, "Hot fault"),
    (36, "The GFCI test failed"),
    (37, "Standby Mode (Hold Mode)"),
];

pub fn fault_message(code: u8) -> &'static str {
    FAULT_MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map_or(UNKNOWN_FAULT_MESSAGE, |&(_, message)| message)
}

/// Most recent entry of the mainboard's fault log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpaFaultLog {
    pub total_entries: u8,
    pub current_entry: u8,
    pub fault_code: u8,
    pub message: &'static str,
    pub days_ago: u8,
    pub hour: u8,
    pub minutes: u8,
}

impl SpaFaultLog {
    pub fn decode(frame: &Frame) -> Result<Self, DecodeError> {
        require(frame, TelegramKind::FaultLog, LAST_OFFSET)?;

        let value = |field: Field| field.extract(frame).unwrap_or_default();
        let fault_code = value(FAULT_CODE);

        Ok(Self {
            total_entries: value(TOTAL_ENTRIES),
            current_entry: value(CURRENT_ENTRY),
            fault_code,
            message: fault_message(fault_code),
            days_ago: value(DAYS_AGO),
            hour: value(HOUR),
            minutes: value(MINUTE),
        })
    }
}

impl Default for SpaFaultLog {
    fn default() -> Self {
        Self {
            total_entries: 0,
            current_entry: 0,
            fault_code: 0,
            message: UNKNOWN_FAULT_MESSAGE,
            days_ago: 0,
            hour: 0,
            minutes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_fault_codes() {
        assert_eq!(fault_message(29), "The water is too hot");
        assert_eq!(fault_message(16), "The water flow is low");
        assert_eq!(fault_message(37), "Standby Mode (Hold Mode)");
    }

    #[test]
    fn test_unknown_fault_codes_fall_back() {
        assert_eq!(fault_message(99), UNKNOWN_FAULT_MESSAGE);
        assert_eq!(fault_message(33), UNKNOWN_FAULT_MESSAGE);
        assert_eq!(fault_message(0), UNKNOWN_FAULT_MESSAGE);
    }
}
