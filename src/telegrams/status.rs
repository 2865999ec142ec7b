use super::{require, DecodeError, Field, TempScale, TemperatureLimits};
use crate::frame::Frame;
use crate::protocol::TelegramKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Value of `rest_mode` and `heat_state` before the first status telegram.
pub const UNKNOWN_MODE: u8 = 254;

const CURRENT_TEMP: Field = Field::byte(7);
const CLOCK_HOUR: Field = Field::byte(8);
const CLOCK_MINUTE: Field = Field::byte(9);
const REST_MODE: Field = Field::byte(10);
const HEATING: Field = Field::bit(15, 4);
const HIGH_RANGE: Field = Field::bit(15, 2);
const JET1: Field = Field::bit(16, 1);
const JET2: Field = Field::bit(16, 3);
const JET3: Field = Field::bit(16, 5);
const CIRCULATION: Field = Field::bit(18, 1);
const BLOWER: Field = Field::bit(18, 2);
const LIGHT: Field = Field::byte(19);
// Inferred from captures, not confirmed on hardware
const LIGHT2: Field = Field::bits(19, 2, 2);
const TARGET_TEMP: Field = Field::byte(25);

const LAST_OFFSET: usize = 25;

const NO_READING: u8 = 0xFF;
const LIGHT_ON: u8 = 0x03;
const MAX_PLAUSIBLE_TEMP: f32 = 100.0;

/// Live operating snapshot, updated in place from status broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaState {
    pub target_temp: Option<f32>,
    pub current_temp: Option<f32>,
    pub hour: u8,
    pub minutes: u8,
    pub rest_mode: u8,
    pub heat_state: u8,
    pub highrange: bool,
    pub jet1: bool,
    pub jet2: bool,
    pub jet3: bool,
    pub circulation: bool,
    pub blower: bool,
    pub light: bool,
    pub light2: bool,
}

impl Default for SpaState {
    fn default() -> Self {
        Self {
            target_temp: None,
            current_temp: None,
            hour: 0,
            minutes: 0,
            rest_mode: UNKNOWN_MODE,
            heat_state: UNKNOWN_MODE,
            highrange: false,
            jet1: false,
            jet2: false,
            jet3: false,
            circulation: false,
            blower: false,
            light: false,
            light2: false,
        }
    }
}

/// Applies status telegrams to a [`SpaState`].
///
/// Telegrams whose CRC equals the last decoded one are skipped. The current
/// temperature is smoothed against the previous raw reading: a jump beyond
/// the tolerance keeps the last accepted value, and a new level is adopted
/// once two consecutive readings agree.
#[derive(Debug)]
pub struct StatusDecoder {
    last_crc: Option<u8>,
    previous_reading: Option<f32>,
    accepted: Option<f32>,
    limits: TemperatureLimits,
    smoothing_enabled: bool,
    tolerance: f32,
}

impl StatusDecoder {
    pub fn new(limits: TemperatureLimits, smoothing_enabled: bool, tolerance: f32) -> Self {
        Self {
            last_crc: None,
            previous_reading: None,
            accepted: None,
            limits,
            smoothing_enabled,
            tolerance,
        }
    }

    pub fn is_stale(&self, frame: &Frame) -> bool {
        self.last_crc == Some(frame.crc())
    }

    pub fn get_last_crc(&self) -> Option<u8> {
        self.last_crc
    }

    /// Returns `Ok(false)` when the telegram was skipped as already seen.
    pub fn decode(&mut self, frame: &Frame, scale: TempScale, state: &mut SpaState) -> Result<bool, DecodeError> {
        if self.is_stale(frame) {
            return Ok(false);
        }
        require(frame, TelegramKind::Status, LAST_OFFSET)?;

        let value = |field: Field| field.extract(frame).unwrap_or_default();
        let flag = |field: Field| field.flag(frame).unwrap_or_default();

        let target = scale.to_degrees(value(TARGET_TEMP));
        if self.limits.for_scale(scale).contains(target) {
            if state.target_temp != Some(target) {
                debug!(target_temp = target, "target temperature");
            }
            state.target_temp = Some(target);
        } else {
            trace!(target_temp = target, "target temperature outside limits, ignored");
        }

        let current = self.smoothed_reading(value(CURRENT_TEMP), scale);
        if current != 0.0 && current < MAX_PLAUSIBLE_TEMP {
            if state.current_temp != Some(current) {
                debug!(current_temp = current, "current temperature");
            }
            state.current_temp = Some(current);
        }

        state.hour = value(CLOCK_HOUR);
        state.minutes = value(CLOCK_MINUTE);
        state.rest_mode = value(REST_MODE);
        state.heat_state = value(HEATING);
        state.highrange = flag(HIGH_RANGE);
        state.jet1 = flag(JET1);
        state.jet2 = flag(JET2);
        state.jet3 = flag(JET3);
        state.circulation = flag(CIRCULATION);
        state.blower = flag(BLOWER);
        state.light = value(LIGHT) == LIGHT_ON;
        state.light2 = flag(LIGHT2);

        self.last_crc = Some(frame.crc());
        Ok(true)
    }

    /// Forgets the last CRC and the smoothing history.
    pub fn reset(&mut self) {
        self.last_crc = None;
        self.previous_reading = None;
        self.accepted = None;
    }

    // 0.0 means "no reading"
    fn smoothed_reading(&mut self, raw: u8, scale: TempScale) -> f32 {
        if raw == NO_READING {
            return 0.0;
        }

        let reading = scale.to_degrees(raw);
        let previous = self.previous_reading.replace(reading);
        if self.smoothing_enabled {
            if let Some(previous) = previous.filter(|&previous| previous > 0.0) {
                let upper = previous * (1.0 + self.tolerance);
                let lower = previous * (1.0 - self.tolerance);
                if reading > upper || reading < lower {
                    let kept = self.accepted.unwrap_or(previous);
                    trace!(reading, previous, kept, "spurious temperature reading replaced");
                    return kept;
                }
            }
        }

        self.accepted = Some(reading);
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;

    fn status_frame(current_raw: u8, target_raw: u8) -> Frame {
        let mut content = [0u8; 24];
        content[0] = 0xFF;
        content[1] = 0xAF;
        content[2] = 0x13;
        // Absolute offset n lives at content[n - 2]
        content[7 - 2] = current_raw;
        content[25 - 2] = target_raw;
        Frame::parse(&encode_frame(&content).unwrap()).unwrap()
    }

    #[test]
    fn test_smoothing_rejects_large_jump() {
        let mut decoder = StatusDecoder::new(TemperatureLimits::default(), true, 0.2);
        let mut state = SpaState::default();

        decoder.decode(&status_frame(100, 76), TempScale::Celsius, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(50.0));

        decoder.decode(&status_frame(150, 76), TempScale::Celsius, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(50.0));

        // Judged against the spike, not the kept value
        decoder.decode(&status_frame(105, 76), TempScale::Celsius, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(50.0));

        // Within 20% of the previous reading is accepted
        decoder.decode(&status_frame(108, 76), TempScale::Celsius, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(54.0));
    }

    #[test]
    fn test_sustained_new_level_is_adopted() {
        let mut decoder = StatusDecoder::new(TemperatureLimits::default(), true, 0.2);
        let mut state = SpaState::default();

        decoder.decode(&status_frame(60, 76), TempScale::Fahrenheit, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(60.0));

        decoder.decode(&status_frame(98, 76), TempScale::Fahrenheit, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(60.0));

        decoder.decode(&status_frame(98, 78), TempScale::Fahrenheit, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(98.0));
    }

    #[test]
    fn test_reset_clears_smoothing_history() {
        let mut decoder = StatusDecoder::new(TemperatureLimits::default(), true, 0.2);
        let mut state = SpaState::default();

        decoder.decode(&status_frame(76, 76), TempScale::Fahrenheit, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(76.0));

        decoder.reset();
        assert_eq!(decoder.get_last_crc(), None);

        decoder.decode(&status_frame(76, 76), TempScale::Celsius, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(38.0));
    }

    #[test]
    fn test_smoothing_disabled_accepts_jump() {
        let mut decoder = StatusDecoder::new(TemperatureLimits::default(), false, 0.2);
        let mut state = SpaState::default();

        decoder.decode(&status_frame(60, 76), TempScale::Celsius, &mut state).unwrap();
        decoder.decode(&status_frame(150, 76), TempScale::Celsius, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(75.0));
    }

    #[test]
    fn test_no_reading_keeps_previous_value() {
        let mut decoder = StatusDecoder::new(TemperatureLimits::default(), true, 0.2);
        let mut state = SpaState::default();

        decoder.decode(&status_frame(76, 76), TempScale::Celsius, &mut state).unwrap();
        decoder.decode(&status_frame(NO_READING, 76), TempScale::Celsius, &mut state).unwrap();
        assert_eq!(state.current_temp, Some(38.0));
    }

    #[test]
    fn test_implausible_reading_not_committed() {
        let mut decoder = StatusDecoder::new(TemperatureLimits::default(), true, 0.2);
        let mut state = SpaState::default();

        decoder.decode(&status_frame(120, 38), TempScale::Fahrenheit, &mut state).unwrap();
        assert_eq!(state.current_temp, None);
        assert_eq!(state.target_temp, Some(38.0));
    }

    #[test]
    fn test_truncated_status_is_rejected() {
        let mut decoder = StatusDecoder::new(TemperatureLimits::default(), true, 0.2);
        let mut state = SpaState::default();
        let frame = Frame::parse(&encode_frame(&[0xFF, 0xAF, 0x13, 0x00]).unwrap()).unwrap();

        let result = decoder.decode(&frame, TempScale::Celsius, &mut state);
        assert!(matches!(result, Err(DecodeError::Truncated { telegram: TelegramKind::Status, .. })));
        assert_eq!(decoder.get_last_crc(), None);
    }
}
