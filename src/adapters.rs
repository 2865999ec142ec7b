//! Presentation helpers for home-automation style front ends.
//!
//! Nothing here talks to the bus; these types only read a [`SpaState`] or map a
//! requested UI state onto the toggle that would produce it.

use crate::protocol::ToggleCommand;
use crate::telegrams::status::UNKNOWN_MODE;
use crate::telegrams::SpaState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaSwitch {
    Jet1,
    Jet2,
    Jet3,
    Light,
    Light2,
    Blower,
}

impl SpaSwitch {
    pub const ALL: [SpaSwitch; 6] = [
        SpaSwitch::Jet1,
        SpaSwitch::Jet2,
        SpaSwitch::Jet3,
        SpaSwitch::Light,
        SpaSwitch::Light2,
        SpaSwitch::Blower,
    ];

    pub fn is_on(self, state: &SpaState) -> bool {
        match self {
            SpaSwitch::Jet1 => state.jet1,
            SpaSwitch::Jet2 => state.jet2,
            SpaSwitch::Jet3 => state.jet3,
            SpaSwitch::Light => state.light,
            SpaSwitch::Light2 => state.light2,
            SpaSwitch::Blower => state.blower,
        }
    }

    pub fn command(self) -> ToggleCommand {
        match self {
            SpaSwitch::Jet1 => ToggleCommand::Jet1,
            SpaSwitch::Jet2 => ToggleCommand::Jet2,
            SpaSwitch::Jet3 => ToggleCommand::Jet3,
            SpaSwitch::Light => ToggleCommand::Light,
            SpaSwitch::Light2 => ToggleCommand::Light2,
            SpaSwitch::Blower => ToggleCommand::Blower,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaBinarySensor {
    Blower,
    HighRange,
    Circulation,
    RestMode,
    HeatState,
    Connected,
}

impl SpaBinarySensor {
    /// `None` means "no value": not communicating, or the mode has not been reported yet.
    pub fn read(self, state: &SpaState, communicating: bool) -> Option<bool> {
        if self == SpaBinarySensor::Connected {
            return Some(communicating);
        }
        if !communicating {
            return None;
        }

        match self {
            SpaBinarySensor::Blower => Some(state.blower),
            SpaBinarySensor::HighRange => Some(state.highrange),
            SpaBinarySensor::Circulation => Some(state.circulation),
            SpaBinarySensor::RestMode => known_mode(state.rest_mode),
            SpaBinarySensor::HeatState => known_mode(state.heat_state),
            SpaBinarySensor::Connected => Some(communicating),
        }
    }
}

fn known_mode(value: u8) -> Option<bool> {
    if value == UNKNOWN_MODE {
        None
    } else {
        Some(value != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermostatMode {
    Off,
    Heat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermostatAction {
    Idle,
    Heating,
}

/// High temperature range maps to `Home`, low range to `Eco`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeatPreset {
    Home,
    Eco,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThermostatView {
    pub mode: Option<ThermostatMode>,
    pub action: Option<ThermostatAction>,
    pub preset: Option<HeatPreset>,
    pub target_temp: Option<f32>,
    pub current_temp: Option<f32>,
}

impl ThermostatView {
    pub fn from_state(state: &SpaState, communicating: bool) -> Self {
        if !communicating {
            return Self::default();
        }

        let mode = match state.rest_mode {
            UNKNOWN_MODE => None,
            1 => Some(ThermostatMode::Off),
            _ => Some(ThermostatMode::Heat),
        };
        let action = match state.heat_state {
            UNKNOWN_MODE => None,
            1 => Some(ThermostatAction::Heating),
            _ => Some(ThermostatAction::Idle),
        };
        let preset = if state.highrange { HeatPreset::Home } else { HeatPreset::Eco };

        Self {
            mode,
            action,
            preset: Some(preset),
            target_temp: state.target_temp,
            current_temp: state.current_temp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_commands_are_distinct() {
        for (i, a) in SpaSwitch::ALL.iter().enumerate() {
            for b in SpaSwitch::ALL.iter().skip(i + 1) {
                assert_ne!(a.command().code(), b.command().code());
            }
        }
    }

    #[test]
    fn test_unknown_modes_have_no_value() {
        let state = SpaState::default();
        assert_eq!(SpaBinarySensor::RestMode.read(&state, true), None);
        assert_eq!(SpaBinarySensor::HeatState.read(&state, true), None);
        assert_eq!(SpaBinarySensor::Blower.read(&state, true), Some(false));
    }
}
