use crate::protocol::{InfoRequest, OutboundMessage, ToggleCommand};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Progress of one piece of session information: want -> requested -> obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    Want,
    Requested { at: u64 },
    Obtained { at: u64 },
}

impl Stage {
    pub fn is_obtained(self) -> bool {
        matches!(self, Stage::Obtained { .. })
    }

    /// Re-arms a stage that has been `Requested` or `Obtained` for at least `after_ms`.
    fn expire(&mut self, current_time: u64, requested_after_ms: Option<u64>, obtained_after_ms: Option<u64>) -> bool {
        let expired = match *self {
            Stage::Want => false,
            Stage::Requested { at } => {
                requested_after_ms.is_some_and(|limit| current_time.saturating_sub(at) >= limit)
            }
            Stage::Obtained { at } => {
                obtained_after_ms.is_some_and(|limit| current_time.saturating_sub(at) >= limit)
            }
        };
        if expired {
            *self = Stage::Want;
        }
        expired
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionProgress {
    pub configuration: Stage,
    pub fault_log: Stage,
    pub filter_settings: Stage,
}

impl SessionProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the next information page to ask for and marks it requested.
    ///
    /// Filter settings are only asked for once the fault log has been decoded.
    pub fn next_request(&mut self, current_time: u64) -> Option<InfoRequest> {
        let request = if self.configuration == Stage::Want {
            InfoRequest::Configuration
        } else if self.fault_log == Stage::Want {
            InfoRequest::FaultLog
        } else if self.filter_settings == Stage::Want && self.fault_log.is_obtained() {
            InfoRequest::FilterSettings
        } else {
            return None;
        };

        *self.stage_mut(request) = Stage::Requested { at: current_time };
        Some(request)
    }

    pub fn mark_obtained(&mut self, request: InfoRequest, current_time: u64) {
        *self.stage_mut(request) = Stage::Obtained { at: current_time };
    }

    pub fn get_stage(&self, request: InfoRequest) -> Stage {
        match request {
            InfoRequest::Configuration => self.configuration,
            InfoRequest::FaultLog => self.fault_log,
            InfoRequest::FilterSettings => self.filter_settings,
        }
    }

    /// Retries unanswered requests and refreshes the fault log and filter settings.
    /// Configuration is never refreshed once obtained.
    pub fn expire(&mut self, current_time: u64, retry_ms: Option<u64>, refresh_ms: Option<u64>) {
        if self.configuration.expire(current_time, retry_ms, None) {
            debug!("configuration request unanswered, retrying");
        }
        if self.fault_log.expire(current_time, retry_ms, refresh_ms) {
            debug!("fault log due for another request");
        }
        if self.filter_settings.expire(current_time, retry_ms, refresh_ms) {
            debug!("filter settings due for another request");
        }
    }

    fn stage_mut(&mut self, request: InfoRequest) -> &mut Stage {
        match request {
            InfoRequest::Configuration => &mut self.configuration,
            InfoRequest::FaultLog => &mut self.fault_log,
            InfoRequest::FilterSettings => &mut self.filter_settings,
        }
    }
}

/// Commands staged by the control API, one slot per kind.
/// Staging again before the next invitation overwrites the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PendingCommands {
    pub clock: Option<(u8, u8)>,
    pub temperature: Option<u8>,
    pub toggle: Option<ToggleCommand>,
}

impl PendingCommands {
    pub fn is_empty(&self) -> bool {
        self.clock.is_none() && self.temperature.is_none() && self.toggle.is_none()
    }
}

/// Chooses the single frame to send when the mainboard invites this client.
#[derive(Debug, Default)]
pub struct RequestDispatcher {
    pending: PendingCommands,
    session: SessionProgress,
}

impl RequestDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_clock(&mut self, hour: u8, minute: u8) {
        self.pending.clock = Some((hour, minute));
    }

    pub fn stage_temperature(&mut self, raw: u8) {
        self.pending.temperature = Some(raw);
    }

    pub fn stage_toggle(&mut self, command: ToggleCommand) {
        self.pending.toggle = Some(command);
    }

    pub fn get_pending(&self) -> &PendingCommands {
        &self.pending
    }

    pub fn get_session(&self) -> &SessionProgress {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionProgress {
        &mut self.session
    }

    /// Priority: clock, temperature, toggle, session bootstrap, nothing-to-send.
    /// Only the slot that was sent is cleared.
    pub fn on_clear_to_send(&mut self, address: u8, current_time: u64) -> OutboundMessage {
        if let Some((hour, minute)) = self.pending.clock.take() {
            return OutboundMessage::SetTime { address, hour, minute };
        }

        if let Some(raw) = self.pending.temperature.take() {
            return OutboundMessage::SetTemperature { address, raw };
        }

        if let Some(command) = self.pending.toggle.take() {
            return OutboundMessage::Toggle { address, command };
        }

        match self.session.next_request(current_time) {
            Some(request) => {
                debug!(?request, "requesting session information");
                OutboundMessage::Request { address, request }
            }
            None => OutboundMessage::NothingToSend { address },
        }
    }
}
