use crate::adapters::{HeatPreset, SpaSwitch};
use crate::arbiter::BusArbiter;
use crate::config::EngineConfig;
use crate::dispatcher::{RequestDispatcher, SessionProgress};
use crate::frame::{encode_frame, format_frame, Frame, FrameError, FrameReceiver, RxOutcome};
use crate::listener::{ListenerRegistry, SpaListener};
use crate::liveness::{LinkEvent, LivenessMonitor};
use crate::protocol::{classify, InfoRequest, OutboundMessage, TelegramKind, ToggleCommand, GRANTED_ADDRESS_OFFSET};
use crate::telegrams::{SpaConfig, SpaFaultLog, SpaFilterSettings, SpaState, StatusDecoder};
use crate::transport::{Transport, TransportError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

const MAX_CLOCK_HOUR: u8 = 23;
const MAX_CLOCK_MINUTE: u8 = 59;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineStats {
    pub bytes_received: u64,
    pub frames_accepted: u32,
    pub framing_rejects: u32,
    pub crc_rejects: u32,
    pub decode_errors: u32,
    pub frames_sent: u32,
    pub send_failures: u32,
    pub status_decodes: u32,
    pub stale_status_skipped: u32,
}

/// Client side of the spa bus: one owned context holding every piece of session state.
///
/// The engine never runs on its own. Call [`SpaEngine::update`] periodically with a
/// monotonic millisecond clock; each call evaluates liveness, drains the transport,
/// answers whatever the mainboard asked for, and notifies listeners.
pub struct SpaEngine<T: Transport> {
    transport: T,
    config: EngineConfig,

    // Link layer
    receiver: FrameReceiver,
    arbiter: BusArbiter,
    liveness: LivenessMonitor,

    // Session
    dispatcher: RequestDispatcher,
    status_decoder: StatusDecoder,
    listeners: ListenerRegistry,

    // Decoded models
    spa_config: SpaConfig,
    spa_state: SpaState,
    fault_log: SpaFaultLog,
    filter_settings: SpaFilterSettings,

    stats: EngineStats,
}

impl<T: Transport> SpaEngine<T> {
    pub fn new(transport: T, config: EngineConfig) -> Self {
        let status_decoder = StatusDecoder::new(
            config.temperature_limits,
            config.smoothing_enabled,
            config.smoothing_tolerance,
        );

        Self {
            transport,
            receiver: FrameReceiver::new(),
            arbiter: BusArbiter::new(),
            liveness: LivenessMonitor::new(config.liveness_timeout_ms),
            dispatcher: RequestDispatcher::new(),
            status_decoder,
            listeners: ListenerRegistry::new(),
            spa_config: SpaConfig::default(),
            spa_state: SpaState::default(),
            fault_log: SpaFaultLog::default(),
            filter_settings: SpaFilterSettings::default(),
            stats: EngineStats::default(),
            config,
        }
    }

    /// One poll tick. Only a failing transport read is returned as an error; the
    /// listeners still see the state for this tick.
    pub fn update(&mut self, current_time: u64) -> Result<(), EngineError> {
        match self.liveness.evaluate(current_time) {
            LinkEvent::Lost => {
                warn!(
                    silence_ms = self.liveness.silence_ms(current_time),
                    "no bus traffic, dropping client address"
                );
                self.arbiter.release();
                self.receiver.reset();
                self.status_decoder.reset();
            }
            LinkEvent::StillLost => self.arbiter.release(),
            LinkEvent::Restored => info!("bus traffic restored"),
            LinkEvent::Healthy => {}
        }

        self.dispatcher.session_mut().expire(
            current_time,
            self.config.request_retry_ms,
            self.config.refresh_interval_ms,
        );

        let drained = self.drain_transport(current_time);

        self.listeners.notify(&self.spa_state);

        drained.map_err(EngineError::from)
    }

    fn drain_transport(&mut self, current_time: u64) -> Result<(), TransportError> {
        while self.transport.available() {
            let byte = match self.transport.read() {
                Ok(byte) => byte,
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => {
                    warn!("transport read failed: {}", e);
                    return Err(e);
                }
            };
            self.stats.bytes_received = self.stats.bytes_received.saturating_add(1);

            match self.receiver.push_byte(byte) {
                RxOutcome::Discarded => trace!(byte, "discarded while hunting for start of frame"),
                RxOutcome::Buffered => self.liveness.record_activity(current_time),
                RxOutcome::Frame(frame) => {
                    self.liveness.record_activity(current_time);
                    self.stats.frames_accepted = self.stats.frames_accepted.saturating_add(1);
                    trace!(frame = %format_frame(frame.as_bytes()), "frame received");
                    self.handle_frame(&frame, current_time);
                }
                RxOutcome::Rejected(error) => {
                    match error {
                        FrameError::CrcMismatch { .. } => {
                            self.stats.crc_rejects = self.stats.crc_rejects.saturating_add(1)
                        }
                        _ => self.stats.framing_rejects = self.stats.framing_rejects.saturating_add(1),
                    }
                    debug!("frame dropped: {}", error);
                }
            }
        }
        Ok(())
    }

    fn handle_frame(&mut self, frame: &Frame, current_time: u64) {
        let Some(telegram) = classify(frame, self.arbiter.get_address()) else {
            return;
        };

        match telegram {
            TelegramKind::NewClientId => match frame.get(GRANTED_ADDRESS_OFFSET) {
                Some(granted) => {
                    let ack = self.arbiter.accept_grant(granted);
                    self.send(ack);
                }
                None => debug!("address grant without an address byte, ignored"),
            },
            TelegramKind::AnyNewClients => {
                let request = self.arbiter.request_address();
                self.send(request);
            }
            TelegramKind::ClearToSend => {
                let message = self.dispatcher.on_clear_to_send(self.arbiter.get_address(), current_time);
                self.send(message);
            }
            TelegramKind::Configuration => {
                if self.dispatcher.get_session().get_stage(InfoRequest::Configuration).is_obtained() {
                    return;
                }
                match SpaConfig::decode(frame) {
                    Ok(config) => {
                        debug!(?config, "configuration decoded");
                        self.spa_config = config;
                        // Earlier broadcasts were read at the default scale
                        self.status_decoder.reset();
                        self.dispatcher
                            .session_mut()
                            .mark_obtained(InfoRequest::Configuration, current_time);
                    }
                    Err(e) => self.record_decode_error(e),
                }
            }
            TelegramKind::FaultLog => match SpaFaultLog::decode(frame) {
                Ok(fault_log) => {
                    debug!(code = fault_log.fault_code, message = fault_log.message, "fault log decoded");
                    self.fault_log = fault_log;
                    self.dispatcher
                        .session_mut()
                        .mark_obtained(InfoRequest::FaultLog, current_time);
                }
                Err(e) => self.record_decode_error(e),
            },
            TelegramKind::FilterSettings => match SpaFilterSettings::decode(frame) {
                Ok(settings) => {
                    debug!(
                        filter1 = %settings.filter1,
                        filter2 = %settings.filter2,
                        filter2_enabled = settings.filter2_enabled,
                        "filter settings decoded"
                    );
                    self.filter_settings = settings;
                    self.dispatcher
                        .session_mut()
                        .mark_obtained(InfoRequest::FilterSettings, current_time);
                }
                Err(e) => self.record_decode_error(e),
            },
            TelegramKind::Status => {
                match self
                    .status_decoder
                    .decode(frame, self.spa_config.temp_scale, &mut self.spa_state)
                {
                    Ok(true) => self.stats.status_decodes = self.stats.status_decodes.saturating_add(1),
                    Ok(false) => {
                        self.stats.stale_status_skipped = self.stats.stale_status_skipped.saturating_add(1)
                    }
                    Err(e) => self.record_decode_error(e),
                }
            }
        }
    }

    fn record_decode_error(&mut self, error: crate::telegrams::DecodeError) {
        self.stats.decode_errors = self.stats.decode_errors.saturating_add(1);
        debug!("telegram ignored: {}", error);
    }

    fn send(&mut self, message: OutboundMessage) {
        let wire = match message.content().and_then(|content| encode_frame(&content)) {
            Ok(wire) => wire,
            Err(e) => {
                warn!(?message, "cannot encode outbound frame: {}", e);
                self.stats.send_failures = self.stats.send_failures.saturating_add(1);
                return;
            }
        };
        trace!(frame = %format_frame(&wire), ?message, "sending");

        let written = wire
            .iter()
            .try_for_each(|&byte| self.transport.write(byte))
            .and_then(|_| self.transport.flush());

        match written {
            Ok(()) => self.stats.frames_sent = self.stats.frames_sent.saturating_add(1),
            Err(e) => {
                warn!(?message, "transport write failed: {}", e);
                self.stats.send_failures = self.stats.send_failures.saturating_add(1);
            }
        }
    }

    /// Stages a new set-point, in the unit currently reported by the spa.
    pub fn set_temp(&mut self, temperature: f32) -> Result<(), ControlError> {
        let scale = self.spa_config.temp_scale;
        let range = self.config.temperature_limits.for_scale(scale);

        if !range.contains(temperature) {
            warn!(temperature, min = range.min, max = range.max, "set-point rejected");
            return Err(ControlError::TemperatureOutOfRange {
                value: temperature,
                min: range.min,
                max: range.max,
            });
        }

        let raw = scale.to_raw(temperature);
        debug!(temperature, raw, "set-point staged");
        self.dispatcher.stage_temperature(raw);
        Ok(())
    }

    pub fn set_hour(&mut self, hour: u8) -> Result<(), ControlError> {
        if hour > MAX_CLOCK_HOUR {
            warn!(hour, "clock hour rejected");
            return Err(ControlError::HourOutOfRange(hour));
        }
        let minute = self.staged_clock().1;
        self.dispatcher.stage_clock(hour, minute);
        Ok(())
    }

    pub fn set_minute(&mut self, minute: u8) -> Result<(), ControlError> {
        if minute > MAX_CLOCK_MINUTE {
            warn!(minute, "clock minute rejected");
            return Err(ControlError::MinuteOutOfRange(minute));
        }
        let hour = self.staged_clock().0;
        self.dispatcher.stage_clock(hour, minute);
        Ok(())
    }

    // A pending clock change wins over the last decoded clock
    fn staged_clock(&self) -> (u8, u8) {
        self.dispatcher
            .get_pending()
            .clock
            .unwrap_or((self.spa_state.hour, self.spa_state.minutes))
    }

    pub fn toggle_light(&mut self) {
        self.stage_toggle(ToggleCommand::Light);
    }

    pub fn toggle_light2(&mut self) {
        self.stage_toggle(ToggleCommand::Light2);
    }

    pub fn toggle_jet1(&mut self) {
        self.stage_toggle(ToggleCommand::Jet1);
    }

    pub fn toggle_jet2(&mut self) {
        self.stage_toggle(ToggleCommand::Jet2);
    }

    pub fn toggle_jet3(&mut self) {
        self.stage_toggle(ToggleCommand::Jet3);
    }

    pub fn toggle_blower(&mut self) {
        self.stage_toggle(ToggleCommand::Blower);
    }

    /// Stages a range change only when `high` differs from the decoded range.
    /// Returns whether anything was staged.
    pub fn set_highrange(&mut self, high: bool) -> bool {
        if self.spa_state.highrange == high {
            return false;
        }
        self.stage_toggle(ToggleCommand::TemperatureRange);
        true
    }

    /// Drives a switch towards `on`; a toggle is staged only when the decoded state differs.
    pub fn set_switch(&mut self, switch: SpaSwitch, on: bool) -> bool {
        if switch.is_on(&self.spa_state) == on {
            return false;
        }
        self.stage_toggle(switch.command());
        true
    }

    pub fn set_preset(&mut self, preset: HeatPreset) -> bool {
        self.set_highrange(preset == HeatPreset::Home)
    }

    fn stage_toggle(&mut self, command: ToggleCommand) {
        debug!(?command, code = command.code(), "toggle staged");
        self.dispatcher.stage_toggle(command);
    }

    pub fn register_listener<L>(&mut self, listener: L)
    where
        L: SpaListener + 'static,
    {
        self.listeners.register(listener);
    }

    pub fn get_current_config(&self) -> SpaConfig {
        self.spa_config
    }

    pub fn get_current_state(&self) -> &SpaState {
        &self.spa_state
    }

    pub fn get_fault_log(&self) -> &SpaFaultLog {
        &self.fault_log
    }

    pub fn get_filter_settings(&self) -> &SpaFilterSettings {
        &self.filter_settings
    }

    pub fn get_session_progress(&self) -> &SessionProgress {
        self.dispatcher.get_session()
    }

    pub fn get_pending(&self) -> &crate::dispatcher::PendingCommands {
        self.dispatcher.get_pending()
    }

    pub fn get_stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn get_address(&self) -> u8 {
        self.arbiter.get_address()
    }

    /// True while this client holds a bus address.
    pub fn is_communicating(&self) -> bool {
        self.arbiter.is_addressed()
    }

    pub fn has_comms_error(&self) -> bool {
        self.liveness.has_error()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ControlError {
    #[error("temperature {value} outside {min}..={max}")]
    TemperatureOutOfRange { value: f32, min: f32, max: f32 },
    #[error("hour {0} outside 0..=23")]
    HourOutOfRange(u8),
    #[error("minute {0} outside 0..=59")]
    MinuteOutOfRange(u8),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn engine() -> SpaEngine<MemoryTransport> {
        SpaEngine::new(MemoryTransport::new(), EngineConfig::default())
    }

    fn deliver(engine: &mut SpaEngine<MemoryTransport>, content: &[u8], now: u64) {
        let wire = encode_frame(content).unwrap();
        engine.transport_mut().push_inbound(&wire);
        engine.update(now).unwrap();
    }

    #[test]
    fn test_clock_staging_keeps_other_field() {
        let mut engine = engine();
        engine.spa_state.hour = 7;
        engine.spa_state.minutes = 45;

        engine.set_hour(9).unwrap();
        assert_eq!(engine.get_pending().clock, Some((9, 45)));

        engine.set_minute(10).unwrap();
        assert_eq!(engine.get_pending().clock, Some((9, 10)));
    }

    #[test]
    fn test_rejected_input_leaves_pending_untouched() {
        let mut engine = engine();
        assert_eq!(engine.set_hour(24), Err(ControlError::HourOutOfRange(24)));
        assert_eq!(engine.set_minute(60), Err(ControlError::MinuteOutOfRange(60)));
        assert!(matches!(
            engine.set_temp(41.0),
            Err(ControlError::TemperatureOutOfRange { .. })
        ));
        assert!(engine.get_pending().is_empty());
    }

    #[test]
    fn test_grant_is_acknowledged() {
        let mut engine = engine();
        deliver(&mut engine, &[0xFE, 0xBF, 0x02, 0x10], 0);

        assert_eq!(engine.get_address(), 0x10);
        let expected = encode_frame(&[0x10, 0xBF, 0x03]).unwrap();
        assert_eq!(engine.transport().get_outbound(), expected.as_slice());
        assert_eq!(engine.get_stats().frames_sent, 1);
    }

    #[test]
    fn test_truncated_grant_is_ignored() {
        let mut engine = engine();
        deliver(&mut engine, &[0xFE, 0xBF, 0x02], 0);
        assert!(!engine.is_communicating());
        assert!(engine.transport().get_outbound().is_empty());
    }
}
