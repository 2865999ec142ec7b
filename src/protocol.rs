use crate::frame::{Frame, FrameError};
use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Destination byte of frames addressed to clients without an identity.
pub const NEW_CLIENT_ADDRESS: u8 = 0xFE;
/// Destination byte of status broadcasts.
pub const BROADCAST_ADDRESS: u8 = 0xFF;
/// Second address byte of every frame a client sends.
pub const CLIENT_SOURCE: u8 = 0xBF;

pub const UNASSIGNED_ADDRESS: u8 = 0x00;
pub const MAX_CLIENT_ADDRESS: u8 = 0x2F;

/// Offset of the granted address inside a new-client-id telegram.
pub const GRANTED_ADDRESS_OFFSET: usize = 5;

// Inbound type codes
pub const TYPE_ANY_NEW_CLIENTS: u8 = 0x00;
pub const TYPE_NEW_CLIENT_ID: u8 = 0x02;
pub const TYPE_CLEAR_TO_SEND: u8 = 0x06;
pub const TYPE_STATUS: u8 = 0x13;
pub const TYPE_FILTER_SETTINGS: u8 = 0x23;
pub const TYPE_FAULT_LOG: u8 = 0x28;
pub const TYPE_CONFIGURATION: u8 = 0x2E;

// Outbound type codes
pub const TYPE_ADDRESS_REQUEST: u8 = 0x01;
pub const TYPE_ADDRESS_ACK: u8 = 0x03;
pub const TYPE_NOTHING_TO_SEND: u8 = 0x07;
pub const TYPE_TOGGLE: u8 = 0x11;
pub const TYPE_SET_TEMPERATURE: u8 = 0x20;
pub const TYPE_SET_TIME: u8 = 0x21;
pub const TYPE_SETTINGS_REQUEST: u8 = 0x22;

const ADDRESS_REQUEST_PAYLOAD: [u8; 3] = [0x02, 0xF1, 0x73];

pub const MAX_OUTBOUND_CONTENT: usize = 8;
pub type OutboundContent = Vec<u8, MAX_OUTBOUND_CONTENT>;

/// Who a frame's destination byte designates, relative to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    NewClients,
    AllClients,
    ThisClient,
}

/// Every inbound telegram the engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelegramKind {
    AnyNewClients,
    NewClientId,
    ClearToSend,
    Configuration,
    FaultLog,
    FilterSettings,
    Status,
}

impl TelegramKind {
    pub const ALL: [TelegramKind; 7] = [
        TelegramKind::AnyNewClients,
        TelegramKind::NewClientId,
        TelegramKind::ClearToSend,
        TelegramKind::Configuration,
        TelegramKind::FaultLog,
        TelegramKind::FilterSettings,
        TelegramKind::Status,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub recipient: Recipient,
    pub type_code: u8,
    pub telegram: TelegramKind,
}

impl Route {
    const fn new(recipient: Recipient, type_code: u8, telegram: TelegramKind) -> Self {
        Self { recipient, type_code, telegram }
    }
}

pub const ROUTES: [Route; 7] = [
    Route::new(Recipient::NewClients, TYPE_ANY_NEW_CLIENTS, TelegramKind::AnyNewClients),
    Route::new(Recipient::NewClients, TYPE_NEW_CLIENT_ID, TelegramKind::NewClientId),
    Route::new(Recipient::ThisClient, TYPE_CLEAR_TO_SEND, TelegramKind::ClearToSend),
    Route::new(Recipient::ThisClient, TYPE_CONFIGURATION, TelegramKind::Configuration),
    Route::new(Recipient::ThisClient, TYPE_FAULT_LOG, TelegramKind::FaultLog),
    Route::new(Recipient::ThisClient, TYPE_FILTER_SETTINGS, TelegramKind::FilterSettings),
    Route::new(Recipient::AllClients, TYPE_STATUS, TelegramKind::Status),
];

/// Maps a frame to the telegram it carries for a client currently holding `address`.
///
/// While unaddressed only arbitration telegrams are recognised; once addressed,
/// arbitration traffic meant for other newcomers is ignored.
pub fn classify(frame: &Frame, address: u8) -> Option<TelegramKind> {
    let addressed = address != UNASSIGNED_ADDRESS;

    let recipient = match frame.destination() {
        NEW_CLIENT_ADDRESS if !addressed => Recipient::NewClients,
        BROADCAST_ADDRESS if addressed => Recipient::AllClients,
        destination if addressed && destination == address => Recipient::ThisClient,
        _ => return None,
    };

    ROUTES
        .iter()
        .find(|route| route.recipient == recipient && route.type_code == frame.kind())
        .map(|route| route.telegram)
}

/// Opaque single-byte commands sent through the generic toggle telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleCommand {
    Jet1,
    Jet2,
    Jet3,
    Blower,
    Light,
    Light2,
    TemperatureRange,
}

impl ToggleCommand {
    pub fn code(self) -> u8 {
        match self {
            ToggleCommand::Jet1 => 0x04,
            ToggleCommand::Jet2 => 0x05,
            ToggleCommand::Jet3 => 0x06,
            ToggleCommand::Blower => 0x0C,
            ToggleCommand::Light => 0x11,
            // Unconfirmed on hardware
            ToggleCommand::Light2 => 0x12,
            ToggleCommand::TemperatureRange => 0x50,
        }
    }
}

/// Information pages the client requests while bootstrapping a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfoRequest {
    Configuration,
    FaultLog,
    FilterSettings,
}

impl InfoRequest {
    fn arguments(self) -> [u8; 3] {
        match self {
            InfoRequest::Configuration => [0x00, 0x00, 0x01],
            // First page of the fault log
            InfoRequest::FaultLog => [0x20, 0xFF, 0x00],
            InfoRequest::FilterSettings => [0x01, 0x00, 0x00],
        }
    }
}

/// A frame this client puts on the bus, before length/CRC/sentinel wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundMessage {
    AddressRequest,
    AddressAck { address: u8 },
    SetTime { address: u8, hour: u8, minute: u8 },
    SetTemperature { address: u8, raw: u8 },
    Toggle { address: u8, command: ToggleCommand },
    Request { address: u8, request: InfoRequest },
    NothingToSend { address: u8 },
}

impl OutboundMessage {
    /// Frame content (address bytes, type code, payload) ready for [`encode_frame`].
    ///
    /// [`encode_frame`]: crate::frame::encode_frame
    pub fn content(&self) -> Result<OutboundContent, FrameError> {
        let content = match *self {
            OutboundMessage::AddressRequest => OutboundContent::from_slice(&[
                NEW_CLIENT_ADDRESS,
                CLIENT_SOURCE,
                TYPE_ADDRESS_REQUEST,
                ADDRESS_REQUEST_PAYLOAD[0],
                ADDRESS_REQUEST_PAYLOAD[1],
                ADDRESS_REQUEST_PAYLOAD[2],
            ]),
            OutboundMessage::AddressAck { address } => {
                OutboundContent::from_slice(&[address, CLIENT_SOURCE, TYPE_ADDRESS_ACK])
            }
            OutboundMessage::SetTime { address, hour, minute } => {
                OutboundContent::from_slice(&[address, CLIENT_SOURCE, TYPE_SET_TIME, hour, minute])
            }
            OutboundMessage::SetTemperature { address, raw } => {
                OutboundContent::from_slice(&[address, CLIENT_SOURCE, TYPE_SET_TEMPERATURE, raw])
            }
            OutboundMessage::Toggle { address, command } => {
                OutboundContent::from_slice(&[address, CLIENT_SOURCE, TYPE_TOGGLE, command.code(), 0x00])
            }
            OutboundMessage::Request { address, request } => {
                let [first, second, third] = request.arguments();
                OutboundContent::from_slice(&[address, CLIENT_SOURCE, TYPE_SETTINGS_REQUEST, first, second, third])
            }
            OutboundMessage::NothingToSend { address } => {
                OutboundContent::from_slice(&[address, CLIENT_SOURCE, TYPE_NOTHING_TO_SEND])
            }
        };
        content.map_err(|()| FrameError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;

    fn frame(content: &[u8]) -> Frame {
        Frame::parse(&encode_frame(content).unwrap()).unwrap()
    }

    #[test]
    fn test_every_telegram_kind_has_exactly_one_route() {
        for kind in TelegramKind::ALL {
            let count = ROUTES.iter().filter(|route| route.telegram == kind).count();
            assert_eq!(count, 1, "{:?}", kind);
        }
    }

    #[test]
    fn test_routes_are_unambiguous() {
        for (i, a) in ROUTES.iter().enumerate() {
            for b in ROUTES.iter().skip(i + 1) {
                assert!(a.recipient != b.recipient || a.type_code != b.type_code);
            }
        }
    }

    #[test]
    fn test_unaddressed_client_only_sees_arbitration() {
        assert_eq!(classify(&frame(&[0xFE, 0xBF, 0x00]), 0), Some(TelegramKind::AnyNewClients));
        assert_eq!(classify(&frame(&[0xFE, 0xBF, 0x02, 0x10]), 0), Some(TelegramKind::NewClientId));
        assert_eq!(classify(&frame(&[0xFF, 0xAF, 0x13]), 0), None);
        assert_eq!(classify(&frame(&[0x00, 0xBF, 0x06]), 0), None);
    }

    #[test]
    fn test_addressed_client_ignores_arbitration_and_foreign_frames() {
        assert_eq!(classify(&frame(&[0xFE, 0xBF, 0x00]), 0x10), None);
        assert_eq!(classify(&frame(&[0x11, 0xBF, 0x06]), 0x10), None);
        assert_eq!(classify(&frame(&[0x10, 0xBF, 0x06]), 0x10), Some(TelegramKind::ClearToSend));
        assert_eq!(classify(&frame(&[0xFF, 0xAF, 0x13]), 0x10), Some(TelegramKind::Status));
        assert_eq!(classify(&frame(&[0x10, 0xBF, 0x99]), 0x10), None);
    }

    #[test]
    fn test_outbound_content() {
        assert_eq!(
            OutboundMessage::AddressRequest.content().unwrap().as_slice(),
            &[0xFE, 0xBF, 0x01, 0x02, 0xF1, 0x73]
        );
        assert_eq!(
            OutboundMessage::Request { address: 0x10, request: InfoRequest::FaultLog }.content().unwrap().as_slice(),
            &[0x10, 0xBF, 0x22, 0x20, 0xFF, 0x00]
        );
        assert_eq!(
            OutboundMessage::Toggle { address: 0x10, command: ToggleCommand::Blower }.content().unwrap().as_slice(),
            &[0x10, 0xBF, 0x11, 0x0C, 0x00]
        );
    }

    #[test]
    fn test_every_outbound_message_fits_a_frame() {
        let messages = [
            OutboundMessage::AddressRequest,
            OutboundMessage::AddressAck { address: 0x10 },
            OutboundMessage::SetTime { address: 0x10, hour: 23, minute: 59 },
            OutboundMessage::SetTemperature { address: 0x10, raw: 76 },
            OutboundMessage::Toggle { address: 0x10, command: ToggleCommand::Blower },
            OutboundMessage::Request { address: 0x10, request: InfoRequest::Configuration },
            OutboundMessage::NothingToSend { address: 0x10 },
        ];

        for message in messages {
            let content = message.content().unwrap();
            assert_eq!(content[1], CLIENT_SOURCE, "{:?}", message);
            assert!(encode_frame(&content).is_ok(), "{:?}", message);
        }
        assert_eq!(
            OutboundMessage::SetTime { address: 0x10, hour: 23, minute: 59 }.content().unwrap().as_slice(),
            &[0x10, 0xBF, 0x21, 23, 59]
        );
    }
}
