//! # Balboa Spa Bus Client
//!
//! Client-side protocol engine for the RS-485 bus shared by a Balboa spa
//! mainboard and its control panels. The engine joins the bus as an extra
//! client, decodes the telegrams the mainboard broadcasts, and injects user
//! commands when the mainboard invites it to talk.
//!
//! ## Features
//!
//! - **Frame reassembly**: byte-at-a-time resynchronizing receiver with CRC-8 checking
//! - **Bus arbitration**: claims a client address and reclaims it after link loss
//! - **Request cycle**: exactly one response per clear-to-send invitation
//! - **Telegram decoding**: configuration, status, fault log and filter settings
//! - **Liveness**: standing comms error after a quiet period, self-healing
//! - **Bounded buffers**: frames live in fixed-capacity `heapless` storage
//!
//! ## Quick Start
//!
//! ```rust
//! use balboa_spa::{EngineConfig, MemoryTransport, SpaEngine};
//!
//! let mut engine = SpaEngine::new(MemoryTransport::new(), EngineConfig::default());
//!
//! // Address grant from the mainboard: FE BF 02 with address 0x10
//! let grant = balboa_spa::frame::encode_frame(&[0xFE, 0xBF, 0x02, 0x10]).unwrap();
//! engine.transport_mut().push_inbound(&grant);
//!
//! engine.update(0).unwrap();
//! assert!(engine.is_communicating());
//!
//! // Sent at the next clear-to-send invitation
//! engine.toggle_light();
//! ```
//!
//! ## Architecture
//!
//! - [`engine`] - Owned engine context, poll tick and public control API
//! - [`frame`] / [`crc`] - Wire framing and integrity
//! - [`protocol`] - Bus constants, telegram routing and outbound messages
//! - [`telegrams`] - Data models and table-driven decoders
//! - [`arbiter`], [`dispatcher`], [`liveness`] - Session state machines
//! - [`transport`] - Byte-line collaborators (memory, serial port)
//! - [`adapters`] - Switch, sensor and thermostat views for front ends

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]

extern crate alloc;

pub mod adapters;
pub mod arbiter;
pub mod config;
pub mod crc;
pub mod dispatcher;
pub mod engine;
pub mod frame;
pub mod listener;
pub mod liveness;
pub mod protocol;
pub mod telegrams;
pub mod transport;

// Re-export main public types for convenience
pub use config::EngineConfig;
pub use engine::{ControlError, EngineError, EngineStats, SpaEngine};
pub use frame::{Frame, FrameReceiver, RxOutcome};
pub use listener::SpaListener;
pub use telegrams::{SpaConfig, SpaFaultLog, SpaFilterSettings, SpaState};
pub use transport::{MemoryTransport, SerialTransport, Transport};
