use crate::crc::crc8;
use arrayvec::ArrayString;
use core::fmt::Write;
use heapless::Vec;
use static_assertions::const_assert;
use thiserror::Error;

/// Start/end of frame marker. The same byte opens and closes every telegram.
pub const SENTINEL: u8 = 0x7E;
pub const MAX_FRAME_SIZE: usize = 100;
/// Smallest legal value of the length byte: length, destination, source, type, CRC.
pub const MIN_DECLARED_LENGTH: usize = 5;

const FRAME_DUMP_SIZE: usize = MAX_FRAME_SIZE * 3;

// The length byte counts itself through the CRC, the two sentinels are extra
const_assert!(MAX_FRAME_SIZE <= u8::MAX as usize + 2);
const_assert!(MIN_DECLARED_LENGTH + 2 <= MAX_FRAME_SIZE);

pub type FrameBuffer = Vec<u8, MAX_FRAME_SIZE>;
pub type FrameDump = ArrayString<FRAME_DUMP_SIZE>;

/// A complete, CRC-checked telegram as it appeared on the wire.
///
/// Index 0 is the leading sentinel, index 1 the length byte. All offsets used by
/// the telegram decoders are absolute indices into this layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: FrameBuffer,
}

impl Frame {
    /// Runs `bytes` through a fresh receiver and returns the first frame it yields.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let mut receiver = FrameReceiver::new();
        for &byte in bytes {
            match receiver.push_byte(byte) {
                RxOutcome::Frame(frame) => return Ok(frame),
                RxOutcome::Rejected(error) => return Err(error),
                RxOutcome::Discarded | RxOutcome::Buffered => {}
            }
        }
        Err(FrameError::Incomplete)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn declared_len(&self) -> usize {
        usize::from(self.bytes[1])
    }

    pub fn destination(&self) -> u8 {
        self.bytes[2]
    }

    pub fn source(&self) -> u8 {
        self.bytes[3]
    }

    pub fn kind(&self) -> u8 {
        self.bytes[4]
    }

    /// Bytes between the length byte and the CRC: destination, source, type and payload.
    pub fn content(&self) -> &[u8] {
        &self.bytes[2..self.declared_len()]
    }

    /// Bytes after the type code, up to the CRC.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[5..self.declared_len()]
    }

    pub fn crc(&self) -> u8 {
        self.bytes[self.declared_len()]
    }

    /// Byte at absolute `offset`, if it lies before the CRC.
    pub fn get(&self, offset: usize) -> Option<u8> {
        if offset < self.declared_len() {
            self.bytes.get(offset).copied()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxOutcome {
    /// Byte dropped while hunting for a start sentinel.
    Discarded,
    /// Byte accepted into the accumulation buffer.
    Buffered,
    Frame(Frame),
    /// The buffer was discarded; the receiver is resynchronizing.
    Rejected(FrameError),
}

/// Reassembles frames from a raw byte stream, one byte at a time.
#[derive(Debug, Default)]
pub struct FrameReceiver {
    buffer: FrameBuffer,
}

impl FrameReceiver {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn push_byte(&mut self, byte: u8) -> RxOutcome {
        // Hunt for SOF
        if self.buffer.is_empty() && byte != SENTINEL {
            return RxOutcome::Discarded;
        }

        // Doubled marker: the new sentinel takes the place of the buffered one
        if self.buffer.len() == 1 && byte == SENTINEL {
            return RxOutcome::Buffered;
        }

        if self.buffer.push(byte).is_err() {
            self.buffer.clear();
            return RxOutcome::Rejected(FrameError::Overflow);
        }

        let received = self.buffer.len();
        if byte == SENTINEL && received > 2 && received >= usize::from(self.buffer[1]) + 2 {
            let outcome = match self.validate() {
                Ok(frame) => RxOutcome::Frame(frame),
                Err(error) => RxOutcome::Rejected(error),
            };
            self.buffer.clear();
            return outcome;
        }

        RxOutcome::Buffered
    }

    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn validate(&self) -> Result<Frame, FrameError> {
        let declared = usize::from(self.buffer[1]);
        let received = self.buffer.len();

        if received - 2 < declared {
            return Err(FrameError::Incomplete);
        }

        if declared < MIN_DECLARED_LENGTH {
            return Err(FrameError::TooShort { declared });
        }

        let expected = crc8(&self.buffer[1..declared]);
        let actual = self.buffer[declared];
        if expected != actual {
            return Err(FrameError::CrcMismatch { expected, actual });
        }

        Ok(Frame { bytes: self.buffer.clone() })
    }
}

/// Wraps `content` (destination, source, type, payload) into a wire frame:
/// sentinel, length, content, CRC, sentinel.
pub fn encode_frame(content: &[u8]) -> Result<FrameBuffer, FrameError> {
    let declared = content.len() + 2;
    if declared + 2 > MAX_FRAME_SIZE {
        return Err(FrameError::Overflow);
    }

    let mut frame = FrameBuffer::new();
    frame.push(SENTINEL).map_err(|_| FrameError::Overflow)?;
    frame.push(declared as u8).map_err(|_| FrameError::Overflow)?;
    frame.extend_from_slice(content).map_err(|_| FrameError::Overflow)?;
    let crc = crc8(&frame[1..]);
    frame.push(crc).map_err(|_| FrameError::Overflow)?;
    frame.push(SENTINEL).map_err(|_| FrameError::Overflow)?;

    Ok(frame)
}

/// Renders bytes as space separated hex for log output.
pub fn format_frame(bytes: &[u8]) -> FrameDump {
    let mut dump = FrameDump::new();
    for (index, byte) in bytes.iter().take(MAX_FRAME_SIZE).enumerate() {
        let separator = if index == 0 { "" } else { " " };
        // Capacity covers MAX_FRAME_SIZE entries
        let _ = write!(dump, "{}{:02X}", separator, byte);
    }
    dump
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("declared length {declared} is below the minimum frame size")]
    TooShort { declared: usize },
    #[error("CRC mismatch: computed {expected:#04x}, frame carries {actual:#04x}")]
    CrcMismatch { expected: u8, actual: u8 },
    #[error("frame exceeds the {max} byte buffer", max = MAX_FRAME_SIZE)]
    Overflow,
    #[error("frame ended before its declared length")]
    Incomplete,
}
