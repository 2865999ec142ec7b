use alloc::collections::VecDeque;
use alloc::vec::Vec;
use std::io::{Read, Write};
use thiserror::Error;
use tracing::warn;

/// The half-duplex byte line the engine sits on.
///
/// `read` never blocks: it returns `nb::Error::WouldBlock` when nothing is pending.
pub trait Transport {
    fn available(&mut self) -> bool;
    fn read(&mut self) -> nb::Result<u8, TransportError>;
    fn write(&mut self, byte: u8) -> Result<(), TransportError>;
    fn flush(&mut self) -> Result<(), TransportError>;
}

/// Scripted transport: queued inbound bytes, captured outbound bytes.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    flush_count: u32,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    pub fn get_outbound(&self) -> &[u8] {
        &self.outbound
    }

    /// Returns and clears everything written so far.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.outbound)
    }

    pub fn get_flush_count(&self) -> u32 {
        self.flush_count
    }
}

impl Transport for MemoryTransport {
    fn available(&mut self) -> bool {
        !self.inbound.is_empty()
    }

    fn read(&mut self) -> nb::Result<u8, TransportError> {
        self.inbound.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn write(&mut self, byte: u8) -> Result<(), TransportError> {
        self.outbound.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.flush_count = self.flush_count.wrapping_add(1);
        Ok(())
    }
}

/// RS-485 adapter exposed as a serial device.
pub struct SerialTransport {
    port: alloc::boxed::Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;

    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .timeout(std::time::Duration::from_millis(10))
            .open()?;
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn available(&mut self) -> bool {
        match self.port.bytes_to_read() {
            Ok(count) => count > 0,
            Err(e) => {
                warn!("serial port poll failed: {}", e);
                false
            }
        }
    }

    fn read(&mut self) -> nb::Result<u8, TransportError> {
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Ok(byte[0]),
            Ok(_) => Err(nb::Error::WouldBlock),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut || e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(nb::Error::WouldBlock)
            }
            Err(e) => Err(nb::Error::Other(TransportError::Io(e))),
        }
    }

    fn write(&mut self, byte: u8) -> Result<(), TransportError> {
        self.port.write_all(&[byte])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.port.flush()?;
        Ok(())
    }
}

impl core::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialTransport").field("port", &self.port.name()).finish()
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serial I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial port unavailable: {0}")]
    Port(#[from] serialport::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_transport_round_trip() {
        let mut transport = MemoryTransport::new();
        assert!(!transport.available());
        assert!(matches!(transport.read(), Err(nb::Error::WouldBlock)));

        transport.push_inbound(&[0x7E, 0x05]);
        assert!(transport.available());
        assert_eq!(transport.read().unwrap(), 0x7E);
        assert_eq!(transport.pending_inbound(), 1);

        transport.write(0xAA).unwrap();
        transport.flush().unwrap();
        assert_eq!(transport.get_outbound(), &[0xAA]);
        assert_eq!(transport.get_flush_count(), 1);
        assert_eq!(transport.take_outbound(), vec![0xAA]);
        assert!(transport.get_outbound().is_empty());
    }
}
