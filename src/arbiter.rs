use crate::protocol::{OutboundMessage, MAX_CLIENT_ADDRESS, UNASSIGNED_ADDRESS};
use tracing::{debug, info};

/// Owns this client's bus identity and answers the address-claim handshake.
#[derive(Debug, Default)]
pub struct BusArbiter {
    address: u8,
}

impl BusArbiter {
    pub fn new() -> Self {
        Self { address: UNASSIGNED_ADDRESS }
    }

    pub fn get_address(&self) -> u8 {
        self.address
    }

    pub fn is_addressed(&self) -> bool {
        self.address != UNASSIGNED_ADDRESS
    }

    /// "Any new clients?" poll: ask the mainboard for an identity.
    pub fn request_address(&self) -> OutboundMessage {
        debug!("requesting client address");
        OutboundMessage::AddressRequest
    }

    /// Adopts a granted address, clamped to the client range, and returns the acknowledgement.
    pub fn accept_grant(&mut self, granted: u8) -> OutboundMessage {
        self.address = granted.min(MAX_CLIENT_ADDRESS);
        info!(granted, address = self.address, "client address assigned");
        OutboundMessage::AddressAck { address: self.address }
    }

    pub fn release(&mut self) {
        if self.is_addressed() {
            info!(address = self.address, "client address released");
        }
        self.address = UNASSIGNED_ADDRESS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_is_clamped() {
        let mut arbiter = BusArbiter::new();
        assert_eq!(arbiter.accept_grant(0x31), OutboundMessage::AddressAck { address: 0x2F });
        assert_eq!(arbiter.get_address(), 0x2F);
    }

    #[test]
    fn test_grant_within_range_is_kept() {
        let mut arbiter = BusArbiter::new();
        arbiter.accept_grant(0x10);
        assert_eq!(arbiter.get_address(), 0x10);
        assert!(arbiter.is_addressed());

        arbiter.release();
        assert!(!arbiter.is_addressed());
    }
}
