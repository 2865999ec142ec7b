//! CRC-8 used on the Balboa bus.
//!
//! Polynomial 0x07, MSB first, seeded with 0x02 and XORed with 0x02 at the end.
//! This is not one of the catalogued CRC-8 variants, so it is computed bit by bit.

const CRC_INIT: u8 = 0x02;
const CRC_POLY: u8 = 0x07;
const CRC_XOR_OUT: u8 = 0x02;

/// Computes the bus CRC over `data`.
///
/// For an inbound frame the covered range is everything between the leading
/// sentinel and the CRC byte, i.e. the length byte through the last payload byte.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC_INIT;

    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc ^ CRC_XOR_OUT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_cancels_seed() {
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn test_single_byte_matches_manual_computation() {
        // 0x02 reaches bit 7 after six shifts, then feeds back twice:
        // 0x80 -> 0x07 -> 0x0E, and 0x0E ^ 0x02 = 0x0C
        assert_eq!(crc8(&[0x00]), 0x0C);
        // 0x02 ^ 0x02 = 0x00 stays zero through every shift
        assert_eq!(crc8(&[0x02]), 0x02);
    }

    #[test]
    fn test_crc_is_deterministic() {
        let data = [0x05, 0x10, 0xBF, 0x06];
        assert_eq!(crc8(&data), crc8(&data));
    }

    #[test]
    fn test_crc_is_order_sensitive() {
        assert_ne!(crc8(&[0x05, 0xAA, 0xBB, 0xCC]), crc8(&[0x05, 0xBB, 0xAA, 0xCC]));
    }

    #[test]
    fn test_single_bit_flip_changes_crc() {
        let data = [0x08, 0xFE, 0xBF, 0x01, 0x02, 0xF1, 0x73];
        let reference = crc8(&data);

        for index in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data;
                flipped[index] ^= 1 << bit;
                assert_ne!(crc8(&flipped), reference, "flip of bit {} in byte {}", bit, index);
            }
        }
    }
}
