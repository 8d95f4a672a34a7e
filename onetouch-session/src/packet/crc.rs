//! CRC16-CCITT calculation for packet frames
//!
//! Polynomial 0x1021, initial register 0xFFFF, MSB-first per byte, no final
//! XOR. The table-driven update is bit-for-bit identical to shifting each byte
//! through the register one bit at a time.

const INITIAL_CRC: u16 = 0xFFFF;
const POLYNOMIAL: u16 = 0x1021;

/// Precomputed CRC table
static CRC_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for b in 0..=0xFFu16 {
        let mut v = b << 8;
        for _ in 0..8 {
            if (v & 0x8000) != 0 {
                v = (v << 1) ^ POLYNOMIAL;
            } else {
                v <<= 1;
            }
        }
        table[b as usize] = v;
    }
    table
});

/// Incremental CRC16 calculator
#[derive(Debug, Clone, Copy)]
pub struct Crc16 {
    crc_value: u16,
}

impl Crc16 {
    pub fn new() -> Self {
        Self {
            crc_value: INITIAL_CRC,
        }
    }

    /// Reset the register to its initial state
    pub fn reset(&mut self) {
        self.crc_value = INITIAL_CRC;
    }

    /// Update the register with a single byte
    pub fn update(&mut self, data: u8) {
        let index = ((self.crc_value >> 8) ^ u16::from(data)) & 0xFF;
        self.crc_value = (self.crc_value << 8) ^ CRC_TABLE[index as usize];
    }

    /// Update the register with multiple bytes
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Current register value
    pub fn value(&self) -> u16 {
        self.crc_value
    }

    /// Current register value as it is laid out on the wire (little-endian)
    pub fn value_bytes(&self) -> [u8; 2] {
        self.crc_value.to_le_bytes()
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC16 of a whole buffer
pub fn crc16(data: &[u8]) -> u16 {
    let mut calc = Crc16::new();
    calc.update_bytes(data);
    calc.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitwise_crc(data: &[u8]) -> u16 {
        let mut crc: u32 = 0xFFFF;
        for &byte in data {
            crc ^= u32::from(byte) << 8;
            for _ in 0..8 {
                crc = if (crc & 0x8000) != 0 {
                    (crc << 1) ^ 0x1021
                } else {
                    crc << 1
                };
            }
        }
        (crc & 0xFFFF) as u16
    }

    #[test]
    fn test_check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input_keeps_initial_register() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_table_matches_bitwise_algorithm() {
        let data: Vec<u8> = (0..=255u8).chain((0..64u8).map(|b| b.wrapping_mul(37))).collect();
        for end in 0..data.len() {
            assert_eq!(crc16(&data[..end]), bitwise_crc(&data[..end]), "prefix {}", end);
        }
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut calc = Crc16::new();
        calc.update_bytes(&[0x02, 0x09, 0x00]);
        calc.update_bytes(&[0x04, 0x20, 0x02, 0x03]);
        assert_eq!(calc.value(), crc16(&[0x02, 0x09, 0x00, 0x04, 0x20, 0x02, 0x03]));
        calc.reset();
        assert_eq!(calc.value(), INITIAL_CRC);
    }
}
