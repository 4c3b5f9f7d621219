//! Nibble-table CRC-16 (XMODEM polynomial) with the inverter's escape rule:
//! a checksum byte must never look like a frame delimiter, so any byte equal
//! to `(`, CR or LF is bumped by one.

pub const SIZE: usize = 2;

const TABLE: [u16; 16] = [
    0x0000, 0x1021, 0x2042, 0x3063, 0x4084, 0x50A5, 0x60C6, 0x70E7, 0x8108, 0x9129, 0xA14A,
    0xB16B, 0xC18C, 0xD1AD, 0xE1CE, 0xF1EF,
];

fn is_reserved(byte: u8) -> bool {
    matches!(byte, 0x28 | 0x0D | 0x0A)
}

pub fn calculate(data: &[u8]) -> u16 {
    if data.is_empty() {
        return 0;
    }

    let mut crc: u16 = 0;
    for &byte in data {
        let b = byte as u16;
        crc = TABLE[((crc >> 12) ^ (b >> 4)) as usize] ^ (crc << 4);
        crc = TABLE[((crc >> 12) ^ (b & 0x0F)) as usize] ^ (crc << 4);
    }

    if is_reserved(crc as u8) {
        crc = crc.wrapping_add(1);
    }
    if is_reserved((crc >> 8) as u8) {
        crc = crc.wrapping_add(1 << 8);
    }

    crc
}

pub fn write(crc: u16, buf: &mut [u8]) {
    buf[..SIZE].copy_from_slice(&crc.to_be_bytes());
}

pub fn read(buf: &[u8]) -> u16 {
    u16::from_be_bytes([buf[0], buf[1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        assert_eq!(calculate(b""), 0);
        assert_eq!(calculate(b"123456789"), 0x31C3);
        assert_eq!(calculate(b"^P005PI"), 0x718B);
        assert_eq!(calculate(b"^S006F50"), 0x2C4C);
        assert_eq!(calculate(b"^1"), 0x0BC2);
        assert_eq!(calculate(b"^0"), 0x1BE3);
    }

    #[test]
    fn reserved_low_byte_is_escaped() {
        // raw checksums: 0x4828, 0xA20A, 0x480D
        assert_eq!(calculate(b"^P00025"), 0x4829);
        assert_eq!(calculate(b"^P00041"), 0xA20B);
        assert_eq!(calculate(b"^P00464"), 0x480E);
    }

    #[test]
    fn reserved_high_byte_is_escaped() {
        // raw checksums: 0x28EE, 0x0A09, 0x0D5A
        assert_eq!(calculate(b"^P00023"), 0x29EE);
        assert_eq!(calculate(b"^P00117"), 0x0B09);
        assert_eq!(calculate(b"^P00014"), 0x0E5A);
    }

    #[test]
    fn escaped_bytes_never_collide() {
        for n in 0..2000u32 {
            let input = format!("^P{:05}", n);
            let crc = calculate(input.as_bytes());
            assert!(!is_reserved(crc as u8), "{} -> {:#06x}", input, crc);
            assert!(!is_reserved((crc >> 8) as u8), "{} -> {:#06x}", input, crc);
        }
    }

    #[test]
    fn big_endian_storage() {
        let mut buf = [0u8; 2];
        write(0x718B, &mut buf);
        assert_eq!(buf, [0x71, 0x8B]);
        assert_eq!(read(&buf), 0x718B);
    }

    #[test]
    fn single_bit_changes_checksum() {
        let corpus: [&[u8]; 4] = [b"^P005GS", b"^P005PI", b"^P006MOD", b"^S007F60"];
        for input in corpus {
            let mut flipped = input.to_vec();
            flipped[3] ^= 0x01;
            assert_ne!(calculate(input), calculate(&flipped));
        }
    }
}
