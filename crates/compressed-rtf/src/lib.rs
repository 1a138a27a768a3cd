#![doc = include_str!("../README.md")]

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::{self, Cursor};
use thiserror::Error;

mod crc;
mod dictionary;

use dictionary::{Dictionary, Reference};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0:?}")]
    Io(#[from] io::Error),
    #[error("COMPSIZE mismatch: {0}")]
    CompressedSizeMismatch(u32),
    #[error("RAWSIZE exceeds input: {0}")]
    RawSizeMismatch(u32),
    #[error("COMPRESSED CRC mismatch: 0x{0:08X}")]
    CrcMismatch(u32),
    #[error("Invalid COMPTYPE: 0x{0:08X}")]
    InvalidCompressionType(u32),
}

pub type Result<T> = std::result::Result<T, Error>;

/// `COMPTYPE` magic: `LZFu`, the token-dictionary encoding.
const COMPRESSED: u32 = 0x75465A4C;
/// `COMPTYPE` magic: `MELA`, stored without compression.
const UNCOMPRESSED: u32 = 0x414C454D;

const HEADER_SIZE: usize = 16;

/// Decodes one MS-OXRTFCP stream into the contained RTF text. The 16-byte
/// header is validated first: `COMPSIZE` against the input length and, for
/// compressed input, the stored CRC against the payload.
pub fn decompress_rtf(data: &[u8]) -> Result<String> {
    if data.len() < HEADER_SIZE {
        return Err(Error::CompressedSizeMismatch(data.len() as u32));
    }
    let mut header = Cursor::new(&data[..HEADER_SIZE]);

    // COMPSIZE: counts everything after itself
    let compressed_size = header.read_u32::<LittleEndian>()?;
    if compressed_size as usize + size_of_val(&compressed_size) != data.len() {
        return Err(Error::CompressedSizeMismatch(compressed_size));
    }

    // RAWSIZE
    let raw_size = header.read_u32::<LittleEndian>()?;

    // COMPTYPE
    let compression_type = header.read_u32::<LittleEndian>()?;

    // CRC
    let crc = header.read_u32::<LittleEndian>()?;

    let payload = &data[HEADER_SIZE..];
    match compression_type {
        COMPRESSED => {
            if crc != crc::checksum(payload) {
                return Err(Error::CrcMismatch(crc));
            }
            let raw = decode_tokens(payload, raw_size as usize)?;
            Ok(into_text(&raw))
        }
        UNCOMPRESSED => {
            let raw = payload
                .get(..raw_size as usize)
                .ok_or(Error::RawSizeMismatch(raw_size))?;
            Ok(into_text(raw))
        }
        invalid => Err(Error::InvalidCompressionType(invalid)),
    }
}

/// Runs the token stream through the sliding dictionary: each control byte
/// covers eight items, a clear bit is a literal and a set bit a dictionary
/// reference. A reference at the dictionary's write position ends the
/// stream.
fn decode_tokens(payload: &[u8], raw_size: usize) -> Result<Vec<u8>> {
    let mut dictionary = Dictionary::default();
    let mut output = Vec::with_capacity(raw_size);

    let mut cursor = Cursor::new(payload);
    'tokens: while let Ok(control) = cursor.read_u8() {
        for bit in 0..8 {
            if control & (0x01 << bit) == 0 {
                let Ok(byte) = cursor.read_u8() else {
                    break 'tokens;
                };
                output.push(byte);
                dictionary.push(byte);
            } else {
                let reference = Reference(cursor.read_u16::<BigEndian>()?);
                let Some(mut run) = dictionary.run(reference) else {
                    break 'tokens;
                };
                output.append(&mut run);
            }
        }
    }

    Ok(output)
}

/// RTF is ASCII on the wire; stray high bytes pass through as Latin-1.
fn into_text(raw: &[u8]) -> String {
    let units: Vec<_> = raw.iter().copied().map(u16::from).collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    const COMPRESSED_SIMPLE_RTF: &[u8] = &[
        0x2d, 0x00, 0x00, 0x00, 0x2b, 0x00, 0x00, 0x00, 0x4c, 0x5a, 0x46, 0x75, 0xf1, 0xc5, 0xc7,
        0xa7, 0x03, 0x00, 0x0a, 0x00, 0x72, 0x63, 0x70, 0x67, 0x31, 0x32, 0x35, 0x42, 0x32, 0x0a,
        0xf3, 0x20, 0x68, 0x65, 0x6c, 0x09, 0x00, 0x20, 0x62, 0x77, 0x05, 0xb0, 0x6c, 0x64, 0x7d,
        0x0a, 0x80, 0x0f, 0xa0,
    ];

    const UNCOMPRESSED_SIMPLE_RTF: &str = "{\\rtf1\\ansi\\ansicpg1252\\pard hello world}\r\n";

    /// [Example 1: Simple Compressed RTF](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-oxrtfcp/029bff74-8c00-402e-ac2b-0210a5f57371)
    #[test]
    fn test_decompress_simple_rtf() {
        let rtf = decompress_rtf(COMPRESSED_SIMPLE_RTF).unwrap();
        assert_eq!(rtf, UNCOMPRESSED_SIMPLE_RTF);
    }

    const COMPRESSED_CROSSING_WRITE_RTF: &[u8] = &[
        0x1a, 0x00, 0x00, 0x00, 0x1c, 0x00, 0x00, 0x00, 0x4c, 0x5a, 0x46, 0x75, 0xe2, 0xd4, 0x4b,
        0x51, 0x41, 0x00, 0x04, 0x20, 0x57, 0x58, 0x59, 0x5a, 0x0d, 0x6e, 0x7d, 0x01, 0x0e, 0xb0,
    ];

    const UNCOMPRESSED_CROSSING_WRITE_RTF: &str = "{\\rtf1 WXYZWXYZWXYZWXYZWXYZ}";

    /// [Example 2: Reading a Token from the Dictionary that Crosses WritePosition](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-oxrtfcp/421a2da5-7752-4985-8981-0f19f1e5b687)
    #[test]
    fn test_decompress_crossing_write_rtf() {
        let rtf = decompress_rtf(COMPRESSED_CROSSING_WRITE_RTF).unwrap();
        assert_eq!(rtf, UNCOMPRESSED_CROSSING_WRITE_RTF);
    }

    #[test]
    fn test_uncompressed_passthrough() {
        let body = b"{\\rtf1 hi}";
        let mut data = Cursor::new(Vec::new());
        data.write_u32::<LittleEndian>(12 + body.len() as u32)
            .unwrap();
        data.write_u32::<LittleEndian>(body.len() as u32).unwrap();
        data.write_u32::<LittleEndian>(UNCOMPRESSED).unwrap();
        data.write_u32::<LittleEndian>(0).unwrap();
        data.write_all(body).unwrap();

        let rtf = decompress_rtf(&data.into_inner()).unwrap();
        assert_eq!(rtf, "{\\rtf1 hi}");
    }

    #[test]
    fn test_short_input_is_rejected() {
        let Err(Error::CompressedSizeMismatch(4)) = decompress_rtf(&[0, 0, 0, 0]) else {
            panic!("a truncated header should be rejected");
        };
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let mut data = COMPRESSED_SIMPLE_RTF.to_vec();
        data.push(0);
        let Err(Error::CompressedSizeMismatch(_)) = decompress_rtf(&data) else {
            panic!("COMPSIZE must cover the whole input");
        };
    }

    #[test]
    fn test_crc_mismatch_is_rejected() {
        let mut data = COMPRESSED_SIMPLE_RTF.to_vec();
        // Flip one payload byte without touching the stored CRC.
        data[20] ^= 0xFF;
        let Err(Error::CrcMismatch(_)) = decompress_rtf(&data) else {
            panic!("corrupted payload should fail the CRC check");
        };
    }

    #[test]
    fn test_invalid_comptype_is_rejected() {
        let mut data = COMPRESSED_SIMPLE_RTF.to_vec();
        data[8..12].copy_from_slice(&[1, 2, 3, 4]);
        let Err(Error::InvalidCompressionType(_)) = decompress_rtf(&data) else {
            panic!("an unknown COMPTYPE should be rejected");
        };
    }
}
