//! [CRC](https://learn.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-oxrtfcp/e275d55d-a64a-4b37-82b8-8cbe36f8b9a4)
//!
//! The standard reflected CRC-32 table, but with zero initial value and no
//! final complement.

const fn build_table() -> [u32; 256] {
    let mut table = [0_u32; 256];
    let mut index = 0;
    while index < 256 {
        let mut value = index as u32;
        let mut round = 0;
        while round < 8 {
            value = if value & 1 != 0 {
                0xEDB88320 ^ (value >> 1)
            } else {
                value >> 1
            };
            round += 1;
        }
        table[index] = value;
        index += 1;
    }
    table
}

const CRC_TABLE: [u32; 256] = build_table();

pub fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(0, |crc, &byte| {
        CRC_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8)
    })
}
