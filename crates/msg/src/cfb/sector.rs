//! Raw sector access for the big-block and mini-stream addressing schemes.

use std::io::{self, Read, Seek, SeekFrom};

use super::{header::Header, CfbError};

/// Byte offset of a big sector: the header occupies the first sector-sized
/// block, so sector 0 starts one block in.
fn sector_offset(header: &Header, index: u32) -> u64 {
    (u64::from(index) + 1) << header.sector_shift()
}

/// Concatenates the contents of the given big sectors, truncated to `size`
/// bytes when a byte budget is given (chain tails are padded to a full
/// sector on disk).
pub fn read_big<R: Read + Seek>(
    f: &mut R,
    header: &Header,
    chain: &[u32],
    size: Option<usize>,
) -> io::Result<Vec<u8>> {
    let sector_size = header.sector_size();
    let mut data = Vec::with_capacity(size.unwrap_or(chain.len() * sector_size));
    let mut sector = vec![0_u8; sector_size];
    for &index in chain {
        f.seek(SeekFrom::Start(sector_offset(header, index)))?;
        f.read_exact(&mut sector)?;
        data.extend_from_slice(&sector);
    }
    if let Some(size) = size {
        data.truncate(size);
    }
    Ok(data)
}

/// Concatenates the contents of the given mini sectors. Mini sectors are
/// packed inside the root entry's own big-sector chain (`mini_stream`): a
/// mini-sector index maps to a byte offset in that stream, and the
/// containing big sector comes from the resolved root chain.
pub fn read_small<R: Read + Seek>(
    f: &mut R,
    header: &Header,
    mini_stream: &[u32],
    chain: &[u32],
    size: Option<usize>,
) -> io::Result<Vec<u8>> {
    let sector_size = header.sector_size() as u64;
    let mini_sector_size = header.mini_sector_size();
    let mut data = Vec::with_capacity(size.unwrap_or(chain.len() * mini_sector_size));
    let mut sector = vec![0_u8; mini_sector_size];
    for &index in chain {
        let byte_offset = u64::from(index) << header.mini_sector_shift();
        let containing = usize::try_from(byte_offset / sector_size)
            .ok()
            .and_then(|i| mini_stream.get(i).copied())
            .ok_or(CfbError::SectorIndexOutOfRange(index))?;
        let offset = sector_offset(header, containing) + byte_offset % sector_size;
        f.seek(SeekFrom::Start(offset))?;
        f.read_exact(&mut sector)?;
        data.extend_from_slice(&sector);
    }
    if let Some(size) = size {
        data.truncate(size);
    }
    Ok(data)
}
