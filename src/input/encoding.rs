// src/input/encoding.rs

use std::io::{self, Read, Write};

/// Width of the length prefix shared by the input record format and the
/// spill files: a 4-byte big-endian length followed by that many bytes.
pub const LENGTH_PREFIX: usize = 4;

/// Read one length-prefixed chunk out of `buffer` starting at `offset`.
/// Returns the chunk and the offset just past it, or `None` when the buffer
/// is too short for either the prefix or the payload.
pub fn read_chunk(buffer: &[u8], offset: usize) -> Option<(&[u8], usize)> {
    let prefix = buffer.get(offset..offset + LENGTH_PREFIX)?;
    let length = u32::from_be_bytes(prefix.try_into().ok()?) as usize;
    let start = offset + LENGTH_PREFIX;
    let end = start.checked_add(length)?;
    let chunk = buffer.get(start..end)?;
    Some((chunk, end))
}

/// Append one length-prefixed frame to a stream.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let length = payload.len() as u32;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(payload)
}

/// Read the next frame from a stream. `Ok(None)` on EOF at a frame boundary.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; LENGTH_PREFIX];
    match reader.read_exact(&mut prefix) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let length = u32::from_be_bytes(prefix) as usize;
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}
