// Length-delimited message framing over TCP.
//
// Wire format: a 4-byte big-endian length prefix followed by a JSON payload
// of exactly that many bytes. `write_message` and `read_message` move raw
// frames; `send` and `recv` add the serde_json step on top and classify
// failures into `ProtocolError`.
//
// A `MAX_MESSAGE_SIZE` constant (64 KiB) protects against unbounded allocation
// from malformed or malicious length prefixes. The largest real message is a
// `winner` with a full board, well under 1 KiB; chat text is the only
// user-sized field.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ProtocolError;

/// Maximum allowed frame payload (64 KiB).
pub const MAX_MESSAGE_SIZE: u32 = 64 * 1024;

/// Write a length-delimited message: 4-byte big-endian length, then payload.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = match u32::try_from(msg.len()) {
        Ok(len) if len <= MAX_MESSAGE_SIZE => len,
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "message too large: {} bytes (max {MAX_MESSAGE_SIZE})",
                    msg.len()
                ),
            ));
        }
    };
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(msg)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-delimited message: 4-byte big-endian length, then payload.
///
/// Returns `UnexpectedEof` if the stream closes before or during a message.
/// Returns `InvalidData` if the length exceeds `MAX_MESSAGE_SIZE`.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` to a JSON payload that fits in one frame.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(msg).map_err(ProtocolError::Encode)?;
    if json.len() > MAX_MESSAGE_SIZE as usize {
        return Err(ProtocolError::TooLarge { len: json.len() });
    }
    Ok(json)
}

/// Serialize `msg` to JSON and write it as one frame. Nothing is written
/// unless encoding succeeds.
pub fn send<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), ProtocolError> {
    let json = encode(msg)?;
    write_message(writer, &json)?;
    Ok(())
}

/// Read one frame and decode it. A decode failure consumes the frame, so the
/// caller may keep reading.
pub fn recv<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, ProtocolError> {
    let bytes = read_message(reader)?;
    serde_json::from_slice(&bytes).map_err(ProtocolError::Decode)
}
