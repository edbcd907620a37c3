use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest encoding of a 32-bit value.
pub const MAX_VARINT_BYTES: usize = 5;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("varint runs past {MAX_VARINT_BYTES} bytes")]
    MalformedVarInt,
    #[error("connection closed before varint terminated")]
    ConnectionClosed,
    #[error("i/o error while reading varint: {0}")]
    Io(#[source] std::io::Error),
}

pub fn write_varint(buffer: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        buffer.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buffer.push(value as u8);
}

pub fn encode(value: u32) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(MAX_VARINT_BYTES);
    write_varint(&mut buffer, value);
    buffer
}

/// Reads one varint a byte at a time.
pub async fn read_varint<R>(reader: &mut R) -> Result<u32, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut result = 0u32;
    for index in 0..MAX_VARINT_BYTES {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ProtocolError::ConnectionClosed)
            }
            Err(e) => return Err(ProtocolError::Io(e)),
        };
        result |= ((byte & 0x7F) as u32) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(ProtocolError::MalformedVarInt)
}
