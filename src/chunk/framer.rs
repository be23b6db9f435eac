use crate::{ByteBuffer, Error, Result};
use crate::protocol::{RtmpPacket, DEFAULT_OUTGOING_CHUNK_SIZE};

/// Encodes outgoing messages into wire chunks.
///
/// Every message starts with a full fmt=0 header (no outgoing header
/// compression); payloads larger than the negotiated chunk size are split,
/// each continuation prefixed with a fmt=3 basic header for the same csid.
pub struct ChunkFramer {
    /// Current chunk size for writing
    chunk_size_out: usize,
}

impl ChunkFramer {
    pub fn new() -> Self {
        ChunkFramer {
            chunk_size_out: DEFAULT_OUTGOING_CHUNK_SIZE as usize,
        }
    }

    /// Current outgoing chunk size
    pub fn outgoing_chunk_size(&self) -> usize {
        self.chunk_size_out
    }

    /// Set outgoing chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size_out = size;
    }

    /// Frame one message into its wire bytes
    pub fn frame(&self, packet: &RtmpPacket) -> Result<Vec<u8>> {
        let csid = packet.header.chunk_stream_id;
        if !(2..=63).contains(&csid) {
            return Err(Error::chunk(format!(
                "Outgoing csid {} outside the single-byte basic header range",
                csid
            )));
        }

        let payload = &packet.payload;
        let mut out = ByteBuffer::with_capacity(16 + payload.len() + payload.len() / self.chunk_size_out);

        // Basic header, fmt=0
        out.write_u8(csid as u8)?;

        // Message header: timestamp, length, type, little-endian stream id
        out.write_u24_be(packet.header.wire_timestamp())?;
        out.write_u24_be(payload.len() as u32)?;
        out.write_u8(packet.header.message_type)?;
        out.write_u32_le(packet.header.message_stream_id)?;
        if packet.header.has_extended_timestamp() {
            out.write_u32_be(packet.header.timestamp)?;
        }

        // First fragment, then fmt=3 continuations
        let first = payload.len().min(self.chunk_size_out);
        out.write_bytes(&payload[..first])?;

        let mut offset = first;
        while offset < payload.len() {
            out.write_u8(0xC0 | csid as u8)?;
            let end = (offset + self.chunk_size_out).min(payload.len());
            out.write_bytes(&payload[offset..end])?;
            offset = end;
        }

        Ok(out.to_vec())
    }
}

impl Default for ChunkFramer {
    fn default() -> Self {
        ChunkFramer::new()
    }
}
