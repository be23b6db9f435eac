use std::collections::HashMap;
use log::{debug, trace};

use crate::{Error, Result};
use crate::chunk::context::ChunkStreamContext;
use crate::protocol::{RtmpHeader, RtmpPacket, DEFAULT_CHUNK_SIZE, MSG_TYPE_SET_CHUNK_SIZE};

/// Escape value in the 3-byte timestamp field selecting the extended form
const EXTENDED_TIMESTAMP: u32 = 0xFFFFFF;

/// Turns an unaligned inbound byte stream into complete application
/// messages, one context per chunk-stream id.
///
/// Bytes that end mid-chunk are staged until the next read delivers the
/// rest, so parsing is invariant to how the stream is sliced into reads:
/// no byte is ever skipped or consumed twice.
pub struct ChunkDemultiplexer {
    /// Chunk stream contexts by csid
    streams: HashMap<u8, ChunkStreamContext>,

    /// Current chunk size for reading
    chunk_size_in: usize,

    /// Staged bytes carried across reads
    pending: Vec<u8>,
}

impl ChunkDemultiplexer {
    pub fn new() -> Self {
        ChunkDemultiplexer {
            streams: HashMap::new(),
            chunk_size_in: DEFAULT_CHUNK_SIZE as usize,
            pending: Vec::with_capacity(4096),
        }
    }

    /// Current incoming chunk size
    pub fn incoming_chunk_size(&self) -> usize {
        self.chunk_size_in
    }

    /// Set incoming chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size_in = size;
    }

    /// Consume one socket read's worth of bytes and return every message
    /// it completes, in arrival order.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<RtmpPacket>> {
        self.pending.extend_from_slice(data);

        let mut completed = Vec::new();
        let mut offset = 0;

        loop {
            match self.parse_chunk(offset)? {
                Some((consumed, packet)) => {
                    offset += consumed;
                    if let Some(packet) = packet {
                        // Apply Set Chunk Size here so chunks later in this
                        // same read already parse at the new size.
                        if packet.message_type() == MSG_TYPE_SET_CHUNK_SIZE
                            && packet.payload.len() >= 4
                        {
                            let size = u32::from_be_bytes([
                                packet.payload[0],
                                packet.payload[1],
                                packet.payload[2],
                                packet.payload[3],
                            ]);
                            // Zero would make every chunk carry no payload;
                            // the top bit is reserved by the wire format.
                            if size == 0 || size & 0x8000_0000 != 0 {
                                return Err(Error::protocol(format!(
                                    "Unusable chunk size {} from peer",
                                    size
                                )));
                            }
                            debug!("Peer set incoming chunk size to {}", size);
                            self.chunk_size_in = size as usize;
                        }
                        completed.push(packet);
                    }
                }
                None => break,
            }
        }

        self.pending.drain(..offset);
        Ok(completed)
    }

    /// Try to parse one whole chunk starting at `offset` in the staging
    /// buffer. Returns the bytes consumed plus the message it completed,
    /// or None when the chunk is still truncated by the read boundary.
    fn parse_chunk(&mut self, offset: usize) -> Result<Option<(usize, Option<RtmpPacket>)>> {
        let buf = &self.pending[offset..];
        if buf.is_empty() {
            return Ok(None);
        }

        let basic = buf[0];
        let fmt = basic >> 6;
        let csid = basic & 0x3F;

        // 0 and 1 select the multi-byte csid forms, which this scope does
        // not carry.
        if csid < 2 {
            return Err(Error::protocol(format!(
                "Extended chunk stream id form (low bits {}) not supported",
                csid
            )));
        }

        let header_len: usize = match fmt {
            0 => 11,
            1 => 7,
            2 => 3,
            _ => 0,
        };
        if buf.len() < 1 + header_len {
            return Ok(None);
        }

        // fmt 0-2 carry a 3-byte timestamp field; 0xFFFFFF pushes the real
        // value into 4 extra bytes after the header.
        let mut ext_len = 0usize;
        let mut ts_field = 0u32;
        if header_len >= 3 {
            ts_field = read_u24(&buf[1..4]);
            if ts_field == EXTENDED_TIMESTAMP {
                ext_len = 4;
                if buf.len() < 1 + header_len + ext_len {
                    return Ok(None);
                }
            }
        }

        if fmt != 0 {
            let ready = self
                .streams
                .get(&csid)
                .map(|ctx| ctx.is_initialized())
                .unwrap_or(false);
            if !ready {
                return Err(Error::chunk(format!(
                    "fmt {} chunk on csid {} with no prior full header",
                    fmt, csid
                )));
            }
        }

        let context = self.streams.entry(csid).or_default();

        // The effective message length decides how much payload this chunk
        // carries; fmt 0/1 declare a new one, fmt 2/3 inherit.
        let message_length = match fmt {
            0 | 1 => read_u24(&buf[4..7]),
            _ => context.message_length,
        };
        let remaining = (message_length as usize).saturating_sub(context.payload_len());
        let chunk_payload = remaining.min(self.chunk_size_in);
        let body_start = 1 + header_len + ext_len;
        if buf.len() < body_start + chunk_payload {
            return Ok(None);
        }

        // The whole chunk is present. Only now touch the context: a chunk
        // truncated by the read boundary is re-parsed from scratch on the
        // next push, and a timestamp delta applied early would be added
        // again then.
        match fmt {
            0 => {
                let timestamp = if ext_len > 0 {
                    read_u32(&buf[12..16])
                } else {
                    ts_field
                };
                let message_type_id = buf[7];
                // Stream id is the one little-endian field in the header
                let message_stream_id =
                    u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
                context.apply_full_header(
                    timestamp,
                    message_length,
                    message_type_id,
                    message_stream_id,
                );
            }
            1 => {
                let delta = if ext_len > 0 { read_u32(&buf[8..12]) } else { ts_field };
                context.apply_medium_header(delta, message_length, buf[7]);
            }
            2 => {
                let delta = if ext_len > 0 { read_u32(&buf[4..8]) } else { ts_field };
                context.apply_short_header(delta);
            }
            _ => {} // fmt 3: everything inherited
        }

        context.append_payload(&buf[body_start..body_start + chunk_payload])?;
        trace!(
            "csid {}: fmt {} chunk, {} payload bytes, {} remaining",
            csid,
            fmt,
            chunk_payload,
            context.bytes_remaining()
        );

        let packet = if context.is_complete() {
            let header = RtmpHeader::new(
                context.timestamp,
                context.message_length,
                context.message_type_id,
                context.message_stream_id,
                csid as u32,
            );
            Some(RtmpPacket::new(header, context.take_payload()))
        } else {
            None
        };

        Ok(Some((body_start + chunk_payload, packet)))
    }
}

impl Default for ChunkDemultiplexer {
    fn default() -> Self {
        ChunkDemultiplexer::new()
    }
}

fn read_u24(bytes: &[u8]) -> u32 {
    ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32)
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MSG_TYPE_COMMAND_AMF0;

    fn full_header_chunk(csid: u8, length: u32, type_id: u8, stream_id: u32, body: &[u8]) -> Vec<u8> {
        let mut chunk = vec![csid & 0x3F];
        chunk.extend_from_slice(&[0, 0, 0]); // timestamp
        chunk.extend_from_slice(&[(length >> 16) as u8, (length >> 8) as u8, length as u8]);
        chunk.push(type_id);
        chunk.extend_from_slice(&stream_id.to_le_bytes());
        chunk.extend_from_slice(body);
        chunk
    }

    #[test]
    fn test_single_chunk_message() {
        let mut demux = ChunkDemultiplexer::new();
        let body = [1u8, 2, 3, 4, 5];
        let chunk = full_header_chunk(3, 5, MSG_TYPE_COMMAND_AMF0, 7, &body);

        let messages = demux.push(&chunk).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload, body);
        assert_eq!(messages[0].message_type(), MSG_TYPE_COMMAND_AMF0);
        assert_eq!(messages[0].message_stream_id(), 7);
        assert_eq!(messages[0].header.chunk_stream_id, 3);
    }

    #[test]
    fn test_multi_chunk_reassembly_with_fmt3() {
        let mut demux = ChunkDemultiplexer::new();
        let payload: Vec<u8> = (0..200u32).map(|i| i as u8).collect();

        // 200-byte message at the default 128-byte chunk size: a full
        // header chunk then a fmt=3 continuation.
        let mut wire = full_header_chunk(3, 200, 9, 1, &payload[..128]);
        wire.push(0xC0 | 3);
        wire.extend_from_slice(&payload[128..]);

        let messages = demux.push(&wire).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload, payload);
    }

    #[test]
    fn test_slicing_invariance() {
        let payload: Vec<u8> = (0..300u32).map(|i| (i * 7) as u8).collect();
        let mut wire = full_header_chunk(4, 300, 9, 1, &payload[..128]);
        wire.push(0xC0 | 4);
        wire.extend_from_slice(&payload[128..256]);
        wire.push(0xC0 | 4);
        wire.extend_from_slice(&payload[256..]);

        // Every read-boundary split must reassemble identically,
        // including splits inside headers.
        for step in [1usize, 3, 7, 10, 128, wire.len()] {
            let mut demux = ChunkDemultiplexer::new();
            let mut messages = Vec::new();
            for piece in wire.chunks(step) {
                messages.extend(demux.push(piece).unwrap());
            }
            assert_eq!(messages.len(), 1, "step {}", step);
            assert_eq!(messages[0].payload, payload, "step {}", step);
        }
    }

    #[test]
    fn test_header_inheritance_across_messages() {
        let mut demux = ChunkDemultiplexer::new();
        let first = full_header_chunk(3, 100, 9, 5, &[0xAA; 100]);
        demux.push(&first).unwrap();

        // fmt=3 chunk reuses length, type and stream id for a new message
        let mut second = vec![0xC0 | 3];
        second.extend_from_slice(&[0xBB; 100]);

        let messages = demux.push(&second).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].header.message_length, 100);
        assert_eq!(messages[0].message_type(), 9);
        assert_eq!(messages[0].message_stream_id(), 5);
        assert_eq!(messages[0].payload, vec![0xBB; 100]);
    }

    #[test]
    fn test_set_chunk_size_applies_within_one_read() {
        let mut demux = ChunkDemultiplexer::new();

        // Set Chunk Size to 4096, then a 1000-byte message in one chunk.
        // The second chunk only parses if the new size is already live.
        let mut wire = full_header_chunk(2, 4, MSG_TYPE_SET_CHUNK_SIZE, 0, &[0x00, 0x00, 0x10, 0x00]);
        let payload = vec![0x55u8; 1000];
        wire.extend_from_slice(&full_header_chunk(3, 1000, 9, 1, &payload));

        let messages = demux.push(&wire).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(demux.incoming_chunk_size(), 4096);
        assert_eq!(messages[1].payload, payload);
    }

    #[test]
    fn test_timestamp_delta_applied_once_across_split_reads() {
        // fmt=2 chunk carrying a 10ms delta after a fmt=0 message at
        // timestamp 0. However the read boundary cuts the chunk, the
        // delta must land exactly once.
        let mut follow_up = vec![0x80 | 3];
        follow_up.extend_from_slice(&[0, 0, 10]); // delta
        follow_up.extend_from_slice(&[7, 8, 9]);

        for split in 1..follow_up.len() {
            let mut demux = ChunkDemultiplexer::new();
            demux.push(&full_header_chunk(3, 3, 9, 1, &[1, 2, 3])).unwrap();

            let mut messages = demux.push(&follow_up[..split]).unwrap();
            messages.extend(demux.push(&follow_up[split..]).unwrap());
            assert_eq!(messages.len(), 1, "split {}", split);
            assert_eq!(messages[0].timestamp(), 10, "split {}", split);
        }
    }

    #[test]
    fn test_zero_and_reserved_chunk_sizes_rejected() {
        let mut demux = ChunkDemultiplexer::new();
        let wire = full_header_chunk(2, 4, MSG_TYPE_SET_CHUNK_SIZE, 0, &[0, 0, 0, 0]);
        assert!(demux.push(&wire).is_err());

        let mut demux = ChunkDemultiplexer::new();
        let wire = full_header_chunk(2, 4, MSG_TYPE_SET_CHUNK_SIZE, 0, &[0x80, 0, 0x10, 0]);
        assert!(demux.push(&wire).is_err());
    }

    #[test]
    fn test_compact_header_without_history_is_error() {
        let mut demux = ChunkDemultiplexer::new();
        let wire = vec![0xC0 | 5]; // fmt=3 on a never-seen csid
        assert!(demux.push(&wire).is_err());
    }

    #[test]
    fn test_extended_csid_forms_rejected() {
        let mut demux = ChunkDemultiplexer::new();
        assert!(demux.push(&[0x00]).is_err());
        let mut demux = ChunkDemultiplexer::new();
        assert!(demux.push(&[0x01]).is_err());
    }

    #[test]
    fn test_fmt1_and_fmt2_updates() {
        let mut demux = ChunkDemultiplexer::new();
        demux.push(&full_header_chunk(3, 2, 9, 6, &[1, 2])).unwrap();

        // fmt=1: new length and type, stream id inherited
        let mut wire = vec![0x40 | 3];
        wire.extend_from_slice(&[0, 0, 10]); // delta
        wire.extend_from_slice(&[0, 0, 3]); // length
        wire.push(8);
        wire.extend_from_slice(&[7, 8, 9]);
        let messages = demux.push(&wire).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type(), 8);
        assert_eq!(messages[0].message_stream_id(), 6);
        assert_eq!(messages[0].timestamp(), 10);

        // fmt=2: only a timestamp delta, rest inherited
        let mut wire = vec![0x80 | 3];
        wire.extend_from_slice(&[0, 0, 5]);
        wire.extend_from_slice(&[4, 5, 6]);
        let messages = demux.push(&wire).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type(), 8);
        assert_eq!(messages[0].header.message_length, 3);
        assert_eq!(messages[0].timestamp(), 15);
    }
}
