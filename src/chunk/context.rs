use crate::{Error, Result};

/// Cached header state and in-progress payload for one chunk stream.
///
/// Created lazily when a csid is first seen and kept for the connection's
/// whole lifetime: compact header formats inherit the last fully-specified
/// value of each field indefinitely, not just for one message.
#[derive(Debug, Clone)]
pub struct ChunkStreamContext {
    /// Absolute timestamp of the message being assembled
    pub timestamp: u32,

    /// Declared payload size of the message being assembled
    pub message_length: u32,

    /// Application message type
    pub message_type_id: u8,

    /// Logical stream the message belongs to
    pub message_stream_id: u32,

    /// Bytes accumulated so far; never exceeds message_length
    payload: Vec<u8>,

    /// Whether a fmt=0 header has ever populated this context
    initialized: bool,
}

impl ChunkStreamContext {
    pub fn new() -> Self {
        ChunkStreamContext {
            timestamp: 0,
            message_length: 0,
            message_type_id: 0,
            message_stream_id: 0,
            payload: Vec::new(),
            initialized: false,
        }
    }

    /// Whether compact header formats may inherit from this context
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Apply a fmt=0 header: all four fields overwritten
    pub fn apply_full_header(
        &mut self,
        timestamp: u32,
        message_length: u32,
        message_type_id: u8,
        message_stream_id: u32,
    ) {
        self.timestamp = timestamp;
        self.message_length = message_length;
        self.message_type_id = message_type_id;
        self.message_stream_id = message_stream_id;
        self.initialized = true;
    }

    /// Apply a fmt=1 header: stream id inherited
    pub fn apply_medium_header(&mut self, timestamp_delta: u32, message_length: u32, message_type_id: u8) {
        self.timestamp = self.timestamp.wrapping_add(timestamp_delta);
        self.message_length = message_length;
        self.message_type_id = message_type_id;
    }

    /// Apply a fmt=2 header: length, type and stream id inherited
    pub fn apply_short_header(&mut self, timestamp_delta: u32) {
        self.timestamp = self.timestamp.wrapping_add(timestamp_delta);
    }

    /// Payload bytes accumulated so far
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Payload bytes still missing for the current message
    pub fn bytes_remaining(&self) -> usize {
        (self.message_length as usize).saturating_sub(self.payload.len())
    }

    /// Append one chunk's worth of payload bytes
    pub fn append_payload(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.bytes_remaining() {
            return Err(Error::chunk(format!(
                "Payload overrun: {} bytes appended with {} remaining",
                data.len(),
                self.bytes_remaining()
            )));
        }
        self.payload.extend_from_slice(data);
        Ok(())
    }

    /// Whether the declared message length has been fully accumulated
    pub fn is_complete(&self) -> bool {
        self.payload.len() == self.message_length as usize
    }

    /// Hand out the completed payload and clear the accumulator. Header
    /// fields stay cached for the next chunk of this csid.
    pub fn take_payload(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.payload)
    }
}

impl Default for ChunkStreamContext {
    fn default() -> Self {
        ChunkStreamContext::new()
    }
}
