use crate::protocol::constants::*;

/// Reassembled application message together with its chunk routing.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpPacket {
    pub header: RtmpHeader,
    pub payload: Vec<u8>,
}

impl RtmpPacket {
    /// Create new packet
    pub fn new(header: RtmpHeader, payload: Vec<u8>) -> Self {
        RtmpPacket { header, payload }
    }

    /// Get message type
    pub fn message_type(&self) -> u8 {
        self.header.message_type
    }

    /// Get message stream ID
    pub fn message_stream_id(&self) -> u32 {
        self.header.message_stream_id
    }

    /// Get timestamp
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Check if this is a command message
    pub fn is_command(&self) -> bool {
        self.header.message_type == MSG_TYPE_COMMAND_AMF0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpHeader {
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type: u8,
    pub message_stream_id: u32,
    pub chunk_stream_id: u32,
}

impl RtmpHeader {
    /// Create new header
    pub fn new(
        timestamp: u32,
        message_length: u32,
        message_type: u8,
        message_stream_id: u32,
        chunk_stream_id: u32,
    ) -> Self {
        RtmpHeader {
            timestamp,
            message_length,
            message_type,
            message_stream_id,
            chunk_stream_id,
        }
    }

    /// Create header for a protocol control message (csid 2, stream 0)
    pub fn control(message_type: u8, length: u32) -> Self {
        RtmpHeader::new(0, length, message_type, 0, CHUNK_STREAM_PROTOCOL)
    }

    /// Create header for a command message
    pub fn command(length: u32, stream_id: u32, chunk_stream_id: u32) -> Self {
        RtmpHeader::new(0, length, MSG_TYPE_COMMAND_AMF0, stream_id, chunk_stream_id)
    }

    /// Check if timestamp needs the extended form (>= 0xFFFFFF)
    pub fn has_extended_timestamp(&self) -> bool {
        self.timestamp >= 0xFFFFFF
    }

    /// Get timestamp field value for the wire
    pub fn wire_timestamp(&self) -> u32 {
        if self.has_extended_timestamp() {
            0xFFFFFF
        } else {
            self.timestamp
        }
    }
}

/// Dispatch routing for a completed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    SetChunkSize,
    UserControl,
    WindowAckSize,
    SetPeerBandwidth,
    Command,
    Unknown(u8),
}

impl MessageType {
    /// Create from message type ID
    pub fn from_id(id: u8) -> Self {
        match id {
            MSG_TYPE_SET_CHUNK_SIZE => MessageType::SetChunkSize,
            MSG_TYPE_USER_CONTROL => MessageType::UserControl,
            MSG_TYPE_WINDOW_ACK => MessageType::WindowAckSize,
            MSG_TYPE_SET_PEER_BW => MessageType::SetPeerBandwidth,
            MSG_TYPE_COMMAND_AMF0 => MessageType::Command,
            _ => MessageType::Unknown(id),
        }
    }
}
