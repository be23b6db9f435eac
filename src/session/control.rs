use crate::Result;
use crate::protocol::{
    Command, RtmpHeader, RtmpPacket, MSG_TYPE_SET_CHUNK_SIZE, MSG_TYPE_SET_PEER_BW,
    MSG_TYPE_USER_CONTROL, MSG_TYPE_WINDOW_ACK,
};

/// Window Acknowledgement Size control message (type 5)
pub fn window_ack_size_packet(size: u32) -> RtmpPacket {
    let payload = size.to_be_bytes().to_vec();
    let header = RtmpHeader::control(MSG_TYPE_WINDOW_ACK, payload.len() as u32);
    RtmpPacket::new(header, payload)
}

/// Set Peer Bandwidth control message (type 6)
pub fn set_peer_bandwidth_packet(size: u32, limit_type: u8) -> RtmpPacket {
    let mut payload = size.to_be_bytes().to_vec();
    payload.push(limit_type);
    let header = RtmpHeader::control(MSG_TYPE_SET_PEER_BW, payload.len() as u32);
    RtmpPacket::new(header, payload)
}

/// Set Chunk Size control message (type 1)
pub fn set_chunk_size_packet(size: u32) -> RtmpPacket {
    let payload = size.to_be_bytes().to_vec();
    let header = RtmpHeader::control(MSG_TYPE_SET_CHUNK_SIZE, payload.len() as u32);
    RtmpPacket::new(header, payload)
}

/// User Control message (type 4): 2-byte event type + 4-byte value
pub fn user_control_packet(event_type: u16, value: u32) -> RtmpPacket {
    let mut payload = event_type.to_be_bytes().to_vec();
    payload.extend_from_slice(&value.to_be_bytes());
    let header = RtmpHeader::control(MSG_TYPE_USER_CONTROL, payload.len() as u32);
    RtmpPacket::new(header, payload)
}

/// Frame a command reply on a given message stream and chunk stream
pub fn command_packet(command: &Command, stream_id: u32, chunk_stream_id: u32) -> Result<RtmpPacket> {
    let payload = command.encode()?;
    let header = RtmpHeader::command(payload.len() as u32, stream_id, chunk_stream_id);
    Ok(RtmpPacket::new(header, payload))
}
