// Message types
pub const MSG_TYPE_SET_CHUNK_SIZE: u8 = 1;
pub const MSG_TYPE_USER_CONTROL: u8 = 4;
pub const MSG_TYPE_WINDOW_ACK: u8 = 5;
pub const MSG_TYPE_SET_PEER_BW: u8 = 6;
pub const MSG_TYPE_COMMAND_AMF0: u8 = 20;

// User control event types
pub const EVENT_STREAM_BEGIN: u16 = 0;

// Chunk stream IDs
pub const CHUNK_STREAM_PROTOCOL: u32 = 2;
pub const CHUNK_STREAM_COMMAND: u32 = 3;

// Default values
pub const DEFAULT_CHUNK_SIZE: u32 = 128;
pub const DEFAULT_OUTGOING_CHUNK_SIZE: u32 = 4096;
pub const DEFAULT_WINDOW_ACK_SIZE: u32 = 5_000_000;
pub const DEFAULT_PEER_BANDWIDTH: u32 = 5_000_000;

// Set Peer Bandwidth limit types
pub const PEER_BW_LIMIT_DYNAMIC: u8 = 2;

// Single supported message stream (no stream id pool in this scope)
pub const DEFAULT_STREAM_ID: u32 = 1;
