mod utils;
mod amf;
mod protocol;
mod handshake;
mod chunk;
mod session;
mod server;

// Re-export commonly used types at crate root
pub use utils::*;
pub use amf::*;
pub use protocol::*;
pub use handshake::*;
pub use chunk::*;
pub use session::*;
pub use server::{RtmpServer, ServerConfig, ServerConfigBuilder};
