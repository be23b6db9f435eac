mod context;
mod demux;
mod framer;

pub use context::*;
pub use demux::*;
pub use framer::*;
