mod command;
mod packet;
pub mod constants;

pub use command::*;
pub use packet::*;
pub use constants::*;
