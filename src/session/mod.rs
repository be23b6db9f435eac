mod control;
mod session;

pub use control::*;
pub use session::*;
