mod exchange;
mod state;

pub use exchange::*;
pub use state::*;
