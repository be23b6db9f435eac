mod config;
mod server;

pub use config::*;
pub use server::*;
