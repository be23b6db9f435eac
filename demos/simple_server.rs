// Minimal RTMP endpoint
//
// Accepts connections, performs the handshake and answers the
// connect/createStream/publish setup sequence.
//
// Usage:
//   cargo run --example simple_server

use log::info;
use rtmp::{Result, RtmpServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = ServerConfig::builder()
        .host("0.0.0.0")
        .port(1935)
        .max_connections(100)
        .chunk_size(4096)
        .build()?;

    info!("Starting RTMP endpoint on {}:{}", config.host, config.port);

    let server = RtmpServer::new(config);
    server.listen().await
}
