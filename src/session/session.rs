use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};
use crate::chunk::{ChunkDemultiplexer, ChunkFramer};
use crate::handshake::{perform_server, HandshakePhase};
use crate::protocol::{
    Command, MessageType, RtmpPacket, DEFAULT_OUTGOING_CHUNK_SIZE,
    DEFAULT_PEER_BANDWIDTH, DEFAULT_STREAM_ID, DEFAULT_WINDOW_ACK_SIZE, EVENT_STREAM_BEGIN,
    PEER_BW_LIMIT_DYNAMIC,
};
use crate::session::control::{
    command_packet, set_chunk_size_packet, set_peer_bandwidth_packet, user_control_packet,
    window_ack_size_packet,
};

/// Per-session knobs advertised during the connect sequence.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub window_ack_size: u32,
    pub peer_bandwidth: u32,
    pub outgoing_chunk_size: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            window_ack_size: DEFAULT_WINDOW_ACK_SIZE,
            peer_bandwidth: DEFAULT_PEER_BANDWIDTH,
            outgoing_chunk_size: DEFAULT_OUTGOING_CHUNK_SIZE,
        }
    }
}

/// One connection's protocol engine.
///
/// Owns the socket for its whole lifetime and sequences handshake, read
/// loop, dispatch and replies as a single logical task; nothing is shared
/// between sessions.
pub struct Session<S> {
    /// Session ID (for logging)
    id: String,

    /// The connection's byte stream
    stream: S,

    /// Handshake progress
    phase: HandshakePhase,

    /// Inbound chunk reassembly (owns the context table and the incoming
    /// chunk size)
    demux: ChunkDemultiplexer,

    /// Outbound chunk encoding
    framer: ChunkFramer,

    /// Advertised settings
    settings: SessionSettings,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(id: String, stream: S) -> Self {
        Session::with_settings(id, stream, SessionSettings::default())
    }

    pub fn with_settings(id: String, stream: S, settings: SessionSettings) -> Self {
        Session {
            id,
            stream,
            phase: HandshakePhase::new(),
            demux: ChunkDemultiplexer::new(),
            framer: ChunkFramer::new(),
            settings,
        }
    }

    /// Drive the session to completion: handshake, then the chunk read
    /// loop until the peer closes or a read fails.
    pub async fn run(mut self) -> Result<()> {
        info!("Session {}: starting handshake", self.id);
        perform_server(&mut self.stream, &mut self.phase).await?;
        info!("Session {}: handshake complete", self.id);

        let mut buf = [0u8; 8192];
        loop {
            let n = self
                .stream
                .read(&mut buf)
                .await
                .map_err(|e| Error::connection(format!("Read error: {}", e)))?;
            if n == 0 {
                info!("Session {}: peer closed connection", self.id);
                return Ok(());
            }

            let messages = self.demux.push(&buf[..n])?;
            for message in messages {
                self.dispatch(message).await;
            }
        }
    }

    /// Route one completed message by its type id. Reply failures are
    /// logged and swallowed; only read errors terminate the session.
    async fn dispatch(&mut self, packet: RtmpPacket) {
        debug!(
            "Session {}: message type {} ({} bytes) on csid {}",
            self.id,
            packet.message_type(),
            packet.payload.len(),
            packet.header.chunk_stream_id
        );

        match MessageType::from_id(packet.message_type()) {
            MessageType::SetChunkSize => {
                // The demultiplexer already applied the new size while
                // parsing; log the session-visible effect here.
                info!(
                    "Session {}: incoming chunk size is now {}",
                    self.id,
                    self.demux.incoming_chunk_size()
                );
            }
            MessageType::WindowAckSize => {
                debug!("Session {}: peer window ack size (informational)", self.id);
            }
            MessageType::Command => match Command::decode(&packet.payload) {
                Ok(command) => {
                    if let Err(e) = self.handle_command(&command, &packet).await {
                        warn!(
                            "Session {}: reply for '{}' failed: {}",
                            self.id, command.name, e
                        );
                    }
                }
                Err(e) => {
                    debug!("Session {}: dropping malformed command: {}", self.id, e);
                }
            },
            other => {
                debug!("Session {}: ignoring message {:?}", self.id, other);
            }
        }
    }

    async fn handle_command(&mut self, command: &Command, packet: &RtmpPacket) -> Result<()> {
        info!("Session {}: received command '{}'", self.id, command.name);

        match command.name.as_str() {
            "connect" => {
                self.run_connect_sequence(command.transaction_id, packet.header.chunk_stream_id)
                    .await
            }
            "createStream" => {
                let reply = Command::create_stream_result(command.transaction_id, DEFAULT_STREAM_ID);
                let reply = command_packet(&reply, 0, packet.header.chunk_stream_id)?;
                self.send_packet(&reply).await
            }
            "publish" => {
                self.send_packet(&user_control_packet(EVENT_STREAM_BEGIN, DEFAULT_STREAM_ID))
                    .await?;

                let status = Command::on_status("status", "NetStream.Publish.Start");
                let status = command_packet(
                    &status,
                    packet.message_stream_id(),
                    packet.header.chunk_stream_id,
                )?;
                self.send_packet(&status).await
            }
            other => {
                debug!("Session {}: ignoring command '{}'", self.id, other);
                Ok(())
            }
        }
    }

    /// The strictly ordered connect setup chain. Each write completes
    /// before the next begins; a failure aborts the remaining steps.
    async fn run_connect_sequence(&mut self, transaction_id: f64, csid: u32) -> Result<()> {
        self.send_packet(&window_ack_size_packet(self.settings.window_ack_size))
            .await?;
        self.send_packet(&set_peer_bandwidth_packet(
            self.settings.peer_bandwidth,
            PEER_BW_LIMIT_DYNAMIC,
        ))
        .await?;

        let out_size = self.settings.outgoing_chunk_size;
        self.send_packet(&set_chunk_size_packet(out_size)).await?;
        self.framer.set_chunk_size(out_size as usize);

        let reply = Command::connect_result(transaction_id);
        let reply = command_packet(&reply, 0, csid)?;
        self.send_packet(&reply).await?;
        info!("Session {}: connect sequence complete", self.id);
        Ok(())
    }

    async fn send_packet(&mut self, packet: &RtmpPacket) -> Result<()> {
        let wire = self.framer.frame(packet)?;
        self.stream
            .write_all(&wire)
            .await
            .map_err(|e| Error::connection(format!("Write error: {}", e)))?;
        self.stream
            .flush()
            .await
            .map_err(|e| Error::connection(format!("Flush error: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SessionSettings::default();
        assert_eq!(settings.window_ack_size, 5_000_000);
        assert_eq!(settings.peer_bandwidth, 5_000_000);
        assert_eq!(settings.outgoing_chunk_size, 4096);
    }
}
