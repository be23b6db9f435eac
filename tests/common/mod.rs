// Shared helpers for end-to-end session tests: a scripted client that
// speaks the wire format over an in-memory duplex stream.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use rtmp::{
    ChunkDemultiplexer, ChunkFramer, Command, RtmpHeader, RtmpPacket, C0C1_SIZE,
    CHUNK_STREAM_COMMAND, HANDSHAKE_SIZE, S0S1S2_SIZE,
};

pub struct TestClient {
    stream: DuplexStream,
    framer: ChunkFramer,
    demux: ChunkDemultiplexer,
}

impl TestClient {
    pub fn new(stream: DuplexStream) -> Self {
        let mut framer = ChunkFramer::new();
        // The server reads at the default 128-byte chunk size until it is
        // told otherwise.
        framer.set_chunk_size(128);
        TestClient {
            stream,
            framer,
            demux: ChunkDemultiplexer::new(),
        }
    }

    /// Run the client side of the handshake and return the raw S0+S1+S2
    /// for inspection.
    pub async fn handshake(&mut self) -> Vec<u8> {
        let mut c0c1 = vec![3u8];
        c0c1.extend((0..HANDSHAKE_SIZE).map(|i| (i % 199) as u8));
        assert_eq!(c0c1.len(), C0C1_SIZE);
        self.stream.write_all(&c0c1).await.unwrap();

        let mut s0s1s2 = vec![0u8; S0S1S2_SIZE];
        self.stream.read_exact(&mut s0s1s2).await.unwrap();
        assert_eq!(s0s1s2[0], c0c1[0], "S0 must echo the version byte");
        assert_eq!(
            &s0s1s2[1 + HANDSHAKE_SIZE..],
            &c0c1[1..],
            "S2 must echo C1 byte-for-byte"
        );

        // C2 content is not validated by the server; echo S1
        let c2 = s0s1s2[1..1 + HANDSHAKE_SIZE].to_vec();
        self.stream.write_all(&c2).await.unwrap();

        s0s1s2
    }

    /// Send a command message on the command chunk stream.
    pub async fn send_command(&mut self, command: &Command, stream_id: u32) {
        let payload = command.encode().unwrap();
        let header = RtmpHeader::command(payload.len() as u32, stream_id, CHUNK_STREAM_COMMAND);
        self.send_packet(&RtmpPacket::new(header, payload)).await;
    }

    /// Send raw message bytes as chunks.
    pub async fn send_packet(&mut self, packet: &RtmpPacket) {
        let wire = self.framer.frame(packet).unwrap();
        self.stream.write_all(&wire).await.unwrap();
    }

    /// Collect exactly `count` complete messages from the server.
    pub async fn recv_messages(&mut self, count: usize) -> Vec<RtmpPacket> {
        let mut messages = Vec::new();
        let mut buf = [0u8; 8192];

        let deadline = tokio::time::timeout(Duration::from_secs(5), async {
            while messages.len() < count {
                let n = self.stream.read(&mut buf).await.unwrap();
                assert_ne!(n, 0, "server closed while awaiting messages");
                messages.extend(self.demux.push(&buf[..n]).unwrap());
            }
        });
        deadline.await.expect("timed out awaiting server messages");

        assert_eq!(messages.len(), count, "unexpected extra messages");
        messages
    }

    /// Drop the write side by consuming the client.
    pub fn close(self) {}
}

/// Build a connect command the way encoders in the wild do, with an
/// arbitrary command object the server is free to ignore.
pub fn connect_command(transaction_id: f64) -> Command {
    let mut cmd = Command::new("connect".to_string(), transaction_id);
    let mut obj = std::collections::HashMap::new();
    obj.insert(
        "app".to_string(),
        rtmp::Amf0Value::String("live".to_string()),
    );
    cmd.command_object = Some(rtmp::Amf0Value::Object(obj));
    cmd
}

pub fn create_stream_command(transaction_id: f64) -> Command {
    let mut cmd = Command::new("createStream".to_string(), transaction_id);
    cmd.command_object = Some(rtmp::Amf0Value::Null);
    cmd
}

pub fn publish_command(stream_name: &str) -> Command {
    let mut cmd = Command::new("publish".to_string(), 0.0);
    cmd.command_object = Some(rtmp::Amf0Value::Null);
    cmd.arguments
        .push(rtmp::Amf0Value::String(stream_name.to_string()));
    cmd.arguments
        .push(rtmp::Amf0Value::String("live".to_string()));
    cmd
}
