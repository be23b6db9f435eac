use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{ByteBuffer, Error, Result};
use crate::handshake::state::HandshakePhase;
use crate::utils::{current_timestamp, generate_random_bytes};

/// C1/S1/C2/S2 packet size
pub const HANDSHAKE_SIZE: usize = 1536;

/// C0+C1 combined size
pub const C0C1_SIZE: usize = 1 + HANDSHAKE_SIZE;

/// S0+S1+S2 combined size
pub const S0S1S2_SIZE: usize = 1 + HANDSHAKE_SIZE * 2;

/// Build the S0+S1+S2 response for a raw C0+C1.
///
/// S0 echoes the peer's version byte, S1 carries fresh filler bytes, and
/// S2 is a verbatim echo of the peer's C1 proving receipt. Nothing in C1
/// beyond its length is validated.
pub fn build_response(c0c1: &[u8]) -> Result<Vec<u8>> {
    if c0c1.len() != C0C1_SIZE {
        return Err(Error::handshake(format!(
            "C0+C1 must be {} bytes, got {}",
            C0C1_SIZE,
            c0c1.len()
        )));
    }

    let mut response = ByteBuffer::with_capacity(S0S1S2_SIZE);

    // S0: echo the peer's version byte
    response.write_u8(c0c1[0])?;

    // S1: timestamp, zero field, random filler
    response.write_u32_be(current_timestamp())?;
    response.write_u32_be(0)?;
    response.write_bytes(&generate_random_bytes(HANDSHAKE_SIZE - 8))?;

    // S2: byte-for-byte echo of C1
    response.write_bytes(&c0c1[1..])?;

    Ok(response.to_vec())
}

/// Drive the full server-side exchange: read C0+C1, send S0+S1+S2, read
/// C2 (not validated). Any transport error aborts the handshake for good.
pub async fn perform_server<S>(stream: &mut S, phase: &mut HandshakePhase) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut c0c1 = vec![0u8; C0C1_SIZE];
    stream
        .read_exact(&mut c0c1)
        .await
        .map_err(|e| Error::handshake(format!("Failed to read C0+C1: {}", e)))?;
    debug!("Handshake: C0+C1 received ({} bytes)", c0c1.len());

    let response = build_response(&c0c1)?;
    stream
        .write_all(&response)
        .await
        .map_err(|e| Error::handshake(format!("Failed to write S0+S1+S2: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| Error::handshake(format!("Failed to flush S0+S1+S2: {}", e)))?;
    phase.advance()?;
    debug!("Handshake: S0+S1+S2 sent ({} bytes)", response.len());

    let mut c2 = vec![0u8; HANDSHAKE_SIZE];
    stream
        .read_exact(&mut c2)
        .await
        .map_err(|e| Error::handshake(format!("Failed to read C2: {}", e)))?;
    phase.advance()?;
    debug!("Handshake: C2 received, handshake complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_echo_property() {
        let mut c0c1 = vec![3u8];
        c0c1.extend((0..HANDSHAKE_SIZE).map(|i| (i % 251) as u8));

        let response = build_response(&c0c1).unwrap();
        assert_eq!(response.len(), S0S1S2_SIZE);
        assert_eq!(response[0], c0c1[0]);
        assert_eq!(&response[1 + HANDSHAKE_SIZE..], &c0c1[1..]);
    }

    #[test]
    fn test_short_c0c1_rejected() {
        let c0c1 = vec![3u8; 100];
        assert!(build_response(&c0c1).is_err());
    }

    #[tokio::test]
    async fn test_server_exchange_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(8192);

        let server_task = tokio::spawn(async move {
            let mut phase = HandshakePhase::new();
            perform_server(&mut server, &mut phase).await.unwrap();
            assert!(phase.is_streaming());
        });

        let mut c0c1 = vec![3u8];
        c0c1.extend(generate_random_bytes(HANDSHAKE_SIZE));
        client.write_all(&c0c1).await.unwrap();

        let mut s0s1s2 = vec![0u8; S0S1S2_SIZE];
        client.read_exact(&mut s0s1s2).await.unwrap();
        assert_eq!(s0s1s2[0], 3);
        assert_eq!(&s0s1s2[1 + HANDSHAKE_SIZE..], &c0c1[1..]);

        // C2 echoes S1; the server consumes it without validation
        let c2 = s0s1s2[1..1 + HANDSHAKE_SIZE].to_vec();
        client.write_all(&c2).await.unwrap();

        server_task.await.unwrap();
    }
}
