use crate::{Error, Result};

/// Per-session handshake progress. The order is fixed and terminal; a
/// failed exchange tears the session down rather than resuming mid-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Waiting for C0+C1 from the peer
    AwaitingC1,

    /// Sent S0+S1+S2, waiting for C2
    AwaitingC2,

    /// Handshake complete, chunked traffic may flow
    Streaming,
}

impl HandshakePhase {
    /// Initial phase
    pub fn new() -> Self {
        HandshakePhase::AwaitingC1
    }

    /// Check if chunked traffic is allowed yet
    pub fn is_streaming(&self) -> bool {
        *self == HandshakePhase::Streaming
    }

    /// Advance to the next phase
    pub fn advance(&mut self) -> Result<()> {
        *self = match self {
            HandshakePhase::AwaitingC1 => HandshakePhase::AwaitingC2,
            HandshakePhase::AwaitingC2 => HandshakePhase::Streaming,
            HandshakePhase::Streaming => {
                return Err(Error::invalid_state("Handshake already complete"));
            }
        };
        Ok(())
    }
}

impl Default for HandshakePhase {
    fn default() -> Self {
        HandshakePhase::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut phase = HandshakePhase::new();
        assert!(!phase.is_streaming());

        phase.advance().unwrap();
        assert_eq!(phase, HandshakePhase::AwaitingC2);

        phase.advance().unwrap();
        assert!(phase.is_streaming());

        assert!(phase.advance().is_err());
    }
}
