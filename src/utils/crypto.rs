use rand::{Rng, rng};

/// Generate random filler bytes for the handshake.
///
/// Stateless process-wide utility; cryptographic strength is not required
/// by the wire format.
pub fn generate_random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rng().fill_bytes(&mut bytes);
    bytes
}
