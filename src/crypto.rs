//! Ed25519 keypair helper for callers building identities and fixtures.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use crate::ids::PublicKey;

/// Generate an Ed25519 keypair.
///
/// Returns (public_key, private_key_bytes). The index itself only ever
/// consumes public keys; the private half belongs to the caller's keystore.
pub fn generate_keypair() -> (PublicKey, [u8; 32]) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public = PublicKey::from_array(signing_key.verifying_key().to_bytes());
    (public, signing_key.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keypair_distinct() {
        let (pub_a, priv_a) = generate_keypair();
        let (pub_b, priv_b) = generate_keypair();
        assert_ne!(pub_a, pub_b);
        assert_ne!(priv_a, priv_b);
    }
}
