//! Host-side check of page signatures produced by Compute and Read Page
//! Authentication.
//!
//! The device signs `SHA-256(ROM ID || page data || challenge || page || MANID)`
//! with one of its private keys; the matching public key lives in the X/Y
//! page pair of the key set.

use log::debug;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::deepcover::{PublicKey, Signature};
use crate::error::Error;

/// Length of the message the device hashes before signing
pub const MESSAGE_LEN: usize = 8 + 32 + 32 + 1 + 2;

/// Assemble the message covered by a page signature
pub fn signing_message(
    rom_id: &[u8; 8],
    page_data: &[u8; 32],
    challenge: &[u8; 32],
    page: u8,
    man_id: &[u8; 2],
) -> [u8; MESSAGE_LEN] {
    let mut message = [0u8; MESSAGE_LEN];
    message[..8].copy_from_slice(rom_id);
    message[8..40].copy_from_slice(page_data);
    message[40..72].copy_from_slice(challenge);
    message[72] = page;
    message[73..].copy_from_slice(man_id);
    message
}

pub fn message_digest(
    rom_id: &[u8; 8],
    page_data: &[u8; 32],
    challenge: &[u8; 32],
    page: u8,
    man_id: &[u8; 2],
) -> [u8; 32] {
    Sha256::digest(signing_message(rom_id, page_data, challenge, page, man_id)).into()
}

/// Verify `signature` over a pre-hashed `digest`
///
/// A signature that does not match is `Ok(false)`; keys or signatures that
/// are not valid P-256 values are errors.
pub fn verify_page_signature(
    public_key: &PublicKey,
    digest: &[u8; 32],
    signature: &Signature,
) -> Result<bool, Error> {
    let key = VerifyingKey::from_sec1_bytes(&public_key.to_sec1()).map_err(|_| Error::InvalidPublicKey)?;
    let signature = EcdsaSignature::from_slice(&signature.to_rs_bytes()).map_err(|_| Error::InvalidSignature)?;

    match key.verify_prehash(digest, &signature) {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!("Signature rejected: {e}");
            Ok(false)
        }
    }
}
