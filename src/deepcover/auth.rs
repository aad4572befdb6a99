/// Compute and Read Page Authentication
///
/// The challenge is staged in the scratch buffer, then the device computes
/// an HMAC (secret A/B/S) or an ECDSA signature (private key A/B/C) over
/// its ROM ID, the selected page, the challenge and the MANID.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use super::DeepCover;
use crate::error::Error;
use crate::memory::PAGE_COUNT;
use crate::protocol::commands::{AuthorityType, Command, ResultCode};
use crate::protocol::frame::CommandFrame;
use crate::transport::Transport;

/// Response sized for the larger of the two outputs
const AUTH_RESPONSE_LEN: usize = 64;

/// P-256 public key as stored in an X/Y page pair (big-endian coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    pub x: [u8; 32],
    pub y: [u8; 32],
}

impl PublicKey {
    /// SEC1 uncompressed encoding (`04 || X || Y`)
    pub fn to_sec1(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0] = 0x04;
        out[1..33].copy_from_slice(&self.x);
        out[33..].copy_from_slice(&self.y);
        out
    }
}

/// ECDSA signature halves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Signature {
    /// Parse the device's output order, S followed by R
    pub fn from_device(bytes: &[u8; 64]) -> Self {
        let mut s = [0u8; 32];
        let mut r = [0u8; 32];
        s.copy_from_slice(&bytes[..32]);
        r.copy_from_slice(&bytes[32..]);
        Self { r, s }
    }

    /// `R || S`, the order used by most verifiers
    pub fn to_rs_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutput {
    Hmac([u8; 32]),
    Signature(Signature),
}

/// Outcome of an authentication request
///
/// A failing result code (e.g. `FailEcdsa`) is data for the caller, with
/// no output attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticationResult {
    pub authority: AuthorityType,
    pub page: u8,
    pub result: ResultCode,
    pub output: Option<AuthOutput>,
}

impl AuthenticationResult {
    pub fn hmac(&self) -> Option<&[u8; 32]> {
        match &self.output {
            Some(AuthOutput::Hmac(mac)) => Some(mac),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match &self.output {
            Some(AuthOutput::Signature(signature)) => Some(signature),
            _ => None,
        }
    }

    /// Raw output bytes: 32 for an HMAC, 64 (`S || R`) for a signature
    pub fn output_bytes(&self) -> Vec<u8> {
        match &self.output {
            Some(AuthOutput::Hmac(mac)) => mac.to_vec(),
            Some(AuthOutput::Signature(signature)) => {
                let mut out = signature.s.to_vec();
                out.extend_from_slice(&signature.r);
                out
            }
            None => Vec::new(),
        }
    }
}

impl<T: Transport, D: DelayNs> DeepCover<T, D> {
    /// Preload `challenge`, run the authentication over `page` and read the result
    pub fn authenticate(
        &mut self,
        challenge: &[u8; 32],
        authority: AuthorityType,
        page: u8,
    ) -> Result<AuthenticationResult, Error> {
        if page as usize >= PAGE_COUNT {
            return Err(Error::InvalidPageIndex(page as i64));
        }

        self.write_buffer(challenge)?;

        let frame = CommandFrame::new(Command::ComputeAndReadAuth, authority.parameter(page), &[])?;
        let response = self.transact(&frame, AUTH_RESPONSE_LEN)?;
        debug!("{authority:?} over page {page}: {}", response.result);

        let mut result = AuthenticationResult {
            authority,
            page,
            result: response.result,
            output: None,
        };
        if !response.result.is_success() {
            warn!("Authentication with {authority:?} failed: {}", response.result);
            return Ok(result);
        }

        let expected = authority.output_len();
        if response.payload.len() < expected {
            return Err(Error::Communication {
                expected,
                actual: response.payload.len(),
            });
        }

        result.output = Some(if authority.is_ecdsa() {
            let mut bytes = [0u8; 64];
            bytes.copy_from_slice(&response.payload[..64]);
            AuthOutput::Signature(Signature::from_device(&bytes))
        } else {
            let mut mac = [0u8; 32];
            mac.copy_from_slice(&response.payload[..32]);
            AuthOutput::Hmac(mac)
        });
        Ok(result)
    }

    /// Have the device sign a 32-byte digest with private key A over page 0
    pub fn sign_digest(&mut self, digest: &[u8; 32]) -> Result<AuthenticationResult, Error> {
        self.authenticate(digest, AuthorityType::EcdsaKeyA, 0)
    }

    /// Re-derive the signed message on the host and check an ECDSA result
    /// against the public key of the authority that produced it
    #[cfg(feature = "verify")]
    pub fn verify_authentication(
        &mut self,
        challenge: &[u8; 32],
        auth: &AuthenticationResult,
    ) -> Result<bool, Error> {
        use crate::memory::KeySet;
        use crate::verify;

        let Some(signature) = auth.signature() else {
            return Ok(false);
        };
        let key_set = match auth.authority {
            AuthorityType::EcdsaKeyA => KeySet::A,
            AuthorityType::EcdsaKeyB => KeySet::B,
            AuthorityType::EcdsaKeyC => KeySet::C,
            _ => return Ok(false),
        };

        let identity = self.get_identity(false)?;
        let page_data = self.read_page(auth.page)?;
        let public_key = self.read_public_key(key_set)?;

        let digest = verify::message_digest(
            &identity.rom_id,
            &page_data,
            challenge,
            auth.page,
            &identity.man_id,
        );
        verify::verify_page_signature(&public_key, &digest, signature)
    }
}
