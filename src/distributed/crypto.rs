// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-GCM frame encryption
//!
//! Frame layout: `ciphertext || nonce(16) || mac(16) || "BOBO"`. The
//! trailing sentinel doubles as the end-of-frame marker for the stream
//! reader. Plaintext is padded with the pad character to a multiple of 16
//! bytes before encryption and stripped after decryption, so the pad
//! character must not appear in real payload text.

use crate::error::{CepFlowError, CepFlowResult};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::AesGcm;
use rand::RngCore;

/// End-of-frame sentinel
pub const FRAME_SENTINEL: &[u8] = b"BOBO";

/// Fixed nonce length in bytes
pub const NONCE_LENGTH: usize = 16;

/// Fixed authentication tag length in bytes
pub const MAC_LENGTH: usize = 16;

/// Smallest well-formed frame: one cipher block plus trailer
pub const MIN_FRAME_LENGTH: usize = 16 + NONCE_LENGTH + MAC_LENGTH + FRAME_SENTINEL.len();

const BLOCK_SIZE: usize = 16;

type Aes128Gcm16 = AesGcm<Aes128, U16>;
type Aes192Gcm16 = AesGcm<Aes192, U16>;
type Aes256Gcm16 = AesGcm<Aes256, U16>;

enum CipherVariant {
    Aes128(Box<Aes128Gcm16>),
    Aes192(Box<Aes192Gcm16>),
    Aes256(Box<Aes256Gcm16>),
}

/// Symmetric frame codec shared by every peer in the cluster
pub struct FrameCrypto {
    cipher: CipherVariant,
    pad_char: char,
}

impl FrameCrypto {
    /// Build a codec from a shared key of 16, 24 or 32 bytes
    pub fn new(key: &[u8], pad_char: char) -> CepFlowResult<Self> {
        if !pad_char.is_ascii() {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be a single ascii character",
                "pad_char",
            ));
        }
        let cipher = match key.len() {
            16 => CipherVariant::Aes128(Box::new(
                Aes128Gcm16::new_from_slice(key)
                    .map_err(|_| CepFlowError::invalid_parameter("bad key"))?,
            )),
            24 => CipherVariant::Aes192(Box::new(
                Aes192Gcm16::new_from_slice(key)
                    .map_err(|_| CepFlowError::invalid_parameter("bad key"))?,
            )),
            32 => CipherVariant::Aes256(Box::new(
                Aes256Gcm16::new_from_slice(key)
                    .map_err(|_| CepFlowError::invalid_parameter("bad key"))?,
            )),
            n => {
                return Err(CepFlowError::invalid_parameter_with_name(
                    format!("must be 16, 24 or 32 bytes, got {n}"),
                    "key",
                ))
            }
        };
        Ok(Self { cipher, pad_char })
    }

    pub fn pad_char(&self) -> char {
        self.pad_char
    }

    /// Pad, encrypt and frame a plaintext
    pub fn wrap(&self, plaintext: &str) -> CepFlowResult<Vec<u8>> {
        let mut padded = plaintext.to_string();
        while padded.len() % BLOCK_SIZE != 0 {
            padded.push(self.pad_char);
        }

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);

        // encrypt() appends the authentication tag to the ciphertext
        let sealed = match &self.cipher {
            CipherVariant::Aes128(c) => c.encrypt(nonce, padded.as_bytes()),
            CipherVariant::Aes192(c) => c.encrypt(nonce, padded.as_bytes()),
            CipherVariant::Aes256(c) => c.encrypt(nonce, padded.as_bytes()),
        }
        .map_err(|_| CepFlowError::system("encryption failed"))?;

        let split = sealed.len() - MAC_LENGTH;
        let mut frame = Vec::with_capacity(sealed.len() + NONCE_LENGTH + FRAME_SENTINEL.len());
        frame.extend_from_slice(&sealed[..split]);
        frame.extend_from_slice(&nonce_bytes);
        frame.extend_from_slice(&sealed[split..]);
        frame.extend_from_slice(FRAME_SENTINEL);
        Ok(frame)
    }

    /// Unframe, decrypt and unpad a received frame
    pub fn unwrap(&self, frame: &[u8]) -> CepFlowResult<String> {
        if frame.len() < MIN_FRAME_LENGTH {
            return Err(CepFlowError::system(format!(
                "frame too short: {} bytes",
                frame.len()
            )));
        }
        if !frame.ends_with(FRAME_SENTINEL) {
            return Err(CepFlowError::system("frame missing end sentinel"));
        }
        let body = &frame[..frame.len() - FRAME_SENTINEL.len()];
        let (rest, mac) = body.split_at(body.len() - MAC_LENGTH);
        let (ciphertext, nonce_bytes) = rest.split_at(rest.len() - NONCE_LENGTH);
        let nonce = GenericArray::from_slice(nonce_bytes);

        let mut sealed = Vec::with_capacity(ciphertext.len() + MAC_LENGTH);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(mac);

        let padded = match &self.cipher {
            CipherVariant::Aes128(c) => c.decrypt(nonce, sealed.as_slice()),
            CipherVariant::Aes192(c) => c.decrypt(nonce, sealed.as_slice()),
            CipherVariant::Aes256(c) => c.decrypt(nonce, sealed.as_slice()),
        }
        .map_err(|_| CepFlowError::system("mac verification failed"))?;

        let text = String::from_utf8(padded)
            .map_err(|e| CepFlowError::system(format!("frame is not utf-8: {e}")))?;
        Ok(text.trim_end_matches(self.pad_char).to_string())
    }
}
