use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng, Payload},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AppError, Result};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// A secure key wrapper that ensures the key is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureKey([u8; KEY_SIZE]);

impl SecureKey {
    /// Creates a new `SecureKey` from a byte array.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self(key)
    }

    /// Returns a reference to the key as a byte slice.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Generates a new random AES-GCM nonce.
fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// A single keyed codec: authenticated encryption of opaque payloads,
/// bound to a purpose name so a token minted for one cookie cannot be
/// replayed for another.
pub struct SecretCodec {
    key: SecureKey,
}

impl SecretCodec {
    /// Creates a codec from a secret of arbitrary length.
    ///
    /// The AES-256 key is the SHA-256 digest of the secret, so operators can
    /// configure human-sized secrets without weakening the key size.
    pub fn new(secret: &[u8]) -> Self {
        let digest = Sha256::digest(secret);
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        Self {
            key: SecureKey::new(key),
        }
    }

    /// Encrypts `plaintext` under this codec's key, binding `name` as
    /// associated data.
    ///
    /// # Returns
    ///
    /// An ASCII-safe token: `base64url(nonce || ciphertext)`, unpadded.
    pub fn encode(&self, name: &str, plaintext: &[u8]) -> Result<String> {
        let cipher = Aes256Gcm::new(self.key.as_bytes().into());

        let nonce_bytes = generate_nonce();
        let nonce = Nonce::from(nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: name.as_bytes(),
                },
            )
            .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;

        let mut raw = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        raw.extend_from_slice(&nonce_bytes);
        raw.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Verifies and decrypts a token previously produced by [`encode`] with
    /// the same secret and `name`.
    ///
    /// Any failure - malformed encoding, truncation, bit flip, wrong key,
    /// wrong name - is reported as [`AppError::Integrity`].
    ///
    /// [`encode`]: SecretCodec::encode
    pub fn decode(&self, name: &str, token: &str) -> Result<Vec<u8>> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| AppError::Integrity)?;

        if raw.len() <= NONCE_SIZE {
            return Err(AppError::Integrity);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
        let nonce_arr: [u8; NONCE_SIZE] = nonce_bytes
            .try_into()
            .map_err(|_| AppError::Integrity)?;
        let nonce = Nonce::from(nonce_arr);

        let cipher = Aes256Gcm::new(self.key.as_bytes().into());
        cipher
            .decrypt(
                &nonce,
                Payload {
                    msg: ciphertext,
                    aad: name.as_bytes(),
                },
            )
            .map_err(|_| AppError::Integrity)
    }
}

/// An ordered list of codecs supporting secret rotation.
///
/// New tokens are always encoded with the first codec; decoding tries each
/// codec in turn until one verifies, so sessions minted under a retired
/// secret keep working until they expire.
#[derive(Clone)]
pub struct CodecChain {
    codecs: Arc<Vec<SecretCodec>>,
}

impl CodecChain {
    /// Creates a chain from the configured secrets, newest first.
    ///
    /// # Panics
    ///
    /// Panics if `secrets` is empty; the configuration layer guarantees at
    /// least one secret.
    pub fn from_secrets<S: AsRef<[u8]>>(secrets: &[S]) -> Self {
        assert!(!secrets.is_empty(), "codec chain requires at least one secret");
        let codecs = secrets
            .iter()
            .map(|s| SecretCodec::new(s.as_ref()))
            .collect();
        Self {
            codecs: Arc::new(codecs),
        }
    }

    /// Encodes with the primary (first) secret.
    pub fn encode(&self, name: &str, plaintext: &[u8]) -> Result<String> {
        self.codecs[0].encode(name, plaintext)
    }

    /// Tries each configured secret in order; the first that verifies wins.
    pub fn decode(&self, name: &str, token: &str) -> Result<Vec<u8>> {
        for codec in self.codecs.iter() {
            match codec.decode(name, token) {
                Ok(plaintext) => return Ok(plaintext),
                Err(AppError::Integrity) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(AppError::Integrity)
    }

    /// Serializes `value` to JSON and encodes the bytes.
    pub fn encode_value<T: Serialize>(&self, name: &str, value: &T) -> Result<String> {
        let plaintext = serde_json::to_vec(value)?;
        self.encode(name, &plaintext)
    }

    /// Decodes a token and deserializes the plaintext from JSON.
    pub fn decode_value<T: DeserializeOwned>(&self, name: &str, token: &str) -> Result<T> {
        let plaintext = self.decode(name, token)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}
