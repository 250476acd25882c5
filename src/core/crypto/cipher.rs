// src/core/crypto/cipher.rs
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use sha3::{Digest, Sha3_256};

use super::key_manager::KeyMaterial;
use crate::utils::error::{Result, FaceError};

pub const NONCE_LEN: usize = 12;

/// AES-256-GCM over template bytes. Output layout is `nonce || ciphertext+tag`.
pub struct TemplateCipher {
    cipher: Aes256Gcm,
}

impl TemplateCipher {
    /// The AES key is the SHA3-256 digest of the key material.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.is_empty() {
            return Err(FaceError::Crypto("Encryption key is empty".into()));
        }

        let hash = Sha3_256::digest(key);
        let cipher_key = Key::<Aes256Gcm>::from_slice(hash.as_slice());
        let cipher = Aes256Gcm::new(cipher_key);

        Ok(Self { cipher })
    }

    pub fn from_material(material: &KeyMaterial) -> Result<Self> {
        Self::new(material.secret())
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self.cipher
            .encrypt(nonce, data)
            .map_err(|e| FaceError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut result = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    pub fn decrypt(&self, encrypted_data: &[u8]) -> Result<Vec<u8>> {
        // nonce plus a full 16 byte tag
        if encrypted_data.len() < NONCE_LEN + 16 {
            return Err(FaceError::Decryption(
                "Invalid encrypted data length".to_string()
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| FaceError::Decryption("authentication failed".to_string()))
    }
}
