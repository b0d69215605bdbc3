//! Signing key lookup and bech32 account addresses

use bech32::{FromBase32, ToBase32, Variant};
use k256::ecdsa::SigningKey;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::ChainError;

/// Source of public keys for named signing keys
pub trait KeyBackend: Send + Sync {
    /// Compressed secp256k1 public key of `key_name`
    fn public_key(&self, key_name: &str) -> Result<Vec<u8>, ChainError>;
}

/// ripemd160(sha256(public_key)), the Cosmos SDK account id
pub fn account_id(public_key: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(public_key);
    Ripemd160::digest(sha).into()
}

/// Bech32 address of a public key under `prefix`
pub fn account_address(prefix: &str, public_key: &[u8]) -> Result<String, ChainError> {
    encode_address(prefix, &account_id(public_key))
}

pub fn encode_address(prefix: &str, bytes: &[u8]) -> Result<String, ChainError> {
    bech32::encode(prefix, bytes.to_base32(), Variant::Bech32)
        .map_err(|e| ChainError::Address(format!("cannot encode under {:?}: {}", prefix, e)))
}

/// Prefix and raw bytes of a bech32 address
pub fn decode_address(address: &str) -> Result<(String, Vec<u8>), ChainError> {
    let (hrp, data, _variant) = bech32::decode(address)
        .map_err(|e| ChainError::Address(format!("{:?}: {}", address, e)))?;
    let bytes = Vec::<u8>::from_base32(&data)
        .map_err(|e| ChainError::Address(format!("{:?}: {}", address, e)))?;
    Ok((hrp, bytes))
}

/// Re-encode `address` under another chain's prefix
pub fn rebase_address(address: &str, prefix: &str) -> Result<String, ChainError> {
    let (_, bytes) = decode_address(address)?;
    encode_address(prefix, &bytes)
}

/// In-memory key backend over secp256k1 secret keys
#[derive(Default)]
pub struct MemoryKeyring {
    keys: HashMap<String, SigningKey>,
}

impl MemoryKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key_name: impl Into<String>, key: SigningKey) {
        self.keys.insert(key_name.into(), key);
    }

    /// Add a key from its 32 secret bytes
    pub fn add_secret(
        &mut self,
        key_name: impl Into<String>,
        secret: &[u8],
    ) -> Result<(), ChainError> {
        let key_name = key_name.into();
        let key = SigningKey::from_slice(secret)
            .map_err(|e| ChainError::Encoding(format!("invalid secret for {}: {}", key_name, e)))?;
        self.insert(key_name, key);
        Ok(())
    }

    /// Add a key from a hex-encoded secret
    pub fn add_hex_secret(
        &mut self,
        key_name: impl Into<String>,
        secret_hex: &str,
    ) -> Result<(), ChainError> {
        let secret = hex::decode(secret_hex.trim_start_matches("0x"))
            .map_err(|e| ChainError::Encoding(format!("invalid hex secret: {}", e)))?;
        self.add_secret(key_name, &secret)
    }

    pub fn contains(&self, key_name: &str) -> bool {
        self.keys.contains_key(key_name)
    }
}

impl KeyBackend for MemoryKeyring {
    fn public_key(&self, key_name: &str) -> Result<Vec<u8>, ChainError> {
        let key = self
            .keys
            .get(key_name)
            .ok_or_else(|| ChainError::KeyNotFound(key_name.to_string()))?;
        Ok(key.verifying_key().to_encoded_point(true).as_bytes().to_vec())
    }
}

impl std::fmt::Debug for MemoryKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.keys.keys().collect();
        names.sort();
        f.debug_struct("MemoryKeyring").field("keys", &names).finish()
    }
}
