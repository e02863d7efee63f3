// SIGNATURE SIMULATOR
// Stand-in for public-key signatures: a registry of (public -> private)
// identifiers plus a hash commitment over (private, message).
//
// SAFETY INVARIANTS:
// 1. A public identifier is registered at most once per simulator instance
// 2. The registry is the sole authority on ownership: verification looks the
//    private half up here and nowhere else
// 3. Verification is only meaningful against the instance that minted the
//    key. Two simulators never recognise each other's keys; sharing a
//    registry means sharing the same `Arc<SignatureSimulator>`
//
// This is NOT asymmetric cryptography. Anyone holding the registry can forge.

use crate::hashing::sha256_hex;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Commitments cover at most this many bytes of `private || message`.
pub const COMMIT_PREFIX_BYTES: usize = 64;

/// Minting gives up after this many consecutive public-id collisions.
pub const MAX_KEY_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Key identifier collision persisted after {attempts} attempts")]
    KeyCollision { attempts: usize },
}

/// A freshly minted (public, private) identifier pair.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub public: String,
    pub private: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("private", &"<redacted>")
            .finish()
    }
}

type IdSource = Box<dyn Fn() -> String + Send + Sync>;

fn random_identifier() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub struct SignatureSimulator {
    registry: RwLock<HashMap<String, String>>,
    id_source: IdSource,
}

impl SignatureSimulator {
    /// Simulator minting random 32-hex-character identifiers.
    pub fn new() -> Self {
        Self::with_id_source(random_identifier)
    }

    /// Simulator drawing identifiers from `source`. Used to exercise the
    /// collision path deterministically.
    pub fn with_id_source<F>(source: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            registry: RwLock::new(HashMap::new()),
            id_source: Box::new(source),
        }
    }

    /// Mint a new key pair and register it before returning.
    ///
    /// A colliding public identifier is redrawn; only after
    /// `MAX_KEY_ATTEMPTS` consecutive collisions is `KeyCollision` surfaced.
    pub fn key_pair(&self) -> Result<KeyPair, CryptoError> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let public = (self.id_source)();
            let mut registry = self.registry.write();
            if registry.contains_key(&public) {
                warn!("Public identifier collision on attempt {}, retrying", attempt);
                continue;
            }
            let private = (self.id_source)();
            registry.insert(public.clone(), private.clone());
            debug!("Registered public identifier {}", public);
            return Ok(KeyPair { public, private });
        }

        Err(CryptoError::KeyCollision {
            attempts: MAX_KEY_ATTEMPTS,
        })
    }

    /// The simulated signature: SHA-256 over the first 64 bytes of
    /// `private || message`, hex encoded.
    pub fn commit(private: &str, message: &str) -> String {
        let material = format!("{}{}", private, message);
        let bytes = material.as_bytes();
        let prefix = &bytes[..bytes.len().min(COMMIT_PREFIX_BYTES)];
        sha256_hex(prefix)
    }

    /// True iff `public` is registered here and `commit` matches the
    /// commitment of its private half over `message`. Unknown identifiers
    /// verify as false, never as an error.
    pub fn verify(&self, public: &str, message: &str, commit: &str) -> bool {
        let registry = self.registry.read();
        match registry.get(public) {
            Some(private) => Self::commit(private, message) == commit,
            None => false,
        }
    }

    pub fn is_registered(&self, public: &str) -> bool {
        self.registry.read().contains_key(public)
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }
}

impl Default for SignatureSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SignatureSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureSimulator")
            .field("registered", &self.len())
            .finish()
    }
}
