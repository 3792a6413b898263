use super::crypto::encrypt_aes_ecb;
use crate::definitions::NodeId;
use std::{
    collections::BTreeMap,
    ops::Deref,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use thiserror::Error;

pub const NETWORK_KEY_SIZE: usize = 16;
pub const S0_HALF_NONCE_SIZE: usize = 8;
pub const S0_NONCE_SIZE: usize = 16;
pub const DEFAULT_NONCE_LIFETIME: Duration = Duration::from_secs(20);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecurityError {
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("failed to generate random bytes")]
    Random,
}

/// One half of an S0 nonce. The first byte doubles as the nonce id.
#[derive(Debug, Clone, PartialEq)]
#[repr(transparent)]
pub struct S0Nonce([u8; S0_HALF_NONCE_SIZE]);

impl S0Nonce {
    pub fn new(nonce: [u8; S0_HALF_NONCE_SIZE]) -> Self {
        Self(nonce)
    }

    pub fn random() -> Result<Self, SecurityError> {
        let mut nonce = [0u8; S0_HALF_NONCE_SIZE];
        getrandom::getrandom(&mut nonce).map_err(|_| SecurityError::Random)?;
        Ok(Self(nonce))
    }

    pub fn id(&self) -> u8 {
        self.0[0]
    }
}

impl TryFrom<&[u8]> for S0Nonce {
    type Error = SecurityError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let nonce = value.try_into().map_err(|_| SecurityError::InvalidLength {
            expected: S0_HALF_NONCE_SIZE,
            actual: value.len(),
        })?;
        Ok(Self(nonce))
    }
}

impl AsRef<[u8]> for S0Nonce {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for S0Nonce {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for S0Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Clone, PartialEq)]
#[repr(transparent)]
pub struct NetworkKey([u8; NETWORK_KEY_SIZE]);

impl NetworkKey {
    pub fn new(key: [u8; NETWORK_KEY_SIZE]) -> Self {
        Self(key)
    }
}

impl TryFrom<&[u8]> for NetworkKey {
    type Error = SecurityError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let key = value.try_into().map_err(|_| SecurityError::InvalidLength {
            expected: NETWORK_KEY_SIZE,
            actual: value.len(),
        })?;
        Ok(Self(key))
    }
}

impl AsRef<[u8]> for NetworkKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for NetworkKey {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Never print key material
impl std::fmt::Debug for NetworkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NetworkKey(..)")
    }
}

const AUTH_KEY_BASE: &[u8; NETWORK_KEY_SIZE] = &[0x55; NETWORK_KEY_SIZE];
const ENC_KEY_BASE: &[u8; NETWORK_KEY_SIZE] = &[0xaa; NETWORK_KEY_SIZE];

/// The keys derived from the network key
#[derive(Clone)]
struct DerivedKeys {
    auth_key: Vec<u8>,
    enc_key: Vec<u8>,
}

impl DerivedKeys {
    fn new(network_key: &NetworkKey) -> Self {
        Self {
            auth_key: encrypt_aes_ecb(AUTH_KEY_BASE, network_key),
            enc_key: encrypt_aes_ecb(ENC_KEY_BASE, network_key),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
struct NonceKey {
    issuer: NodeId,
    nonce_id: u8,
}

struct NonceEntry {
    nonce: S0Nonce,
    receiver: NodeId,
    expires: Instant,
}

pub struct SecurityManagerOptions {
    pub own_node_id: NodeId,
    pub network_key: Option<NetworkKey>,
    pub nonce_lifetime: Duration,
}

impl Default for SecurityManagerOptions {
    fn default() -> Self {
        Self {
            own_node_id: NodeId::unspecified(),
            network_key: None,
            nonce_lifetime: DEFAULT_NONCE_LIFETIME,
        }
    }
}

/// Holds the S0 keys and all nonces, both the ones we handed out and the ones we received.
///
/// Nonces are single use. Every lookup takes the current time, and expired nonces are never returned.
pub struct SecurityManager {
    own_node_id: NodeId,
    keys: Option<DerivedKeys>,
    nonce_lifetime: Duration,
    nonce_store: BTreeMap<NonceKey, NonceEntry>,
    free_nonces: BTreeMap<NodeId, NonceKey>,
}

/// The security manager is shared between the worker and the I/O side, and keys may change at any time
pub type SharedSecurity = Arc<Mutex<SecurityManager>>;

impl SecurityManager {
    pub fn new(options: SecurityManagerOptions) -> Self {
        Self {
            own_node_id: options.own_node_id,
            keys: options.network_key.as_ref().map(DerivedKeys::new),
            nonce_lifetime: options.nonce_lifetime,
            nonce_store: BTreeMap::new(),
            free_nonces: BTreeMap::new(),
        }
    }

    pub fn into_shared(self) -> SharedSecurity {
        Arc::new(Mutex::new(self))
    }

    pub fn own_node_id(&self) -> NodeId {
        self.own_node_id
    }

    pub fn set_own_node_id(&mut self, own_node_id: NodeId) {
        self.own_node_id = own_node_id;
    }

    pub fn nonce_lifetime(&self) -> Duration {
        self.nonce_lifetime
    }

    /// Replaces the network key. All nonces are discarded, since they belong to the old key.
    pub fn set_network_key(&mut self, network_key: NetworkKey) {
        self.keys = Some(DerivedKeys::new(&network_key));
        self.nonce_store.clear();
        self.free_nonces.clear();
    }

    pub fn has_network_key(&self) -> bool {
        self.keys.is_some()
    }

    pub fn auth_key(&self) -> Option<&[u8]> {
        self.keys.as_ref().map(|k| k.auth_key.as_slice())
    }

    pub fn enc_key(&self) -> Option<&[u8]> {
        self.keys.as_ref().map(|k| k.enc_key.as_slice())
    }

    fn has_nonce(&self, nonce_id: u8) -> bool {
        self.nonce_store.contains_key(&NonceKey {
            issuer: self.own_node_id,
            nonce_id,
        })
    }

    /// Generates a nonce for the given node to use in its next secure message to us
    pub fn generate_nonce(&mut self, receiver: NodeId, now: Instant) -> Result<S0Nonce, SecurityError> {
        self.expire_nonces(now);
        // Nonce ids must be unique among our outstanding nonces
        let nonce = loop {
            let nonce = S0Nonce::random()?;
            if !self.has_nonce(nonce.id()) {
                break nonce;
            }
        };

        self.set_nonce(self.own_node_id, receiver, nonce.clone(), false, now);
        Ok(nonce)
    }

    /// Stores a nonce. Any previous nonce for the same receiver is replaced.
    pub fn set_nonce(
        &mut self,
        issuer: NodeId,
        receiver: NodeId,
        nonce: S0Nonce,
        free: bool,
        now: Instant,
    ) {
        let key = NonceKey {
            issuer,
            nonce_id: nonce.id(),
        };

        self.nonce_store
            .retain(|k, e| !(k.issuer == issuer && e.receiver == receiver));
        self.nonce_store.insert(
            key,
            NonceEntry {
                nonce,
                receiver,
                expires: now + self.nonce_lifetime,
            },
        );

        if free {
            self.free_nonces.insert(issuer, key);
        }
    }

    /// Drops all nonces whose validity window has passed
    pub fn expire_nonces(&mut self, now: Instant) {
        self.nonce_store.retain(|_, e| e.expires > now);
        let store = &self.nonce_store;
        self.free_nonces.retain(|_, key| store.contains_key(key));
    }

    /// Retrieves (and consumes) a nonce we issued ourselves
    pub fn try_get_own_nonce(&mut self, nonce_id: u8, now: Instant) -> Option<S0Nonce> {
        self.try_get_nonce(self.own_node_id, nonce_id, now)
    }

    /// Retrieves (and consumes) a specific nonce issued by the given node
    pub fn try_get_nonce(&mut self, issuer: NodeId, nonce_id: u8, now: Instant) -> Option<S0Nonce> {
        let key = NonceKey { issuer, nonce_id };
        if self.free_nonces.get(&issuer) == Some(&key) {
            self.free_nonces.remove(&issuer);
        }
        let entry = self.nonce_store.remove(&key)?;
        (entry.expires > now).then_some(entry.nonce)
    }

    /// Claims (and consumes) a nonce the given node sent us that is not reserved for a specific message
    pub fn try_claim_nonce(&mut self, issuer: NodeId, now: Instant) -> Option<S0Nonce> {
        let key = self.free_nonces.remove(&issuer)?;
        let entry = self.nonce_store.remove(&key)?;
        (entry.expires > now).then_some(entry.nonce)
    }

    /// The number of nonces that are currently stored, including expired ones
    pub fn nonce_count(&self) -> usize {
        self.nonce_store.len()
    }
}
