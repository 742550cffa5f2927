//! Uplink and storage-node identity keypairs.
//!
//! TLS certificate issuance is an external collaborator (§1); this module
//! only covers the signing keypair and the `NodeID` derivation that the rest
//! of the core depends on, which in the real system is "derived from the
//! node's TLS certificate" (§3). Here the public key itself stands in for
//! the certificate's public key.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 256-bit opaque node identifier (§3), derived from a node's public key.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let digest = Sha256::digest(public_key.as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// XOR distance used by the Kademlia routing table (§4.4).
    pub fn xor_distance(&self, other: &NodeId) -> [u8; 32] {
        let mut out = [0u8; 32];
        for i in 0..32 {
            out[i] = self.0[i] ^ other.0[i];
        }
        out
    }

    /// Length, in bits, of the common prefix shared with `other` — the
    /// routing-bucket index in a standard Kademlia layout.
    pub fn common_prefix_len(&self, other: &NodeId) -> u32 {
        let distance = self.xor_distance(other);
        for (i, byte) in distance.iter().enumerate() {
            if *byte != 0 {
                return (i as u32) * 8 + byte.leading_zeros();
            }
        }
        256
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// An identity keypair held by an uplink or a storage node.
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&bytes),
        }
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::from_public_key(&self.signing_key.verifying_key())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

/// Verify a message signed by `public_key`, as used for the satellite's
/// signed-message pattern that authorises an uplink to talk to a node (§4.3).
pub fn verify(public_key: &VerifyingKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trips() {
        let identity = Identity::generate();
        let message = b"authorize upload";
        let signature = identity.sign(message);
        assert!(verify(&identity.verifying_key(), message, &signature));
    }

    #[test]
    fn common_prefix_len_is_256_for_identical_ids() {
        let a = NodeId([7u8; 32]);
        assert_eq!(a.common_prefix_len(&a), 256);
    }

    #[test]
    fn common_prefix_len_is_zero_when_top_bit_differs() {
        let a = NodeId([0u8; 32]);
        let mut b = [0u8; 32];
        b[0] = 0x80;
        assert_eq!(a.common_prefix_len(&NodeId(b)), 0);
    }
}
