//! Hashing collaborators.
//!
//! Every layer of the argument talks to its hash function through the
//! [`HashBackend`] trait: a domain-separated extendable-output function, a
//! fixed-size digest derived from it, and the node compression used by the
//! authenticated tree.  Two bindings ship with the crate:
//!
//! * [`ShakeHasher`]: SHAKE128 from the `sha3` crate;
//! * [`Blake2bHasher`]: BLAKE2b-256 expanded in a crate-specific counter mode.
//!
//! Inputs are framed before absorption (crate tag, one domain byte, then
//! every part prefixed by its little-endian `u64` length) so distinct call
//! sites and part boundaries can never collide.

mod blake;
mod shake;

use std::fmt;

pub use blake::{Blake2bHasher, Blake2bStream};
pub use shake::{ShakeHasher, ShakeStream};

/// Collision-resistance target, in bits, of every digest.
pub const HASH_SECURITY_BITS: usize = 128;

/// Size in bytes of every digest produced by a [`HashBackend`]:
/// `2·⌈λ/8⌉` for λ = [`HASH_SECURITY_BITS`].
pub const DIGEST_SIZE: usize = 2 * ((HASH_SECURITY_BITS + 7) / 8);

/// Fixed-size digest.
pub type Digest = [u8; DIGEST_SIZE];

/// Digest used for the padding leaves of partially filled trees.
pub const NULL_DIGEST: Digest = [0u8; DIGEST_SIZE];

const FRAME_TAG: &[u8] = b"SMALLWOOD_V1";

/// Call-site separation for every hash and XOF invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Domain {
    /// Internal node compression in the authenticated tree.
    TreeNode = 1,
    /// Hash of one DEC leaf (salted share vector).
    DecsLeaf = 2,
    /// Binding of the DEC tree root to the salt.
    DecsRoot = 3,
    /// Stream for the DEC random-linear-combination challenge.
    DecsChallenge = 4,
    /// Stream for the grinding-based DEC opening challenge.
    DecsOpening = 5,
    /// Binding of LVCS responses and associated randomness.
    LvcsBinding = 6,
    /// Stream for random LVCS query vectors.
    LvcsQueries = 7,
    /// Stream for random PCS evaluation queries.
    PcsQueries = 8,
    /// Hash of the polynomial commitment (optionally bound to a message).
    Commitment = 9,
    /// Stream for the constraint batching challenge.
    Batching = 10,
    /// Hash of the batched constraint polynomials.
    PiopTranscript = 11,
    /// Stream for the PIOP evaluation points.
    PiopQueries = 12,
}

/// Pull interface of an extendable-output stream.
pub trait XofStream {
    /// Fills `out` with the next bytes of the stream.
    fn fill(&mut self, out: &mut [u8]);

    /// Reads the next four bytes as a little-endian `u32`.
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes);
        u32::from_le_bytes(bytes)
    }
}

/// Hash, XOF and compression primitives consumed by the argument.
///
/// Implementations are injected at construction time; all schemes are
/// generic over the backend.
pub trait HashBackend: Clone + fmt::Debug + Send + Sync {
    /// Stream returned by [`HashBackend::xof`].
    type Stream: XofStream;

    /// Short human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// Absorbs the framed `parts` under `domain` and returns the output stream.
    fn xof(&self, domain: Domain, parts: &[&[u8]]) -> Self::Stream;

    /// Returns the first [`DIGEST_SIZE`] bytes of [`HashBackend::xof`].
    fn hash(&self, domain: Domain, parts: &[&[u8]]) -> Digest {
        let mut out = NULL_DIGEST;
        self.xof(domain, parts).fill(&mut out);
        out
    }

    /// Compresses the children of a tree node into the parent digest.
    fn compress(&self, children: &[Digest]) -> Digest {
        let parts: Vec<&[u8]> = children.iter().map(|c| c.as_slice()).collect();
        self.hash(Domain::TreeNode, &parts)
    }
}

/// Feeds the framed encoding of `(domain, parts)` into `absorb`.
pub(crate) fn absorb_framed(domain: Domain, parts: &[&[u8]], mut absorb: impl FnMut(&[u8])) {
    absorb(FRAME_TAG);
    absorb(&[domain as u8]);
    absorb(&(parts.len() as u64).to_le_bytes());
    for part in parts {
        absorb(&(part.len() as u64).to_le_bytes());
        absorb(part);
    }
}

/// Lowercase hex rendering of a digest, for logs and JSON.
pub fn digest_to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_backend<H: HashBackend>(hasher: H) {
        let a = hasher.hash(Domain::DecsLeaf, &[b"ab", b"c"]);
        let b = hasher.hash(Domain::DecsLeaf, &[b"a", b"bc"]);
        let c = hasher.hash(Domain::DecsRoot, &[b"ab", b"c"]);
        assert_ne!(a, b, "part boundaries must be framed");
        assert_ne!(a, c, "domains must separate");
        assert_eq!(a, hasher.hash(Domain::DecsLeaf, &[b"ab", b"c"]));

        let mut long = vec![0u8; 100];
        hasher.xof(Domain::Batching, &[b"seed"]).fill(&mut long);
        assert_eq!(&long[..DIGEST_SIZE], &hasher.hash(Domain::Batching, &[b"seed"])[..]);

        let mut stream = hasher.xof(Domain::Batching, &[b"seed"]);
        let mut first = [0u8; 40];
        let mut second = [0u8; 60];
        stream.fill(&mut first);
        stream.fill(&mut second);
        assert_eq!(&long[..40], &first[..]);
        assert_eq!(&long[40..], &second[..]);

        let parent = hasher.compress(&[a, b]);
        assert_ne!(parent, hasher.compress(&[b, a]));
    }

    #[test]
    fn shake_backend_behaves() {
        check_backend(ShakeHasher);
    }

    #[test]
    fn blake_backend_behaves() {
        check_backend(Blake2bHasher);
    }

    #[test]
    fn digests_cover_the_security_level() {
        assert_eq!(DIGEST_SIZE, 32);
        assert!(8 * DIGEST_SIZE >= 2 * HASH_SECURITY_BITS);
    }

    #[test]
    fn backends_disagree() {
        assert_ne!(
            ShakeHasher.hash(Domain::Commitment, &[b"x"]),
            Blake2bHasher.hash(Domain::Commitment, &[b"x"])
        );
        assert_eq!(digest_to_hex(&NULL_DIGEST).len(), 64);
    }
}
