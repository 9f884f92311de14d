//! SHAKE128 binding of [`HashBackend`](super::HashBackend).
//!
//! Digests are the first [`DIGEST_SIZE`](super::DIGEST_SIZE) bytes of the
//! stream, `2·⌈λ/8⌉` for the fixed level λ =
//! [`HASH_SECURITY_BITS`](super::HASH_SECURITY_BITS).  Targeting a higher
//! level means raising that constant, which changes every proof format.

use std::fmt;

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Shake128, Shake128Reader};

use super::{absorb_framed, Domain, HashBackend, XofStream};

/// SHAKE128 as extendable-output function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShakeHasher;

/// Squeezing side of a SHAKE128 invocation.
pub struct ShakeStream(Shake128Reader);

impl fmt::Debug for ShakeStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShakeStream").finish_non_exhaustive()
    }
}

impl XofStream for ShakeStream {
    fn fill(&mut self, out: &mut [u8]) {
        self.0.read(out);
    }
}

impl HashBackend for ShakeHasher {
    type Stream = ShakeStream;

    fn name(&self) -> &'static str {
        "shake128"
    }

    fn xof(&self, domain: Domain, parts: &[&[u8]]) -> ShakeStream {
        let mut hasher = Shake128::default();
        absorb_framed(domain, parts, |bytes| hasher.update(bytes));
        ShakeStream(hasher.finalize_xof())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_debug_hides_sponge_state() {
        let stream = ShakeHasher.xof(Domain::Commitment, &[b"x"]);
        assert_eq!(format!("{stream:?}"), "ShakeStream { .. }");
    }
}
