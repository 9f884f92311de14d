//! BLAKE2b-256 binding of [`HashBackend`](super::HashBackend).
//!
//! `blake2` offers no extendable-output mode, so the stream is a counter-mode
//! expansion built here.  It is not BLAKE2X and does not interoperate with it:
//!
//! * `seed = BLAKE2b-256("SMALLWOOD_B2B_SEED" ‖ framed input)`;
//! * block `i` (from 0) is `BLAKE2b-256("SMALLWOOD_B2B_STREAM" ‖ seed ‖ le64(i))`;
//! * the output is the concatenation of blocks 0, 1, 2, …, read as one stream.

use blake2::digest::{consts::U32, Digest};

use super::{absorb_framed, Domain, HashBackend, XofStream};

type Blake2b256 = blake2::Blake2b<U32>;

const SEED_DOMAIN: &[u8] = b"SMALLWOOD_B2B_SEED";
const STREAM_DOMAIN: &[u8] = b"SMALLWOOD_B2B_STREAM";

/// BLAKE2b-256 expanded in counter mode (see the module docs) as
/// extendable-output function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Blake2bHasher;

/// Counter-mode output stream keyed by the absorbed seed.
#[derive(Debug, Clone)]
pub struct Blake2bStream {
    seed: [u8; 32],
    counter: u64,
    buffer: [u8; 32],
    offset: usize,
}

impl Blake2bStream {
    fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            seed,
            counter: 0,
            buffer: [0u8; 32],
            offset: 32,
        }
    }

    fn refill(&mut self) {
        let mut hasher = Blake2b256::new();
        hasher.update(STREAM_DOMAIN);
        hasher.update(self.seed);
        hasher.update(self.counter.to_le_bytes());
        self.buffer.copy_from_slice(&hasher.finalize());
        self.counter = self.counter.wrapping_add(1);
        self.offset = 0;
    }
}

impl XofStream for Blake2bStream {
    fn fill(&mut self, out: &mut [u8]) {
        let mut written = 0;
        while written < out.len() {
            if self.offset >= self.buffer.len() {
                self.refill();
            }
            let take = (self.buffer.len() - self.offset).min(out.len() - written);
            out[written..written + take]
                .copy_from_slice(&self.buffer[self.offset..self.offset + take]);
            self.offset += take;
            written += take;
        }
    }
}

impl HashBackend for Blake2bHasher {
    type Stream = Blake2bStream;

    fn name(&self) -> &'static str {
        "blake2b-256"
    }

    fn xof(&self, domain: Domain, parts: &[&[u8]]) -> Blake2bStream {
        let mut hasher = Blake2b256::new();
        hasher.update(SEED_DOMAIN);
        absorb_framed(domain, parts, |bytes| hasher.update(bytes));
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&hasher.finalize());
        Blake2bStream::from_seed(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_blocks_follow_the_counter() {
        let mut framed = Blake2b256::new();
        framed.update(SEED_DOMAIN);
        absorb_framed(Domain::PcsQueries, &[b"abc"], |bytes| framed.update(bytes));
        let seed = framed.finalize();
        let block = |counter: u64| {
            let mut hasher = Blake2b256::new();
            hasher.update(STREAM_DOMAIN);
            hasher.update(seed.as_slice());
            hasher.update(counter.to_le_bytes());
            hasher.finalize().to_vec()
        };
        let mut out = [0u8; 80];
        Blake2bHasher.xof(Domain::PcsQueries, &[b"abc"]).fill(&mut out);
        assert_eq!(&out[..32], &block(0)[..]);
        assert_eq!(&out[32..64], &block(1)[..]);
        assert_eq!(&out[64..], &block(2)[..16]);
    }
}
