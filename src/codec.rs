//! Byte encoding of field vectors and proof blobs.
//!
//! A vector of `n` field elements is bit-packed little-endian with
//! `⌈log₂ p⌉` bits per element and padded to a whole byte; the padding bits
//! must be zero and every element must be below `p`, so the encoding is
//! canonical.  Proofs are plain concatenations of such vectors, raw digests
//! and nonces, written with [`ProofWriter`] and consumed with [`ProofReader`].

use crate::hash::{Digest, XofStream, DIGEST_SIZE};
use crate::Field;

/// Packs and unpacks field elements for a fixed modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCodec {
    field: Field,
    bits: u32,
}

impl FieldCodec {
    /// Creates the codec for `field`.
    pub fn new(field: Field) -> Self {
        Self {
            field,
            bits: field.bit_size(),
        }
    }

    /// Field the codec encodes.
    pub fn field(&self) -> Field {
        self.field
    }

    /// Encoded size in bytes of a vector of `n` elements.
    pub fn encoded_len(&self, n: usize) -> usize {
        (n * self.bits as usize + 7) / 8
    }

    /// Appends the packed encoding of `values` to `out`.
    pub fn encode_into(&self, values: &[u64], out: &mut Vec<u8>) {
        let mut acc: u128 = 0;
        let mut filled = 0u32;
        for &value in values {
            acc |= u128::from(value % self.field.modulus()) << filled;
            filled += self.bits;
            while filled >= 8 {
                out.push(acc as u8);
                acc >>= 8;
                filled -= 8;
            }
        }
        if filled > 0 {
            out.push(acc as u8);
        }
    }

    /// Returns the packed encoding of `values`.
    pub fn encode(&self, values: &[u64]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len(values.len()));
        self.encode_into(values, &mut out);
        out
    }

    /// Decodes exactly `n` elements from `bytes`.
    ///
    /// Returns `None` if the length is wrong, an element is not reduced, or
    /// a padding bit is set.
    pub fn decode(&self, bytes: &[u8], n: usize) -> Option<Vec<u64>> {
        if bytes.len() != self.encoded_len(n) {
            return None;
        }
        let mask = (1u128 << self.bits) - 1;
        let mut out = Vec::with_capacity(n);
        let mut acc: u128 = 0;
        let mut filled = 0u32;
        let mut bytes_iter = bytes.iter();
        while out.len() < n {
            while filled < self.bits {
                acc |= u128::from(*bytes_iter.next()?) << filled;
                filled += 8;
            }
            let value = (acc & mask) as u64;
            if value >= self.field.modulus() {
                return None;
            }
            out.push(value);
            acc >>= self.bits;
            filled -= self.bits;
        }
        if acc != 0 || bytes_iter.next().is_some() {
            return None;
        }
        Some(out)
    }

    /// Draws `n` uniform field elements from an XOF stream by rejection
    /// sampling on `⌈log₂ p⌉`-bit chunks.
    pub fn sample<S: XofStream + ?Sized>(&self, stream: &mut S, n: usize) -> Vec<u64> {
        let width = ((self.bits + 7) / 8) as usize;
        let mask = if self.bits == 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        };
        let mut out = Vec::with_capacity(n);
        let mut chunk = [0u8; 8];
        while out.len() < n {
            stream.fill(&mut chunk[..width]);
            let value = u64::from_le_bytes(chunk) & mask;
            if value < self.field.modulus() {
                out.push(value);
            }
        }
        out
    }
}

/// Sequential writer for proof blobs.
#[derive(Debug, Clone)]
pub struct ProofWriter {
    codec: FieldCodec,
    bytes: Vec<u8>,
}

impl ProofWriter {
    /// Creates an empty writer for elements of `field`.
    pub fn new(field: Field) -> Self {
        Self {
            codec: FieldCodec::new(field),
            bytes: Vec::new(),
        }
    }

    /// Appends one packed vector.
    pub fn write_elements(&mut self, values: &[u64]) {
        self.codec.encode_into(values, &mut self.bytes);
    }

    /// Appends every row as its own packed vector.
    pub fn write_rows(&mut self, rows: &[Vec<u64>]) {
        for row in rows {
            self.write_elements(row);
        }
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Appends a list of digests.
    pub fn write_digests(&mut self, digests: &[Digest]) {
        for digest in digests {
            self.bytes.extend_from_slice(digest);
        }
    }

    /// Appends everything written to `other`.
    pub fn append(&mut self, other: ProofWriter) {
        self.bytes.extend(other.bytes);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the writer and returns the blob.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Sequential reader over a proof blob.
///
/// Every read returns `None` when the blob is too short or the encoding is
/// not canonical; callers turn that into a rejection.
#[derive(Debug, Clone)]
pub struct ProofReader<'a> {
    codec: FieldCodec,
    data: &'a [u8],
}

impl<'a> ProofReader<'a> {
    /// Starts reading `data` as a blob over `field`.
    pub fn new(field: Field, data: &'a [u8]) -> Self {
        Self {
            codec: FieldCodec::new(field),
            data,
        }
    }

    /// Reads `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.data.len() < n {
            return None;
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Some(head)
    }

    /// Reads a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Some(out)
    }

    /// Reads one packed vector of `n` elements.
    pub fn read_elements(&mut self, n: usize) -> Option<Vec<u64>> {
        let bytes = self.read_bytes(self.codec.encoded_len(n))?;
        self.codec.decode(bytes, n)
    }

    /// Reads `rows` packed vectors of `cols` elements each.
    pub fn read_rows(&mut self, rows: usize, cols: usize) -> Option<Vec<Vec<u64>>> {
        (0..rows).map(|_| self.read_elements(cols)).collect()
    }

    /// Reads `n` digests.
    pub fn read_digests(&mut self, n: usize) -> Option<Vec<Digest>> {
        (0..n).map(|_| self.read_array::<DIGEST_SIZE>()).collect()
    }

    /// Bytes left unread.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` once the whole blob was consumed.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Domain, HashBackend, ShakeHasher};
    use proptest::prelude::*;

    #[test]
    fn packed_sizes() {
        let codec = FieldCodec::new(Field::new(101));
        assert_eq!(codec.encoded_len(0), 0);
        assert_eq!(codec.encoded_len(1), 1);
        assert_eq!(codec.encoded_len(8), 7);
        assert_eq!(codec.encoded_len(9), 8);
    }

    #[test]
    fn decode_rejects_non_canonical() {
        let codec = FieldCodec::new(Field::new(101));
        // 7 bits: 127 is out of range
        assert!(codec.decode(&[0x7f], 1).is_none());
        // padding bit set
        assert!(codec.decode(&[0x80 | 5], 1).is_none());
        assert_eq!(codec.decode(&[5], 1), Some(vec![5]));
        assert!(codec.decode(&[5, 0], 1).is_none());
    }

    #[test]
    fn reader_tracks_position() {
        let field = Field::new(65537);
        let mut writer = ProofWriter::new(field);
        writer.write_bytes(&[9, 9]);
        writer.write_rows(&[vec![1, 2], vec![65536, 0]]);
        writer.write_digests(&[[7u8; 32]]);
        let blob = writer.into_bytes();
        let mut reader = ProofReader::new(field, &blob);
        assert_eq!(reader.read_array::<2>(), Some([9, 9]));
        assert_eq!(
            reader.read_rows(2, 2),
            Some(vec![vec![1, 2], vec![65536, 0]])
        );
        assert_eq!(reader.read_digests(1), Some(vec![[7u8; 32]]));
        assert!(reader.is_empty());
        assert!(reader.read_bytes(1).is_none());
    }

    #[test]
    fn sampling_is_deterministic_and_reduced() {
        let codec = FieldCodec::new(Field::new(101));
        let a = codec.sample(&mut ShakeHasher.xof(Domain::Batching, &[b"s"]), 50);
        let b = codec.sample(&mut ShakeHasher.xof(Domain::Batching, &[b"s"]), 50);
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| v < 101));
    }

    proptest! {
        #[test]
        fn packing_is_lossless(values in proptest::collection::vec(0u64..1_000_003, 0..40)) {
            let codec = FieldCodec::new(Field::new(1_000_003));
            let encoded = codec.encode(&values);
            prop_assert_eq!(encoded.len(), codec.encoded_len(values.len()));
            prop_assert_eq!(codec.decode(&encoded, values.len()), Some(values));
        }
    }
}
