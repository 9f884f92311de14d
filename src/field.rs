//! Prime-field arithmetic on `u64` residues.
//!
//! Every layer of the argument (witness values, share vectors, query
//! coefficients, challenges) works with plain `u64` residues modulo one odd
//! prime below `2^63`.  [`Field`] carries the modulus; every operation
//! reduces its inputs first, so unreduced values are accepted anywhere.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prime field `F_p` for an odd prime `p < 2^63`.
///
/// Primality is not checked.  With a composite modulus [`Field::inv`] panics
/// on non-units and the soundness estimates are meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    p: u64,
}

impl Field {
    /// Creates a new finite field with the given modulus.
    ///
    /// # Panics
    ///
    /// Panics if the modulus is less than 3, even, or does not fit in 63
    /// bits.  Only odd primes are supported.
    pub fn new(p: u64) -> Self {
        assert!(p >= 3 && p % 2 == 1, "p must be an odd prime >= 3");
        assert!(p < 1 << 63, "p must fit in 63 bits");
        Field { p }
    }

    /// Returns the modulus of the field.
    #[inline]
    pub fn modulus(&self) -> u64 {
        self.p
    }

    /// Number of bits needed to write any element, `⌈log₂ p⌉`.
    #[inline]
    pub fn bit_size(&self) -> u32 {
        64 - (self.p - 1).leading_zeros()
    }

    /// Maps an integer index onto the field, `i mod p`.
    #[inline]
    pub fn elem(&self, i: usize) -> u64 {
        (i as u64) % self.p
    }

    /// Adds two field elements.
    #[inline]
    pub fn add(&self, a: u64, b: u64) -> u64 {
        let mut s = (a % self.p) + (b % self.p);
        if s >= self.p {
            s -= self.p;
        }
        s
    }

    /// Subtracts `b` from `a`.
    #[inline]
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        let a = a % self.p;
        let b = b % self.p;
        if a >= b {
            a - b
        } else {
            self.p - (b - a)
        }
    }

    /// Returns the additive inverse of `a`.
    #[inline]
    pub fn neg(&self, a: u64) -> u64 {
        self.sub(0, a)
    }

    /// Multiplies two field elements.
    #[inline]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        let a = a % self.p;
        let b = b % self.p;
        ((a as u128 * b as u128) % self.p as u128) as u64
    }

    /// Computes the multiplicative inverse of `a`.
    ///
    /// # Panics
    ///
    /// Panics if `a` is zero modulo `p`.  In a prime field, every non-zero
    /// element has a unique inverse.
    #[inline]
    pub fn inv(&self, a: u64) -> u64 {
        let a = a % self.p;
        assert!(a != 0, "cannot invert zero");
        // Fermat: a^(p-2) mod p
        self.pow(a, self.p - 2)
    }

    /// Divides `a` by `b`.
    #[inline]
    pub fn div(&self, a: u64, b: u64) -> u64 {
        self.mul(a, self.inv(b))
    }

    /// Exponentiates `a` by `e` modulo `p`.
    #[inline]
    pub fn pow(&self, mut a: u64, mut e: u64) -> u64 {
        a %= self.p;
        let mut result = 1u64;
        while e > 0 {
            if e & 1 == 1 {
                result = self.mul(result, a);
            }
            a = self.mul(a, a);
            e >>= 1;
        }
        result
    }

    /// Returns `[1, x, x², …, x^{n-1}]`.
    pub fn powers(&self, x: u64, n: usize) -> Vec<u64> {
        let mut out = Vec::with_capacity(n);
        let mut acc = 1 % self.p;
        for _ in 0..n {
            out.push(acc);
            acc = self.mul(acc, x);
        }
        out
    }

    /// Inner product `Σ aᵢ·bᵢ` over the shorter of the two slices.
    pub fn dot(&self, a: &[u64], b: &[u64]) -> u64 {
        a.iter()
            .zip(b)
            .fold(0u64, |acc, (&x, &y)| self.add(acc, self.mul(x, y)))
    }

    /// Samples a uniformly random element of the field.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(0..self.p)
    }

    /// Samples `n` independent uniformly random elements.
    pub fn sample_vec<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<u64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}
