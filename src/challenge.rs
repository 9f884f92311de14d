//! Random-linear-combination challenges.
//!
//! Several layers compress many vectors into a few by taking random linear
//! combinations.  The coefficient matrix (`nb_combinations × nb_coefficients`)
//! is derived from an XOF stream in one of three formats:
//!
//! * **powers**: one element `γₖ` per combination, coefficients
//!   `γₖ, γₖ², …`;
//! * **uniform**: every coefficient sampled independently;
//! * **hybrid**: a uniform `nb_combinations × (nb_combinations+1)` matrix
//!   multiplied by `nb_combinations+1` power vectors starting at 1.
//!
//! Powers is the cheapest to sample and loses `log₂(nb_coefficients)` bits of
//! soundness per combination; hybrid recovers most of the uniform security at
//! a sampling cost independent of `nb_coefficients`.

use serde::{Deserialize, Serialize};

use crate::codec::FieldCodec;
use crate::hash::XofStream;
use crate::Field;

/// Format of a random-linear-combination challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeMode {
    /// Successive powers of one random element per combination.
    Powers,
    /// Independent uniform coefficients.
    #[default]
    Uniform,
    /// Uniform combination of `nb_combinations + 1` power vectors.
    Hybrid,
}

impl ChallengeMode {
    /// Number of field elements drawn from the stream.
    pub fn nb_samples(self, nb_combinations: usize, nb_coefficients: usize) -> usize {
        match self {
            ChallengeMode::Powers => nb_combinations,
            ChallengeMode::Uniform => nb_combinations * nb_coefficients,
            ChallengeMode::Hybrid => (nb_combinations + 1) * (nb_combinations + 1),
        }
    }

    /// Bits of soundness of one batching step in a field of order `p`.
    pub fn soundness_bits(self, p: u64, nb_combinations: usize, nb_coefficients: usize) -> f64 {
        let order = p as f64;
        let combos = nb_combinations as f64;
        let coeffs = nb_coefficients as f64;
        match self {
            ChallengeMode::Powers => combos * (order / coeffs).log2(),
            ChallengeMode::Uniform => combos * order.log2(),
            ChallengeMode::Hybrid => {
                combos * order.log2() - (1.0 + coeffs.powf(combos + 1.0) / order).log2()
            }
        }
    }
}

/// Draws an `nb_combinations × nb_coefficients` challenge matrix from `stream`.
pub fn derive_rlc<S: XofStream + ?Sized>(
    field: &Field,
    stream: &mut S,
    mode: ChallengeMode,
    nb_combinations: usize,
    nb_coefficients: usize,
) -> Vec<Vec<u64>> {
    let codec = FieldCodec::new(*field);
    let gamma = codec.sample(stream, mode.nb_samples(nb_combinations, nb_coefficients));
    match mode {
        ChallengeMode::Powers => gamma
            .iter()
            .map(|&alea| {
                let mut row = field.powers(alea, nb_coefficients + 1);
                row.remove(0);
                row
            })
            .collect(),
        ChallengeMode::Uniform => {
            if nb_coefficients == 0 {
                return vec![Vec::new(); nb_combinations];
            }
            gamma
                .chunks(nb_coefficients)
                .map(|chunk| chunk.to_vec())
                .collect()
        }
        ChallengeMode::Hybrid => {
            let width = nb_combinations + 1;
            let (mixing, bases) = gamma.split_at(nb_combinations * width);
            let powers: Vec<Vec<u64>> = bases
                .iter()
                .map(|&alea| field.powers(alea, nb_coefficients))
                .collect();
            mixing
                .chunks(width)
                .map(|weights| {
                    (0..nb_coefficients)
                        .map(|i| {
                            weights
                                .iter()
                                .zip(&powers)
                                .fold(0, |acc, (&w, pw)| field.add(acc, field.mul(w, pw[i])))
                        })
                        .collect()
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Domain, HashBackend, ShakeHasher};

    fn draw(mode: ChallengeMode) -> Vec<Vec<u64>> {
        let field = Field::new(101);
        let mut stream = ShakeHasher.xof(Domain::DecsChallenge, &[b"seed"]);
        derive_rlc(&field, &mut stream, mode, 3, 5)
    }

    #[test]
    fn shapes_match_request() {
        for mode in [
            ChallengeMode::Powers,
            ChallengeMode::Uniform,
            ChallengeMode::Hybrid,
        ] {
            let chall = draw(mode);
            assert_eq!(chall.len(), 3);
            assert!(chall.iter().all(|row| row.len() == 5));
        }
    }

    #[test]
    fn powers_rows_are_geometric() {
        let field = Field::new(101);
        for row in draw(ChallengeMode::Powers) {
            let g = row[0];
            for k in 1..row.len() {
                assert_eq!(row[k], field.mul(row[k - 1], g));
            }
        }
    }

    #[test]
    fn soundness_ordering() {
        let uniform = ChallengeMode::Uniform.soundness_bits(1 << 61, 2, 100);
        let powers = ChallengeMode::Powers.soundness_bits(1 << 61, 2, 100);
        let hybrid = ChallengeMode::Hybrid.soundness_bits(1 << 61, 2, 100);
        assert!(powers < hybrid && hybrid <= uniform);
    }
}
