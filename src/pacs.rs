//! Packed algebraic constraint systems (PACS).
//!
//! A PACS constrains a secret `R × C` witness matrix with
//!
//! * *parallel* constraints: polynomial relations that must vanish on every
//!   column taken separately, and
//! * *aggregated* constraints: relations evaluated on every column whose sum
//!   over all columns must vanish.
//!
//! Both kinds may depend on public per-column constants `θ` (parallel) and
//! `θ'` (aggregated).  Constants are stored constraint by constraint as a list
//! of *sub-thetas*, each a vector of `C` values, one per column; an evaluation
//! receives the values of the sub-thetas at the current column (or, inside
//! the protocol, at the current evaluation point).

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Field;

/// Public constants: `theta[constraint][sub][column]`.
pub type Theta = Vec<Vec<Vec<u64>>>;

/// Secret witness matrix.
///
/// Serializes as the bare list of rows; deserialization applies the checks of
/// [`Witness::from_rows`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u64>>", into = "Vec<Vec<u64>>")]
pub struct Witness {
    rows: Vec<Vec<u64>>,
}

impl Witness {
    /// Wraps `rows`, which must all have the same non-zero length.
    pub fn from_rows(rows: Vec<Vec<u64>>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 || rows.iter().any(|r| r.len() != width) {
            return Err(Error::Shape("witness rows must be non-empty and of equal length".into()));
        }
        Ok(Self { rows })
    }

    /// Number of rows `R`.
    pub fn nb_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns `C`.
    pub fn nb_cols(&self) -> usize {
        self.rows[0].len()
    }

    /// Witness rows.
    pub fn rows(&self) -> &[Vec<u64>] {
        &self.rows
    }

    /// Values of column `k`, top to bottom.
    pub fn column(&self, k: usize) -> Vec<u64> {
        self.rows.iter().map(|row| row[k]).collect()
    }
}

impl TryFrom<Vec<Vec<u64>>> for Witness {
    type Error = Error;

    fn try_from(rows: Vec<Vec<u64>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<Witness> for Vec<Vec<u64>> {
    fn from(witness: Witness) -> Self {
        witness.rows
    }
}

/// Values of every sub-theta at column `k`.
pub fn theta_at(theta: &[Vec<Vec<u64>>], k: usize) -> Vec<Vec<u64>> {
    theta
        .iter()
        .map(|subs| subs.iter().map(|sub| sub[k]).collect())
        .collect()
}

/// Constraint system consumed by the protocol.
pub trait Pacs: fmt::Debug + Send + Sync {
    /// Field the witness lives in.
    fn field(&self) -> Field;

    /// Number of witness rows `R`.
    fn nb_rows(&self) -> usize;

    /// Number of witness columns `C`.
    fn nb_cols(&self) -> usize;

    /// Maximal total degree of the constraints in the witness values.
    fn constraint_degree(&self) -> usize;

    /// Number of parallel constraints `m₁`.
    fn nb_parallel_constraints(&self) -> usize;

    /// Number of aggregated constraints `m₂`.
    fn nb_aggregated_constraints(&self) -> usize;

    /// Constants of the parallel constraints.
    fn theta(&self) -> Theta;

    /// Constants of the aggregated constraints.
    fn theta_prime(&self) -> Theta;

    /// Evaluates the `m₁` parallel constraints on one column of values.
    fn evaluate_parallel(&self, values: &[u64], theta: &[Vec<u64>]) -> Vec<u64>;

    /// Evaluates the `m₂` aggregated constraints on one column of values.
    fn evaluate_aggregated(&self, values: &[u64], theta_prime: &[Vec<u64>]) -> Vec<u64>;

    /// Checks `witness` directly against every constraint.
    fn test_witness(&self, witness: &Witness) -> bool {
        if witness.nb_rows() != self.nb_rows() || witness.nb_cols() != self.nb_cols() {
            return false;
        }
        let field = self.field();
        let theta = self.theta();
        let theta_prime = self.theta_prime();
        let mut sums = vec![0u64; self.nb_aggregated_constraints()];
        for k in 0..self.nb_cols() {
            let column = witness.column(k);
            let parallel = self.evaluate_parallel(&column, &theta_at(&theta, k));
            if parallel.iter().any(|&v| v % field.modulus() != 0) {
                return false;
            }
            let aggregated = self.evaluate_aggregated(&column, &theta_at(&theta_prime, k));
            for (sum, v) in sums.iter_mut().zip(aggregated) {
                *sum = field.add(*sum, v % field.modulus());
            }
        }
        sums.iter().all(|&s| s == 0)
    }
}

/// Knowledge of a chain of repeated squarings.
///
/// Each column holds `x, x², x⁴, …` (parallel constraints
/// `row[i]² - row[i+1] = 0`).  Unlinked chains only constrain the last row of
/// column 0 to the public target; linked chains additionally continue each
/// column where the previous one stopped and constrain the last row of the
/// last column, so the witness proves knowledge of `x` with
/// `x^(2^(C·(R-1))) = target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquareChain {
    field: Field,
    nb_rows: usize,
    nb_cols: usize,
    target: u64,
    linked: bool,
}

impl SquareChain {
    /// Independent chains per column; the last row of column 0 equals `target`.
    pub fn new(field: Field, nb_rows: usize, nb_cols: usize, target: u64) -> Result<Self> {
        Self::build(field, nb_rows, nb_cols, target, false)
    }

    /// One chain continued across columns; the last row of the last column
    /// equals `target`.
    pub fn linked(field: Field, nb_rows: usize, nb_cols: usize, target: u64) -> Result<Self> {
        Self::build(field, nb_rows, nb_cols, target, true)
    }

    /// Samples `x` and returns the linked instance it satisfies.
    pub fn random_instance<R: Rng + ?Sized>(
        field: Field,
        nb_rows: usize,
        nb_cols: usize,
        rng: &mut R,
    ) -> Result<(Self, Witness)> {
        let mut value = field.sample(rng);
        let mut rows = vec![vec![0u64; nb_cols]; nb_rows];
        for k in 0..nb_cols {
            for (i, row) in rows.iter_mut().enumerate() {
                if i > 0 {
                    value = field.mul(value, value);
                }
                row[k] = value;
            }
        }
        let pacs = Self::linked(field, nb_rows, nb_cols, value)?;
        Ok((pacs, Witness::from_rows(rows)?))
    }

    fn build(field: Field, nb_rows: usize, nb_cols: usize, target: u64, linked: bool) -> Result<Self> {
        if nb_rows < 2 || nb_cols == 0 {
            return Err(Error::Config(format!(
                "a square chain needs two rows and one column, got {nb_rows}×{nb_cols}"
            )));
        }
        Ok(Self {
            field,
            nb_rows,
            nb_cols,
            target: target % field.modulus(),
            linked,
        })
    }

    /// Public value the chain ends on.
    pub fn target(&self) -> u64 {
        self.target
    }

    fn unit(&self, k: usize, scale: u64) -> Vec<u64> {
        let mut v = vec![0u64; self.nb_cols];
        v[k] = scale;
        v
    }

    fn target_column(&self) -> usize {
        if self.linked {
            self.nb_cols - 1
        } else {
            0
        }
    }

    fn nb_links(&self) -> usize {
        if self.linked {
            self.nb_cols - 1
        } else {
            0
        }
    }
}

impl Pacs for SquareChain {
    fn field(&self) -> Field {
        self.field
    }

    fn nb_rows(&self) -> usize {
        self.nb_rows
    }

    fn nb_cols(&self) -> usize {
        self.nb_cols
    }

    fn constraint_degree(&self) -> usize {
        2
    }

    fn nb_parallel_constraints(&self) -> usize {
        self.nb_rows - 1
    }

    fn nb_aggregated_constraints(&self) -> usize {
        self.nb_links() + 1
    }

    fn theta(&self) -> Theta {
        vec![Vec::new(); self.nb_parallel_constraints()]
    }

    fn theta_prime(&self) -> Theta {
        let mut theta = Vec::with_capacity(self.nb_aggregated_constraints());
        for j in 0..self.nb_links() {
            theta.push(vec![self.unit(j, 1), self.unit(j + 1, 1)]);
        }
        let t = self.target_column();
        theta.push(vec![self.unit(t, 1), self.unit(t, self.target)]);
        theta
    }

    fn evaluate_parallel(&self, values: &[u64], _theta: &[Vec<u64>]) -> Vec<u64> {
        let f = &self.field;
        values
            .windows(2)
            .map(|w| f.sub(f.mul(w[0], w[0]), w[1]))
            .collect()
    }

    fn evaluate_aggregated(&self, values: &[u64], theta_prime: &[Vec<u64>]) -> Vec<u64> {
        let f = &self.field;
        let last = values[self.nb_rows - 1];
        let (links, target) = theta_prime.split_at(self.nb_links());
        let mut out: Vec<u64> = links
            .iter()
            .map(|t| f.sub(f.mul(last, t[0]), f.mul(values[0], t[1])))
            .collect();
        out.push(f.sub(f.mul(last, target[0][0]), target[0][1]));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn scenario() -> (SquareChain, Witness) {
        let pacs = SquareChain::new(Field::new(101), 3, 2, 16).unwrap();
        let witness = Witness::from_rows(vec![vec![2, 4], vec![4, 16], vec![16, 54]]).unwrap();
        (pacs, witness)
    }

    #[test]
    fn scenario_witness_satisfies_constraints() {
        let (pacs, witness) = scenario();
        assert!(pacs.test_witness(&witness));
        assert_eq!(pacs.nb_parallel_constraints(), 2);
        assert_eq!(pacs.nb_aggregated_constraints(), 1);
    }

    #[test]
    fn broken_witnesses_are_detected() {
        let (pacs, _) = scenario();
        let wrong_square = Witness::from_rows(vec![vec![2, 4], vec![5, 16], vec![16, 54]]).unwrap();
        assert!(!pacs.test_witness(&wrong_square));
        let other = SquareChain::new(Field::new(101), 3, 2, 17).unwrap();
        let (_, witness) = scenario();
        assert!(!other.test_witness(&witness));
        let narrow = Witness::from_rows(vec![vec![2], vec![4], vec![16]]).unwrap();
        assert!(!pacs.test_witness(&narrow));
    }

    #[test]
    fn linked_instances_chain_columns() {
        let field = Field::new(2_013_265_921);
        let mut rng = StdRng::seed_from_u64(9);
        let (pacs, witness) = SquareChain::random_instance(field, 3, 4, &mut rng).unwrap();
        assert!(pacs.test_witness(&witness));
        let x = witness.rows()[0][0];
        assert_eq!(pacs.target(), field.pow(x, 1 << 8));

        let mut rows = witness.rows().to_vec();
        rows[0][1] = field.add(rows[0][1], 1);
        rows[1][1] = field.mul(rows[0][1], rows[0][1]);
        rows[2][1] = field.mul(rows[1][1], rows[1][1]);
        assert!(!pacs.test_witness(&Witness::from_rows(rows).unwrap()));
    }

    #[test]
    fn ragged_witness_is_rejected() {
        assert!(Witness::from_rows(vec![vec![1, 2], vec![3]]).is_err());
        assert!(Witness::from_rows(Vec::new()).is_err());
        assert!(serde_json::from_str::<Witness>("[[1, 2], [3]]").is_err());
        let (_, witness) = scenario();
        let json = serde_json::to_string(&witness).unwrap();
        assert_eq!(json, "[[2,4],[4,16],[16,54]]");
        assert_eq!(serde_json::from_str::<Witness>(&json).unwrap(), witness);
    }
}
