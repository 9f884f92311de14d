//! Multilinear polynomial utilities.
//!
//! Multilinear polynomials are stored by their evaluations on the Boolean
//! hypercube.  Besides evaluation at arbitrary field points the module exposes
//! two tensors that the multilinear layouts use to turn an evaluation query
//! into a linear combination of committed rows: [`lagrange_weights`] for
//! evaluation tables and [`monomial_weights`] for monomial coefficients.

use crate::Field;

/// Represents an *n*-variate multilinear polynomial via its values on `{0,1}ⁿ`.
///
/// Values are stored in *little-endian* order with respect to the variable
/// index: the evaluation at `(x₀, …, x_{n-1})` lives at index
/// `x₀ + 2·x₁ + ⋯ + 2^{n-1}·x_{n-1}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultilinearPolynomial {
    num_vars: usize,
    evals: Vec<u64>,
}

impl MultilinearPolynomial {
    /// Creates a polynomial from its Boolean-hypercube evaluations.
    ///
    /// # Panics
    ///
    /// Panics if the `evaluations` length is not exactly `2^num_vars`.
    pub fn from_evaluations(num_vars: usize, evaluations: Vec<u64>) -> Self {
        let expected_len = 1usize.checked_shl(num_vars as u32).unwrap_or(0);
        assert_eq!(
            evaluations.len(),
            expected_len,
            "expected 2^num_vars evaluations"
        );
        Self {
            num_vars,
            evals: evaluations,
        }
    }

    /// Returns the number of variables.
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Returns the raw evaluation table.
    pub fn evaluations(&self) -> &[u64] {
        &self.evals
    }

    /// Evaluates the polynomial at an arbitrary field point.
    ///
    /// Folds one variable at a time starting with `x₀`, which costs
    /// `O(2ⁿ)` field operations.
    pub fn evaluate(&self, field: &Field, point: &[u64]) -> u64 {
        assert_eq!(
            point.len(),
            self.num_vars,
            "evaluation point length mismatch"
        );
        let mut layer: Vec<u64> = self.evals.iter().map(|&v| v % field.modulus()).collect();
        for &coord in point {
            let r = coord % field.modulus();
            layer = layer
                .chunks_exact(2)
                .map(|pair| field.add(field.mul(field.sub(pair[1], pair[0]), r), pair[0]))
                .collect();
        }
        layer[0]
    }

    /// Monomial coefficients, indexed like the evaluation table: entry `b`
    /// multiplies `Π_{i : bᵢ = 1} xᵢ`.
    pub fn coefficients(&self, field: &Field) -> Vec<u64> {
        let mut coeffs: Vec<u64> = self.evals.iter().map(|&v| v % field.modulus()).collect();
        for var in 0..self.num_vars {
            let bit = 1 << var;
            for b in 0..coeffs.len() {
                if b & bit != 0 {
                    coeffs[b] = field.sub(coeffs[b], coeffs[b ^ bit]);
                }
            }
        }
        coeffs
    }
}

/// Multilinear Lagrange basis at `point`, in the same little-endian order as
/// the evaluation tables: entry `b` equals `Π_i (b_i ? zᵢ : 1 - zᵢ)`.
///
/// For any table `T`, `Σ_b weights[b]·T[b]` is the multilinear extension of
/// `T` evaluated at `point`.
pub fn lagrange_weights(field: &Field, point: &[u64]) -> Vec<u64> {
    let mut weights = vec![1 % field.modulus()];
    for &z in point {
        let one_minus = field.sub(1, z);
        let mut next = Vec::with_capacity(weights.len() * 2);
        next.extend(weights.iter().map(|&w| field.mul(w, one_minus)));
        next.extend(weights.iter().map(|&w| field.mul(w, z)));
        weights = next;
    }
    weights
}

/// Tensor of the `(1, zᵢ)` factors at `point`: entry `b` equals
/// `Π_{i : bᵢ = 1} zᵢ`, so entry 0 is always 1.
///
/// For monomial coefficients `C`, `Σ_b weights[b]·C[b]` is the polynomial
/// evaluated at `point`.
pub fn monomial_weights(field: &Field, point: &[u64]) -> Vec<u64> {
    let mut weights = vec![1 % field.modulus()];
    for &z in point {
        let z = z % field.modulus();
        let scaled: Vec<u64> = weights.iter().map(|&w| field.mul(w, z)).collect();
        weights.extend(scaled);
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arbitrary_evaluation() {
        let poly = MultilinearPolynomial::from_evaluations(2, vec![0, 1, 2, 3]);
        let field = Field::new(101);
        // f(x0, x1) = x0 + 2x1
        assert_eq!(poly.evaluate(&field, &[5, 7]), 19);
        assert_eq!(poly.evaluate(&field, &[1, 0]), 1);
        assert_eq!(poly.evaluate(&field, &[0, 1]), 2);
    }

    #[test]
    fn weights_reproduce_evaluation() {
        let field = Field::new(101);
        let poly = MultilinearPolynomial::from_evaluations(3, vec![4, 8, 15, 16, 23, 42, 7, 99]);
        let point = [13, 58, 77];
        let weights = lagrange_weights(&field, &point);
        assert_eq!(weights.len(), 8);
        assert_eq!(
            field.dot(&weights, poly.evaluations()),
            poly.evaluate(&field, &point)
        );
        let total = weights.iter().fold(0, |acc, &w| field.add(acc, w));
        assert_eq!(total, 1);
    }

    #[test]
    fn coefficients_match_monomial_weights() {
        let field = Field::new(101);
        // f(x0, x1) = x0 + 2x1
        let poly = MultilinearPolynomial::from_evaluations(2, vec![0, 1, 2, 3]);
        assert_eq!(poly.coefficients(&field), vec![0, 1, 2, 0]);

        let poly = MultilinearPolynomial::from_evaluations(3, vec![4, 8, 15, 16, 23, 42, 7, 99]);
        let coeffs = poly.coefficients(&field);
        let point = [13, 58, 77];
        let weights = monomial_weights(&field, &point);
        assert_eq!(weights[0], 1);
        assert_eq!(weights[7], field.mul(field.mul(13, 58), 77));
        assert_eq!(field.dot(&weights, &coeffs), poly.evaluate(&field, &point));
    }
}
