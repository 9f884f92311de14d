//! Dense univariate polynomials and small linear algebra.
//!
//! Polynomials are plain coefficient vectors in ascending order: `c[i]` is the
//! coefficient of `Xⁱ`.  Besides evaluation and Lagrange interpolation the
//! module provides [`restore_from_relations`], the recovery routine shared by
//! the commitment layers and the protocol: a polynomial of known degree whose
//! top coefficients are revealed is reconstructed from linear relations of the
//! form `Σ_{v ∈ S} P(v) = value`.  A single-point relation is an ordinary
//! evaluation, a relation over the witness support expresses a vanishing sum.

use crate::Field;

/// Linear relation `Σ_{v ∈ points} P(v) = value` on a polynomial `P`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Right-hand side of the relation.
    pub value: u64,
    /// Points whose evaluations are summed.
    pub points: Vec<u64>,
}

impl Relation {
    /// Relation stating `P(point) = value`.
    pub fn evaluation(point: u64, value: u64) -> Self {
        Relation {
            value,
            points: vec![point],
        }
    }

    /// Relation stating `Σ_{v ∈ points} P(v) = value`.
    pub fn sum(points: Vec<u64>, value: u64) -> Self {
        Relation { value, points }
    }
}

/// Evaluates `coeffs` at `x` with Horner's rule.
pub fn eval(field: &Field, coeffs: &[u64], x: u64) -> u64 {
    coeffs
        .iter()
        .rev()
        .fold(0u64, |acc, &c| field.add(field.mul(acc, x), c))
}

/// Adds `scalar · poly` into `acc`, growing `acc` when `poly` is longer.
pub fn add_scaled(field: &Field, acc: &mut Vec<u64>, poly: &[u64], scalar: u64) {
    if acc.len() < poly.len() {
        acc.resize(poly.len(), 0);
    }
    for (a, &c) in acc.iter_mut().zip(poly) {
        *a = field.add(*a, field.mul(c, scalar));
    }
}

/// Schoolbook product of two polynomials.
pub fn mul(field: &Field, a: &[u64], b: &[u64]) -> Vec<u64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0u64; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x % field.modulus() == 0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] = field.add(out[i + j], field.mul(x, y));
        }
    }
    out
}

/// Resizes `coeffs` to exactly `len` coefficients.
///
/// Returns `None` if a non-zero coefficient would be dropped, that is when the
/// polynomial has degree `≥ len`.
pub fn fit_to_len(field: &Field, mut coeffs: Vec<u64>, len: usize) -> Option<Vec<u64>> {
    if coeffs.len() > len && coeffs[len..].iter().any(|&c| c % field.modulus() != 0) {
        return None;
    }
    coeffs.resize(len, 0);
    Some(coeffs)
}

/// Lagrange interpolation through `(xs[i], ys[i])`.
///
/// Returns the unique polynomial of degree `< xs.len()` as exactly
/// `xs.len()` coefficients.
///
/// # Panics
///
/// Panics if the lengths differ or two abscissae coincide.
pub fn interpolate(field: &Field, xs: &[u64], ys: &[u64]) -> Vec<u64> {
    assert_eq!(xs.len(), ys.len(), "interpolation length mismatch");
    let n = xs.len();
    if n == 0 {
        return Vec::new();
    }
    // master = Π (X - xᵢ)
    let mut master = vec![1u64];
    for &x in xs {
        let mut next = vec![0u64; master.len() + 1];
        for (k, &c) in master.iter().enumerate() {
            next[k + 1] = field.add(next[k + 1], c);
            next[k] = field.sub(next[k], field.mul(c, x));
        }
        master = next;
    }
    let mut out = vec![0u64; n];
    for (i, (&xi, &yi)) in xs.iter().zip(ys).enumerate() {
        // quotient = master / (X - xᵢ) by synthetic division
        let mut quotient = vec![0u64; n];
        let mut carry = 0u64;
        for k in (0..n).rev() {
            carry = field.add(master[k + 1], field.mul(carry, xi));
            quotient[k] = carry;
        }
        let denom = eval(field, &quotient, xi);
        assert!(denom != 0, "duplicate interpolation point at index {i}");
        let scale = field.div(yi, denom);
        for (o, q) in out.iter_mut().zip(&quotient) {
            *o = field.add(*o, field.mul(*q, scale));
        }
    }
    out
}

/// Solves `matrix · x = rhs` by Gaussian elimination.
///
/// Returns `None` if the square matrix is singular.
pub fn solve(field: &Field, mut matrix: Vec<Vec<u64>>, mut rhs: Vec<u64>) -> Option<Vec<u64>> {
    let n = rhs.len();
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return None;
    }
    for col in 0..n {
        let pivot = (col..n).find(|&r| matrix[r][col] % field.modulus() != 0)?;
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);
        let inv = field.inv(matrix[col][col]);
        for k in col..n {
            matrix[col][k] = field.mul(matrix[col][k], inv);
        }
        rhs[col] = field.mul(rhs[col], inv);
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = matrix[r][col];
            if factor == 0 {
                continue;
            }
            for k in col..n {
                let delta = field.mul(factor, matrix[col][k]);
                matrix[r][k] = field.sub(matrix[r][k], delta);
            }
            rhs[r] = field.sub(rhs[r], field.mul(factor, rhs[col]));
        }
    }
    Some(rhs)
}

/// Inverts a square matrix, returning `None` when it is singular.
pub fn invert(field: &Field, matrix: &[Vec<u64>]) -> Option<Vec<Vec<u64>>> {
    let n = matrix.len();
    let mut columns = Vec::with_capacity(n);
    for j in 0..n {
        let mut unit = vec![0u64; n];
        unit[j] = 1;
        columns.push(solve(field, matrix.to_vec(), unit)?);
    }
    // columns[j] is the j-th column of the inverse
    Some(
        (0..n)
            .map(|i| (0..n).map(|j| columns[j][i]).collect())
            .collect(),
    )
}

/// Matrix-vector product.
pub fn mat_vec(field: &Field, matrix: &[Vec<u64>], v: &[u64]) -> Vec<u64> {
    matrix.iter().map(|row| field.dot(row, v)).collect()
}

/// Reconstructs a polynomial of degree `degree` from its revealed top
/// coefficients and one relation per missing low coefficient.
///
/// `high` holds the coefficients of `X^k … X^degree` where
/// `k = relations.len()`.  Returns all `degree + 1` coefficients, or `None`
/// when the relations do not determine the low coefficients (singular
/// system) or the sizes are inconsistent.
pub fn restore_from_relations(
    field: &Field,
    relations: &[Relation],
    high: &[u64],
    degree: usize,
) -> Option<Vec<u64>> {
    let k = relations.len();
    if k + high.len() != degree + 1 {
        return None;
    }
    let mut matrix = Vec::with_capacity(k);
    let mut rhs = Vec::with_capacity(k);
    for relation in relations {
        let mut row = vec![0u64; k];
        let mut target = relation.value % field.modulus();
        for &v in &relation.points {
            let powers = field.powers(v, degree + 1);
            for (cell, &pw) in row.iter_mut().zip(&powers[..k]) {
                *cell = field.add(*cell, pw);
            }
            target = field.sub(target, field.dot(high, &powers[k..]));
        }
        matrix.push(row);
        rhs.push(target);
    }
    let mut coeffs = solve(field, matrix, rhs)?;
    coeffs.extend(high.iter().map(|&h| h % field.modulus()));
    Some(coeffs)
}
