//! Layouts: how committed objects are arranged as LVCS rows.
//!
//! A [`Layout`] maps an input object (a matrix, univariate polynomials,
//! multilinear polynomials in the evaluation or monomial basis, or a mix of
//! them) onto the rows of an LVCS
//! matrix, and translates between *evaluation queries* on the object and
//! linear-combination queries on the rows:
//!
//! * prover side: [`Layout::to_rows`], then [`Layout::to_lvcs_queries`] and
//!   [`Layout::to_responses`], which splits the LVCS answers into the
//!   evaluations and the *partial evaluations* carried in the proof;
//! * verifier side: [`Layout::to_lvcs_queries`] and
//!   [`Layout::to_lvcs_responses`], which rebuilds the LVCS answers from the
//!   claimed evaluations and the partial evaluations.
//!
//! Inputs, queries and responses are tagged enums so heterogeneous layouts can
//! be combined behind `Box<dyn Layout>` in a [`MultiLayout`].

mod monomial;
mod multi;
mod multilinear;
mod plain;
mod univariate;

use std::fmt;

use rand::RngCore;

use crate::error::Result;
use crate::multilinear::MultilinearPolynomial;
use crate::Field;

pub use monomial::MonomialLayout;
pub use multi::MultiLayout;
pub use multilinear::MultilinearLayout;
pub use plain::PlainLayout;
pub use univariate::UnivariateLayout;

/// Object handed to [`Layout::to_rows`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutInput {
    /// Raw rows, committed as they are.
    Rows(Vec<Vec<u64>>),
    /// Univariate polynomials as ascending coefficient vectors.
    Univariate(Vec<Vec<u64>>),
    /// Multilinear polynomials given by their hypercube evaluations.
    Multilinear(Vec<MultilinearPolynomial>),
    /// Multilinear polynomials as monomial coefficient vectors; entry `b`
    /// multiplies `Π_{i : bᵢ = 1} xᵢ`.
    MultilinearCoefficients(Vec<Vec<u64>>),
    /// One input per sub-layout of a [`MultiLayout`].
    Multi(Vec<LayoutInput>),
}

/// Evaluation query on a committed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalQuery {
    /// Linear combinations of raw rows (one vector of `nb_rows` coefficients each).
    Rows(Vec<Vec<u64>>),
    /// Evaluation points for every univariate polynomial.
    Univariate(Vec<u64>),
    /// One point of the multilinear domain.
    Multilinear(Vec<u64>),
    /// One query per sub-layout of a [`MultiLayout`].
    Multi(Vec<EvalQuery>),
}

/// Answer to an [`EvalQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalResponse {
    /// One combined row per query.
    Rows(Vec<Vec<u64>>),
    /// `values[q][j]` is polynomial `j` evaluated at point `q`.
    Univariate(Vec<Vec<u64>>),
    /// One evaluation per multilinear polynomial.
    Multilinear(Vec<u64>),
    /// One response per sub-layout of a [`MultiLayout`].
    Multi(Vec<EvalResponse>),
}

/// LVCS query vectors derived from an evaluation query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LvcsQueries {
    /// One coefficient vector of length `nb_rows` per LVCS query.
    pub queries: Vec<Vec<u64>>,
    /// Sorted row indices whose query block is invertible.
    pub fullrank_cols: Vec<usize>,
}

/// Arrangement of a committed object into LVCS rows.
pub trait Layout: fmt::Debug + Send + Sync {
    /// Length of every produced row.
    fn row_length(&self) -> usize;

    /// Number of produced rows.
    fn nb_rows(&self) -> usize;

    /// Number of LVCS queries generated per evaluation query.
    fn nb_lvcs_queries(&self) -> usize;

    /// Number of field elements needed to describe one evaluation query.
    fn query_size(&self) -> usize;

    /// Builds a query from [`Layout::query_size`] field elements.
    fn query_from_elements(&self, elements: &[u64]) -> Option<EvalQuery>;

    /// Whether `query` is admissible for this layout.
    fn check_query(&self, query: &EvalQuery) -> bool;

    /// Arranges `input` into `nb_rows` rows of `row_length` elements.
    fn to_rows(&self, field: &Field, input: &LayoutInput, rng: &mut dyn RngCore) -> Result<Vec<Vec<u64>>>;

    /// Translates an evaluation query into LVCS queries.
    fn to_lvcs_queries(&self, field: &Field, query: &EvalQuery) -> Option<LvcsQueries>;

    /// Number of partial evaluations carried in a proof.
    fn partial_evals_size(&self) -> usize;

    /// Splits LVCS responses into the evaluation response and the partial
    /// evaluations.
    fn to_responses(
        &self,
        field: &Field,
        query: &EvalQuery,
        lvcs_responses: &[Vec<u64>],
    ) -> Option<(EvalResponse, Vec<u64>)>;

    /// Rebuilds the LVCS responses from an evaluation response and the
    /// partial evaluations.
    fn to_lvcs_responses(
        &self,
        field: &Field,
        query: &EvalQuery,
        response: &EvalResponse,
        partial_evals: &[u64],
    ) -> Option<Vec<Vec<u64>>>;
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::Field;

    /// Linear combinations of `rows` with the coefficients of each query.
    pub(crate) fn combine_rows(field: &Field, rows: &[Vec<u64>], queries: &[Vec<u64>]) -> Vec<Vec<u64>> {
        queries
            .iter()
            .map(|query| {
                let mut acc = vec![0u64; rows[0].len()];
                for (row, &coeff) in rows.iter().zip(query) {
                    crate::poly::add_scaled(field, &mut acc, row, coeff);
                }
                acc
            })
            .collect()
    }
}
