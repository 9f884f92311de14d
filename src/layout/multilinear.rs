//! Multilinear polynomials laid out as evaluation tables.
//!
//! The first `row_vars` variables select the row and the remaining ones the
//! column: entry `b = row + col·2^row_vars` of the table of polynomial `k`
//! lands in `rows[row][k·width + col]`.  Evaluating at `z` is then one LVCS
//! query (the Lagrange weights of the row variables) followed by a dot
//! product with the Lagrange weights of the column variables.

use rand::RngCore;

use super::{EvalQuery, EvalResponse, Layout, LayoutInput, LvcsQueries};
use crate::error::{Error, Result};
use crate::multilinear::lagrange_weights;
use crate::Field;

/// Layout for multilinear polynomials over the same number of variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultilinearLayout {
    num_vars: usize,
    nb_polys: usize,
    row_vars: usize,
}

impl MultilinearLayout {
    /// `nb_polys` polynomials in `num_vars` variables, the first `row_vars`
    /// of which index rows.
    pub fn new(num_vars: usize, nb_polys: usize, row_vars: usize) -> Result<Self> {
        if nb_polys == 0 || row_vars > num_vars || num_vars >= usize::BITS as usize {
            return Err(Error::Config(format!(
                "cannot lay out {nb_polys} polynomials in {num_vars} variables over 2^{row_vars} rows"
            )));
        }
        Ok(Self {
            num_vars,
            nb_polys,
            row_vars,
        })
    }

    /// Number of table columns per polynomial.
    fn width(&self) -> usize {
        1 << (self.num_vars - self.row_vars)
    }

    fn point<'q>(&self, query: &'q EvalQuery) -> Option<&'q [u64]> {
        match query {
            EvalQuery::Multilinear(point) if point.len() == self.num_vars => Some(point),
            _ => None,
        }
    }
}

/// Lagrange weights of the column variables and the first column with a
/// non-zero weight.
fn column_weights(field: &Field, point: &[u64]) -> Option<(Vec<u64>, usize)> {
    let weights = lagrange_weights(field, point);
    let pivot = weights.iter().position(|&w| w != 0)?;
    Some((weights, pivot))
}

impl Layout for MultilinearLayout {
    fn row_length(&self) -> usize {
        self.nb_polys * self.width()
    }

    fn nb_rows(&self) -> usize {
        1 << self.row_vars
    }

    fn nb_lvcs_queries(&self) -> usize {
        1
    }

    fn query_size(&self) -> usize {
        self.num_vars
    }

    fn query_from_elements(&self, elements: &[u64]) -> Option<EvalQuery> {
        (elements.len() == self.num_vars).then(|| EvalQuery::Multilinear(elements.to_vec()))
    }

    fn check_query(&self, query: &EvalQuery) -> bool {
        self.point(query).is_some()
    }

    fn to_rows(&self, _field: &Field, input: &LayoutInput, _rng: &mut dyn RngCore) -> Result<Vec<Vec<u64>>> {
        let LayoutInput::Multilinear(polys) = input else {
            return Err(Error::Shape("multilinear layout expects multilinear polynomials".into()));
        };
        if polys.len() != self.nb_polys || polys.iter().any(|p| p.num_vars() != self.num_vars) {
            return Err(Error::Shape(format!(
                "multilinear layout expects {} polynomials in {} variables",
                self.nb_polys, self.num_vars
            )));
        }
        let nb_rows = self.nb_rows();
        let width = self.width();
        let mut rows = vec![vec![0u64; self.row_length()]; nb_rows];
        for (k, poly) in polys.iter().enumerate() {
            for (b, &value) in poly.evaluations().iter().enumerate() {
                rows[b % nb_rows][k * width + b / nb_rows] = value;
            }
        }
        Ok(rows)
    }

    fn to_lvcs_queries(&self, field: &Field, query: &EvalQuery) -> Option<LvcsQueries> {
        let point = self.point(query)?;
        let (weights, pivot) = column_weights(field, &point[..self.row_vars])?;
        Some(LvcsQueries {
            queries: vec![weights],
            fullrank_cols: vec![pivot],
        })
    }

    fn partial_evals_size(&self) -> usize {
        self.nb_polys * (self.width() - 1)
    }

    fn to_responses(
        &self,
        field: &Field,
        query: &EvalQuery,
        lvcs_responses: &[Vec<u64>],
    ) -> Option<(EvalResponse, Vec<u64>)> {
        let point = self.point(query)?;
        let [row] = lvcs_responses else {
            return None;
        };
        if row.len() != self.row_length() {
            return None;
        }
        let (weights, pivot) = column_weights(field, &point[self.row_vars..])?;
        let mut values = Vec::with_capacity(self.nb_polys);
        let mut partial = Vec::with_capacity(self.partial_evals_size());
        for chunk in row.chunks(self.width()) {
            values.push(field.dot(chunk, &weights));
            partial.extend(
                chunk
                    .iter()
                    .enumerate()
                    .filter(|&(col, _)| col != pivot)
                    .map(|(_, &v)| v),
            );
        }
        Some((EvalResponse::Multilinear(values), partial))
    }

    fn to_lvcs_responses(
        &self,
        field: &Field,
        query: &EvalQuery,
        response: &EvalResponse,
        partial_evals: &[u64],
    ) -> Option<Vec<Vec<u64>>> {
        let point = self.point(query)?;
        let EvalResponse::Multilinear(values) = response else {
            return None;
        };
        if values.len() != self.nb_polys || partial_evals.len() != self.partial_evals_size() {
            return None;
        }
        let (weights, pivot) = column_weights(field, &point[self.row_vars..])?;
        let width = self.width();
        let mut row = Vec::with_capacity(self.row_length());
        for (k, &value) in values.iter().enumerate() {
            let mut rest = value;
            let mut chunk = Vec::with_capacity(width);
            let mut others = partial_evals[k * (width - 1)..(k + 1) * (width - 1)].iter();
            for (col, &w) in weights.iter().enumerate() {
                if col == pivot {
                    chunk.push(0);
                } else {
                    let v = *others.next()?;
                    rest = field.sub(rest, field.mul(v, w));
                    chunk.push(v);
                }
            }
            chunk[pivot] = field.div(rest, weights[pivot]);
            row.extend(chunk);
        }
        Some(vec![row])
    }
}
