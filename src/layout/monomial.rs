//! Multilinear polynomials laid out by their monomial coefficients.
//!
//! Coefficient `b` of polynomial `k` multiplies `Π_{i : bᵢ = 1} xᵢ` and lands
//! in `rows[b mod 2^row_vars][k·width + b / 2^row_vars]`, the arrangement of
//! [`MultilinearLayout`](super::MultilinearLayout).  Queries are the tensors
//! of the `(1, zᵢ)` factors of the row and column variables.  Both start with
//! 1, so row 0 and column 0 always serve as pivots and no division is needed.

use rand::RngCore;

use super::{EvalQuery, EvalResponse, Layout, LayoutInput, LvcsQueries};
use crate::error::{Error, Result};
use crate::multilinear::monomial_weights;
use crate::Field;

/// Layout for multilinear polynomials in the monomial basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonomialLayout {
    num_vars: usize,
    nb_polys: usize,
    row_vars: usize,
}

impl MonomialLayout {
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

    fn width(&self) -> usize {
        1 << (self.num_vars - self.row_vars)
    }

    fn point<'q>(&self, query: &'q EvalQuery) -> Option<&'q [u64]> {
        match query {
            EvalQuery::Multilinear(point) if point.len() == self.num_vars => Some(point),
            _ => None,
        }
    }

    fn coefficient_tables(&self, field: &Field, input: &LayoutInput) -> Result<Vec<Vec<u64>>> {
        let size = 1usize << self.num_vars;
        let tables: Vec<Vec<u64>> = match input {
            LayoutInput::MultilinearCoefficients(coeffs) if coeffs.iter().all(|c| c.len() == size) => coeffs
                .iter()
                .map(|c| c.iter().map(|&v| v % field.modulus()).collect())
                .collect(),
            LayoutInput::Multilinear(polys) if polys.iter().all(|p| p.num_vars() == self.num_vars) => {
                polys.iter().map(|p| p.coefficients(field)).collect()
            }
            _ => Vec::new(),
        };
        if tables.len() != self.nb_polys {
            return Err(Error::Shape(format!(
                "monomial layout expects {} multilinear polynomials in {} variables",
                self.nb_polys, self.num_vars
            )));
        }
        Ok(tables)
    }
}

impl Layout for MonomialLayout {
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

    fn to_rows(&self, field: &Field, input: &LayoutInput, _rng: &mut dyn RngCore) -> Result<Vec<Vec<u64>>> {
        let tables = self.coefficient_tables(field, input)?;
        let nb_rows = self.nb_rows();
        let width = self.width();
        let mut rows = vec![vec![0u64; self.row_length()]; nb_rows];
        for (k, table) in tables.iter().enumerate() {
            for (b, &coeff) in table.iter().enumerate() {
                rows[b % nb_rows][k * width + b / nb_rows] = coeff;
            }
        }
        Ok(rows)
    }

    fn to_lvcs_queries(&self, field: &Field, query: &EvalQuery) -> Option<LvcsQueries> {
        let point = self.point(query)?;
        Some(LvcsQueries {
            queries: vec![monomial_weights(field, &point[..self.row_vars])],
            fullrank_cols: vec![0],
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
        let weights = monomial_weights(field, &point[self.row_vars..]);
        let mut values = Vec::with_capacity(self.nb_polys);
        let mut partial = Vec::with_capacity(self.partial_evals_size());
        for chunk in row.chunks(self.width()) {
            values.push(field.dot(chunk, &weights));
            partial.extend_from_slice(&chunk[1..]);
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
        let weights = monomial_weights(field, &point[self.row_vars..]);
        let step = self.width() - 1;
        let mut row = Vec::with_capacity(self.row_length());
        for (k, &value) in values.iter().enumerate() {
            let others = &partial_evals[k * step..(k + 1) * step];
            let tail = field.dot(others, &weights[1..]);
            row.push(field.sub(value, tail));
            row.extend_from_slice(others);
        }
        Some(vec![row])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::combine_rows;
    use crate::multilinear::MultilinearPolynomial;
    use rand::{rngs::StdRng, SeedableRng};

    const P: u64 = 2_013_265_921;

    #[test]
    fn responses_are_evaluations() {
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(21);
        let layout = MonomialLayout::new(4, 2, 1).unwrap();
        let polys: Vec<MultilinearPolynomial> = (0..2)
            .map(|_| MultilinearPolynomial::from_evaluations(4, field.sample_vec(&mut rng, 16)))
            .collect();
        let rows = layout
            .to_rows(&field, &LayoutInput::Multilinear(polys.clone()), &mut rng)
            .unwrap();
        assert_eq!((rows.len(), rows[0].len()), (2, 16));

        let point = field.sample_vec(&mut rng, 4);
        let query = EvalQuery::Multilinear(point.clone());
        let lvcs = layout.to_lvcs_queries(&field, &query).unwrap();
        assert_eq!(lvcs.queries, vec![vec![1, point[0]]]);
        let lvcs_responses = combine_rows(&field, &rows, &lvcs.queries);
        let (response, partial) = layout.to_responses(&field, &query, &lvcs_responses).unwrap();
        let expected: Vec<u64> = polys.iter().map(|p| p.evaluate(&field, &point)).collect();
        assert_eq!(response, EvalResponse::Multilinear(expected));
        assert_eq!(partial.len(), layout.partial_evals_size());
        assert_eq!(
            layout.to_lvcs_responses(&field, &query, &response, &partial),
            Some(lvcs_responses)
        );
    }

    #[test]
    fn coefficient_input_places_monomials() {
        let field = Field::new(101);
        let mut rng = StdRng::seed_from_u64(2);
        let layout = MonomialLayout::new(2, 1, 1).unwrap();
        // f(x0, x1) = 3 + 5·x0 + 7·x1 + 9·x0·x1
        let input = LayoutInput::MultilinearCoefficients(vec![vec![3, 5, 7, 9]]);
        let rows = layout.to_rows(&field, &input, &mut rng).unwrap();
        assert_eq!(rows, vec![vec![3, 7], vec![5, 9]]);
        let from_evals = LayoutInput::Multilinear(vec![MultilinearPolynomial::from_evaluations(
            2,
            vec![3, 8, 10, 24],
        )]);
        assert_eq!(layout.to_rows(&field, &from_evals, &mut rng).unwrap(), rows);

        // zero coordinates still leave row 0 and column 0 as pivots
        let query = EvalQuery::Multilinear(vec![0, 0]);
        let lvcs = layout.to_lvcs_queries(&field, &query).unwrap();
        assert_eq!(lvcs.fullrank_cols, vec![0]);
        let lvcs_responses = combine_rows(&field, &rows, &lvcs.queries);
        let (response, partial) = layout.to_responses(&field, &query, &lvcs_responses).unwrap();
        assert_eq!(response, EvalResponse::Multilinear(vec![3]));
        assert_eq!(partial, vec![7]);
        assert_eq!(
            layout.to_lvcs_responses(&field, &query, &response, &partial),
            Some(lvcs_responses)
        );
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let field = Field::new(101);
        let mut rng = StdRng::seed_from_u64(3);
        let layout = MonomialLayout::new(3, 1, 2).unwrap();
        assert!(!layout.check_query(&EvalQuery::Multilinear(vec![1, 2])));
        assert!(!layout.check_query(&EvalQuery::Univariate(vec![1, 2, 3])));
        let short = LayoutInput::MultilinearCoefficients(vec![vec![1; 4]]);
        assert!(layout.to_rows(&field, &short, &mut rng).is_err());
        let twice = LayoutInput::MultilinearCoefficients(vec![vec![1; 8], vec![2; 8]]);
        assert!(layout.to_rows(&field, &twice, &mut rng).is_err());
        assert!(layout.to_rows(&field, &LayoutInput::Rows(vec![vec![1; 2]; 4]), &mut rng).is_err());
        assert!(MonomialLayout::new(1, 1, 2).is_err());
    }
}
