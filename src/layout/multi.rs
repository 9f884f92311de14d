//! Concatenation of layouts.
//!
//! Sub-layouts are stacked vertically: their rows are zero-padded to the
//! longest row length and their LVCS queries are zero-padded over the rows of
//! the other sub-layouts, so the combined query matrix is block diagonal.

use rand::RngCore;

use super::{EvalQuery, EvalResponse, Layout, LayoutInput, LvcsQueries};
use crate::error::{Error, Result};
use crate::Field;

/// Several layouts committed together under one LVCS.
#[derive(Debug)]
pub struct MultiLayout {
    layouts: Vec<Box<dyn Layout>>,
    row_length: usize,
    nb_rows: usize,
}

impl MultiLayout {
    /// Stacks `layouts` in order.
    pub fn new(layouts: Vec<Box<dyn Layout>>) -> Result<Self> {
        if layouts.is_empty() {
            return Err(Error::Config("multi layout needs at least one layout".into()));
        }
        let row_length = layouts.iter().map(|l| l.row_length()).max().unwrap_or(0);
        let nb_rows = layouts.iter().map(|l| l.nb_rows()).sum();
        Ok(Self {
            layouts,
            row_length,
            nb_rows,
        })
    }

    /// Stacked sub-layouts.
    pub fn layouts(&self) -> &[Box<dyn Layout>] {
        &self.layouts
    }

    fn sub_queries<'q>(&self, query: &'q EvalQuery) -> Option<&'q [EvalQuery]> {
        match query {
            EvalQuery::Multi(queries) if queries.len() == self.layouts.len() => Some(queries),
            _ => None,
        }
    }
}

impl Layout for MultiLayout {
    fn row_length(&self) -> usize {
        self.row_length
    }

    fn nb_rows(&self) -> usize {
        self.nb_rows
    }

    fn nb_lvcs_queries(&self) -> usize {
        self.layouts.iter().map(|l| l.nb_lvcs_queries()).sum()
    }

    fn query_size(&self) -> usize {
        self.layouts.iter().map(|l| l.query_size()).sum()
    }

    fn query_from_elements(&self, elements: &[u64]) -> Option<EvalQuery> {
        if elements.len() != self.query_size() {
            return None;
        }
        let mut rest = elements;
        let mut queries = Vec::with_capacity(self.layouts.len());
        for layout in &self.layouts {
            let (head, tail) = rest.split_at(layout.query_size());
            queries.push(layout.query_from_elements(head)?);
            rest = tail;
        }
        Some(EvalQuery::Multi(queries))
    }

    fn check_query(&self, query: &EvalQuery) -> bool {
        self.sub_queries(query).is_some_and(|queries| {
            self.layouts
                .iter()
                .zip(queries)
                .all(|(layout, q)| layout.check_query(q))
        })
    }

    fn to_rows(&self, field: &Field, input: &LayoutInput, rng: &mut dyn RngCore) -> Result<Vec<Vec<u64>>> {
        let inputs = match input {
            LayoutInput::Multi(inputs) if inputs.len() == self.layouts.len() => inputs,
            _ => {
                return Err(Error::Shape(format!(
                    "multi layout expects {} inputs",
                    self.layouts.len()
                )))
            }
        };
        let mut rows = Vec::with_capacity(self.nb_rows);
        for (layout, input) in self.layouts.iter().zip(inputs) {
            for mut row in layout.to_rows(field, input, rng)? {
                row.resize(self.row_length, 0);
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn to_lvcs_queries(&self, field: &Field, query: &EvalQuery) -> Option<LvcsQueries> {
        let queries = self.sub_queries(query)?;
        let mut out = LvcsQueries {
            queries: Vec::with_capacity(self.nb_lvcs_queries()),
            fullrank_cols: Vec::with_capacity(self.nb_lvcs_queries()),
        };
        let mut offset = 0;
        for (layout, q) in self.layouts.iter().zip(queries) {
            let sub = layout.to_lvcs_queries(field, q)?;
            for coeffs in sub.queries {
                let mut padded = vec![0u64; self.nb_rows];
                padded[offset..offset + coeffs.len()].copy_from_slice(&coeffs);
                out.queries.push(padded);
            }
            out.fullrank_cols
                .extend(sub.fullrank_cols.into_iter().map(|c| c + offset));
            offset += layout.nb_rows();
        }
        Some(out)
    }

    fn partial_evals_size(&self) -> usize {
        self.layouts.iter().map(|l| l.partial_evals_size()).sum()
    }

    fn to_responses(
        &self,
        field: &Field,
        query: &EvalQuery,
        lvcs_responses: &[Vec<u64>],
    ) -> Option<(EvalResponse, Vec<u64>)> {
        let queries = self.sub_queries(query)?;
        if lvcs_responses.len() != self.nb_lvcs_queries() {
            return None;
        }
        let mut rest = lvcs_responses;
        let mut responses = Vec::with_capacity(self.layouts.len());
        let mut partial = Vec::with_capacity(self.partial_evals_size());
        for (layout, q) in self.layouts.iter().zip(queries) {
            let (head, tail) = rest.split_at(layout.nb_lvcs_queries());
            rest = tail;
            let mut trimmed = Vec::with_capacity(head.len());
            for row in head {
                if row.len() != self.row_length || row[layout.row_length()..].iter().any(|&v| v != 0) {
                    return None;
                }
                trimmed.push(row[..layout.row_length()].to_vec());
            }
            let (response, sub_partial) = layout.to_responses(field, q, &trimmed)?;
            responses.push(response);
            partial.extend(sub_partial);
        }
        Some((EvalResponse::Multi(responses), partial))
    }

    fn to_lvcs_responses(
        &self,
        field: &Field,
        query: &EvalQuery,
        response: &EvalResponse,
        partial_evals: &[u64],
    ) -> Option<Vec<Vec<u64>>> {
        let queries = self.sub_queries(query)?;
        let responses = match response {
            EvalResponse::Multi(responses) if responses.len() == self.layouts.len() => responses,
            _ => return None,
        };
        if partial_evals.len() != self.partial_evals_size() {
            return None;
        }
        let mut rest = partial_evals;
        let mut out = Vec::with_capacity(self.nb_lvcs_queries());
        for ((layout, q), r) in self.layouts.iter().zip(queries).zip(responses) {
            let (head, tail) = rest.split_at(layout.partial_evals_size());
            rest = tail;
            for mut row in layout.to_lvcs_responses(field, q, r, head)? {
                row.resize(self.row_length, 0);
                out.push(row);
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::combine_rows;
    use crate::layout::{MonomialLayout, MultilinearLayout, PlainLayout, UnivariateLayout};
    use crate::multilinear::MultilinearPolynomial;
    use crate::poly;
    use rand::{rngs::StdRng, SeedableRng};

    const P: u64 = 2_013_265_921;

    fn mixed() -> MultiLayout {
        MultiLayout::new(vec![
            Box::new(UnivariateLayout::uniform(6, 3, 2, 2, 1).unwrap()),
            Box::new(MultilinearLayout::new(3, 1, 1).unwrap()),
            Box::new(PlainLayout::new(2, 2, 1, vec![0]).unwrap()),
            Box::new(MonomialLayout::new(2, 1, 1).unwrap()),
        ])
        .unwrap()
    }

    #[test]
    fn geometry_is_stacked() {
        let layout = mixed();
        assert_eq!(layout.row_length(), 4);
        assert_eq!(layout.nb_rows(), 5 + 2 + 2 + 2);
        assert_eq!(layout.nb_lvcs_queries(), 2 + 1 + 1 + 1);
        assert_eq!(layout.query_size(), 2 + 3 + 2 + 2);
    }

    #[test]
    fn mixed_objects_answer_their_queries() {
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(21);
        let layout = mixed();
        let polys: Vec<Vec<u64>> = (0..2).map(|_| field.sample_vec(&mut rng, 7)).collect();
        let table = MultilinearPolynomial::from_evaluations(3, field.sample_vec(&mut rng, 8));
        let plain = vec![vec![1, 2], vec![3, 4]];
        let input = LayoutInput::Multi(vec![
            LayoutInput::Univariate(polys.clone()),
            LayoutInput::Multilinear(vec![table.clone()]),
            LayoutInput::Rows(plain),
            // 3 + 5·x0 + 7·x1 + 9·x0·x1
            LayoutInput::MultilinearCoefficients(vec![vec![3, 5, 7, 9]]),
        ]);
        let rows = layout.to_rows(&field, &input, &mut rng).unwrap();

        let query = layout
            .query_from_elements(&[5, 8, 2, 3, 4, 10, 1, 6, 7])
            .unwrap();
        assert!(layout.check_query(&query));
        let lvcs = layout.to_lvcs_queries(&field, &query).unwrap();
        assert!(lvcs.fullrank_cols.windows(2).all(|w| w[0] < w[1]));
        let lvcs_responses = combine_rows(&field, &rows, &lvcs.queries);
        let (response, partial) = layout.to_responses(&field, &query, &lvcs_responses).unwrap();

        let EvalResponse::Multi(parts) = &response else {
            panic!("unexpected response kind");
        };
        let expected_uni: Vec<Vec<u64>> = [5u64, 8]
            .iter()
            .map(|&x| polys.iter().map(|p| poly::eval(&field, p, x)).collect())
            .collect();
        assert_eq!(parts[0], EvalResponse::Univariate(expected_uni));
        assert_eq!(
            parts[1],
            EvalResponse::Multilinear(vec![table.evaluate(&field, &[2, 3, 4])])
        );
        assert_eq!(parts[2], EvalResponse::Rows(vec![vec![10 + 3, 2 * 10 + 4]]));
        assert_eq!(parts[3], EvalResponse::Multilinear(vec![3 + 5 * 6 + 7 * 7 + 9 * 42]));
        assert_eq!(
            layout.to_lvcs_responses(&field, &query, &response, &partial),
            Some(lvcs_responses)
        );
    }
}
