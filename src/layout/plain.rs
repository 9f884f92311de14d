//! Identity layout: rows are committed as given.

use rand::RngCore;

use super::{EvalQuery, EvalResponse, Layout, LayoutInput, LvcsQueries};
use crate::error::{Error, Result};
use crate::Field;

/// Commits raw rows; queries are linear combinations of those rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainLayout {
    row_length: usize,
    nb_rows: usize,
    nb_queries: usize,
    fullrank_cols: Vec<usize>,
}

impl PlainLayout {
    /// `fullrank_cols` must be sorted, of length `nb_queries`, and select an
    /// invertible block of every query matrix that will be used.
    pub fn new(
        row_length: usize,
        nb_rows: usize,
        nb_queries: usize,
        fullrank_cols: Vec<usize>,
    ) -> Result<Self> {
        if fullrank_cols.len() != nb_queries
            || fullrank_cols.windows(2).any(|w| w[0] >= w[1])
            || fullrank_cols.iter().any(|&c| c >= nb_rows)
        {
            return Err(Error::Config(format!(
                "{nb_queries} sorted full-rank columns below {nb_rows} expected, got {fullrank_cols:?}"
            )));
        }
        Ok(Self {
            row_length,
            nb_rows,
            nb_queries,
            fullrank_cols,
        })
    }
}

impl Layout for PlainLayout {
    fn row_length(&self) -> usize {
        self.row_length
    }

    fn nb_rows(&self) -> usize {
        self.nb_rows
    }

    fn nb_lvcs_queries(&self) -> usize {
        self.nb_queries
    }

    fn query_size(&self) -> usize {
        self.nb_queries * self.nb_rows
    }

    fn query_from_elements(&self, elements: &[u64]) -> Option<EvalQuery> {
        (elements.len() == self.query_size()).then(|| {
            EvalQuery::Rows(elements.chunks(self.nb_rows).map(<[u64]>::to_vec).collect())
        })
    }

    fn check_query(&self, query: &EvalQuery) -> bool {
        matches!(query, EvalQuery::Rows(rows)
            if rows.len() == self.nb_queries && rows.iter().all(|r| r.len() == self.nb_rows))
    }

    fn to_rows(&self, _field: &Field, input: &LayoutInput, _rng: &mut dyn RngCore) -> Result<Vec<Vec<u64>>> {
        match input {
            LayoutInput::Rows(rows)
                if rows.len() == self.nb_rows && rows.iter().all(|r| r.len() == self.row_length) =>
            {
                Ok(rows.clone())
            }
            _ => Err(Error::Shape(format!(
                "plain layout expects {} rows of length {}",
                self.nb_rows, self.row_length
            ))),
        }
    }

    fn to_lvcs_queries(&self, _field: &Field, query: &EvalQuery) -> Option<LvcsQueries> {
        match query {
            EvalQuery::Rows(rows) if self.check_query(query) => Some(LvcsQueries {
                queries: rows.clone(),
                fullrank_cols: self.fullrank_cols.clone(),
            }),
            _ => None,
        }
    }

    fn partial_evals_size(&self) -> usize {
        0
    }

    fn to_responses(
        &self,
        _field: &Field,
        _query: &EvalQuery,
        lvcs_responses: &[Vec<u64>],
    ) -> Option<(EvalResponse, Vec<u64>)> {
        Some((EvalResponse::Rows(lvcs_responses.to_vec()), Vec::new()))
    }

    fn to_lvcs_responses(
        &self,
        _field: &Field,
        _query: &EvalQuery,
        response: &EvalResponse,
        partial_evals: &[u64],
    ) -> Option<Vec<Vec<u64>>> {
        match response {
            EvalResponse::Rows(rows) if partial_evals.is_empty() => Some(rows.clone()),
            _ => None,
        }
    }
}
