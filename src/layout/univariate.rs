//! Univariate polynomials split into columns of a stacked matrix.
//!
//! A polynomial of degree `d` is cut into `ν = ⌈(d + 1 - nq) / μ⌉` *unit*
//! polynomials of degree below `U = μ + nq`, where `μ` is the column size and
//! `nq` the number of evaluation queries.  Consecutive units overlap on `nq`
//! random coefficients that cancel when the units are recombined, so the
//! values of the units at a query point reveal nothing beyond `P(r)`.  The
//! last unit is shifted up so that its top coefficient sits at `X^(U-1)`: the
//! degree bound of the LVCS rows then enforces `deg P ≤ d`.
//!
//! Units are the columns of a `U × Σν` matrix, folded into `β` stacked blocks
//! of `⌈Σν / β⌉` columns each.

use rand::RngCore;

use super::{EvalQuery, EvalResponse, Layout, LayoutInput, LvcsQueries};
use crate::error::{Error, Result};
use crate::Field;

/// Stacked layout for univariate polynomials of individual degree bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnivariateLayout {
    degrees: Vec<usize>,
    column_size: usize,
    nb_queries: usize,
    beta: usize,
    split_factors: Vec<usize>,
    exponents: Vec<Vec<i64>>,
    unstacked_rows: usize,
    unstacked_cols: usize,
    row_length: usize,
}

impl UnivariateLayout {
    /// Layout for polynomials of degree at most `degrees[j]`, split in
    /// columns of `column_size` coefficients, answering `nb_queries`
    /// evaluation points, folded into `beta` blocks.
    pub fn new(degrees: Vec<usize>, column_size: usize, nb_queries: usize, beta: usize) -> Result<Self> {
        if degrees.is_empty() || column_size == 0 || nb_queries == 0 || beta == 0 {
            return Err(Error::Config(
                "univariate layout needs polynomials, a column size, queries and at least one block"
                    .into(),
            ));
        }
        if let Some(&degree) = degrees.iter().find(|&&d| d < nb_queries) {
            return Err(Error::Config(format!(
                "degree {degree} cannot hide {nb_queries} evaluations"
            )));
        }
        let unstacked_rows = column_size + nb_queries;
        let split_factors: Vec<usize> = degrees
            .iter()
            .map(|&d| (d + 1 - nb_queries + column_size - 1) / column_size)
            .collect();
        let exponents = degrees
            .iter()
            .zip(&split_factors)
            .map(|(&d, &nu)| {
                let mut exps: Vec<i64> = (0..nu - 1).map(|k| (k * column_size) as i64).collect();
                // last unit is multiplied by X^(U-1-last_degree)
                exps.push(d as i64 - (unstacked_rows as i64 - 1));
                exps
            })
            .collect();
        let unstacked_cols: usize = split_factors.iter().sum();
        let row_length = (unstacked_cols + beta - 1) / beta;
        Ok(Self {
            degrees,
            column_size,
            nb_queries,
            beta,
            split_factors,
            exponents,
            unstacked_rows,
            unstacked_cols,
            row_length,
        })
    }

    /// `nb_polys` polynomials sharing the same degree bound.
    pub fn uniform(
        degree: usize,
        column_size: usize,
        nb_polys: usize,
        nb_queries: usize,
        beta: usize,
    ) -> Result<Self> {
        Self::new(vec![degree; nb_polys], column_size, nb_queries, beta)
    }

    /// Degree bound of each polynomial.
    pub fn degrees(&self) -> &[usize] {
        &self.degrees
    }

    /// Number of unit polynomials each polynomial is split into.
    pub fn split_factors(&self) -> &[usize] {
        &self.split_factors
    }

    /// Whether some evaluation needs the query point to be invertible.
    fn needs_nonzero_points(&self) -> bool {
        self.exponents.iter().any(|e| e[0] != 0 || e.iter().any(|&x| x < 0))
    }

    fn unstack(&self, lvcs_responses: &[Vec<u64>], query: usize) -> Option<Vec<u64>> {
        let mut flat = Vec::with_capacity(self.beta * self.row_length);
        for k in 0..self.beta {
            flat.extend_from_slice(&lvcs_responses[query * self.beta + k]);
        }
        if flat[self.unstacked_cols..].iter().any(|&v| v != 0) {
            return None;
        }
        flat.truncate(self.unstacked_cols);
        Some(flat)
    }

    fn split_poly(&self, field: &Field, poly: &[u64], index: usize, rng: &mut dyn RngCore) -> Result<Vec<Vec<u64>>> {
        let degree = self.degrees[index];
        let nu = self.split_factors[index];
        let effective = poly.iter().rposition(|&c| c % field.modulus() != 0).map_or(0, |i| i + 1);
        if effective > degree + 1 {
            return Err(Error::Shape(format!(
                "polynomial {index} exceeds degree bound {degree}"
            )));
        }
        let mu = self.column_size;
        let nq = self.nb_queries;
        let mut rest: Vec<u64> = poly[..effective].iter().map(|&c| c % field.modulus()).collect();
        let mut previous = vec![0u64; nq];
        let mut units = Vec::with_capacity(nu);
        for i in 0..nu {
            let mut unit = vec![0u64; self.unstacked_rows];
            let shift = if i + 1 < nu {
                0
            } else {
                let last_degree = degree - (nu - 1) * mu;
                self.unstacked_rows - 1 - last_degree
            };
            let take = if i + 1 < nu { mu.min(rest.len()) } else { rest.len() };
            for (k, &c) in rest[..take].iter().enumerate() {
                unit[shift + k] = c;
            }
            for (k, &c) in previous.iter().enumerate() {
                unit[shift + k] = field.sub(unit[shift + k], c);
            }
            rest.drain(..take);
            if i + 1 < nu {
                let leading = field.sample_vec(rng, nq);
                for (k, &c) in leading.iter().enumerate() {
                    unit[mu + k] = field.add(unit[mu + k], c);
                }
                previous = leading;
            }
            units.push(unit);
        }
        Ok(units)
    }
}

/// `x^e` for a possibly negative exponent; `None` for `0^-k`.
fn signed_pow(field: &Field, x: u64, e: i64) -> Option<u64> {
    if e >= 0 {
        Some(field.pow(x, e as u64))
    } else if x % field.modulus() == 0 {
        None
    } else {
        Some(field.inv(field.pow(x, e.unsigned_abs())))
    }
}

impl Layout for UnivariateLayout {
    fn row_length(&self) -> usize {
        self.row_length
    }

    fn nb_rows(&self) -> usize {
        self.beta * self.unstacked_rows
    }

    fn nb_lvcs_queries(&self) -> usize {
        self.nb_queries * self.beta
    }

    fn query_size(&self) -> usize {
        self.nb_queries
    }

    fn query_from_elements(&self, elements: &[u64]) -> Option<EvalQuery> {
        (elements.len() == self.nb_queries).then(|| EvalQuery::Univariate(elements.to_vec()))
    }

    fn check_query(&self, query: &EvalQuery) -> bool {
        let EvalQuery::Univariate(points) = query else {
            return false;
        };
        if points.len() != self.nb_queries {
            return false;
        }
        let distinct = points
            .iter()
            .enumerate()
            .all(|(i, p)| !points[i + 1..].contains(p));
        distinct && !(self.needs_nonzero_points() && points.contains(&0))
    }

    fn to_rows(&self, field: &Field, input: &LayoutInput, rng: &mut dyn RngCore) -> Result<Vec<Vec<u64>>> {
        let LayoutInput::Univariate(polys) = input else {
            return Err(Error::Shape("univariate layout expects polynomials".into()));
        };
        if polys.len() != self.degrees.len() {
            return Err(Error::Shape(format!(
                "univariate layout expects {} polynomials, got {}",
                self.degrees.len(),
                polys.len()
            )));
        }
        let mut rows = vec![vec![0u64; self.row_length]; self.nb_rows()];
        let mut col = 0;
        for (index, poly) in polys.iter().enumerate() {
            for unit in self.split_poly(field, poly, index, rng)? {
                let block = col / self.row_length;
                for (r, &c) in unit.iter().enumerate() {
                    rows[block * self.unstacked_rows + r][col % self.row_length] = c;
                }
                col += 1;
            }
        }
        Ok(rows)
    }

    fn to_lvcs_queries(&self, field: &Field, query: &EvalQuery) -> Option<LvcsQueries> {
        if !self.check_query(query) {
            return None;
        }
        let EvalQuery::Univariate(points) = query else {
            return None;
        };
        let u = self.unstacked_rows;
        let mut queries = Vec::with_capacity(self.nb_lvcs_queries());
        for &point in points {
            let powers = field.powers(point, u);
            for k in 0..self.beta {
                let mut row = vec![0u64; self.nb_rows()];
                row[k * u..(k + 1) * u].copy_from_slice(&powers);
                queries.push(row);
            }
        }
        let fullrank_cols = (0..self.beta)
            .flat_map(|k| (0..self.nb_queries).map(move |j| k * u + j))
            .collect();
        Some(LvcsQueries {
            queries,
            fullrank_cols,
        })
    }

    fn partial_evals_size(&self) -> usize {
        self.split_factors.iter().map(|nu| nu - 1).sum::<usize>() * self.nb_queries
    }

    fn to_responses(
        &self,
        field: &Field,
        query: &EvalQuery,
        lvcs_responses: &[Vec<u64>],
    ) -> Option<(EvalResponse, Vec<u64>)> {
        let EvalQuery::Univariate(points) = query else {
            return None;
        };
        if points.len() != self.nb_queries
            || lvcs_responses.len() != self.nb_lvcs_queries()
            || lvcs_responses.iter().any(|r| r.len() != self.row_length)
        {
            return None;
        }
        let mut values = Vec::with_capacity(self.nb_queries);
        let mut partial = Vec::with_capacity(self.partial_evals_size());
        for (j, &point) in points.iter().enumerate() {
            let flat = self.unstack(lvcs_responses, j)?;
            let mut evals = Vec::with_capacity(self.degrees.len());
            let mut offset = 0;
            for (nu, exps) in self.split_factors.iter().zip(&self.exponents) {
                let units = &flat[offset..offset + nu];
                let mut eval = 0;
                for (&v, &e) in units.iter().zip(exps) {
                    eval = field.add(eval, field.mul(v, signed_pow(field, point, e)?));
                }
                evals.push(eval);
                partial.extend_from_slice(&units[1..]);
                offset += nu;
            }
            values.push(evals);
        }
        Some((EvalResponse::Univariate(values), partial))
    }

    fn to_lvcs_responses(
        &self,
        field: &Field,
        query: &EvalQuery,
        response: &EvalResponse,
        partial_evals: &[u64],
    ) -> Option<Vec<Vec<u64>>> {
        let (EvalQuery::Univariate(points), EvalResponse::Univariate(values)) = (query, response) else {
            return None;
        };
        if points.len() != self.nb_queries
            || values.len() != self.nb_queries
            || values.iter().any(|v| v.len() != self.degrees.len())
            || partial_evals.len() != self.partial_evals_size()
        {
            return None;
        }
        let mut partial = partial_evals.iter().copied();
        let mut lvcs_responses = Vec::with_capacity(self.nb_lvcs_queries());
        for (&point, evals) in points.iter().zip(values) {
            let mut flat = Vec::with_capacity(self.beta * self.row_length);
            for ((&eval, &nu), exps) in evals.iter().zip(&self.split_factors).zip(&self.exponents) {
                let others: Vec<u64> = partial.by_ref().take(nu - 1).collect();
                let mut value = eval;
                for (&v, &e) in others.iter().zip(&exps[1..]) {
                    value = field.sub(value, field.mul(v, signed_pow(field, point, e)?));
                }
                flat.push(field.mul(value, signed_pow(field, point, -exps[0])?));
                flat.extend(others);
            }
            flat.resize(self.beta * self.row_length, 0);
            lvcs_responses.extend(flat.chunks(self.row_length).map(<[u64]>::to_vec));
        }
        Some(lvcs_responses)
    }
}
