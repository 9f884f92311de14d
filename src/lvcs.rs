//! Linear-combination vector commitment (LVCS).
//!
//! The LVCS commits to a matrix of `nb_rows` rows of `row_length` field
//! elements and later proves the values of `nb_queries` linear combinations of
//! those rows.
//!
//! Each row is extended with `decs_queries` random values and interpolated
//! through the fixed points `0, -1, -2, …`; the resulting polynomials of
//! degree `row_length + decs_queries - 1` go to the [`Decs`].  To answer a
//! query matrix the committer publishes the combined rows (the *responses*)
//! and the combined random tails (the *associated randomness*).  The verifier
//! interpolates each combined polynomial, evaluates it at the DEC opening
//! points and, using an invertible `nb_queries × nb_queries` block of the
//! query matrix (the *full-rank columns*), recovers the DEC values of those
//! rows from the values of the other rows sent in the proof.  The DEC check
//! then ties everything to the commitment.
//!
//! Proof layout: associated randomness, DEC values of the non-full-rank rows,
//! the 4-byte DEC opening nonce, the DEC proof.

use rand::RngCore;
use tracing::{debug, instrument};

use crate::codec::{FieldCodec, ProofReader, ProofWriter};
use crate::decs::{Decs, DecsConfig, DecsState};
use crate::error::{Error, Result};
use crate::hash::{Digest, Domain, HashBackend};
use crate::merkle::TreeShape;
use crate::parallel::map_slice;
use crate::poly;
use crate::Field;

const NONCE_SIZE: usize = 4;

/// Prover-side state between [`Lvcs::commit`] and [`Lvcs::open`].
#[derive(Debug, Clone)]
pub struct LvcsState {
    decs: DecsState,
    extended_rows: Vec<Vec<u64>>,
}

/// Linear-combination vector commitment for a fixed matrix shape.
#[derive(Debug, Clone)]
pub struct Lvcs<H: HashBackend> {
    field: Field,
    codec: FieldCodec,
    hasher: H,
    row_length: usize,
    nb_rows: usize,
    nb_queries: usize,
    decs: Decs<H>,
    points: Vec<u64>,
}

impl<H: HashBackend> Lvcs<H> {
    /// Builds the scheme for `nb_rows × row_length` matrices answering
    /// `nb_queries` combinations per opening.
    pub fn new(
        field: Field,
        hasher: H,
        tree: TreeShape,
        row_length: usize,
        nb_rows: usize,
        nb_queries: usize,
        decs_config: DecsConfig,
    ) -> Result<Self> {
        if row_length == 0 || nb_rows == 0 {
            return Err(Error::Config("LVCS matrices cannot be empty".into()));
        }
        if nb_queries == 0 || nb_queries > nb_rows {
            return Err(Error::Config(format!(
                "LVCS answers {nb_queries} combinations of {nb_rows} rows"
            )));
        }
        let width = row_length + decs_config.nb_queries;
        // interpolation points 0, -1, … must avoid the DEC points 1..=N
        if (tree.nb_leaves() + width) as u64 > field.modulus() {
            return Err(Error::Config(format!(
                "field of order {} too small for {} leaves and {width} interpolation points",
                field.modulus(),
                tree.nb_leaves()
            )));
        }
        let decs = Decs::new(field, hasher.clone(), tree, nb_rows, width - 1, decs_config)?;
        let points = (0..width).map(|i| field.neg(field.elem(i))).collect();
        Ok(Self {
            field,
            codec: FieldCodec::new(field),
            hasher,
            row_length,
            nb_rows,
            nb_queries,
            decs,
            points,
        })
    }

    /// Length of each committed row.
    pub fn row_length(&self) -> usize {
        self.row_length
    }

    /// Number of committed rows.
    pub fn nb_rows(&self) -> usize {
        self.nb_rows
    }

    /// Number of linear combinations per opening.
    pub fn nb_queries(&self) -> usize {
        self.nb_queries
    }

    /// Underlying degree-enforcing commitment.
    pub fn decs(&self) -> &Decs<H> {
        &self.decs
    }

    /// Size of the proof without the DEC proof.
    pub fn partial_proof_size(&self) -> usize {
        let decs_nq = self.decs.nb_queries();
        self.nb_queries * self.codec.encoded_len(decs_nq)
            + decs_nq * self.codec.encoded_len(self.nb_rows - self.nb_queries)
            + NONCE_SIZE
    }

    /// Worst-case proof size.
    pub fn max_proof_size(&self) -> usize {
        self.partial_proof_size() + self.decs.max_proof_size()
    }

    /// Whether proofs can differ in size.
    pub fn has_variable_proof_size(&self) -> bool {
        self.decs.has_variable_proof_size()
    }

    /// Commits to `rows`.
    #[instrument(skip_all, level = "debug", fields(rows = self.nb_rows, row_length = self.row_length))]
    pub fn commit<R: RngCore>(
        &self,
        rng: &mut R,
        salt: &[u8],
        rows: &[Vec<u64>],
    ) -> Result<(Vec<u8>, LvcsState)> {
        if rows.len() != self.nb_rows || rows.iter().any(|r| r.len() != self.row_length) {
            return Err(Error::Shape(format!(
                "LVCS expects {} rows of length {}",
                self.nb_rows, self.row_length
            )));
        }
        let decs_nq = self.decs.nb_queries();
        let extended_rows: Vec<Vec<u64>> = rows
            .iter()
            .map(|row| {
                let mut extended = row.clone();
                extended.extend(self.field.sample_vec(rng, decs_nq));
                extended
            })
            .collect();
        let polys = map_slice(&extended_rows, |row| {
            poly::interpolate(&self.field, &self.points, row)
        });
        let (commitment, decs) = self.decs.commit(rng, salt, &polys)?;
        Ok((
            commitment,
            LvcsState {
                decs,
                extended_rows,
            },
        ))
    }

    fn check_query_shape(&self, queries: &[Vec<u64>], fullrank_cols: &[usize]) -> bool {
        queries.len() == self.nb_queries
            && queries.iter().all(|q| q.len() == self.nb_rows)
            && fullrank_cols.len() == self.nb_queries
            && fullrank_cols.windows(2).all(|w| w[0] < w[1])
            && fullrank_cols.iter().all(|&c| c < self.nb_rows)
    }

    fn binding_digest(&self, binding: &[u8], responses: &[Vec<u64>], randomness: &[Vec<u64>]) -> Digest {
        let encoded: Vec<Vec<u8>> = responses
            .iter()
            .chain(randomness)
            .map(|row| self.codec.encode(row))
            .collect();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(encoded.len() + 1);
        parts.push(binding);
        parts.extend(encoded.iter().map(Vec::as_slice));
        self.hasher.hash(Domain::LvcsBinding, &parts)
    }

    /// Splits every query into its full-rank block and the remaining columns.
    fn split_queries(&self, queries: &[Vec<u64>], fullrank_cols: &[usize]) -> (Vec<Vec<u64>>, Vec<Vec<u64>>) {
        queries
            .iter()
            .map(|q| {
                let mut block = Vec::with_capacity(self.nb_queries);
                let mut rest = Vec::with_capacity(self.nb_rows - self.nb_queries);
                let mut cols = fullrank_cols.iter().peekable();
                for (k, &coeff) in q.iter().enumerate() {
                    if cols.peek() == Some(&&k) {
                        cols.next();
                        block.push(coeff);
                    } else {
                        rest.push(coeff);
                    }
                }
                (block, rest)
            })
            .unzip()
    }

    /// Answers `queries`, appending the proof to `out`.
    ///
    /// `fullrank_cols` (sorted) must select an invertible block of the query
    /// matrix.  Returns one response row of `row_length` values per query.
    #[instrument(skip_all, level = "debug")]
    pub fn open(
        &self,
        state: LvcsState,
        queries: &[Vec<u64>],
        fullrank_cols: &[usize],
        binding: &[u8],
        out: &mut ProofWriter,
    ) -> Result<Vec<Vec<u64>>> {
        if !self.check_query_shape(queries, fullrank_cols) {
            return Err(Error::Shape(format!(
                "LVCS expects {} queries over {} rows with as many sorted full-rank columns",
                self.nb_queries, self.nb_rows
            )));
        }
        let (block, _) = self.split_queries(queries, fullrank_cols);
        if poly::invert(&self.field, &block).is_none() {
            return Err(Error::Shape(
                "query matrix is singular on the full-rank columns".into(),
            ));
        }
        let width = self.points.len();
        let mut responses = Vec::with_capacity(self.nb_queries);
        let mut randomness = Vec::with_capacity(self.nb_queries);
        for query in queries {
            let mut combined = vec![0u64; width];
            for (row, &coeff) in state.extended_rows.iter().zip(query) {
                poly::add_scaled(&self.field, &mut combined, row, coeff);
            }
            randomness.push(combined.split_off(self.row_length));
            responses.push(combined);
        }
        let com = self.binding_digest(binding, &responses, &randomness);
        let (leaves, nonce) = self.decs.sample_opening(&com)?;
        let mut decs_proof = ProofWriter::new(self.field);
        let decs_values = self.decs.open(state.decs, &leaves, &mut decs_proof)?;

        out.write_rows(&randomness);
        for values in &decs_values {
            let mut cols = fullrank_cols.iter().peekable();
            let mut rest = Vec::with_capacity(self.nb_rows - self.nb_queries);
            for (k, &v) in values.iter().enumerate() {
                if cols.peek() == Some(&&k) {
                    cols.next();
                } else {
                    rest.push(v);
                }
            }
            out.write_elements(&rest);
        }
        out.write_bytes(&nonce.to_le_bytes());
        out.append(decs_proof);
        Ok(responses)
    }

    /// Recomputes the commitment implied by `responses`, reading the proof
    /// from `reader`.
    pub fn recompute_commitment(
        &self,
        salt: &[u8],
        queries: &[Vec<u64>],
        fullrank_cols: &[usize],
        responses: &[Vec<u64>],
        binding: &[u8],
        reader: &mut ProofReader<'_>,
    ) -> Option<Vec<u8>> {
        if !self.check_query_shape(queries, fullrank_cols)
            || responses.len() != self.nb_queries
            || responses.iter().any(|r| r.len() != self.row_length)
        {
            debug!("LVCS opening has the wrong shape");
            return None;
        }
        let field = self.field;
        let decs_nq = self.decs.nb_queries();
        let randomness = reader.read_rows(self.nb_queries, decs_nq)?;
        let partial_values = reader.read_rows(decs_nq, self.nb_rows - self.nb_queries)?;
        let nonce = u32::from_le_bytes(reader.read_array::<NONCE_SIZE>()?);

        let com = self.binding_digest(binding, responses, &randomness);
        let Some(leaves) = self.decs.recompute_opening(nonce, &com) else {
            debug!(nonce, "LVCS: DEC opening nonce is not admissible");
            return None;
        };
        let combined: Vec<Vec<u64>> = responses
            .iter()
            .zip(&randomness)
            .map(|(resp, rnd)| {
                let values: Vec<u64> = resp.iter().chain(rnd).copied().collect();
                poly::interpolate(&field, &self.points, &values)
            })
            .collect();

        let (block, rest) = self.split_queries(queries, fullrank_cols);
        let Some(block_inv) = poly::invert(&field, &block) else {
            debug!("LVCS: full-rank block is singular");
            return None;
        };
        let mut decs_values = Vec::with_capacity(decs_nq);
        for (&leaf, partial) in leaves.iter().zip(&partial_values) {
            let x = self.decs.evaluation_point(leaf);
            let target: Vec<u64> = combined
                .iter()
                .zip(&rest)
                .map(|(q, coeffs)| field.sub(poly::eval(&field, q, x), field.dot(coeffs, partial)))
                .collect();
            let recovered = poly::mat_vec(&field, &block_inv, &target);
            let mut row = Vec::with_capacity(self.nb_rows);
            let mut cols = fullrank_cols.iter().peekable();
            let (mut fr, mut other) = (recovered.into_iter(), partial.iter());
            for k in 0..self.nb_rows {
                if cols.peek() == Some(&&k) {
                    cols.next();
                    row.push(fr.next()?);
                } else {
                    row.push(*other.next()?);
                }
            }
            decs_values.push(row);
        }
        self.decs
            .recompute_commitment(salt, &leaves, &decs_values, reader)
    }

    /// Checks that `responses` answer `queries` on the committed matrix.
    #[allow(clippy::too_many_arguments)]
    pub fn verify(
        &self,
        salt: &[u8],
        commitment: &[u8],
        queries: &[Vec<u64>],
        fullrank_cols: &[usize],
        responses: &[Vec<u64>],
        binding: &[u8],
        proof: &[u8],
    ) -> bool {
        let mut reader = ProofReader::new(self.field, proof);
        match self.recompute_commitment(salt, queries, fullrank_cols, responses, binding, &mut reader) {
            Some(recomputed) => reader.is_empty() && recomputed == commitment,
            None => false,
        }
    }

    /// Derives `nb_queries` uniformly random query vectors from `binding`.
    pub fn random_queries(&self, binding: &[u8]) -> Vec<Vec<u64>> {
        let mut stream = self.hasher.xof(Domain::LvcsQueries, &[binding]);
        let flat = self.codec.sample(&mut stream, self.nb_queries * self.nb_rows);
        flat.chunks(self.nb_rows).map(<[u64]>::to_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ShakeHasher;
    use crate::merkle::TreeConfig;
    use rand::{rngs::StdRng, SeedableRng};

    const P: u64 = 2_013_265_921;

    fn scheme() -> Lvcs<ShakeHasher> {
        let tree = TreeShape::new(&TreeConfig::new(64, vec![4, 4, 4])).unwrap();
        Lvcs::new(Field::new(P), ShakeHasher, tree, 6, 5, 2, DecsConfig::new(8, 2)).unwrap()
    }

    fn commit_and_open(seed: u64) -> (Lvcs<ShakeHasher>, Vec<Vec<u64>>, Vec<u8>, Vec<Vec<u64>>, Vec<Vec<u64>>, Vec<u8>) {
        let lvcs = scheme();
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(seed);
        let rows: Vec<Vec<u64>> = (0..5).map(|_| field.sample_vec(&mut rng, 6)).collect();
        let (commitment, state) = lvcs.commit(&mut rng, b"salt", &rows).unwrap();
        let queries = lvcs.random_queries(b"queries");
        let mut writer = ProofWriter::new(field);
        let responses = lvcs.open(state, &queries, &[0, 1], b"bind", &mut writer).unwrap();
        (lvcs, rows, commitment, queries, responses, writer.into_bytes())
    }

    #[test]
    fn responses_are_linear_combinations() {
        let field = Field::new(P);
        let (lvcs, rows, commitment, queries, responses, proof) = commit_and_open(11);
        for (query, response) in queries.iter().zip(&responses) {
            for col in 0..6 {
                let expected = (0..5).fold(0, |acc, r| field.add(acc, field.mul(query[r], rows[r][col])));
                assert_eq!(response[col], expected);
            }
        }
        assert!(proof.len() <= lvcs.max_proof_size());
        assert!(lvcs.verify(b"salt", &commitment, &queries, &[0, 1], &responses, b"bind", &proof));
    }

    #[test]
    fn inconsistent_responses_reject() {
        let (lvcs, _, commitment, queries, responses, proof) = commit_and_open(12);
        let mut forged = responses.clone();
        forged[1][3] = (forged[1][3] + 1) % P;
        assert!(!lvcs.verify(b"salt", &commitment, &queries, &[0, 1], &forged, b"bind", &proof));
        assert!(!lvcs.verify(b"salt", &commitment, &queries, &[0, 1], &responses, b"other", &proof));
        assert!(!lvcs.verify(b"salt", &commitment, &queries, &[0, 2], &responses, b"bind", &proof));
        let mut other_queries = queries.clone();
        other_queries[0][4] = (other_queries[0][4] + 1) % P;
        assert!(!lvcs.verify(b"salt", &commitment, &other_queries, &[0, 1], &responses, b"bind", &proof));
    }

    #[test]
    fn singular_full_rank_block_is_refused() {
        let lvcs = scheme();
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(13);
        let rows: Vec<Vec<u64>> = (0..5).map(|_| field.sample_vec(&mut rng, 6)).collect();
        let (_, state) = lvcs.commit(&mut rng, b"salt", &rows).unwrap();
        let queries = vec![vec![1, 2, 3, 4, 5], vec![2, 4, 1, 1, 1]];
        let mut writer = ProofWriter::new(field);
        assert!(lvcs.open(state, &queries, &[0, 1], b"", &mut writer).is_err());
    }

    #[test]
    fn too_small_field_is_rejected() {
        let tree = TreeShape::new(&TreeConfig::new(16, vec![4, 4])).unwrap();
        assert!(Lvcs::new(Field::new(31), ShakeHasher, tree, 10, 3, 1, DecsConfig::new(6, 1)).is_err());
    }
}
