//! Polynomial commitment scheme: a [`Layout`] on top of an [`Lvcs`].
//!
//! Committing arranges the input with the layout and commits the rows.
//! Opening translates the evaluation query into LVCS queries, opens them, and
//! splits the LVCS responses into the evaluations and the partial
//! evaluations; the proof is the partial evaluations followed by the LVCS
//! proof.

use rand::RngCore;
use tracing::{debug, instrument};

use crate::codec::{FieldCodec, ProofReader, ProofWriter};
use crate::decs::DecsConfig;
use crate::error::{Error, Result};
use crate::hash::{Domain, HashBackend};
use crate::layout::{EvalQuery, EvalResponse, Layout, LayoutInput};
use crate::lvcs::{Lvcs, LvcsState};
use crate::merkle::TreeShape;
use crate::Field;

/// Prover-side state between [`Pcs::commit`] and [`Pcs::open`].
#[derive(Debug, Clone)]
pub struct PcsState {
    lvcs: LvcsState,
}

/// Polynomial commitment over a fixed layout.
#[derive(Debug)]
pub struct Pcs<H: HashBackend> {
    field: Field,
    codec: FieldCodec,
    hasher: H,
    layout: Box<dyn Layout>,
    lvcs: Lvcs<H>,
}

impl<H: HashBackend> Pcs<H> {
    /// Builds the scheme committing objects arranged by `layout`.
    pub fn new(
        field: Field,
        hasher: H,
        layout: Box<dyn Layout>,
        tree: TreeShape,
        decs_config: DecsConfig,
    ) -> Result<Self> {
        let lvcs = Lvcs::new(
            field,
            hasher.clone(),
            tree,
            layout.row_length(),
            layout.nb_rows(),
            layout.nb_lvcs_queries(),
            decs_config,
        )?;
        Ok(Self {
            field,
            codec: FieldCodec::new(field),
            hasher,
            layout,
            lvcs,
        })
    }

    /// Layout used to arrange committed objects.
    pub fn layout(&self) -> &dyn Layout {
        self.layout.as_ref()
    }

    /// Underlying vector commitment.
    pub fn lvcs(&self) -> &Lvcs<H> {
        &self.lvcs
    }

    /// Size of the proof without the LVCS proof.
    pub fn partial_proof_size(&self) -> usize {
        self.codec.encoded_len(self.layout.partial_evals_size())
    }

    /// Worst-case proof size.
    pub fn max_proof_size(&self) -> usize {
        self.partial_proof_size() + self.lvcs.max_proof_size()
    }

    /// Whether proofs can differ in size.
    pub fn has_variable_proof_size(&self) -> bool {
        self.lvcs.has_variable_proof_size()
    }

    /// Commits to `input`.
    #[instrument(skip_all, level = "debug")]
    pub fn commit<R: RngCore>(
        &self,
        rng: &mut R,
        salt: &[u8],
        input: &LayoutInput,
    ) -> Result<(Vec<u8>, PcsState)> {
        let rows = self.layout.to_rows(&self.field, input, rng)?;
        let (commitment, lvcs) = self.lvcs.commit(rng, salt, &rows)?;
        Ok((commitment, PcsState { lvcs }))
    }

    /// Answers `query`, appending the proof to `out`.
    #[instrument(skip_all, level = "debug")]
    pub fn open(
        &self,
        state: PcsState,
        query: &EvalQuery,
        binding: &[u8],
        out: &mut ProofWriter,
    ) -> Result<EvalResponse> {
        if !self.layout.check_query(query) {
            return Err(Error::Shape("evaluation query rejected by the layout".into()));
        }
        let lvcs_queries = self
            .layout
            .to_lvcs_queries(&self.field, query)
            .ok_or_else(|| Error::Shape("evaluation query has no LVCS translation".into()))?;
        let mut lvcs_proof = ProofWriter::new(self.field);
        let lvcs_responses = self.lvcs.open(
            state.lvcs,
            &lvcs_queries.queries,
            &lvcs_queries.fullrank_cols,
            binding,
            &mut lvcs_proof,
        )?;
        let (response, partial) = self
            .layout
            .to_responses(&self.field, query, &lvcs_responses)
            .ok_or_else(|| Error::Shape("committed rows do not follow the layout".into()))?;
        out.write_elements(&partial);
        out.append(lvcs_proof);
        Ok(response)
    }

    /// Recomputes the commitment implied by `response`, reading the proof
    /// from `reader`.
    pub fn recompute_commitment(
        &self,
        salt: &[u8],
        query: &EvalQuery,
        response: &EvalResponse,
        binding: &[u8],
        reader: &mut ProofReader<'_>,
    ) -> Option<Vec<u8>> {
        if !self.layout.check_query(query) {
            debug!("PCS: query rejected by the layout");
            return None;
        }
        let partial = reader.read_elements(self.layout.partial_evals_size())?;
        let lvcs_queries = self.layout.to_lvcs_queries(&self.field, query)?;
        let Some(lvcs_responses) = self
            .layout
            .to_lvcs_responses(&self.field, query, response, &partial)
        else {
            debug!("PCS: response does not match the layout");
            return None;
        };
        self.lvcs.recompute_commitment(
            salt,
            &lvcs_queries.queries,
            &lvcs_queries.fullrank_cols,
            &lvcs_responses,
            binding,
            reader,
        )
    }

    /// Checks that `response` answers `query` on the committed object.
    pub fn verify(
        &self,
        salt: &[u8],
        commitment: &[u8],
        query: &EvalQuery,
        response: &EvalResponse,
        binding: &[u8],
        proof: &[u8],
    ) -> bool {
        let mut reader = ProofReader::new(self.field, proof);
        match self.recompute_commitment(salt, query, response, binding, &mut reader) {
            Some(recomputed) => reader.is_empty() && recomputed == commitment,
            None => false,
        }
    }

    /// Derives an evaluation query from `binding`.
    pub fn random_query(&self, binding: &[u8]) -> Option<EvalQuery> {
        let mut stream = self.hasher.xof(Domain::PcsQueries, &[binding]);
        let elements = self.codec.sample(&mut stream, self.layout.query_size());
        self.layout.query_from_elements(&elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Blake2bHasher, ShakeHasher};
    use crate::layout::{MonomialLayout, MultiLayout, MultilinearLayout, PlainLayout, UnivariateLayout};
    use crate::merkle::TreeConfig;
    use crate::multilinear::{monomial_weights, MultilinearPolynomial};
    use crate::poly;
    use rand::{rngs::StdRng, SeedableRng};

    const P: u64 = 2_013_265_921;

    fn tree() -> TreeShape {
        TreeShape::new(&TreeConfig::new(64, vec![8, 8])).unwrap()
    }

    struct Opened {
        pcs: Pcs<ShakeHasher>,
        commitment: Vec<u8>,
        query: EvalQuery,
        response: EvalResponse,
        proof: Vec<u8>,
    }

    const SALT: [u8; 16] = [7u8; 16];

    fn commit_and_open(layout: Box<dyn Layout>, input: &LayoutInput, seed: u64) -> Opened {
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(seed);
        let pcs = Pcs::new(field, ShakeHasher, layout, tree(), DecsConfig::new(6, 2)).unwrap();
        let (commitment, state) = pcs.commit(&mut rng, &SALT, input).unwrap();
        let query = pcs.random_query(b"round").unwrap();
        let mut out = ProofWriter::new(field);
        let response = pcs.open(state, &query, b"round", &mut out).unwrap();
        let proof = out.into_bytes();
        assert!(proof.len() <= pcs.max_proof_size());
        assert!(pcs.verify(&SALT, &commitment, &query, &response, b"round", &proof));
        Opened {
            pcs,
            commitment,
            query,
            response,
            proof,
        }
    }

    /// Position of the 4-byte DEC opening nonce inside a PCS proof.
    fn nonce_offset(pcs: &Pcs<ShakeHasher>) -> usize {
        pcs.partial_proof_size() + pcs.lvcs().partial_proof_size() - 4
    }

    #[test]
    fn univariate_commit_open_verify() {
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(5);
        let layout = UnivariateLayout::new(vec![9, 5], 4, 2, 2).unwrap();
        let pcs = Pcs::new(field, ShakeHasher, Box::new(layout), tree(), DecsConfig::new(6, 2)).unwrap();
        let polys = vec![field.sample_vec(&mut rng, 10), field.sample_vec(&mut rng, 6)];
        let salt = [1u8; 16];
        let (commitment, state) = pcs
            .commit(&mut rng, &salt, &LayoutInput::Univariate(polys.clone()))
            .unwrap();

        let query = pcs.random_query(b"transcript").unwrap();
        let mut out = ProofWriter::new(field);
        let response = pcs.open(state, &query, b"transcript", &mut out).unwrap();
        let proof = out.into_bytes();

        let (EvalQuery::Univariate(points), EvalResponse::Univariate(values)) = (&query, &response) else {
            panic!("unexpected query kind");
        };
        for (&x, evals) in points.iter().zip(values) {
            for (p, &v) in polys.iter().zip(evals) {
                assert_eq!(poly::eval(&field, p, x), v);
            }
        }
        assert!(pcs.verify(&salt, &commitment, &query, &response, b"transcript", &proof));
        assert!(!pcs.verify(&salt, &commitment, &query, &response, b"other", &proof));

        let mut wrong = values.clone();
        wrong[0][1] = field.add(wrong[0][1], 1);
        let wrong = EvalResponse::Univariate(wrong);
        assert!(!pcs.verify(&salt, &commitment, &query, &wrong, b"transcript", &proof));
        assert!(proof.len() <= pcs.max_proof_size());
    }

    #[test]
    fn multi_layout_commitment() {
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(8);
        let layout = MultiLayout::new(vec![
            Box::new(UnivariateLayout::uniform(7, 4, 1, 1, 1).unwrap()),
            Box::new(MultilinearLayout::new(4, 1, 2).unwrap()),
        ])
        .unwrap();
        let pcs = Pcs::new(field, Blake2bHasher, Box::new(layout), tree(), DecsConfig::new(6, 2)).unwrap();
        let input = LayoutInput::Multi(vec![
            LayoutInput::Univariate(vec![field.sample_vec(&mut rng, 8)]),
            LayoutInput::Multilinear(vec![MultilinearPolynomial::from_evaluations(
                4,
                field.sample_vec(&mut rng, 16),
            )]),
        ]);
        let salt = [2u8; 16];
        let (commitment, state) = pcs.commit(&mut rng, &salt, &input).unwrap();
        let query = pcs.random_query(b"bind").unwrap();
        let mut out = ProofWriter::new(field);
        let response = pcs.open(state, &query, b"bind", &mut out).unwrap();
        let proof = out.into_bytes();
        assert!(pcs.verify(&salt, &commitment, &query, &response, b"bind", &proof));

        let mut truncated = proof.clone();
        truncated.pop();
        assert!(!pcs.verify(&salt, &commitment, &query, &response, b"bind", &truncated));
    }

    #[test]
    fn plain_commit_open_verify() {
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(30);
        let rows: Vec<Vec<u64>> = (0..3).map(|_| field.sample_vec(&mut rng, 5)).collect();
        let layout = PlainLayout::new(5, 3, 2, vec![0, 1]).unwrap();
        let opened = commit_and_open(Box::new(layout), &LayoutInput::Rows(rows.clone()), 31);

        let (EvalQuery::Rows(coeffs), EvalResponse::Rows(combined)) = (&opened.query, &opened.response) else {
            panic!("unexpected query kind");
        };
        assert_eq!(combined.len(), 2);
        for (query, row) in coeffs.iter().zip(combined) {
            for (col, &value) in row.iter().enumerate() {
                let column: Vec<u64> = rows.iter().map(|r| r[col]).collect();
                assert_eq!(value, field.dot(query, &column));
            }
        }
        assert_eq!(opened.pcs.partial_proof_size(), 0);
    }

    #[test]
    fn multilinear_commit_open_verify() {
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(32);
        let polys: Vec<MultilinearPolynomial> = (0..2)
            .map(|_| MultilinearPolynomial::from_evaluations(5, field.sample_vec(&mut rng, 32)))
            .collect();
        let layout = MultilinearLayout::new(5, 2, 2).unwrap();
        let opened = commit_and_open(Box::new(layout), &LayoutInput::Multilinear(polys.clone()), 33);

        let (EvalQuery::Multilinear(point), EvalResponse::Multilinear(values)) = (&opened.query, &opened.response)
        else {
            panic!("unexpected query kind");
        };
        let expected: Vec<u64> = polys.iter().map(|p| p.evaluate(&field, point)).collect();
        assert_eq!(values, &expected);
    }

    #[test]
    fn monomial_commit_open_verify() {
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(34);
        let coeffs: Vec<Vec<u64>> = (0..2).map(|_| field.sample_vec(&mut rng, 32)).collect();
        let layout = MonomialLayout::new(5, 2, 3).unwrap();
        let input = LayoutInput::MultilinearCoefficients(coeffs.clone());
        let opened = commit_and_open(Box::new(layout), &input, 35);

        let (EvalQuery::Multilinear(point), EvalResponse::Multilinear(values)) = (&opened.query, &opened.response)
        else {
            panic!("unexpected query kind");
        };
        let weights = monomial_weights(&field, point);
        let expected: Vec<u64> = coeffs.iter().map(|c| field.dot(c, &weights)).collect();
        assert_eq!(values, &expected);
    }

    #[test]
    fn tampered_openings_reject() {
        let field = Field::new(P);
        let mut rng = StdRng::seed_from_u64(36);
        let coeffs = vec![field.sample_vec(&mut rng, 16)];
        let layouts: Vec<(Box<dyn Layout>, LayoutInput)> = vec![
            (
                Box::new(MonomialLayout::new(4, 1, 2).unwrap()),
                LayoutInput::MultilinearCoefficients(coeffs.clone()),
            ),
            (
                Box::new(PlainLayout::new(4, 4, 1, vec![0]).unwrap()),
                LayoutInput::Rows(coeffs[0].chunks(4).map(<[u64]>::to_vec).collect()),
            ),
        ];
        for (seed, (layout, input)) in (40u64..).zip(layouts) {
            let Opened {
                pcs,
                commitment,
                query,
                response,
                proof,
            } = commit_and_open(layout, &input, seed);
            let verify = |commitment: &[u8], response: &EvalResponse, proof: &[u8]| {
                pcs.verify(&SALT, commitment, &query, response, b"round", proof)
            };

            let forged = match &response {
                EvalResponse::Multilinear(values) => EvalResponse::Multilinear(vec![field.add(values[0], 1)]),
                EvalResponse::Rows(rows) => {
                    let mut rows = rows.clone();
                    rows[0][3] = field.add(rows[0][3], 1);
                    EvalResponse::Rows(rows)
                }
                _ => panic!("unexpected response kind"),
            };
            assert!(!verify(&commitment[..], &forged, &proof[..]));
            assert!(!pcs.verify(&[8u8; 16], &commitment, &query, &response, b"round", &proof));

            let mut other_commitment = commitment.clone();
            other_commitment[0] ^= 1;
            assert!(!verify(&other_commitment[..], &response, &proof[..]));

            let mut extended = proof.clone();
            extended.push(0);
            assert!(!verify(&commitment[..], &response, &extended[..]));
            assert!(!verify(&commitment[..], &response, &proof[..proof.len() - 1]));

            let offset = nonce_offset(&pcs);
            let honest: [u8; 4] = proof[offset..offset + 4].try_into().unwrap();
            let honest = u32::from_le_bytes(honest);
            for nonce in [0u32, 1, 2, honest ^ 0x100, u32::MAX] {
                if nonce == honest {
                    continue;
                }
                let mut rewritten = proof.clone();
                rewritten[offset..offset + 4].copy_from_slice(&nonce.to_le_bytes());
                assert!(!verify(&commitment[..], &response, &rewritten[..]), "nonce {nonce} accepted");
            }
        }
    }
}
