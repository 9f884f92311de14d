//! Non-interactive argument for a [`Pacs`].
//!
//! The prover turns every witness row into a polynomial of degree
//! `nb_queries + C - 1` that takes the row values on the support `0..C`,
//! samples `ρ` masking polynomials of degree `deg_q` that sum to zero over
//! the support, and commits all of them with a univariate [`Pcs`].  A hash of
//! the commitment yields the batching coefficients; the prover then forms, for
//! each of the `ρ` combinations,
//!
//! ```text
//! Q = Σⱼ γⱼ(X)·Pⱼ(X) + Σⱼ γ'ⱼ·Aⱼ(X) + mask
//! ```
//!
//! where `Pⱼ` are the parallel constraint polynomials (vanishing on the
//! support) and `Aⱼ` the aggregated ones (summing to zero over the support),
//! so every `Q` sums to zero over the support.  The top coefficients of the
//! `Q`s go in the proof; hashing the `Q`s gives the evaluation points, at
//! which the commitment is opened.
//!
//! The verifier re-evaluates the constraints on the opened values, rebuilds
//! every `Q` from its top coefficients, its values at the evaluation points
//! and its zero sum over the support, and accepts when hashing the rebuilt
//! polynomials reproduces the transcript digest.

use std::time::{Duration, Instant};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, instrument};

use crate::challenge::{derive_rlc, ChallengeMode};
use crate::codec::{FieldCodec, ProofReader, ProofWriter};
use crate::decs::DecsConfig;
use crate::error::{Error, Result};
use crate::hash::{Digest, Domain, HashBackend, DIGEST_SIZE};
use crate::layout::{EvalQuery, EvalResponse, LayoutInput, UnivariateLayout};
use crate::merkle::{TreeConfig, TreeShape};
use crate::pacs::{Pacs, Theta, Witness};
use crate::parallel::map_indices;
use crate::pcs::Pcs;
use crate::poly::{self, Relation};
use crate::proof::Proof;
use crate::Field;

const DEFAULT_SALT_SIZE: usize = 16;
const MAX_PROVING_ATTEMPTS: usize = 16;

fn default_salt_size() -> usize {
    DEFAULT_SALT_SIZE
}

fn default_layout_beta() -> usize {
    1
}

/// Serializable protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Number of evaluation points opened.
    pub nb_queries: usize,
    /// Number of batched, masked constraint polynomials.
    pub rho: usize,
    /// Number of stacked blocks in the polynomial layout.
    #[serde(default = "default_layout_beta")]
    pub layout_beta: usize,
    /// Format of the batching challenge.
    #[serde(default)]
    pub challenge_mode: ChallengeMode,
    /// Tree over the DEC shares.
    pub tree: TreeConfig,
    /// DEC parameters.
    pub decs: DecsConfig,
    /// Salt length in bytes.
    #[serde(default = "default_salt_size")]
    pub salt_size: usize,
}

impl ProtocolConfig {
    /// Parameters with one layout block, a uniform challenge and a 16-byte salt.
    pub fn new(nb_queries: usize, rho: usize, tree: TreeConfig, decs: DecsConfig) -> Self {
        Self {
            nb_queries,
            rho,
            layout_beta: default_layout_beta(),
            challenge_mode: ChallengeMode::default(),
            tree,
            decs,
            salt_size: DEFAULT_SALT_SIZE,
        }
    }

    /// Parses a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| Error::Encoding(err.to_string()))
    }

    /// Pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| Error::Encoding(err.to_string()))
    }
}

/// Timing information collected while producing a proof.
#[derive(Debug, Clone, Default)]
pub struct ProofStats {
    /// Total wall-clock time taken to produce the proof.
    pub total_duration: Duration,
    /// Duration of each prover stage, for every attempt.
    pub stage_durations: Vec<(&'static str, Duration)>,
    /// Number of attempts, including the successful one.
    pub attempts: usize,
}

/// Estimated bits of security of each component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecurityEstimate {
    /// Batching of the constraints into `ρ` polynomials.
    pub batching_bits: f64,
    /// Evaluation of the batched polynomials at the opened points.
    pub query_bits: f64,
    /// DEC degree test.
    pub decs_check_bits: f64,
    /// DEC opening challenge.
    pub decs_opening_bits: f64,
}

impl SecurityEstimate {
    /// Security of the whole argument: the weakest component.
    pub fn bits(&self) -> f64 {
        self.batching_bits
            .min(self.query_bits)
            .min(self.decs_check_bits)
            .min(self.decs_opening_bits)
    }
}

/// Batching coefficients: `γ` polynomials per parallel constraint and `γ'`
/// scalars per aggregated constraint, for each of the `ρ` combinations.
struct Batching {
    gamma_polys: Vec<Vec<Vec<u64>>>,
    gamma_prime: Vec<Vec<u64>>,
}

/// Prover and verifier for one constraint system.
#[derive(Debug)]
pub struct Protocol<P: Pacs, H: HashBackend> {
    pacs: P,
    hasher: H,
    config: ProtocolConfig,
    field: Field,
    codec: FieldCodec,
    pcs: Pcs<H>,
    support: Vec<u64>,
    input_degree: usize,
    deg_q: usize,
    theta_polys: Theta,
    theta_prime_polys: Theta,
}

/// Interpolates every sub-theta over the witness support.
fn interpolate_theta(
    field: &Field,
    support: &[u64],
    theta: Theta,
    expected: usize,
    name: &str,
) -> Result<Theta> {
    if theta.len() != expected {
        return Err(Error::Config(format!(
            "{name} lists {} constraints instead of {expected}",
            theta.len()
        )));
    }
    theta
        .into_iter()
        .map(|subs| {
            subs.into_iter()
                .map(|sub| {
                    if sub.len() != support.len() {
                        return Err(Error::Config(format!(
                            "{name} values must have one entry per witness column"
                        )));
                    }
                    Ok(poly::interpolate(field, support, &sub))
                })
                .collect()
        })
        .collect()
}

fn evaluate_theta(field: &Field, polys: &[Vec<Vec<u64>>], x: u64) -> Vec<Vec<u64>> {
    polys
        .iter()
        .map(|subs| subs.iter().map(|p| poly::eval(field, p, x)).collect())
        .collect()
}

impl<P: Pacs, H: HashBackend> Protocol<P, H> {
    /// Builds the argument for `pacs` with the given hash backend.
    pub fn new(pacs: P, hasher: H, config: ProtocolConfig) -> Result<Self> {
        let field = pacs.field();
        let (rows, cols) = (pacs.nb_rows(), pacs.nb_cols());
        if rows == 0 || cols == 0 || pacs.constraint_degree() == 0 {
            return Err(Error::Config(
                "constraint system needs rows, columns and a positive degree".into(),
            ));
        }
        if config.nb_queries == 0 || config.rho == 0 || config.salt_size == 0 {
            return Err(Error::Config(
                "protocol needs queries, batched polynomials and a salt".into(),
            ));
        }
        let input_degree = config.nb_queries + cols - 1;
        let deg_q = pacs.constraint_degree() * input_degree + cols;
        // constraint polynomials are interpolated through 0..=deg_q
        if deg_q as u64 >= field.modulus() {
            return Err(Error::Config(format!(
                "field of order {} too small for constraint polynomials of degree {deg_q}",
                field.modulus()
            )));
        }
        let support: Vec<u64> = (0..cols).map(|i| field.elem(i)).collect();
        let theta_polys = interpolate_theta(
            &field,
            &support,
            pacs.theta(),
            pacs.nb_parallel_constraints(),
            "theta",
        )?;
        let theta_prime_polys = interpolate_theta(
            &field,
            &support,
            pacs.theta_prime(),
            pacs.nb_aggregated_constraints(),
            "theta'",
        )?;

        let mut degrees = vec![input_degree; rows];
        degrees.extend(std::iter::repeat(deg_q).take(config.rho));
        let layout = UnivariateLayout::new(degrees, cols, config.nb_queries, config.layout_beta)?;
        let tree = TreeShape::new(&config.tree)?;
        let pcs = Pcs::new(field, hasher.clone(), Box::new(layout), tree, config.decs.clone())?;
        debug!(
            backend = hasher.name(),
            rows,
            cols,
            input_degree,
            deg_q,
            "protocol ready"
        );
        Ok(Self {
            pacs,
            hasher,
            codec: FieldCodec::new(field),
            config,
            field,
            pcs,
            support,
            input_degree,
            deg_q,
            theta_polys,
            theta_prime_polys,
        })
    }

    /// Constraint system being proven.
    pub fn pacs(&self) -> &P {
        &self.pacs
    }

    /// Parameters in use.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Underlying polynomial commitment.
    pub fn pcs(&self) -> &Pcs<H> {
        &self.pcs
    }

    /// Degree of the witness row polynomials.
    pub fn input_degree(&self) -> usize {
        self.input_degree
    }

    /// Degree of the batched constraint polynomials.
    pub fn constraint_poly_degree(&self) -> usize {
        self.deg_q
    }

    fn tail_len(&self) -> usize {
        self.deg_q - self.config.nb_queries
    }

    fn response_width(&self) -> usize {
        self.pacs.nb_rows() + self.config.rho
    }

    /// Worst-case proof size in bytes.
    pub fn proof_size(&self) -> usize {
        self.config.salt_size
            + DIGEST_SIZE
            + self.codec.encoded_len(self.config.rho * self.tail_len())
            + self
                .codec
                .encoded_len(self.config.nb_queries * self.response_width())
            + self.pcs.max_proof_size()
    }

    /// Whether proofs can differ in size.
    pub fn has_variable_proof_size(&self) -> bool {
        self.pcs.has_variable_proof_size()
    }

    /// Security estimate of the current parameters.
    pub fn security(&self) -> SecurityEstimate {
        let p = self.field.modulus();
        let m1 = self.pacs.nb_parallel_constraints();
        let m2 = self.pacs.nb_aggregated_constraints();
        let decs = self.pcs.lvcs().decs();
        SecurityEstimate {
            batching_bits: self.config.challenge_mode.soundness_bits(
                p,
                self.config.rho,
                m1 * self.pacs.nb_cols() + m2,
            ),
            query_bits: self.config.nb_queries as f64 * (p as f64 / self.deg_q as f64).log2(),
            decs_check_bits: decs.check_security_bits(),
            decs_opening_bits: decs.opening_security_bits(),
        }
    }

    /// Proves knowledge of `witness` with fresh randomness.
    pub fn prove(&self, witness: &Witness) -> Result<Proof> {
        self.prove_with_binding(witness, &[])
    }

    /// Proves knowledge of `witness`, binding the proof to `binding`.
    pub fn prove_with_binding(&self, witness: &Witness, binding: &[u8]) -> Result<Proof> {
        self.prove_with_rng(&mut rand::thread_rng(), witness, binding)
    }

    /// Proves knowledge of `witness` with randomness from `rng`.
    pub fn prove_with_rng<R: RngCore>(
        &self,
        rng: &mut R,
        witness: &Witness,
        binding: &[u8],
    ) -> Result<Proof> {
        Ok(self.prove_with_stats(rng, witness, binding)?.0)
    }

    /// Produces a proof together with per-stage timing information.
    #[instrument(skip_all, level = "debug", fields(backend = self.hasher.name()))]
    pub fn prove_with_stats<R: RngCore>(
        &self,
        rng: &mut R,
        witness: &Witness,
        binding: &[u8],
    ) -> Result<(Proof, ProofStats)> {
        if witness.nb_rows() != self.pacs.nb_rows() || witness.nb_cols() != self.pacs.nb_cols() {
            return Err(Error::Shape(format!(
                "witness is {}×{}, constraint system expects {}×{}",
                witness.nb_rows(),
                witness.nb_cols(),
                self.pacs.nb_rows(),
                self.pacs.nb_cols()
            )));
        }
        if !self.pacs.test_witness(witness) {
            return Err(Error::UnsatisfiedWitness(
                "a parallel or aggregated constraint does not vanish".into(),
            ));
        }
        let total_start = Instant::now();
        let mut stats = ProofStats::default();
        for attempt in 1..=MAX_PROVING_ATTEMPTS {
            stats.attempts = attempt;
            if let Some(proof) = self.prove_attempt(rng, witness, binding, &mut stats.stage_durations)? {
                stats.total_duration = total_start.elapsed();
                debug!(attempt, size = proof.len(), "proof ready");
                return Ok((proof, stats));
            }
            debug!(attempt, "evaluation points are degenerate, resampling");
        }
        Err(Error::DegenerateQueries {
            attempts: MAX_PROVING_ATTEMPTS,
        })
    }

    fn prove_attempt<R: RngCore>(
        &self,
        rng: &mut R,
        witness: &Witness,
        binding: &[u8],
        stages: &mut Vec<(&'static str, Duration)>,
    ) -> Result<Option<Proof>> {
        let field = &self.field;
        let nq = self.config.nb_queries;

        let start = Instant::now();
        let span = info_span!("commit").entered();
        let mut salt = vec![0u8; self.config.salt_size];
        rng.fill_bytes(&mut salt);
        let mut polys = Vec::with_capacity(self.response_width());
        for row in witness.rows() {
            let relations: Vec<Relation> = self
                .support
                .iter()
                .zip(row)
                .map(|(&x, &v)| Relation::evaluation(x, v))
                .collect();
            let high = field.sample_vec(rng, nq);
            polys.push(
                poly::restore_from_relations(field, &relations, &high, self.input_degree)
                    .ok_or_else(|| Error::Config("witness support is degenerate".into()))?,
            );
        }
        let zero_sum = [Relation::sum(self.support.clone(), 0)];
        for _ in 0..self.config.rho {
            let high = field.sample_vec(rng, self.deg_q);
            polys.push(
                poly::restore_from_relations(field, &zero_sum, &high, self.deg_q).ok_or_else(
                    || Error::Config("field characteristic divides the witness width".into()),
                )?,
            );
        }
        let (commitment, state) = self
            .pcs
            .commit(rng, &salt, &LayoutInput::Univariate(polys.clone()))?;
        drop(span);
        stages.push(("commit", start.elapsed()));

        let start = Instant::now();
        let span = info_span!("constraints").entered();
        let (wit_polys, mask_polys) = polys.split_at(self.pacs.nb_rows());
        let h_polys = self.hasher.hash(Domain::Commitment, &[binding, &commitment]);
        let batching = self.batching(&h_polys);
        let (parallel, aggregated) = self.constraint_polys(wit_polys)?;
        let mut piop_polys = Vec::with_capacity(self.config.rho);
        for (num, mask) in mask_polys.iter().enumerate() {
            let mut acc = mask.clone();
            for (gamma, constraint) in batching.gamma_polys[num].iter().zip(&parallel) {
                poly::add_scaled(field, &mut acc, &poly::mul(field, gamma, constraint), 1);
            }
            for (&gamma, constraint) in batching.gamma_prime[num].iter().zip(&aggregated) {
                poly::add_scaled(field, &mut acc, constraint, gamma);
            }
            piop_polys.push(poly::fit_to_len(field, acc, self.deg_q + 1).ok_or_else(|| {
                Error::Config("constraints exceed the declared constraint degree".into())
            })?);
        }
        let h_piop = self.piop_digest(&h_polys, &piop_polys);
        let queries = self.piop_queries(&h_piop);
        drop(span);
        stages.push(("constraints", start.elapsed()));
        if !self.queries_are_usable(&queries) {
            return Ok(None);
        }

        let start = Instant::now();
        let span = info_span!("opening").entered();
        let mut pcs_proof = ProofWriter::new(self.field);
        let response = self.pcs.open(
            state,
            &EvalQuery::Univariate(queries),
            &h_piop,
            &mut pcs_proof,
        )?;
        let EvalResponse::Univariate(values) = response else {
            return Err(Error::Shape("polynomial commitment returned a foreign response".into()));
        };
        let tail: Vec<u64> = piop_polys
            .iter()
            .flat_map(|p| p[nq + 1..].iter().copied())
            .collect();
        let mut out = ProofWriter::new(self.field);
        out.write_bytes(&salt);
        out.write_bytes(&h_piop);
        out.write_elements(&tail);
        out.write_elements(&values.concat());
        out.append(pcs_proof);
        drop(span);
        stages.push(("opening", start.elapsed()));
        Ok(Some(Proof::from_bytes(out.into_bytes())))
    }

    /// Checks a proof produced without binding.
    pub fn verify(&self, proof: &Proof) -> bool {
        self.verify_with_binding(proof, &[])
    }

    /// Checks a proof bound to `binding`.
    #[instrument(skip_all, level = "debug", fields(backend = self.hasher.name(), size = proof.len()))]
    pub fn verify_with_binding(&self, proof: &Proof, binding: &[u8]) -> bool {
        match self.recompute_piop_digest(proof.as_bytes(), binding) {
            Some((claimed, recomputed)) if claimed == recomputed => true,
            Some(_) => {
                debug!("transcript digest mismatch");
                false
            }
            None => false,
        }
    }

    /// Returns the claimed and the recomputed transcript digests.
    fn recompute_piop_digest(&self, bytes: &[u8], binding: &[u8]) -> Option<(Digest, Digest)> {
        let field = &self.field;
        let nq = self.config.nb_queries;
        let rows = self.pacs.nb_rows();
        let tail_len = self.tail_len();

        let mut reader = ProofReader::new(self.field, bytes);
        let Some(salt) = reader.read_bytes(self.config.salt_size) else {
            debug!("proof shorter than its salt");
            return None;
        };
        let h_piop: Digest = reader.read_array::<DIGEST_SIZE>()?;
        let Some(tail) = reader.read_elements(self.config.rho * tail_len) else {
            debug!("malformed tail coefficients");
            return None;
        };
        let Some(flat) = reader.read_elements(nq * self.response_width()) else {
            debug!("malformed evaluations");
            return None;
        };
        let values: Vec<Vec<u64>> = flat
            .chunks(self.response_width())
            .map(<[u64]>::to_vec)
            .collect();

        let queries = self.piop_queries(&h_piop);
        if !self.queries_are_usable(&queries) {
            debug!("transcript digest yields degenerate evaluation points");
            return None;
        }
        let commitment = self.pcs.recompute_commitment(
            salt,
            &EvalQuery::Univariate(queries.clone()),
            &EvalResponse::Univariate(values.clone()),
            &h_piop,
            &mut reader,
        )?;
        if !reader.is_empty() {
            debug!(trailing = reader.remaining(), "unexpected bytes after the opening proof");
            return None;
        }

        let h_polys = self.hasher.hash(Domain::Commitment, &[binding, &commitment]);
        let batching = self.batching(&h_polys);
        let mut piop_evals = Vec::with_capacity(nq);
        for (&x, response) in queries.iter().zip(&values) {
            let (inputs, masks) = response.split_at(rows);
            let Some((parallel, aggregated)) = self.evaluate_constraints(inputs, x) else {
                debug!("constraint system returned the wrong number of values");
                return None;
            };
            piop_evals.push(self.batch_at(&batching, &parallel, &aggregated, masks, x));
        }
        let mut piop_polys = Vec::with_capacity(self.config.rho);
        for (num, high) in tail.chunks(tail_len).enumerate() {
            let evals: Vec<u64> = piop_evals.iter().map(|e| e[num]).collect();
            let relations = self.recovery_relations(&queries, &evals);
            piop_polys.push(poly::restore_from_relations(field, &relations, high, self.deg_q)?);
        }
        Some((h_piop, self.piop_digest(&h_polys, &piop_polys)))
    }

    fn batching(&self, h_polys: &Digest) -> Batching {
        let cols = self.pacs.nb_cols();
        let m1 = self.pacs.nb_parallel_constraints();
        let m2 = self.pacs.nb_aggregated_constraints();
        let mut stream = self.hasher.xof(Domain::Batching, &[h_polys]);
        let rlc = derive_rlc(
            &self.field,
            &mut stream,
            self.config.challenge_mode,
            self.config.rho,
            m1 * cols + m2,
        );
        let (gamma_polys, gamma_prime): (Vec<Vec<Vec<u64>>>, Vec<Vec<u64>>) = rlc
            .into_iter()
            .map(|row| {
                let (polys, prime) = row.split_at(m1 * cols);
                (
                    polys.chunks(cols).map(<[u64]>::to_vec).collect::<Vec<_>>(),
                    prime.to_vec(),
                )
            })
            .unzip();
        Batching {
            gamma_polys,
            gamma_prime,
        }
    }

    /// Parallel and aggregated constraint values at `x`, or `None` when the
    /// constraint system returns the wrong number of values.
    fn evaluate_constraints(&self, values: &[u64], x: u64) -> Option<(Vec<u64>, Vec<u64>)> {
        let theta = evaluate_theta(&self.field, &self.theta_polys, x);
        let theta_prime = evaluate_theta(&self.field, &self.theta_prime_polys, x);
        let parallel = self.pacs.evaluate_parallel(values, &theta);
        let aggregated = self.pacs.evaluate_aggregated(values, &theta_prime);
        (parallel.len() == self.pacs.nb_parallel_constraints()
            && aggregated.len() == self.pacs.nb_aggregated_constraints())
        .then_some((parallel, aggregated))
    }

    /// Interpolates the constraint polynomials through `0..=deg_q`.
    fn constraint_polys(&self, wit_polys: &[Vec<u64>]) -> Result<(Vec<Vec<u64>>, Vec<Vec<u64>>)> {
        let field = &self.field;
        let points: Vec<u64> = (0..=self.deg_q).map(|i| field.elem(i)).collect();
        let evals = map_indices(points.len(), |i| {
            let x = points[i];
            let values: Vec<u64> = wit_polys.iter().map(|p| poly::eval(field, p, x)).collect();
            self.evaluate_constraints(&values, x)
        });
        let evals = evals
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::Shape("constraint system returned the wrong number of values".into()))?;
        let interpolate = |ys: Vec<u64>| poly::interpolate(field, &points, &ys);
        let parallel = (0..self.pacs.nb_parallel_constraints())
            .map(|j| interpolate(evals.iter().map(|(p, _)| p[j]).collect()))
            .collect();
        let aggregated = (0..self.pacs.nb_aggregated_constraints())
            .map(|j| interpolate(evals.iter().map(|(_, a)| a[j]).collect()))
            .collect();
        Ok((parallel, aggregated))
    }

    /// Values of the batched polynomials at `x` from the opened values.
    fn batch_at(
        &self,
        batching: &Batching,
        parallel: &[u64],
        aggregated: &[u64],
        masks: &[u64],
        x: u64,
    ) -> Vec<u64> {
        let field = &self.field;
        masks
            .iter()
            .enumerate()
            .map(|(num, &mask)| {
                let mut acc = mask;
                for (gamma, &v) in batching.gamma_polys[num].iter().zip(parallel) {
                    acc = field.add(acc, field.mul(poly::eval(field, gamma, x), v));
                }
                for (&gamma, &v) in batching.gamma_prime[num].iter().zip(aggregated) {
                    acc = field.add(acc, field.mul(gamma, v));
                }
                acc
            })
            .collect()
    }

    /// Zero sum over the support, then one evaluation per point.
    fn recovery_relations(&self, queries: &[u64], evals: &[u64]) -> Vec<Relation> {
        std::iter::once(Relation::sum(self.support.clone(), 0))
            .chain(
                queries
                    .iter()
                    .zip(evals)
                    .map(|(&x, &v)| Relation::evaluation(x, v)),
            )
            .collect()
    }

    fn piop_digest(&self, h_polys: &Digest, piop_polys: &[Vec<u64>]) -> Digest {
        let mut encoded = Vec::new();
        for p in piop_polys {
            self.codec.encode_into(p, &mut encoded);
        }
        self.hasher.hash(Domain::PiopTranscript, &[h_polys, &encoded])
    }

    fn piop_queries(&self, h_piop: &Digest) -> Vec<u64> {
        let mut stream = self.hasher.xof(Domain::PiopQueries, &[h_piop]);
        self.codec.sample(&mut stream, self.config.nb_queries)
    }

    /// Whether the points are accepted by the layout and determine the
    /// batched polynomials.
    fn queries_are_usable(&self, queries: &[u64]) -> bool {
        if !self
            .pcs
            .layout()
            .check_query(&EvalQuery::Univariate(queries.to_vec()))
        {
            return false;
        }
        let zeros = vec![0u64; queries.len()];
        let high = vec![0u64; self.tail_len()];
        poly::restore_from_relations(
            &self.field,
            &self.recovery_relations(queries, &zeros),
            &high,
            self.deg_q,
        )
        .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Blake2bHasher, ShakeHasher};
    use crate::pacs::SquareChain;
    use rand::{rngs::StdRng, SeedableRng};

    fn scenario_config() -> ProtocolConfig {
        let mut config = ProtocolConfig::new(1, 2, TreeConfig::new(16, vec![4, 4]), DecsConfig::new(10, 2));
        config.layout_beta = 2;
        config
    }

    fn scenario() -> (SquareChain, Witness) {
        let pacs = SquareChain::new(Field::new(101), 3, 2, 16).unwrap();
        let witness = Witness::from_rows(vec![vec![2, 4], vec![4, 16], vec![16, 54]]).unwrap();
        (pacs, witness)
    }

    #[test]
    fn scenario_proof_verifies() {
        let (pacs, witness) = scenario();
        assert!(pacs.test_witness(&witness));
        let protocol = Protocol::new(pacs, ShakeHasher, scenario_config()).unwrap();
        assert_eq!(protocol.input_degree(), 2);
        assert_eq!(protocol.constraint_poly_degree(), 6);
        let mut rng = StdRng::seed_from_u64(2024);
        let (proof, stats) = protocol.prove_with_stats(&mut rng, &witness, &[]).unwrap();
        assert!(stats.attempts >= 1);
        assert!(stats.stage_durations.len() >= 2);
        assert!(protocol.verify(&proof));
        assert!(proof.len() <= protocol.proof_size());
    }

    #[test]
    fn every_single_bit_flip_is_rejected() {
        let (pacs, witness) = scenario();
        let protocol = Protocol::new(pacs, ShakeHasher, scenario_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let proof = protocol.prove_with_rng(&mut rng, &witness, &[]).unwrap();
        let bytes = proof.as_bytes();
        for i in 0..bytes.len() {
            for bit in 0..8 {
                let mut tampered = bytes.to_vec();
                tampered[i] ^= 1 << bit;
                assert!(
                    !protocol.verify(&Proof::from_bytes(tampered)),
                    "flip of bit {bit} in byte {i} accepted"
                );
            }
        }
        let mut longer = bytes.to_vec();
        longer.push(0);
        assert!(!protocol.verify(&Proof::from_bytes(longer)));
        assert!(!protocol.verify(&Proof::from_bytes(bytes[..bytes.len() - 1].to_vec())));
        assert!(!protocol.verify(&Proof::from_bytes(Vec::new())));
    }

    #[test]
    fn binding_is_enforced() {
        let (pacs, witness) = scenario();
        let protocol = Protocol::new(pacs, ShakeHasher, scenario_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let proof = protocol.prove_with_rng(&mut rng, &witness, b"message").unwrap();
        assert!(protocol.verify_with_binding(&proof, b"message"));
        assert!(!protocol.verify_with_binding(&proof, b"massage"));
        assert!(!protocol.verify(&proof));
    }

    #[test]
    fn challenge_modes_and_backends_round_trip() {
        for mode in [ChallengeMode::Powers, ChallengeMode::Uniform, ChallengeMode::Hybrid] {
            let (pacs, witness) = scenario();
            let mut config = scenario_config();
            config.challenge_mode = mode;
            config.decs.challenge_mode = mode;
            let protocol = Protocol::new(pacs, Blake2bHasher, config).unwrap();
            let mut rng = StdRng::seed_from_u64(3);
            let proof = protocol.prove_with_rng(&mut rng, &witness, &[]).unwrap();
            assert!(protocol.verify(&proof), "mode {mode:?}");
        }
    }

    #[test]
    fn linked_chain_over_a_large_field() {
        let field = Field::new(2_013_265_921);
        let mut rng = StdRng::seed_from_u64(99);
        let (pacs, witness) = SquareChain::random_instance(field, 4, 8, &mut rng).unwrap();
        let mut config = ProtocolConfig::new(
            2,
            3,
            TreeConfig::new(64, vec![4, 4, 4]).with_truncation(1).with_expansion(),
            DecsConfig::new(12, 3),
        );
        config.decs.pow_bits = 2;
        config.layout_beta = 3;
        let protocol = Protocol::new(pacs, ShakeHasher, config).unwrap();
        let proof = protocol.prove_with_rng(&mut rng, &witness, b"ctx").unwrap();
        assert!(protocol.verify_with_binding(&proof, b"ctx"));
        assert!(!protocol.has_variable_proof_size());
        assert_eq!(proof.len(), protocol.proof_size());
        assert!(protocol.security().bits() > 0.0);
    }

    #[test]
    fn unsatisfied_witness_is_refused() {
        let (pacs, _) = scenario();
        let protocol = Protocol::new(pacs, ShakeHasher, scenario_config()).unwrap();
        let bad = Witness::from_rows(vec![vec![2, 4], vec![4, 16], vec![16, 55]]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            protocol.prove_with_rng(&mut rng, &bad, &[]),
            Err(Error::UnsatisfiedWitness(_))
        ));
        let narrow = Witness::from_rows(vec![vec![2], vec![4], vec![16]]).unwrap();
        assert!(matches!(
            protocol.prove_with_rng(&mut rng, &narrow, &[]),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn configuration_is_validated_and_serializable() {
        let config = scenario_config();
        let json = config.to_json().unwrap();
        assert_eq!(ProtocolConfig::from_json(&json).unwrap(), config);
        assert!(matches!(ProtocolConfig::from_json("{"), Err(Error::Encoding(_))));

        let minimal = r#"{
            "nb_queries": 1,
            "rho": 2,
            "tree": { "nb_leaves": 16, "arity": [4, 4] },
            "decs": { "nb_queries": 10, "eta": 2 }
        }"#;
        let parsed = ProtocolConfig::from_json(minimal).unwrap();
        assert_eq!(parsed.salt_size, 16);
        assert_eq!(parsed.layout_beta, 1);

        let (pacs, _) = scenario();
        let mut zero_rho = scenario_config();
        zero_rho.rho = 0;
        assert!(matches!(
            Protocol::new(pacs.clone(), ShakeHasher, zero_rho),
            Err(Error::Config(_))
        ));
        let mut too_many_leaves = scenario_config();
        too_many_leaves.tree = TreeConfig::new(256, vec![16, 16]);
        assert!(Protocol::new(pacs, ShakeHasher, too_many_leaves).is_err());
    }
}
