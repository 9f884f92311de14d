//! Degree-enforcing commitment (DEC).
//!
//! The DEC commits to `nb_polys` polynomials of degree at most `D` through
//! their evaluations at the `N` points `1, 2, …, N` (one leaf per point) and
//! lets the verifier test the degree bound from `nb_queries` opened leaves:
//!
//! 1. the committer samples `η` masking polynomials of degree `D` and hashes,
//!    for every leaf, the salted share vector (all polynomial evaluations
//!    followed by all mask evaluations) into an [`AuthenticatedTree`];
//! 2. a random-linear-combination challenge derived from `hash(salt, root)`
//!    defines `η` check polynomials `εⱼ = Σₖ γⱼₖ·Pₖ + Mⱼ`;
//! 3. the commitment is `hash(salt, root)` followed by every coefficient of
//!    every check polynomial.
//!
//! An opening reveals the polynomial and mask evaluations at the queried
//! leaves, the coefficients of each `εⱼ` above `X^{nb_queries-1}` and one
//! authentication path.  The verifier recovers the low coefficients of each
//! `εⱼ` from the opened shares and rebuilds the whole commitment, so a
//! committed polynomial of degree above `D` is caught unless every queried
//! point happens to be a root of the discrepancy.
//!
//! Query positions are derived by grinding: a 4-byte counter nonce and a
//! caller-supplied binding are fed to the XOF until the drawn leaf indices are
//! in range, pairwise distinct and the trailing proof-of-work word has
//! `pow_bits` zero bits.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::challenge::{derive_rlc, ChallengeMode};
use crate::codec::{FieldCodec, ProofReader, ProofWriter};
use crate::error::{Error, Result};
use crate::hash::{Digest, Domain, HashBackend, XofStream, DIGEST_SIZE};
use crate::merkle::{AuthenticatedTree, TreeShape};
use crate::parallel::map_indices;
use crate::poly::{self, Relation};
use crate::Field;

const DEFAULT_OPENING_ATTEMPTS: u32 = 1 << 20;

fn default_opening_attempts() -> u32 {
    DEFAULT_OPENING_ATTEMPTS
}

/// Serializable DEC parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecsConfig {
    /// Number of opened leaves.
    pub nb_queries: usize,
    /// Number of masking / check polynomials.
    pub eta: usize,
    /// Proof-of-work bits required from the opening challenge.
    #[serde(default)]
    pub pow_bits: u32,
    /// Format of the check-polynomial challenge.
    #[serde(default)]
    pub challenge_mode: ChallengeMode,
    /// Cap on the number of nonces tried when grinding the opening.
    #[serde(default = "default_opening_attempts")]
    pub max_opening_attempts: u32,
}

impl DecsConfig {
    /// Parameters with no grinding and a uniform challenge.
    pub fn new(nb_queries: usize, eta: usize) -> Self {
        Self {
            nb_queries,
            eta,
            pow_bits: 0,
            challenge_mode: ChallengeMode::default(),
            max_opening_attempts: DEFAULT_OPENING_ATTEMPTS,
        }
    }
}

/// Prover-side state between [`Decs::commit`] and [`Decs::open`].
#[derive(Debug, Clone)]
pub struct DecsState {
    shares: Vec<Vec<u64>>,
    tree: AuthenticatedTree,
    checks: Vec<Vec<u64>>,
}

/// Degree-enforcing commitment scheme for a fixed shape.
#[derive(Debug, Clone)]
pub struct Decs<H: HashBackend> {
    field: Field,
    codec: FieldCodec,
    hasher: H,
    tree: TreeShape,
    nb_polys: usize,
    degree: usize,
    config: DecsConfig,
}

impl<H: HashBackend> Decs<H> {
    /// Builds the scheme for `nb_polys` polynomials of degree at most `degree`.
    pub fn new(
        field: Field,
        hasher: H,
        tree: TreeShape,
        nb_polys: usize,
        degree: usize,
        config: DecsConfig,
    ) -> Result<Self> {
        if nb_polys == 0 || config.eta == 0 {
            return Err(Error::Config(
                "DEC needs at least one polynomial and one mask".into(),
            ));
        }
        if config.nb_queries == 0 || config.nb_queries > degree {
            return Err(Error::Config(format!(
                "DEC opens {} leaves but the degree bound is {degree}",
                config.nb_queries
            )));
        }
        if config.nb_queries > tree.nb_leaves() {
            return Err(Error::Config(format!(
                "cannot open {} distinct leaves out of {}",
                config.nb_queries,
                tree.nb_leaves()
            )));
        }
        if tree.nb_leaves() as u64 >= field.modulus() || tree.nb_leaves() > u32::MAX as usize {
            return Err(Error::Config(format!(
                "{} evaluation points do not fit in the field of order {}",
                tree.nb_leaves(),
                field.modulus()
            )));
        }
        if config.pow_bits > 32 {
            return Err(Error::Config("at most 32 proof-of-work bits".into()));
        }
        Ok(Self {
            field,
            codec: FieldCodec::new(field),
            hasher,
            tree,
            nb_polys,
            degree,
            config,
        })
    }

    /// Number of committed polynomials.
    pub fn nb_polys(&self) -> usize {
        self.nb_polys
    }

    /// Degree bound `D`.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of opened leaves.
    pub fn nb_queries(&self) -> usize {
        self.config.nb_queries
    }

    /// Tree geometry.
    pub fn tree(&self) -> &TreeShape {
        &self.tree
    }

    /// Evaluation point attached to `leaf`.
    pub fn evaluation_point(&self, leaf: usize) -> u64 {
        self.field.elem(leaf + 1)
    }

    /// Size in bytes of a commitment.
    pub fn commitment_size(&self) -> usize {
        DIGEST_SIZE + self.config.eta * self.codec.encoded_len(self.degree + 1)
    }

    /// Size of the proof without its authentication path.
    pub fn partial_proof_size(&self) -> usize {
        let nq = self.config.nb_queries;
        nq * self.codec.encoded_len(self.config.eta)
            + self.config.eta * self.codec.encoded_len(self.degree + 1 - nq)
    }

    /// Exact proof size when opening `leaves`.
    pub fn proof_size(&self, leaves: &[usize]) -> usize {
        let mut sorted = leaves.to_vec();
        if self.tree.requires_sorted_indices() {
            sorted.sort_unstable();
        }
        self.partial_proof_size() + DIGEST_SIZE * self.tree.path_size(&sorted)
    }

    /// Worst-case proof size.
    pub fn max_proof_size(&self) -> usize {
        self.partial_proof_size() + DIGEST_SIZE * self.tree.max_path_size(self.config.nb_queries)
    }

    /// Whether proofs for different openings can differ in size.
    pub fn has_variable_proof_size(&self) -> bool {
        self.tree.has_variable_path_size()
    }

    /// Bits of soundness of the degree test.
    pub fn check_security_bits(&self) -> f64 {
        self.config
            .challenge_mode
            .soundness_bits(self.field.modulus(), self.config.eta, self.nb_polys)
            - log2_binomial(self.tree.nb_leaves(), self.degree + 2)
    }

    /// Bits of soundness of the opening challenge, grinding included.
    pub fn opening_security_bits(&self) -> f64 {
        let nq = self.config.nb_queries;
        log2_binomial(self.tree.nb_leaves(), nq) - log2_binomial(self.degree, nq)
            + f64::from(self.config.pow_bits)
    }

    /// Commits to `polys` (coefficient vectors of degree at most `D`).
    #[instrument(skip_all, level = "debug", fields(nb_polys = self.nb_polys, degree = self.degree))]
    pub fn commit<R: RngCore>(
        &self,
        rng: &mut R,
        salt: &[u8],
        polys: &[Vec<u64>],
    ) -> Result<(Vec<u8>, DecsState)> {
        if polys.len() != self.nb_polys {
            return Err(Error::Shape(format!(
                "DEC expects {} polynomials, got {}",
                self.nb_polys,
                polys.len()
            )));
        }
        let polys = polys
            .iter()
            .map(|p| {
                poly::fit_to_len(&self.field, p.clone(), self.degree + 1).ok_or_else(|| {
                    Error::Shape(format!("polynomial exceeds degree bound {}", self.degree))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let masks = (0..self.config.eta)
            .map(|_| self.field.sample_vec(rng, self.degree + 1))
            .collect();
        self.commit_with_masks(salt, &polys, masks)
    }

    fn commit_with_masks(
        &self,
        salt: &[u8],
        polys: &[Vec<u64>],
        masks: Vec<Vec<u64>>,
    ) -> Result<(Vec<u8>, DecsState)> {
        let field = self.field;
        let shares = map_indices(self.tree.nb_leaves(), |leaf| {
            let x = self.evaluation_point(leaf);
            polys
                .iter()
                .chain(&masks)
                .map(|p| poly::eval(&field, p, x))
                .collect::<Vec<u64>>()
        });
        let leaves = map_indices(shares.len(), |leaf| self.leaf_digest(salt, leaf, &shares[leaf]));
        let tree = self.tree.build(&self.hasher, leaves)?;
        let root_binding = self.root_binding(salt, &tree.root());
        let gamma = self.check_challenge(&root_binding);

        let mut checks = Vec::with_capacity(self.config.eta);
        for (mask, coeffs) in masks.iter().zip(&gamma) {
            let mut check = mask.clone();
            for (p, &g) in polys.iter().zip(coeffs) {
                poly::add_scaled(&field, &mut check, p, g);
            }
            check.truncate(self.degree + 1);
            checks.push(check);
        }
        let commitment = self.commitment_bytes(&root_binding, &checks);
        Ok((
            commitment,
            DecsState {
                shares,
                tree,
                checks,
            },
        ))
    }

    fn leaf_digest(&self, salt: &[u8], leaf: usize, share: &[u64]) -> Digest {
        let encoded = self.codec.encode(share);
        self.hasher.hash(
            Domain::DecsLeaf,
            &[salt, &(leaf as u32).to_le_bytes(), &encoded],
        )
    }

    fn root_binding(&self, salt: &[u8], root: &Digest) -> Digest {
        self.hasher.hash(Domain::DecsRoot, &[salt, root])
    }

    fn check_challenge(&self, root_binding: &Digest) -> Vec<Vec<u64>> {
        let mut stream = self.hasher.xof(Domain::DecsChallenge, &[root_binding]);
        derive_rlc(
            &self.field,
            &mut stream,
            self.config.challenge_mode,
            self.config.eta,
            self.nb_polys,
        )
    }

    fn commitment_bytes(&self, root_binding: &Digest, checks: &[Vec<u64>]) -> Vec<u8> {
        let mut out = root_binding.to_vec();
        for check in checks {
            self.codec.encode_into(check, &mut out);
        }
        out
    }

    fn opening_for_nonce(&self, nonce: u32, binding: &[u8]) -> Option<Vec<usize>> {
        let nb_leaves = self.tree.nb_leaves();
        let mask = nb_leaves.next_power_of_two() - 1;
        let mut stream = self
            .hasher
            .xof(Domain::DecsOpening, &[&nonce.to_le_bytes(), binding]);
        let mut leaves = Vec::with_capacity(self.config.nb_queries);
        for _ in 0..self.config.nb_queries {
            let leaf = stream.next_u32() as usize & mask;
            if leaf >= nb_leaves || leaves.contains(&leaf) {
                return None;
            }
            leaves.push(leaf);
        }
        let work = u64::from(stream.next_u32());
        let pow_mask = (1u64 << self.config.pow_bits) - 1;
        (work & pow_mask == 0).then_some(leaves)
    }

    /// Grinds for an admissible opening bound to `binding`.
    ///
    /// Returns the opened leaves and the nonce that produced them.
    pub fn sample_opening(&self, binding: &[u8]) -> Result<(Vec<usize>, u32)> {
        let attempts = self.config.max_opening_attempts;
        for nonce in 0..attempts {
            if let Some(leaves) = self.opening_for_nonce(nonce, binding) {
                debug!(nonce, "DEC opening challenge found");
                return Ok((leaves, nonce));
            }
        }
        Err(Error::OpeningSearchExhausted { attempts })
    }

    /// Replays the opening derivation for a given nonce; `None` if the nonce
    /// does not yield an admissible opening.
    pub fn recompute_opening(&self, nonce: u32, binding: &[u8]) -> Option<Vec<usize>> {
        self.opening_for_nonce(nonce, binding)
    }

    /// Opens the committed polynomials at `leaves`, appending the proof to
    /// `out` and returning the opened evaluations (one row per leaf).
    #[instrument(skip_all, level = "debug")]
    pub fn open(
        &self,
        state: DecsState,
        leaves: &[usize],
        out: &mut ProofWriter,
    ) -> Result<Vec<Vec<u64>>> {
        let nq = self.config.nb_queries;
        if leaves.len() != nq || !distinct_in_range(leaves, self.tree.nb_leaves()) {
            return Err(Error::Shape(format!(
                "DEC opening needs {nq} distinct leaves below {}",
                self.tree.nb_leaves()
            )));
        }
        let opened = leaves
            .iter()
            .map(|&l| state.shares[l][..self.nb_polys].to_vec())
            .collect();
        let mask_openings: Vec<Vec<u64>> = leaves
            .iter()
            .map(|&l| state.shares[l][self.nb_polys..].to_vec())
            .collect();
        out.write_rows(&mask_openings);
        for check in &state.checks {
            out.write_elements(&check[nq..]);
        }
        let mut sorted = leaves.to_vec();
        if self.tree.requires_sorted_indices() {
            sorted.sort_unstable();
        }
        out.write_digests(&state.tree.authentication_path(&sorted));
        Ok(opened)
    }

    /// Recomputes the commitment implied by an opening, reading the proof
    /// from `reader`.  Returns `None` on any inconsistency.
    pub fn recompute_commitment(
        &self,
        salt: &[u8],
        leaves: &[usize],
        opened: &[Vec<u64>],
        reader: &mut ProofReader<'_>,
    ) -> Option<Vec<u8>> {
        let nq = self.config.nb_queries;
        let eta = self.config.eta;
        if leaves.len() != nq
            || opened.len() != nq
            || opened.iter().any(|row| row.len() != self.nb_polys)
            || !distinct_in_range(leaves, self.tree.nb_leaves())
        {
            debug!("DEC opening has the wrong shape");
            return None;
        }
        let mask_openings = reader.read_rows(nq, eta)?;
        let high = reader.read_rows(eta, self.degree + 1 - nq)?;

        let mut opened_leaves: Vec<(usize, Digest)> = leaves
            .iter()
            .zip(opened.iter().zip(&mask_openings))
            .map(|(&leaf, (values, masks))| {
                let share: Vec<u64> = values.iter().chain(masks).copied().collect();
                (leaf, self.leaf_digest(salt, leaf, &share))
            })
            .collect();
        if self.tree.requires_sorted_indices() {
            opened_leaves.sort_unstable_by_key(|(leaf, _)| *leaf);
        }
        let sorted: Vec<usize> = opened_leaves.iter().map(|(leaf, _)| *leaf).collect();
        let path = reader.read_digests(self.tree.path_size(&sorted))?;
        let Some(root) = self.tree.root_from_path(&self.hasher, &opened_leaves, &path) else {
            debug!("DEC authentication path rejected");
            return None;
        };
        let root_binding = self.root_binding(salt, &root);
        let gamma = self.check_challenge(&root_binding);

        let field = self.field;
        let mut checks = Vec::with_capacity(eta);
        for (j, coeffs) in gamma.iter().enumerate() {
            let relations: Vec<Relation> = leaves
                .iter()
                .zip(opened.iter().zip(&mask_openings))
                .map(|(&leaf, (values, masks))| {
                    let value = field.add(field.dot(coeffs, values), masks[j]);
                    Relation::evaluation(self.evaluation_point(leaf), value)
                })
                .collect();
            checks.push(poly::restore_from_relations(
                &field,
                &relations,
                &high[j],
                self.degree,
            )?);
        }
        Some(self.commitment_bytes(&root_binding, &checks))
    }

    /// Checks an opening against `commitment`.
    pub fn verify(
        &self,
        salt: &[u8],
        commitment: &[u8],
        leaves: &[usize],
        opened: &[Vec<u64>],
        proof: &[u8],
    ) -> bool {
        let mut reader = ProofReader::new(self.field, proof);
        match self.recompute_commitment(salt, leaves, opened, &mut reader) {
            Some(recomputed) => reader.is_empty() && recomputed == commitment,
            None => false,
        }
    }
}

fn distinct_in_range(leaves: &[usize], bound: usize) -> bool {
    leaves
        .iter()
        .enumerate()
        .all(|(k, &leaf)| leaf < bound && !leaves[..k].contains(&leaf))
}

/// `log₂ C(n, k)`, or `-∞` when `k > n`.
pub(crate) fn log2_binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    let k = k.min(n - k);
    (0..k).map(|i| ((n - i) as f64 / (i + 1) as f64).log2()).sum()
}
