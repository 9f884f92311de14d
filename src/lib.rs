#![deny(missing_docs)]

//! # smallwood
//!
//! A hash-based succinct argument of knowledge for packed algebraic
//! constraint systems.  A prover convinces a verifier that a secret witness
//! matrix satisfies a [`Pacs`](pacs::Pacs) with a transcript much smaller than
//! the witness and without revealing it.  Soundness rests only on the hash
//! functions; there is no trusted setup.
//!
//! The argument is built from four layered commitments:
//!
//! * **Authenticated tree** ([`merkle`]): multi-arity Merkle trees with
//!   optional truncation and a constant-size *expanded* path format.
//! * **DEC** ([`decs`]): a degree-enforcing commitment.  Polynomials are
//!   committed through their evaluations on the leaves of the tree, and a
//!   random-linear-combination test proves that every committed polynomial has
//!   degree at most `D`.
//! * **LVCS** ([`lvcs`]): a linear-combination vector commitment that opens
//!   linear combinations of committed rows.
//! * **PCS** ([`pcs`], [`layout`]): a polynomial commitment arranging
//!   univariate or multilinear polynomials as LVCS rows, the latter either
//!   as evaluation tables or as monomial coefficients.
//!
//! On top of these, [`protocol`] compiles a polynomial IOP for the constraint
//! system into a non-interactive argument with the Fiat–Shamir transform.
//! Hashing is injected through the [`HashBackend`](hash::HashBackend) trait;
//! SHAKE128 and BLAKE2b backends ship with the crate.
//!
//! ## Usage
//!
//! ```rust
//! use smallwood::{
//!     DecsConfig, Field, Protocol, ProtocolConfig, ShakeHasher, SquareChain, TreeConfig, Witness,
//! };
//!
//! // Knowledge of a column of repeated squarings ending on 16, modulo 101.
//! let pacs = SquareChain::new(Field::new(101), 3, 2, 16).unwrap();
//! let witness = Witness::from_rows(vec![vec![2, 4], vec![4, 16], vec![16, 54]]).unwrap();
//!
//! let mut config = ProtocolConfig::new(1, 2, TreeConfig::new(16, vec![4, 4]), DecsConfig::new(10, 2));
//! config.layout_beta = 2;
//! let protocol = Protocol::new(pacs, ShakeHasher, config).unwrap();
//!
//! let proof = protocol.prove(&witness).unwrap();
//! assert!(protocol.verify(&proof));
//! ```

pub mod challenge;
pub mod codec;
pub mod decs;
pub mod error;
mod field;
pub mod hash;
pub mod layout;
pub mod lvcs;
pub mod merkle;
pub mod multilinear;
pub mod pacs;
mod parallel;
pub mod pcs;
pub mod poly;
pub mod proof;
pub mod protocol;

pub use challenge::ChallengeMode;
pub use decs::{Decs, DecsConfig};
pub use error::{Error, Result};
pub use field::Field;
pub use hash::{Blake2bHasher, Digest, HashBackend, ShakeHasher};
pub use layout::{
    EvalQuery, EvalResponse, Layout, LayoutInput, MonomialLayout, MultiLayout, MultilinearLayout,
    PlainLayout, UnivariateLayout,
};
pub use lvcs::Lvcs;
pub use merkle::{AuthenticatedTree, TreeConfig, TreeShape};
pub use multilinear::MultilinearPolynomial;
pub use pacs::{Pacs, SquareChain, Witness};
pub use pcs::Pcs;
pub use proof::Proof;
pub use protocol::{Protocol, ProofStats, ProtocolConfig, SecurityEstimate};
