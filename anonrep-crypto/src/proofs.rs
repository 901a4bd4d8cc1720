//! Zero-knowledge proofs over the commitment schemes, made non-interactive with Fiat-Shamir.
//!
//! - [`NonnegProof`] shows that a Fujisaki-Okamoto commitment opens to a non-negative integer.
//! - [`EqualityProof`] shows that a Pedersen commitment and a Fujisaki-Okamoto commitment open to
//!   the same integer.
//! - [`DleqProof`] is the discrete-logarithm-equality building block of the verifiable shuffle.

mod challenge;
mod dleq;
mod equality;
mod nonneg;

pub use self::{challenge::*, dleq::*, equality::*, nonneg::*};
