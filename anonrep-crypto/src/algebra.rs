//! A small capability trait shared by the two group backends.
//!
//! The prime-order BLS12-381 groups and the composite-order residue ring both implement
//! [`AbelianGroup`], which is what lets commitment code be written once over "a group with
//! exponentiation". The two backends stay distinct types with distinct exponent domains
//! ([`Scalar`] versus unreduced [`BigInt`]); nothing converts between them implicitly.

use crate::{common::*, residue::Residue, Error};
use num_bigint::BigInt;

/// An abelian group written multiplicatively.
pub trait AbelianGroup: Clone + PartialEq + Sized {
    /// The exponent domain of the group.
    type Exponent;

    /// Apply the group operation.
    fn operate(&self, other: &Self) -> Result<Self, Error>;

    /// Raise an element to the given exponent.
    fn power(&self, exponent: &Self::Exponent) -> Result<Self, Error>;

    /// Canonical byte encoding used in Fiat-Shamir transcripts.
    fn transcript_bytes(&self) -> Vec<u8>;
}

/// Compute `prod_i base_i ^ exponent_i` over a non-empty list of terms.
pub fn product_of_powers<G: AbelianGroup>(terms: &[(&G, &G::Exponent)]) -> Result<G, Error> {
    let ((first_base, first_exponent), rest) = terms
        .split_first()
        .ok_or(Error::LengthMismatch {
            expected: 1,
            got: 0,
        })?;
    let mut product = first_base.power(first_exponent)?;
    for (base, exponent) in rest {
        product = product.operate(&base.power(exponent)?)?;
    }
    Ok(product)
}

/// A two-generator commitment `g^x * h^r`, written once for both backends.
pub fn commit_pair<G: AbelianGroup>(
    g: &G,
    h: &G,
    value: &G::Exponent,
    randomness: &G::Exponent,
) -> Result<G, Error> {
    g.power(value)?.operate(&h.power(randomness)?)
}

impl AbelianGroup for G1Projective {
    type Exponent = Scalar;

    fn operate(&self, other: &Self) -> Result<Self, Error> {
        Ok(self + other)
    }

    fn power(&self, exponent: &Scalar) -> Result<Self, Error> {
        Ok(self * exponent)
    }

    fn transcript_bytes(&self) -> Vec<u8> {
        self.to_bytes().as_ref().to_vec()
    }
}

impl AbelianGroup for G2Projective {
    type Exponent = Scalar;

    fn operate(&self, other: &Self) -> Result<Self, Error> {
        Ok(self + other)
    }

    fn power(&self, exponent: &Scalar) -> Result<Self, Error> {
        Ok(self * exponent)
    }

    fn transcript_bytes(&self) -> Vec<u8> {
        self.to_bytes().as_ref().to_vec()
    }
}

impl AbelianGroup for Residue {
    type Exponent = BigInt;

    fn operate(&self, other: &Self) -> Result<Self, Error> {
        self.mul(other)
    }

    fn power(&self, exponent: &BigInt) -> Result<Self, Error> {
        self.pow(exponent)
    }

    fn transcript_bytes(&self) -> Vec<u8> {
        self.value().to_bytes_be()
    }
}
