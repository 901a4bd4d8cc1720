//! Points of the residue ring Z_N used by Fujisaki-Okamoto commitments.
//!
//! A [`Residue`] carries its own modulus, so operations between residues of different rings are
//! rejected with [`Error::ModulusMismatch`] instead of producing garbage. Exponents are signed
//! integers; a negative exponent inverts the base first, which requires the base to be a unit.
//!
//! Any reduced value may be constructed locally, but only units of Z*_N are accepted when a
//! residue is deserialized: commitments and generators received from peers must be invertible.
//!
//! ```
//! # use anonrep_crypto::residue::Residue;
//! # use num_bigint::{BigInt, BigUint};
//! let n = BigUint::from(77u32);
//! let four = Residue::new(BigUint::from(4u32), n.clone()).unwrap();
//! let inverse = four.pow(&BigInt::from(-1)).unwrap();
//! assert!(four.mul(&inverse).unwrap().is_one());
//! ```

use crate::{integer::mod_inverse, Error};
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// An element of Z_N.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawResidue")]
pub struct Residue {
    value: BigUint,
    modulus: BigUint,
}

#[derive(Deserialize)]
struct RawResidue {
    value: BigUint,
    modulus: BigUint,
}

impl TryFrom<RawResidue> for Residue {
    type Error = Error;

    fn try_from(raw: RawResidue) -> Result<Self, Self::Error> {
        let residue = Residue::new(raw.value, raw.modulus)?;
        if residue.is_unit() {
            Ok(residue)
        } else {
            Err(Error::NotAUnit)
        }
    }
}

impl fmt::Debug for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Residue({} mod {})", self.value, self.modulus)
    }
}

impl Residue {
    /// Construct a residue from a canonical value `0 <= value < modulus`.
    pub fn new(value: BigUint, modulus: BigUint) -> Result<Self, Error> {
        if modulus <= BigUint::one() {
            return Err(Error::Decode(format!("modulus {} is too small", modulus)));
        }
        if value >= modulus {
            return Err(Error::Decode(format!(
                "value {} is not reduced modulo {}",
                value, modulus
            )));
        }
        Ok(Self { value, modulus })
    }

    /// Reduce an arbitrary integer into the ring.
    pub fn from_integer(value: &BigInt, modulus: &BigUint) -> Self {
        let reduced = value
            .mod_floor(&BigInt::from(modulus.clone()))
            .to_biguint()
            .expect("floor modulus of a positive modulus is non-negative");
        Self {
            value: reduced,
            modulus: modulus.clone(),
        }
    }

    /// The multiplicative identity of the ring.
    pub fn one(modulus: &BigUint) -> Self {
        Self {
            value: BigUint::one(),
            modulus: modulus.clone(),
        }
    }

    /// The canonical representative of this residue.
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// The modulus of the ring this residue lives in.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// The representative as a signed integer.
    pub fn to_integer(&self) -> BigInt {
        BigInt::from_biguint(Sign::Plus, self.value.clone())
    }

    /// Whether this residue is the multiplicative identity.
    pub fn is_one(&self) -> bool {
        self.value.is_one()
    }

    /// Whether this residue is invertible modulo N.
    pub fn is_unit(&self) -> bool {
        !self.value.is_zero() && self.value.gcd(&self.modulus).is_one()
    }

    fn same_ring(&self, other: &Self) -> Result<(), Error> {
        if self.modulus == other.modulus {
            Ok(())
        } else {
            Err(Error::ModulusMismatch)
        }
    }

    /// Ring addition.
    pub fn add(&self, other: &Self) -> Result<Self, Error> {
        self.same_ring(other)?;
        Ok(Self {
            value: (&self.value + &other.value) % &self.modulus,
            modulus: self.modulus.clone(),
        })
    }

    /// Ring subtraction.
    pub fn sub(&self, other: &Self) -> Result<Self, Error> {
        self.same_ring(other)?;
        Ok(Self {
            value: (&self.value + &self.modulus - &other.value) % &self.modulus,
            modulus: self.modulus.clone(),
        })
    }

    /// Ring multiplication; the group operation of Z*_N.
    pub fn mul(&self, other: &Self) -> Result<Self, Error> {
        self.same_ring(other)?;
        Ok(Self {
            value: (&self.value * &other.value) % &self.modulus,
            modulus: self.modulus.clone(),
        })
    }

    /// Multiplicative inverse, if this residue is a unit.
    pub fn inverse(&self) -> Result<Self, Error> {
        let value = mod_inverse(&self.value, &self.modulus).ok_or(Error::NotAUnit)?;
        Ok(Self {
            value,
            modulus: self.modulus.clone(),
        })
    }

    /// Raise this residue to a signed exponent.
    pub fn pow(&self, exponent: &BigInt) -> Result<Self, Error> {
        let (base, magnitude) = match exponent.sign() {
            Sign::Minus => (self.inverse()?, exponent.magnitude()),
            _ => (self.clone(), exponent.magnitude()),
        };
        Ok(Self {
            value: base.value.modpow(magnitude, &self.modulus),
            modulus: self.modulus.clone(),
        })
    }
}
