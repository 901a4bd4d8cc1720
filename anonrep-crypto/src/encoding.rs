//! Byte encoding for values that cross the wire.
//!
//! Everything the protocol layer embeds in a message implements [`Encode`]. The encoding is
//! bincode with a size limit, and decoding rejects trailing bytes, so a value has exactly one
//! accepted encoding.

use crate::Error;
use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

/// Largest encoded value accepted by [`Encode::from_bytes`].
pub const MAX_ENCODED_LEN: u64 = 1 << 24;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_ENCODED_LEN)
        .reject_trailing_bytes()
}

/// Conversion to and from the canonical byte encoding.
pub trait Encode: Serialize + DeserializeOwned {
    /// Encode this value.
    fn to_bytes(&self) -> Vec<u8> {
        options()
            .serialize(self)
            .expect("serializing into memory does not fail")
    }

    /// Decode a value, failing on malformed, oversized or trailing input.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        options()
            .deserialize(bytes)
            .map_err(|err| Error::Decode(err.to_string()))
    }
}

impl Encode for crate::residue::Residue {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::residue::Residue;
    use num_bigint::BigUint;

    #[test]
    fn residues_decode_only_from_exact_bytes() {
        let x = Residue::new(BigUint::from(9u32), BigUint::from(77u32)).unwrap();
        let bytes = x.to_bytes();
        assert_eq!(Residue::from_bytes(&bytes).unwrap(), x);

        assert!(Residue::from_bytes(&bytes[..bytes.len() - 1]).is_err());

        let mut extended = bytes;
        extended.push(0);
        assert!(matches!(
            Residue::from_bytes(&extended),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn non_units_are_rejected_when_decoding() {
        let n = BigUint::from(77u32);
        let zero_divisor = Residue::new(BigUint::from(14u32), n).unwrap();
        assert!(Residue::from_bytes(&zero_divisor.to_bytes()).is_err());
    }
}
