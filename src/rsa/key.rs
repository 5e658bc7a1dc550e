// RSA key pair values and their textual form
// A key file holds "<exponent>,<modulus>" in decimal

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::rsa::bigint::bit_length;

/// One half of an RSA identity: (e, n) for the public side, (d, n) for the private side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keypair {
    pub exponent: u64,
    pub modulus: u64,
}

impl Keypair {
    /// Build a keypair, rejecting values no block can be transformed with.
    pub fn new(exponent: u64, modulus: u64) -> Result<Self> {
        if exponent == 0 {
            return Err(Error::Precondition("exponent must be positive".to_string()));
        }
        if modulus < 2 {
            return Err(Error::Precondition(format!(
                "modulus must be at least 2, got {modulus}"
            )));
        }
        Ok(Self { exponent, modulus })
    }

    /// Bit length of the modulus
    pub fn bit_length(&self) -> u32 {
        bit_length(self.modulus)
    }

    /// Bytes per plaintext block: floor(bits / 8), at least 1
    pub fn block_bytes(&self) -> usize {
        ((self.bit_length() / 8) as usize).max(1)
    }
}

impl fmt::Display for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.exponent, self.modulus)
    }
}

impl FromStr for Keypair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_suffix('\n').unwrap_or(s);
        let s = s.strip_suffix('\r').unwrap_or(s);

        let fields: Vec<&str> = s.split(',').collect();
        let [exponent, modulus] = fields.as_slice() else {
            return Err(Error::Format(format!(
                "expected \"<exponent>,<modulus>\", found {} field(s)",
                fields.len()
            )));
        };

        let parse = |name: &str, field: &str| {
            // u64::from_str accepts a leading '+', the key format does not
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::Format(format!("{name} `{field}` is not an unsigned decimal")));
            }
            field
                .parse::<u64>()
                .map_err(|e| Error::Format(format!("{name} `{field}`: {e}")))
        };

        Keypair::new(parse("exponent", *exponent)?, parse("modulus", *modulus)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_bytes() {
        assert_eq!(Keypair::new(3, 33).unwrap().block_bytes(), 1);
        assert_eq!(Keypair::new(3, 255).unwrap().block_bytes(), 1);
        assert_eq!(Keypair::new(3, 65535).unwrap().block_bytes(), 2);
        assert_eq!(Keypair::new(512355097, 9434638355779701059).unwrap().block_bytes(), 8);
    }

    #[test]
    fn test_text_form() {
        let key: Keypair = "512355097,9434638355779701059".parse().unwrap();
        assert_eq!(key.exponent, 512355097);
        assert_eq!(key.modulus, 9434638355779701059);
        assert_eq!(key.to_string(), "512355097,9434638355779701059");

        let key: Keypair = "7,33\n".parse().unwrap();
        assert_eq!(key, Keypair { exponent: 7, modulus: 33 });
    }

    #[test]
    fn test_malformed_text() {
        let malformed = [
            "",
            "7",
            "7,33,5",
            "7, 33",
            "x,33",
            "7,",
            "-7,33",
            "+7,33",
            "7,18446744073709551616",
        ];
        for bad in malformed {
            assert!(matches!(bad.parse::<Keypair>(), Err(Error::Format(_))), "{bad:?}");
        }
        assert!(matches!("0,33".parse::<Keypair>(), Err(Error::Precondition(_))));
        assert!(matches!("3,1".parse::<Keypair>(), Err(Error::Precondition(_))));
    }
}
