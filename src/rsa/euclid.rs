// Extended Euclidean algorithm with the early stop at remainder 1
// Used to derive the private exponent from e and φ(n)

use crate::error::{Error, Result};

/// Bézout coefficients `(a, b)` with `a * tal + b * faktor == 1`.
///
/// Divides repeatedly, recording each quotient, until a remainder of exactly 1
/// shows up, then folds the quotients back to front. `tal` and `faktor` must be
/// coprime; a zero remainder before reaching 1 is reported as a precondition
/// error.
pub fn euclid(tal: u64, faktor: u64) -> Result<(i128, i128)> {
    if faktor == 0 {
        return Err(Error::Precondition("euclid: divisor must be positive".to_string()));
    }
    if faktor == 1 {
        return Ok((0, 1));
    }

    let mut quotients = Vec::new();
    let (mut dividend, mut divisor) = (tal, faktor);
    loop {
        let rest = dividend % divisor;
        quotients.push(i128::from(dividend / divisor));
        match rest {
            1 => break,
            0 => {
                return Err(Error::Precondition(format!(
                    "euclid: {tal} and {faktor} are not coprime"
                )))
            }
            _ => (dividend, divisor) = (divisor, rest),
        }
    }

    let mut quotients = quotients.into_iter().rev();
    let last = quotients.next().unwrap_or_default();
    let (mut a, mut b) = (1i128, -last);
    for q in quotients {
        (a, b) = (b, a - b * q);
    }

    Ok((a, b))
}

/// Multiplicative inverse of `value` modulo `modulus`, normalized into `[0, modulus)`.
pub fn modular_inverse(value: u64, modulus: u64) -> Result<u64> {
    if modulus < 2 {
        return Err(Error::Precondition(format!(
            "modular inverse needs a modulus above 1, got {modulus}"
        )));
    }

    let reduced = value % modulus;
    let (_, b) = euclid(modulus, reduced)?;
    let inverse = b.rem_euclid(i128::from(modulus));

    // rem_euclid keeps it in [0, modulus)
    u64::try_from(inverse)
        .map_err(|_| Error::Precondition("modular inverse out of range".to_string()))
}
