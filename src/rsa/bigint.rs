// RSA Big Integer Operations
// Wrapper around num-bigint for the handful of operations the cipher needs

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::{ExtendedGcd, Integer};
use num_traits::{One, Zero};
use rand::Rng;

/// RSA Big Integer type alias
pub type RsaBigInt = BigUint;

/// Create a big integer from u64
pub fn from_u64(n: u64) -> RsaBigInt {
    RsaBigInt::from(n)
}

/// Create a big integer from bytes (big-endian)
pub fn from_bytes(bytes: &[u8]) -> RsaBigInt {
    RsaBigInt::from_bytes_be(bytes)
}

/// Convert big integer to its minimal big-endian bytes.
/// Zero serializes as a single `0x00`.
pub fn to_bytes(n: &RsaBigInt) -> Vec<u8> {
    n.to_bytes_be()
}

/// Number of significant bits in `n`
pub fn bit_length(n: u64) -> u32 {
    u64::BITS - n.leading_zeros()
}

/// Modular exponentiation: base^exp mod modulus
pub fn mod_pow(base: &RsaBigInt, exp: &RsaBigInt, modulus: &RsaBigInt) -> RsaBigInt {
    if modulus.is_one() {
        return RsaBigInt::zero();
    }
    base.modpow(exp, modulus)
}

/// Extended Euclidean Algorithm over signed integers.
/// Returns (gcd, x, y) such that a*x + b*y = gcd = gcd(a, b)
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let ExtendedGcd { gcd, x, y, .. } = a.extended_gcd(b);
    (gcd, x, y)
}

/// Miller-Rabin primality test
/// Returns true if n is probably prime
pub fn is_probable_prime<R: Rng + ?Sized>(n: &RsaBigInt, rounds: u32, rng: &mut R) -> bool {
    let two = RsaBigInt::from(2u8);
    let three = RsaBigInt::from(3u8);
    if n < &two {
        return false;
    }
    if n == &two || n == &three {
        return true;
    }
    if n.is_even() {
        return false;
    }

    // Write n-1 as d * 2^s with d odd
    let n_minus_one = n - 1u8;
    let mut d = n_minus_one.clone();
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1;
        s += 1;
    }

    let n_minus_two = n - 2u8;

    'witness: for _ in 0..rounds {
        // Pick random witness a in [2, n-2)
        let a = rng.gen_biguint_range(&two, &n_minus_two);

        let mut x = mod_pow(&a, &d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }

        for _ in 1..s {
            x = mod_pow(&x, &two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Random odd integer with exactly `bits` significant bits
pub fn random_odd_with_bits<R: Rng + ?Sized>(bits: u32, rng: &mut R) -> RsaBigInt {
    let lower = RsaBigInt::one() << (bits - 1);
    let upper = RsaBigInt::one() << bits;

    let mut candidate = rng.gen_biguint_range(&lower, &upper);
    if candidate.is_even() {
        candidate += 1u8;
    }
    candidate
}

/// Random integer in range [low, high)
pub fn random_in_range<R: Rng + ?Sized>(
    low: &RsaBigInt,
    high: &RsaBigInt,
    rng: &mut R,
) -> RsaBigInt {
    rng.gen_biguint_range(low, high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_mod_pow() {
        // 3^5 mod 7 = 243 mod 7 = 5
        let result = mod_pow(&from_u64(3), &from_u64(5), &from_u64(7));
        assert_eq!(result, from_u64(5));

        assert_eq!(mod_pow(&from_u64(9), &from_u64(9), &from_u64(1)), from_u64(0));
    }

    #[test]
    fn test_bytes_are_minimal() {
        assert_eq!(to_bytes(&from_bytes(&[0, 0, 0, 72])), vec![72]);
        assert_eq!(to_bytes(&from_u64(0)), vec![0]);
        assert_eq!(from_bytes(&[1, 0]), from_u64(256));
    }

    #[test]
    fn test_bit_length() {
        assert_eq!(bit_length(0), 0);
        assert_eq!(bit_length(1), 1);
        assert_eq!(bit_length(33), 6);
        assert_eq!(bit_length(9434638355779701059), 64);
    }

    #[test]
    fn test_extended_gcd() {
        let (g, x, y) = extended_gcd(&BigInt::from(240), &BigInt::from(46));
        assert_eq!(g, BigInt::from(2));
        assert_eq!(x * 240 + y * 46, BigInt::from(2));
    }

    #[test]
    fn test_is_probable_prime() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for p in [2u64, 3, 5, 7, 13, 65537, 4294967291] {
            assert!(is_probable_prime(&from_u64(p), 20, &mut rng), "{p} is prime");
        }
        for c in [0u64, 1, 4, 9, 561, 4294967297] {
            assert!(!is_probable_prime(&from_u64(c), 20, &mut rng), "{c} is composite");
        }
    }

    #[test]
    fn test_random_odd_with_bits() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for bits in [4u32, 17, 32] {
            let n = random_odd_with_bits(bits, &mut rng);
            assert_eq!(n.bits(), bits as u64);
            assert!(n.is_odd());
        }
    }
}
