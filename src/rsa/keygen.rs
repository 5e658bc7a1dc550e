// RSA Key Generation
// Finds two primes of half width, a coprime public exponent and its inverse

use log::{debug, info};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, ToPrimitive};
use rand::{thread_rng, Rng};

use super::bigint::{
    extended_gcd, from_u64, is_probable_prime, random_in_range, random_odd_with_bits, RsaBigInt,
};
use super::euclid::modular_inverse;
use super::key::Keypair;
use crate::error::{Error, Result};

/// Smallest modulus width that still leaves room for an exponent in [3, φ(n))
pub const MIN_MODULUS_BITS: u32 = 8;
/// Keys are stored as u64
pub const MAX_MODULUS_BITS: u32 = 64;

/// Knobs for key generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGenConfig {
    /// Exact bit length of the generated modulus
    pub bits: u32,
    /// Miller-Rabin rounds per prime candidate
    pub prime_rounds: u32,
    /// Retry cap for each search loop
    pub max_attempts: u64,
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self {
            bits: 64,
            prime_rounds: 20,
            max_attempts: 100_000,
        }
    }
}

impl KeyGenConfig {
    fn validate(&self) -> Result<()> {
        if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&self.bits) {
            return Err(Error::Precondition(format!(
                "modulus bit length must be between {MIN_MODULUS_BITS} and {MAX_MODULUS_BITS}, \
                 got {}",
                self.bits
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Precondition("max attempts must be positive".to_string()));
        }
        Ok(())
    }
}

/// Public and private keypair of one identity, plus the primes they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    pub public: Keypair,
    pub private: Keypair,
    pub p: u64,
    pub q: u64,
}

impl KeySet {
    /// Derive both keypairs from two primes and a public exponent.
    /// The private exponent comes from the early-stop Euclid on (φ(n), e).
    pub fn from_primes(p: u64, q: u64, e: u64) -> Result<Self> {
        let mut rng = thread_rng();
        let rounds = KeyGenConfig::default().prime_rounds;
        for prime in [p, q] {
            if !is_probable_prime(&from_u64(prime), rounds, &mut rng) {
                return Err(Error::Precondition(format!("{prime} is not prime")));
            }
        }
        if p == q {
            return Err(Error::Precondition("p and q must be distinct".to_string()));
        }

        let n = p
            .checked_mul(q)
            .ok_or_else(|| Error::Precondition(format!("{p} * {q} does not fit in 64 bits")))?;
        let phi_n = (p - 1) * (q - 1);

        if e <= 1 || e >= phi_n {
            return Err(Error::Precondition(format!("e must satisfy 1 < e < {phi_n}, got {e}")));
        }
        let d = modular_inverse(e, phi_n)
            .map_err(|_| Error::Precondition(format!("e={e} is not coprime with φ(n)={phi_n}")))?;

        Ok(Self {
            public: Keypair::new(e, n)?,
            private: Keypair::new(d, n)?,
            p,
            q,
        })
    }

    /// φ(n) = (p-1)(q-1)
    pub fn phi(&self) -> u64 {
        (self.p - 1) * (self.q - 1)
    }
}

/// Generate a key set with the thread-local RNG
pub fn generate_keypair(config: &KeyGenConfig) -> Result<KeySet> {
    generate_keypair_with_rng(&mut thread_rng(), config)
}

/// Generate a key set whose modulus has exactly `config.bits` bits
pub fn generate_keypair_with_rng<R: Rng + ?Sized>(
    rng: &mut R,
    config: &KeyGenConfig,
) -> Result<KeySet> {
    config.validate()?;

    // Step 1: two distinct probable primes whose product has the target width
    let (p, q) = find_primes(rng, config)?;
    let n = &p * &q;

    // Step 2: φ(n) = (p-1)(q-1)
    let phi_n = (&p - 1u8) * (&q - 1u8);

    // Step 3 and 4: e coprime with φ(n), d its inverse
    let (e, d) = find_exponents(rng, &phi_n, config)?;

    let to_u64 = |v: &RsaBigInt| {
        v.to_u64()
            .ok_or_else(|| Error::Precondition(format!("{v} does not fit in 64 bits")))
    };
    let (n, p, q) = (to_u64(&n)?, to_u64(&p)?, to_u64(&q)?);
    let (e, d) = (to_u64(&e)?, to_u64(&d)?);

    info!("generated {}-bit modulus n={n} with public exponent e={e}", config.bits);

    Ok(KeySet {
        public: Keypair::new(e, n)?,
        private: Keypair::new(d, n)?,
        p,
        q,
    })
}

fn find_primes<R: Rng + ?Sized>(
    rng: &mut R,
    config: &KeyGenConfig,
) -> Result<(RsaBigInt, RsaBigInt)> {
    let p_bits = config.bits / 2;
    let q_bits = config.bits - p_bits;

    for attempt in 1..=config.max_attempts {
        let p = random_odd_with_bits(p_bits, rng);
        let q = random_odd_with_bits(q_bits, rng);

        if p == q
            || !is_probable_prime(&p, config.prime_rounds, rng)
            || !is_probable_prime(&q, config.prime_rounds, rng)
        {
            continue;
        }

        if (&p * &q).bits() != u64::from(config.bits) {
            continue;
        }

        debug!("found primes after {attempt} attempt(s)");
        return Ok((p, q));
    }

    Err(Error::KeyGenerationTimeout {
        stage: "primes",
        attempts: config.max_attempts,
    })
}

fn find_exponents<R: Rng + ?Sized>(
    rng: &mut R,
    phi_n: &RsaBigInt,
    config: &KeyGenConfig,
) -> Result<(RsaBigInt, RsaBigInt)> {
    let three = from_u64(3);
    if phi_n <= &three {
        return Err(Error::Precondition(format!("φ(n)={phi_n} leaves no room for an exponent")));
    }
    let phi_signed = BigInt::from(phi_n.clone());

    for attempt in 1..=config.max_attempts {
        let e = random_in_range(&three, phi_n, rng);

        // gcd(φ(n), e) = x*φ(n) + y*e
        let (gcd, _, y) = extended_gcd(&phi_signed, &BigInt::from(e.clone()));
        if !gcd.is_one() {
            continue;
        }

        let d = y.mod_floor(&phi_signed);
        let Some(d) = d.to_biguint() else {
            continue;
        };

        debug!("found public exponent after {attempt} attempt(s)");
        return Ok((e, d));
    }

    Err(Error::KeyGenerationTimeout {
        stage: "public exponent",
        attempts: config.max_attempts,
    })
}
