//! Textbook RSA over byte streams.
//!
//! Bytes are cut into blocks sized from the modulus bit length and each block
//! goes through `block^exponent mod modulus`. There is no padding scheme, so
//! this is a demonstration of the arithmetic, not a secure cipher.

pub mod cli;
pub mod error;
pub mod rsa;
pub mod util;

pub use error::{Error, Result};
pub use rsa::{decode, encode, Framing, Keypair};
