// RSA Module - Main module file
// Exports the arithmetic, key generation and the streaming codec

pub mod bigint;
pub mod block;
pub mod decrypt;
pub mod encrypt;
pub mod euclid;
pub mod key;
pub mod keygen;

pub use block::{decrypt_block, encrypt_block, Framing};
pub use decrypt::{decode, decrypt_bytes, DecryptReader};
pub use encrypt::{encode, encrypt_bytes, EncryptWriter};
pub use euclid::{euclid, modular_inverse};
pub use key::Keypair;
pub use keygen::{generate_keypair, generate_keypair_with_rng, KeyGenConfig, KeySet};
