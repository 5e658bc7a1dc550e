// Block transform shared by the encrypting writer and the decrypting reader

use log::trace;

use super::bigint::{from_bytes, from_u64, mod_pow, to_bytes, RsaBigInt};
use super::key::Keypair;
use crate::error::{Error, Result};

/// Bytes of framing header per block: plaintext length, ciphertext length
pub const FRAME_HEADER_LEN: usize = 2;

/// How ciphertext blocks are delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Minimal big-endian ciphertext blocks back to back, read back in
    /// `block_bytes` chunks. Only single-block messages are guaranteed to
    /// survive a round trip.
    Raw,
    /// Each block is written as `[plain_len][cipher_len][cipher bytes]` so
    /// block boundaries and leading zero bytes survive.
    #[default]
    Framed,
}

/// Exponent and modulus of one direction, widened once for the big-integer code
#[derive(Debug, Clone)]
pub(crate) struct BlockCodec {
    exponent: RsaBigInt,
    modulus: RsaBigInt,
    block_bytes: usize,
    /// Minimal big-endian width of the largest residue, n - 1
    cipher_bytes: usize,
}

impl BlockCodec {
    pub(crate) fn new(key: &Keypair) -> Self {
        let block_bytes = key.block_bytes();
        let cipher_bytes = (key.bit_length() as usize + 7) / 8;
        trace!(
            "block codec over {}-bit modulus: {block_bytes} byte blocks",
            key.bit_length()
        );
        Self {
            exponent: from_u64(key.exponent),
            modulus: from_u64(key.modulus),
            block_bytes,
            cipher_bytes,
        }
    }

    pub(crate) fn block_bytes(&self) -> usize {
        self.block_bytes
    }

    pub(crate) fn cipher_bytes(&self) -> usize {
        self.cipher_bytes
    }

    /// block^exponent mod modulus, as minimal big-endian bytes.
    /// Blocks whose value is not below the modulus cannot be recovered and are refused.
    pub(crate) fn apply(&self, block: &[u8]) -> Result<Vec<u8>> {
        let value = from_bytes(block);
        if value >= self.modulus {
            return Err(Error::BlockOutOfRange {
                block_bytes: block.len(),
            });
        }

        let out = to_bytes(&mod_pow(&value, &self.exponent, &self.modulus));
        trace!("block {} -> {}", hex::encode(block), hex::encode(&out));
        Ok(out)
    }
}

/// Encrypt one block: block^e mod n
pub fn encrypt_block(block: &[u8], public_key: &Keypair) -> Result<Vec<u8>> {
    BlockCodec::new(public_key).apply(block)
}

/// Decrypt one block: block^d mod n
pub fn decrypt_block(block: &[u8], private_key: &Keypair) -> Result<Vec<u8>> {
    BlockCodec::new(private_key).apply(block)
}

/// Left-pad `bytes` with zeros to `width`, failing if it does not fit.
pub(crate) fn pad_to(bytes: Vec<u8>, width: usize) -> Result<Vec<u8>> {
    // a lone zero byte is the encoding of 0 and may shrink to nothing
    let significant = match bytes.iter().position(|&b| b != 0) {
        Some(start) => &bytes[start..],
        None => &[][..],
    };
    if significant.len() > width {
        return Err(Error::Format(format!(
            "decrypted block needs {} bytes but the frame declares {width}",
            significant.len()
        )));
    }

    let mut padded = vec![0u8; width - significant.len()];
    padded.extend_from_slice(significant);
    Ok(padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        let public = Keypair::new(3, 33).unwrap();
        let private = Keypair::new(7, 33).unwrap();
        assert_eq!(encrypt_block(&[4], &public).unwrap(), vec![31]);
        assert_eq!(decrypt_block(&[31], &private).unwrap(), vec![4]);

        let public = Keypair::new(512355097, 9434638355779701059).unwrap();
        let private = Keypair::new(1127403723158652433, 9434638355779701059).unwrap();
        let cipher = vec![116, 202, 27, 157, 28, 28, 109, 89];
        assert_eq!(encrypt_block(&[72], &public).unwrap(), cipher);
        assert_eq!(encrypt_block(&[0, 0, 0, 0, 0, 0, 0, 72], &public).unwrap(), cipher);
        assert_eq!(decrypt_block(&cipher, &private).unwrap(), vec![72]);
    }

    #[test]
    fn test_block_not_below_modulus() {
        let public = Keypair::new(3, 33).unwrap();
        assert!(matches!(
            encrypt_block(&[33], &public),
            Err(Error::BlockOutOfRange { block_bytes: 1 })
        ));
        assert!(encrypt_block(&[32], &public).is_ok());
    }

    #[test]
    fn test_out_of_range_message_fits_both_directions() {
        // a ciphertext chunk at or above n is refused the same way
        let private = Keypair::new(7, 33).unwrap();
        let err = decrypt_block(&[40], &private).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("block value"), "{message}");
        assert!(!message.contains("plaintext"), "{message}");
    }

    #[test]
    fn test_zero_block() {
        let public = Keypair::new(3, 33).unwrap();
        assert_eq!(encrypt_block(&[0], &public).unwrap(), vec![0]);
        assert_eq!(encrypt_block(&[], &public).unwrap(), vec![0]);
    }

    #[test]
    fn test_widths() {
        let codec = BlockCodec::new(&Keypair::new(3, 33).unwrap());
        assert_eq!((codec.block_bytes(), codec.cipher_bytes()), (1, 1));

        let codec = BlockCodec::new(&Keypair::new(3, 0x1_0001).unwrap());
        assert_eq!((codec.block_bytes(), codec.cipher_bytes()), (2, 3));
    }

    #[test]
    fn test_pad_to() {
        assert_eq!(pad_to(vec![72], 3).unwrap(), vec![0, 0, 72]);
        assert_eq!(pad_to(vec![0], 2).unwrap(), vec![0, 0]);
        assert_eq!(pad_to(vec![0], 0).unwrap(), Vec::<u8>::new());
        assert!(matches!(pad_to(vec![1, 2, 3], 2), Err(Error::Format(_))));
    }
}
