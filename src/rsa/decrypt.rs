// RSA Decryption
// Streams ciphertext blocks back through modular exponentiation with the private exponent

use std::io::{self, Read, Write};

use log::debug;

use super::block::{pad_to, BlockCodec, Framing, FRAME_HEADER_LEN};
use super::key::Keypair;
use crate::error::{Error, Result};

/// Wraps a reader of ciphertext and yields plaintext.
///
/// One ciphertext block is pulled from upstream only when the previous
/// plaintext block has been handed out completely.
pub struct DecryptReader<R: Read> {
    inner: R,
    codec: BlockCodec,
    framing: Framing,
    plain: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: Read> DecryptReader<R> {
    pub fn new(inner: R, private_key: &Keypair, framing: Framing) -> Self {
        Self {
            inner,
            codec: BlockCodec::new(private_key),
            framing,
            plain: Vec::new(),
            pos: 0,
            done: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Decrypt the next block into `self.plain`. Returns false at end of stream.
    fn next_block(&mut self) -> io::Result<bool> {
        let plain = match self.framing {
            Framing::Raw => {
                let mut chunk = vec![0u8; self.codec.block_bytes()];
                let n = read_full(&mut self.inner, &mut chunk)?;
                if n == 0 {
                    return Ok(false);
                }
                self.decrypt(&chunk[..n])?
            }
            Framing::Framed => {
                let mut header = [0u8; FRAME_HEADER_LEN];
                match read_full(&mut self.inner, &mut header)? {
                    0 => return Ok(false),
                    FRAME_HEADER_LEN => {}
                    _ => {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "ciphertext ends inside a frame header",
                        ))
                    }
                }

                let (plain_len, cipher_len) = (header[0] as usize, header[1] as usize);
                if plain_len == 0 || plain_len > self.codec.block_bytes() {
                    return Err(invalid_frame(format!("plaintext length {plain_len}")));
                }
                if cipher_len == 0 || cipher_len > self.codec.cipher_bytes() {
                    return Err(invalid_frame(format!("ciphertext length {cipher_len}")));
                }

                let mut cipher = vec![0u8; cipher_len];
                self.inner.read_exact(&mut cipher)?;
                let plain = self.decrypt(&cipher)?;
                pad_to(plain, plain_len).map_err(|e| e.into_io(io::ErrorKind::InvalidData))?
            }
        };

        self.plain = plain;
        self.pos = 0;
        Ok(true)
    }

    fn decrypt(&self, cipher: &[u8]) -> io::Result<Vec<u8>> {
        self.codec
            .apply(cipher)
            .map_err(|e| e.into_io(io::ErrorKind::InvalidData))
    }
}

fn invalid_frame(what: String) -> io::Error {
    Error::Format(format!("invalid frame: {what}")).into_io(io::ErrorKind::InvalidData)
}

/// Read until `buf` is full or the source is exhausted
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pos == self.plain.len() {
            if self.done || !self.next_block()? {
                self.done = true;
                return Ok(0);
            }
        }

        let available = &self.plain[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Decrypt a whole stream, returning the number of plaintext bytes written
pub fn decode<R: Read, W: Write>(
    input: R,
    mut output: W,
    private_key: &Keypair,
    framing: Framing,
) -> Result<u64> {
    let mut reader = DecryptReader::new(input, private_key, framing);
    let written = io::copy(&mut reader, &mut output)?;
    output.flush()?;

    debug!("decrypted {written} bytes");
    Ok(written)
}

/// Decrypt an in-memory buffer
pub fn decrypt_bytes(
    ciphertext: &[u8],
    private_key: &Keypair,
    framing: Framing,
) -> Result<Vec<u8>> {
    let mut plaintext = Vec::new();
    decode(ciphertext, &mut plaintext, private_key, framing)?;
    Ok(plaintext)
}
