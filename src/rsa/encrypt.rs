// RSA Encryption
// Streams plaintext through block-wise modular exponentiation with the public exponent

use std::io::{self, Read, Write};

use log::debug;

use super::block::{BlockCodec, Framing};
use super::key::Keypair;
use crate::error::{Error, Result};

/// Wraps a writer and encrypts everything written through it.
///
/// Input is cut into blocks of `block_bytes` regardless of how it is split
/// across `write` calls. Every complete block is encrypted and forwarded at
/// once; the trailing short block is forwarded by [`EncryptWriter::finish`],
/// or on drop if `finish` was never called (errors are lost in that case).
pub struct EncryptWriter<W: Write> {
    inner: Option<W>,
    codec: BlockCodec,
    framing: Framing,
    pending: Vec<u8>,
    written: u64,
}

impl<W: Write> EncryptWriter<W> {
    pub fn new(inner: W, public_key: &Keypair, framing: Framing) -> Self {
        let codec = BlockCodec::new(public_key);
        Self {
            inner: Some(inner),
            pending: Vec::with_capacity(codec.block_bytes()),
            codec,
            framing,
            written: 0,
        }
    }

    /// Ciphertext bytes forwarded so far, framing included
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Forward the trailing short block, if any, and flush.
    pub fn try_finish(&mut self) -> io::Result<()> {
        while !self.pending.is_empty() {
            let len = self.pending.len().min(self.codec.block_bytes());
            self.emit(len)?;
        }
        self.inner_mut()?.flush()
    }

    /// Forward the trailing short block and hand back the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.try_finish()?;
        self.inner
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "encrypt writer already finished"))
    }

    fn inner_mut(&mut self) -> io::Result<&mut W> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "encrypt writer already finished"))
    }

    /// Encrypt the first `len` pending bytes as one block and forward it.
    fn emit(&mut self, len: usize) -> io::Result<()> {
        let cipher = self
            .codec
            .apply(&self.pending[..len])
            .map_err(|e| e.into_io(io::ErrorKind::InvalidInput))?;

        let mut out = Vec::with_capacity(cipher.len() + 2);
        if self.framing == Framing::Framed {
            let header = [frame_len(len)?, frame_len(cipher.len())?];
            out.extend_from_slice(&header);
        }
        out.extend_from_slice(&cipher);

        self.inner_mut()?.write_all(&out)?;
        self.written += out.len() as u64;
        self.pending.drain(..len);
        Ok(())
    }
}

fn frame_len(len: usize) -> io::Result<u8> {
    u8::try_from(len).map_err(|_| {
        Error::Format(format!("block of {len} bytes does not fit a frame header"))
            .into_io(io::ErrorKind::InvalidInput)
    })
}

impl<W: Write> Write for EncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let block = self.codec.block_bytes();
        let mut accepted = 0;

        // pending stays shorter than one block between calls
        while accepted < buf.len() {
            let take = (block - self.pending.len()).min(buf.len() - accepted);
            self.pending.extend_from_slice(&buf[accepted..accepted + take]);

            if self.pending.len() == block {
                if let Err(e) = self.emit(block) {
                    // only bytes from earlier blocks count as written
                    self.pending.truncate(block - take);
                    return if accepted == 0 { Err(e) } else { Ok(accepted) };
                }
            }
            accepted += take;
        }
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner_mut()?.flush()
    }
}

impl<W: Write> Drop for EncryptWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() && !self.pending.is_empty() {
            let _ = self.try_finish();
        }
    }
}

/// Encrypt a whole stream, returning the number of ciphertext bytes written
pub fn encode<R: Read, W: Write>(
    mut input: R,
    output: W,
    public_key: &Keypair,
    framing: Framing,
) -> Result<u64> {
    let mut writer = EncryptWriter::new(output, public_key, framing);
    let consumed = io::copy(&mut input, &mut writer)?;
    writer.try_finish()?;

    let written = writer.bytes_written();
    debug!("encrypted {consumed} bytes into {written} bytes");
    writer.finish()?;
    Ok(written)
}

/// Encrypt an in-memory buffer
pub fn encrypt_bytes(plaintext: &[u8], public_key: &Keypair, framing: Framing) -> Result<Vec<u8>> {
    let mut ciphertext = Vec::new();
    encode(plaintext, &mut ciphertext, public_key, framing)?;
    Ok(ciphertext)
}
