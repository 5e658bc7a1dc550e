// Error types shared by the codec, key generation and key files

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Precondition(String),

    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("key generation gave up searching for {stage} after {attempts} attempts")]
    KeyGenerationTimeout { stage: &'static str, attempts: u64 },

    #[error("{0}")]
    Format(String),

    #[error("block value of {block_bytes} bytes is not below the modulus")]
    BlockOutOfRange { block_bytes: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a codec error so it can travel through `Read`/`Write` impls.
    pub(crate) fn into_io(self, kind: io::ErrorKind) -> io::Error {
        match self {
            Error::Io(e) => e,
            other => io::Error::new(kind, other),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        let carries_ours = e.get_ref().map_or(false, |inner| inner.is::<Error>());
        if !carries_ours {
            return Error::Io(e);
        }

        let kind = e.kind();
        match e.into_inner() {
            Some(inner) => match inner.downcast::<Error>() {
                Ok(ours) => *ours,
                Err(inner) => Error::Io(io::Error::new(kind, inner)),
            },
            None => Error::Io(kind.into()),
        }
    }
}
