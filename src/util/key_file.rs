// Key file operations
// Each key file holds one keypair as "<exponent>,<modulus>"

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Result;
use crate::rsa::{KeySet, Keypair};

pub const PUBLIC_KEY_FILE: &str = "rsa.pub";
pub const PRIVATE_KEY_FILE: &str = "rsa.key";

/// Locations of the two key files of one identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    pub public: PathBuf,
    pub private: PathBuf,
}

impl KeyPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            public: dir.join(PUBLIC_KEY_FILE),
            private: dir.join(PRIVATE_KEY_FILE),
        }
    }
}

/// Read one keypair from a key file
pub fn read_keypair(path: &Path) -> Result<Keypair> {
    let text = fs::read_to_string(path)?;
    let key = text.parse()?;
    debug!("loaded key from {}", path.display());
    Ok(key)
}

/// Write one keypair to a key file, replacing it if present
pub fn write_keypair(path: &Path, key: &Keypair) -> Result<()> {
    let mut file = File::create(path)?;
    write!(file, "{key}")?;
    file.flush()?;
    Ok(())
}

/// Persist both keypairs of a key set
pub fn save_key_set(paths: &KeyPaths, keys: &KeySet) -> Result<()> {
    write_keypair(&paths.public, &keys.public)?;
    write_keypair(&paths.private, &keys.private)?;
    Ok(())
}
