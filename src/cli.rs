// Command line front end
// Parses arguments into an explicit Config and runs one gen/encrypt/decrypt operation

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::info;

use crate::error::{Error, Result};
use crate::rsa::{decode, encode, generate_keypair, Framing, KeyGenConfig, KeySet, Keypair};
use crate::util::key_file::{read_keypair, save_key_set, KeyPaths};

#[derive(Debug, Parser)]
#[command(name = "rsa_stream", version, about = "Textbook RSA stream cipher")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a keypair and write both key files
    Gen {
        /// Bit length of the modulus
        #[arg(long, default_value_t = KeyGenConfig::default().bits)]
        bits: u32,

        /// Miller-Rabin rounds per prime candidate
        #[arg(long, default_value_t = KeyGenConfig::default().prime_rounds)]
        rounds: u32,

        /// Give up after this many candidates per search
        #[arg(long, default_value_t = KeyGenConfig::default().max_attempts)]
        max_attempts: u64,

        /// Directory holding rsa.pub and rsa.key
        #[arg(long, default_value = ".")]
        key_dir: PathBuf,
    },
    /// Encrypt a file to stdout
    Encrypt(StreamArgs),
    /// Decrypt a file to stdout
    Decrypt(StreamArgs),
}

#[derive(Debug, ClapArgs)]
pub struct StreamArgs {
    /// Input file
    pub file: PathBuf,

    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Undelimited ciphertext blocks, as the reference tool writes them
    #[arg(long)]
    pub raw: bool,

    /// Directory holding rsa.pub and rsa.key
    #[arg(long, default_value = ".")]
    pub key_dir: PathBuf,

    /// Exponent, used instead of a key file together with --n or --p/--q
    #[arg(long)]
    pub e: Option<u64>,

    /// Modulus
    #[arg(long)]
    pub n: Option<u64>,

    /// First prime
    #[arg(long)]
    pub p: Option<u64>,

    /// Second prime
    #[arg(long)]
    pub q: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Gen,
    Encrypt,
    Decrypt,
}

/// Where the exponent and modulus come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// rsa.pub for encryption, rsa.key for decryption
    KeyFile,
    Modulus { exponent: u64, modulus: u64 },
    /// Public exponent and the two primes; the private exponent is derived
    Primes { exponent: u64, p: u64, q: u64 },
}

/// Everything one invocation needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    pub key: KeySource,
    pub framing: Framing,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub key_dir: PathBuf,
    pub keygen: KeyGenConfig,
}

impl TryFrom<Args> for Config {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self> {
        match args.command {
            Command::Gen {
                bits,
                rounds,
                max_attempts,
                key_dir,
            } => Ok(Config {
                mode: Mode::Gen,
                key: KeySource::KeyFile,
                framing: Framing::default(),
                input: None,
                output: None,
                key_dir,
                keygen: KeyGenConfig {
                    bits,
                    prime_rounds: rounds,
                    max_attempts,
                },
            }),
            Command::Encrypt(stream) => Config::for_stream(Mode::Encrypt, stream),
            Command::Decrypt(stream) => Config::for_stream(Mode::Decrypt, stream),
        }
    }
}

impl Config {
    fn for_stream(mode: Mode, args: StreamArgs) -> Result<Self> {
        let key = match (args.e, args.n, args.p, args.q) {
            (None, None, None, None) => KeySource::KeyFile,
            (Some(exponent), Some(modulus), None, None) => KeySource::Modulus { exponent, modulus },
            (Some(exponent), None, Some(p), Some(q)) => KeySource::Primes { exponent, p, q },
            _ => {
                return Err(Error::Precondition(
                    "either no key arguments, --e with --n, or --e with --p and --q are required"
                        .to_string(),
                ))
            }
        };

        Ok(Config {
            mode,
            key,
            framing: if args.raw { Framing::Raw } else { Framing::Framed },
            input: Some(args.file),
            output: args.output,
            key_dir: args.key_dir,
            keygen: KeyGenConfig::default(),
        })
    }

    /// Resolve the keypair this mode streams with
    pub fn keypair(&self) -> Result<Keypair> {
        match self.key {
            KeySource::KeyFile => {
                let paths = KeyPaths::in_dir(&self.key_dir);
                match self.mode {
                    Mode::Decrypt => read_keypair(&paths.private),
                    _ => read_keypair(&paths.public),
                }
            }
            KeySource::Modulus { exponent, modulus } => Keypair::new(exponent, modulus),
            KeySource::Primes { exponent, p, q } => {
                let keys = KeySet::from_primes(p, q, exponent)?;
                match self.mode {
                    Mode::Decrypt => Ok(keys.private),
                    _ => Ok(keys.public),
                }
            }
        }
    }
}

/// Run one invocation
pub fn run(config: &Config) -> anyhow::Result<()> {
    match config.mode {
        Mode::Gen => {
            let keys = generate_keypair(&config.keygen).context("key generation failed")?;
            let paths = KeyPaths::in_dir(&config.key_dir);
            save_key_set(&paths, &keys).with_context(|| {
                format!(
                    "failed to write key files in {}",
                    config.key_dir.display()
                )
            })?;
            info!(
                "wrote {} and {} (n={})",
                paths.public.display(),
                paths.private.display(),
                keys.public.modulus
            );
        }
        Mode::Encrypt | Mode::Decrypt => {
            let key = config.keypair().context("failed to load key")?;
            let input = config
                .input
                .as_ref()
                .ok_or_else(|| Error::Precondition("an input file is required".to_string()))?;
            let reader = BufReader::new(
                File::open(input).with_context(|| format!("failed to open {}", input.display()))?,
            );

            let writer: Box<dyn Write> = match &config.output {
                Some(path) => Box::new(
                    File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?,
                ),
                None => Box::new(io::stdout().lock()),
            };
            let writer = BufWriter::new(writer);

            let written = if config.mode == Mode::Encrypt {
                encode(reader, writer, &key, config.framing).context("encryption failed")?
            } else {
                decode(reader, writer, &key, config.framing).context("decryption failed")?
            };
            info!("wrote {written} bytes");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config(argv: &[&str]) -> Result<Config> {
        let args = Args::try_parse_from(argv).unwrap();
        Config::try_from(args)
    }

    #[test]
    fn test_gen_defaults() {
        let config = config(&["rsa_stream", "gen"]).unwrap();
        assert_eq!(config.mode, Mode::Gen);
        assert_eq!(config.keygen, KeyGenConfig::default());
        assert_eq!(config.key_dir, PathBuf::from("."));
    }

    #[test]
    fn test_key_sources() {
        let c = config(&["rsa_stream", "encrypt", "in.txt"]).unwrap();
        assert_eq!(c.key, KeySource::KeyFile);
        assert_eq!(c.framing, Framing::Framed);
        assert_eq!(c.input, Some(PathBuf::from("in.txt")));

        let c = config(&[
            "rsa_stream", "encrypt", "in.txt", "--e", "3", "--n", "33", "--raw",
        ])
        .unwrap();
        assert_eq!(c.key, KeySource::Modulus { exponent: 3, modulus: 33 });
        assert_eq!(c.framing, Framing::Raw);
        assert_eq!(c.keypair().unwrap(), Keypair { exponent: 3, modulus: 33 });

        let c = config(&[
            "rsa_stream", "decrypt", "out.txt", "--e", "3", "--p", "3", "--q", "11",
        ])
        .unwrap();
        assert_eq!(c.key, KeySource::Primes { exponent: 3, p: 3, q: 11 });
        assert_eq!(c.keypair().unwrap(), Keypair { exponent: 7, modulus: 33 });
    }

    #[test]
    fn test_incomplete_key_arguments() {
        for argv in [
            &["rsa_stream", "encrypt", "in.txt", "--e", "3"][..],
            &["rsa_stream", "decrypt", "in.txt", "--e", "3", "--p", "3"],
            &["rsa_stream", "decrypt", "in.txt", "--n", "33", "--p", "3", "--q", "11"],
        ] {
            assert!(matches!(config(argv), Err(Error::Precondition(_))), "{argv:?}");
        }
    }

    #[test]
    fn test_missing_arguments_rejected_by_parser() {
        assert!(Args::try_parse_from(["rsa_stream", "encrypt"]).is_err());
        assert!(Args::try_parse_from(["rsa_stream", "sign", "x"]).is_err());
    }

    #[test]
    fn test_gen_encrypt_decrypt() {
        let dir = tempdir().unwrap();
        let key_dir = dir.path().to_str().unwrap();
        let plain = dir.path().join("plain.txt");
        let cipher = dir.path().join("cipher.bin");
        let recovered = dir.path().join("recovered.txt");
        fs::write(&plain, "attack at dawn\n").unwrap();

        run(&config(&["rsa_stream", "gen", "--key-dir", key_dir]).unwrap()).unwrap();
        run(&config(&[
            "rsa_stream",
            "encrypt",
            plain.to_str().unwrap(),
            "--key-dir",
            key_dir,
            "--output",
            cipher.to_str().unwrap(),
        ])
        .unwrap())
        .unwrap();
        run(&config(&[
            "rsa_stream",
            "decrypt",
            cipher.to_str().unwrap(),
            "--key-dir",
            key_dir,
            "--output",
            recovered.to_str().unwrap(),
        ])
        .unwrap())
        .unwrap();

        assert_ne!(fs::read(&cipher).unwrap(), b"attack at dawn\n");
        assert_eq!(fs::read_to_string(&recovered).unwrap(), "attack at dawn\n");
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let input = missing.to_str().unwrap();
        let c = config(&["rsa_stream", "encrypt", input, "--e", "3", "--n", "33"]).unwrap();
        let err = run(&c).unwrap_err();
        assert!(format!("{err:#}").contains("failed to open"));
    }

    #[test]
    fn test_malformed_key_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("rsa.pub"), "three,33").unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "x").unwrap();

        let c = config(&[
            "rsa_stream",
            "encrypt",
            input.to_str().unwrap(),
            "--key-dir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        let err = run(&c).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Format(_))));
    }
}
