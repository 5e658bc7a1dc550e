use std::process;

use clap::Parser;
use log::LevelFilter;
use rsa_stream::cli::{run, Args, Config};

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version land here too
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let result = Config::try_from(args)
        .map_err(anyhow::Error::from)
        .and_then(|config| run(&config));

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
