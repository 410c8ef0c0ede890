//! g2p - grapheme-to-phoneme conversion with character alignment.

use clap::Parser;
use colored::Colorize;
use std::process;

use libg2p::cli::{commands, Cli};
use libg2p::Error;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = commands::execute(cli.command, cli.langs_dir) {
        eprintln!("{}: {e:#}", "Error".red().bold());
        // Bad arguments exit with 2 via clap; 3 means the notations
        // are not connected; everything else that fails before
        // conversion is 4.
        let code = e.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(4);
        process::exit(code);
    }
}
