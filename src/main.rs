//! Binary entry point for `aigmap`.

mod cmd;

use clap::Parser;

#[doc(hidden)]
fn main() {
    let cli = cmd::Cli::parse();
    cmd::dispatch(&cli.command);
}
