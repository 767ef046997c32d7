//! Build script rendering the `framelink(1)` manual page from the CLI
//! definition.

use std::{env, fs, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let out_dir = PathBuf::from("target/generated-man");
    fs::create_dir_all(&out_dir)?;

    let version = env::var("CARGO_PKG_VERSION")?;
    let man = Man::new(cli::Cli::command())
        .manual("framelink manual")
        .source(format!("framelink {version}"));
    let mut page: Vec<u8> = Vec::new();
    man.render(&mut page)?;
    fs::write(out_dir.join("framelink.1"), page)?;

    Ok(())
}
