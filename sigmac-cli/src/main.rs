use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sigmac_core::compile;

#[derive(Parser, Debug)]
#[command(version, about = "Compile a small imperative language to Sigma16-style assembly", long_about = None)]
struct Cli {
    #[arg(short, long, help = "Source file to compile (defaults to stdin)")]
    input: Option<String>,

    #[arg(short, long, help = "File to write the assembly to (defaults to stdout)")]
    output: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let source = match cli.input {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read input file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let assembly = compile(&source)?;

    match cli.output {
        Some(path) => write_output(&path, assembly.as_bytes())?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(assembly.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}
