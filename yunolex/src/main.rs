use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use yunolex::{Error, Generator};

/// Generate a table-driven lexer from a token specification.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Token specification file.
    input: PathBuf,

    /// Path of the emitted lexer source.
    #[arg(short, long, default_value = "lexer.rs", value_name = "FILE")]
    output: PathBuf,

    /// Dump each token's minimized DFA as a DOT file into DIR.
    #[arg(short, long, value_name = "DIR")]
    dot_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Spec(err)) => {
            for diagnostic in &err.diagnostics {
                eprintln!("{diagnostic}");
            }
            eprintln!("{err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let spec = fs::read_to_string(&args.input)?;
    log::info!("parsed arguments, output file: {}", args.output.display());
    let generator = Generator::builder().maybe_dot_dir(args.dot_dir.clone()).build();
    let mut out = fs::File::create(&args.output)?;
    generator.generate(&spec, &mut out)?;
    log::info!("finished writing {}", args.output.display());
    Ok(())
}
