//! mcc driver
//!
//! Ties the preprocessor and the code generator together behind a small
//! command line. The parser that would connect the expanded source to
//! the typed AST lives outside this core; `compile` therefore accepts
//! the typed tree in its serialized form.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mcc_frontend::TranslationUnit;
use mcc_preprocessor::{Linker, Preprocessor};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcc")]
#[command(about = "C-like compiler core targeting MIPS32")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand macros and includes, producing flat source text
    Preprocess {
        /// Input source file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directories for "..." includes
        #[arg(short = 'I', long = "include", value_name = "DIR")]
        include_dirs: Vec<PathBuf>,

        /// Directories for <...> includes
        #[arg(long = "isystem", value_name = "DIR")]
        system_dirs: Vec<PathBuf>,

        /// Suppress cascading diagnostics after the first error
        #[arg(long)]
        no_recovery: bool,
    },

    /// Generate MIPS32 assembly from a serialized typed AST
    Compile {
        /// Translation unit in JSON form
        input: PathBuf,

        /// Output assembly file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::init();
    }

    let result = match cli.command {
        Commands::Preprocess {
            input,
            output,
            include_dirs,
            system_dirs,
            no_recovery,
        } => preprocess_command(input, output, include_dirs, system_dirs, no_recovery),
        Commands::Compile { input, output } => compile_command(input, output),
    };

    if let Err(error) = result {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}

fn preprocess_command(
    input: PathBuf,
    output: Option<PathBuf>,
    include_dirs: Vec<PathBuf>,
    system_dirs: Vec<PathBuf>,
    no_recovery: bool,
) -> Result<()> {
    let mut linker = Linker::new();
    for dir in include_dirs {
        linker.add_user_dir(dir);
    }
    for dir in system_dirs {
        linker.add_system_dir(dir);
    }

    let file_id = linker
        .add_file(&input)
        .with_context(|| format!("cannot open {}", input.display()))?;

    let mut preprocessor = Preprocessor::new(&mut linker);
    preprocessor.disable_recovery(no_recovery);
    let expanded = preprocessor.preprocess(file_id);
    let reporter = preprocessor.into_reporter();

    reporter.print_diagnostics();
    if reporter.has_errors() {
        return Err(anyhow!("preprocessing failed: {}", reporter.summary()));
    }

    match output {
        Some(path) => fs::write(&path, expanded)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => print!("{}", expanded),
    }
    Ok(())
}

fn compile_command(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let source = fs::read_to_string(&input)
        .with_context(|| format!("cannot open {}", input.display()))?;
    let unit: TranslationUnit = serde_json::from_str(&source)
        .with_context(|| format!("{} is not a serialized translation unit", input.display()))?;

    let assembly = mcc_codegen::generate(&unit)?;

    match output {
        Some(path) => fs::write(&path, assembly)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => print!("{}", assembly),
    }
    Ok(())
}
