mod backend;
mod bytecode;
mod config;
mod error;
mod frontend;
mod pipeline;
mod runtime;

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::backend::{OutputPaths, Toolchain, nasm, run_binary};
use crate::bytecode::disasm::print_program;
use crate::config::{Action, Cli, Config};
use crate::frontend::Lexer;
use crate::frontend::token_dumper::TokenDumper;
use crate::pipeline::{load_program, pack_program, simulate_program};
use crate::runtime::InterpreterConfig;

fn main() -> ExitCode {
    let config = Config::from(Cli::parse());
    init_logging(config.log_level);

    match run(config.action) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(action: Action) -> Result<ExitCode> {
    match action {
        Action::Simulate { file, interpreter } => simulate(&file, interpreter),
        Action::Compile {
            file,
            out_dir,
            link,
            run,
            toolchain,
        } => compile(&file, out_dir.as_deref(), link, run, &toolchain),
        Action::Disassemble { file } => {
            let program = load_program(&file)?;
            let stdout = io::stdout();
            print_program(&program, &mut stdout.lock())?;
            Ok(ExitCode::SUCCESS)
        }
        Action::Tokens { file, color } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let dumper = if color {
                TokenDumper::new()
            } else {
                TokenDumper::new().no_color()
            };
            let name = file.display().to_string();
            dumper.dump(Lexer::new(&name, &source), &mut io::stdout().lock())?;
            Ok(ExitCode::SUCCESS)
        }
        Action::Pack { file, out } => {
            let program = load_program(&file)?;
            pack_program(&program, &out)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn simulate(file: &Path, config: InterpreterConfig) -> Result<ExitCode> {
    let program = load_program(file)?;
    simulate_program(&program, io::stdout().lock(), config)?;
    Ok(ExitCode::SUCCESS)
}

fn compile(
    file: &Path,
    out_dir: Option<&Path>,
    link: bool,
    run: bool,
    toolchain: &Toolchain,
) -> Result<ExitCode> {
    let program = load_program(file)?;
    let paths = OutputPaths::for_input(file, out_dir)?;

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let asm = &paths.asm;

    info!("generating {}", asm.display());
    let out = fs::File::create(asm)
        .with_context(|| format!("failed to create {}", asm.display()))?;
    let mut out = BufWriter::new(out);
    nasm::generate(&program, &mut out)
        .and_then(|_| out.flush())
        .with_context(|| format!("failed to write {}", asm.display()))?;

    if !link {
        return Ok(ExitCode::SUCCESS);
    }

    toolchain.assemble_and_link(&paths)?;
    if !run {
        return Ok(ExitCode::SUCCESS);
    }

    let status = run_binary(&paths.binary)?;
    Ok(match status.code() {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    })
}
