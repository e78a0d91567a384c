use crate::backend::Toolchain;
use crate::bytecode::IMAGE_EXTENSION;
use crate::runtime::InterpreterConfig;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "porth", version, about = "a tiny stack language: simulate or compile to x86-64")]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulate the program (source file or .pbc image)
    Sim {
        file: PathBuf,

        /// Abort after this many executed instructions
        #[arg(long)]
        max_steps: Option<u64>,
    },

    /// Compile the program to x86-64 assembly and link it
    Com {
        file: PathBuf,

        /// Run the executable after building it
        #[arg(short, long)]
        run: bool,

        /// Only write the .asm file
        #[arg(long, conflicts_with = "run")]
        no_link: bool,

        /// Directory for generated files (default: current directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Assembler to invoke
        #[arg(long, default_value = "nasm")]
        nasm: String,

        /// Linker to invoke
        #[arg(long, default_value = "ld")]
        ld: String,
    },

    /// Print the linked instruction listing
    Dis { file: PathBuf },

    /// Print the token stream
    Tokens {
        file: PathBuf,

        #[arg(long)]
        no_color: bool,
    },

    /// Write the linked program as a .pbc image
    Pack {
        file: PathBuf,

        /// Output path (default: input with .pbc extension)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// What to do, after argument parsing.
#[derive(Debug)]
pub enum Action {
    Simulate {
        file: PathBuf,
        interpreter: InterpreterConfig,
    },
    Compile {
        file: PathBuf,
        out_dir: Option<PathBuf>,
        link: bool,
        run: bool,
        toolchain: Toolchain,
    },
    Disassemble {
        file: PathBuf,
    },
    Tokens {
        file: PathBuf,
        color: bool,
    },
    Pack {
        file: PathBuf,
        out: PathBuf,
    },
}

#[derive(Debug)]
pub struct Config {
    /// Default filter directive for the log subscriber.
    pub log_level: &'static str,
    pub action: Action,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let log_level = match (cli.quiet, cli.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        };

        let action = match cli.command {
            Command::Sim { file, max_steps } => Action::Simulate {
                file,
                interpreter: InterpreterConfig { max_steps },
            },
            Command::Com {
                file,
                run,
                no_link,
                out_dir,
                nasm,
                ld,
            } => Action::Compile {
                file,
                out_dir,
                link: !no_link,
                run,
                toolchain: Toolchain { nasm, ld },
            },
            Command::Dis { file } => Action::Disassemble { file },
            Command::Tokens { file, no_color } => Action::Tokens {
                file,
                color: !no_color,
            },
            Command::Pack { file, out } => {
                let out = out.unwrap_or_else(|| file.with_extension(IMAGE_EXTENSION));
                Action::Pack { file, out }
            }
        };

        Config { log_level, action }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Config {
        let argv = std::iter::once("porth").chain(args.iter().copied());
        Config::from(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_sim() {
        let cfg = config(&["sim", "a.porth", "--max-steps", "100"]);
        match cfg.action {
            Action::Simulate { file, interpreter } => {
                assert_eq!(file, PathBuf::from("a.porth"));
                assert_eq!(interpreter.max_steps, Some(100));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cfg.log_level, "warn");
    }

    #[test]
    fn test_com_defaults() {
        match config(&["com", "a.porth"]).action {
            Action::Compile {
                link,
                run,
                out_dir,
                toolchain,
                ..
            } => {
                assert!(link);
                assert!(!run);
                assert!(out_dir.is_none());
                assert_eq!(toolchain.nasm, "nasm");
                assert_eq!(toolchain.ld, "ld");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_com_flags() {
        match config(&["com", "-r", "-o", "build", "a.porth"]).action {
            Action::Compile { run, out_dir, .. } => {
                assert!(run);
                assert_eq!(out_dir, Some(PathBuf::from("build")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_run_conflicts_with_no_link() {
        let argv = ["porth", "com", "--no-link", "-r", "a.porth"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_pack_default_output() {
        match config(&["pack", "dir/a.porth"]).action {
            Action::Pack { out, .. } => assert_eq!(out, PathBuf::from("dir/a.pbc")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(config(&["-vv", "dis", "a.porth"]).log_level, "debug");
        assert_eq!(config(&["dis", "a.porth", "-vvvv"]).log_level, "trace");
        assert_eq!(config(&["-q", "dis", "a.porth"]).log_level, "error");
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["porth"]).is_err());
        assert!(Cli::try_parse_from(["porth", "sim"]).is_err());
        assert!(Cli::try_parse_from(["porth", "frobnicate", "x"]).is_err());
    }
}
