use crate::bytecode::{IMAGE_EXTENSION, Program, ProgramImage, link};
use crate::error::{Error, Result};
use crate::frontend::{Lexer, parse_tokens};
use crate::runtime::{Interpreter, InterpreterConfig};
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Parse and link source text. Nothing runs unless both succeed.
pub fn build_program(name: &str, source: &str) -> Result<Program> {
    let ops = parse_tokens(Lexer::new(name, source))?;
    debug!(ops = ops.len(), "parsed");

    let program = link(name, &ops)?;
    debug!(jump_targets = program.jump_targets().len(), "linked");
    Ok(program)
}

/// Read a program from disk: a `.pbc` image is decoded and validated,
/// anything else is treated as source text.
pub fn load_program(path: &Path) -> Result<Program> {
    let name = path.display().to_string();

    if path.extension().and_then(OsStr::to_str) == Some(IMAGE_EXTENSION) {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let program = ProgramImage::decode(&bytes).map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %name, ops = program.len(), "loaded program image");
        return Ok(program);
    }

    let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let program = build_program(&name, &source)?;
    info!(path = %name, ops = program.len(), "loaded source");
    Ok(program)
}

/// Interpret `program`, writing its output to `out`.
pub fn simulate_program<W: Write>(
    program: &Program,
    out: W,
    config: InterpreterConfig,
) -> Result<()> {
    Interpreter::with_config(out, config).run(program)?;
    Ok(())
}

/// Write `program` as a `.pbc` image.
pub fn pack_program(program: &Program, out: &Path) -> Result<()> {
    let bytes = ProgramImage::encode(program).map_err(|source| Error::Image {
        path: out.to_path_buf(),
        source,
    })?;
    fs::write(out, &bytes).map_err(|e| Error::io(out, e))?;
    info!(path = %out.display(), bytes = bytes.len(), "wrote program image");
    Ok(())
}
