use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::info;

/// External assembler and linker used to turn generated assembly into an
/// executable.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub nasm: String,
    pub ld: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            nasm: "nasm".to_string(),
            ld: "ld".to_string(),
        }
    }
}

impl Toolchain {
    /// Assemble `paths.asm` into `paths.object` and link it into
    /// `paths.binary`.
    pub fn assemble_and_link(&self, paths: &OutputPaths) -> Result<()> {
        call_echoed(
            Command::new(&self.nasm)
                .arg("-felf64")
                .arg(&paths.asm)
                .arg("-o")
                .arg(&paths.object),
        )?;
        call_echoed(
            Command::new(&self.ld)
                .arg("-o")
                .arg(&paths.binary)
                .arg(&paths.object),
        )
    }

    /// Whether both tools can be started.
    #[cfg(test)]
    pub fn is_available(&self) -> bool {
        let probe = |tool: &str, flag: &str| {
            Command::new(tool)
                .arg(flag)
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        };
        probe(&self.nasm, "-v") && probe(&self.ld, "--version")
    }
}

/// Files `com` writes for one input, all named after the input's stem.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub asm: PathBuf,
    pub object: PathBuf,
    pub binary: PathBuf,
}

impl OutputPaths {
    /// `<stem>.asm`, `<stem>.o` and `<stem>` inside `out_dir` (default: cwd).
    ///
    /// Fails if any of them would land on `input` itself, e.g. compiling an
    /// extensionless `prog` in place.
    pub fn for_input(input: &Path, out_dir: Option<&Path>) -> Result<Self> {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        let dir = out_dir.map(Path::to_path_buf).unwrap_or_default();

        let paths = OutputPaths {
            asm: dir.join(format!("{}.asm", stem)),
            object: dir.join(format!("{}.o", stem)),
            binary: dir.join(&stem),
        };
        for out in [&paths.asm, &paths.object, &paths.binary] {
            if same_location(out, input) {
                bail!(
                    "refusing to overwrite input {} with compiler output; pass --out-dir",
                    input.display()
                );
            }
        }
        Ok(paths)
    }
}

/// Whether two paths name the same file, resolving their directories.
/// Neither file has to exist.
fn same_location(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    fn resolve(p: &Path) -> Option<PathBuf> {
        let dir = match p.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        Some(dir.canonicalize().ok()?.join(p.file_name()?))
    }
    match (resolve(a), resolve(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Run a produced executable, inheriting stdio.
pub fn run_binary(binary: &Path) -> Result<ExitStatus> {
    // a bare file name would be looked up on PATH
    let path = if binary.components().count() == 1 {
        Path::new(".").join(binary)
    } else {
        binary.to_path_buf()
    };
    let mut cmd = Command::new(&path);
    info!("[CMD] {}", render(&cmd));
    cmd.status()
        .with_context(|| format!("failed to run {}", path.display()))
}

fn call_echoed(cmd: &mut Command) -> Result<()> {
    let line = render(cmd);
    info!("[CMD] {}", line);

    let status = cmd
        .status()
        .with_context(|| format!("failed to start `{}`", line))?;
    if !status.success() {
        bail!("`{}` failed with {}", line, status);
    }
    Ok(())
}

fn render(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
