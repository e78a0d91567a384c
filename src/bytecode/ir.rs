use crate::bytecode::{Addr, Op};
use crate::frontend::Span;
use serde::{Deserialize, Serialize};

/// A linked program: every `If`/`Else` carries a resolved target.
///
/// Only the linker and [`ProgramImage::decode`] construct one, so holding a
/// `Program` means the target invariant has been checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Name of the source the program was built from (used in diagnostics).
    pub(crate) source: String,
    pub(crate) ops: Vec<Op>,
    /// `spans[ip]` is where `ops[ip]` came from.
    pub(crate) spans: Vec<Span>,
}

impl Program {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn span(&self, ip: Addr) -> Span {
        self.spans.get(ip).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Ops paired with their spans, the shape the linker consumes.
    #[cfg(test)]
    pub fn located_ops(&self) -> Vec<(Op, Span)> {
        self.ops.iter().copied().zip(self.spans.iter().copied()).collect()
    }

    /// Addresses some `If`/`Else` jumps to.
    pub fn jump_targets(&self) -> Vec<Addr> {
        let mut targets: Vec<Addr> = self
            .ops
            .iter()
            .filter_map(|op| op.target().flatten())
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }

    /// Check the linked-program invariants.
    fn validate(&self) -> Result<(), ImageError> {
        if self.ops.len() != self.spans.len() {
            return Err(ImageError::SpanMismatch {
                ops: self.ops.len(),
                spans: self.spans.len(),
            });
        }

        for (ip, op) in self.ops.iter().enumerate() {
            match op.target() {
                Some(None) => return Err(ImageError::Unlinked { ip }),
                Some(Some(t)) if t > self.ops.len() => {
                    return Err(ImageError::TargetOutOfRange {
                        ip,
                        target: t,
                        len: self.ops.len(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// =============================================================================
// On-disk form of a linked program (postcard encoded)
// =============================================================================

/// Extension of packed program images.
pub const IMAGE_EXTENSION: &str = "pbc";
pub const IMAGE_MAGIC: [u8; 4] = *b"PRTH";
pub const IMAGE_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImageError {
    #[error("not a program image (bad magic {0:02x?})")]
    BadMagic([u8; 4]),

    #[error("unsupported image version {found} (expected {expected})", expected = IMAGE_VERSION)]
    BadVersion { found: u16 },

    #[error("malformed image")]
    Decode(#[from] postcard::Error),

    #[error("malformed image: {ops} ops but {spans} spans")]
    SpanMismatch { ops: usize, spans: usize },

    #[error("malformed image: instruction {ip} has no jump target")]
    Unlinked { ip: Addr },

    #[error("malformed image: instruction {ip} jumps to {target}, past the end ({len})")]
    TargetOutOfRange { ip: Addr, target: Addr, len: usize },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgramImage {
    magic: [u8; 4],
    version: u16,
    program: Program,
}

impl ProgramImage {
    pub fn encode(program: &Program) -> Result<Vec<u8>, ImageError> {
        let image = ProgramImage {
            magic: IMAGE_MAGIC,
            version: IMAGE_VERSION,
            program: program.clone(),
        };
        Ok(postcard::to_allocvec(&image)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Program, ImageError> {
        let image: ProgramImage = postcard::from_bytes(bytes)?;

        if image.magic != IMAGE_MAGIC {
            return Err(ImageError::BadMagic(image.magic));
        }
        if image.version != IMAGE_VERSION {
            return Err(ImageError::BadVersion {
                found: image.version,
            });
        }

        image.program.validate()?;
        Ok(image.program)
    }
}
