use crate::bytecode::{ImageError, LinkError};
use crate::frontend::ParseError;
use crate::runtime::RuntimeError;
use std::path::PathBuf;

/// Any failure between reading a source file and finishing a backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("invalid program image {}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
