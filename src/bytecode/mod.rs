pub mod disasm;
pub mod ir;
pub mod link;
pub mod op;

pub use ir::{IMAGE_EXTENSION, ImageError, Program, ProgramImage};
pub use link::{LinkError, link};
pub use op::{Addr, Op};
