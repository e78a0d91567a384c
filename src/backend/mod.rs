pub mod nasm;
pub mod toolchain;

pub use toolchain::{OutputPaths, Toolchain, run_binary};
