use crate::bytecode::{Addr, Op};
use crate::frontend::Span;

/// A fault that aborts the running program.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("{file}:{span}: runtime error: stack underflow in '{op}' (instruction {ip})")]
    StackUnderflow {
        file: String,
        span: Span,
        op: Op,
        ip: Addr,
    },

    #[error("runtime error: execution step limit exceeded ({limit})")]
    StepLimit { limit: u64 },

    #[error("runtime error: cannot write program output")]
    Output(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underflow_display() {
        let err = RuntimeError::StackUnderflow {
            file: "a.porth".to_string(),
            span: Span::new(3, 7),
            op: Op::Plus,
            ip: 4,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("a.porth:3:7:"), "{}", msg);
        assert!(msg.contains("stack underflow"));
        assert!(msg.contains("'+'"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let err = RuntimeError::StepLimit { limit: 10 };
        let _: &dyn std::error::Error = &err;
        assert!(err.to_string().contains("(10)"));
    }
}
