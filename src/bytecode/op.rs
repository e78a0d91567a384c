use serde::{Deserialize, Serialize};

/// Instruction address: an index into a program's op list.
pub type Addr = usize;

// =============================================================================
// OP - the one instruction set shared by parser, linker, interpreter and
// code generator.
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // literals
    Push(i64),

    // arithmetic
    Plus,
    Minus,

    // comparison
    Equal,
    Greater,

    // stack ops
    Dup,

    // I/O
    Dump,

    // ==========================================================================
    // Control flow. `None` means the linker has not resolved the target yet.
    // ==========================================================================
    /// Pop a condition; on zero jump to the target, otherwise fall through.
    If(Option<Addr>),

    /// Unconditional jump, taken when the `if` branch runs into its `else`.
    Else(Option<Addr>),

    /// Closes an `if`/`else` block. Executes as a no-op.
    End,
}

impl Op {
    /// Returns (pops, pushes) for an op.
    pub fn stack_effect(&self) -> (usize, usize) {
        use Op::*;
        match self {
            Push(_) => (0, 1),
            Plus | Minus => (2, 1),
            Equal | Greater => (2, 1),
            Dup => (1, 2),
            Dump => (1, 0),
            If(_) => (1, 0),
            Else(_) | End => (0, 0),
        }
    }

    /// Source keyword for the op, or `None` for literals.
    pub fn keyword(&self) -> Option<&'static str> {
        use Op::*;
        Some(match self {
            Push(_) => return None,
            Plus => "+",
            Minus => "-",
            Equal => "=",
            Greater => ">",
            Dup => "dup",
            Dump => ".",
            If(_) => "if",
            Else(_) => "else",
            End => "end",
        })
    }

    /// Upper-case mnemonic used by the disassembler and as a comment in
    /// generated assembly.
    pub fn mnemonic(&self) -> &'static str {
        use Op::*;
        match self {
            Push(_) => "PUSH",
            Plus => "PLUS",
            Minus => "MINUS",
            Equal => "EQUAL",
            Greater => "GREATER",
            Dup => "DUP",
            Dump => "DUMP",
            If(_) => "IF",
            Else(_) => "ELSE",
            End => "END",
        }
    }

    /// Jump target carried by `If`/`Else`. The outer `Option` is `None` for
    /// ops that never jump.
    pub fn target(&self) -> Option<Option<Addr>> {
        match self {
            Op::If(t) | Op::Else(t) => Some(*t),
            _ => None,
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Push(n) => write!(f, "{}", n),
            other => match other.keyword() {
                Some(k) => write!(f, "{}", k),
                None => write!(f, "{}", other.mnemonic()),
            },
        }
    }
}
