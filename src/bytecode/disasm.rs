use crate::bytecode::{Addr, Op, Program};
use std::io::{self, Write};

/// Print disassembly of a linked program
pub fn print_program<W: Write>(program: &Program, out: &mut W) -> io::Result<()> {
    writeln!(out, "════════════════════════════════════════")?;
    writeln!(out, " {}", program.source())?;
    writeln!(out, " {} instructions", program.len())?;
    writeln!(out, "════════════════════════════════════════")?;
    disassemble(program, out)?;
    writeln!(out)
}

/// One line per instruction; jump targets are marked with `►`.
pub fn disassemble<W: Write>(program: &Program, out: &mut W) -> io::Result<()> {
    let jump_targets = program.jump_targets();

    for (ip, op) in program.ops().iter().enumerate() {
        let is_target = jump_targets.binary_search(&ip).is_ok();
        if is_target {
            writeln!(out, "      ┌──────────────────────────────────")?;
        }

        write!(out, "{:04} ", ip)?;
        write!(out, "{}", if is_target { "► " } else { "  " })?;
        write_op(op, ip, out)?;

        let span = program.span(ip);
        writeln!(out, "  ; {}", span)?;
    }

    // a target may sit one past the last instruction
    if jump_targets.binary_search(&program.len()).is_ok() {
        writeln!(out, "      ┌──────────────────────────────────")?;
        writeln!(out, "{:04} ► <exit>", program.len())?;
    }
    Ok(())
}

fn write_op<W: Write>(op: &Op, ip: Addr, out: &mut W) -> io::Result<()> {
    match op {
        Op::Push(n) => write!(out, "{:<11} {}", op.mnemonic(), n),

        Op::If(target) | Op::Else(target) => {
            let cond = if matches!(op, Op::If(_)) {
                "if zero"
            } else {
                "always"
            };
            match target {
                Some(t) => {
                    let direction = if *t < ip { "↑" } else { "↓" };
                    write!(
                        out,
                        "{:<11} {} (→ {:04}, {})",
                        op.mnemonic(),
                        direction,
                        t,
                        cond
                    )
                }
                None => write!(out, "{:<11} ? (unlinked)", op.mnemonic()),
            }
        }

        Op::Plus => write!(out, "{:<11} ; ( a b -- a+b )", op.mnemonic()),
        Op::Minus => write!(out, "{:<11} ; ( a b -- a-b )", op.mnemonic()),
        Op::Equal => write!(out, "{:<11} ; ( a b -- a=b )", op.mnemonic()),
        Op::Greater => write!(out, "{:<11} ; ( a b -- a>b )", op.mnemonic()),
        Op::Dup => write!(out, "{:<11} ; ( a -- a a )", op.mnemonic()),
        Op::Dump => write!(out, "{:<11} ; ( a -- )", op.mnemonic()),
        Op::End => write!(out, "{}", op.mnemonic()),
    }
}
