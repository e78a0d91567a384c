//! x86-64 Linux code generation (NASM syntax).
//!
//! Register convention:
//!
//! - the hardware stack (`push`/`pop`) is the value stack
//! - `r15` holds `rsp` as it was at `_start`, i.e. the empty-stack mark
//! - `rax`, `rbx`, `rcx`, `rdx` are scratch within a single op
//!
//! Every instruction gets the label `addr_<ip>`, so the linker's resolved
//! targets can be used as label names directly.

use crate::bytecode::{Addr, Op, Program};
use std::io::{self, Write};
use tracing::debug;

/// Prints the signed integer in `rdi` followed by a newline to stdout.
const DUMP_ROUTINE: &str = "\
dump:
    sub     rsp, 40
    mov     rax, rdi
    test    rax, rax
    jns     .digits
    neg     rax
.digits:
    lea     rcx, [rsp+39]
    mov     byte [rcx], 10
    mov     r8, 10
.next:
    xor     edx, edx
    div     r8
    add     dl, 48
    dec     rcx
    mov     [rcx], dl
    test    rax, rax
    jnz     .next
    test    rdi, rdi
    jns     .write
    dec     rcx
    mov     byte [rcx], 45
.write:
    mov     rax, 1
    mov     rdi, 1
    mov     rsi, rcx
    lea     rdx, [rsp+40]
    sub     rdx, rcx
    syscall
    add     rsp, 40
    ret
";

/// Reports an empty-stack pop on stderr and exits with status 1.
const UNDERFLOW_ROUTINE: &str = "\
stack_underflow:
    mov     rax, 1
    mov     rdi, 2
    mov     rsi, underflow_msg
    mov     rdx, underflow_msg_len
    syscall
    mov     rax, 60
    mov     rdi, 1
    syscall
";

pub const UNDERFLOW_MESSAGE: &str = "stack underflow";

/// Write a complete assembly unit for `program` to `out`.
pub fn generate<W: Write>(program: &Program, out: &mut W) -> io::Result<()> {
    debug!(source = program.source(), ops = program.len(), "generating assembly");

    writeln!(out, "; generated from {}", program.source())?;
    writeln!(out, "BITS 64")?;
    writeln!(out, "segment .text")?;
    out.write_all(DUMP_ROUTINE.as_bytes())?;
    out.write_all(UNDERFLOW_ROUTINE.as_bytes())?;

    writeln!(out, "global _start")?;
    writeln!(out, "_start:")?;
    writeln!(out, "    mov     r15, rsp")?;

    for (ip, op) in program.ops().iter().enumerate() {
        emit_op(out, ip, op)?;
    }

    writeln!(out, "addr_{}:", program.len())?;
    writeln!(out, "    mov     rax, 60")?;
    writeln!(out, "    mov     rdi, 0")?;
    writeln!(out, "    syscall")?;

    writeln!(out, "segment .rodata")?;
    writeln!(out, "underflow_msg: db \"{}\", 10", UNDERFLOW_MESSAGE)?;
    writeln!(out, "underflow_msg_len equ $ - underflow_msg")?;
    Ok(())
}

/// Generate into a string.
#[cfg(test)]
pub fn generate_to_string(program: &Program) -> String {
    let mut buf = Vec::new();
    // writing into a Vec cannot fail
    let _ = generate(program, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn emit_op<W: Write>(out: &mut W, ip: Addr, op: &Op) -> io::Result<()> {
    writeln!(out, "addr_{}:", ip)?;
    match op {
        Op::Push(n) => writeln!(out, "    ;; -- push {} --", n)?,
        _ => writeln!(out, "    ;; -- {} --", op.mnemonic().to_lowercase())?,
    }

    let (pops, _) = op.stack_effect();
    if pops > 0 {
        emit_depth_check(out, pops)?;
    }

    match op {
        Op::Push(n) => {
            writeln!(out, "    mov     rax, 0x{:016x}", *n as u64)?;
            writeln!(out, "    push    rax")?;
        }
        Op::Plus => {
            writeln!(out, "    pop     rax")?;
            writeln!(out, "    pop     rbx")?;
            writeln!(out, "    add     rbx, rax")?;
            writeln!(out, "    push    rbx")?;
        }
        Op::Minus => {
            writeln!(out, "    pop     rax")?;
            writeln!(out, "    pop     rbx")?;
            writeln!(out, "    sub     rbx, rax")?;
            writeln!(out, "    push    rbx")?;
        }
        Op::Equal => {
            writeln!(out, "    mov     rcx, 0")?;
            writeln!(out, "    mov     rdx, 1")?;
            writeln!(out, "    pop     rax")?;
            writeln!(out, "    pop     rbx")?;
            writeln!(out, "    cmp     rbx, rax")?;
            writeln!(out, "    cmove   rcx, rdx")?;
            writeln!(out, "    push    rcx")?;
        }
        Op::Greater => {
            // rbx = first popped, rax = second popped; 1 if rax > rbx
            writeln!(out, "    mov     rcx, 0")?;
            writeln!(out, "    mov     rdx, 1")?;
            writeln!(out, "    pop     rbx")?;
            writeln!(out, "    pop     rax")?;
            writeln!(out, "    cmp     rax, rbx")?;
            writeln!(out, "    cmovg   rcx, rdx")?;
            writeln!(out, "    push    rcx")?;
        }
        Op::Dup => {
            writeln!(out, "    pop     rax")?;
            writeln!(out, "    push    rax")?;
            writeln!(out, "    push    rax")?;
        }
        Op::Dump => {
            writeln!(out, "    pop     rdi")?;
            writeln!(out, "    call    dump")?;
        }
        Op::If(target) => {
            writeln!(out, "    pop     rax")?;
            writeln!(out, "    test    rax, rax")?;
            writeln!(out, "    jz      addr_{}", target.unwrap_or(ip + 1))?;
        }
        Op::Else(target) => {
            writeln!(out, "    jmp     addr_{}", target.unwrap_or(ip + 1))?;
        }
        Op::End => {}
    }
    Ok(())
}

/// Jump to `stack_underflow` unless at least `n` values are on the stack.
fn emit_depth_check<W: Write>(out: &mut W, n: usize) -> io::Result<()> {
    writeln!(out, "    lea     rax, [rsp+{}]", n * 8)?;
    writeln!(out, "    cmp     rax, r15")?;
    writeln!(out, "    ja      stack_underflow")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::link;
    use crate::frontend::{Lexer, parse_tokens};

    fn asm(source: &str) -> String {
        let ops = parse_tokens(Lexer::new("t.porth", source)).unwrap();
        generate_to_string(&link("t.porth", &ops).unwrap())
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_unit_skeleton() {
        let text = asm("");
        assert!(text.contains("BITS 64"));
        assert!(text.contains("global _start"));
        assert!(text.contains("dump:"));
        assert!(text.contains("stack_underflow:"));
        assert!(text.contains("    mov     r15, rsp"));
        assert!(text.contains("addr_0:"));
        assert!(text.contains("    mov     rax, 60"));
    }

    #[test]
    fn test_one_label_per_instruction() {
        let text = asm("1 if 2 . else 3 . end");
        for ip in 0..=8 {
            assert_eq!(
                count(&text, &format!("addr_{}:", ip)),
                1,
                "label addr_{} in\n{}",
                ip,
                text
            );
        }
    }

    #[test]
    fn test_jumps_use_linked_targets() {
        // 0:1 1:if 2:2 3:. 4:else 5:3 6:. 7:end
        let text = asm("1 if 2 . else 3 . end");
        assert!(text.contains("    jz      addr_5\n"), "{}", text);
        assert!(text.contains("    jmp     addr_7\n"), "{}", text);
    }

    #[test]
    fn test_empty_if_else_labels_are_unique() {
        // else at 2 and end at 3: else+1 == end must not produce two labels
        let text = asm("0 if else end");
        assert_eq!(count(&text, "addr_3:"), 1);
        assert!(text.contains("jz      addr_3"));
        assert!(text.contains("jmp     addr_3"));
    }

    #[test]
    fn test_push_encodes_twos_complement() {
        let text = asm("-1 9223372036854775807");
        assert!(text.contains("mov     rax, 0xffffffffffffffff"));
        assert!(text.contains("mov     rax, 0x7fffffffffffffff"));
    }

    #[test]
    fn test_depth_checks_match_stack_effects() {
        let text = asm("1 2 + .");
        // push, push: none; plus: 2 values; dump: 1 value
        assert_eq!(count(&text, "ja      stack_underflow"), 2);
        assert!(text.contains("lea     rax, [rsp+16]"));
        assert!(text.contains("lea     rax, [rsp+8]"));
    }

    #[test]
    fn test_greater_pops_in_source_order() {
        let text = asm("5 3 >");
        let gt = text.split(";; -- greater --").nth(1).unwrap();
        let first = gt.find("pop     rbx").unwrap();
        let second = gt.find("pop     rax").unwrap();
        assert!(first < second);
        assert!(gt.contains("cmovg   rcx, rdx"));
    }

    #[test]
    fn test_comment_names_op() {
        let text = asm("7 dup");
        assert!(text.contains(";; -- push 7 --"));
        assert!(text.contains(";; -- dup --"));
    }
}
