use crate::bytecode::{Addr, Op, Program};
use crate::frontend::Span;

/// Block-structure errors found while resolving jump targets.
///
/// Every variant carries the source name and span of the token that made
/// the structure invalid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    #[error("{file}:{span}: link error: else without matching if")]
    ElseWithoutIf { file: String, span: Span },

    #[error("{file}:{span}: link error: end without matching if/else")]
    EndWithoutBlock { file: String, span: Span },

    #[error("{file}:{span}: link error: end may only close if/else blocks (found '{found}' at instruction {addr})")]
    EndClosesNonBlock {
        file: String,
        span: Span,
        found: Op,
        addr: Addr,
    },

    #[error("{file}:{span}: link error: {op} without matching end")]
    UnclosedBlock { file: String, span: Span, op: Op },

    #[error("{file}:{span}: link error: '{op}' at instruction {addr} is already linked")]
    AlreadyLinked {
        file: String,
        span: Span,
        op: Op,
        addr: Addr,
    },
}

impl LinkError {
    #[cfg(test)]
    pub fn span(&self) -> Span {
        match self {
            LinkError::ElseWithoutIf { span, .. }
            | LinkError::EndWithoutBlock { span, .. }
            | LinkError::EndClosesNonBlock { span, .. }
            | LinkError::UnclosedBlock { span, .. }
            | LinkError::AlreadyLinked { span, .. } => *span,
        }
    }
}

/// Resolve every `if`/`else` to an absolute instruction address.
///
/// One left-to-right pass with a stack of open block addresses:
///
/// ```text
///   if    push own address
///   else  pop an `if`, point it at else+1, push own address
///   end   pop an `if`/`else`, point it at this `end`
/// ```
///
/// The input is left untouched; the linked ops are returned as a new
/// [`Program`]. Ops that already carry a target are rejected, so a linked
/// program cannot be linked twice.
pub fn link(source: &str, input: &[(Op, Span)]) -> Result<Program, LinkError> {
    let mut ops: Vec<Op> = Vec::with_capacity(input.len());
    let mut spans: Vec<Span> = Vec::with_capacity(input.len());
    let mut open: Vec<Addr> = Vec::new();

    for (ip, &(op, span)) in input.iter().enumerate() {
        if let Some(Some(_)) = op.target() {
            return Err(LinkError::AlreadyLinked {
                file: source.to_string(),
                span,
                op,
                addr: ip,
            });
        }

        match op {
            Op::If(_) => open.push(ip),

            Op::Else(_) => {
                let if_ip = match open.pop() {
                    Some(addr) if matches!(ops[addr], Op::If(_)) => addr,
                    _ => {
                        return Err(LinkError::ElseWithoutIf {
                            file: source.to_string(),
                            span,
                        });
                    }
                };
                // a false condition lands on the first op of the else body
                ops[if_ip] = Op::If(Some(ip + 1));
                open.push(ip);
            }

            Op::End => {
                let block_ip = open.pop().ok_or_else(|| LinkError::EndWithoutBlock {
                    file: source.to_string(),
                    span,
                })?;
                ops[block_ip] = match ops[block_ip] {
                    Op::If(_) => Op::If(Some(ip)),
                    Op::Else(_) => Op::Else(Some(ip)),
                    found => {
                        return Err(LinkError::EndClosesNonBlock {
                            file: source.to_string(),
                            span,
                            found,
                            addr: block_ip,
                        });
                    }
                };
            }

            _ => {}
        }

        ops.push(op);
        spans.push(span);
    }

    if let Some(&addr) = open.last() {
        return Err(LinkError::UnclosedBlock {
            file: source.to_string(),
            span: spans[addr],
            op: ops[addr],
        });
    }

    Ok(Program {
        source: source.to_string(),
        ops,
        spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{Lexer, parse_tokens};

    fn located(source: &str) -> Vec<(Op, Span)> {
        parse_tokens(Lexer::new("test.porth", source)).unwrap()
    }

    fn link_src(source: &str) -> Result<Program, LinkError> {
        link("test.porth", &located(source))
    }

    fn linked_ops(source: &str) -> Vec<Op> {
        link_src(source).unwrap().ops().to_vec()
    }

    #[test]
    fn test_straight_line_untouched() {
        assert_eq!(
            linked_ops("1 2 + ."),
            vec![Op::Push(1), Op::Push(2), Op::Plus, Op::Dump]
        );
    }

    #[test]
    fn test_if_end_targets_end() {
        // 0:1 1:if 2:10 3:. 4:end
        let ops = linked_ops("1 if 10 . end");
        assert_eq!(ops[1], Op::If(Some(4)));
        assert_eq!(ops[4], Op::End);
    }

    #[test]
    fn test_if_else_end_targets() {
        // 0:1 1:if 2:10 3:. 4:else 5:20 6:. 7:end
        let ops = linked_ops("1 if 10 . else 20 . end");
        assert_eq!(ops[1], Op::If(Some(5)));
        assert_eq!(ops[4], Op::Else(Some(7)));
    }

    #[test]
    fn test_nested_blocks() {
        // 0:1 1:if 2:0 3:if 4:1 5:. 6:else 7:2 8:. 9:end 10:else 11:3 12:. 13:end
        let ops = linked_ops("1 if 0 if 1 . else 2 . end else 3 . end");
        assert_eq!(ops[1], Op::If(Some(11)));
        assert_eq!(ops[3], Op::If(Some(7)));
        assert_eq!(ops[6], Op::Else(Some(9)));
        assert_eq!(ops[10], Op::Else(Some(13)));
    }

    #[test]
    fn test_empty_blocks() {
        // 0:if 1:else 2:end
        let ops = linked_ops("if else end");
        assert_eq!(ops[0], Op::If(Some(2)));
        assert_eq!(ops[1], Op::Else(Some(2)));
    }

    #[test]
    fn test_all_targets_in_range() {
        let program = link_src("1 if 2 if 3 . end else 4 . end 5 .").unwrap();
        for op in program.ops() {
            if let Some(t) = op.target() {
                let t = t.expect("linked");
                assert!(t <= program.len());
            }
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = located("1 if 2 . end");
        let _ = link("test.porth", &input).unwrap();
        assert_eq!(input[1].0, Op::If(None));
    }

    #[test]
    fn test_unmatched_end() {
        let err = link_src("1 .\n end").unwrap_err();
        assert!(matches!(err, LinkError::EndWithoutBlock { .. }));
        assert_eq!(err.span(), Span::new(2, 2));
        assert!(err.to_string().contains("end without matching if/else"));
    }

    #[test]
    fn test_extra_end_after_closed_block() {
        let err = link_src("1 if end end").unwrap_err();
        assert!(matches!(err, LinkError::EndWithoutBlock { .. }));
        assert_eq!(err.span(), Span::new(1, 10));
    }

    #[test]
    fn test_else_without_if() {
        let err = link_src("else end").unwrap_err();
        assert!(matches!(err, LinkError::ElseWithoutIf { .. }));
        assert!(err.to_string().contains("else without matching if"));
    }

    #[test]
    fn test_double_else() {
        let err = link_src("1 if else else end").unwrap_err();
        assert!(matches!(err, LinkError::ElseWithoutIf { .. }));
        assert_eq!(err.span(), Span::new(1, 11));
    }

    #[test]
    fn test_unclosed_if() {
        let err = link_src("1 if 2 .").unwrap_err();
        assert!(matches!(err, LinkError::UnclosedBlock { op: Op::If(None), .. }));
        assert_eq!(err.span(), Span::new(1, 3));
        assert!(err.to_string().contains("without matching end"));
    }

    #[test]
    fn test_unclosed_else_reports_innermost() {
        let err = link_src("1 if\n0 if else").unwrap_err();
        match err {
            LinkError::UnclosedBlock { span, op, .. } => {
                assert_eq!(op, Op::Else(None));
                assert_eq!(span, Span::new(2, 6));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_relinking_is_rejected() {
        let program = link_src("1 if 2 . else 3 . end").unwrap();
        let err = link(program.source(), &program.located_ops()).unwrap_err();
        assert!(matches!(err, LinkError::AlreadyLinked { addr: 1, .. }));
        assert!(err.to_string().contains("already linked"));
    }

    #[test]
    fn test_relinking_without_blocks_is_a_noop() {
        let program = link_src("1 2 + .").unwrap();
        let again = link(program.source(), &program.located_ops()).unwrap();
        assert_eq!(again, program);
    }
}
