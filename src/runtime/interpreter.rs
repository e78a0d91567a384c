use crate::bytecode::{Op, Program};
use crate::runtime::runtime_error::RuntimeError;
use std::io::Write;
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// Abort after this many executed instructions. `None` runs to completion.
    pub max_steps: Option<u64>,
}

/// Executes a linked program, writing dumped values to `out`.
pub struct Interpreter<W: Write> {
    out: W,
    config: InterpreterConfig,
}

impl<W: Write> Interpreter<W> {
    #[cfg(test)]
    pub fn new(out: W) -> Self {
        Self::with_config(out, InterpreterConfig::default())
    }

    pub fn with_config(out: W, config: InterpreterConfig) -> Self {
        Self { out, config }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }

    /// Run `program` from instruction 0 until `ip` falls off the end.
    ///
    /// Output written before a fault stays written; the fault is returned
    /// as soon as it happens.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let result = self.exec(program);
        self.out.flush()?;
        result
    }

    fn exec(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let ops = program.ops();
        let mut stack: Vec<i64> = Vec::new();
        let mut ip: usize = 0;
        let mut steps: u64 = 0;

        debug!(source = program.source(), ops = ops.len(), "interpreting");

        while ip < ops.len() {
            steps += 1;
            if let Some(limit) = self.config.max_steps {
                if steps > limit {
                    return Err(RuntimeError::StepLimit { limit });
                }
            }

            let op = ops[ip];
            let (pops, _) = op.stack_effect();
            if stack.len() < pops {
                return Err(RuntimeError::StackUnderflow {
                    file: program.source().to_string(),
                    span: program.span(ip),
                    op,
                    ip,
                });
            }

            trace!(ip, ?op, depth = stack.len(), "step");

            match op {
                Op::Push(n) => {
                    stack.push(n);
                    ip += 1;
                }
                Op::Plus => {
                    let a = pop(&mut stack);
                    let b = pop(&mut stack);
                    stack.push(b.wrapping_add(a));
                    ip += 1;
                }
                Op::Minus => {
                    let a = pop(&mut stack);
                    let b = pop(&mut stack);
                    stack.push(b.wrapping_sub(a));
                    ip += 1;
                }
                Op::Equal => {
                    let a = pop(&mut stack);
                    let b = pop(&mut stack);
                    stack.push(i64::from(a == b));
                    ip += 1;
                }
                Op::Greater => {
                    let a = pop(&mut stack);
                    let b = pop(&mut stack);
                    stack.push(i64::from(b > a));
                    ip += 1;
                }
                Op::Dup => {
                    let a = pop(&mut stack);
                    stack.push(a);
                    stack.push(a);
                    ip += 1;
                }
                Op::Dump => {
                    let a = pop(&mut stack);
                    writeln!(self.out, "{}", a)?;
                    ip += 1;
                }
                Op::If(target) => {
                    let cond = pop(&mut stack);
                    ip = match (cond, target) {
                        (0, Some(t)) => t,
                        _ => ip + 1,
                    };
                }
                Op::Else(target) => {
                    ip = target.unwrap_or(ip + 1);
                }
                Op::End => ip += 1,
            }
        }

        debug!(steps, depth = stack.len(), "program finished");
        Ok(())
    }
}

// the depth check in `exec` runs first, so this never sees an empty stack
fn pop(stack: &mut Vec<i64>) -> i64 {
    stack.pop().unwrap_or_default()
}

/// Run a program and collect its output as text.
#[cfg(test)]
pub fn run_to_string(
    program: &Program,
    config: InterpreterConfig,
) -> Result<String, RuntimeError> {
    let mut interp = Interpreter::with_config(Vec::new(), config);
    interp.run(program)?;
    Ok(String::from_utf8_lossy(&interp.into_output()).into_owned())
}
