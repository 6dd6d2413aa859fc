//! Stack-based virtual machine executing compiled bytecode.
//!
//! Fetch-decode-dispatch over a fixed-capacity operand stack. The opcode
//! set is small (see `src/code.rs`), so the arithmetic/comparison handlers
//! are inlined here rather than split into per-opcode-family submodules.

use tracing::error;

use crate::code::{self, Opcode};
use crate::compiler::Bytecode;
use crate::error::VmError;
use crate::object::Object;

const STACK_SIZE: usize = 2048;

pub struct Vm {
    constants: Vec<Object>,
    instructions: Vec<u8>,
    stack: Vec<Object>,
    sp: usize,
    last_popped: Option<Object>,
}

impl Vm {
    pub fn new(bytecode: Bytecode) -> Self {
        Vm {
            constants: bytecode.constants,
            instructions: bytecode.instructions,
            stack: Vec::with_capacity(STACK_SIZE),
            sp: 0,
            last_popped: None,
        }
    }

    pub fn stack_top(&self) -> Option<&Object> {
        if self.sp == 0 {
            None
        } else {
            self.stack.get(self.sp - 1)
        }
    }

    /// The most recently popped value. Statement compilation always emits a
    /// trailing `OpPop`, so this is how tests observe an expression's
    /// result after the VM halts.
    pub fn last_popped(&self) -> Option<&Object> {
        self.last_popped.as_ref()
    }

    pub fn run(&mut self) -> Result<(), VmError> {
        let mut ip = 0usize;

        while ip < self.instructions.len() {
            let op_byte = self.instructions[ip];
            let op = opcode_from_byte(op_byte)?;

            match op {
                Opcode::OpConstant => {
                    let idx = code::read_u16(&self.instructions[ip + 1..]) as usize;
                    ip += 2;
                    let constant = self.constants[idx].clone();
                    self.push(constant)?;
                }
                Opcode::OpAdd | Opcode::OpSub | Opcode::OpMul | Opcode::OpDiv => {
                    self.exec_binary_op(op)?;
                }
                Opcode::OpTrue => self.push(Object::Boolean(true))?,
                Opcode::OpFalse => self.push(Object::Boolean(false))?,
                Opcode::OpEqual | Opcode::OpNotEqual | Opcode::OpGreaterThan => {
                    self.exec_comparison(op)?;
                }
                Opcode::OpBang => self.exec_bang()?,
                Opcode::OpMinus => self.exec_minus()?,
                Opcode::OpJump => {
                    let target = code::read_u16(&self.instructions[ip + 1..]) as usize;
                    ip = target;
                    continue;
                }
                Opcode::OpJumpNotTruthy => {
                    let target = code::read_u16(&self.instructions[ip + 1..]) as usize;
                    ip += 2;
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        ip = target;
                        continue;
                    }
                }
                Opcode::OpPop => {
                    self.pop();
                }
            }

            ip += 1;
        }

        Ok(())
    }

    fn push(&mut self, obj: Object) -> Result<(), VmError> {
        if self.sp >= STACK_SIZE {
            error!("vm stack overflow at sp={}", self.sp);
            return Err(VmError::StackOverflow);
        }
        if self.sp == self.stack.len() {
            self.stack.push(obj);
        } else {
            self.stack[self.sp] = obj;
        }
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Object {
        let obj = self.stack[self.sp - 1].clone();
        self.sp -= 1;
        self.last_popped = Some(obj.clone());
        obj
    }

    fn exec_binary_op(&mut self, op: Opcode) -> Result<(), VmError> {
        let right = self.pop();
        let left = self.pop();

        match (&left, &right) {
            (Object::Integer(l), Object::Integer(r)) => {
                let result = match op {
                    Opcode::OpAdd => l + r,
                    Opcode::OpSub => l - r,
                    Opcode::OpMul => l * r,
                    Opcode::OpDiv => l / r,
                    _ => unreachable!(),
                };
                self.push(Object::Integer(result))
            }
            (Object::Str(l), Object::Str(r)) if op == Opcode::OpAdd => {
                self.push(Object::Str(format!("{l}{r}")))
            }
            _ => Err(VmError::UnsupportedBinaryTypes(
                left.type_name().to_string(),
                right.type_name().to_string(),
            )),
        }
    }

    fn exec_comparison(&mut self, op: Opcode) -> Result<(), VmError> {
        let right = self.pop();
        let left = self.pop();

        match (&left, &right) {
            (Object::Integer(l), Object::Integer(r)) => {
                let result = match op {
                    Opcode::OpEqual => l == r,
                    Opcode::OpNotEqual => l != r,
                    Opcode::OpGreaterThan => l > r,
                    _ => unreachable!(),
                };
                self.push(Object::Boolean(result))
            }
            (Object::Boolean(l), Object::Boolean(r)) => match op {
                Opcode::OpEqual => self.push(Object::Boolean(l == r)),
                Opcode::OpNotEqual => self.push(Object::Boolean(l != r)),
                _ => Err(VmError::UnknownIntegerOperator(format!("{op}"))),
            },
            // Mixed types are unequal: OpEqual is always false, OpNotEqual
            // always true; only OpGreaterThan has no cross-type meaning.
            _ => match op {
                Opcode::OpEqual => self.push(Object::Boolean(false)),
                Opcode::OpNotEqual => self.push(Object::Boolean(true)),
                _ => Err(VmError::UnsupportedBinaryTypes(
                    left.type_name().to_string(),
                    right.type_name().to_string(),
                )),
            },
        }
    }

    fn exec_bang(&mut self) -> Result<(), VmError> {
        let operand = self.pop();
        let result = !operand.is_truthy();
        self.push(Object::Boolean(result))
    }

    fn exec_minus(&mut self) -> Result<(), VmError> {
        let operand = self.pop();
        match operand {
            Object::Integer(v) => self.push(Object::Integer(-v)),
            other => Err(VmError::UnknownIntegerOperator(format!(
                "-{}",
                other.type_name()
            ))),
        }
    }
}

fn opcode_from_byte(byte: u8) -> Result<Opcode, VmError> {
    let def = code::lookup(byte).map_err(VmError::Bytecode)?;
    Ok(match def.name {
        "OpConstant" => Opcode::OpConstant,
        "OpAdd" => Opcode::OpAdd,
        "OpSub" => Opcode::OpSub,
        "OpMul" => Opcode::OpMul,
        "OpDiv" => Opcode::OpDiv,
        "OpPop" => Opcode::OpPop,
        "OpTrue" => Opcode::OpTrue,
        "OpFalse" => Opcode::OpFalse,
        "OpEqual" => Opcode::OpEqual,
        "OpNotEqual" => Opcode::OpNotEqual,
        "OpGreaterThan" => Opcode::OpGreaterThan,
        "OpMinus" => Opcode::OpMinus,
        "OpBang" => Opcode::OpBang,
        "OpJumpNotTruthy" => Opcode::OpJumpNotTruthy,
        "OpJump" => Opcode::OpJump,
        other => return Err(VmError::Bytecode(format!("unhandled opcode {other}"))),
    })
}
