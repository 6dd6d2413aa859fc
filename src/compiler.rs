//! Compiles a syntax tree into bytecode.
//!
//! Tracks the last two emitted instructions so that a trailing `OpPop` left
//! over from compiling an if-expression's branch can be stripped — the
//! branch's value must remain on the stack, not be discarded like an
//! ordinary statement's.

use tracing::debug;

use crate::ast::*;
use crate::code::{self, Opcode};
use crate::error::CompileError;
use crate::object::Object;

#[derive(Clone, Copy, Default)]
struct EmittedInstruction {
    opcode: Option<Opcode>,
    position: usize,
}

pub struct Bytecode {
    pub instructions: Vec<u8>,
    pub constants: Vec<Object>,
}

pub struct Compiler {
    instructions: Vec<u8>,
    constants: Vec<Object>,
    last_instruction: EmittedInstruction,
    previous_instruction: EmittedInstruction,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            instructions: Vec::new(),
            constants: Vec::new(),
            last_instruction: EmittedInstruction::default(),
            previous_instruction: EmittedInstruction::default(),
        }
    }

    pub fn compile_program(&mut self, program: &Program) -> Result<(), CompileError> {
        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, stmt: &Statement) -> Result<(), CompileError> {
        match stmt {
            Statement::Expression(s) => {
                self.compile_expression(&s.expression)?;
                self.emit(Opcode::OpPop, &[]);
                Ok(())
            }
            Statement::Block(b) => {
                for s in &b.statements {
                    self.compile_statement(s)?;
                }
                Ok(())
            }
            Statement::Let(_) => Err(CompileError::UnsupportedNode("let statement".to_string())),
            Statement::Return(_) => {
                Err(CompileError::UnsupportedNode("return statement".to_string()))
            }
        }
    }

    fn compile_expression(&mut self, expr: &Expression) -> Result<(), CompileError> {
        match expr {
            Expression::IntegerLiteral(v) => {
                let idx = self.add_constant(Object::Integer(*v));
                self.emit(Opcode::OpConstant, &[idx]);
                Ok(())
            }
            Expression::Boolean(true) => {
                self.emit(Opcode::OpTrue, &[]);
                Ok(())
            }
            Expression::Boolean(false) => {
                self.emit(Opcode::OpFalse, &[]);
                Ok(())
            }
            Expression::Prefix(p) => self.compile_prefix(p),
            Expression::Infix(i) => self.compile_infix(i),
            Expression::If(i) => self.compile_if(i),
            other => Err(CompileError::UnsupportedNode(node_kind(other))),
        }
    }

    fn compile_prefix(&mut self, expr: &PrefixExpression) -> Result<(), CompileError> {
        self.compile_expression(&expr.right)?;
        match expr.operator.as_str() {
            "-" => self.emit(Opcode::OpMinus, &[]),
            "!" => self.emit(Opcode::OpBang, &[]),
            op => return Err(CompileError::UnknownOperator(op.to_string())),
        };
        Ok(())
    }

    fn compile_infix(&mut self, expr: &InfixExpression) -> Result<(), CompileError> {
        if expr.operator == "<" {
            self.compile_expression(&expr.right)?;
            self.compile_expression(&expr.left)?;
            self.emit(Opcode::OpGreaterThan, &[]);
            return Ok(());
        }

        self.compile_expression(&expr.left)?;
        self.compile_expression(&expr.right)?;

        match expr.operator.as_str() {
            "+" => self.emit(Opcode::OpAdd, &[]),
            "-" => self.emit(Opcode::OpSub, &[]),
            "*" => self.emit(Opcode::OpMul, &[]),
            "/" => self.emit(Opcode::OpDiv, &[]),
            ">" => self.emit(Opcode::OpGreaterThan, &[]),
            "==" => self.emit(Opcode::OpEqual, &[]),
            "!=" => self.emit(Opcode::OpNotEqual, &[]),
            op => return Err(CompileError::UnknownOperator(op.to_string())),
        };
        Ok(())
    }

    fn compile_if(&mut self, expr: &IfExpression) -> Result<(), CompileError> {
        self.compile_expression(&expr.condition)?;

        let jump_not_truthy_pos = self.emit(Opcode::OpJumpNotTruthy, &[9999]);

        self.compile_block(&expr.consequence)?;
        if self.last_instruction_is_pop() {
            self.remove_last_pop();
        }

        let mut pos_after_consequence = self.instructions.len();

        if let Some(alt) = &expr.alternative {
            let jump_pos = self.emit(Opcode::OpJump, &[9999]);
            pos_after_consequence = self.instructions.len();

            self.compile_block(alt)?;
            if self.last_instruction_is_pop() {
                self.remove_last_pop();
            }

            let pos_after_alternative = self.instructions.len();
            self.change_operand(jump_pos, pos_after_alternative);
        }

        self.change_operand(jump_not_truthy_pos, pos_after_consequence);

        Ok(())
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<(), CompileError> {
        for stmt in &block.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    pub fn bytecode(self) -> Bytecode {
        Bytecode {
            instructions: self.instructions,
            constants: self.constants,
        }
    }

    fn add_constant(&mut self, obj: Object) -> usize {
        self.constants.push(obj);
        self.constants.len() - 1
    }

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = code::make(op, operands);
        let pos = self.add_instruction(instruction);
        self.set_last_instruction(op, pos);
        debug!(opcode = %op, position = pos, "emit");
        pos
    }

    fn add_instruction(&mut self, instruction: Vec<u8>) -> usize {
        let pos = self.instructions.len();
        self.instructions.extend_from_slice(&instruction);
        pos
    }

    fn set_last_instruction(&mut self, op: Opcode, pos: usize) {
        self.previous_instruction = self.last_instruction;
        self.last_instruction = EmittedInstruction {
            opcode: Some(op),
            position: pos,
        };
    }

    fn last_instruction_is_pop(&self) -> bool {
        self.last_instruction.opcode == Some(Opcode::OpPop)
    }

    fn remove_last_pop(&mut self) {
        self.instructions.truncate(self.last_instruction.position);
        self.last_instruction = self.previous_instruction;
    }

    fn change_operand(&mut self, op_pos: usize, operand: usize) {
        let opcode = opcode_from_byte(self.instructions[op_pos]);
        let new_instruction = code::make(opcode, &[operand]);
        self.set_instruction(op_pos, &new_instruction);
    }

    fn set_instruction(&mut self, pos: usize, new_instruction: &[u8]) {
        self.instructions[pos..pos + new_instruction.len()].copy_from_slice(new_instruction);
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn opcode_from_byte(byte: u8) -> Opcode {
    // SAFETY-free lookup: every byte written to `instructions` by `emit`
    // originated from `Opcode as u8`, so this round-trip is exhaustive over
    // the opcodes this compiler ever emits.
    match byte {
        0 => Opcode::OpConstant,
        1 => Opcode::OpAdd,
        2 => Opcode::OpSub,
        3 => Opcode::OpMul,
        4 => Opcode::OpDiv,
        5 => Opcode::OpPop,
        6 => Opcode::OpTrue,
        7 => Opcode::OpFalse,
        8 => Opcode::OpEqual,
        9 => Opcode::OpNotEqual,
        10 => Opcode::OpGreaterThan,
        11 => Opcode::OpMinus,
        12 => Opcode::OpBang,
        13 => Opcode::OpJumpNotTruthy,
        14 => Opcode::OpJump,
        other => unreachable!("compiler emitted unknown opcode byte {other}"),
    }
}

fn node_kind(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(_) => "identifier",
        Expression::IntegerLiteral(_) => "integer literal",
        Expression::StringLiteral(_) => "string literal",
        Expression::Boolean(_) => "boolean",
        Expression::Prefix(_) => "prefix expression",
        Expression::Infix(_) => "infix expression",
        Expression::If(_) => "if expression",
        Expression::Function(_) => "function literal",
        Expression::Call(_) => "call expression",
        Expression::Array(_) => "array literal",
        Expression::Index(_) => "index expression",
        Expression::Hash(_) => "hash literal",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{disassemble, make};
    use crate::parser::parse;

    fn compile(input: &str) -> Bytecode {
        let (program, errors) = parse(input);
        assert!(errors.is_empty(), "parser errors: {errors:?}");
        let mut compiler = Compiler::new();
        compiler.compile_program(&program).expect("compile error");
        compiler.bytecode()
    }

    fn constant_ints(bytecode: &Bytecode) -> Vec<i64> {
        bytecode
            .constants
            .iter()
            .map(|c| match c {
                Object::Integer(v) => *v,
                _ => panic!("expected integer constant"),
            })
            .collect()
    }

    #[test]
    fn integer_arithmetic_emits_expected_instructions() {
        let bytecode = compile("1 + 2");
        assert_eq!(constant_ints(&bytecode), vec![1, 2]);

        let expected = [
            make(Opcode::OpConstant, &[0]),
            make(Opcode::OpConstant, &[1]),
            make(Opcode::OpAdd, &[]),
            make(Opcode::OpPop, &[]),
        ]
        .concat();
        assert_eq!(bytecode.instructions, expected);
    }

    #[test]
    fn less_than_reorders_operands_onto_greater_than() {
        let bytecode = compile("1 < 2");
        let expected = [
            make(Opcode::OpConstant, &[0]), // 2
            make(Opcode::OpConstant, &[1]), // 1
            make(Opcode::OpGreaterThan, &[]),
            make(Opcode::OpPop, &[]),
        ]
        .concat();
        assert_eq!(bytecode.instructions, expected);
        assert_eq!(constant_ints(&bytecode), vec![2, 1]);
    }

    #[test]
    fn if_without_else_patches_single_jump() {
        let bytecode = compile("if (true) { 10 }; 3333;");
        let disasm = disassemble(&bytecode.instructions);
        // condition, jump-not-truthy, consequence, (patched) pop, constant, pop
        assert!(disasm.contains("OpJumpNotTruthy"));
        assert!(!disasm.contains("OpJump "));
    }

    #[test]
    fn if_else_patches_both_jumps() {
        let bytecode = compile("if (true) { 10 } else { 20 }; 3333;");
        let disasm = disassemble(&bytecode.instructions);
        assert!(disasm.contains("OpJumpNotTruthy"));
        assert!(disasm.contains("OpJump "));
    }

    #[test]
    fn rejects_unsupported_nodes() {
        let (program, errors) = parse("foobar");
        assert!(errors.is_empty());
        let mut compiler = Compiler::new();
        let err = compiler.compile_program(&program).unwrap_err();
        assert_eq!(err, CompileError::UnsupportedNode("identifier".to_string()));
    }
}
