//! Tree-walking evaluator.
//!
//! `eval` never raises out of band: every failure becomes an
//! `Object::Error` value that the caller must check for and propagate,
//! rather than a `Result` error.

mod builtins;

use std::rc::Rc;

use crate::ast::*;
use crate::environment::Environment;
use crate::object::{native_bool, new_error, new_hash, null, Object};

pub fn eval_program(program: &Program, env: &Environment) -> Rc<Object> {
    let mut result = null();
    for stmt in &program.statements {
        result = eval_statement(stmt, env);
        match result.as_ref() {
            Object::ReturnValue(value) => return value.clone(),
            Object::Error(_) => return result,
            _ => {}
        }
    }
    result
}

fn eval_block_statement(block: &BlockStatement, env: &Environment) -> Rc<Object> {
    let mut result = null();
    for stmt in &block.statements {
        result = eval_statement(stmt, env);
        if matches!(result.as_ref(), Object::ReturnValue(_) | Object::Error(_)) {
            return result;
        }
    }
    result
}

fn eval_statement(stmt: &Statement, env: &Environment) -> Rc<Object> {
    match stmt {
        Statement::Expression(s) => eval_expression(&s.expression, env),
        Statement::Return(s) => {
            let value = eval_expression(&s.return_value, env);
            if is_error(&value) {
                return value;
            }
            Rc::new(Object::ReturnValue(value))
        }
        Statement::Let(s) => {
            let value = eval_expression(&s.value, env);
            if is_error(&value) {
                return value;
            }
            env.set(&s.name.value, value);
            null()
        }
        Statement::Block(b) => eval_block_statement(b, env),
    }
}

fn eval_expression(expr: &Expression, env: &Environment) -> Rc<Object> {
    match expr {
        Expression::IntegerLiteral(v) => Rc::new(Object::Integer(*v)),
        Expression::StringLiteral(v) => Rc::new(Object::Str(v.clone())),
        Expression::Boolean(v) => native_bool(*v),
        Expression::Identifier(ident) => eval_identifier(ident, env),
        Expression::Prefix(p) => {
            let right = eval_expression(&p.right, env);
            if is_error(&right) {
                return right;
            }
            eval_prefix_expression(&p.operator, &right)
        }
        Expression::Infix(i) => {
            let left = eval_expression(&i.left, env);
            if is_error(&left) {
                return left;
            }
            let right = eval_expression(&i.right, env);
            if is_error(&right) {
                return right;
            }
            eval_infix_expression(&i.operator, &left, &right)
        }
        Expression::If(i) => eval_if_expression(i, env),
        Expression::Function(f) => Rc::new(Object::Function(Rc::new(crate::object::FunctionObj {
            parameters: f.parameters.clone(),
            body: f.body.clone(),
            env: env.clone(),
        }))),
        Expression::Call(c) => eval_call_expression(c, env),
        Expression::Array(a) => {
            let elements = eval_expressions(&a.elements, env);
            match elements {
                Ok(elems) => crate::object::new_array(elems),
                Err(e) => e,
            }
        }
        Expression::Index(i) => {
            let left = eval_expression(&i.left, env);
            if is_error(&left) {
                return left;
            }
            let index = eval_expression(&i.index, env);
            if is_error(&index) {
                return index;
            }
            eval_index_expression(&left, &index)
        }
        Expression::Hash(h) => eval_hash_literal(h, env),
    }
}

fn is_error(obj: &Rc<Object>) -> bool {
    matches!(obj.as_ref(), Object::Error(_))
}

fn eval_identifier(ident: &Identifier, env: &Environment) -> Rc<Object> {
    if let Some(value) = env.get(&ident.value) {
        return value;
    }
    if let Some(builtin) = builtins::lookup(&ident.value) {
        return builtin;
    }
    new_error(format!("identifier not found: {}", ident.value))
}

fn eval_prefix_expression(operator: &str, right: &Rc<Object>) -> Rc<Object> {
    match operator {
        "!" => native_bool(!right.is_truthy()),
        "-" => match right.as_ref() {
            Object::Integer(v) => Rc::new(Object::Integer(-v)),
            other => new_error(format!("unknown operator: -{}", other.type_name())),
        },
        other => new_error(format!("unknown operator: {other}")),
    }
}

fn eval_infix_expression(operator: &str, left: &Rc<Object>, right: &Rc<Object>) -> Rc<Object> {
    match (left.as_ref(), right.as_ref()) {
        (Object::Integer(l), Object::Integer(r)) => eval_integer_infix(operator, *l, *r),
        (Object::Str(l), Object::Str(r)) => eval_string_infix(operator, l, r),
        (Object::Boolean(l), Object::Boolean(r)) => match operator {
            "==" => native_bool(l == r),
            "!=" => native_bool(l != r),
            other => new_error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                other,
                right.type_name()
            )),
        },
        (l, r) if l.type_name() != r.type_name() => new_error(format!(
            "type mismatch: {} {} {}",
            l.type_name(),
            operator,
            r.type_name()
        )),
        (l, r) => new_error(format!(
            "unknown operator: {} {} {}",
            l.type_name(),
            operator,
            r.type_name()
        )),
    }
}

fn eval_integer_infix(operator: &str, left: i64, right: i64) -> Rc<Object> {
    match operator {
        "+" => Rc::new(Object::Integer(left + right)),
        "-" => Rc::new(Object::Integer(left - right)),
        "*" => Rc::new(Object::Integer(left * right)),
        "/" => Rc::new(Object::Integer(left / right)),
        "<" => native_bool(left < right),
        ">" => native_bool(left > right),
        "==" => native_bool(left == right),
        "!=" => native_bool(left != right),
        other => new_error(format!("unknown operator: INTEGER {other} INTEGER")),
    }
}

fn eval_string_infix(operator: &str, left: &str, right: &str) -> Rc<Object> {
    match operator {
        "+" => Rc::new(Object::Str(format!("{left}{right}"))),
        other => new_error(format!("unknown operator: STRING {other} STRING")),
    }
}

fn eval_if_expression(expr: &IfExpression, env: &Environment) -> Rc<Object> {
    let condition = eval_expression(&expr.condition, env);
    if is_error(&condition) {
        return condition;
    }
    if condition.is_truthy() {
        eval_block_statement(&expr.consequence, env)
    } else if let Some(alt) = &expr.alternative {
        eval_block_statement(alt, env)
    } else {
        null()
    }
}

fn eval_expressions(exprs: &[Expression], env: &Environment) -> Result<Vec<Rc<Object>>, Rc<Object>> {
    let mut result = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let evaluated = eval_expression(expr, env);
        if is_error(&evaluated) {
            return Err(evaluated);
        }
        result.push(evaluated);
    }
    Ok(result)
}

fn eval_call_expression(call: &CallExpression, env: &Environment) -> Rc<Object> {
    let function = eval_expression(&call.function, env);
    if is_error(&function) {
        return function;
    }

    let args = match eval_expressions(&call.arguments, env) {
        Ok(args) => args,
        Err(e) => return e,
    };

    apply_function(&function, &args)
}

fn apply_function(func: &Rc<Object>, args: &[Rc<Object>]) -> Rc<Object> {
    match func.as_ref() {
        Object::Function(f) => {
            let extended_env = extend_function_env(f, args);
            let evaluated = eval_block_statement(&f.body, &extended_env);
            unwrap_return_value(evaluated)
        }
        Object::Builtin(f) => f(args),
        other => new_error(format!("not a function: {}", other.type_name())),
    }
}

fn extend_function_env(func: &crate::object::FunctionObj, args: &[Rc<Object>]) -> Environment {
    let env = Environment::enclosed(&func.env);
    for (param, arg) in func.parameters.iter().zip(args.iter()) {
        env.set(&param.value, arg.clone());
    }
    env
}

fn unwrap_return_value(obj: Rc<Object>) -> Rc<Object> {
    match obj.as_ref() {
        Object::ReturnValue(value) => value.clone(),
        _ => obj,
    }
}

fn eval_index_expression(left: &Rc<Object>, index: &Rc<Object>) -> Rc<Object> {
    match (left.as_ref(), index.as_ref()) {
        (Object::Array(elems), Object::Integer(idx)) => {
            let elems = elems.borrow();
            if *idx < 0 || *idx as usize >= elems.len() {
                null()
            } else {
                elems[*idx as usize].clone()
            }
        }
        (Object::Hash(pairs), _) => match index.hash_key() {
            Ok(key) => pairs
                .borrow()
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or_else(null),
            Err(msg) => new_error(msg),
        },
        (l, _) => new_error(format!("index operator not supported: {}", l.type_name())),
    }
}

fn eval_hash_literal(hash: &HashLiteral, env: &Environment) -> Rc<Object> {
    let mut pairs = std::collections::HashMap::new();

    for (key_expr, value_expr) in &hash.pairs {
        let key = eval_expression(key_expr, env);
        if is_error(&key) {
            return key;
        }

        let hash_key = match key.hash_key() {
            Ok(k) => k,
            Err(msg) => return new_error(msg),
        };

        let value = eval_expression(value_expr, env);
        if is_error(&value) {
            return value;
        }

        pairs.insert(hash_key, crate::object::HashPair { key, value });
    }

    new_hash(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn eval_input(input: &str) -> Rc<Object> {
        let (program, errors) = parse(input);
        assert!(errors.is_empty(), "parser errors: {errors:?}");
        let env = Environment::new();
        eval_program(&program, &env)
    }

    #[test]
    fn integer_expressions() {
        let cases = vec![
            ("5", 5),
            ("10", 10),
            ("-5", -5),
            ("5 + 5 + 5 + 5 - 10", 10),
            ("2 * 2 * 2 * 2 * 2", 32),
            ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
        ];
        for (input, expected) in cases {
            let result = eval_input(input);
            assert!(
                matches!(result.as_ref(), Object::Integer(v) if *v == expected),
                "input {input} produced {result:?}"
            );
        }
    }

    #[test]
    fn boolean_expressions() {
        let cases = vec![
            ("true", true),
            ("1 < 2", true),
            ("1 > 2", false),
            ("1 == 1", true),
            ("true == true", true),
            ("(1 < 2) == true", true),
        ];
        for (input, expected) in cases {
            let result = eval_input(input);
            assert!(
                matches!(result.as_ref(), Object::Boolean(v) if *v == expected),
                "input {input} produced {result:?}"
            );
        }
    }

    #[test]
    fn if_else_expressions() {
        let result = eval_input("if (1 > 2) { 10 } else { 20 }");
        assert!(matches!(result.as_ref(), Object::Integer(20)));

        let result = eval_input("if (false) { 10 }");
        assert!(matches!(result.as_ref(), Object::Null));
    }

    #[test]
    fn return_statements_short_circuit_blocks() {
        let input = "if (10 > 1) { if (10 > 1) { return 10; } return 1; }";
        let result = eval_input(input);
        assert!(matches!(result.as_ref(), Object::Integer(10)));
    }

    #[test]
    fn error_handling_messages() {
        let cases = vec![
            ("5 + true;", "type mismatch: INTEGER + BOOLEAN"),
            ("-true", "unknown operator: -BOOLEAN"),
            ("true + false;", "unknown operator: BOOLEAN + BOOLEAN"),
            (
                "if (10 > 1) { true + false; }",
                "unknown operator: BOOLEAN + BOOLEAN",
            ),
            ("foobar", "identifier not found: foobar"),
            (r#""Hello" - "World""#, "unknown operator: STRING - STRING"),
        ];
        for (input, expected) in cases {
            let result = eval_input(input);
            match result.as_ref() {
                Object::Error(msg) => assert_eq!(msg, expected, "input was {input}"),
                other => panic!("expected error for {input}, got {other:?}"),
            }
        }
    }

    #[test]
    fn let_statement_bindings() {
        let cases = vec![
            ("let a = 5; a;", 5),
            ("let a = 5 * 5; a;", 25),
            ("let a = 5; let b = a; b;", 5),
            ("let a = 5; let b = a; let c = a + b + 5; c;", 15),
        ];
        for (input, expected) in cases {
            let result = eval_input(input);
            assert!(matches!(result.as_ref(), Object::Integer(v) if *v == expected));
        }
    }

    #[test]
    fn function_application_and_closures() {
        let result = eval_input("let identity = fn(x) { x; }; identity(5);");
        assert!(matches!(result.as_ref(), Object::Integer(5)));

        let result = eval_input("let identity = fn(x) { return x; }; identity(5);");
        assert!(matches!(result.as_ref(), Object::Integer(5)));

        let result = eval_input("let double = fn(x) { x * 2; }; double(5);");
        assert!(matches!(result.as_ref(), Object::Integer(10)));

        let result = eval_input("let add = fn(x, y) { x + y; }; add(5, 5);");
        assert!(matches!(result.as_ref(), Object::Integer(10)));

        let result = eval_input(
            "let newAdder = fn(x) { fn(y) { x + y }; }; let addTwo = newAdder(2); addTwo(2);",
        );
        assert!(matches!(result.as_ref(), Object::Integer(4)));
    }

    #[test]
    fn string_concatenation() {
        let result = eval_input(r#""Hello" + " " + "World!""#);
        match result.as_ref() {
            Object::Str(s) => assert_eq!(s, "Hello World!"),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn array_literals_and_indexing() {
        let result = eval_input("[1, 2 * 2, 3 + 3][1]");
        assert!(matches!(result.as_ref(), Object::Integer(4)));

        let result = eval_input("[1, 2, 3][3]");
        assert!(matches!(result.as_ref(), Object::Null));

        let result = eval_input("[1, 2, 3][-1]");
        assert!(matches!(result.as_ref(), Object::Null));
    }

    #[test]
    fn builtin_functions_on_arrays() {
        let result = eval_input("len([1, 2, 3])");
        assert!(matches!(result.as_ref(), Object::Integer(3)));

        let result = eval_input("first(push([1, 2], 3))");
        assert!(matches!(result.as_ref(), Object::Integer(1)));
    }

    #[test]
    fn hash_literal_unusable_key_errors() {
        let result = eval_input(r#"{"name": "Monkey"}[fn(x){x}]"#);
        match result.as_ref() {
            Object::Error(msg) => assert_eq!(msg, "unusable as hash key: FUNCTION"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn hash_literal_lookup() {
        let result = eval_input(r#"{"one": 10 - 9}["one"]"#);
        assert!(matches!(result.as_ref(), Object::Integer(1)));
    }
}
