//! Built-in functions callable from evaluated source.

use std::rc::Rc;

use crate::object::{new_array, new_error, null, Object};

pub fn lookup(name: &str) -> Option<Rc<Object>> {
    let f: crate::object::BuiltinFn = match name {
        "len" => builtin_len,
        "first" => builtin_first,
        "last" => builtin_last,
        "rest" => builtin_rest,
        "push" => builtin_push,
        "puts" => builtin_puts,
        _ => return None,
    };
    Some(Rc::new(Object::Builtin(f)))
}

fn wrong_arg_count(want: usize, got: usize) -> Rc<Object> {
    new_error(format!(
        "wrong number of arguments. want={want}, got ={got}"
    ))
}

fn builtin_len(args: &[Rc<Object>]) -> Rc<Object> {
    if args.len() != 1 {
        return wrong_arg_count(1, args.len());
    }
    match args[0].as_ref() {
        Object::Str(s) => Rc::new(Object::Integer(s.len() as i64)),
        Object::Array(elems) => Rc::new(Object::Integer(elems.borrow().len() as i64)),
        other => new_error(format!(
            "argument to `len` not supported, got ={}",
            other.type_name()
        )),
    }
}

fn builtin_first(args: &[Rc<Object>]) -> Rc<Object> {
    if args.len() != 1 {
        return wrong_arg_count(1, args.len());
    }
    match args[0].as_ref() {
        Object::Array(elems) => elems.borrow().first().cloned().unwrap_or_else(null),
        other => new_error(format!(
            "argument to `first` must be ARRAY, got ={}",
            other.type_name()
        )),
    }
}

fn builtin_last(args: &[Rc<Object>]) -> Rc<Object> {
    if args.len() != 1 {
        return wrong_arg_count(1, args.len());
    }
    match args[0].as_ref() {
        Object::Array(elems) => elems.borrow().last().cloned().unwrap_or_else(null),
        other => new_error(format!(
            "argument to `last` must be ARRAY, got ={}",
            other.type_name()
        )),
    }
}

fn builtin_rest(args: &[Rc<Object>]) -> Rc<Object> {
    if args.len() != 1 {
        return wrong_arg_count(1, args.len());
    }
    match args[0].as_ref() {
        Object::Array(elems) => {
            let elems = elems.borrow();
            if elems.is_empty() {
                null()
            } else {
                new_array(elems[1..].to_vec())
            }
        }
        other => new_error(format!(
            "argument to `rest` must be ARRAY, got ={}",
            other.type_name()
        )),
    }
}

fn builtin_push(args: &[Rc<Object>]) -> Rc<Object> {
    if args.len() != 2 {
        return wrong_arg_count(2, args.len());
    }
    match args[0].as_ref() {
        Object::Array(elems) => {
            let mut new_elems = elems.borrow().clone();
            new_elems.push(args[1].clone());
            new_array(new_elems)
        }
        other => new_error(format!(
            "first argument to `push` must be ARRAY, got ={}",
            other.type_name()
        )),
    }
}

fn builtin_puts(args: &[Rc<Object>]) -> Rc<Object> {
    for arg in args {
        println!("{}", arg.inspect());
    }
    null()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Rc<Object>>) -> Rc<Object> {
        match lookup(name).unwrap().as_ref() {
            Object::Builtin(f) => f(&args),
            _ => unreachable!(),
        }
    }

    #[test]
    fn len_supports_strings_and_arrays() {
        assert!(matches!(
            call("len", vec![Rc::new(Object::Str("hello".into()))]).as_ref(),
            Object::Integer(5)
        ));
        assert!(matches!(
            call("len", vec![new_array(vec![Rc::new(Object::Integer(1))])]).as_ref(),
            Object::Integer(1)
        ));
    }

    #[test]
    fn len_rejects_wrong_arg_count() {
        let result = call("len", vec![]);
        match result.as_ref() {
            Object::Error(msg) => assert_eq!(msg, "wrong number of arguments. want=1, got =0"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn len_rejects_unsupported_type() {
        let result = call("len", vec![Rc::new(Object::Integer(1))]);
        match result.as_ref() {
            Object::Error(msg) => assert_eq!(msg, "argument to `len` not supported, got =INTEGER"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn push_returns_new_array_with_appended_element() {
        let arr = new_array(vec![Rc::new(Object::Integer(1))]);
        let result = call("push", vec![arr, Rc::new(Object::Integer(2))]);
        match result.as_ref() {
            Object::Array(elems) => assert_eq!(elems.borrow().len(), 2),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn rest_on_empty_array_is_null() {
        let arr = new_array(Vec::new());
        let result = call("rest", vec![arr]);
        assert!(matches!(result.as_ref(), Object::Null));
    }
}
