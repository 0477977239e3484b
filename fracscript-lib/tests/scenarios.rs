mod common;

use common::{eval, runtime_error};
use fracscript_lib::core::Value;
use fracscript_lib::vm::RuntimeError;

#[test]
fn precedence_of_arithmetic() {
    assert_eq!(eval("1 + 2 * 3"), Value::int(7));
}

#[test]
fn strings_concatenate() {
    assert_eq!(eval(r#""Hello" + "World""#), Value::str("HelloWorld"));
    assert_eq!(eval(r#""Hello" ++ "World""#), Value::str("HelloWorld"));
}

#[test]
fn while_runs_the_body_exactly_five_times() {
    let src = "
        var i = 0
        var runs = 0
        while (i < 5) { i = i + 1; runs = runs + 1; }
        [i, runs]
    ";
    assert_eq!(eval(src), Value::list([Value::int(5), Value::int(5)]));
}

#[test]
fn head_and_tail_of_lists() {
    assert_eq!(eval("[1, 2, 3].head"), Value::int(1));
    assert_eq!(eval("[1, 2, 3].tail"), Value::list([Value::int(2), Value::int(3)]));
    assert_eq!(
        runtime_error("[].head"),
        RuntimeError::EmptyCollection { op: "HEAD" }
    );
}

#[test]
fn deleting_the_only_key_leaves_no_keys() {
    let src = r#"var d = {"a": 1}; d.delete("a"); d.keys"#;
    assert_eq!(eval(src), Value::list([]));
}

#[test]
fn functions_can_be_called_repeatedly() {
    let src = "def f(a, b) { return a + b; } [f(2, 3), f(10, 20)]";
    assert_eq!(eval(src), Value::list([Value::int(5), Value::int(30)]));
}
