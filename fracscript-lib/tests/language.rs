mod common;

use common::{eval, output};
use fracscript_lib::core::Value;

#[test]
fn rationals_stay_exact() {
    assert_eq!(eval("1/3 + 1/3 + 1/3"), Value::int(1));
    assert_eq!(eval("0.1 + 0.2"), Value::ratio(3, 10));
    assert_eq!(eval("(2/3) ^ 2"), Value::ratio(4, 9));
    assert_eq!(output("print(1/3, 10/4)"), "1/3 5/2\n");
}

#[test]
fn and_or_short_circuit() {
    assert_eq!(eval("false and 1 / 0 == 0"), Value::Bool(false));
    assert_eq!(eval("true or 1 / 0 == 0"), Value::Bool(true));
    assert_eq!(eval("true and 1 < 2"), Value::Bool(true));
    // the right side only prints when it is evaluated
    assert_eq!(output(r#"false or print("right") == "right""#), "right\n");
    assert_eq!(output(r#"true or print("right") == "right""#), "");
}

#[test]
fn if_is_an_expression() {
    assert_eq!(eval("if (1 > 2) { 1 } else { 2 }"), Value::int(2));
    assert_eq!(eval("if (false) { 1 }"), Value::Unit);
    assert_eq!(
        eval(r#"var x = 0; if (x > 0) { "pos" } else if (x < 0) { "neg" } else { "zero" }"#),
        Value::str("zero")
    );
}

#[test]
fn for_loops_count() {
    let src = "
        var acc = []
        for (i = 0; i < 4; i = i + 1) { acc.append(i * i) }
        acc
    ";
    assert_eq!(
        eval(src),
        Value::list([Value::int(0), Value::int(1), Value::int(4), Value::int(9)])
    );
}

#[test]
fn loop_variables_can_be_reused_after_the_loop() {
    let src = "
        for (i = 0; i < 2; i = i + 1) { }
        for (i = 10; i < 12; i = i + 1) { }
        var i = 7
        i
    ";
    assert_eq!(eval(src), Value::int(7));
}

#[test]
fn shadowed_variables_have_separate_storage() {
    let src = "
        var x = 1
        { var x = 2; x = x + 1 }
        x
    ";
    assert_eq!(eval(src), Value::int(1));
}

#[test]
fn assignment_is_an_expression() {
    assert_eq!(eval("var x = 1; x = 5"), Value::int(5));
}

#[test]
fn print_joins_its_arguments() {
    assert_eq!(output(r#"print(1, "two", [3], {"k": "v"}, true)"#), "1 two [3] {\"k\": \"v\"} true\n");
    assert_eq!(eval(r#"print("a", 1)"#), Value::str("a 1"));
    assert_eq!(output("print()"), "\n");
}

#[test]
fn string_slices() {
    assert_eq!(eval(r#""Hello"[1:3]"#), Value::str("el"));
    assert_eq!(eval(r#""Hello"[0:5:2]"#), Value::str("Hlo"));
    assert_eq!(eval(r#""Hello"[4:-6:-1]"#), Value::str("olleH"));
    assert_eq!(eval(r#""Hello"[1]"#), Value::str("e"));
}

#[test]
fn collections_are_updated_in_place_through_variables() {
    let src = r#"
        var m = {"a": [1]}
        m["a"][0] = 2
        m["b"] = [0; 2]
        m.items
    "#;
    assert_eq!(
        eval(src),
        Value::list([
            Value::list([Value::str("a"), Value::list([Value::int(2)])]),
            Value::list([Value::str("b"), Value::list([Value::int(0), Value::int(0)])]),
        ])
    );
}

#[test]
fn collection_literals_keep_their_elements() {
    assert_eq!(eval("[1, [2, 3]].length"), Value::int(2));
    assert_eq!(eval(r#"{"x": 1, "x": 2}.values"#), Value::list([Value::int(2)]));
    assert_eq!(eval("[1, 2].cons(0).append(3)").to_string(), "[0, 1, 2, 3]");
}

#[test]
fn let_binds_for_its_body_only() {
    assert_eq!(eval("let x = 3 in x * x"), Value::int(9));
}

#[test]
fn empty_program_returns_unit() {
    assert_eq!(eval(""), Value::Unit);
    assert_eq!(eval("# nothing but a comment"), Value::Unit);
}
