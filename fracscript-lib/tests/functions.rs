mod common;

use common::{eval, output, runtime_error, vm_for};
use fracscript_lib::core::Value;
use fracscript_lib::vm::{RuntimeError, VmOptions};

#[test]
fn recursion_uses_independent_frames() {
    let src = "
        def fact(n) { return if (n < 2) { 1 } else { n * fact(n - 1) }; }
        fact(20)
    ";
    assert_eq!(eval(src).to_string(), "2432902008176640000");
}

#[test]
fn locals_do_not_leak_between_calls() {
    let src = "
        def sum_to(n) {
            var total = 0
            for (i = 1; i <= n; i = i + 1) { total = total + i }
            return total
        }
        [sum_to(3), sum_to(4)]
    ";
    assert_eq!(eval(src), Value::list([Value::int(6), Value::int(10)]));
}

#[test]
fn parameters_survive_nested_calls() {
    let src = "
        def double(x) { return x * 2; }
        def f(x) { var d = double(x + 1); return x + d; }
        f(5)
    ";
    assert_eq!(eval(src), Value::int(17));
}

#[test]
fn mutual_recursion_through_globals() {
    let src = "
        def even(n) { return if (n == 0) { true } else { odd(n - 1) }; }
        def odd(n) { return if (n == 0) { false } else { even(n - 1) }; }
        [even(10), odd(7)]
    ";
    // odd is declared after even, so even can't see it
    assert!(common::compile(src).is_err());

    let src = "
        def is_even(n) { return n % 2 == 0; }
        def check(n) { return is_even(n) and n > 2; }
        check(4)
    ";
    assert_eq!(eval(src), Value::Bool(true));
}

#[test]
fn functions_modify_globals() {
    let src = r#"
        var log = []
        def note(s) { log.append(s); return log.length; }
        note("a")
        note("b")
        log
    "#;
    assert_eq!(eval(src), Value::list([Value::str("a"), Value::str("b")]));
}

#[test]
fn functions_are_values() {
    assert_eq!(output("def f() { return 1; } print(f())"), "1\n");
    assert!(matches!(eval("def f(a) { return a; }"), Value::Function(f) if f.arity == 1));
    assert_eq!(eval("def f() { }  f()"), Value::Unit);
}

#[test]
fn calling_with_the_wrong_arity_fails() {
    assert_eq!(
        runtime_error("def f(a) { return a; } f(1, 2)"),
        RuntimeError::ArityMismatch {
            expected: 1,
            found: 2
        }
    );
}

#[test]
fn calling_a_number_fails() {
    assert_eq!(
        runtime_error("var x = 1; x()"),
        RuntimeError::NotCallable { found: "num" }
    );
}

#[test]
fn unbounded_recursion_is_stopped() {
    let src = "def down(n) { return down(n + 1); } down(0)";
    let (mut vm, _) = vm_for(src, VmOptions { max_call_depth: 100 }).unwrap();
    assert_eq!(
        vm.execute(),
        Err(RuntimeError::CallDepthExceeded { max: 100 })
    );
}

#[test]
fn nested_functions_recurse_by_name() {
    let src = "
        def outer(n) {
            def count(k) { return if (k == 0) { 0 } else { 1 + count(k - 1) }; }
            return count(n);
        }
        outer(3)
    ";
    assert_eq!(eval(src), Value::int(3));
}
