// ABOUTME: End-to-end scenarios driving the full lexer -> parser -> resolver -> interpreter pipeline

use lox_interpreter::driver::Lox;

fn run(source: &str) -> Lox {
    let mut lox = Lox::new();
    lox.run_source(source, false);
    lox
}

#[test]
fn closures_capture_their_defining_environment() {
    let lox = run(
        r#"
        fn make_counter() {
            let count = 0;
            fn increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }
        let counter = make_counter();
        let a = counter();
        let b = counter();
        let c = counter();
        if (a != 1 or b != 2 or c != 3) {
            undefined_to_force_an_error();
        }
        "#,
    );
    assert!(!lox.had_error());
    assert!(!lox.had_runtime_error());
}

#[test]
fn single_inheritance_dispatches_through_super() {
    let lox = run(
        r#"
        class Animal {
            speak() {
                return "...";
            }
        }
        class Dog < Animal {
            speak() {
                return "Woof, " + super.speak();
            }
        }
        let d = Dog();
        if (d.speak() != "Woof, ...") {
            undefined_to_force_an_error();
        }
        "#,
    );
    assert!(!lox.had_error());
    assert!(!lox.had_runtime_error());
}

#[test]
fn ternary_and_logical_short_circuit_compose() {
    let lox = run(
        r#"
        let x = 5;
        let label = x > 0 ? "positive" : "non-positive";
        if (label != "positive") {
            undefined_to_force_an_error();
        }
        let hit = false;
        fn mark() {
            hit = true;
            return true;
        }
        false and mark();
        if (hit) {
            undefined_to_force_an_error();
        }
        "#,
    );
    assert!(!lox.had_error());
    assert!(!lox.had_runtime_error());
}

#[test]
fn break_escaping_a_function_is_a_runtime_error_but_program_continues() {
    let mut lox = Lox::new();
    lox.run_source(
        r#"
        fn bad() {
            break;
        }
        bad();
        "#,
        false,
    );
    assert!(!lox.had_error());
    assert!(lox.had_runtime_error());

    lox.run_source("let ok = 1;", false);
}

#[test]
fn initializer_always_returns_this_even_with_an_explicit_return() {
    let lox = run(
        r#"
        class Box {
            init(value) {
                this.value = value;
                return;
            }
        }
        let b = Box(7);
        if (b.value != 7) {
            undefined_to_force_an_error();
        }
        "#,
    );
    assert!(!lox.had_error());
    assert!(!lox.had_runtime_error());
}

#[test]
fn unused_local_is_a_warning_not_an_error() {
    let lox = run(
        r#"
        fn f() {
            let unused = 1;
            return 2;
        }
        f();
        "#,
    );
    assert!(!lox.had_error());
    assert!(!lox.had_runtime_error());
}

#[test]
fn undefined_variable_reference_is_a_runtime_error() {
    let lox = run("ghost;");
    assert!(!lox.had_error());
    assert!(lox.had_runtime_error());
}

#[test]
fn parse_error_sets_had_error_without_running_the_interpreter() {
    let lox = run("let x = ;");
    assert!(lox.had_error());
    assert!(!lox.had_runtime_error());
}

#[test]
fn duplicate_declaration_in_the_same_scope_is_a_static_error() {
    let lox = run(
        r#"
        fn f() {
            let x = 1;
            let x = 2;
            return x;
        }
        "#,
    );
    assert!(lox.had_error());
}

#[test]
fn for_loop_desugars_and_respects_break() {
    let lox = run(
        r#"
        let total = 0;
        for (let i = 0; i < 10; i = i + 1) {
            if (i == 3) break;
            total = total + i;
        }
        if (total != 3) {
            undefined_to_force_an_error();
        }
        "#,
    );
    assert!(!lox.had_error());
    assert!(!lox.had_runtime_error());
}

#[test]
fn anonymous_function_expression_is_callable_immediately() {
    let lox = run(
        r#"
        let square = fn (n) { return n * n; };
        if (square(4) != 16) {
            undefined_to_force_an_error();
        }
        "#,
    );
    assert!(!lox.had_error());
    assert!(!lox.had_runtime_error());
}
