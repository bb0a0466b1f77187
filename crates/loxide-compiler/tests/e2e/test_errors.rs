use super::helpers::*;

#[test]
fn e2e_error_unexpected_character() {
    assert_eq!(compile_str_err("print 1 @ 2;"), vec!["[line 1] Error: Unexpected character."]);
}

#[test]
fn e2e_error_unterminated_string_reports_last_line() {
    assert_eq!(
        compile_str_err("var s = \"abc\ndef"),
        vec!["[line 2] Error: Unterminated string."]
    );
}

#[test]
fn e2e_error_unclosed_block() {
    assert_eq!(
        compile_str_err("{ var a = 1;"),
        vec!["[line 1] Error at end: Expect '}' after block."]
    );
}

#[test]
fn e2e_error_unclosed_grouping() {
    assert_eq!(
        compile_str_err("print (1 + 2;"),
        vec!["[line 1] Error at ';': Expect ')' after expression."]
    );
}

#[test]
fn e2e_error_recovery_across_lines() {
    assert_eq!(
        compile_str_err("print 1\nvar x = ;\nprint x;"),
        vec![
            "[line 2] Error at 'var': Expect ';' after value.",
            "[line 2] Error at ';': Expect expression.",
        ]
    );
}

#[test]
fn e2e_error_missing_condition_parens() {
    assert_eq!(
        compile_str_err("if true print 1;"),
        vec!["[line 1] Error at 'true': Expect '(' after 'if'."]
    );
    assert_eq!(
        compile_str_err("while (true print 1;"),
        vec!["[line 1] Error at 'print': Expect ')' after condition."]
    );
}

#[test]
fn e2e_error_too_many_locals() {
    let decls: String = (0..256).map(|i| format!("var v{i};")).collect();
    assert_eq!(
        compile_str_err(&format!("{{ {decls} }}")),
        vec!["[line 1] Error at 'v255': Too many local variables in function."]
    );
}

#[test]
fn e2e_error_too_many_upvalues() {
    let outer: String = (0..200).map(|i| format!("var a{i};")).collect();
    let middle: String = (0..100).map(|i| format!("var b{i};")).collect();
    let uses: String = (0..200)
        .map(|i| format!("a{i};"))
        .chain((0..100).map(|i| format!("b{i};")))
        .collect();
    let src = format!("fun outer() {{ {outer} fun middle() {{ {middle} fun inner() {{ {uses} }} }} }}");
    let errors = compile_str_err(&src);
    assert_eq!(errors[0], "[line 1] Error at 'b56': Too many closure variables in function.");
    assert!(errors.iter().all(|e| e.ends_with("Too many closure variables in function.")));
}

#[test]
fn e2e_error_too_many_global_names() {
    let uses: String = (0..257).map(|i| format!("g{i};")).collect();
    assert_eq!(
        compile_str_err(&uses),
        vec!["[line 1] Error at 'g256': Too many constants in one chunk."]
    );
}

#[test]
fn e2e_error_too_many_arguments() {
    let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
    assert_eq!(
        compile_str_err(&format!("f({});", args.join(", "))),
        vec!["[line 1] Error at '255': Can't have more than 255 arguments."]
    );
}

#[test]
fn e2e_error_class_syntax() {
    assert_eq!(compile_str_err("class {}"), vec!["[line 1] Error at '{': Expect class name."]);
    assert_eq!(
        compile_str_err("class A { x }"),
        vec!["[line 1] Error at 'x': Expect '}' after class body."]
    );
}

#[test]
fn e2e_error_del_syntax() {
    assert_eq!(
        compile_str_err("del 1;"),
        vec!["[line 1] Error at '1': Expect variable name after 'del'."]
    );
    assert_eq!(
        compile_str_err("del a;"),
        vec!["[line 1] Error at ';': Expect '.' after variable name."]
    );
    assert_eq!(
        compile_str_err("del a.;"),
        vec!["[line 1] Error at ';': Expect property name after '.'."]
    );
    assert_eq!(
        compile_str_err("del a.b"),
        vec!["[line 1] Error at end: Expect ';' after property."]
    );
}

#[test]
fn e2e_error_function_syntax() {
    assert_eq!(
        compile_str_err("fun f { }"),
        vec!["[line 1] Error at '{': Expect '(' after function name."]
    );
    assert_eq!(
        compile_str_err("fun f(a b) {}")[0],
        "[line 1] Error at 'b': Expect ')' after parameters."
    );
    assert_eq!(
        compile_str_err("fun f(a, a) {}"),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
}
