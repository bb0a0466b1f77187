use super::helpers::*;
use loxide_core::opcode::OpCode;
use loxide_core::value::Value;

#[test]
fn e2e_arithmetic_precedence() {
    assert_eq!(run("print 1 + 2 * 3;"), vec!["7"]);
    assert_eq!(run("print (1 + 2) * 3;"), vec!["9"]);
    assert_eq!(run("print 10 - 4 - 3;"), vec!["3"]);
    assert_eq!(run("print 8 / 4 / 2;"), vec!["1"]);
    assert_eq!(run("print -2 * 3;"), vec!["-6"]);
    assert_eq!(run("print 7 / 2;"), vec!["3.5"]);
}

#[test]
fn e2e_comparisons() {
    assert_eq!(
        run("print 1 < 2; print 2 <= 2; print 3 > 4; print 3 >= 4; print 1 == 1; print 1 != 1;"),
        vec!["true", "true", "false", "false", "true", "false"]
    );
}

#[test]
fn e2e_comparison_lowering() {
    let (heap, f) = compile_str("1 >= 2; 1 <= 2; 1 != 2;");
    let ops = opcodes(&heap, &heap.function(f).chunk);
    use OpCode::*;
    assert_eq!(
        ops,
        vec![
            Constant, Constant, Less, Not, Pop, Constant, Constant, Greater, Not, Pop, Constant,
            Constant, Equal, Not, Pop, Nil, Return
        ]
    );
}

#[test]
fn e2e_not_and_equality() {
    assert_eq!(run("print !nil; print !0; print !!true;"), vec!["true", "false", "true"]);
    assert_eq!(run("print nil == false;"), vec!["false"]);
}

#[test]
fn e2e_and_short_circuits() {
    assert_eq!(run("print false and 1; print 1 and 2; print nil and x;"), vec!["false", "2", "nil"]);
}

#[test]
fn e2e_or_short_circuits() {
    assert_eq!(run("print 1 or x; print false or 2; print nil or false;"), vec!["1", "2", "false"]);
}

#[test]
fn e2e_and_binds_tighter_than_or() {
    assert_eq!(run("print false and 1 or 2;"), vec!["2"]);
    assert_eq!(run("print 1 or 2 and false;"), vec!["1"]);
}

#[test]
fn e2e_string_literal() {
    let (heap, f) = compile_str("print \"hello world\";");
    let chunk = &heap.function(f).chunk;
    assert_eq!(get_string_constant(&heap, chunk, 0), "hello world");
    assert_eq!(run("print \"hi\";"), vec!["hi"]);
}

#[test]
fn e2e_equal_strings_share_handle() {
    let (heap, f) = compile_str("\"same\"; \"same\";");
    let constants = &heap.function(f).chunk.constants;
    assert_eq!(constants.len(), 2);
    assert_eq!(constants[0], constants[1]);
}

#[test]
fn e2e_assignment_is_right_associative() {
    assert_eq!(run("var a; var b; a = b = 3; print a; print b;"), vec!["3", "3"]);
}

#[test]
fn e2e_property_access() {
    let (heap, f) = compile_str("obj.field; obj.field = 1; obj.a.b = 2;");
    let chunk = &heap.function(f).chunk;
    assert_eq!(count_opcode(&heap, chunk, OpCode::GetProperty), 2);
    assert_eq!(count_opcode(&heap, chunk, OpCode::SetProperty), 2);
}

#[test]
fn e2e_call_with_arguments() {
    let (heap, f) = compile_str("f(1)(2, 3);");
    let chunk = &heap.function(f).chunk;
    let calls: Vec<u8> = instructions(&heap, chunk)
        .into_iter()
        .filter(|&(_, op)| op == OpCode::Call)
        .map(|(offset, _)| chunk.code[offset + 1])
        .collect();
    assert_eq!(calls, vec![1, 2]);
}

#[test]
fn e2e_255_arguments_allowed() {
    let args: Vec<String> = (0..255).map(|i| i.to_string()).collect();
    let source = format!("f({});", args.join(", "));
    let (heap, f) = compile_str(&source);
    let chunk = &heap.function(f).chunk;
    let at = find_opcode(&heap, chunk, OpCode::Call).unwrap();
    assert_eq!(chunk.code[at + 1], 255);
}

#[test]
fn e2e_wide_constants_after_256() {
    let source: String = (0..300).map(|i| format!("print {i};")).collect();
    let (heap, f) = compile_str(&source);
    let chunk = &heap.function(f).chunk;
    assert_eq!(count_opcode(&heap, chunk, OpCode::Constant), 256);
    assert_eq!(count_opcode(&heap, chunk, OpCode::ConstantLong), 44);
    assert_eq!(chunk.constants[299], Value::Number(299.0));

    let printed = run(&source);
    assert_eq!(printed.len(), 300);
    assert_eq!(printed[256], "256");
    assert_eq!(printed[299], "299");
}
