use super::helpers::*;
use loxide_core::opcode::OpCode;

#[test]
fn e2e_function_no_params() {
    let (heap, f) = compile_str("fun f() {}");
    assert!(has_opcode(&heap, &heap.function(f).chunk, OpCode::Closure));
    let func = find_function(&heap, f, "f");
    assert_eq!(func.arity, 0);
    assert_eq!(opcodes(&heap, &func.chunk), vec![OpCode::Nil, OpCode::Return]);
}

#[test]
fn e2e_function_params_are_slots() {
    let (heap, f) = compile_str("fun f(a, b, c) { return c; }");
    let func = find_function(&heap, f, "f");
    assert_eq!(func.arity, 3);
    assert_eq!(&func.chunk.code[..2], &[OpCode::GetLocal as u8, 3]);
}

#[test]
fn e2e_bare_return() {
    let (heap, f) = compile_str("fun f() { return; }");
    let func = find_function(&heap, f, "f");
    use OpCode::*;
    assert_eq!(opcodes(&heap, &func.chunk), vec![Nil, Return, Nil, Return]);
}

#[test]
fn e2e_globals_are_not_captured() {
    let (heap, f) = compile_str("var x = 1; fun f() { return x; }");
    let func = find_function(&heap, f, "f");
    assert_eq!(func.upvalue_count, 0);
    assert!(has_opcode(&heap, &func.chunk, OpCode::GetGlobal));
    assert!(!has_opcode(&heap, &func.chunk, OpCode::GetUpvalue));
}

#[test]
fn e2e_closure_captures_parameter() {
    let (heap, f) = compile_str("fun make(n) { fun get() { return n; } return get; }");
    let make = find_function(&heap, f, "make");
    let at = find_opcode(&heap, &make.chunk, OpCode::Closure).unwrap();
    assert_eq!(closure_captures(&heap, &make.chunk, at), vec![(true, 1)]);
}

#[test]
fn e2e_upvalues_deduplicated() {
    let (heap, f) = compile_str("fun outer() { var a; var b; fun inner() { a; b; a; } }");
    let inner = find_function(&heap, f, "inner");
    assert_eq!(inner.upvalue_count, 2);
    assert_eq!(count_opcode(&heap, &inner.chunk, OpCode::GetUpvalue), 3);

    let outer = find_function(&heap, f, "outer");
    let at = find_opcode(&heap, &outer.chunk, OpCode::Closure).unwrap();
    assert_eq!(closure_captures(&heap, &outer.chunk, at), vec![(true, 1), (true, 2)]);
}

#[test]
fn e2e_assign_upvalue() {
    let (heap, f) = compile_str("fun outer() { var a; fun inner() { a = 1; } }");
    let inner = find_function(&heap, f, "inner");
    let at = find_opcode(&heap, &inner.chunk, OpCode::SetUpvalue).unwrap();
    assert_eq!(inner.chunk.code[at + 1], 0);
}

#[test]
fn e2e_block_exit_closes_captured_local() {
    let (heap, f) = compile_str("fun outer() { { var a; fun g() { return a; } } }");
    let outer = find_function(&heap, f, "outer");
    use OpCode::*;
    assert_eq!(
        opcodes(&heap, &outer.chunk),
        vec![Nil, Closure, Pop, CloseUpvalue, Nil, Return]
    );
}

#[test]
fn e2e_recursive_global_function() {
    let (heap, f) =
        compile_str("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }");
    let fib = find_function(&heap, f, "fib");
    assert_eq!(fib.upvalue_count, 0);
    assert_eq!(count_opcode(&heap, &fib.chunk, OpCode::GetGlobal), 2);
    assert_eq!(count_opcode(&heap, &fib.chunk, OpCode::Call), 2);
    assert_eq!(count_opcode(&heap, &fib.chunk, OpCode::Return), 3);
}

#[test]
fn e2e_local_function_called_by_slot() {
    let (heap, f) = compile_str("{ fun f() {} f(); }");
    let chunk = &heap.function(f).chunk;
    use OpCode::*;
    assert_eq!(opcodes(&heap, chunk), vec![Closure, GetLocal, Call, Pop, Pop, Nil, Return]);
}

#[test]
fn e2e_function_lines() {
    let (heap, f) = compile_str("fun f() {\n  print 1;\n}");
    let func = find_function(&heap, f, "f");
    assert_eq!(func.chunk.line_at(0), Some(2));
    assert_eq!(func.chunk.line_at(func.chunk.len() - 1), Some(3));
}

#[test]
fn e2e_function_name_interned_once() {
    let (heap, f) = compile_str("fun f() {} f();");
    let script = &heap.function(f).chunk;
    let func = find_function(&heap, f, "f");
    let by_name = |i: usize| script.constants[i].as_str();
    // Constants: "f" (define), <fn f>, "f" (call).
    assert_eq!(by_name(0), func.name);
    assert_eq!(by_name(2), func.name);
}
