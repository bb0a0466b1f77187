use super::helpers::*;
use loxide_core::opcode::OpCode;

#[test]
fn e2e_max_of_three() {
    let src = r#"
var a = 3;
var b = 9;
var c = 4;
var max = a;
if (b > max) max = b;
if (c > max) max = c;
print max;
"#;
    assert_eq!(run(src), vec!["9"]);
}

#[test]
fn e2e_sum_loop() {
    let src = r#"
var sum = 0;
var i = 0;
while (i < 100) {
  i = i + 1;
  sum = sum + i;
}
print sum;
"#;
    assert_eq!(run(src), vec!["5050"]);
}

#[test]
fn e2e_iterative_fibonacci() {
    let src = r#"
var a = 0;
var b = 1;
for (var n = 0; n < 10; n = n + 1) {
  print a;
  var next = a + b;
  a = b;
  b = next;
}
"#;
    assert_eq!(
        run(src),
        vec!["0", "1", "1", "2", "3", "5", "8", "13", "21", "34"]
    );
}

#[test]
fn e2e_nested_blocks_and_logic() {
    let src = r#"
var result = "none";
{
  var x = 10;
  {
    var y = 20;
    if (x < y and !(x == y)) result = "ordered";
    else result = "unordered";
  }
}
print result;
print nil or "default";
"#;
    assert_eq!(run(src), vec!["ordered", "default"]);
}

#[test]
fn e2e_string_equality() {
    let src = r#"
var greeting = "hello";
print greeting == "hello";
print greeting != "world";
"#;
    // Interned strings compare by handle.
    assert_eq!(run(src), vec!["true", "true"]);
}

#[test]
fn e2e_number_formatting() {
    assert_eq!(
        run("print 1 / 2; print 10 / 2; print -0.25; print 1000000;"),
        vec!["0.5", "5", "-0.25", "1000000"]
    );
}

#[test]
fn e2e_counter_closure_program() {
    let src = r#"
fun makeCounter() {
  var count = 0;
  fun increment() {
    count = count + 1;
    return count;
  }
  return increment;
}

var counter = makeCounter();
print counter();
print counter();
"#;
    let (heap, f) = compile_str(src);
    let script = &heap.function(f).chunk;
    assert_eq!(count_opcode(&heap, script, OpCode::Call), 3);
    assert_eq!(count_opcode(&heap, script, OpCode::Print), 2);

    let increment = find_function(&heap, f, "increment");
    assert_eq!(increment.upvalue_count, 1);
    assert_eq!(count_opcode(&heap, &increment.chunk, OpCode::GetUpvalue), 2);
    assert_eq!(count_opcode(&heap, &increment.chunk, OpCode::SetUpvalue), 1);

    let make = find_function(&heap, f, "makeCounter");
    let at = find_opcode(&heap, &make.chunk, OpCode::Closure).unwrap();
    assert_eq!(closure_captures(&heap, &make.chunk, at), vec![(true, 1)]);
}

#[test]
fn e2e_class_and_properties_program() {
    let src = r#"
class Point {}
var p = Point();
p.x = 1;
p.y = p.x + 2;
print p.y;
del p.x;
"#;
    let (heap, f) = compile_str(src);
    let chunk = &heap.function(f).chunk;
    assert_eq!(count_opcode(&heap, chunk, OpCode::Class), 1);
    assert_eq!(count_opcode(&heap, chunk, OpCode::SetProperty), 2);
    assert_eq!(count_opcode(&heap, chunk, OpCode::GetProperty), 2);
    assert_eq!(count_opcode(&heap, chunk, OpCode::DelProperty), 1);
}

#[test]
fn e2e_comments_and_whitespace() {
    let src = "// leading comment\nprint 1; // trailing\n\n\t print 2;\n// eof comment";
    assert_eq!(run(src), vec!["1", "2"]);
    let (heap, f) = compile_str(src);
    let chunk = &heap.function(f).chunk;
    assert_eq!(chunk.line_at(0), Some(2));
    assert_eq!(chunk.line_at(3), Some(4));
}

#[test]
fn e2e_multiline_string_literal() {
    let src = "var s = \"one\ntwo\";\nprint s;";
    assert_eq!(run(src), vec!["one\ntwo"]);
    let (heap, f) = compile_str(src);
    let chunk = &heap.function(f).chunk;
    let print = find_opcode(&heap, chunk, OpCode::Print).unwrap();
    assert_eq!(chunk.line_at(print), Some(3));
}
