#![no_main]

use libfuzzer_sys::fuzz_target;
use loxide_compiler::scanner::Scanner;
use loxide_compiler::token::TokenKind;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let mut scanner = Scanner::new(source);
    let mut last_line = 1;
    loop {
        let token = scanner.scan_token();
        assert!(token.line >= last_line, "line numbers went backwards");
        last_line = token.line;
        if token.kind == TokenKind::Eof {
            break;
        }
    }
});
