#![no_main]

use libfuzzer_sys::fuzz_target;
use loxide_compiler::{compile, disasm};
use loxide_core::gc::{Heap, HeapConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    // Diagnostics are expected; panics are bugs. Stress mode shakes out missing roots.
    let mut heap = Heap::with_config(HeapConfig {
        stress: true,
        ..HeapConfig::default()
    });
    if let Ok(script) = compile(source, &mut heap, &()) {
        let _ = disasm::disassemble(&heap, script);
    }
});
