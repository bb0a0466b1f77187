use std::io::Read;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use loxide_compiler::{compile, disasm};
use loxide_core::gc::{Heap, HeapConfig};

/// Data error: the source failed to compile.
const EXIT_COMPILE_ERROR: i32 = 65;
/// The source could not be read.
const EXIT_IO_ERROR: i32 = 74;

#[derive(Parser)]
#[command(name = "loxide", version, about = "Compile Lox source to bytecode")]
struct Cli {
    /// Script to compile (`-` or omitted reads stdin)
    file: Option<String>,

    /// Compile a source string instead of a file
    #[arg(short, long, conflicts_with = "file")]
    eval: Option<String>,

    /// Print the bytecode listing after a successful compile
    #[arg(short, long)]
    disassemble: bool,

    /// Collect garbage before every allocation
    #[arg(long)]
    stress_gc: bool,

    /// Live object count that triggers the first collection
    #[arg(long, value_name = "N")]
    gc_threshold: Option<usize>,
}

impl Cli {
    fn heap_config(&self) -> HeapConfig {
        let defaults = HeapConfig::default();
        HeapConfig {
            stress: self.stress_gc,
            initial_threshold: self.gc_threshold.unwrap_or(defaults.initial_threshold),
            ..defaults
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (name, source) = match read_source(&cli) {
        Ok(input) => input,
        Err((name, e)) => {
            eprintln!("loxide: cannot read {name}: {e}");
            process::exit(EXIT_IO_ERROR);
        }
    };

    let mut heap = Heap::with_config(cli.heap_config());
    match compile(&source, &mut heap, &()) {
        Ok(script) => {
            tracing::info!(
                source = %name,
                bytes = heap.function(script).chunk.len(),
                collections = heap.collections(),
                "compiled"
            );
            if cli.disassemble {
                print!("{}", disasm::disassemble(&heap, script));
            }
        }
        Err(errors) => {
            for error in errors.iter() {
                eprintln!("{error}");
            }
            process::exit(EXIT_COMPILE_ERROR);
        }
    }
}

/// The source text and a name to report it by.
fn read_source(cli: &Cli) -> Result<(String, String), (String, std::io::Error)> {
    if let Some(code) = &cli.eval {
        return Ok(("(command line)".to_string(), code.clone()));
    }
    match cli.file.as_deref() {
        Some(path) if path != "-" => std::fs::read_to_string(path)
            .map(|source| (path.to_string(), source))
            .map_err(|e| (path.to_string(), e)),
        _ => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .map(|_| ("stdin".to_string(), source))
                .map_err(|e| ("stdin".to_string(), e))
        }
    }
}
