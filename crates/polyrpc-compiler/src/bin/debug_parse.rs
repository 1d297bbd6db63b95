//! Debug script to see what a frontend produces for one file.
//!
//! Usage: `debug_parse <file>`

use std::path::PathBuf;

use polyrpc_compiler::{classify, AstDispatcher, GenerationContext};

fn main() {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: debug_parse <file>");
        std::process::exit(2);
    };

    let ctx = GenerationContext::new();
    let program = match AstDispatcher::with_builtins().dispatch(&path, &ctx) {
        Ok(program) => program,
        Err(e) => {
            println!("Error: {:?}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&program) {
        Ok(json) => println!("{}", json),
        Err(e) => println!("Error: {}", e),
    }

    if let Some(class) = program.class() {
        println!("\nTriggers:");
        match classify(class, None) {
            Ok(triggers) => {
                for method in &triggers.methods {
                    println!("  {}.{}: {}", class.name, method.method, method.trigger);
                }
            }
            Err(e) => println!("  {}", e),
        }
    }

    for warning in ctx.warnings.snapshot() {
        println!("warning: {}", warning);
    }
}
