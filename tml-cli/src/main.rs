use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tml_codegen::{CodegenOptions, LlvmIrGen};
use tml_diagnostics::DiagnosticEngine;

#[derive(Parser)]
#[command(name = "tml")]
#[command(version = "0.2.0")]
#[command(about = "TML code generator driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower a typed module (JSON) to LLVM IR
    Compile {
        /// Input typed-module .json file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output .ll file (defaults to the input with an .ll extension)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Library modules to register for shared generic instantiations
        #[arg(long, value_name = "LIB")]
        library: Vec<PathBuf>,

        /// Emit tml_cover_func calls at function entry
        #[arg(long)]
        coverage: bool,

        /// Emit llvm.instrprof.increment with per-function hashes
        #[arg(long)]
        source_coverage: bool,

        /// Suite mode: force internal linkage on user functions
        #[arg(long)]
        internal_linkage: bool,

        /// Suite mode: prefix test-local symbols with s<INDEX>_
        #[arg(long, value_name = "INDEX")]
        suite_index: Option<u32>,

        /// Mark public functions as DLL-exported
        #[arg(long)]
        dll_export: bool,

        /// Debug info level (0-2)
        #[arg(long, default_value = "0")]
        debug_info: u8,

        /// Print diagnostics as JSON, one object per line
        #[arg(long)]
        json: bool,
    },

    /// Run codegen without writing output, reporting diagnostics only
    Check {
        /// Input typed-module .json file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print diagnostics as JSON, one object per line
        #[arg(long)]
        json: bool,
    },
}

fn load_module(path: &PathBuf) -> Result<tml_ast::Module> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read module file {}", path.display()))?;
    serde_json::from_str(&source)
        .with_context(|| format!("{} is not a valid typed module", path.display()))
}

fn report(gen: &mut LlvmIrGen, json: bool) -> Result<bool> {
    let errors = gen.take_errors();
    if errors.is_empty() {
        return Ok(true);
    }
    let mut engine = DiagnosticEngine::new();
    for error in &errors {
        engine.emit(error.to_diagnostic("module"));
    }
    if json {
        eprint!("{}", engine.to_json_lines());
    } else {
        engine.print_all("");
        engine.print_summary();
    }
    Ok(false)
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            output,
            library,
            coverage,
            source_coverage,
            internal_linkage,
            suite_index,
            dll_export,
            debug_info,
            json,
        } => {
            let module = load_module(&input)?;
            log::info!("compiling module {}", module.name);

            let options = CodegenOptions {
                coverage_enabled: coverage,
                llvm_source_coverage: source_coverage,
                force_internal_linkage: internal_linkage,
                suite_test_index: suite_index,
                dll_export,
                emit_debug_info: debug_info.min(2),
            };
            let mut gen = LlvmIrGen::with_options(&module.name, options);
            for lib_path in &library {
                let lib = load_module(lib_path)?;
                gen.register_library_module(&lib);
            }
            let ir = gen.emit_module(&module);

            if !report(&mut gen, json)? {
                std::process::exit(1);
            }

            let output_path = output.unwrap_or_else(|| input.with_extension("ll"));
            std::fs::write(&output_path, ir)
                .with_context(|| format!("cannot write {}", output_path.display()))?;
            if !gen.link_libraries().is_empty() {
                log::info!("link libraries: {}", gen.link_libraries().join(", "));
            }
            println!("wrote {}", output_path.display());
            Ok(())
        }

        Commands::Check { input, json } => {
            let module = load_module(&input)?;
            let mut gen = LlvmIrGen::new(&module.name);
            let _ = gen.emit_module(&module);
            if !report(&mut gen, json)? {
                std::process::exit(1);
            }
            println!("ok: {}", module.name);
            Ok(())
        }
    }
}
