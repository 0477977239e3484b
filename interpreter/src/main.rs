use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fracscript_lib::core::{print_bytecode, ByteCode};
use fracscript_lib::vm::{VmOptions, VM};
use fracscript_lib::{compiler, parser, resolver, type_check};

use std::path::PathBuf;

mod debugger;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    script: PathBuf,

    /// print the syntax tree and exit
    #[arg(short = 'a', long)]
    show_ast: bool,

    /// print the resolved tree and exit
    #[arg(short = 'r', long)]
    show_resolved: bool,

    /// print the bytecode and exit
    #[arg(short = 'i', long)]
    show_bytecode: bool,

    /// run the type checker before compiling
    #[arg(short = 't', long)]
    typecheck: bool,

    /// step through the bytecode interactively
    #[arg(short = 'b', long)]
    debug: bool,

    /// write the compiled bytecode to a file instead of running it
    #[arg(short = 'o', long, value_name = "FILE")]
    emit: Option<PathBuf>,

    /// the script is a bytecode file written by --emit
    #[arg(short = 'c', long)]
    compiled: bool,

    #[arg(long, default_value_t = VmOptions::default().max_call_depth)]
    max_call_depth: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let bytecode = if cli.compiled {
        let bytes = std::fs::read(&cli.script)
            .with_context(|| format!("Could not read {}", cli.script.display()))?;
        let bc = ByteCode::from_bytes(&bytes)?;
        debug!(instructions = bc.text.len(), "loaded compiled bytecode");
        bc
    } else {
        let src = std::fs::read_to_string(&cli.script)
            .with_context(|| format!("Could not read {}", cli.script.display()))?;
        match compile(&cli, &src)? {
            Some(bc) => bc,
            None => return Ok(()),
        }
    };

    if cli.show_bytecode {
        print!("{}", print_bytecode(&bytecode));
        return Ok(());
    }

    if let Some(path) = &cli.emit {
        std::fs::write(path, bytecode.to_bytes()?)
            .with_context(|| format!("Could not write {}", path.display()))?;
        return Ok(());
    }

    let mut vm = VM::with_options(VmOptions {
        max_call_depth: cli.max_call_depth,
    });
    vm.load(bytecode);
    if cli.debug {
        return debugger::run(&mut vm);
    }

    if let Err(e) = vm.execute() {
        let mnemonic = vm
            .current_instruction()
            .map(|code| code.mnemonic())
            .unwrap_or("?");
        anyhow::bail!("Runtime error at {} ({}): {}", vm.ip(), mnemonic, e);
    }
    Ok(())
}

/// runs the front end, returns None if one of the show flags ended the program early
fn compile(cli: &Cli, src: &str) -> Result<Option<ByteCode>> {
    let ast = parser::parse(src).map_err(|e| anyhow::anyhow!("Parse error:\n{}", e))?;
    if cli.show_ast {
        println!("{:#?}", ast);
        return Ok(None);
    }

    let resolved = resolver::resolve(ast).context("Resolve error")?;
    if cli.show_resolved {
        println!("{:#?}", resolved);
        return Ok(None);
    }

    if cli.typecheck {
        type_check::check(&resolved).context("Type error")?;
    }

    Ok(Some(
        compiler::compile(&resolved).context("Compilation error")?,
    ))
}
