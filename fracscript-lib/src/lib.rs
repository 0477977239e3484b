//! To execute a script, it goes through the following stages:
//! 1. [`parser::parse`] turns the source into a [`core::SyntaxTree`]
//! 1. [`resolver::resolve`] replaces every name with a [`core::Symbol`]
//! 1. optionally, [`type_check::check`] rejects programs that are certainly ill typed
//! 1. [`compiler::compile`] lowers the resolved tree to [`core::ByteCode`]
//! 1. a [`vm::VM`] loads the bytecode and executes it:
//!
//!    ```
//!    use fracscript_lib::{compiler, parser, resolver, vm::VM};
//!
//!    let tree = resolver::resolve(parser::parse("print(1/3 + 1/6)").unwrap()).unwrap();
//!    let mut vm = VM::new();
//!    vm.load(compiler::compile(&tree).unwrap());
//!    vm.execute().unwrap();
//!    ```
//!
//! [`run_source`] does all of that in one go.

use thiserror::Error;

pub mod compiler;
pub mod core;
pub mod parser;
pub mod resolver;
pub mod type_check;
pub mod utils;
pub mod vm;

use crate::core::{ByteCode, BytecodeError, Value};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error:\n{0}")]
    Parse(#[from] Box<parser::ParseError>),

    #[error("Resolve error: {0}")]
    Resolve(#[from] resolver::ResolveError),

    #[error("Type error: {0}")]
    Type(#[from] type_check::TypeError),

    #[error("Compilation error: {0}")]
    Compilation(#[from] compiler::CompilationError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] vm::RuntimeError),

    #[error("Bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),
}

impl From<parser::ParseError> for Error {
    fn from(e: parser::ParseError) -> Self {
        Error::Parse(Box::new(e))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// run the type checker before compiling
    pub typecheck: bool,
    pub vm: vm::VmOptions,
}

/// parses, resolves, optionally type checks and compiles a program
pub fn compile_source(src: &str, opts: &Options) -> Result<ByteCode, Error> {
    let tree = resolver::resolve(parser::parse(src)?)?;
    if opts.typecheck {
        type_check::check(&tree)?;
    }
    Ok(compiler::compile(&tree)?)
}

/// compiles and executes a program, PRINT writes to stdout
pub fn run_source(src: &str, opts: &Options) -> Result<Value, Error> {
    let bytecode = compile_source(src, opts)?;
    let mut vm = vm::VM::with_options(opts.vm);
    vm.load(bytecode);
    Ok(vm.execute()?)
}
