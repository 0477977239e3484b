//! Helpers shared by the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use fracscript_lib::core::{ByteCode, Value};
use fracscript_lib::vm::{RuntimeError, VmOptions, VM};
use fracscript_lib::{compiler, parser, resolver};

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// A writer whose contents can still be read after it was handed to the VM
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn compile(src: &str) -> Result<ByteCode> {
    let tree = resolver::resolve(parser::parse(src)?)?;
    Ok(compiler::compile(&tree)?)
}

pub fn vm_for(src: &str, opts: VmOptions) -> Result<(VM, SharedBuffer)> {
    let out = SharedBuffer::default();
    let mut vm = VM::with_options(opts).with_output(Box::new(out.clone()));
    vm.load(compile(src)?);
    Ok((vm, out))
}

/// runs a program, returns its result and everything it printed
pub fn run(src: &str) -> Result<(Value, String)> {
    let (mut vm, out) = vm_for(src, VmOptions::default())?;
    let res = vm.execute()?;
    Ok((res, out.contents()))
}

pub fn eval(src: &str) -> Value {
    match run(src) {
        Ok((val, _)) => val,
        Err(e) => panic!("{} failed: {:#}", src, e),
    }
}

pub fn output(src: &str) -> String {
    match run(src) {
        Ok((_, out)) => out,
        Err(e) => panic!("{} failed: {:#}", src, e),
    }
}

/// runs a program that compiles but must fail at runtime
pub fn runtime_error(src: &str) -> RuntimeError {
    let (mut vm, _) = vm_for(src, VmOptions::default()).expect("program must compile");
    match vm.execute() {
        Ok(val) => panic!("{} should fail, but returned {}", src, val),
        Err(e) => e,
    }
}
