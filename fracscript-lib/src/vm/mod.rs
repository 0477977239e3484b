//! The stack machine that executes [`ByteCode`].
//!
//! ```
//! use fracscript_lib::{compiler, parser, resolver, vm::VM};
//!
//! let tree = resolver::resolve(parser::parse("1 + 2 * 3").unwrap()).unwrap();
//! let mut vm = VM::new();
//! vm.load(compiler::compile(&tree).unwrap());
//! assert_eq!(vm.execute().unwrap().to_string(), "7");
//! ```

use thiserror::Error;
use tracing::{debug, trace};

use std::collections::HashMap;
use std::io::{self, Write};

use crate::core::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Unsupported operation {op}: {detail}")]
    UnsupportedOperation { op: &'static str, detail: String },

    #[error("Unbound symbol {name} ({id})")]
    UnboundSymbol { name: String, id: SymbolId },

    #[error("Index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: String, len: usize },

    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    #[error("{op} on an empty collection")]
    EmptyCollection { op: &'static str },

    #[error("{op} expected {expected}, found {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("The stack was empty unexpectedly")]
    StackUnderflow,

    #[error("Tried to call a {found}")]
    NotCallable { found: &'static str },

    #[error("Function takes {expected} arguments, but {found} were given")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Maximum call depth of {max} exceeded")]
    CallDepthExceeded { max: usize },

    #[error("RETURN outside of a function")]
    ReturnOutsideFunction,

    #[error("Instruction pointer {ip} is outside of the program")]
    InstructionOutOfBounds { ip: usize },

    #[error("The VM is not running")]
    NotRunning,

    #[error("Could not write output: {0}")]
    Output(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

macro_rules! bail {
    ($($err:tt)*) => {
        return Err(RuntimeError::$($err)*)
    };
}
pub(crate) use bail;

macro_rules! rt_assert {
    ($cond:expr, $($err:tt)*) => {
        if !$cond {
            bail!($($err)*);
        }
    };
}
pub(crate) use rt_assert;

pub mod arithmetic;
pub mod collections;

pub mod memory;
pub use memory::*;

pub mod stack;
pub use stack::*;

pub fn type_mismatch(op: &'static str, expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        op,
        expected,
        found: found.type_name(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Running,
    Halted,
    Failed,
}

/// returned by [`VM::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// there are more instructions to execute
    Continue,
    /// HALT was executed, contains the result of the program
    Done(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// number of nested calls after which execution fails
    pub max_call_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        VmOptions {
            max_call_depth: 10_000,
        }
    }
}

pub struct VM {
    bytecode: ByteCode,
    ip: usize,
    stack: Stack,
    memory: Memory,
    state: VmState,
    options: VmOptions,
    out: Box<dyn Write>,
}

impl Default for VM {
    fn default() -> Self {
        VM::new()
    }
}

impl VM {
    /// creates a vm that prints to stdout. It has nothing to run until [`VM::load`] is called
    pub fn new() -> Self {
        VM::with_options(VmOptions::default())
    }

    pub fn with_options(options: VmOptions) -> Self {
        VM {
            bytecode: ByteCode::default(),
            ip: 0,
            stack: Stack::default(),
            memory: Memory::default(),
            state: VmState::Halted,
            options,
            out: Box::new(io::stdout()),
        }
    }

    /// redirects the output of PRINT
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    pub fn load(&mut self, bytecode: ByteCode) {
        self.bytecode = bytecode;
        self.restart();
    }

    /// empties memory and moves back to the first instruction
    pub fn restart(&mut self) {
        self.ip = 0;
        self.stack.clear();
        self.memory.clear();
        self.state = VmState::Running;
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn frames(&self) -> &[Frame] {
        &self.memory.frames
    }

    pub fn globals(&self) -> &HashMap<SymbolId, Value> {
        &self.memory.globals
    }

    pub fn bytecode(&self) -> &ByteCode {
        &self.bytecode
    }

    /// the instruction that will be executed next
    pub fn current_instruction(&self) -> Option<&OpCode<usize>> {
        self.bytecode.text.get(self.ip)
    }

    /// runs until HALT or the first error
    pub fn execute(&mut self) -> Result<Value> {
        loop {
            if let StepResult::Done(val) = self.step()? {
                return Ok(val);
            }
        }
    }

    /// executes the instruction under the ip. On error, the ip stays at the failing instruction
    pub fn step(&mut self) -> Result<StepResult> {
        if self.state != VmState::Running {
            bail!(NotRunning);
        }
        let code = match self.bytecode.text.get(self.ip) {
            Some(code) => code.clone(),
            None => {
                self.state = VmState::Failed;
                bail!(InstructionOutOfBounds { ip: self.ip });
            }
        };
        trace!(ip = self.ip, instruction = %code, depth = self.stack.len());
        match self.exec(code) {
            Ok(StepResult::Done(val)) => {
                debug!(result = %val, "halted");
                self.state = VmState::Halted;
                Ok(StepResult::Done(val))
            }
            Ok(StepResult::Continue) => Ok(StepResult::Continue),
            Err(e) => {
                debug!(ip = self.ip, error = %e, "execution failed");
                self.state = VmState::Failed;
                Err(e)
            }
        }
    }

    fn symbol_name(&self, id: SymbolId) -> String {
        self.bytecode.symbol_name(id).unwrap_or("?").to_string()
    }

    fn binary(&mut self, op: BinaryOp) -> Result<()> {
        let right = self.stack.pop_val()?;
        let left = self.stack.pop_val()?;
        self.stack.push_val(arithmetic::apply(op, left, right)?);
        Ok(())
    }

    fn unary(&mut self, f: fn(Value) -> Result<Value>) -> Result<()> {
        let val = self.stack.pop_val()?;
        self.stack.push_val(f(val)?);
        Ok(())
    }

    fn binary_collection(&mut self, f: fn(Value, Value) -> Result<Value>) -> Result<()> {
        let arg = self.stack.pop_val()?;
        let coll = self.stack.pop_val()?;
        self.stack.push_val(f(coll, arg)?);
        Ok(())
    }

    /// performs the effect of a single instruction and moves the ip
    fn exec(&mut self, code: OpCode<usize>) -> Result<StepResult> {
        use OpCode::*;
        let mut next_ip = self.ip + 1;
        match code {
            Push(lit) => self.stack.push_val(lit),
            PushUnit => self.stack.push_val(Value::Unit),
            Pop => {
                self.stack.pop_val()?;
            }
            Dup => {
                let top = self.stack.peek()?.clone();
                self.stack.push_val(top);
            }

            Add => self.binary(BinaryOp::Add)?,
            Sub => self.binary(BinaryOp::Sub)?,
            Mul => self.binary(BinaryOp::Mul)?,
            Div => self.binary(BinaryOp::Div)?,
            FloorDiv => self.binary(BinaryOp::FloorDiv)?,
            Rem => self.binary(BinaryOp::Rem)?,
            Pow => self.binary(BinaryOp::Pow)?,
            Eq => self.binary(BinaryOp::Eq)?,
            Ne => self.binary(BinaryOp::Ne)?,
            Lt => self.binary(BinaryOp::Lt)?,
            Gt => self.binary(BinaryOp::Gt)?,
            Le => self.binary(BinaryOp::Le)?,
            Ge => self.binary(BinaryOp::Ge)?,
            Neg => self.unary(arithmetic::negate)?,
            Not => self.unary(arithmetic::not)?,

            Jump(target) => next_ip = target,
            JumpIfFalse(target) => {
                if !self.stack.pop_bool("JUMP_IF_FALSE")? {
                    next_ip = target;
                }
            }
            JumpIfTrue(target) => {
                if self.stack.pop_bool("JUMP_IF_TRUE")? {
                    next_ip = target;
                }
            }

            Load(id) => {
                let val = match self.memory.load(id) {
                    Some(val) => val.clone(),
                    None => bail!(UnboundSymbol {
                        name: self.symbol_name(id),
                        id
                    }),
                };
                self.stack.push_val(val);
            }
            Store(id) => {
                let val = self.stack.pop_val()?;
                self.memory.store(id, val);
            }

            StrCat(n) => {
                let parts = self.stack.pop_n(n)?;
                self.stack.push_val(collections::concat(parts)?);
            }
            StrSlice => {
                let step = self.stack.pop_val()?;
                let stop = self.stack.pop_val()?;
                let start = self.stack.pop_val()?;
                let s = self.stack.pop_str("STR_SLICE")?;
                self.stack
                    .push_val(collections::slice(&s, &start, &stop, &step)?);
            }
            Print(n) => {
                let line = self
                    .stack
                    .pop_n(n)?
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(self.out, "{}", line)
                    .and_then(|_| self.out.flush())
                    .map_err(|e| RuntimeError::Output(e.to_string()))?;
                self.stack.push_val(Value::Str(line));
            }

            BuildList => {
                let n = self.stack.pop_count("BUILD_LIST")?;
                let elems = self.stack.take_top(n)?;
                self.stack.push_val(collections::build_list(elems));
            }
            BuildMap => {
                let n = self.stack.pop_count("BUILD_MAP")?;
                let flat = self.stack.take_top(2 * n)?;
                self.stack.push_val(collections::build_map(flat)?);
            }
            ListFill => {
                let n = self.stack.pop_count("LIST_FILL")?;
                let val = self.stack.pop_val()?;
                self.stack.push_val(collections::list_fill(val, n)?);
            }

            Head => self.unary(collections::head)?,
            Tail => self.unary(collections::tail)?,
            IsEmpty => self.unary(collections::is_empty)?,
            Keys => self.unary(collections::keys)?,
            Values => self.unary(collections::values)?,
            Items => self.unary(collections::items)?,
            Length => self.unary(collections::length)?,
            Cons => self.binary_collection(collections::cons)?,
            Append => self.binary_collection(collections::append)?,
            Delete => self.binary_collection(collections::delete)?,
            Find => self.binary_collection(collections::find)?,
            Put => {
                let val = self.stack.pop_val()?;
                let key = self.stack.pop_val()?;
                let coll = self.stack.pop_val()?;
                self.stack.push_val(collections::put(coll, key, val)?);
            }

            MakeFunction { entry, arity } => {
                self.stack.push_val(Value::Function(FnRef { entry, arity }))
            }
            Call(argc) => {
                let function = match self.stack.pop_val()? {
                    Value::Function(f) => f,
                    other => bail!(NotCallable {
                        found: other.type_name()
                    }),
                };
                rt_assert!(
                    function.arity == argc,
                    ArityMismatch {
                        expected: function.arity,
                        found: argc
                    }
                );
                rt_assert!(
                    self.memory.call_depth() < self.options.max_call_depth,
                    CallDepthExceeded {
                        max: self.options.max_call_depth
                    }
                );
                rt_assert!(self.stack.len() >= argc, StackUnderflow);
                debug!(entry = function.entry, depth = self.memory.call_depth() + 1, "call");
                self.memory.frames.push(Frame {
                    return_address: next_ip,
                    function,
                    locals: HashMap::new(),
                });
                next_ip = function.entry;
            }
            Return => {
                let frame = match self.memory.frames.pop() {
                    Some(frame) => frame,
                    None => bail!(ReturnOutsideFunction),
                };
                trace!(to = frame.return_address, "return");
                next_ip = frame.return_address;
            }
            Halt => {
                let res = self.stack.pop().unwrap_or(Value::Unit);
                return Ok(StepResult::Done(res));
            }
        }
        self.ip = next_ip;
        Ok(StepResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn program(text: Vec<OpCode<usize>>) -> ByteCode {
        ByteCode {
            text,
            header: ByteCodeHeader {
                version: crate::utils::get_version(),
                symbol_names: BTreeMap::new(),
            },
        }
    }

    fn run(text: Vec<OpCode<usize>>) -> (VM, Result<Value>) {
        let mut vm = VM::new().with_output(Box::new(io::sink()));
        vm.load(program(text));
        let res = vm.execute();
        (vm, res)
    }

    #[test]
    fn halt_returns_the_stack_top() {
        let (vm, res) = run(vec![OpCode::Push(Literal::int(3)), OpCode::Halt]);
        assert_eq!(res, Ok(Value::int(3)));
        assert_eq!(vm.state(), VmState::Halted);
    }

    #[test]
    fn halt_on_empty_stack_returns_unit() {
        assert_eq!(run(vec![OpCode::Halt]).1, Ok(Value::Unit));
    }

    #[test]
    fn errors_fail_the_vm_and_keep_the_ip() {
        let (mut vm, res) = run(vec![OpCode::PushUnit, OpCode::Add, OpCode::Halt]);
        assert_eq!(res, Err(RuntimeError::StackUnderflow));
        assert_eq!(vm.state(), VmState::Failed);
        assert_eq!(vm.ip(), 1);
        assert_eq!(vm.step(), Err(RuntimeError::NotRunning));
        vm.restart();
        assert_eq!(vm.state(), VmState::Running);
        assert_eq!(vm.ip(), 0);
    }

    #[test]
    fn running_off_the_end_fails() {
        let (_, res) = run(vec![OpCode::PushUnit]);
        assert_eq!(res, Err(RuntimeError::InstructionOutOfBounds { ip: 1 }));
    }

    #[test]
    fn conditional_jumps_need_booleans() {
        let (_, res) = run(vec![OpCode::Push(Literal::int(0)), OpCode::JumpIfFalse(0)]);
        assert!(matches!(res, Err(RuntimeError::TypeMismatch { expected: "bool", .. })));
    }

    #[test]
    fn unbound_symbols_are_reported_by_name() {
        let mut bc = program(vec![OpCode::Load(SymbolId(7)), OpCode::Halt]);
        bc.header.symbol_names.insert(SymbolId(7), "ghost".into());
        let mut vm = VM::new();
        vm.load(bc);
        assert_eq!(
            vm.execute(),
            Err(RuntimeError::UnboundSymbol {
                name: "ghost".into(),
                id: SymbolId(7)
            })
        );
    }

    #[test]
    fn calls_need_functions_with_matching_arity() {
        let (_, res) = run(vec![OpCode::Push(Literal::int(1)), OpCode::Call(0)]);
        assert_eq!(res, Err(RuntimeError::NotCallable { found: "num" }));

        let (_, res) = run(vec![
            OpCode::MakeFunction { entry: 0, arity: 2 },
            OpCode::Call(1),
        ]);
        assert_eq!(
            res,
            Err(RuntimeError::ArityMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn return_without_call_fails() {
        let (_, res) = run(vec![OpCode::PushUnit, OpCode::Return]);
        assert_eq!(res, Err(RuntimeError::ReturnOutsideFunction));
    }

    #[test]
    fn call_depth_is_limited() {
        // a function that calls itself forever
        let text = vec![
            OpCode::MakeFunction { entry: 2, arity: 0 },
            OpCode::Call(0),
            OpCode::MakeFunction { entry: 2, arity: 0 },
            OpCode::Call(0),
        ];
        let mut vm = VM::with_options(VmOptions { max_call_depth: 50 });
        vm.load(program(text));
        assert_eq!(vm.execute(), Err(RuntimeError::CallDepthExceeded { max: 50 }));
        assert_eq!(vm.frames().len(), 50);
    }

    #[test]
    fn step_walks_one_instruction_at_a_time() {
        let mut vm = VM::new();
        vm.load(program(vec![
            OpCode::Push(Literal::int(1)),
            OpCode::Push(Literal::int(2)),
            OpCode::Add,
            OpCode::Halt,
        ]));
        assert_eq!(vm.step(), Ok(StepResult::Continue));
        assert_eq!(vm.step(), Ok(StepResult::Continue));
        assert_eq!(vm.stack().len(), 2);
        assert_eq!(vm.current_instruction(), Some(&OpCode::Add));
        assert_eq!(vm.step(), Ok(StepResult::Continue));
        assert_eq!(vm.step(), Ok(StepResult::Done(Value::int(3))));
    }
}
