//! contains all important data structures

pub mod ast;
pub use ast::*;

pub mod data;
pub use data::*;

pub mod scopes;
pub use scopes::*;

pub mod types;
pub use types::*;

pub mod opcode;
pub use opcode::*;

pub mod bytecode_builder;
pub use bytecode_builder::*;

pub mod bytecode;
pub use bytecode::*;
