use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::BTreeMap;

use crate::core::*;
use crate::utils;

/// Represents bytecode in it's final form. All jump targets are instruction indices.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByteCode {
    pub text: Vec<OpCode<usize>>,
    pub header: ByteCodeHeader,
}

/// the header of the final bytecode
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByteCodeHeader {
    /// version of the crate that compiled this bytecode
    pub version: [u16; 3],
    /// names of the symbols that are loaded or stored in text
    pub symbol_names: BTreeMap<SymbolId, String>,
}

#[derive(Error, Debug)]
pub enum BytecodeError {
    #[error("Could not encode or decode bytecode: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("Bytecode was compiled by version {found:?}, this is version {expected:?}")]
    VersionMismatch {
        expected: [u16; 3],
        found: [u16; 3],
    },
}

impl ByteCode {
    pub fn to_bytes(&self) -> Result<Vec<u8>, BytecodeError> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// decodes bytecode that was written by [`ByteCode::to_bytes`]. Only bytecode of the same
    /// crate version is accepted
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BytecodeError> {
        let bc: ByteCode = postcard::from_bytes(bytes)?;
        let expected = utils::get_version();
        if bc.header.version != expected {
            return Err(BytecodeError::VersionMismatch {
                expected,
                found: bc.header.version,
            });
        }
        Ok(bc)
    }

    pub fn symbol_name(&self, id: SymbolId) -> Option<&str> {
        self.header.symbol_names.get(&id).map(String::as_str)
    }

    /// renders a single instruction, symbol operands get their name attached
    pub fn render_instruction(&self, idx: usize) -> Option<String> {
        let code = self.text.get(idx)?;
        let mut line = format!("{:>4}  {}", idx, code);
        if let OpCode::Load(id) | OpCode::Store(id) = code {
            if let Some(name) = self.symbol_name(*id) {
                line.push_str(&format!(" ({})", name));
            }
        }
        Some(line)
    }
}

/// debugging dump of the bytecode, one instruction per line
pub fn print_bytecode(bc: &ByteCode) -> String {
    (0..bc.text.len())
        .filter_map(|i| bc.render_instruction(i))
        .map(|line| line + "\n")
        .collect()
}
