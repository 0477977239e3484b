use derive_more::Display;
use im::Vector;

use std::collections::BTreeMap;

use crate::compiler::CompilationError;
use crate::core::*;
use crate::utils;

/// A forward reference to an instruction index. It's an index into the label table of the
/// [`ByteCodeBuilder`] that created it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(fmt = "L{}", _0)]
pub struct Label(usize);

/// The state of a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Unresolved,
    Resolved(usize),
}

/// represents byte code while it's being built
///
/// It's mainly a utility tool used during compilation. All methods take and return the builder
/// by value, which is how the compiler threads it through the tree.
#[derive(Debug, Clone, Default)]
pub struct ByteCodeBuilder {
    /// Basically the program
    pub text: Vector<OpCode<Label>>,
    /// One entry per label ever created, indexed by the label
    pub labels: Vector<Target>,
    /// names of all symbols that occur in the text, for error messages and listings
    pub symbol_names: BTreeMap<SymbolId, String>,
}

impl ByteCodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// the index the next emitted instruction will have
    pub fn position(&self) -> usize {
        self.text.len()
    }

    pub fn emit(mut self, code: OpCode<Label>) -> Self {
        self.text.push_back(code);
        self
    }

    /// create a new, unresolved label
    pub fn new_label(&mut self) -> Label {
        self.labels.push_back(Target::Unresolved);
        Label(self.labels.len() - 1)
    }

    /// resolves the label to the index of the next emitted instruction. Every label can be
    /// placed once
    pub fn place_label(mut self, label: Label) -> Result<Self, CompilationError> {
        let position = self.position();
        match self.labels.get_mut(label.0) {
            Some(target @ Target::Unresolved) => {
                *target = Target::Resolved(position);
                Ok(self)
            }
            Some(Target::Resolved(at)) => Err(CompilationError::LabelPlacedTwice {
                label: label.0,
                first: *at,
                second: position,
            }),
            None => Err(CompilationError::CompilerBug {
                msg: format!("label {} was not created by this builder", label),
            }),
        }
    }

    /// remembers the symbol's name, so it's available after compilation
    pub fn note_symbol(mut self, symbol: &Symbol) -> Self {
        self.symbol_names
            .entry(symbol.id)
            .or_insert_with(|| symbol.name.clone());
        self
    }

    pub fn load(self, symbol: &Symbol) -> Self {
        self.note_symbol(symbol).emit(OpCode::Load(symbol.id))
    }

    pub fn store(self, symbol: &Symbol) -> Self {
        self.note_symbol(symbol).emit(OpCode::Store(symbol.id))
    }

    fn resolve(&self, label: Label, text_len: usize) -> Result<usize, CompilationError> {
        match self.labels.get(label.0) {
            Some(Target::Resolved(idx)) if *idx < text_len => Ok(*idx),
            Some(Target::Resolved(idx)) => Err(CompilationError::LabelOutOfRange {
                label: label.0,
                target: *idx,
                len: text_len,
            }),
            Some(Target::Unresolved) => Err(CompilationError::UnresolvedLabel { label: label.0 }),
            None => Err(CompilationError::CompilerBug {
                msg: format!("label {} was not created by this builder", label),
            }),
        }
    }

    /// Appends the final HALT and replaces every label by the index it was placed at.
    pub fn build(self) -> Result<ByteCode, CompilationError> {
        let builder = self.emit(OpCode::Halt);
        let len = builder.text.len();
        let text = builder
            .text
            .iter()
            .cloned()
            .map(|code| code.map_target(|label| builder.resolve(label, len)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ByteCode {
            text,
            header: ByteCodeHeader {
                version: utils::get_version(),
                symbol_names: builder.symbol_names,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_backward_labels_are_resolved() -> Result<(), CompilationError> {
        let mut builder = ByteCodeBuilder::new();
        let begin = builder.new_label();
        let end = builder.new_label();
        let bc = builder
            .place_label(begin)?
            .emit(OpCode::Push(Literal::Bool(true)))
            .emit(OpCode::JumpIfFalse(end))
            .emit(OpCode::Jump(begin))
            .place_label(end)?
            .build()?;
        assert_eq!(
            bc.text,
            vec![
                OpCode::Push(Literal::Bool(true)),
                OpCode::JumpIfFalse(3),
                OpCode::Jump(0),
                OpCode::Halt
            ]
        );
        Ok(())
    }

    #[test]
    fn unresolved_labels_fail_the_build() {
        let mut builder = ByteCodeBuilder::new();
        let nowhere = builder.new_label();
        let res = builder.emit(OpCode::Jump(nowhere)).build();
        assert!(matches!(
            res,
            Err(CompilationError::UnresolvedLabel { label: 0 })
        ));
    }

    #[test]
    fn labels_are_placed_once() {
        let mut builder = ByteCodeBuilder::new();
        let label = builder.new_label();
        let res = builder
            .place_label(label)
            .and_then(|b| b.emit(OpCode::Pop).place_label(label));
        assert!(matches!(
            res,
            Err(CompilationError::LabelPlacedTwice {
                first: 0,
                second: 1,
                ..
            })
        ));
    }

    #[test]
    fn symbol_names_are_recorded() -> Result<(), CompilationError> {
        let x = Symbol {
            name: "x".into(),
            id: SymbolId(3),
        };
        let bc = ByteCodeBuilder::new().load(&x).store(&x).build()?;
        assert_eq!(bc.header.symbol_names.get(&SymbolId(3)), Some(&"x".to_string()));
        Ok(())
    }
}
