use std::collections::HashMap;

use crate::core::*;

/// The activation record of a function call
#[derive(Debug, Clone)]
pub struct Frame {
    /// the instruction RETURN continues at
    pub return_address: usize,
    /// the function that is being executed
    pub function: FnRef,
    /// parameters and variables declared inside the function
    pub locals: HashMap<SymbolId, Value>,
}

/// Symbol addressed storage. Top level symbols live in globals, every call gets its own frame.
#[derive(Debug, Default, Clone)]
pub struct Memory {
    pub globals: HashMap<SymbolId, Value>,
    pub frames: Vec<Frame>,
}

impl Memory {
    /// looks the symbol up in the current frame first, then in the globals
    pub fn load(&self, id: SymbolId) -> Option<&Value> {
        self.frames
            .last()
            .and_then(|frame| frame.locals.get(&id))
            .or_else(|| self.globals.get(&id))
    }

    /// Outside of calls, everything is stored as global. Inside a call, globals that already
    /// exist are overwritten, everything else becomes a local of the current frame.
    pub fn store(&mut self, id: SymbolId, val: Value) {
        match self.frames.last_mut() {
            Some(frame) if !self.globals.contains_key(&id) => {
                frame.locals.insert(id, val);
            }
            _ => {
                self.globals.insert(id, val);
            }
        }
    }

    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.globals.clear();
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame {
            return_address: 0,
            function: FnRef { entry: 0, arity: 0 },
            locals: HashMap::new(),
        }
    }

    #[test]
    fn top_level_stores_are_global() {
        let mut mem = Memory::default();
        mem.store(SymbolId(0), Value::int(1));
        assert_eq!(mem.globals.get(&SymbolId(0)), Some(&Value::int(1)));
    }

    #[test]
    fn frames_have_private_locals() {
        let mut mem = Memory::default();
        mem.store(SymbolId(0), Value::int(1));
        mem.frames.push(frame());
        mem.store(SymbolId(1), Value::int(2));
        mem.frames.push(frame());
        assert_eq!(mem.load(SymbolId(1)), None);
        mem.store(SymbolId(1), Value::int(3));
        assert_eq!(mem.load(SymbolId(1)), Some(&Value::int(3)));
        mem.frames.pop();
        assert_eq!(mem.load(SymbolId(1)), Some(&Value::int(2)));
        assert_eq!(mem.load(SymbolId(0)), Some(&Value::int(1)));
    }

    #[test]
    fn globals_are_updated_from_inside_calls() {
        let mut mem = Memory::default();
        mem.store(SymbolId(0), Value::int(1));
        mem.frames.push(frame());
        mem.store(SymbolId(0), Value::int(5));
        mem.frames.pop();
        assert_eq!(mem.load(SymbolId(0)), Some(&Value::int(5)));
    }
}
