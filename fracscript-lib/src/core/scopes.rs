//! Scopes is a stack of Mappings. Usefull during name resolution and type checking
//!
//! Since older instances become relevant again once a scope is closed, this uses immutable
//! datastructures, which use structural sharing

use im::HashMap as ImHashMap;
use im::Vector as ImVec;

use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;

pub type Scope<K, V> = ImHashMap<K, V>;

/// represents the scope hirarchy.
#[derive(Debug, Clone)]
pub struct Scopes<K, V>
where
    K: Debug + Hash + Clone + Eq,
    V: Clone + Debug,
{
    /// Each Entry in the vec is a new scope, the last is the inner most one.
    /// The first scope is assumend to be the global scope
    pub scopes: ImVec<Scope<K, V>>,
}

impl<K, V> Default for Scopes<K, V>
where
    K: Debug + Hash + Clone + Eq,
    V: Clone + Debug,
{
    fn default() -> Self {
        Scopes {
            scopes: ImVec::unit(ImHashMap::new()),
        }
    }
}

impl<K, V> Scopes<K, V>
where
    K: Debug + Hash + Clone + Eq,
    V: Clone + Debug,
{
    /// open a new scope
    pub fn open_new(&mut self) {
        self.scopes.push_back(ImHashMap::new());
    }

    /// collapse the innermost scope. The global scope is never collapsed, None is returned
    /// instead
    pub fn collapse_innermost(&mut self) -> Option<Scope<K, V>> {
        if self.scopes.len() > 1 {
            self.scopes.pop_back()
        } else {
            None
        }
    }

    /// add a symbol to the innermost scope, returns the entry it replaced
    pub fn add_entry(&mut self, key: K, val: V) -> Option<V> {
        self.scopes
            .back_mut()
            .and_then(|scope| scope.insert(key, val))
    }

    /// whether the innermost scope already contains the key
    pub fn innermost_contains<BK>(&self, key: &BK) -> bool
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.scopes
            .back()
            .map_or(false, |scope| scope.contains_key(key))
    }

    /// returns the information about a symbol if it can be found.
    ///
    /// starts searching in the innermost scope, and goes outwards,
    /// if the symbol is not in the scope. Returns None if the symbol is not
    /// in any scope
    pub fn find_entry<BK>(&self, key: &BK) -> Option<&V>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.find_entry_with_depth(key).map(|(_, v)| v)
    }

    /// like [`Scopes::find_entry`], but also returns the index of the scope the entry was found
    /// in. 0 is the global scope.
    pub fn find_entry_with_depth<BK>(&self, key: &BK) -> Option<(usize, &V)>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        for (idx, scope) in self.scopes.iter().enumerate().rev() {
            if let Some(info) = scope.get(key) {
                return Some((idx, info));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_entries_shadow_outer_ones() {
        let mut scopes: Scopes<String, usize> = Scopes::default();
        scopes.add_entry("x".into(), 1);
        scopes.open_new();
        assert_eq!(scopes.find_entry("x"), Some(&1));
        scopes.add_entry("x".into(), 2);
        assert_eq!(scopes.find_entry_with_depth("x"), Some((1, &2)));
        scopes.collapse_innermost();
        assert_eq!(scopes.find_entry("x"), Some(&1));
    }

    #[test]
    fn global_scope_is_never_collapsed() {
        let mut scopes: Scopes<String, usize> = Scopes::default();
        assert!(scopes.collapse_innermost().is_none());
        assert_eq!(scopes.scopes.len(), 1);
    }

    #[test]
    fn innermost_contains_ignores_outer_scopes() {
        let mut scopes: Scopes<String, usize> = Scopes::default();
        scopes.add_entry("x".into(), 1);
        scopes.open_new();
        assert!(!scopes.innermost_contains("x"));
        assert!(scopes.find_entry("y").is_none());
    }
}
