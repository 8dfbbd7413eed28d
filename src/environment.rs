use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
#[cfg(test)]
use std::rc::Weak;

/// One level of bindings.
pub struct SymbolTable {
    symbols: BTreeMap<String, Value>,
    parent: Option<Scope>,
}

/// A shared handle to a symbol table and, through it, its whole parent chain.
#[derive(Clone)]
pub struct Scope {
    table: Rc<RefCell<SymbolTable>>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope::with_parent(None)
    }

    pub fn child(parent: &Scope) -> Scope {
        Scope::with_parent(Some(parent.clone()))
    }

    fn with_parent(parent: Option<Scope>) -> Scope {
        Scope {
            table: Rc::new(RefCell::new(SymbolTable {
                symbols: BTreeMap::new(),
                parent,
            })),
        }
    }

    /// Look `name` up here, then in each enclosing table.
    pub fn get(&self, name: &str) -> Option<Value> {
        let table = self.table.borrow();
        match table.symbols.get(name) {
            Some(value) => Some(value.clone()),
            None => table.parent.as_ref().and_then(|parent| parent.get(name)),
        }
    }

    /// Bind `name` in this table only, shadowing any enclosing binding.
    pub fn set(&self, name: &str, value: Value) {
        self.table
            .borrow_mut()
            .symbols
            .insert(name.to_string(), value);
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.table.borrow().symbols.contains_key(name)
    }

    /// Names bound directly in this table, sorted.
    pub fn names(&self) -> Vec<String> {
        self.table.borrow().symbols.keys().cloned().collect()
    }

    pub fn parent(&self) -> Option<Scope> {
        self.table.borrow().parent.clone()
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.table, &other.table)
    }

    #[cfg(test)]
    pub(crate) fn downgrade(&self) -> Weak<RefCell<SymbolTable>> {
        Rc::downgrade(&self.table)
    }
}

impl Default for Scope {
    fn default() -> Scope {
        Scope::new()
    }
}

// Procedures stored in a table point back at it, so never print values here.
impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("names", &self.names())
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}
