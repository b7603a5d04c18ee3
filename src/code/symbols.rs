use std::{collections::HashMap, rc::Rc};

use crate::{
    code::{Kind, Value},
    util::idx::{Arena, Idx},
};

pub type VarId = Idx<Variable>;

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: Rc<str>,
    /// Either [`Kind::Integer`] or [`Kind::String`]. Fixed at declaration.
    pub kind: Kind,
    pub value: Value,
}

/// The flat, global mapping from variable names to variables.
///
/// Variables are never removed; a [`VarId`] stays valid for as long as the
/// table lives.
#[derive(Debug)]
pub struct SymbolTable {
    map: HashMap<Rc<str>, VarId>,
    vars: Arena<Variable>,
}

impl SymbolTable {
    pub fn with_capacity(capacity: usize) -> SymbolTable {
        SymbolTable {
            map: HashMap::with_capacity(capacity),
            vars: Arena::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Creates a variable holding the default value of its kind.
    ///
    /// Fails (returning the existing variable's handle) if the name is taken.
    pub fn declare(&mut self, name: &str, kind: Kind) -> Result<VarId, VarId> {
        debug_assert!(matches!(kind, Kind::Integer | Kind::String));
        if let Some(&existing) = self.map.get(name) {
            return Err(existing);
        }
        let name: Rc<str> = Rc::from(name);
        let id = self.vars.push(Variable {
            name: Rc::clone(&name),
            kind,
            value: Value::default_of(kind),
        });
        self.map.insert(name, id);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.map.get(name).copied()
    }

    pub fn get(&self, id: VarId) -> &Variable {
        self.vars.get(id)
    }

    pub fn get_mut(&mut self, id: VarId) -> &mut Variable {
        self.vars.get_mut(id)
    }

    /// Iterates over all variables in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.vars.iter()
    }
}
