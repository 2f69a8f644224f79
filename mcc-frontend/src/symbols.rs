//! Identifier table shared between the front end and the code generator

use crate::types::Type;
use serde::{Deserialize, Serialize};

pub type SymbolId = usize;

/// Built-in `printf`; its call marshalling is special-cased
pub const BI_PRINTF: SymbolId = 0;

/// First identifier id available to user declarations; ids below this
/// range are reserved for built-ins
pub const BEGIN_USER_FUNC: SymbolId = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub spelling: String,
    pub ty: Type,
    pub is_local: bool,
}

/// Flat identifier table; a [`SymbolId`] is an index into it. The
/// reserved built-in range is pre-populated on construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<SymbolInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            symbols: Vec::new(),
        };
        // Reserved range: printf then padding up to BEGIN_USER_FUNC
        table.symbols.push(SymbolInfo {
            spelling: "printf".to_string(),
            ty: Type::Function {
                return_type: Box::new(Type::Integer),
                parameters: Vec::new(),
            },
            is_local: false,
        });
        while table.symbols.len() < BEGIN_USER_FUNC {
            table.symbols.push(SymbolInfo {
                spelling: String::new(),
                ty: Type::Void,
                is_local: false,
            });
        }
        table
    }

    pub fn add(&mut self, spelling: &str, ty: Type, is_local: bool) -> SymbolId {
        self.symbols.push(SymbolInfo {
            spelling: spelling.to_string(),
            ty,
            is_local,
        });
        self.symbols.len() - 1
    }

    pub fn spelling(&self, id: SymbolId) -> &str {
        &self.symbols[id].spelling
    }

    pub fn get_type(&self, id: SymbolId) -> &Type {
        &self.symbols[id].ty
    }

    pub fn is_local(&self, id: SymbolId) -> bool {
        self.symbols[id].is_local
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
