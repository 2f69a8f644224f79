//! Identifier displacement table
//!
//! Every identifier maps to where it lives: a stack slot off `$sp` (or
//! `$gp` for globals), or a physical register for parameters that fit
//! the four-register convention. The scope watermark is saved around
//! compound statements so identifiers declared inside become invisible
//! on exit; `max_displ` is the per-function high-water mark the frame is
//! sized by.

use crate::asm::Reg;
use crate::value::Lvalue;
use crate::WORD_LENGTH;
use mcc_frontend::{SymbolId, SymbolTable, Type};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
enum Entry {
    OnStack { base: Reg, displ: i32 },
    InRegister { reg: Reg },
}

/// Bytes a value of this type occupies in a frame; floating values are
/// stored single precision
pub(crate) fn value_size_in_bytes(ty: &Type) -> usize {
    match ty {
        Type::Floating => WORD_LENGTH,
        Type::Structure(members) => members.iter().map(value_size_in_bytes).sum(),
        other => WORD_LENGTH * other.type_size().max(1),
    }
}

#[derive(Debug, Default)]
pub struct Displacements {
    entries: HashMap<SymbolId, Entry>,
    /// Current scope watermark off `$sp`
    pub displ: usize,
    /// High-water mark of the current function
    pub max_displ: usize,
    /// Watermark off `$gp` for globals
    pub global_displ: usize,
}

impl Displacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an identifier and hand back its lvalue
    pub fn add(&mut self, symbols: &SymbolTable, identifier: SymbolId) -> Lvalue {
        let ty = symbols.get_type(identifier).clone();
        let size = value_size_in_bytes(&ty);

        let (base, displ) = if symbols.is_local(identifier) {
            let displ = self.displ;
            self.displ += size;
            self.max_displ = self.max_displ.max(self.displ);
            (Reg::Sp, displ)
        } else {
            let displ = self.global_displ;
            self.global_displ += size;
            (Reg::Gp, displ)
        };

        self.entries.insert(
            identifier,
            Entry::OnStack {
                base,
                displ: displ as i32,
            },
        );
        Lvalue::Stack {
            base,
            displ: displ as i32,
            ty,
        }
    }

    /// Enter a register-resident parameter
    pub fn add_register(&mut self, identifier: SymbolId, reg: Reg) {
        self.entries.insert(identifier, Entry::InRegister { reg });
    }

    pub fn get(&self, symbols: &SymbolTable, identifier: SymbolId) -> Lvalue {
        let ty = symbols.get_type(identifier).clone();
        match self.entries.get(&identifier) {
            Some(&Entry::OnStack { base, displ }) => Lvalue::Stack { base, displ, ty },
            Some(&Entry::InRegister { reg }) => Lvalue::Register { reg, ty },
            None => Lvalue::Stack {
                base: Reg::Sp,
                displ: 0,
                ty,
            },
        }
    }

    /// Reset per-function state; globals survive
    pub fn enter_function(&mut self) {
        self.displ = 0;
        self.max_displ = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcc_frontend::SymbolTable;

    fn table() -> (SymbolTable, SymbolId, SymbolId, SymbolId) {
        let mut symbols = SymbolTable::new();
        let a = symbols.add("a", Type::Integer, true);
        let f = symbols.add("f", Type::Floating, true);
        let g = symbols.add("g", Type::Integer, false);
        (symbols, a, f, g)
    }

    #[test]
    fn test_locals_stack_up_from_sp() {
        let (symbols, a, f, _) = table();
        let mut displacements = Displacements::new();

        let lval = displacements.add(&symbols, a);
        assert!(matches!(lval, Lvalue::Stack { base: Reg::Sp, displ: 0, .. }));

        // floats take one word despite a two-word type size
        let lval = displacements.add(&symbols, f);
        assert!(matches!(lval, Lvalue::Stack { base: Reg::Sp, displ: 4, .. }));
        assert_eq!(displacements.max_displ, 8);
    }

    #[test]
    fn test_globals_use_gp() {
        let (symbols, _, _, g) = table();
        let mut displacements = Displacements::new();
        let lval = displacements.add(&symbols, g);
        assert!(matches!(lval, Lvalue::Stack { base: Reg::Gp, .. }));
    }

    #[test]
    fn test_scope_restore_hides_inner_declarations() {
        let (symbols, a, f, _) = table();
        let mut displacements = Displacements::new();

        displacements.add(&symbols, a);
        let scope = displacements.displ;
        displacements.add(&symbols, f);
        displacements.displ = scope;

        // the slot is reusable, the high-water mark stays
        assert_eq!(displacements.displ, 4);
        assert_eq!(displacements.max_displ, 8);
    }

    #[test]
    fn test_register_parameters() {
        let (symbols, a, _, _) = table();
        let mut displacements = Displacements::new();
        displacements.add_register(a, Reg::A0);
        assert!(matches!(
            displacements.get(&symbols, a),
            Lvalue::Register { reg: Reg::A0, .. }
        ));
    }
}
