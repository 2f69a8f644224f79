//! MIPS32 assembly emitter for the mcc compiler
//!
//! Walks the typed AST depth first and writes text assembly. Expressions
//! produce rvalues over two temporary-register banks, statements lower
//! control flow onto numbered labels, and functions lay out a fixed
//! callee-saved frame with the body emitted into a buffer first so the
//! frame size is known before the prologue is written.

pub mod asm;
pub mod bank;
pub mod displ;
pub mod value;

mod expr;
mod func;
mod stmt;
#[cfg(test)]
mod tests;

pub use asm::{Instr, Reg};
pub use bank::RegisterBank;
pub use displ::Displacements;
pub use value::{ConstValue, Label, LabelKind, Lvalue, Rvalue};

use mcc_frontend::{SymbolId, TranslationUnit};
use std::fmt::Write;
use thiserror::Error;

/// Data word length of the target
pub const WORD_LENGTH: usize = 4;

/// Lower border of dynamic memory
const LOW_DYN_BORDER: usize = 0x1001_0000;
/// Heap displacement relative to global memory
const HEAP_DISPL: usize = 8000;

const SP_SIZE: usize = 4;
const RA_SIZE: usize = 4;

const ARG_REG_AMOUNT: usize = 4;
const PRESERVED_REG_AMOUNT: usize = 8;
const PRESERVED_FP_REG_AMOUNT: usize = 10;

/// Frame bytes for the preserved registers: `$ra`, `$sp`, `$s0..$s7`,
/// the even `$fs` registers, and `$a0..$a3`
const FUNC_DISPL_PRESERVED: usize = RA_SIZE
    + SP_SIZE
    + PRESERVED_FP_REG_AMOUNT / 2 * WORD_LENGTH
    + PRESERVED_REG_AMOUNT * WORD_LENGTH
    + ARG_REG_AMOUNT * WORD_LENGTH;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("expression does not designate a storage location")]
    NotAnLvalue,

    #[error("only the innermost array dimension may have empty bounds")]
    EmptyBounds,

    #[error("parameters beyond the argument registers are not supported")]
    TooManyParameters,
}

/// Generate the assembly for a whole translation unit
pub fn generate(unit: &TranslationUnit) -> Result<String, CodegenError> {
    Codegen::new(unit).encode()
}

pub(crate) struct Codegen<'a> {
    unit: &'a TranslationUnit,
    out: String,
    bank: RegisterBank,
    displacements: Displacements,
    label_num: usize,
    label_continue: Label,
    label_break: Label,
    curr_function: SymbolId,
}

impl<'a> Codegen<'a> {
    fn new(unit: &'a TranslationUnit) -> Self {
        Self {
            unit,
            out: String::new(),
            bank: RegisterBank::new(),
            displacements: Displacements::new(),
            label_num: 1,
            label_continue: Label::new(LabelKind::End, 0),
            label_break: Label::new(LabelKind::End, 0),
            curr_function: 0,
        }
    }

    fn encode(mut self) -> Result<String, CodegenError> {
        self.pregen();
        self.strings_declaration();
        let unit = self.unit;
        for declaration in &unit.declarations {
            self.emit_declaration(declaration)?;
        }
        self.postgen();
        Ok(self.out)
    }

    // Text emission helpers

    pub(crate) fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub(crate) fn to_code_2r(&mut self, instr: Instr, first: Reg, second: Reg) {
        let _ = writeln!(self.out, "\t{} {}, {}", instr, first, second);
    }

    pub(crate) fn to_code_2r_i(&mut self, instr: Instr, first: Reg, second: Reg, imm: i32) {
        let _ = writeln!(self.out, "\t{} {}, {}, {}", instr, first, second, imm);
    }

    pub(crate) fn to_code_r_i_r(&mut self, instr: Instr, reg: Reg, imm: i32, base: Reg) {
        let _ = writeln!(self.out, "\t{} {}, {}({})", instr, reg, imm, base);
    }

    pub(crate) fn to_code_r_i(&mut self, instr: Instr, reg: Reg, imm: i64) {
        let _ = writeln!(self.out, "\t{} {}, {}", instr, reg, imm);
    }

    pub(crate) fn to_code_r(&mut self, instr: Instr, reg: Reg) {
        let _ = writeln!(self.out, "\t{} {}", instr, reg);
    }

    /// Spelling of an rvalue operand: a constant or a register name
    pub(crate) fn rvalue_text(&self, rvalue: &Rvalue) -> String {
        match rvalue {
            Rvalue::Const { value, .. } => value.to_string(),
            Rvalue::Register { reg, .. } => reg.to_string(),
            Rvalue::Void => String::new(),
        }
    }

    pub(crate) fn emit_label_declaration(&mut self, label: Label) {
        let _ = writeln!(self.out, "{}:", label);
    }

    pub(crate) fn emit_unconditional_branch(&mut self, label: Label) {
        let _ = writeln!(self.out, "\t{} {}", Instr::J, label);
    }

    /// Branch to `label` when the value is zero; constant conditions
    /// fold to either an unconditional jump or nothing
    pub(crate) fn emit_conditional_branch(&mut self, value: &Rvalue, label: Label) {
        match value {
            Rvalue::Const { value, .. } => {
                let is_zero = match value {
                    ConstValue::Int(v) => *v == 0,
                    ConstValue::Float(v) => *v == 0.0,
                    ConstValue::Str(_) => false,
                };
                if is_zero {
                    self.emit_unconditional_branch(label);
                }
            }
            _ => {
                let text = self.rvalue_text(value);
                let _ = writeln!(self.out, "\t{} {}, $0, {}", Instr::Beq, text, label);
            }
        }
    }

    /// Branch to `label` when the value is nonzero
    pub(crate) fn emit_branch_if_nonzero(&mut self, value: &Rvalue, label: Label) {
        match value {
            Rvalue::Const { value, .. } => {
                let is_zero = matches!(value, ConstValue::Int(0));
                if !is_zero {
                    self.emit_unconditional_branch(label);
                }
            }
            _ => {
                let text = self.rvalue_text(value);
                let _ = writeln!(self.out, "\t{} {}, $0, {}", Instr::Bne, text, label);
            }
        }
    }

    pub(crate) fn next_label_num(&mut self) -> usize {
        let num = self.label_num;
        self.label_num += 1;
        num
    }

    // Program glue

    fn pregen(&mut self) {
        self.push("\t.section .mdebug.abi32\n");
        self.push("\t.previous\n");
        self.push("\t.nan\tlegacy\n");
        self.push("\t.module fp=xx\n");
        self.push("\t.module nooddspreg\n");
        self.push("\t.abicalls\n");
        self.push("\t.option pic0\n");
        self.push("\t.text\n");
        self.push("\t.align 2\n");

        self.push("\n\t.globl\tmain\n");
        self.push("\t.ent\tmain\n");
        self.push("\t.type\tmain, @function\n");
        self.push("main:\n");

        // "__gnu_local_gp" holds the global pointer
        self.push("\tlui $gp, %hi(__gnu_local_gp)\n");
        self.push("\taddiu $gp, $gp, %lo(__gnu_local_gp)\n");

        self.to_code_2r(Instr::Move, Reg::Fp, Reg::Sp);
        self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, -(WORD_LENGTH as i32));
        self.to_code_r_i_r(Instr::Sw, Reg::Ra, 0, Reg::Fp);
        self.to_code_r_i(Instr::Li, Reg::T0, LOW_DYN_BORDER as i64);
        self.to_code_r_i_r(
            Instr::Sw,
            Reg::T0,
            -(HEAP_DISPL as i32) - 60,
            Reg::Gp,
        );
        self.push("\n");
    }

    /// One `.rdata` entry per string literal, split at `%` specifiers
    /// into sibling labels `STRING<i + k*amount>` so `printf` can stitch
    /// them back together
    fn strings_declaration(&mut self) {
        self.push("\t.rdata\n");
        self.push("\t.align 2\n");

        let amount = self.unit.strings_amount();
        for index in 0..amount {
            let string: Vec<char> = self.unit.string(index).chars().collect();
            let mut args_for_printf = 0;

            let _ = write!(self.out, "{}", Label::new(LabelKind::Str, index));
            self.push("\t.ascii \"");

            let mut position = 0;
            while position < string.len() {
                let ch = string[position];
                if ch == '\n' {
                    self.push("\\n");
                } else if ch == '%' && position + 1 < string.len() {
                    args_for_printf += 1;
                    position += 1;

                    self.out.push(ch);
                    self.out.push(string[position]);

                    self.push("\\0\"\n");
                    let label = Label::new(LabelKind::Str, index + args_for_printf * amount);
                    let _ = write!(self.out, "{}", label);
                    self.push("\t.ascii \"");
                } else {
                    self.out.push(ch);
                }
                position += 1;
            }

            self.push("\\0\"\n");
        }

        self.push("\t.text\n");
        self.push("\t.align 2\n\n");
    }

    fn postgen(&mut self) {
        let _ = writeln!(
            self.out,
            "\n\t{} {}",
            Instr::Jal,
            Label::new(LabelKind::Func, self.unit.main_id)
        );
        self.to_code_r_i_r(Instr::Lw, Reg::Ra, 0, Reg::Fp);
        self.to_code_r(Instr::Jr, Reg::Ra);
    }
}
