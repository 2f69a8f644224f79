//! Expression emission
//!
//! Every expression produces an rvalue. Lvalue-shaped expressions go
//! through [`Codegen::emit_lvalue`] and are loaded on demand; everything
//! else is dispatched by node class. Binary operations pick immediate
//! instruction forms where the ISA has them and materialize constants
//! where it does not.

use crate::asm::{Instr, Reg, ARG_REGS, FARG_REGS, FTEMP_REGS, TEMP_REGS};
use crate::displ::value_size_in_bytes;
use crate::value::{ConstValue, Label, LabelKind, Lvalue, Rvalue};
use crate::{Codegen, CodegenError, ARG_REG_AMOUNT, WORD_LENGTH};
use mcc_frontend::{
    BinaryOp, Expression, ExpressionKind, Literal, Type, UnaryOp, BEGIN_USER_FUNC, BI_PRINTF,
};
use std::fmt::Write;

/// Operations whose constant operand is loaded into a register because
/// the ISA has no immediate form
const MATERIALIZE_CONST_OPS: [BinaryOp; 5] = [
    BinaryOp::Sub,
    BinaryOp::Div,
    BinaryOp::Mul,
    BinaryOp::Rem,
    BinaryOp::Div,
];

fn is_commutative(operation: BinaryOp) -> bool {
    matches!(
        operation,
        BinaryOp::Add | BinaryOp::Mul | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor
    )
}

/// Reverse a relational operation
fn reverse_logic_command(operation: BinaryOp) -> BinaryOp {
    match operation {
        BinaryOp::Lt => BinaryOp::Ge,
        BinaryOp::Gt => BinaryOp::Le,
        BinaryOp::Le => BinaryOp::Gt,
        BinaryOp::Ge => BinaryOp::Lt,
        BinaryOp::Eq => BinaryOp::Ne,
        _ => BinaryOp::Eq,
    }
}

/// Instruction for a binary operation, by operand form and type
fn get_bin_instruction(operation: BinaryOp, is_imm: bool, is_float: bool) -> Instr {
    match operation.without_assignment() {
        BinaryOp::Add if is_float => Instr::AddS,
        BinaryOp::Add => {
            if is_imm {
                Instr::Addi
            } else {
                Instr::Add
            }
        }
        BinaryOp::Sub if is_float => Instr::SubS,
        BinaryOp::Sub => Instr::Sub,
        BinaryOp::Mul if is_float => Instr::MulS,
        BinaryOp::Mul => Instr::Mul,
        BinaryOp::Div if is_float => Instr::DivS,
        BinaryOp::Div => Instr::Div,
        BinaryOp::Rem => Instr::Mod,
        BinaryOp::Shl => {
            if is_imm {
                Instr::Sll
            } else {
                Instr::Sllv
            }
        }
        BinaryOp::Shr => {
            if is_imm {
                Instr::Sra
            } else {
                Instr::Srav
            }
        }
        BinaryOp::And => {
            if is_imm {
                Instr::Andi
            } else {
                Instr::And
            }
        }
        BinaryOp::Xor => {
            if is_imm {
                Instr::Xori
            } else {
                Instr::Xor
            }
        }
        BinaryOp::Or => {
            if is_imm {
                Instr::Ori
            } else {
                Instr::Or
            }
        }
        _ => Instr::Nop,
    }
}

/// Branch taken when the subtracted comparison result satisfies the
/// relation
fn comparison_branch(operation: BinaryOp) -> Instr {
    match operation {
        BinaryOp::Gt => Instr::Bgtz,
        BinaryOp::Lt => Instr::Bltz,
        BinaryOp::Ge => Instr::Bgez,
        BinaryOp::Le => Instr::Blez,
        BinaryOp::Eq => Instr::Beq,
        _ => Instr::Bne,
    }
}

/// Ordinal of a temporary within its bank, for picking the lower of two
/// result candidates
fn reg_ordinal(reg: Reg) -> usize {
    TEMP_REGS
        .iter()
        .chain(FTEMP_REGS.iter())
        .position(|&r| r == reg)
        .unwrap_or(usize::MAX)
}

impl Codegen<'_> {
    /// Load a constant rvalue into a fresh register; register rvalues
    /// pass through
    pub(crate) fn materialize(&mut self, rvalue: Rvalue) -> Rvalue {
        if !rvalue.is_const() {
            return rvalue;
        }
        let reg = if rvalue.ty().is_floating() {
            self.bank.get_fpr()
        } else {
            self.bank.get_gpr()
        };
        let result = Rvalue::reg(reg, rvalue.ty().clone());
        self.emit_store_rvalue_to_rvalue(&result, &rvalue);
        result
    }

    /// The register an rvalue lives in, materializing first if needed
    fn register_of(&mut self, rvalue: Rvalue) -> (Reg, Rvalue) {
        let rvalue = self.materialize(rvalue);
        let reg = rvalue.register().unwrap_or(Reg::Zero);
        (reg, rvalue)
    }

    /// Loads an lvalue and forms an rvalue. A register-resident variable
    /// stays where it is; a stack slot is loaded into a fresh temporary
    /// and the slot's base register (a subscript or indirection
    /// temporary) is released.
    pub(crate) fn emit_load_of_lvalue(&mut self, lval: Lvalue) -> Rvalue {
        match lval {
            Lvalue::Register { reg, ty } => Rvalue::pinned(reg, ty),
            Lvalue::Stack { base, displ, ty } => {
                if ty.is_structure() {
                    // aggregates travel by address
                    let reg = self.bank.get_gpr();
                    self.to_code_2r_i(Instr::Addi, reg, base, displ);
                    self.bank.free(base);
                    return Rvalue::reg(reg, ty);
                }

                let is_float = ty.is_floating();
                let reg = if is_float {
                    self.bank.get_fpr()
                } else {
                    self.bank.get_gpr()
                };
                let instr = if is_float { Instr::LS } else { Instr::Lw };
                self.to_code_r_i_r(instr, reg, displ, base);
                self.bank.free(base);
                Rvalue::reg(reg, ty)
            }
        }
    }

    /// Store an rvalue into a storage location; aggregates are copied
    /// member by member
    pub(crate) fn emit_store_of_rvalue(&mut self, rval: Rvalue, lval: Lvalue) -> Lvalue {
        let was_const = rval.is_const();
        let rval = self.materialize(rval);

        match &lval {
            Lvalue::Register { reg, .. } => {
                let instr = if rval.ty().is_floating() {
                    Instr::MovS
                } else {
                    Instr::Move
                };
                let text = self.rvalue_text(&rval);
                let _ = writeln!(self.out, "\t{} {}, {}", instr, reg, text);
            }
            Lvalue::Stack { base, displ, ty } => {
                if !ty.is_structure() && !ty.is_array() {
                    let instr = if rval.ty().is_floating() {
                        Instr::SS
                    } else {
                        Instr::Sw
                    };
                    let text = self.rvalue_text(&rval);
                    let _ = writeln!(self.out, "\t{} {}, {}({})", instr, text, displ, base);
                } else {
                    // the source register holds the aggregate's address
                    let source = rval.register().unwrap_or(Reg::Zero);
                    let base = *base;
                    let displ = *displ;
                    let mut offset = 0i32;
                    for index in 0..ty.member_amount() {
                        let member_ty = ty.member_type(index).clone();
                        let member_size = value_size_in_bytes(&member_ty) as i32;
                        let is_float = member_ty.is_floating();

                        let elem = if is_float {
                            self.bank.get_fpr()
                        } else {
                            self.bank.get_gpr()
                        };
                        let load = if is_float { Instr::LS } else { Instr::Lw };
                        let store = if is_float { Instr::SS } else { Instr::Sw };
                        self.to_code_r_i_r(load, elem, offset, source);
                        self.to_code_r_i_r(store, elem, displ + offset, base);
                        self.bank.free(elem);

                        offset += member_size;
                    }
                }
            }
        }

        // a register loaded here only to carry the constant goes back
        if was_const {
            self.bank.free_rvalue(&rval);
        }
        lval
    }

    /// Store an rvalue into a register-kind rvalue
    pub(crate) fn emit_store_rvalue_to_rvalue(&mut self, destination: &Rvalue, source: &Rvalue) {
        let Some(dest_reg) = destination.register() else {
            return;
        };

        match source {
            Rvalue::Const { .. } => {
                let instr = if source.ty().is_floating() {
                    Instr::LiS
                } else {
                    Instr::Li
                };
                let text = self.rvalue_text(source);
                let _ = writeln!(self.out, "\t{} {}, {}", instr, dest_reg, text);
            }
            Rvalue::Register { reg, ty, .. } => {
                if *reg == dest_reg {
                    let _ = writeln!(self.out, "\t# value stays in {}", dest_reg);
                } else {
                    match ty {
                        Type::Floating => self.to_code_2r(Instr::MovS, dest_reg, *reg),
                        Type::Structure(_) => {}
                        // an array register carries a displacement word
                        _ => self.to_code_2r(Instr::Move, dest_reg, *reg),
                    }
                }
            }
            Rvalue::Void => {}
        }
    }

    // Lvalues

    pub(crate) fn emit_lvalue(&mut self, expr: &Expression) -> Result<Lvalue, CodegenError> {
        match &expr.kind {
            ExpressionKind::Identifier(id) => Ok(self.displacements.get(&self.unit.symbols, *id)),

            ExpressionKind::Subscript { base, index } => {
                let base_value = self.emit_expression(base)?;
                let index_value = self.emit_expression(index)?;
                // the sum becomes the base register of the new location
                let result = self.emit_binary_operation(base_value, index_value, BinaryOp::Add);
                let (reg, _) = self.register_of(result);
                Ok(Lvalue::Stack {
                    base: reg,
                    displ: 0,
                    ty: expr.ty.clone(),
                })
            }

            ExpressionKind::Member {
                base,
                member_index,
                is_arrow,
            } => {
                let base_ty = base.ty.clone();
                let struct_ty = if *is_arrow {
                    base_ty.element_type().clone()
                } else {
                    base_ty
                };

                let member_displ: i32 = (0..*member_index)
                    .map(|index| struct_ty.member_type(index).type_size())
                    .sum::<usize>() as i32;

                if *is_arrow {
                    let pointer = self.emit_expression(base)?;
                    let (reg, _) = self.register_of(pointer);
                    Ok(Lvalue::Stack {
                        base: reg,
                        displ: member_displ,
                        ty: expr.ty.clone(),
                    })
                } else {
                    match self.emit_lvalue(base)? {
                        Lvalue::Stack { base, displ, .. } => Ok(Lvalue::Stack {
                            base,
                            displ: displ + member_displ,
                            ty: expr.ty.clone(),
                        }),
                        Lvalue::Register { reg, .. } => Ok(Lvalue::Stack {
                            base: reg,
                            displ: member_displ,
                            ty: expr.ty.clone(),
                        }),
                    }
                }
            }

            ExpressionKind::Unary {
                op: UnaryOp::Indirection,
                operand,
            } => {
                let base = self.emit_expression(operand)?;
                let (reg, _) = self.register_of(base);
                Ok(Lvalue::Stack {
                    base: reg,
                    displ: 0,
                    ty: expr.ty.clone(),
                })
            }

            _ => Err(CodegenError::NotAnLvalue),
        }
    }

    // Rvalues

    pub(crate) fn emit_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        if expr.is_lvalue() {
            let lval = self.emit_lvalue(expr)?;
            return Ok(self.emit_load_of_lvalue(lval));
        }

        match &expr.kind {
            ExpressionKind::Cast { .. } => self.emit_cast_expression(expr),
            ExpressionKind::Literal(_) => Ok(self.emit_literal_expression(expr)),
            ExpressionKind::Call { .. } => self.emit_call_expression(expr),
            ExpressionKind::Unary { .. } => self.emit_unary_expression(expr),
            ExpressionKind::Binary { .. } => self.emit_binary_expression(expr),
            ExpressionKind::Assignment { .. } => self.emit_assignment_expression(expr),
            ExpressionKind::Ternary { .. } => self.emit_ternary_expression(expr),
            _ => Ok(Rvalue::Void),
        }
    }

    /// A computed value discarded for its effects
    pub(crate) fn emit_void_expression(&mut self, expr: &Expression) -> Result<(), CodegenError> {
        if expr.is_lvalue() {
            // a register variable or a stack slot; nothing to release
            self.emit_lvalue(expr)?;
        } else {
            let result = self.emit_expression(expr)?;
            self.bank.free_rvalue(&result);
        }
        Ok(())
    }

    /// A condition value; floating conditions are converted to a word
    pub(crate) fn emit_boolean_expression(
        &mut self,
        expr: &Expression,
    ) -> Result<Rvalue, CodegenError> {
        let value = self.emit_expression(expr)?;

        if !value.ty().is_floating() {
            return Ok(value);
        }

        if let Rvalue::Const {
            value: ConstValue::Float(float),
            ..
        } = &value
        {
            return Ok(Rvalue::int(if *float != 0.0 { 1 } else { 0 }));
        }

        let (value_reg, value) = self.register_of(value);
        let result = self.bank.get_gpr();
        self.to_code_2r(Instr::CvtWS, value_reg, value_reg);
        self.to_code_2r(Instr::Mfc1, result, value_reg);
        self.bank.free_rvalue(&value);
        Ok(Rvalue::reg(result, Type::Integer))
    }

    fn emit_literal_expression(&self, expr: &Expression) -> Rvalue {
        let ExpressionKind::Literal(literal) = &expr.kind else {
            return Rvalue::Void;
        };
        let value = match literal {
            Literal::Boolean(flag) => ConstValue::Int(i32::from(*flag)),
            Literal::Character(ch) => ConstValue::Int(*ch as i32),
            Literal::Integer(int) => ConstValue::Int(*int),
            Literal::Floating(float) => ConstValue::Float(*float),
            Literal::String(index) => ConstValue::Str(*index),
        };
        Rvalue::Const {
            value,
            ty: expr.ty.clone(),
        }
    }

    fn emit_cast_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        let ExpressionKind::Cast { operand } = &expr.kind else {
            return Ok(Rvalue::Void);
        };
        let operand_rvalue = self.emit_expression(operand)?;

        if !expr.ty.is_floating() {
            // char -> int behaves exactly like the integer type
            return Ok(operand_rvalue.with_type(Type::Integer));
        }

        // int -> float through the coprocessor
        let (operand_reg, operand_rvalue) = self.register_of(operand_rvalue);
        let result = self.bank.get_fpr();
        self.to_code_2r(Instr::Mtc1, operand_reg, result);
        self.to_code_2r(Instr::CvtSW, result, result);
        self.bank.free_rvalue(&operand_rvalue);

        Ok(Rvalue::reg(result, Type::Floating))
    }

    // Binary operations

    /// Emit a binary operation over two rvalues. Logical connectives are
    /// handled by the caller; comparisons arrive already reversed.
    pub(crate) fn emit_binary_operation(
        &mut self,
        mut rval1: Rvalue,
        mut rval2: Rvalue,
        operation: BinaryOp,
    ) -> Rvalue {
        if rval1.is_const() && rval2.is_const() {
            rval1 = self.materialize(rval1);
        }

        if rval1.is_const() || rval2.is_const() {
            if operation.is_comparison() {
                rval1 = self.materialize(rval1);
                rval2 = self.materialize(rval2);
                return self.emit_comparison(rval1, rval2, operation);
            }

            let is_float = rval1.ty().is_floating() || rval2.ty().is_floating();
            if is_float {
                // no immediate forms on the FPU
                rval1 = self.materialize(rval1);
                rval2 = self.materialize(rval2);
                return self.emit_binary_register(rval1, rval2, operation);
            }

            if rval1.is_const() {
                if is_commutative(operation) {
                    std::mem::swap(&mut rval1, &mut rval2);
                } else {
                    // no subi and friends; the left constant goes to a
                    // register
                    rval1 = self.materialize(rval1);
                    return self.emit_binary_register(rval1, rval2, operation);
                }
            }

            if MATERIALIZE_CONST_OPS.contains(&operation) {
                rval2 = self.materialize(rval2);
                return self.emit_binary_register(rval1, rval2, operation);
            }
            return self.emit_binary_immediate(rval1, rval2, operation);
        }

        if operation.is_comparison() {
            self.emit_comparison(rval1, rval2, operation)
        } else {
            self.emit_binary_register(rval1, rval2, operation)
        }
    }

    /// Result register for two register operands: reuse the lower
    /// temporary, never a named variable's register
    fn select_result(&mut self, rval1: &Rvalue, rval2: &Rvalue) -> (Reg, Option<Rvalue>) {
        let r1 = rval1.register().unwrap_or(Reg::Zero);
        let r2 = rval2.register().unwrap_or(Reg::Zero);
        match (rval1.from_lvalue(), rval2.from_lvalue()) {
            (false, false) => {
                if reg_ordinal(r1) > reg_ordinal(r2) {
                    (r2, Some(rval1.clone()))
                } else {
                    (r1, Some(rval2.clone()))
                }
            }
            (true, false) => (r2, None),
            (false, true) => (r1, None),
            (true, true) => {
                let reg = if rval1.ty().is_floating() {
                    self.bank.get_fpr()
                } else {
                    self.bank.get_gpr()
                };
                (reg, None)
            }
        }
    }

    fn emit_binary_register(
        &mut self,
        rval1: Rvalue,
        rval2: Rvalue,
        operation: BinaryOp,
    ) -> Rvalue {
        let (result, freeing) = self.select_result(&rval1, &rval2);
        let result_rvalue = Rvalue::reg(result, rval1.ty().clone());

        let is_float = rval1.ty().is_floating();
        let instr = get_bin_instruction(operation, false, is_float);
        let first = self.rvalue_text(&rval1);
        let second = self.rvalue_text(&rval2);
        let _ = writeln!(self.out, "\t{} {}, {}, {}", instr, result, first, second);

        if let Some(freeing) = freeing {
            self.bank.free_rvalue(&freeing);
        }
        result_rvalue
    }

    fn emit_binary_immediate(
        &mut self,
        rval1: Rvalue,
        rval2: Rvalue,
        operation: BinaryOp,
    ) -> Rvalue {
        let result = if rval1.from_lvalue() {
            self.bank.get_gpr()
        } else {
            rval1.register().unwrap_or(Reg::Zero)
        };
        let result_rvalue = Rvalue::reg(result, rval1.ty().clone());

        let instr = get_bin_instruction(operation, true, false);
        let first = self.rvalue_text(&rval1);
        let second = self.rvalue_text(&rval2);
        let _ = writeln!(self.out, "\t{} {}, {}, {}", instr, result, first, second);
        result_rvalue
    }

    /// Subtract-and-branch lowering producing 0/1; `operation` is the
    /// reversed relation, so the else path materializes 0
    fn emit_comparison(&mut self, rval1: Rvalue, rval2: Rvalue, operation: BinaryOp) -> Rvalue {
        let (result, freeing) = self.select_result(&rval1, &rval2);
        let result_rvalue = Rvalue::reg(result, Type::Integer);

        let num = self.next_label_num();
        let label_else = Label::new(LabelKind::Else, num);
        let label_end = Label::new(LabelKind::End, num);

        let first = self.rvalue_text(&rval1);
        let second = self.rvalue_text(&rval2);
        let _ = writeln!(self.out, "\t{} {}, {}, {}", Instr::Sub, result, first, second);

        let branch = comparison_branch(operation);
        match branch {
            Instr::Beq | Instr::Bne => {
                let _ = writeln!(self.out, "\t{} {}, $0, {}", branch, result, label_else);
            }
            _ => {
                let _ = writeln!(self.out, "\t{} {}, {}", branch, result, label_else);
            }
        }

        self.to_code_r_i(Instr::Li, result, 1);
        self.emit_unconditional_branch(label_end);
        self.emit_label_declaration(label_else);
        self.to_code_r_i(Instr::Li, result, 0);
        self.emit_label_declaration(label_end);
        self.push("\n");

        if let Some(freeing) = freeing {
            self.bank.free_rvalue(&freeing);
        }
        result_rvalue
    }

    /// Relational operators; the relation is reversed so the branch
    /// pattern falls through to 1 exactly when the original holds
    fn emit_logic_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        let ExpressionKind::Binary { op, lhs, rhs } = &expr.kind else {
            return Ok(Rvalue::Void);
        };

        let lhs_rvalue = self.emit_expression(lhs)?;
        let operation = reverse_logic_command(*op);
        let rhs_rvalue = self.emit_expression(rhs)?;

        Ok(self.emit_binary_operation(lhs_rvalue, rhs_rvalue, operation))
    }

    fn emit_integral_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        let ExpressionKind::Binary { op, lhs, rhs } = &expr.kind else {
            return Ok(Rvalue::Void);
        };

        let lhs_rvalue = self.emit_expression(lhs)?;
        let rhs_rvalue = self.emit_expression(rhs)?;
        Ok(self.emit_binary_operation(lhs_rvalue, rhs_rvalue, *op))
    }

    fn emit_binary_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        let ExpressionKind::Binary { op, lhs, rhs } = &expr.kind else {
            return Ok(Rvalue::Void);
        };

        match op {
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::Xor
            | BinaryOp::Or => self.emit_integral_expression(expr),

            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne => self.emit_logic_expression(expr),

            BinaryOp::LogOr | BinaryOp::LogAnd => {
                let num = self.next_label_num();
                let label_end = Label::new(LabelKind::End, num);

                let lhs_rvalue = self.emit_expression(lhs)?;
                let result_rvalue = self.materialize(lhs_rvalue);

                // short circuit: the left value survives in the result
                let branch = if *op == BinaryOp::LogOr {
                    Instr::Bne
                } else {
                    Instr::Beq
                };
                let text = self.rvalue_text(&result_rvalue);
                let _ = writeln!(self.out, "\t{} {}, $0, {}", branch, text, label_end);

                let rhs_rvalue = self.emit_expression(rhs)?;
                self.emit_store_rvalue_to_rvalue(&result_rvalue, &rhs_rvalue);
                self.bank.free_rvalue(&rhs_rvalue);

                self.emit_label_declaration(label_end);
                Ok(result_rvalue)
            }

            _ => Ok(Rvalue::Void),
        }
    }

    // Unary operations

    fn emit_inc_dec_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        let ExpressionKind::Unary { op, operand } = &expr.kind else {
            return Ok(Rvalue::Void);
        };

        let identifier_lvalue = self.emit_lvalue(operand)?;
        let identifier_rvalue = self.emit_load_of_lvalue(identifier_lvalue.clone());

        let post_result_reg = self.bank.get_gpr();
        let post_result_rvalue = Rvalue::pinned(post_result_reg, identifier_lvalue.ty().clone());

        if matches!(op, UnaryOp::PostInc | UnaryOp::PostDec) {
            self.emit_store_rvalue_to_rvalue(&post_result_rvalue, &identifier_rvalue);
        }

        let delta = match op {
            UnaryOp::PreDec | UnaryOp::PostDec => Rvalue::int(-1),
            _ => Rvalue::int(1),
        };
        let updated = self.emit_binary_operation(identifier_rvalue.clone(), delta, BinaryOp::Add);

        if matches!(identifier_lvalue, Lvalue::Stack { .. }) {
            self.emit_store_of_rvalue(updated.clone(), identifier_lvalue);
        }

        if matches!(op, UnaryOp::PostInc | UnaryOp::PostDec) {
            self.bank.free_rvalue(&updated);
            Ok(post_result_rvalue)
        } else {
            self.bank.free(post_result_reg);
            Ok(updated)
        }
    }

    fn emit_unary_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        let ExpressionKind::Unary { op, operand } = &expr.kind else {
            return Ok(Rvalue::Void);
        };

        match op {
            UnaryOp::PostInc | UnaryOp::PostDec | UnaryOp::PreInc | UnaryOp::PreDec => {
                self.emit_inc_dec_expression(expr)
            }

            UnaryOp::Minus => {
                let operand_rvalue = self.emit_expression(operand)?;
                let zero = Rvalue::pinned(Reg::Zero, Type::Integer);
                Ok(self.emit_binary_operation(zero, operand_rvalue, BinaryOp::Sub))
            }

            UnaryOp::Not => {
                let operand_rvalue = self.emit_expression(operand)?;
                Ok(self.emit_binary_operation(operand_rvalue, Rvalue::int(-1), BinaryOp::Xor))
            }

            UnaryOp::LogNot => {
                let operand_rvalue = self.emit_expression(operand)?;
                let (operand_reg, operand_rvalue) = self.register_of(operand_rvalue);

                let num = self.next_label_num();
                let label_else = Label::new(LabelKind::Else, num);
                let label_end = Label::new(LabelKind::End, num);

                let result = self.bank.get_gpr();
                let _ = writeln!(self.out, "\t{} {}, $0, {}", Instr::Bne, operand_reg, label_else);
                self.to_code_r_i(Instr::Li, result, 1);
                self.emit_unconditional_branch(label_end);
                self.emit_label_declaration(label_else);
                self.to_code_r_i(Instr::Li, result, 0);
                self.emit_label_declaration(label_end);
                self.push("\n");

                self.bank.free_rvalue(&operand_rvalue);
                Ok(Rvalue::reg(result, Type::Boolean))
            }

            UnaryOp::Abs => {
                let operand_rvalue = self.emit_expression(operand)?;
                let (operand_reg, operand_rvalue) = self.register_of(operand_rvalue);

                let num = self.next_label_num();
                let label_end = Label::new(LabelKind::End, num);

                let _ = writeln!(self.out, "\n\t{} {}, {}", Instr::Bgez, operand_reg, label_end);
                let zero = Rvalue::pinned(Reg::Zero, Type::Integer);
                let result = self.emit_binary_operation(zero, operand_rvalue, BinaryOp::Sub);
                self.emit_label_declaration(label_end);
                Ok(result)
            }

            UnaryOp::Address => {
                let operand_lvalue = self.emit_lvalue(operand)?;
                let result = self.bank.get_gpr();

                if let Lvalue::Stack { base, displ, .. } = operand_lvalue {
                    let _ = writeln!(
                        self.out,
                        "\n\t{} {}, {}, {}",
                        Instr::Addi,
                        result,
                        base,
                        displ
                    );
                }
                Ok(Rvalue::reg(result, Type::Integer))
            }

            UnaryOp::Indirection => {
                // handled by the lvalue path
                let lval = self.emit_lvalue(expr)?;
                Ok(self.emit_load_of_lvalue(lval))
            }
        }
    }

    fn emit_assignment_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        let ExpressionKind::Assignment { op, lhs, rhs } = &expr.kind else {
            return Ok(Rvalue::Void);
        };

        let lhs_lvalue = self.emit_lvalue(lhs)?;
        let mut rhs_rvalue = self.emit_expression(rhs)?;

        if *op != BinaryOp::Assign {
            let lhs_rvalue = self.emit_load_of_lvalue(lhs_lvalue.clone());
            rhs_rvalue = self.emit_binary_operation(
                lhs_rvalue.clone(),
                rhs_rvalue,
                op.without_assignment(),
            );
            self.bank.free_rvalue(&lhs_rvalue);
        }

        self.emit_store_of_rvalue(rhs_rvalue.clone(), lhs_lvalue);
        Ok(rhs_rvalue)
    }

    fn emit_ternary_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        let ExpressionKind::Ternary {
            condition,
            then_expr,
            else_expr,
        } = &expr.kind
        else {
            return Ok(Rvalue::Void);
        };

        self.push("\n\t# ternary expression:\n");
        let num = self.next_label_num();
        let label_else = Label::new(LabelKind::Else, num);
        let label_end = Label::new(LabelKind::End, num);

        let condition_rvalue = self.emit_boolean_expression(condition)?;
        self.emit_conditional_branch(&condition_rvalue, label_else);
        self.bank.free_rvalue(&condition_rvalue);

        let result_reg = if expr.ty.is_floating() {
            self.bank.get_fpr()
        } else {
            self.bank.get_gpr()
        };
        let result_rvalue = Rvalue::reg(result_reg, expr.ty.clone());

        let lhs_rvalue = self.emit_expression(then_expr)?;
        self.emit_store_rvalue_to_rvalue(&result_rvalue, &lhs_rvalue);
        self.bank.free_rvalue(&lhs_rvalue);

        self.emit_unconditional_branch(label_end);
        self.emit_label_declaration(label_else);

        let rhs_rvalue = self.emit_expression(else_expr)?;
        self.emit_store_rvalue_to_rvalue(&result_rvalue, &rhs_rvalue);
        self.bank.free_rvalue(&rhs_rvalue);

        self.emit_label_declaration(label_end);
        self.push("\n");
        Ok(result_rvalue)
    }

    // Calls

    fn emit_call_expression(&mut self, expr: &Expression) -> Result<Rvalue, CodegenError> {
        let ExpressionKind::Call { callee, arguments } = &expr.kind else {
            return Ok(Rvalue::Void);
        };

        let return_type = self
            .unit
            .symbols
            .get_type(*callee)
            .return_type()
            .clone();
        let spelling = self.unit.symbols.spelling(*callee).to_string();
        let _ = writeln!(self.out, "\t# \"{}\" function call:", spelling);

        if *callee == BI_PRINTF {
            self.emit_printf_expression(arguments)?;
        } else {
            self.emit_user_call(*callee, arguments)?;
        }

        let result_reg = if return_type.is_floating() {
            Reg::Fv0
        } else {
            Reg::V0
        };
        Ok(Rvalue::reg(result_reg, return_type))
    }

    fn emit_user_call(
        &mut self,
        callee: mcc_frontend::SymbolId,
        arguments: &[Expression],
    ) -> Result<(), CodegenError> {
        let displ_for_parameters = (arguments.len() * WORD_LENGTH) as i32;

        self.push("\t# setting up $fp:\n");
        if displ_for_parameters != 0 {
            self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, -displ_for_parameters);
        }

        self.push("\n\t# parameters passing:\n");

        let mut arg_count = 0;
        let mut f_arg_count = 0;
        let mut prev_arg_displ: Vec<Lvalue> = Vec::new();

        for (index, argument) in arguments.iter().enumerate() {
            let arg_rvalue = self.emit_expression(argument)?;
            let is_float = arg_rvalue.ty().is_floating();
            let slot_taken = if is_float { f_arg_count } else { arg_count };

            let tmp_arg_lvalue = Lvalue::Stack {
                base: Reg::Fp,
                displ: (index * WORD_LENGTH) as i32,
                ty: arg_rvalue.ty().clone(),
            };

            if slot_taken < ARG_REG_AMOUNT {
                let arg_reg = if is_float {
                    FARG_REGS[f_arg_count / 2]
                } else {
                    ARG_REGS[arg_count]
                };
                let _ = writeln!(self.out, "\t# saving {} value on stack:", arg_reg);

                // park the current argument register in its slot, then
                // move the value in
                let saved = self.emit_store_of_rvalue(
                    Rvalue::reg(arg_reg, arg_rvalue.ty().clone()),
                    tmp_arg_lvalue,
                );
                let target = Rvalue::pinned(arg_reg, arg_rvalue.ty().clone());
                self.emit_store_rvalue_to_rvalue(&target, &arg_rvalue);
                prev_arg_displ.push(saved);
            } else {
                self.push("\t# parameter on stack:\n");
                self.emit_store_of_rvalue(arg_rvalue.clone(), tmp_arg_lvalue);
            }

            if is_float {
                f_arg_count += 2;
            } else {
                arg_count += 1;
            }

            self.bank.free_rvalue(&arg_rvalue);
        }

        if callee >= BEGIN_USER_FUNC {
            let _ = writeln!(
                self.out,
                "\n\t{} {}",
                Instr::Jal,
                Label::new(LabelKind::Func, callee)
            );
        }

        // argument registers may be needed again
        self.push("\n\t# data restoring:\n");

        let mut int_index = 0;
        let mut float_index = 0;
        for slot in prev_arg_displ {
            self.push("\n");
            let is_float = slot.ty().is_floating();
            let reg = if is_float {
                let reg = FARG_REGS[float_index];
                float_index += 1;
                reg
            } else {
                let reg = ARG_REGS[int_index];
                int_index += 1;
                reg
            };

            let tmp_rvalue = self.emit_load_of_lvalue(slot);
            let target = Rvalue::pinned(reg, tmp_rvalue.ty().clone());
            self.emit_store_rvalue_to_rvalue(&target, &tmp_rvalue);
            self.bank.free_rvalue(&tmp_rvalue);
        }

        if displ_for_parameters != 0 {
            self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, displ_for_parameters);
        }
        self.push("\n");
        Ok(())
    }

    /// Built-in `printf`: one call per format fragment, threading the
    /// argument through `$a1` (and `$a2` for floats widened to double)
    fn emit_printf_expression(&mut self, arguments: &[Expression]) -> Result<(), CodegenError> {
        let string_index = match &arguments[0].kind {
            ExpressionKind::Literal(Literal::String(index)) => *index,
            _ => 0,
        };
        let amount = self.unit.strings_amount();

        for (ordinal, argument) in arguments.iter().enumerate().skip(1) {
            let arg_rvalue = self.emit_expression(argument)?;
            let is_float = arg_rvalue.ty().is_floating();
            let arg_rvalue = self.materialize(arg_rvalue);

            let reserve = (WORD_LENGTH * if is_float { 3 } else { 2 }) as i32;
            self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, -reserve);
            self.push("\n");

            let a0_lval = self.emit_store_of_rvalue(
                Rvalue::reg(Reg::A0, Type::Integer),
                Lvalue::Stack {
                    base: Reg::Fp,
                    displ: 0,
                    ty: Type::Integer,
                },
            );
            let a1_lval = self.emit_store_of_rvalue(
                Rvalue::reg(Reg::A1, Type::Integer),
                Lvalue::Stack {
                    base: Reg::Fp,
                    displ: WORD_LENGTH as i32,
                    ty: Type::Integer,
                },
            );

            let fragment = Label::new(LabelKind::Str, string_index + (ordinal - 1) * amount);

            if !is_float {
                self.push("\n");
                let target = Rvalue::pinned(Reg::A1, Type::Integer);
                self.emit_store_rvalue_to_rvalue(&target, &arg_rvalue);

                let _ = writeln!(self.out, "\tlui $t1, %hi({})", fragment);
                let _ = writeln!(self.out, "\taddiu $a0, $t1, %lo({})", fragment);
                self.push("\tjal printf\n\tnop\n");

                self.bank.free_rvalue(&arg_rvalue);
                self.push("\n\t# data restoring:\n");
            } else {
                let a2_lval = self.emit_store_of_rvalue(
                    Rvalue::reg(Reg::A2, Type::Integer),
                    Lvalue::Stack {
                        base: Reg::Fp,
                        displ: 2 * WORD_LENGTH as i32,
                        ty: Type::Integer,
                    },
                );
                self.push("\n");

                let arg_reg = arg_rvalue.register().unwrap_or(Reg::Fv0);
                // single to double, split across $a1/$a2
                self.to_code_2r(Instr::CvtDS, arg_reg, arg_reg);
                self.to_code_2r(Instr::Mfc1, Reg::A1, arg_reg);
                self.to_code_2r(Instr::Mfhc1, Reg::A2, arg_reg);

                let _ = writeln!(self.out, "\tlui $t1, %hi({})", fragment);
                let _ = writeln!(self.out, "\taddiu $a0, $t1, %lo({})", fragment);
                self.push("\tjal printf\n\tnop\n");

                self.push("\n\t# data restoring:\n");
                let a2_rvalue = self.emit_load_of_lvalue(a2_lval);
                let target = Rvalue::pinned(Reg::A2, Type::Integer);
                self.emit_store_rvalue_to_rvalue(&target, &a2_rvalue);
                self.bank.free_rvalue(&a2_rvalue);
                self.bank.free_rvalue(&arg_rvalue);
                self.push("\n");
            }

            let a0_rvalue = self.emit_load_of_lvalue(a0_lval);
            let target = Rvalue::pinned(Reg::A0, Type::Integer);
            self.emit_store_rvalue_to_rvalue(&target, &a0_rvalue);
            self.bank.free_rvalue(&a0_rvalue);
            self.push("\n");

            let a1_rvalue = self.emit_load_of_lvalue(a1_lval);
            let target = Rvalue::pinned(Reg::A1, Type::Integer);
            self.emit_store_rvalue_to_rvalue(&target, &a1_rvalue);
            self.bank.free_rvalue(&a1_rvalue);
            self.push("\n");

            self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, reserve);
            self.push("\n");
        }

        // trailing fragment after the last conversion
        self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, -(WORD_LENGTH as i32));
        let a0_lval = self.emit_store_of_rvalue(
            Rvalue::reg(Reg::A0, Type::Integer),
            Lvalue::Stack {
                base: Reg::Fp,
                displ: 0,
                ty: Type::Integer,
            },
        );

        let fragment = Label::new(
            LabelKind::Str,
            string_index + (arguments.len() - 1) * amount,
        );
        let _ = writeln!(self.out, "\tlui $t1, %hi({})", fragment);
        let _ = writeln!(self.out, "\taddiu $a0, $t1, %lo({})", fragment);
        self.push("\tjal printf\n\tnop\n");

        self.push("\n\t# data restoring:\n");
        let a0_rvalue = self.emit_load_of_lvalue(a0_lval);
        let target = Rvalue::pinned(Reg::A0, Type::Integer);
        self.emit_store_rvalue_to_rvalue(&target, &a0_rvalue);
        self.bank.free_rvalue(&a0_rvalue);
        self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, WORD_LENGTH as i32);

        Ok(())
    }
}
