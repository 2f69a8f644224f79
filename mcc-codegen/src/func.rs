//! Declarations: variables, arrays, and function definitions
//!
//! A function's body is emitted into a side buffer first; once the
//! high-water displacement is known the prologue is written and the
//! buffer pasted after it. The frame holds, top down: saved `$ra`,
//! `$sp`, `$s0..$s7`, the even `$fs` registers, `$a0..$a3`, then the
//! function's own locals aligned to 8.

use crate::asm::{Instr, Reg, ARG_REGS, FARG_REGS, FSAVED_REGS, SAVED_REGS};
use crate::value::{Label, LabelKind, Lvalue, Rvalue};
use crate::{
    Codegen, CodegenError, ARG_REG_AMOUNT, FUNC_DISPL_PRESERVED, RA_SIZE, SP_SIZE, WORD_LENGTH,
};
use mcc_frontend::{ArrayBound, BinaryOp, Declaration, Expression, Statement, SymbolId, Type};
use std::fmt::Write;

impl Codegen<'_> {
    pub(crate) fn emit_declaration(
        &mut self,
        declaration: &Declaration,
    ) -> Result<(), CodegenError> {
        match declaration {
            Declaration::Variable {
                id,
                bounds,
                initializer,
            } => self.emit_variable_declaration(*id, bounds, initializer.as_deref())?,

            Declaration::Function {
                id,
                parameters,
                body,
            } => self.emit_function_definition(*id, parameters, body)?,

            // type declarations produce no code
            Declaration::Type => return Ok(()),
        }

        self.push("\n");
        Ok(())
    }

    fn emit_variable_declaration(
        &mut self,
        identifier: SymbolId,
        bounds: &[ArrayBound],
        initializer: Option<&[Expression]>,
    ) -> Result<(), CodegenError> {
        let variable = self.displacements.add(&self.unit.symbols, identifier);
        let ty = self.unit.symbols.get_type(identifier).clone();

        if ty.is_array() {
            if let (Some(initializer), Lvalue::Stack { base, displ, .. }) =
                (initializer, &variable)
            {
                let base = *base;
                let displ = *displ;
                for (index, expr) in initializer.iter().enumerate() {
                    let value = self.emit_expression(expr)?;
                    self.emit_store_of_rvalue(
                        value.clone(),
                        Lvalue::Stack {
                            base,
                            displ: displ + (index * WORD_LENGTH) as i32,
                            ty: expr.ty.clone(),
                        },
                    );
                    self.bank.free_rvalue(&value);
                }
            }
        } else {
            self.emit_array_declaration(identifier, bounds, initializer)?;
        }
        Ok(())
    }

    /// Lay out dynamic storage below `$fp` for each declared dimension
    /// and store the descriptor word into the variable's slot
    fn emit_array_declaration(
        &mut self,
        identifier: SymbolId,
        bounds: &[ArrayBound],
        initializer: Option<&[Expression]>,
    ) -> Result<(), CodegenError> {
        let (arr_base, arr_displ) = match self.displacements.get(&self.unit.symbols, identifier) {
            Lvalue::Stack { base, displ, .. } => (base, displ),
            Lvalue::Register { .. } => (Reg::Sp, 0),
        };
        let mut element_ty = self.unit.symbols.get_type(identifier).clone();
        let mut _has_empty_bounds = false;

        // the descriptor holds the address of the dynamic storage
        self.emit_store_of_rvalue(
            Rvalue::reg(Reg::Fp, Type::Integer),
            Lvalue::Stack {
                base: arr_base,
                displ: arr_displ,
                ty: Type::Integer,
            },
        );

        for bound in bounds {
            element_ty = element_ty.element_type().clone();
            match bound {
                ArrayBound::Empty => {
                    if element_ty.is_array() {
                        return Err(CodegenError::EmptyBounds);
                    }
                    _has_empty_bounds = true;
                }
                ArrayBound::Size(expr) => {
                    let bound_rvalue = self.emit_expression(expr)?;
                    let mut bound_rvalue = self.materialize(bound_rvalue);

                    // the dimension size is kept in front of the data
                    self.emit_store_of_rvalue(
                        bound_rvalue.clone(),
                        Lvalue::Stack {
                            base: Reg::Fp,
                            displ: 0,
                            ty: Type::Integer,
                        },
                    );

                    // one slot for the size itself, then scale to bytes
                    bound_rvalue =
                        self.emit_binary_operation(bound_rvalue, Rvalue::int(1), BinaryOp::Add);
                    bound_rvalue = self.emit_binary_operation(
                        bound_rvalue,
                        Rvalue::int(WORD_LENGTH as i32),
                        BinaryOp::Mul,
                    );

                    // pinned so the frame shift keeps its register intact
                    let shift =
                        Rvalue::pinned(bound_rvalue.register().unwrap_or(Reg::Zero), Type::Integer);
                    let frame = Rvalue::reg(Reg::Fp, Type::Integer);
                    self.emit_binary_operation(frame, shift, BinaryOp::Sub);

                    self.bank.free_rvalue(&bound_rvalue);
                }
            }
        }

        self.push("\n\t# setting up $fp:\n");
        self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, -(WORD_LENGTH as i32));
        self.push("\n");

        if let Some(initializer) = initializer {
            let address_rvalue = self.emit_load_of_lvalue(Lvalue::Stack {
                base: arr_base,
                displ: arr_displ,
                ty: Type::Integer,
            });
            let address = address_rvalue.register().unwrap_or(Reg::Zero);

            for (index, expr) in initializer.iter().enumerate() {
                let value = self.emit_expression(expr)?;
                self.emit_store_of_rvalue(
                    value.clone(),
                    Lvalue::Stack {
                        base: address,
                        displ: -(((index + 1) * WORD_LENGTH) as i32),
                        ty: expr.ty.clone(),
                    },
                );
                self.bank.free_rvalue(&value);
            }

            self.bank.free_rvalue(&address_rvalue);
        }
        Ok(())
    }

    fn emit_function_definition(
        &mut self,
        identifier: SymbolId,
        parameters: &[SymbolId],
        body: &Statement,
    ) -> Result<(), CodegenError> {
        let func_label = Label::new(LabelKind::Func, identifier);
        self.emit_label_declaration(func_label);
        let spelling = self.unit.symbols.spelling(identifier).to_string();
        let _ = writeln!(self.out, "\t# \"{}\" function:", spelling);

        self.curr_function = identifier;
        self.displacements.enter_function();
        self.bank.reset();

        self.push("\n\t# preserved registers:\n");
        self.to_code_r_i_r(Instr::Sw, Reg::Ra, -(RA_SIZE as i32), Reg::Fp);
        self.to_code_r_i_r(Instr::Sw, Reg::Sp, -((RA_SIZE + SP_SIZE) as i32), Reg::Fp);

        for (index, reg) in SAVED_REGS.iter().enumerate() {
            let offset = RA_SIZE + SP_SIZE + (index + 1) * WORD_LENGTH;
            self.to_code_r_i_r(Instr::Sw, *reg, -(offset as i32), Reg::Fp);
        }
        self.push("\n");

        let saved_block = SAVED_REGS.len() * WORD_LENGTH;
        for (index, reg) in FSAVED_REGS.iter().enumerate() {
            let offset = RA_SIZE + SP_SIZE + (index + 1) * WORD_LENGTH + saved_block;
            self.to_code_r_i_r(Instr::SS, *reg, -(offset as i32), Reg::Fp);
        }

        let fsaved_block = FSAVED_REGS.len() * WORD_LENGTH;
        for (index, reg) in ARG_REGS.iter().enumerate() {
            let offset = RA_SIZE + SP_SIZE + (index + 1) * WORD_LENGTH + saved_block + fsaved_block;
            self.to_code_r_i_r(Instr::Sw, *reg, -(offset as i32), Reg::Fp);
        }

        // the body goes to a buffer so the frame size is known before
        // the frame pointers move
        let saved_out = std::mem::take(&mut self.out);
        let body_result = self.emit_function_body(parameters, body);
        let buffer = std::mem::replace(&mut self.out, saved_out);
        body_result?;

        let mut max_displ = self.displacements.max_displ;
        if max_displ % 8 != 0 {
            max_displ += 8 - max_displ % 8;
        }
        let frame = (max_displ + FUNC_DISPL_PRESERVED + WORD_LENGTH) as i32;

        self.push("\n\t# setting up $fp:\n");
        // $fp moves to the end of the dynamic area
        self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, -frame);

        self.push("\n\t# setting up $sp:\n");
        self.to_code_2r(Instr::Move, Reg::Sp, Reg::Fp);

        // keep $fp clear of $sp
        self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Fp, -(WORD_LENGTH as i32));

        self.push(&buffer);

        let end_label = Label::new(LabelKind::FuncEnd, identifier);
        self.emit_label_declaration(end_label);

        self.push("\n\t# data restoring:\n");
        self.to_code_2r_i(Instr::Addi, Reg::Fp, Reg::Sp, frame);
        self.push("\n");

        for (index, reg) in SAVED_REGS.iter().enumerate() {
            let offset = RA_SIZE + SP_SIZE + (index + 1) * WORD_LENGTH;
            self.to_code_r_i_r(Instr::Lw, *reg, -(offset as i32), Reg::Fp);
        }
        self.push("\n");

        for (index, reg) in FSAVED_REGS.iter().enumerate() {
            let offset = RA_SIZE + SP_SIZE + (index + 1) * WORD_LENGTH + saved_block;
            self.to_code_r_i_r(Instr::LS, *reg, -(offset as i32), Reg::Fp);
        }

        for (index, reg) in ARG_REGS.iter().enumerate() {
            let offset = RA_SIZE + SP_SIZE + (index + 1) * WORD_LENGTH + saved_block + fsaved_block;
            self.to_code_r_i_r(Instr::Lw, *reg, -(offset as i32), Reg::Fp);
        }
        self.push("\n");

        self.to_code_r_i_r(Instr::Lw, Reg::Sp, -((RA_SIZE + SP_SIZE) as i32), Reg::Fp);
        self.to_code_r_i_r(Instr::Lw, Reg::Ra, -(RA_SIZE as i32), Reg::Fp);
        self.to_code_r(Instr::Jr, Reg::Ra);
        Ok(())
    }

    /// Parameter placement plus the body statement, emitted into the
    /// current (buffered) output
    fn emit_function_body(
        &mut self,
        parameters: &[SymbolId],
        body: &Statement,
    ) -> Result<(), CodegenError> {
        self.push("\n\t# function parameters:\n");

        let mut gpr_count = 0;
        let mut fp_count = 0;
        for (index, &parameter) in parameters.iter().enumerate() {
            let spelling = self.unit.symbols.spelling(parameter).to_string();
            let is_float = self.unit.symbols.get_type(parameter).is_floating();

            let reg = if !is_float {
                if index >= ARG_REG_AMOUNT {
                    return Err(CodegenError::TooManyParameters);
                }
                let reg = ARG_REGS[gpr_count];
                gpr_count += 1;
                reg
            } else {
                if index >= ARG_REG_AMOUNT / 2 {
                    return Err(CodegenError::TooManyParameters);
                }
                let reg = FARG_REGS[fp_count];
                fp_count += 1;
                reg
            };

            let _ = writeln!(
                self.out,
                "\t# parameter \"{}\" is in register {}",
                spelling, reg
            );
            self.displacements.add_register(parameter, reg);
        }

        self.push("\n\t# function body:\n");
        self.emit_statement(body)
    }
}
