//! Statement lowering
//!
//! Control flow lands on numbered label pairs; `continue` and `break`
//! jump to cached labels that are saved and restored across nested
//! loops. Compound statements save and restore the scope displacement so
//! inner declarations vanish on exit.

use crate::asm::Reg;
use crate::value::{Label, LabelKind, Lvalue};
use crate::{Codegen, CodegenError};
use mcc_frontend::Statement;

impl Codegen<'_> {
    pub(crate) fn emit_statement(&mut self, statement: &Statement) -> Result<(), CodegenError> {
        match statement {
            Statement::Declaration(declarations) => {
                for declaration in declarations {
                    self.emit_declaration(declaration)?;
                }
            }

            Statement::Compound(substatements) => {
                let scope_displacement = self.displacements.displ;
                for substatement in substatements {
                    self.emit_statement(substatement)?;
                }
                self.displacements.displ = scope_displacement;
            }

            Statement::Expression(expr) => self.emit_void_expression(expr)?,

            Statement::Null => {}

            Statement::If {
                condition,
                then_stmt,
                else_stmt,
            } => self.emit_if_statement(condition, then_stmt, else_stmt.as_deref())?,

            Statement::While { condition, body } => self.emit_while_statement(condition, body)?,

            Statement::DoWhile { body, condition } => {
                self.emit_do_statement(body, condition)?
            }

            Statement::For {
                init,
                condition,
                increment,
                body,
            } => self.emit_for_statement(
                init.as_deref(),
                condition.as_ref(),
                increment.as_ref(),
                body,
            )?,

            Statement::Continue => {
                let label = self.label_continue;
                self.emit_unconditional_branch(label);
            }

            Statement::Break => {
                let label = self.label_break;
                self.emit_unconditional_branch(label);
            }

            Statement::Return(expression) => self.emit_return_statement(expression.as_ref())?,
        }

        self.push("\n");
        Ok(())
    }

    fn emit_if_statement(
        &mut self,
        condition: &mcc_frontend::Expression,
        then_stmt: &Statement,
        else_stmt: Option<&Statement>,
    ) -> Result<(), CodegenError> {
        let value = self.emit_boolean_expression(condition)?;

        let num = self.next_label_num();
        let label_else = Label::new(LabelKind::Else, num);
        let label_end = Label::new(LabelKind::End, num);

        let target = if else_stmt.is_some() {
            label_else
        } else {
            label_end
        };
        self.emit_conditional_branch(&value, target);
        self.bank.free_rvalue(&value);

        self.emit_statement(then_stmt)?;

        if let Some(else_stmt) = else_stmt {
            self.emit_unconditional_branch(label_end);
            self.emit_label_declaration(label_else);
            self.emit_statement(else_stmt)?;
        }

        self.emit_label_declaration(label_end);
        Ok(())
    }

    fn emit_while_statement(
        &mut self,
        condition: &mcc_frontend::Expression,
        body: &Statement,
    ) -> Result<(), CodegenError> {
        let num = self.next_label_num();
        let label_begin = Label::new(LabelKind::BeginCycle, num);
        let label_end = Label::new(LabelKind::End, num);

        let old_continue = self.label_continue;
        let old_break = self.label_break;
        self.label_continue = label_begin;
        self.label_break = label_end;

        self.emit_label_declaration(label_begin);

        let value = self.emit_boolean_expression(condition)?;
        self.emit_conditional_branch(&value, label_end);
        self.bank.free_rvalue(&value);

        self.emit_statement(body)?;

        self.emit_unconditional_branch(label_begin);
        self.emit_label_declaration(label_end);

        self.label_continue = old_continue;
        self.label_break = old_break;
        Ok(())
    }

    fn emit_do_statement(
        &mut self,
        body: &Statement,
        condition: &mcc_frontend::Expression,
    ) -> Result<(), CodegenError> {
        let num = self.next_label_num();
        let label_begin = Label::new(LabelKind::BeginCycle, num);
        let label_condition = Label::new(LabelKind::Next, num);
        let label_end = Label::new(LabelKind::End, num);

        self.emit_label_declaration(label_begin);

        let old_continue = self.label_continue;
        let old_break = self.label_break;
        self.label_continue = label_condition;
        self.label_break = label_end;

        self.emit_statement(body)?;
        self.emit_label_declaration(label_condition);

        let value = self.emit_boolean_expression(condition)?;
        self.emit_branch_if_nonzero(&value, label_begin);
        self.bank.free_rvalue(&value);

        self.emit_label_declaration(label_end);

        self.label_continue = old_continue;
        self.label_break = old_break;
        Ok(())
    }

    fn emit_for_statement(
        &mut self,
        init: Option<&Statement>,
        condition: Option<&mcc_frontend::Expression>,
        increment: Option<&mcc_frontend::Expression>,
        body: &Statement,
    ) -> Result<(), CodegenError> {
        let scope_displacement = self.displacements.displ;

        if let Some(init) = init {
            self.emit_statement(init)?;
        }

        let num = self.next_label_num();
        let label_begin = Label::new(LabelKind::BeginCycle, num);
        let label_next = Label::new(LabelKind::Next, num);
        let label_end = Label::new(LabelKind::End, num);

        let old_continue = self.label_continue;
        let old_break = self.label_break;
        self.label_continue = label_next;
        self.label_break = label_end;

        self.emit_label_declaration(label_begin);

        if let Some(condition) = condition {
            let value = self.emit_boolean_expression(condition)?;
            self.emit_conditional_branch(&value, label_end);
            self.bank.free_rvalue(&value);
        }

        self.emit_statement(body)?;

        self.emit_label_declaration(label_next);
        if let Some(increment) = increment {
            self.emit_void_expression(increment)?;
        }

        self.emit_unconditional_branch(label_begin);
        self.emit_label_declaration(label_end);

        self.label_continue = old_continue;
        self.label_break = old_break;
        self.displacements.displ = scope_displacement;
        Ok(())
    }

    fn emit_return_statement(
        &mut self,
        expression: Option<&mcc_frontend::Expression>,
    ) -> Result<(), CodegenError> {
        if let Some(expression) = expression {
            let value = self.emit_expression(expression)?;

            let return_reg = if expression.ty.is_floating() {
                Reg::Fv0
            } else {
                Reg::V0
            };
            let return_lvalue = Lvalue::Register {
                reg: return_reg,
                ty: expression.ty.clone(),
            };
            self.emit_store_of_rvalue(value.clone(), return_lvalue);
            self.bank.free_rvalue(&value);
        }

        let label_end = Label::new(LabelKind::FuncEnd, self.curr_function);
        self.emit_unconditional_branch(label_end);
        Ok(())
    }
}
