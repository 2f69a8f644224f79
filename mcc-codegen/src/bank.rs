//! Temporary-register banks
//!
//! Two disjoint banks: eight general-purpose temporaries and six
//! single-precision temporaries (the even register of each pair).
//! Allocation is stack-disciplined: whoever takes a register frees it on
//! every path, unless the register leaves as a `from_lvalue` rvalue.

use crate::asm::{Reg, FTEMP_REGS, TEMP_REGS};
use crate::value::Rvalue;
use log::trace;

#[derive(Debug, Default)]
pub struct RegisterBank {
    gpr_busy: [bool; TEMP_REGS.len()],
    fpr_busy: [bool; FTEMP_REGS.len()],
}

impl RegisterBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest-numbered free general-purpose temporary
    pub fn get_gpr(&mut self) -> Reg {
        let index = self
            .gpr_busy
            .iter()
            .position(|busy| !busy)
            .unwrap_or_else(|| panic!("out of general-purpose temporaries"));
        self.gpr_busy[index] = true;
        trace!("allocated {}", TEMP_REGS[index]);
        TEMP_REGS[index]
    }

    /// Lowest-numbered free floating temporary
    pub fn get_fpr(&mut self) -> Reg {
        let index = self
            .fpr_busy
            .iter()
            .position(|busy| !busy)
            .unwrap_or_else(|| panic!("out of floating-point temporaries"));
        self.fpr_busy[index] = true;
        trace!("allocated {}", FTEMP_REGS[index]);
        FTEMP_REGS[index]
    }

    /// Release a temporary; anything else is a no-op, as is freeing an
    /// already free register
    pub fn free(&mut self, reg: Reg) {
        if let Some(index) = TEMP_REGS.iter().position(|&r| r == reg) {
            if self.gpr_busy[index] {
                trace!("freed {}", reg);
                self.gpr_busy[index] = false;
            }
        } else if let Some(index) = FTEMP_REGS.iter().position(|&r| r == reg) {
            if self.fpr_busy[index] {
                trace!("freed {}", reg);
                self.fpr_busy[index] = false;
            }
        }
    }

    /// Free the register behind an rvalue unless it belongs to a named
    /// variable
    pub fn free_rvalue(&mut self, rvalue: &Rvalue) {
        if let Rvalue::Register {
            reg,
            from_lvalue: false,
            ..
        } = rvalue
        {
            self.free(*reg);
        }
    }

    /// Busy bits are reset between functions
    pub fn reset(&mut self) {
        self.gpr_busy = Default::default();
        self.fpr_busy = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcc_frontend::Type;

    #[test]
    fn test_gpr_allocation_is_lowest_first() {
        let mut bank = RegisterBank::new();
        assert_eq!(bank.get_gpr(), Reg::T0);
        assert_eq!(bank.get_gpr(), Reg::T1);
        bank.free(Reg::T0);
        assert_eq!(bank.get_gpr(), Reg::T0);
    }

    #[test]
    fn test_fpr_allocation_uses_even_registers() {
        let mut bank = RegisterBank::new();
        assert_eq!(bank.get_fpr(), Reg::Ft0);
        assert_eq!(bank.get_fpr(), Reg::Ft2);
    }

    #[test]
    fn test_banks_are_disjoint() {
        let mut bank = RegisterBank::new();
        let gpr = bank.get_gpr();
        let fpr = bank.get_fpr();
        bank.free(fpr);
        assert_eq!(bank.get_fpr(), fpr);
        bank.free(gpr);
        assert_eq!(bank.get_gpr(), gpr);
    }

    #[test]
    fn test_free_of_non_temporary_is_noop() {
        let mut bank = RegisterBank::new();
        bank.free(Reg::Sp);
        bank.free(Reg::A0);
        assert_eq!(bank.get_gpr(), Reg::T0);
    }

    #[test]
    fn test_free_rvalue_respects_from_lvalue() {
        let mut bank = RegisterBank::new();
        let reg = bank.get_gpr();

        bank.free_rvalue(&Rvalue::pinned(reg, Type::Integer));
        assert_eq!(bank.get_gpr(), Reg::T1);

        bank.free_rvalue(&Rvalue::reg(reg, Type::Integer));
        assert_eq!(bank.get_gpr(), reg);
    }

    #[test]
    fn test_reset_clears_busy_bits() {
        let mut bank = RegisterBank::new();
        for _ in 0..4 {
            bank.get_gpr();
        }
        bank.reset();
        assert_eq!(bank.get_gpr(), Reg::T0);
    }

    #[test]
    #[should_panic(expected = "out of general-purpose temporaries")]
    fn test_exhaustion_panics() {
        let mut bank = RegisterBank::new();
        for _ in 0..=TEMP_REGS.len() {
            bank.get_gpr();
        }
    }
}
