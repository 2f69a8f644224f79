//! MIPS32 register and instruction model
//!
//! Register assignment follows the System V MIPS ABI register classes.
//! Double-precision pairs use the even register of each pair; the
//! generated code works in single precision throughout.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    /// Always zero
    Zero,
    /// Assembler temporary
    At,
    // Integer and pointer return values
    V0,
    V1,
    // Argument registers; not preserved across calls
    A0,
    A1,
    A2,
    A3,
    // Expression temporaries; not preserved across calls
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    // Callee-saved registers
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    T8,
    T9,
    K0,
    K1,
    /// Global pointer
    Gp,
    /// Stack pointer
    Sp,
    /// Frame pointer
    Fp,
    /// Return address
    Ra,
    // Floating return values ($f0..$f3)
    Fv0,
    Fv1,
    Fv2,
    Fv3,
    // Floating argument registers ($f12..$f15)
    Fa0,
    Fa1,
    Fa2,
    Fa3,
    // Floating temporaries ($f4..$f11, $f16..$f19)
    Ft0,
    Ft1,
    Ft2,
    Ft3,
    Ft4,
    Ft5,
    Ft6,
    Ft7,
    Ft8,
    Ft9,
    Ft10,
    Ft11,
    // Floating callee-saved registers ($f20..$f31)
    Fs0,
    Fs1,
    Fs2,
    Fs3,
    Fs4,
    Fs5,
    Fs6,
    Fs7,
    Fs8,
    Fs9,
    Fs10,
    Fs11,
}

/// General-purpose temporaries, allocation order
pub const TEMP_REGS: [Reg; 8] = [
    Reg::T0,
    Reg::T1,
    Reg::T2,
    Reg::T3,
    Reg::T4,
    Reg::T5,
    Reg::T6,
    Reg::T7,
];

/// Floating temporaries; pairs by convention, the even register is used
pub const FTEMP_REGS: [Reg; 6] = [
    Reg::Ft0,
    Reg::Ft2,
    Reg::Ft4,
    Reg::Ft6,
    Reg::Ft8,
    Reg::Ft10,
];

pub const ARG_REGS: [Reg; 4] = [Reg::A0, Reg::A1, Reg::A2, Reg::A3];

/// Floating argument registers ($f12, $f14)
pub const FARG_REGS: [Reg; 2] = [Reg::Fa0, Reg::Fa2];

pub const SAVED_REGS: [Reg; 8] = [
    Reg::S0,
    Reg::S1,
    Reg::S2,
    Reg::S3,
    Reg::S4,
    Reg::S5,
    Reg::S6,
    Reg::S7,
];

/// Even-numbered floating callee-saved registers
pub const FSAVED_REGS: [Reg; 5] = [Reg::Fs0, Reg::Fs2, Reg::Fs4, Reg::Fs6, Reg::Fs8];

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::Zero => "$0",
            Reg::At => "$at",
            Reg::V0 => "$v0",
            Reg::V1 => "$v1",
            Reg::A0 => "$a0",
            Reg::A1 => "$a1",
            Reg::A2 => "$a2",
            Reg::A3 => "$a3",
            Reg::T0 => "$t0",
            Reg::T1 => "$t1",
            Reg::T2 => "$t2",
            Reg::T3 => "$t3",
            Reg::T4 => "$t4",
            Reg::T5 => "$t5",
            Reg::T6 => "$t6",
            Reg::T7 => "$t7",
            Reg::S0 => "$s0",
            Reg::S1 => "$s1",
            Reg::S2 => "$s2",
            Reg::S3 => "$s3",
            Reg::S4 => "$s4",
            Reg::S5 => "$s5",
            Reg::S6 => "$s6",
            Reg::S7 => "$s7",
            Reg::T8 => "$t8",
            Reg::T9 => "$t9",
            Reg::K0 => "$k0",
            Reg::K1 => "$k1",
            Reg::Gp => "$gp",
            Reg::Sp => "$sp",
            Reg::Fp => "$fp",
            Reg::Ra => "$ra",
            Reg::Fv0 => "$f0",
            Reg::Fv1 => "$f1",
            Reg::Fv2 => "$f2",
            Reg::Fv3 => "$f3",
            Reg::Fa0 => "$f12",
            Reg::Fa1 => "$f13",
            Reg::Fa2 => "$f14",
            Reg::Fa3 => "$f15",
            Reg::Ft0 => "$f4",
            Reg::Ft1 => "$f5",
            Reg::Ft2 => "$f6",
            Reg::Ft3 => "$f7",
            Reg::Ft4 => "$f8",
            Reg::Ft5 => "$f9",
            Reg::Ft6 => "$f10",
            Reg::Ft7 => "$f11",
            Reg::Ft8 => "$f16",
            Reg::Ft9 => "$f17",
            Reg::Ft10 => "$f18",
            Reg::Ft11 => "$f19",
            Reg::Fs0 => "$f20",
            Reg::Fs1 => "$f21",
            Reg::Fs2 => "$f22",
            Reg::Fs3 => "$f23",
            Reg::Fs4 => "$f24",
            Reg::Fs5 => "$f25",
            Reg::Fs6 => "$f26",
            Reg::Fs7 => "$f27",
            Reg::Fs8 => "$f28",
            Reg::Fs9 => "$f29",
            Reg::Fs10 => "$f30",
            Reg::Fs11 => "$f31",
        };
        write!(f, "{}", name)
    }
}

/// Instructions per the MIPS32 instruction set manual, plus the usual
/// assembler pseudo-instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    Move,
    Li,
    La,
    Not,

    Addi,
    Sll,
    Sra,
    Andi,
    Xori,
    Ori,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Sllv,
    Srav,
    And,
    Xor,
    Or,

    Sw,
    Lw,

    Jr,
    Jal,
    J,

    Blez,
    Bltz,
    Bgez,
    Bgtz,
    Beq,
    Bne,

    Nop,

    // Single-precision floating point
    AddS,
    SubS,
    MulS,
    DivS,
    /// Store an FPR to memory
    SS,
    /// Load an FPR from memory
    LS,
    /// Load a floating constant into an FPR
    LiS,
    MovS,
    /// Move word to an FPU register
    Mtc1,
    /// Move word from an FPU register
    Mfc1,
    /// Move word from the high half of an FPU register pair
    Mfhc1,
    CvtDS,
    CvtSW,
    CvtWS,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = match self {
            Instr::Move => "move",
            Instr::Li => "li",
            Instr::La => "la",
            Instr::Not => "not",
            Instr::Addi => "addi",
            Instr::Sll => "sll",
            Instr::Sra => "sra",
            Instr::Andi => "andi",
            Instr::Xori => "xori",
            Instr::Ori => "ori",
            Instr::Add => "add",
            Instr::Sub => "sub",
            Instr::Mul => "mul",
            Instr::Div => "div",
            Instr::Mod => "mod",
            Instr::Sllv => "sllv",
            Instr::Srav => "srav",
            Instr::And => "and",
            Instr::Xor => "xor",
            Instr::Or => "or",
            Instr::Sw => "sw",
            Instr::Lw => "lw",
            Instr::Jr => "jr",
            Instr::Jal => "jal",
            Instr::J => "j",
            Instr::Blez => "blez",
            Instr::Bltz => "bltz",
            Instr::Bgez => "bgez",
            Instr::Bgtz => "bgtz",
            Instr::Beq => "beq",
            Instr::Bne => "bne",
            Instr::Nop => "nop",
            Instr::AddS => "add.s",
            Instr::SubS => "sub.s",
            Instr::MulS => "mul.s",
            Instr::DivS => "div.s",
            Instr::SS => "s.s",
            Instr::LS => "l.s",
            Instr::LiS => "li.s",
            Instr::MovS => "mov.s",
            Instr::Mtc1 => "mtc1",
            Instr::Mfc1 => "mfc1",
            Instr::Mfhc1 => "mfhc1",
            Instr::CvtDS => "cvt.d.s",
            Instr::CvtSW => "cvt.s.w",
            Instr::CvtWS => "cvt.w.s",
        };
        write!(f, "{}", mnemonic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_names() {
        assert_eq!(Reg::T0.to_string(), "$t0");
        assert_eq!(Reg::Fa0.to_string(), "$f12");
        assert_eq!(Reg::Fa2.to_string(), "$f14");
        assert_eq!(Reg::Ft0.to_string(), "$f4");
        assert_eq!(Reg::Ft8.to_string(), "$f16");
        assert_eq!(Reg::Fs0.to_string(), "$f20");
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Instr::Addi.to_string(), "addi");
        assert_eq!(Instr::MulS.to_string(), "mul.s");
        assert_eq!(Instr::CvtSW.to_string(), "cvt.s.w");
    }
}
