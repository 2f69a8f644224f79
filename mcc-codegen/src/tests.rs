use crate::{generate, CodegenError};
use mcc_frontend::{
    ArrayBound, BinaryOp, Declaration, Expression, Statement, SymbolId, SymbolTable,
    TranslationUnit, Type, UnaryOp, BI_PRINTF,
};
use mcc_frontend::ast::ExpressionKind;

fn int_function_type(parameters: Vec<Type>) -> Type {
    Type::Function {
        return_type: Box::new(Type::Integer),
        parameters,
    }
}

fn unit_with_function(
    symbols: SymbolTable,
    id: SymbolId,
    parameters: Vec<SymbolId>,
    body: Statement,
    strings: Vec<String>,
) -> TranslationUnit {
    TranslationUnit {
        declarations: vec![Declaration::Function {
            id,
            parameters,
            body,
        }],
        symbols,
        strings,
        main_id: id,
    }
}

#[test]
fn test_preamble_order() {
    let mut symbols = SymbolTable::new();
    let main = symbols.add("main", int_function_type(vec![]), false);
    let unit = unit_with_function(symbols, main, vec![], Statement::Compound(vec![]), vec![]);

    let asm = generate(&unit).unwrap();
    let expected_prefix = "\t.section .mdebug.abi32\n\
                           \t.previous\n\
                           \t.nan\tlegacy\n\
                           \t.module fp=xx\n\
                           \t.module nooddspreg\n\
                           \t.abicalls\n\
                           \t.option pic0\n\
                           \t.text\n\
                           \t.align 2\n";
    assert!(asm.starts_with(expected_prefix));
    assert!(asm.contains("main:"));
    assert!(asm.contains("lui $gp, %hi(__gnu_local_gp)"));
    // heap boundary constant
    assert!(asm.contains("li $t0, 268500992"));
    assert!(asm.contains("sw $t0, -8060($gp)"));
}

#[test]
fn test_integer_function_add_parameters() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer, Type::Integer]), false);
    let a = symbols.add("a", Type::Integer, true);
    let b = symbols.add("b", Type::Integer, true);

    let body = Statement::Compound(vec![Statement::Return(Some(Expression::binary(
        BinaryOp::Add,
        Expression::identifier(a, Type::Integer),
        Expression::identifier(b, Type::Integer),
        Type::Integer,
    )))]);

    let unit = unit_with_function(symbols, f, vec![a, b], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains(&format!("FUNC{}:", f)));
    // $a0..$a3 are parked in the preserved area
    assert!(asm.contains("sw $a0, -64($fp)"));
    assert!(asm.contains("sw $a1, -68($fp)"));
    assert!(asm.contains("add $t0, $a0, $a1"));
    assert!(asm.contains("move $v0, $t0"));
    assert!(asm.contains(&format!("j FUNCEND{}", f)));
    assert!(asm.contains(&format!("FUNCEND{}:", f)));
}

#[test]
fn test_prologue_epilogue_are_mirrored() {
    let mut symbols = SymbolTable::new();
    let main = symbols.add("main", int_function_type(vec![]), false);
    let unit = unit_with_function(symbols, main, vec![], Statement::Compound(vec![]), vec![]);
    let asm = generate(&unit).unwrap();

    for (store, load, reg, offset) in [
        ("sw", "lw", "$ra", 4),
        ("sw", "lw", "$sp", 8),
        ("sw", "lw", "$s0", 12),
        ("sw", "lw", "$s7", 40),
        ("s.s", "l.s", "$f20", 44),
        ("s.s", "l.s", "$f28", 60),
        ("sw", "lw", "$a3", 76),
    ] {
        assert!(
            asm.contains(&format!("{} {}, -{}($fp)", store, reg, offset)),
            "missing save of {} at -{}",
            reg,
            offset
        );
        assert!(
            asm.contains(&format!("{} {}, -{}($fp)", load, reg, offset)),
            "missing restore of {} at -{}",
            reg,
            offset
        );
    }

    assert!(asm.contains("jr $ra"));
}

#[test]
fn test_float_function_multiply() {
    let mut symbols = SymbolTable::new();
    let g = symbols.add(
        "g",
        Type::Function {
            return_type: Box::new(Type::Floating),
            parameters: vec![Type::Floating],
        },
        false,
    );
    let x = symbols.add("x", Type::Floating, true);

    let body = Statement::Compound(vec![Statement::Return(Some(Expression::binary(
        BinaryOp::Mul,
        Expression::identifier(x, Type::Floating),
        Expression::float_literal(2.0),
        Type::Floating,
    )))]);

    let unit = unit_with_function(symbols, g, vec![x], body, vec![]);
    let asm = generate(&unit).unwrap();

    // the parameter arrives in $f12, the literal goes through li.s
    assert!(asm.contains("$f12"));
    assert!(asm.contains("li.s $f4, 2.0"));
    assert!(asm.contains("mul.s $f4, $f12, $f4"));
    assert!(asm.contains("mov.s $f0, $f4"));
}

#[test]
fn test_immediate_form_and_materialization() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer]), false);
    let a = symbols.add("a", Type::Integer, true);

    // a + 7 uses addi; a * 7 loads the constant first
    let body = Statement::Compound(vec![Statement::Return(Some(Expression::binary(
        BinaryOp::Add,
        Expression::binary(
            BinaryOp::Mul,
            Expression::identifier(a, Type::Integer),
            Expression::int_literal(7),
            Type::Integer,
        ),
        Expression::int_literal(5),
        Type::Integer,
    )))]);

    let unit = unit_with_function(symbols, f, vec![a], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("li $t0, 7"));
    assert!(asm.contains("mul $t0, $a0, $t0"));
    assert!(asm.contains("addi $t0, $t0, 5"));
}

#[test]
fn test_unary_lowerings() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer]), false);
    let a = symbols.add("a", Type::Integer, true);

    let body = Statement::Compound(vec![
        // -a becomes 0 - a
        Statement::Expression(Expression::unary(
            UnaryOp::Minus,
            Expression::identifier(a, Type::Integer),
            Type::Integer,
        )),
        // ~a becomes a ^ -1
        Statement::Expression(Expression::unary(
            UnaryOp::Not,
            Expression::identifier(a, Type::Integer),
            Type::Integer,
        )),
        Statement::Return(None),
    ]);

    let unit = unit_with_function(symbols, f, vec![a], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("sub $t0, $0, $a0"));
    assert!(asm.contains("xori $t0, $a0, -1"));
}

#[test]
fn test_comparison_produces_zero_one() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer, Type::Integer]), false);
    let a = symbols.add("a", Type::Integer, true);
    let b = symbols.add("b", Type::Integer, true);

    let body = Statement::Compound(vec![Statement::Return(Some(Expression::binary(
        BinaryOp::Lt,
        Expression::identifier(a, Type::Integer),
        Expression::identifier(b, Type::Integer),
        Type::Integer,
    )))]);

    let unit = unit_with_function(symbols, f, vec![a, b], body, vec![]);
    let asm = generate(&unit).unwrap();

    // a < b is lowered through the reversed relation on a - b
    assert!(asm.contains("sub $t0, $a0, $a1"));
    assert!(asm.contains("bgez $t0, ELSE"));
    assert!(asm.contains("li $t0, 1"));
    assert!(asm.contains("li $t0, 0"));
    assert!(asm.contains("j END"));
}

#[test]
fn test_if_else_branches() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer]), false);
    let a = symbols.add("a", Type::Integer, true);

    let body = Statement::Compound(vec![Statement::If {
        condition: Expression::identifier(a, Type::Integer),
        then_stmt: Box::new(Statement::Return(Some(Expression::int_literal(1)))),
        else_stmt: Some(Box::new(Statement::Return(Some(Expression::int_literal(2))))),
    }]);

    let unit = unit_with_function(symbols, f, vec![a], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("beq $a0, $0, ELSE"));
    assert!(asm.contains("ELSE1:"));
    assert!(asm.contains("END1:"));
    assert!(asm.contains("j END1"));
}

#[test]
fn test_while_loop_labels_and_jumps() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer]), false);
    let a = symbols.add("a", Type::Integer, true);

    let body = Statement::Compound(vec![Statement::While {
        condition: Expression::identifier(a, Type::Integer),
        body: Box::new(Statement::Compound(vec![
            Statement::Continue,
            Statement::Break,
        ])),
    }]);

    let unit = unit_with_function(symbols, f, vec![a], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("BEGIN_CYCLE1:"));
    assert!(asm.contains("beq $a0, $0, END1"));
    // continue and break inside target the innermost loop's labels
    assert!(asm.contains("j BEGIN_CYCLE1"));
    assert!(asm.contains("j END1"));
    assert!(asm.contains("END1:"));
}

#[test]
fn test_do_while_branches_back_on_nonzero() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer]), false);
    let a = symbols.add("a", Type::Integer, true);

    let body = Statement::Compound(vec![Statement::DoWhile {
        body: Box::new(Statement::Null),
        condition: Expression::identifier(a, Type::Integer),
    }]);

    let unit = unit_with_function(symbols, f, vec![a], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("BEGIN_CYCLE1:"));
    assert!(asm.contains("NEXT1:"));
    assert!(asm.contains("bne $a0, $0, BEGIN_CYCLE1"));
}

#[test]
fn test_logical_and_short_circuits() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer, Type::Integer]), false);
    let a = symbols.add("a", Type::Integer, true);
    let b = symbols.add("b", Type::Integer, true);

    let body = Statement::Compound(vec![Statement::Return(Some(Expression::binary(
        BinaryOp::LogAnd,
        Expression::identifier(a, Type::Integer),
        Expression::identifier(b, Type::Integer),
        Type::Integer,
    )))]);

    let unit = unit_with_function(symbols, f, vec![a, b], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("beq $a0, $0, END"));
}

#[test]
fn test_ternary_uses_one_result_register() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer]), false);
    let a = symbols.add("a", Type::Integer, true);

    let ternary = Expression::new(
        ExpressionKind::Ternary {
            condition: Box::new(Expression::identifier(a, Type::Integer)),
            then_expr: Box::new(Expression::int_literal(1)),
            else_expr: Box::new(Expression::int_literal(2)),
        },
        Type::Integer,
    );
    let body = Statement::Compound(vec![Statement::Return(Some(ternary))]);

    let unit = unit_with_function(symbols, f, vec![a], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("beq $a0, $0, ELSE1"));
    assert!(asm.contains("li $t0, 1"));
    assert!(asm.contains("j END1"));
    assert!(asm.contains("ELSE1:"));
    assert!(asm.contains("li $t0, 2"));
    assert!(asm.contains("END1:"));
}

#[test]
fn test_int_to_float_cast() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add(
        "f",
        Type::Function {
            return_type: Box::new(Type::Floating),
            parameters: vec![Type::Integer],
        },
        false,
    );
    let a = symbols.add("a", Type::Integer, true);

    let cast = Expression::new(
        ExpressionKind::Cast {
            operand: Box::new(Expression::identifier(a, Type::Integer)),
        },
        Type::Floating,
    );
    let body = Statement::Compound(vec![Statement::Return(Some(cast))]);

    let unit = unit_with_function(symbols, f, vec![a], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("mtc1 $a0, $f4"));
    assert!(asm.contains("cvt.s.w $f4, $f4"));
    assert!(asm.contains("mov.s $f0, $f4"));
}

#[test]
fn test_call_saves_and_restores_argument_registers() {
    let mut symbols = SymbolTable::new();
    let caller = symbols.add("caller", int_function_type(vec![]), false);
    let callee = symbols.add("callee", int_function_type(vec![Type::Integer]), false);

    let body = Statement::Compound(vec![Statement::Return(Some(Expression::call(
        callee,
        vec![Expression::int_literal(3)],
        Type::Integer,
    )))]);

    let unit = TranslationUnit {
        declarations: vec![
            Declaration::Function {
                id: caller,
                parameters: vec![],
                body,
            },
            Declaration::Function {
                id: callee,
                parameters: vec![symbols.add("n", Type::Integer, true)],
                body: Statement::Return(Some(Expression::int_literal(0))),
            },
        ],
        symbols,
        strings: vec![],
        main_id: caller,
    };

    let asm = generate(&unit).unwrap();

    // frame moves down one word per argument around the call
    assert!(asm.contains("addi $fp, $fp, -4"));
    assert!(asm.contains("sw $a0, 0($fp)"));
    assert!(asm.contains(&format!("jal FUNC{}", callee)));
    // the parked value comes back
    assert!(asm.contains("lw $t0, 0($fp)"));
    assert!(asm.contains("move $a0, $t0"));
}

#[test]
fn test_printf_splits_format_string() {
    let mut symbols = SymbolTable::new();
    let main = symbols.add("main", int_function_type(vec![]), false);
    let i = symbols.add("i", Type::Integer, true);
    let f = symbols.add("x", Type::Floating, true);

    let call = Expression::call(
        BI_PRINTF,
        vec![
            Expression::string_literal(0),
            Expression::identifier(i, Type::Integer),
            Expression::identifier(f, Type::Floating),
        ],
        Type::Integer,
    );
    let body = Statement::Compound(vec![
        Statement::Declaration(vec![
            Declaration::Variable {
                id: i,
                bounds: vec![],
                initializer: None,
            },
            Declaration::Variable {
                id: f,
                bounds: vec![],
                initializer: None,
            },
        ]),
        Statement::Expression(call),
    ]);

    let unit = unit_with_function(symbols, main, vec![], body, vec!["%d %f\n".to_string()]);
    let asm = generate(&unit).unwrap();

    // the format string splits into three sibling labels
    assert!(asm.contains("STRING0\t.ascii \"%d\\0\""));
    assert!(asm.contains("STRING1\t.ascii \" %f\\0\""));
    assert!(asm.contains("STRING2\t.ascii \"\\n\\0\""));

    assert_eq!(asm.matches("jal printf").count(), 3);
    assert!(asm.contains("cvt.d.s"));
    assert!(asm.contains("mfc1 $a1"));
    assert!(asm.contains("mfhc1 $a2"));
    assert!(asm.contains("lui $t1, %hi(STRING0)"));
    assert!(asm.contains("addiu $a0, $t1, %lo(STRING2)"));
}

#[test]
fn test_scalar_declarations_go_through_the_array_path() {
    // the class check on declarations is inverted on purpose: scalars
    // take the dynamic-storage path
    let mut symbols = SymbolTable::new();
    let main = symbols.add("main", int_function_type(vec![]), false);
    let i = symbols.add("i", Type::Integer, true);

    let body = Statement::Compound(vec![Statement::Declaration(vec![Declaration::Variable {
        id: i,
        bounds: vec![],
        initializer: None,
    }])]);

    let unit = unit_with_function(symbols, main, vec![], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("sw $fp, 0($sp)"));
}

#[test]
fn test_array_typed_declarations_take_the_store_path() {
    // the inverted class check sends array-typed declarations through
    // the initializer-store path; their bounds are never walked
    let mut symbols = SymbolTable::new();
    let main = symbols.add("main", int_function_type(vec![]), false);
    let arr = symbols.add(
        "arr",
        Type::Array(Box::new(Type::Array(Box::new(Type::Integer)))),
        true,
    );

    let body = Statement::Compound(vec![Statement::Declaration(vec![Declaration::Variable {
        id: arr,
        bounds: vec![ArrayBound::Empty],
        initializer: None,
    }])]);

    let unit = TranslationUnit {
        declarations: vec![Declaration::Function {
            id: main,
            parameters: vec![],
            body,
        }],
        symbols,
        strings: vec![],
        main_id: main,
    };

    assert!(generate(&unit).is_ok());
}

#[test]
fn test_assignment_stores_to_stack_slot() {
    let mut symbols = SymbolTable::new();
    let main = symbols.add("main", int_function_type(vec![]), false);
    let i = symbols.add("i", Type::Integer, true);

    let body = Statement::Compound(vec![
        Statement::Declaration(vec![Declaration::Variable {
            id: i,
            bounds: vec![],
            initializer: None,
        }]),
        Statement::Expression(Expression::assignment(
            BinaryOp::Assign,
            Expression::identifier(i, Type::Integer),
            Expression::int_literal(5),
        )),
        Statement::Expression(Expression::assignment(
            BinaryOp::AddAssign,
            Expression::identifier(i, Type::Integer),
            Expression::int_literal(2),
        )),
    ]);

    let unit = unit_with_function(symbols, main, vec![], body, vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains("li $t0, 5"));
    assert!(asm.contains("sw $t0, 0($sp)"));
    // compound form loads, adds, stores back
    assert!(asm.contains("lw $t0, 0($sp)"));
    assert!(asm.contains("addi $t0, $t0, 2"));
}

#[test]
fn test_too_many_parameters_is_an_error() {
    let mut symbols = SymbolTable::new();
    let f = symbols.add("f", int_function_type(vec![Type::Integer; 5]), false);
    let params: Vec<SymbolId> = (0..5)
        .map(|n| symbols.add(&format!("p{}", n), Type::Integer, true))
        .collect();

    let unit = unit_with_function(symbols, f, params, Statement::Compound(vec![]), vec![]);
    assert_eq!(generate(&unit), Err(CodegenError::TooManyParameters));
}

#[test]
fn test_postgen_calls_main() {
    let mut symbols = SymbolTable::new();
    let main = symbols.add("main", int_function_type(vec![]), false);
    let unit = unit_with_function(symbols, main, vec![], Statement::Compound(vec![]), vec![]);
    let asm = generate(&unit).unwrap();

    assert!(asm.contains(&format!("jal FUNC{}", main)));
    assert!(asm.ends_with("\tlw $ra, 0($fp)\n\tjr $ra\n"));
}
