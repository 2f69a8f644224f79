use crate::{Linker, Preprocessor};
use indoc::indoc;
use mcc_common::DiagnosticReporter;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn preprocess_with(linker: &mut Linker, input: &str) -> (String, DiagnosticReporter) {
    let id = linker.register(PathBuf::from("test.c"), input.to_string());
    let mut preprocessor = Preprocessor::new(linker);
    let output = preprocessor.preprocess(id);
    (output, preprocessor.into_reporter())
}

fn preprocess(input: &str) -> (String, DiagnosticReporter) {
    let mut linker = Linker::new();
    preprocess_with(&mut linker, input)
}

/// Expanded output with the substitution markers collapsed, for
/// whole-line comparisons
fn flat(output: &str) -> String {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_plain_passthrough() {
    let (output, reporter) = preprocess("int main() { return 0; }\n");
    assert_eq!(output, "int main() { return 0; }\n");
    assert!(!reporter.has_errors());
}

#[test]
fn test_object_macro_expansion() {
    let input = indoc! {"
        #define MAX 100
        int array[MAX];
    "};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert_eq!(flat(&output), "int array[ 100 ];");
}

#[test]
fn test_function_macro_square() {
    let input = indoc! {"
        #define SQ(x) ((x)*(x))
        SQ(1+2)
    "};
    let (output, _) = preprocess(input);
    assert!(output.contains("((1+2)*(1+2))"));
}

#[test]
fn test_zero_arity_with_and_without_parens() {
    let input = indoc! {"
        #define F() body
        F
        F()
    "};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert_eq!(flat(&output), "body body");
}

#[test]
fn test_stringize_expanded_argument() {
    let input = indoc! {"
        #define S(x) #x
        S(a b)
    "};
    let (output, _) = preprocess(input);
    assert!(output.contains("\"a b\""));
}

#[test]
fn test_stringize_escapes_quotes_and_backslashes() {
    let input = indoc! {r#"
        #define S(x) #x
        S("q\n")
    "#};
    let (output, _) = preprocess(input);
    assert!(output.contains(r#""\"q\\n\"""#));
}

#[test]
fn test_token_paste_of_parameters() {
    let input = indoc! {"
        #define CAT(a,b) a##b
        CAT(foo,1)
    "};
    let (output, _) = preprocess(input);
    assert!(output.contains("foo1"));
}

#[test]
fn test_token_paste_uses_raw_argument() {
    // the pasted right operand is the raw spelling; the left parameter
    // substitutes its expanded form
    let input = indoc! {"
        #define A B
        #define F(x) x##_
        F(A)
    "};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert!(output.contains("B_"));
}

#[test]
fn test_nested_macro_expansion() {
    let input = indoc! {"
        #define X 1
        #define Y X + 2
        Y
    "};
    let (output, _) = preprocess(input);
    assert!(output.contains("1 + 2"));
}

#[test]
fn test_undef_removes_macro() {
    let input = indoc! {"
        #define X 1
        X
        #undef X
        X
    "};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert_eq!(flat(&output), "1 X");
}

#[test]
fn test_undef_of_unknown_name_is_silent() {
    let (_, reporter) = preprocess("#undef NEVER_DEFINED\n");
    assert!(!reporter.has_errors());
    assert_eq!(reporter.warning_count(), 0);
}

#[test]
fn test_redefinition_is_an_error_and_keeps_first() {
    let input = indoc! {"
        #define X 2
        #define X 3
        X
    "};
    let (output, reporter) = preprocess(input);
    assert_eq!(reporter.error_count(), 1);
    assert!(output.contains('2'));
    assert!(!output.contains('3'));
}

#[test]
fn test_set_redefines_without_error() {
    let input = indoc! {"
        #define X 2
        #set X 3
        X
    "};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert!(output.contains('3'));
}

#[test]
fn test_set_of_undefined_warns_and_defines() {
    let input = indoc! {"
        #set X 3
        X
    "};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert_eq!(reporter.warning_count(), 1);
    assert!(output.contains('3'));
}

#[test]
fn test_macro_with_space_before_parens_has_no_parameters() {
    let input = indoc! {"
        #define F (x)
        F
    "};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert!(output.contains("(x)"));
}

#[test]
fn test_argument_count_mismatch() {
    let input = indoc! {"
        #define PAIR(a,b) a b
        PAIR(1)
        PAIR(1,2,3)
    "};
    let (_, reporter) = preprocess(input);
    assert_eq!(reporter.error_count(), 2);
}

#[test]
fn test_missing_argument_list_is_an_error() {
    let input = indoc! {"
        #define F(x) x
        F;
    "};
    let (output, reporter) = preprocess(input);
    assert!(reporter.has_errors());
    // the consumed name is dropped; the rest of the line survives
    assert!(output.contains(';'));
}

#[test]
fn test_unterminated_arguments_at_eof() {
    let input = "#define F(x) x\nF(1";
    let (_, reporter) = preprocess(input);
    assert!(reporter.has_errors());
}

#[test]
fn test_commas_inside_nested_brackets_do_not_split() {
    let input = indoc! {"
        #define FIRST(x) x
        FIRST(f(a, b))
    "};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert!(output.contains("f(a, b)"));
}

#[test]
fn test_strings_in_arguments_are_opaque() {
    let input = indoc! {r#"
        #define ID(x) x
        ID("a,b")
    "#};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert!(output.contains(r#""a,b""#));
}

#[test]
fn test_macro_names_inside_strings_stay_put() {
    let input = indoc! {r#"
        #define MAX 100
        char *s = "MAX";
    "#};
    let (output, _) = preprocess(input);
    assert!(output.contains(r#""MAX""#));
    assert!(!output.contains("100"));
}

#[test]
fn test_line_comment_removed() {
    let (output, _) = preprocess("int x; // trailing\nint y;\n");
    assert!(!output.contains("trailing"));
    assert!(output.contains("int x; \nint y;\n"));
}

#[test]
fn test_single_line_block_comment_preserved() {
    let (output, _) = preprocess("/* keep */ int x;\n");
    assert!(output.contains("/* keep */ int x;"));
}

#[test]
fn test_multi_line_block_comment_blanked() {
    let (output, reporter) = preprocess("int a; /* one\ntwo */ int b;\n");
    assert!(!reporter.has_errors());
    assert!(!output.contains("two"));
    assert!(output.contains('\n'));
    assert!(output.contains("int b;"));
}

#[test]
fn test_unterminated_block_comment() {
    let (_, reporter) = preprocess("int a; /* never closed\n");
    assert!(reporter.has_errors());
}

#[test]
fn test_backslash_newline_continues_directive_body() {
    let input = "#define M 1 + \\\n2\nM\n";
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert!(output.contains("1 + 2"));
}

#[test]
fn test_stray_hash_is_reported_and_echoed() {
    let (output, reporter) = preprocess("a # b\n");
    assert!(reporter.has_errors());
    assert!(output.contains("a # b"));
}

#[test]
fn test_unknown_directive() {
    let (output, reporter) = preprocess("#frobnicate stuff\n");
    assert!(reporter.has_errors());
    assert!(output.contains("frobnicate"));
}

#[test]
fn test_line_directive_warns_and_skips() {
    let (output, reporter) = preprocess("#line 42\nint x;\n");
    assert!(!reporter.has_errors());
    assert_eq!(reporter.warning_count(), 1);
    assert!(!output.contains("42"));
    assert!(output.contains("int x;"));
}

#[test]
fn test_reserved_directives_are_unsupported() {
    let input = indoc! {"
        #ifdef X
        #endif
    "};
    let (_, reporter) = preprocess(input);
    assert_eq!(reporter.error_count(), 2);
}

#[test]
fn test_directive_with_space_after_hash() {
    let input = indoc! {"
        #  define MAX 7
        MAX
    "};
    let (output, reporter) = preprocess(input);
    assert!(!reporter.has_errors());
    assert!(output.contains('7'));
}

#[test]
fn test_include_interleaves_content() {
    let mut linker = Linker::new();
    linker.register(PathBuf::from("defs.h"), "#define ANSWER 42\nint h;\n".to_string());
    let input = indoc! {r#"
        #include "defs.h"
        int x = ANSWER;
    "#};
    let (output, reporter) = preprocess_with(&mut linker, input);
    assert!(!reporter.has_errors());
    assert!(output.contains("int h;"));
    assert!(output.contains("int x = "));
    assert!(output.contains("42"));
}

#[test]
fn test_include_missing_file_recovers() {
    let input = indoc! {r#"
        #include "missing.h"
        int survives;
    "#};
    let (output, reporter) = preprocess(input);
    assert!(reporter.has_errors());
    assert!(output.contains("int survives;"));
}

#[test]
fn test_include_depth_limit() {
    let mut linker = Linker::new();
    linker.register(
        PathBuf::from("self.h"),
        "#include \"self.h\"\n".to_string(),
    );
    let (_, reporter) = preprocess_with(&mut linker, "#include \"self.h\"\n");
    assert!(reporter.has_errors());
}

#[test]
fn test_call_depth_limit_on_self_recursion() {
    let input = indoc! {"
        #define R R
        R
    "};
    let (output, reporter) = preprocess(input);
    assert!(reporter.has_errors());
    assert!(output.contains('R'));
}

#[test]
fn test_duplicate_parameter_is_an_error() {
    let (_, reporter) = preprocess("#define F(a,a) a\n");
    assert!(reporter.has_errors());
}

#[test]
fn test_paste_at_body_edge_is_an_error() {
    let (_, reporter) = preprocess("#define F(x) ##x\n");
    assert!(reporter.has_errors());

    let (_, reporter) = preprocess("#define G(x) x##\n");
    assert!(reporter.has_errors());
}

#[test]
fn test_hash_not_followed_by_parameter() {
    let (_, reporter) = preprocess("#define F(x) #y\n");
    assert!(reporter.has_errors());
}

#[test]
fn test_failed_define_leaves_name_undefined() {
    let input = indoc! {"
        #define F(x) #y
        F(1)
    "};
    let (output, reporter) = preprocess(input);
    assert!(reporter.has_errors());
    // F did not become a macro; the call passes through
    assert!(output.contains("F(1)"));
}

#[test]
fn test_diagnostics_carry_file_locations() {
    let (_, reporter) = preprocess("#define X 1\n#define X 2\n");
    let diagnostic = &reporter.diagnostics()[0];
    assert!(diagnostic.location.filename.ends_with("test.c"));
    assert_eq!(diagnostic.location.line, 2);
}
