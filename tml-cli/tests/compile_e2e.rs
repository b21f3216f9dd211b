// End-to-end: typed-module JSON in, .ll text out, nonzero exit on errors

use std::process::Command;
use tml_ast::*;

fn simple_module() -> Module {
    let mut module = Module::new("demo");
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "answer".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: Some(Type::I64),
        body: Some(Block::tail_only(Expr::IntLit {
            value: 42,
            ty: Some(Type::I64),
        })),
        decorators: vec![],
        span: SourceSpan::new(1, 1),
    }));
    module
}

#[test]
fn compile_writes_ir_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("demo.json");
    std::fs::write(&input, serde_json::to_string(&simple_module()).unwrap()).unwrap();
    let output = dir.path().join("demo.ll");

    let status = Command::new(env!("CARGO_BIN_EXE_tml"))
        .arg("compile")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());

    let ir = std::fs::read_to_string(&output).unwrap();
    assert!(ir.contains("; ModuleID = 'demo'"));
    assert!(ir.contains("define i64 @tml_answer()"));
    assert!(ir.contains("ret i64 42"));
}

#[test]
fn broken_module_exits_nonzero_with_json_diagnostics() {
    let mut module = Module::new("broken");
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "bad".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![Param::new("x", Type::named("Missing"))],
        return_type: None,
        body: Some(Block::empty()),
        decorators: vec![],
        span: SourceSpan::new(3, 5),
    }));

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.json");
    std::fs::write(&input, serde_json::to_string(&module).unwrap()).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_tml"))
        .arg("check")
        .arg(&input)
        .arg("--json")
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr.lines().next().expect("one diagnostic line");
    let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(parsed["level"], "error");
    assert!(parsed["message"].as_str().unwrap().contains("Missing"));
}
