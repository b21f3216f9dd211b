// Extern declarations, calling conventions, and suite-mode linkage

use tml_ast::*;
use tml_codegen::{CodegenOptions, LlvmIrGen};

fn extern_func(name: &str, abi: &str, symbol: Option<&str>) -> Decl {
    Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: name.into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![Param::new("x", Type::I32)],
        return_type: Some(Type::I32),
        body: None,
        decorators: vec![Decorator::Extern {
            abi: abi.into(),
            symbol: symbol.map(String::from),
        }],
        span: SourceSpan::unknown(),
    })
}

fn plain_func(name: &str, decorators: Vec<Decorator>, body: Block) -> Decl {
    Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: name.into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: Some(Type::I32),
        body: Some(body),
        decorators,
        span: SourceSpan::unknown(),
    })
}

#[test]
fn stdcall_extern_declares_and_routes_calls() {
    // @extern("stdcall", name = "MyWinFunc") func bind(x: I32) -> I32
    let mut module = Module::new("s4");
    module.decls.push(extern_func("bind", "stdcall", Some("MyWinFunc")));
    module.decls.push(plain_func(
        "driver",
        vec![],
        Block::tail_only(Expr::call("bind", vec![Expr::int(5)])),
    ));

    let mut gen = LlvmIrGen::new("s4");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("declare x86_stdcallcc i32 @MyWinFunc(i32)"));
    assert!(ir.contains("call i32 @MyWinFunc(i32 5)"));
    assert!(!ir.contains("@tml_bind"), "calls go through the extern symbol");
}

#[test]
fn matching_redeclaration_is_silent() {
    let mut module = Module::new("redecl");
    module.decls.push(extern_func("first", "c", Some("shared_sym")));
    module.decls.push(extern_func("second", "c", Some("shared_sym")));

    let mut gen = LlvmIrGen::new("redecl");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    assert_eq!(ir.matches("declare i32 @shared_sym(i32)").count(), 1);
}

#[test]
fn conflicting_redeclaration_is_an_abi_mismatch() {
    let mut module = Module::new("conflict");
    module.decls.push(extern_func("first", "c", Some("shared_sym")));
    module.decls.push(extern_func("second", "stdcall", Some("shared_sym")));

    let mut gen = LlvmIrGen::new("conflict");
    let _ = gen.emit_module(&module);
    assert_eq!(gen.errors().len(), 1);
    assert_eq!(
        gen.errors()[0].kind,
        tml_codegen::CodegenErrorKind::ExternAbiMismatch
    );
}

#[test]
fn unsupported_abi_is_rejected() {
    let mut module = Module::new("badabi");
    module.decls.push(extern_func("weird", "pascal", None));

    let mut gen = LlvmIrGen::new("badabi");
    let _ = gen.emit_module(&module);
    assert_eq!(gen.errors().len(), 1);
    assert_eq!(
        gen.errors()[0].kind,
        tml_codegen::CodegenErrorKind::ExternAbiMismatch
    );
}

#[test]
fn link_decorators_accumulate_once() {
    let mut module = Module::new("libs");
    let mut decl = extern_func("winfn", "stdcall", Some("WinFn"));
    if let Decl::Function(f) = &mut decl {
        f.decorators.push(Decorator::Link("user32".into()));
        f.decorators.push(Decorator::Link("kernel32".into()));
    }
    module.decls.push(decl);

    let mut gen = LlvmIrGen::new("libs");
    let _ = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    assert_eq!(gen.link_libraries(), &["user32", "kernel32"]);
}

#[test]
fn suite_mode_internalizes_and_prefixes() {
    let mut module = Module::new("suite");
    module.decls.push(plain_func(
        "helper",
        vec![],
        Block::tail_only(Expr::int(1)),
    ));
    module.decls.push(plain_func(
        "boom",
        vec![Decorator::Test, Decorator::ShouldPanic],
        Block::tail_only(Expr::int(2)),
    ));
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "main".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: None,
        body: Some(Block::empty()),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));

    let options = CodegenOptions {
        force_internal_linkage: true,
        suite_test_index: Some(3),
        ..Default::default()
    };
    let mut gen = LlvmIrGen::with_options("suite", options);
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("define internal i32 @s3_tml_helper()"));
    // @should_panic keeps external linkage: the harness reaches it
    // through a function pointer
    assert!(ir.contains("define i32 @s3_tml_boom()"));
    assert!(!ir.contains("define internal i32 @s3_tml_boom()"));
    // The source entry point is internalized too
    assert!(ir.contains("define internal i32 @main()"));
}

#[test]
fn dll_export_marks_public_functions() {
    let mut module = Module::new("dll");
    module.decls.push(plain_func(
        "api",
        vec![],
        Block::tail_only(Expr::int(7)),
    ));

    let options = CodegenOptions {
        dll_export: true,
        ..Default::default()
    };
    let mut gen = LlvmIrGen::with_options("dll", options);
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    assert!(ir.contains("define dllexport i32 @tml_api()"));
}
