// Async lowering: Poll[T] return rewriting, Ready wrapping, the
// synchronous await model, and the block_on driver boundary

use tml_ast::*;
use tml_codegen::LlvmIrGen;

fn async_func(name: &str, ret: Type, body: Block) -> Decl {
    Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: name.into(),
        is_async: true,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: Some(ret),
        body: Some(body),
        decorators: vec![],
        span: SourceSpan::unknown(),
    })
}

#[test]
fn async_return_type_becomes_poll() {
    // async func f() -> I32 { 42 }; let x = block_on(f())
    let mut module = Module::new("s6");
    module
        .decls
        .push(async_func("f", Type::I32, Block::tail_only(Expr::int(42))));
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "main".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: None,
        body: Some(Block {
            stmts: vec![Stmt::Let {
                name: "x".into(),
                ty: None,
                is_mut: false,
                value: Expr::call("block_on", vec![Expr::call("f", vec![])]),
            }],
            tail: None,
        }),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("s6");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    // The declared I32 is emitted as the mangled Poll[I32]
    assert!(ir.contains("define %struct.Poll__I32 @tml_f()"));
    assert!(ir.contains("%struct.Poll__I32 = type { i32, [1 x i64] }"));
    // Ready is tag 0 with the value in the payload
    assert!(ir.contains("store i32 0"));
    assert!(ir.contains("store i32 42"));
    // block_on branches on the tag and panics on Pending
    assert!(ir.contains("icmp eq i32"));
    assert!(ir.contains("declare void @tml_panic(ptr)"));
    assert!(ir.contains("block_on: future is Pending"));
}

#[test]
fn await_unwraps_ready_and_propagates_pending() {
    // async func f() -> I32 { 42 }
    // async func g() -> I32 { let v = await f(); v }
    let mut module = Module::new("awaits");
    module
        .decls
        .push(async_func("f", Type::I32, Block::tail_only(Expr::int(42))));
    module.decls.push(async_func(
        "g",
        Type::I32,
        Block {
            stmts: vec![Stmt::Let {
                name: "v".into(),
                ty: None,
                is_mut: false,
                value: Expr::Await(Box::new(Expr::call("f", vec![]))),
            }],
            tail: Some(Box::new(Expr::ident("v"))),
        },
    ));

    let mut gen = LlvmIrGen::new("awaits");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("define %struct.Poll__I32 @tml_g()"));
    // The Pending arm early-returns g's own Poll value
    assert!(ir.contains("await.pending"));
    assert!(ir.contains("await.ready"));
    assert!(ir.contains("store i32 1"), "Pending tag written");
}

#[test]
fn async_unit_function_wraps_ready_unit() {
    let mut module = Module::new("asyncunit");
    module
        .decls
        .push(async_func("tick", Type::Unit, Block::empty()));

    let mut gen = LlvmIrGen::new("asyncunit");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    assert!(ir.contains("define %struct.Poll__Unit @tml_tick()"));
    // Unit payload is zero-sized: the enum is still a tagged union with
    // an empty payload
    assert!(ir.contains("%struct.Poll__Unit = type { i32 }"));
}

#[test]
fn await_outside_async_is_rejected() {
    let mut module = Module::new("badawait");
    module
        .decls
        .push(async_func("f", Type::I32, Block::tail_only(Expr::int(1))));
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "sync_fn".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: Some(Type::I32),
        body: Some(Block::tail_only(Expr::Await(Box::new(Expr::call(
            "f",
            vec![],
        ))))),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("badawait");
    let _ = gen.emit_module(&module);
    assert!(!gen.errors().is_empty());
}
