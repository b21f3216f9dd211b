// Monomorphization: one body per (base, args), recursion through
// pointers, bound checking at instantiation

use tml_ast::*;
use tml_codegen::LlvmIrGen;

fn identity_func() -> Decl {
    Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "id".into(),
        is_async: false,
        type_params: vec![TypeParam::plain("T")],
        where_clause: vec![],
        params: vec![Param::new("x", Type::Param("T".into()))],
        return_type: Some(Type::Param("T".into())),
        body: Some(Block::tail_only(Expr::ident("x"))),
        decorators: vec![],
        span: SourceSpan::unknown(),
    })
}

fn main_func(stmts: Vec<Stmt>) -> Decl {
    Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "main".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: None,
        body: Some(Block { stmts, tail: None }),
        decorators: vec![],
        span: SourceSpan::unknown(),
    })
}

#[test]
fn calls_monomorphize_once_per_argument_type() {
    let mut module = Module::new("s5");
    module.decls.push(identity_func());
    module.decls.push(main_func(vec![
        Stmt::Let {
            name: "a".into(),
            ty: None,
            is_mut: false,
            value: Expr::call("id", vec![Expr::int_typed(7, Type::I32)]),
        },
        Stmt::Let {
            name: "b".into(),
            ty: None,
            is_mut: false,
            value: Expr::call("id", vec![Expr::int_typed(9, Type::I64)]),
        },
        // A third call with the first type reuses the instantiation
        Stmt::Let {
            name: "c".into(),
            ty: None,
            is_mut: false,
            value: Expr::call("id", vec![Expr::int_typed(7, Type::I32)]),
        },
    ]));

    let mut gen = LlvmIrGen::new("s5");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("define linkonce_odr i32 @tml_id__I32(i32 %x)"));
    assert!(ir.contains("define linkonce_odr i64 @tml_id__I64(i64 %x)"));
    assert_eq!(ir.matches("define linkonce_odr i32 @tml_id__I32").count(), 1);
    assert_eq!(ir.matches("call i32 @tml_id__I32").count(), 2);
}

#[test]
fn generic_struct_instantiates_on_reference() {
    let mut module = Module::new("pairs");
    module.decls.push(Decl::Struct(StructDef {
        visibility: Visibility::Public,
        name: "Pair".into(),
        type_params: vec![TypeParam::plain("T")],
        fields: vec![
            Field::new("first", Type::Param("T".into())),
            Field::new("second", Type::Param("T".into())),
        ],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(main_func(vec![Stmt::Let {
        name: "p".into(),
        ty: None,
        is_mut: false,
        value: Expr::StructLit {
            name: "Pair".into(),
            type_args: vec![Type::I32],
            fields: vec![
                ("first".into(), Expr::int(1)),
                ("second".into(), Expr::int(2)),
            ],
        },
    }]));

    let mut gen = LlvmIrGen::new("pairs");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    assert!(ir.contains("%struct.Pair__I32 = type { i32, i32 }"));
    assert_eq!(ir.matches("%struct.Pair__I32 = type").count(), 1);
}

#[test]
fn recursive_generic_through_pointer_terminates() {
    let mut module = Module::new("nodes");
    module.decls.push(Decl::Struct(StructDef {
        visibility: Visibility::Public,
        name: "Node".into(),
        type_params: vec![TypeParam::plain("T")],
        fields: vec![
            Field::new("value", Type::Param("T".into())),
            Field::new(
                "next",
                Type::ptr(Type::generic("Node", vec![Type::Param("T".into())])),
            ),
        ],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(main_func(vec![Stmt::Let {
        name: "n".into(),
        ty: None,
        is_mut: false,
        value: Expr::StructLit {
            name: "Node".into(),
            type_args: vec![Type::I32],
            fields: vec![
                ("value".into(), Expr::int(5)),
                ("next".into(), Expr::int(0)),
            ],
        },
    }]));

    let mut gen = LlvmIrGen::new("nodes");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    assert!(ir.contains("%struct.Node__I32 = type { i32, ptr }"));
    // The zero literal destined for a pointer field becomes null
    assert!(ir.contains("store ptr null"));
}

#[test]
fn unsatisfied_bound_is_reported_at_instantiation() {
    let mut module = Module::new("bounds");
    module.decls.push(Decl::Struct(StructDef {
        visibility: Visibility::Public,
        name: "Blob".into(),
        type_params: vec![],
        fields: vec![Field::new("data", Type::I64)],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "show".into(),
        is_async: false,
        type_params: vec![TypeParam {
            name: "T".into(),
            bounds: vec![BehaviorBound::simple("Display")],
        }],
        where_clause: vec![],
        params: vec![Param::new("x", Type::Param("T".into()))],
        return_type: None,
        body: Some(Block::empty()),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(main_func(vec![Stmt::Expr(Expr::Call {
        callee: "show".into(),
        type_args: vec![Type::named("Blob")],
        args: vec![Expr::StructLit {
            name: "Blob".into(),
            type_args: vec![],
            fields: vec![("data".into(), Expr::int_typed(1, Type::I64))],
        }],
    })]));

    let mut gen = LlvmIrGen::new("bounds");
    let _ = gen.emit_module(&module);
    assert!(gen
        .errors()
        .iter()
        .any(|e| e.message.contains("Display") && e.message.contains("Blob")));
}

#[test]
fn numeric_types_satisfy_builtin_bounds() {
    let mut module = Module::new("okbounds");
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "show".into(),
        is_async: false,
        type_params: vec![TypeParam {
            name: "T".into(),
            bounds: vec![BehaviorBound::simple("Display")],
        }],
        where_clause: vec![],
        params: vec![Param::new("x", Type::Param("T".into()))],
        return_type: None,
        body: Some(Block::empty()),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(main_func(vec![Stmt::Expr(Expr::call(
        "show",
        vec![Expr::int_typed(3, Type::I64)],
    ))]));

    let mut gen = LlvmIrGen::new("okbounds");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    assert!(ir.contains("@tml_show__I64"));
}
