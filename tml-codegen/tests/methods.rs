// Method dispatch: inherent impls, behavior impls, super-calls, generic
// receivers, and the Iterator-driven for loop

use tml_ast::*;
use tml_codegen::LlvmIrGen;

fn method(name: &str, mut_this: bool, ret: Option<Type>, body: Block) -> FuncDecl {
    FuncDecl {
        visibility: Visibility::Public,
        name: name.into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![Param {
            name: "this".into(),
            ty: Type::Param("Self".into()),
            is_mut: mut_this,
        }],
        return_type: ret,
        body: Some(body),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }
}

fn point_struct() -> Decl {
    Decl::Struct(StructDef {
        visibility: Visibility::Public,
        name: "Point".into(),
        type_params: vec![],
        fields: vec![Field::new("x", Type::I64), Field::new("y", Type::I64)],
        span: SourceSpan::unknown(),
    })
}

fn point_literal() -> Expr {
    Expr::StructLit {
        name: "Point".into(),
        type_args: vec![],
        fields: vec![
            ("x".into(), Expr::int_typed(3, Type::I64)),
            ("y".into(), Expr::int_typed(4, Type::I64)),
        ],
    }
}

#[test]
fn inherent_method_takes_receiver_by_pointer() {
    let mut module = Module::new("inherent");
    module.decls.push(point_struct());
    module.decls.push(Decl::Impl(ImplBlock {
        target: Type::named("Point"),
        behavior: None,
        type_params: vec![],
        methods: vec![method(
            "x_coord",
            false,
            Some(Type::I64),
            Block::tail_only(Expr::Field {
                receiver: Box::new(Expr::ident("this")),
                field: "x".into(),
            }),
        )],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "driver".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: Some(Type::I64),
        body: Some(Block {
            stmts: vec![Stmt::Let {
                name: "p".into(),
                ty: None,
                is_mut: false,
                value: point_literal(),
            }],
            tail: Some(Box::new(Expr::MethodCall {
                receiver: Box::new(Expr::ident("p")),
                method: "x_coord".into(),
                type_args: vec![],
                args: vec![],
            })),
        }),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("inherent");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    // Struct receivers always pass by pointer
    assert!(ir.contains("define i64 @tml_Point_x_coord(ptr %this)"));
    assert!(ir.contains("call i64 @tml_Point_x_coord(ptr %p.addr"));
}

#[test]
fn behavior_methods_and_super_calls_dispatch_statically() {
    // Quiet.speak is the base; Loud extends Quiet and its override
    // calls base.speak() as a direct call
    let mut module = Module::new("supers");
    module.decls.push(point_struct());
    module.decls.push(Decl::Behavior(BehaviorDef {
        visibility: Visibility::Public,
        name: "Quiet".into(),
        type_params: vec![],
        associated_types: vec![],
        methods: vec![BehaviorMethod {
            name: "speak".into(),
            params: vec![Param::new("this", Type::Param("Self".into()))],
            return_type: Some(Type::I64),
        }],
        super_behaviors: vec![],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Behavior(BehaviorDef {
        visibility: Visibility::Public,
        name: "Loud".into(),
        type_params: vec![],
        associated_types: vec![],
        methods: vec![BehaviorMethod {
            name: "speak".into(),
            params: vec![Param::new("this", Type::Param("Self".into()))],
            return_type: Some(Type::I64),
        }],
        super_behaviors: vec!["Quiet".into()],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Impl(ImplBlock {
        target: Type::named("Point"),
        behavior: Some("Quiet".into()),
        type_params: vec![],
        methods: vec![method(
            "speak",
            false,
            Some(Type::I64),
            Block::tail_only(Expr::int_typed(1, Type::I64)),
        )],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Impl(ImplBlock {
        target: Type::named("Point"),
        behavior: Some("Loud".into()),
        type_params: vec![],
        methods: vec![method(
            "speak",
            false,
            Some(Type::I64),
            Block::tail_only(Expr::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(Expr::BaseCall {
                    method: "speak".into(),
                    args: vec![],
                }),
                rhs: Box::new(Expr::int_typed(10, Type::I64)),
            }),
        )],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("supers");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    // Both impls coexist under behavior-qualified symbols
    assert!(ir.contains("define i64 @tml_Point_Quiet_speak(ptr %this)"));
    assert!(ir.contains("define i64 @tml_Point_Loud_speak(ptr %this)"));
    // The super-call is direct, no dispatch table
    assert!(ir.contains("call i64 @tml_Point_Quiet_speak(ptr"));
}

#[test]
fn generic_receiver_methods_instantiate_per_type() {
    let mut module = Module::new("boxes");
    module.decls.push(Decl::Struct(StructDef {
        visibility: Visibility::Public,
        name: "Carton".into(),
        type_params: vec![TypeParam::plain("T")],
        fields: vec![Field::new("inner", Type::Param("T".into()))],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Impl(ImplBlock {
        target: Type::generic("Carton", vec![Type::Param("T".into())]),
        behavior: None,
        type_params: vec![TypeParam::plain("T")],
        methods: vec![method(
            "get",
            false,
            Some(Type::Param("T".into())),
            Block::tail_only(Expr::Field {
                receiver: Box::new(Expr::ident("this")),
                field: "inner".into(),
            }),
        )],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "driver".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: Some(Type::I64),
        body: Some(Block {
            stmts: vec![Stmt::Let {
                name: "c".into(),
                ty: None,
                is_mut: false,
                value: Expr::StructLit {
                    name: "Carton".into(),
                    type_args: vec![Type::I64],
                    fields: vec![("inner".into(), Expr::int_typed(11, Type::I64))],
                },
            }],
            tail: Some(Box::new(Expr::MethodCall {
                receiver: Box::new(Expr::ident("c")),
                method: "get".into(),
                type_args: vec![],
                args: vec![],
            })),
        }),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("boxes");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("%struct.Carton__I64 = type { i64 }"));
    assert!(ir.contains("define linkonce_odr i64 @tml_Carton__I64_get(ptr %this)"));
}

#[test]
fn for_loops_desugar_through_iterator_next() {
    // Counter yields I64s through an Iterator impl; the for loop calls
    // next() per round and branches on the Maybe tag
    let mut module = Module::new("iters");
    module.decls.push(Decl::Struct(StructDef {
        visibility: Visibility::Public,
        name: "Counter".into(),
        type_params: vec![],
        fields: vec![Field::new("n", Type::I64)],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Impl(ImplBlock {
        target: Type::named("Counter"),
        behavior: Some("Iterator".into()),
        type_params: vec![],
        methods: vec![FuncDecl {
            visibility: Visibility::Public,
            name: "next".into(),
            is_async: false,
            type_params: vec![],
            where_clause: vec![],
            params: vec![Param {
                name: "this".into(),
                ty: Type::Param("Self".into()),
                is_mut: true,
            }],
            return_type: Some(Type::generic("Maybe", vec![Type::I64])),
            body: Some(Block::tail_only(Expr::EnumLit {
                enum_name: "Maybe".into(),
                type_args: vec![Type::I64],
                variant: "Nothing".into(),
                args: vec![],
            })),
            decorators: vec![],
            span: SourceSpan::unknown(),
        }],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "spin".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: None,
        body: Some(Block {
            stmts: vec![Stmt::For {
                var: "x".into(),
                iter: Expr::StructLit {
                    name: "Counter".into(),
                    type_args: vec![],
                    fields: vec![("n".into(), Expr::int_typed(0, Type::I64))],
                },
                body: Block::empty(),
            }],
            tail: None,
        }),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("iters");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("call %struct.Maybe__I64 @tml_Counter_Iterator_next(ptr"));
    assert!(ir.contains("for.head"));
    assert!(ir.contains("for.body"));
    assert!(ir.contains("for.end"));
}

#[test]
fn mut_primitive_receiver_passes_by_pointer() {
    let mut module = Module::new("prims");
    module.decls.push(Decl::Impl(ImplBlock {
        target: Type::I64,
        behavior: None,
        type_params: vec![],
        methods: vec![
            method("doubled", false, Some(Type::I64), {
                Block::tail_only(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(Expr::ident("this")),
                    rhs: Box::new(Expr::int_typed(2, Type::I64)),
                })
            }),
            method("bump", true, None, Block::empty()),
        ],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("prims");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    // Immutable primitive receiver goes by value, mut by pointer
    assert!(ir.contains("define i64 @tml_I64_doubled(i64 %this)"));
    assert!(ir.contains("define void @tml_I64_bump(ptr %this)"));
}
