// Drop ordering, output determinism, type-before-use, coverage hooks,
// and error collection

use tml_ast::*;
use tml_codegen::codegen::coverage::fnv1a_hash;
use tml_codegen::{CodegenOptions, LlvmIrGen};

/// A struct with a Drop impl plus a function declaring three locals
fn droppable_module() -> Module {
    let mut module = Module::new("drops");
    module.decls.push(Decl::Struct(StructDef {
        visibility: Visibility::Public,
        name: "Res".into(),
        type_params: vec![],
        fields: vec![Field::new("id", Type::I64)],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Impl(ImplBlock {
        target: Type::named("Res"),
        behavior: Some("Drop".into()),
        type_params: vec![],
        methods: vec![FuncDecl {
            visibility: Visibility::Public,
            name: "drop".into(),
            is_async: false,
            type_params: vec![],
            where_clause: vec![],
            params: vec![Param {
                name: "this".into(),
                ty: Type::Param("Self".into()),
                is_mut: true,
            }],
            return_type: None,
            body: Some(Block::empty()),
            decorators: vec![],
            span: SourceSpan::unknown(),
        }],
        span: SourceSpan::unknown(),
    }));

    let res_lit = |id: i128| Expr::StructLit {
        name: "Res".into(),
        type_args: vec![],
        fields: vec![("id".into(), Expr::int_typed(id, Type::I64))],
    };
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "use3".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: None,
        body: Some(Block {
            stmts: vec![
                Stmt::Let {
                    name: "a".into(),
                    ty: None,
                    is_mut: false,
                    value: res_lit(1),
                },
                Stmt::Let {
                    name: "b".into(),
                    ty: None,
                    is_mut: false,
                    value: res_lit(2),
                },
                Stmt::Let {
                    name: "c".into(),
                    ty: None,
                    is_mut: false,
                    value: res_lit(3),
                },
            ],
            tail: None,
        }),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));
    module
}

#[test]
fn drops_fire_in_reverse_declaration_order() {
    let module = droppable_module();
    let mut gen = LlvmIrGen::new("drops");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    let use3_start = ir.find("@tml_use3").expect("use3 emitted");
    let body = &ir[use3_start..];
    let drop_call = "call void @tml_Res_Drop_drop(ptr %";
    let first = body.find(drop_call).expect("drops emitted");
    let calls: Vec<&str> = body
        .match_indices(drop_call)
        .map(|(i, _)| {
            let rest = &body[i + drop_call.len()..];
            let end = rest.find(')').unwrap_or(rest.len());
            &rest[..end]
        })
        .collect();
    assert_eq!(calls.len(), 3, "three locals, three drops");
    assert!(calls[0].starts_with('c'), "c drops first, found {}", calls[0]);
    assert!(calls[1].starts_with('b'), "b drops second");
    assert!(calls[2].starts_with('a'), "a drops last");
    let _ = first;
}

#[test]
fn emission_is_deterministic() {
    let module = droppable_module();
    let mut first = LlvmIrGen::new("drops");
    let mut second = LlvmIrGen::new("drops");
    assert_eq!(first.emit_module(&module), second.emit_module(&module));
}

#[test]
fn emission_survives_a_serde_round_trip() {
    // The driver hands modules over as JSON; deserializing must not
    // perturb the output
    let module = droppable_module();
    let json = serde_json::to_string(&module).unwrap();
    let back: Module = serde_json::from_str(&json).unwrap();
    let mut direct = LlvmIrGen::new("drops");
    let mut via_json = LlvmIrGen::new("drops");
    assert_eq!(direct.emit_module(&module), via_json.emit_module(&back));
}

#[test]
fn every_struct_use_has_a_prior_definition() {
    // Build something that instantiates a few generic types
    let mut module = droppable_module();
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "wrap".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: Some(Type::generic("Maybe", vec![Type::named("Res")])),
        body: Some(Block::tail_only(Expr::EnumLit {
            enum_name: "Maybe".into(),
            type_args: vec![Type::named("Res")],
            variant: "Nothing".into(),
            args: vec![],
        })),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("drops");
    let _ = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    let type_defs = gen.type_defs_section().to_string();
    let body = gen.body_section();
    let mut index = 0;
    while let Some(pos) = body[index..].find("%struct.") {
        let start = index + pos + "%struct.".len();
        let end = body[start..]
            .find(|c: char| !c.is_alphanumeric() && c != '_')
            .map(|o| start + o)
            .unwrap_or(body.len());
        let name = &body[start..end];
        assert!(
            type_defs.contains(&format!("%struct.{} = type", name)),
            "%struct.{} used in body but never defined",
            name
        );
        index = end;
    }
}

#[test]
fn coverage_hooks_key_by_function_name_hash() {
    let module = droppable_module();
    let options = CodegenOptions {
        coverage_enabled: true,
        llvm_source_coverage: true,
        ..Default::default()
    };
    let mut gen = LlvmIrGen::with_options("drops", options);
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("call void @tml_cover_func(ptr @.str."));
    assert!(ir.contains("@__profn_tml_use3"));
    let expected = fnv1a_hash("tml_use3");
    assert!(
        ir.contains(&format!("ptr @__profn_tml_use3, i64 {}, i32 1, i32 0", expected)),
        "instrprof increment carries the FNV-1a hash of the symbol"
    );
}

#[test]
fn errors_are_collected_not_thrown() {
    let mut module = Module::new("broken");
    // Two independent failures in one emission
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "one".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: None,
        body: Some(Block::tail_only(Expr::call("missing_fn", vec![]))),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "two".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![Param::new("x", Type::named("NoSuchType"))],
        return_type: None,
        body: Some(Block::empty()),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("broken");
    let _ = gen.emit_module(&module);
    assert_eq!(gen.errors().len(), 2, "{:?}", gen.errors());
    assert!(gen
        .errors()
        .iter()
        .all(|e| e.kind == tml_codegen::CodegenErrorKind::UnknownSymbol));
}

#[test]
fn drop_scope_exits_cover_early_returns() {
    // return inside a conditional still drops the live local
    let mut module = droppable_module();
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "maybe_early".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![Param::new("flag", Type::Bool)],
        return_type: None,
        body: Some(Block {
            stmts: vec![
                Stmt::Let {
                    name: "r".into(),
                    ty: None,
                    is_mut: false,
                    value: Expr::StructLit {
                        name: "Res".into(),
                        type_args: vec![],
                        fields: vec![("id".into(), Expr::int_typed(9, Type::I64))],
                    },
                },
                Stmt::Expr(Expr::If {
                    cond: Box::new(Expr::ident("flag")),
                    then_block: Block {
                        stmts: vec![Stmt::Return(None)],
                        tail: None,
                    },
                    else_block: None,
                }),
            ],
            tail: None,
        }),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));

    let mut gen = LlvmIrGen::new("drops");
    let ir = gen.emit_module(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    let start = ir.find("@tml_maybe_early").expect("function emitted");
    let body = &ir[start..];
    // Drops on both the early return path and the fall-through path
    assert_eq!(
        body.matches("call void @tml_Res_Drop_drop").count(),
        2,
        "early return and fall-through both drop"
    );
}
