// Tagged-union layout and pattern matching
// Covers enum construction, unit variants, tag stability, and the
// { i32, [N x i64] } shape

use tml_ast::*;
use tml_codegen::LlvmIrGen;

fn func(name: &str, ret: Option<Type>, body: Block) -> Decl {
    Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: name.into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![],
        return_type: ret,
        body: Some(body),
        decorators: vec![],
        span: SourceSpan::unknown(),
    })
}

fn emit(module: &Module) -> (LlvmIrGen, String) {
    let mut gen = LlvmIrGen::new(&module.name);
    let ir = gen.emit_module(module);
    (gen, ir)
}

#[test]
fn outcome_constructor_stores_tag_and_payload() {
    // Ok(42_i64) into Outcome[I64, Str]
    let mut module = Module::new("s1");
    module.decls.push(func(
        "make",
        Some(Type::generic("Outcome", vec![Type::I64, Type::Str])),
        Block::tail_only(Expr::EnumLit {
            enum_name: "Outcome".into(),
            type_args: vec![Type::I64, Type::Str],
            variant: "Ok".into(),
            args: vec![Expr::int_typed(42, Type::I64)],
        }),
    ));
    let (gen, ir) = emit(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("%struct.Outcome__I64__Str = type { i32, [1 x i64] }"));
    assert!(ir.contains("store i32 0"), "tag 0 for the first variant");
    assert!(ir.contains("store i64 42"), "payload written as i64");
}

#[test]
fn unit_variant_stores_tag_only() {
    // Maybe[I64] used as Nothing: tag 1, payload untouched
    let mut module = Module::new("s2");
    module.decls.push(func(
        "none_val",
        Some(Type::generic("Maybe", vec![Type::I64])),
        Block::tail_only(Expr::EnumLit {
            enum_name: "Maybe".into(),
            type_args: vec![Type::I64],
            variant: "Nothing".into(),
            args: vec![],
        }),
    ));
    let (gen, ir) = emit(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("%struct.Maybe__I64 = type { i32, [1 x i64] }"));
    assert!(ir.contains("store i32 1"), "Nothing is the second variant");
}

#[test]
fn data_free_enums_are_a_bare_tag() {
    let mut module = Module::new("simple");
    module.decls.push(Decl::Enum(EnumDef {
        visibility: Visibility::Public,
        name: "Color".into(),
        type_params: vec![],
        variants: vec![
            EnumVariant::unit("Red"),
            EnumVariant::unit("Green"),
            EnumVariant::unit("Blue"),
        ],
        span: SourceSpan::unknown(),
    }));
    let (gen, ir) = emit(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    assert!(ir.contains("%struct.Color = type { i32 }"));
}

#[test]
fn tags_follow_declaration_order() {
    let mut module = Module::new("tags");
    module.decls.push(Decl::Enum(EnumDef {
        visibility: Visibility::Public,
        name: "Color".into(),
        type_params: vec![],
        variants: vec![
            EnumVariant::unit("Red"),
            EnumVariant::unit("Green"),
            EnumVariant::unit("Blue"),
        ],
        span: SourceSpan::unknown(),
    }));
    // Reference Blue first; tags must not depend on reference order
    module.decls.push(func(
        "pick_blue",
        Some(Type::named("Color")),
        Block::tail_only(Expr::EnumLit {
            enum_name: "Color".into(),
            type_args: vec![],
            variant: "Blue".into(),
            args: vec![],
        }),
    ));
    let (gen, _) = emit(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    assert_eq!(gen.enum_tag("Color", "Red").unwrap(), 0);
    assert_eq!(gen.enum_tag("Color", "Green").unwrap(), 1);
    assert_eq!(gen.enum_tag("Color", "Blue").unwrap(), 2);
    assert_eq!(gen.enum_tag("Maybe", "Nothing").unwrap(), 1);
    assert_eq!(gen.enum_tag("Poll", "Ready").unwrap(), 0);
}

#[test]
fn multi_field_payload_rounds_up_to_words() {
    let mut module = Module::new("wide");
    module.decls.push(Decl::Enum(EnumDef {
        visibility: Visibility::Public,
        name: "Shape".into(),
        type_params: vec![],
        variants: vec![
            EnumVariant::unit("Empty"),
            EnumVariant::tuple("Rect", vec![Type::I64, Type::I64]),
            EnumVariant::tuple("Line", vec![Type::I32]),
        ],
        span: SourceSpan::unknown(),
    }));
    let (gen, ir) = emit(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());
    // Widest variant carries 16 bytes -> two payload words
    assert!(ir.contains("%struct.Shape = type { i32, [2 x i64] }"));
}

#[test]
fn when_extracts_tag_and_payload() {
    // when m { Just(v) => v, Nothing => 0 }
    let maybe_i64 = Type::generic("Maybe", vec![Type::I64]);
    let mut module = Module::new("s3");
    module.decls.push(Decl::Function(FuncDecl {
        visibility: Visibility::Public,
        name: "pick".into(),
        is_async: false,
        type_params: vec![],
        where_clause: vec![],
        params: vec![Param::new("m", maybe_i64)],
        return_type: Some(Type::I64),
        body: Some(Block::tail_only(Expr::When {
            scrutinee: Box::new(Expr::ident("m")),
            arms: vec![
                WhenArm {
                    pattern: Pattern::Variant {
                        enum_name: None,
                        variant: "Just".into(),
                        bindings: vec!["v".into()],
                    },
                    body: Block::tail_only(Expr::ident("v")),
                },
                WhenArm {
                    pattern: Pattern::Variant {
                        enum_name: None,
                        variant: "Nothing".into(),
                        bindings: vec![],
                    },
                    body: Block::tail_only(Expr::int_typed(0, Type::I64)),
                },
            ],
        })),
        decorators: vec![],
        span: SourceSpan::unknown(),
    }));
    let (gen, ir) = emit(&module);
    assert!(gen.errors().is_empty(), "{:?}", gen.errors());

    assert!(ir.contains("getelementptr inbounds %struct.Maybe__I64, ptr"));
    assert!(ir.contains("icmp eq i32"), "discriminant comparison");
    assert!(ir.contains("load i64, ptr"), "payload reinterpreted as i64");
}

#[test]
fn payload_overflow_is_reported() {
    let mut module = Module::new("huge");
    // 9000 * 8 bytes > the 64 KiB payload cap
    let fields: Vec<Type> = (0..9000).map(|_| Type::I64).collect();
    module.decls.push(Decl::Enum(EnumDef {
        visibility: Visibility::Public,
        name: "Huge".into(),
        type_params: vec![],
        variants: vec![EnumVariant::tuple("Blob", fields)],
        span: SourceSpan::unknown(),
    }));
    let (gen, _) = emit(&module);
    assert_eq!(gen.errors().len(), 1);
    assert_eq!(
        gen.errors()[0].kind,
        tml_codegen::CodegenErrorKind::LayoutOverflow
    );
}
