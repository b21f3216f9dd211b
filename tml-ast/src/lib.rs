use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location of a declaration (line/column in the original file).
/// The front-end fills these in; `unknown()` is used for synthesized nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn unknown() -> Self {
        Self { line: 0, column: 0 }
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Root of a typed module handed over by the front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    /// Module path segments, e.g. ["std", "collections"]
    #[serde(default)]
    pub path: Vec<String>,
    pub decls: Vec<Decl>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: Vec::new(),
            decls: Vec::new(),
        }
    }
}

/// Top-level declarations (structs, enums, behaviors, impls, functions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Struct(StructDef),
    Enum(EnumDef),
    Behavior(BehaviorDef),
    Impl(ImplBlock),
    Function(FuncDecl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Private
    }
}

/// Generic type parameter with behavior bounds: T, T: Display, T: Eq + Hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<BehaviorBound>,
}

impl TypeParam {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Vec::new(),
        }
    }
}

/// A behavior bound, possibly parameterized: Display, Comparable[T]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorBound {
    pub name: String,
    #[serde(default)]
    pub type_args: Vec<Type>,
}

impl BehaviorBound {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_args: Vec::new(),
        }
    }
}

/// Where-clause predicate: where T: Display, U: Eq + Hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WherePredicate {
    pub param: String,
    pub bounds: Vec<BehaviorBound>,
}

/// Semantic type as resolved by the front-end.
///
/// `Param` placeholders are only valid inside an unresolved generic
/// template; emitted function bodies never contain one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Bool,
    Char,
    Str,
    Unit,
    Never,

    /// Named type (struct, enum, behavior object), possibly instantiated:
    /// Maybe[I64], Outcome[Str, IoError]
    Named {
        name: String,
        #[serde(default)]
        module_path: Vec<String>,
        #[serde(default)]
        type_args: Vec<Type>,
    },

    /// Generic placeholder bound by an enclosing declaration
    Param(String),

    /// Reference: ref T / mut ref T
    Ref { is_mut: bool, inner: Box<Type> },

    /// Raw pointer: ptr T / mut ptr T
    Ptr { is_mut: bool, inner: Box<Type> },

    /// Tuple: (T1, T2, ...)
    Tuple(Vec<Type>),

    /// Function type: func(T1, T2) -> R
    Function {
        params: Vec<Type>,
        return_type: Box<Type>,
        is_async: bool,
    },
}

impl Type {
    /// Plain named type without arguments
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named {
            name: name.into(),
            module_path: Vec::new(),
            type_args: Vec::new(),
        }
    }

    /// Named type with type arguments
    pub fn generic(name: impl Into<String>, type_args: Vec<Type>) -> Self {
        Type::Named {
            name: name.into(),
            module_path: Vec::new(),
            type_args,
        }
    }

    pub fn ptr(inner: Type) -> Self {
        Type::Ptr {
            is_mut: false,
            inner: Box::new(inner),
        }
    }

    pub fn reference(inner: Type) -> Self {
        Type::Ref {
            is_mut: false,
            inner: Box::new(inner),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::I8
                | Type::I16
                | Type::I32
                | Type::I64
                | Type::I128
                | Type::U8
                | Type::U16
                | Type::U32
                | Type::U64
                | Type::U128
                | Type::F32
                | Type::F64
                | Type::Bool
                | Type::Char
                | Type::Str
                | Type::Unit
                | Type::Never
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::I8
                | Type::I16
                | Type::I32
                | Type::I64
                | Type::I128
                | Type::U8
                | Type::U16
                | Type::U32
                | Type::U64
                | Type::U128
        )
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::I128
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            Type::U8 | Type::U16 | Type::U32 | Type::U64 | Type::U128
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Integer bit width, if this is an integer type
    pub fn int_bit_width(&self) -> Option<u32> {
        match self {
            Type::I8 | Type::U8 => Some(8),
            Type::I16 | Type::U16 => Some(16),
            Type::I32 | Type::U32 => Some(32),
            Type::I64 | Type::U64 => Some(64),
            Type::I128 | Type::U128 => Some(128),
            _ => None,
        }
    }

    /// True if any `Param` placeholder occurs anywhere inside this type
    pub fn contains_param(&self) -> bool {
        match self {
            Type::Param(_) => true,
            Type::Named { type_args, .. } => type_args.iter().any(Type::contains_param),
            Type::Ref { inner, .. } | Type::Ptr { inner, .. } => inner.contains_param(),
            Type::Tuple(elems) => elems.iter().any(Type::contains_param),
            Type::Function {
                params,
                return_type,
                ..
            } => params.iter().any(Type::contains_param) || return_type.contains_param(),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I8 => write!(f, "I8"),
            Type::I16 => write!(f, "I16"),
            Type::I32 => write!(f, "I32"),
            Type::I64 => write!(f, "I64"),
            Type::I128 => write!(f, "I128"),
            Type::U8 => write!(f, "U8"),
            Type::U16 => write!(f, "U16"),
            Type::U32 => write!(f, "U32"),
            Type::U64 => write!(f, "U64"),
            Type::U128 => write!(f, "U128"),
            Type::F32 => write!(f, "F32"),
            Type::F64 => write!(f, "F64"),
            Type::Bool => write!(f, "Bool"),
            Type::Char => write!(f, "Char"),
            Type::Str => write!(f, "Str"),
            Type::Unit => write!(f, "Unit"),
            Type::Never => write!(f, "Never"),
            Type::Named {
                name, type_args, ..
            } => {
                write!(f, "{}", name)?;
                if !type_args.is_empty() {
                    write!(f, "[")?;
                    for (i, arg) in type_args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
            Type::Param(name) => write!(f, "{}", name),
            Type::Ref { is_mut, inner } => {
                write!(f, "{}ref {}", if *is_mut { "mut " } else { "" }, inner)
            }
            Type::Ptr { is_mut, inner } => {
                write!(f, "{}ptr {}", if *is_mut { "mut " } else { "" }, inner)
            }
            Type::Tuple(elems) => {
                write!(f, "(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, ")")
            }
            Type::Function {
                params,
                return_type,
                is_async,
            } => {
                if *is_async {
                    write!(f, "async ")?;
                }
                write!(f, "func(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", return_type)
            }
        }
    }
}

/// Struct field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Struct declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    #[serde(default)]
    pub visibility: Visibility,
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub span: SourceSpan,
}

impl StructDef {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

/// Payload shape of an enum variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariantFields {
    Unit,
    Tuple(Vec<Type>),
    Struct(Vec<Field>),
}

impl VariantFields {
    /// Payload field types in declaration order (struct fields flattened)
    pub fn field_types(&self) -> Vec<Type> {
        match self {
            VariantFields::Unit => Vec::new(),
            VariantFields::Tuple(types) => types.clone(),
            VariantFields::Struct(fields) => fields.iter().map(|f| f.ty.clone()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, VariantFields::Unit)
            || matches!(self, VariantFields::Tuple(t) if t.is_empty())
            || matches!(self, VariantFields::Struct(s) if s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    #[serde(default = "variant_fields_unit")]
    pub fields: VariantFields,
}

fn variant_fields_unit() -> VariantFields {
    VariantFields::Unit
}

impl EnumVariant {
    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: VariantFields::Unit,
        }
    }

    pub fn tuple(name: impl Into<String>, types: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            fields: VariantFields::Tuple(types),
        }
    }
}

/// Enum declaration. Variant tags are zero-based declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    #[serde(default)]
    pub visibility: Visibility,
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    pub variants: Vec<EnumVariant>,
    #[serde(default)]
    pub span: SourceSpan,
}

impl EnumDef {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// True if no variant carries payload data
    pub fn is_simple(&self) -> bool {
        self.variants.iter().all(|v| v.fields.is_empty())
    }
}

/// Method signature inside a behavior declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<Type>,
}

/// Behavior declaration (a contract of method signatures)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDef {
    #[serde(default)]
    pub visibility: Visibility,
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub associated_types: Vec<String>,
    pub methods: Vec<BehaviorMethod>,
    #[serde(default)]
    pub super_behaviors: Vec<String>,
    #[serde(default)]
    pub span: SourceSpan,
}

/// Function decorators: @test, @should_panic, @extern(...), @link(...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decorator {
    Test,
    ShouldPanic,
    Extern {
        abi: String,
        symbol: Option<String>,
    },
    Link(String),
}

/// Function parameter. `name` of "this" or "self" marks the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    #[serde(default)]
    pub is_mut: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            is_mut: false,
        }
    }

    /// Receiver parameters are spelled `this` (or `self`, an accepted alias)
    pub fn is_receiver(&self) -> bool {
        self.name == "this" || self.name == "self"
    }
}

/// Function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    #[serde(default)]
    pub visibility: Visibility,
    pub name: String,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub where_clause: Vec<WherePredicate>,
    pub params: Vec<Param>,
    pub return_type: Option<Type>,
    /// None for extern declarations
    pub body: Option<Block>,
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    #[serde(default)]
    pub span: SourceSpan,
}

impl FuncDecl {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn is_test(&self) -> bool {
        self.decorators.iter().any(|d| matches!(d, Decorator::Test))
    }

    pub fn should_panic(&self) -> bool {
        self.decorators
            .iter()
            .any(|d| matches!(d, Decorator::ShouldPanic))
    }

    /// The @extern decorator, if present
    pub fn extern_decorator(&self) -> Option<(&str, Option<&str>)> {
        self.decorators.iter().find_map(|d| match d {
            Decorator::Extern { abi, symbol } => Some((abi.as_str(), symbol.as_deref())),
            _ => None,
        })
    }

    pub fn is_extern(&self) -> bool {
        self.extern_decorator().is_some()
    }

    pub fn link_libraries(&self) -> impl Iterator<Item = &str> {
        self.decorators.iter().filter_map(|d| match d {
            Decorator::Link(lib) => Some(lib.as_str()),
            _ => None,
        })
    }
}

/// Impl block: inherent methods or a behavior implementation for a target type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplBlock {
    /// Target type, possibly generic over the block's type params
    pub target: Type,
    /// Behavior being implemented, if any
    #[serde(default)]
    pub behavior: Option<String>,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    pub methods: Vec<FuncDecl>,
    #[serde(default)]
    pub span: SourceSpan,
}

/// Statement block with an optional trailing expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    #[serde(default)]
    pub tail: Option<Box<Expr>>,
}

impl Block {
    pub fn empty() -> Self {
        Self {
            stmts: Vec::new(),
            tail: None,
        }
    }

    pub fn tail_only(expr: Expr) -> Self {
        Self {
            stmts: Vec::new(),
            tail: Some(Box::new(expr)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Let {
        name: String,
        ty: Option<Type>,
        #[serde(default)]
        is_mut: bool,
        value: Expr,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    Expr(Expr),
    Return(Option<Expr>),
    Break,
    Continue,
    While {
        cond: Expr,
        body: Block,
    },
    Loop {
        body: Block,
    },
    For {
        var: String,
        iter: Expr,
        body: Block,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal; `ty` carries a suffix like 42_i64, else defaults to I32
    IntLit {
        value: i128,
        #[serde(default)]
        ty: Option<Type>,
    },
    /// Float literal; defaults to F64
    FloatLit {
        value: f64,
        #[serde(default)]
        ty: Option<Type>,
    },
    BoolLit(bool),
    CharLit(char),
    StrLit(String),
    UnitLit,
    Ident(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Direct call by name: user functions, builtins, generic functions.
    /// Empty `type_args` on a generic callee means "infer from arguments".
    Call {
        callee: String,
        #[serde(default)]
        type_args: Vec<Type>,
        args: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        #[serde(default)]
        type_args: Vec<Type>,
        args: Vec<Expr>,
    },
    /// base.method(...) — call the super-behavior's implementation
    BaseCall {
        method: String,
        args: Vec<Expr>,
    },
    Field {
        receiver: Box<Expr>,
        field: String,
    },
    StructLit {
        name: String,
        #[serde(default)]
        type_args: Vec<Type>,
        fields: Vec<(String, Expr)>,
    },
    /// Enum variant construction: Maybe[I64].Just(x)
    EnumLit {
        enum_name: String,
        #[serde(default)]
        type_args: Vec<Type>,
        variant: String,
        args: Vec<Expr>,
    },
    Tuple(Vec<Expr>),
    If {
        cond: Box<Expr>,
        then_block: Block,
        else_block: Option<Block>,
    },
    /// Tagged pattern matching
    When {
        scrutinee: Box<Expr>,
        arms: Vec<WhenArm>,
    },
    BlockExpr(Block),
    Await(Box<Expr>),
    /// Error propagation: expr!
    Try(Box<Expr>),
    RefOf {
        is_mut: bool,
        expr: Box<Expr>,
    },
    Deref(Box<Expr>),
}

impl Expr {
    pub fn int(value: i128) -> Self {
        Expr::IntLit { value, ty: None }
    }

    pub fn int_typed(value: i128, ty: Type) -> Self {
        Expr::IntLit {
            value,
            ty: Some(ty),
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: callee.into(),
            type_args: Vec::new(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenArm {
    pub pattern: Pattern,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Just(v), Outcome.Err(e); bindings are payload names in order,
    /// "_" for ignored positions
    Variant {
        #[serde(default)]
        enum_name: Option<String>,
        variant: String,
        #[serde(default)]
        bindings: Vec<String>,
    },
    /// Catch-all that binds the scrutinee
    Binding(String),
    Wildcard,
}
