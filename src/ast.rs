//! Typed AST handed over by the front end.
//!
//! Every node is wrapped in [`Spanned`], whose [`NodeId`](crate::span::NodeId)
//! keys the type checker's side tables and the analysis results.

use crate::span::Spanned;
use crate::types::ChanDir;

pub type Ident = Spanned<String>;

#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Func(Spanned<FuncDecl>),
    Type(Spanned<TypeSpec>),
    Var(Spanned<ValueSpec>),
    Const(Spanned<ValueSpec>),
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: Ident,
    pub recv: Option<FieldDecl>,
    pub ty: FuncType,
    /// `None` for functions implemented elsewhere (linkname/assembly).
    pub body: Option<Spanned<Block>>,
}

impl FuncDecl {
    pub fn is_generic(&self) -> bool {
        !self.ty.type_params.is_empty()
            || self.recv.as_ref().is_some_and(|r| recv_has_type_params(&r.ty))
    }
}

fn recv_has_type_params(ty: &Spanned<Expr>) -> bool {
    match &ty.node {
        Expr::Star(inner) | Expr::Paren(inner) => recv_has_type_params(inner),
        Expr::Index { .. } => true,
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: Ident,
    pub type_params: Vec<FieldDecl>,
    /// `type A = B`
    pub alias: bool,
    pub ty: Spanned<Expr>,
}

#[derive(Debug, Clone)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub ty: Option<Spanned<Expr>>,
    pub values: Vec<Spanned<Expr>>,
}

/// A parameter, result, struct field, interface element or type parameter
/// group: zero or more names sharing one type expression.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub names: Vec<Ident>,
    pub ty: Spanned<Expr>,
}

#[derive(Debug, Clone, Default)]
pub struct FuncType {
    pub type_params: Vec<FieldDecl>,
    pub params: Vec<FieldDecl>,
    pub results: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Define,
    Op(BinOp),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Spanned<Expr>),
    Send {
        chan: Spanned<Expr>,
        value: Spanned<Expr>,
    },
    IncDec {
        target: Spanned<Expr>,
        inc: bool,
    },
    Assign {
        lhs: Vec<Spanned<Expr>>,
        op: AssignOp,
        rhs: Vec<Spanned<Expr>>,
    },
    /// The expression is always a call.
    Go(Spanned<Expr>),
    Defer(Spanned<Expr>),
    Return(Vec<Spanned<Expr>>),
    Branch {
        kind: BranchKind,
        label: Option<Ident>,
    },
    Block(Spanned<Block>),
    If {
        init: Option<Box<Spanned<Stmt>>>,
        cond: Spanned<Expr>,
        then_block: Spanned<Block>,
        else_branch: Option<Box<Spanned<Stmt>>>,
    },
    Switch {
        init: Option<Box<Spanned<Stmt>>>,
        tag: Option<Spanned<Expr>>,
        clauses: Vec<Spanned<CaseClause>>,
    },
    TypeSwitch {
        init: Option<Box<Spanned<Stmt>>>,
        /// `x := y.(type)` or `y.(type)`
        assign: Box<Spanned<Stmt>>,
        clauses: Vec<Spanned<CaseClause>>,
    },
    Select {
        clauses: Vec<Spanned<CommClause>>,
    },
    For {
        init: Option<Box<Spanned<Stmt>>>,
        cond: Option<Spanned<Expr>>,
        post: Option<Box<Spanned<Stmt>>>,
        body: Spanned<Block>,
    },
    Range {
        key: Option<Spanned<Expr>>,
        value: Option<Spanned<Expr>>,
        define: bool,
        x: Spanned<Expr>,
        body: Spanned<Block>,
    },
    Labeled {
        label: Ident,
        stmt: Box<Spanned<Stmt>>,
    },
    Decl(Decl),
    Empty,
}

#[derive(Debug, Clone)]
pub struct CaseClause {
    /// Empty for the `default` clause.
    pub exprs: Vec<Spanned<Expr>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct CommClause {
    /// Send or receive statement; `None` for the `default` clause.
    pub comm: Option<Box<Spanned<Stmt>>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    AndNot,
    Shl,
    Shr,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    /// `<-x`
    Recv,
    /// `&x`
    Addr,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(String),
    BasicLit {
        kind: LitKind,
        value: String,
    },
    CompositeLit {
        ty: Option<Box<Spanned<Expr>>>,
        elts: Vec<Spanned<Expr>>,
    },
    FuncLit {
        ty: FuncType,
        body: Spanned<Block>,
    },
    Paren(Box<Spanned<Expr>>),
    Selector {
        x: Box<Spanned<Expr>>,
        sel: Ident,
    },
    /// `x[i]`, and `x[A, B]` for explicit instantiation.
    Index {
        x: Box<Spanned<Expr>>,
        indices: Vec<Spanned<Expr>>,
    },
    Slice {
        x: Box<Spanned<Expr>>,
        low: Option<Box<Spanned<Expr>>>,
        high: Option<Box<Spanned<Expr>>>,
        max: Option<Box<Spanned<Expr>>>,
    },
    /// `x.(T)`; `ty` is `None` for `x.(type)`.
    TypeAssert {
        x: Box<Spanned<Expr>>,
        ty: Option<Box<Spanned<Expr>>>,
    },
    Call {
        fun: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
        ellipsis: bool,
    },
    /// Dereference or pointer type.
    Star(Box<Spanned<Expr>>),
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    KeyValue {
        key: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },

    // Type expressions
    ArrayType {
        len: Option<Box<Spanned<Expr>>>,
        elem: Box<Spanned<Expr>>,
    },
    StructType(Vec<FieldDecl>),
    FuncType(FuncType),
    /// Methods carry a name and a `FuncType`; embedded elements have no name.
    InterfaceType(Vec<FieldDecl>),
    MapType {
        key: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },
    ChanType {
        dir: ChanDir,
        elem: Box<Spanned<Expr>>,
    },
    Ellipsis(Option<Box<Spanned<Expr>>>),
}

impl Expr {
    /// Whether the node is syntactically a type literal.
    pub fn is_type_literal(&self) -> bool {
        matches!(
            self,
            Expr::ArrayType { .. }
                | Expr::StructType(_)
                | Expr::FuncType(_)
                | Expr::InterfaceType(_)
                | Expr::MapType { .. }
                | Expr::ChanType { .. }
        )
    }
}

/// Strip any number of enclosing parentheses.
pub fn unparen(expr: &Spanned<Expr>) -> &Spanned<Expr> {
    match &expr.node {
        Expr::Paren(inner) => unparen(inner),
        _ => expr,
    }
}
