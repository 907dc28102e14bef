//! AST visitor infrastructure.
//!
//! Implement [`Visitor`] for a pass, overriding only the methods you need, and
//! call the matching `walk_*` function inside an override to continue the
//! default recursion. Omitting the walk call prunes traversal at that node.
//!
//! Passes that thread per-node context through the traversal (the blocking
//! analysis) use a hand-written recursion instead.

use crate::ast::*;
use crate::span::{NodeId, Spanned};

/// Read-only AST visitor. Default implementations recurse into all children.
pub trait Visitor<'ast>: Sized {
    fn visit_file(&mut self, file: &'ast File) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &'ast Decl) {
        walk_decl(self, decl);
    }

    fn visit_func_decl(&mut self, func: &'ast Spanned<FuncDecl>) {
        walk_func_decl(self, func);
    }

    fn visit_type_spec(&mut self, spec: &'ast Spanned<TypeSpec>) {
        walk_type_spec(self, spec);
    }

    fn visit_value_spec(&mut self, spec: &'ast Spanned<ValueSpec>) {
        walk_value_spec(self, spec);
    }

    fn visit_block(&mut self, block: &'ast Spanned<Block>) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &'ast Spanned<Stmt>) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Spanned<Expr>) {
        walk_expr(self, expr);
    }

    /// Called for every identifier occurrence: `Expr::Ident` nodes as well as
    /// declared names, selector names and labels.
    fn visit_ident(&mut self, _id: NodeId, _name: &'ast str) {}
}

// ============================================================================
// Walk Functions
// ============================================================================

pub fn walk_file<'ast, V: Visitor<'ast>>(v: &mut V, file: &'ast File) {
    for decl in &file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<'ast, V: Visitor<'ast>>(v: &mut V, decl: &'ast Decl) {
    match decl {
        Decl::Func(func) => v.visit_func_decl(func),
        Decl::Type(spec) => v.visit_type_spec(spec),
        Decl::Var(spec) | Decl::Const(spec) => v.visit_value_spec(spec),
    }
}

pub fn walk_func_decl<'ast, V: Visitor<'ast>>(v: &mut V, func: &'ast Spanned<FuncDecl>) {
    if let Some(recv) = &func.node.recv {
        walk_field_decl(v, recv);
    }
    v.visit_ident(func.node.name.id, &func.node.name.node);
    walk_func_type(v, &func.node.ty);
    if let Some(body) = &func.node.body {
        v.visit_block(body);
    }
}

pub fn walk_type_spec<'ast, V: Visitor<'ast>>(v: &mut V, spec: &'ast Spanned<TypeSpec>) {
    v.visit_ident(spec.node.name.id, &spec.node.name.node);
    for tp in &spec.node.type_params {
        walk_field_decl(v, tp);
    }
    v.visit_expr(&spec.node.ty);
}

pub fn walk_value_spec<'ast, V: Visitor<'ast>>(v: &mut V, spec: &'ast Spanned<ValueSpec>) {
    for name in &spec.node.names {
        v.visit_ident(name.id, &name.node);
    }
    if let Some(ty) = &spec.node.ty {
        v.visit_expr(ty);
    }
    for value in &spec.node.values {
        v.visit_expr(value);
    }
}

pub fn walk_field_decl<'ast, V: Visitor<'ast>>(v: &mut V, field: &'ast FieldDecl) {
    for name in &field.names {
        v.visit_ident(name.id, &name.node);
    }
    v.visit_expr(&field.ty);
}

pub fn walk_func_type<'ast, V: Visitor<'ast>>(v: &mut V, ty: &'ast FuncType) {
    for field in ty.type_params.iter().chain(&ty.params).chain(&ty.results) {
        walk_field_decl(v, field);
    }
}

pub fn walk_block<'ast, V: Visitor<'ast>>(v: &mut V, block: &'ast Spanned<Block>) {
    for stmt in &block.node.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast>>(v: &mut V, stmt: &'ast Spanned<Stmt>) {
    match &stmt.node {
        Stmt::Expr(expr) | Stmt::Go(expr) | Stmt::Defer(expr) => v.visit_expr(expr),
        Stmt::Send { chan, value } => {
            v.visit_expr(chan);
            v.visit_expr(value);
        }
        Stmt::IncDec { target, .. } => v.visit_expr(target),
        Stmt::Assign { lhs, rhs, .. } => {
            for e in lhs.iter().chain(rhs) {
                v.visit_expr(e);
            }
        }
        Stmt::Return(results) => {
            for e in results {
                v.visit_expr(e);
            }
        }
        Stmt::Branch { label, .. } => {
            if let Some(label) = label {
                v.visit_ident(label.id, &label.node);
            }
        }
        Stmt::Block(block) => v.visit_block(block),
        Stmt::If { init, cond, then_block, else_branch } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            v.visit_expr(cond);
            v.visit_block(then_block);
            if let Some(els) = else_branch {
                v.visit_stmt(els);
            }
        }
        Stmt::Switch { init, tag, clauses } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(tag) = tag {
                v.visit_expr(tag);
            }
            walk_case_clauses(v, clauses);
        }
        Stmt::TypeSwitch { init, assign, clauses } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            v.visit_stmt(assign);
            walk_case_clauses(v, clauses);
        }
        Stmt::Select { clauses } => {
            for clause in clauses {
                if let Some(comm) = &clause.node.comm {
                    v.visit_stmt(comm);
                }
                for s in &clause.node.body {
                    v.visit_stmt(s);
                }
            }
        }
        Stmt::For { init, cond, post, body } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            if let Some(post) = post {
                v.visit_stmt(post);
            }
            v.visit_block(body);
        }
        Stmt::Range { key, value, x, body, .. } => {
            if let Some(key) = key {
                v.visit_expr(key);
            }
            if let Some(value) = value {
                v.visit_expr(value);
            }
            v.visit_expr(x);
            v.visit_block(body);
        }
        Stmt::Labeled { label, stmt } => {
            v.visit_ident(label.id, &label.node);
            v.visit_stmt(stmt);
        }
        Stmt::Decl(decl) => v.visit_decl(decl),
        Stmt::Empty => {}
    }
}

fn walk_case_clauses<'ast, V: Visitor<'ast>>(v: &mut V, clauses: &'ast [Spanned<CaseClause>]) {
    for clause in clauses {
        for e in &clause.node.exprs {
            v.visit_expr(e);
        }
        for s in &clause.node.body {
            v.visit_stmt(s);
        }
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast>>(v: &mut V, expr: &'ast Spanned<Expr>) {
    match &expr.node {
        Expr::Ident(name) => v.visit_ident(expr.id, name),
        Expr::BasicLit { .. } => {}
        Expr::CompositeLit { ty, elts } => {
            if let Some(ty) = ty {
                v.visit_expr(ty);
            }
            for e in elts {
                v.visit_expr(e);
            }
        }
        Expr::FuncLit { ty, body } => {
            walk_func_type(v, ty);
            v.visit_block(body);
        }
        Expr::Paren(inner) | Expr::Star(inner) => v.visit_expr(inner),
        Expr::Selector { x, sel } => {
            v.visit_expr(x);
            v.visit_ident(sel.id, &sel.node);
        }
        Expr::Index { x, indices } => {
            v.visit_expr(x);
            for i in indices {
                v.visit_expr(i);
            }
        }
        Expr::Slice { x, low, high, max } => {
            v.visit_expr(x);
            for e in [low, high, max].into_iter().flatten() {
                v.visit_expr(e);
            }
        }
        Expr::TypeAssert { x, ty } => {
            v.visit_expr(x);
            if let Some(ty) = ty {
                v.visit_expr(ty);
            }
        }
        Expr::Call { fun, args, .. } => {
            v.visit_expr(fun);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::KeyValue { key, value } => {
            v.visit_expr(key);
            v.visit_expr(value);
        }
        Expr::ArrayType { len, elem } => {
            if let Some(len) = len {
                v.visit_expr(len);
            }
            v.visit_expr(elem);
        }
        Expr::StructType(fields) | Expr::InterfaceType(fields) => {
            for f in fields {
                walk_field_decl(v, f);
            }
        }
        Expr::FuncType(ty) => walk_func_type(v, ty),
        Expr::MapType { key, value } => {
            v.visit_expr(key);
            v.visit_expr(value);
        }
        Expr::ChanType { elem, .. } => v.visit_expr(elem),
        Expr::Ellipsis(elem) => {
            if let Some(elem) = elem {
                v.visit_expr(elem);
            }
        }
    }
}
