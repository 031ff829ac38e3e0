//! Indented tree-shape listing of an [`Ast`], one node per line.
//!
//! This traversal only reads the tree. It never resolves names, fills
//! resolution caches or evaluates anything.

use std::io::{self, Write};

use crate::{
    ast::{Ast, Literal, NodeId, NodeKind},
    stack::ensure_sufficient_stack,
};

/// Writes the tree below the root of `ast`. A tree without a root writes
/// nothing.
pub fn dump<W: Write>(ast: &Ast, out: &mut W) -> io::Result<()> {
    match ast.root() {
        Some(root) => Dumper { ast, out }.node(root, 0),
        None => Ok(()),
    }
}

struct Dumper<'a, W> {
    ast: &'a Ast,
    out: &'a mut W,
}

impl<W: Write> Dumper<'_, W> {
    fn line(&mut self, depth: usize, label: &str) -> io::Result<()> {
        writeln!(self.out, "{:depth$}{label}", "")
    }

    fn all(&mut self, ids: &[NodeId], depth: usize) -> io::Result<()> {
        for id in ids {
            self.node(*id, depth)?;
        }
        Ok(())
    }

    fn node(&mut self, id: NodeId, depth: usize) -> io::Result<()> {
        ensure_sufficient_stack(|| self.node_inner(id, depth))
    }

    fn node_inner(&mut self, id: NodeId, depth: usize) -> io::Result<()> {
        let inner = depth + 1;
        match self.ast.kind(id) {
            NodeKind::Code(statements) => {
                self.line(depth, "Code")?;
                self.all(statements, inner)
            }
            NodeKind::Block(statements) => {
                self.line(depth, "Block")?;
                self.all(statements, inner)
            }
            NodeKind::FnDef {
                name,
                params,
                body,
                return_expr,
            } => {
                self.line(depth, &format!("FnDef {name}"))?;
                self.line(inner, "Parmlist")?;
                for param in params {
                    self.line(inner + 1, &format!("Identifier {param}"))?;
                }
                self.line(inner, "FnBody")?;
                self.node(*body, inner + 1)?;
                if let Some(expr) = return_expr {
                    self.line(inner, "ReturnExpression")?;
                    self.node(*expr, inner + 1)?;
                }
                Ok(())
            }
            NodeKind::Call { name, args } => {
                self.line(depth, &format!("Call {name}"))?;
                self.line(inner, "ArgList")?;
                self.all(args, inner + 1)
            }
            NodeKind::FnInvoke { name, args } => {
                self.line(depth, &format!("FnInvoke {name}"))?;
                self.line(inner, "ArgList")?;
                self.all(args, inner + 1)
            }
            NodeKind::If {
                guard,
                then_branch,
                else_ifs,
                else_branch,
            } => {
                self.line(depth, "IfStatement")?;
                self.node(*guard, inner)?;
                self.node(*then_branch, inner)?;
                for clause in else_ifs {
                    self.node(clause.guard, inner)?;
                    self.node(clause.body, inner)?;
                }
                match else_branch {
                    Some(branch) => self.node(*branch, inner),
                    None => Ok(()),
                }
            }
            NodeKind::While { guard, body } => {
                self.line(depth, "WhileLoop")?;
                self.all(&[*guard, *body], inner)
            }
            NodeKind::For {
                init,
                guard,
                step,
                body,
            } => {
                self.line(depth, "ForLoop")?;
                self.all(&[*init, *guard, *step, *body], inner)
            }
            NodeKind::Switch {
                discriminant,
                cases,
                default,
            } => {
                self.line(depth, "SwitchStatement")?;
                self.node(*discriminant, inner)?;
                for case in cases {
                    self.node(case.label, inner)?;
                    self.node(case.body, inner)?;
                }
                if let Some(body) = default {
                    self.line(inner, "Default")?;
                    self.node(*body, inner + 1)?;
                }
                Ok(())
            }
            NodeKind::Write(operand) => {
                self.line(depth, "Write")?;
                self.node(*operand, inner)
            }
            NodeKind::Assign { target, value } => {
                self.line(depth, "Assignment")?;
                self.line(inner, &format!("Identifier {target}"))?;
                self.node(*value, inner)
            }
            NodeKind::TypedAssign {
                variant,
                target,
                value,
            } => {
                self.line(depth, &format!("Assignment {variant}"))?;
                self.line(inner, &format!("Identifier {target}"))?;
                self.node(*value, inner)
            }
            NodeKind::Binary { op, lhs, rhs } => {
                self.line(depth, op.name())?;
                self.all(&[*lhs, *rhs], inner)
            }
            NodeKind::Unary { op, operand } => {
                self.line(depth, op.name())?;
                self.node(*operand, inner)
            }
            NodeKind::Dereference(name) => self.line(depth, &format!("Dereference {name}")),
            NodeKind::Literal(literal) => {
                let label = match literal {
                    Literal::Integer(token) => format!("Integer {token}"),
                    Literal::Float(token) => format!("Rational {token}"),
                    Literal::String(text) => format!("Character {text:?}"),
                    Literal::Boolean(true) => "True".to_string(),
                    Literal::Boolean(false) => "False".to_string(),
                };
                self.line(depth, &label)
            }
        }
    }
}
