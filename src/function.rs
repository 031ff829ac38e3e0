use std::rc::Rc;

use crate::{ast::NodeId, diagnostics::SemanticError, value::Value};

/// A user function, built once per definition node and shared by every
/// call site that resolves to it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub body: NodeId,
    pub return_expr: Option<NodeId>,
    /// Display level the body runs at: one deeper than where it was defined.
    pub level: usize,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, body: NodeId, level: usize) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            body,
            return_expr: None,
            level,
        }
    }

    pub fn set_return_expression(&mut self, expr: NodeId) {
        self.return_expr = Some(expr);
    }

    pub fn define_parameter(&mut self, name: impl Into<String>) {
        self.params.push(name.into());
    }

    pub fn has_return(&self) -> bool {
        self.return_expr.is_some()
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Arguments bound to a definition at one call site.
#[derive(Debug)]
pub struct FunctionInvocation {
    pub definition: Rc<FunctionDefinition>,
    pub arguments: Vec<Value>,
}

impl FunctionInvocation {
    pub fn new(definition: Rc<FunctionDefinition>) -> Self {
        Self {
            definition,
            arguments: Vec::new(),
        }
    }

    pub fn push_argument(&mut self, value: Value) {
        self.arguments.push(value);
    }

    pub fn check_argument_count(&self) -> Result<(), SemanticError> {
        let expected = self.definition.arity();
        let found = self.arguments.len();
        if expected == found {
            Ok(())
        } else {
            Err(SemanticError::Arity {
                name: self.definition.name.clone(),
                expected,
                found,
            })
        }
    }

    /// Pairs each parameter name with its argument, in order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.definition
            .params
            .iter()
            .map(String::as_str)
            .zip(self.arguments.iter())
    }
}
