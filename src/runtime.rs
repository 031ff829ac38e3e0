use std::{io::Write, rc::Rc};

use crate::{
    ast::{Ast, BinaryOp, ElseIf, Literal, Node, NodeId, NodeKind, Resolved, SwitchCase, UnaryOp},
    diagnostics::{Result, SemanticError},
    environment::{Display, Slot},
    function::{FunctionDefinition, FunctionInvocation},
    stack::ensure_sufficient_stack,
    value::{Value, Variant},
};

const IF_STATEMENT: &str = "an if statement";
const WHILE_LOOP: &str = "a while loop";
const FOR_LOOP: &str = "a for loop";

/// Run-time knobs for an [`Interpreter`].
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Deepest permitted nesting of function calls; `None` disables the check.
    pub max_call_depth: Option<usize>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            max_call_depth: Some(512),
        }
    }
}

/// Tree-walking evaluator for one [`Ast`].
///
/// Writes go to `out`, one line each. The first failure stops the run and
/// unwinds every active level; lines already written stay written.
pub struct Interpreter<'ast, W: Write> {
    ast: &'ast Ast,
    display: Display,
    out: W,
    context: ExecutionContext,
    depth: usize,
}

impl<'ast, W: Write> Interpreter<'ast, W> {
    pub fn new(ast: &'ast Ast, out: W) -> Self {
        Self::with_context(ast, out, ExecutionContext::default())
    }

    pub fn with_context(ast: &'ast Ast, out: W, context: ExecutionContext) -> Self {
        Self {
            ast,
            display: Display::new(),
            out,
            context,
            depth: 0,
        }
    }

    /// Evaluates the tree's root. A tree without a root is a no-op.
    pub fn run(&mut self) -> Result<()> {
        let Some(root) = self.ast.root() else {
            return Ok(());
        };
        tracing::debug!(nodes = self.ast.len(), "running program");
        self.visit(root)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn visit(&mut self, id: NodeId) -> Result<Option<Value>> {
        ensure_sufficient_stack(|| self.visit_node(id))
    }

    fn visit_node(&mut self, id: NodeId) -> Result<Option<Value>> {
        let ast = self.ast;
        let node = ast.node(id);
        match &node.kind {
            NodeKind::Code(statements) | NodeKind::Block(statements) => {
                for statement in statements {
                    self.visit(*statement)?;
                }
                Ok(None)
            }
            NodeKind::FnDef {
                name,
                params,
                body,
                return_expr,
            } => {
                self.define_function(node, name, params, *body, *return_expr)?;
                Ok(None)
            }
            NodeKind::Call { name, args } => {
                let definition = self.resolve_call(node, name, false)?;
                self.call(definition, args)?;
                Ok(None)
            }
            NodeKind::FnInvoke { name, args } => {
                let definition = self.resolve_call(node, name, true)?;
                self.call(definition, args)
            }
            NodeKind::If {
                guard,
                then_branch,
                else_ifs,
                else_branch,
            } => {
                self.execute_if(*guard, *then_branch, else_ifs, *else_branch)?;
                Ok(None)
            }
            NodeKind::While { guard, body } => {
                while self.guard(*guard, WHILE_LOOP)? {
                    self.visit(*body)?;
                }
                Ok(None)
            }
            NodeKind::For {
                init,
                guard,
                step,
                body,
            } => {
                self.visit(*init)?;
                while self.guard(*guard, FOR_LOOP)? {
                    self.visit(*body)?;
                    self.visit(*step)?;
                }
                Ok(None)
            }
            NodeKind::Switch {
                discriminant,
                cases,
                default,
            } => {
                self.execute_switch(*discriminant, cases, *default)?;
                Ok(None)
            }
            NodeKind::Write(operand) => {
                let value = self.evaluate(*operand)?;
                writeln!(self.out, "{value}")?;
                Ok(None)
            }
            NodeKind::Assign { target, value } => {
                self.assign(node, target, *value, None)?;
                Ok(None)
            }
            NodeKind::TypedAssign {
                variant,
                target,
                value,
            } => {
                self.assign(node, target, *value, Some(*variant))?;
                Ok(None)
            }
            NodeKind::Binary { op, lhs, rhs } => {
                let lhs = self.evaluate(*lhs)?;
                let rhs = self.evaluate(*rhs)?;
                Ok(Some(binary(*op, &lhs, &rhs)?))
            }
            NodeKind::Unary { op, operand } => {
                let operand = self.evaluate(*operand)?;
                let value = match op {
                    UnaryOp::Plus => operand.unary_plus()?,
                    UnaryOp::Minus => operand.unary_minus()?,
                    UnaryOp::Not => operand.not()?,
                };
                Ok(Some(value))
            }
            NodeKind::Dereference(name) => {
                let slot = match node.resolved() {
                    Some(Resolved::Slot(slot)) => *slot,
                    _ => {
                        let slot = self.display.find_reference(name).ok_or_else(|| {
                            SemanticError::UndefinedVariable { name: name.clone() }
                        })?;
                        node.resolve(Resolved::Slot(slot));
                        slot
                    }
                };
                Ok(Some(self.display.load(slot, name)?))
            }
            NodeKind::Literal(literal) => literal_value(node, literal).map(Some),
        }
    }

    fn evaluate(&mut self, id: NodeId) -> Result<Value> {
        match self.visit(id)? {
            Some(value) => Ok(value),
            None => Err(
                SemanticError::type_error("Expected an expression that produces a value.").into(),
            ),
        }
    }

    fn guard(&mut self, id: NodeId, construct: &str) -> Result<bool> {
        self.evaluate(id)?.as_bool().ok_or_else(|| {
            SemanticError::type_error(format!(
                "The test expression of {construct} must be boolean."
            ))
            .into()
        })
    }

    fn define_function(
        &mut self,
        node: &Node,
        name: &str,
        params: &[String],
        body: NodeId,
        return_expr: Option<NodeId>,
    ) -> Result<()> {
        if node.resolved().is_some() {
            return Ok(());
        }
        if self.display.find_function_in_current_level(name).is_some() {
            return Err(SemanticError::Redefinition {
                name: name.to_string(),
            }
            .into());
        }
        let mut definition = FunctionDefinition::new(name, body, self.display.level() + 1);
        for param in params {
            definition.define_parameter(param.as_str());
        }
        if let Some(expr) = return_expr {
            definition.set_return_expression(expr);
        }
        let definition = Rc::new(definition);
        self.display.add_function(Rc::clone(&definition));
        tracing::debug!(
            function = name,
            level = definition.level,
            params = definition.arity(),
            "defined function"
        );
        node.resolve(Resolved::Function(definition));
        Ok(())
    }

    fn resolve_call(
        &mut self,
        node: &Node,
        name: &str,
        needs_return: bool,
    ) -> Result<Rc<FunctionDefinition>> {
        if let Some(Resolved::Function(definition)) = node.resolved() {
            return Ok(Rc::clone(definition));
        }
        let definition = self
            .display
            .find_function(name)
            .ok_or_else(|| SemanticError::UndefinedFunction {
                name: name.to_string(),
            })?;
        if needs_return && !definition.has_return() {
            return Err(SemanticError::NoReturnValue {
                name: name.to_string(),
            }
            .into());
        }
        tracing::trace!(function = name, "resolved call site");
        node.resolve(Resolved::Function(Rc::clone(&definition)));
        Ok(definition)
    }

    fn call(
        &mut self,
        definition: Rc<FunctionDefinition>,
        args: &[NodeId],
    ) -> Result<Option<Value>> {
        let mut invocation = FunctionInvocation::new(definition);
        for arg in args {
            let value = self.evaluate(*arg)?;
            invocation.push_argument(value);
        }
        self.execute(invocation)
    }

    /// Runs an invocation in a fresh level at its definition's depth. The
    /// level is released on every exit path, including failures.
    #[tracing::instrument(
        name = "call",
        level = "debug",
        skip_all,
        fields(function = %invocation.definition.name, level = invocation.definition.level)
    )]
    pub fn execute(&mut self, invocation: FunctionInvocation) -> Result<Option<Value>> {
        invocation.check_argument_count()?;
        if let Some(limit) = self.context.max_call_depth {
            if self.depth >= limit {
                return Err(SemanticError::CallDepthExceeded {
                    name: invocation.definition.name.clone(),
                    limit,
                }
                .into());
            }
        }

        let activation = self.display.enter(invocation.definition.level);
        self.depth += 1;
        let result = self.run_activation(&invocation);
        self.depth -= 1;
        self.display.exit(activation);
        result
    }

    fn run_activation(&mut self, invocation: &FunctionInvocation) -> Result<Option<Value>> {
        for (param, value) in invocation.bindings() {
            let slot = self.display.define_variable(param);
            self.display.store(slot, param, value.clone());
        }
        let definition = &invocation.definition;
        self.visit(definition.body)?;
        match definition.return_expr {
            Some(expr) => self.evaluate(expr).map(Some),
            None => Ok(None),
        }
    }

    fn execute_if(
        &mut self,
        guard: NodeId,
        then_branch: NodeId,
        else_ifs: &[ElseIf],
        else_branch: Option<NodeId>,
    ) -> Result<()> {
        if self.guard(guard, IF_STATEMENT)? {
            self.visit(then_branch)?;
            return Ok(());
        }
        for clause in else_ifs {
            if self.guard(clause.guard, IF_STATEMENT)? {
                self.visit(clause.body)?;
                return Ok(());
            }
        }
        if let Some(branch) = else_branch {
            self.visit(branch)?;
        }
        Ok(())
    }

    /// Labels are evaluated one at a time, in order; the first equal label
    /// runs its body and ends the switch.
    fn execute_switch(
        &mut self,
        discriminant: NodeId,
        cases: &[SwitchCase],
        default: Option<NodeId>,
    ) -> Result<()> {
        let subject = self.evaluate(discriminant)?;
        for case in cases {
            let label = self.evaluate(case.label)?;
            if label.variant() != subject.variant() {
                return Err(SemanticError::type_error(format!(
                    "The expression provided for the switch case must be {}.",
                    with_article(subject.variant())
                ))
                .into());
            }
            if subject.eq(&label)?.as_bool() == Some(true) {
                self.visit(case.body)?;
                return Ok(());
            }
        }
        if let Some(body) = default {
            self.visit(body)?;
        }
        Ok(())
    }

    /// Plain assignments pin a binding to the variant of its first value;
    /// typed assignments require the declared variant outright.
    fn assign(
        &mut self,
        node: &Node,
        target: &str,
        value: NodeId,
        declared: Option<Variant>,
    ) -> Result<()> {
        let slot = self.resolve_target(node, target);
        let value = self.evaluate(value)?;
        match declared {
            Some(variant) if value.variant() != variant => {
                return Err(SemanticError::type_error(typed_assignment_message(variant)).into());
            }
            Some(_) => {}
            None => {
                if let Some(current) = self.display.value(slot, target) {
                    if current.variant() != value.variant() {
                        return Err(SemanticError::type_error(
                            "Cannot assign from one datatype to another.",
                        )
                        .into());
                    }
                }
            }
        }
        self.display.store(slot, target, value);
        Ok(())
    }

    fn resolve_target(&mut self, node: &Node, target: &str) -> Slot {
        if let Some(Resolved::Slot(slot)) = node.resolved() {
            return *slot;
        }
        let slot = self
            .display
            .find_reference(target)
            .unwrap_or_else(|| self.display.define_variable(target));
        node.resolve(Resolved::Slot(slot));
        slot
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> std::result::Result<Value, SemanticError> {
    match op {
        BinaryOp::Add => lhs.add(rhs),
        BinaryOp::Sub => lhs.subtract(rhs),
        BinaryOp::Mul => lhs.multiply(rhs),
        BinaryOp::Div => lhs.divide(rhs),
        BinaryOp::Equal => lhs.eq(rhs),
        BinaryOp::NotEqual => lhs.neq(rhs),
        BinaryOp::Less => lhs.lt(rhs),
        BinaryOp::LessEqual => lhs.lte(rhs),
        BinaryOp::Greater => lhs.gt(rhs),
        BinaryOp::GreaterEqual => lhs.gte(rhs),
        BinaryOp::And => lhs.and(rhs),
        BinaryOp::Or => lhs.or(rhs),
    }
}

fn literal_value(node: &Node, literal: &Literal) -> Result<Value> {
    if let Some(Resolved::Value(value)) = node.resolved() {
        return Ok(value.clone());
    }
    let value = match literal {
        Literal::Integer(token) => token
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| SemanticError::InvalidLiteral {
                variant: Variant::Integer,
                token: token.clone(),
            })?,
        Literal::Float(token) => token
            .replace('_', "")
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| SemanticError::InvalidLiteral {
                variant: Variant::Float,
                token: token.clone(),
            })?,
        Literal::String(text) => Value::string(text.as_str()),
        Literal::Boolean(b) => Value::Boolean(*b),
    };
    tracing::trace!(%value, "cached literal");
    node.resolve(Resolved::Value(value.clone()));
    Ok(value)
}

fn with_article(variant: Variant) -> &'static str {
    match variant {
        Variant::Integer => "an integer",
        Variant::Float => "a float",
        Variant::Boolean => "a boolean",
        Variant::String => "a string",
    }
}

fn typed_assignment_message(variant: Variant) -> &'static str {
    match variant {
        Variant::Integer => "The Integer value can only hold values of type Integer.",
        Variant::Float => "The Float value can only hold values of type Float.",
        Variant::String => "The String value can only hold values of type String.",
        Variant::Boolean => "The Bool value can only hold values of type Boolean (True or False).",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{JlangError, SemanticErrorKind};

    fn run(ast: &Ast) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = Interpreter::new(ast, &mut out).run();
        (result, String::from_utf8(out).expect("utf-8 output"))
    }

    fn semantic_kind(result: Result<()>) -> SemanticErrorKind {
        match result {
            Err(JlangError::Semantic(err)) => err.kind(),
            other => panic!("expected semantic error, found {other:?}"),
        }
    }

    #[test]
    fn literal_is_parsed_once() {
        let mut ast = Ast::new();
        let lit = ast.integer("41");
        let one = ast.integer("1");
        let sum = ast.binary(BinaryOp::Add, lit, one);
        let first = ast.write(sum);
        let second = ast.write(sum);
        ast.program(vec![first, second]);

        let (result, output) = run(&ast);
        assert!(result.is_ok());
        assert_eq!(output, "42\n42\n");
        assert!(matches!(
            ast.node(lit).resolved(),
            Some(Resolved::Value(Value::Integer(41)))
        ));
    }

    #[test]
    fn dereference_rereads_current_value() {
        let mut ast = Ast::new();
        let zero = ast.integer("0");
        let init = ast.assign("n", zero);
        let n = ast.dereference("n");
        let write = ast.write(n);
        let n_again = ast.dereference("n");
        let one = ast.integer("1");
        let bump = ast.binary(BinaryOp::Add, n_again, one);
        let step = ast.assign("n", bump);
        ast.program(vec![init, write, step, write]);

        let (result, output) = run(&ast);
        assert!(result.is_ok());
        assert_eq!(output, "0\n1\n");
    }

    #[test]
    fn non_boolean_guard_is_rejected() {
        let mut ast = Ast::new();
        let guard = ast.integer("1");
        let body = ast.block(Vec::new());
        let looping = ast.push(
            NodeKind::While { guard, body },
            crate::diagnostics::SourceSpan::default(),
        );
        ast.program(vec![looping]);

        let (result, _) = run(&ast);
        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "The test expression of a while loop must be boolean."
        );
        assert_eq!(semantic_kind(Err(err)), SemanticErrorKind::Type);
    }

    #[test]
    fn undefined_variable_is_reported() {
        let mut ast = Ast::new();
        let missing = ast.dereference("ghost");
        let write = ast.write(missing);
        ast.program(vec![write]);

        let (result, output) = run(&ast);
        assert_eq!(semantic_kind(result), SemanticErrorKind::UndefinedName);
        assert!(output.is_empty());
    }

    #[test]
    fn display_returns_to_global_level_after_failure() {
        let mut ast = Ast::new();
        let zero = ast.integer("0");
        let one = ast.integer("1");
        let divide = ast.binary(BinaryOp::Div, one, zero);
        let write = ast.write(divide);
        let body = ast.block(vec![write]);
        let def = ast.push(
            NodeKind::FnDef {
                name: "boom".into(),
                params: Vec::new(),
                body,
                return_expr: None,
            },
            Default::default(),
        );
        let call = ast.push(
            NodeKind::Call {
                name: "boom".into(),
                args: Vec::new(),
            },
            Default::default(),
        );
        ast.program(vec![def, call]);

        let mut out = Vec::new();
        let mut interpreter = Interpreter::new(&ast, &mut out);
        let err = interpreter.run().unwrap_err();
        assert_eq!(
            err.as_semantic().map(SemanticError::kind),
            Some(SemanticErrorKind::Arithmetic)
        );
        assert_eq!(interpreter.display().level(), 0);
    }

    #[test]
    fn call_depth_is_bounded() {
        let mut ast = Ast::new();
        let recurse = ast.push(
            NodeKind::Call {
                name: "forever".into(),
                args: Vec::new(),
            },
            Default::default(),
        );
        let body = ast.block(vec![recurse]);
        let def = ast.push(
            NodeKind::FnDef {
                name: "forever".into(),
                params: Vec::new(),
                body,
                return_expr: None,
            },
            Default::default(),
        );
        let start = ast.push(
            NodeKind::Call {
                name: "forever".into(),
                args: Vec::new(),
            },
            Default::default(),
        );
        ast.program(vec![def, start]);

        let mut out = Vec::new();
        let context = ExecutionContext {
            max_call_depth: Some(16),
        };
        let mut interpreter = Interpreter::with_context(&ast, &mut out, context);
        let err = interpreter.run().unwrap_err();
        assert_eq!(
            err.as_semantic().map(SemanticError::kind),
            Some(SemanticErrorKind::CallDepth)
        );
        assert_eq!(interpreter.display().level(), 0);
    }
}
