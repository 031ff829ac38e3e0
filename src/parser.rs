use crate::{
    ast::{Ast, BinaryOp, ElseIf, Literal, NodeId, NodeKind, SwitchCase, UnaryOp},
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    lexer::{Keyword, Lexer, Token, TokenKind},
    stack::ensure_sufficient_stack,
    value::Variant,
};

/// Parses Jlang source into an arena tree whose root is a `Code` node.
pub fn parse_program(source: &str) -> Result<Ast, Diagnostic> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    ast: Ast,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            ast: Ast::new(),
        }
    }

    fn parse_program(mut self) -> Result<Ast, Diagnostic> {
        let start = self.peek().span.start;
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        let end = self.peek().span.end;
        let root = self
            .ast
            .push(NodeKind::Code(statements), SourceSpan::new(start, end));
        self.ast.set_root(root);
        Ok(self.ast)
    }

    fn span_of(&self, id: NodeId) -> SourceSpan {
        self.ast.node(id).span
    }

    fn parse_statement(&mut self) -> Result<NodeId, Diagnostic> {
        ensure_sufficient_stack(|| self.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Result<NodeId, Diagnostic> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(self.ast.push(NodeKind::Block(Vec::new()), token.span))
            }
            TokenKind::Keyword(Keyword::Fn) => self.parse_function(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Write) => {
                self.advance();
                let operand = self.parse_expression()?;
                let end = self.consume(TokenKind::Semicolon, "expected `;` after write")?;
                Ok(self
                    .ast
                    .push(NodeKind::Write(operand), token.span.to(end.span)))
            }
            TokenKind::Keyword(Keyword::Return) => {
                let err = self.error(&token, "`return` may only end a function body");
                Err(err.with_note("write `return expr;` as the last item of a `fn` body"))
            }
            TokenKind::Identifier if self.check_next(TokenKind::LParen) => {
                let (name, args, span) = self.parse_call_parts()?;
                let end = self.consume(TokenKind::Semicolon, "expected `;` after call")?;
                Ok(self
                    .ast
                    .push(NodeKind::Call { name, args }, span.to(end.span)))
            }
            _ => {
                let assignment = self.parse_assignment()?;
                self.consume(TokenKind::Semicolon, "expected `;` after assignment")?;
                Ok(assignment)
            }
        }
    }

    fn parse_block(&mut self) -> Result<NodeId, Diagnostic> {
        let lbrace = self.consume(TokenKind::LBrace, "expected `{` to start block")?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        let rbrace = self.consume(TokenKind::RBrace, "expected `}` to close block")?;
        Ok(self
            .ast
            .push(NodeKind::Block(statements), lbrace.span.to(rbrace.span)))
    }

    fn parse_function(&mut self) -> Result<NodeId, Diagnostic> {
        let start = self.consume_keyword(Keyword::Fn)?.span;
        let name = self.consume_identifier("expected function name after `fn`")?;
        self.consume(TokenKind::LParen, "expected `(` after function name")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let param = self.consume_identifier("expected parameter name")?;
                params.push(param.lexeme);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected `)` after parameters")?;

        let lbrace = self.consume(TokenKind::LBrace, "expected `{` to start function body")?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace)
            && !self.check_keyword(Keyword::Return)
            && !self.is_at_end()
        {
            statements.push(self.parse_statement()?);
        }
        let body_end = self.previous().span;
        let body = self
            .ast
            .push(NodeKind::Block(statements), lbrace.span.to(body_end));

        let return_expr = if self.matches_keyword(Keyword::Return) {
            let expr = self.parse_expression()?;
            self.consume(TokenKind::Semicolon, "expected `;` after return expression")?;
            Some(expr)
        } else {
            None
        };
        let rbrace = self
            .consume(TokenKind::RBrace, "expected `}` to close function body")
            .map_err(|err| match return_expr {
                Some(_) => err.with_note("a return expression must be the last item of a function body"),
                None => err,
            })?;

        Ok(self.ast.push(
            NodeKind::FnDef {
                name: name.lexeme,
                params,
                body,
                return_expr,
            },
            start.to(rbrace.span),
        ))
    }

    fn parse_guard(&mut self, construct: &str) -> Result<NodeId, Diagnostic> {
        self.consume(TokenKind::LParen, &format!("expected `(` after `{construct}`"))?;
        let guard = self.parse_expression()?;
        self.consume(TokenKind::RParen, &format!("expected `)` after {construct} test"))?;
        Ok(guard)
    }

    fn parse_if(&mut self) -> Result<NodeId, Diagnostic> {
        let start = self.consume_keyword(Keyword::If)?.span;
        let guard = self.parse_guard("if")?;
        let then_branch = self.parse_statement()?;
        let mut end = self.span_of(then_branch);
        let mut else_ifs = Vec::new();
        let mut else_branch = None;
        while self.matches_keyword(Keyword::Else) {
            if self.matches_keyword(Keyword::If) {
                let guard = self.parse_guard("if")?;
                let body = self.parse_statement()?;
                end = self.span_of(body);
                else_ifs.push(ElseIf { guard, body });
            } else {
                let body = self.parse_statement()?;
                end = self.span_of(body);
                else_branch = Some(body);
                break;
            }
        }
        Ok(self.ast.push(
            NodeKind::If {
                guard,
                then_branch,
                else_ifs,
                else_branch,
            },
            start.to(end),
        ))
    }

    fn parse_while(&mut self) -> Result<NodeId, Diagnostic> {
        let start = self.consume_keyword(Keyword::While)?.span;
        let guard = self.parse_guard("while")?;
        let body = self.parse_statement()?;
        let span = start.to(self.span_of(body));
        Ok(self.ast.push(NodeKind::While { guard, body }, span))
    }

    fn parse_for(&mut self) -> Result<NodeId, Diagnostic> {
        let start = self.consume_keyword(Keyword::For)?.span;
        self.consume(TokenKind::LParen, "expected `(` after `for`")?;
        let init = self.parse_assignment()?;
        self.consume(TokenKind::Semicolon, "expected `;` after for initializer")?;
        let guard = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "expected `;` after for test")?;
        let step = self.parse_assignment()?;
        self.consume(TokenKind::RParen, "expected `)` after for increment")?;
        let body = self.parse_statement()?;
        let span = start.to(self.span_of(body));
        Ok(self.ast.push(
            NodeKind::For {
                init,
                guard,
                step,
                body,
            },
            span,
        ))
    }

    fn parse_switch(&mut self) -> Result<NodeId, Diagnostic> {
        let start = self.consume_keyword(Keyword::Switch)?.span;
        let discriminant = self.parse_guard("switch")?;
        self.consume(TokenKind::LBrace, "expected `{` to open switch body")?;
        let mut cases = Vec::new();
        while self.matches_keyword(Keyword::Case) {
            let label = self.parse_expression()?;
            self.consume(TokenKind::Colon, "expected `:` after case label")?;
            let body = self.parse_statement()?;
            cases.push(SwitchCase { label, body });
        }
        let default = if self.matches_keyword(Keyword::Default) {
            self.consume(TokenKind::Colon, "expected `:` after `default`")?;
            Some(self.parse_statement()?)
        } else {
            None
        };
        let end = self.consume(
            TokenKind::RBrace,
            "expected `case`, `default`, or `}` in switch body",
        )?;
        Ok(self.ast.push(
            NodeKind::Switch {
                discriminant,
                cases,
                default,
            },
            start.to(end.span),
        ))
    }

    fn parse_assignment(&mut self) -> Result<NodeId, Diagnostic> {
        let declared = match self.peek().kind {
            TokenKind::Keyword(Keyword::Int) => Some(Variant::Integer),
            TokenKind::Keyword(Keyword::Float) => Some(Variant::Float),
            TokenKind::Keyword(Keyword::String) => Some(Variant::String),
            TokenKind::Keyword(Keyword::Bool) => Some(Variant::Boolean),
            _ => None,
        };
        let start = self.peek().span;
        if declared.is_some() {
            self.advance();
        }
        let target = self.consume_identifier("expected a statement")?;
        self.consume(TokenKind::Assign, "expected `=` in assignment")?;
        let value = self.parse_expression()?;
        let span = start.to(self.span_of(value));
        let kind = match declared {
            Some(variant) => NodeKind::TypedAssign {
                variant,
                target: target.lexeme,
                value,
            },
            None => NodeKind::Assign {
                target: target.lexeme,
                value,
            },
        };
        Ok(self.ast.push(kind, span))
    }

    fn parse_expression(&mut self) -> Result<NodeId, Diagnostic> {
        ensure_sufficient_stack(|| self.parse_or())
    }

    fn binary_node(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        let span = self.span_of(lhs).to(self.span_of(rhs));
        self.ast.push(NodeKind::Binary { op, lhs, rhs }, span)
    }

    fn parse_or(&mut self) -> Result<NodeId, Diagnostic> {
        let mut expr = self.parse_and()?;
        while self.matches(TokenKind::DoublePipe) {
            let rhs = self.parse_and()?;
            expr = self.binary_node(BinaryOp::Or, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<NodeId, Diagnostic> {
        let mut expr = self.parse_comparison()?;
        while self.matches(TokenKind::DoubleAmpersand) {
            let rhs = self.parse_comparison()?;
            expr = self.binary_node(BinaryOp::And, expr, rhs);
        }
        Ok(expr)
    }

    /// Comparisons do not chain.
    fn parse_comparison(&mut self) -> Result<NodeId, Diagnostic> {
        let lhs = self.parse_sum()?;
        let op = match self.peek().kind {
            TokenKind::EqualEqual => BinaryOp::Equal,
            TokenKind::BangEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessEqual => BinaryOp::LessEqual,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_sum()?;
        Ok(self.binary_node(op, lhs, rhs))
    }

    fn parse_sum(&mut self) -> Result<NodeId, Diagnostic> {
        let mut expr = self.parse_product()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_product()?;
            expr = self.binary_node(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_product(&mut self) -> Result<NodeId, Diagnostic> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            expr = self.binary_node(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<NodeId, Diagnostic> {
        ensure_sufficient_stack(|| self.parse_unary_inner())
    }

    fn parse_unary_inner(&mut self) -> Result<NodeId, Diagnostic> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            _ => return self.parse_primary(),
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = start.to(self.span_of(operand));
        Ok(self.ast.push(NodeKind::Unary { op, operand }, span))
    }

    fn parse_call_parts(&mut self) -> Result<(String, Vec<NodeId>, SourceSpan), Diagnostic> {
        let name = self.consume_identifier("expected function name")?;
        self.consume(TokenKind::LParen, "expected `(` after function name")?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        let rparen = self.consume(TokenKind::RParen, "expected `)` after arguments")?;
        Ok((name.lexeme, args, name.span.to(rparen.span)))
    }

    fn parse_primary(&mut self) -> Result<NodeId, Diagnostic> {
        let token = self.peek().clone();
        let literal = match token.kind {
            TokenKind::Integer => Literal::Integer(token.lexeme.clone()),
            TokenKind::Float => Literal::Float(token.lexeme.clone()),
            TokenKind::String => Literal::String(token.lexeme.clone()),
            TokenKind::Keyword(Keyword::True) => Literal::Boolean(true),
            TokenKind::Keyword(Keyword::False) => Literal::Boolean(false),
            TokenKind::Identifier if self.check_next(TokenKind::LParen) => {
                let (name, args, span) = self.parse_call_parts()?;
                return Ok(self.ast.push(NodeKind::FnInvoke { name, args }, span));
            }
            TokenKind::Identifier => {
                self.advance();
                return Ok(self
                    .ast
                    .push(NodeKind::Dereference(token.lexeme), token.span));
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RParen, "expected `)` after expression")?;
                return Ok(inner);
            }
            _ => return Err(self.error(&token, "expected expression")),
        };
        self.advance();
        Ok(self.ast.push(NodeKind::Literal(literal), token.span))
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        self.matches(TokenKind::Keyword(keyword))
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(self.peek(), message))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> Result<Token, Diagnostic> {
        self.consume(
            TokenKind::Keyword(keyword),
            &format!("expected keyword `{keyword:?}`"),
        )
    }

    fn consume_identifier(&mut self, message: &str) -> Result<Token, Diagnostic> {
        self.consume(TokenKind::Identifier, message)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.check(TokenKind::Keyword(keyword))
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|token| token.kind == kind)
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn error(&self, token: &Token, message: &str) -> Diagnostic {
        let message = if token.kind == TokenKind::Eof {
            format!("{message}, found end of input")
        } else {
            format!("{message}, found `{}`", token.lexeme)
        };
        Diagnostic::new(DiagnosticKind::Parser, message).with_span(token.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_statements(ast: &Ast) -> &[NodeId] {
        match ast.kind(ast.root().expect("root")) {
            NodeKind::Code(statements) => statements,
            other => panic!("expected Code root, found {other:?}"),
        }
    }

    #[test]
    fn parses_typed_and_plain_assignments() {
        let ast = parse_program("int x = 1; x = x + 2;").expect("parse");
        let statements = root_statements(&ast);
        assert_eq!(statements.len(), 2);
        assert!(matches!(
            ast.kind(statements[0]),
            NodeKind::TypedAssign {
                variant: Variant::Integer,
                ..
            }
        ));
        match ast.kind(statements[1]) {
            NodeKind::Assign { target, value } => {
                assert_eq!(target, "x");
                assert!(matches!(
                    ast.kind(*value),
                    NodeKind::Binary {
                        op: BinaryOp::Add,
                        ..
                    }
                ));
            }
            other => panic!("expected assignment, found {other:?}"),
        }
    }

    #[test]
    fn call_position_decides_node_kind() {
        let ast = parse_program("f(1); write g(2);").expect("parse");
        let statements = root_statements(&ast);
        assert!(matches!(ast.kind(statements[0]), NodeKind::Call { .. }));
        match ast.kind(statements[1]) {
            NodeKind::Write(operand) => {
                assert!(matches!(ast.kind(*operand), NodeKind::FnInvoke { .. }))
            }
            other => panic!("expected write, found {other:?}"),
        }
    }

    #[test]
    fn function_return_expression_is_separate_from_body() {
        let ast = parse_program("fn sq(n) { write n; return n * n; }").expect("parse");
        match ast.kind(root_statements(&ast)[0]) {
            NodeKind::FnDef {
                name,
                params,
                body,
                return_expr,
            } => {
                assert_eq!(name, "sq");
                assert_eq!(params, &vec!["n".to_string()]);
                assert!(matches!(ast.kind(*body), NodeKind::Block(items) if items.len() == 1));
                assert!(return_expr.is_some());
            }
            other => panic!("expected fn definition, found {other:?}"),
        }
    }

    #[test]
    fn else_if_chain_collects_clauses() {
        let ast = parse_program(
            "if (a) write 1; else if (b) write 2; else if (c) write 3; else write 4;",
        )
        .expect("parse");
        match ast.kind(root_statements(&ast)[0]) {
            NodeKind::If {
                else_ifs,
                else_branch,
                ..
            } => {
                assert_eq!(else_ifs.len(), 2);
                assert!(else_branch.is_some());
            }
            other => panic!("expected if, found {other:?}"),
        }
    }

    #[test]
    fn switch_collects_cases_and_default() {
        let ast = parse_program(
            "switch (x) { case 1: write 1; case 2: { write 2; } default: write 0; }",
        )
        .expect("parse");
        match ast.kind(root_statements(&ast)[0]) {
            NodeKind::Switch { cases, default, .. } => {
                assert_eq!(cases.len(), 2);
                assert!(default.is_some());
            }
            other => panic!("expected switch, found {other:?}"),
        }
    }

    #[test]
    fn precedence_binds_products_tighter() {
        let ast = parse_program("write 1 + 2 * 3;").expect("parse");
        let NodeKind::Write(operand) = ast.kind(root_statements(&ast)[0]) else {
            panic!("expected write");
        };
        match ast.kind(*operand) {
            NodeKind::Binary {
                op: BinaryOp::Add,
                rhs,
                ..
            } => assert!(matches!(
                ast.kind(*rhs),
                NodeKind::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            )),
            other => panic!("expected addition, found {other:?}"),
        }
    }

    #[test]
    fn return_outside_function_is_rejected() {
        let err = parse_program("return 1;").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Parser);
        assert!(!err.notes.is_empty());
    }

    #[test]
    fn missing_semicolon_reports_span() {
        let err = parse_program("write 1").unwrap_err();
        assert!(err.message.contains("expected `;` after write"), "{}", err.message);
        assert_eq!(err.span, Some(SourceSpan::new(7, 7)));
    }

    #[test]
    fn deeply_nested_parentheses_parse() {
        let depth = 10_000;
        let source = format!("write {}1{};", "(".repeat(depth), ")".repeat(depth));
        let ast = parse_program(&source).expect("parse");
        match ast.kind(root_statements(&ast)[0]) {
            NodeKind::Write(operand) => assert!(matches!(
                ast.kind(*operand),
                NodeKind::Literal(Literal::Integer(token)) if token == "1"
            )),
            other => panic!("expected write, found {other:?}"),
        }
    }

    #[test]
    fn deeply_nested_blocks_parse() {
        let depth = 10_000;
        let source = format!("{}write 1;{}", "{".repeat(depth), "}".repeat(depth));
        let ast = parse_program(&source).expect("parse");
        assert_eq!(root_statements(&ast).len(), 1);
    }
}
