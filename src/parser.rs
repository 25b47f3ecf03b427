use crate::ast::{AssignTarget, BinaryOp, Expr, LogicalOp, Program, UnaryOp};
use crate::error::{SiltError, Span};
use crate::lexer::{Token, TokenType};
use crate::value::Value;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> Result<Program, SiltError> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            if self.match_types(&[TokenType::Semicolon]) {
                continue;
            }
            body.push(self.expression()?);
        }

        Ok(Program { body })
    }

    fn expression(&mut self) -> Result<Expr, SiltError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, SiltError> {
        let expr = self.control()?;

        if self.match_types(&[TokenType::Equal]) {
            let equals_span = self.previous().span.clone();
            let value = self.assignment()?;

            let target = match expr {
                Expr::Variable { name, span } => AssignTarget::Variable { name, span },
                Expr::Index {
                    object,
                    index,
                    span,
                } => AssignTarget::Index {
                    object,
                    index,
                    span,
                },
                Expr::Member { object, name, span } => AssignTarget::Member { object, name, span },
                _ => {
                    return Err(SiltError::syntax_error_with_help(
                        equals_span,
                        "Invalid assignment target".to_string(),
                        "Only variables, index expressions, and member expressions can be \
                         assigned to. Examples: 'x = 1', 'a[2] = 1', 'a.b = 1'"
                            .to_string(),
                    ));
                }
            };

            let start = target.span().start;
            let end = value.span().end;
            return Ok(Expr::Assign {
                target,
                value: Box::new(value),
                span: Span::new(start, end),
            });
        }

        Ok(expr)
    }

    /// The conditional and loop forms sit just below assignment, so
    /// 'x = if (c) 1 else 2' parses without extra parentheses.
    fn control(&mut self) -> Result<Expr, SiltError> {
        if self.match_types(&[TokenType::If]) {
            return self.if_expression();
        }
        if self.match_types(&[TokenType::While]) {
            return self.while_expression();
        }
        if self.match_types(&[TokenType::For]) {
            return self.for_expression();
        }
        self.or()
    }

    fn if_expression(&mut self) -> Result<Expr, SiltError> {
        let start = self.previous().span.start;

        self.consume_with_help(
            TokenType::LeftParen,
            "Expected '(' after 'if'",
            "If expressions require parentheses around the condition: if (condition) body"
                .to_string(),
        )?;
        let condition = self.expression()?;
        self.consume_with_help(
            TokenType::RightParen,
            "Expected ')' after if condition",
            "If conditions must be enclosed in parentheses: if (condition) body".to_string(),
        )?;

        let then_branch = Box::new(self.expression()?);
        let else_branch = if self.match_types(&[TokenType::Else]) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };

        let end = if let Some(ref else_expr) = else_branch {
            else_expr.span().end
        } else {
            then_branch.span().end
        };

        Ok(Expr::If {
            condition: Box::new(condition),
            then_branch,
            else_branch,
            span: Span::new(start, end),
        })
    }

    fn while_expression(&mut self) -> Result<Expr, SiltError> {
        let start = self.previous().span.start;

        self.consume(TokenType::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after while condition")?;

        let body = Box::new(self.expression()?);
        let end = body.span().end;

        Ok(Expr::While {
            condition: Box::new(condition),
            body,
            span: Span::new(start, end),
        })
    }

    fn for_expression(&mut self) -> Result<Expr, SiltError> {
        let start = self.previous().span.start;

        self.consume(TokenType::LeftParen, "Expected '(' after 'for'")?;
        let binding = self
            .consume_with_help(
                TokenType::Identifier,
                "Expected loop variable after '('",
                "For loops iterate a list: for (item in list) body".to_string(),
            )?
            .lexeme
            .clone();
        self.consume_with_help(
            TokenType::In,
            "Expected 'in' after loop variable",
            "For loops iterate a list: for (item in list) body".to_string(),
        )?;
        let iterable = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after for clauses")?;

        let body = Box::new(self.expression()?);
        let end = body.span().end;

        Ok(Expr::For {
            binding,
            iterable: Box::new(iterable),
            body,
            span: Span::new(start, end),
        })
    }

    fn or(&mut self) -> Result<Expr, SiltError> {
        let mut expr = self.and()?;

        while self.match_types(&[TokenType::Pipe]) {
            let start = expr.span().start;
            let right = self.and()?;
            let end = right.span().end;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
                span: Span::new(start, end),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, SiltError> {
        let mut expr = self.relation()?;

        while self.match_types(&[TokenType::Amp]) {
            let start = expr.span().start;
            let right = self.relation()?;
            let end = right.span().end;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
                span: Span::new(start, end),
            };
        }

        Ok(expr)
    }

    /// Equality and relational operators share one non-associative level:
    /// at most one of them per chain, so 'a < b < c' is a syntax error.
    fn relation(&mut self) -> Result<Expr, SiltError> {
        let expr = self.additive()?;

        if self.match_types(&[
            TokenType::EqualEqual,
            TokenType::BangEqual,
            TokenType::Less,
            TokenType::LessEqual,
            TokenType::Greater,
            TokenType::GreaterEqual,
        ]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.token_type {
                TokenType::EqualEqual => BinaryOp::Equal,
                TokenType::BangEqual => BinaryOp::NotEqual,
                TokenType::Less => BinaryOp::Less,
                TokenType::LessEqual => BinaryOp::LessEqual,
                TokenType::Greater => BinaryOp::Greater,
                TokenType::GreaterEqual => BinaryOp::GreaterEqual,
                _ => unreachable!(),
            };

            let start = expr.span().start;
            let right = self.additive().map_err(|_| {
                SiltError::syntax_error_with_help(
                    operator_token.span.clone(),
                    format!("Expected expression after '{}'", operator_token.lexeme),
                    "Comparison operators require expressions on both sides.".to_string(),
                )
            })?;
            let end = right.span().end;

            return Ok(Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                span: Span::new(start, end),
            });
        }

        Ok(expr)
    }

    fn additive(&mut self) -> Result<Expr, SiltError> {
        let mut expr = self.multiplicative()?;

        while self.match_types(&[TokenType::Plus, TokenType::Minus]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.token_type {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Subtract,
                _ => unreachable!(),
            };

            let start = expr.span().start;
            let right = self.multiplicative().map_err(|_| {
                SiltError::syntax_error_with_help(
                    operator_token.span.clone(),
                    format!("Expected expression after '{}'", operator_token.lexeme),
                    "Arithmetic operators require expressions on both sides.".to_string(),
                )
            })?;
            let end = right.span().end;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                span: Span::new(start, end),
            };
        }

        Ok(expr)
    }

    fn multiplicative(&mut self) -> Result<Expr, SiltError> {
        let mut expr = self.unary()?;

        while self.match_types(&[TokenType::Star, TokenType::Slash, TokenType::Percent]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.token_type {
                TokenType::Star => BinaryOp::Multiply,
                TokenType::Slash => BinaryOp::Divide,
                TokenType::Percent => BinaryOp::Modulo,
                _ => unreachable!(),
            };

            let start = expr.span().start;
            let right = self.unary().map_err(|_| {
                SiltError::syntax_error_with_help(
                    operator_token.span.clone(),
                    format!("Expected expression after '{}'", operator_token.lexeme),
                    "Arithmetic operators require expressions on both sides.".to_string(),
                )
            })?;
            let end = right.span().end;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                span: Span::new(start, end),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, SiltError> {
        if self.match_types(&[TokenType::Bang, TokenType::Minus]) {
            let operator = match self.previous().token_type {
                TokenType::Bang => UnaryOp::Not,
                TokenType::Minus => UnaryOp::Negate,
                _ => unreachable!(),
            };

            let start = self.previous().span.start;
            let operand = self.unary()?;
            let end = operand.span().end;

            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
                span: Span::new(start, end),
            });
        }

        self.postfix()
    }

    /// Calls, indexing, and member access chain arbitrarily: a(b)[c].d(e)
    fn postfix(&mut self) -> Result<Expr, SiltError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_types(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_types(&[TokenType::LeftBracket]) {
                let index = self.expression()?;
                let end = self
                    .consume_with_help(
                        TokenType::RightBracket,
                        "Expected ']' after index",
                        "Index expressions must be closed with ']'. Example: a[1]".to_string(),
                    )?
                    .span
                    .end;
                let start = expr.span().start;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    span: Span::new(start, end),
                };
            } else if self.match_types(&[TokenType::Dot]) {
                let property_token = self
                    .consume(TokenType::Identifier, "Expected property name after '.'")?
                    .clone();
                let start = expr.span().start;
                expr = Expr::Member {
                    object: Box::new(expr),
                    name: property_token.lexeme,
                    span: Span::new(start, property_token.span.end),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, SiltError> {
        let mut args = Vec::new();
        let start = callee.span().start;

        if !self.check(&TokenType::RightParen) {
            loop {
                if self.is_at_end() {
                    return Err(SiltError::syntax_error_with_help(
                        Span::single(self.peek().span.start),
                        "Unexpected end of input in function call".to_string(),
                        "Function calls must be closed with ')' after the arguments. \
                         Example: f(a, b)"
                            .to_string(),
                    ));
                }
                args.push(self.expression()?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let end = self
            .consume_with_help(
                TokenType::RightParen,
                "Expected ')' after arguments",
                "Function calls must be closed with ')' after the arguments. Example: f(a, b)"
                    .to_string(),
            )?
            .span
            .end;

        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            span: Span::new(start, end),
        })
    }

    fn primary(&mut self) -> Result<Expr, SiltError> {
        if self.is_at_end() {
            return Err(SiltError::syntax_error_with_help(
                self.peek().span.clone(),
                "Unexpected end of input".to_string(),
                "Expected an expression here. Check for unmatched parentheses, brackets, \
                 or an incomplete expression."
                    .to_string(),
            ));
        }

        let token = self.advance().clone();

        match token.token_type {
            TokenType::False => Ok(Expr::Literal {
                value: Value::Bool(false),
                span: token.span,
            }),
            TokenType::True => Ok(Expr::Literal {
                value: Value::Bool(true),
                span: token.span,
            }),
            TokenType::Number => {
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    SiltError::syntax_error(token.span.clone(), "Invalid number".to_string())
                })?;
                Ok(Expr::Literal {
                    value: Value::Number(value),
                    span: token.span,
                })
            }
            TokenType::String => Ok(Expr::Literal {
                value: Value::String(token.lexeme),
                span: token.span,
            }),
            TokenType::Identifier => Ok(Expr::Variable {
                name: token.lexeme,
                span: token.span,
            }),
            TokenType::This => Ok(Expr::This { span: token.span }),
            TokenType::Function => self.function_literal(token.span),
            TokenType::Return => {
                let value = self.exit_value()?;
                let end = value
                    .as_ref()
                    .map(|v| v.span().end)
                    .unwrap_or(token.span.end);
                Ok(Expr::Return {
                    value,
                    span: Span::new(token.span.start, end),
                })
            }
            TokenType::Break => {
                let value = self.exit_value()?;
                let end = value
                    .as_ref()
                    .map(|v| v.span().end)
                    .unwrap_or(token.span.end);
                Ok(Expr::Break {
                    value,
                    span: Span::new(token.span.start, end),
                })
            }
            TokenType::Continue => {
                let value = self.exit_value()?;
                let end = value
                    .as_ref()
                    .map(|v| v.span().end)
                    .unwrap_or(token.span.end);
                Ok(Expr::Continue {
                    value,
                    span: Span::new(token.span.start, end),
                })
            }
            TokenType::LeftParen => {
                let start_span = token.span.clone();

                if self.check(&TokenType::RightParen) {
                    return Err(SiltError::syntax_error_with_help(
                        Span::new(start_span.start, self.peek().span.end),
                        "Empty parentheses are not allowed".to_string(),
                        "Parentheses must contain an expression. Example: (x + 1)".to_string(),
                    ));
                }

                let expr = self.expression()?;
                self.consume_with_help(
                    TokenType::RightParen,
                    "Expected ')' after expression",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'."
                        .to_string(),
                )?;
                Ok(expr)
            }
            TokenType::LeftBracket => self.list_literal(token.span),
            TokenType::LeftBrace => {
                if self.looks_like_object() {
                    self.object_literal(token.span)
                } else {
                    self.block_expression(token.span)
                }
            }
            _ => {
                let help_msg = match token.token_type {
                    TokenType::RightParen => {
                        "Found ')' without matching '('. Check for unbalanced parentheses."
                    }
                    TokenType::RightBrace => {
                        "Found '}' without matching '{'. Check for unbalanced braces."
                    }
                    TokenType::RightBracket => {
                        "Found ']' without matching '['. Check for unbalanced brackets."
                    }
                    TokenType::Eof => "Reached end of input while expecting an expression.",
                    _ => "Expected a literal value, variable, or parenthesized expression here.",
                };

                Err(SiltError::syntax_error_with_help(
                    token.span,
                    format!("Expected expression, found '{}'", token.lexeme),
                    help_msg.to_string(),
                ))
            }
        }
    }

    fn function_literal(&mut self, start_span: Span) -> Result<Expr, SiltError> {
        self.consume_with_help(
            TokenType::LeftParen,
            "Expected '(' after 'function'",
            "Function literals take a parameter list: function(a, b) body".to_string(),
        )?;

        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                let param = self
                    .consume(TokenType::Identifier, "Expected parameter name")?
                    .lexeme
                    .clone();
                params.push(param);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume_with_help(
            TokenType::RightParen,
            "Expected ')' after parameters",
            "Function literals take a parameter list: function(a, b) body".to_string(),
        )?;

        let body = self.expression()?;
        let end = body.span().end;

        Ok(Expr::Function {
            params,
            body: Box::new(body),
            span: Span::new(start_span.start, end),
        })
    }

    /// Optional value after 'return'/'break'/'continue': absent when the next
    /// token cannot start an expression in this grammar.
    fn exit_value(&mut self) -> Result<Option<Box<Expr>>, SiltError> {
        if self.can_begin_expression() {
            Ok(Some(Box::new(self.expression()?)))
        } else {
            Ok(None)
        }
    }

    fn can_begin_expression(&self) -> bool {
        matches!(
            self.peek().token_type,
            TokenType::Number
                | TokenType::String
                | TokenType::True
                | TokenType::False
                | TokenType::Identifier
                | TokenType::This
                | TokenType::LeftParen
                | TokenType::LeftBrace
                | TokenType::LeftBracket
                | TokenType::Function
                | TokenType::If
                | TokenType::While
                | TokenType::For
                | TokenType::Return
                | TokenType::Break
                | TokenType::Continue
                | TokenType::Bang
                | TokenType::Minus
        )
    }

    fn list_literal(&mut self, start_span: Span) -> Result<Expr, SiltError> {
        let mut elements = Vec::new();

        if !self.check(&TokenType::RightBracket) {
            loop {
                elements.push(self.expression()?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let end_token = self.consume_with_help(
            TokenType::RightBracket,
            "Expected ']' after list elements",
            "List literals must be closed with ']' after the opening '['. Example: [1, 2, 3]"
                .to_string(),
        )?;
        Ok(Expr::List {
            elements,
            span: Span::new(start_span.start, end_token.span.end),
        })
    }

    fn object_literal(&mut self, start_span: Span) -> Result<Expr, SiltError> {
        let mut entries = Vec::new();

        if !self.check(&TokenType::RightBrace) {
            loop {
                let key_token = self.advance().clone();
                let key = match key_token.token_type {
                    TokenType::Identifier | TokenType::String => key_token.lexeme,
                    _ => {
                        return Err(SiltError::syntax_error_with_help(
                            key_token.span,
                            format!("Expected object key, found '{}'", key_token.lexeme),
                            "Object keys are identifiers or strings. \
                             Example: {name: 1, \"other\": 2}"
                                .to_string(),
                        ));
                    }
                };
                self.consume_with_help(
                    TokenType::Colon,
                    "Expected ':' after object key",
                    "Object entries require a colon between key and value. \
                     Example: {key: value}"
                        .to_string(),
                )?;
                let value = self.expression()?;
                entries.push((key, value));

                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let end_token = self.consume_with_help(
            TokenType::RightBrace,
            "Expected '}' after object entries",
            "Object literals must be closed with '}'. Example: {key: value}".to_string(),
        )?;
        Ok(Expr::Object {
            entries,
            span: Span::new(start_span.start, end_token.span.end),
        })
    }

    fn block_expression(&mut self, start_span: Span) -> Result<Expr, SiltError> {
        let mut body = Vec::new();

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            if self.match_types(&[TokenType::Semicolon]) {
                continue;
            }
            body.push(self.expression()?);
        }

        let end_token = self.consume_with_help(
            TokenType::RightBrace,
            "Expected '}' after block",
            "Blocks must be closed with '}' after the opening '{'.".to_string(),
        )?;
        Ok(Expr::Block {
            body,
            span: Span::new(start_span.start, end_token.span.end),
        })
    }

    /// Decides whether the just-consumed '{' opens an object literal or a
    /// block, by scanning ahead for a top-level ':' (object) before a ';' or
    /// the closing '}' (block).
    fn looks_like_object(&self) -> bool {
        if self.check(&TokenType::RightBrace) {
            // {} is the empty object
            return true;
        }

        let mut pos = self.current;
        let mut paren_depth = 0i32;
        let mut bracket_depth = 0i32;

        // Bounded scan; when undecided, a block is the safer reading
        let limit = std::cmp::min(pos + 20, self.tokens.len());

        while pos < limit {
            match self.tokens[pos].token_type {
                TokenType::LeftParen => paren_depth += 1,
                TokenType::RightParen => paren_depth -= 1,
                TokenType::LeftBracket => bracket_depth += 1,
                TokenType::RightBracket => bracket_depth -= 1,

                TokenType::Colon if paren_depth == 0 && bracket_depth == 0 => {
                    return true;
                }

                TokenType::Semicolon if paren_depth == 0 && bracket_depth == 0 => {
                    return false;
                }

                TokenType::RightBrace if paren_depth == 0 && bracket_depth == 0 => {
                    return false;
                }

                TokenType::Eof => return false,

                _ => {}
            }

            pos += 1;
        }

        false
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            &self.peek().token_type == token_type
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token, SiltError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            let (span, found) = self.mismatch_info();
            Err(SiltError::syntax_error(
                span,
                format!("{}, found {}", message, found),
            ))
        }
    }

    fn consume_with_help(
        &mut self,
        token_type: TokenType,
        message: &str,
        help: String,
    ) -> Result<&Token, SiltError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            let (span, found) = self.mismatch_info();
            Err(SiltError::syntax_error_with_help(
                span,
                format!("{}, found {}", message, found),
                help,
            ))
        }
    }

    /// Span and description of the token that failed a `consume`, pointing
    /// just past the last real token when the input ran out.
    fn mismatch_info(&self) -> (Span, String) {
        if self.is_at_end() {
            let span = if self.current > 0 {
                Span::single(self.tokens[self.current - 1].span.end)
            } else {
                self.peek().span.clone()
            };
            (span, "end of input".to_string())
        } else {
            (
                self.peek().span.clone(),
                format!("'{}'", self.peek().lexeme),
            )
        }
    }
}
