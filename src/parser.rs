use crate::{
    code::{builder::Builder, symbols::SymbolTable, Operator, Program},
    error,
    lexer,
    token::{Token, TokenKind},
};

type Result<T, E = error::Error> = std::result::Result<T, E>;

/// Parses the whole source, emitting the program as it goes.
///
/// Parsing is fail-fast: the first lexical, syntax or build error aborts.
pub fn parse_program(src: &str) -> Result<(Program, SymbolTable)> {
    let tokens = lexer::lex_in_new(src);
    let mut p = Parser::new(&tokens, Builder::with_capacity(tokens.len()));
    p.parse_program()?;
    let built = p.builder.finish()?;
    Ok(built)
}

/// How many statements and expression operands may enclose one another.
const MAX_DEPTH: u32 = 256;

struct Parser<'tok> {
    tokens: &'tok [Token],
    cursor: usize,
    builder: Builder,
    depth: u32,
}

impl<'tok> Parser<'tok> {
    fn parse_program(&mut self) -> Result<()> {
        while self.except(&[])? {
            self.parse_statement()?;
        }
        self.consume(TokenKind::Eof)?;
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<()> {
        let token = self.advance()?;
        self.nested(token, |p| p.parse_statement_at(token))
    }

    fn parse_statement_at(&mut self, token: &Token) -> Result<()> {
        match token.kind {
            TokenKind::Declare => {
                let ty = self.consume_any(&[TokenKind::Integer, TokenKind::String])?;
                self.parse_declaration(ty)
            }
            TokenKind::Integer | TokenKind::String => self.parse_declaration(token),
            TokenKind::Identifier => self.parse_assignment(token),
            TokenKind::Print => {
                self.parse_expr()?;
                self.builder.print(token);
                self.consume(TokenKind::Semicolon)?;
                Ok(())
            }
            TokenKind::If => self.parse_if(token),
            TokenKind::While => self.parse_while(token),
            actual => Err(syntax(token, Error::ExpectedStatement { actual })),
        }
    }

    fn parse_declaration(&mut self, ty: &Token) -> Result<()> {
        let name = self.consume(TokenKind::Identifier)?;
        match ty.kind {
            TokenKind::Integer => self.builder.declare_integer(name)?,
            _ => self.builder.declare_string(name)?,
        }
        self.consume(TokenKind::Semicolon)?;
        Ok(())
    }

    fn parse_assignment(&mut self, name: &Token) -> Result<()> {
        self.builder.assignment_target(name)?;
        let assign = self.consume(TokenKind::Assign)?;
        self.parse_expr()?;
        self.builder.assign(assign);
        self.consume(TokenKind::Semicolon)?;
        Ok(())
    }

    fn parse_if(&mut self, if_token: &Token) -> Result<()> {
        self.parse_expr()?;
        self.builder.if_head(if_token);
        self.parse_block(&[TokenKind::Else, TokenKind::End])?;
        if let Some(else_token) = self.take(TokenKind::Else)? {
            self.builder.else_clause(else_token)?;
            self.parse_block(&[TokenKind::End])?;
        }
        self.parse_end()
    }

    /// The loop head goes before the condition; the conditional exit is an
    /// ordinary `if` head emitted right after it.
    fn parse_while(&mut self, while_token: &Token) -> Result<()> {
        self.builder.while_head(while_token);
        self.parse_expr()?;
        self.builder.if_head(while_token);
        self.parse_block(&[TokenKind::End])?;
        self.parse_end()
    }

    fn parse_block(&mut self, terminators: &[TokenKind]) -> Result<()> {
        while self.except(terminators)? {
            self.parse_statement()?;
        }
        Ok(())
    }

    fn parse_end(&mut self) -> Result<()> {
        let end = self.consume(TokenKind::End)?;
        self.builder.block_end(end)?;
        self.consume(TokenKind::Semicolon)?;
        Ok(())
    }

    fn parse_expr(&mut self) -> Result<()> {
        self.parse_expr_bp(0)
    }

    /// Operands are emitted before their operator, so the emitted sequence is
    /// the postfix form of the expression.
    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<()> {
        let lhs_token = self.advance()?;
        self.nested(lhs_token, |p| p.parse_nud(lhs_token))?;

        loop {
            let op_token = self.peek()?;
            let Some((op, (lbp, rbp))) = infix_binding_power(op_token.kind) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.advance()?;
            self.parse_expr_bp(rbp)?;
            self.builder.operator(op_token, op.symbol());
        }

        Ok(())
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, grouping)
    fn parse_nud(&mut self, token: &Token) -> Result<()> {
        match token.kind {
            TokenKind::Identifier => self.builder.expression_variable(token)?,
            TokenKind::IntLiteral => self.builder.integer_literal(token)?,
            TokenKind::StrLiteral => self.builder.string_literal(token),
            TokenKind::LParen => {
                self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
            }
            kind @ (TokenKind::Minus | TokenKind::Bang) => {
                let op = match kind {
                    TokenKind::Minus => Operator::Negate,
                    _ => Operator::Not,
                };
                self.parse_expr_bp(PREFIX_BP)?;
                self.builder.operator(token, op.symbol());
            }
            actual => return Err(syntax(token, Error::UnexpectedTokenInExpr { actual })),
        }
        Ok(())
    }
}

const PREFIX_BP: u8 = 11;

fn infix_binding_power(kind: TokenKind) -> Option<(Operator, (u8, u8))> {
    let op = match kind {
        TokenKind::Or => (Operator::Or, (1, 2)),
        TokenKind::And => (Operator::And, (3, 4)),

        TokenKind::Eq => (Operator::Eq, (5, 6)),
        TokenKind::NotEq => (Operator::NotEq, (5, 6)),
        TokenKind::Less => (Operator::Less, (5, 6)),
        TokenKind::LessEq => (Operator::LessEq, (5, 6)),
        TokenKind::Greater => (Operator::Greater, (5, 6)),
        TokenKind::GreaterEq => (Operator::GreaterEq, (5, 6)),

        TokenKind::Plus => (Operator::Add, (7, 8)),
        TokenKind::Minus => (Operator::Sub, (7, 8)),

        TokenKind::Star => (Operator::Mul, (9, 10)),
        TokenKind::Slash => (Operator::Div, (9, 10)),

        _ => return None,
    };
    Some(op)
}

fn syntax(token: &Token, error: Error) -> error::Error {
    token.pos.wrap(error).into()
}

// Utility functions.
impl<'tok> Parser<'tok> {
    fn new(tokens: &'tok [Token], builder: Builder) -> Parser<'tok> {
        assert!(
            tokens.last().is_some_and(Token::is_eof),
            "token stream must end with EOF"
        );
        let mut p = Parser {
            tokens,
            cursor: 0,
            builder,
            depth: 0,
        };
        p.skip_trivia();
        p
    }

    /// Runs `f` one nesting level deeper, failing at `token` once the
    /// nesting limit is reached.
    fn nested<T>(&mut self, token: &Token, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(syntax(token, Error::NestingTooDeep));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn skip_trivia(&mut self) {
        while self.tokens[self.cursor].kind.is_trivia() {
            self.cursor += 1;
        }
    }

    /// Returns the current token, failing if the scanner rejected it.
    fn peek(&self) -> Result<&'tok Token> {
        let token = &self.tokens[self.cursor];
        match token.kind {
            TokenKind::Error(error) => Err(token.pos.wrap(error).into()),
            _ => Ok(token),
        }
    }

    /// Returns the current token and advances, skipping any trivia. Never
    /// advances past EOF.
    fn advance(&mut self) -> Result<&'tok Token> {
        let c = self.peek()?;
        if !c.is_eof() {
            self.cursor += 1;
            self.skip_trivia();
        }
        Ok(c)
    }

    fn is(&self, expect: TokenKind) -> Result<bool> {
        Ok(self.peek()?.kind == expect)
    }

    /// Advances if the current token matches the provided one.
    fn take(&mut self, expect: TokenKind) -> Result<Option<&'tok Token>> {
        if self.is(expect)? {
            self.advance().map(Some)
        } else {
            Ok(None)
        }
    }

    fn consume(&mut self, expect: TokenKind) -> Result<&'tok Token> {
        let c = self.peek()?;
        if c.kind == expect {
            self.advance()
        } else {
            Err(syntax(
                c,
                Error::Unexpected {
                    actual: c.kind,
                    expected: expect,
                },
            ))
        }
    }

    fn consume_any(&mut self, expect: &'static [TokenKind]) -> Result<&'tok Token> {
        let c = self.peek()?;
        if expect.contains(&c.kind) {
            self.advance()
        } else {
            Err(syntax(
                c,
                Error::UnexpectedAny {
                    actual: c.kind,
                    expected: expect,
                },
            ))
        }
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    fn except(&self, except: &[TokenKind]) -> Result<bool> {
        let kind = self.peek()?.kind;
        Ok(kind != TokenKind::Eof && !except.contains(&kind))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("expected {expected}, found {actual}")]
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    #[error("expected one of {}, found {actual}", list(.expected))]
    UnexpectedAny {
        actual: TokenKind,
        expected: &'static [TokenKind],
    },
    #[error("expected statement, found {actual}")]
    ExpectedStatement { actual: TokenKind },
    #[error("expected expression, found {actual}")]
    UnexpectedTokenInExpr { actual: TokenKind },
    #[error("nesting is too deep")]
    NestingTooDeep,
}

fn list(kinds: &[TokenKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::MAX_DEPTH;
    use crate::util::test_utils::{code_tests, run_pipeline};
    use pretty_assertions::assert_eq;

    fn nested_parens(levels: usize) -> String {
        format!("print {}1{};", "(".repeat(levels), ")".repeat(levels))
    }

    #[test]
    fn deep_parens_within_limit() {
        let outcome = run_pipeline(&nested_parens(200));
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.output, "1\n");
    }

    #[test]
    fn deep_parens_past_limit() {
        // `print` takes the first level, so the 256th `(` is rejected.
        let outcome = run_pipeline(&nested_parens(5_000));
        let expected = format!("1:{}: nesting is too deep", 6 + MAX_DEPTH);
        assert_eq!(outcome.error, Some(expected));
        assert_eq!(outcome.listing, None);
    }

    #[test]
    fn deep_prefix_operators_past_limit() {
        let src = format!("print {}1;", "-".repeat(5_000));
        let outcome = run_pipeline(&src);
        let expected = format!("1:{}: nesting is too deep", 6 + MAX_DEPTH);
        assert_eq!(outcome.error, Some(expected));
    }

    #[test]
    fn deep_blocks_past_limit() {
        let levels = 5_000;
        let src = format!("{}{}", "if 1 < 2 ".repeat(levels), "end; ".repeat(levels));
        let outcome = run_pipeline(&src);
        // Each `if 1 < 2 ` is 9 columns wide. The 256th `if` is accepted,
        // but the `1` of its condition is one level too deep.
        let column = 9 * (MAX_DEPTH - 1) + 4;
        let expected = format!("1:{column}: nesting is too deep");
        assert_eq!(outcome.error, Some(expected));
    }

    code_tests!(
        fn declarations_only() {
            let program = "declare integer a; declare string b; integer c;";
            let listing = "
                0:  int  decl  a
                1:  str  decl  b
                2:  int  decl  c
            ";
        }

        fn assignment_and_print() {
            let program = "declare integer x; x := 2 + 3; print x;";
            let listing = "
                0:  int  decl  x
                1:  int  var   x
                2:  int  cte   2
                3:  int  cte   3
                4:       +
                5:       :=
                6:  int  var   x
                7:       print
            ";
            let output = "5";
        }

        fn both_assignment_spellings() {
            let program = r#"string s; s = "a"; s := s + "b"; print s;"#;
            let output = "ab";
        }

        fn precedence() {
            let program = "print 1 + 2 * 3 - -4 / 2 < 10 || !(1 == 1) && 2 <> 2;";
            let listing = "
                0:  int  cte   1
                1:  int  cte   2
                2:  int  cte   3
                3:       *
                4:       +
                5:  int  cte   4
                6:       -1
                7:  int  cte   2
                8:       /
                9:       -
               10:  int  cte   10
               11:       <
               12:  int  cte   1
               13:  int  cte   1
               14:       ==
               15:       !
               16:  int  cte   2
               17:  int  cte   2
               18:       <>
               19:       &&
               20:       ||
               21:       print
            ";
            let output = "true";
        }

        fn left_associative() {
            let program = "print 10 - 3 - 2; print 100 / 10 / 5;";
            let output = "
                5
                2
            ";
        }

        fn if_else() {
            let program = "
                integer x;
                if x == 0
                    print \"zero\";
                else
                    print \"other\";
                end;
            ";
            let listing = "
                0:  int  decl  x
                1:  int  var   x
                2:  int  cte   0
                3:       ==
                4:       if    8
                5:  str  cte   \"zero\"
                6:       print
                7:       goto  11
                8:       else
                9:  str  cte   \"other\"
               10:       print
               11:       end
            ";
            let output = "zero";
        }

        fn while_loop() {
            let program = "declare integer i; i := 0; while i < 3 print i; i := i + 1; end;";
            let listing = "
                0:  int  decl  i
                1:  int  var   i
                2:  int  cte   0
                3:       :=
                4:       while
                5:  int  var   i
                6:  int  cte   3
                7:       <
                8:       if    17
                9:  int  var   i
               10:       print
               11:  int  var   i
               12:  int  var   i
               13:  int  cte   1
               14:       +
               15:       :=
               16:       goto  4
               17:       end
            ";
            let output = "
                0
                1
                2
            ";
        }

        fn nested_loops() {
            let program = "
                integer i; integer j; string row;
                while i < 3
                    row := \"\";
                    j := 0;
                    while j <= i
                        row := row + \"*\";
                        j := j + 1;
                    end;
                    print row;
                    i := i + 1;
                end;
            ";
            let output = "
                *
                **
                ***
            ";
        }

        fn comments_are_skipped() {
            let program = "
                // leading comment
                integer x; // trailing comment
                x := 1;
                print x; // done
            ";
            let output = "1";
        }

        fn missing_semicolon() {
            let program = "integer x\nprint x;";
            let error = "2:1: expected `;`, found `print`";
        }

        fn missing_end() {
            let program = "integer x;\nif x < 1\n  print x;\n";
            let error = "4:1: expected `end`, found end of file";
        }

        fn stray_else() {
            let program = "integer x;\nelse";
            let error = "2:1: expected statement, found `else`";
        }

        fn declare_requires_type() {
            let program = "declare x;";
            let error = "1:9: expected one of `integer`, `string`, found identifier";
        }

        fn bad_expression() {
            let program = "print 1 + ;";
            let error = "1:11: expected expression, found `;`";
        }

        fn unclosed_paren() {
            let program = "print (1 + 2;";
            let error = "1:13: expected `)`, found `;`";
        }

        fn lexical_error() {
            let program = "integer x;\nx := 1 # 2;";
            let error = "2:8: unexpected character";
        }

        fn non_ascii_identifier() {
            let program = "integer é; é := 1; print é;";
            let error = "1:9: unexpected character";
        }

        fn lexical_error_in_string() {
            let program = "print \"abc";
            let error = "1:7: unclosed string";
        }

        fn undeclared_variable() {
            let program = "integer x;\ny := 1;";
            let error = "2:1: variable y is not declared";
        }

        fn undeclared_variable_in_expression() {
            let program = "integer x;\nx := x + y;";
            let error = "2:10: variable y is not declared";
        }

        fn duplicate_declaration() {
            let program = "integer x;\nstring x;";
            let error = "2:8: variable x is already declared";
        }

        fn integer_out_of_range() {
            let program = "print 9223372036854775808;";
            let error = "1:7: invalid integer literal 9223372036854775808";
        }

        fn runtime_type_mismatch() {
            let program = "declare integer a; a := \"x\";";
            let error = "1:22: type mismatch: expected integer, found string";
        }
    );
}
