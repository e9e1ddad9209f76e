//! Recursive-descent parser lowering netlist source into the IR.

use hashbrown::HashMap;
use netlist_ir::{mask, Program, ProgramBuilder, RegId, RegisterFlags, Word};

use crate::error::SyntaxError;
use crate::lexer::Lexer;
use crate::token::{SourcePos, Token, TokenKind};

/// Parses a netlist source text into a validated [`Program`].
///
/// Lowering targets the checked builder API: every equation becomes one
/// instruction, and a constant in operand position becomes a fresh anonymous
/// register defined by a `CONST` instruction. All width checks are performed
/// here with source positions before the builder re-checks them.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    Parser::new(source)?.parse_program()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    token: Token,
    builder: ProgramBuilder,
    /// Declared variables, VAR-section order preserved separately.
    vars: HashMap<String, RegId>,
    decls: Vec<(String, u32, SourcePos)>,
    equations: HashMap<String, SourcePos>,
    inputs: HashMap<String, SourcePos>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, SyntaxError> {
        let mut lexer = Lexer::new(source);
        let token = lexer.next_token()?;
        Ok(Self {
            lexer,
            token,
            builder: ProgramBuilder::new(),
            vars: HashMap::new(),
            decls: Vec::new(),
            equations: HashMap::new(),
            inputs: HashMap::new(),
        })
    }

    fn parse_program(mut self) -> Result<Program, SyntaxError> {
        let inputs = self.parse_role_list(TokenKind::Input, TokenKind::Output, "input")?;
        let outputs = self.parse_role_list(TokenKind::Output, TokenKind::Var, "output")?;
        self.parse_declarations(&inputs, &outputs)?;
        self.inputs = inputs;

        self.expect(TokenKind::In)?;
        while self.token.kind != TokenKind::Eoi {
            self.parse_equation()?;
        }

        for (name, _, pos) in &self.decls {
            if !self.inputs.contains_key(name) && !self.equations.contains_key(name) {
                return Err(SyntaxError::MissingEquation {
                    pos: *pos,
                    name: name.clone(),
                });
            }
        }

        self.builder.build().map_err(SyntaxError::from)
    }

    /// `INPUT a, b` / `OUTPUT c, d`: a comma-separated name list ending at
    /// the next section keyword. The list may be empty.
    fn parse_role_list(
        &mut self,
        section: TokenKind,
        terminator: TokenKind,
        role: &'static str,
    ) -> Result<HashMap<String, SourcePos>, SyntaxError> {
        self.expect(section)?;
        let mut names = HashMap::new();

        while self.token.kind != terminator {
            let token = self.expect(TokenKind::Identifier)?;
            if names.insert(token.spelling.clone(), token.pos).is_some() {
                return Err(SyntaxError::DuplicateRole {
                    pos: token.pos,
                    name: token.spelling,
                    role,
                });
            }
            match self.token.kind {
                TokenKind::Comma => {
                    self.bump()?;
                }
                kind if kind == terminator => {}
                _ => return Err(self.unexpected(&format!("`,` or {}", terminator.describe()))),
            }
        }

        Ok(names)
    }

    /// `VAR x, y:8, …`: declarations with optional width, default 1.
    fn parse_declarations(
        &mut self,
        inputs: &HashMap<String, SourcePos>,
        outputs: &HashMap<String, SourcePos>,
    ) -> Result<(), SyntaxError> {
        self.expect(TokenKind::Var)?;

        while self.token.kind != TokenKind::In {
            let token = self.expect(TokenKind::Identifier)?;
            let width = match self.token.kind {
                TokenKind::Colon => {
                    self.bump()?;
                    self.parse_width()?
                }
                _ => 1,
            };

            if self.vars.contains_key(&token.spelling) {
                return Err(SyntaxError::DuplicateDeclaration {
                    pos: token.pos,
                    name: token.spelling,
                });
            }

            let mut flags = RegisterFlags::empty();
            if inputs.contains_key(&token.spelling) {
                flags |= RegisterFlags::INPUT;
            }
            if outputs.contains_key(&token.spelling) {
                flags |= RegisterFlags::OUTPUT;
            }

            let reg = self.builder.add_register(width, Some(&token.spelling), flags);
            self.vars.insert(token.spelling.clone(), reg);
            self.decls.push((token.spelling, width, token.pos));

            match self.token.kind {
                TokenKind::Comma => {
                    self.bump()?;
                    if self.token.kind != TokenKind::Identifier {
                        return Err(self.unexpected("an identifier"));
                    }
                }
                TokenKind::In => {}
                _ => return Err(self.unexpected("`,` or `IN`")),
            }
        }

        for (name, pos) in inputs {
            if !self.vars.contains_key(name) {
                return Err(SyntaxError::UndeclaredRole {
                    pos: *pos,
                    name: name.clone(),
                    role: "input",
                });
            }
        }
        for (name, pos) in outputs {
            if !self.vars.contains_key(name) {
                return Err(SyntaxError::UndeclaredRole {
                    pos: *pos,
                    name: name.clone(),
                    role: "output",
                });
            }
        }

        Ok(())
    }

    fn parse_equation(&mut self) -> Result<(), SyntaxError> {
        let lhs_token = self.expect(TokenKind::Identifier)?;
        let lhs = self.resolve(&lhs_token)?;

        if self.inputs.contains_key(&lhs_token.spelling) {
            return Err(SyntaxError::InputEquation {
                pos: lhs_token.pos,
                name: lhs_token.spelling,
            });
        }
        if self
            .equations
            .insert(lhs_token.spelling.clone(), lhs_token.pos)
            .is_some()
        {
            return Err(SyntaxError::DuplicateEquation {
                pos: lhs_token.pos,
                name: lhs_token.spelling,
            });
        }

        self.expect(TokenKind::Equal)?;
        self.parse_expression(lhs)
    }

    fn parse_expression(&mut self, lhs: RegId) -> Result<(), SyntaxError> {
        let pos = self.token.pos;
        match self.token.kind {
            TokenKind::Identifier => {
                let arg = self.parse_argument()?;
                self.expect_same(pos, lhs, arg)?;
                self.builder.add_load(lhs, arg);
                Ok(())
            }
            TokenKind::Integer
            | TokenKind::BinaryLiteral
            | TokenKind::DecimalLiteral
            | TokenKind::HexLiteral => {
                let (value, width) = self.parse_literal()?;
                self.expect_width(pos, lhs, width)?;
                self.builder.add_const(lhs, value);
                Ok(())
            }
            TokenKind::Not => {
                self.bump()?;
                let arg = self.parse_argument()?;
                self.expect_same(pos, lhs, arg)?;
                self.builder.add_not(lhs, arg);
                Ok(())
            }
            TokenKind::And
            | TokenKind::Nand
            | TokenKind::Or
            | TokenKind::Nor
            | TokenKind::Xor
            | TokenKind::Xnor => {
                let op = self.token.kind;
                self.bump()?;
                let a = self.parse_argument()?;
                let b = self.parse_argument()?;
                self.expect_same(pos, a, b)?;
                self.expect_same(pos, lhs, a)?;
                match op {
                    TokenKind::And => self.builder.add_and(lhs, a, b),
                    TokenKind::Nand => self.builder.add_nand(lhs, a, b),
                    TokenKind::Or => self.builder.add_or(lhs, a, b),
                    TokenKind::Nor => self.builder.add_nor(lhs, a, b),
                    TokenKind::Xor => self.builder.add_xor(lhs, a, b),
                    TokenKind::Xnor => self.builder.add_xnor(lhs, a, b),
                    _ => unreachable!("filtered by the outer match"),
                }
                Ok(())
            }
            TokenKind::Mux => {
                self.bump()?;
                let choice = self.parse_argument()?;
                let a = self.parse_argument()?;
                let b = self.parse_argument()?;
                self.expect_width(pos, choice, 1)?;
                self.expect_same(pos, a, b)?;
                self.expect_same(pos, lhs, a)?;
                self.builder.add_mux(lhs, choice, a, b);
                Ok(())
            }
            TokenKind::Reg => {
                self.bump()?;
                let token = self.expect(TokenKind::Identifier)?;
                let arg = self.resolve(&token)?;
                self.expect_same(pos, lhs, arg)?;
                self.builder.add_reg(lhs, arg);
                Ok(())
            }
            TokenKind::Concat => {
                self.bump()?;
                let a = self.parse_argument()?;
                let b = self.parse_argument()?;
                let expected = self.width(a) + self.width(b);
                self.expect_width(pos, lhs, expected)?;
                self.builder.add_concat(lhs, a, b);
                Ok(())
            }
            TokenKind::Select => {
                self.bump()?;
                let bit = self.parse_number()?;
                let arg = self.parse_argument()?;
                let width = self.width(arg);
                if bit >= u64::from(width) {
                    return Err(SyntaxError::BitOutOfRange {
                        pos,
                        bit: bit32(bit),
                        name: self.builder.register_name(arg),
                        width,
                    });
                }
                self.expect_width(pos, lhs, 1)?;
                self.builder.add_select(lhs, bit as u32, arg);
                Ok(())
            }
            TokenKind::Slice => {
                self.bump()?;
                let first = self.parse_number()?;
                let end = self.parse_number()?;
                if first > end {
                    return Err(SyntaxError::EmptySlice {
                        pos,
                        first: bit32(first),
                        end: bit32(end),
                    });
                }
                let arg = self.parse_argument()?;
                let width = self.width(arg);
                if end >= u64::from(width) {
                    return Err(SyntaxError::BitOutOfRange {
                        pos,
                        bit: bit32(end),
                        name: self.builder.register_name(arg),
                        width,
                    });
                }
                self.expect_width(pos, lhs, (end - first + 1) as u32)?;
                self.builder.add_slice(lhs, first as u32, end as u32, arg);
                Ok(())
            }
            TokenKind::Rom => {
                self.bump()?;
                let addr_width = self.parse_width()?;
                let word_width = self.parse_width()?;
                let read_addr = self.parse_argument()?;
                self.expect_width(pos, read_addr, addr_width)?;
                self.expect_width(pos, lhs, word_width)?;
                self.builder.add_rom(lhs, addr_width, word_width, read_addr);
                Ok(())
            }
            TokenKind::Ram => {
                self.bump()?;
                let addr_width = self.parse_width()?;
                let word_width = self.parse_width()?;
                let read_addr = self.parse_argument()?;
                let write_enable = self.parse_argument()?;
                let write_addr = self.parse_argument()?;
                let write_data = self.parse_argument()?;
                self.expect_width(pos, read_addr, addr_width)?;
                self.expect_width(pos, write_enable, 1)?;
                self.expect_width(pos, write_addr, addr_width)?;
                self.expect_width(pos, write_data, word_width)?;
                self.expect_width(pos, lhs, word_width)?;
                self.builder.add_ram(
                    lhs,
                    addr_width,
                    word_width,
                    read_addr,
                    write_enable,
                    write_addr,
                    write_data,
                );
                Ok(())
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// An argument: a declared variable or a constant. Constants are lowered
    /// to an anonymous register defined by a `CONST` instruction.
    fn parse_argument(&mut self) -> Result<RegId, SyntaxError> {
        match self.token.kind {
            TokenKind::Identifier => {
                let token = self.expect(TokenKind::Identifier)?;
                self.resolve(&token)
            }
            TokenKind::Integer
            | TokenKind::BinaryLiteral
            | TokenKind::DecimalLiteral
            | TokenKind::HexLiteral => {
                let (value, width) = self.parse_literal()?;
                let reg = self.builder.add_register(width, None, RegisterFlags::empty());
                self.builder.add_const(reg, value);
                Ok(reg)
            }
            _ => Err(self.unexpected("an identifier or a constant")),
        }
    }

    /// A constant literal, returning its value and width.
    ///
    /// A bare integer is binary digits with the digit count as width. `0b`
    /// takes an optional `:width` suffix; `0d` and `0x` require one.
    fn parse_literal(&mut self) -> Result<(Word, u32), SyntaxError> {
        let token = self.token.clone();
        self.bump()?;
        match token.kind {
            TokenKind::Integer => {
                let width = digit_count(&token)?;
                let value = literal_value(&token, 2, "")?;
                Ok((value, width))
            }
            TokenKind::BinaryLiteral => {
                let value = literal_value(&token, 2, "0b")?;
                let width = match self.parse_width_suffix()? {
                    Some(width) => width,
                    None => digit_count(&token)?,
                };
                self.check_fits(&token, value, width)?;
                Ok((value, width))
            }
            TokenKind::DecimalLiteral => {
                let value = literal_value(&token, 10, "0d")?;
                let width = self.require_width_suffix(&token, "0d")?;
                self.check_fits(&token, value, width)?;
                Ok((value, width))
            }
            TokenKind::HexLiteral => {
                let value = literal_value(&token, 16, "0x")?;
                let width = self.require_width_suffix(&token, "0x")?;
                self.check_fits(&token, value, width)?;
                Ok((value, width))
            }
            _ => unreachable!("callers guarantee a literal token"),
        }
    }

    fn parse_width_suffix(&mut self) -> Result<Option<u32>, SyntaxError> {
        if self.token.kind == TokenKind::Colon {
            self.bump()?;
            Ok(Some(self.parse_width()?))
        } else {
            Ok(None)
        }
    }

    fn require_width_suffix(&mut self, token: &Token, prefix: &str) -> Result<u32, SyntaxError> {
        self.parse_width_suffix()?
            .ok_or_else(|| SyntaxError::MissingWidthSuffix {
                pos: token.pos,
                spelling: format!("{prefix}{}", token.spelling),
            })
    }

    fn check_fits(&self, token: &Token, value: Word, width: u32) -> Result<(), SyntaxError> {
        if value > mask(width) {
            return Err(SyntaxError::ValueTooWide {
                pos: token.pos,
                value,
                width,
            });
        }
        Ok(())
    }

    /// A bus width: a decimal integer in `1..=64`.
    fn parse_width(&mut self) -> Result<u32, SyntaxError> {
        let token = self.expect(TokenKind::Integer)?;
        let width = literal_value(&token, 10, "")?;
        if !(1..=64).contains(&width) {
            return Err(SyntaxError::WidthOutOfRange {
                pos: token.pos,
                width,
            });
        }
        Ok(width as u32)
    }

    /// A bare decimal integer, used for `SELECT`/`SLICE` bit positions.
    fn parse_number(&mut self) -> Result<u64, SyntaxError> {
        let token = self.expect(TokenKind::Integer)?;
        literal_value(&token, 10, "")
    }

    fn resolve(&self, token: &Token) -> Result<RegId, SyntaxError> {
        self.vars
            .get(&token.spelling)
            .copied()
            .ok_or_else(|| SyntaxError::UnknownVariable {
                pos: token.pos,
                name: token.spelling.clone(),
            })
    }

    fn width(&self, reg: RegId) -> u32 {
        self.builder
            .width_of(reg)
            .expect("parser only produces allocated registers")
    }

    fn expect_width(
        &self,
        pos: SourcePos,
        reg: RegId,
        expected: u32,
    ) -> Result<(), SyntaxError> {
        let found = self.width(reg);
        if found != expected {
            return Err(SyntaxError::WidthMismatch {
                pos,
                name: self.builder.register_name(reg),
                expected,
                found,
            });
        }
        Ok(())
    }

    fn expect_same(&self, pos: SourcePos, lhs: RegId, rhs: RegId) -> Result<(), SyntaxError> {
        let lhs_width = self.width(lhs);
        let rhs_width = self.width(rhs);
        if lhs_width != rhs_width {
            return Err(SyntaxError::OperandWidthMismatch {
                pos,
                lhs: self.builder.register_name(lhs),
                lhs_width,
                rhs: self.builder.register_name(rhs),
                rhs_width,
            });
        }
        Ok(())
    }

    fn bump(&mut self) -> Result<(), SyntaxError> {
        self.token = self.lexer.next_token()?;
        Ok(())
    }

    /// Consumes and returns the current token, which must be of `kind`.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.token.kind != kind {
            return Err(self.unexpected(kind.describe()));
        }
        let token = self.token.clone();
        self.bump()?;
        Ok(token)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let found = match self.token.kind {
            TokenKind::Eoi => "<end of input>".to_owned(),
            _ => self.token.spelling.clone(),
        };
        SyntaxError::UnexpectedToken {
            pos: self.token.pos,
            found,
            expected: expected.to_owned(),
        }
    }
}

/// Digit count of a literal token as a width, bounded to `1..=64`.
fn digit_count(token: &Token) -> Result<u32, SyntaxError> {
    let width = token.spelling.len() as u64;
    if !(1..=64).contains(&width) {
        return Err(SyntaxError::WidthOutOfRange {
            pos: token.pos,
            width,
        });
    }
    Ok(width as u32)
}

/// Parses a literal's digits in `base`, rejecting foreign digits and 64-bit
/// overflow. Leading zeros are accepted at any length.
fn literal_value(token: &Token, base: u32, prefix: &str) -> Result<Word, SyntaxError> {
    let digits = &token.spelling;
    if base == 2 && digits.bytes().any(|b| b != b'0' && b != b'1') {
        return Err(SyntaxError::MalformedLiteral {
            pos: token.pos,
            spelling: digits.clone(),
        });
    }

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(0);
    }
    Word::from_str_radix(trimmed, base).map_err(|_| SyntaxError::LiteralOverflow {
        pos: token.pos,
        spelling: format!("{prefix}{digits}"),
    })
}

fn bit32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
