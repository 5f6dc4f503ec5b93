//! Catalog formulas
//!
//! Small integer expressions such as `dice(level / 2, 8) + self.int - 10`,
//! parsed once when the catalog loads and evaluated against the caster and
//! victim of each cast.
//!
//! Grammar (lowest precedence first):
//!
//! ```text
//! expr    := or ( '?' expr ':' expr )?
//! or      := and ( '||' and )*
//! and     := cmp ( '&&' cmp )*
//! cmp     := rel ( ('==' | '!=') rel )*
//! rel     := sum ( ('<' | '<=' | '>' | '>=') sum )*
//! sum     := term ( ('+' | '-') term )*
//! term    := unary ( ('*' | '/' | '%') unary )*
//! unary   := ('-' | '!') unary | atom
//! atom    := number | variable | call | '(' expr ')'
//! ```
//!
//! Variables: `level` (casting level), `skill` (caster proficiency), and
//! `self.<attr>` / `vict.<attr>` for level, str, int, wis, dex, con, cha,
//! hit, maxhit, mana, maxmana, move, maxmove, align, hitroll, damroll, ac.
//! Functions: `dice(n, s)`, `rand(lo, hi)`, `min(..)`, `max(..)`, `abs(x)`.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::character::Character;
use crate::rng::GameRng;
use crate::world::EngineError;

/// Character attribute readable from a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attr {
    Level,
    Str,
    Int,
    Wis,
    Dex,
    Con,
    Cha,
    Hit,
    MaxHit,
    Mana,
    MaxMana,
    Move,
    MaxMove,
    Align,
    Hitroll,
    Damroll,
    Armor,
}

impl Attr {
    fn parse(name: &str) -> Option<Attr> {
        Some(match name {
            "level" => Attr::Level,
            "str" => Attr::Str,
            "int" => Attr::Int,
            "wis" => Attr::Wis,
            "dex" => Attr::Dex,
            "con" => Attr::Con,
            "cha" => Attr::Cha,
            "hit" => Attr::Hit,
            "maxhit" => Attr::MaxHit,
            "mana" => Attr::Mana,
            "maxmana" => Attr::MaxMana,
            "move" => Attr::Move,
            "maxmove" => Attr::MaxMove,
            "align" => Attr::Align,
            "hitroll" => Attr::Hitroll,
            "damroll" => Attr::Damroll,
            "ac" => Attr::Armor,
            _ => return None,
        })
    }

    fn read(&self, ch: &Character) -> i64 {
        (match self {
            Attr::Level => ch.level as i32,
            Attr::Str => ch.abilities.str,
            Attr::Int => ch.abilities.int,
            Attr::Wis => ch.abilities.wis,
            Attr::Dex => ch.abilities.dex,
            Attr::Con => ch.abilities.con,
            Attr::Cha => ch.abilities.cha,
            Attr::Hit => ch.hit(),
            Attr::MaxHit => ch.max_hit,
            Attr::Mana => ch.mana,
            Attr::MaxMana => ch.max_mana,
            Attr::Move => ch.moves,
            Attr::MaxMove => ch.max_moves,
            Attr::Align => ch.alignment,
            Attr::Hitroll => ch.hitroll,
            Attr::Damroll => ch.damroll,
            Attr::Armor => ch.armor,
        }) as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Var {
    Caster(Attr),
    Victim(Attr),
    Level,
    Skill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Dice,
    Rand,
    Min,
    Max,
    Abs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
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
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(i64),
    Var(Var),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

/// Everything a formula may read while evaluating
pub struct FormulaContext<'a> {
    pub caster: &'a Character,
    pub victim: Option<&'a Character>,
    /// Effective casting level
    pub level: i32,
    /// Caster proficiency in the spell being cast
    pub skill: i32,
    pub rng: &'a mut GameRng,
}

impl Expr {
    fn eval(&self, ctx: &mut FormulaContext<'_>) -> Option<i64> {
        Some(match self {
            Expr::Num(n) => *n,
            Expr::Var(var) => match var {
                Var::Caster(attr) => attr.read(ctx.caster),
                Var::Victim(attr) => attr.read(ctx.victim?),
                Var::Level => ctx.level as i64,
                Var::Skill => ctx.skill as i64,
            },
            Expr::Neg(inner) => inner.eval(ctx)?.checked_neg()?,
            Expr::Not(inner) => (inner.eval(ctx)? == 0) as i64,
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(ctx)?;
                // short circuit keeps `vict.*` guarded behind `&&` usable
                match op {
                    BinOp::And if l == 0 => return Some(0),
                    BinOp::Or if l != 0 => return Some(1),
                    _ => {}
                }
                let r = rhs.eval(ctx)?;
                match op {
                    BinOp::Add => l.checked_add(r)?,
                    BinOp::Sub => l.checked_sub(r)?,
                    BinOp::Mul => l.checked_mul(r)?,
                    BinOp::Div => l.checked_div(r)?,
                    BinOp::Rem => l.checked_rem(r)?,
                    BinOp::Eq => (l == r) as i64,
                    BinOp::Ne => (l != r) as i64,
                    BinOp::Lt => (l < r) as i64,
                    BinOp::Le => (l <= r) as i64,
                    BinOp::Gt => (l > r) as i64,
                    BinOp::Ge => (l >= r) as i64,
                    BinOp::And | BinOp::Or => (r != 0) as i64,
                }
            }
            Expr::Cond(cond, then, otherwise) => {
                if cond.eval(ctx)? != 0 {
                    then.eval(ctx)?
                } else {
                    otherwise.eval(ctx)?
                }
            }
            Expr::Call(func, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.eval(ctx)?);
                }
                match func {
                    Func::Dice => {
                        let n = i32::try_from(values[0].clamp(0, 1000)).ok()?;
                        let s = i32::try_from(values[1].clamp(0, 100_000)).ok()?;
                        ctx.rng.dice(n, s) as i64
                    }
                    Func::Rand => {
                        let lo = i32::try_from(values[0]).ok()?;
                        let hi = i32::try_from(values[1]).ok()?;
                        ctx.rng.number(lo, hi) as i64
                    }
                    Func::Min => values.into_iter().min()?,
                    Func::Max => values.into_iter().max()?,
                    Func::Abs => values[0].checked_abs()?,
                }
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(i64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
}

fn formula_error(column: usize, message: impl Into<String>) -> EngineError {
    EngineError::Formula {
        column,
        message: message.into(),
    }
}

fn tokenize(src: &str) -> Result<Vec<(usize, Token)>, EngineError> {
    const OPERATORS: [&str; 15] = [
        "&&", "||", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "<", ">", "!", "=",
    ];

    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        let column = i + 1;
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let n = src[start..i]
                .parse::<i64>()
                .map_err(|e| formula_error(column, e.to_string()))?;
            tokens.push((column, Token::Num(n)));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
            {
                i += 1;
            }
            tokens.push((column, Token::Ident(src[start..i].to_ascii_lowercase())));
        } else {
            let single = match c {
                '(' => Some(Token::LParen),
                ')' => Some(Token::RParen),
                ',' => Some(Token::Comma),
                '?' => Some(Token::Question),
                ':' => Some(Token::Colon),
                _ => None,
            };
            if let Some(tok) = single {
                tokens.push((column, tok));
                i += 1;
                continue;
            }
            let op = OPERATORS
                .iter()
                .find(|op| src[i..].starts_with(**op))
                .ok_or_else(|| formula_error(column, format!("unexpected '{c}'")))?;
            if *op == "=" {
                return Err(formula_error(column, "use '==' for comparison"));
            }
            tokens.push((column, Token::Op(*op)));
            i += op.len();
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end_column: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn column(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end_column, |(c, _)| *c)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: Token, what: &str) -> Result<(), EngineError> {
        let column = self.column();
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            _ => Err(formula_error(column, format!("expected {what}"))),
        }
    }

    fn binary_op(tok: Option<&Token>) -> Option<(BinOp, u8)> {
        let Some(Token::Op(op)) = tok else {
            return None;
        };
        Some(match *op {
            "||" => (BinOp::Or, 1),
            "&&" => (BinOp::And, 2),
            "==" => (BinOp::Eq, 3),
            "!=" => (BinOp::Ne, 3),
            "<" => (BinOp::Lt, 4),
            "<=" => (BinOp::Le, 4),
            ">" => (BinOp::Gt, 4),
            ">=" => (BinOp::Ge, 4),
            "+" => (BinOp::Add, 5),
            "-" => (BinOp::Sub, 5),
            "*" => (BinOp::Mul, 6),
            "/" => (BinOp::Div, 6),
            "%" => (BinOp::Rem, 6),
            _ => return None,
        })
    }

    fn expr(&mut self) -> Result<Expr, EngineError> {
        let cond = self.binary(1)?;
        if self.peek() == Some(&Token::Question) {
            self.next();
            let then = self.expr()?;
            self.expect(Token::Colon, "':'")?;
            let otherwise = self.expr()?;
            return Ok(Expr::Cond(Box::new(cond), Box::new(then), Box::new(otherwise)));
        }
        Ok(cond)
    }

    /// Precedence climbing over the left-associative binary operators
    fn binary(&mut self, min_prec: u8) -> Result<Expr, EngineError> {
        let mut lhs = self.unary()?;
        while let Some((op, prec)) = Self::binary_op(self.peek()) {
            if prec < min_prec {
                break;
            }
            self.next();
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, EngineError> {
        match self.peek() {
            Some(Token::Op("-")) => {
                self.next();
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op("!")) => {
                self.next();
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Expr, EngineError> {
        let column = self.column();
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.call(&name, column)
                } else {
                    Self::variable(&name).ok_or_else(|| {
                        formula_error(column, format!("unknown variable '{name}'"))
                    })
                }
            }
            Some(tok) => Err(formula_error(column, format!("unexpected {tok:?}"))),
            None => Err(formula_error(column, "unexpected end of formula")),
        }
    }

    fn variable(name: &str) -> Option<Expr> {
        let var = match name {
            "level" => Var::Level,
            "skill" => Var::Skill,
            _ => {
                let (who, attr) = name.split_once('.')?;
                let attr = Attr::parse(attr)?;
                match who {
                    "self" | "ch" => Var::Caster(attr),
                    "vict" | "victim" => Var::Victim(attr),
                    _ => return None,
                }
            }
        };
        Some(Expr::Var(var))
    }

    fn call(&mut self, name: &str, column: usize) -> Result<Expr, EngineError> {
        let (func, arity) = match name {
            "dice" => (Func::Dice, Some(2)),
            "rand" => (Func::Rand, Some(2)),
            "min" => (Func::Min, None),
            "max" => (Func::Max, None),
            "abs" => (Func::Abs, Some(1)),
            _ => return Err(formula_error(column, format!("unknown function '{name}'"))),
        };
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.expr()?);
                if self.peek() == Some(&Token::Comma) {
                    self.next();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "')'")?;
        match arity {
            Some(n) if args.len() != n => Err(formula_error(
                column,
                format!("{name}() takes {n} argument(s), got {}", args.len()),
            )),
            None if args.is_empty() => {
                Err(formula_error(column, format!("{name}() needs at least one argument")))
            }
            _ => Ok(Expr::Call(func, args)),
        }
    }
}

/// A parsed catalog formula
///
/// A formula that failed to parse is kept with its source text and always
/// evaluates to `None`, so callers fall back to their defaults.
#[derive(Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Option<Expr>,
}

impl Formula {
    /// Parse a formula, reporting the column of the first error
    pub fn parse(source: &str) -> Result<Formula, EngineError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(formula_error(1, "empty formula"));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            end_column: source.len() + 1,
        };
        let expr = parser.expr()?;
        if parser.pos < parser.tokens.len() {
            return Err(formula_error(parser.column(), "trailing input"));
        }
        Ok(Formula {
            source: source.to_string(),
            expr: Some(expr),
        })
    }

    /// Parse, logging and keeping a broken formula instead of failing
    pub fn parse_lenient(source: &str) -> Formula {
        Formula::parse(source).unwrap_or_else(|err| {
            warn!(formula = source, %err, "formula will evaluate as absent");
            Formula {
                source: source.to_string(),
                expr: None,
            }
        })
    }

    /// A formula that is always `n`
    pub fn constant(n: i64) -> Formula {
        Formula {
            source: n.to_string(),
            expr: Some(Expr::Num(n)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.expr.is_some()
    }

    /// Evaluate; `None` on a broken formula, a missing victim, division by
    /// zero or overflow
    pub fn eval(&self, ctx: &mut FormulaContext<'_>) -> Option<i64> {
        self.expr.as_ref()?.eval(ctx)
    }

    /// Evaluate and narrow to `i32`, falling back to `default`
    pub fn eval_or(&self, ctx: &mut FormulaContext<'_>, default: i32) -> i32 {
        self.eval(ctx)
            .map(|v| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            .unwrap_or(default)
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Formula({:?})", self.source)
    }
}

impl Serialize for Formula {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Formula {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Formula::parse_lenient(&text),
            Raw::Number(n) => Formula::constant(n),
        })
    }
}
