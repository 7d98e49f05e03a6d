use std::{iter::Peekable, str::Chars};
use tether_core::{Error, Params, QueryError, Result, Value};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Keyword or identifier, possibly qualified (`schema.table`).
    Word(String),
    Number(String),
    /// Single quoted string, quotes removed.
    Text(String),
    /// `?`
    Positional,
    /// `:name`
    Named(String),
    Symbol(char),
}

fn syntax_error(near: impl std::fmt::Display) -> Error {
    QueryError::new(
        "42000",
        format!("You have an error in your SQL syntax near `{near}`"),
    )
    .into()
}

fn take_while(chars: &mut Peekable<Chars>, out: &mut String, f: impl Fn(char) -> bool) {
    while let Some(&c) = chars.peek() {
        if !f(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '\'' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        text.push('\'');
                    }
                    Some('\'') => break,
                    Some(c) => text.push(c),
                    None => return Err(syntax_error(format!("'{text}"))),
                }
            }
            tokens.push(Token::Text(text));
            continue;
        }
        if c == '?' {
            chars.next();
            tokens.push(Token::Positional);
            continue;
        }
        if c == ':' {
            chars.next();
            let mut name = String::new();
            take_while(&mut chars, &mut name, |c| c.is_alphanumeric() || c == '_');
            if name.is_empty() {
                return Err(syntax_error(':'));
            }
            tokens.push(Token::Named(name));
            continue;
        }
        if c.is_ascii_digit() || c == '-' {
            let mut number = String::new();
            number.push(c);
            chars.next();
            take_while(&mut chars, &mut number, |c| c.is_ascii_digit() || c == '.');
            tokens.push(Token::Number(number));
            continue;
        }
        if is_word(c) {
            let mut word = String::new();
            take_while(&mut chars, &mut word, is_word);
            tokens.push(Token::Word(word));
            continue;
        }
        if matches!(c, '*' | ',' | '(' | ')' | '=' | ';') {
            chars.next();
            tokens.push(Token::Symbol(c));
            continue;
        }
        return Err(syntax_error(c));
    }
    Ok(tokens)
}

/// Right hand side of a comparison or an inserted value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Positional,
    Named(String),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Order {
    Asc,
    Desc,
}

/// The statement shapes understood by the memory database.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    Select {
        table: String,
        /// `None` for `*`.
        columns: Option<Vec<String>>,
        filter: Vec<(String, Operand)>,
        order: Vec<(String, Order)>,
        /// `(offset, count)`
        limit: Option<(u64, u64)>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Operand>,
        update: Vec<(String, Operand)>,
    },
    Delete {
        table: String,
        filter: Vec<(String, Operand)>,
    },
    ShowTables,
    Describe {
        table: String,
    },
}

impl Statement {
    pub(crate) fn parse(sql: &str) -> Result<Self> {
        let mut parser = Parser {
            tokens: tokenize(sql)?,
            position: 0,
        };
        let statement = if parser.keyword("SELECT") {
            parser.select()?
        } else if parser.keyword("INSERT") {
            parser.insert()?
        } else if parser.keyword("DELETE") {
            parser.delete()?
        } else if parser.keyword("SHOW") {
            parser.expect_keyword("TABLES")?;
            Statement::ShowTables
        } else if parser.keyword("DESCRIBE") {
            Statement::Describe {
                table: parser.identifier()?,
            }
        } else {
            return Err(parser.unexpected());
        };
        parser.symbol(';');
        if parser.peek().is_some() {
            return Err(parser.unexpected());
        }
        Ok(statement)
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn unexpected(&self) -> Error {
        match self.peek() {
            Some(Token::Word(v) | Token::Number(v)) => syntax_error(v),
            Some(Token::Text(v)) => syntax_error(format!("'{v}'")),
            Some(Token::Positional) => syntax_error('?'),
            Some(Token::Named(v)) => syntax_error(format!(":{v}")),
            Some(Token::Symbol(v)) => syntax_error(v),
            None => syntax_error("end of statement"),
        }
    }

    fn keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Word(v)) if v.eq_ignore_ascii_case(keyword) => {
                self.position += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn symbol(&mut self, symbol: char) -> bool {
        if self.peek() == Some(&Token::Symbol(symbol)) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<()> {
        if self.symbol(symbol) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn identifier(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Word(..)) => match self.next() {
                Some(Token::Word(v)) => Ok(v),
                _ => Err(self.unexpected()),
            },
            _ => Err(self.unexpected()),
        }
    }

    fn number(&mut self) -> Result<u64> {
        match self.peek() {
            Some(Token::Number(v)) => {
                let value = v.parse::<u64>().map_err(|_| syntax_error(v))?;
                self.position += 1;
                Ok(value)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn operand(&mut self) -> Result<Operand> {
        let operand = match self.peek() {
            Some(Token::Positional) => Operand::Positional,
            Some(Token::Named(v)) => Operand::Named(v.clone()),
            Some(Token::Text(v)) => Operand::Literal(Value::Varchar(v.clone())),
            Some(Token::Number(v)) => Operand::Literal(match v.parse::<i64>() {
                Ok(v) => Value::Int64(v),
                Err(..) => Value::Float64(v.parse().map_err(|_| syntax_error(v))?),
            }),
            Some(Token::Word(v)) if v.eq_ignore_ascii_case("NULL") => Operand::Literal(Value::Null),
            Some(Token::Word(v)) if v.eq_ignore_ascii_case("TRUE") => {
                Operand::Literal(Value::Boolean(true))
            }
            Some(Token::Word(v)) if v.eq_ignore_ascii_case("FALSE") => {
                Operand::Literal(Value::Boolean(false))
            }
            _ => return Err(self.unexpected()),
        };
        self.position += 1;
        Ok(operand)
    }

    fn assignments(&mut self, separator: impl Fn(&mut Self) -> bool) -> Result<Vec<(String, Operand)>> {
        let mut result = Vec::new();
        loop {
            let column = self.identifier()?;
            self.expect_symbol('=')?;
            result.push((column, self.operand()?));
            if !separator(self) {
                break;
            }
        }
        Ok(result)
    }

    fn filter(&mut self) -> Result<Vec<(String, Operand)>> {
        if !self.keyword("WHERE") {
            return Ok(Vec::new());
        }
        self.assignments(|parser| parser.keyword("AND"))
    }

    fn identifiers(&mut self) -> Result<Vec<String>> {
        let mut result = vec![self.identifier()?];
        while self.symbol(',') {
            result.push(self.identifier()?);
        }
        Ok(result)
    }

    fn select(&mut self) -> Result<Statement> {
        let columns = if self.symbol('*') {
            None
        } else {
            Some(self.identifiers()?)
        };
        self.expect_keyword("FROM")?;
        let table = self.identifier()?;
        let filter = self.filter()?;
        let mut order = Vec::new();
        if self.keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let column = self.identifier()?;
                let mode = if self.keyword("DESC") {
                    Order::Desc
                } else {
                    self.keyword("ASC");
                    Order::Asc
                };
                order.push((column, mode));
                if !self.symbol(',') {
                    break;
                }
            }
        }
        let limit = if self.keyword("LIMIT") {
            let first = self.number()?;
            if self.symbol(',') {
                Some((first, self.number()?))
            } else {
                Some((0, first))
            }
        } else {
            None
        };
        Ok(Statement::Select {
            table,
            columns,
            filter,
            order,
            limit,
        })
    }

    fn insert(&mut self) -> Result<Statement> {
        self.expect_keyword("INTO")?;
        let table = self.identifier()?;
        self.expect_symbol('(')?;
        let columns = self.identifiers()?;
        self.expect_symbol(')')?;
        self.expect_keyword("VALUES")?;
        self.expect_symbol('(')?;
        let mut values = vec![self.operand()?];
        while self.symbol(',') {
            values.push(self.operand()?);
        }
        self.expect_symbol(')')?;
        if values.len() != columns.len() {
            return Err(QueryError::new(
                "21S01",
                "Column count doesn't match value count at row 1",
            )
            .into());
        }
        let mut update = Vec::new();
        if self.keyword("ON") {
            self.expect_keyword("DUPLICATE")?;
            self.expect_keyword("KEY")?;
            self.expect_keyword("UPDATE")?;
            update = self.assignments(|parser| parser.symbol(','))?;
        }
        Ok(Statement::Insert {
            table,
            columns,
            values,
            update,
        })
    }

    fn delete(&mut self) -> Result<Statement> {
        self.expect_keyword("FROM")?;
        let table = self.identifier()?;
        let filter = self.filter()?;
        Ok(Statement::Delete { table, filter })
    }
}

/// Resolves operands against the parameters of one execution.
pub(crate) struct Binder<'p> {
    params: &'p Params,
    position: usize,
}

impl<'p> Binder<'p> {
    pub(crate) fn new(params: &'p Params) -> Self {
        Self {
            params,
            position: 0,
        }
    }

    pub(crate) fn bind(&mut self, operand: &Operand) -> Result<Value> {
        match (operand, self.params) {
            (Operand::Literal(v), _) => Ok(v.clone()),
            (Operand::Positional, Params::Positional(values)) => {
                let value = values.get(self.position).cloned().ok_or_else(|| {
                    QueryError::new(
                        "HY000",
                        format!("Missing value for parameter {}", self.position + 1),
                    )
                })?;
                self.position += 1;
                Ok(value)
            }
            (Operand::Named(name), Params::Named(values)) => values
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| {
                    QueryError::new("HY000", format!("Missing value for parameter :{name}"))
                        .into()
                }),
            (Operand::Positional, _) => Err(QueryError::new(
                "HY000",
                "Positional placeholder without positional parameters",
            )
            .into()),
            (Operand::Named(name), _) => Err(QueryError::new(
                "HY000",
                format!("Named placeholder :{name} without named parameters"),
            )
            .into()),
        }
    }
}
