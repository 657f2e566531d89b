//! Parser for the statement dialect understood by the embedded engine:
//!
//! ```text
//! SELECT <alias>.* [as <column>], ...
//! FROM <event>.win:length(<n>) [as] <alias>, ...
//! [WHERE <alias>.<attr> = <alias>.<attr> [and ...]]
//! ```
//!
//! Keywords are case-insensitive. Everything is resolved against the
//! engine configuration at parse time.

use logos::Logos;
use std::collections::HashSet;

use super::EngineConfiguration;
use crate::error::EngineError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token {
    #[token("select", ignore(ascii_case))]
    Select,
    #[token("from", ignore(ascii_case))]
    From,
    #[token("where", ignore(ascii_case))]
    Where,
    #[token("and", ignore(ascii_case))]
    And,
    #[token("as", ignore(ascii_case))]
    As,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<usize>().ok())]
    Number(usize),
    #[token(".")]
    Dot,
    #[token("*")]
    Star,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("=")]
    Eq,
}

impl Token {
    /// Source text of a keyword or identifier. Keywords are valid names
    /// wherever an identifier is expected.
    fn word(&self) -> Option<&str> {
        match self {
            Token::Ident(s) => Some(s.as_str()),
            Token::Select => Some("select"),
            Token::From => Some("from"),
            Token::Where => Some("where"),
            Token::And => Some("and"),
            Token::As => Some("as"),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Dot => "'.'".into(),
            Token::Star => "'*'".into(),
            Token::Comma => "','".into(),
            Token::Colon => "':'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Eq => "'='".into(),
            word => format!("'{}'", word.word().unwrap_or_default()),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Token::lexer(text);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => {
                let slice = lexer.slice();
                return Err(if slice.starts_with(|c: char| c.is_ascii_digit()) {
                    format!("number '{}' out of range", slice)
                } else {
                    format!("unexpected character '{}' at {}", slice, lexer.span().start)
                });
            }
        }
    }
    Ok(tokens)
}

/// A windowed stream in the FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stream {
    pub event_name: String,
    pub alias: String,
    pub length: usize,
}

/// A SELECT item: the event of stream `stream` exposed as `column`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    pub stream: usize,
    pub name: String,
}

/// `<stream>.<attribute>`, resolved to a FROM position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Operand {
    pub stream: usize,
    pub attribute: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Predicate {
    pub left: Operand,
    pub right: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Query {
    pub columns: Vec<Column>,
    pub streams: Vec<Stream>,
    pub predicates: Vec<Predicate>,
}

struct RawOperand {
    alias: String,
    attribute: String,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn unexpected(&self, expected: &str) -> String {
        match self.peek() {
            Some(token) => format!("expected {}, found {}", expected, token.describe()),
            None => format!("expected {}, found end of statement", expected),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), String> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        let found = self.peek() == Some(token);
        if found {
            self.pos += 1;
        }
        found
    }

    fn ident(&mut self, what: &str) -> Result<String, String> {
        match self.peek() {
            Some(token) => match token.word() {
                Some(word) => {
                    let word = word.to_string();
                    self.pos += 1;
                    Ok(word)
                }
                None => Err(self.unexpected(what)),
            },
            None => Err(self.unexpected(what)),
        }
    }

    fn number(&mut self) -> Result<usize, String> {
        match self.peek() {
            Some(&Token::Number(n)) => {
                self.pos += 1;
                Ok(n)
            }
            _ => Err(self.unexpected("a number")),
        }
    }

    /// `<alias>.* [as <column>]`
    fn select_item(&mut self) -> Result<(String, String), String> {
        let alias = self.ident("a stream alias")?;
        self.expect(Token::Dot)?;
        self.expect(Token::Star)?;
        let column = if self.eat(&Token::As) {
            self.ident("a column name")?
        } else {
            alias.clone()
        };
        Ok((alias, column))
    }

    /// `<event>.win:length(<n>) [as] <alias>`
    fn from_item(&mut self) -> Result<Stream, String> {
        let event_name = self.ident("an event type")?;
        self.expect(Token::Dot)?;
        let namespace = self.ident("a window")?;
        self.expect(Token::Colon)?;
        let view = self.ident("a window")?;
        if !namespace.eq_ignore_ascii_case("win") || !view.eq_ignore_ascii_case("length") {
            return Err(format!("unsupported window '{}:{}'", namespace, view));
        }
        self.expect(Token::LParen)?;
        let length = self.number()?;
        self.expect(Token::RParen)?;
        if length == 0 {
            return Err("window length must be positive".to_string());
        }
        self.eat(&Token::As);
        let alias = self.ident("a stream alias")?;
        Ok(Stream {
            event_name,
            alias,
            length,
        })
    }

    fn operand(&mut self) -> Result<RawOperand, String> {
        let alias = self.ident("a stream alias")?;
        self.expect(Token::Dot)?;
        let attribute = self.ident("an attribute")?;
        Ok(RawOperand { alias, attribute })
    }

    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T, String>) -> Result<Vec<T>, String> {
        let mut items = vec![item(self)?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            items.push(item(self)?);
        }
        Ok(items)
    }
}

pub(crate) fn parse(text: &str, configuration: &EngineConfiguration) -> Result<Query, EngineError> {
    let invalid = |message: String| EngineError::InvalidStatement {
        statement: text.to_string(),
        message,
    };

    let mut parser = Parser {
        tokens: tokenize(text).map_err(invalid)?,
        pos: 0,
    };
    parser.expect(Token::Select).map_err(invalid)?;
    let selected = parser.list(Parser::select_item).map_err(invalid)?;
    parser.expect(Token::From).map_err(invalid)?;
    let streams = parser.list(Parser::from_item).map_err(invalid)?;
    let mut conditions = Vec::new();
    if parser.eat(&Token::Where) {
        loop {
            let left = parser.operand().map_err(invalid)?;
            parser.expect(Token::Eq).map_err(invalid)?;
            let right = parser.operand().map_err(invalid)?;
            conditions.push((left, right));
            if !parser.eat(&Token::And) {
                break;
            }
        }
    }
    if parser.peek().is_some() {
        return Err(invalid(parser.unexpected("end of statement")));
    }

    let mut aliases = HashSet::new();
    for stream in &streams {
        if configuration.event_type(&stream.event_name).is_none() {
            return Err(EngineError::UnknownEventType(stream.event_name.clone()));
        }
        if !aliases.insert(stream.alias.as_str()) {
            return Err(invalid(format!("duplicate stream alias '{}'", stream.alias)));
        }
    }
    let position = |alias: &str| {
        streams
            .iter()
            .position(|s| s.alias == alias)
            .ok_or_else(|| invalid(format!("unknown stream alias '{}'", alias)))
    };

    let mut names = HashSet::new();
    let mut columns = Vec::with_capacity(selected.len());
    for (alias, name) in selected {
        if !names.insert(name.clone()) {
            return Err(invalid(format!("duplicate column '{}'", name)));
        }
        columns.push(Column {
            stream: position(&alias)?,
            name,
        });
    }

    let resolve = |raw: RawOperand| -> Result<Operand, EngineError> {
        let stream = position(&raw.alias)?;
        let known = configuration
            .event_type(&streams[stream].event_name)
            .map_or(false, |definition| definition.contains_key(&raw.attribute));
        if !known {
            return Err(invalid(format!(
                "stream '{}' has no attribute '{}'",
                raw.alias, raw.attribute
            )));
        }
        Ok(Operand {
            stream,
            attribute: raw.attribute,
        })
    };
    let predicates = conditions
        .into_iter()
        .map(|(left, right)| {
            Ok(Predicate {
                left: resolve(left)?,
                right: resolve(right)?,
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    Ok(Query {
        columns,
        streams,
        predicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_types::{EventDefinition, ValueType};

    fn configuration() -> EngineConfiguration {
        let mut config = EngineConfiguration::new();
        let definition: EventDefinition = [
            ("key".to_string(), ValueType::Long),
            ("price".to_string(), ValueType::Double),
        ]
        .into_iter()
        .collect();
        config.add_event_type("_a", definition.clone());
        config.add_event_type("_b", definition);
        config
    }

    #[test]
    fn test_parse_join_statement() {
        let query = parse(
            "select _0.* as _0_properties, _1.* as _1_properties \
             from _a.win:length(1) as _0, _b.win:length(3) _1 \
             where _0.key = _1.key AND _1.price = _0.price",
            &configuration(),
        )
        .unwrap();
        assert_eq!(query.streams.len(), 2);
        assert_eq!(query.streams[1].length, 3);
        assert_eq!(query.columns[1].name, "_1_properties");
        assert_eq!(query.columns[1].stream, 1);
        assert_eq!(query.predicates.len(), 2);
        assert_eq!(query.predicates[1].left.stream, 1);
        assert_eq!(query.predicates[1].right.attribute, "price");
    }

    #[test]
    fn test_column_defaults_to_alias() {
        let query = parse("SELECT _0.* FROM _a.win:length(1) as _0", &configuration()).unwrap();
        assert_eq!(query.columns[0].name, "_0");
    }

    #[test]
    fn test_rejects_unknown_event_type() {
        assert_eq!(
            parse("SELECT _0.* FROM _zz.win:length(1) as _0", &configuration()),
            Err(EngineError::UnknownEventType("_zz".to_string()))
        );
    }

    #[test]
    fn test_tokenize_keywords_ignore_case() {
        assert_eq!(
            tokenize("Select _0.* aS x FROM").unwrap(),
            vec![
                Token::Select,
                Token::Ident("_0".to_string()),
                Token::Dot,
                Token::Star,
                Token::As,
                Token::Ident("x".to_string()),
                Token::From,
            ]
        );
    }

    #[test]
    fn test_tokenize_reports_bad_input() {
        assert_eq!(
            tokenize("_0.unit-price"),
            Err("unexpected character '-' at 7".to_string())
        );
        assert_eq!(
            tokenize("win:length(99999999999999999999999)"),
            Err("number '99999999999999999999999' out of range".to_string())
        );
    }

    #[test]
    fn test_keyword_accepted_as_column_name() {
        let query = parse("SELECT _0.* as from FROM _a.win:length(2) _0", &configuration()).unwrap();
        assert_eq!(query.columns[0].name, "from");
        assert_eq!(query.streams[0].length, 2);
    }

    #[test]
    fn test_rejects_malformed_statements() {
        let config = configuration();
        for text in [
            "SELECT FROM _a.win:length(1) as _0",
            "SELECT _0.* FROM _a as _0",
            "SELECT _0.* FROM _a.win:time(1) as _0",
            "SELECT _0.* FROM _a.win:length(0) as _0",
            "SELECT _1.* FROM _a.win:length(1) as _0",
            "SELECT _0.* FROM _a.win:length(1) as _0, _b.win:length(1) as _0",
            "SELECT _0.* FROM _a.win:length(1) as _0 WHERE _0.volume = _0.key",
            "SELECT _0.* FROM _a.win:length(1) as _0 extra",
            "SELECT _0.* FROM _a.win:length(1) as _0 WHERE _0.key > _0.key",
        ] {
            assert!(
                matches!(parse(text, &config), Err(EngineError::InvalidStatement { .. })),
                "accepted: {}",
                text
            );
        }
    }
}
