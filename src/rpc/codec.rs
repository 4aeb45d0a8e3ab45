//! XML-RPC document encoding and decoding.
//!
//! Requests are rendered straight into a `methodCall` string. Responses are
//! flattened into a token stream with `quick-xml` and then parsed by a small
//! recursive-descent reader, which keeps whitespace inside scalar values
//! intact while ignoring the indentation between structural tags.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::transport::ProtocolError;
use super::value::Value;

/// Renders a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str("<methodCall><methodName>");
    xml.push_str(&html_escape::encode_text(method));
    xml.push_str("</methodName><params>");
    for param in params {
        xml.push_str("<param>");
        write_value(&mut xml, param);
        xml.push_str("</param>");
    }
    xml.push_str("</params></methodCall>");
    xml
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(number) => {
            if i32::try_from(*number).is_ok() {
                out.push_str(&format!("<int>{number}</int>"));
            } else {
                out.push_str(&format!("<i8>{number}</i8>"));
            }
        }
        Value::Bool(flag) => {
            out.push_str(if *flag {
                "<boolean>1</boolean>"
            } else {
                "<boolean>0</boolean>"
            });
        }
        Value::Double(number) => out.push_str(&format!("<double>{number}</double>")),
        Value::String(text) => {
            out.push_str("<string>");
            out.push_str(&html_escape::encode_text(text));
            out.push_str("</string>");
        }
        Value::DateTime(raw) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&html_escape::encode_text(raw));
            out.push_str("</dateTime.iso8601>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&html_escape::encode_text(name));
                out.push_str("</name>");
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

/// Parses a `methodResponse` document.
///
/// Returns the first response parameter (or [`Value::Nil`] when the server
/// sent none). A `fault` body is surfaced as [`ProtocolError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, ProtocolError> {
    let mut parser = TokenParser::new(tokenize(xml)?);
    parser.expect_open("methodResponse")?;

    let outcome = match parser.next_significant() {
        Some(Token::Open(tag)) if tag == "params" => {
            let value = if parser.peek_open() == Some("param") {
                parser.expect_open("param")?;
                let value = parser.parse_value()?;
                parser.expect_close("param")?;
                value
            } else {
                Value::Nil
            };
            parser.expect_close("params")?;
            Ok(value)
        }
        Some(Token::Open(tag)) if tag == "fault" => {
            let fault = parser.parse_value()?;
            parser.expect_close("fault")?;
            Err(fault_error(&fault))
        }
        _ => {
            return Err(malformed(
                "methodResponse must contain <params> or <fault>",
            ));
        }
    };

    parser.expect_close("methodResponse")?;
    outcome
}

fn fault_error(fault: &Value) -> ProtocolError {
    let code = match fault.member("faultCode") {
        Some(Value::Int(code)) => *code,
        Some(Value::String(code)) => code.trim().parse().unwrap_or_default(),
        _ => 0,
    };
    let message = match fault.member("faultString") {
        Some(Value::String(message)) => message.clone(),
        _ => String::from("unspecified fault"),
    };
    ProtocolError::Fault { code, message }
}

fn malformed(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::Malformed(reason.into())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Text(String),
}

fn tokenize(xml: &str) -> Result<Vec<Token>, ProtocolError> {
    let mut reader = Reader::from_str(xml);
    let mut tokens = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| malformed(err.to_string()))?;
        match event {
            Event::Start(tag) => tokens.push(Token::Open(tag_name(tag.local_name().as_ref()))),
            Event::End(tag) => tokens.push(Token::Close(tag_name(tag.local_name().as_ref()))),
            Event::Empty(tag) => {
                let name = tag_name(tag.local_name().as_ref());
                tokens.push(Token::Open(name.clone()));
                tokens.push(Token::Close(name));
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|err| malformed(err.to_string()))?;
                push_text(&mut tokens, &text);
            }
            Event::CData(data) => {
                push_text(&mut tokens, &String::from_utf8_lossy(&data.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(tokens)
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Text(previous)) = tokens.last_mut() {
        previous.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

struct TokenParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        while let Some(Token::Text(text)) = self.tokens.get(self.pos)
            && text.trim().is_empty()
        {
            self.pos += 1;
        }
    }

    fn next_significant(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_open(&mut self) -> Option<&str> {
        self.skip_whitespace();
        match self.tokens.get(self.pos) {
            Some(Token::Open(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    fn expect_open(&mut self, name: &str) -> Result<(), ProtocolError> {
        match self.next_significant() {
            Some(Token::Open(tag)) if tag == name => Ok(()),
            other => Err(malformed(format!("expected <{name}>, found {other:?}"))),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<(), ProtocolError> {
        match self.next_significant() {
            Some(Token::Close(tag)) if tag == name => Ok(()),
            other => Err(malformed(format!("expected </{name}>, found {other:?}"))),
        }
    }

    /// Collects raw text up to and including `</name>`.
    fn text_until_close(&mut self, name: &str) -> Result<String, ProtocolError> {
        let mut text = String::new();
        loop {
            match self.tokens.get(self.pos) {
                Some(Token::Text(chunk)) => text.push_str(chunk),
                Some(Token::Close(tag)) if tag == name => {
                    self.pos += 1;
                    return Ok(text);
                }
                other => {
                    return Err(malformed(format!(
                        "unexpected {other:?} inside <{name}>"
                    )));
                }
            }
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> Result<Value, ProtocolError> {
        self.expect_open("value")?;

        let mut text = String::new();
        while let Some(Token::Text(chunk)) = self.tokens.get(self.pos) {
            text.push_str(chunk);
            self.pos += 1;
        }

        match self.tokens.get(self.pos) {
            Some(Token::Close(tag)) if tag == "value" => {
                self.pos += 1;
                return Ok(Value::String(text));
            }
            Some(Token::Open(_)) if text.trim().is_empty() => {}
            other => {
                return Err(malformed(format!("unexpected {other:?} inside <value>")));
            }
        }

        let value = self.parse_typed()?;
        self.expect_close("value")?;
        Ok(value)
    }

    fn parse_typed(&mut self) -> Result<Value, ProtocolError> {
        let tag = match self.next_significant() {
            Some(Token::Open(tag)) => tag,
            other => return Err(malformed(format!("expected a value type, found {other:?}"))),
        };

        match tag.as_str() {
            "int" | "i4" | "i8" => {
                let text = self.text_until_close(&tag)?;
                text.trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| malformed(format!("invalid integer '{text}'")))
            }
            "boolean" => {
                let text = self.text_until_close(&tag)?;
                match text.trim() {
                    "1" | "true" => Ok(Value::Bool(true)),
                    "0" | "false" => Ok(Value::Bool(false)),
                    other => Err(malformed(format!("invalid boolean '{other}'"))),
                }
            }
            "double" => {
                let text = self.text_until_close(&tag)?;
                text.trim()
                    .parse()
                    .map(Value::Double)
                    .map_err(|_| malformed(format!("invalid double '{text}'")))
            }
            "string" => self.text_until_close(&tag).map(Value::String),
            "dateTime.iso8601" => {
                let text = self.text_until_close(&tag)?;
                Ok(Value::DateTime(text.trim().to_string()))
            }
            "base64" => {
                let text = self.text_until_close(&tag)?;
                let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                STANDARD
                    .decode(compact.as_bytes())
                    .map(Value::Base64)
                    .map_err(|err| malformed(format!("invalid base64: {err}")))
            }
            "nil" => self.text_until_close(&tag).map(|_| Value::Nil),
            "struct" => self.parse_struct_body(),
            "array" => self.parse_array_body(),
            other => Err(malformed(format!("unsupported value type <{other}>"))),
        }
    }

    fn parse_struct_body(&mut self) -> Result<Value, ProtocolError> {
        let mut members = BTreeMap::new();
        loop {
            match self.next_significant() {
                Some(Token::Close(tag)) if tag == "struct" => break,
                Some(Token::Open(tag)) if tag == "member" => {
                    self.expect_open("name")?;
                    let name = self.text_until_close("name")?;
                    let value = self.parse_value()?;
                    self.expect_close("member")?;
                    members.insert(name.trim().to_string(), value);
                }
                other => {
                    return Err(malformed(format!("unexpected {other:?} inside <struct>")));
                }
            }
        }
        Ok(Value::Struct(members))
    }

    fn parse_array_body(&mut self) -> Result<Value, ProtocolError> {
        self.expect_open("data")?;
        let mut items = Vec::new();
        while self.peek_open() == Some("value") {
            items.push(self.parse_value()?);
        }
        self.expect_close("data")?;
        self.expect_close("array")?;
        Ok(Value::Array(items))
    }
}
