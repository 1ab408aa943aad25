//! Line codec for request and response frames.
//!
//! Fields are separated by whitespace, but double quotes hold a field
//! together, so `LensMode:"Wide Angle"` and
//! `ParameterNames:["Detector Voltage","Bias Voltage"]` each decode as a
//! single key/value pair. A scalar value is wrapped in quotes on encode only
//! when it contains whitespace; bracketed list values carry their own inner
//! quoting and are never wrapped. Values must not contain a literal double
//! quote, there is no escape sequence.

use super::{CommandKind, ErrorTag, Request, Response, Status};
use std::collections::HashMap;
use thiserror::Error;

/// Errors produced while decoding a frame.
///
/// Every variant that managed to parse a request ID carries it, so the
/// offending frame can still be answered. A frame without an ID cannot be
/// answered safely and is fatal to the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame is not a request")]
    MalformedFrame,

    #[error("request carries no command")]
    MissingCommand { req_id: String },

    #[error("unknown command '{name}'")]
    UnknownCommand { req_id: String, name: String },

    #[error("malformed parameter '{token}'")]
    MalformedParameter { req_id: String, token: String },

    #[error("malformed status token '{token}'")]
    BadStatus { req_id: String, token: String },
}

impl DecodeError {
    /// Request ID of the offending frame, when one could be parsed.
    pub fn req_id(&self) -> Option<&str> {
        match self {
            Self::MalformedFrame => None,
            Self::MissingCommand { req_id }
            | Self::UnknownCommand { req_id, .. }
            | Self::MalformedParameter { req_id, .. }
            | Self::BadStatus { req_id, .. } => Some(req_id),
        }
    }

    /// Wire tag a response to this error should carry.
    pub fn tag(&self) -> ErrorTag {
        match self {
            Self::UnknownCommand { .. } => ErrorTag::UnknownCommand,
            _ => ErrorTag::DecodeError,
        }
    }
}

/// Splits a frame body into fields, keeping quoted spans intact.
///
/// Returns `None` on an unterminated quote.
fn split_fields(input: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return None;
    }
    if !current.is_empty() {
        fields.push(current);
    }
    Some(fields)
}

/// Strips one pair of enclosing double quotes, if present.
fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Quotes a value for the wire when its spelling requires it.
fn quote(value: &str) -> String {
    if value.contains(char::is_whitespace) && !value.starts_with('[') {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Splits a parameter token into an unquoted key/value pair.
fn parse_pair(req_id: &str, token: String) -> Result<(String, String), DecodeError> {
    let colon = match token.find(':') {
        Some(index) if index > 0 => index,
        _ => {
            return Err(DecodeError::MalformedParameter {
                req_id: req_id.to_string(),
                token,
            })
        }
    };
    let key = token[..colon].to_string();
    let value = unquote(&token[colon + 1..]).to_string();
    Ok((key, value))
}

/// Decodes one request line.
pub fn decode_request(line: &str) -> Result<Request, DecodeError> {
    let line = line.trim();
    let body = line.strip_prefix('?').ok_or(DecodeError::MalformedFrame)?;

    let (req_id, rest) = match body.split_once(char::is_whitespace) {
        Some((id, rest)) => (id, rest),
        None => (body, ""),
    };
    if req_id.is_empty() {
        return Err(DecodeError::MalformedFrame);
    }

    let fields = split_fields(rest).ok_or_else(|| DecodeError::MalformedParameter {
        req_id: req_id.to_string(),
        token: rest.trim().to_string(),
    })?;
    let mut fields = fields.into_iter();

    let name = fields.next().ok_or_else(|| DecodeError::MissingCommand {
        req_id: req_id.to_string(),
    })?;
    let command = CommandKind::from_name(&name).ok_or_else(|| DecodeError::UnknownCommand {
        req_id: req_id.to_string(),
        name: name.clone(),
    })?;

    let mut params = HashMap::new();
    for token in fields {
        let (key, value) = parse_pair(req_id, token)?;
        params.insert(key, value);
    }

    Ok(Request {
        req_id: req_id.to_string(),
        command,
        params,
    })
}

/// Encodes one request as a newline-terminated frame.
pub fn encode_request(request: &Request) -> String {
    let mut out = format!("?{} {}", request.req_id, request.command.name());
    for (key, value) in &request.params {
        out.push(' ');
        out.push_str(key);
        out.push(':');
        out.push_str(&quote(value));
    }
    out.push('\n');
    out
}

/// Decodes one response line.
pub fn decode_response(line: &str) -> Result<Response, DecodeError> {
    let line = line.trim();
    let (req_id, rest) = line
        .split_once(char::is_whitespace)
        .ok_or(DecodeError::MalformedFrame)?;
    if req_id.is_empty() {
        return Err(DecodeError::MalformedFrame);
    }

    let fields = split_fields(rest).ok_or_else(|| DecodeError::MalformedParameter {
        req_id: req_id.to_string(),
        token: rest.trim().to_string(),
    })?;
    let mut fields = fields.into_iter();

    let status_token = fields.next().ok_or_else(|| DecodeError::BadStatus {
        req_id: req_id.to_string(),
        token: String::new(),
    })?;
    let bad_status = || DecodeError::BadStatus {
        req_id: req_id.to_string(),
        token: status_token.clone(),
    };
    let status = if status_token == "OK" || status_token.starts_with("OK:") {
        Status::Ok
    } else if let Some(tag) = status_token.strip_prefix("ERROR:") {
        Status::Error(ErrorTag::from_wire(tag).ok_or_else(bad_status)?)
    } else {
        return Err(bad_status());
    };

    let mut params = Vec::new();
    for token in fields {
        params.push(parse_pair(req_id, token)?);
    }

    Ok(Response {
        req_id: req_id.to_string(),
        status,
        params,
    })
}

/// Encodes one response as a newline-terminated frame.
pub fn encode_response(response: &Response) -> String {
    let mut out = String::new();
    out.push_str(&response.req_id);
    out.push(' ');
    match response.status {
        Status::Ok => out.push_str("OK"),
        Status::Error(tag) => {
            out.push_str("ERROR:");
            out.push_str(tag.as_str());
        }
    }
    for (key, value) in &response.params {
        out.push(' ');
        out.push_str(key);
        out.push(':');
        out.push_str(&quote(value));
    }
    out.push('\n');
    out
}
