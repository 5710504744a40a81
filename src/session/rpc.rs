//! NETCONF message builders and reply parsing.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::Datastore;
use crate::config::{CLIENT_CAPABILITIES, NETCONF_BASE_NS};
use crate::error::NetconfError;

/// Peer hello: advertised capabilities and the session id, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub capabilities: Vec<String>,
    pub session_id: Option<u32>,
}

impl Hello {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|cap| cap == capability)
    }
}

/// Successful reply body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcReply {
    Ok,
    /// Outer XML of the `<data>` element.
    Data(String),
}

#[derive(Debug, Default)]
struct RpcErrorInfo {
    tag: String,
    severity: String,
    message: String,
}

#[derive(Debug, Clone, Copy)]
enum ErrorField {
    Tag,
    Severity,
    Message,
}

/// Client hello advertising base:1.0 and base:1.1.
pub fn client_hello() -> String {
    let mut caps = String::new();
    for cap in CLIENT_CAPABILITIES {
        caps.push_str("<capability>");
        caps.push_str(cap);
        caps.push_str("</capability>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{NETCONF_BASE_NS}"><capabilities>{caps}</capabilities></hello>"#
    )
}

/// Wraps an operation in an `<rpc>` envelope.
pub fn rpc(message_id: u64, operation: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rpc message-id="{message_id}" xmlns="{NETCONF_BASE_NS}">{operation}</rpc>"#
    )
}

pub fn get_config(source: Datastore, filter: &str) -> String {
    format!(
        "<get-config><source><{}/></source>{filter}</get-config>",
        source.as_str()
    )
}

/// `config` is a complete `<config>` element.
pub fn edit_config(target: Datastore, config: &str) -> String {
    format!(
        "<edit-config><target><{}/></target>{config}</edit-config>",
        target.as_str()
    )
}

pub fn commit() -> &'static str {
    "<commit/>"
}

pub fn close_session() -> &'static str {
    "<close-session/>"
}

fn unexpected_root(start: &BytesStart<'_>, expected: &str) -> NetconfError {
    NetconfError::Protocol(format!(
        "expected <{expected}>, got <{}>",
        String::from_utf8_lossy(start.local_name().as_ref())
    ))
}

/// Parses the peer hello.
pub fn parse_hello(raw: &str) -> Result<Hello, NetconfError> {
    let mut reader = Reader::from_str(raw);
    let mut depth = 0usize;
    let mut capture: Option<&'static str> = None;
    let mut text = String::new();
    let mut capabilities = Vec::new();
    let mut session_id = None;
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if depth == 0 {
                    if start.local_name().as_ref() != b"hello" {
                        return Err(unexpected_root(&start, "hello"));
                    }
                    seen_root = true;
                }
                capture = match start.local_name().as_ref() {
                    b"capability" => Some("capability"),
                    b"session-id" => Some("session-id"),
                    _ => None,
                };
                text.clear();
                depth += 1;
            }
            Event::Empty(start) if depth == 0 => {
                return Err(unexpected_root(&start, "hello"));
            }
            Event::Text(t) if capture.is_some() => text.push_str(&t.unescape()?),
            Event::End(_) => {
                match capture.take() {
                    Some("capability") => capabilities.push(text.trim().to_string()),
                    Some(_) => {
                        let id = text.trim();
                        session_id = Some(id.parse::<u32>().map_err(|_| {
                            NetconfError::Protocol(format!("invalid session-id {id:?}"))
                        })?);
                    }
                    None => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(NetconfError::Protocol("empty hello".to_string()));
    }
    if capabilities.is_empty() {
        return Err(NetconfError::Protocol(
            "hello advertises no capabilities".to_string(),
        ));
    }
    Ok(Hello {
        capabilities,
        session_id,
    })
}

fn check_message_id(start: &BytesStart<'_>, expected: u64) -> Result<(), NetconfError> {
    let Some(attr) = start
        .try_get_attribute("message-id")
        .map_err(quick_xml::Error::from)?
    else {
        return Ok(());
    };
    let value = attr.unescape_value()?;
    if value.trim() != expected.to_string() {
        return Err(NetconfError::Protocol(format!(
            "reply message-id {value} does not match request {expected}"
        )));
    }
    Ok(())
}

/// Parses an `<rpc-reply>` to the request numbered `message_id`.
///
/// An `<rpc-error>` of severity `error` becomes [`NetconfError::RpcError`];
/// warnings are ignored.
pub fn parse_reply(raw: &str, message_id: u64) -> Result<RpcReply, NetconfError> {
    let mut reader = Reader::from_str(raw);
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut ok = false;
    let mut data: Option<String> = None;
    let mut errors: Vec<RpcErrorInfo> = Vec::new();
    let mut current: Option<RpcErrorInfo> = None;
    let mut field: Option<ErrorField> = None;

    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(start) => {
                match (depth, start.local_name().as_ref()) {
                    (0, b"rpc-reply") => {
                        check_message_id(&start, message_id)?;
                        seen_root = true;
                    }
                    (0, _) => return Err(unexpected_root(&start, "rpc-reply")),
                    (1, b"data") => {
                        let end = start.to_end().into_owned();
                        reader.read_to_end(end.name())?;
                        let after = reader.buffer_position() as usize;
                        data = Some(raw[before..after].to_string());
                        continue;
                    }
                    (1, b"rpc-error") => current = Some(RpcErrorInfo::default()),
                    (2, b"error-tag") => field = Some(ErrorField::Tag),
                    (2, b"error-severity") => field = Some(ErrorField::Severity),
                    (2, b"error-message") => field = Some(ErrorField::Message),
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(start) => match (depth, start.local_name().as_ref()) {
                (0, _) => return Err(unexpected_root(&start, "rpc-reply")),
                (1, b"ok") => ok = true,
                (1, b"data") => {
                    let after = reader.buffer_position() as usize;
                    data = Some(raw[before..after].to_string());
                }
                _ => {}
            },
            Event::Text(t) => {
                if let (Some(info), Some(field)) = (current.as_mut(), field) {
                    let text = t.unescape()?;
                    let target = match field {
                        ErrorField::Tag => &mut info.tag,
                        ErrorField::Severity => &mut info.severity,
                        ErrorField::Message => &mut info.message,
                    };
                    target.push_str(text.trim());
                }
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                field = None;
                if depth == 1 && end.local_name().as_ref() == b"rpc-error" {
                    if let Some(info) = current.take() {
                        errors.push(info);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(NetconfError::Protocol("empty rpc-reply".to_string()));
    }
    if let Some(err) = errors
        .into_iter()
        .find(|info| info.severity.is_empty() || info.severity == "error")
    {
        return Err(NetconfError::RpcError {
            tag: err.tag,
            message: err.message,
        });
    }
    match data {
        Some(data) => Ok(RpcReply::Data(data)),
        None if ok => Ok(RpcReply::Ok),
        None => Err(NetconfError::Protocol(
            "rpc-reply carries neither <ok/> nor <data>".to_string(),
        )),
    }
}
