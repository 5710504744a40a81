//! NETCONF message framing over the SSH channel.
//!
//! The hello exchange always uses base:1.0 end-of-message framing
//! (`]]>]]>`). When both peers advertise base:1.1 the session switches to
//! chunked framing (`\n#<len>\n<data>` repeated, closed by `\n##\n`).

use crate::config::END_OF_MESSAGE;
use crate::error::NetconfError;

/// Largest chunk size allowed by RFC 6242.
const MAX_CHUNK_SIZE: u64 = 4_294_967_295;

/// Framing mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    EndOfMessage,
    Chunked,
}

/// Frames one outgoing message.
pub fn encode(framing: Framing, message: &str) -> Vec<u8> {
    match framing {
        Framing::EndOfMessage => {
            let mut out = Vec::with_capacity(message.len() + END_OF_MESSAGE.len());
            out.extend_from_slice(message.as_bytes());
            out.extend_from_slice(END_OF_MESSAGE);
            out
        }
        Framing::Chunked => {
            let mut out = format!("\n#{}\n", message.len()).into_bytes();
            out.extend_from_slice(message.as_bytes());
            out.extend_from_slice(b"\n##\n");
            out
        }
    }
}

/// Incremental decoder for incoming messages.
///
/// Bytes are pushed as they arrive; complete messages are popped with
/// [`FrameDecoder::next_message`]. Bytes following a message stay buffered,
/// so switching framing after the hello keeps anything already received.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: Vec::with_capacity(4096),
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn set_framing(&mut self, framing: Framing) {
        self.framing = framing;
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet returned as a message.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Pops the next complete message, if one is buffered.
    pub fn next_message(&mut self) -> Result<Option<String>, NetconfError> {
        match self.framing {
            Framing::EndOfMessage => self.next_eom(),
            Framing::Chunked => self.next_chunked(),
        }
    }

    fn next_eom(&mut self) -> Result<Option<String>, NetconfError> {
        let Some(pos) = self
            .buffer
            .windows(END_OF_MESSAGE.len())
            .position(|window| window == END_OF_MESSAGE)
        else {
            return Ok(None);
        };
        let message: Vec<u8> = self.buffer.drain(..pos + END_OF_MESSAGE.len()).collect();
        into_string(message[..pos].to_vec()).map(Some)
    }

    fn next_chunked(&mut self) -> Result<Option<String>, NetconfError> {
        let buf = &self.buffer;
        let mut idx = 0;
        let mut message = Vec::new();

        loop {
            if buf.len() < idx + 2 {
                return Ok(None);
            }
            if buf[idx] != b'\n' || buf[idx + 1] != b'#' {
                return Err(NetconfError::Protocol(format!(
                    "invalid chunk header at byte {idx}"
                )));
            }
            idx += 2;

            if buf.len() <= idx {
                return Ok(None);
            }
            if buf[idx] == b'#' {
                if buf.len() < idx + 2 {
                    return Ok(None);
                }
                if buf[idx + 1] != b'\n' {
                    return Err(NetconfError::Protocol(
                        "invalid end-of-chunks marker".to_string(),
                    ));
                }
                idx += 2;
                self.buffer.drain(..idx);
                return into_string(message).map(Some);
            }

            let Some(newline) = buf[idx..].iter().position(|b| *b == b'\n') else {
                if buf.len() - idx > 10 {
                    return Err(NetconfError::Protocol("chunk size too long".to_string()));
                }
                return Ok(None);
            };
            let digits = &buf[idx..idx + newline];
            let size = std::str::from_utf8(digits)
                .ok()
                .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|size| (1..=MAX_CHUNK_SIZE).contains(size))
                .ok_or_else(|| {
                    NetconfError::Protocol(format!(
                        "invalid chunk size {:?}",
                        String::from_utf8_lossy(digits)
                    ))
                })?;
            let size = usize::try_from(size)
                .map_err(|_| NetconfError::Protocol(format!("chunk size {size} too large")))?;
            idx += newline + 1;

            if buf.len() < idx + size {
                return Ok(None);
            }
            message.extend_from_slice(&buf[idx..idx + size]);
            idx += size;
        }
    }
}

fn into_string(bytes: Vec<u8>) -> Result<String, NetconfError> {
    String::from_utf8(bytes)
        .map_err(|e| NetconfError::Protocol(format!("message is not valid UTF-8: {e}")))
}
