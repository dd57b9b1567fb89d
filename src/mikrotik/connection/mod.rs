// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Low-level RouterOS API connection handling

mod auth;
mod parse;
mod protocol;
mod reply;

use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::endpoint::{DeviceEndpoint, Timeouts};
use crate::error::{Error, Result};

pub use auth::challenge_response;
pub(crate) use parse::{parse_pools, parse_profiles, parse_routerboard, parse_secrets, parse_system};
pub use protocol::{MAX_WORD_LEN, decode_length, decode_word, encode_length, encode_word};
pub use reply::{ReplyKind, Row, Sentence, parse_sentences};

use protocol::read_word;

/// Low-level RouterOS API connection.
///
/// Owns its stream exclusively; after `disconnect` or any transport or
/// decode failure the stream is dropped and further calls fail.
pub struct RouterOsConnection<S = TcpStream> {
    stream: Option<S>,
    outgoing: BytesMut,
    sentence_head: Option<String>,
    last_command: String,
    read_timeout: Duration,
}

impl RouterOsConnection<TcpStream> {
    /// Opens a TCP connection and performs the login handshake
    pub async fn connect(endpoint: &DeviceEndpoint, timeouts: Timeouts) -> Result<Self> {
        let addr = endpoint.socket_addr();
        tracing::trace!("Attempting TCP connection to: {}", addr);
        let stream = timeout(timeouts.connect, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                Error::Connection(format!(
                    "connect to {addr} timed out after {:?}",
                    timeouts.connect
                ))
            })?
            .map_err(|e| Error::Connection(format!("connect to {addr}: {e}")))?;
        tracing::trace!("TCP connection established to: {}", addr);

        let mut conn = Self::from_stream(stream, timeouts.read);
        if let Err(e) = conn.login(&endpoint.username, &endpoint.secret).await {
            conn.disconnect().await;
            return Err(e);
        }
        Ok(conn)
    }
}

impl<S> RouterOsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already established stream; no login is performed
    pub fn from_stream(stream: S, read_timeout: Duration) -> Self {
        Self {
            stream: Some(stream),
            outgoing: BytesMut::with_capacity(256),
            sentence_head: None,
            last_command: String::new(),
            read_timeout,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Appends one word to the outgoing sentence. When `final_word` is set
    /// the zero-length terminator is appended and the sentence is flushed.
    pub async fn write(&mut self, word: &str, final_word: bool) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::Connection("not connected".to_string()));
        }
        tracing::trace!("Sending word: {}", redact(word));
        if self.sentence_head.is_none() {
            self.sentence_head = Some(word.to_string());
        }
        self.outgoing.put_slice(&encode_word(word));
        if !final_word {
            return Ok(());
        }

        // zero length word terminator
        self.outgoing.put_u8(0);
        self.last_command = self.sentence_head.take().unwrap_or_default();
        let buf = self.outgoing.split().freeze();

        let result = match self.stream.as_mut() {
            Some(stream) => match stream.write_all(&buf).await {
                Ok(()) => stream.flush().await,
                Err(e) => Err(e),
            },
            None => return Err(Error::Connection("not connected".to_string())),
        };
        if let Err(e) = result {
            self.drop_stream();
            return Err(Error::Connection(format!(
                "failed to send '{}': {e}",
                self.last_command
            )));
        }
        Ok(())
    }

    /// Sends a command path followed by its argument words
    pub async fn send<I, W>(&mut self, path: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let args: Vec<W> = args.into_iter().collect();
        self.write(path, args.is_empty()).await?;
        let last = args.len().saturating_sub(1);
        for (i, arg) in args.iter().enumerate() {
            self.write(arg.as_ref(), i == last).await?;
        }
        Ok(())
    }

    /// Sends a command and returns the parsed `!re` rows
    pub async fn command<I, W>(&mut self, path: &str, args: I) -> Result<Vec<Row>>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        self.send(path, args).await?;
        self.read().await
    }

    /// Reads one reply and converts it into attribute rows
    pub async fn read(&mut self) -> Result<Vec<Row>> {
        let sentences = self.read_raw().await?;
        Ok(parse_sentences(&sentences))
    }

    /// Reads sentences until `!done`.
    ///
    /// A `!trap` is reported only after the trailing `!done` has been
    /// consumed so the stream stays aligned for the next command.
    pub async fn read_raw(&mut self) -> Result<Vec<Sentence>> {
        let limit = self.read_timeout;
        let outcome = match self.stream.as_mut() {
            Some(stream) => timeout(limit, read_reply(stream)).await,
            None => return Err(Error::Connection("not connected".to_string())),
        };

        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                self.drop_stream();
                return Err(e);
            }
            Err(_) => {
                self.drop_stream();
                return Err(Error::Connection(format!(
                    "read timeout: device did not answer '{}' within {limit:?}",
                    self.last_command
                )));
            }
        };

        if let Some(fatal) = reply.iter().find(|s| s.kind() == ReplyKind::Fatal) {
            let msg = fatal.message().unwrap_or_else(|| "fatal".to_string());
            tracing::debug!("RouterOS fatal: {}", msg);
            self.drop_stream();
            return Err(Error::Connection(format!("device closed session: {msg}")));
        }

        if let Some(trap) = reply.iter().find(|s| s.kind() == ReplyKind::Trap) {
            let attrs = trap.attributes();
            let message = attrs
                .get("message")
                .cloned()
                .unwrap_or_else(|| "trap".to_string());
            tracing::debug!("RouterOS trap for '{}': {}", self.last_command, message);
            return Err(Error::DeviceRejectedCommand {
                command: self.last_command.clone(),
                message,
                category: attrs.get("category").cloned(),
            });
        }

        tracing::trace!("Command complete, {} sentences received", reply.len());
        Ok(reply)
    }

    /// Closes the stream. Safe to call more than once.
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::trace!("Ignoring error on RouterOS shutdown: {}", e);
            }
        }
        self.outgoing.clear();
        self.sentence_head = None;
    }

    fn drop_stream(&mut self) {
        self.stream = None;
        self.outgoing.clear();
        self.sentence_head = None;
    }
}

async fn read_sentence<S>(stream: &mut S) -> Result<Sentence>
where
    S: AsyncRead + Unpin,
{
    let mut words = Vec::new();
    loop {
        let word = read_word(stream).await?;
        if word.is_empty() {
            return Ok(Sentence::new(words));
        }
        tracing::trace!("Received word: {}", word);
        words.push(word);
    }
}

async fn read_reply<S>(stream: &mut S) -> Result<Vec<Sentence>>
where
    S: AsyncRead + Unpin,
{
    let mut sentences = Vec::new();
    loop {
        let sentence = read_sentence(stream).await?;
        if sentence.words.is_empty() {
            continue;
        }
        let kind = sentence.kind();
        sentences.push(sentence);
        match kind {
            ReplyKind::Done | ReplyKind::Fatal => return Ok(sentences),
            ReplyKind::Re | ReplyKind::Trap | ReplyKind::Empty => {}
            ReplyKind::Other => {
                return Err(Error::ProtocolDecode(format!(
                    "unexpected reply word '{}'",
                    sentences
                        .last()
                        .and_then(|s| s.words.first())
                        .map(String::as_str)
                        .unwrap_or_default()
                )));
            }
        }
    }
}

fn redact(word: &str) -> &str {
    if word.starts_with("=password=") {
        "=password=***"
    } else if word.starts_with("=response=") {
        "=response=***"
    } else {
        word
    }
}

#[cfg(test)]
mod tests;
