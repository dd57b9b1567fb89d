// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS wire protocol helpers

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// Upper bound for a single word read from the device
pub const MAX_WORD_LEN: usize = 16 * 1024 * 1024;

// RouterOS protocol length encoding - intentional truncation is part of the wire format
#[allow(clippy::cast_possible_truncation)]
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        vec![len as u8]
    } else if len < 0x4000 {
        vec![((len >> 8) as u8) | 0x80, (len & 0xFF) as u8]
    } else if len < 0x0020_0000 {
        vec![
            ((len >> 16) as u8) | 0xC0,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else if len < 0x1000_0000 {
        vec![
            ((len >> 24) as u8) | 0xE0,
            ((len >> 16) & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    } else {
        vec![
            0xF0,
            ((len >> 24) & 0xFF) as u8,
            ((len >> 16) & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]
    }
}

/// Length prefix followed by the UTF-8 bytes of the word
pub fn encode_word(word: &str) -> Vec<u8> {
    let bytes = word.as_bytes();
    let mut out = encode_length(bytes.len());
    out.extend_from_slice(bytes);
    out
}

/// Total prefix size announced by the first byte
fn prefix_size(first: u8) -> Result<usize> {
    match first {
        b if b & 0x80 == 0x00 => Ok(1),
        b if b & 0xC0 == 0x80 => Ok(2),
        b if b & 0xE0 == 0xC0 => Ok(3),
        b if b & 0xF0 == 0xE0 => Ok(4),
        0xF0 => Ok(5),
        b => Err(Error::ProtocolDecode(format!(
            "reserved length control byte {b:#04X}"
        ))),
    }
}

fn assemble(prefix: &[u8]) -> usize {
    let first = prefix[0];
    let head = match prefix.len() {
        1 => usize::from(first),
        2 => usize::from(first & 0x3F),
        3 => usize::from(first & 0x1F),
        4 => usize::from(first & 0x0F),
        _ => 0,
    };
    prefix[1..]
        .iter()
        .fold(head, |acc, b| (acc << 8) | usize::from(*b))
}

/// Decodes a length prefix, returning `(length, prefix bytes consumed)`
pub fn decode_length(bytes: &[u8]) -> Result<(usize, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| Error::ProtocolDecode("empty length prefix".to_string()))?;
    let size = prefix_size(first)?;
    if bytes.len() < size {
        return Err(Error::ProtocolDecode(format!(
            "truncated length prefix: need {size} bytes, have {}",
            bytes.len()
        )));
    }
    Ok((assemble(&bytes[..size]), size))
}

/// Decodes one complete word from the front of `bytes`,
/// returning the word and the total bytes consumed
pub fn decode_word(bytes: &[u8]) -> Result<(String, usize)> {
    let (len, size) = decode_length(bytes)?;
    let end = size + len;
    if bytes.len() < end {
        return Err(Error::ProtocolDecode(format!(
            "truncated word: need {len} bytes, have {}",
            bytes.len() - size
        )));
    }
    Ok((String::from_utf8_lossy(&bytes[size..end]).into_owned(), end))
}

fn eof_as_decode(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::ProtocolDecode("stream ended inside a word".to_string())
    } else {
        e.into()
    }
}

pub(crate) async fn read_length<R>(stream: &mut R) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let first = stream.read_u8().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Connection("connection closed by device".to_string())
        } else {
            e.into()
        }
    })?;
    let size = prefix_size(first)?;
    let mut prefix = [0u8; 5];
    prefix[0] = first;
    stream
        .read_exact(&mut prefix[1..size])
        .await
        .map_err(eof_as_decode)?;
    Ok(assemble(&prefix[..size]))
}

pub(crate) async fn read_word<R>(stream: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let len = read_length(stream).await?;
    if len == 0 {
        return Ok(String::new());
    }
    if len > MAX_WORD_LEN {
        return Err(Error::ProtocolDecode(format!(
            "word length {len} exceeds limit of {MAX_WORD_LEN} bytes"
        )));
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.map_err(eof_as_decode)?;
    Ok(String::from_utf8_lossy(&buf).into())
}
