//! Output protocol messages and sinks.
//!
//! Messages follow the Singer JSON-lines layout: one object per line with a
//! `type` tag of `SCHEMA`, `RECORD` or `STATE`.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TapResult;

/// One message on the output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    Schema {
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    Record {
        stream: String,
        record: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<DateTime<Utc>>,
    },
    State {
        value: Value,
    },
}

impl Message {
    /// Stream the message belongs to; `None` for state.
    #[must_use]
    pub fn stream(&self) -> Option<&str> {
        match self {
            Message::Schema { stream, .. } | Message::Record { stream, .. } => {
                Some(stream.as_str())
            }
            Message::State { .. } => None,
        }
    }
}

/// Destination of emitted messages.
pub trait MessageSink {
    /// Writes one message. Ordering of calls is the ordering on the wire.
    fn write(&mut self, message: &Message) -> TapResult<()>;

    fn flush(&mut self) -> TapResult<()> {
        Ok(())
    }
}

/// Writes each message as one JSON line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<std::io::Stdout> {
    /// Sink on process stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> MessageSink for JsonLinesSink<W> {
    fn write(&mut self, message: &Message) -> TapResult<()> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        // downstream loaders commit on STATE, so it must not sit in a buffer
        if matches!(message, Message::State { .. }) {
            self.writer.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> TapResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub messages: Vec<Message>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records emitted for `stream`, in order.
    #[must_use]
    pub fn records(&self, stream: &str) -> Vec<&Value> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Values of every STATE message, in order.
    #[must_use]
    pub fn states(&self) -> Vec<&Value> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Streams that received a SCHEMA message, in order.
    #[must_use]
    pub fn schema_streams(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Schema { stream, .. } => Some(stream.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl MessageSink for MemorySink {
    fn write(&mut self, message: &Message) -> TapResult<()> {
        self.messages.push(message.clone());
        Ok(())
    }
}
