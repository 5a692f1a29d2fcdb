//! Server-sent events decoding.
//!
//! Both streaming backends answer with `text/event-stream`. The decoder is
//! fed raw body bytes as they arrive and yields complete events; chunk
//! boundaries may fall anywhere, including inside a line.

use futures::stream::{self, BoxStream, Stream};
use futures::StreamExt;
use std::collections::VecDeque;

use super::{ProviderError, TextStream};

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental line-oriented decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed body bytes, returning every event completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush at end of body. A trailing event without a blank line still counts.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() && self.event.is_none() {
            return None;
        }
        let event = SseEvent {
            event: self.event.take(),
            data: self.data.join("\n"),
            id: self.id.take(),
        };
        self.data.clear();
        Some(event)
    }
}

/// How a backend reads one event.
#[derive(Debug, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    Skip,
    End,
}

struct TextStreamState<F> {
    body: BoxStream<'static, Result<Vec<u8>, ProviderError>>,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    interpret: F,
    done: bool,
}

/// Turn an SSE body into a text stream using a backend-specific interpreter.
pub fn text_stream<S, F>(body: S, interpret: F) -> TextStream
where
    S: Stream<Item = Result<Vec<u8>, ProviderError>> + Send + 'static,
    F: FnMut(SseEvent) -> Result<Chunk, ProviderError> + Send + 'static,
{
    let state = TextStreamState {
        body: body.boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        interpret,
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                match (st.interpret)(event) {
                    Ok(Chunk::Text(text)) => return Some((Ok(text), st)),
                    Ok(Chunk::Skip) => continue,
                    Ok(Chunk::End) => return None,
                    Err(e) => {
                        st.done = true;
                        st.pending.clear();
                        return Some((Err(e), st));
                    }
                }
            }

            if st.done {
                return None;
            }

            match st.body.next().await {
                Some(Ok(bytes)) => {
                    let events = st.decoder.feed(&bytes);
                    st.pending.extend(events);
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.done = true;
                    let last = st.decoder.finish();
                    st.pending.extend(last);
                }
            }
        }
    })
    .boxed()
}

/// Body bytes of a streaming response.
pub(crate) fn response_body(
    response: reqwest::Response,
) -> impl Stream<Item = Result<Vec<u8>, ProviderError>> + Send + 'static {
    response.bytes_stream().map(|chunk| {
        chunk
            .map(|bytes| bytes.to_vec())
            .map_err(|e| ProviderError::StreamError(e.to_string()))
    })
}
