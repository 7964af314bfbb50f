//! Line framing shared by the line-delimited dialects.

use wcore::ChatEvent;

/// Chunks an undecodable trailing fragment may wait for its continuation.
pub const MAX_RETRIES: u8 = 5;

/// Holds the unterminated tail of the previous chunk.
#[derive(Debug, Default)]
pub struct Lines {
    fragment: String,
    retries: u8,
}

impl Lines {
    /// Prepend the held fragment to `text` and split off complete lines.
    ///
    /// Returns the newline-terminated lines and the unterminated tail.
    pub fn split(&mut self, text: &str) -> (Vec<String>, Option<String>) {
        let mut buf = std::mem::take(&mut self.fragment);
        buf.push_str(text);
        let (complete, tail) = match buf.rfind('\n') {
            Some(pos) => (&buf[..pos], &buf[pos + 1..]),
            None => ("", buf.as_str()),
        };

        // A newline completes whatever fragment was held.
        let lines = if buf.contains('\n') {
            self.retries = 0;
            complete.split('\n').map(str::to_owned).collect()
        } else {
            Vec::new()
        };
        let tail = (!tail.is_empty()).then(|| tail.to_owned());
        (lines, tail)
    }

    /// Keep `tail` for the next chunk, or drop it once the retry bound is hit.
    pub fn hold(&mut self, tail: String) {
        if self.retries >= MAX_RETRIES {
            tracing::warn!("dropping fragment after {MAX_RETRIES} retries: {tail}");
            self.retries = 0;
            return;
        }
        self.fragment = tail;
        self.retries += 1;
    }

    /// The tail decoded; reset the retry counter.
    pub fn settle(&mut self) {
        self.retries = 0;
    }

    /// Take whatever fragment is still held.
    pub fn take(&mut self) -> Option<String> {
        self.retries = 0;
        let fragment = std::mem::take(&mut self.fragment);
        (!fragment.trim().is_empty()).then_some(fragment)
    }
}

/// A dialect that decodes one physical line at a time.
pub trait LineDecode {
    /// The decoder's line buffer.
    fn buffer(&mut self) -> &mut Lines;

    /// Decode one line. `terminated` is false for the trailing fragment of a
    /// chunk. Returns false when the line is not (yet) decodable.
    fn line(&mut self, line: &str, terminated: bool, out: &mut Vec<ChatEvent>) -> bool;
}

/// Feed `text` through a line dialect.
pub fn decode<D: LineDecode>(decoder: &mut D, text: &str, out: &mut Vec<ChatEvent>) {
    let (lines, tail) = decoder.buffer().split(text);
    for line in lines {
        if !decoder.line(&line, true, out) {
            tracing::warn!("dropping undecodable line: {line}");
        }
    }

    if let Some(tail) = tail {
        if decoder.line(&tail, false, out) {
            decoder.buffer().settle();
        } else {
            decoder.buffer().hold(tail);
        }
    }
}

/// Decode a fragment left over at end of stream.
pub fn flush<D: LineDecode>(decoder: &mut D, out: &mut Vec<ChatEvent>) {
    if let Some(fragment) = decoder.buffer().take()
        && !decoder.line(&fragment, true, out)
    {
        tracing::warn!("dropping trailing fragment: {fragment}");
    }
}
