//! Log sanitization for subject identifiers and secrets.
//!
//! Subject identifiers are free-form strings chosen by whoever runs the
//! screening, so they may be names, record numbers, or email addresses. Code in
//! this crate logs [`subject_ref`](crate::domain::subject_ref) instead of the
//! identifier; this writer is the backstop for anything that slips through:
//! - `child_id=` / `subject_id=` fields
//! - emails, phone numbers, SSN-like and MRN-like identifiers
//! - signing seeds and other key material (contextual base64, long hex, PEM)
//!
//! Input is capped at `EARLYSIGN_SANITIZE_MAX_BYTES` (default 16 KiB) per call.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Patterns {
    set: RegexSet,
    rules: Vec<Rule>,
    pem: Regex,
}

const RULES: [(&str, &str); 8] = [
    // Structured subject fields, quoted or bare.
    (
        r#"\b(child_id|subject_id)\s*[=:]\s*(?:"[^"]*"|[^\s,}]+)"#,
        "$1=[REDACTED-SUBJECT]",
    ),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
    (r"\bMRN[:\s]?\d{6,10}\b", "[REDACTED-MRN]"),
    (
        r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
        "[REDACTED-PHONE]",
    ),
    (
        r"(?i)\b(?:seed|secret|private[_-]?key|signing[_-]?key|password|token)\b\s*[:=]\s*[A-Za-z0-9+/]{32,}={0,2}",
        "[REDACTED-SECRET]",
    ),
    (
        r"(?i)\b(?:seed|secret|private[_-]?key|signing[_-]?key|password|token)\b\s*[:=]\s*[0-9a-f]{16,}\b",
        "[REDACTED-SECRET]",
    ),
    (r"\b[0-9a-fA-F]{32,}\b", "[REDACTED-KEY]"),
];

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let set = RegexSet::new(RULES.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let rules = RULES
            .iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();
        let pem = Regex::new(
            r"-----BEGIN [A-Z0-9 ]{0,40}PRIVATE KEY-----[\s\S]{0,8192}-----END [A-Z0-9 ]{0,40}PRIVATE KEY-----",
        )
        .expect("Valid regex");
        Patterns { set, rules, pem }
    })
}

fn max_sanitize_bytes() -> usize {
    std::env::var("EARLYSIGN_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Replace identifier and secret patterns in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).iter() {
        let rule = &patterns.rules[idx];
        result = rule.regex.replace_all(&result, rule.replacement).into_owned();
    }
    if result.contains("-----BEGIN ") {
        result = patterns
            .pem
            .replace_all(&result, "[REDACTED-PEM-PRIVATE-KEY]")
            .into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string contains something `sanitize` would redact.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let patterns = patterns();
    let (prefix, _) = truncate_to_char_boundary(input, max_sanitize_bytes());
    patterns.set.is_match(prefix) || patterns.pem.is_match(prefix)
}

/// A `tracing_subscriber` writer factory that sanitizes each formatted line
/// before it reaches the underlying sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A formatter that never emits a newline must not grow the buffer forever.
        if self.buffer.len() > max_sanitize_bytes().saturating_mul(2) {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            buffer: Vec::new(),
        }
    }
}
