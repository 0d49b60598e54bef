use std::fmt;

use crate::view::ByteView;

/// UTF-8 text owned by the guest runtime.
///
/// The backing allocation always carries a trailing NUL byte that is not
/// part of the text, so NUL-terminated views of a string need no copy.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GuestStr {
    text_with_nul: String,
}

impl GuestStr {
    pub fn new(text: impl Into<String>) -> Self {
        let mut text_with_nul = text.into();
        text_with_nul.push('\0');
        Self { text_with_nul }
    }

    pub fn as_str(&self) -> &str {
        &self.text_with_nul[..self.len()]
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.as_str().as_bytes()
    }

    /// The text bytes followed by the terminator.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.text_with_nul.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.text_with_nul.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for GuestStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl From<&str> for GuestStr {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for GuestStr {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// A byte sequence stored as separate segments (a rope).
///
/// Not contiguous, so every view of it is a copy. Neither the CLI literal
/// syntax nor the wasm exports produce one; embedders whose guest runtime
/// keeps segmented buffers build it with [`ChunkedBytes::push`] or by
/// collecting chunks, and pass it as [`GuestValue::Chunks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedBytes {
    chunks: Vec<Vec<u8>>,
}

impl ChunkedBytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: impl Into<Vec<u8>>) {
        self.chunks.push(chunk.into());
    }

    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

impl<C: Into<Vec<u8>>> FromIterator<C> for ChunkedBytes {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A value owned by the guest runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum GuestValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(GuestStr),
    Bytes(Vec<u8>),
    ByteArray(Vec<u8>),
    Chunks(ChunkedBytes),
}

impl GuestValue {
    pub fn str(text: impl Into<String>) -> Self {
        GuestValue::Str(GuestStr::new(text))
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        GuestValue::Bytes(data.into())
    }

    pub fn bytearray(data: impl Into<Vec<u8>>) -> Self {
        GuestValue::ByteArray(data.into())
    }

    /// Guest-level type name, as shown in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            GuestValue::None => "NoneType",
            GuestValue::Bool(_) => "bool",
            GuestValue::Int(_) => "int",
            GuestValue::Float(_) => "float",
            GuestValue::Str(_) => "str",
            GuestValue::Bytes(_) => "bytes",
            GuestValue::ByteArray(_) => "bytearray",
            GuestValue::Chunks(_) => "chunks",
        }
    }

    /// Capability check: the value's buffer view, if it has one.
    pub fn as_byte_view(&self) -> Option<&dyn ByteView> {
        match self {
            GuestValue::Str(s) => Some(s),
            GuestValue::Bytes(b) | GuestValue::ByteArray(b) => Some(b),
            GuestValue::Chunks(c) => Some(c),
            GuestValue::None | GuestValue::Bool(_) | GuestValue::Int(_) | GuestValue::Float(_) => {
                None
            }
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            GuestValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for GuestValue {
    fn from(text: &str) -> Self {
        GuestValue::str(text)
    }
}

impl From<String> for GuestValue {
    fn from(text: String) -> Self {
        GuestValue::str(text)
    }
}

impl From<i64> for GuestValue {
    fn from(value: i64) -> Self {
        GuestValue::Int(value)
    }
}

impl From<f64> for GuestValue {
    fn from(value: f64) -> Self {
        GuestValue::Float(value)
    }
}

impl From<bool> for GuestValue {
    fn from(value: bool) -> Self {
        GuestValue::Bool(value)
    }
}

/// Guest `repr()` formatting.
impl fmt::Display for GuestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestValue::None => f.write_str("None"),
            GuestValue::Bool(true) => f.write_str("True"),
            GuestValue::Bool(false) => f.write_str("False"),
            GuestValue::Int(i) => write!(f, "{i}"),
            GuestValue::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{x:.1}"),
            GuestValue::Float(x) => write!(f, "{x}"),
            GuestValue::Str(s) => write!(f, "'{}'", s.as_str().escape_debug()),
            GuestValue::Bytes(b) => write!(f, "b'{}'", b.escape_ascii()),
            GuestValue::ByteArray(b) => write!(f, "bytearray(b'{}')", b.escape_ascii()),
            GuestValue::Chunks(c) => write!(f, "<chunks len={}>", c.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_str_keeps_terminator_out_of_text() {
        let s = GuestStr::new("hello");
        assert_eq!(s.as_str(), "hello");
        assert_eq!(s.len(), 5);
        assert_eq!(s.as_bytes_with_nul(), b"hello\0");
    }

    #[test]
    fn test_empty_guest_str() {
        let s = GuestStr::new("");
        assert!(s.is_empty());
        assert_eq!(s.as_bytes(), b"");
        assert_eq!(s.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn test_chunked_bytes_concat() {
        let chunks: ChunkedBytes = ["he", "", "llo"].into_iter().collect();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks.chunks().len(), 3);
        assert_eq!(chunks.to_vec(), b"hello");
    }

    #[test]
    fn test_byte_view_capability() {
        assert!(GuestValue::str("x").as_byte_view().is_some());
        assert!(GuestValue::bytes(*b"x").as_byte_view().is_some());
        assert!(GuestValue::bytearray(*b"x").as_byte_view().is_some());
        assert!(GuestValue::Chunks(ChunkedBytes::new()).as_byte_view().is_some());
        assert!(GuestValue::Int(1).as_byte_view().is_none());
        assert!(GuestValue::Float(1.5).as_byte_view().is_none());
        assert!(GuestValue::Bool(true).as_byte_view().is_none());
        assert!(GuestValue::None.as_byte_view().is_none());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(GuestValue::from(3).type_name(), "int");
        assert_eq!(GuestValue::from("a").type_name(), "str");
        assert_eq!(GuestValue::None.type_name(), "NoneType");
    }

    #[test]
    fn test_display_repr() {
        assert_eq!(GuestValue::Int(0).to_string(), "0");
        assert_eq!(GuestValue::str("hi").to_string(), "'hi'");
        assert_eq!(GuestValue::bytes(*b"a\n").to_string(), "b'a\\n'");
        assert_eq!(GuestValue::Float(2.0).to_string(), "2.0");
        assert_eq!(GuestValue::Bool(false).to_string(), "False");
    }
}
