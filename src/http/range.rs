//! Single `bytes=` Range header resolution (RFC 7233 subset).

/// How much of a file to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable Range header: send everything with 200
    Full,
    /// Inclusive byte span: send with 206
    Partial { start: usize, end: usize },
    /// Range starts past the end of the file: 416
    Unsatisfiable,
}

impl ByteRange {
    /// Resolve a Range header against a file of `len` bytes.
    ///
    /// Malformed headers, other units, and multi-range requests fall back to
    /// `Full`, as servers may ignore Range.
    pub fn resolve(header: Option<&str>, len: usize) -> Self {
        let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
            return Self::Full;
        };
        if spec.contains(',') {
            return Self::Full;
        }
        let Some((first, last)) = spec.split_once('-') else {
            return Self::Full;
        };
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            // Suffix form: last N bytes
            return match last.parse::<usize>() {
                Ok(0) => Self::Unsatisfiable,
                Ok(_) if len == 0 => Self::Unsatisfiable,
                Ok(n) => Self::Partial {
                    start: len.saturating_sub(n),
                    end: len - 1,
                },
                Err(_) => Self::Full,
            };
        }

        let Ok(start) = first.parse::<usize>() else {
            return Self::Full;
        };
        if start >= len {
            return Self::Unsatisfiable;
        }
        if last.is_empty() {
            return Self::Partial { start, end: len - 1 };
        }
        match last.parse::<usize>() {
            Ok(end) if end >= start => Self::Partial {
                start,
                end: end.min(len - 1),
            },
            _ => Self::Full,
        }
    }
}
