//! Comment stripping for JSON config files.
//!
//! Config files may carry `// line` and `/* block */` comments. Both are
//! removed only outside double-quoted strings. A line comment runs through its
//! terminating newline. An unterminated block comment runs to the end of the
//! input. A `/` that does not start a comment is kept as is.

#[derive(Clone, Copy, PartialEq)]
enum State {
    Code,
    Text,
    Line,
    Block,
}

/// Strip comments from `input`. Works on bytes: every marker is ASCII, so
/// multi-byte UTF-8 sequences pass through untouched.
pub fn strip_comments(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut state = State::Code;
    let mut i = 0;

    while i < input.len() {
        let byte = input[i];
        let next = input.get(i + 1).copied();

        match state {
            State::Code => match (byte, next) {
                (b'/', Some(b'/')) => {
                    state = State::Line;
                    i += 1;
                }
                (b'/', Some(b'*')) => {
                    state = State::Block;
                    i += 1;
                }
                (b'"', _) => {
                    state = State::Text;
                    out.push(byte);
                }
                _ => out.push(byte),
            },
            State::Text => {
                out.push(byte);
                match byte {
                    b'\\' => {
                        if let Some(escaped) = next {
                            out.push(escaped);
                            i += 1;
                        }
                    }
                    b'"' => state = State::Code,
                    _ => {}
                }
            }
            State::Line => {
                if byte == b'\n' {
                    state = State::Code;
                }
            }
            State::Block => {
                if byte == b'*' && next == Some(b'/') {
                    state = State::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    out
}
