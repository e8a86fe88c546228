use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("Mismatched closing tag at {pos}: expected </{expected}>, found </{found}>")]
    MismatchedClosingTag {
        pos: usize,
        expected: String,
        found: String,
    },
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn mismatched_closing_tag(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::MismatchedClosingTag {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Byte offset the error points at
    pub fn pos(&self) -> usize {
        match self {
            Self::UnexpectedToken { pos, .. }
            | Self::UnexpectedEof { pos }
            | Self::InvalidSyntax { pos, .. }
            | Self::MismatchedClosingTag { pos, .. } => *pos,
        }
    }

    /// Render a human readable report pointing into `source`.
    #[cfg(feature = "pretty-errors")]
    pub fn report(&self, path: &str, source: &str) -> String {
        use ariadne::{Label, Report, ReportKind, Source};

        let pos = self.pos().min(source.len());
        let end = source
            .get(pos..)
            .and_then(|rest| rest.chars().next())
            .map(|c| pos + c.len_utf8())
            .unwrap_or(pos);

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, path, pos)
            .with_message(self.to_string())
            .with_label(Label::new((path, pos..end)).with_message("here"))
            .finish()
            .write((path, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => format!("{}: {}", path, self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_position() {
        let err = ParseError::unexpected_eof(42);
        assert_eq!(err.pos(), 42);

        let err = ParseError::mismatched_closing_tag(7, "div", "span");
        assert_eq!(err.pos(), 7);
        assert!(err.to_string().contains("</div>"));
    }
}
