use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("invalid duration syntax: {0:?}")]
    BadSyntax(String),

    #[error("duration must not be negative")]
    Negative,

    #[error("duration has no unit suffix, interpreted as seconds")]
    WithoutSuffix,
}

impl DurationError {
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::WithoutSuffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("unknown field")]
    UnknownField,

    #[error("{value:?} is not a valid {type_name}")]
    NotValueOfType {
        type_name: &'static str,
        value: String,
    },

    #[error(transparent)]
    Duration(#[from] DurationError),
}

impl ValueError {
    pub fn not_value_of_type(type_name: &'static str, value: impl Into<String>) -> Self {
        Self::NotValueOfType {
            type_name,
            value: value.into(),
        }
    }

    pub fn is_warning(&self) -> bool {
        match self {
            Self::Duration(e) => e.is_warning(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field {field:?}: {err}")]
pub struct FieldError {
    pub field: String,
    #[source]
    pub err: ValueError,
}

impl FieldError {
    pub fn new(field: impl Into<String>, err: ValueError) -> Self {
        Self {
            field: field.into(),
            err,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.err.is_warning()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("IO separator missing")]
    IoSeparatorMissing,

    #[error("key cannot be empty")]
    KeyMissing,

    #[error(transparent)]
    Field(#[from] FieldError),
}

impl ScanError {
    pub fn is_warning(&self) -> bool {
        match self {
            Self::Field(e) => e.is_warning(),
            _ => false,
        }
    }
}

/// A [`ScanError`] attributed to a span of lines in the inputs file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRangeError {
    /// 1-based number of the first line.
    pub begin: usize,
    /// Offending lines, without their terminators.
    pub lines: Vec<String>,
    pub err: ScanError,
}

impl LineRangeError {
    pub fn end(&self) -> usize {
        self.begin + self.lines.len().saturating_sub(1)
    }

    pub fn is_warning(&self) -> bool {
        self.err.is_warning()
    }

    /// Renders the lines prefixed with a right-aligned line number, e.g. `"     3| tl = 2"`.
    pub fn code_snippet(&self) -> String {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:6}| {}\n", self.begin + i, line))
            .collect()
    }
}

impl fmt::Display for LineRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.len() <= 1 {
            write!(f, "line {}: {}", self.begin, self.err)
        } else {
            write!(f, "lines {}-{}: {}", self.begin, self.end(), self.err)
        }
    }
}

impl std::error::Error for LineRangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputsError {
    #[error("config: {0}")]
    Config(LineRangeError),

    #[error("test {test_num}: {err}")]
    Test { test_num: usize, err: LineRangeError },
}

impl InputsError {
    pub fn line_range(&self) -> &LineRangeError {
        match self {
            Self::Config(err) | Self::Test { err, .. } => err,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.line_range().is_warning()
    }

    /// The message without line information.
    pub fn summary(&self) -> String {
        match self {
            Self::Config(err) => err.err.to_string(),
            Self::Test { test_num, err } => format!("test {}: {}", test_num, err.err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn range_err(begin: usize, lines: &[&str], err: ScanError) -> LineRangeError {
        LineRangeError {
            begin,
            lines: lines.iter().map(|s| s.to_string()).collect(),
            err,
        }
    }

    #[test]
    fn test_warning_propagates_through_layers() {
        let field = FieldError::new("tl", DurationError::WithoutSuffix.into());
        let e = InputsError::Config(range_err(2, &["tl = 2"], field.into()));
        assert!(e.is_warning());

        let field = FieldError::new("tl", DurationError::Negative.into());
        let e = InputsError::Config(range_err(2, &["tl = -2s"], field.into()));
        assert!(!e.is_warning());

        let e = InputsError::Test {
            test_num: 1,
            err: range_err(3, &["1"], ScanError::IoSeparatorMissing),
        };
        assert!(!e.is_warning());
    }

    #[test]
    fn test_code_snippet() {
        let e = range_err(9, &["1 2", "3"], ScanError::IoSeparatorMissing);
        assert_eq!(e.code_snippet(), "     9| 1 2\n    10| 3\n");
        assert_eq!(e.end(), 10);
        assert_eq!(e.to_string(), "lines 9-10: IO separator missing");
    }

    #[test]
    fn test_summary() {
        let e = InputsError::Test {
            test_num: 2,
            err: range_err(5, &["x"], ScanError::IoSeparatorMissing),
        };
        assert_eq!(e.summary(), "test 2: IO separator missing");
        assert_eq!(e.line_range().begin, 5);
    }
}
