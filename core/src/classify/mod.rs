//! Closed taxonomy of task failure kinds and the classifier mapping an
//! attempt's exit code and captured output onto it.
mod classifier;

pub use classifier::{classify, parse_marker, MAX_CLASSIFY_CHARS};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    Network,
    Parse,
    Validation,
    EmptyResult,
    Unknown,
}

impl ErrorType {
    pub const ALL: [ErrorType; 5] = [
        ErrorType::Network,
        ErrorType::Parse,
        ErrorType::Validation,
        ErrorType::EmptyResult,
        ErrorType::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Network => "NETWORK",
            ErrorType::Parse => "PARSE",
            ErrorType::Validation => "VALIDATION",
            ErrorType::EmptyResult => "EMPTY_RESULT",
            ErrorType::Unknown => "UNKNOWN",
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            ErrorType::Network => 10,
            ErrorType::Parse => 11,
            ErrorType::Validation => 12,
            ErrorType::EmptyResult => 13,
            ErrorType::Unknown => 19,
        }
    }

    /// Total mapping: codes outside the table are `Unknown`.
    pub fn from_exit_code(code: i32) -> Self {
        Self::known_exit_code(code).unwrap_or(ErrorType::Unknown)
    }

    /// `Some` only for the five codes in the table.
    pub fn known_exit_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.exit_code() == code)
    }

    /// Only transient connectivity failures are worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorType::Network)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownErrorType(pub String);

impl fmt::Display for UnknownErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown error type: {}", self.0)
    }
}

impl std::error::Error for UnknownErrorType {}

impl FromStr for ErrorType {
    type Err = UnknownErrorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| UnknownErrorType(name.to_string()))
    }
}

pub fn error_type_to_exit_code(t: ErrorType) -> i32 {
    t.exit_code()
}

pub fn exit_code_to_error_type(code: i32) -> ErrorType {
    ErrorType::from_exit_code(code)
}

pub fn is_retryable_error_type(t: ErrorType) -> bool {
    t.is_retryable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_table_is_a_bijection() {
        for t in ErrorType::ALL {
            assert_eq!(exit_code_to_error_type(error_type_to_exit_code(t)), t);
        }
        assert_eq!(exit_code_to_error_type(10), ErrorType::Network);
        assert_eq!(exit_code_to_error_type(11), ErrorType::Parse);
        assert_eq!(exit_code_to_error_type(12), ErrorType::Validation);
        assert_eq!(exit_code_to_error_type(13), ErrorType::EmptyResult);
    }

    #[test]
    fn unmapped_codes_are_unknown() {
        for code in [-1, 0, 1, 2, 9, 14, 18, 20, 127, 255] {
            assert_eq!(exit_code_to_error_type(code), ErrorType::Unknown);
        }
        assert_eq!(ErrorType::known_exit_code(1), None);
        assert_eq!(ErrorType::known_exit_code(19), Some(ErrorType::Unknown));
    }

    #[test]
    fn only_network_is_retryable() {
        let retryable: Vec<_> = ErrorType::ALL
            .into_iter()
            .filter(|t| is_retryable_error_type(*t))
            .collect();
        assert_eq!(retryable, vec![ErrorType::Network]);
    }

    #[test]
    fn parses_names_and_serializes_screaming_case() {
        assert_eq!("EMPTY_RESULT".parse::<ErrorType>(), Ok(ErrorType::EmptyResult));
        assert!("network".parse::<ErrorType>().is_err());
        assert_eq!(
            serde_json::to_string(&ErrorType::EmptyResult).unwrap(),
            "\"EMPTY_RESULT\""
        );
    }
}
