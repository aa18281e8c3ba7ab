//! Numeric value tokens
//!
//! Both device families accept either an absolute value or a signed
//! adjustment of the current one: a leading `+` or `-` means "relative".

use crate::ProtocolError;

/// A parsed numeric argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueToken {
    /// Replace the current value
    Absolute(i32),
    /// Add to the current value
    Delta(i32),
}

fn is_relative(text: &str) -> bool {
    text.starts_with('+') || text.starts_with('-')
}

impl ValueToken {
    /// Strict parse, as used for DECtalk command text
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let number = text
            .trim()
            .parse::<i32>()
            .map_err(|_| ProtocolError::InvalidNumber(text.to_string()))?;
        if is_relative(text.trim()) {
            Ok(ValueToken::Delta(number))
        } else {
            Ok(ValueToken::Absolute(number))
        }
    }

    /// Lenient parse, as used for LiteTalk numeric arguments
    ///
    /// An unparseable absolute value falls back to `default`; an
    /// unparseable adjustment ("+", "-+") adds nothing.
    pub fn parse_or(text: &str, default: i32) -> Self {
        let parsed = text.trim().parse::<i32>().ok();
        if is_relative(text.trim()) {
            ValueToken::Delta(parsed.unwrap_or(0))
        } else {
            ValueToken::Absolute(parsed.unwrap_or(default))
        }
    }

    /// Resolve against the current value
    ///
    /// `what` names the parameter for the error when there is nothing to
    /// adjust.
    pub fn resolve(self, current: Option<i32>, what: &'static str) -> Result<i32, ProtocolError> {
        match self {
            ValueToken::Absolute(v) => Ok(v),
            ValueToken::Delta(d) => current
                .map(|c| c.saturating_add(d))
                .ok_or(ProtocolError::NoCurrentValue(what)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_and_delta() {
        assert_eq!(ValueToken::parse("300"), Ok(ValueToken::Absolute(300)));
        assert_eq!(ValueToken::parse("+50"), Ok(ValueToken::Delta(50)));
        assert_eq!(ValueToken::parse("-20"), Ok(ValueToken::Delta(-20)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ValueToken::parse("fast").is_err());
        assert!(ValueToken::parse("").is_err());
        assert!(ValueToken::parse("+").is_err());
    }

    #[test]
    fn test_parse_or_defaults() {
        assert_eq!(ValueToken::parse_or("", 8), ValueToken::Absolute(8));
        assert_eq!(ValueToken::parse_or("7", 8), ValueToken::Absolute(7));
        assert_eq!(ValueToken::parse_or("+", 8), ValueToken::Delta(0));
        assert_eq!(ValueToken::parse_or("+2", 8), ValueToken::Delta(2));
        assert_eq!(ValueToken::parse_or("12+3", 8), ValueToken::Absolute(8));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(ValueToken::Absolute(5).resolve(Some(9), "rate"), Ok(5));
        assert_eq!(ValueToken::Delta(-3).resolve(Some(9), "rate"), Ok(6));
        assert_eq!(
            ValueToken::Delta(1).resolve(None, "g5"),
            Err(ProtocolError::NoCurrentValue("g5"))
        );
    }
}
