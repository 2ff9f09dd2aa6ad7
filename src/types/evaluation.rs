use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Feedback a user gives on a bot message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Thumbs up.
    Positive,

    /// Thumbs down.
    Negative,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Positive => write!(f, "positive"),
            Verdict::Negative => write!(f, "negative"),
        }
    }
}

/// Error returned when parsing an invalid verdict string.
#[derive(Debug)]
pub struct VerdictParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for VerdictParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown verdict: {}", self.invalid_value)
    }
}

impl std::error::Error for VerdictParseError {}

impl FromStr for Verdict {
    type Err = VerdictParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" | "good" | "up" => Ok(Verdict::Positive),
            "negative" | "bad" | "down" => Ok(Verdict::Negative),
            _ => Err(VerdictParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// The evaluation state of a message.
///
/// Moves from `None` to a verdict at most once.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Evaluation {
    /// Not evaluated yet.
    #[default]
    None,

    /// The user marked the message as helpful.
    Positive,

    /// The user marked the message as unhelpful.
    Negative,
}

impl Evaluation {
    /// Returns true if the message has not been evaluated.
    pub fn is_none(self) -> bool {
        matches!(self, Evaluation::None)
    }
}

impl From<Verdict> for Evaluation {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Positive => Evaluation::Positive,
            Verdict::Negative => Evaluation::Negative,
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::None => write!(f, "none"),
            Evaluation::Positive => write!(f, "positive"),
            Evaluation::Negative => write!(f, "negative"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_wire_format() {
        assert_eq!(serde_json::to_value(Verdict::Positive).unwrap(), json!("positive"));
        assert_eq!(serde_json::to_value(Verdict::Negative).unwrap(), json!("negative"));
    }

    #[test]
    fn verdict_aliases() {
        assert_eq!("good".parse::<Verdict>().unwrap(), Verdict::Positive);
        assert_eq!("DOWN".parse::<Verdict>().unwrap(), Verdict::Negative);
        assert!("meh".parse::<Verdict>().is_err());
    }

    #[test]
    fn evaluation_from_verdict() {
        assert!(Evaluation::default().is_none());
        assert_eq!(Evaluation::from(Verdict::Negative), Evaluation::Negative);
    }
}
