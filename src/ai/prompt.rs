//! Operation kinds and prompt shaping
//!
//! Each operation maps deterministically to a prompt wrapper. The mapping is
//! total: unrecognized operations pass the prompt through unchanged, so a new
//! client-side tool can never break generation.

use serde::{Deserialize, Serialize};

/// What the editor asked the gateway to do with the prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Generate,
    Grammar,
    Tone,
    Summarize,
    /// Any operation string this build does not recognize
    #[serde(untagged)]
    Other(String),
}

impl Operation {
    /// Parse the wire value. Never fails; unknown values become Other.
    pub fn parse(value: &str) -> Self {
        match value {
            "generate" => Operation::Generate,
            "grammar" => Operation::Grammar,
            "tone" => Operation::Tone,
            "summarize" => Operation::Summarize,
            other => Operation::Other(other.to_string()),
        }
    }

    /// Wire name, echoed back in responses
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Generate => "generate",
            Operation::Grammar => "grammar",
            Operation::Tone => "tone",
            Operation::Summarize => "summarize",
            Operation::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for Operation {
    fn default() -> Self {
        Operation::Generate
    }
}

/// Wrap the prompt for the requested operation.
///
/// Pure function, total over Operation; Generate and unknown kinds are the
/// identity wrapping.
pub fn shape_prompt(operation: &Operation, prompt: &str) -> String {
    match operation {
        Operation::Grammar => format!(
            "Fix grammar/spelling. Return only corrected text:\n\n{}",
            prompt
        ),
        Operation::Tone => format!("Improve tone and clarity. Return revised text:\n\n{}", prompt),
        Operation::Summarize => format!("Summarize clearly and concisely:\n\n{}", prompt),
        Operation::Generate | Operation::Other(_) => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_known_operations() {
        assert_eq!(Operation::parse("generate"), Operation::Generate);
        assert_eq!(Operation::parse("grammar"), Operation::Grammar);
        assert_eq!(Operation::parse("tone"), Operation::Tone);
        assert_eq!(Operation::parse("summarize"), Operation::Summarize);
    }

    #[test]
    fn test_parse_unknown_operation() {
        let op = Operation::parse("translate");
        assert_eq!(op, Operation::Other("translate".to_string()));
        assert_eq!(op.as_str(), "translate");
    }

    #[test]
    fn test_grammar_wraps_prompt() {
        let shaped = shape_prompt(&Operation::Grammar, "teh cat sat");
        assert!(shaped.starts_with("Fix grammar/spelling."));
        assert!(shaped.ends_with("teh cat sat"));
    }

    #[test]
    fn test_generate_is_identity() {
        let shaped = shape_prompt(&Operation::Generate, "write a poem");
        assert_eq!(shaped, "write a poem");
    }

    #[test]
    fn test_unknown_operation_is_identity() {
        let shaped = shape_prompt(&Operation::Other("translate".into()), "bonjour");
        assert_eq!(shaped, "bonjour");
    }

    proptest! {
        /// Shaping is total: every operation string and prompt produce output
        /// that still contains the original prompt.
        #[test]
        fn prop_shaping_is_total(op in "\\PC{0,20}", prompt in "\\PC{0,200}") {
            let operation = Operation::parse(&op);
            let shaped = shape_prompt(&operation, &prompt);
            prop_assert!(shaped.contains(&prompt));
        }

        /// Applying generate twice yields the same wrapped prompt both times.
        #[test]
        fn prop_generate_is_idempotent(prompt in "\\PC{0,200}") {
            let first = shape_prompt(&Operation::Generate, &prompt);
            let second = shape_prompt(&Operation::Generate, &first);
            prop_assert_eq!(first, second);
        }
    }
}
