//! Command parser - Turns message text into a `Command`. No I/O.

use crate::domain::entities::Command;

const GATE: &str = "/gate";
const REPAIR: &str = "/repair";

/// Submission validated when `/gate` comes without a file
pub const DEFAULT_SUBMISSION: &str = "submissions/broken.py";

/// Parses message text into the closed set of commands
#[derive(Debug, Clone)]
pub struct CommandParser {
    default_submission: String,
}

impl CommandParser {
    pub fn new(default_submission: impl Into<String>) -> Self {
        Self {
            default_submission: default_submission.into(),
        }
    }

    /// Rewrite `/gate/<path>` to `/gate <path>` and trim.
    pub fn normalize(text: &str) -> String {
        let rewritten = match text.strip_prefix("/gate/") {
            Some(rest) => format!("{} {}", GATE, rest),
            None => text.to_string(),
        };
        rewritten.trim().to_string()
    }

    pub fn parse(&self, text: &str) -> Command {
        let normalized = Self::normalize(text);

        if let Some(rest) = normalized.strip_prefix(GATE) {
            let rest = rest.strip_prefix('/').unwrap_or(rest).trim();
            let file = if rest.is_empty() {
                self.default_submission.clone()
            } else {
                rest.to_string()
            };
            return Command::Gate { file };
        }

        // Exact match on the raw text: no arguments, no surrounding whitespace.
        if text == REPAIR {
            return Command::Repair;
        }

        Command::Unrecognized
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(DEFAULT_SUBMISSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(file: &str) -> Command {
        Command::Gate {
            file: file.to_string(),
        }
    }

    #[test]
    fn test_slash_and_space_forms_are_equivalent() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("/gate/submissions/x.py"), gate("submissions/x.py"));
        assert_eq!(parser.parse("/gate submissions/x.py"), gate("submissions/x.py"));
    }

    #[test]
    fn test_empty_argument_uses_default_submission() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("/gate"), gate("submissions/broken.py"));
        assert_eq!(parser.parse("/gate   "), gate("submissions/broken.py"));
        assert_eq!(parser.parse("/gate/"), gate("submissions/broken.py"));

        let custom = CommandParser::new("submissions/sample.py");
        assert_eq!(custom.parse("/gate"), gate("submissions/sample.py"));
    }

    #[test]
    fn test_gate_tolerates_surrounding_whitespace() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("  /gate a.py \n"), gate("a.py"));
    }

    #[test]
    fn test_gate_prefix_match_is_loose() {
        // Anything starting with /gate is a gate command.
        let parser = CommandParser::default();
        assert_eq!(parser.parse("/gatekeeper"), gate("keeper"));
    }

    #[test]
    fn test_repair_requires_exact_text() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("/repair"), Command::Repair);
        assert_eq!(parser.parse("/repair now"), Command::Unrecognized);
        assert_eq!(parser.parse(" /repair"), Command::Unrecognized);
        assert_eq!(parser.parse("/REPAIR"), Command::Unrecognized);
    }

    #[test]
    fn test_branches_are_exclusive() {
        let parser = CommandParser::default();
        assert!(matches!(parser.parse("/gate /repair"), Command::Gate { .. }));
        assert_eq!(parser.parse("/repair"), Command::Repair);
    }

    #[test]
    fn test_other_text_is_unrecognized() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("hello"), Command::Unrecognized);
        assert_eq!(parser.parse(""), Command::Unrecognized);
        assert_eq!(parser.parse("please /gate x"), Command::Unrecognized);
    }
}
