use std::fmt;

/// A recognized chat command. The set is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate a submission file with the gatekeeper
    Gate { file: String },
    /// Run the repair loop
    Repair,
    Unrecognized,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Gate { .. } => "gate",
            Command::Repair => "repair",
            Command::Unrecognized => "unrecognized",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Command::Unrecognized)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Gate { file } => write!(f, "/gate {}", file),
            Command::Repair => write!(f, "/repair"),
            Command::Unrecognized => write!(f, "(none)"),
        }
    }
}
