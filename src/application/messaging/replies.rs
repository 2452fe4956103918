//! Reply texts sent back to chat

/// Sent before the validator starts
pub const GATE_ACK: &str = "🛡️ gatekeeper response";

pub const GATE_PREFIX: &str = "🛡️";
pub const REPAIR_PREFIX: &str = "🔧";
pub const FAILURE_PREFIX: &str = "❌";

pub const GATE_HINT: &str =
    "Install the gatekeeper package in the bot environment or provide a local gatekeeper.py";

pub const BUSY: &str = "⏳ A previous command is still running, try again when it finishes.";

pub fn gate_success(output: &str) -> String {
    format!("{} {}", GATE_PREFIX, output)
}

pub fn gate_failure(error: &str) -> String {
    format!("{} {}\n{}", FAILURE_PREFIX, error, GATE_HINT)
}

pub fn repair_success(output: &str) -> String {
    format!("{} {}", REPAIR_PREFIX, output)
}

pub fn repair_failure(error: &str) -> String {
    format!("{} {}", FAILURE_PREFIX, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_success_is_prefixed_verbatim() {
        assert_eq!(gate_success("OK"), "🛡️ OK");
    }

    #[test]
    fn test_gate_failure_carries_hint() {
        let reply = gate_failure("Command failed: python3 validate.py");
        assert!(reply.starts_with("❌ Command failed"));
        assert!(reply.ends_with(GATE_HINT));
    }

    #[test]
    fn test_repair_failure_has_no_hint() {
        assert_eq!(repair_failure("boom"), "❌ boom");
    }
}
