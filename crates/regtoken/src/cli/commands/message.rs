//! `regtoken message <CODE>`.

use regtoken_asset::RestrictedAsset;

/// Prints the fixed message for a restriction code.
#[derive(Debug, Clone, Copy)]
pub struct MessageCommand {
    /// Code to describe.
    pub code: u8,
}

impl MessageCommand {
    /// Create a new `MessageCommand`.
    #[must_use]
    pub const fn new(code: u8) -> Self {
        Self { code }
    }

    /// The message; unknown codes get the generic fallback.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        RestrictedAsset::message_for_transfer_restriction(self.code)
    }

    /// Print the message.
    pub fn run(&self) {
        println!("{}", self.message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_codes() {
        assert_eq!(MessageCommand::new(0).message(), "Success");
        assert_eq!(
            MessageCommand::new(6).message(),
            "Transfer amount is below the minimal transfer denomination"
        );
        assert_eq!(MessageCommand::new(7).message(), "Unknown restriction code");
        assert_eq!(MessageCommand::new(255).message(), "Unknown restriction code");
    }
}
