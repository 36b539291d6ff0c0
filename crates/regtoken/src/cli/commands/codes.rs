//! `regtoken codes`.

use regtoken_core::RestrictionCode;

/// Lists every restriction code with its name and message.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodesCommand;

impl CodesCommand {
    /// Create a new `CodesCommand`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// One line per code: `<code>  <NAME>  <message>`.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        RestrictionCode::ALL
            .iter()
            .map(|code| format!("{}  {:<28}  {}", code.code(), code.name(), code.message()))
            .collect()
    }

    /// Print the table.
    pub fn run(&self) {
        for line in self.lines() {
            println!("{line}");
        }
    }
}
