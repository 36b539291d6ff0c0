//! Process exit codes.

/// Command succeeded; for `check`, the transfer is allowed.
pub const EXIT_SUCCESS: i32 = 0;

/// The transfer is restricted, or the audit chain failed to verify.
pub const EXIT_RESTRICTED: i32 = 1;

/// General error (configuration, I/O, invalid input, etc.).
pub const EXIT_ERROR: i32 = 2;
