//! Exit code constants for the pageclone CLI.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments, configuration or slug |
//! | 3 | `NOT_FOUND` | No progress record for the requested slug |
//! | 4 | `PRECONDITION` | Phase ordering or archive precondition violated |
//! | 5 | `AWAITING_USER_INPUT` | Clone is blocked on operator intervention |
//! | 130 | `CANCELLED` | Operation was cancelled |

/// Exit codes matching the documented exit code table.
///
/// # Example
///
/// ```rust
/// use pageclone_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(5), ExitCode::AWAITING_USER_INPUT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, configuration or page slug
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Not found - no progress record exists for the slug
    pub const NOT_FOUND: ExitCode = ExitCode(3);

    /// Precondition - phase ordering, duplicate record or archive precondition
    pub const PRECONDITION: ExitCode = ExitCode(4);

    /// Awaiting user input - an operator must resolve the clone before it continues
    pub const AWAITING_USER_INPUT: ExitCode = ExitCode(5);

    /// Cancelled - interrupted by the user or a shutdown signal
    pub const CANCELLED: ExitCode = ExitCode(130);

    /// Get the numeric exit code value.
    ///
    /// Use this with `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// Stable lowercase name used in JSON output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.0 {
            0 => "success",
            2 => "cli_args",
            3 => "not_found",
            4 => "precondition",
            5 => "awaiting_user_input",
            130 => "cancelled",
            _ => "internal",
        }
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}
