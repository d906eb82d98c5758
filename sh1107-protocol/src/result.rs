//! Command result register

/// Result of the most recent command
///
/// `Busy` is the reset value and is re-armed whenever a command is
/// accepted. It moves to `Success` or `Failure` once, when the command
/// completes, and holds there until the next command starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ResultCode {
    Success = 0,
    #[default]
    Busy = 1,
    Failure = 2,
}

impl ResultCode {
    /// Get the 2-bit register value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a register value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ResultCode::Success),
            1 => Some(ResultCode::Busy),
            2 => Some(ResultCode::Failure),
            _ => None,
        }
    }

    /// Returns true once a command has finished
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResultCode::Busy)
    }
}
