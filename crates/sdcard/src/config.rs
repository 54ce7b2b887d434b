//! Retry and timeout budgets.

/// Polling budgets for bring-up and reads.
///
/// Every wait in the driver is an attempt count, never a wall-clock timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SdConfig {
    /// Idle bytes clocked before GO_IDLE_STATE (8 clocks each).
    pub power_up_bytes: usize,
    /// R1 polls after each command frame.
    pub response_polls: u8,
    /// Op-cond attempts while the card leaves the idle state.
    pub op_cond_attempts: u32,
    /// Delay between op-cond attempts, in microseconds.
    pub op_cond_interval_us: u32,
    /// Polls for the data start token.
    pub token_polls: u32,
}

impl Default for SdConfig {
    /// 80 power-up clocks, 10 R1 polls, 10 000 × 100 µs op-cond budget
    /// (one second), 40 000 token polls.
    fn default() -> Self {
        Self {
            power_up_bytes: 10,
            response_polls: 10,
            op_cond_attempts: 10_000,
            op_cond_interval_us: 100,
            token_polls: 40_000,
        }
    }
}

impl SdConfig {
    /// Check that the budgets can succeed at all.
    ///
    /// # Errors
    ///
    /// Returns a description of the first unusable field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.power_up_bytes < 10 {
            return Err("power_up_bytes must give at least 74 clocks");
        }
        if self.response_polls == 0 {
            return Err("response_polls must be non-zero");
        }
        if self.op_cond_attempts == 0 {
            return Err("op_cond_attempts must be non-zero");
        }
        if self.token_polls == 0 {
            return Err("token_polls must be non-zero");
        }
        Ok(())
    }
}
