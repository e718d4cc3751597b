use std::fmt;

use log::info;

use crate::types::WinRecord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardError {
    message: String,
}

impl RewardError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RewardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reward dispatch failed: {}", self.message)
    }
}

impl std::error::Error for RewardError {}

/// Invoked once per live winning move, after the win is already committed.
pub trait RewardDispatcher: Send {
    fn dispatch(&mut self, win: &WinRecord) -> Result<(), RewardError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingRewardDispatcher;

impl RewardDispatcher for LoggingRewardDispatcher {
    fn dispatch(&mut self, win: &WinRecord) -> Result<(), RewardError> {
        info!(
            "[reward] player {} claimed treasure at ({}, {}) in {} moves",
            win.player_id,
            win.position.x,
            win.position.y,
            win.moves.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compass::Steer;
    use crate::types::Vec2;

    #[test]
    fn logging_dispatcher_accepts_every_win() {
        let mut dispatcher = LoggingRewardDispatcher;
        let win = WinRecord {
            sequence: 0,
            player_id: 1,
            position: Vec2::new(1, 1),
            moves: vec![Steer::Right],
        };
        assert!(dispatcher.dispatch(&win).is_ok());
    }

    #[test]
    fn reward_error_displays_message() {
        let error = RewardError::new("wallet offline");
        assert_eq!(error.to_string(), "reward dispatch failed: wallet offline");
    }
}
