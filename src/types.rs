use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::compass::{Heading, Steer};

pub type PlayerId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const ORIGIN: Vec2 = Vec2 { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl From<(i32, i32)> for Vec2 {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// One accepted player input, in the shape it is written to the action log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "playerId", alias = "player_id")]
    pub player_id: PlayerId,
    pub steer: Steer,
    #[serde(rename = "clientTimestamp", alias = "client_timestamp", default)]
    pub client_timestamp: u64,
    #[serde(rename = "serverTimestamp", alias = "server_timestamp", default)]
    pub server_timestamp: u64,
}

/// An input that passed boundary validation but has not been admitted yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayRequest {
    pub player_id: PlayerId,
    pub steer: Steer,
    pub client_timestamp: u64,
}

impl PlayRequest {
    pub fn into_action(self, server_timestamp: u64) -> Action {
        Action {
            player_id: self.player_id,
            steer: self.steer,
            client_timestamp: self.client_timestamp,
            server_timestamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub position: Vec2,
    pub heading: Heading,
    #[serde(rename = "movesRemaining")]
    pub moves_remaining: usize,
    #[serde(rename = "livesRemaining")]
    pub lives_remaining: i64,
    #[serde(rename = "roundWins")]
    pub round_wins: u32,
    #[serde(rename = "roundsStarted")]
    pub rounds_started: usize,
    #[serde(rename = "totalMoves")]
    pub total_moves: usize,
    #[serde(rename = "gameOver")]
    pub game_over: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveResult {
    pub player: PlayerView,
    pub win: bool,
    #[serde(rename = "roundEnded")]
    pub round_ended: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoveOutcome {
    Found,
    RoundLost {
        #[serde(rename = "livesRemaining")]
        lives_remaining: i64,
    },
    GameOver,
    Continue,
}

impl MoveResult {
    pub fn outcome(&self) -> MoveOutcome {
        if self.win {
            return MoveOutcome::Found;
        }
        if !self.round_ended {
            return MoveOutcome::Continue;
        }
        if self.player.lives_remaining > 0 {
            MoveOutcome::RoundLost {
                lives_remaining: self.player.lives_remaining,
            }
        } else {
            MoveOutcome::GameOver
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WinRecord {
    pub sequence: u64,
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    pub position: Vec2,
    pub moves: Vec<Steer>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameSnapshot {
    #[serde(rename = "appliedActions")]
    pub applied_actions: u64,
    pub treasures: Vec<Vec2>,
    pub players: Vec<PlayerView>,
    pub winners: Vec<WinRecord>,
}
