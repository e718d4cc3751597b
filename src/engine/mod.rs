use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::constants::MOVES_PER_ROUND;
use crate::types::{Action, GameSnapshot, MoveResult, PlayerId, PlayerView, Vec2, WinRecord};

mod player;
mod utils;

pub use self::player::Player;
pub use self::utils::scatter_treasures;

/// Authoritative game state: every player plus the shared treasure set.
///
/// `apply` is the only mutator. Feeding the same ordered actions into two
/// engines built from the same treasures always leaves them equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameEngine {
    players: BTreeMap<PlayerId, Player>,
    treasures: BTreeSet<Vec2>,
    winners: Vec<WinRecord>,
    applied_actions: u64,
}

impl GameEngine {
    pub fn new<I, T>(treasures: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec2>,
    {
        Self {
            players: BTreeMap::new(),
            treasures: treasures.into_iter().map(Into::into).collect(),
            winners: Vec::new(),
            applied_actions: 0,
        }
    }

    pub fn replay<I, T>(treasures: I, actions: &[Action]) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec2>,
    {
        let mut engine = Self::new(treasures);
        for action in actions {
            engine.apply(action);
        }
        engine
    }

    pub fn apply(&mut self, action: &Action) -> MoveResult {
        let sequence = self.applied_actions;
        self.applied_actions += 1;

        let player = self
            .players
            .entry(action.player_id)
            .or_insert_with(|| Player::new(action.player_id));
        player.move_with(action.steer);

        let position = player.position();
        if self.treasures.remove(&position) {
            self.winners.push(WinRecord {
                sequence,
                player_id: player.id(),
                position,
                moves: player.open_round().to_vec(),
            });
            player.record_win();
            player.start_new_round();
            return MoveResult {
                player: player.view(),
                win: true,
                round_ended: true,
            };
        }

        if player.open_round().len() >= MOVES_PER_ROUND {
            player.start_new_round();
            return MoveResult {
                player: player.view(),
                win: false,
                round_ended: true,
            };
        }

        MoveResult {
            player: player.view(),
            win: false,
            round_ended: false,
        }
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.get(&player_id)
    }

    /// View for `player_id`, or the round-start view if the id was never seen.
    /// Never inserts; players only come into existence through `apply`.
    pub fn player_view(&self, player_id: PlayerId) -> PlayerView {
        match self.players.get(&player_id) {
            Some(player) => player.view(),
            None => Player::new(player_id).view(),
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn treasures_remaining(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.treasures.iter().copied()
    }

    pub fn treasure_count(&self) -> usize {
        self.treasures.len()
    }

    pub fn has_treasure(&self, position: Vec2) -> bool {
        self.treasures.contains(&position)
    }

    pub fn winners(&self) -> &[WinRecord] {
        &self.winners
    }

    pub fn applied_actions(&self) -> u64 {
        self.applied_actions
    }

    pub fn leaderboard(&self) -> Vec<PlayerView> {
        let mut entries: Vec<PlayerView> = self.players.values().map(Player::view).collect();
        entries.sort_by(compare_standing);
        entries
    }

    pub fn build_snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            applied_actions: self.applied_actions,
            treasures: self.treasures.iter().copied().collect(),
            players: self.players.values().map(Player::view).collect(),
            winners: self.winners.clone(),
        }
    }
}

fn compare_standing(a: &PlayerView, b: &PlayerView) -> Ordering {
    b.round_wins
        .cmp(&a.round_wins)
        .then_with(|| b.lives_remaining.cmp(&a.lives_remaining))
        .then_with(|| a.total_moves.cmp(&b.total_moves))
        .then_with(|| a.id.cmp(&b.id))
}
