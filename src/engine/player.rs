use crate::compass::{Heading, Steer};
use crate::constants::{MAX_ROUNDS, MOVES_PER_ROUND};
use crate::types::{PlayerId, PlayerView, Vec2};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    position: Vec2,
    heading: Heading,
    finished_rounds: Vec<Vec<Steer>>,
    open_round: Vec<Steer>,
    round_wins: u32,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            position: Vec2::ORIGIN,
            heading: Heading::INITIAL,
            finished_rounds: Vec::new(),
            open_round: Vec::with_capacity(MOVES_PER_ROUND),
            round_wins: 0,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn round_wins(&self) -> u32 {
        self.round_wins
    }

    pub fn finished_rounds(&self) -> &[Vec<Steer>] {
        &self.finished_rounds
    }

    pub fn open_round(&self) -> &[Steer] {
        &self.open_round
    }

    /// Includes the open round.
    pub fn rounds_started(&self) -> usize {
        self.finished_rounds.len() + 1
    }

    pub fn total_moves(&self) -> usize {
        self.finished_rounds.iter().map(Vec::len).sum::<usize>() + self.open_round.len()
    }

    pub fn moves_remaining_in_round(&self) -> usize {
        MOVES_PER_ROUND.saturating_sub(self.open_round().len())
    }

    pub fn lives_remaining(&self) -> i64 {
        i64::from(MAX_ROUNDS) - self.rounds_started() as i64 + i64::from(self.round_wins) + 1
    }

    pub fn is_game_over(&self) -> bool {
        self.lives_remaining() <= 0
    }

    pub(super) fn move_with(&mut self, steer: Steer) {
        self.open_round.push(steer);
        self.heading = self.heading.turn(steer);
        self.position += self.heading.displacement();
    }

    pub(super) fn record_win(&mut self) {
        self.round_wins += 1;
    }

    pub(super) fn start_new_round(&mut self) {
        self.position = Vec2::ORIGIN;
        self.heading = Heading::INITIAL;
        let finished = std::mem::replace(
            &mut self.open_round,
            Vec::with_capacity(MOVES_PER_ROUND),
        );
        self.finished_rounds.push(finished);
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            position: self.position,
            heading: self.heading,
            moves_remaining: self.moves_remaining_in_round(),
            lives_remaining: self.lives_remaining(),
            round_wins: self.round_wins,
            rounds_started: self.rounds_started(),
            total_moves: self.total_moves(),
            game_over: self.is_game_over(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_player_starts_at_origin_facing_up() {
        let player = Player::new(42);
        assert_eq!(player.position(), Vec2::ORIGIN);
        assert_eq!(player.heading(), Heading::UP);
        assert_eq!(player.rounds_started(), 1);
        assert!(player.open_round().is_empty());
        assert_eq!(player.moves_remaining_in_round(), MOVES_PER_ROUND);
        assert_eq!(player.lives_remaining(), 3);
    }

    #[test]
    fn move_turns_before_stepping() {
        let mut player = Player::new(1);
        player.move_with(Steer::Right);
        assert_eq!(player.heading(), Heading::UP_RIGHT);
        assert_eq!(player.position(), Vec2::new(1, 1));

        player.move_with(Steer::Right);
        assert_eq!(player.heading(), Heading::RIGHT);
        assert_eq!(player.position(), Vec2::new(2, 1));

        player.move_with(Steer::Left);
        assert_eq!(player.heading(), Heading::UP_RIGHT);
        assert_eq!(player.position(), Vec2::new(3, 2));

        assert_eq!(player.open_round(), &[Steer::Right, Steer::Right, Steer::Left]);
        assert_eq!(player.moves_remaining_in_round(), MOVES_PER_ROUND - 3);
    }

    #[test]
    fn start_new_round_resets_position_and_keeps_history() {
        let mut player = Player::new(1);
        player.move_with(Steer::Left);
        player.move_with(Steer::Left);
        player.start_new_round();

        assert_eq!(player.position(), Vec2::ORIGIN);
        assert_eq!(player.heading(), Heading::INITIAL);
        assert_eq!(player.rounds_started(), 2);
        assert_eq!(player.finished_rounds(), &[vec![Steer::Left, Steer::Left]]);
        assert!(player.open_round().is_empty());
        assert_eq!(player.total_moves(), 2);
    }

    #[test]
    fn every_move_lands_in_the_current_round() {
        let mut player = Player::new(3);
        player.start_new_round();
        player.move_with(Steer::Right);
        player.start_new_round();
        player.start_new_round();
        player.move_with(Steer::Left);
        player.move_with(Steer::Left);

        assert_eq!(player.rounds_started(), 4);
        assert_eq!(
            player.finished_rounds(),
            &[Vec::new(), vec![Steer::Right], Vec::new()]
        );
        assert_eq!(player.open_round(), &[Steer::Left, Steer::Left]);
        assert_eq!(player.total_moves(), 3);
        assert_eq!(player.moves_remaining_in_round(), MOVES_PER_ROUND - 2);
    }

    #[test]
    fn lives_follow_rounds_started_and_wins() {
        let mut player = Player::new(1);
        player.start_new_round();
        player.start_new_round();
        assert_eq!(player.rounds_started(), 3);
        assert_eq!(player.lives_remaining(), 1);

        player.record_win();
        assert_eq!(player.lives_remaining(), 2);

        let mut loser = Player::new(2);
        for _ in 0..MAX_ROUNDS {
            loser.start_new_round();
        }
        assert_eq!(loser.lives_remaining(), 0);
        assert!(loser.is_game_over());
    }

    #[test]
    fn view_mirrors_player_state() {
        let mut player = Player::new(9);
        player.move_with(Steer::Right);
        let view = player.view();
        assert_eq!(view.id, 9);
        assert_eq!(view.position, Vec2::new(1, 1));
        assert_eq!(view.heading, Heading::UP_RIGHT);
        assert_eq!(view.moves_remaining, MOVES_PER_ROUND - 1);
        assert_eq!(view.lives_remaining, 3);
        assert_eq!(view.total_moves, 1);
        assert!(!view.game_over);
    }
}
