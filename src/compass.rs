//! Eight-way compass used for player movement.
//!
//! Headings are indices into a cycle that starts at `up` and proceeds
//! clockwise. All heading arithmetic is taken modulo [`HEADING_COUNT`].

use serde::{Deserialize, Serialize, Serializer};

use crate::types::Vec2;

pub const HEADING_COUNT: u8 = 8;

const OFFSETS: [(i32, i32); HEADING_COUNT as usize] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

const NAMES: [&str; HEADING_COUNT as usize] = [
    "up",
    "upright",
    "right",
    "downright",
    "down",
    "downleft",
    "left",
    "upleft",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Steer {
    Left,
    Right,
}

impl Steer {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Maps a two-button frame (`<`, `>`) to a steer, buttons counted from 1.
    pub fn from_button_index(index: i64) -> Option<Self> {
        match index {
            1 => Some(Self::Left),
            2 => Some(Self::Right),
            _ => None,
        }
    }

    fn delta(self) -> u8 {
        match self {
            Self::Left => HEADING_COUNT - 1,
            Self::Right => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Heading(u8);

impl Heading {
    pub const UP: Heading = Heading(0);
    pub const UP_RIGHT: Heading = Heading(1);
    pub const RIGHT: Heading = Heading(2);
    pub const DOWN_RIGHT: Heading = Heading(3);
    pub const DOWN: Heading = Heading(4);
    pub const DOWN_LEFT: Heading = Heading(5);
    pub const LEFT: Heading = Heading(6);
    pub const UP_LEFT: Heading = Heading(7);

    /// Heading every round starts with.
    pub const INITIAL: Heading = Heading::UP;

    pub fn from_index(index: u8) -> Self {
        Self(index % HEADING_COUNT)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        NAMES[self.0 as usize]
    }

    pub fn all() -> impl Iterator<Item = Heading> {
        (0..HEADING_COUNT).map(Heading)
    }

    pub fn turn(self, steer: Steer) -> Self {
        Self((self.0 + steer.delta()) % HEADING_COUNT)
    }

    pub fn displacement(self) -> Vec2 {
        let (x, y) = OFFSETS[self.0 as usize];
        Vec2 { x, y }
    }
}

impl Default for Heading {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Serialize for Heading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

pub fn turn(heading: Heading, steer: Steer) -> Heading {
    heading.turn(steer)
}

pub fn displacement(heading: Heading) -> Vec2 {
    heading.displacement()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_right_turns_return_to_start() {
        for start in Heading::all() {
            let mut heading = start;
            for _ in 0..HEADING_COUNT {
                heading = turn(heading, Steer::Right);
            }
            assert_eq!(heading, start);
        }
    }

    #[test]
    fn eight_left_turns_return_to_start() {
        for start in Heading::all() {
            let mut heading = start;
            for _ in 0..HEADING_COUNT {
                heading = turn(heading, Steer::Left);
            }
            assert_eq!(heading, start);
        }
    }

    #[test]
    fn left_wraps_from_up_to_up_left() {
        assert_eq!(turn(Heading::UP, Steer::Left), Heading::UP_LEFT);
        assert_eq!(turn(Heading::UP_LEFT, Steer::Right), Heading::UP);
    }

    #[test]
    fn left_undoes_right() {
        for heading in Heading::all() {
            assert_eq!(turn(turn(heading, Steer::Right), Steer::Left), heading);
        }
    }

    #[test]
    fn displacement_is_a_non_zero_unit_step_for_every_heading() {
        for heading in Heading::all() {
            let step = displacement(heading);
            assert!((-1..=1).contains(&step.x), "{heading:?}");
            assert!((-1..=1).contains(&step.y), "{heading:?}");
            assert_ne!(step, Vec2::ORIGIN);
        }
    }

    #[test]
    fn displacement_runs_clockwise_from_up() {
        assert_eq!(displacement(Heading::UP), Vec2 { x: 0, y: 1 });
        assert_eq!(displacement(Heading::UP_RIGHT), Vec2 { x: 1, y: 1 });
        assert_eq!(displacement(Heading::RIGHT), Vec2 { x: 1, y: 0 });
        assert_eq!(displacement(Heading::DOWN), Vec2 { x: 0, y: -1 });
        assert_eq!(displacement(Heading::LEFT), Vec2 { x: -1, y: 0 });
        assert_eq!(displacement(Heading::UP_LEFT), Vec2 { x: -1, y: 1 });
    }

    #[test]
    fn opposite_headings_cancel_out() {
        for heading in Heading::all() {
            let opposite = Heading::from_index(heading.index() + 4);
            let sum = displacement(heading) + displacement(opposite);
            assert_eq!(sum, Vec2::ORIGIN);
        }
    }

    #[test]
    fn from_index_wraps_modulo_eight() {
        assert_eq!(Heading::from_index(8), Heading::UP);
        assert_eq!(Heading::from_index(13), Heading::DOWN_LEFT);
    }

    #[test]
    fn steer_parsing_accepts_names_and_buttons() {
        assert_eq!(Steer::parse("left"), Some(Steer::Left));
        assert_eq!(Steer::parse("right"), Some(Steer::Right));
        assert_eq!(Steer::parse("up"), None);
        assert_eq!(Steer::from_button_index(1), Some(Steer::Left));
        assert_eq!(Steer::from_button_index(2), Some(Steer::Right));
        assert_eq!(Steer::from_button_index(0), None);
        assert_eq!(Steer::from_button_index(3), None);
    }

    #[test]
    fn heading_serializes_as_name() {
        let text = serde_json::to_string(&Heading::DOWN_RIGHT).expect("heading serializes");
        assert_eq!(text, "\"downright\"");
    }
}
