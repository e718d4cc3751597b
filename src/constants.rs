pub const MAX_ROUNDS: u32 = 3;
pub const MOVES_PER_ROUND: usize = 10;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ACTION_LOG_PATH: &str = "data/actions.jsonl";
pub const ACTION_QUEUE_CAPACITY: usize = 256;
