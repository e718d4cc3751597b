use std::path::PathBuf;

use crate::constants::{DEFAULT_ACTION_LOG_PATH, DEFAULT_PORT};
use crate::types::Vec2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub action_log_path: PathBuf,
    pub treasures: Vec<Vec2>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let port = lookup("PORT")
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let action_log_path = lookup("ACTION_LOG_PATH")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ACTION_LOG_PATH));
        let treasures = match lookup("TREASURES") {
            Some(raw) => parse_treasures(&raw)?,
            None => Vec::new(),
        };
        Ok(Self {
            port,
            action_log_path,
            treasures,
        })
    }
}

/// Parses a list of `[x, y]` pairs. Tuple notation `[(x, y), ...]` is accepted
/// too since existing deployments store the list that way.
pub fn parse_treasures(raw: &str) -> Result<Vec<Vec2>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let normalized = trimmed.replace('(', "[").replace(')', "]");
    let pairs: Vec<(i32, i32)> = serde_json::from_str(&normalized)
        .map_err(|error| format!("TREASURES must be a list of [x, y] pairs: {error}"))?;
    Ok(pairs.into_iter().map(Vec2::from).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.action_log_path, PathBuf::from(DEFAULT_ACTION_LOG_PATH));
        assert!(config.treasures.is_empty());
    }

    #[test]
    fn env_values_override_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "9090"),
            ("ACTION_LOG_PATH", "/tmp/game/actions.jsonl"),
            ("TREASURES", "[[1, 1], [-3, 4]]"),
        ]))
        .expect("config");
        assert_eq!(config.port, 9090);
        assert_eq!(
            config.action_log_path,
            PathBuf::from("/tmp/game/actions.jsonl")
        );
        assert_eq!(config.treasures, vec![Vec2::new(1, 1), Vec2::new(-3, 4)]);
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("PORT", "70000")])).expect("config");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_treasures_are_an_error() {
        let result = ServerConfig::from_lookup(lookup_from(&[("TREASURES", "[[1]]")]));
        assert!(result.is_err());
    }

    #[test]
    fn parse_treasures_accepts_tuple_notation() {
        assert_eq!(
            parse_treasures("[(2, 5), (-1, -1)]").expect("tuples parse"),
            vec![Vec2::new(2, 5), Vec2::new(-1, -1)]
        );
        assert_eq!(parse_treasures("  ").expect("blank parses"), Vec::new());
        assert_eq!(parse_treasures("[]").expect("empty parses"), Vec::new());
    }
}
