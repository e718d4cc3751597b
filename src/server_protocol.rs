use serde_json::{Map, Value};

use crate::compass::Steer;
use crate::types::{PlayRequest, PlayerId};

/// Accepts `{"playerId", "steer": "left"|"right"}` or the two-button frame
/// form `{"playerId", "buttonIndex": 1|2}`. `clientTimestamp` is optional.
pub fn parse_play_request(raw: &str) -> Option<PlayRequest> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let player_id = parse_player_id(object)?;

    let steer = match (object.get("steer"), object.get("buttonIndex")) {
        (Some(steer), None) => Steer::parse(steer.as_str()?)?,
        (None, Some(button)) => Steer::from_button_index(parse_optional_i64(Some(button))??)?,
        _ => return None,
    };

    let client_timestamp = match parse_optional_i64(object.get("clientTimestamp"))? {
        None => 0,
        Some(value) => u64::try_from(value).ok()?,
    };

    Some(PlayRequest {
        player_id,
        steer,
        client_timestamp,
    })
}

pub fn parse_start_request(raw: &str) -> Option<PlayerId> {
    let value: Value = serde_json::from_str(raw).ok()?;
    parse_player_id(value.as_object()?)
}

fn parse_player_id(object: &Map<String, Value>) -> Option<PlayerId> {
    let raw = object.get("playerId")?;
    if let Some(text) = raw.as_str() {
        return text.trim().parse::<PlayerId>().ok();
    }
    raw.as_u64()
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_u64() {
        return i64::try_from(number).ok().map(Some);
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() {
            let floored = number.floor();
            if floored.abs() > MAX_SAFE_INTEGER_F64 {
                return None;
            }
            return Some(Some(floored as i64));
        }
    }
    None
}
