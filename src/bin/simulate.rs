use clap::Parser;
use compass_hunt_server::action_log::{ActionLog, JsonLinesActionLog, MemoryActionLog};
use compass_hunt_server::constants::MOVES_PER_ROUND;
use compass_hunt_server::engine::{scatter_treasures, GameEngine};
use compass_hunt_server::reward::{RewardDispatcher, RewardError};
use compass_hunt_server::rng::Rng;
use compass_hunt_server::server_utils::parse_treasures;
use compass_hunt_server::service::{GameService, SubmitError};
use compass_hunt_server::types::{GameSnapshot, PlayRequest, Vec2, WinRecord};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    bots: Option<u32>,
    #[arg(long)]
    treasures: Option<u32>,
    #[arg(long)]
    radius: Option<i32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_actions: Option<u64>,
    /// Replay an existing action log instead of running bot scenarios.
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Treasure list for `--replay`, falls back to the TREASURES env var.
    #[arg(long)]
    treasure_list: Option<String>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    bots: u32,
    treasures: u32,
    radius: i32,
    #[serde(rename = "maxActions")]
    max_actions: u64,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    bots: u32,
    actions: u64,
    #[serde(rename = "treasuresSeeded")]
    treasures_seeded: usize,
    #[serde(rename = "treasuresLeft")]
    treasures_left: usize,
    wins: usize,
    #[serde(rename = "roundsLost")]
    rounds_lost: u64,
    #[serde(rename = "gameOvers")]
    game_overs: u64,
    #[serde(rename = "rewardsDispatched")]
    rewards_dispatched: usize,
    #[serde(rename = "replayMatches")]
    replay_matches: bool,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    action: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageActions")]
    average_actions: u64,
    #[serde(rename = "totalWins")]
    total_wins: usize,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<u64>,
    details: Value,
}

#[derive(Clone, Debug, Default)]
struct CountingDispatcher {
    dispatched: Vec<u64>,
}

impl RewardDispatcher for CountingDispatcher {
    fn dispatch(&mut self, win: &WinRecord) -> Result<(), RewardError> {
        self.dispatched.push(win.sequence);
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();
    let run_started_at_ms = now_ms();

    if let Some(path) = cli.replay.as_ref() {
        let match_id = cli
            .match_id
            .clone()
            .unwrap_or_else(|| format!("replay-{run_started_at_ms}"));
        std::process::exit(run_replay(&cli, path, &match_id));
    }

    let scenarios = resolve_scenarios(&cli);
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| format!("sim-{seed_hint}-{run_started_at_ms}"));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "bots": scenario.bots,
                "treasures": scenario.treasures,
                "radius": scenario.radius,
                "maxActions": scenario.max_actions,
            }),
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.action),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.result.actions),
            json!({
                "wins": scenario_run.result.wins,
                "treasuresLeft": scenario_run.result.treasures_left,
                "gameOvers": scenario_run.result.game_overs,
                "replayMatches": scenario_run.result.replay_matches,
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => emit_log(
                "error",
                "result_encode_failed",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                None,
                json!({ "error": error.to_string() }),
            ),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        now_ms(),
        scenario_results,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageActions": summary.average_actions,
            "totalWins": summary.total_wins,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let mut rng = Rng::new(scenario.seed);
    let treasures = scatter_treasures(&mut rng, scenario.treasures as usize, scenario.radius);

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();

    let mut service = match GameService::start(
        treasures.clone(),
        MemoryActionLog::new(),
        CountingDispatcher::default(),
    ) {
        Ok(service) => service,
        Err(error) => {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                0,
                format!("service failed to start: {error}"),
            );
            return ScenarioRunResult {
                result: ScenarioResultLine {
                    scenario: scenario.name.clone(),
                    seed: scenario.seed,
                    bots: scenario.bots,
                    actions: 0,
                    treasures_seeded: treasures.len(),
                    treasures_left: treasures.len(),
                    wins: 0,
                    rounds_lost: 0,
                    game_overs: 0,
                    rewards_dispatched: 0,
                    replay_matches: false,
                    anomalies,
                },
                anomaly_records,
            };
        }
    };

    let mut actions = 0u64;
    let mut rounds_lost = 0u64;
    let mut game_overs = 0u64;
    let bot_count = u64::from(scenario.bots);
    let mut next_bot = 0u64;

    while actions < scenario.max_actions && service.engine().treasure_count() > 0 {
        let Some(player_id) = next_active_bot(bot_count, &mut next_bot, |id| {
            !service.player_view(id).game_over
        }) else {
            break;
        };
        let request = PlayRequest {
            player_id,
            steer: rng.steer(),
            client_timestamp: actions,
        };

        match service.submit(request, actions) {
            Ok(result) => {
                if result.round_ended && !result.win {
                    rounds_lost += 1;
                    if result.player.game_over {
                        game_overs += 1;
                    }
                }
                if result.player.moves_remaining > MOVES_PER_ROUND {
                    push_anomaly(
                        &mut anomalies,
                        &mut anomaly_records,
                        &mut anomaly_seen,
                        actions,
                        format!("moves remaining above cap for player {player_id}"),
                    );
                }
            }
            Err(SubmitError::GameOver { .. }) => {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    actions,
                    "active bot was rejected as game over".to_string(),
                );
            }
            Err(error) => {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    actions,
                    format!("submit failed: {error}"),
                );
                break;
            }
        }
        actions += 1;
    }

    let snapshot = service.snapshot();
    for message in collect_snapshot_anomalies(&snapshot, treasures.len()) {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            actions,
            message,
        );
    }

    let rewards_dispatched = service.rewards().dispatched.len();
    if rewards_dispatched != snapshot.winners.len() {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            actions,
            format!(
                "reward count mismatch: {rewards_dispatched} dispatched for {} wins",
                snapshot.winners.len()
            ),
        );
    }

    let replayed = GameEngine::replay(treasures.clone(), service.log().actions());
    let replay_matches = &replayed == service.engine();
    if !replay_matches {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            actions,
            "replayed state diverged from live state".to_string(),
        );
    }

    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            bots: scenario.bots,
            actions,
            treasures_seeded: treasures.len(),
            treasures_left: snapshot.treasures.len(),
            wins: snapshot.winners.len(),
            rounds_lost,
            game_overs,
            rewards_dispatched,
            replay_matches,
            anomalies,
        },
        anomaly_records,
    }
}

/// Round-robin over bots `1..=bot_count`, skipping those `is_active` rejects.
fn next_active_bot(
    bot_count: u64,
    cursor: &mut u64,
    is_active: impl Fn(u64) -> bool,
) -> Option<u64> {
    for _ in 0..bot_count {
        let player_id = *cursor % bot_count + 1;
        *cursor = (*cursor + 1) % bot_count;
        if is_active(player_id) {
            return Some(player_id);
        }
    }
    None
}

fn run_replay(cli: &Cli, path: &Path, match_id: &str) -> i32 {
    let raw_treasures = cli
        .treasure_list
        .clone()
        .or_else(|| std::env::var("TREASURES").ok())
        .unwrap_or_default();
    let treasures = match parse_treasures(&raw_treasures) {
        Ok(value) => value,
        Err(error) => {
            emit_log(
                "error",
                "treasures_invalid",
                match_id,
                None,
                None,
                None,
                json!({ "error": error }),
            );
            return 2;
        }
    };

    let actions = match JsonLinesActionLog::new(path.to_path_buf()).load() {
        Ok(value) => value,
        Err(error) => {
            emit_log(
                "error",
                "replay_load_failed",
                match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            return 2;
        }
    };

    let engine = GameEngine::replay(treasures.clone(), &actions);
    let snapshot = engine.build_snapshot();
    let anomalies = collect_snapshot_anomalies(&snapshot, treasures.len());
    for message in &anomalies {
        emit_log(
            "warn",
            "anomaly_detected",
            match_id,
            None,
            None,
            None,
            json!({ "message": message }),
        );
    }

    emit_log(
        "info",
        "replay_finished",
        match_id,
        None,
        None,
        Some(engine.applied_actions()),
        json!({
            "players": engine.player_count(),
            "treasuresLeft": engine.treasure_count(),
            "winners": engine.winners().len(),
        }),
    );
    match serde_json::to_string(&json!({
        "leaderboard": engine.leaderboard(),
        "snapshot": snapshot,
    })) {
        Ok(line) => println!("{line}"),
        Err(error) => {
            emit_log(
                "error",
                "result_encode_failed",
                match_id,
                None,
                None,
                None,
                json!({ "error": error.to_string() }),
            );
            return 2;
        }
    }

    if anomalies.is_empty() {
        0
    } else {
        1
    }
}

fn collect_snapshot_anomalies(snapshot: &GameSnapshot, treasures_seeded: usize) -> Vec<String> {
    let mut anomalies = Vec::new();

    if snapshot.treasures.len() + snapshot.winners.len() != treasures_seeded {
        anomalies.push(format!(
            "treasure accounting broken: {} left + {} claimed != {treasures_seeded}",
            snapshot.treasures.len(),
            snapshot.winners.len()
        ));
    }

    let remaining: HashSet<Vec2> = snapshot.treasures.iter().copied().collect();
    let mut claimed = HashSet::new();
    let mut last_sequence: Option<u64> = None;
    for win in &snapshot.winners {
        if remaining.contains(&win.position) {
            anomalies.push(format!(
                "claimed treasure still present: ({}, {})",
                win.position.x, win.position.y
            ));
        }
        if !claimed.insert(win.position) {
            anomalies.push(format!(
                "treasure claimed twice: ({}, {})",
                win.position.x, win.position.y
            ));
        }
        if last_sequence.is_some_and(|previous| previous >= win.sequence) {
            anomalies.push(format!("winner sequence out of order at {}", win.sequence));
        }
        last_sequence = Some(win.sequence);
    }

    for player in &snapshot.players {
        if player.moves_remaining == 0 || player.moves_remaining > MOVES_PER_ROUND {
            anomalies.push(format!(
                "player {} has an invalid open round ({} moves left)",
                player.id, player.moves_remaining
            ));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(rand::random::<u64>) as u32;

    if cli.single
        || cli.bots.is_some()
        || cli.treasures.is_some()
        || cli.radius.is_some()
        || cli.max_actions.is_some()
    {
        let bots = cli.bots.unwrap_or(4).clamp(1, 1_000);
        return vec![Scenario {
            name: format!("custom-bots{bots}"),
            bots,
            treasures: cli.treasures.unwrap_or(8).clamp(1, 500),
            radius: cli.radius.unwrap_or(5).clamp(1, 10),
            max_actions: cli.max_actions.unwrap_or(5_000).clamp(1, 1_000_000),
            seed,
        }];
    }

    vec![
        Scenario {
            name: "quick-check-bots2".to_string(),
            bots: 2,
            treasures: 4,
            radius: 4,
            max_actions: 1_000,
            seed,
        },
        Scenario {
            name: "crowd-check-bots25".to_string(),
            bots: 25,
            treasures: 20,
            radius: 6,
            max_actions: 10_000,
            seed: seed.wrapping_add(1),
        },
    ]
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    action: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        action,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_actions: u64 = scenarios.iter().map(|scenario| scenario.actions).sum();
    let average_actions = if scenario_count == 0 {
        0
    } else {
        total_actions / scenario_count as u64
    };
    let total_wins = scenarios.iter().map(|scenario| scenario.wins).sum();
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_actions,
        total_wins,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    action: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        action,
        details,
    };
    if let Ok(text) = serde_json::to_string(&log_line) {
        eprintln!("{text}");
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
