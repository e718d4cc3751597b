//! Single-writer host around [`GameEngine`].
//!
//! Every admitted action is logged, then applied, then rewarded, one at a
//! time. [`spawn_game_service`] moves the service onto its own worker so any
//! number of request handlers can share it through a [`GameHandle`].

use std::fmt;

use log::{error, info, warn};
use tokio::sync::{mpsc, oneshot};

use crate::action_log::{ActionLog, ActionLogError};
use crate::engine::GameEngine;
use crate::reward::RewardDispatcher;
use crate::types::{GameSnapshot, MoveResult, PlayRequest, PlayerId, PlayerView, Vec2};

#[derive(Debug)]
pub enum SubmitError {
    GameOver {
        player_id: PlayerId,
        lives_remaining: i64,
    },
    Log(ActionLogError),
    Unavailable,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::GameOver {
                player_id,
                lives_remaining,
            } => write!(
                f,
                "player {player_id} has no lives left ({lives_remaining})"
            ),
            SubmitError::Log(source) => write!(f, "action was not admitted: {source}"),
            SubmitError::Unavailable => write!(f, "game service is not running"),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Log(source) => Some(source),
            _ => None,
        }
    }
}

pub struct GameService<L, R> {
    engine: GameEngine,
    log: L,
    rewards: R,
}

impl<L: ActionLog, R: RewardDispatcher> GameService<L, R> {
    /// Rebuilds the engine from everything `log` already holds. Replayed wins
    /// were rewarded when they first happened, so nothing is dispatched here.
    pub fn start(treasures: Vec<Vec2>, log: L, rewards: R) -> Result<Self, ActionLogError> {
        let actions = log.load()?;
        let engine = GameEngine::replay(treasures, &actions);
        info!(
            "[service] replayed {} actions: {} players, {} treasures left, {} winners",
            actions.len(),
            engine.player_count(),
            engine.treasure_count(),
            engine.winners().len()
        );
        Ok(Self {
            engine,
            log,
            rewards,
        })
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn rewards(&self) -> &R {
        &self.rewards
    }

    pub fn submit(
        &mut self,
        request: PlayRequest,
        server_timestamp: u64,
    ) -> Result<MoveResult, SubmitError> {
        let standing = self.engine.player_view(request.player_id);
        if standing.game_over {
            return Err(SubmitError::GameOver {
                player_id: request.player_id,
                lives_remaining: standing.lives_remaining,
            });
        }

        let action = request.into_action(server_timestamp);
        self.log.append(&action).map_err(SubmitError::Log)?;
        let result = self.engine.apply(&action);

        if result.win {
            if let Some(win) = self.engine.winners().last() {
                info!(
                    "[service] player {} found treasure at ({}, {})",
                    win.player_id, win.position.x, win.position.y
                );
                if let Err(reward_error) = self.rewards.dispatch(win) {
                    error!(
                        "[service] reward for player {} not paid: {reward_error}",
                        win.player_id
                    );
                }
            }
        } else if result.round_ended {
            info!(
                "[service] player {} lost a round, {} lives left",
                result.player.id, result.player.lives_remaining
            );
        }

        Ok(result)
    }

    pub fn player_view(&self, player_id: PlayerId) -> PlayerView {
        self.engine.player_view(player_id)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.engine.build_snapshot()
    }

    pub fn leaderboard(&self) -> Vec<PlayerView> {
        self.engine.leaderboard()
    }
}

enum Command {
    Submit {
        request: PlayRequest,
        server_timestamp: u64,
        reply: oneshot::Sender<Result<MoveResult, SubmitError>>,
    },
    Player {
        player_id: PlayerId,
        reply: oneshot::Sender<PlayerView>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    Leaderboard {
        reply: oneshot::Sender<Vec<PlayerView>>,
    },
}

#[derive(Clone, Debug)]
pub struct GameHandle {
    tx: mpsc::Sender<Command>,
}

/// Moves `service` onto a dedicated blocking worker that drains commands one
/// at a time. The worker exits once every handle has been dropped.
pub fn spawn_game_service<L, R>(service: GameService<L, R>, capacity: usize) -> GameHandle
where
    L: ActionLog + 'static,
    R: RewardDispatcher + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Command>(capacity.max(1));
    tokio::task::spawn_blocking(move || {
        let mut service = service;
        while let Some(command) = rx.blocking_recv() {
            match command {
                Command::Submit {
                    request,
                    server_timestamp,
                    reply,
                } => {
                    let _ = reply.send(service.submit(request, server_timestamp));
                }
                Command::Player { player_id, reply } => {
                    let _ = reply.send(service.player_view(player_id));
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(service.snapshot());
                }
                Command::Leaderboard { reply } => {
                    let _ = reply.send(service.leaderboard());
                }
            }
        }
        warn!("[service] command channel closed, worker stopping");
    });
    GameHandle { tx }
}

impl GameHandle {
    pub async fn submit(
        &self,
        request: PlayRequest,
        server_timestamp: u64,
    ) -> Result<MoveResult, SubmitError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Submit {
                request,
                server_timestamp,
                reply,
            })
            .await
            .map_err(|_| SubmitError::Unavailable)?;
        rx.await.map_err(|_| SubmitError::Unavailable)?
    }

    pub async fn player(&self, player_id: PlayerId) -> Option<PlayerView> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Player { player_id, reply })
            .await
            .ok()?;
        rx.await.ok()
    }

    pub async fn snapshot(&self) -> Option<GameSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Snapshot { reply }).await.ok()?;
        rx.await.ok()
    }

    pub async fn leaderboard(&self) -> Option<Vec<PlayerView>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Leaderboard { reply }).await.ok()?;
        rx.await.ok()
    }
}
