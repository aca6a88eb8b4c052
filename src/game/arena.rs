//! The arena actor: single owner of world state and the authoritative tick loop

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::util::time::{tick_period, unix_millis, Timer};
use crate::ws::broadcast::{Broadcaster, Outbound};
use crate::ws::protocol::SessionId;

use super::session::SessionManager;
use super::simulation::{self, TickReport};
use super::snapshot::SnapshotBuilder;
use super::validation::{IntentValidator, ValidationMode};
use super::world::WorldState;
use super::{ArenaRules, Intent, PlayerInput};

/// Pending intents before senders start waiting
const INPUT_QUEUE_CAPACITY: usize = 1024;
/// Outbound messages a slow connection may fall behind before it skips
const OUTBOUND_CAPACITY: usize = 512;
/// Queue delay worth a warning, roughly six ticks at 60 Hz
const QUEUE_DELAY_WARN_MS: u64 = 100;

/// Counters published by the arena for the health endpoint
#[derive(Debug, Default)]
pub struct ArenaStats {
    players: AtomicUsize,
    bullets: AtomicUsize,
    sessions: AtomicUsize,
    ticks: AtomicU64,
}

impl ArenaStats {
    fn record(&self, world: &WorldState, sessions: usize) {
        self.players.store(world.player_count(), Ordering::Relaxed);
        self.bullets.store(world.bullet_count(), Ordering::Relaxed);
        self.sessions.store(sessions, Ordering::Relaxed);
        self.ticks.store(world.tick, Ordering::Relaxed);
    }

    pub fn players(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    pub fn bullets(&self) -> usize {
        self.bullets.load(Ordering::Relaxed)
    }

    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::Relaxed)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// The arena loop has stopped and no longer accepts intents
#[derive(Debug, thiserror::Error)]
#[error("Arena is no longer running")]
pub struct ArenaClosed;

/// Cloneable handle used by connections to reach the arena
#[derive(Clone)]
pub struct ArenaHandle {
    input_tx: mpsc::Sender<PlayerInput>,
    broadcaster: Broadcaster,
    next_session: Arc<AtomicU64>,
    stats: Arc<ArenaStats>,
}

impl ArenaHandle {
    /// Allocate a fresh session id; ids are never reused
    pub fn next_session_id(&self) -> SessionId {
        SessionId(self.next_session.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribe to outbound traffic; subscribe before sending `Join`
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.broadcaster.subscribe()
    }

    /// Queue an intent, in arrival order
    pub async fn send(&self, session_id: SessionId, intent: Intent) -> Result<(), ArenaClosed> {
        self.input_tx
            .send(PlayerInput {
                session_id,
                intent,
                received_at: unix_millis(),
            })
            .await
            .map_err(|_| ArenaClosed)
    }

    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }
}

/// The authoritative arena. Intents and ticks are applied one at a time on the
/// task running [`Arena::run`], so no handler ever sees a half-applied update.
pub struct Arena {
    world: WorldState,
    sessions: SessionManager,
    rules: ArenaRules,
    broadcaster: Broadcaster,
    input_rx: mpsc::Receiver<PlayerInput>,
    stats: Arc<ArenaStats>,
}

impl Arena {
    pub fn new(
        rules: ArenaRules,
        validation: ValidationMode,
        spawn_seed: Option<u64>,
    ) -> (Self, ArenaHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let broadcaster = Broadcaster::new(OUTBOUND_CAPACITY);
        let stats = Arc::new(ArenaStats::default());

        let handle = ArenaHandle {
            input_tx,
            broadcaster: broadcaster.clone(),
            next_session: Arc::new(AtomicU64::new(1)),
            stats: stats.clone(),
        };

        let validator = IntentValidator::new(validation, rules);
        let arena = Self {
            world: WorldState::new(),
            sessions: SessionManager::new(rules, validator, spawn_seed),
            rules,
            broadcaster,
            input_rx,
            stats,
        };

        (arena, handle)
    }

    /// Run until every handle has been dropped
    pub async fn run(mut self) {
        let period = tick_period(self.rules.tick_rate);
        info!(
            tick_rate = self.rules.tick_rate,
            period_micros = period.as_micros() as u64,
            "Arena started"
        );

        let mut tick_interval = interval(period);
        // Late ticks are caught up rather than dropped
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                input = self.input_rx.recv() => match input {
                    Some(input) => self.apply(input),
                    None => break,
                },
                _ = tick_interval.tick() => {
                    self.tick();
                }
            }
        }

        info!(ticks = self.world.tick, "Arena stopped");
    }

    /// Apply one intent immediately
    pub fn apply(&mut self, input: PlayerInput) {
        let queued_ms = unix_millis().saturating_sub(input.received_at);
        if queued_ms > QUEUE_DELAY_WARN_MS {
            warn!(
                session_id = %input.session_id,
                queued_ms,
                "Intent waited long in the input queue"
            );
        }
        self.sessions.handle(&mut self.world, &self.broadcaster, input);
        self.stats.record(&self.world, self.sessions.session_count());
    }

    /// Run one simulation step and publish its results
    pub fn tick(&mut self) -> TickReport {
        let timer = Timer::new();

        let report = simulation::step(&mut self.world, &self.rules);
        for msg in SnapshotBuilder::tick_messages(&report, &self.world) {
            self.broadcaster.broadcast(&msg);
        }
        self.stats.record(&self.world, self.sessions.session_count());

        let elapsed = timer.elapsed();
        if elapsed > tick_period(self.rules.tick_rate) {
            warn!(
                tick = report.tick,
                elapsed_micros = timer.elapsed_micros(),
                bullets = self.world.bullet_count(),
                "Tick overran its period"
            );
        }

        report
    }

    #[cfg(test)]
    pub fn world(&self) -> &WorldState {
        &self.world
    }
}
