//! Collaborator contracts the engine consumes, with shipped defaults.
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use bevy::prelude::*;
use serde::Serialize;

use crate::jobs::{components::Currency, config::ProgressionConfig};

use super::{components::PlayerId, limits::PaymentLimits, log::EarningsLog, points::PlayerPoints};

/// Resolves externally-granted capabilities: boolean grants and numeric
/// values keyed by dotted capability strings.
pub trait CapabilityResolver: Send + Sync {
    /// Largest numeric value granted for the key, 0.0 when none.
    fn max_value(&self, player: PlayerId, key: &str) -> f64;

    fn has_capability(&self, player: PlayerId, key: &str) -> bool;

    /// Invalidate any cached grants after a membership change.
    fn refresh(&self, _player: PlayerId) {}
}

/// Produces the numeric payment cap for a currency.
pub trait LimitEquationSource: Send + Sync {
    fn cap(&self, currency: Currency, total_levels: i32, max_jobs: i32) -> f64;
}

/// Resolves how many jobs a player may hold at once.
pub trait MaxJobsSource: Send + Sync {
    fn max_jobs(&self, player: PlayerId) -> i32;
}

/// Delivers player-facing text.
pub trait Messenger: Send + Sync {
    fn chat(&self, player: PlayerId, line: &str);

    /// Transient on-screen notice (countdowns and the like).
    fn overlay(&self, player: PlayerId, line: &str);
}

/// Flat snapshot of one account, written by the persistence sink.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub jobs: Vec<JobSnapshot>,
    pub points_current: f64,
    pub points_total: f64,
    pub done_quests: u32,
    pub skipped_quests: u32,
    pub quest_progress: Option<String>,
    pub seen_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job: String,
    pub level: i32,
    pub experience: f64,
}

/// Receives player state when the engine asks for a save.
pub trait PersistenceSink: Send + Sync {
    fn save(&self, snapshot: &AccountSnapshot);
    fn save_log(&self, player: PlayerId, log: &EarningsLog);
    fn save_points(&self, player: PlayerId, points: &PlayerPoints);
    fn record_limits(&self, player: PlayerId, limits: &PaymentLimits);
    fn update_seen(&self, player: PlayerId, seen_ms: i64);
}

/// In-memory capability tables, used by the demo world and tests.
#[derive(Debug, Default)]
pub struct StaticCapabilityResolver {
    values: HashMap<(PlayerId, String), f64>,
    grants: HashSet<(PlayerId, String)>,
}

impl StaticCapabilityResolver {
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn set_value(&mut self, player: PlayerId, key: &str, value: f64) {
        self.values.insert((player, key.to_string()), value);
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn grant(&mut self, player: PlayerId, key: &str) {
        self.grants.insert((player, key.to_string()));
    }
}

impl CapabilityResolver for StaticCapabilityResolver {
    fn max_value(&self, player: PlayerId, key: &str) -> f64 {
        self.values
            .get(&(player, key.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    fn has_capability(&self, player: PlayerId, key: &str) -> bool {
        self.grants.contains(&(player, key.to_string()))
    }
}

/// Linear cap curves read from the engine configuration.
#[derive(Debug)]
pub struct ConfiguredLimitEquations {
    curves: HashMap<Currency, (f64, f64, f64)>,
}

impl ConfiguredLimitEquations {
    pub fn from_config(config: &ProgressionConfig) -> Self {
        let mut curves = HashMap::new();
        for currency in Currency::ALL {
            let limit = config.limit(currency);
            curves.insert(
                currency,
                (limit.base, limit.per_total_level, limit.per_max_jobs),
            );
        }
        Self { curves }
    }
}

impl LimitEquationSource for ConfiguredLimitEquations {
    fn cap(&self, currency: Currency, total_levels: i32, max_jobs: i32) -> f64 {
        let (base, per_level, per_max_jobs) =
            self.curves.get(&currency).copied().unwrap_or((0.0, 0.0, 0.0));
        base + per_level * total_levels as f64 + per_max_jobs * max_jobs as f64
    }
}

/// Fixed max-jobs value from configuration.
#[derive(Debug)]
pub struct ConfiguredMaxJobs(pub i32);

impl MaxJobsSource for ConfiguredMaxJobs {
    fn max_jobs(&self, _player: PlayerId) -> i32 {
        self.0
    }
}

/// Messenger that routes player text to the log.
#[derive(Debug, Default)]
pub struct LogMessenger;

impl Messenger for LogMessenger {
    fn chat(&self, player: PlayerId, line: &str) {
        info!("[chat -> {player}] {line}");
    }

    fn overlay(&self, player: PlayerId, line: &str) {
        info!("[overlay -> {player}] {line}");
    }
}

/// Writes account snapshots as JSON files under a save directory.
#[derive(Debug)]
pub struct JsonFileSink {
    directory: PathBuf,
}

impl JsonFileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl PersistenceSink for JsonFileSink {
    fn save(&self, snapshot: &AccountSnapshot) {
        let path = self.directory.join(format!("{}.json", snapshot.id.value()));
        let payload = match serde_json::to_string_pretty(snapshot) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Failed to encode save for {}: {err}", snapshot.id);
                return;
            }
        };

        if let Err(err) = std::fs::create_dir_all(&self.directory) {
            warn!("Failed to create save directory: {err}");
            return;
        }
        if let Err(err) = std::fs::write(&path, payload) {
            warn!("Failed to write save for {}: {err}", snapshot.id);
        }
    }

    fn save_log(&self, player: PlayerId, log: &EarningsLog) {
        debug!("Earnings log for {player}: {} actions", log.entries().count());
    }

    fn save_points(&self, player: PlayerId, points: &PlayerPoints) {
        debug!("Points for {player}: {:.1}", points.current());
    }

    fn record_limits(&self, player: PlayerId, limits: &PaymentLimits) {
        debug!(
            "Limits for {player}: {:.1} money accumulated",
            limits.amount(Currency::Money)
        );
    }

    fn update_seen(&self, player: PlayerId, seen_ms: i64) {
        debug!("Last seen for {player}: {seen_ms}");
    }
}

/// Sink that drops everything; used by tests.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Default)]
pub struct NullSink;

impl PersistenceSink for NullSink {
    fn save(&self, _snapshot: &AccountSnapshot) {}
    fn save_log(&self, _player: PlayerId, _log: &EarningsLog) {}
    fn save_points(&self, _player: PlayerId, _points: &PlayerPoints) {}
    fn record_limits(&self, _player: PlayerId, _limits: &PaymentLimits) {}
    fn update_seen(&self, _player: PlayerId, _seen_ms: i64) {}
}

/// All collaborator seams bundled as one resource.
#[derive(Resource)]
pub struct Collaborators {
    pub capabilities: Box<dyn CapabilityResolver>,
    pub equations: Box<dyn LimitEquationSource>,
    pub max_jobs: Box<dyn MaxJobsSource>,
    pub messenger: Box<dyn Messenger>,
    pub persistence: Box<dyn PersistenceSink>,
}

impl Collaborators {
    pub fn with_defaults(config: &ProgressionConfig) -> Self {
        Self {
            capabilities: Box::new(StaticCapabilityResolver::default()),
            equations: Box::new(ConfiguredLimitEquations::from_config(config)),
            max_jobs: Box::new(ConfiguredMaxJobs(config.default_max_jobs)),
            messenger: Box::new(LogMessenger),
            persistence: Box::new(JsonFileSink::new("saves")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_resolver_returns_zero_without_grants() {
        let mut resolver = StaticCapabilityResolver::default();
        let player = PlayerId::new(1);
        assert_eq!(resolver.max_value(player, "boost.farmer.money"), 0.0);
        assert!(!resolver.has_capability(player, "maxlevel.vip.farmer"));

        resolver.set_value(player, "boost.farmer.money", 0.25);
        resolver.grant(player, "maxlevel.vip.farmer");
        assert_eq!(resolver.max_value(player, "boost.farmer.money"), 0.25);
        assert!(resolver.has_capability(player, "maxlevel.vip.farmer"));
    }

    #[test]
    fn configured_equations_scale_with_total_level() {
        let config = ProgressionConfig::default();
        let equations = ConfiguredLimitEquations::from_config(&config);
        let low = equations.cap(Currency::Money, 1, 3);
        let high = equations.cap(Currency::Money, 50, 3);
        assert!(high > low);
    }
}
