//! CorePlugin wires the scaled gameplay clock every timed rule reads from.
use bevy::prelude::*;
#[cfg(feature = "core_debug")]
use bevy::time::TimerMode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const DEFAULT_TIME_SCALE: f32 = 1.0;
const MIN_TIME_SCALE: f32 = 0.001;

#[cfg(feature = "core_debug")]
#[derive(Resource)]
struct DebugTickTimer {
    timer: Timer,
}

#[cfg(feature = "core_debug")]
impl Default for DebugTickTimer {
    fn default() -> Self {
        Self {
            timer: Timer::from_seconds(1.0, TimerMode::Repeating),
        }
    }
}

/// Scaled gameplay timeline anchored to wall time at startup.
///
/// Boost freshness windows, quest expiries and payment-limit windows all
/// compare against `now_ms()`, so accelerating the time scale accelerates
/// every timed rule together.
#[derive(Resource, Debug)]
pub struct WorldTimeline {
    time_scale: f32,
    anchor_epoch_ms: i64,
    scaled_elapsed: Duration,
    last_scaled_delta: Duration,
}

impl WorldTimeline {
    /// Creates a timeline anchored to the current wall clock.
    pub fn new(time_scale: f32) -> Self {
        let anchor = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self::anchored(time_scale, anchor)
    }

    /// Creates a timeline with an explicit epoch anchor (deterministic tests).
    pub fn anchored(time_scale: f32, anchor_epoch_ms: i64) -> Self {
        Self {
            time_scale: time_scale.max(MIN_TIME_SCALE),
            anchor_epoch_ms,
            scaled_elapsed: Duration::ZERO,
            last_scaled_delta: Duration::ZERO,
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Last scaled delta after applying the multiplier.
    pub fn last_scaled_delta(&self) -> Duration {
        self.last_scaled_delta
    }

    /// Total scaled duration elapsed since the timeline was created.
    #[cfg_attr(not(feature = "core_debug"), allow(dead_code))]
    pub fn elapsed(&self) -> Duration {
        self.scaled_elapsed
    }

    /// Current gameplay timestamp in epoch milliseconds.
    pub fn now_ms(&self) -> i64 {
        self.anchor_epoch_ms + self.scaled_elapsed.as_millis() as i64
    }

    /// Applies a real frame delta, advancing scaled time.
    pub fn advance(&mut self, real_delta: Duration) {
        self.last_scaled_delta = real_delta.mul_f32(self.time_scale);
        self.scaled_elapsed += self.last_scaled_delta;
    }
}

impl Default for WorldTimeline {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_SCALE)
    }
}

/// Registers the gameplay timeline and its advance system.
#[derive(Debug, Clone, Copy)]
pub struct CorePlugin {
    time_scale: f32,
}

impl CorePlugin {
    pub const fn with_time_scale(time_scale: f32) -> Self {
        Self { time_scale }
    }
}

impl Default for CorePlugin {
    fn default() -> Self {
        Self::with_time_scale(DEFAULT_TIME_SCALE)
    }
}

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(WorldTimeline::new(self.time_scale))
            .add_systems(Startup, log_startup_time_scale)
            .add_systems(Update, advance_world_timeline);

        #[cfg(feature = "core_debug")]
        {
            app.insert_resource(DebugTickTimer::default())
                .add_systems(Update, log_timeline_ticks);
        }
    }
}

pub fn advance_world_timeline(mut timeline: ResMut<WorldTimeline>, time: Res<Time>) {
    timeline.advance(time.delta());
}

fn log_startup_time_scale(timeline: Res<WorldTimeline>) {
    info!(
        "CorePlugin initialised with time scale {:.3}, epoch anchor {}",
        timeline.time_scale(),
        timeline.now_ms()
    );
}

#[cfg(feature = "core_debug")]
fn log_timeline_ticks(mut timer: ResMut<DebugTickTimer>, timeline: Res<WorldTimeline>) {
    if timer.timer.tick(timeline.last_scaled_delta()).just_finished() {
        info!(
            target: "core_debug",
            "Timeline now: {} | scale: {:.3} | elapsed: {:.2}s | scaled dt: {:.4}s",
            timeline.now_ms(),
            timeline.time_scale(),
            timeline.elapsed().as_secs_f32(),
            timeline.last_scaled_delta().as_secs_f32(),
        );
    }
}
