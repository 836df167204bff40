//! Engine configuration derived from `config/guildhall.toml`.
use std::collections::HashMap;
use std::{fs, path::Path};

use bevy::prelude::*;
use serde::Deserialize;

use super::components::Currency;

const CONFIG_PATH: &str = "config/guildhall.toml";

#[derive(Debug, Clone, Deserialize, Default)]
struct RawEngineConfig {
    #[serde(default)]
    progression: RawProgression,
    #[serde(default)]
    boosts: RawBoosts,
    #[serde(default)]
    honorific: RawHonorific,
    #[serde(default)]
    payments: RawPayments,
    #[serde(default)]
    save: RawSave,
    #[serde(default)]
    limits: RawLimits,
    #[serde(default)]
    messages: RawMessages,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawProgression {
    level_loss_percentage: f64,
    level_loss_percentage_from_max: f64,
    fix_at_max_level: bool,
    rejoin_cooldown_hours: i64,
    max_jobs: i32,
}

impl Default for RawProgression {
    fn default() -> Self {
        Self {
            level_loss_percentage: 30.0,
            level_loss_percentage_from_max: 50.0,
            fix_at_max_level: false,
            rejoin_cooldown_hours: 0,
            max_jobs: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawBoosts {
    freshness_seconds: i64,
}

impl Default for RawBoosts {
    fn default() -> Self {
        Self {
            freshness_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawHonorific {
    prefix: String,
    suffix: String,
    separator: String,
    jobless_title: String,
}

impl Default for RawHonorific {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            separator: " ".to_string(),
            jobless_title: "Wanderer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawPayments {
    use_curve: bool,
    announcement_delay_seconds: i64,
}

impl Default for RawPayments {
    fn default() -> Self {
        Self {
            use_curve: false,
            announcement_delay_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawSave {
    period_minutes: i64,
}

impl Default for RawSave {
    fn default() -> Self {
        Self { period_minutes: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawLimits {
    #[serde(default)]
    money: RawCurrencyLimit,
    #[serde(default)]
    points: RawCurrencyLimit,
    #[serde(default)]
    exp: RawCurrencyLimit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawCurrencyLimit {
    enabled: bool,
    window_minutes: i64,
    base: f64,
    per_total_level: f64,
    per_max_jobs: f64,
}

impl Default for RawCurrencyLimit {
    fn default() -> Self {
        Self {
            enabled: false,
            window_minutes: 60,
            base: 1500.0,
            per_total_level: 10.0,
            per_max_jobs: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawMessages {
    limit_reached: String,
    limit_reached_detail: String,
    limit_curve_hint: String,
    limit_time_left: String,
}

impl Default for RawMessages {
    fn default() -> Self {
        Self {
            limit_reached: "You have reached your {currency} limit for now.".to_string(),
            limit_reached_detail: "Further {currency} earnings are paused until the window resets."
                .to_string(),
            limit_curve_hint: "Earnings taper near the cap; lighter work still counts.".to_string(),
            limit_time_left: "{currency} limit resets in {time}".to_string(),
        }
    }
}

/// Validated runtime configuration for the progression engine.
#[derive(Resource, Debug, Clone)]
pub struct ProgressionConfig {
    pub decay: DecaySettings,
    pub rejoin_cooldown_hours: i64,
    pub default_max_jobs: i32,
    pub boost_window_ms: i64,
    pub honorific: HonorificSettings,
    pub use_payment_curve: bool,
    pub announce_delay_ms: i64,
    pub save_period_ms: i64,
    limits: HashMap<Currency, CurrencyLimitSettings>,
    pub messages: LimitMessages,
}

#[derive(Debug, Clone)]
pub struct DecaySettings {
    pub standard_pct: f64,
    pub from_max_pct: f64,
    pub fix_at_max: bool,
}

#[derive(Debug, Clone)]
pub struct HonorificSettings {
    pub prefix: String,
    pub suffix: String,
    pub separator: String,
    pub jobless_title: String,
}

#[derive(Debug, Clone)]
pub struct CurrencyLimitSettings {
    pub enabled: bool,
    pub window_ms: i64,
    pub base: f64,
    pub per_total_level: f64,
    pub per_max_jobs: f64,
}

#[derive(Debug, Clone)]
pub struct LimitMessages {
    pub reached: String,
    pub reached_detail: String,
    pub curve_hint: String,
    pub time_left: String,
}

impl ProgressionConfig {
    pub fn load_or_default() -> Self {
        let path = Path::new(CONFIG_PATH);
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<RawEngineConfig>(&raw) {
                Ok(parsed) => parsed.into(),
                Err(err) => {
                    warn!(
                        "Failed to parse {} ({}). Falling back to defaults.",
                        CONFIG_PATH, err
                    );
                    RawEngineConfig::default().into()
                }
            },
            Err(err) => {
                warn!(
                    "Failed to read {} ({}). Falling back to defaults.",
                    CONFIG_PATH, err
                );
                RawEngineConfig::default().into()
            }
        }
    }

    /// Parses configuration from a TOML string (embedding hosts and tests).
    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str::<RawEngineConfig>(raw)
            .map(Into::into)
            .map_err(|err| format!("invalid engine config: {err}"))
    }

    pub fn limit(&self, currency: Currency) -> &CurrencyLimitSettings {
        // populated for every currency during conversion
        &self.limits[&currency]
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        RawEngineConfig::default().into()
    }
}

impl From<RawEngineConfig> for ProgressionConfig {
    fn from(value: RawEngineConfig) -> Self {
        let decay = DecaySettings {
            standard_pct: value.progression.level_loss_percentage.clamp(0.0, 100.0),
            from_max_pct: value
                .progression
                .level_loss_percentage_from_max
                .clamp(0.0, 100.0),
            fix_at_max: value.progression.fix_at_max_level,
        };

        let honorific = HonorificSettings {
            prefix: value.honorific.prefix,
            suffix: value.honorific.suffix,
            separator: value.honorific.separator,
            jobless_title: value.honorific.jobless_title,
        };

        let mut limits = HashMap::new();
        for (currency, raw) in [
            (Currency::Money, value.limits.money),
            (Currency::Points, value.limits.points),
            (Currency::Experience, value.limits.exp),
        ] {
            limits.insert(
                currency,
                CurrencyLimitSettings {
                    enabled: raw.enabled,
                    window_ms: raw.window_minutes.max(1) * 60_000,
                    base: raw.base.max(0.0),
                    per_total_level: raw.per_total_level,
                    per_max_jobs: raw.per_max_jobs,
                },
            );
        }

        Self {
            decay,
            rejoin_cooldown_hours: value.progression.rejoin_cooldown_hours.max(0),
            default_max_jobs: value.progression.max_jobs.max(1),
            boost_window_ms: value.boosts.freshness_seconds.max(1) * 1_000,
            honorific,
            use_payment_curve: value.payments.use_curve,
            announce_delay_ms: value.payments.announcement_delay_seconds.max(0) * 1_000,
            save_period_ms: value.save.period_minutes.max(1) * 60_000,
            limits,
            messages: LimitMessages {
                reached: value.messages.limit_reached,
                reached_detail: value.messages.limit_reached_detail,
                curve_hint: value.messages.limit_curve_hint,
                time_left: value.messages.limit_time_left,
            },
        }
    }
}
