//! Job, title and quest reference data loading and registry.
use std::collections::HashSet;
use std::{fs, path::Path};

use bevy::{log::warn, prelude::Resource};
use serde::Deserialize;

use super::components::{ActionType, DisplayMethod};

const JOBS_CONFIG_PATH: &str = "config/jobs.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub display: DisplayMethod,
    #[serde(default = "default_max_level")]
    pub max_level: i32,
    #[serde(default)]
    pub vip_max_level: i32,
    #[serde(default = "default_max_daily_quests")]
    pub max_daily_quests: usize,
    #[serde(default = "default_exp_base")]
    pub exp_base: f64,
    #[serde(default = "default_exp_quadratic")]
    pub exp_quadratic: f64,
    #[serde(default)]
    pub payouts: Vec<PayoutConfig>,
    #[serde(default)]
    pub titles: Vec<TitleConfig>,
    #[serde(default)]
    pub quests: Vec<QuestConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayoutConfig {
    pub action: ActionType,
    #[serde(default)]
    pub money: f64,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub experience: f64,
    #[serde(default)]
    pub per_level: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleConfig {
    pub level: i32,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestConfig {
    pub name: String,
    #[serde(default = "default_quest_min_level")]
    pub min_level: i32,
    #[serde(default)]
    pub max_level: i32,
    #[serde(default = "default_quest_duration_hours")]
    pub duration_hours: i64,
    #[serde(default)]
    pub reward_money: f64,
    #[serde(default)]
    pub reward_points: f64,
    pub objectives: Vec<ObjectiveConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectiveConfig {
    pub action: ActionType,
    pub target: String,
    #[serde(default = "default_objective_count")]
    pub count: u32,
}

fn default_max_level() -> i32 {
    30
}

fn default_max_daily_quests() -> usize {
    2
}

fn default_exp_base() -> f64 {
    10.0
}

fn default_exp_quadratic() -> f64 {
    4.0
}

fn default_quest_min_level() -> i32 {
    1
}

fn default_quest_duration_hours() -> i64 {
    24
}

fn default_objective_count() -> u32 {
    1
}

/// Per-action payout rates for one job.
#[derive(Debug, Clone)]
pub struct PayoutDef {
    pub action: ActionType,
    pub money: f64,
    pub points: f64,
    pub experience: f64,
    pub per_level: f64,
}

/// Honorific title granted from a given job level upward.
#[derive(Debug, Clone)]
pub struct TitleDef {
    pub level: i32,
    pub name: String,
    pub short_name: String,
}

/// One objective of a quest: reach `count` of `target_key` via `action`.
#[derive(Debug, Clone)]
pub struct ObjectiveDef {
    pub action: ActionType,
    pub target_key: String,
    pub count: u32,
}

/// Immutable quest definition owned by a job.
#[derive(Debug, Clone)]
pub struct QuestDef {
    name: String,
    min_level: i32,
    max_level: i32,
    duration_hours: i64,
    reward_money: f64,
    reward_points: f64,
    objectives: Vec<ObjectiveDef>,
}

impl QuestDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_hours * 3_600_000
    }

    pub fn reward_money(&self) -> f64 {
        self.reward_money
    }

    pub fn reward_points(&self) -> f64 {
        self.reward_points
    }

    pub fn objectives(&self) -> &[ObjectiveDef] {
        &self.objectives
    }

    fn available_at(&self, level: i32) -> bool {
        level >= self.min_level && (self.max_level == 0 || level <= self.max_level)
    }
}

/// Immutable job definition.
#[derive(Debug, Clone)]
pub struct JobDef {
    name: String,
    short_name: String,
    display: DisplayMethod,
    max_level: i32,
    vip_max_level: i32,
    max_daily_quests: usize,
    exp_base: f64,
    exp_quadratic: f64,
    payouts: Vec<PayoutDef>,
    titles: Vec<TitleDef>,
    quests: Vec<QuestDef>,
}

impl JobDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn display(&self) -> DisplayMethod {
        self.display
    }

    pub fn max_level(&self) -> i32 {
        self.max_level
    }

    pub fn vip_max_level(&self) -> i32 {
        self.vip_max_level
    }

    pub fn max_daily_quests(&self) -> usize {
        self.max_daily_quests
    }

    /// Experience required to clear the given level.
    pub fn max_experience(&self, level: i32) -> f64 {
        let level = level.max(1) as f64;
        self.exp_base * level + self.exp_quadratic * level * level
    }

    pub fn payout(&self, action: ActionType) -> Option<&PayoutDef> {
        self.payouts.iter().find(|p| p.action == action)
    }

    /// Highest title whose level requirement the given level meets.
    pub fn title_for(&self, level: i32) -> Option<&TitleDef> {
        self.titles.iter().filter(|t| t.level <= level).last()
    }

    pub fn quest(&self, name: &str) -> Option<&QuestDef> {
        self.quests
            .iter()
            .find(|q| q.name.eq_ignore_ascii_case(name))
    }

    pub fn quests(&self) -> &[QuestDef] {
        &self.quests
    }

    /// Deterministic candidate selection: the first quest in definition
    /// order available at `level` whose lowercase name is not excluded.
    pub fn next_quest(&self, exclude: &[String], level: i32) -> Option<&QuestDef> {
        self.quests.iter().find(|q| {
            q.available_at(level)
                && !exclude
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(&q.name))
        })
    }
}

/// Registry of all job definitions, loaded once at startup.
#[derive(Resource, Debug, Clone)]
pub struct JobRegistry {
    jobs: Vec<JobDef>,
}

impl JobRegistry {
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let data =
            fs::read_to_string(&path).map_err(|err| format!("unable to read file: {err}"))?;
        let config: JobsConfig =
            toml::from_str(&data).map_err(|err| format!("invalid jobs config: {err}"))?;
        Self::from_config(config)
    }

    pub fn from_config(config: JobsConfig) -> Result<Self, String> {
        if config.jobs.is_empty() {
            return Err("jobs config must define at least one job".to_string());
        }

        let mut jobs = Vec::new();
        let mut seen_names = HashSet::new();

        for job in config.jobs {
            let name = job.name.trim().to_string();
            if name.is_empty() {
                return Err("job name cannot be empty".to_string());
            }
            if name.contains([':', ';']) {
                return Err(format!("job name '{name}' contains reserved characters"));
            }
            if !seen_names.insert(name.to_lowercase()) {
                return Err(format!("duplicate job name '{name}'"));
            }
            if job.max_level < 1 {
                return Err(format!("job '{name}' must have max_level >= 1"));
            }

            let mut quests = Vec::new();
            let mut seen_quests = HashSet::new();
            for quest in job.quests {
                let qname = quest.name.trim().to_string();
                if qname.is_empty() || qname.contains([':', ';']) {
                    return Err(format!("job '{name}' has an invalid quest name '{qname}'"));
                }
                if !seen_quests.insert(qname.to_lowercase()) {
                    return Err(format!("job '{name}' defines quest '{qname}' twice"));
                }
                if quest.objectives.is_empty() {
                    return Err(format!(
                        "quest '{qname}' of job '{name}' must define at least one objective"
                    ));
                }

                quests.push(QuestDef {
                    name: qname,
                    min_level: quest.min_level.max(1),
                    max_level: quest.max_level.max(0),
                    duration_hours: quest.duration_hours.max(1),
                    reward_money: quest.reward_money.max(0.0),
                    reward_points: quest.reward_points.max(0.0),
                    objectives: quest
                        .objectives
                        .into_iter()
                        .map(|o| ObjectiveDef {
                            action: o.action,
                            target_key: o.target.trim().to_lowercase(),
                            count: o.count.max(1),
                        })
                        .collect(),
                });
            }

            let mut titles: Vec<TitleDef> = job
                .titles
                .into_iter()
                .map(|t| TitleDef {
                    level: t.level.max(1),
                    short_name: if t.short_name.is_empty() {
                        t.name.clone()
                    } else {
                        t.short_name
                    },
                    name: t.name,
                })
                .collect();
            titles.sort_by_key(|t| t.level);

            jobs.push(JobDef {
                short_name: if job.short_name.is_empty() {
                    name.chars().take(1).collect::<String>().to_uppercase()
                } else {
                    job.short_name
                },
                name,
                display: job.display,
                max_level: job.max_level,
                vip_max_level: job.vip_max_level.max(0),
                max_daily_quests: job.max_daily_quests,
                exp_base: job.exp_base.max(0.0),
                exp_quadratic: job.exp_quadratic.max(0.0),
                payouts: job
                    .payouts
                    .into_iter()
                    .map(|p| PayoutDef {
                        action: p.action,
                        money: p.money.max(0.0),
                        points: p.points.max(0.0),
                        experience: p.experience.max(0.0),
                        per_level: p.per_level.max(0.0),
                    })
                    .collect(),
                titles,
                quests,
            });
        }

        Ok(Self { jobs })
    }

    pub fn fallback() -> Self {
        let raw = r#"
            [[jobs]]
            name = "Farmer"
            short_name = "F"
            display = "full"
            max_level = 10
            vip_max_level = 20
            max_daily_quests = 3
            payouts = [
                { action = "gather", money = 2.0, experience = 3.0, per_level = 0.02 },
                { action = "craft", money = 1.0, experience = 1.5 },
            ]
            titles = [
                { level = 1, name = "Field Hand", short_name = "Hand" },
                { level = 5, name = "Sower" },
                { level = 10, name = "Harvest Master", short_name = "Master" },
            ]
            quests = [
                { name = "GrainRun", objectives = [{ action = "gather", target = "grain", count = 10 }] },
                { name = "SeedStock", objectives = [{ action = "gather", target = "seeds", count = 6 }] },
                { name = "MarketDay", objectives = [{ action = "trade", target = "grain", count = 3 }] },
                { name = "ScytheWork", min_level = 3, objectives = [{ action = "craft", target = "scythe", count = 1 }] },
                { name = "FallowField", min_level = 5, objectives = [{ action = "build", target = "fence", count = 4 }] },
            ]

            [[jobs]]
            name = "Miller"
            short_name = "M"
            display = "title"
            payouts = [
                { action = "craft", money = 2.5, experience = 2.0, per_level = 0.02 },
                { action = "trade", money = 1.0, points = 0.5 },
            ]
            titles = [{ level = 1, name = "Apprentice Miller", short_name = "Miller" }]
            quests = [
                { name = "FlourBatch", objectives = [{ action = "craft", target = "flour", count = 8 }] },
                { name = "GristDelivery", objectives = [{ action = "trade", target = "flour", count = 2 }] },
            ]

            [[jobs]]
            name = "Blacksmith"
            short_name = "B"
            display = "short_full"
            payouts = [
                { action = "craft", money = 4.0, experience = 4.0, per_level = 0.03 },
                { action = "build", money = 1.5, experience = 1.0 },
            ]
            titles = [{ level = 1, name = "Striker" }, { level = 8, name = "Forgemaster" }]
            quests = [
                { name = "ToolOrder", objectives = [{ action = "craft", target = "tools", count = 5 }] },
                { name = "HorseshoeSet", objectives = [{ action = "craft", target = "horseshoe", count = 4 }] },
            ]
        "#;

        let config: JobsConfig =
            toml::from_str(raw).expect("fallback jobs config should be valid toml");
        Self::from_config(config).expect("fallback jobs config should be valid")
    }

    pub fn job(&self, name: &str) -> Option<&JobDef> {
        self.jobs
            .iter()
            .find(|job| job.name.eq_ignore_ascii_case(name))
    }

    pub fn jobs(&self) -> &[JobDef] {
        &self.jobs
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        match Self::load_from_file(JOBS_CONFIG_PATH) {
            Ok(registry) => registry,
            Err(error) => {
                warn!(
                    "Failed to load jobs config from {}: {error}. Falling back to defaults.",
                    JOBS_CONFIG_PATH
                );
                Self::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_registry_is_valid() {
        let registry = JobRegistry::fallback();
        assert_eq!(registry.jobs().len(), 3);

        let farmer = registry.job("farmer").expect("farmer should exist");
        assert_eq!(farmer.max_level(), 10);
        assert_eq!(farmer.vip_max_level(), 20);
        assert_eq!(farmer.max_daily_quests(), 3);
        assert_eq!(farmer.quests().len(), 5);
    }

    #[test]
    fn next_quest_is_deterministic_and_respects_exclusions() {
        let registry = JobRegistry::fallback();
        let farmer = registry.job("Farmer").expect("farmer should exist");

        let first = farmer.next_quest(&[], 1).expect("candidate expected");
        assert_eq!(first.name(), "GrainRun");

        let excluded = vec!["grainrun".to_string(), "seedstock".to_string()];
        let third = farmer.next_quest(&excluded, 1).expect("candidate expected");
        assert_eq!(third.name(), "MarketDay");

        // level-gated quests stay hidden below their minimum level
        let all_low: Vec<String> = vec![
            "grainrun".into(),
            "seedstock".into(),
            "marketday".into(),
        ];
        assert_eq!(
            farmer.next_quest(&all_low, 1).map(QuestDef::name),
            None
        );
        assert_eq!(
            farmer.next_quest(&all_low, 3).map(QuestDef::name),
            Some("ScytheWork")
        );
    }

    #[test]
    fn title_selection_picks_highest_reached() {
        let registry = JobRegistry::fallback();
        let farmer = registry.job("Farmer").expect("farmer should exist");

        assert_eq!(farmer.title_for(1).map(|t| t.name.as_str()), Some("Field Hand"));
        assert_eq!(farmer.title_for(7).map(|t| t.name.as_str()), Some("Sower"));
        assert_eq!(
            farmer.title_for(10).map(|t| t.name.as_str()),
            Some("Harvest Master")
        );
    }

    #[test]
    fn duplicate_quest_names_are_rejected() {
        let raw = r#"
            [[jobs]]
            name = "Weaver"
            quests = [
                { name = "Bolt", objectives = [{ action = "craft", target = "cloth" }] },
                { name = "bolt", objectives = [{ action = "craft", target = "cloth" }] },
            ]
        "#;
        let config: JobsConfig = toml::from_str(raw).expect("toml should parse");
        assert!(JobRegistry::from_config(config).is_err());
    }

    #[test]
    fn max_experience_grows_with_level() {
        let registry = JobRegistry::fallback();
        let miller = registry.job("Miller").expect("miller should exist");
        assert!(miller.max_experience(2) > miller.max_experience(1));
        assert_eq!(miller.max_experience(1), 14.0);
    }
}
