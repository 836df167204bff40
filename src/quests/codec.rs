//! Compact wire format for persisted quest progress.
//!
//! One segment per quest, joined by `;:;`. Each segment carries
//! `job:quest:expiry:` followed by `ACTION;objective;count` triples joined
//! by `:;:`. Parsing skips segments whose job or quest no longer exists and
//! survives malformed segments, keeping everything that parsed cleanly.
use bevy::log::warn;

use crate::jobs::{components::ActionType, data::JobRegistry};

use super::{progress::QuestProgression, rotation::QuestLog};

const SEGMENT_SEP: &str = ";:;";
const OBJECTIVE_SEP: &str = ":;:";

/// Renders the full quest state as a single string, or `None` when empty.
pub fn serialize(log: &QuestLog) -> Option<String> {
    let mut segments = Vec::new();

    for prog in log.progressions() {
        if prog.objectives().is_empty() {
            continue;
        }

        let triples: Vec<String> = prog
            .objectives()
            .iter()
            .map(|o| format!("{};{};{}", o.action.name(), o.target_key, o.done))
            .collect();

        segments.push(format!(
            "{}:{}:{}:{}",
            prog.job(),
            prog.quest_name(),
            prog.valid_until_ms(),
            triples.join(OBJECTIVE_SEP)
        ));
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join(SEGMENT_SEP))
    }
}

/// Restores quest state from the wire string into `log`. Each segment is an
/// independent unit of work: failures are logged and skipped.
pub fn parse(input: &str, registry: &JobRegistry, log: &mut QuestLog) {
    if input.is_empty() {
        return;
    }

    for segment in input.split(SEGMENT_SEP) {
        match parse_segment(segment, registry) {
            Ok(Some(prog)) => log.insert(prog),
            Ok(None) => {}
            Err(err) => warn!("Skipping unreadable quest segment '{segment}': {err}"),
        }
    }
}

fn parse_segment(
    segment: &str,
    registry: &JobRegistry,
) -> Result<Option<QuestProgression>, String> {
    let mut parts = segment.splitn(4, ':');
    let job_name = parts.next().ok_or("missing job name")?;
    let quest_name = parts.next().ok_or("missing quest name")?;
    let expiry = parts.next().ok_or("missing expiry timestamp")?;
    let objectives = parts.next().unwrap_or("");

    let Some(job) = registry.job(job_name) else {
        return Ok(None);
    };
    let Some(quest) = job.quest(quest_name) else {
        return Ok(None);
    };

    let valid_until: i64 = expiry
        .trim()
        .parse()
        .map_err(|_| format!("invalid expiry '{expiry}'"))?;

    // anchoring assignment one duration before expiry reproduces the
    // original assignment time for eviction ordering
    let mut prog = QuestProgression::from_def(job.name(), quest, valid_until - quest.duration_ms());

    for triple in objectives.split(OBJECTIVE_SEP).filter(|t| !t.is_empty()) {
        let fields: Vec<&str> = triple.split(';').collect();
        if fields.len() != 3 {
            return Err(format!("invalid objective entry '{triple}'"));
        }

        let Some(action) = ActionType::from_name(fields[0]) else {
            continue;
        };
        let done: u32 = fields[2]
            .trim()
            .parse()
            .map_err(|_| format!("invalid objective count '{}'", fields[2]))?;
        prog.set_done(action, fields[1], done);
    }

    // a quest restored already complete must not hand out its reward again
    if prog.is_completed() {
        prog.set_reward_given(true);
    }

    Ok(Some(prog))
}
