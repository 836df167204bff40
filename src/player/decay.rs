//! Rejoin decay math applied when a player picks a job back up.
use crate::jobs::config::DecaySettings;

/// Level kept after rejoining a job that was left at `archived_level`.
///
/// At the job's max level the from-max rate replaces the standard rate,
/// unless levels are fixed at max. Never drops below 1.
pub fn level_after_rejoin(archived_level: i32, max_level: i32, decay: &DecaySettings) -> i32 {
    if archived_level == max_level {
        if decay.fix_at_max {
            return archived_level;
        }
        return apply_level_loss(archived_level, decay.from_max_pct);
    }
    apply_level_loss(archived_level, decay.standard_pct)
}

fn apply_level_loss(level: i32, pct: f64) -> i32 {
    let lost = (level as f64 * (pct / 100.0)).floor() as i32;
    (level - lost).max(1)
}

/// Experience kept after rejoining, clamped to the new level's maximum.
///
/// The rate mirrors `level_after_rejoin`: from-max when the archived level
/// was max and not fixed, standard when below max, none when the clamped
/// experience is zero or levels are fixed at max.
pub fn exp_after_rejoin(
    archived_level: i32,
    archived_exp: f64,
    max_exp_for_new_level: f64,
    max_level: i32,
    decay: &DecaySettings,
) -> f64 {
    let mut exp = archived_exp.clamp(0.0, max_exp_for_new_level.max(0.0));
    if exp <= 0.0 {
        return 0.0;
    }

    if archived_level == max_level {
        if !decay.fix_at_max {
            exp -= exp * (decay.from_max_pct / 100.0);
        }
    } else {
        exp -= exp * (decay.standard_pct / 100.0);
    }

    exp.max(0.0)
}
