//! Honorific assembly from job display methods and title definitions.
use crate::jobs::{
    components::DisplayMethod,
    config::HonorificSettings,
    data::{JobDef, JobRegistry},
};

use super::progression::JobProgression;

/// Builds the displayed honorific from every joined job's display method.
/// Jobs no longer present in the registry are skipped.
pub fn compose(
    progression: &[JobProgression],
    registry: &JobRegistry,
    settings: &HonorificSettings,
) -> String {
    let mut fragments = Vec::new();

    for prog in progression {
        let Some(def) = registry.job(prog.job()) else {
            continue;
        };
        if let Some(fragment) = job_fragment(def, prog.level()) {
            fragments.push(fragment);
        }
    }

    let body = if fragments.is_empty() {
        if progression.is_empty() {
            settings.jobless_title.clone()
        } else {
            String::new()
        }
    } else {
        fragments.join(&settings.separator)
    };

    let body = body.trim().to_string();
    if body.is_empty() {
        return body;
    }
    format!("{}{}{}", settings.prefix, body, settings.suffix)
}

fn job_fragment(def: &JobDef, level: i32) -> Option<String> {
    let title = def.title_for(level);
    let title_full = title.map(|t| templated(&t.name, level));
    let title_short = title.map(|t| templated(&t.short_name, level));
    let job_full = templated(def.name(), level);
    let job_short = templated(def.short_name(), level);

    let fragment = match def.display() {
        DisplayMethod::None => return None,
        DisplayMethod::Full => join(title_full, Some(job_full)),
        DisplayMethod::Title => join(title_full, None),
        DisplayMethod::Job => Some(job_full),
        DisplayMethod::ShortFull => join(title_short, Some(job_short)),
        DisplayMethod::ShortTitle => join(title_short, None),
        DisplayMethod::ShortJob => Some(job_short),
        DisplayMethod::ShortTitleJob => join(title_short, Some(job_full)),
        DisplayMethod::TitleShortJob => join(title_full, Some(job_short)),
    };

    fragment.filter(|f| !f.is_empty())
}

fn templated(text: &str, level: i32) -> String {
    text.replace("{level}", &level.to_string())
}

fn join(title: Option<String>, job: Option<String>) -> Option<String> {
    match (title, job) {
        (Some(t), Some(j)) => Some(format!("{t} {j}")),
        (Some(t), None) => Some(t),
        (None, Some(j)) => Some(j),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::data::JobRegistry;

    fn settings() -> HonorificSettings {
        HonorificSettings {
            prefix: "[".to_string(),
            suffix: "]".to_string(),
            separator: " | ".to_string(),
            jobless_title: "Wanderer".to_string(),
        }
    }

    fn progression_for(registry: &JobRegistry, job: &str, level: i32) -> JobProgression {
        let def = registry.job(job).expect("job should exist");
        JobProgression::new(def, level, 0.0)
    }

    #[test]
    fn full_display_combines_title_and_job() {
        let registry = JobRegistry::fallback();
        let prog = vec![progression_for(&registry, "Farmer", 5)];
        assert_eq!(compose(&prog, &registry, &settings()), "[Sower Farmer]");
    }

    #[test]
    fn title_display_omits_the_job_name() {
        let registry = JobRegistry::fallback();
        let prog = vec![progression_for(&registry, "Miller", 1)];
        assert_eq!(compose(&prog, &registry, &settings()), "[Apprentice Miller]");
    }

    #[test]
    fn short_full_uses_short_forms() {
        let registry = JobRegistry::fallback();
        let prog = vec![progression_for(&registry, "Blacksmith", 1)];
        // Striker has no explicit short name, so it falls back to the full one
        assert_eq!(compose(&prog, &registry, &settings()), "[Striker B]");
    }

    #[test]
    fn multiple_jobs_are_separated() {
        let registry = JobRegistry::fallback();
        let prog = vec![
            progression_for(&registry, "Farmer", 1),
            progression_for(&registry, "Miller", 1),
        ];
        assert_eq!(
            compose(&prog, &registry, &settings()),
            "[Field Hand Farmer | Apprentice Miller]"
        );
    }

    #[test]
    fn jobless_players_get_the_fallback_title() {
        let registry = JobRegistry::fallback();
        assert_eq!(compose(&[], &registry, &settings()), "[Wanderer]");
    }
}
