use tracing::debug;

use crate::constants::RESUME_PROMPT_THRESHOLD_SECS;
use crate::models::{ItemDetails, Ticks};

/// User's answer to the resume prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    Resume,
    StartOver,
}

/// Outcome of negotiating the start point. `Prompt` is a pause in the load
/// flow, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    Prompt { resume_at: Ticks },
    StartAt(Ticks),
}

pub fn should_prompt(resume_position: Ticks, watched: bool) -> bool {
    !watched && resume_position.as_secs_f64() > RESUME_PROMPT_THRESHOLD_SECS
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeNegotiator;

impl ResumeNegotiator {
    pub fn negotiate(&self, item: &ItemDetails, start_from_beginning: bool) -> ResumeDecision {
        if start_from_beginning {
            debug!("Starting {} from the beginning on request", item.id);
            return ResumeDecision::StartAt(Ticks::ZERO);
        }

        if should_prompt(item.resume_position, item.played) {
            ResumeDecision::Prompt {
                resume_at: item.resume_position,
            }
        } else {
            ResumeDecision::StartAt(Ticks::ZERO)
        }
    }

    pub fn resolve(&self, choice: ResumeChoice, resume_at: Ticks) -> Ticks {
        match choice {
            ResumeChoice::Resume => resume_at,
            ResumeChoice::StartOver => Ticks::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemKind, MediaItemId, ProviderIds};

    fn item(resume_secs: u64, played: bool) -> ItemDetails {
        ItemDetails {
            id: MediaItemId::new("item-1"),
            name: "Episode".into(),
            kind: ItemKind::Episode,
            overview: None,
            run_time: Ticks::from_secs(3000),
            resume_position: Ticks::from_secs(resume_secs),
            played,
            provider_ids: ProviderIds::default(),
            series_id: None,
            series_name: None,
            season_number: Some(1),
            episode_number: Some(3),
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!should_prompt(Ticks::from_secs(30), false));
        assert!(should_prompt(Ticks(300_000_001), false));
        assert!(!should_prompt(Ticks::ZERO, false));
    }

    #[test]
    fn test_watched_never_prompts() {
        for secs in [0, 31, 45, 10_000] {
            assert!(!should_prompt(Ticks::from_secs(secs), true));
        }
    }

    #[test]
    fn test_prompt_offers_stored_position() {
        let negotiator = ResumeNegotiator;
        assert_eq!(
            negotiator.negotiate(&item(45, false), false),
            ResumeDecision::Prompt {
                resume_at: Ticks::from_secs(45)
            }
        );
    }

    #[test]
    fn test_start_from_beginning_skips_prompt() {
        let negotiator = ResumeNegotiator;
        assert_eq!(
            negotiator.negotiate(&item(45, false), true),
            ResumeDecision::StartAt(Ticks::ZERO)
        );
    }

    #[test]
    fn test_short_resume_starts_at_zero() {
        let negotiator = ResumeNegotiator;
        assert_eq!(
            negotiator.negotiate(&item(12, false), false),
            ResumeDecision::StartAt(Ticks::ZERO)
        );
    }

    #[test]
    fn test_choice_resolution() {
        let negotiator = ResumeNegotiator;
        let at = Ticks::from_secs(45);
        assert_eq!(negotiator.resolve(ResumeChoice::Resume, at), at);
        assert_eq!(negotiator.resolve(ResumeChoice::StartOver, at), Ticks::ZERO);
    }
}
