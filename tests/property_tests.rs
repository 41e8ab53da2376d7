//! Property-based tests for the engine invariants

use chrono::NaiveDate;
use proptest::prelude::*;

use letter_mastery::sanitize::sanitize_letter_progress;
use letter_mastery::{
    AttemptResult, CorridorValidator, LetterCatalog, LetterProgress, PathSampler, ArcSampling,
    ProgressBook, Quality, SchedulerConfig, SpacedRepetitionScheduler, Stage,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

fn stage_strategy() -> impl Strategy<Value = Stage> {
    prop::sample::select(Stage::ALL.to_vec())
}

proptest! {
    #[test]
    fn ease_stays_in_bounds(start in 1.3f64..=2.5, qualities in prop::collection::vec(0u8..=5, 1..60)) {
        let scheduler = SpacedRepetitionScheduler::default();
        let mut ease = start;
        for q in qualities {
            ease = scheduler.ease_after(ease, Quality::new(q).unwrap());
            prop_assert!((1.3..=2.5).contains(&ease));
        }
    }

    #[test]
    fn repeated_failures_floor_at_minimum(start in 1.3f64..=2.5, n in 1usize..40) {
        let scheduler = SpacedRepetitionScheduler::default();
        let mut ease = start;
        for _ in 0..n {
            ease = scheduler.ease_after(ease, Quality::new(0).unwrap());
        }
        prop_assert!(ease >= 1.3);
    }

    #[test]
    fn stage_never_decreases(
        requests in prop::collection::vec((stage_strategy(), prop::option::of(-50i32..150)), 1..30),
        answers in prop::collection::vec(any::<bool>(), 0..20),
    ) {
        let catalog = LetterCatalog::builtin();
        let mut book = ProgressBook::initial(&catalog, today());
        let scheduler = SpacedRepetitionScheduler::default();
        let mut last = book.stage("A").unwrap();

        for (i, (stage, mastery)) in requests.into_iter().enumerate() {
            let _ = book.update_letter_stage(&catalog, "A", stage, mastery);
            if let Some(&correct) = answers.get(i) {
                scheduler.process_attempt(&mut book, "A", &AttemptResult::new(correct, 2500), today());
                let _ = book.advance_if_eligible(&catalog, "A");
            }
            let now = book.stage("A").unwrap();
            prop_assert!(now >= last);
            let p = book.get("A").unwrap();
            prop_assert!((0..=100).contains(&p.mastery_score));
            prop_assert!(p.stage < Stage::Trace || p.unlocked);
            last = now;
        }
    }

    #[test]
    fn straight_line_validates_against_itself(
        x0 in 0.0f64..200.0, y0 in 0.0f64..200.0,
        x1 in 0.0f64..200.0, y1 in 0.0f64..200.0,
        density in 2usize..50,
    ) {
        let sampler = PathSampler::new(density, ArcSampling::Endpoint);
        let points = sampler.sample(&format!("M {x0},{y0} L {x1},{y1}"));
        prop_assert_eq!(points.len(), density + 1);
        let verdict = CorridorValidator::default().validate(&[points.clone()], &points);
        prop_assert_eq!(verdict.inside_ratio, 100);
        prop_assert_eq!(verdict.coverage_ratio, 100);
    }

    #[test]
    fn unlock_twice_is_unlock_once(index in 0usize..29) {
        let catalog = LetterCatalog::builtin();
        let id = catalog.by_order(index as u32 + 1).unwrap().letter_id.clone();
        let mut once = ProgressBook::initial(&catalog, today());
        once.unlock_letter(&id).unwrap();
        let mut twice = once.clone();
        prop_assert_eq!(twice.unlock_letter(&id), Ok(false));
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn sanitizer_restores_ranges(
        mastery in any::<i32>(),
        ease in prop_oneof![any::<f64>(), Just(f64::NAN), Just(f64::INFINITY)],
        stage in stage_strategy(),
        unlocked in any::<bool>(),
        attempts in 0u32..100,
        correct in 0u32..200,
        streak in any::<u32>(),
        best in any::<u8>(),
    ) {
        let config = SchedulerConfig::default();
        let mut p = LetterProgress::new("E", unlocked, today());
        p.mastery_score = mastery;
        p.ease_factor = ease;
        p.stage = stage;
        p.attempts = attempts;
        p.correct_attempts = correct;
        p.consecutive_correct = streak;
        p.best_trace_score = best;

        sanitize_letter_progress(&mut p, &config);
        prop_assert!((0..=100).contains(&p.mastery_score));
        prop_assert!((1.3..=2.5).contains(&p.ease_factor));
        prop_assert!(p.correct_attempts <= p.attempts);
        prop_assert!(p.consecutive_correct <= p.correct_attempts);
        prop_assert!(p.best_trace_score <= 100);
        prop_assert!(p.stage < Stage::Trace || p.unlocked);

        // a second pass finds nothing left to fix
        prop_assert!(!sanitize_letter_progress(&mut p, &config));
    }
}
