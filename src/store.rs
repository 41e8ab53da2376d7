//! Persisted state layout
//!
//! The engine defines what is stored and how it changes; reading and writing
//! the bytes is left to the caller. Timestamps are passed in, never read here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::LetterCatalog;
use crate::config::{SchedulerConfig, SessionConfig};
use crate::error::EngineResult;
use crate::progress::ProgressBook;
use crate::sanitize::{sanitize_book, SanitizeReport};
use crate::types::LetterId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfile {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub total_stars: u32,
    pub current_level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameScore {
    pub game_type: String,
    pub score: u8,
    pub played_at: DateTime<Utc>,
    pub duration_secs: u32,
}

/// Activity totals for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySession {
    pub date: NaiveDate,
    pub total_minutes: u32,
    pub activities_completed: u32,
    pub stars_earned: u32,
    pub letters_studied: Vec<LetterId>,
}

impl DailySession {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_minutes: 0,
            activities_completed: 0,
            stars_earned: 0,
            letters_studied: Vec::new(),
        }
    }
}

/// Everything the app persists between launches
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressStore {
    pub profile: Option<ChildProfile>,
    pub letter_progress: ProgressBook,
    pub game_scores: Vec<GameScore>,
    pub daily_sessions: Vec<DailySession>,
    pub session_start_time: Option<DateTime<Utc>>,
}

impl ProgressStore {
    /// Parses a stored snapshot and repairs it against the catalog
    pub fn from_json(
        json: &str,
        catalog: &LetterCatalog,
        scheduler: &SchedulerConfig,
        today: NaiveDate,
    ) -> EngineResult<(Self, SanitizeReport)> {
        let mut store: Self = serde_json::from_str(json)?;
        let report = if store.profile.is_some() || !store.letter_progress.is_empty() {
            sanitize_book(&mut store.letter_progress, catalog, scheduler, today)
        } else {
            SanitizeReport::default()
        };
        Ok((store, report))
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ==================== Profile ====================

    /// Creates the profile and the initial letter set
    pub fn create_profile(
        &mut self,
        name: impl Into<String>,
        avatar: impl Into<String>,
        now: DateTime<Utc>,
        catalog: &LetterCatalog,
        scheduler: &SchedulerConfig,
    ) -> &ChildProfile {
        self.initialize_letter_progress(catalog, scheduler, now.date_naive());
        tracing::info!(letters = self.letter_progress.len(), "profile created");
        self.profile.insert(ChildProfile {
            id: now.timestamp_millis().to_string(),
            name: name.into(),
            avatar: avatar.into(),
            created_at: now,
            total_stars: 0,
            current_level: 1,
        })
    }

    /// Renames the profile; false when no profile exists
    pub fn update_profile(&mut self, name: impl Into<String>, avatar: impl Into<String>) -> bool {
        match self.profile.as_mut() {
            Some(profile) => {
                profile.name = name.into();
                profile.avatar = avatar.into();
                true
            }
            None => false,
        }
    }

    pub fn initialize_letter_progress(
        &mut self,
        catalog: &LetterCatalog,
        scheduler: &SchedulerConfig,
        today: NaiveDate,
    ) {
        self.letter_progress = ProgressBook::initial_with(catalog, scheduler, today);
    }

    /// Credits stars to the profile and to today's session when one is open
    pub fn add_stars(&mut self, count: u32, today: NaiveDate) {
        let Some(profile) = self.profile.as_mut() else {
            return;
        };
        profile.total_stars = profile.total_stars.saturating_add(count);
        if let Some(session) = self.session_mut(today) {
            session.stars_earned = session.stars_earned.saturating_add(count);
        }
    }

    // ==================== Games ====================

    /// Appends a game score, keeping only the most recent `max_scores`
    pub fn record_game_score(
        &mut self,
        game_type: impl Into<String>,
        score: u8,
        duration_secs: u32,
        now: DateTime<Utc>,
        config: &SessionConfig,
    ) {
        self.game_scores.push(GameScore {
            game_type: game_type.into(),
            score: score.min(100),
            played_at: now,
            duration_secs,
        });
        let overflow = self.game_scores.len().saturating_sub(config.max_game_scores);
        if overflow > 0 {
            self.game_scores.drain(..overflow);
        }
    }

    // ==================== Sessions ====================

    fn session_mut(&mut self, date: NaiveDate) -> Option<&mut DailySession> {
        self.daily_sessions.iter_mut().find(|s| s.date == date)
    }

    pub fn session(&self, date: NaiveDate) -> Option<&DailySession> {
        self.daily_sessions.iter().find(|s| s.date == date)
    }

    /// Opens today's session record if missing and starts the clock
    pub fn start_session(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.session(today).is_none() {
            self.daily_sessions.push(DailySession::new(today));
        }
        self.session_start_time = Some(now);
    }

    /// Stops the clock and adds the elapsed whole minutes to today's session
    pub fn end_session(&mut self, now: DateTime<Utc>) -> Option<u32> {
        let start = self.session_start_time.take()?;
        let seconds = (now - start).num_seconds().max(0);
        let minutes = (seconds as f64 / 60.0).round() as u32;
        if let Some(session) = self.session_mut(now.date_naive()) {
            session.total_minutes = session.total_minutes.saturating_add(minutes);
        }
        Some(minutes)
    }

    pub fn add_letter_to_session(&mut self, letter_id: &str, today: NaiveDate) {
        if let Some(session) = self.session_mut(today) {
            if !session.letters_studied.iter().any(|id| id == letter_id) {
                session.letters_studied.push(letter_id.to_string());
            }
        }
    }

    pub fn add_activity_to_session(&mut self, today: NaiveDate) {
        if let Some(session) = self.session_mut(today) {
            session.activities_completed = session.activities_completed.saturating_add(1);
        }
    }

    /// Starts over while keeping who the child is
    pub fn reset_progress(&mut self, catalog: &LetterCatalog, scheduler: &SchedulerConfig, today: NaiveDate) {
        self.initialize_letter_progress(catalog, scheduler, today);
        self.game_scores.clear();
        self.daily_sessions.clear();
        self.session_start_time = None;
        if let Some(profile) = self.profile.as_mut() {
            profile.total_stars = 0;
            profile.current_level = 1;
        }
        tracing::info!("progress reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 9, 0, 0).unwrap()
    }

    fn profiled() -> (LetterCatalog, ProgressStore) {
        let catalog = LetterCatalog::builtin();
        let mut store = ProgressStore::default();
        store.create_profile("Ada", "owl", now(), &catalog, &SchedulerConfig::default());
        (catalog, store)
    }

    #[test]
    fn test_create_profile_initializes_letters() {
        let (_, store) = profiled();
        let profile = store.profile.as_ref().unwrap();
        assert_eq!(profile.current_level, 1);
        assert_eq!(profile.id, now().timestamp_millis().to_string());
        assert_eq!(store.letter_progress.len(), 29);
        assert_eq!(store.letter_progress.unlocked_count(), 3);
    }

    #[test]
    fn test_new_records_take_configured_ease() {
        let catalog = LetterCatalog::builtin();
        let scheduler = SchedulerConfig {
            default_ease_factor: 1.8,
            ..SchedulerConfig::default()
        };
        let mut store = ProgressStore::default();
        store.create_profile("Ada", "owl", now(), &catalog, &scheduler);
        assert!(store.letter_progress.iter().all(|p| p.ease_factor == 1.8));

        store.reset_progress(&catalog, &SchedulerConfig::default(), now().date_naive());
        assert!(store.letter_progress.iter().all(|p| p.ease_factor == 2.0));
    }

    #[test]
    fn test_update_profile_without_profile() {
        let mut store = ProgressStore::default();
        assert!(!store.update_profile("x", "y"));
        let (_, mut store) = profiled();
        assert!(store.update_profile("Ece", "cat"));
        assert_eq!(store.profile.unwrap().avatar, "cat");
    }

    #[test]
    fn test_stars_credit_open_session() {
        let (_, mut store) = profiled();
        let today = now().date_naive();
        store.add_stars(2, today);
        assert!(store.session(today).is_none());

        store.start_session(now());
        store.add_stars(3, today);
        assert_eq!(store.profile.as_ref().unwrap().total_stars, 5);
        assert_eq!(store.session(today).unwrap().stars_earned, 3);
    }

    #[test]
    fn test_game_scores_capped() {
        let (_, mut store) = profiled();
        let config = SessionConfig::default();
        for i in 0..105u32 {
            store.record_game_score("balloon", (i % 100) as u8, 30, now(), &config);
        }
        assert_eq!(store.game_scores.len(), 100);
        assert_eq!(store.game_scores[0].score, 5);
    }

    #[test]
    fn test_session_lifecycle() {
        let (_, mut store) = profiled();
        let today = now().date_naive();
        assert_eq!(store.end_session(now()), None);

        store.start_session(now());
        store.add_letter_to_session("E", today);
        store.add_letter_to_session("E", today);
        store.add_letter_to_session("A", today);
        store.add_activity_to_session(today);
        assert_eq!(store.end_session(now() + Duration::seconds(7 * 60 + 40)), Some(8));

        // a second session the same day reuses the record
        store.start_session(now() + Duration::minutes(30));
        assert_eq!(store.end_session(now() + Duration::minutes(32)), Some(2));

        let session = store.session(today).unwrap();
        assert_eq!(store.daily_sessions.len(), 1);
        assert_eq!(session.letters_studied, vec!["E", "A"]);
        assert_eq!(session.activities_completed, 1);
        assert_eq!(session.total_minutes, 10);
    }

    #[test]
    fn test_reset_keeps_identity() {
        let (catalog, mut store) = profiled();
        let today = now().date_naive();
        store.start_session(now());
        store.add_stars(4, today);
        store
            .letter_progress
            .update_letter_stage(&catalog, "E", Stage::Complete, Some(90))
            .unwrap();
        store.record_game_score("train", 80, 10, now(), &SessionConfig::default());

        let before = store.profile.clone().unwrap();
        store.reset_progress(&catalog, &SchedulerConfig::default(), today);
        let after = store.profile.clone().unwrap();
        assert_eq!((after.id, after.name, after.created_at), (before.id, before.name, before.created_at));
        assert_eq!(after.total_stars, 0);
        assert!(store.game_scores.is_empty());
        assert!(store.daily_sessions.is_empty());
        assert_eq!(store.letter_progress.stage("E"), Some(Stage::Introduce));
    }

    #[test]
    fn test_json_load_sanitizes() {
        let (catalog, store) = profiled();
        let mut value = serde_json::to_value(&store).unwrap();
        value["letterProgress"]["E"]["easeFactor"] = serde_json::json!(7.5);
        value["letterProgress"]["E"]["masteryScore"] = serde_json::json!(-40);
        value["letterProgress"]["L"]["stage"] = serde_json::json!(12);

        let (loaded, report) = ProgressStore::from_json(
            &value.to_string(),
            &catalog,
            &SchedulerConfig::default(),
            now().date_naive(),
        )
        .unwrap();
        assert_eq!(report.repaired, 2);
        let e = loaded.letter_progress.get("E").unwrap();
        assert_eq!(e.ease_factor, 2.5);
        assert_eq!(e.mastery_score, 0);
        let l = loaded.letter_progress.get("L").unwrap();
        assert_eq!(l.stage, Stage::Complete);
        assert!(l.unlocked);
    }

    #[test]
    fn test_json_round_trip() {
        let (catalog, store) = profiled();
        let json = store.to_json().unwrap();
        let (loaded, report) =
            ProgressStore::from_json(&json, &catalog, &SchedulerConfig::default(), now().date_naive())
                .unwrap();
        assert!(report.is_clean());
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_first_run_snapshot_stays_empty() {
        let catalog = LetterCatalog::builtin();
        let (loaded, _) =
            ProgressStore::from_json("{}", &catalog, &SchedulerConfig::default(), now().date_naive())
                .unwrap();
        assert!(loaded.profile.is_none());
        assert!(loaded.letter_progress.is_empty());
    }
}
