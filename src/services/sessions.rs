// src/services/sessions.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    engine::sequencer::Sequencer,
    error::AppError,
    models::{attempt::Submission, learner::LearnerIdentity, question::PublicQuestion},
    repository::DynRepository,
    services::submission::{SubmissionOutcome, submit},
};

/// One in-progress quiz, owned by a single learner.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: Uuid,
    pub owner: LearnerIdentity,
    pub sequencer: Sequencer,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Client-facing snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    /// Zero-based index of the question on screen.
    pub position: usize,
    pub question: PublicQuestion,
    pub selected: Option<String>,
    pub asked: usize,
    pub answered: usize,
    pub remaining: usize,
    /// Last question reached and nothing left to draw.
    pub can_submit: bool,
    pub expires_at: DateTime<Utc>,
    pub seconds_left: i64,
}

impl QuizSession {
    pub fn new(
        owner: LearnerIdentity,
        sequencer: Sequencer,
        now: DateTime<Utc>,
        budget: Duration,
    ) -> Self {
        let budget = chrono::Duration::from_std(budget).unwrap_or(chrono::Duration::MAX);
        Self {
            id: Uuid::new_v4(),
            owner,
            sequencer,
            started_at: now,
            expires_at: now.checked_add_signed(budget).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn view(&self, now: DateTime<Utc>) -> SessionView {
        let s = &self.sequencer;
        SessionView {
            session_id: self.id,
            position: s.cursor(),
            question: PublicQuestion::from(s.current()),
            selected: s.selected().map(str::to_string),
            asked: s.sequence().len(),
            answered: s.answers().len(),
            remaining: s.remaining(),
            can_submit: s.is_exhausted(),
            expires_at: self.expires_at,
            seconds_left: (self.expires_at - now).num_seconds().max(0),
        }
    }

    /// Freezes the sequence and answers for scoring. Time taken is capped at the budget.
    pub fn submission(&self, now: DateTime<Utc>) -> Submission {
        let elapsed = (now.min(self.expires_at) - self.started_at).num_seconds().max(0);
        Submission {
            question_order: self.sequencer.question_order(),
            answers: self.sequencer.answers().clone(),
            time_taken_secs: u32::try_from(elapsed).ok(),
        }
    }
}

/// Result of touching a session that may have run out of time.
#[derive(Debug)]
pub enum Access<T> {
    Live(T),
    /// Removed from the store; the caller must submit it.
    Expired(QuizSession),
}

/// Process-wide registry of running sessions.
///
/// Every operation is synchronous; the lock is never held across an await.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, QuizSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, QuizSession>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, session: QuizSession) {
        self.lock().insert(session.id, session);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` on a live session owned by `email`.
    pub fn access<T>(
        &self,
        id: Uuid,
        email: &str,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut QuizSession) -> Result<T, AppError>,
    ) -> Result<Access<T>, AppError> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(&id)
            .filter(|s| s.owner.email == email)
            .ok_or_else(session_not_found)?;

        if session.is_expired(now) {
            let expired = sessions.remove(&id).ok_or_else(session_not_found)?;
            return Ok(Access::Expired(expired));
        }

        f(session).map(Access::Live)
    }

    /// Removes a session owned by `email`, regardless of expiry.
    pub fn take(&self, id: Uuid, email: &str) -> Result<QuizSession, AppError> {
        let mut sessions = self.lock();
        match sessions.get(&id) {
            Some(s) if s.owner.email == email => sessions.remove(&id).ok_or_else(session_not_found),
            _ => Err(session_not_found()),
        }
    }

    /// Puts back a session whose submission failed so it can be retried.
    pub fn restore(&self, session: QuizSession) {
        self.lock().entry(session.id).or_insert(session);
    }

    pub fn drain_expired(&self, now: DateTime<Utc>) -> Vec<QuizSession> {
        let mut sessions = self.lock();
        let expired: Vec<Uuid> = sessions
            .values()
            .filter(|s| s.is_expired(now))
            .map(|s| s.id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| sessions.remove(&id))
            .collect()
    }
}

fn session_not_found() -> AppError {
    AppError::NotFound("Session not found".to_string())
}

/// Scores and records a session exactly as an explicit submission would.
pub async fn submit_session(
    repo: &DynRepository,
    session: &QuizSession,
    now: DateTime<Utc>,
) -> Result<SubmissionOutcome, AppError> {
    submit(repo.as_ref(), &session.owner, session.submission(now)).await
}

/// Submits a session that is already out of the store.
///
/// On failure the session goes back into `sessions` untouched, so the
/// learner (or the reaper) can submit it again.
pub async fn submit_or_restore(
    repo: &DynRepository,
    sessions: &SessionStore,
    session: QuizSession,
) -> Result<SubmissionOutcome, AppError> {
    match submit_session(repo, &session, Utc::now()).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::error!("Submitting session {} failed: {}", session.id, e);
            sessions.restore(session);
            Err(e)
        }
    }
}

/// Periodically auto-submits sessions whose time budget has elapsed.
pub fn spawn_reaper(repo: DynRepository, sessions: SessionStore, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let expired = sessions.drain_expired(Utc::now());
            for session in expired {
                let (id, email) = (session.id, session.owner.email.clone());
                // Failures are restored and retried on the next tick.
                if let Ok(outcome) = submit_or_restore(&repo, &sessions, session).await {
                    tracing::info!(
                        "Auto-submitted expired session {} for {} ({} / {})",
                        id,
                        email,
                        outcome.attempt.score,
                        outcome.attempt.total
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        engine::difficulty::Difficulty,
        models::{
            account::{Account, NewAccount},
            learner::LearnerRecord,
            question::{NewQuestion, Question, QuestionOption},
        },
        repository::{MemoryRepository, QuizRepository},
    };

    /// Store that is down: every call fails.
    #[derive(Default)]
    struct UnavailableRepository {
        lookups: AtomicUsize,
    }

    fn unavailable() -> AppError {
        AppError::InternalServerError("store unavailable".to_string())
    }

    #[async_trait]
    impl QuizRepository for UnavailableRepository {
        async fn find_questions_by_ids(&self, _ids: &[i64]) -> Result<Vec<Question>, AppError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        }

        async fn find_all_questions(&self, _limit: i64) -> Result<Vec<Question>, AppError> {
            Err(unavailable())
        }

        async fn insert_questions(
            &self,
            _questions: Vec<NewQuestion>,
        ) -> Result<Vec<Question>, AppError> {
            Err(unavailable())
        }

        async fn find_learner_by_email(
            &self,
            _email: &str,
        ) -> Result<Option<LearnerRecord>, AppError> {
            Err(unavailable())
        }

        async fn upsert_learner_record(&self, _record: &LearnerRecord) -> Result<(), AppError> {
            Err(unavailable())
        }

        async fn find_account_by_email(&self, _email: &str) -> Result<Option<Account>, AppError> {
            Err(unavailable())
        }

        async fn insert_account(&self, _account: NewAccount) -> Result<Account, AppError> {
            Err(unavailable())
        }
    }

    fn bank() -> Vec<Question> {
        (1..=3)
            .map(|id| Question {
                id,
                question_text: format!("Question {id}"),
                options: vec![
                    QuestionOption { text: "yes".to_string(), is_correct: true },
                    QuestionOption { text: "no".to_string(), is_correct: false },
                ],
                difficulty: Difficulty::ALL[(id - 1) as usize],
                topic: "t".to_string(),
                marks: 1,
                created_at: None,
            })
            .collect()
    }

    fn session(now: DateTime<Utc>, budget_secs: u64) -> QuizSession {
        let mut rng = StdRng::seed_from_u64(5);
        let sequencer = Sequencer::start(bank(), &mut rng).unwrap();
        QuizSession::new(
            LearnerIdentity { email: "a@example.com".to_string(), name: None },
            sequencer,
            now,
            Duration::from_secs(budget_secs),
        )
    }

    #[test]
    fn access_is_limited_to_owner() {
        let store = SessionStore::new();
        let now = Utc::now();
        let s = session(now, 60);
        let id = s.id;
        store.insert(s);

        assert!(matches!(
            store.access(id, "b@example.com", now, |_| Ok(())),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.access(id, "a@example.com", now, |_| Ok(())),
            Ok(Access::Live(()))
        ));
        assert!(store.take(id, "b@example.com").is_err());
        assert!(store.take(id, "a@example.com").is_ok());
        assert!(store.is_empty());
    }

    #[test]
    fn expired_session_is_handed_back_for_submission() {
        let store = SessionStore::new();
        let now = Utc::now();
        let s = session(now, 10);
        let id = s.id;
        store.insert(s);

        let later = now + chrono::Duration::seconds(11);
        match store.access(id, "a@example.com", later, |_| Ok(())).unwrap() {
            Access::Expired(expired) => {
                assert_eq!(expired.id, id);
                assert_eq!(expired.submission(later).time_taken_secs, Some(10));
            }
            Access::Live(()) => panic!("session should have expired"),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn drain_takes_only_expired_sessions() {
        let store = SessionStore::new();
        let now = Utc::now();
        store.insert(session(now, 5));
        store.insert(session(now, 500));

        let drained = store.drain_expired(now + chrono::Duration::seconds(6));
        assert_eq!(drained.len(), 1);
        assert_eq!(store.len(), 1);

        store.restore(drained.into_iter().next().unwrap());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn view_reports_progress() {
        let now = Utc::now();
        let mut s = session(now, 60);
        s.sequencer.select("yes").unwrap();
        let view = s.view(now);
        assert_eq!(view.position, 0);
        assert_eq!(view.question.difficulty, Difficulty::Medium);
        assert_eq!(view.selected.as_deref(), Some("yes"));
        assert_eq!(view.asked, 1);
        assert_eq!(view.answered, 1);
        assert_eq!(view.remaining, 2);
        assert!(!view.can_submit);
        assert_eq!(view.seconds_left, 60);
    }

    #[tokio::test]
    async fn submit_failure_puts_session_back() {
        let repo: DynRepository = Arc::new(UnavailableRepository::default());
        let store = SessionStore::new();
        let s = session(Utc::now(), 60);
        let id = s.id;

        let result = submit_or_restore(&repo, &store, s).await;
        assert!(matches!(result, Err(AppError::InternalServerError(_))));
        assert_eq!(store.len(), 1);
        assert!(store.take(id, "a@example.com").is_ok());
    }

    #[tokio::test]
    async fn reaper_submits_expired_sessions() {
        let memory = Arc::new(MemoryRepository::new());
        let repo: DynRepository = memory.clone();
        let store = SessionStore::new();
        store.insert(session(Utc::now() - chrono::Duration::seconds(120), 60));
        store.insert(session(Utc::now(), 600));

        let reaper = spawn_reaper(repo, store.clone(), Duration::from_secs(3600));

        let mut record = None;
        for _ in 0..100 {
            record = memory.find_learner_by_email("a@example.com").await.unwrap();
            if record.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        reaper.abort();

        let record = record.expect("expired session was not submitted");
        assert_eq!(record.attempts.len(), 1);
        assert_eq!(record.attempts[0].time_taken_secs, Some(60));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn reaper_keeps_sessions_it_could_not_submit() {
        let failing = Arc::new(UnavailableRepository::default());
        let repo: DynRepository = failing.clone();
        let store = SessionStore::new();
        let expired = session(Utc::now() - chrono::Duration::seconds(120), 60);
        let id = expired.id;
        store.insert(expired);

        let reaper = spawn_reaper(repo, store.clone(), Duration::from_secs(3600));

        let mut restored = false;
        for _ in 0..100 {
            // the session is restored after the failed lookup
            if failing.lookups.load(Ordering::SeqCst) > 0 && store.len() == 1 {
                restored = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        reaper.abort();

        assert!(restored);
        assert!(store.take(id, "a@example.com").is_ok());
    }
}
