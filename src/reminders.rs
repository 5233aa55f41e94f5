use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::config::TUNE_PROMPT_TIMEOUT_SECS;
use crate::error::Result;
use crate::notify::QueueCmd;
use crate::types::{Notification, NotificationKind, Reminder, Sport};

// ---------------------------------------------------------------------------
// Host collaborator traits
// ---------------------------------------------------------------------------

/// Host-provided confirmation dialog for tune-carrying reminders. The answer
/// arrives through the oneshot; the caller applies the default action when
/// none arrives within the timeout.
pub trait TunePrompt: Send + Sync {
    fn confirm(&self, reminder: &Reminder, answer: oneshot::Sender<bool>) -> Result<()>;
}

/// Host-provided playback control.
pub trait HostTuner: Send + Sync {
    fn tune(&self, service_ref: &str) -> Result<()>;
}

/// Headless default: logs the prompt and gives no answer, so the timeout's
/// default action applies.
pub struct LogTunePrompt;

impl TunePrompt for LogTunePrompt {
    fn confirm(&self, reminder: &Reminder, _answer: oneshot::Sender<bool>) -> Result<()> {
        info!(match_name = %reminder.match_name, "tune prompt: {}", reminder.label);
        Ok(())
    }
}

pub struct LogTuner;

impl HostTuner for LogTuner {
    fn tune(&self, service_ref: &str) -> Result<()> {
        info!(service_ref, "tuning");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reminder book
// ---------------------------------------------------------------------------

/// User-scheduled one-shot alerts. No two entries share `(match, trigger)`.
pub struct ReminderBook {
    entries: Vec<Reminder>,
}

impl ReminderBook {
    pub fn from_entries(entries: Vec<Reminder>) -> Self {
        let mut book = Self { entries: Vec::new() };
        for reminder in entries {
            book.add(reminder);
        }
        book
    }

    /// False when an identical `(match, trigger)` already exists.
    pub fn add(&mut self, reminder: Reminder) -> bool {
        if self.entries.iter().any(|r| r.key() == reminder.key()) {
            return false;
        }
        self.entries.push(reminder);
        true
    }

    pub fn remove(&mut self, match_name: &str, trigger_unix: u64) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|r| r.key() != (match_name, trigger_unix));
        self.entries.len() != before
    }

    /// Drain every reminder whose trigger time has passed. Each fires exactly
    /// once; drained entries are gone from the book.
    pub fn take_due(&mut self, now_unix: u64) -> Vec<Reminder> {
        let (due, keep) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|r| r.trigger_unix <= now_unix);
        self.entries = keep;
        due
    }

    pub fn entries(&self) -> &[Reminder] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Firing
// ---------------------------------------------------------------------------

/// Fire one due reminder. Plain reminders become a toast; tune-carrying ones
/// open a confirmation with a 30 s inactivity window whose default action is
/// to tune.
pub fn fire(
    reminder: Reminder,
    notify_tx: &mpsc::Sender<QueueCmd>,
    prompt: &Arc<dyn TunePrompt>,
    tuner: &Arc<dyn HostTuner>,
) {
    if reminder.tune_ref.is_none() {
        if let Err(e) = notify_tx.try_send(QueueCmd::Enqueue(reminder_toast(&reminder))) {
            warn!("notification channel full, dropping reminder toast: {e}");
        }
        return;
    }

    let prompt = Arc::clone(prompt);
    let tuner = Arc::clone(tuner);
    tokio::spawn(async move {
        let (answer_tx, answer_rx) = oneshot::channel();
        if let Err(e) = prompt.confirm(&reminder, answer_tx) {
            warn!(match_name = %reminder.match_name, "tune prompt unavailable: {e}");
            return;
        }
        let timeout = Duration::from_secs(TUNE_PROMPT_TIMEOUT_SECS);
        let tune = match tokio::time::timeout(timeout, answer_rx).await {
            Ok(Ok(answer)) => answer,
            // No answer within the window, or the prompt went away.
            Ok(Err(_)) | Err(_) => true,
        };
        if tune {
            if let Some(service_ref) = reminder.tune_ref.as_deref() {
                if let Err(e) = tuner.tune(service_ref) {
                    warn!(service_ref, "tune failed: {e}");
                }
            }
        }
    });
}

fn reminder_toast(reminder: &Reminder) -> Notification {
    Notification {
        kind: NotificationKind::Reminder,
        sport: Sport::Other,
        league: reminder.league.clone(),
        home: reminder.match_name.clone(),
        away: String::new(),
        score: String::new(),
        label: reminder.label.clone(),
        home_logo_url: reminder.home_logo_url.clone(),
        away_logo_url: reminder.away_logo_url.clone(),
        scoring_side: None,
        sound: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn reminder(name: &str, trigger: u64) -> Reminder {
        Reminder {
            match_name: name.to_string(),
            trigger_unix: trigger,
            league: "Premier League".to_string(),
            label: "Starts soon".to_string(),
            home_logo_url: None,
            away_logo_url: None,
            tune_ref: None,
        }
    }

    #[test]
    fn identical_match_and_trigger_is_rejected() {
        let mut book = ReminderBook::from_entries(Vec::new());
        assert!(book.add(reminder("Derby", 100)));
        assert!(!book.add(reminder("Derby", 100)));
        // Same match, different trigger is a different reminder.
        assert!(book.add(reminder("Derby", 200)));
        assert_eq!(book.entries().len(), 2);
    }

    #[test]
    fn due_reminders_fire_exactly_once() {
        let mut book =
            ReminderBook::from_entries(vec![reminder("Early", 50), reminder("Late", 500)]);

        let due = book.take_due(100);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].match_name, "Early");

        // A second sweep at the same time finds nothing.
        assert!(book.take_due(100).is_empty());
        assert_eq!(book.entries().len(), 1);
    }

    #[test]
    fn remove_targets_the_exact_key() {
        let mut book = ReminderBook::from_entries(vec![reminder("Derby", 100)]);
        assert!(!book.remove("Derby", 999));
        assert!(book.remove("Derby", 100));
        assert!(book.is_empty());
    }

    struct RecordingTuner {
        tuned: Mutex<Vec<String>>,
    }

    impl HostTuner for RecordingTuner {
        fn tune(&self, service_ref: &str) -> Result<()> {
            self.tuned.lock().unwrap().push(service_ref.to_string());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_tune_prompt_defaults_to_tuning() {
        let (notify_tx, _notify_rx) = mpsc::channel(8);
        let prompt: Arc<dyn TunePrompt> = Arc::new(LogTunePrompt);
        let tuner_impl = Arc::new(RecordingTuner { tuned: Mutex::new(Vec::new()) });
        let tuner: Arc<dyn HostTuner> = tuner_impl.clone();

        let mut due = reminder("Derby", 100);
        due.tune_ref = Some("1:0:19:2B66".to_string());
        fire(due, &notify_tx, &prompt, &tuner);

        // Let the 30 s inactivity window elapse.
        tokio::time::sleep(Duration::from_secs(TUNE_PROMPT_TIMEOUT_SECS + 1)).await;
        assert_eq!(tuner_impl.tuned.lock().unwrap().as_slice(), ["1:0:19:2B66"]);
    }

    #[tokio::test]
    async fn plain_reminder_becomes_a_toast() {
        let (notify_tx, mut notify_rx) = mpsc::channel(8);
        let prompt: Arc<dyn TunePrompt> = Arc::new(LogTunePrompt);
        let tuner: Arc<dyn HostTuner> = Arc::new(LogTuner);

        fire(reminder("Derby", 100), &notify_tx, &prompt, &tuner);

        match notify_rx.try_recv().unwrap() {
            QueueCmd::Enqueue(toast) => {
                assert_eq!(toast.kind, NotificationKind::Reminder);
                assert_eq!(toast.home, "Derby");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
