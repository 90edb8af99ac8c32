use std::sync::{Arc, Mutex};

use replydesk_core::{
    ActivityDigest, HostMode, Profile, ResolutionState, Ticket, Tone, ValidationError, draft_reply,
    sanitize_email, validate_email,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::RuntimeConfig;
use crate::fallback::{QueryParams, fallback_ticket};
use crate::host::{self, FileHostSdk, HostCapabilityLoader, HostSdk};
use crate::lookup::ProfileLookup;
use crate::session::SessionStore;

/// Everything the presentation layer renders, published on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WidgetSnapshot {
    pub state: ResolutionState,
    /// Message of the last failed attempt; only meaningful in `error`.
    pub error: Option<String>,
    pub ticket: Ticket,
    pub profile: Option<Profile>,
    pub activity: ActivityDigest,
    pub tone: Tone,
    pub reply: String,
    pub host_mode: HostMode,
    /// Last applied manual email (also the fallback email source).
    pub manual_email: Option<String>,
    /// Generation of the most recently started attempt.
    pub generation: u64,
}

impl WidgetSnapshot {
    fn redraft(&mut self) {
        self.reply = draft_reply(self.tone, &self.ticket, self.profile.as_ref(), &self.activity);
    }
}

/// How a resolution attempt ended from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    /// The attempt was authoritative and its outcome is now the widget state.
    Applied(ResolutionState),
    /// Superseded, cancelled or timed out; nothing was applied.
    Discarded,
}

#[derive(Debug)]
enum Outcome {
    Missing(Ticket),
    NotFound(Ticket),
    Ready {
        ticket: Ticket,
        profile: Profile,
        activity: ActivityDigest,
    },
    Failed {
        ticket: Ticket,
        message: String,
    },
    Cancelled,
}

#[derive(Debug)]
struct AttemptReport {
    host_mode: HostMode,
    outcome: Outcome,
}

#[derive(Default)]
struct Inner {
    snapshot: WidgetSnapshot,
    active: Option<CancellationToken>,
}

/// Orchestrates host context, fallback sources, profile lookup and reply
/// drafting behind a single state machine.
///
/// At most one attempt is authoritative. Starting an attempt bumps the
/// generation and cancels the previous token; an attempt's outcome is
/// computed without touching shared state and applied in one critical
/// section only if its generation is still current.
pub struct ResolutionController {
    host: HostCapabilityLoader,
    lookup: ProfileLookup,
    session: SessionStore,
    query: QueryParams,
    inner: Mutex<Inner>,
    updates: watch::Sender<WidgetSnapshot>,
}

impl ResolutionController {
    /// Build the controller, restoring the remembered manual email.
    pub async fn new(
        host: HostCapabilityLoader,
        lookup: ProfileLookup,
        session: SessionStore,
        query: QueryParams,
    ) -> Self {
        let snapshot = WidgetSnapshot {
            manual_email: session.remembered_email().await,
            ..WidgetSnapshot::default()
        };
        let (updates, _) = watch::channel(snapshot.clone());
        Self {
            host,
            lookup,
            session,
            query,
            inner: Mutex::new(Inner {
                snapshot,
                active: None,
            }),
            updates,
        }
    }

    /// Wire the controller from runtime configuration.
    pub async fn from_config(config: &RuntimeConfig, query: QueryParams) -> Self {
        let sdk = config
            .host_fields
            .as_ref()
            .map(|path| Arc::new(FileHostSdk::new(path)) as Arc<dyn HostSdk>);
        Self::new(
            HostCapabilityLoader::new(sdk),
            ProfileLookup::from_config(config),
            SessionStore::from_state_dir(config.state_dir.as_deref()),
            query,
        )
        .await
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetSnapshot> {
        self.updates.subscribe()
    }

    pub fn state(&self) -> ResolutionState {
        self.lock().snapshot.state
    }

    pub fn reply(&self) -> String {
        self.lock().snapshot.reply.clone()
    }

    /// Re-run resolution from scratch (mount, refresh button).
    pub async fn refresh(&self) -> AttemptStatus {
        self.resolve(None).await
    }

    /// Retry affordance of the `error` state; same path as refresh.
    pub async fn retry(&self) -> AttemptStatus {
        self.refresh().await
    }

    /// Validate and remember a manually entered email, then resolve with it
    /// as the override. Validation failures never touch the state machine.
    pub async fn submit_manual_email(&self, raw: &str) -> Result<AttemptStatus, ValidationError> {
        let email = validate_email(raw)?;
        if let Err(err) = self.session.remember(&email).await {
            tracing::warn!(error = %err, "failed to persist manual email");
        }
        self.update(|inner| inner.snapshot.manual_email = Some(email.clone()));
        Ok(self.resolve(Some(email)).await)
    }

    /// Soft trigger: store the tone and redraft from held data, no refetch.
    pub fn set_tone(&self, tone: Tone) {
        self.update(|inner| {
            let snap = &mut inner.snapshot;
            snap.tone = tone;
            if snap.state.allows_redraft() {
                snap.redraft();
            }
        });
    }

    /// Replace the draft with a fresh one. Ignored while loading.
    pub fn regenerate_reply(&self) -> bool {
        self.update(|inner| {
            let snap = &mut inner.snapshot;
            if snap.state == ResolutionState::Loading {
                return false;
            }
            snap.redraft();
            true
        })
    }

    /// User edit of the draft; authoritative until the next redraft.
    pub fn edit_reply(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|inner| inner.snapshot.reply = text);
    }

    /// Drop the live attempt, if any. Its results will be discarded.
    pub fn cancel(&self) {
        let active = self.lock().active.take();
        if let Some(token) = active {
            token.cancel();
        }
    }

    /// Run one resolution attempt, superseding any attempt in flight.
    pub async fn resolve(&self, override_email: Option<String>) -> AttemptStatus {
        let token = CancellationToken::new();
        let (generation, remembered) = self.update(|inner| {
            if let Some(previous) = inner.active.replace(token.clone()) {
                previous.cancel();
            }
            let snap = &mut inner.snapshot;
            snap.generation += 1;
            snap.state = ResolutionState::Loading;
            snap.error = None;
            (snap.generation, snap.manual_email.clone())
        });
        tracing::debug!(generation, "resolution attempt started");

        let report = self
            .run_attempt(&token, override_email, remembered.as_deref())
            .await;
        self.apply(generation, &token, report)
    }

    async fn run_attempt(
        &self,
        token: &CancellationToken,
        override_email: Option<String>,
        remembered: Option<&str>,
    ) -> AttemptReport {
        let (mut ticket, host_mode) = self.ticket_from_sources(remembered).await;
        let report = |outcome| AttemptReport { host_mode, outcome };

        if let Some(email) = override_email.filter(|e| !e.is_empty()) {
            ticket.email = email;
        }
        ticket.email = sanitize_email(&ticket.email);
        if !ticket.has_email() {
            return report(Outcome::Missing(ticket));
        }

        let found = self.lookup.lookup(&ticket.email, token).await;
        let profile = match found {
            Ok(Some(profile)) => profile,
            Ok(None) => return report(Outcome::NotFound(ticket)),
            Err(err) if err.is_cancelled() => return report(Outcome::Cancelled),
            Err(err) => {
                tracing::warn!(email = %ticket.email, error = %err, "profile lookup failed");
                return report(Outcome::Failed {
                    ticket,
                    message: err.to_string(),
                });
            }
        };

        let recent = self.lookup.recent_activity(&profile.id, token).await;
        let activity = match recent {
            Ok(activity) => activity,
            Err(err) if err.is_cancelled() => return report(Outcome::Cancelled),
            Err(err) => {
                tracing::warn!(profile_id = %profile.id, error = %err, "activity fetch failed; continuing without it");
                ActivityDigest::empty()
            }
        };

        report(Outcome::Ready {
            ticket,
            profile,
            activity,
        })
    }

    /// Host fields when the capability is present and usable, fallback
    /// sources otherwise. Host trouble never fails the attempt.
    async fn ticket_from_sources(&self, remembered: Option<&str>) -> (Ticket, HostMode) {
        match self.host.acquire().await {
            Some(client) => match host::read_ticket(client.as_ref()).await {
                Ok(ticket) => return (ticket, HostMode::Connected),
                Err(err) => {
                    tracing::warn!(error = %err, "host capability present but unusable; using fallback sources");
                }
            },
            None => tracing::debug!("no host capability; using fallback sources"),
        }
        (fallback_ticket(&self.query, remembered), HostMode::Local)
    }

    fn apply(&self, generation: u64, token: &CancellationToken, report: AttemptReport) -> AttemptStatus {
        let mut inner = self.lock();
        let owns_slot = inner.snapshot.generation == generation;
        if !owns_slot || token.is_cancelled() || matches!(report.outcome, Outcome::Cancelled) {
            if owns_slot {
                inner.active = None;
            }
            tracing::debug!(generation, "resolution attempt discarded");
            return AttemptStatus::Discarded;
        }
        inner.active = None;

        let snap = &mut inner.snapshot;
        snap.host_mode = report.host_mode;
        let state = match report.outcome {
            Outcome::Missing(ticket) => {
                snap.ticket = ticket;
                snap.profile = None;
                snap.activity = ActivityDigest::empty();
                ResolutionState::Missing
            }
            Outcome::NotFound(ticket) => {
                snap.ticket = ticket;
                snap.profile = None;
                snap.activity = ActivityDigest::empty();
                ResolutionState::NotFound
            }
            Outcome::Ready {
                ticket,
                profile,
                activity,
            } => {
                snap.ticket = ticket;
                snap.profile = Some(profile);
                snap.activity = activity;
                ResolutionState::Ready
            }
            Outcome::Failed { ticket, message } => {
                // profile and activity keep the last successful resolution
                snap.ticket = ticket;
                snap.error = Some(message);
                ResolutionState::Error
            }
            Outcome::Cancelled => return AttemptStatus::Discarded,
        };
        snap.state = state;
        if state != ResolutionState::Error {
            snap.redraft();
        }
        tracing::info!(
            generation,
            state = %state,
            source = ?snap.host_mode,
            "resolution attempt applied"
        );
        self.updates.send_replace(snap.clone());
        AttemptStatus::Applied(state)
    }

    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.lock();
        let out = f(&mut inner);
        self.updates.send_replace(inner.snapshot.clone());
        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ResolutionController {
    fn drop(&mut self) {
        self.cancel();
    }
}
