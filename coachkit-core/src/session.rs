//! Chat session coordinator
//!
//! [`ChatSession`] owns everything a single conversation needs: the store,
//! the tool instances inside it, the nudge engine with its cooldowns, the
//! activity tracker, and the timer queue. Hosts call its methods for user
//! actions and call [`ChatSession::pump_timers`] regularly (once a second is
//! plenty) to deliver countdown ticks, nudge expiry and background trigger
//! evaluation.
//!
//! ## Timers
//!
//! | Timer | Kind | Owner |
//! |-------|------|-------|
//! | Countdown tick | every 1s while running or on break | one per countdown instance |
//! | Nudge auto-dismiss | one-shot | keyed by nudge id |
//! | Idle check | every `nudges.idle_check_secs` | session |
//!
//! A countdown's tick is re-synced after every applied transition, and reset
//! cancels it before the state changes. A tick delivered under a handle the
//! instance no longer owns is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::activity::{ActivityTracker, InputEvent};
use crate::backend::{reply_with_retry, ReplyBackend};
use crate::clock::Clock;
use crate::config::{Config, NudgeConfig, SessionConfig};
use crate::directive::DirectiveParser;
use crate::error::{Error, Result};
use crate::nudge::{CooldownRegistry, FrustrationDetector, NudgeEngine};
use crate::scheduler::{TaskHandle, TaskScheduler};
use crate::store::{SessionAction, SessionState, SessionStore, Subscription};
use crate::tools::{CountdownAction, ToolAction, ToolEvent, ToolInstance, Transition};
use crate::types::{
    ChatTurn, DailyStats, Locale, Message, Nudge, NudgeContext, Role, ToolKind, TriggerKind,
};

/// Events delivered by the session's timer queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    CountdownTick { instance_id: String },
    NudgeExpired { nudge_id: String },
    IdleCheck,
}

/// What happened to a sent message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The assistant replied; `tool_id` is set when the reply carried a tool card
    Replied {
        message_id: String,
        tool_id: Option<String>,
    },
    /// The backend failed; a localized system message was appended instead
    Failed { message_id: String },
}

/// A reply request started by [`ChatSession::begin_send`].
pub struct PendingReply {
    backend: Arc<dyn ReplyBackend>,
    history: Vec<ChatTurn>,
    max_retries: usize,
}

impl PendingReply {
    /// Transcript sent to the backend, system notices excluded
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Call the backend, retrying transient failures.
    pub async fn fetch(self) -> Result<String> {
        reply_with_retry(self.backend.as_ref(), &self.history, self.max_retries).await
    }
}

pub struct ChatSession {
    store: SessionStore,
    engine: NudgeEngine,
    cooldowns: CooldownRegistry,
    activity: ActivityTracker,
    scheduler: TaskScheduler<TimerEvent>,
    parser: DirectiveParser,
    frustration: FrustrationDetector,
    backend: Arc<dyn ReplyBackend>,
    clock: Arc<dyn Clock>,
    nudge_config: NudgeConfig,
    session_config: SessionConfig,
    max_retries: usize,
    stats: DailyStats,
    /// Live nudge id and its auto-dismiss timer
    nudge_timer: Option<(String, TaskHandle)>,
    /// Tick timer owned by each running countdown
    tick_handles: HashMap<String, TaskHandle>,
    /// Set by a frustrated user message, consumed by the next evaluation
    frustration_pending: bool,
    is_first_visit: bool,
}

impl ChatSession {
    /// Create a session. Starts the background idle check when nudges are enabled.
    pub fn new(config: &Config, backend: Arc<dyn ReplyBackend>, clock: Arc<dyn Clock>) -> Result<Self> {
        config.nudges.validate()?;

        let mut engine = NudgeEngine::new();
        for name in &config.nudges.disabled_triggers {
            let kind: TriggerKind = name.parse().map_err(Error::Config)?;
            engine.disable(kind);
        }

        let now = clock.now();
        let mut scheduler = TaskScheduler::new();
        if config.nudges.enabled {
            scheduler.schedule_every(
                now.with_timezone(&Utc),
                Duration::seconds(config.nudges.idle_check_secs as i64),
                TimerEvent::IdleCheck,
            );
        }

        Ok(Self {
            store: SessionStore::new(),
            engine,
            cooldowns: CooldownRegistry::new(),
            activity: ActivityTracker::new(now.with_timezone(&Utc)),
            scheduler,
            parser: DirectiveParser::new(),
            frustration: FrustrationDetector::new(config.session.locale),
            backend,
            clock,
            nudge_config: config.nudges.clone(),
            session_config: config.session.clone(),
            max_retries: config.reply.max_retries,
            stats: DailyStats::new(now.date_naive()),
            nudge_timer: None,
            tick_handles: HashMap::new(),
            frustration_pending: false,
            is_first_visit: true,
        })
    }

    /// Resume today's counters (e.g. loaded from the database).
    pub fn with_daily_stats(mut self, stats: DailyStats) -> Self {
        self.stats = stats;
        self.roll_over_day();
        self
    }

    pub fn with_first_visit(mut self, is_first_visit: bool) -> Self {
        self.is_first_visit = is_first_visit;
        self
    }

    // ============================================
    // Accessors
    // ============================================

    pub fn state(&self) -> &SessionState {
        self.store.state()
    }

    pub fn messages(&self) -> &[Message] {
        &self.store.state().messages
    }

    pub fn tool(&self, id: &str) -> Option<&ToolInstance> {
        self.store.state().tools.get(id)
    }

    pub fn active_nudge(&self) -> Option<&Nudge> {
        self.store.state().active_nudge.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.store.state().loading
    }

    pub fn locale(&self) -> Locale {
        self.session_config.locale
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    /// Today's counters as of the session clock
    pub fn daily_stats(&self) -> DailyStats {
        let today = self.clock.now().date_naive();
        if self.stats.date == today {
            self.stats
        } else {
            DailyStats::new(today)
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&SessionAction, &SessionState) + Send + 'static,
    {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.store.unsubscribe(subscription)
    }

    /// Snapshot the nudge engine would evaluate right now.
    pub fn nudge_context(&self) -> NudgeContext {
        let state = self.store.state();
        let stats = self.daily_stats();
        NudgeContext {
            last_activity: self.activity.last_activity(),
            last_message_at: state.messages.last().map(|m| m.timestamp),
            message_count: state.messages.len(),
            active_tool_count: state.tools.active_count(),
            now: self.clock.now(),
            completed_tasks_today: stats.completed_tasks,
            countdowns_completed_today: stats.countdowns_completed,
            is_first_visit: self.is_first_visit,
            frustration_detected: self.frustration_pending,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    // ============================================
    // Messages
    // ============================================

    /// Send a user message and append the assistant's reply.
    ///
    /// Only one send may be in flight; a second one is rejected with
    /// [`Error::SendInFlight`] before touching the transcript. Backend
    /// failures are not errors here: they become a system message.
    ///
    /// Hosts that must keep pumping timers while the reply is outstanding
    /// use [`ChatSession::begin_send`] and [`ChatSession::finish_send`].
    pub async fn send_message(&mut self, content: &str) -> Result<SendOutcome> {
        let pending = self.begin_send(content)?;
        let result = pending.fetch().await;
        self.finish_send(result)
    }

    /// Append the user message and mark the session loading.
    ///
    /// The returned request borrows nothing from the session, so the host can
    /// await it alongside its timer loop and hand the result to
    /// [`ChatSession::finish_send`].
    pub fn begin_send(&mut self, content: &str) -> Result<PendingReply> {
        if self.is_loading() {
            return Err(Error::SendInFlight);
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::validation("content", "message is empty"));
        }

        if let Some(keyword) = self.frustration.detect(content) {
            tracing::debug!(keyword, "Frustration keyword in user message");
            self.frustration_pending = true;
        }

        self.store
            .dispatch(SessionAction::AppendMessage(Message::user(content, self.now())))?;
        self.store.dispatch(SessionAction::SetLoading(true))?;

        let history: Vec<ChatTurn> = self
            .messages()
            .iter()
            .filter(|m| m.role != Role::System)
            .map(ChatTurn::from)
            .collect();

        Ok(PendingReply {
            backend: Arc::clone(&self.backend),
            history,
            max_retries: self.max_retries,
        })
    }

    /// Clear the loading flag and append the reply (or the error notice).
    pub fn finish_send(&mut self, result: Result<String>) -> Result<SendOutcome> {
        self.store.dispatch(SessionAction::SetLoading(false))?;
        let backend = self.backend.name().to_string();

        match result {
            Ok(raw) => {
                let parsed = self.parser.parse_at(&raw, self.today());
                let message = Message::assistant(parsed.display_text, self.now())
                    .with_tool_card(parsed.tool_card.clone());
                let message_id = message.id.clone();
                self.store.dispatch(SessionAction::AppendMessage(message))?;

                let tool_id = match parsed.tool_card {
                    Some(card) => {
                        let instance =
                            self.store
                                .state()
                                .tools
                                .prepare(card, Some(message_id.clone()), self.now());
                        let id = instance.id.clone();
                        self.store.dispatch(SessionAction::AddTool(instance))?;
                        Some(id)
                    }
                    None => None,
                };

                tracing::info!(%backend, tool_id = ?tool_id, "Assistant replied");
                Ok(SendOutcome::Replied { message_id, tool_id })
            }
            Err(e) => {
                tracing::warn!(%backend, error = %e, "Reply failed");
                let message = Message::system(self.locale().reply_error_message(), self.now());
                let message_id = message.id.clone();
                self.store.dispatch(SessionAction::AppendMessage(message))?;
                Ok(SendOutcome::Failed { message_id })
            }
        }
    }

    /// Flip the expanded flag of a long message.
    pub fn toggle_expanded(&mut self, message_id: &str) -> Result<()> {
        self.store.dispatch(SessionAction::ToggleExpanded {
            message_id: message_id.to_string(),
        })?;
        Ok(())
    }

    pub fn clear_messages(&mut self) -> Result<()> {
        self.store.dispatch(SessionAction::ClearMessages)?;
        Ok(())
    }

    // ============================================
    // Tool interactions
    // ============================================

    fn apply_tool(&mut self, id: &str, action: ToolAction) -> Result<Transition> {
        let transition = self.store.dispatch(SessionAction::UpdateTool {
            id: id.to_string(),
            action,
        })?;
        for event in transition.events() {
            self.record_tool_event(id, *event);
        }
        self.sync_tick(id);
        Ok(transition)
    }

    pub fn start_countdown(&mut self, id: &str) -> Result<Transition> {
        self.apply_tool(id, ToolAction::Countdown(CountdownAction::Start))
    }

    pub fn pause_countdown(&mut self, id: &str) -> Result<Transition> {
        self.apply_tool(id, ToolAction::Countdown(CountdownAction::Pause))
    }

    pub fn resume_countdown(&mut self, id: &str) -> Result<Transition> {
        self.apply_tool(id, ToolAction::Countdown(CountdownAction::Resume))
    }

    /// Back to `ready`. The pending tick is cancelled before the state changes.
    pub fn reset_countdown(&mut self, id: &str) -> Result<Transition> {
        self.cancel_tick(id);
        self.apply_tool(id, ToolAction::Countdown(CountdownAction::Reset))
    }

    pub fn toggle_checklist_step(&mut self, id: &str, step_id: &str) -> Result<Transition> {
        self.apply_tool(id, ToolAction::ToggleStep(step_id.to_string()))
    }

    pub fn start_checklist_step(&mut self, id: &str, index: usize) -> Result<Transition> {
        self.apply_tool(id, ToolAction::StartStep(index))
    }

    pub fn toggle_dayplan_block(&mut self, id: &str, block_id: &str) -> Result<Transition> {
        self.apply_tool(id, ToolAction::ToggleBlock(block_id.to_string()))
    }

    pub fn confirm_reminder(&mut self, id: &str) -> Result<Transition> {
        self.apply_tool(id, ToolAction::ConfirmReminder)
    }

    pub fn toggle_reminder(&mut self, id: &str) -> Result<Transition> {
        self.apply_tool(id, ToolAction::ToggleReminder)
    }

    pub fn set_reminder_time(&mut self, id: &str, time: Option<String>) -> Result<Transition> {
        self.apply_tool(id, ToolAction::SetReminderTime(time))
    }

    /// Remove a reminder from the registry, whatever its state.
    pub fn delete_reminder(&mut self, id: &str) -> Result<Transition> {
        let kind = self
            .tool(id)
            .map(|t| t.kind())
            .ok_or_else(|| Error::ToolNotFound(id.to_string()))?;
        if kind != ToolKind::Reminder {
            tracing::debug!(tool_id = id, %kind, "Ignoring delete on non-reminder");
            return Ok(Transition::Ignored);
        }
        self.store.dispatch(SessionAction::RemoveTool { id: id.to_string() })
    }

    /// Retire an instance by hand (e.g. the user closed the card).
    pub fn retire_tool(&mut self, id: &str) -> Result<Transition> {
        self.cancel_tick(id);
        self.store.dispatch(SessionAction::RetireTool { id: id.to_string() })
    }

    fn cancel_tick(&mut self, id: &str) {
        if let Some(handle) = self.tick_handles.remove(id) {
            self.scheduler.cancel(handle);
        }
    }

    /// Make the tick timer match the countdown's state.
    fn sync_tick(&mut self, id: &str) {
        let ticking = self
            .tool(id)
            .filter(|t| t.is_active)
            .and_then(ToolInstance::as_countdown)
            .is_some_and(|c| c.is_ticking());

        match (ticking, self.tick_handles.contains_key(id)) {
            (true, false) => {
                let handle = self.scheduler.schedule_every(
                    self.now(),
                    Duration::seconds(1),
                    TimerEvent::CountdownTick {
                        instance_id: id.to_string(),
                    },
                );
                self.tick_handles.insert(id.to_string(), handle);
            }
            (false, true) => self.cancel_tick(id),
            _ => {}
        }
    }

    fn roll_over_day(&mut self) {
        let today = self.today();
        if self.stats.roll_over(today) {
            tracing::info!(%today, "Daily counters rolled over");
        }
    }

    fn record_tool_event(&mut self, id: &str, event: ToolEvent) {
        self.roll_over_day();
        match event {
            ToolEvent::TaskCompleted => self.stats.completed_tasks += 1,
            ToolEvent::BreakComplete => self.stats.countdowns_completed += 1,
            _ => {}
        }
        tracing::debug!(tool_id = id, ?event, "Tool event");
    }

    // ============================================
    // Activity and nudges
    // ============================================

    /// Record user input. Any live nudge is dismissed implicitly.
    pub fn update_activity(&mut self, event: InputEvent) -> Result<()> {
        self.activity.record(event, self.now());
        if self.active_nudge().is_some() {
            self.clear_nudge()?;
        }
        Ok(())
    }

    fn clear_nudge(&mut self) -> Result<()> {
        if let Some((_, handle)) = self.nudge_timer.take() {
            self.scheduler.cancel(handle);
        }
        self.store.dispatch(SessionAction::SetNudge(None))?;
        Ok(())
    }

    /// Ask the engine for a nudge and show it.
    ///
    /// Skipped while a nudge is live or a reply is in flight. Otherwise a
    /// pending frustration signal is consumed whether or not a nudge fires.
    pub fn evaluate_nudges(&mut self) -> Result<Option<Nudge>> {
        if !self.nudge_config.enabled || self.active_nudge().is_some() || self.is_loading() {
            return Ok(None);
        }
        self.roll_over_day();

        let ctx = self.nudge_context();
        self.frustration_pending = false;

        let Some(nudge) = self
            .engine
            .fire(&ctx, &mut self.cooldowns, self.session_config.locale)
        else {
            return Ok(None);
        };

        let handle = self.scheduler.schedule_once(
            self.now(),
            Duration::seconds(self.nudge_config.auto_dismiss_secs as i64),
            TimerEvent::NudgeExpired {
                nudge_id: nudge.id.clone(),
            },
        );
        self.nudge_timer = Some((nudge.id.clone(), handle));
        self.store.dispatch(SessionAction::SetNudge(Some(nudge.clone())))?;
        Ok(Some(nudge))
    }

    /// Dismiss the live nudge. Returns it, stamped with the dismissal time.
    pub fn dismiss_nudge(&mut self) -> Result<Option<Nudge>> {
        let Some(mut nudge) = self.active_nudge().cloned() else {
            return Ok(None);
        };
        self.clear_nudge()?;
        nudge.dismissed_at = Some(self.now());
        tracing::debug!(nudge_id = %nudge.id, trigger = %nudge.kind, "Nudge dismissed");
        Ok(Some(nudge))
    }

    /// Accept the live nudge. Returns the tool it suggests, if any.
    pub fn accept_nudge(&mut self) -> Result<Option<ToolKind>> {
        let Some(nudge) = self.active_nudge().cloned() else {
            return Ok(None);
        };
        self.clear_nudge()?;
        tracing::info!(nudge_id = %nudge.id, trigger = %nudge.kind, "Nudge accepted");
        Ok(nudge.suggested_tool)
    }

    // ============================================
    // Timers
    // ============================================

    /// Deliver every timer that came due. Returns the number handled.
    pub fn pump_timers(&mut self) -> Result<usize> {
        let due = self.scheduler.take_due(self.now());
        let count = due.len();
        for (handle, event) in due {
            self.handle_timer(handle, event)?;
        }
        Ok(count)
    }

    fn handle_timer(&mut self, handle: TaskHandle, event: TimerEvent) -> Result<()> {
        match event {
            TimerEvent::CountdownTick { instance_id } => {
                if self.tick_handles.get(&instance_id) != Some(&handle) {
                    tracing::debug!(tool_id = %instance_id, "Dropping stale countdown tick");
                    return Ok(());
                }
                match self.apply_tool(&instance_id, ToolAction::Countdown(CountdownAction::Tick)) {
                    Ok(_) => {}
                    // Removed between scheduling and delivery
                    Err(Error::ToolNotFound(_)) => self.cancel_tick(&instance_id),
                    Err(e) => return Err(e),
                }
            }
            TimerEvent::NudgeExpired { nudge_id } => {
                let live = self.active_nudge().map(|n| n.id.as_str()) == Some(nudge_id.as_str());
                if live {
                    tracing::debug!(%nudge_id, "Nudge auto-dismissed");
                    self.clear_nudge()?;
                }
            }
            TimerEvent::IdleCheck => {
                self.evaluate_nudges()?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("backend", &self.backend.name())
            .field("messages", &self.messages().len())
            .field("tools", &self.state().tools.len())
            .field("pending_timers", &self.scheduler.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use crate::clock::ManualClock;
    use crate::tools::CountdownStatus;
    use chrono::{FixedOffset, TimeZone};

    const COUNTDOWN_REPLY: &str = "Let's focus.\n\n```json\n{\"tool\": \"countdown\", \"params\": {\"duration\": 25, \"task\": \"write report\", \"breakDuration\": 5}}\n```";

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 3, hour, minute, 0)
            .unwrap()
    }

    fn session_at(
        start: DateTime<FixedOffset>,
        replies: Vec<Result<String>>,
    ) -> (ChatSession, ManualClock, Arc<ScriptedBackend>) {
        let clock = ManualClock::new(start);
        let backend = Arc::new(ScriptedBackend::new(replies));
        let session = ChatSession::new(&Config::default(), backend.clone(), Arc::new(clock.clone()))
            .unwrap()
            .with_first_visit(false);
        (session, clock, backend)
    }

    async fn with_countdown(session: &mut ChatSession) -> String {
        match session.send_message("help me focus").await.unwrap() {
            SendOutcome::Replied {
                tool_id: Some(id), ..
            } => id,
            other => panic!("expected a tool card, got {other:?}"),
        }
    }

    fn remaining(session: &ChatSession, id: &str) -> u32 {
        session.tool(id).unwrap().as_countdown().unwrap().remaining_seconds
    }

    #[tokio::test]
    async fn test_reply_with_directive_creates_tool() {
        let (mut session, _, backend) = session_at(at(13, 0), vec![Ok(COUNTDOWN_REPLY.into())]);
        let id = with_countdown(&mut session).await;

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "Let's focus.");
        assert!(messages[1].tool_card.is_some());
        assert!(!session.is_loading());

        let instance = session.tool(&id).unwrap();
        assert_eq!(instance.source_message_id.as_deref(), Some(messages[1].id.as_str()));
        assert_eq!(session.nudge_context().active_tool_count, 1);
        assert_eq!(backend.last_history().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_appends_system_message() {
        let (mut session, _, backend) = session_at(
            at(13, 0),
            vec![
                Err(Error::Backend("ollama returned 500: boom".into())),
                Ok("Sure.".into()),
            ],
        );

        let outcome = session.send_message("hello").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        assert!(!session.is_loading());
        let last = session.messages().last().unwrap();
        assert_eq!(last.role, Role::System);
        assert_eq!(last.content, Locale::En.reply_error_message());

        // System notices never reach the backend
        session.send_message("again").await.unwrap();
        let history = backend.last_history().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|t| t.role == Role::User));
    }

    #[tokio::test]
    async fn test_send_rejected_while_loading() {
        let (mut session, _, backend) = session_at(at(13, 0), vec![Ok("hi".into())]);
        session.store.dispatch(SessionAction::SetLoading(true)).unwrap();

        assert!(matches!(
            session.send_message("hello").await,
            Err(Error::SendInFlight)
        ));
        assert!(session.messages().is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_reset_twice_cancels_tick_once() {
        let (mut session, clock, _) = session_at(at(13, 0), vec![Ok(COUNTDOWN_REPLY.into())]);
        let id = with_countdown(&mut session).await;

        session.start_countdown(&id).unwrap();
        clock.advance(Duration::seconds(1));
        session.pump_timers().unwrap();
        assert_eq!(remaining(&session, &id), 1499);

        session.reset_countdown(&id).unwrap();
        let first = session.tool(&id).unwrap().clone();
        session.reset_countdown(&id).unwrap();
        assert_eq!(session.tool(&id).unwrap(), &first);
        assert!(session.tick_handles.is_empty());

        session.start_countdown(&id).unwrap();
        clock.advance(Duration::seconds(1));
        session.pump_timers().unwrap();
        assert_eq!(remaining(&session, &id), 1499);
    }

    #[tokio::test]
    async fn test_stale_tick_is_dropped() {
        let (mut session, clock, _) = session_at(at(13, 0), vec![Ok(COUNTDOWN_REPLY.into())]);
        let id = with_countdown(&mut session).await;

        session.start_countdown(&id).unwrap();
        let stale = session.tick_handles[&id];
        session.pause_countdown(&id).unwrap();
        session.resume_countdown(&id).unwrap();
        assert_ne!(session.tick_handles[&id], stale);

        session
            .handle_timer(
                stale,
                TimerEvent::CountdownTick {
                    instance_id: id.clone(),
                },
            )
            .unwrap();
        assert_eq!(remaining(&session, &id), 1500);

        clock.advance(Duration::seconds(1));
        session.pump_timers().unwrap();
        assert_eq!(remaining(&session, &id), 1499);
    }

    #[tokio::test]
    async fn test_backgrounded_host_gets_one_tick_per_pump() {
        let (mut session, clock, _) = session_at(at(13, 0), vec![Ok(COUNTDOWN_REPLY.into())]);
        let id = with_countdown(&mut session).await;
        session.start_countdown(&id).unwrap();

        clock.advance(Duration::minutes(10));
        session.pump_timers().unwrap();
        assert_eq!(remaining(&session, &id), 1499);
    }

    #[tokio::test]
    async fn test_full_countdown_completes_and_retires() {
        let (mut session, clock, _) = session_at(at(13, 0), vec![Ok(COUNTDOWN_REPLY.into())]);
        let id = with_countdown(&mut session).await;
        session.start_countdown(&id).unwrap();

        for _ in 0..1500 {
            clock.advance(Duration::seconds(1));
            session.pump_timers().unwrap();
        }
        let countdown = session.tool(&id).unwrap().as_countdown().unwrap();
        assert_eq!(countdown.status, CountdownStatus::Break);
        assert_eq!(countdown.remaining_seconds, 300);

        for _ in 0..300 {
            clock.advance(Duration::seconds(1));
            session.pump_timers().unwrap();
        }
        let instance = session.tool(&id).unwrap();
        assert_eq!(instance.as_countdown().unwrap().status, CountdownStatus::Completed);
        assert!(!instance.is_active);
        assert!(session.tick_handles.is_empty());
        assert_eq!(session.daily_stats().countdowns_completed, 1);
    }

    #[tokio::test]
    async fn test_countdown_keeps_ticking_while_reply_is_pending() {
        let (mut session, clock, backend) = session_at(
            at(13, 0),
            vec![Ok(COUNTDOWN_REPLY.into()), Ok("Keep going.".into())],
        );
        let id = with_countdown(&mut session).await;
        session.start_countdown(&id).unwrap();

        let pending = session.begin_send("how long is left?").unwrap();
        assert!(session.is_loading());
        assert_eq!(pending.history().len(), 3);
        assert!(matches!(
            session.begin_send("hello?"),
            Err(Error::SendInFlight)
        ));

        for _ in 0..20 {
            clock.advance(Duration::seconds(1));
            session.pump_timers().unwrap();
        }
        assert_eq!(remaining(&session, &id), 1480);

        let outcome = session.finish_send(pending.fetch().await).unwrap();
        assert!(matches!(outcome, SendOutcome::Replied { tool_id: None, .. }));
        assert!(!session.is_loading());
        assert_eq!(session.messages().last().unwrap().content, "Keep going.");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_ignored_pause_keeps_break_tick() {
        let (mut session, clock, _) = session_at(at(13, 0), vec![Ok(COUNTDOWN_REPLY.into())]);
        let id = with_countdown(&mut session).await;
        session.start_countdown(&id).unwrap();
        for _ in 0..1500 {
            clock.advance(Duration::seconds(1));
            session.pump_timers().unwrap();
        }
        assert_eq!(
            session.tool(&id).unwrap().as_countdown().unwrap().status,
            CountdownStatus::Break
        );

        let handle = session.tick_handles[&id];
        assert_eq!(session.pause_countdown(&id).unwrap(), Transition::Ignored);
        assert_eq!(session.tick_handles.get(&id), Some(&handle));

        clock.advance(Duration::seconds(1));
        session.pump_timers().unwrap();
        assert_eq!(remaining(&session, &id), 299);
    }

    #[test]
    fn test_idle_nudge_auto_dismisses() {
        let (mut session, clock, _) = session_at(at(13, 0), vec![]);

        clock.advance(Duration::minutes(5));
        session.pump_timers().unwrap();
        let nudge = session.active_nudge().cloned().unwrap();
        assert_eq!(nudge.kind, TriggerKind::Idle5Min);
        assert_eq!(nudge.suggested_tool, Some(ToolKind::Countdown));

        clock.advance(Duration::seconds(29));
        session.pump_timers().unwrap();
        assert!(session.active_nudge().is_some());

        clock.advance(Duration::seconds(1));
        session.pump_timers().unwrap();
        assert!(session.active_nudge().is_none());
    }

    #[test]
    fn test_dismissed_nudge_waits_for_cooldown() {
        let (mut session, clock, _) = session_at(at(13, 0), vec![]);

        clock.advance(Duration::minutes(5));
        session.pump_timers().unwrap();
        let shown_at = session.active_nudge().unwrap().shown_at;
        let dismissed = session.dismiss_nudge().unwrap().unwrap();
        assert!(dismissed.dismissed_at.is_some());

        loop {
            clock.advance(Duration::seconds(30));
            session.pump_timers().unwrap();
            if let Some(nudge) = session.active_nudge() {
                assert!(nudge.shown_at - shown_at >= Duration::minutes(15));
                break;
            }
            assert!(session.now() - shown_at < Duration::minutes(16));
        }
    }

    #[test]
    fn test_activity_clears_nudge_and_its_timer() {
        let (mut session, clock, _) = session_at(at(13, 0), vec![]);
        clock.advance(Duration::minutes(5));
        session.pump_timers().unwrap();
        assert!(session.active_nudge().is_some());

        session.update_activity(InputEvent::PointerMove).unwrap();
        assert!(session.active_nudge().is_none());
        assert!(session.nudge_timer.is_none());
        assert_eq!(session.nudge_context().idle_duration(), Duration::zero());
    }

    #[tokio::test]
    async fn test_frustration_signal_lasts_one_cycle() {
        let (mut session, _, _) = session_at(at(13, 0), vec![Ok("Let's look at it.".into())]);
        session.send_message("I'm stuck on this essay").await.unwrap();
        assert!(session.nudge_context().frustration_detected);

        let nudge = session.evaluate_nudges().unwrap().unwrap();
        assert_eq!(nudge.kind, TriggerKind::TaskStuck);
        assert_eq!(session.accept_nudge().unwrap(), Some(ToolKind::Checklist));

        assert!(!session.nudge_context().frustration_detected);
        assert!(session.evaluate_nudges().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_completed_tasks_feed_celebration() {
        let reply = "Here you go.\n```json\n{\"tool\": \"checklist\", \"params\": {\"task\": \"Tidy\", \"steps\": [\"a\", \"b\", \"c\"]}}\n```";
        let (mut session, _, _) = session_at(at(13, 0), vec![Ok(reply.into())]);
        let id = match session.send_message("help me tidy").await.unwrap() {
            SendOutcome::Replied { tool_id: Some(id), .. } => id,
            other => panic!("unexpected {other:?}"),
        };

        for step in ["step-1", "step-2", "step-3"] {
            session.toggle_checklist_step(&id, step).unwrap();
        }
        assert_eq!(session.daily_stats().completed_tasks, 3);
        assert!(!session.tool(&id).unwrap().is_active);

        let nudge = session.evaluate_nudges().unwrap().unwrap();
        assert_eq!(nudge.kind, TriggerKind::CelebrateWin);
    }

    #[test]
    fn test_daily_stats_roll_over_at_midnight() {
        let clock = ManualClock::new(at(23, 59));
        let session = ChatSession::new(
            &Config::default(),
            Arc::new(ScriptedBackend::new(Vec::<Result<String>>::new())),
            Arc::new(clock.clone()),
        )
        .unwrap()
        .with_daily_stats(DailyStats {
            date: at(23, 59).date_naive(),
            completed_tasks: 2,
            countdowns_completed: 1,
        });
        assert_eq!(session.daily_stats().completed_tasks, 2);

        clock.advance(Duration::minutes(2));
        assert_eq!(session.daily_stats().completed_tasks, 0);
    }

    #[tokio::test]
    async fn test_reminder_delete_and_wrong_kind() {
        let reply = "Noted.\n```json\n{\"tool\": \"reminder\", \"params\": {\"text\": \"Call mum\", \"time\": \"18:00\"}}\n```";
        let (mut session, _, _) = session_at(at(13, 0), vec![Ok(reply.into()), Ok(COUNTDOWN_REPLY.into())]);
        let reminder = match session.send_message("remind me").await.unwrap() {
            SendOutcome::Replied { tool_id: Some(id), .. } => id,
            other => panic!("unexpected {other:?}"),
        };
        let countdown = with_countdown(&mut session).await;

        assert_eq!(session.nudge_context().active_tool_count, 1);
        assert!(session.confirm_reminder(&reminder).unwrap().is_applied());
        assert_eq!(session.delete_reminder(&countdown).unwrap(), Transition::Ignored);
        assert!(session.delete_reminder(&reminder).unwrap().is_applied());
        assert!(session.tool(&reminder).is_none());
    }
}
