//! Session state store
//!
//! The store is the only writer of [`SessionState`]. Every change is a
//! [`SessionAction`] passed through [`SessionStore::dispatch`], which applies
//! it and then notifies subscribers with the action and the new state.
//!
//! Subscriptions are owned by the store instance; dropping the store drops
//! every listener with it.

use crate::error::{Error, Result};
use crate::tools::{ToolAction, ToolInstance, ToolInstanceRegistry, Transition};
use crate::types::{Message, Nudge, ToolCard};

/// Everything a host needs to render a session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub messages: Vec<Message>,
    /// A reply is in flight
    pub loading: bool,
    pub active_nudge: Option<Nudge>,
    pub tools: ToolInstanceRegistry,
}

impl SessionState {
    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn message_mut(&mut self, id: &str) -> Result<&mut Message> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::MessageNotFound(id.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    AppendMessage(Message),
    AttachToolCard { message_id: String, card: ToolCard },
    ToggleExpanded { message_id: String },
    SetLoading(bool),
    AddTool(ToolInstance),
    UpdateTool { id: String, action: ToolAction },
    RetireTool { id: String },
    RemoveTool { id: String },
    SetNudge(Option<Nudge>),
    ClearMessages,
}

impl SessionAction {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SessionAction::AppendMessage(_) => "append_message",
            SessionAction::AttachToolCard { .. } => "attach_tool_card",
            SessionAction::ToggleExpanded { .. } => "toggle_expanded",
            SessionAction::SetLoading(_) => "set_loading",
            SessionAction::AddTool(_) => "add_tool",
            SessionAction::UpdateTool { .. } => "update_tool",
            SessionAction::RetireTool { .. } => "retire_tool",
            SessionAction::RemoveTool { .. } => "remove_tool",
            SessionAction::SetNudge(_) => "set_nudge",
            SessionAction::ClearMessages => "clear_messages",
        }
    }
}

/// Handle returned by [`SessionStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&SessionAction, &SessionState) + Send>;

pub struct SessionStore {
    state: SessionState,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Register a listener called after every applied action.
    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&SessionAction, &SessionState) + Send + 'static,
    {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((subscription, Box::new(listener)));
        subscription
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(s, _)| *s != subscription);
        self.listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Apply an action.
    ///
    /// Tool updates return the machine's transition; every other action
    /// returns an empty [`Transition::Applied`]. Listeners are only notified
    /// when something changed.
    pub fn dispatch(&mut self, action: SessionAction) -> Result<Transition> {
        let transition = self.reduce(&action)?;
        tracing::trace!(action = action.name(), applied = transition.is_applied(), "Dispatched");

        if transition.is_applied() {
            for (_, listener) in self.listeners.iter_mut() {
                listener(&action, &self.state);
            }
        }
        Ok(transition)
    }

    fn reduce(&mut self, action: &SessionAction) -> Result<Transition> {
        let state = &mut self.state;
        match action {
            SessionAction::AppendMessage(message) => {
                state.messages.push(message.clone());
            }
            SessionAction::AttachToolCard { message_id, card } => {
                state.message_mut(message_id)?.tool_card = Some(card.clone());
            }
            SessionAction::ToggleExpanded { message_id } => {
                let message = state.message_mut(message_id)?;
                message.expanded = !message.expanded;
            }
            SessionAction::SetLoading(loading) => {
                state.loading = *loading;
            }
            SessionAction::AddTool(instance) => {
                state.tools.insert(instance.clone())?;
            }
            SessionAction::UpdateTool { id, action } => {
                return state.tools.apply(id, action);
            }
            SessionAction::RetireTool { id } => {
                if !state.tools.retire(id)? {
                    return Ok(Transition::Ignored);
                }
            }
            SessionAction::RemoveTool { id } => {
                state.tools.remove(id)?;
            }
            SessionAction::SetNudge(nudge) => {
                if state.active_nudge == *nudge {
                    return Ok(Transition::Ignored);
                }
                state.active_nudge = nudge.clone();
            }
            SessionAction::ClearMessages => {
                state.messages.clear();
            }
        }
        Ok(Transition::applied())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
