//! Registry of live tool instances.
//!
//! Instances are kept in creation order. Retiring an instance flips
//! `is_active` off but keeps it inspectable; only [`ToolInstanceRegistry::remove`]
//! deletes. The registry lives inside the session store, so every mutation
//! goes through a store action.

use chrono::{DateTime, Utc};

use super::{apply_action, ToolAction, ToolInstance, Transition};
use crate::error::{Error, Result};
use crate::types::ToolCard;

#[derive(Debug, Clone, Default)]
pub struct ToolInstanceRegistry {
    instances: Vec<ToolInstance>,
}

impl ToolInstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a unique, type-prefixed id
    fn next_id(&self, card: &ToolCard) -> String {
        loop {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            let id = format!("{}-{}", card.kind().as_str(), &suffix[..8]);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Build an active instance with a fresh id, without registering it.
    pub fn prepare(
        &self,
        card: ToolCard,
        source_message_id: Option<String>,
        now: DateTime<Utc>,
    ) -> ToolInstance {
        ToolInstance {
            id: self.next_id(&card),
            data: card,
            created_at: now,
            is_active: true,
            source_message_id,
        }
    }

    /// Register a prepared instance. Ids must be unique.
    pub fn insert(&mut self, instance: ToolInstance) -> Result<()> {
        if self.get(&instance.id).is_some() {
            return Err(Error::validation(
                "id",
                format!("duplicate tool instance id: {}", instance.id),
            ));
        }
        tracing::debug!(tool_id = %instance.id, kind = %instance.kind(), "Registered tool instance");
        self.instances.push(instance);
        Ok(())
    }

    /// Register a new instance for `card` and return its id.
    pub fn create(
        &mut self,
        card: ToolCard,
        source_message_id: Option<String>,
        now: DateTime<Utc>,
    ) -> String {
        let instance = self.prepare(card, source_message_id, now);
        let id = instance.id.clone();
        tracing::debug!(tool_id = %id, kind = %instance.kind(), "Created tool instance");
        self.instances.push(instance);
        id
    }

    pub fn get(&self, id: &str) -> Option<&ToolInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut ToolInstance> {
        self.instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::ToolNotFound(id.to_string()))
    }

    /// Offer an action to an instance's machine.
    ///
    /// Retired instances ignore everything. An instance whose machine reaches
    /// its terminal state is retired automatically.
    pub fn apply(&mut self, id: &str, action: &ToolAction) -> Result<Transition> {
        let instance = self.get_mut(id)?;
        if !instance.is_active {
            tracing::debug!(tool_id = id, "Ignoring action on retired tool instance");
            return Ok(Transition::Ignored);
        }

        let transition = apply_action(&mut instance.data, action);
        if transition.is_applied() && instance.is_finished() {
            instance.is_active = false;
            tracing::debug!(tool_id = id, "Tool instance finished and retired");
        }
        Ok(transition)
    }

    /// Mark an instance as retired. Returns false if it already was.
    pub fn retire(&mut self, id: &str) -> Result<bool> {
        let instance = self.get_mut(id)?;
        let was_active = instance.is_active;
        instance.is_active = false;
        Ok(was_active)
    }

    /// Delete an instance outright.
    pub fn remove(&mut self, id: &str) -> Result<ToolInstance> {
        let index = self
            .instances
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::ToolNotFound(id.to_string()))?;
        Ok(self.instances.remove(index))
    }

    /// Active instances that keep the user busy (reminders excluded)
    pub fn active_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| i.is_active && i.occupies_focus())
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolInstance> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instance created from a given message's card
    pub fn for_message(&self, message_id: &str) -> Option<&ToolInstance> {
        self.instances
            .iter()
            .find(|i| i.source_message_id.as_deref() == Some(message_id))
    }
}
