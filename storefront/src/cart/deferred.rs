//! One-slot holder for the mutation that waits for cart creation.
//!
//! This is deliberately not a queue: deferring while a command is pending
//! overwrites it, and only the newest command ever runs.

use super::command::DeferredCommand;

/// At most one pending [`DeferredCommand`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeferredSlot {
    pending: Option<DeferredCommand>,
}

impl DeferredSlot {
    /// An empty slot
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Hold `command`, returning the command it overwrote
    pub fn defer(&mut self, command: DeferredCommand) -> Option<DeferredCommand> {
        self.pending.replace(command)
    }

    /// Take the pending command; a no-op on an empty slot
    pub fn drain_once(&mut self) -> Option<DeferredCommand> {
        self.pending.take()
    }

    /// Whether a command is waiting
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The waiting command, if any
    #[must_use]
    pub const fn peek(&self) -> Option<&DeferredCommand> {
        self.pending.as_ref()
    }

    /// Drop the waiting command
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
