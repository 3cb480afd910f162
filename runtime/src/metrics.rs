//! Metric names recorded by the Store.
//!
//! The runtime only records through the `metrics` facade; installing an
//! exporter is left to the application. Call [`describe`] once at startup to
//! attach descriptions to the names below.

use metrics::{describe_counter, describe_histogram};

/// Actions reduced by any store
pub const ACTIONS_TOTAL: &str = "store.actions.total";

/// Actions rejected because the store was shutting down
pub const SHUTDOWN_REJECTED: &str = "store.shutdown.rejected_actions";

/// Effects started, labelled by `type`
pub const EFFECTS_EXECUTED: &str = "store.effects.executed";

/// Time spent inside reducers
pub const REDUCER_DURATION: &str = "store.reducer.duration_seconds";

/// Register descriptions for every runtime metric.
pub fn describe() {
    describe_counter!(ACTIONS_TOTAL, "Total number of actions processed by stores");
    describe_counter!(
        SHUTDOWN_REJECTED,
        "Actions rejected because the store was shutting down"
    );
    describe_counter!(EFFECTS_EXECUTED, "Total number of effects started");
    describe_histogram!(REDUCER_DURATION, "Time taken to execute reducers");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_without_recorder_is_a_no_op() {
        describe();
    }

    #[test]
    fn names_share_the_store_prefix() {
        for name in [ACTIONS_TOTAL, SHUTDOWN_REJECTED, EFFECTS_EXECUTED, REDUCER_DURATION] {
            assert!(name.starts_with("store."), "{name}");
        }
    }
}
