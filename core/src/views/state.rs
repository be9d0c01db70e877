//! Active view state machine
//!
//! ```text
//! NoViewSelected -> Loading -> Ready <-> PersistingEdit
//!                      ^          |
//!                      +----------+  (view switch)
//! ```
//!
//! An edit moves `Ready` to `PersistingEdit` holding the previous snapshot.
//! A confirmed edit returns to `Ready` with the new snapshot; a failed edit
//! restores the previous one.

use crate::error::{EngineError, Result};
use crate::models::{Filter, ViewId};

use super::registry::ViewConfig;

/// Configuration of the selected view plus its session-only filters
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveView {
    /// Persisted configuration
    pub config: ViewConfig,

    /// Ad hoc filters that are never persisted and are dropped on view switch
    pub session_filters: Vec<Filter>,
}

impl ActiveView {
    /// Activate a configuration with no session filters
    pub fn new(config: ViewConfig) -> Self {
        ActiveView {
            config,
            session_filters: Vec::new(),
        }
    }

    /// Id of the view
    pub fn view_id(&self) -> ViewId {
        self.config.view.id
    }
}

/// Where the active view is in its lifecycle
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewState {
    /// No view chosen yet
    #[default]
    NoViewSelected,

    /// Configuration of `view_id` is being fetched
    Loading {
        /// View being loaded
        view_id: ViewId,
    },

    /// Configuration applied
    Ready(ActiveView),

    /// An edit is waiting for the backend
    PersistingEdit {
        /// Snapshot restored if the edit fails
        previous: ActiveView,
    },
}

impl ViewState {
    /// Snapshot in effect for rendering
    ///
    /// While an edit is pending the previous snapshot stays in effect.
    pub fn active(&self) -> Option<&ActiveView> {
        match self {
            ViewState::Ready(active) => Some(active),
            ViewState::PersistingEdit { previous } => Some(previous),
            _ => None,
        }
    }

    /// Mutable snapshot, only while `Ready`
    pub fn ready_mut(&mut self) -> Option<&mut ActiveView> {
        match self {
            ViewState::Ready(active) => Some(active),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::NoViewSelected => "no-view-selected",
            ViewState::Loading { .. } => "loading",
            ViewState::Ready(_) => "ready",
            ViewState::PersistingEdit { .. } => "persisting-edit",
        }
    }

    /// Move `Ready` to `PersistingEdit` and return a copy of the snapshot to edit
    pub fn begin_edit(&mut self) -> Result<ActiveView> {
        match std::mem::take(self) {
            ViewState::Ready(active) => {
                let snapshot = active.clone();
                *self = ViewState::PersistingEdit { previous: active };
                Ok(snapshot)
            }
            other => {
                let name = other.name();
                *self = other;
                Err(EngineError::InvalidOperation(format!(
                    "cannot edit the view while {}",
                    name
                )))
            }
        }
    }

    /// Leave `PersistingEdit`
    ///
    /// `Some(next)` commits the confirmed snapshot; `None` restores the
    /// previous one. Has no effect in any other state.
    pub fn finish_edit(&mut self, next: Option<ActiveView>) {
        if let ViewState::PersistingEdit { previous } = std::mem::take(self) {
            *self = ViewState::Ready(next.unwrap_or(previous));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FilterCondition, View};

    fn active() -> ActiveView {
        ActiveView::new(ViewConfig::unconfigured(View {
            id: 3,
            table_id: 1,
            name: "v".into(),
            sort_by: None,
            sort_direction: None,
            position: 0,
        }))
    }

    #[test]
    fn test_edit_commit() {
        let mut state = ViewState::Ready(active());

        let mut next = state.begin_edit().unwrap();
        assert_eq!(state.name(), "persisting-edit");
        assert_eq!(state.active(), Some(&active()));

        next.session_filters.push(Filter::is_null("x"));
        state.finish_edit(Some(next.clone()));
        assert_eq!(state, ViewState::Ready(next));
    }

    #[test]
    fn test_edit_rollback_restores_previous() {
        let mut state = ViewState::Ready(active());

        let mut next = state.begin_edit().unwrap();
        next.session_filters.push(Filter::new("x", FilterCondition::Equals, "1"));
        state.finish_edit(None);

        assert_eq!(state, ViewState::Ready(active()));
    }

    #[test]
    fn test_edit_rejected_outside_ready() {
        let mut state = ViewState::Loading { view_id: 3 };
        assert!(matches!(state.begin_edit(), Err(EngineError::InvalidOperation(_))));
        assert_eq!(state, ViewState::Loading { view_id: 3 });

        let mut state = ViewState::Ready(active());
        state.begin_edit().unwrap();
        assert!(state.begin_edit().is_err());
    }

    #[test]
    fn test_finish_outside_edit_is_noop() {
        let mut state = ViewState::NoViewSelected;
        state.finish_edit(Some(active()));
        assert_eq!(state, ViewState::NoViewSelected);
    }
}
