//! View registry, column projection and the active view state

mod projection;
mod registry;
mod state;

pub use projection::{
    active_filters, plan_column_move, sort_chain, LayoutChange, OrderedColumn, Projection,
};
pub use registry::{ViewConfig, ViewRegistry};
pub use state::{ActiveView, ViewState};
