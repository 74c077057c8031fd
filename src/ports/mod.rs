//! Ports layer: Trait definitions for external collaborators.
//!
//! The trained classifier, the history store, and the chart renderer are all
//! reached through these traits so concrete implementations can be swapped.

mod history;
mod model;
mod renderer;

pub use history::HistoryStore;
pub use model::{ModelError, RiskModel};
pub use renderer::{RenderError, TrendRenderer};
