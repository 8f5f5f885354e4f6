//! Event-driven observation of a monitoring session
//!
//! The control loop publishes [`MonitorEvent`]s on a Tokio broadcast bus.
//! Three consumers exist today: the intervention dispatcher (which turns
//! level changes into gateway calls), the bounded [`EventHistory`] a UI can
//! drain, and whatever the surrounding application subscribes.
//!
//! ```text
//! ┌─────────────┐     ┌───────────────┐     ┌─────────────────┐
//! │  Scheduler/ │────▶│ MonitorEvent  │────▶│ Dispatcher      │
//! │  Controller │     │ Bus (broadcast)│    │ History / UI    │
//! └─────────────┘     └───────────────┘     └─────────────────┘
//! ```

pub mod bus;
pub mod history;
pub mod types;

pub use bus::{MonitorEventBus, SharedEventBus};
pub use history::EventHistory;
pub use types::{CycleFailureReason, CycleSkipReason, MonitorEvent};
