//! Occasion reminder pipeline: window selection, rendering, channel choice,
//! the template and delivery ledger seams and the cycle orchestration.

pub mod catalog;
pub mod channel;
pub mod engine;
pub mod ledger;
pub mod render;
pub mod window;

pub use catalog::TemplateCatalog;
pub use channel::{ChannelSelection, select_channel};
pub use engine::{CycleError, CycleSettings, CycleSummary, ReminderService};
pub use ledger::DeliveryLedger;
pub use render::render;
pub use window::{OccasionFinder, UpcomingOccasion, next_occurrence_within};
