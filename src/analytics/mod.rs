//! Best-effort gameplay analytics.
//!
//! Records are built synchronously during a tick and delivered off the game
//! loop; a lost record never affects play.

pub mod record;
pub mod store;
pub mod dispatch;

pub use record::{AnalyticsEvent, AnalyticsRecord};
pub use store::AnalyticsStore;
pub use dispatch::{
    spawn_delivery, AnalyticsBackend, AnalyticsError, AnalyticsRecorder, AnalyticsSink,
    AnalyticsTransport, ChannelTransport, DeliveryStats, NullAnalytics, SharedStore,
};
