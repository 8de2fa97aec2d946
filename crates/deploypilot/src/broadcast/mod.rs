pub mod activity;

pub use activity::{ActivityBroadcaster, ActivityEntry, ACTIVITY_LOG_TARGET};
