//! Events - 遥测事件发布

mod publisher;

pub use publisher::TelemetryPublisher;
