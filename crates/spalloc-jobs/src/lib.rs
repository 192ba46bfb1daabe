//! The Job Lifecycle (spec §4.6): creation, keepalive, destruction and the
//! expiry sweep, plus the Change Observer's job-transition logic and the
//! submachine projection.

pub mod error;
pub mod service;
pub mod settle;
pub mod submachine;

pub use error::{JobsError, Result};
pub use service::JobService;
pub use settle::on_change_completed;
pub use submachine::{describe_submachine, AllocatedBoard, Connection, Submachine};
