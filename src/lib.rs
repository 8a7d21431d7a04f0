//! asi: host process for the autonomous control loop

pub mod heartbeat;

pub use heartbeat::Heartbeat;
