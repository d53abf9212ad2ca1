// Drive runtime for a two-wheeled differential-drive rover with a
// steerable camera servo.

pub mod config;
pub mod messages;
pub mod motor;
pub mod runtime;
