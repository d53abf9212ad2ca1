// Wire types exchanged over zenoh

use serde::{Deserialize, Serialize};

/// Three-component vector, following the geometry_msgs layout so existing
/// teleop tooling can publish unchanged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Velocity command from teleop/scripts -> runtime.
///
/// Only `linear.x` (m/s, forward) and `angular.z` (rad/s, counter-clockwise)
/// are consumed; the remaining components are accepted and ignored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Twist {
    pub fn new(linear_x: f64, angular_z: f64) -> Self {
        Self {
            linear: Vector3 {
                x: linear_x,
                ..Vector3::default()
            },
            angular: Vector3 {
                z: angular_z,
                ..Vector3::default()
            },
        }
    }
}

/// Health status published by the runtime each tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DriverHealth {
    Ok,
    CmdStale,
}
