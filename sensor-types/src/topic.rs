//! Topic namespace constants (spec.md §6). Dot-separated, written with
//! `const` strings so producers/consumers can't typo a topic name.

pub const BASE: &str = "lawnberry";

pub mod sensors {
    pub const GNSS: &str = "lawnberry.sensors.gnss.data";
    pub const IMU: &str = "lawnberry.sensors.imu.data";
    pub const TOF_LEFT: &str = "lawnberry.sensors.tof_left.data";
    pub const TOF_RIGHT: &str = "lawnberry.sensors.tof_right.data";
    pub const TOF_DOWN: &str = "lawnberry.sensors.tof_down.data";
    pub const ENVIRONMENTAL: &str = "lawnberry.sensors.environmental.data";
    pub const POWER: &str = "lawnberry.sensors.power.data";
    pub const ENCODER: &str = "lawnberry.sensors.encoder.data";
    pub const VIBRATION: &str = "lawnberry.sensors.vibration.data";
    pub const STATUS_WILDCARD: &str = "lawnberry.sensors.+.status";
}

pub mod vision {
    pub const DETECTIONS: &str = "lawnberry.vision.detections";
}

pub mod navigation {
    pub const POSE: &str = "lawnberry.navigation.pose";
    pub const POSE_SAFETY: &str = "lawnberry.navigation.pose_safety";
}

pub mod safety {
    pub const OBSTACLES: &str = "lawnberry.safety.obstacles.map";
    pub const OBSTACLE_ALERT: &str = "lawnberry.safety.obstacles.alert";
    pub const HAZARDS: &str = "lawnberry.safety.hazards";
    pub const STATUS: &str = "lawnberry.safety.status";
    pub const EMERGENCY_STOP: &str = "lawnberry.safety.emergency_stop";
    pub const BOUNDARY_VIOLATIONS: &str = "lawnberry.safety.boundary.violations";
}

pub mod emergency {
    pub const MOTORS_STOP: &str = "lawnberry.emergency.motors.stop";
    pub const BLADE_DISABLE: &str = "lawnberry.emergency.blade.disable";
    pub const ALERT_ALL: &str = "lawnberry.emergency.alert_all";
    pub const SAFE_POSITION: &str = "lawnberry.emergency.safe_position";
    pub const SHUTDOWN: &str = "lawnberry.emergency.shutdown";
    pub const ACKNOWLEDGE: &str = "lawnberry.emergency.acknowledge";
    pub const RESET: &str = "lawnberry.emergency.reset";
    pub const STATE: &str = "lawnberry.emergency.state";
}

pub mod maintenance {
    pub const BLADE_WEAR: &str = "lawnberry.maintenance.blade.wear";
    pub const BATTERY_HEALTH: &str = "lawnberry.maintenance.battery.health";
    pub const LOCKOUTS: &str = "lawnberry.maintenance.lockouts";
}

pub mod system {
    pub const HEARTBEAT: &str = "lawnberry.system.heartbeat";
    pub const HEALTH: &str = "lawnberry.system.health";
    pub const TELEMETRY: &str = "lawnberry.system.telemetry";
    pub const METRICS: &str = "lawnberry.system.metrics";
    pub const MOTORS_STATUS: &str = "lawnberry.system.motors.status";
    pub const BLADE_STATUS: &str = "lawnberry.system.blade.status";
}
