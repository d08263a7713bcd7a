pub mod boundary;
pub mod clock;
pub mod config;
pub mod emergency;
pub mod error;
pub mod fabric;
pub mod heartbeat;
pub mod ingress;
pub mod localization;
pub mod maintenance;
pub mod ntrip;
pub mod obstacles;
pub mod safety;
pub mod telemetry;
