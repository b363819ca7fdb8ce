//! alertmanager webhook receiver that logs every notification as a json line
//!
//! Features:
//! - bearer token authentication against a single shared secret
//! - validation of the notification shape (`receiver`, `status`, `alerts`, `groupLabels`)
//! - one json record per alert, rejection, request and lifecycle event on stdout
//! - optional prometheus counters of received alerts and rejected calls

pub mod alert;
pub mod alertmanager_webhook_receiver;
pub mod auth;
pub mod clock;
pub mod error;
pub mod log;
pub mod server;
pub mod settings;
pub mod telemetry_endpoint;
