//! Credit approval workflow: a step-by-step state machine that gathers applicant risk
//! signals and financial figures and forwards them to external decision services.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
