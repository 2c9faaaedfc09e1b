//! Orchestration layer of the easel generation client.
//!
//! [`controller::StudioController`] reconciles live transport messages,
//! poll results, and user actions into the core state containers and owns
//! the update-precedence policy.  [`host::StudioHost`] is the composition
//! root that shares one controller across independent UI attachment
//! points via reference-counted handles.

pub mod config;
pub mod confirm;
pub mod controller;
pub mod host;
pub mod poller;
pub mod tokens;
