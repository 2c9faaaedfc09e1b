//! Domain types and state containers for the easel generation client.
//!
//! Everything in this crate is pure and synchronous: plain owned structures
//! with explicit mutation methods and computed read views.  Network I/O and
//! async wiring live in `easel-backend` and `easel-studio`; presentation
//! layers derive their own observation mechanism on top of these types.

pub mod error;
pub mod job;
pub mod notification;
pub mod params;
pub mod queue;
pub mod results;
pub mod status;
pub mod types;
