//! Cubicle Royale
//!
//! A host-authoritative multiplayer snake game over WebTransport. One
//! peer simulates the shared office floor at a fixed 30 Hz tick; guests
//! send heading input and render the snapshots they receive. An LLM
//! "boss" provides cosmetic commentary on deaths and new hires.

pub mod commentary;
pub mod config;
pub mod game;
pub mod net;
pub mod util;
