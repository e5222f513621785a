//! Boss commentary
//!
//! Cosmetic flavor text generated by an LLM on game events. Invoked
//! fire-and-forget from the session coordinator; gameplay never waits on
//! it and a failed or slow response costs nothing but the joke.

mod client;

pub use client::CommentaryClient;

/// Event labels fed to the commentary prompt
pub mod events {
    pub const NEW_HIRE: &str = "New hire joined";
    pub const HIT_WALL: &str = "Player hit wall";
    pub const COLLISION: &str = "Employee collision";
}
