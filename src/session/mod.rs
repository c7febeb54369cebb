//! # Playback Sessions
//!
//! One session per guild: the queue, the track currently playing and the
//! per-guild playback settings.
//!
//! ## Architecture
//!
//! - [`SessionRegistry`]: concurrent guild → session map. Only `play` may
//!   create a session; everything else needs one to exist.
//! - Each session runs as its own task ([`actor`]) draining an ordered inbox,
//!   so commands and backend callbacks for one guild never interleave while
//!   different guilds proceed in parallel.
//! - [`reconciler::Reconciler`] applies commands and events to the
//!   [`state::Session`], awaiting every external call (with a timeout) before
//!   touching state.
//! - [`InactivitySweeper`] periodically closes idle sessions.

pub mod actor;
pub mod autoplay;
pub mod command;
pub mod error;
pub mod reconciler;
pub mod registry;
pub mod state;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{Caller, Command, CommandOutcome, Notification, SessionEvent};
pub use error::{SessionError, SessionResult};
pub use reconciler::Collaborators;
pub use registry::SessionRegistry;
pub use state::PlaybackState;
pub use sweeper::InactivitySweeper;
