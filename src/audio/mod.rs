//! # Audio Module
//!
//! Tracks, the per-guild queue and the audio backend boundary.
//!
//! ## Architecture
//!
//! ### [`track`] - Track Metadata
//! - Immutable description of a playable item (title, duration, source URI)
//! - [`track::PlaybackId`]: identifies one playback attempt of a track
//!
//! ### [`queue`] - Queue Management
//! - Ordered pending tracks with capacity limit, shuffle and pagination
//!
//! ### [`backend`] - Backend Boundary
//! - [`backend::AudioBackend`]: play/pause/resume/stop/volume/position
//! - Track start/end and node notifications arrive as
//!   [`backend::BackendEvent`]s over a channel
//!
//! ### [`songbird_backend`] - Songbird Driver
//! - [`backend::AudioBackend`] over songbird with `yt-dlp` inputs

pub mod backend;
pub mod queue;
pub mod songbird_backend;
pub mod track;
