//! Shared domain types for the MacroOverlay project.

pub mod advice;
pub mod config;
pub mod events;
pub mod game;
pub mod geometry;
pub mod rules;
pub mod telemetry;
pub mod view;

mod errors;

pub use errors::{OverlayError, Result};
