//! Base types for toplevel window geometry management.
//!
//! This crate contains the types, traits and basic functions from [`toplevel`] that are
//! platform independent: rectangles and gravity, geometry hints and the window-system size
//! constraint, monitor descriptions and the ordered monitor set, window and modifier state
//! masks, and the [`WindowSystem`][backend::WindowSystem] trait a backend implements. It is
//! intended to allow alternative backends for [`toplevel`] to be written without pulling in the
//! reconciliation machinery itself.
//!
//! [`toplevel`]: https://docs.rs/toplevel

#[macro_use]
pub mod error;
pub mod backend;
pub mod event;
pub mod geometry;
pub mod hints;
pub mod monitor;
pub mod state;

pub use dpi;
