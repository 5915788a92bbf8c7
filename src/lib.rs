//! Sitepipe - asset pipeline and dev loop for static sites
//!
//! Sitepipe turns a tree of development sources (markup pages and
//! fragments, stylesheets, scripts, images, sprites, fonts) into a
//! working output tree, with a one-shot distribution build and a
//! watch-driven dev loop with live-reload signaling.
//!
//! The pieces compose explicitly: a [`layout::ProjectLayout`] resolves
//! the directory contract from `sitepipe.toml`, a
//! [`transform::TransformRegistry`] binds each asset class to a
//! shape-validated chain and output rule, [`task`] builds validated task
//! graphs over those pipelines, and [`scheduler::BuildScheduler`] runs
//! them. [`devloop::DevLoop`] drives selective rebuilds from watched
//! changes.

pub mod asset;
pub mod cli;
pub mod config;
pub mod console;
pub mod deploy;
pub mod devloop;
pub mod layout;
pub mod reload;
pub mod scaffold;
pub mod scheduler;
pub mod select;
pub mod task;
pub mod transform;
pub mod watch;
