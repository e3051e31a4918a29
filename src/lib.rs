//! Paste Uploader - image paste handling for markdown editors
//!
//! This crate intercepts image pastes, uploads the image to a configured
//! server and links the returned URL into the note, with a placeholder
//! standing in while the upload runs.

pub mod auth;
pub mod clipboard;
pub mod config;
pub mod editor;
pub mod notify;
pub mod orchestrator;
pub mod placeholder;
pub mod replace;
pub mod settings;
pub mod upload;
