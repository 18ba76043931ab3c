//! Flutter-facing bridge crate for voicetodo.

pub mod api;
