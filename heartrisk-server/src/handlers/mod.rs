//! HTTP handlers

pub mod root;
pub mod health;
pub mod predict;
