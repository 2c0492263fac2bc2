//! Front-end surface: the command contract consumed by embedding UIs.

pub mod cli;
