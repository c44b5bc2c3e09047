//! Configuration and constants

pub mod defaults;
