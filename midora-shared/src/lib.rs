#![cfg_attr(not(test), forbid(unsafe_code))]

//! Shared wire models and configuration for the Midora client platform.

pub mod config;
pub mod models;
