//! `matfit` library crate.
//!
//! Identifies the parameters of constitutive material models (Johnson-Cook,
//! Zerilli-Armstrong, Khan-Huang-Liang) from stress-strain data and checks
//! how well each optimum is determined.
//!
//! The binary (`matfit`) is a thin wrapper around this library so that the
//! whole pipeline is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod optim;
pub mod report;
pub mod sensitivity;
