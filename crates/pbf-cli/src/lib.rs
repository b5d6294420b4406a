// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Headless driver for the PBF stack.
//!
//! Owns everything the solver deliberately does not: particle seeding, the
//! fixed-`dt` frame loop, backend selection and log setup. Nothing is rendered;
//! each run ends with a summary table or JSON document on stdout.

/// Argument parsing and command dispatch.
pub mod cli;
/// Run summaries and their output formats.
pub mod report;
/// Frame loop over a chosen backend and mode.
pub mod run;
/// Initial particle placement.
pub mod seed;
