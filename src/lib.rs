//! # Overview
//! Bloomsim provides a discrete event simulation engine for harmful
//! algal bloom sensing pipelines - simulated water bodies, sensors, and
//! edge/fog/cloud aggregation tiers, composed as a hierarchical coupled
//! model and executed under the Discrete Event System Specification.
//!
//! This repository contains:
//!
//! * A typed event envelope, with one payload variant per event kind, so
//! models pattern-match exhaustively on what they receive.
//! * The atomic-model contract - time advance, internal/external/
//! confluent transitions, and output function - plus hierarchical
//! coupled-model composition with construction-time validation.
//! * A simulation coordinator that flattens nested couplings into direct
//! leaf-to-leaf connectors and drives a three-phase, same-instant-safe
//! step loop.
//! * Random variable framework, for easy specification of stochastic
//! model behaviors.
//! * Prebuilt pipeline models - command dispatch, sampling-request
//! generation, simulated sensing, and fog/cloud storage - for quickly
//! building out sensing simulations.
//!
//! Bloomsim does not require nightly Rust.
pub mod event;
pub mod input_modeling;
pub mod models;
pub mod simulator;
pub mod utils;
