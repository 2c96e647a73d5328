//! Freshlens Core
//!
//! Core types and pure analysis for the freshlens dbt Cloud analyzer.
//!
//! This crate contains:
//! - Domain types: Jobs, runs, steps, result artifacts and aggregates
//! - DTOs: Wire envelopes for the REST and GraphQL APIs
//! - Analysis: Pure derivations (job classification, cost, overlap, coverage)

pub mod analysis;
pub mod domain;
pub mod dto;
