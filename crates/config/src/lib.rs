//! Request handling for the Slack resource's `out` step.
//!
//! Decodes the orchestrator's `source` / `params` envelope, validates it,
//! and merges it into an [`EffectiveConfig`] with `{{ VAR }}` placeholders in
//! message content replaced from the build environment.

pub mod error;
pub mod interpolate;
pub mod resolve;
pub mod schema;

pub use {
    error::{Error, Result, ValidationError},
    interpolate::{interpolate_env, interpolate_with},
    resolve::{Action, DEFAULT_WORK_DIR, EffectiveConfig, Resolver, prepare, resolve, validate},
    schema::{CheckRequest, GetRequest, Params, PutRequest, Source, Version, VersionResponse},
};
