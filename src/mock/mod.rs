//! Mock downstream collector
//!
//! Provides an in-process OTLP metrics endpoint for testing the forwarding
//! path end to end.

pub mod service;

pub use service::MockCollector;
