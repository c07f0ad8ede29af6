//! Fetches the GDELT 2.0 translation export, parses it into typed events,
//! geocodes actors and derives the arcs, points, country tints and table rows
//! a globe or map renderer draws.

pub mod aggregate;
pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod fetch;
pub mod geo;
pub mod parser;
pub mod pipeline;
pub mod reference;
pub mod schedule;
pub mod table;
pub mod view;

pub use app::{App, CycleOutcome};
pub use config::Config;
pub use data::Event;
pub use fetch::FeedError;
pub use pipeline::Snapshot;
