pub mod adjust;
pub mod chart;
pub mod chart_parser;
pub mod config;
pub mod deviation;
pub mod error;
pub mod history;
pub mod identify;
pub mod metrics;
pub mod predict;
pub mod prob;
pub mod remote;
pub mod report;
pub mod scorer;
pub mod store;
pub mod symbols;
pub mod weights;
