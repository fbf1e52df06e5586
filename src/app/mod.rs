pub mod analyze;
pub mod chart;
pub mod data_io;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod runtime;
pub mod text;
pub mod tui;
pub mod types;
pub mod ui_utils;

pub use error::AnalysisError;
pub use runtime::{analyze, analyze_url, run};
pub use types::{Analysis, AnalysisMetrics, AnalysisReport, AnalysisRequest};
