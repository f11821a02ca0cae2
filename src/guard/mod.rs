//! SQL-injection guard.
//!
//! - [`registry`] compiles the detection patterns once at startup.
//! - [`sampler`] turns a request into the text that gets scanned.
//! - [`scanner`] runs the patterns over that text and times the decision.
//! - [`interceptor`] ties the three together and decides block or forward.

pub mod interceptor;
pub mod registry;
pub mod sampler;
pub mod scanner;

pub use interceptor::{DEFAULT_TIMING_HEADER, Interceptor, Outcome, Rejection, Verdict};
pub use registry::{DEFAULT_PATTERNS, DetectionRule, PatternRegistry};
pub use sampler::{BodyText, InspectedRequest};
pub use scanner::{ScanResult, ThreatScanner};
