pub mod client;
pub mod probe;

pub use client::{HttpClient, HttpClientBuilder, HttpResponse};
pub use probe::{Probe, ProbeOutcome};
