mod client;

pub use client::{HttpClient, HttpClientConfig};
