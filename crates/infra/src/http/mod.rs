//! HTTP transport shared by the REST-based sink.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
