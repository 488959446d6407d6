//! Source queue implementation: Amazon SQS.

pub mod sqs;

pub use sqs::SqsSource;
