// ABOUTME: PostgreSQL connectivity module
// ABOUTME: Exports TLS-enabled connection helpers with retry support

pub mod connection;

pub use connection::{connect, connect_with_retry};
