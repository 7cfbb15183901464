//! Talking to the ledger service
//!
//! `transport` moves bytes and guarantees one completion per request;
//! `client` turns the service's JSON envelopes into typed results.

pub mod client;
pub mod transport;

pub use client::{
    parse_pow_token, user_agent, Client, Info, LeaderboardEntry, API_PREFIX, POW_HEADER,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, Reply, Transport};
