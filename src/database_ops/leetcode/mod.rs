//! LeetCode GraphQL transport: ranking pages and per-identity profiles.

pub mod client;
pub mod headers;
pub mod queries;
pub mod types;

pub use client::{LeetCodeClient, LeetCodeConfig};
