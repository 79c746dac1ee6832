//! API Layer - rate-limited access to the MLB Stats API
//!
//! All network traffic goes through [`StatsClient`], which enforces a
//! minimum interval between request starts and retries transient failures
//! with exponential backoff. The HTTP transport and the clock are traits so
//! tests run against scripted responses and a manual clock.

pub mod client;
pub mod endpoints;

pub use client::{
    ClientConfig, Clock, GatewayResponse, HttpGateway, ManualClock, ReqwestGateway, RetryPolicy,
    ScriptedGateway, ScriptedReply, StatsClient, SystemClock,
};
