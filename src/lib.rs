#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod classify;
pub mod client;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod heartbeat;
pub mod registry;

pub use classify::{FrameClassifier, JsonClassifier};
pub use client::Client;
pub use config::{Config, ReconnectConfig};
pub use connection::ConnectionManager;
pub use endpoint::Endpoint;
pub use envelope::{ConnectionState, Envelope};
pub use registry::{SubscriberRegistry, SubscriptionHandle};

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
