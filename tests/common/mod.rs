//! Common test utilities for hexlayer.

#![allow(dead_code)]

pub mod assertions;
pub mod http_client;
pub mod test_data;
