//! Registry module for Docker registry interactions
//!
//! This module provides the listing client for the Docker Registry HTTP API v2,
//! the `Link` header cursor used to page through it, and the browser that ties
//! the repository and tag listings together.

pub mod browser;
pub mod client;
pub mod pagination;

pub use browser::{Listing, RegistryBrowser};
pub use client::{Page, RegistryApi, RegistryClient, RegistryClientBuilder};
pub use pagination::{parse_link_header, Direction, PageCursor, PageQuery};
