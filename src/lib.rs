// SPDX-License-Identifier: MPL-2.0

//! Builds a JSON context for a Facebook page from its profile and most
//! recent posts, persists it per user, and forwards it to a semantic index.

pub mod config;
pub mod context;
pub mod graph;
pub mod index;
pub mod logging;
pub mod runtime;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;
