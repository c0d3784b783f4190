// Copyright 2026 Taglens Contributors
// SPDX-License-Identifier: Apache-2.0

//! Taglens library: annotation pipeline for booru-backed name translation.

#![allow(
    dead_code,
    unused_imports,
    clippy::new_without_default,
    clippy::should_implement_trait
)]

pub mod api;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod dom;
pub mod engine;
pub mod preview;
pub mod profiles;
pub mod render;
pub mod watch;
