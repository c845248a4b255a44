// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cluster;
pub mod compare;
pub mod config;
pub mod constants;
pub mod error;
pub mod factory;
pub mod image;
pub mod kubernetes;
pub mod registry;
pub mod store;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
