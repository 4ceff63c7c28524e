// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod api;
pub mod chunking;
pub mod core;
pub mod corpus;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod retrieval;
pub mod service;
pub mod store;
