// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod types;

pub use types::{Category, CategoryParseError, Chunk, ChunkRecord, ScoredChunk};
