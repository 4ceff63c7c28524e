// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod core;
pub mod persistence;

pub use core::{ChunkStore, StoreError};
pub use persistence::{PersistenceError, StorePersister, CHUNKS_FILE, INDEX_FILE};
