//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Computes `config_hash`: the lowercase hex SHA-256 of the canonical JSON
/// encoding of `config` (SPEC_FULL.md §3). `serde_json` serializes maps as a
/// `BTreeMap` (keys sorted) whenever the `preserve_order` feature is off,
/// which this crate relies on instead of hand-rolled canonicalization.
pub fn config_hash<T: Serialize>(config: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json_bytes(config)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(format!("{:x}", hasher.finalize()))
}

/// The canonical JSON bytes used both for hashing and for `config.json`.
pub fn canonical_json_bytes<T: Serialize>(config: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(config)?;
    serde_json::to_vec(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reordered_keys_hash_equal() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(config_hash(&a).unwrap(), config_hash(&b).unwrap());
    }

    #[test]
    fn different_values_hash_differently() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(config_hash(&a).unwrap(), config_hash(&b).unwrap());
    }
}
