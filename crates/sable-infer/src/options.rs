// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Inference options.

use sable_types::VOID;

/// Options that control type inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferOptions {
    /// Number of argument type combinations at a single call site above
    /// which a warning is logged. Resolution still proceeds.
    pub combination_warn_limit: usize,
    /// Core class a native procedure declared with a `?` return resolves
    /// to, since it has no body to infer from.
    pub native_return_fallback: String,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            combination_warn_limit: 256,
            native_return_fallback: VOID.to_string(),
        }
    }
}
