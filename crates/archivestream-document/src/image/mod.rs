// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — resample and shrink transforms for embedded images.

pub mod optimizer;

pub use optimizer::{ImageOptimizer, OptimizedImage};
