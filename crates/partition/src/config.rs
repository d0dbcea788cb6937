// This code is part of Qiskit.
//
// (C) Copyright IBM 2025
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

use std::env;

/// Construction-time settings of a [crate::SeparatedUnit].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeparatedConfig {
    /// Seed of the measurement RNG; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl SeparatedConfig {
    pub fn with_seed(seed: u64) -> Self {
        SeparatedConfig { seed: Some(seed) }
    }

    /// Settings taken from the process environment.
    pub fn from_env() -> Self {
        SeparatedConfig {
            seed: getenv_seed(),
        }
    }
}

/// The measurement seed requested through `QSEP_SEED`, if it is set and parses as an integer.
#[inline]
pub fn getenv_seed() -> Option<u64> {
    env::var("QSEP_SEED")
        .ok()
        .and_then(|seed| seed.trim().parse().ok())
}
