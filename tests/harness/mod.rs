// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for form abuse simulation.
//!
//! Payload corpora, form fixtures and outcome tallies shared by the security
//! tests.

pub mod generators;
pub mod metrics;
pub mod payloads;
