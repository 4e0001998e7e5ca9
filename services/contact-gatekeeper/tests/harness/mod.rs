// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for the contact gatekeeper.
//!
//! Test doubles for the CAPTCHA and relay capabilities, request builders,
//! and outcome tallies for simulating automated form traffic.
#![allow(dead_code)]

pub mod attacks;
pub mod generators;
pub mod metrics;
