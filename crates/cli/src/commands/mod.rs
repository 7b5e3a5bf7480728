// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod capture;
pub mod drain;
pub mod status;
pub mod verify;
