// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod authz;
mod database;
mod logging;

pub use authz::*;
pub use database::*;
pub use logging::*;
