// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

mod algo;
mod capability;
mod version;

pub use algo::*;
pub use capability::*;
pub use version::*;
