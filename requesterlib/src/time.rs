// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Wait hook for the RESPONSE_NOT_READY retry.
//!
//! The delay derived from the responder RDT exponent is platform policy, so
//! it is routed through a registered callback. Without a registration the
//! `std` build sleeps on the current thread and a `no_std` build does not
//! wait at all.

use conquer_once::spin::OnceCell;

#[derive(Clone)]
pub struct SpdmTime {
    pub sleep_cb: fn(us: usize),
}

static TIME: OnceCell<SpdmTime> = OnceCell::uninit();

pub fn register(context: SpdmTime) -> bool {
    TIME.try_init_once(|| context).is_ok()
}

pub fn sleep(us: usize) {
    if let Ok(time) = TIME.try_get() {
        (time.sleep_cb)(us);
        return;
    }
    #[cfg(feature = "std")]
    std::thread::sleep(core::time::Duration::from_micros(us as u64));
    #[cfg(not(feature = "std"))]
    let _ = us;
}
