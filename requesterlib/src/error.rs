// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use core::fmt;

/// Error numbers surfaced to the caller.
///
/// The protocol-level meanings are:
/// `EBUSY` - responder busy, the whole transaction may be retried;
/// `EDEV` - transport or responder protocol fault;
/// `EUNSUP` - feature, algorithm or connection state not available;
/// `ENOMEM` - a caller or internal buffer was too small;
/// `ESEC`/`EFAULT` - a cryptographic verification failed;
/// `ETIME` - a transport deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmErrorNum {
    EUNDEF,
    EINVAL,
    EIO,
    ETIME,
    ENOMEM,
    EBUSY,
    ENOTRDY,
    EDEV,
    EUNSUP,
    ESEC,
    EFAULT,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SpdmError {
    pub num: SpdmErrorNum,
    pub loc: &'static str,
    pub line: u32,
}

impl SpdmError {
    pub fn new(num: SpdmErrorNum, loc: &'static str, line: u32) -> SpdmError {
        SpdmError { num, loc, line }
    }
}

impl fmt::Debug for SpdmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}:{}", self.num, self.loc, self.line)
    }
}

impl fmt::Display for SpdmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub type SpdmResult<T = ()> = core::result::Result<T, SpdmError>;

#[macro_export]
macro_rules! spdm_err {
    ($num:ident) => {
        $crate::error::SpdmError::new(
            $crate::error::SpdmErrorNum::$num,
            file!(),
            line!(),
        )
    };
}

#[macro_export]
macro_rules! spdm_result_err {
    ($num:ident) => {
        Err($crate::spdm_err!($num))
    };
}

pub use crate::{spdm_err, spdm_result_err};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_error_macros() {
        let err = spdm_err!(EDEV);
        assert_eq!(err.num, SpdmErrorNum::EDEV);

        let result: SpdmResult = spdm_result_err!(EBUSY);
        assert_eq!(result.unwrap_err().num, SpdmErrorNum::EBUSY);
    }
}
