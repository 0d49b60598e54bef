//! Borrowed byte views over guest values.
//!
//! A [`BufferView`] is the only thing handed to a host function. It borrows
//! the guest value it was taken from, so it cannot outlive the call that
//! created it; [`with_view`] scopes it to a closure.

use std::borrow::Cow;
use std::ffi::CStr;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::value::{ChunkedBytes, GuestStr};

/// How the host function finds the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Pointer plus explicit length.
    #[default]
    LengthDelimited,
    /// Pointer to bytes ending in a NUL byte.
    NulTerminated,
}

/// Where the bytes behind a view live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Points straight into guest-owned memory.
    Borrowed,
    /// A temporary copy made for this call.
    Copied,
}

/// Read-only pointer + length window over guest bytes.
#[derive(Debug)]
pub struct BufferView<'a> {
    // Includes the trailing NUL for NulTerminated views.
    data: Cow<'a, [u8]>,
    termination: Termination,
}

impl<'a> BufferView<'a> {
    fn borrowed(bytes: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(bytes),
            termination: Termination::LengthDelimited,
        }
    }

    fn borrowed_with_nul(bytes_with_nul: &'a [u8]) -> Self {
        debug_assert_eq!(bytes_with_nul.last(), Some(&0));
        Self {
            data: Cow::Borrowed(bytes_with_nul),
            termination: Termination::NulTerminated,
        }
    }

    fn copied(bytes: Vec<u8>) -> Self {
        Self {
            data: Cow::Owned(bytes),
            termination: Termination::LengthDelimited,
        }
    }

    fn copied_with_nul(bytes: &[u8]) -> Result<Self, BridgeError> {
        check_no_interior_nul(bytes)?;
        let mut data = Vec::with_capacity(bytes.len() + 1);
        data.extend_from_slice(bytes);
        data.push(0);
        Ok(Self {
            data: Cow::Owned(data),
            termination: Termination::NulTerminated,
        })
    }

    /// The viewed bytes, never including a terminator.
    pub fn as_bytes(&self) -> &[u8] {
        match self.termination {
            Termination::LengthDelimited => &self.data,
            Termination::NulTerminated => &self.data[..self.data.len() - 1],
        }
    }

    /// Start of the buffer. Valid for [`len`](Self::len) bytes, plus the
    /// terminator for NUL-terminated views, while `self` is alive.
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn provenance(&self) -> Provenance {
        match self.data {
            Cow::Borrowed(_) => Provenance::Borrowed,
            Cow::Owned(_) => Provenance::Copied,
        }
    }

    /// The view as a C string. `None` for length-delimited views.
    pub fn as_c_str(&self) -> Option<&CStr> {
        match self.termination {
            Termination::LengthDelimited => None,
            Termination::NulTerminated => CStr::from_bytes_with_nul(&self.data).ok(),
        }
    }
}

/// Capability: the value can lend out its bytes as a [`BufferView`].
pub trait ByteView {
    fn byte_view(&self, termination: Termination) -> Result<BufferView<'_>, BridgeError>;
}

impl ByteView for [u8] {
    fn byte_view(&self, termination: Termination) -> Result<BufferView<'_>, BridgeError> {
        match termination {
            Termination::LengthDelimited => Ok(BufferView::borrowed(self)),
            Termination::NulTerminated => BufferView::copied_with_nul(self),
        }
    }
}

impl ByteView for Vec<u8> {
    fn byte_view(&self, termination: Termination) -> Result<BufferView<'_>, BridgeError> {
        self.as_slice().byte_view(termination)
    }
}

impl ByteView for GuestStr {
    fn byte_view(&self, termination: Termination) -> Result<BufferView<'_>, BridgeError> {
        match termination {
            Termination::LengthDelimited => Ok(BufferView::borrowed(self.as_bytes())),
            Termination::NulTerminated => {
                check_no_interior_nul(self.as_bytes())?;
                Ok(BufferView::borrowed_with_nul(self.as_bytes_with_nul()))
            }
        }
    }
}

impl ByteView for ChunkedBytes {
    fn byte_view(&self, termination: Termination) -> Result<BufferView<'_>, BridgeError> {
        match termination {
            Termination::LengthDelimited => Ok(BufferView::copied(self.to_vec())),
            Termination::NulTerminated => BufferView::copied_with_nul(&self.to_vec()),
        }
    }
}

/// Acquire a view of `source`, run `f` with it, and release it before
/// returning.
pub fn with_view<R>(
    source: &dyn ByteView,
    termination: Termination,
    f: impl FnOnce(&BufferView<'_>) -> R,
) -> Result<R, BridgeError> {
    let view = source.byte_view(termination)?;
    Ok(f(&view))
}

fn check_no_interior_nul(bytes: &[u8]) -> Result<(), BridgeError> {
    match bytes.iter().position(|&b| b == 0) {
        Some(position) => Err(BridgeError::InteriorNul { position }),
        None => Ok(()),
    }
}
