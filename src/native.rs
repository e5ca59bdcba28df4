//! String boundary towards a native analysis library
//!
//! Strings cross the boundary as NUL-terminated UTF-8. A string returned by
//! the library is either borrowed (the library keeps it alive) or owned (the
//! caller must hand it back to the library's destroy entry point, exactly
//! once). [`OwnedNativeString`] enforces the latter with `Drop`.

use std::ffi::{c_char, CStr, CString};
use std::iter::FusedIterator;
use std::mem;

use crate::error::{Error, Result};

/// Who releases a string returned by the native library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The library keeps the buffer alive; never destroy it
    Borrowed,
    /// The caller owns the buffer and must destroy it through [`NativeApi`]
    Owned,
}

/// Entry points of the native library needed at the string boundary
pub trait NativeApi {
    /// Release a string the library handed over with [`Ownership::Owned`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this library as owned and must not
    /// have been destroyed already.
    unsafe fn destroy_string(&self, ptr: *const c_char);
}

/// Encode a string for the library. Fails if it contains a NUL byte.
pub fn to_native(s: impl AsRef<[u8]>) -> Result<CString> {
    CString::new(s.as_ref()).map_err(|e| Error::InteriorNul(e.nul_position()))
}

/// Decode a string returned by the library.
///
/// NULL decodes to the empty string. An owned buffer is destroyed before
/// returning, including when decoding fails.
///
/// # Safety
///
/// `ptr` must be NULL or point to a NUL-terminated buffer that stays valid
/// for the duration of the call. With [`Ownership::Owned`], see
/// [`NativeApi::destroy_string`].
pub unsafe fn from_native<A: NativeApi + ?Sized>(api: &A, ptr: *const c_char, ownership: Ownership) -> Result<String> {
    if ptr.is_null() {
        return Ok(String::new());
    }
    match ownership {
        Ownership::Borrowed => Ok(CStr::from_ptr(ptr).to_str()?.to_owned()),
        Ownership::Owned => OwnedNativeString::new(api, ptr).to_str().map(str::to_owned),
    }
}

/// A library-owned string released when dropped
pub struct OwnedNativeString<'a, A: NativeApi + ?Sized> {
    api: &'a A,
    ptr: *const c_char,
}

impl<'a, A: NativeApi + ?Sized> OwnedNativeString<'a, A> {
    /// Take ownership of `ptr`.
    ///
    /// # Safety
    ///
    /// Same contract as [`from_native`] with [`Ownership::Owned`]; the buffer
    /// must stay valid until it is destroyed.
    pub unsafe fn new(api: &'a A, ptr: *const c_char) -> Self {
        Self { api, ptr }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    pub fn as_c_str(&self) -> Option<&CStr> {
        // SAFETY: non-NULL pointers are valid NUL-terminated buffers until drop
        (!self.ptr.is_null()).then(|| unsafe { CStr::from_ptr(self.ptr) })
    }

    /// UTF-8 content; NULL reads as the empty string
    pub fn to_str(&self) -> Result<&str> {
        match self.as_c_str() {
            Some(s) => s.to_str().map_err(Error::from),
            None => Ok(""),
        }
    }

    /// Give the buffer back without destroying it
    pub fn into_raw(self) -> *const c_char {
        let ptr = self.ptr;
        mem::forget(self);
        ptr
    }
}

impl<A: NativeApi + ?Sized> Drop for OwnedNativeString<'_, A> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: guaranteed by the constructor contract; drop runs once
            unsafe { self.api.destroy_string(self.ptr) }
        }
    }
}

// =============================================================================
// Index Iteration
// =============================================================================

/// Lazily visit `get(0) .. get(count - 1)`, skipping indices for which `get`
/// yields `None`.
///
/// Native arrays are exposed as a count plus an index accessor; this turns
/// them into an iterator. The iterator is finite, and [`Indexed::restart`]
/// (or cloning before use) reindexes from the start.
pub fn indexed<T, F>(count: usize, get: F) -> Indexed<F>
where
    F: Fn(usize) -> Option<T>,
{
    Indexed { next: 0, count, get }
}

#[derive(Debug, Clone)]
pub struct Indexed<F> {
    next: usize,
    count: usize,
    get: F,
}

impl<F> Indexed<F> {
    pub fn restart(&mut self) {
        self.next = 0;
    }
}

impl<T, F> Iterator for Indexed<F>
where
    F: Fn(usize) -> Option<T>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while self.next < self.count {
            let index = self.next;
            self.next += 1;
            if let Some(value) = (self.get)(index) {
                return Some(value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count - self.next))
    }
}

impl<T, F> FusedIterator for Indexed<F> where F: Fn(usize) -> Option<T> {}
