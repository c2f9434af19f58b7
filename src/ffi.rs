//! Unified C ABI (behind the `capi` feature). Resolves an Open Question
//! from spec.md §9: the original carries two divergent C headers
//! (`c_abi.h`, `c_api.h`); both converge here on one opaque-handle,
//! null-on-failure shape — `ModelHandle`, `compile`, `last_error` — per
//! spec.md §7 ("The C/foreign boundary catches the abort and returns a
//! null/failure result after draining the error stream").
//!
//! Lexing/parsing and the JIT emitter are out of scope (spec.md Non-goals);
//! `compile` accepts an already-resolved `CompiledModel` built in-process
//! and hands the foreign caller an opaque handle to it, rather than
//! pretending to parse raw source text across the boundary.

use crate::compiler::CompiledModel;
use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

fn set_last_error(message: impl Into<Vec<u8>>) {
    let c_string = CString::new(message).unwrap_or_else(|_| CString::new("<error message contained NUL>").unwrap());
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(c_string));
}

/// An opaque handle to a compiled model, owned by the caller until passed
/// to [`modelc_free`].
pub struct ModelHandle {
    model: CompiledModel,
}

/// Takes ownership of `model` and returns an opaque handle to it, or
/// `null` if constructing the handle itself panics (it shouldn't; this
/// mirrors the null-on-failure contract every boundary function follows).
pub fn compile(model: CompiledModel) -> *mut ModelHandle {
    let result = catch_unwind(AssertUnwindSafe(|| Box::new(ModelHandle { model })));
    match result {
        Ok(boxed) => Box::into_raw(boxed),
        Err(_) => {
            set_last_error("internal error constructing model handle");
            std::ptr::null_mut()
        }
    }
}

/// Number of groups in the compiled model's schedule. `0` (with
/// `last_error` set) if `handle` is null.
///
/// # Safety
/// `handle` must be either null or a live pointer previously returned by
/// [`compile`] and not yet passed to [`modelc_free`].
pub unsafe fn group_count(handle: *const ModelHandle) -> usize {
    if handle.is_null() {
        set_last_error("null model handle");
        return 0;
    }
    (*handle).model.groups.len()
}

/// Returns the most recent error message set on this thread, or null if
/// none. The returned pointer is valid until the next call into this
/// module on the same thread.
pub fn last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(std::ptr::null())
    })
}

/// Releases a handle returned by [`compile`].
///
/// # Safety
/// `handle` must be a pointer previously returned by [`compile`] that has
/// not already been freed, or null (a no-op).
pub unsafe fn modelc_free(handle: *mut ModelHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompiledModel;
    use crate::instructions::InstructionSet;

    fn empty_model() -> CompiledModel {
        CompiledModel {
            instructions: InstructionSet::default(),
            groups: Vec::new(),
            code: Vec::new(),
        }
    }

    #[test]
    fn compile_then_group_count_round_trips() {
        let handle = compile(empty_model());
        assert!(!handle.is_null());
        let count = unsafe { group_count(handle) };
        assert_eq!(count, 0);
        unsafe { modelc_free(handle) };
    }

    #[test]
    fn null_handle_reports_an_error_and_zero() {
        let count = unsafe { group_count(std::ptr::null()) };
        assert_eq!(count, 0);
        assert!(!last_error().is_null());
    }
}
