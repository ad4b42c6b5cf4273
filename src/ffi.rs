//! FFI bindings for the Calm Cycle engine
//!
//! This module provides C-compatible functions for calling the engine from other
//! languages. All functions take and return JSON in null-terminated C strings.
//! Returned strings are allocated here and must be freed by the caller using
//! `calmcycle_free_string`.
//!
//! A NULL `today` means the host's local current date.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::dates::{local_today, parse_iso_date, CalendarDate};
use crate::error::EngineError;
use crate::pipeline::{snapshot_from_json, CycleEngine};
use crate::types::{CycleRecord, EventLog};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Read a required string argument
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Result<String, EngineError> {
    cstr_to_string(ptr).ok_or_else(|| EngineError::InvalidInput(format!("Invalid {name} string pointer")))
}

/// Read an optional `today` argument
unsafe fn optional_today(ptr: *const c_char) -> Result<Option<CalendarDate>, EngineError> {
    if ptr.is_null() {
        return Ok(None);
    }
    let s = required_arg(ptr, "today")?;
    parse_iso_date(&s).map(Some)
}

/// Hand a result across the boundary: a new string on success, NULL plus the
/// last error on failure.
fn finish(result: Result<String, EngineError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, EngineError> {
    serde_json::to_string(value).map_err(|e| EngineError::Encoding(e.to_string()))
}

// ============================================================================
// Snapshot API
// ============================================================================

/// Compute a full snapshot for a tracker document.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `today` must be NULL or a valid null-terminated `YYYY-MM-DD` C string.
/// - Returns a newly allocated string that must be freed with `calmcycle_free_string`.
/// - Returns NULL on error; call `calmcycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn calmcycle_snapshot_json(
    json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let result = (|| -> Result<String, EngineError> {
        let json_str = required_arg(json, "JSON")?;
        let today = optional_today(today)?;
        snapshot_from_json(&json_str, today)
    })();
    finish(result)
}

// ============================================================================
// Core Operations
// ============================================================================

/// Derive cycle records from a JSON array of marked dates.
///
/// # Safety
/// - `marks_json` must be a valid null-terminated C string holding a JSON array
///   of `YYYY-MM-DD` strings.
/// - `previous_json` must be NULL or a JSON array of cycle records.
/// - Returns a newly allocated string that must be freed with `calmcycle_free_string`.
/// - Returns NULL on error; call `calmcycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn calmcycle_derive_json(
    marks_json: *const c_char,
    previous_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let result = (|| -> Result<String, EngineError> {
        let marks: Vec<CalendarDate> = serde_json::from_str(&required_arg(marks_json, "marks")?)?;
        let previous: Vec<CycleRecord> = if previous_json.is_null() {
            Vec::new()
        } else {
            serde_json::from_str(&required_arg(previous_json, "previous")?)?
        };
        to_json(&CycleEngine::new().derive_cycles(marks, &previous))
    })();
    finish(result)
}

/// Predict upcoming cycles from a JSON array of cycle records.
///
/// Returns the JSON `null` literal for an empty history.
///
/// # Safety
/// - `cycles_json` must be a valid null-terminated C string.
/// - `today` must be NULL or a valid null-terminated `YYYY-MM-DD` C string.
/// - Returns a newly allocated string that must be freed with `calmcycle_free_string`.
/// - Returns NULL on error; call `calmcycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn calmcycle_predict_json(
    cycles_json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let result = (|| -> Result<String, EngineError> {
        let cycles: Vec<CycleRecord> = serde_json::from_str(&required_arg(cycles_json, "cycles")?)?;
        let today = optional_today(today)?.unwrap_or_else(local_today);
        to_json(&CycleEngine::new().predict(&cycles, today))
    })();
    finish(result)
}

/// Assess pregnancy risk for one event against a cycle history.
///
/// # Safety
/// - `event_json` and `cycles_json` must be valid null-terminated C strings.
/// - `today` must be NULL or a valid null-terminated `YYYY-MM-DD` C string.
/// - Returns a newly allocated string that must be freed with `calmcycle_free_string`.
/// - Returns NULL on error; call `calmcycle_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn calmcycle_assess_risk_json(
    event_json: *const c_char,
    cycles_json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let result = (|| -> Result<String, EngineError> {
        let event: EventLog = serde_json::from_str(&required_arg(event_json, "event")?)?;
        let cycles: Vec<CycleRecord> = serde_json::from_str(&required_arg(cycles_json, "cycles")?)?;
        let today = optional_today(today)?.unwrap_or_else(local_today);
        to_json(&CycleEngine::new().assess_risk(&event, &cycles, today))
    })();
    finish(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by calmcycle functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a calmcycle function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn calmcycle_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next calmcycle function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn calmcycle_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the engine library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn calmcycle_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn cycles_json() -> CString {
        CString::new(
            r#"[
                {"id": "a", "start_date": "2024-01-01", "end_date": "2024-01-05"},
                {"id": "b", "start_date": "2024-01-29", "end_date": "2024-02-02"}
            ]"#,
        )
        .unwrap()
    }

    unsafe fn take(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        calmcycle_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_snapshot() {
        let json = CString::new(r#"{"marked_days": ["2024-01-01", "2024-01-02"]}"#).unwrap();
        let today = CString::new("2024-01-10").unwrap();

        unsafe {
            let result = take(calmcycle_snapshot_json(json.as_ptr(), today.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&result).unwrap();
            assert_eq!(value["computed_for"], "2024-01-10");
            assert_eq!(value["cycles"][0]["id"], "cycle-2024-01-01");
        }
    }

    #[test]
    fn test_ffi_derive() {
        let marks = CString::new(r#"["2024-01-03", "2024-01-01", "2024-01-02"]"#).unwrap();

        unsafe {
            let result = take(calmcycle_derive_json(marks.as_ptr(), ptr::null()));
            let records: Vec<CycleRecord> = serde_json::from_str(&result).unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].period_length(), Some(3));
        }
    }

    #[test]
    fn test_ffi_predict() {
        let cycles = cycles_json();
        let today = CString::new("2024-02-05").unwrap();
        let empty = CString::new("[]").unwrap();

        unsafe {
            let result = take(calmcycle_predict_json(cycles.as_ptr(), today.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&result).unwrap();
            assert_eq!(value["next_cycles"][0]["start_date"], "2024-02-26");

            let none = take(calmcycle_predict_json(empty.as_ptr(), today.as_ptr()));
            assert_eq!(none, "null");
        }
    }

    #[test]
    fn test_ffi_assess_risk() {
        let event = CString::new(r#"{"id": "e1", "date": "2024-02-10", "protection": "unprotected"}"#)
            .unwrap();
        let cycles = cycles_json();
        let today = CString::new("2024-02-20").unwrap();

        unsafe {
            let result = take(calmcycle_assess_risk_json(
                event.as_ptr(),
                cycles.as_ptr(),
                today.as_ptr(),
            ));
            let value: serde_json::Value = serde_json::from_str(&result).unwrap();
            assert_eq!(value["risk_level"], "High");
            assert_eq!(value["stages"][0]["ready"], true);
            assert_eq!(value["stages"][2]["ready"], false);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = calmcycle_snapshot_json(invalid_json.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = calmcycle_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.starts_with("Invalid JSON"));

            let bad_today = CString::new("2024-02-30").unwrap();
            let cycles = cycles_json();
            let result = calmcycle_predict_json(cycles.as_ptr(), bad_today.as_ptr());
            assert!(result.is_null());
            let error_str = CStr::from_ptr(calmcycle_last_error()).to_str().unwrap();
            assert!(error_str.starts_with("Date parse error"));

            let result = calmcycle_predict_json(ptr::null(), ptr::null());
            assert!(result.is_null());
        }
    }

    #[test]
    fn test_ffi_far_future_dates_do_not_abort() {
        let cycles =
            CString::new(r#"[{"id": "far", "start_date": "+262142-12-20", "end_date": "+262142-12-24"}]"#)
                .unwrap();
        let event =
            CString::new(r#"{"id": "e1", "date": "+262142-12-25", "protection": "unprotected"}"#).unwrap();
        let today = CString::new("2024-01-01").unwrap();

        unsafe {
            let result = take(calmcycle_predict_json(cycles.as_ptr(), today.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&result).unwrap();
            assert_eq!(value["next_cycles"][0]["start_date"], "+262142-12-31");

            let result = take(calmcycle_assess_risk_json(
                event.as_ptr(),
                cycles.as_ptr(),
                today.as_ptr(),
            ));
            let value: serde_json::Value = serde_json::from_str(&result).unwrap();
            assert_eq!(value["stages"][2]["date"], "+262142-12-31");
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = calmcycle_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, crate::ENGINE_VERSION);
        }
    }
}
