//! FFI bindings for bodymetrics
//!
//! This module provides C-compatible functions for calling the engine from other
//! languages. All functions take and return null-terminated UTF-8 JSON strings;
//! returned strings are owned by the caller and must be released with
//! `bodymetrics_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::{compute_metrics_json, MetricsEngine};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Convert to an owned C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute the report for one request JSON document with the default configuration.
///
/// # Safety
/// - `request_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `bodymetrics_free_string`.
/// - Returns NULL on error; call `bodymetrics_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bodymetrics_compute(request_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(request_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid request string pointer");
            return ptr::null_mut();
        }
    };

    match compute_metrics_json(&json_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Configured Engine API
// ============================================================================

/// Opaque handle to a MetricsEngine
pub struct MetricsEngineHandle {
    engine: MetricsEngine,
}

/// Create an engine from configuration JSON, or with defaults if `config_json` is NULL.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `bodymetrics_engine_free`.
/// - Returns NULL if the configuration is invalid.
#[no_mangle]
pub unsafe extern "C" fn bodymetrics_engine_new(config_json: *const c_char) -> *mut MetricsEngineHandle {
    clear_last_error();

    let engine = if config_json.is_null() {
        MetricsEngine::new()
    } else {
        let json_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match MetricsEngine::from_config_json(&json_str) {
            Ok(engine) => engine,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    Box::into_raw(Box::new(MetricsEngineHandle { engine }))
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a pointer returned by `bodymetrics_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bodymetrics_engine_free(engine: *mut MetricsEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Compute the report for one request JSON document with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `bodymetrics_engine_new`.
/// - `request_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `bodymetrics_free_string`.
/// - Returns NULL on error; call `bodymetrics_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bodymetrics_engine_compute(
    engine: *const MetricsEngineHandle,
    request_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let json_str = match cstr_to_string(request_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid request string pointer");
            return ptr::null_mut();
        }
    };

    match handle.engine.process_json(&json_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by bodymetrics functions.
///
/// # Safety
/// - `ptr` must be a pointer returned by a bodymetrics function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bodymetrics_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next bodymetrics call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn bodymetrics_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn bodymetrics_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> CString {
        CString::new(
            r#"{
                "schema_version": "bodymetrics.request.v1",
                "patient": {
                    "id": "7f9c24e8-3b1a-4d5e-9c6f-2a8b4d6e8f01",
                    "sex": "F",
                    "birth_date": "1988-11-02",
                    "height_m": 1.62
                },
                "assessment": {
                    "id": "0b6d3e2a-5f4c-4a1b-8e7d-9c2f1a3b5d70",
                    "measured_at": "2024-06-01T10:00:00Z",
                    "weight_kg": 58.0,
                    "fat_free_mass_kg": 42.5
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_compute() {
        let request = sample_request();

        unsafe {
            let result = bodymetrics_compute(request.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("bodymetrics.report.v1"));
            assert!(result_str.contains("bioimpedance"));

            bodymetrics_free_string(result);
        }
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        let config = CString::new(r#"{"activity_factors": {"moderate": 1.55}}"#).unwrap();
        let request = sample_request();

        unsafe {
            let engine = bodymetrics_engine_new(config.as_ptr());
            assert!(!engine.is_null());

            let result = bodymetrics_engine_compute(engine, request.as_ptr());
            assert!(!result.is_null());

            let report: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(report["metrics"]["activity_factor"], 1.55);

            bodymetrics_free_string(result);
            bodymetrics_engine_free(engine);

            let default_engine = bodymetrics_engine_new(ptr::null());
            assert!(!default_engine.is_null());
            bodymetrics_engine_free(default_engine);
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        let config = CString::new(r#"{"bmi": {"overweight_from": 10.0}}"#).unwrap();

        unsafe {
            let engine = bodymetrics_engine_new(config.as_ptr());
            assert!(engine.is_null());
            assert!(!bodymetrics_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let invalid_json = CString::new("not json").unwrap();

        unsafe {
            let result = bodymetrics_compute(invalid_json.as_ptr());
            assert!(result.is_null());

            let error = bodymetrics_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            assert!(bodymetrics_engine_compute(ptr::null(), invalid_json.as_ptr()).is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = bodymetrics_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, crate::ENGINE_VERSION);
        }
    }
}
