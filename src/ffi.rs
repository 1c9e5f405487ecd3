//! FFI bindings for Surf Match
//!
//! This module provides C-compatible functions for calling the engine from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `surf_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::pipeline::{best_matches_json, SurfLogProcessor};
use crate::trainer::ModelKind;
use crate::types::{HourlySeries, SessionLogEntry};

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

/// Read a required string argument, recording an error when it is missing
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {name} string pointer"));
    }
    value
}

/// Parse an optional config; NULL selects the defaults
unsafe fn optional_config(ptr: *const c_char) -> Result<EngineConfig, ComputeError> {
    match cstr_to_string(ptr) {
        Some(json) => EngineConfig::from_json(&json),
        None => Ok(EngineConfig::default()),
    }
}

fn string_result(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Train on a log and return a match report for a forecast.
///
/// # Safety
/// - `log_json` and `forecast_json` must be valid null-terminated C strings.
/// - `config_json` may be NULL to use the default break configuration.
/// - Returns a newly allocated string that must be freed with `surf_free_string`.
/// - Returns NULL on error; call `surf_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn surf_best_matches(
    log_json: *const c_char,
    forecast_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(log) = required_arg(log_json, "log JSON") else {
        return ptr::null_mut();
    };
    let Some(forecast) = required_arg(forecast_json, "forecast JSON") else {
        return ptr::null_mut();
    };

    string_result(
        optional_config(config_json).and_then(|config| best_matches_json(&log, &forecast, &config)),
    )
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a SurfLogProcessor
pub struct SurfProcessorHandle {
    processor: SurfLogProcessor,
}

/// Create a new processor.
///
/// # Safety
/// - `config_json` may be NULL to use the default break configuration.
/// - Returns a pointer to a newly allocated processor; free with `surf_processor_free`.
/// - Returns NULL on an invalid configuration.
#[no_mangle]
pub unsafe extern "C" fn surf_processor_new(config_json: *const c_char) -> *mut SurfProcessorHandle {
    clear_last_error();

    match optional_config(config_json).and_then(SurfLogProcessor::with_config) {
        Ok(processor) => Box::into_raw(Box::new(SurfProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `surf_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn surf_processor_free(processor: *mut SurfProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Replace the processor's log with a JSON array of entries.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `surf_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn surf_processor_load_log(
    processor: *mut SurfProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }
    let handle = &mut *processor;

    let Some(json_str) = required_arg(json, "JSON") else {
        return -1;
    };

    match handle.processor.load_log(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Serialize the processor's log to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `surf_processor_new`.
/// - Returns a newly allocated string that must be freed with `surf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn surf_processor_save_log(processor: *mut SurfProcessorHandle) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    string_result(handle.processor.save_log())
}

/// Add one entry and return its id.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `surf_processor_new`.
/// - `entry_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `surf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn surf_processor_add_entry(
    processor: *mut SurfProcessorHandle,
    entry_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *processor;

    let Some(json_str) = required_arg(entry_json, "entry JSON") else {
        return ptr::null_mut();
    };

    let result = serde_json::from_str::<SessionLogEntry>(&json_str)
        .map_err(ComputeError::from)
        .and_then(|entry| handle.processor.add_entry(entry));
    string_result(result)
}

/// Delete an entry by id.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `surf_processor_new`.
/// - `id` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn surf_processor_delete_entry(
    processor: *mut SurfProcessorHandle,
    id: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }
    let handle = &mut *processor;

    let Some(id_str) = required_arg(id, "id") else {
        return -1;
    };

    match handle.processor.delete_entry(&id_str) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Merge a JSON array of entries into the log.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `surf_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns the number of entries imported, or -1 on error.
#[no_mangle]
pub unsafe extern "C" fn surf_processor_import(
    processor: *mut SurfProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }
    let handle = &mut *processor;

    let Some(json_str) = required_arg(json, "JSON") else {
        return -1;
    };

    match handle.processor.import_json(&json_str) {
        Ok(count) => i32::try_from(count).unwrap_or(i32::MAX),
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Weight shares of one model as JSON (`null` when untrained).
///
/// `model` is 0 for the wave model and 1 for the wind model.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `surf_processor_new`.
/// - Returns a newly allocated string that must be freed with `surf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn surf_processor_weights(
    processor: *mut SurfProcessorHandle,
    model: i32,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let kind = match model {
        0 => ModelKind::Wave,
        1 => ModelKind::Wind,
        other => {
            set_last_error(&format!("Unknown model selector {other}"));
            return ptr::null_mut();
        }
    };

    string_result(
        serde_json::to_string(&handle.processor.weight_shares(kind)).map_err(ComputeError::from),
    )
}

/// Match report for a forecast using the processor's log and models.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `surf_processor_new`.
/// - `forecast_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `surf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn surf_processor_report(
    processor: *mut SurfProcessorHandle,
    forecast_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some(json_str) = required_arg(forecast_json, "forecast JSON") else {
        return ptr::null_mut();
    };

    let result = serde_json::from_str::<HourlySeries>(&json_str)
        .map_err(ComputeError::from)
        .and_then(|forecast| handle.processor.report_json(&forecast));
    string_result(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Surf Match functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Surf Match function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn surf_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Surf Match call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn surf_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn surf_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_forecast_json() -> CString {
        let times: Vec<String> = (0..24)
            .map(|h| format!("\"2024-09-01T{h:02}:00:00\""))
            .collect();
        CString::new(format!(
            r#"{{
                "time": [{}],
                "swell_height_ft": [{}],
                "swell_period_s": [{}],
                "swell_direction_deg": [{}],
                "wind_speed_mph": [{}],
                "wind_direction_deg": [{}]
            }}"#,
            times.join(","),
            vec!["3.0"; 24].join(","),
            vec!["11.0"; 24].join(","),
            vec!["140.0"; 24].join(","),
            vec!["7.0"; 24].join(","),
            vec!["330.0"; 24].join(","),
        ))
        .unwrap()
    }

    fn sample_entry_json(id: &str) -> CString {
        CString::new(format!(
            r#"{{
                "id": "{id}",
                "timestamp": "2024-08-20T07:00:00",
                "ratings": {{"size": 6, "wind_quality": 7, "ride_quality": 8}},
                "notes": "",
                "conditions": {{
                    "swell": {{"height_ft": 3.1, "period_s": 10.0, "direction_deg": 138.0}},
                    "wind": {{"speed_mph": 6.0, "direction_deg": 335.0}},
                    "derived": {{"blown_water_index": 0.0, "offshore_alignment_score": 0.97}}
                }}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_ffi_best_matches() {
        let log = CString::new("[]").unwrap();
        let forecast = sample_forecast_json();

        unsafe {
            let result = surf_best_matches(log.as_ptr(), forecast.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("report_version"));

            surf_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let processor = surf_processor_new(ptr::null());
            assert!(!processor.is_null());

            let entry = sample_entry_json("session-1");
            let id = surf_processor_add_entry(processor, entry.as_ptr());
            assert!(!id.is_null());
            assert_eq!(CStr::from_ptr(id).to_str().unwrap(), "session-1");
            surf_free_string(id);

            // Untrained models serialize as null
            let weights = surf_processor_weights(processor, 0);
            assert_eq!(CStr::from_ptr(weights).to_str().unwrap(), "null");
            surf_free_string(weights);

            let forecast = sample_forecast_json();
            let report = surf_processor_report(processor, forecast.as_ptr());
            assert!(!report.is_null());
            surf_free_string(report);

            let saved = surf_processor_save_log(processor);
            assert!(!saved.is_null());

            let processor2 = surf_processor_new(ptr::null());
            assert_eq!(surf_processor_import(processor2, saved), 1);
            assert_eq!(surf_processor_import(processor2, saved), 0);
            surf_free_string(saved);

            let id = CString::new("session-1").unwrap();
            assert_eq!(surf_processor_delete_entry(processor2, id.as_ptr()), 0);
            assert_eq!(surf_processor_delete_entry(processor2, id.as_ptr()), -1);

            surf_processor_free(processor);
            surf_processor_free(processor2);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let forecast = sample_forecast_json();

            let result = surf_best_matches(invalid_json.as_ptr(), forecast.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = surf_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let bad_config = CString::new(r#"{"break":{"name":"x"}}"#).unwrap();
            assert!(surf_processor_new(bad_config.as_ptr()).is_null());
            assert!(surf_processor_weights(ptr::null_mut(), 0).is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = surf_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
