//! FFI bindings for vitaltrend
//!
//! This module provides C-compatible functions for calling the engine from
//! mobile and desktop host apps. All functions use C strings (null-terminated)
//! and return allocated memory that must be freed by the caller using
//! `vt_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::ComputeError;
use crate::pipeline::{analyze_metric, forecast_metric, TrendEngine};
use crate::schema::SampleReader;
use crate::types::{MetricField, TimeSlot};
use crate::zones::ZoneReading;

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

/// Turn a computation result into a caller-owned string or NULL
fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze one metric and return the report JSON.
///
/// # Safety
/// - `samples_json` and `metric` must be valid null-terminated C strings.
/// - `config_json` may be NULL for the default configuration.
/// - Returns a newly allocated string that must be freed with `vt_free_string`.
/// - Returns NULL on error; call `vt_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vt_analyze(
    samples_json: *const c_char,
    metric: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let samples_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid samples string pointer");
            return ptr::null_mut();
        }
    };

    let metric_str = match cstr_to_string(metric) {
        Some(s) => s,
        None => {
            set_last_error("Invalid metric string pointer");
            return ptr::null_mut();
        }
    };

    let config_str = cstr_to_string(config_json);

    finish(analyze_metric(&samples_str, &metric_str, config_str.as_deref()))
}

/// Forecast one metric and return the forecast JSON.
///
/// # Safety
/// - `samples_json` and `metric` must be valid null-terminated C strings.
/// - `config_json` may be NULL for the default configuration.
/// - Returns a newly allocated string that must be freed with `vt_free_string`.
/// - Returns NULL on error; call `vt_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vt_forecast(
    samples_json: *const c_char,
    metric: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let samples_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid samples string pointer");
            return ptr::null_mut();
        }
    };

    let metric_str = match cstr_to_string(metric) {
        Some(s) => s,
        None => {
            set_last_error("Invalid metric string pointer");
            return ptr::null_mut();
        }
    };

    let config_str = cstr_to_string(config_json);

    finish(forecast_metric(&samples_str, &metric_str, config_str.as_deref()))
}

/// Classify a single value and return the zone JSON (`null` when the metric
/// has no zones).
///
/// # Safety
/// - `metric` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `vt_free_string`.
/// - Returns NULL on error; call `vt_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vt_classify(metric: *const c_char, value: f64) -> *mut c_char {
    clear_last_error();

    let metric_str = match cstr_to_string(metric) {
        Some(s) => s,
        None => {
            set_last_error("Invalid metric string pointer");
            return ptr::null_mut();
        }
    };

    finish(metric_str.parse::<MetricField>().and_then(|metric| {
        serde_json::to_string(&ZoneReading::classify(metric, value)).map_err(ComputeError::from)
    }))
}

// ============================================================================
// Engine Handle API
// ============================================================================

/// Opaque handle to a TrendEngine
pub struct TrendEngineHandle {
    engine: TrendEngine,
}

/// Create an engine from configuration JSON (NULL for defaults).
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `vt_engine_free`.
/// - Returns NULL on error; call `vt_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vt_engine_new(config_json: *const c_char) -> *mut TrendEngineHandle {
    clear_last_error();

    let config_str = cstr_to_string(config_json);

    match TrendEngine::from_config_json(config_str.as_deref()) {
        Ok(engine) => Box::into_raw(Box::new(TrendEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `vt_engine_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn vt_engine_free(engine: *mut TrendEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Analyze one metric within a time slot (`morning`, `evening`, `all`).
///
/// # Safety
/// - `engine` must be a valid pointer returned by `vt_engine_new`.
/// - `samples_json`, `metric` and `slot` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `vt_free_string`.
/// - Returns NULL on error; call `vt_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vt_engine_analyze(
    engine: *const TrendEngineHandle,
    samples_json: *const c_char,
    metric: *const c_char,
    slot: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let samples_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid samples string pointer");
            return ptr::null_mut();
        }
    };

    let metric_str = match cstr_to_string(metric) {
        Some(s) => s,
        None => {
            set_last_error("Invalid metric string pointer");
            return ptr::null_mut();
        }
    };

    let slot_str = match cstr_to_string(slot) {
        Some(s) => s,
        None => {
            set_last_error("Invalid slot string pointer");
            return ptr::null_mut();
        }
    };

    let result = (|| {
        let metric: MetricField = metric_str.parse()?;
        let slot: TimeSlot = slot_str.parse()?;
        let samples = SampleReader::parse(&samples_str)?;
        let report = handle.engine.report(&samples, metric, slot);
        serde_json::to_string(&report).map_err(|e| ComputeError::EncodingError(e.to_string()))
    })();

    finish(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by vitaltrend functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a vitaltrend function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn vt_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next vitaltrend call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn vt_last_error() -> *const c_char {
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
pub unsafe extern "C" fn vt_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_json() -> CString {
        CString::new(
            r#"[
                {"date": "2024-01-01", "time": "07:00", "source": "manual", "weight_kg": 70.0},
                {"date": "2024-01-02", "time": "07:00", "source": "device", "weight_kg": 70.2},
                {"date": "2024-01-03", "time": "07:00", "source": "device", "weight_kg": 70.4}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_analyze() {
        let samples = sample_json();
        let metric = CString::new("weight").unwrap();

        unsafe {
            let result = vt_analyze(samples.as_ptr(), metric.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"report_version\""));
            assert!(result_str.contains("\"forecast\""));

            vt_free_string(result);
        }
    }

    #[test]
    fn test_ffi_forecast_with_config() {
        let samples = sample_json();
        let metric = CString::new("weight").unwrap();
        let config = CString::new(r#"{"forecast_days": 1}"#).unwrap();

        unsafe {
            let result = vt_forecast(samples.as_ptr(), metric.as_ptr(), config.as_ptr());
            assert!(!result.is_null());

            let value: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(value["points"].as_array().unwrap().len(), 1);

            vt_free_string(result);
        }
    }

    #[test]
    fn test_ffi_classify() {
        let metric = CString::new("heart_rate").unwrap();

        unsafe {
            let result = vt_classify(metric.as_ptr(), 105.0);
            assert!(!result.is_null());
            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("elevated"));
            vt_free_string(result);
        }
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        let samples = sample_json();
        let metric = CString::new("weight").unwrap();
        let slot = CString::new("morning").unwrap();

        unsafe {
            let engine = vt_engine_new(ptr::null());
            assert!(!engine.is_null());

            let result =
                vt_engine_analyze(engine, samples.as_ptr(), metric.as_ptr(), slot.as_ptr());
            assert!(!result.is_null());
            vt_free_string(result);

            vt_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let invalid = CString::new("not json").unwrap();
        let metric = CString::new("weight").unwrap();
        let bad_config = CString::new(r#"{"alpha": 5.0}"#).unwrap();

        unsafe {
            let result = vt_analyze(invalid.as_ptr(), metric.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = vt_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let engine = vt_engine_new(bad_config.as_ptr());
            assert!(engine.is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = vt_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
