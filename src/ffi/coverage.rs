// src/ffi/coverage.rs
// ============================================================================
// FFI bindings for the coverage engine.
// Each wrapper decodes a JSON payload, forwards it to the cached coverage
// service on a temporary Tokio runtime and writes the JSON response into
// `result`. Strings written to `result` must be released with `coverage_free`.
// ----------------------------------------------------------------------------

use crate::config::EngineConfig;
use crate::domains::coverage::service::CoverageService;
use crate::domains::coverage::types::FilterSet;
use crate::ffi::error::{ErrorCode, FFIError, FFIResult};
use crate::ffi::{block_on_async, handle_status_result, read_c_str, write_json_result};
use crate::globals;

use std::ffi::CString;
use std::os::raw::{c_char, c_int};

/// An absent payload means "no filter"
unsafe fn parse_filter(filter_json: *const c_char) -> FFIResult<FilterSet> {
    if filter_json.is_null() {
        return Ok(FilterSet::default());
    }
    let json = unsafe { read_c_str(filter_json) }?;
    if json.trim().is_empty() {
        return Ok(FilterSet::default());
    }
    serde_json::from_str(json).map_err(|e| FFIError::invalid_argument(&format!("invalid filter json: {e}")))
}

fn require_initialized() -> FFIResult<()> {
    if globals::is_initialized() {
        Ok(())
    } else {
        Err(FFIError::new(ErrorCode::NotInitialized, "coverage engine not initialized"))
    }
}

/// Initialize the engine
/// Expected JSON payload: { EngineConfig }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn coverage_initialize(config_json: *const c_char) -> c_int {
    handle_status_result(|| unsafe {
        let json = read_c_str(config_json)?;
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| FFIError::invalid_argument(&format!("invalid config json: {e}")))?;
        block_on_async(globals::initialize(config))
    })
}

/// Per-county statistics, intensity levels and totals
/// Expected JSON payload: { FilterSet } (any field may be omitted)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn coverage_county_report(filter_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        require_initialized()?;
        let filter = parse_filter(filter_json)?;
        let svc = globals::get_coverage_service()?;

        let report = block_on_async(async { svc.county_report(&filter).await.map_err(FFIError::from_service_error) })?;
        write_json_result(&report, result)
    })
}

/// Boundary FeatureCollection with county statistics merged into each feature
/// Expected JSON payload: { FilterSet } (any field may be omitted)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn coverage_heatmap(filter_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        require_initialized()?;
        let filter = parse_filter(filter_json)?;
        let svc = globals::get_coverage_service()?;

        let collection = block_on_async(async { svc.heatmap(&filter).await.map_err(FFIError::from_service_error) })?;
        write_json_result(&collection, result)
    })
}

/// The active configuration
#[unsafe(no_mangle)]
pub unsafe extern "C" fn coverage_get_config(result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        let config = globals::get_config()?;
        write_json_result(&config, result)
    })
}

/// Drop memoized reports and heatmaps, e.g. after new trainings were recorded
#[unsafe(no_mangle)]
pub extern "C" fn coverage_invalidate_cache() -> c_int {
    handle_status_result(|| {
        require_initialized()?;
        globals::get_coverage_service()?
            .invalidate()
            .map_err(FFIError::from_service_error)
    })
}

/// Free a string returned by any coverage function
#[unsafe(no_mangle)]
pub unsafe extern "C" fn coverage_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = unsafe { CString::from_raw(ptr) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_parse_filter_defaults_and_fields() {
        assert_eq!(unsafe { parse_filter(ptr::null()) }.unwrap(), FilterSet::default());

        let empty = CString::new("  ").unwrap();
        assert_eq!(unsafe { parse_filter(empty.as_ptr()) }.unwrap(), FilterSet::default());

        let json = CString::new(r#"{"facility_ids":[7],"periods":["2024-05"],"training_types":["facility_mentorship"]}"#).unwrap();
        let filter = unsafe { parse_filter(json.as_ptr()) }.unwrap();
        assert!(filter.facility_ids.contains(&7));
        assert!(filter.periods.contains("2024-05"));
        assert_eq!(filter.training_types.len(), 1);
    }

    #[test]
    fn test_invalid_filter_json_is_rejected() {
        let json = CString::new("{\"facility_ids\": \"seven\"}").unwrap();
        let err = unsafe { parse_filter(json.as_ptr()) }.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_report_requires_initialization() {
        if globals::is_initialized() {
            return;
        }
        let mut out: *mut c_char = ptr::null_mut();
        let status = unsafe { coverage_county_report(ptr::null(), &mut out) };
        assert_eq!(status, ErrorCode::NotInitialized as c_int);
        assert!(out.is_null());
    }
}
