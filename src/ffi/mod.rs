use std::os::raw::{c_char, c_int};
use std::ffi::{CStr, CString};
use crate::ffi::error::{ErrorCode, FFIError};

pub mod coverage;
pub mod error;

/// Error handling helper for FFI boundaries (returns error code)
pub fn handle_status_result<F>(func: F) -> c_int
where
    F: FnOnce() -> FFIResult<()>,
{
    match func() {
        Ok(_) => ErrorCode::Success as c_int,
        Err(e) => {
            log::error!("[FFI] Code: {:?}, Message: {}, Details: {:?}",
                      e.code, e.message, e.details.as_deref().unwrap_or("None"));
            e.code as c_int
        }
    }
}

/// Run an async future to completion on a freshly-spun Tokio runtime.
pub fn block_on_async<F, T>(future: F) -> FFIResult<T>
where
    F: std::future::Future<Output = FFIResult<T>>,
{
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| FFIError::internal(format!("Failed to create tokio runtime: {}", e)))?;
    rt.block_on(future)
}

/// Borrow a caller-owned C string as UTF-8
///
/// # Safety
/// `ptr` must be null or point to a valid null-terminated string that outlives the call.
pub unsafe fn read_c_str<'a>(ptr: *const c_char) -> FFIResult<&'a str> {
    if ptr.is_null() {
        return Err(FFIError::new(ErrorCode::NullPointer, "null pointer"));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FFIError::new(ErrorCode::InvalidUtf8, "string is not valid UTF-8"))
}

/// Serialize `value` and hand ownership of the resulting C string to the caller
///
/// # Safety
/// `result` must be a valid, writable pointer.
pub unsafe fn write_json_result<T: serde::Serialize>(value: &T, result: *mut *mut c_char) -> FFIResult<()> {
    if result.is_null() {
        return Err(FFIError::new(ErrorCode::NullPointer, "null result pointer"));
    }
    let json = serde_json::to_string(value)
        .map_err(|e| FFIError::internal(format!("Failed to serialize result: {}", e)))?;
    let c_string = CString::new(json)
        .map_err(|e| FFIError::internal(format!("Failed to create CString: {}", e)))?;
    unsafe { *result = c_string.into_raw() };
    Ok(())
}

pub use error::FFIResult;
