//! Memory ownership across the embedding boundary
//!
//! - Guest to host: strings are copied into `String` as soon as they are
//!   received; the guest keeps ownership of its buffer.
//! - Host to guest: strings are allocated with `libc::malloc` and released
//!   by the guest through the free callback registered at boot
//!   ([`free_from_guest`]), so allocation and release go through the same
//!   allocator on every platform.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::ptr;

/// Copy a guest-owned, NUL-terminated string into host memory
///
/// # Safety
/// `ptr` must be null or point to a valid NUL-terminated string that stays
/// alive for the duration of the call.
pub unsafe fn copy_from_guest(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Copy `len` guest-owned strings; null entries are skipped
///
/// # Safety
/// `array` must be null or point to at least `len` string pointers, each
/// satisfying the contract of [`copy_from_guest`].
pub unsafe fn copy_array_from_guest(array: *const *const c_char, len: usize) -> Vec<String> {
    if array.is_null() {
        return Vec::new();
    }
    (0..len)
        .filter_map(|i| copy_from_guest(*array.add(i)))
        .collect()
}

/// Copy a NULL-terminated array of guest-owned strings
///
/// # Safety
/// `array` must be null or a NULL-terminated array of pointers satisfying
/// the contract of [`copy_from_guest`].
pub unsafe fn copy_null_terminated_from_guest(array: *const *const c_char) -> Vec<String> {
    let mut items = Vec::new();
    if array.is_null() {
        return items;
    }
    let mut i = 0;
    loop {
        let item = *array.add(i);
        if item.is_null() {
            return items;
        }
        if let Some(s) = copy_from_guest(item) {
            items.push(s);
        }
        i += 1;
    }
}

/// Allocate a C string the guest will own
///
/// Interior NUL bytes are dropped. Returns null if allocation fails.
pub fn to_guest_string(s: &str) -> *mut c_char {
    let bytes: Vec<u8> = s.bytes().filter(|b| *b != 0).collect();

    // SAFETY: the buffer is sized for the bytes plus the terminator and only
    // written within those bounds.
    unsafe {
        let buf = libc::malloc(bytes.len() + 1) as *mut u8;
        if buf.is_null() {
            return ptr::null_mut();
        }
        ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len());
        *buf.add(bytes.len()) = 0;
        buf as *mut c_char
    }
}

/// Allocate a NULL-terminated array of C strings the guest will own
///
/// Both the array and every entry are released through [`free_from_guest`].
pub fn to_guest_string_array(items: &[String]) -> *mut *mut c_char {
    // SAFETY: the array holds `items.len() + 1` pointers and is only written
    // within those bounds.
    unsafe {
        let array = libc::malloc((items.len() + 1) * std::mem::size_of::<*mut c_char>())
            as *mut *mut c_char;
        if array.is_null() {
            return ptr::null_mut();
        }
        for (i, item) in items.iter().enumerate() {
            *array.add(i) = to_guest_string(item);
        }
        *array.add(items.len()) = ptr::null_mut();
        array
    }
}

/// Free callback handed to the guest runtime
///
/// # Safety
/// `ptr` must be null or have been allocated by [`to_guest_string`] /
/// [`to_guest_string_array`] and not freed yet.
pub unsafe extern "C" fn free_from_guest(ptr: *mut c_void) {
    libc::free(ptr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_pointers() {
        unsafe {
            assert_eq!(copy_from_guest(ptr::null()), None);
            assert!(copy_array_from_guest(ptr::null(), 3).is_empty());
            assert!(copy_null_terminated_from_guest(ptr::null()).is_empty());
        }
    }

    #[test]
    fn test_guest_string_is_independent_copy() {
        let raw = to_guest_string("3.8.10 (default)");
        assert!(!raw.is_null());

        let copied = unsafe { copy_from_guest(raw) };
        unsafe { free_from_guest(raw as *mut c_void) };

        assert_eq!(copied.as_deref(), Some("3.8.10 (default)"));
    }

    #[test]
    fn test_interior_nul_dropped() {
        let raw = to_guest_string("env:\0prod");
        let copied = unsafe { copy_from_guest(raw) };
        unsafe { free_from_guest(raw as *mut c_void) };
        assert_eq!(copied.as_deref(), Some("env:prod"));
    }

    #[test]
    fn test_string_array_is_null_terminated() {
        let tags = vec!["env:prod".to_string(), "role:db".to_string()];
        let array = to_guest_string_array(&tags);
        assert!(!array.is_null());

        unsafe {
            assert!((*array.add(2)).is_null());
            let copied = copy_null_terminated_from_guest(array as *const *const c_char);
            let counted = copy_array_from_guest(array as *const *const c_char, 2);
            assert_eq!(copied, tags);
            assert_eq!(counted, tags);

            for i in 0..2 {
                free_from_guest(*array.add(i) as *mut c_void);
            }
            free_from_guest(array as *mut c_void);
        }
    }

    #[test]
    fn test_empty_string_array() {
        let array = to_guest_string_array(&[]);
        unsafe {
            assert!((*array).is_null());
            free_from_guest(array as *mut c_void);
        }
    }
}
