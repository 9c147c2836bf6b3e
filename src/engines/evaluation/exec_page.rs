//! Executable memory for one trial.
//!
//! unsafe only for mmap/mprotect/munmap.

use std::io;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

static LIVE_PAGES: AtomicUsize = AtomicUsize::new(0);

/// Number of executable regions currently mapped by this process
pub fn live_pages() -> usize {
    LIVE_PAGES.load(Ordering::SeqCst)
}

pub fn system_page_size() -> usize {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

/// Anonymous mapping: PROT_NONE -> PROT_WRITE (copy) -> PROT_EXEC.
/// Unmapped on drop.
pub struct ExecutablePage {
    ptr: *mut u8,
    capacity: usize,
}

impl ExecutablePage {
    pub fn map(capacity: usize) -> io::Result<Self> {
        // SAFETY: fresh private anonymous mapping, no existing memory is touched
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                capacity,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        LIVE_PAGES.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            ptr: ptr as *mut u8,
            capacity,
        })
    }

    /// Copy `code` to the start of the page and seal it execute-only
    pub fn load(&mut self, code: &[u8]) -> io::Result<()> {
        if code.len() > self.capacity {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} bytes do not fit a {} byte page", code.len(), self.capacity),
            ));
        }

        self.protect(libc::PROT_WRITE)?;
        // SAFETY: the mapping is writable and at least code.len() bytes long
        unsafe {
            ptr::copy_nonoverlapping(code.as_ptr(), self.ptr, code.len());
        }
        self.protect(libc::PROT_EXEC)
    }

    fn protect(&mut self, prot: libc::c_int) -> io::Result<()> {
        // SAFETY: ptr/capacity describe a mapping owned by self
        let result = unsafe { libc::mprotect(self.ptr as *mut libc::c_void, self.capacity, prot) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn entry(&self) -> *const u8 {
        self.ptr
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for ExecutablePage {
    fn drop(&mut self) {
        // SAFETY: ptr/capacity came from a successful mmap
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.capacity);
        }
        LIVE_PAGES.fetch_sub(1, Ordering::SeqCst);
    }
}
