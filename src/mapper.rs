use std::{
    fs::File,
    io::Read,
    path::Path,
};
use super::error::CrashDmpError;

/// The raw bytes of a dump file.
///
/// On Unix the file is mapped read-only; elsewhere (and for zero-length
/// files, which `mmap` rejects) the contents are read into an owned
/// allocation. Either way the bytes are released when the value drops, so
/// everything borrowing `buffer` must drop first.
#[derive(Debug)]
pub struct MappingFile<'a> {
    /// The complete file contents.
    pub buffer: &'a [u8],

    backing: Backing,
}

#[derive(Debug)]
enum Backing {
    #[cfg(unix)]
    Mapped {
        address: *mut core::ffi::c_void,
        len: usize,
    },
    Owned(*mut [u8]),
}

impl<'a> MappingFile<'a> {
    /// Loads the file at `path`, mapping it when the platform allows.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use std::path::Path;
    /// use crashdmp::mapper::MappingFile;
    ///
    /// let mapped = MappingFile::new(Path::new("example.dmp"))?;
    /// println!("{} bytes", mapped.buffer.len());
    /// ```
    pub fn new(path: &Path) -> Result<Self, CrashDmpError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;

        #[cfg(unix)]
        {
            if len > 0 {
                return Self::map(&file, len);
            }
        }

        Self::read(file, len)
    }

    #[cfg(unix)]
    fn map(file: &File, len: usize) -> Result<Self, CrashDmpError> {
        use libc::{MAP_FAILED, MAP_SHARED, PROT_READ, mmap};
        use std::os::unix::io::AsRawFd;

        // SAFETY: len is the file's current size and the descriptor is open
        // for the duration of the call; MAP_SHARED keeps the pages valid
        // after the File closes.
        let address = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                PROT_READ,
                MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if address == MAP_FAILED {
            return Err(CrashDmpError::MmapError);
        }

        // SAFETY: the mapping spans exactly len readable bytes at address
        // and stays alive until Drop unmaps it.
        let buffer = unsafe { std::slice::from_raw_parts(address as *const u8, len) };
        Ok(Self {
            buffer,
            backing: Backing::Mapped { address, len },
        })
    }

    fn read(mut file: File, len: usize) -> Result<Self, CrashDmpError> {
        let mut data = Vec::with_capacity(len);
        file.read_to_end(&mut data)?;

        let raw = Box::into_raw(data.into_boxed_slice());
        // SAFETY: the allocation lives until Drop reclaims the box.
        let buffer = unsafe { &*(raw as *const [u8]) };
        Ok(Self {
            buffer,
            backing: Backing::Owned(raw),
        })
    }
}

impl Drop for MappingFile<'_> {
    fn drop(&mut self) {
        match self.backing {
            #[cfg(unix)]
            Backing::Mapped { address, len } => {
                // SAFETY: address and len came from a successful mmap.
                unsafe { libc::munmap(address, len) };
            }
            Backing::Owned(raw) => {
                // SAFETY: raw came from Box::into_raw and is reclaimed once.
                drop(unsafe { Box::from_raw(raw) });
            }
        }
    }
}
