// File access used by the sysfs pins.
//
// Kept behind a trait so pins can run against the real /sys tree (native,
// `std` feature) or an in-memory tree in tests.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// EBUSY, e.g. exporting an already exported pin.
    Busy,
    NotFound,
    Io,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::Busy => write!(f, "device or resource busy"),
            FsError::NotFound => write!(f, "no such file or directory"),
            FsError::Io => write!(f, "i/o error"),
        }
    }
}

pub trait SysfsAccess {
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), FsError>;

    /// Reads up to `buf.len()` bytes from the start of the file.
    fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, FsError>;
}

impl<T: SysfsAccess + ?Sized> SysfsAccess for &mut T {
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
        (**self).write(path, data)
    }

    fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, FsError> {
        (**self).read(path, buf)
    }
}

#[cfg(feature = "std")]
pub use native::NativeFs;

#[cfg(feature = "std")]
mod native {
    use std::fs::OpenOptions;
    use std::io::{self, Read, Write};

    use super::{FsError, SysfsAccess};

    const EBUSY: i32 = 16;

    /// The host file system.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NativeFs;

    fn map_err(err: io::Error) -> FsError {
        if err.raw_os_error() == Some(EBUSY) {
            return FsError::Busy;
        }
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound,
            _ => FsError::Io,
        }
    }

    impl SysfsAccess for NativeFs {
        fn write(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
            let mut file = OpenOptions::new().write(true).open(path).map_err(map_err)?;
            file.write_all(data).map_err(map_err)
        }

        fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, FsError> {
            let mut file = OpenOptions::new().read(true).open(path).map_err(map_err)?;
            file.read(buf).map_err(map_err)
        }
    }
}
