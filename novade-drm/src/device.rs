//! Hardware identification for DRM device descriptors.
//!
//! A descriptor is mapped to its PCI vendor/device pair by stat-ing it for the
//! character device number and reading the `vendor` and `device` attributes
//! published under `<sysfs_root>/<major>:<minor>/device/`.

use std::fmt;
use std::fs;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};

use nix::sys::stat::{fstat, major, minor};

use crate::config::defaults::DEFAULT_SYSFS_ROOT;
use crate::error::IdentifyError;

/// Vendor and device identifiers of a DRM device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    pub vendor_id: u32,
    pub device_id: u32,
}

impl DeviceId {
    pub const fn new(vendor_id: u32, device_id: u32) -> Self {
        Self {
            vendor_id,
            device_id,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.device_id)
    }
}

/// Character device number of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceNumber {
    pub major: u64,
    pub minor: u64,
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Reads device identity from a sysfs-style metadata tree.
#[derive(Debug, Clone)]
pub struct DeviceProbe {
    sysfs_root: PathBuf,
}

impl Default for DeviceProbe {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl DeviceProbe {
    /// Creates a probe reading from `sysfs_root` (normally `/sys/dev/char`).
    pub fn new(sysfs_root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
        }
    }

    /// Returns the `major:minor` pair of the device behind `fd`.
    pub fn device_number(fd: BorrowedFd<'_>) -> Result<DeviceNumber, IdentifyError> {
        let st = fstat(fd.as_raw_fd()).map_err(IdentifyError::Stat)?;
        Ok(DeviceNumber {
            major: major(st.st_rdev),
            minor: minor(st.st_rdev),
        })
    }

    /// Directory holding the attributes of device `number`.
    pub fn device_dir(&self, number: DeviceNumber) -> PathBuf {
        self.sysfs_root.join(number.to_string()).join("device")
    }

    /// Identifies the device behind `fd`.
    ///
    /// # Errors
    ///
    /// - [`IdentifyError::Stat`] if `fd` cannot be stat'ed.
    /// - [`IdentifyError::AttributeRead`] if either attribute file is missing or unreadable.
    /// - [`IdentifyError::AttributeParse`] if an attribute is not an unsigned 32-bit number.
    pub fn identify(&self, fd: BorrowedFd<'_>) -> Result<DeviceId, IdentifyError> {
        let number = Self::device_number(fd)?;
        let dir = self.device_dir(number);
        tracing::debug!("Probing DRM device {} via {:?}", number, dir);

        let vendor_id = read_id_attribute(&dir.join("vendor"))?;
        let device_id = read_id_attribute(&dir.join("device"))?;
        let id = DeviceId::new(vendor_id, device_id);
        tracing::debug!("DRM device {} identified as {}", number, id);
        Ok(id)
    }
}

fn read_id_attribute(path: &Path) -> Result<u32, IdentifyError> {
    let content = fs::read_to_string(path).map_err(|source| IdentifyError::AttributeRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_id(&content).ok_or_else(|| IdentifyError::AttributeParse {
        path: path.to_path_buf(),
        value: content.trim().to_string(),
    })
}

/// Parses an identifier the way `strtoul(s, NULL, 0)` would: leading
/// whitespace is skipped, `0x`/`0X` selects hex, a leading `0` octal,
/// anything else decimal, and parsing stops at the first non-digit.
///
/// Returns `None` when no digit is present, when the value exceeds `u32`, or
/// for a leading `-`. `strtoul` would silently truncate or wrap those; here
/// they fail identification instead of selecting a backend for a bogus id.
pub fn parse_id(input: &str) -> Option<u32> {
    let s = input.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);

    let (radix, digits) = if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if rest.starts_with(|c: char| c.is_ascii_hexdigit()) {
            (16, rest)
        } else {
            // "0x" without hex digits parses as the single digit 0.
            (8, &s[..1])
        }
    } else if s.starts_with('0') {
        (8, s)
    } else {
        (10, s)
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    u32::from_str_radix(&digits[..end], radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use std::os::fd::AsFd;
    use tempfile::TempDir;

    /// Writes `vendor`/`device` attributes for the device behind `fd`.
    fn fake_sysfs(fd: BorrowedFd<'_>, vendor: Option<&str>, device: Option<&str>) -> TempDir {
        let root = TempDir::new().unwrap();
        let number = DeviceProbe::device_number(fd).unwrap();
        let dir = root.path().join(number.to_string()).join("device");
        fs::create_dir_all(&dir).unwrap();
        if let Some(v) = vendor {
            fs::write(dir.join("vendor"), v).unwrap();
        }
        if let Some(d) = device {
            fs::write(dir.join("device"), d).unwrap();
        }
        root
    }

    #[rstest]
    #[case("0x8086\n", Some(0x8086))]
    #[case("0X10de", Some(0x10de))]
    #[case("  4318", Some(4318))]
    #[case("010", Some(8))]
    #[case("0", Some(0))]
    #[case("0x", Some(0))]
    #[case("+42", Some(42))]
    #[case("0x1234zz", Some(0x1234))]
    #[case("", None)]
    #[case("vendor", None)]
    #[case("0x100000000", None)]
    #[case("4294967296", None)]
    #[case("-1", None)]
    fn test_parse_id(#[case] input: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_id(input), expected);
    }

    #[test]
    fn test_identify_reads_vendor_and_device() {
        let null = File::open("/dev/null").unwrap();
        let root = fake_sysfs(null.as_fd(), Some("0x8086\n"), Some("0x5917\n"));

        let id = DeviceProbe::new(root.path()).identify(null.as_fd()).unwrap();
        assert_eq!(id, DeviceId::new(0x8086, 0x5917));
        assert_eq!(id.to_string(), "8086:5917");
    }

    #[test]
    fn test_identify_missing_device_attribute_fails() {
        let null = File::open("/dev/null").unwrap();
        let root = fake_sysfs(null.as_fd(), Some("0x8086\n"), None);

        match DeviceProbe::new(root.path()).identify(null.as_fd()) {
            Err(IdentifyError::AttributeRead { path, .. }) => {
                assert!(path.ends_with("device/device"));
            }
            other => panic!("Expected attribute read error, got {:?}", other),
        }
    }

    #[test]
    fn test_identify_garbage_attribute_fails() {
        let null = File::open("/dev/null").unwrap();
        let root = fake_sysfs(null.as_fd(), Some("unknown\n"), Some("0x1\n"));

        match DeviceProbe::new(root.path()).identify(null.as_fd()) {
            Err(IdentifyError::AttributeParse { value, .. }) => assert_eq!(value, "unknown"),
            other => panic!("Expected attribute parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_identify_regular_file_has_no_metadata() {
        let root = TempDir::new().unwrap();
        let file = tempfile::tempfile().unwrap();

        let result = DeviceProbe::new(root.path()).identify(file.as_fd());
        assert!(matches!(result, Err(IdentifyError::AttributeRead { .. })));
    }

    #[test]
    fn test_identify_bad_descriptor_fails_stat() {
        // Far above any descriptor this test process opens.
        let fd = unsafe { BorrowedFd::borrow_raw(1 << 20) };
        let result = DeviceProbe::default().identify(fd);
        assert!(matches!(result, Err(IdentifyError::Stat(_))));
    }

    #[test]
    fn test_device_dir_layout() {
        let probe = DeviceProbe::new("/sys/dev/char");
        let dir = probe.device_dir(DeviceNumber { major: 226, minor: 0 });
        assert_eq!(dir, PathBuf::from("/sys/dev/char/226:0/device"));
    }
}
