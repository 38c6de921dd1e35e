//! Platform capability detection.
//!
//! Resolution only needs one fact from the host: whether a CUDA device is
//! usable. Detection is cheap and never fails; anything it cannot confirm is
//! reported as unavailable.

use std::path::Path;

use cp_config::GpuProbe;
use tracing::debug;

/// Files whose presence indicates a loaded NVIDIA driver.
const NVIDIA_MARKERS: &[&str] = &["/proc/driver/nvidia/version", "/dev/nvidia0"];

/// GPU probe backed by the running host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGpuProbe;

impl GpuProbe for SystemGpuProbe {
    fn cuda_available(&self) -> bool {
        let visible = std::env::var("CUDA_VISIBLE_DEVICES").ok();
        let available = detect_cuda(visible.as_deref(), |path| Path::new(path).exists());
        debug!(available, cuda_visible_devices = ?visible, "cuda probe");
        available
    }
}

/// `CUDA_VISIBLE_DEVICES` set to empty or `-1` hides every device.
fn devices_hidden(visible: Option<&str>) -> bool {
    matches!(visible.map(str::trim), Some("") | Some("-1"))
}

fn detect_cuda(visible: Option<&str>, exists: impl Fn(&str) -> bool) -> bool {
    if devices_hidden(visible) {
        return false;
    }
    cfg!(target_os = "linux") && NVIDIA_MARKERS.iter().any(|marker| exists(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_devices() {
        assert!(devices_hidden(Some("")));
        assert!(devices_hidden(Some("-1")));
        assert!(devices_hidden(Some(" -1 ")));
        assert!(!devices_hidden(Some("0")));
        assert!(!devices_hidden(None));
    }

    #[test]
    fn test_hidden_devices_win_over_driver() {
        assert!(!detect_cuda(Some("-1"), |_| true));
        assert!(!detect_cuda(Some(""), |_| true));
    }

    #[test]
    fn test_no_driver_no_cuda() {
        assert!(!detect_cuda(None, |_| false));
        assert!(!detect_cuda(Some("0"), |_| false));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_driver_marker_detected() {
        assert!(detect_cuda(None, |path| path == "/dev/nvidia0"));
        assert!(detect_cuda(Some("0,1"), |path| path.starts_with("/proc/driver")));
    }
}
