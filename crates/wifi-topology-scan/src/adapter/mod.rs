//! Adapter implementations for the [`ScanPort`](crate::port::ScanPort) port.
//!
//! Each adapter targets a specific platform scanning mechanism:
//! - [`LinuxIwScanner`]: parses `iw dev <iface> scan` output (Linux).
//! - [`NetshScanner`]: parses `netsh wlan show networks mode=bssid` (Windows).
//! - [`CoreWlanScanner`]: JSON lines from a CoreWLAN helper binary (macOS).
//! - [`SimulatedScanner`]: deterministic synthetic access points.
//!
//! The parsers are platform independent so they can be tested anywhere;
//! only the subprocess invocation is platform specific.

pub mod corewlan;
pub mod iw;
pub mod netsh;
pub mod simulated;

pub use corewlan::{parse_corewlan_output, CoreWlanScanner};
pub use iw::{parse_iw_scan_output, LinuxIwScanner};
pub use netsh::{parse_netsh_output, NetshScanner};
pub use simulated::SimulatedScanner;

use std::process::Command;

use crate::error::ScanError;

/// Run a scan tool and return its stdout as text.
fn run_tool(program: &str, args: &[&str]) -> Result<String, ScanError> {
    let output = Command::new(program).args(args).output().map_err(|e| {
        ScanError::ProcessError(format!("failed to run `{program} {}`: {e}", args.join(" ")))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScanError::ScanFailed {
            reason: format!("{program} exited with {}: {}", output.status, stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
