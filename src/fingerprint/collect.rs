//! Platform queries for raw hardware identifiers.
//!
//! Every query is best-effort: anything that fails, needs privileges we do
//! not have, or returns nothing is simply left out. Filtering and ordering
//! happen in [`compose`](super::compose).

use super::compose::{IdentifierKind, RawIdentifier};

/// Capability that harvests raw identifiers from the host.
pub trait IdentifierSource: Send + Sync {
    /// Collect whatever identifiers are available, in priority order.
    fn collect(&self) -> Vec<RawIdentifier>;
}

/// Collector backed by the running operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentifiers;

impl IdentifierSource for SystemIdentifiers {
    fn collect(&self) -> Vec<RawIdentifier> {
        let ids = platform::collect();
        tracing::debug!(count = ids.len(), "collected raw hardware identifiers");
        ids
    }
}

/// Fixed identifier list, for tests and for hosts where the caller already
/// knows the identity.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentifiers(pub Vec<RawIdentifier>);

impl IdentifierSource for StaticIdentifiers {
    fn collect(&self) -> Vec<RawIdentifier> {
        self.0.clone()
    }
}

/// Run a command and return its trimmed stdout, if it succeeded.
#[cfg(any(target_os = "windows", target_os = "macos"))]
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Drop the column header line `wmic` prints and return the first value.
#[cfg(any(target_os = "windows", test))]
fn wmic_value(output: &str) -> Option<String> {
    output
        .lines()
        .skip(1)
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(String::from)
}

/// Pull `XXXX-XXXX` out of `vol` output ("... Serial Number is XXXX-XXXX").
#[cfg(any(target_os = "windows", test))]
fn volume_serial(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains("Serial Number"))
        .and_then(|line| line.rsplit_once(" is "))
        .map(|(_, serial)| serial.trim())
        .filter(|serial| !serial.is_empty())
        .map(String::from)
}

#[cfg(target_os = "windows")]
mod platform {
    use super::*;

    pub(super) fn collect() -> Vec<RawIdentifier> {
        let wmic = |args: &[&str]| command_output("wmic", args).and_then(|out| wmic_value(&out));

        let queries: [(IdentifierKind, Option<String>); 6] = [
            (
                IdentifierKind::SystemUuid,
                wmic(&["path", "win32_computersystemproduct", "get", "uuid"]),
            ),
            (IdentifierKind::BiosSerial, wmic(&["bios", "get", "serialnumber"])),
            (IdentifierKind::CpuId, wmic(&["cpu", "get", "processorid"])),
            (IdentifierKind::BoardSerial, wmic(&["baseboard", "get", "serialnumber"])),
            (IdentifierKind::DiskSerial, wmic(&["diskdrive", "get", "serialnumber"])),
            (
                IdentifierKind::MacAddress,
                wmic(&["nic", "where", "NetEnabled=true", "get", "macaddress"]),
            ),
        ];

        let mut ids: Vec<RawIdentifier> = queries
            .into_iter()
            .filter_map(|(kind, value)| value.map(|v| RawIdentifier::new(kind, v)))
            .collect();

        if let Some(serial) =
            command_output("cmd", &["/C", "vol", "C:"]).and_then(|out| volume_serial(&out))
        {
            ids.push(RawIdentifier::new(IdentifierKind::VolumeSerial, serial));
        }
        ids
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn read_trimmed(path: impl AsRef<Path>) -> Option<String> {
        let text = fs::read_to_string(path).ok()?;
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// `Serial` line of /proc/cpuinfo (present on ARM boards).
    fn cpu_serial() -> Option<String> {
        let info = fs::read_to_string("/proc/cpuinfo").ok()?;
        info.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.trim() == "Serial")
            .map(|(_, value)| value.trim().to_string())
    }

    fn first_disk_serial() -> Option<String> {
        let mut disks: Vec<_> = fs::read_dir("/sys/block")
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect();
        disks.sort();
        disks
            .iter()
            .find_map(|disk| read_trimmed(disk.join("device/serial")))
    }

    fn first_mac_address() -> Option<String> {
        let mut nics: Vec<_> = fs::read_dir("/sys/class/net")
            .ok()?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name() != "lo")
            .map(|entry| entry.path())
            .collect();
        nics.sort();
        nics.iter()
            .filter_map(|nic| read_trimmed(nic.join("address")))
            .find(|mac| mac != "00:00:00:00:00:00")
    }

    pub(super) fn collect() -> Vec<RawIdentifier> {
        let queries = [
            (
                IdentifierKind::SystemUuid,
                read_trimmed("/sys/class/dmi/id/product_uuid"),
            ),
            (
                IdentifierKind::BiosSerial,
                read_trimmed("/sys/class/dmi/id/product_serial"),
            ),
            (IdentifierKind::CpuId, cpu_serial()),
            (
                IdentifierKind::BoardSerial,
                read_trimmed("/sys/class/dmi/id/board_serial"),
            ),
            (
                IdentifierKind::MachineId,
                read_trimmed("/etc/machine-id")
                    .or_else(|| read_trimmed("/var/lib/dbus/machine-id")),
            ),
            (IdentifierKind::DiskSerial, first_disk_serial()),
            (IdentifierKind::MacAddress, first_mac_address()),
        ];

        queries
            .into_iter()
            .filter_map(|(kind, value)| value.map(|v| RawIdentifier::new(kind, v)))
            .collect()
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::*;

    /// Value of `"key" = "value"` in `ioreg` output.
    fn ioreg_field(output: &str, key: &str) -> Option<String> {
        output
            .lines()
            .find(|line| line.contains(key))
            .and_then(|line| line.split('"').nth(3))
            .map(String::from)
    }

    pub(super) fn collect() -> Vec<RawIdentifier> {
        let mut ids = Vec::new();
        if let Some(out) = command_output("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"]) {
            if let Some(uuid) = ioreg_field(&out, "IOPlatformUUID") {
                ids.push(RawIdentifier::new(IdentifierKind::SystemUuid, uuid));
            }
            if let Some(serial) = ioreg_field(&out, "IOPlatformSerialNumber") {
                ids.push(RawIdentifier::new(IdentifierKind::BiosSerial, serial));
            }
        }
        if let Some(cpu) = command_output("sysctl", &["-n", "machdep.cpu.brand_string"]) {
            ids.push(RawIdentifier::new(IdentifierKind::CpuId, cpu));
        }
        ids
    }
}

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
mod platform {
    use super::*;

    pub(super) fn collect() -> Vec<RawIdentifier> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::compose::DeviceFingerprint;

    #[test]
    fn wmic_value_skips_header() {
        let out = "ProcessorId      \r\nBFEBFBFF000906EA \r\n\r\n";
        assert_eq!(wmic_value(out), Some("BFEBFBFF000906EA".to_string()));
        assert_eq!(wmic_value("SerialNumber\r\n\r\n"), None);
    }

    #[test]
    fn volume_serial_parsed() {
        let out = " Volume in drive C has no label.\r\n Volume Serial Number is 1A2B-3C4D\r\n";
        assert_eq!(volume_serial(out), Some("1A2B-3C4D".to_string()));
        assert_eq!(volume_serial(" Volume in drive C is OS\r\n"), None);
    }

    #[test]
    fn static_source_returns_its_list() {
        let source = StaticIdentifiers(vec![RawIdentifier::new(
            IdentifierKind::CpuId,
            "BFEBFBFF000906EA",
        )]);
        assert_eq!(source.collect().len(), 1);
    }

    #[test]
    fn system_collection_never_panics() {
        let fp = DeviceFingerprint::compose(&SystemIdentifiers.collect());
        assert!(!fp.as_str().is_empty());
    }
}
