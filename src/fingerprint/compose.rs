//! Device fingerprint composition.
//!
//! Turns raw hardware identifiers into one bounded, deterministic string.
//! The result is a best-effort identity, not a security token: two machines
//! with scrubbed DMI tables can collide, and a determined user can spoof any
//! of the inputs.

use std::fmt;

/// Sentinel returned when no identifier survives filtering.
pub const UNKNOWN_FINGERPRINT: &str = "UNKNOWN";

/// Length ceiling for the full `LABEL:value-LABEL:value` rendering.
pub const MAX_FINGERPRINT_LEN: usize = 200;

/// Number of components kept when the full rendering is over the ceiling.
pub const COMPACT_COMPONENTS: usize = 5;

/// Characters kept from each value in the compact rendering.
pub const COMPACT_VALUE_PREFIX: usize = 8;

/// Vendor filler values that carry no identity.
const OEM_PLACEHOLDERS: &[&str] = &[
    "To be filled by O.E.M.",
    "Default string",
    "System Serial Number",
    "Not Specified",
];

/// Kinds of hardware identifier, declared in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentifierKind {
    /// SMBIOS system UUID.
    SystemUuid,
    /// BIOS / product serial number.
    BiosSerial,
    /// CPU processor id.
    CpuId,
    /// Motherboard serial number.
    BoardSerial,
    /// OS-assigned machine id (Linux `/etc/machine-id`).
    MachineId,
    /// Primary disk serial number.
    DiskSerial,
    /// MAC address of the first active adapter.
    MacAddress,
    /// System volume serial.
    VolumeSerial,
}

impl IdentifierKind {
    /// Label used in the rendered fingerprint.
    pub fn label(self) -> &'static str {
        match self {
            IdentifierKind::SystemUuid => "UUID",
            IdentifierKind::BiosSerial => "BIOS",
            IdentifierKind::CpuId => "CPU",
            IdentifierKind::BoardSerial => "MB",
            IdentifierKind::MachineId => "MID",
            IdentifierKind::DiskSerial => "DISK",
            IdentifierKind::MacAddress => "MAC",
            IdentifierKind::VolumeSerial => "VOL",
        }
    }

    /// Shortest value accepted for this kind.
    pub fn min_len(self) -> usize {
        match self {
            IdentifierKind::SystemUuid | IdentifierKind::MacAddress => 11,
            IdentifierKind::MachineId => 8,
            IdentifierKind::CpuId => 6,
            IdentifierKind::BiosSerial
            | IdentifierKind::BoardSerial
            | IdentifierKind::DiskSerial => 4,
            IdentifierKind::VolumeSerial => 1,
        }
    }
}

/// One identifier as reported by the platform, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIdentifier {
    /// What the value identifies.
    pub kind: IdentifierKind,
    /// Raw text as returned by the OS query.
    pub value: String,
}

impl RawIdentifier {
    /// Convenience constructor.
    pub fn new(kind: IdentifierKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Stable device identifier built once per process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    /// Compose a fingerprint from raw identifiers.
    ///
    /// Components are ordered by [`IdentifierKind`] priority (ties keep input
    /// order), filtered, and rendered as `LABEL:value` joined by `-`. If the
    /// result exceeds [`MAX_FINGERPRINT_LEN`] it is rebuilt from the first
    /// [`COMPACT_COMPONENTS`] components with values cut to
    /// [`COMPACT_VALUE_PREFIX`] characters.
    pub fn compose(raw: &[RawIdentifier]) -> Self {
        let mut survivors: Vec<(IdentifierKind, &str)> = raw
            .iter()
            .map(|id| (id.kind, id.value.trim()))
            .filter(|(kind, value)| accepts(*kind, value))
            .collect();

        if survivors.is_empty() {
            return Self(UNKNOWN_FINGERPRINT.to_string());
        }

        survivors.sort_by_key(|(kind, _)| *kind);

        let full = render(survivors.iter().map(|(kind, value)| (*kind, *value)));
        if full.len() <= MAX_FINGERPRINT_LEN {
            return Self(full);
        }

        let compact = render(
            survivors
                .iter()
                .take(COMPACT_COMPONENTS)
                .map(|(kind, value)| (*kind, prefix(value, COMPACT_VALUE_PREFIX))),
        );
        Self(compact)
    }

    /// Wrap an already-composed fingerprint (e.g. one received from a peer).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The fingerprint text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no hardware identifier was usable.
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_FINGERPRINT
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn accepts(kind: IdentifierKind, value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    if OEM_PLACEHOLDERS
        .iter()
        .any(|placeholder| value.eq_ignore_ascii_case(placeholder))
    {
        return false;
    }
    value.chars().count() >= kind.min_len()
}

fn render<'a>(components: impl Iterator<Item = (IdentifierKind, &'a str)>) -> String {
    components
        .map(|(kind, value)| format!("{}:{}", kind.label(), value))
        .collect::<Vec<_>>()
        .join("-")
}

fn prefix(value: &str, chars: usize) -> &str {
    match value.char_indices().nth(chars) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}
