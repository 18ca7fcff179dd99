//! Frequency band and scan source value objects.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Band -- Value Object
// ---------------------------------------------------------------------------

/// The WiFi frequency band on which an access point operates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    /// 2.4 GHz (channels 1-14)
    #[serde(rename = "2.4GHz")]
    Ghz2_4,
    /// 5 GHz (channels 32-177)
    #[serde(rename = "5GHz")]
    Ghz5,
    /// 6 GHz (Wi-Fi 6E / 7)
    #[serde(rename = "6GHz")]
    Ghz6,
}

impl Band {
    /// Infer the band from an 802.11 channel number.
    ///
    /// 6 GHz channel numbers overlap the other bands, so only the range above
    /// 177 is attributed to 6 GHz here. Adapters that know the frequency
    /// should prefer [`Band::from_freq_mhz`].
    pub fn from_channel(channel: u16) -> Option<Self> {
        match channel {
            1..=14 => Some(Self::Ghz2_4),
            32..=177 => Some(Self::Ghz5),
            178..=233 => Some(Self::Ghz6),
            _ => None,
        }
    }

    /// Infer the band from a centre frequency in MHz.
    pub fn from_freq_mhz(freq: u32) -> Option<Self> {
        match freq {
            2400..=2500 => Some(Self::Ghz2_4),
            4900..=5924 => Some(Self::Ghz5),
            5925..=7125 => Some(Self::Ghz6),
            _ => None,
        }
    }

    /// Parse free-form band text as printed by scan tools
    /// (`"2.4 GHz"`, `"5GHz"`, `"6 GHz"`, `"2.4"`).
    pub fn parse(text: &str) -> Option<Self> {
        let compact: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if compact.is_empty() {
            return None;
        }
        if compact.starts_with("2.4") || compact.starts_with("2,4") {
            Some(Self::Ghz2_4)
        } else if compact.starts_with('5') {
            Some(Self::Ghz5)
        } else if compact.starts_with('6') {
            Some(Self::Ghz6)
        } else {
            None
        }
    }

    /// Canonical short label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ghz2_4 => "2.4GHz",
            Self::Ghz5 => "5GHz",
            Self::Ghz6 => "6GHz",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a centre frequency in MHz to an 802.11 channel number.
///
/// Returns `None` for frequencies outside the 2.4 / 5 / 6 GHz plans.
pub fn freq_to_channel(freq: u32) -> Option<u16> {
    let channel = match freq {
        2484 => 14,
        2412..=2472 => (freq - 2407) / 5,
        5935 => 2,
        5955..=7115 => (freq - 5950) / 5,
        5000..=5900 => (freq - 5000) / 5,
        _ => return None,
    };
    u16::try_from(channel).ok()
}

// ---------------------------------------------------------------------------
// ScanSource -- Value Object
// ---------------------------------------------------------------------------

/// The backend that produced a batch of observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    /// Linux `iw dev <iface> scan` (direct dBm).
    Iw,
    /// Windows `netsh wlan show networks mode=bssid` (signal percentage only).
    Netsh,
    /// macOS CoreWLAN helper (dBm, BSSIDs may be redacted).
    CoreWlan,
    /// Deterministic synthetic access points.
    Simulated,
}

impl ScanSource {
    /// Whether this source only reports a coarse signal measure that has to
    /// be mapped onto the dBm scale.
    pub fn is_low_fidelity(&self) -> bool {
        matches!(self, Self::Netsh)
    }

    /// Stable lower-case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iw => "iw",
            Self::Netsh => "netsh",
            Self::CoreWlan => "corewlan",
            Self::Simulated => "simulated",
        }
    }
}

impl fmt::Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
