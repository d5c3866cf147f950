//! IPv4 CIDR allow-list
//!
//! Decides whether a caller's network address may trigger a deployment.
//! Containment is 32-bit integer arithmetic: an address matches an entry
//! when both agree on the first `prefix` bits. IPv6 is out of scope; an
//! address that is not a dotted quad never matches.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Ranges the known hosting providers send push notifications from.
///
/// Bitbucket ranges per their firewall configuration page, GitHub per the
/// hooks section of `/meta`.
pub const DEFAULT_ALLOWED_RANGES: &[&str] = &[
    "131.103.20.160/27", // Bitbucket
    "165.254.145.0/26",  // Bitbucket
    "104.192.143.0/24",  // Bitbucket
    "192.30.252.0/22",   // GitHub
];

/// Allow-list parse error
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AllowListError {
    #[error("invalid network address in range '{0}'")]
    InvalidAddress(String),
    #[error("invalid prefix length in range '{0}' (expected 0-32)")]
    InvalidPrefix(String),
}

/// One allow-list entry: a network address plus prefix length.
///
/// Normalized at parse time: a bare address gets prefix 32. Immutable once
/// constructed, so the [0, 32] prefix bound holds for the entry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowListEntry {
    network: Ipv4Addr,
    prefix: u8,
}

impl AllowListEntry {
    /// Whether `address` falls inside this entry's range.
    pub fn covers(&self, address: Ipv4Addr) -> bool {
        let wildcard = (1u64 << (32 - u32::from(self.prefix))) - 1;
        let mask = !(wildcard as u32);
        (u32::from(address) & mask) == (u32::from(self.network) & mask)
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }
}

impl FromStr for AllowListEntry {
    type Err = AllowListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (address, prefix) = match s.split_once('/') {
            Some((address, prefix)) => {
                let prefix: u8 = prefix
                    .parse()
                    .map_err(|_| AllowListError::InvalidPrefix(s.to_string()))?;
                if prefix > 32 {
                    return Err(AllowListError::InvalidPrefix(s.to_string()));
                }
                (address, prefix)
            }
            // A bare address is an exact-match entry.
            None => (s, 32),
        };

        let network: Ipv4Addr = address
            .parse()
            .map_err(|_| AllowListError::InvalidAddress(s.to_string()))?;

        Ok(Self { network, prefix })
    }
}

impl fmt::Display for AllowListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Ordered set of permitted network ranges.
#[derive(Debug, Clone)]
pub struct AllowList {
    entries: Vec<AllowListEntry>,
}

impl Default for AllowList {
    /// Seeded with the known provider ranges.
    fn default() -> Self {
        Self::from_ranges(DEFAULT_ALLOWED_RANGES.iter().copied())
            .expect("default provider ranges are valid")
    }
}

impl AllowList {
    /// An allow-list with no entries. Permits nothing over the network.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a list from CIDR strings, replacing the defaults entirely.
    pub fn from_ranges<'a, I>(ranges: I) -> Result<Self, AllowListError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut list = Self::empty();
        list.extend_ranges(ranges)?;
        Ok(list)
    }

    /// Merge additional ranges onto the current set.
    pub fn extend_ranges<'a, I>(&mut self, ranges: I) -> Result<(), AllowListError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for range in ranges {
            self.entries.push(range.parse()?);
        }
        Ok(())
    }

    /// Whether `address` is covered by any entry.
    ///
    /// An address that does not parse as an IPv4 dotted quad is never
    /// permitted; malformed input is a rejection, not an error.
    pub fn permits(&self, address: &str) -> bool {
        let Ok(address) = address.trim().parse::<Ipv4Addr>() else {
            return false;
        };
        self.entries.iter().any(|entry| entry.covers(address))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ranges: &[&str]) -> AllowList {
        AllowList::from_ranges(ranges.iter().copied()).unwrap()
    }

    #[test]
    fn test_cidr_range_match() {
        let github = list(&["192.30.252.0/22"]);
        assert!(github.permits("192.30.252.1"));
        assert!(github.permits("192.30.255.255"));
        assert!(!github.permits("192.30.248.1"));
        assert!(!github.permits("192.31.0.1"));
    }

    #[test]
    fn test_bare_address_defaults_to_exact_match() {
        let single = list(&["131.103.20.165"]);
        assert!(single.permits("131.103.20.165"));
        assert!(!single.permits("131.103.20.166"));
        assert_eq!(single.entries[0].prefix(), 32);
    }

    #[test]
    fn test_malformed_address_never_matches() {
        let wide = list(&["10.0.0.0/8"]);
        assert!(!wide.permits("not-an-ip"));
        assert!(!wide.permits(""));
        assert!(!wide.permits("10.0.0"));
        assert!(!wide.permits("::1"));
    }

    #[test]
    fn test_prefix_zero_covers_everything() {
        let all = list(&["0.0.0.0/0"]);
        assert!(all.permits("1.2.3.4"));
        assert!(all.permits("255.255.255.255"));
    }

    #[test]
    fn test_first_match_short_circuits_but_order_is_irrelevant() {
        let a = list(&["10.0.0.0/8", "192.168.0.0/16"]);
        let b = list(&["192.168.0.0/16", "10.0.0.0/8"]);
        for addr in ["10.1.2.3", "192.168.4.5", "172.16.0.1"] {
            assert_eq!(a.permits(addr), b.permits(addr));
        }
    }

    #[test]
    fn test_default_list_contains_provider_ranges() {
        let defaults = AllowList::default();
        assert_eq!(defaults.len(), DEFAULT_ALLOWED_RANGES.len());
        assert!(defaults.permits("131.103.20.165")); // Bitbucket /27
        assert!(defaults.permits("192.30.253.113")); // GitHub /22
        assert!(!defaults.permits("8.8.8.8"));
    }

    #[test]
    fn test_extend_merges_onto_existing_entries() {
        let mut defaults = AllowList::default();
        assert!(!defaults.permits("203.0.113.7"));
        defaults.extend_ranges(["203.0.113.0/24"]).unwrap();
        assert!(defaults.permits("203.0.113.7"));
        assert!(defaults.permits("192.30.253.113")); // defaults survive the merge
    }

    #[test]
    fn test_invalid_ranges_are_load_errors() {
        assert_eq!(
            "10.0.0.0/33".parse::<AllowListEntry>(),
            Err(AllowListError::InvalidPrefix("10.0.0.0/33".to_string()))
        );
        assert_eq!(
            "not-a-network/8".parse::<AllowListEntry>(),
            Err(AllowListError::InvalidAddress("not-a-network/8".to_string()))
        );
        assert!(AllowList::from_ranges(["10.0.0.0/8", "bad"]).is_err());
    }

    #[test]
    fn test_entry_display_round_trip() {
        let entry: AllowListEntry = "192.30.252.0/22".parse().unwrap();
        assert_eq!(entry.to_string(), "192.30.252.0/22");
        let bare: AllowListEntry = "131.103.20.165".parse().unwrap();
        assert_eq!(bare.to_string(), "131.103.20.165/32");
    }
}
