use std::fmt;

/// Mobility-assistance capabilities as a bitmask.
///
/// A booking's tag list is ORed into one value; a vehicle's capability is
/// the union over its assigned trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assistance(u8);

impl Assistance {
    pub const AMBULATORY: Assistance = Assistance(1);
    pub const WHEELCHAIR: Assistance = Assistance(2);
    pub const STRETCHER: Assistance = Assistance(16);

    /// Parse a booking's tag list. Unknown tags count as ambulatory, and an
    /// empty list defaults to ambulatory, so the result is never zero.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        let mut bits = 0u8;
        for tag in tags {
            bits |= match tag.as_ref().to_ascii_lowercase().as_str() {
                "wheelchair" => Self::WHEELCHAIR.0,
                "stretcher" => Self::STRETCHER.0,
                _ => Self::AMBULATORY.0,
            };
        }
        if bits == 0 {
            bits = Self::AMBULATORY.0;
        }
        Assistance(bits)
    }

    pub fn contains(self, other: Assistance) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: Assistance) -> Assistance {
        Assistance(self.0 | other.0)
    }

    /// Scheduling priority: stretcher trips first, wheelchair second,
    /// everything else last.
    pub fn priority_bucket(self) -> usize {
        if self.contains(Self::STRETCHER) {
            0
        } else if self.contains(Self::WHEELCHAIR) {
            1
        } else {
            2
        }
    }

    /// Capability code used in the synthetic shuttle name: "GUR" when any
    /// trip needs a stretcher, then "WC" or "AMBI" for the rest.
    pub fn capability_code(self) -> String {
        let mut code = String::new();
        if self.contains(Self::STRETCHER) {
            code.push_str("GUR");
        }
        if self.contains(Self::WHEELCHAIR) {
            code.push_str("WC");
        } else if self.contains(Self::AMBULATORY) {
            code.push_str("AMBI");
        }
        code
    }
}

impl fmt::Display for Assistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.capability_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tags_default_to_ambulatory() {
        let a = Assistance::from_tags::<&str>(&[]);
        assert_eq!(a, Assistance::AMBULATORY);
        assert_eq!(a.priority_bucket(), 2);
    }

    #[test]
    fn unknown_tags_map_to_ambulatory() {
        let a = Assistance::from_tags(&["walker", "service animal"]);
        assert_eq!(a, Assistance::AMBULATORY);
    }

    #[test]
    fn tags_parse_case_insensitively() {
        let a = Assistance::from_tags(&["Wheelchair"]);
        assert!(a.contains(Assistance::WHEELCHAIR));
        let b = Assistance::from_tags(&["STRETCHER"]);
        assert!(b.contains(Assistance::STRETCHER));
    }

    #[test]
    fn tags_or_together() {
        let a = Assistance::from_tags(&["wheelchair", "stretcher"]);
        assert!(a.contains(Assistance::WHEELCHAIR));
        assert!(a.contains(Assistance::STRETCHER));
        assert!(!a.contains(Assistance::AMBULATORY));
    }

    #[test]
    fn stretcher_outranks_wheelchair() {
        assert_eq!(Assistance::from_tags(&["stretcher"]).priority_bucket(), 0);
        assert_eq!(Assistance::from_tags(&["wheelchair"]).priority_bucket(), 1);
        assert_eq!(
            Assistance::from_tags(&["wheelchair", "stretcher"]).priority_bucket(),
            0
        );
    }

    #[test]
    fn capability_codes() {
        assert_eq!(Assistance::from_tags::<&str>(&[]).capability_code(), "AMBI");
        assert_eq!(
            Assistance::from_tags(&["wheelchair"]).capability_code(),
            "WC"
        );
        assert_eq!(
            Assistance::from_tags(&["stretcher"]).capability_code(),
            "GUR"
        );
        // Union of a stretcher trip and an ambulatory trip.
        let union = Assistance::from_tags(&["stretcher"]).union(Assistance::AMBULATORY);
        assert_eq!(union.capability_code(), "GURAMBI");
        // Wheelchair wins the second slot over ambulatory.
        let union = union.union(Assistance::WHEELCHAIR);
        assert_eq!(union.capability_code(), "GURWC");
    }
}
