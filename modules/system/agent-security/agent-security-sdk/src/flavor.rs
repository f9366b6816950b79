//! Authentication flavor identifiers.

use std::fmt;

/// Identifies an authentication mechanism.
///
/// Encoded on the wire as its `i32` value. The name table
/// ([`as_str_name`](Self::as_str_name) / [`from_str_name`](Self::from_str_name))
/// is what configuration files use.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AuthFlavor {
    AuthNone = 0,
    /// Local OS identity of the peer process.
    AuthSys = 1,
    /// Identity issued by an external access manager.
    AuthAm = 2,
}

impl AuthFlavor {
    /// Flavor assumed when a client sends an empty request payload.
    pub const IMPLICIT: Self = Self::AuthSys;

    #[must_use]
    pub const fn as_str_name(self) -> &'static str {
        match self {
            Self::AuthNone => "AUTH_NONE",
            Self::AuthSys => "AUTH_SYS",
            Self::AuthAm => "AUTH_AM",
        }
    }

    #[must_use]
    pub fn from_str_name(name: &str) -> Option<Self> {
        match name {
            "AUTH_NONE" => Some(Self::AuthNone),
            "AUTH_SYS" => Some(Self::AuthSys),
            "AUTH_AM" => Some(Self::AuthAm),
            _ => None,
        }
    }

    /// Name of a raw wire value, for diagnostics.
    #[must_use]
    pub fn name_of(value: i32) -> &'static str {
        Self::try_from(value).map_or("AUTH_UNKNOWN", Self::as_str_name)
    }
}

impl fmt::Debug for AuthFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str_name())
    }
}

impl fmt::Display for AuthFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str_name())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for flavor in [AuthFlavor::AuthNone, AuthFlavor::AuthSys, AuthFlavor::AuthAm] {
            assert_eq!(AuthFlavor::from_str_name(flavor.as_str_name()), Some(flavor));
        }
        assert_eq!(AuthFlavor::from_str_name("SYS"), None);
    }

    #[test]
    fn wire_values_are_stable() {
        assert_eq!(i32::from(AuthFlavor::AuthNone), 0);
        assert_eq!(i32::from(AuthFlavor::AuthSys), 1);
        assert_eq!(i32::from(AuthFlavor::AuthAm), 2);
        assert_eq!(AuthFlavor::try_from(2), Ok(AuthFlavor::AuthAm));
        assert!(AuthFlavor::try_from(42).is_err());
    }

    #[test]
    fn unknown_value_has_diagnostic_name() {
        assert_eq!(AuthFlavor::name_of(1), "AUTH_SYS");
        assert_eq!(AuthFlavor::name_of(-7), "AUTH_UNKNOWN");
    }
}
