//! Configuration options for WDDX serialization and deserialization.
//!
//! - [`WddxOptions`]: Main configuration struct
//! - [`Zone`]: The time zone timestamps are written in and normalized to
//!
//! ## Examples
//!
//! ```rust
//! use chrono::FixedOffset;
//! use serde_wddx::{to_string_with_options, WddxOptions, Zone};
//!
//! let options = WddxOptions::new()
//!     .with_xml_declaration(true)
//!     .with_zone(Zone::Fixed(FixedOffset::east_opt(0).unwrap()));
//!
//! let wddx = to_string_with_options(&true, options).unwrap();
//! assert!(wddx.starts_with("<?xml"));
//! ```

use chrono::{DateTime, FixedOffset, Local};

/// The time zone used for `dateTime` values.
///
/// WDDX timestamps are local wall-clock times with an offset. On encode a timestamp is
/// converted into this zone before formatting; on decode every parsed timestamp is
/// normalized into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Zone {
    /// The system's local time zone.
    #[default]
    Local,
    /// A fixed UTC offset, independent of the host configuration.
    Fixed(FixedOffset),
}

impl Zone {
    /// Converts `instant` into this zone, keeping the instant unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::{DateTime, FixedOffset};
    /// use serde_wddx::Zone;
    ///
    /// let utc = DateTime::parse_from_rfc3339("2001-06-17T12:00:30Z").unwrap();
    /// let zone = Zone::Fixed(FixedOffset::east_opt(5 * 3600 + 1800).unwrap());
    ///
    /// let local = zone.localize(&utc);
    /// assert_eq!(local, utc);
    /// assert_eq!(local.to_rfc3339(), "2001-06-17T17:30:30+05:30");
    /// ```
    #[must_use]
    pub fn localize(&self, instant: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            Zone::Local => instant.with_timezone(&Local).fixed_offset(),
            Zone::Fixed(offset) => instant.with_timezone(offset),
        }
    }
}

/// Configuration options for WDDX serialization and deserialization.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::WddxOptions;
///
/// // Defaults: no XML declaration, local time zone, depth limit 128, no validation
/// let options = WddxOptions::new();
/// assert!(!options.xml_declaration);
///
/// // Validate every document against the baseline grammar before decoding
/// let options = WddxOptions::new().with_validation(true).with_max_depth(32);
/// assert!(options.validate);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct WddxOptions {
    pub xml_declaration: bool,
    pub zone: Zone,
    pub max_depth: usize,
    pub validate: bool,
}

impl Default for WddxOptions {
    fn default() -> Self {
        WddxOptions {
            xml_declaration: false,
            zone: Zone::default(),
            max_depth: 128,
            validate: false,
        }
    }
}

impl WddxOptions {
    /// Creates default options.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wddx::{WddxOptions, Zone};
    ///
    /// let options = WddxOptions::new();
    /// assert_eq!(options.zone, Zone::Local);
    /// assert_eq!(options.max_depth, 128);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes encoded packets with an XML declaration.
    #[must_use]
    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }

    /// Sets the time zone timestamps are written in and normalized to.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::FixedOffset;
    /// use serde_wddx::{WddxOptions, Zone};
    ///
    /// let options = WddxOptions::new().with_zone(Zone::Fixed(FixedOffset::west_opt(5 * 3600).unwrap()));
    /// assert_ne!(options.zone, Zone::Local);
    /// ```
    #[must_use]
    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    /// Sets the maximum nesting depth accepted on encode and decode.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enables validation against the baseline grammar before decoding.
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}
