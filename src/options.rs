use crate::selector::is_selector_ident_char;
use crate::{Error, Result};

/// Names shared with the accompanying stylesheet.
///
/// The defaults are the published style contract; change them only together
/// with the stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeFillOptions {
    /// Inline custom property receiving the percentage.
    pub fill_property: String,
    /// Class that marks a slider for scanning by `init_all`.
    pub range_class: String,
    /// Class that opts a slider out entirely.
    pub opt_out_class: String,
    /// Dataset key of the initialization marker.
    pub marker_key: String,
}

impl Default for RangeFillOptions {
    fn default() -> Self {
        Self {
            fill_property: "--range-fill-percent".into(),
            range_class: "range".into(),
            opt_out_class: "range-flat".into(),
            marker_key: "nomadRangeInit".into(),
        }
    }
}

impl RangeFillOptions {
    pub fn with_fill_property(mut self, name: impl Into<String>) -> Self {
        self.fill_property = name.into();
        self
    }

    pub fn with_range_class(mut self, class_name: impl Into<String>) -> Self {
        self.range_class = class_name.into();
        self
    }

    pub fn with_opt_out_class(mut self, class_name: impl Into<String>) -> Self {
        self.opt_out_class = class_name.into();
        self
    }

    pub fn with_marker_key(mut self, key: impl Into<String>) -> Self {
        self.marker_key = key.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let custom_name = self.fill_property.strip_prefix("--").unwrap_or_default();
        if custom_name.is_empty() || !custom_name.bytes().all(is_selector_ident_char) {
            return Err(Error::InvalidOption(format!(
                "fill property must be a custom property like --name, got {:?}",
                self.fill_property
            )));
        }
        for (what, class_name) in [
            ("range class", &self.range_class),
            ("opt-out class", &self.opt_out_class),
        ] {
            if !is_class_name(class_name) {
                return Err(Error::InvalidOption(format!(
                    "{what} must be a plain class name, got {class_name:?}"
                )));
            }
        }
        if self.range_class == self.opt_out_class {
            return Err(Error::InvalidOption(format!(
                "range class and opt-out class are both {:?}",
                self.range_class
            )));
        }
        let key_ok = self
            .marker_key
            .bytes()
            .next()
            .is_some_and(|first| first.is_ascii_lowercase())
            && self.marker_key.bytes().all(|b| b.is_ascii_alphanumeric());
        if !key_ok {
            return Err(Error::InvalidOption(format!(
                "marker key must be a camelCase dataset key, got {:?}",
                self.marker_key
            )));
        }
        Ok(())
    }

    /// Selector `init_all` scans with, e.g. `.range:not(.range-flat)`.
    pub fn scan_selector(&self) -> String {
        format!(".{}:not(.{})", self.range_class, self.opt_out_class)
    }
}

fn is_class_name(value: &str) -> bool {
    let bytes = value.as_bytes();
    // A leading digit or `-<digit>` would not survive as a selector identifier.
    let starts_ok = match bytes {
        [first, ..] if first.is_ascii_digit() => false,
        [b'-', second, ..] if second.is_ascii_digit() => false,
        [] => false,
        _ => true,
    };
    starts_ok && bytes.iter().copied().all(is_selector_ident_char)
}
