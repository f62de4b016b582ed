//! Fill-percentage publisher for range sliders.
//!
//! [`RangeFill`] finds `<input type="range">` controls, computes how far the
//! current value sits between `min` and `max`, and writes the result to the
//! inline custom property `--range-fill-percent` so a stylesheet can paint
//! the filled part of the track. The controller runs against [`Document`], a
//! small deterministic host DOM with selectors, datasets, inline styles and
//! events.
//!
//! ```
//! use range_fill::{Document, RangeFill, Result};
//!
//! fn main() -> Result<()> {
//!     let mut doc = Document::from_html(
//!         r#"<input id="volume" class="range" type="range" min="0" max="100" value="25">"#,
//!     )?;
//!     let mut ranges = RangeFill::new();
//!     ranges.init_all(&mut doc, None)?;
//!     doc.assert_style_property("#volume", "--range-fill-percent", "25%")?;
//!
//!     doc.set_range_value("#volume", "80")?;
//!     doc.assert_style_property("#volume", "--range-fill-percent", "80%")?;
//!     Ok(())
//! }
//! ```

mod controller;
mod document;
mod dom;
mod events;
mod html;
mod number;
mod options;
mod selector;

pub use controller::{RangeFill, VERSION, activate};
pub use document::{CONTENT_LOADED_EVENT, Document, ReadyState};
pub use dom::NodeId;
pub use events::{EventState, Handler, ListenerId, ListenerOptions};
pub use number::{format_number, parse_float_prefix};
pub use options::RangeFillOptions;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("dom error: {0}")]
    Dom(String),
    #[error("invalid node: {0}")]
    InvalidNode(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("number pattern error: {0}")]
    NumberPattern(String),
    #[error("range fill controller is already borrowed")]
    ControllerBusy,
    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}
