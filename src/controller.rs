use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::document::CONTENT_LOADED_EVENT;
use crate::events::{EventState, Handler, ListenerId, ListenerOptions};
use crate::number::{format_number, parse_float_prefix};
use crate::{Document, Error, NodeId, RangeFillOptions, ReadyState, Result};

pub const VERSION: &str = "1.0.0";

const RANGE_EVENTS: [&str; 2] = ["input", "change"];

/// Listener identities attached to one slider, kept so teardown can detach them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RangeWiring {
    input: ListenerId,
    change: ListenerId,
}

impl RangeWiring {
    fn listeners(self) -> [(&'static str, ListenerId); 2] {
        [(RANGE_EVENTS[0], self.input), (RANGE_EVENTS[1], self.change)]
    }
}

/// Publishes the fill percentage of range sliders as an inline custom
/// property and keeps it current while the slider moves.
///
/// The initialization marker lives on the element (`data-nomad-range-init`);
/// the controller additionally remembers which listeners it attached so
/// [`RangeFill::destroy_range`] can remove them again.
#[derive(Debug, Default)]
pub struct RangeFill {
    options: Rc<RangeFillOptions>,
    wiring: HashMap<NodeId, RangeWiring>,
}

impl RangeFill {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RangeFillOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options: Rc::new(options),
            wiring: HashMap::new(),
        })
    }

    pub fn options(&self) -> &RangeFillOptions {
        &self.options
    }

    pub fn version(&self) -> &'static str {
        VERSION
    }

    /// Wires a single slider: publishes its fill and recomputes it on every
    /// `input` and `change`.
    ///
    /// Absent elements, non-range controls, opted-out sliders and sliders
    /// that already carry the marker are skipped without error. A `NodeId`
    /// from another document is [`Error::InvalidNode`].
    pub fn init_range(&mut self, doc: &mut Document, range: Option<NodeId>) -> Result<()> {
        let Some(range) = range else {
            return Ok(());
        };
        doc.check_node(range)?;
        if doc.input_type(range).as_deref() != Some("range") {
            trace_skip(doc, range, "not a range input");
            return Ok(());
        }
        if doc.class_contains(range, &self.options.opt_out_class) {
            trace_skip(doc, range, "opted out");
            return Ok(());
        }
        if self.is_initialized(doc, range) {
            trace_skip(doc, range, "already initialized");
            return Ok(());
        }

        // The marker was cleared behind our back; do not stack a second pair.
        if let Some(stale) = self.wiring.remove(&range) {
            detach(doc, range, stale);
        }

        update_fill(doc, range, &self.options)?;

        let [input, change] = RANGE_EVENTS.map(|event| {
            doc.add_event_listener(
                range,
                event,
                ListenerOptions::default(),
                fill_handler(Rc::clone(&self.options)),
            )
        });
        let wiring = RangeWiring {
            input: input?,
            change: change?,
        };
        self.wiring.insert(range, wiring);
        doc.dataset_set(range, &self.options.marker_key, "true")?;

        if doc.trace_enabled() {
            let line = format!("[range] init {}", doc.node_label(range));
            doc.trace_range_line(line);
        }
        Ok(())
    }

    /// Initializes every `.range:not(.range-flat)` below `root` (the whole
    /// document when `None`), in document order. Safe to repeat.
    pub fn init_all(&mut self, doc: &mut Document, root: Option<NodeId>) -> Result<()> {
        let root = root.unwrap_or_else(|| doc.root());
        let ranges = doc.query_selector_all_from(root, &self.options.scan_selector())?;
        if doc.trace_enabled() {
            let line = format!(
                "[range] scan {} matched={}",
                doc.node_label(root),
                ranges.len()
            );
            doc.trace_range_line(line);
        }
        for range in ranges {
            self.init_range(doc, Some(range))?;
        }
        Ok(())
    }

    /// Removes the published fill, clears the marker and detaches the
    /// listeners `init_range` attached. Skips elements without the marker.
    pub fn destroy_range(&mut self, doc: &mut Document, range: Option<NodeId>) -> Result<()> {
        let Some(range) = range else {
            return Ok(());
        };
        doc.check_node(range)?;
        if !self.is_initialized(doc, range) {
            trace_skip(doc, range, "not initialized");
            return Ok(());
        }

        doc.remove_style_property(range, &self.options.fill_property)?;
        doc.dataset_remove(range, &self.options.marker_key)?;
        if let Some(wiring) = self.wiring.remove(&range) {
            detach(doc, range, wiring);
        }

        if doc.trace_enabled() {
            let line = format!("[range] destroy {}", doc.node_label(range));
            doc.trace_range_line(line);
        }
        Ok(())
    }

    /// True when the marker is present and non-empty; `data-nomad-range-init=""`
    /// does not count.
    pub fn is_initialized(&self, doc: &Document, range: NodeId) -> bool {
        doc.dataset_get(range, &self.options.marker_key)
            .is_some_and(|marker| !marker.is_empty())
    }

    /// The percentage `init_range` would publish, without publishing it.
    /// `None` for anything that is not a range input.
    pub fn fill_percent(&self, doc: &Document, range: NodeId) -> Result<Option<f64>> {
        doc.check_node(range)?;
        if doc.input_type(range).as_deref() != Some("range") {
            return Ok(None);
        }
        compute_fill(doc, range).map(Some)
    }

    /// Number of sliders whose listeners this controller currently holds.
    pub fn wired_count(&self) -> usize {
        self.wiring.len()
    }

    /// Forgets sliders that are no longer in the document, detaching their
    /// listeners. Returns how many were dropped.
    pub fn prune_disconnected(&mut self, doc: &mut Document) -> usize {
        let gone: Vec<NodeId> = self
            .wiring
            .keys()
            .copied()
            .filter(|range| !doc.is_connected(*range))
            .collect();
        for range in &gone {
            if let Some(wiring) = self.wiring.remove(range) {
                detach(doc, *range, wiring);
            }
        }
        gone.len()
    }
}

/// Runs the full-document scan once the document's content is available:
/// immediately when loading has finished, otherwise on `DOMContentLoaded`.
pub fn activate(controller: &Rc<RefCell<RangeFill>>, doc: &mut Document) -> Result<()> {
    if doc.ready_state() != ReadyState::Loading {
        return borrow_controller(controller)?.init_all(doc, None);
    }

    let controller = Rc::clone(controller);
    let handler: Handler = Rc::new(move |doc: &mut Document, _: &EventState| -> Result<()> {
        borrow_controller(&controller)?.init_all(doc, None)
    });
    let root = doc.root();
    doc.add_event_listener(root, CONTENT_LOADED_EVENT, ListenerOptions::once(), handler)?;
    Ok(())
}

fn borrow_controller(controller: &RefCell<RangeFill>) -> Result<std::cell::RefMut<'_, RangeFill>> {
    controller.try_borrow_mut().map_err(|_| Error::ControllerBusy)
}

fn fill_handler(options: Rc<RangeFillOptions>) -> Handler {
    Rc::new(move |doc: &mut Document, event: &EventState| -> Result<()> {
        update_fill(doc, event.current_target, &options)
    })
}

fn update_fill(doc: &mut Document, range: NodeId, options: &RangeFillOptions) -> Result<()> {
    let percent = compute_fill(doc, range)?;
    let published = format!("{}%", format_number(percent));
    if doc.trace_enabled() {
        let line = format!("[range] fill {} {published}", doc.node_label(range));
        doc.trace_range_line(line);
    }
    doc.set_style_property(range, &options.fill_property, &published)
}

/// `(value - min) / (max - min) * 100` with falsy-number fallbacks.
///
/// An unparsable or zero `min`/value reads as 0 and an unparsable or zero
/// `max` as 100. Nothing is clamped: values outside the range give results
/// outside 0..=100, and `min == max` yields NaN or an infinity.
fn compute_fill(doc: &Document, range: NodeId) -> Result<f64> {
    let min = numeric_or(doc.attr(range, "min").as_deref(), 0.0)?;
    let max = numeric_or(doc.attr(range, "max").as_deref(), 100.0)?;
    let value = numeric_or(Some(doc.value(range)?.as_str()), 0.0)?;
    Ok((value - min) / (max - min) * 100.0)
}

fn numeric_or(text: Option<&str>, fallback: f64) -> Result<f64> {
    let parsed = match text {
        Some(text) => parse_float_prefix(text)?,
        None => None,
    };
    // Zero counts as missing.
    Ok(parsed.filter(|value| *value != 0.0).unwrap_or(fallback))
}

fn detach(doc: &mut Document, range: NodeId, wiring: RangeWiring) {
    for (event, id) in wiring.listeners() {
        doc.remove_event_listener(range, event, id);
    }
}

fn trace_skip(doc: &mut Document, range: NodeId, reason: &str) {
    if doc.trace_enabled() {
        let line = format!("[range] skip {} ({reason})", doc.node_label(range));
        doc.trace_range_line(line);
    }
}
