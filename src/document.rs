use std::collections::VecDeque;

use crate::dom::{Dom, NodeId};
use crate::events::{EventState, Handler, ListenerId, ListenerOptions, ListenerStore};
use crate::html::{parse_html, parse_html_into};
use crate::{Error, Result};

/// Loading phase of a [`Document`], mirroring `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

pub const CONTENT_LOADED_EVENT: &str = "DOMContentLoaded";

/// A single-threaded host document: element tree, listeners, and the
/// one-shot content-loaded signal.
#[derive(Debug)]
pub struct Document {
    dom: Dom,
    listeners: ListenerStore,
    ready_state: ReadyState,
    trace: bool,
    trace_events: bool,
    trace_range: bool,
    trace_emit: bool,
    trace_logs: VecDeque<String>,
    trace_log_limit: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document that has not finished loading.
    pub fn new() -> Self {
        Self::with_dom(Dom::new())
    }

    /// Parses `html` into a document that has not finished loading yet;
    /// call [`Document::finish_loading`] to fire `DOMContentLoaded`.
    pub fn from_html(html: &str) -> Result<Self> {
        Ok(Self::with_dom(parse_html(html)?))
    }

    fn with_dom(dom: Dom) -> Self {
        Self {
            dom,
            listeners: ListenerStore::default(),
            ready_state: ReadyState::Loading,
            trace: false,
            trace_events: true,
            trace_range: true,
            trace_emit: true,
            trace_logs: VecDeque::new(),
            trace_log_limit: 10_000,
        }
    }

    pub fn root(&self) -> NodeId {
        self.dom.root()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Ends parsing: fires `DOMContentLoaded` on the document node and moves
    /// to [`ReadyState::Complete`]. Does nothing once loading has finished.
    pub fn finish_loading(&mut self) -> Result<()> {
        if self.ready_state != ReadyState::Loading {
            return Ok(());
        }
        self.ready_state = ReadyState::Interactive;
        let root = self.root();
        let outcome = self.dispatch_event(root, CONTENT_LOADED_EVENT);
        self.ready_state = ReadyState::Complete;
        outcome.map(|_| ())
    }

    /// Parses `html` and appends it to `parent`, returning the new top-level nodes.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>> {
        parse_html_into(&mut self.dom, parent, html)
    }

    /// Creates a detached element; attach it with [`Document::append_child`].
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.dom.create_detached_element(tag_name)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.dom.append_child(parent, child)
    }

    pub fn remove_node(&mut self, node_id: NodeId) -> Result<()> {
        self.dom.remove_node(node_id)
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.dom.parent(node_id)
    }

    pub fn is_connected(&self, node_id: NodeId) -> bool {
        self.dom.is_connected(node_id)
    }

    pub(crate) fn check_node(&self, node_id: NodeId) -> Result<()> {
        self.dom.check_node(node_id)
    }

    pub fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.dom.tag_name(node_id)
    }

    pub fn text_content(&self, node_id: NodeId) -> String {
        self.dom.text_content(node_id)
    }

    pub fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node_id, name)
    }

    pub fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_attr(node_id, name, value)
    }

    pub fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        self.dom.remove_attr(node_id, name)
    }

    /// Current control value (not the `value` attribute once edited).
    pub fn value(&self, node_id: NodeId) -> Result<String> {
        self.dom.value(node_id)
    }

    /// Sets the control value without firing any event.
    pub fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        self.dom.set_value(node_id, value)
    }

    pub fn input_type(&self, node_id: NodeId) -> Option<String> {
        self.dom.input_type(node_id)
    }

    pub fn disabled(&self, node_id: NodeId) -> bool {
        self.dom.disabled(node_id)
    }

    pub fn class_contains(&self, node_id: NodeId, class_name: &str) -> bool {
        self.dom.class_contains(node_id, class_name)
    }

    pub fn class_add(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        self.dom.class_add(node_id, class_name)
    }

    pub fn class_remove(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        self.dom.class_remove(node_id, class_name)
    }

    pub fn dataset_get(&self, node_id: NodeId, key: &str) -> Option<String> {
        self.dom.dataset_get(node_id, key)
    }

    pub fn dataset_set(&mut self, node_id: NodeId, key: &str, value: &str) -> Result<()> {
        self.dom.dataset_set(node_id, key, value)
    }

    pub fn dataset_remove(&mut self, node_id: NodeId, key: &str) -> Result<()> {
        self.dom.dataset_remove(node_id, key)
    }

    pub fn style_property(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.dom.style_property(node_id, name)
    }

    pub fn set_style_property(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_style_property(node_id, name, value)
    }

    pub fn remove_style_property(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        self.dom.remove_style_property(node_id, name)
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        self.dom.query_selector(selector)
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    /// Matching descendants of `root` (not `root` itself), in document order.
    pub fn query_selector_all_from(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all_from(root, selector)
    }

    pub fn matches_selector(&self, node_id: NodeId, selector: &str) -> Result<bool> {
        self.dom.matches_selector(node_id, selector)
    }

    /// First match for `selector`, or [`Error::SelectorNotFound`].
    pub fn select(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub fn add_event_listener(
        &mut self,
        node_id: NodeId,
        event: &str,
        options: ListenerOptions,
        handler: Handler,
    ) -> Result<ListenerId> {
        self.dom.check_node(node_id)?;
        Ok(self.listeners.add(node_id, event, options, handler))
    }

    /// Removes the listener registered as `id`; `false` if it was not there.
    pub fn remove_event_listener(&mut self, node_id: NodeId, event: &str, id: ListenerId) -> bool {
        self.listeners.remove(node_id, event, id)
    }

    pub fn has_event_listener(&self, node_id: NodeId, event: &str, id: ListenerId) -> bool {
        self.listeners.contains(node_id, event, id)
    }

    pub fn listener_count(&self, node_id: NodeId, event: &str) -> usize {
        self.listeners.count(node_id, event)
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select(selector)?;
        self.dispatch_event(target, event)?;
        Ok(())
    }

    /// Dispatches `event_type` at `target` through capture, target and
    /// bubble phases. Handler errors abort the dispatch and are returned.
    pub fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<EventState> {
        self.dom.check_node(target)?;
        let mut event = EventState::new(event_type, target);

        let mut path = Vec::new();
        let mut cursor = self.dom.parent(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        for node in &path {
            event.current_target = *node;
            self.invoke_listeners(*node, &mut event, true)?;
        }

        event.current_target = target;
        self.invoke_listeners(target, &mut event, true)?;
        self.invoke_listeners(target, &mut event, false)?;

        for node in path.iter().rev() {
            event.current_target = *node;
            self.invoke_listeners(*node, &mut event, false)?;
        }

        self.trace_event_done(&event);
        Ok(event)
    }

    fn invoke_listeners(
        &mut self,
        node_id: NodeId,
        event: &mut EventState,
        capture: bool,
    ) -> Result<()> {
        for listener in self.listeners.get(node_id, &event.event_type, capture) {
            // A handler earlier in this dispatch may have removed it.
            if !self
                .listeners
                .contains(node_id, &event.event_type, listener.id)
            {
                continue;
            }
            if listener.options.once {
                self.listeners
                    .remove(node_id, &event.event_type, listener.id);
            }
            if self.trace {
                let phase = if capture { "capture" } else { "bubble" };
                let line = format!(
                    "[event] {} target={} current={} phase={}",
                    event.event_type,
                    self.node_label(event.target),
                    self.node_label(event.current_target),
                    phase
                );
                self.trace_event_line(line);
            }
            (listener.handler)(self, event)?;
        }
        Ok(())
    }

    /// Moves a range slider to `value` and fires `input`, as dragging does.
    pub fn set_range_value(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_range(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        self.dom.set_value(target, value)?;
        self.dispatch_event(target, "input")?;
        Ok(())
    }

    /// Fires `change` on a range slider, as releasing the thumb does.
    pub fn commit_range_value(&mut self, selector: &str) -> Result<()> {
        let target = self.select_range(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        self.dispatch_event(target, "change")?;
        Ok(())
    }

    fn select_range(&self, selector: &str) -> Result<NodeId> {
        let target = self.select(selector)?;
        match self.dom.input_type(target) {
            Some(kind) if kind == "range" => Ok(target),
            Some(kind) => Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=range]".into(),
                actual: format!("input[type={kind}]"),
            }),
            None => Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=range]".into(),
                actual: self.dom.tag_name(target).unwrap_or("non-element").into(),
            }),
        }
    }

    pub fn assert_style_property(&self, selector: &str, name: &str, expected: &str) -> Result<()> {
        let target = self.select(selector)?;
        let actual = self.dom.style_property(target, name).unwrap_or_default();
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, actual));
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, actual));
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.select(selector).map(|_| ())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select(selector)?;
        Ok(self.dom.dump_node(target))
    }

    fn assertion_failed(
        &self,
        selector: &str,
        target: NodeId,
        expected: &str,
        actual: String,
    ) -> Error {
        Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual,
            dom_snippet: truncate_chars(&self.dom.dump_node(target), 200),
        }
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs).into()
    }

    /// Forward trace lines to `tracing` at debug level (on by default).
    pub fn set_trace_emit(&mut self, enabled: bool) {
        self.trace_emit = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_events = enabled;
    }

    pub fn set_trace_range(&mut self, enabled: bool) {
        self.trace_range = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidOption(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.pop_front();
        }
        Ok(())
    }

    pub(crate) fn trace_enabled(&self) -> bool {
        self.trace
    }

    fn trace_event_done(&mut self, event: &EventState) {
        if !self.trace {
            return;
        }
        let line = format!(
            "[event] done {} target={}",
            event.event_type,
            self.node_label(event.target)
        );
        self.trace_event_line(line);
    }

    fn trace_event_line(&mut self, line: String) {
        if self.trace && self.trace_events {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_range_line(&mut self, line: String) {
        if self.trace && self.trace_range {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        if self.trace_emit {
            tracing::debug!(target: "range_fill", "{line}");
        }
        if self.trace_logs.len() >= self.trace_log_limit {
            self.trace_logs.pop_front();
        }
        self.trace_logs.push_back(line);
    }

    /// `#id` when the element has one, else its tag name.
    pub(crate) fn node_label(&self, node: NodeId) -> String {
        if let Some(id) = self.dom.attr(node, "id").filter(|id| !id.is_empty()) {
            return format!("#{id}");
        }
        if node == self.dom.root() {
            return "document".into();
        }
        self.dom
            .tag_name(node)
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("node-{}", node.0))
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut out: String = value.chars().take(max_chars).collect();
    if value.chars().nth(max_chars).is_some() {
        out.push_str("...");
    }
    out
}
