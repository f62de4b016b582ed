use std::cell::RefCell;
use std::rc::Rc;

use range_fill::{
    Document, Error, EventState, Handler, ListenerOptions, RangeFill, RangeFillOptions,
    ReadyState, Result, VERSION, activate,
};

const FILL: &str = "--range-fill-percent";

fn count_calls(doc: &mut Document, selector: &str, event: &str) -> Result<Rc<RefCell<usize>>> {
    let calls = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&calls);
    let handler: Handler = Rc::new(move |_: &mut Document, _: &EventState| -> Result<()> {
        *counter.borrow_mut() += 1;
        Ok(())
    });
    let node = doc.select(selector)?;
    doc.add_event_listener(node, event, ListenerOptions::default(), handler)?;
    Ok(calls)
}

#[test]
fn quarter_of_default_range_publishes_25_percent() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" min="0" max="100" value="25">"#,
    )?;
    RangeFill::new().init_all(&mut doc, None)?;
    doc.assert_style_property("#r", FILL, "25%")?;
    Ok(())
}

#[test]
fn midpoint_of_offset_range_publishes_50_percent() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" min="10" max="20" value="15">"#,
    )?;
    RangeFill::new().init_all(&mut doc, None)?;
    doc.assert_style_property("#r", FILL, "50%")?;
    Ok(())
}

#[test]
fn unparsable_min_falls_back_to_zero() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" min="low" max="50" value="10">"#,
    )?;
    RangeFill::new().init_all(&mut doc, None)?;
    doc.assert_style_property("#r", FILL, "20%")?;
    Ok(())
}

#[test]
fn non_ascii_digits_fall_back_without_stopping_the_scan() -> Result<()> {
    let mut doc = Document::from_html(
        "<input id='a' class='range' type='range' min='\u{0663}' max='50' value='10'>\
         <input id='b' class='range' type='range' value='\u{FF15}'>\
         <input id='c' class='range' type='range' max='\u{0663}0' value='30'>\
         <input id='d' class='range' type='range' value='40'>",
    )?;
    let mut ranges = RangeFill::new();
    ranges.init_all(&mut doc, None)?;

    doc.assert_style_property("#a", FILL, "20%")?;
    doc.assert_style_property("#b", FILL, "0%")?;
    doc.assert_style_property("#c", FILL, "30%")?;
    doc.assert_style_property("#d", FILL, "40%")?;
    assert_eq!(ranges.wired_count(), 4);

    doc.set_range_value("#d", "\u{FF17}")?;
    doc.assert_style_property("#d", FILL, "0%")?;
    Ok(())
}

#[test]
fn opted_out_slider_gets_nothing() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range range-flat" type="range" value="25">"#,
    )?;
    let r = doc.select("#r")?;
    let mut ranges = RangeFill::new();
    ranges.init_range(&mut doc, Some(r))?;

    assert!(!ranges.is_initialized(&doc, r));
    assert_eq!(doc.dataset_get(r, "nomadRangeInit"), None);
    assert_eq!(doc.style_property(r, FILL), None);
    assert_eq!(doc.listener_count(r, "input"), 0);
    assert_eq!(doc.listener_count(r, "change"), 0);
    Ok(())
}

#[test]
fn double_init_recomputes_once_per_signal() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" min="0" max="10" value="1">"#,
    )?;
    let r = doc.select("#r")?;
    let mut ranges = RangeFill::new();
    ranges.init_range(&mut doc, Some(r))?;
    ranges.init_range(&mut doc, Some(r))?;

    assert_eq!(doc.listener_count(r, "input"), 1);
    assert_eq!(doc.listener_count(r, "change"), 1);

    doc.enable_trace(true);
    doc.set_trace_emit(false);
    doc.set_trace_events(false);
    doc.set_range_value("#r", "4")?;
    let fills = doc
        .take_trace_logs()
        .into_iter()
        .filter(|line| line.starts_with("[range] fill"))
        .count();
    assert_eq!(fills, 1);
    doc.assert_style_property("#r", FILL, "40%")?;
    Ok(())
}

#[test]
fn init_all_marks_only_eligible_sliders() -> Result<()> {
    let mut doc = Document::from_html(
        r#"
        <form id="settings">
          <input id="a" class="range" type="range" value="10">
          <input id="b" class="range primary" type="range" value="20">
          <fieldset>
            <input id="c" class="range" type="range" value="30">
            <input id="flat" class="range range-flat" type="range" value="40">
          </fieldset>
          <input id="text" class="range" type="text" value="50">
          <input id="plain" type="range" value="60">
        </form>
        "#,
    )?;
    let mut ranges = RangeFill::new();
    ranges.init_all(&mut doc, None)?;

    let marked = doc.query_selector_all("[data-nomad-range-init]")?;
    let expected = ["#a", "#b", "#c"]
        .iter()
        .map(|selector| doc.select(selector))
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(marked, expected);
    assert_eq!(ranges.wired_count(), 3);

    // Sliders without the `range` class can still be wired explicitly.
    let plain = doc.select("#plain")?;
    ranges.init_range(&mut doc, Some(plain))?;
    doc.assert_style_property("#plain", FILL, "60%")?;
    Ok(())
}

#[test]
fn init_all_twice_matches_once() -> Result<()> {
    let html = r#"
        <input id="a" class="range" type="range" min="0" max="4" value="1">
        <input id="b" class="range" type="range" min="-10" max="10" value="5">
        <input id="c" class="range range-flat" type="range" value="5">
    "#;
    let mut once = Document::from_html(html)?;
    RangeFill::new().init_all(&mut once, None)?;

    let mut twice = Document::from_html(html)?;
    let mut ranges = RangeFill::new();
    ranges.init_all(&mut twice, None)?;
    ranges.init_all(&mut twice, None)?;

    for selector in ["#a", "#b", "#c"] {
        assert_eq!(once.dump_dom(selector)?, twice.dump_dom(selector)?);
        let node = twice.select(selector)?;
        assert!(twice.listener_count(node, "input") <= 1);
    }
    twice.assert_style_property("#a", FILL, "25%")?;
    twice.assert_style_property("#b", FILL, "75%")?;
    Ok(())
}

#[test]
fn destroy_removes_fill_and_marker_and_repeats_quietly() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" value="70">"#,
    )?;
    let r = doc.select("#r")?;
    let mut ranges = RangeFill::new();
    ranges.init_all(&mut doc, None)?;
    doc.assert_style_property("#r", FILL, "70%")?;

    ranges.destroy_range(&mut doc, Some(r))?;
    assert_eq!(doc.style_property(r, FILL), None);
    assert!(!ranges.is_initialized(&doc, r));
    assert_eq!(doc.listener_count(r, "input"), 0);
    assert_eq!(doc.listener_count(r, "change"), 0);

    ranges.destroy_range(&mut doc, Some(r))?;
    ranges.destroy_range(&mut doc, None)?;

    // Moving a torn-down slider publishes nothing.
    doc.set_range_value("#r", "10")?;
    assert_eq!(doc.style_property(r, FILL), None);
    Ok(())
}

#[test]
fn reinit_after_destroy_keeps_a_single_listener_pair() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" value="5">"#,
    )?;
    let r = doc.select("#r")?;
    let mut ranges = RangeFill::new();
    for _ in 0..3 {
        ranges.init_range(&mut doc, Some(r))?;
        ranges.destroy_range(&mut doc, Some(r))?;
    }
    ranges.init_range(&mut doc, Some(r))?;

    assert_eq!(doc.listener_count(r, "input"), 1);
    assert_eq!(doc.listener_count(r, "change"), 1);
    doc.set_range_value("#r", "55")?;
    doc.assert_style_property("#r", FILL, "55%")?;
    Ok(())
}

#[test]
fn input_and_change_both_republish() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" min="0" max="200" value="0">"#,
    )?;
    RangeFill::new().init_all(&mut doc, None)?;
    doc.assert_style_property("#r", FILL, "0%")?;

    doc.set_range_value("#r", "50")?;
    doc.assert_style_property("#r", FILL, "25%")?;

    // A value change that only reports `change` still lands.
    let r = doc.select("#r")?;
    doc.set_value(r, "150")?;
    doc.commit_range_value("#r")?;
    doc.assert_style_property("#r", FILL, "75%")?;
    Ok(())
}

#[test]
fn subtree_scan_ignores_sliders_outside_the_scope() -> Result<()> {
    let mut doc = Document::from_html(
        r#"
        <section id="left"><input id="l" class="range" type="range" value="10"></section>
        <section id="right"><input id="r" class="range" type="range" value="20"></section>
        "#,
    )?;
    let right = doc.select("#right")?;
    let mut ranges = RangeFill::new();
    ranges.init_all(&mut doc, Some(right))?;
    ranges.init_all(&mut doc, Some(right))?;

    let l = doc.select("#l")?;
    assert!(!ranges.is_initialized(&doc, l));
    doc.assert_style_property("#r", FILL, "20%")?;

    // Overlapping scopes do not double-wire.
    ranges.init_all(&mut doc, None)?;
    let r = doc.select("#r")?;
    assert_eq!(doc.listener_count(r, "input"), 1);
    doc.assert_style_property("#l", FILL, "10%")?;
    Ok(())
}

#[test]
fn dynamically_added_sliders_are_wired_on_request() -> Result<()> {
    let mut doc = Document::from_html(r#"<main id="app"></main>"#)?;
    let ranges = Rc::new(RefCell::new(RangeFill::new()));
    activate(&ranges, &mut doc)?;
    doc.finish_loading()?;

    let app = doc.select("#app")?;
    let slider = doc.create_element("input");
    doc.set_attr(slider, "type", "range")?;
    doc.set_attr(slider, "id", "late")?;
    doc.class_add(slider, "range")?;
    doc.class_add(slider, "primary")?;
    doc.set_attr(slider, "value", "35")?;
    doc.append_child(app, slider)?;
    assert!(!ranges.borrow().is_initialized(&doc, slider));

    ranges.borrow_mut().init_range(&mut doc, Some(slider))?;
    doc.assert_style_property("#late", FILL, "35%")?;

    let added = doc.append_html(
        app,
        r#"<div><input id="batch" class="range" type="range" max="70" value="7"></div>"#,
    )?;
    ranges.borrow_mut().init_all(&mut doc, Some(added[0]))?;
    doc.assert_style_property("#batch", FILL, "10%")?;
    Ok(())
}

#[test]
fn activation_waits_for_content_loaded() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" value="60">"#,
    )?;
    assert_eq!(doc.ready_state(), ReadyState::Loading);
    let ranges = Rc::new(RefCell::new(RangeFill::new()));
    activate(&ranges, &mut doc)?;

    let r = doc.select("#r")?;
    assert_eq!(doc.style_property(r, FILL), None);

    doc.finish_loading()?;
    doc.assert_style_property("#r", FILL, "60%")?;
    assert_eq!(ranges.borrow().wired_count(), 1);

    // The readiness signal fires once; finishing again changes nothing.
    ranges.borrow_mut().destroy_range(&mut doc, Some(r))?;
    doc.finish_loading()?;
    assert_eq!(doc.style_property(r, FILL), None);
    Ok(())
}

#[test]
fn activation_after_load_scans_immediately() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" value="12.5">"#,
    )?;
    doc.finish_loading()?;
    let ranges = Rc::new(RefCell::new(RangeFill::new()));
    activate(&ranges, &mut doc)?;
    doc.assert_style_property("#r", FILL, "12.5%")?;
    Ok(())
}

#[test]
fn activation_reports_a_busy_controller() -> Result<()> {
    let mut doc = Document::from_html(r#"<input class="range" type="range">"#)?;
    let ranges = Rc::new(RefCell::new(RangeFill::new()));
    activate(&ranges, &mut doc)?;

    let _held = ranges.borrow_mut();
    assert_eq!(doc.finish_loading(), Err(Error::ControllerBusy));
    Ok(())
}

#[test]
fn removed_sliders_can_be_pruned() -> Result<()> {
    let mut doc = Document::from_html(
        r#"
        <div id="list">
          <input id="a" class="range" type="range">
          <input id="b" class="range" type="range">
        </div>
        "#,
    )?;
    let mut ranges = RangeFill::new();
    ranges.init_all(&mut doc, None)?;
    assert_eq!(ranges.wired_count(), 2);

    let a = doc.select("#a")?;
    doc.remove_node(a)?;
    assert_eq!(ranges.prune_disconnected(&mut doc), 1);
    assert_eq!(ranges.wired_count(), 1);
    assert_eq!(doc.listener_count(a, "input"), 0);
    assert_eq!(ranges.prune_disconnected(&mut doc), 0);
    Ok(())
}

#[test]
fn custom_options_rename_the_style_contract() -> Result<()> {
    let options = RangeFillOptions::default()
        .with_fill_property("--slider-fill")
        .with_range_class("slider")
        .with_opt_out_class("slider-plain")
        .with_marker_key("sliderReady");
    let mut doc = Document::from_html(
        r#"
        <input id="s" class="slider" type="range" value="90">
        <input id="p" class="slider slider-plain" type="range" value="90">
        <input id="r" class="range" type="range" value="90">
        "#,
    )?;
    let mut ranges = RangeFill::with_options(options)?;
    ranges.init_all(&mut doc, None)?;

    doc.assert_style_property("#s", "--slider-fill", "90%")?;
    let s = doc.select("#s")?;
    assert_eq!(doc.attr(s, "data-slider-ready").as_deref(), Some("true"));
    for selector in ["#p", "#r"] {
        let node = doc.select(selector)?;
        assert!(!ranges.is_initialized(&doc, node));
    }

    assert!(matches!(
        RangeFill::with_options(RangeFillOptions::default().with_fill_property("fill")),
        Err(Error::InvalidOption(_))
    ));
    Ok(())
}

#[test]
fn listeners_added_by_the_page_survive_teardown() -> Result<()> {
    let mut doc = Document::from_html(
        r#"<input id="r" class="range" type="range" value="1">"#,
    )?;
    let calls = count_calls(&mut doc, "#r", "input")?;
    let r = doc.select("#r")?;
    let mut ranges = RangeFill::new();
    ranges.init_range(&mut doc, Some(r))?;
    ranges.destroy_range(&mut doc, Some(r))?;

    doc.set_range_value("#r", "2")?;
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(doc.listener_count(r, "input"), 1);
    Ok(())
}

#[test]
fn version_is_exposed() {
    assert_eq!(VERSION, "1.0.0");
    assert_eq!(RangeFill::new().version(), VERSION);
}
