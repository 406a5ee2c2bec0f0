#![forbid(unsafe_code)]

//! Browser runtime: boot, listener wiring, and the JS exports.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fitfusion_core::{
    ArmedFeatures, ElementId, ElementRegistry, IntersectionSample, PageConfig, PageController,
    PageEvent, SessionTrace,
};
use tracing::Level;
use tracing_subscriber::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, Event, EventTarget, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, Node,
};

use crate::boot::{BootGuard, CONFIG_ELEMENT_ID, resolve_config};
use crate::dom::{DocumentSource, EffectApplier, ElementArena};
use crate::logging::{ConsoleLayer, LineSink, level_filter, with_fallback_logging};

thread_local! {
    static BOOT: BootGuard = const { BootGuard::new() };
    static RUNTIME: RefCell<Option<Rc<PageRuntime>>> = const { RefCell::new(None) };
}

/// Writes formatted lines to the browser console.
struct BrowserConsole;

impl LineSink for BrowserConsole {
    fn write_line(&self, level: Level, line: &str) {
        let line = JsValue::from_str(line);
        match level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            Level::INFO => web_sys::console::log_1(&line),
            Level::DEBUG | Level::TRACE => web_sys::console::debug_1(&line),
        }
    }
}

fn install_logging(config: &PageConfig) {
    let subscriber = tracing_subscriber::registry()
        .with(level_filter(config.level()))
        .with(ConsoleLayer::new(BrowserConsole));
    // A second module instance on the same page keeps the first subscriber.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

struct Watch {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>,
}

struct PageRuntime {
    document: Document,
    active_class: String,
    arena: RefCell<ElementArena>,
    controller: RefCell<PageController>,
    trace: RefCell<SessionTrace>,
    watch: RefCell<Option<Watch>>,
    listeners: RefCell<Vec<Listener>>,
}

impl PageRuntime {
    fn element(&self, id: ElementId) -> Option<Element> {
        self.arena.borrow().get(id).cloned()
    }

    /// Handle, record, apply.
    fn dispatch(&self, event: &PageEvent, dom_event: Option<&Event>) {
        let effects = self.controller.borrow_mut().handle(event);
        self.trace.borrow_mut().record(event, &effects);
        self.apply(&effects, dom_event);
    }

    fn apply(&self, effects: &[fitfusion_core::Effect], dom_event: Option<&Event>) {
        if effects.is_empty() {
            return;
        }
        let arena = self.arena.borrow();
        let watch = self.watch.borrow();
        EffectApplier {
            arena: &arena,
            active_class: &self.active_class,
            event: dom_event,
            observer: watch.as_ref().map(|w| &w.observer),
        }
        .apply(effects);
    }

    fn teardown(&self) {
        for listener in self.listeners.borrow_mut().drain(..) {
            if let Err(err) = listener
                .target
                .remove_event_listener_with_callback(listener.kind, listener.callback.as_ref().unchecked_ref())
            {
                tracing::warn!(kind = listener.kind, error = ?err, "listener not removed");
            }
        }
        if let Some(watch) = self.watch.borrow_mut().take() {
            watch.observer.disconnect();
        }
        tracing::debug!("page runtime destroyed");
    }
}

/// Register `kind` on `target`; `to_event` maps the DOM event to a page event.
fn listen<F>(runtime: &Rc<PageRuntime>, target: EventTarget, kind: &'static str, to_event: F)
where
    F: Fn(&PageRuntime, &Event) -> Option<PageEvent> + 'static,
{
    let weak: Weak<PageRuntime> = Rc::downgrade(runtime);
    let callback = Closure::wrap(Box::new(move |event: Event| {
        let Some(runtime) = weak.upgrade() else {
            return;
        };
        if let Some(page_event) = to_event(&runtime, &event) {
            runtime.dispatch(&page_event, Some(&event));
        }
    }) as Box<dyn FnMut(Event)>);

    if let Err(err) = target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref()) {
        tracing::warn!(kind, error = ?err, "listener not registered");
        return;
    }
    runtime.listeners.borrow_mut().push(Listener {
        target,
        kind,
        callback,
    });
}

fn listen_element<F>(runtime: &Rc<PageRuntime>, id: ElementId, kind: &'static str, to_event: F)
where
    F: Fn(&PageRuntime, &Event) -> Option<PageEvent> + 'static,
{
    match runtime.element(id) {
        Some(element) => listen(runtime, element.into(), kind, to_event),
        None => tracing::warn!(element = %id, "listener target missing from arena"),
    }
}

fn watch(runtime: &Rc<PageRuntime>, config: &PageConfig) -> Result<Watch, JsValue> {
    let weak = Rc::downgrade(runtime);
    let callback = Closure::wrap(Box::new(move |entries: js_sys::Array, _: IntersectionObserver| {
        let Some(runtime) = weak.upgrade() else {
            return;
        };
        let samples: Vec<IntersectionSample> = {
            let arena = runtime.arena.borrow();
            entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                .filter_map(|entry| {
                    Some(IntersectionSample {
                        target: arena.find(&entry.target())?,
                        is_intersecting: entry.is_intersecting(),
                        ratio: entry.intersection_ratio(),
                    })
                })
                .collect()
        };
        if !samples.is_empty() {
            runtime.dispatch(&PageEvent::Intersection { samples }, None);
        }
    }) as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);

    let options = IntersectionObserverInit::new();
    options.set_threshold(&JsValue::from_f64(config.reveal.threshold));
    options.set_root_margin(&config.reveal.root_margin());
    let observer =
        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)?;
    Ok(Watch {
        observer,
        _callback: callback,
    })
}

fn wire_listeners(runtime: &Rc<PageRuntime>, registry: &ElementRegistry) {
    let armed = runtime.controller.borrow().armed();

    if armed.contains(ArmedFeatures::NAV) {
        if let Some(toggle) = registry.menu_toggle {
            listen_element(runtime, toggle.id, "click", |_, _| Some(PageEvent::MenuToggleClick));
        }
        for &link in &registry.nav_links {
            listen_element(runtime, link, "click", move |_, _| {
                Some(PageEvent::NavLinkClick { link })
            });
        }
        let scope: Vec<Element> = [registry.menu_toggle, registry.nav_panel]
            .into_iter()
            .flatten()
            .filter_map(|marked| runtime.element(marked.id))
            .collect();
        listen(runtime, runtime.document.clone().into(), "click", move |_, event| {
            let clicked = event.target().and_then(|t| t.dyn_into::<Node>().ok());
            let inside_menu = scope.iter().any(|el| el.contains(clicked.as_ref()));
            Some(PageEvent::DocumentClick { inside_menu })
        });
    }

    if armed.contains(ArmedFeatures::PRICING) {
        if let Some(switch) = registry.pricing_switch.as_ref() {
            listen_element(runtime, switch.id, "click", |_, _| {
                Some(PageEvent::PricingSwitchClick)
            });
        }
    }

    if armed.contains(ArmedFeatures::FILTER) {
        for control in &registry.filter_controls {
            let control = control.id;
            listen_element(runtime, control, "click", move |_, _| {
                Some(PageEvent::FilterClick { control })
            });
        }
    }

    if armed.contains(ArmedFeatures::ANCHORS) {
        for anchor in &registry.anchors {
            let anchor = anchor.id;
            listen_element(runtime, anchor, "click", move |runtime, _| {
                let mut arena = runtime.arena.borrow_mut();
                let mut source = DocumentSource {
                    document: &runtime.document,
                    arena: &mut arena,
                };
                Some(runtime.controller.borrow().anchor_click(anchor, &mut source))
            });
        }
    }
}

fn boot(document: Document) {
    if !BOOT.with(BootGuard::claim) {
        return;
    }

    let embedded = document
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|el| el.text_content());
    let (config, rejected) = resolve_config(embedded.as_deref());
    install_logging(&config);
    if let Some(err) = rejected {
        tracing::warn!(error = %err, "page config rejected, using defaults");
    }

    let mut arena = ElementArena::default();
    let registry = ElementRegistry::discover(
        &mut DocumentSource {
            document: &document,
            arena: &mut arena,
        },
        &config,
    );
    let controller = PageController::new(&registry, &config);
    let trace = SessionTrace::new(&controller, &registry, config.trace_capacity);

    let runtime = Rc::new(PageRuntime {
        document,
        active_class: config.markers.active_class.clone(),
        arena: RefCell::new(arena),
        controller: RefCell::new(controller),
        trace: RefCell::new(trace),
        watch: RefCell::new(None),
        listeners: RefCell::new(Vec::new()),
    });

    if runtime.controller.borrow().armed().contains(ArmedFeatures::REVEAL) {
        match watch(&runtime, &config) {
            Ok(w) => {
                *runtime.watch.borrow_mut() = Some(w);
                let effects = runtime.controller.borrow_mut().start();
                runtime.trace.borrow_mut().record_start(&effects);
                runtime.apply(&effects, None);
            }
            // Without an observer nothing would ever reveal, so targets are
            // left in their markup state and the feature is dropped.
            Err(err) => {
                tracing::warn!(error = ?err, "intersection observer unavailable");
                runtime.controller.borrow_mut().disarm(ArmedFeatures::REVEAL);
                *runtime.trace.borrow_mut() = SessionTrace::new(
                    &runtime.controller.borrow(),
                    &registry,
                    config.trace_capacity,
                );
            }
        }
    }

    wire_listeners(&runtime, &registry);
    tracing::debug!(
        elements = registry.element_count(),
        listeners = runtime.listeners.borrow().len(),
        "page booted"
    );

    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime));
}

/// Module entry point: boot now, or once the document is parsed.
#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        with_fallback_logging(BrowserConsole, || {
            tracing::error!("no window or document, page not booted");
        });
        return Err(JsValue::from_str("no document"));
    };

    if document.ready_state() == "loading" {
        let deferred = document.clone();
        let callback = Closure::once_into_js(move || boot(deferred));
        if let Err(err) =
            document.add_event_listener_with_callback("DOMContentLoaded", callback.unchecked_ref())
        {
            with_fallback_logging(BrowserConsole, || {
                tracing::error!(error = ?err, "DOMContentLoaded listener not registered");
            });
            return Err(err);
        }
    } else {
        boot(document);
    }
    Ok(())
}

/// Bit set of armed features (nav 1, pricing 2, filter 4, anchors 8, reveal 16).
#[wasm_bindgen(js_name = armedFeatures)]
#[must_use]
pub fn armed_features() -> u8 {
    RUNTIME.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(0, |runtime| runtime.controller.borrow().armed().bits())
    })
}

/// Session trace as JSON lines. Empty before boot and after `destroy`.
#[wasm_bindgen(js_name = sessionTraceJsonl)]
pub fn session_trace_jsonl() -> Result<js_sys::Array, JsValue> {
    RUNTIME.with(|slot| {
        let slot = slot.borrow();
        let Some(runtime) = slot.as_ref() else {
            return Ok(js_sys::Array::new());
        };
        let lines = runtime
            .trace
            .borrow()
            .to_jsonl()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(lines.iter().map(|line| JsValue::from_str(line)).collect())
    })
}

/// Remove every listener, stop observing, and drop page state.
#[wasm_bindgen]
pub fn destroy() {
    if let Some(runtime) = RUNTIME.with(|slot| slot.borrow_mut().take()) {
        runtime.teardown();
    }
}
