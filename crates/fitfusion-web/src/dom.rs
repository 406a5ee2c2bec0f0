#![forbid(unsafe_code)]

//! Live-document side of the page: element arena, discovery source, and
//! effect application.

use fitfusion_core::{
    BlockAlign, Effect, ElementId, ElementSource, FragmentResolver, ScrollBehavior,
};
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlElement, IntersectionObserver, NodeList, ScrollIntoViewOptions,
    ScrollLogicalPosition,
};

/// Owns every element the core refers to; an [`ElementId`] is an index here.
#[derive(Debug, Default)]
pub(crate) struct ElementArena {
    elements: Vec<Element>,
}

impl ElementArena {
    /// Id of `element`, adding it on first sight.
    pub(crate) fn intern(&mut self, element: Element) -> ElementId {
        if let Some(id) = self.find(&element) {
            return id;
        }
        self.elements.push(element);
        ElementId::new((self.elements.len() - 1) as u32)
    }

    pub(crate) fn find(&self, element: &Element) -> Option<ElementId> {
        self.elements
            .iter()
            .position(|known| known == element)
            .map(|idx| ElementId::new(idx as u32))
    }

    pub(crate) fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.get() as usize)
    }
}

fn elements_of(list: NodeList) -> impl Iterator<Item = Element> {
    (0..list.length()).filter_map(move |i| list.item(i)?.dyn_into::<Element>().ok())
}

/// [`ElementSource`] and [`FragmentResolver`] over the live document.
pub(crate) struct DocumentSource<'a> {
    pub(crate) document: &'a Document,
    pub(crate) arena: &'a mut ElementArena,
}

impl DocumentSource<'_> {
    fn intern_all(&mut self, list: Result<NodeList, wasm_bindgen::JsValue>, selector: &str) -> Vec<ElementId> {
        match list {
            Ok(list) => elements_of(list).map(|el| self.arena.intern(el)).collect(),
            Err(err) => {
                tracing::warn!(selector, error = ?err, "selector query failed");
                Vec::new()
            }
        }
    }
}

impl ElementSource for DocumentSource<'_> {
    fn query_one(&mut self, selector: &str) -> Option<ElementId> {
        match self.document.query_selector(selector) {
            Ok(found) => found.map(|el| self.arena.intern(el)),
            Err(err) => {
                tracing::warn!(selector, error = ?err, "selector query failed");
                None
            }
        }
    }

    fn query_all(&mut self, selector: &str) -> Vec<ElementId> {
        let list = self.document.query_selector_all(selector);
        self.intern_all(list, selector)
    }

    fn query_all_within(&mut self, scope: ElementId, selector: &str) -> Vec<ElementId> {
        let Some(list) = self.arena.get(scope).map(|el| el.query_selector_all(selector)) else {
            return Vec::new();
        };
        self.intern_all(list, selector)
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.arena.get(element)?.get_attribute(name)
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.arena
            .get(element)
            .is_some_and(|el| el.class_list().contains(class))
    }
}

impl FragmentResolver for DocumentSource<'_> {
    fn resolve(&mut self, fragment: &str) -> Option<ElementId> {
        let element = self.document.get_element_by_id(fragment)?;
        Some(self.arena.intern(element))
    }
}

/// Applies effects for one dispatched event.
pub(crate) struct EffectApplier<'a> {
    pub(crate) arena: &'a ElementArena,
    pub(crate) active_class: &'a str,
    pub(crate) event: Option<&'a web_sys::Event>,
    pub(crate) observer: Option<&'a IntersectionObserver>,
}

impl EffectApplier<'_> {
    /// Apply every effect in order. A failing effect is logged and skipped.
    pub(crate) fn apply(&self, effects: &[Effect]) {
        for effect in effects {
            if let Err(err) = self.apply_one(effect) {
                tracing::warn!(?effect, error = ?err, "effect not applied");
            }
        }
    }

    fn apply_one(&self, effect: &Effect) -> Result<(), wasm_bindgen::JsValue> {
        if let Effect::PreventDefault = effect {
            if let Some(event) = self.event {
                event.prevent_default();
            }
            return Ok(());
        }

        let Some(element) = effect.target().and_then(|id| self.arena.get(id)) else {
            return Err(wasm_bindgen::JsValue::from_str("unknown element"));
        };
        match effect {
            Effect::SetMarker { on: true, .. } => element.class_list().add_1(self.active_class),
            Effect::SetMarker { on: false, .. } => element.class_list().remove_1(self.active_class),
            Effect::SetDisplay { display, .. } => style_of(element)?.set_property("display", display.as_css()),
            Effect::SetStyle { property, value, .. } => {
                style_of(element)?.set_property(property.css_name(), value)
            }
            Effect::ScrollIntoView {
                behavior, block, ..
            } => {
                let options = ScrollIntoViewOptions::new();
                options.set_behavior(match behavior {
                    ScrollBehavior::Smooth => web_sys::ScrollBehavior::Smooth,
                });
                options.set_block(match block {
                    BlockAlign::Start => ScrollLogicalPosition::Start,
                });
                element.scroll_into_view_with_scroll_into_view_options(&options);
                Ok(())
            }
            Effect::Observe { .. } => {
                if let Some(observer) = self.observer {
                    observer.observe(element);
                }
                Ok(())
            }
            Effect::Unobserve { .. } => {
                if let Some(observer) = self.observer {
                    observer.unobserve(element);
                }
                Ok(())
            }
            Effect::PreventDefault => Ok(()),
        }
    }
}

fn style_of(element: &Element) -> Result<web_sys::CssStyleDeclaration, wasm_bindgen::JsValue> {
    element
        .dyn_ref::<HtmlElement>()
        .map(HtmlElement::style)
        .ok_or_else(|| wasm_bindgen::JsValue::from_str("element has no inline style"))
}
