//! End-to-end scenarios over a hand-built landing page registry.

use std::collections::HashMap;

use fitfusion_core::{
    ArmedFeatures, BlockAlign, Display, Effect, ElementId, ElementRegistry, NavState, PageConfig,
    PageController, PageEvent, Rect, ScrollBehavior, SessionTrace, Viewport, replay,
};
use pretty_assertions::assert_eq;

const TOGGLE: ElementId = ElementId::new(1);
const PANEL: ElementId = ElementId::new(2);
const NAV_CLASSES: ElementId = ElementId::new(3);
const HERO_CTA: ElementId = ElementId::new(4);
const LOGO: ElementId = ElementId::new(5);
const CLASSES_SECTION: ElementId = ElementId::new(6);
const PRICING_SECTION: ElementId = ElementId::new(7);

fn page() -> ElementRegistry {
    ElementRegistry::default()
        .with_menu_toggle(TOGGLE)
        .with_nav_panel(PANEL, [NAV_CLASSES])
        .with_anchor(NAV_CLASSES, "#classes")
        .with_anchor(HERO_CTA, "#pricing")
        .with_anchor(LOGO, "#")
        .with_anchor(ElementId::new(8), "#gone")
        .with_pricing_switch(ElementId::new(9), false)
        .with_prices([ElementId::new(10)], [ElementId::new(11)])
        .with_filter_control(ElementId::new(20), "all")
        .with_filter_control(ElementId::new(21), "cardio")
        .with_content_card(ElementId::new(30), "cardio")
        .with_content_card(ElementId::new(31), "yoga")
        .with_reveal_targets([ElementId::new(30), ElementId::new(31), ElementId::new(40)])
}

fn ids() -> HashMap<String, ElementId> {
    HashMap::from([
        ("classes".to_owned(), CLASSES_SECTION),
        ("pricing".to_owned(), PRICING_SECTION),
    ])
}

#[test]
fn full_page_arms_everything() {
    let controller = PageController::new(&page(), &PageConfig::default());
    assert_eq!(controller.armed(), ArmedFeatures::all());
}

#[test]
fn missing_toggle_or_panel_disarms_only_nav() {
    for registry in [
        ElementRegistry {
            menu_toggle: None,
            ..page()
        },
        ElementRegistry {
            nav_panel: None,
            ..page()
        },
    ] {
        let mut controller = PageController::new(&registry, &PageConfig::default());
        assert!(!controller.armed().contains(ArmedFeatures::NAV));
        assert!(controller.armed().contains(ArmedFeatures::PRICING));
        assert!(controller.handle(&PageEvent::MenuToggleClick).is_empty());
        assert_eq!(controller.nav_state(), None);
    }
}

#[test]
fn nav_link_closes_menu_and_scrolls() {
    let mut controller = PageController::new(&page(), &PageConfig::default());
    let mut resolver = ids();

    controller.handle(&PageEvent::MenuToggleClick);
    assert_eq!(controller.nav_state(), Some(NavState::Open));

    // A nav link fires its own listener, the anchor listener, and the
    // document listener (inside the panel).
    let closing = controller.handle(&PageEvent::NavLinkClick { link: NAV_CLASSES });
    assert_eq!(
        closing,
        vec![
            Effect::SetMarker {
                target: TOGGLE,
                on: false
            },
            Effect::SetMarker {
                target: PANEL,
                on: false
            },
        ]
    );
    let anchor = controller.anchor_click(NAV_CLASSES, &mut resolver);
    assert_eq!(
        controller.handle(&anchor),
        vec![
            Effect::PreventDefault,
            Effect::ScrollIntoView {
                target: CLASSES_SECTION,
                behavior: ScrollBehavior::Smooth,
                block: BlockAlign::Start,
            },
        ]
    );
    assert!(
        controller
            .handle(&PageEvent::DocumentClick { inside_menu: true })
            .is_empty()
    );
    assert_eq!(controller.nav_state(), Some(NavState::Closed));
}

#[test]
fn bare_and_dead_anchors() {
    let mut controller = PageController::new(&page(), &PageConfig::default());
    let mut resolver = ids();

    let bare = controller.anchor_click(LOGO, &mut resolver);
    assert!(controller.handle(&bare).is_empty());

    let dead = controller.anchor_click(ElementId::new(8), &mut resolver);
    assert_eq!(controller.handle(&dead), vec![Effect::PreventDefault]);
}

#[test]
fn filter_then_all() {
    let mut controller = PageController::new(&page(), &PageConfig::default());
    let effects = controller.handle(&PageEvent::FilterClick {
        control: ElementId::new(21),
    });
    assert!(effects.contains(&Effect::SetDisplay {
        target: ElementId::new(30),
        display: Display::Block
    }));
    assert!(effects.contains(&Effect::SetDisplay {
        target: ElementId::new(31),
        display: Display::None
    }));

    let effects = controller.handle(&PageEvent::FilterClick {
        control: ElementId::new(20),
    });
    assert!(effects.contains(&Effect::SetDisplay {
        target: ElementId::new(31),
        display: Display::Block
    }));
    assert_eq!(controller.selected_filter(), Some(ElementId::new(20)));
}

#[test]
fn scrolling_reveals_each_card_once() {
    let config = PageConfig::default();
    let mut controller = PageController::new(&page(), &config);
    controller.start();

    let viewport = Viewport::new(1280.0, 720.0);
    let card = Rect::new(0.0, 900.0, 400.0, 300.0);
    let scroll = |dy: f64| {
        vec![viewport.sample(ElementId::new(30), card.shifted(-dy), &config.reveal)]
    };

    // Still below the fold.
    assert!(
        controller
            .handle(&PageEvent::Intersection { samples: scroll(0.0) })
            .is_empty()
    );
    // 250px of scroll: top at 650, 20px above the margin line at 670 (6.7%).
    assert!(
        controller
            .handle(&PageEvent::Intersection { samples: scroll(250.0) })
            .is_empty()
    );
    // 400px of scroll: 170px visible (56%).
    let revealed = controller.handle(&PageEvent::Intersection { samples: scroll(400.0) });
    assert_eq!(revealed.len(), 3);
    assert_eq!(
        revealed[2],
        Effect::Unobserve {
            target: ElementId::new(30)
        }
    );

    // Scrolling away and back does nothing.
    assert!(
        controller
            .handle(&PageEvent::Intersection { samples: scroll(0.0) })
            .is_empty()
    );
    assert!(
        controller
            .handle(&PageEvent::Intersection { samples: scroll(400.0) })
            .is_empty()
    );
    assert_eq!(
        controller.pending_reveals(),
        &[ElementId::new(31), ElementId::new(40)]
    );
}

#[test]
fn recorded_session_replays() {
    let registry = page();
    let config = PageConfig::default();
    let mut controller = PageController::new(&registry, &config);
    let mut trace = SessionTrace::new(&controller, &registry, config.trace_capacity);
    trace.record_start(&controller.start());

    let mut resolver = ids();
    let events = vec![
        PageEvent::MenuToggleClick,
        PageEvent::DocumentClick { inside_menu: false },
        PageEvent::PricingSwitchClick,
        controller.anchor_click(HERO_CTA, &mut resolver),
        PageEvent::FilterClick {
            control: ElementId::new(21),
        },
    ];
    for event in &events {
        let effects = controller.handle(event);
        trace.record(event, &effects);
    }

    let report = replay(&registry, &config, &trace.records()).expect("replay");
    assert!(report.ok());
    assert_eq!(report.events, events.len() as u64);
}
