//! InputGuard: blocks context menus and inspection shortcuts.
//!
//! Each matching event gets `PreventDefault` and raises exactly one violation,
//! synchronously, inside the listener call.

use std::sync::Arc;

use crate::capabilities::{
    Clock, EventDisposition, EventListener, EventSource, KeyChord, PageContext, PageEvent,
    Subscription,
};
use crate::sentinel::sink::ViolationSink;
use crate::violation::{Violation, ViolationKind};

/// Which rule a blocked chord matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenShortcut {
    /// F12 or Ctrl/Cmd+Shift+I/J/C.
    DeveloperSurface,
    /// Ctrl/Cmd+U.
    ViewSource,
    /// Ctrl/Cmd+S.
    SavePage,
    /// Ctrl/Cmd+A on a guarded route.
    SelectAll,
}

/// Classify a chord. `guarded_route` enables the select-all rule.
pub fn classify_chord(chord: &KeyChord, guarded_route: bool) -> Option<ForbiddenShortcut> {
    let key = chord.key.to_ascii_lowercase();

    if key == "f12" {
        return Some(ForbiddenShortcut::DeveloperSurface);
    }
    if !chord.command() {
        return None;
    }
    if chord.shift && matches!(key.as_str(), "i" | "j" | "c") {
        return Some(ForbiddenShortcut::DeveloperSurface);
    }
    // Cmd+Option+I/J/C is the macOS spelling of the developer chords.
    if chord.meta && chord.alt && matches!(key.as_str(), "i" | "j" | "c") {
        return Some(ForbiddenShortcut::DeveloperSurface);
    }
    if chord.shift || chord.alt {
        return None;
    }
    match key.as_str() {
        "u" => Some(ForbiddenShortcut::ViewSource),
        "s" => Some(ForbiddenShortcut::SavePage),
        "a" if guarded_route => Some(ForbiddenShortcut::SelectAll),
        _ => None,
    }
}

pub struct InputGuard {
    sink: Arc<ViolationSink>,
    page: Arc<dyn PageContext>,
    clock: Arc<dyn Clock>,
    route_markers: Vec<String>,
}

impl InputGuard {
    pub fn new(
        sink: Arc<ViolationSink>,
        page: Arc<dyn PageContext>,
        clock: Arc<dyn Clock>,
        route_markers: Vec<String>,
    ) -> Self {
        Self {
            sink,
            page,
            clock,
            route_markers,
        }
    }

    fn on_guarded_route(&self) -> bool {
        let path = self.page.current_path();
        self.route_markers.iter().any(|m| path.contains(m.as_str()))
    }

    /// Decide one event. Records at most one violation per call.
    pub fn handle(&self, event: &PageEvent) -> EventDisposition {
        let kind = match event {
            PageEvent::ContextMenu => ViolationKind::ContextMenu,
            PageEvent::KeyDown(chord) => match classify_chord(chord, self.on_guarded_route()) {
                Some(rule) => {
                    tracing::debug!("[SENTINEL] Blocked {:?} ({:?})", chord, rule);
                    ViolationKind::ForbiddenShortcut
                }
                None => return EventDisposition::Continue,
            },
        };

        self.sink
            .record(Violation::observe(kind, self.clock.as_ref(), self.page.as_ref()));
        EventDisposition::PreventDefault
    }

    /// Register with the page's event source. Dropping the subscription removes the listener.
    pub fn attach(self: Arc<Self>, events: &dyn EventSource) -> Subscription {
        let listener: EventListener = Arc::new(move |event: &PageEvent| self.handle(event));
        tracing::info!("[SENTINEL] InputGuard attached");
        events.subscribe(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn developer_chords_are_forbidden_everywhere() {
        for chord in [
            KeyChord::key("F12"),
            KeyChord::ctrl_shift("I"),
            KeyChord::ctrl_shift("j"),
            KeyChord::ctrl_shift("C"),
            KeyChord {
                key: "i".into(),
                meta: true,
                alt: true,
                ..Default::default()
            },
        ] {
            assert_eq!(
                classify_chord(&chord, false),
                Some(ForbiddenShortcut::DeveloperSurface),
                "{:?}",
                chord
            );
        }
    }

    #[test]
    fn view_source_and_save_page() {
        assert_eq!(classify_chord(&KeyChord::ctrl("u"), false), Some(ForbiddenShortcut::ViewSource));
        assert_eq!(classify_chord(&KeyChord::meta("U"), false), Some(ForbiddenShortcut::ViewSource));
        assert_eq!(classify_chord(&KeyChord::ctrl("s"), false), Some(ForbiddenShortcut::SavePage));
    }

    #[test]
    fn select_all_only_on_guarded_routes() {
        assert_eq!(classify_chord(&KeyChord::ctrl("a"), false), None);
        assert_eq!(classify_chord(&KeyChord::ctrl("a"), true), Some(ForbiddenShortcut::SelectAll));
    }

    #[test]
    fn ordinary_keys_pass() {
        assert_eq!(classify_chord(&KeyChord::key("u"), true), None);
        assert_eq!(classify_chord(&KeyChord::ctrl("c"), true), None);
        assert_eq!(classify_chord(&KeyChord::ctrl("v"), true), None);
        assert_eq!(classify_chord(&KeyChord::key("Enter"), true), None);
    }
}
