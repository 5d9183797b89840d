//! A headless window hosting controls.
//!
//! The window owns a vertical stack of focusable elements, a focus chain,
//! a queue of pending input and a ratatui [`TestBackend`] surface. Nothing
//! happens when input is injected; [`Window::do_events`] drains the queue,
//! dispatches keys, then lays out and renders whatever was invalidated.

use crate::control::TextControl;
use crate::error::{ControlError, ControlResult};
use crate::render::{ButtonView, TextView};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Block;
use ratatui::Terminal;
use std::collections::VecDeque;

/// Identifies an element within its window.
pub type ElementId = usize;

/// Something the window can lay out and focus.
#[derive(Debug, Clone)]
pub enum Element {
    Text(TextControl),
    Button(String),
}

impl Element {
    fn is_focusable(&self) -> bool {
        match self {
            Element::Text(control) => control.is_enabled(),
            Element::Button(_) => true,
        }
    }
}

#[derive(Debug)]
struct Entry {
    element: Element,
    height: u16,
    area: Rect,
}

/// Headless window with a focus chain and a render surface.
pub struct Window {
    terminal: Terminal<TestBackend>,
    entries: Vec<Entry>,
    focus: Option<ElementId>,
    pending: VecDeque<Event>,
    dirty: bool,
    frames: usize,
}

impl Window {
    /// A window whose surface is `width` x `height` cells.
    pub fn new(width: u16, height: u16) -> ControlResult<Self> {
        let terminal = Terminal::new(TestBackend::new(width, height))?;
        Ok(Self {
            terminal,
            entries: Vec::new(),
            focus: None,
            pending: VecDeque::new(),
            dirty: true,
            frames: 0,
        })
    }

    /// Append a text control `height` rows tall (borders included).
    pub fn add_control(&mut self, control: TextControl, height: u16) -> ElementId {
        self.push(Element::Text(control), height)
    }

    /// Append a one-row button.
    pub fn add_button(&mut self, label: impl Into<String>) -> ElementId {
        self.push(Element::Button(label.into()), 1)
    }

    fn push(&mut self, element: Element, height: u16) -> ElementId {
        self.entries.push(Entry {
            element,
            height,
            area: Rect::default(),
        });
        self.dirty = true;
        self.entries.len() - 1
    }

    /// Remove every element and drop pending input.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.focus = None;
        self.pending.clear();
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn element(&self, id: ElementId) -> ControlResult<&Element> {
        self.entries
            .get(id)
            .map(|e| &e.element)
            .ok_or(ControlError::ElementNotFound(id))
    }

    pub fn control(&self, id: ElementId) -> ControlResult<&TextControl> {
        match self.element(id)? {
            Element::Text(control) => Ok(control),
            Element::Button(_) => Err(ControlError::InvalidOperation(format!(
                "element {} is not a text control",
                id
            ))),
        }
    }

    /// Mutable access to a control; invalidates the window.
    pub fn control_mut(&mut self, id: ElementId) -> ControlResult<&mut TextControl> {
        let entry = self.entries.get_mut(id).ok_or(ControlError::ElementNotFound(id))?;
        self.dirty = true;
        match &mut entry.element {
            Element::Text(control) => Ok(control),
            Element::Button(_) => Err(ControlError::InvalidOperation(format!(
                "element {} is not a text control",
                id
            ))),
        }
    }

    // ---- focus ----

    pub fn focused(&self) -> Option<ElementId> {
        self.focus
    }

    pub fn is_focused(&self, id: ElementId) -> bool {
        self.focus == Some(id)
    }

    pub fn focus(&mut self, id: ElementId) -> ControlResult<()> {
        if !self.element(id)?.is_focusable() {
            return Err(ControlError::InvalidOperation(format!(
                "element {} cannot take focus",
                id
            )));
        }
        self.set_focus(Some(id));
        Ok(())
    }

    fn set_focus(&mut self, focus: Option<ElementId>) {
        if self.focus != focus {
            tracing::debug!(from = ?self.focus, to = ?focus, "focus moved");
            self.focus = focus;
            self.dirty = true;
        }
    }

    /// Move focus to the next focusable element, wrapping around.
    pub fn focus_next(&mut self) {
        let next = self.cycle(true);
        self.set_focus(next);
    }

    /// Move focus to the previous focusable element, wrapping around.
    pub fn focus_previous(&mut self) {
        let previous = self.cycle(false);
        self.set_focus(previous);
    }

    fn cycle(&self, forward: bool) -> Option<ElementId> {
        let count = self.entries.len();
        if count == 0 {
            return None;
        }
        // From no focus, forward lands on the first element, backward on the last.
        let origin = self.focus.unwrap_or(if forward { count - 1 } else { 0 });
        (1..=count)
            .map(|i| {
                if forward {
                    (origin + i) % count
                } else {
                    (origin + count - i % count) % count
                }
            })
            .find(|&id| self.entries[id].element.is_focusable())
    }

    // ---- input ----

    /// Queue input for the next [`Window::do_events`].
    pub fn inject(&mut self, events: impl IntoIterator<Item = Event>) {
        self.pending.extend(events);
    }

    pub fn inject_key(&mut self, key: KeyEvent) {
        self.pending.push_back(Event::Key(key));
    }

    pub fn pending_input(&self) -> usize {
        self.pending.len()
    }

    /// Process all pending work: dispatch queued input, then lay out and
    /// render if anything was invalidated. Returns the number of events
    /// dispatched.
    pub fn do_events(&mut self) -> ControlResult<usize> {
        let mut dispatched = 0;
        while let Some(event) = self.pending.pop_front() {
            match event {
                Event::Key(key) => self.dispatch_key(key),
                Event::Resize(width, height) => {
                    self.terminal.backend_mut().resize(width, height);
                    self.terminal.resize(Rect::new(0, 0, width, height))?;
                    self.dirty = true;
                }
                _ => {}
            }
            dispatched += 1;
        }
        if self.dirty {
            self.render()?;
        }
        Ok(dispatched)
    }

    fn dispatch_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        self.dirty = true;

        if let Some(id) = self.focus {
            if let Some(Entry {
                element: Element::Text(control),
                ..
            }) = self.entries.get_mut(id)
            {
                if control.handle_key(&key) {
                    return;
                }
            }
        }

        let backwards = key.code == KeyCode::BackTab || key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Tab | KeyCode::BackTab if backwards => self.focus_previous(),
            KeyCode::Tab => self.focus_next(),
            _ => tracing::trace!(?key, "unhandled key"),
        }
    }

    // ---- layout and render ----

    fn layout(&mut self) {
        let surface = self.terminal.backend().buffer().area;
        let mut y = surface.y;
        for entry in &mut self.entries {
            let height = entry.height.min(surface.bottom().saturating_sub(y));
            entry.area = Rect::new(surface.x, y, surface.width, height);
            y += height;
        }
    }

    fn render(&mut self) -> ControlResult<()> {
        self.layout();
        let Self {
            terminal,
            entries,
            focus,
            ..
        } = self;
        terminal.draw(|frame| {
            for (id, entry) in entries.iter().enumerate() {
                let focused = *focus == Some(id);
                match &entry.element {
                    Element::Text(control) => frame.render_widget(
                        TextView::new(control).focused(focused).block(Block::bordered()),
                        entry.area,
                    ),
                    Element::Button(label) => {
                        frame.render_widget(ButtonView::new(label).focused(focused), entry.area)
                    }
                }
            }
        })?;
        self.frames += 1;
        self.dirty = false;
        Ok(())
    }

    /// Number of frames rendered so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Where `id` was laid out by the last render.
    pub fn element_area(&self, id: ElementId) -> ControlResult<Rect> {
        self.entries
            .get(id)
            .map(|e| e.area)
            .ok_or(ControlError::ElementNotFound(id))
    }

    /// The whole rendered surface.
    pub fn buffer(&self) -> &Buffer {
        self.terminal.backend().buffer()
    }

    /// Copy of the cells an element occupies, rendering first if needed.
    pub fn capture(&mut self, id: ElementId) -> ControlResult<Buffer> {
        if self.dirty {
            self.render()?;
        }
        let area = self.element_area(id)?;
        let surface = self.buffer();
        let mut captured = Buffer::empty(area);
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                if let (Some(src), Some(dst)) = (surface.cell((x, y)), captured.cell_mut((x, y))) {
                    *dst = src.clone();
                }
            }
        }
        Ok(captured)
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("entries", &self.entries)
            .field("focus", &self.focus)
            .field("pending", &self.pending.len())
            .field("frames", &self.frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::TextEditableType;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// button, text box, button
    fn sandwich(accepts_tab: bool) -> (Window, ElementId, ElementId, ElementId) {
        let mut window = Window::new(20, 8).unwrap();
        let first = window.add_button("One");
        let mut tb = TextEditableType::TextBox.create_instance();
        tb.set_accepts_tab(accepts_tab).unwrap();
        let text = window.add_control(tb, 3);
        let last = window.add_button("Two");
        (window, first, text, last)
    }

    #[test]
    fn test_tab_moves_focus_when_not_accepted() {
        let (mut window, first, text, last) = sandwich(false);
        window.focus(text).unwrap();
        window.inject_key(key(KeyCode::Tab));
        window.do_events().unwrap();
        assert!(window.is_focused(last));

        window.focus(text).unwrap();
        window.inject_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));
        window.do_events().unwrap();
        assert!(window.is_focused(first));
    }

    #[test]
    fn test_tab_stays_when_accepted() {
        let (mut window, _, text, _) = sandwich(true);
        window.focus(text).unwrap();
        window.inject_key(key(KeyCode::Tab));
        window.do_events().unwrap();
        assert!(window.is_focused(text));
        assert_eq!(window.control(text).unwrap().text(), "\t");
    }

    #[test]
    fn test_focus_wraps() {
        let (mut window, first, _, last) = sandwich(false);
        window.focus(last).unwrap();
        window.focus_next();
        assert!(window.is_focused(first));
        window.focus_previous();
        assert!(window.is_focused(last));
    }

    #[test]
    fn test_focus_from_nothing_with_two_elements() {
        let two_buttons = || {
            let mut window = Window::new(20, 4).unwrap();
            let first = window.add_button("First");
            let second = window.add_button("Second");
            (window, first, second)
        };

        let (mut window, _, second) = two_buttons();
        window.focus_previous();
        assert!(window.is_focused(second));

        let (mut window, first, second) = two_buttons();
        window.focus_next();
        assert!(window.is_focused(first));
        window.focus_previous();
        assert!(window.is_focused(second));
        window.focus_previous();
        assert!(window.is_focused(first));
    }

    #[test]
    fn test_disabled_control_skipped() {
        let (mut window, first, text, last) = sandwich(false);
        window.control_mut(text).unwrap().set_enabled(false);
        window.focus(first).unwrap();
        window.focus_next();
        assert!(window.is_focused(last));
        assert!(window.focus(text).is_err());
    }

    #[test]
    fn test_input_waits_for_do_events() {
        let (mut window, _, text, _) = sandwich(false);
        window.focus(text).unwrap();
        window.inject([Event::Key(key(KeyCode::Char('h'))), Event::Key(key(KeyCode::Char('i')))]);
        assert_eq!(window.control(text).unwrap().text(), "");
        assert_eq!(window.pending_input(), 2);

        assert_eq!(window.do_events().unwrap(), 2);
        assert_eq!(window.control(text).unwrap().text(), "hi");
        assert_eq!(window.pending_input(), 0);
    }

    #[test]
    fn test_layout_stacks_elements() {
        let (mut window, first, text, last) = sandwich(false);
        window.do_events().unwrap();
        assert_eq!(window.element_area(first).unwrap(), Rect::new(0, 0, 20, 1));
        assert_eq!(window.element_area(text).unwrap(), Rect::new(0, 1, 20, 3));
        assert_eq!(window.element_area(last).unwrap(), Rect::new(0, 4, 20, 1));
    }

    #[test]
    fn test_capture_renders_text() {
        let (mut window, _, text, _) = sandwich(false);
        window.control_mut(text).unwrap().set_text("hello");
        let captured = window.capture(text).unwrap();
        assert_eq!(captured.area, Rect::new(0, 1, 20, 3));
        let row: String = (1..6).map(|x| captured[(x, 2)].symbol().to_string()).collect();
        assert_eq!(row, "hello");
    }

    #[test]
    fn test_render_only_when_dirty() {
        let (mut window, _, _, _) = sandwich(false);
        window.do_events().unwrap();
        window.do_events().unwrap();
        assert_eq!(window.frames(), 1);
    }

    #[test]
    fn test_missing_element() {
        let (window, _, _, _) = sandwich(false);
        assert!(matches!(window.control(9), Err(ControlError::ElementNotFound(9))));
        assert!(matches!(window.control(0), Err(ControlError::InvalidOperation(_))));
    }
}
