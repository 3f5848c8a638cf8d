// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::cell::RefCell;
use std::rc::Rc;

/// How a component kind is wired into the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentCategory {
    Output,
    Input,
    Display,
    Special,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Led,
    Buzzer,
    PushButton,
    SevenSegment,
    ShiftRegister,
    Board,
    Unsupported,
}

impl ComponentKind {
    pub fn from_part_type(part_type: &str) -> Self {
        match part_type {
            "wokwi-led" => Self::Led,
            "wokwi-buzzer" => Self::Buzzer,
            "wokwi-pushbutton" => Self::PushButton,
            "wokwi-7segment" => Self::SevenSegment,
            "wokwi-74hc595" => Self::ShiftRegister,
            "wokwi-arduino-uno" => Self::Board,
            _ => Self::Unsupported,
        }
    }

    pub fn category(self) -> ComponentCategory {
        match self {
            Self::Led | Self::Buzzer => ComponentCategory::Output,
            Self::PushButton => ComponentCategory::Input,
            Self::SevenSegment => ComponentCategory::Display,
            Self::ShiftRegister | Self::Board => ComponentCategory::Special,
            Self::Unsupported => ComponentCategory::Unsupported,
        }
    }

    /// Component pins that carry the signal to or from the board, in
    /// preference order.
    pub fn signal_pins(self) -> &'static [&'static str] {
        match self {
            Self::Led => &["A"],
            Self::Buzzer => &["2", "1"],
            Self::PushButton => &["1.l", "2.r", "1", "2"],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Press,
    Release,
}

pub type ButtonListener = Box<dyn FnMut(ButtonEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

/// Visual side of a placed component, owned by the rendering layer.
///
/// Every method defaults to a no-op so an element only implements what its
/// kind supports.
pub trait Element: std::fmt::Debug {
    fn set_lit(&mut self, _lit: bool) {}
    fn set_signal(&mut self, _active: bool) {}
    fn set_digit(&mut self, _digit: Option<u8>) {}
    /// Returns `None` when the element cannot be pressed.
    fn add_button_listener(&mut self, _listener: ButtonListener) -> Option<HandlerId> {
        None
    }
    fn remove_button_listener(&mut self, _id: HandlerId) {}
}

pub type ElementHandle = Rc<RefCell<dyn Element>>;

#[derive(Debug, Clone)]
pub struct RenderedComponent {
    pub id: String,
    pub kind: ComponentKind,
    pub element: ElementHandle,
}

/// Rendered components in diagram order, looked up by id.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    components: Vec<RenderedComponent>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component; a second insert with the same id replaces the element
    /// in place.
    pub fn insert(&mut self, id: &str, kind: ComponentKind, element: ElementHandle) {
        let component = RenderedComponent {
            id: id.to_string(),
            kind,
            element,
        };
        match self.components.iter_mut().find(|c| c.id == id) {
            Some(slot) => *slot = component,
            None => self.components.push(component),
        }
    }

    pub fn get(&self, id: &str) -> Option<&RenderedComponent> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &RenderedComponent> {
        self.components.iter().filter(move |c| c.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Headless element that records the state a renderer would show and lets a
/// caller press it like a physical button.
#[derive(Default, serde::Serialize)]
pub struct VirtualElement {
    pub lit: bool,
    pub signal: bool,
    pub digit: Option<u8>,
    #[serde(skip)]
    listeners: Vec<(HandlerId, ButtonListener)>,
    #[serde(skip)]
    next_handler: u64,
}

impl std::fmt::Debug for VirtualElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualElement")
            .field("lit", &self.lit)
            .field("signal", &self.signal)
            .field("digit", &self.digit)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl VirtualElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn press(&mut self) {
        self.emit(ButtonEvent::Press);
    }

    pub fn release(&mut self) {
        self.emit(ButtonEvent::Release);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn emit(&mut self, event: ButtonEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

impl Element for VirtualElement {
    fn set_lit(&mut self, lit: bool) {
        self.lit = lit;
    }

    fn set_signal(&mut self, active: bool) {
        self.signal = active;
    }

    fn set_digit(&mut self, digit: Option<u8>) {
        self.digit = digit;
    }

    fn add_button_listener(&mut self, listener: ButtonListener) -> Option<HandlerId> {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.listeners.push((id, listener));
        Some(id)
    }

    fn remove_button_listener(&mut self, id: HandlerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }
}
