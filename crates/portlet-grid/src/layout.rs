//! Layout engine contract and the in-memory grid
//!
//! The visual grid (packing, drag physics, animation) is an external
//! collaborator. This module fixes the narrow contract the reconciler needs
//! from it, and ships [`GridLayout`], an in-memory engine that keeps item
//! order and state without any geometry. Front ends that own a real grid
//! mirror its item list behind the same trait.
//!
//! Widget state lives in [`WidgetInstance`] fields. A rendered element is a
//! projection of an instance and is never read back.

use serde::{Deserialize, Serialize};

use crate::types::WidgetDefinition;

/// A live grid item backed by a registered definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetInstance {
    /// Id of the backing definition
    pub id: String,
    /// Whether the item is placed and visible
    pub active: bool,
    /// Width in grid units
    pub width: u32,
    /// Height in grid units
    pub height: u32,
    /// Color name
    pub color: String,
}

impl WidgetInstance {
    /// An inactive instance styled with the definition's defaults.
    pub fn inactive(definition: &WidgetDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            active: false,
            width: definition.default_width,
            height: definition.default_height,
            color: definition.default_color.clone(),
        }
    }
}

/// Notifications raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutEvent {
    /// The user picked up an item
    DragStart {
        /// Dragged item
        id: String,
    },
    /// The user dropped an item
    DragEnd {
        /// Dragged item
        id: String,
    },
    /// A layout pass settled after add, remove, move, resize or restyle
    LayoutEnd,
}

/// Contract of the visual grid as seen by the reconciler.
///
/// Items are addressed by widget id. Methods that name ids the engine does
/// not hold ignore those ids.
pub trait LayoutEngine {
    /// Appends an item at the end of the grid.
    fn add_item(&mut self, instance: WidgetInstance);

    /// Removes an item entirely.
    fn remove_item(&mut self, id: &str) -> Option<WidgetInstance>;

    /// Marks items active and visible.
    fn show_items(&mut self, ids: &[String]);

    /// Marks items inactive. `instant` skips any hide animation.
    fn hide_items(&mut self, ids: &[String], instant: bool);

    /// Reorders the grid: the named items first, in the given order, then
    /// every other item in its existing relative order.
    fn sort_items(&mut self, order: &[String]);

    /// Moves an item to `index` among the active items (a drag and drop).
    /// Returns `false` if the item is unknown.
    fn move_item(&mut self, id: &str, index: usize) -> bool;

    /// Updates geometry and color of an item.
    fn set_style(&mut self, id: &str, width: u32, height: u32, color: &str);

    /// All items in grid order, active or not.
    fn items(&self) -> &[WidgetInstance];

    /// Takes the events raised since the last call.
    fn drain_events(&mut self) -> Vec<LayoutEvent>;

    /// Looks up one item.
    fn item(&self, id: &str) -> Option<&WidgetInstance> {
        self.items().iter().find(|i| i.id == id)
    }

    /// Active items in grid order.
    fn visible(&self) -> Vec<&WidgetInstance> {
        self.items().iter().filter(|i| i.active).collect()
    }
}

/// In-memory [`LayoutEngine`].
///
/// Every call that changes state queues one `LayoutEnd`, as a real grid
/// settles once per operation.
#[derive(Debug, Clone, Default)]
pub struct GridLayout {
    items: Vec<WidgetInstance>,
    events: Vec<LayoutEvent>,
}

impl GridLayout {
    /// Creates an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    fn settled(&mut self) {
        self.events.push(LayoutEvent::LayoutEnd);
    }

    fn set_active(&mut self, ids: &[String], active: bool) -> bool {
        let mut changed = false;
        for item in self.items.iter_mut() {
            if item.active != active && ids.contains(&item.id) {
                item.active = active;
                changed = true;
            }
        }
        changed
    }
}

impl LayoutEngine for GridLayout {
    fn add_item(&mut self, instance: WidgetInstance) {
        let active = instance.active;
        self.items.push(instance);
        if active {
            self.settled();
        }
    }

    fn remove_item(&mut self, id: &str) -> Option<WidgetInstance> {
        let index = self.position(id)?;
        let removed = self.items.remove(index);
        self.settled();
        Some(removed)
    }

    fn show_items(&mut self, ids: &[String]) {
        if self.set_active(ids, true) {
            self.settled();
        }
    }

    fn hide_items(&mut self, ids: &[String], _instant: bool) {
        if self.set_active(ids, false) {
            self.settled();
        }
    }

    fn sort_items(&mut self, order: &[String]) {
        let mut rest = std::mem::take(&mut self.items);
        let mut sorted = Vec::with_capacity(rest.len());

        for id in order {
            if let Some(index) = rest.iter().position(|i| &i.id == id) {
                sorted.push(rest.remove(index));
            }
        }
        sorted.append(&mut rest);

        self.items = sorted;
        self.settled();
    }

    fn move_item(&mut self, id: &str, index: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        self.events.push(LayoutEvent::DragStart { id: id.to_string() });

        let item = self.items.remove(from);
        let active_slots: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.active)
            .map(|(pos, _)| pos)
            .collect();

        // Drop before the index-th active item, or right after the last one.
        let to = match active_slots.get(index) {
            Some(&slot) => slot,
            None => active_slots.last().map_or(0, |&slot| slot + 1),
        };
        self.items.insert(to, item);

        self.events.push(LayoutEvent::DragEnd { id: id.to_string() });
        self.settled();
        true
    }

    fn set_style(&mut self, id: &str, width: u32, height: u32, color: &str) {
        let Some(index) = self.position(id) else {
            return;
        };
        let item = &mut self.items[index];
        if item.width == width && item.height == height && item.color == color {
            return;
        }
        item.width = width;
        item.height = height;
        item.color = color.to_string();
        self.settled();
    }

    fn items(&self) -> &[WidgetInstance] {
        &self.items
    }

    fn drain_events(&mut self) -> Vec<LayoutEvent> {
        std::mem::take(&mut self.events)
    }
}
