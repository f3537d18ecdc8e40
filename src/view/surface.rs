//! Drawing surface seam
//!
//! The views never draw pixels. They create primitives on a
//! [`DrawingSurface`] and keep the returned handles to move, recolour and
//! remove them later. [`RecordingSurface`] keeps every primitive in memory so
//! a tick can be inspected.

use crate::config::Rgba;
use std::collections::BTreeMap;
use tracing::warn;

/// Opaque reference to an item on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemHandle(u64);

/// Point of a text item that sits at its (x, y) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    North,
    South,
    East,
    West,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
    #[default]
    Center,
}

pub trait DrawingSurface {
    /// Filled rectangle with its top-left corner at (x, y).
    fn create_point_marker(&mut self, x: f64, y: f64, w: f64, h: f64, colour: Rgba) -> ItemHandle;
    fn create_text(&mut self, x: f64, y: f64, text: &str, anchor: Anchor, colour: Rgba) -> ItemHandle;
    fn create_polyline(&mut self, points: &[(f64, f64)], stroke: Rgba, fill: Rgba) -> ItemHandle;

    fn set_position(&mut self, item: ItemHandle, x: f64, y: f64);
    fn set_anchor(&mut self, item: ItemHandle, anchor: Anchor);
    fn set_text(&mut self, item: ItemHandle, text: &str);
    fn set_tooltip(&mut self, item: ItemHandle, text: &str);
    fn set_points(&mut self, item: ItemHandle, points: &[(f64, f64)]);
    /// Stroke colour; markers and text take it as fill too, polylines keep their fill.
    fn set_color(&mut self, item: ItemHandle, colour: Rgba);
    fn set_fill(&mut self, item: ItemHandle, colour: Rgba);

    fn remove(&mut self, item: ItemHandle);
    /// Move `item` just above `other`, or to the top when `other` is `None`.
    fn raise_above(&mut self, item: ItemHandle, other: Option<ItemHandle>);
    /// Move `item` just below `other`.
    fn lower_below(&mut self, item: ItemHandle, other: ItemHandle);

    fn position(&self, item: ItemHandle) -> Option<(f64, f64)>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Marker { x: f64, y: f64, w: f64, h: f64 },
    Text { x: f64, y: f64, text: String, anchor: Anchor },
    Polyline { points: Vec<(f64, f64)> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub shape: Shape,
    pub stroke: Rgba,
    pub fill: Rgba,
    pub tooltip: Option<String>,
}

impl Item {
    pub fn text(&self) -> Option<&str> {
        match &self.shape {
            Shape::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn anchor(&self) -> Option<Anchor> {
        match self.shape {
            Shape::Text { anchor, .. } => Some(anchor),
            _ => None,
        }
    }

    pub fn points(&self) -> Option<&[(f64, f64)]> {
        match &self.shape {
            Shape::Polyline { points } => Some(points),
            _ => None,
        }
    }
}

/// In-memory surface: items by handle plus a bottom-to-top stacking order.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    items: BTreeMap<ItemHandle, Item>,
    z_order: Vec<ItemHandle>,
    next_id: u64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, item: ItemHandle) -> Option<&Item> {
        self.items.get(&item)
    }

    pub fn contains(&self, item: ItemHandle) -> bool {
        self.items.contains_key(&item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Stacking index, 0 is the bottom.
    pub fn z_index(&self, item: ItemHandle) -> Option<usize> {
        self.z_order.iter().position(|h| *h == item)
    }

    pub fn polylines(&self) -> impl Iterator<Item = &Item> {
        self.items
            .values()
            .filter(|item| matches!(item.shape, Shape::Polyline { .. }))
    }

    fn insert(&mut self, shape: Shape, stroke: Rgba, fill: Rgba) -> ItemHandle {
        self.next_id += 1;
        let handle = ItemHandle(self.next_id);
        self.items.insert(
            handle,
            Item {
                shape,
                stroke,
                fill,
                tooltip: None,
            },
        );
        self.z_order.push(handle);
        handle
    }

    fn item_mut(&mut self, item: ItemHandle, op: &str) -> Option<&mut Item> {
        let found = self.items.get_mut(&item);
        if found.is_none() {
            warn!("{}: no item {:?} on surface", op, item);
        }
        found
    }

    fn unstack(&mut self, item: ItemHandle, op: &str) -> bool {
        match self.z_index(item) {
            Some(idx) => {
                self.z_order.remove(idx);
                true
            }
            None => {
                warn!("{}: no item {:?} on surface", op, item);
                false
            }
        }
    }
}

impl DrawingSurface for RecordingSurface {
    fn create_point_marker(&mut self, x: f64, y: f64, w: f64, h: f64, colour: Rgba) -> ItemHandle {
        self.insert(Shape::Marker { x, y, w, h }, colour, colour)
    }

    fn create_text(&mut self, x: f64, y: f64, text: &str, anchor: Anchor, colour: Rgba) -> ItemHandle {
        let shape = Shape::Text {
            x,
            y,
            text: text.to_string(),
            anchor,
        };
        self.insert(shape, colour, colour)
    }

    fn create_polyline(&mut self, points: &[(f64, f64)], stroke: Rgba, fill: Rgba) -> ItemHandle {
        let shape = Shape::Polyline {
            points: points.to_vec(),
        };
        self.insert(shape, stroke, fill)
    }

    fn set_position(&mut self, item: ItemHandle, nx: f64, ny: f64) {
        let Some(it) = self.item_mut(item, "set_position") else {
            return;
        };
        match &mut it.shape {
            Shape::Marker { x, y, .. } | Shape::Text { x, y, .. } => {
                *x = nx;
                *y = ny;
            }
            Shape::Polyline { .. } => warn!("set_position: {:?} is a polyline", item),
        }
    }

    fn set_anchor(&mut self, item: ItemHandle, new: Anchor) {
        if let Some(it) = self.item_mut(item, "set_anchor") {
            if let Shape::Text { anchor, .. } = &mut it.shape {
                *anchor = new;
            }
        }
    }

    fn set_text(&mut self, item: ItemHandle, new: &str) {
        if let Some(it) = self.item_mut(item, "set_text") {
            if let Shape::Text { text, .. } = &mut it.shape {
                new.clone_into(text);
            }
        }
    }

    fn set_tooltip(&mut self, item: ItemHandle, text: &str) {
        if let Some(it) = self.item_mut(item, "set_tooltip") {
            it.tooltip = Some(text.to_string());
        }
    }

    fn set_points(&mut self, item: ItemHandle, new: &[(f64, f64)]) {
        if let Some(it) = self.item_mut(item, "set_points") {
            match &mut it.shape {
                Shape::Polyline { points } => {
                    points.clear();
                    points.extend_from_slice(new);
                }
                _ => warn!("set_points: {:?} is not a polyline", item),
            }
        }
    }

    fn set_color(&mut self, item: ItemHandle, colour: Rgba) {
        if let Some(it) = self.item_mut(item, "set_color") {
            it.stroke = colour;
            if !matches!(it.shape, Shape::Polyline { .. }) {
                it.fill = colour;
            }
        }
    }

    fn set_fill(&mut self, item: ItemHandle, colour: Rgba) {
        if let Some(it) = self.item_mut(item, "set_fill") {
            it.fill = colour;
        }
    }

    fn remove(&mut self, item: ItemHandle) {
        if self.items.remove(&item).is_none() {
            warn!("remove: no item {:?} on surface", item);
            return;
        }
        self.z_order.retain(|h| *h != item);
    }

    fn raise_above(&mut self, item: ItemHandle, other: Option<ItemHandle>) {
        if !self.unstack(item, "raise_above") {
            return;
        }
        let idx = match other.and_then(|o| self.z_index(o)) {
            Some(o) => o + 1,
            None => self.z_order.len(),
        };
        self.z_order.insert(idx, item);
    }

    fn lower_below(&mut self, item: ItemHandle, other: ItemHandle) {
        if !self.unstack(item, "lower_below") {
            return;
        }
        let idx = self.z_index(other).unwrap_or(0);
        self.z_order.insert(idx, item);
    }

    fn position(&self, item: ItemHandle) -> Option<(f64, f64)> {
        match &self.items.get(&item)?.shape {
            Shape::Marker { x, y, .. } | Shape::Text { x, y, .. } => Some((*x, *y)),
            Shape::Polyline { points } => points.first().copied(),
        }
    }
}
