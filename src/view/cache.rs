//! Per-satellite drawing objects
//!
//! Each view keeps one object per plotted satellite, keyed by catalogue
//! number. The cache owns the objects; destroying one removes every item it
//! put on the surface.

use crate::config::Rgba;
use crate::view::surface::DrawingSurface;
use std::collections::BTreeMap;
use std::collections::btree_map;

/// What a refresh does with a satellite's object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Create,
    Update,
    Destroy,
    Ignore,
}

impl Transition {
    /// `tracked`: the cache holds an object. `wanted`: the satellite should
    /// be drawn this tick.
    pub fn next(tracked: bool, wanted: bool) -> Self {
        match (tracked, wanted) {
            (false, true) => Transition::Create,
            (true, true) => Transition::Update,
            (true, false) => Transition::Destroy,
            (false, false) => Transition::Ignore,
        }
    }
}

pub trait SatelliteDrawable {
    fn is_selected(&self) -> bool;
    /// Mark the object and recolour its items.
    fn set_selected(&mut self, selected: bool, surface: &mut dyn DrawingSurface, colour: Rgba);
    /// Remove every item from the surface.
    fn destroy(self, surface: &mut dyn DrawingSurface);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionColours {
    pub default: Rgba,
    pub selected: Rgba,
}

#[derive(Debug)]
pub struct ObjectCache<T> {
    objects: BTreeMap<u32, T>,
}

impl<T> Default for ObjectCache<T> {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }
}

impl<T: SatelliteDrawable> ObjectCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object previously stored for `catnum`, if any.
    pub fn insert(&mut self, catnum: u32, obj: T) -> Option<T> {
        self.objects.insert(catnum, obj)
    }

    pub fn get(&self, catnum: u32) -> Option<&T> {
        self.objects.get(&catnum)
    }

    pub fn get_mut(&mut self, catnum: u32) -> Option<&mut T> {
        self.objects.get_mut(&catnum)
    }

    pub fn contains(&self, catnum: u32) -> bool {
        self.objects.contains_key(&catnum)
    }

    pub fn remove(&mut self, catnum: u32) -> Option<T> {
        self.objects.remove(&catnum)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u32, T> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, u32, T> {
        self.objects.iter_mut()
    }

    pub fn catnums(&self) -> Vec<u32> {
        self.objects.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Make `catnum` the only selected object. Returns false when there is
    /// no such object; the current selection is kept in that case.
    pub fn select(&mut self, catnum: u32, surface: &mut dyn DrawingSurface, colours: SelectionColours) -> bool {
        if !self.contains(catnum) {
            return false;
        }
        for (cat, obj) in self.objects.iter_mut() {
            if *cat != catnum && obj.is_selected() {
                obj.set_selected(false, surface, colours.default);
            }
        }
        if let Some(obj) = self.objects.get_mut(&catnum) {
            obj.set_selected(true, surface, colours.selected);
        }
        true
    }

    pub fn clear_selection(&mut self, surface: &mut dyn DrawingSurface, colour: Rgba) {
        for obj in self.objects.values_mut().filter(|o| o.is_selected()) {
            obj.set_selected(false, surface, colour);
        }
    }

    pub fn selected(&self) -> Option<u32> {
        self.objects
            .iter()
            .find(|(_, obj)| obj.is_selected())
            .map(|(cat, _)| *cat)
    }

    /// Destroy every object.
    pub fn clear(&mut self, surface: &mut dyn DrawingSurface) {
        for (_, obj) in std::mem::take(&mut self.objects) {
            obj.destroy(surface);
        }
    }
}
