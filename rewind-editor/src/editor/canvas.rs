// Layered canvas document edited through the undo/redo session.
// Layers form a circular list: the last layer points back to the first one.

use std::rc::Rc;

use rewind::{trackable, SameValue, Tracked, TrackedMap, TrackedValue, Tracker};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const RED: Color = Color([255, 0, 0, 255]);
    pub const BLUE: Color = Color([0, 0, 255, 255]);
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);
}

impl SameValue for Color {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl TrackedValue for Color {}

pub struct Layer {
    tracker: Tracker,
    pub name: Tracked<String>,
    pub opacity: Tracked<f32>,
    pub visible: Tracked<bool>,
    pub pixels: Tracked<Vec<Color>>,
    pub next: Tracked<Option<Rc<Layer>>>,
}

trackable!(Layer => tracker { name, opacity, visible, pixels, next });

impl Layer {
    fn new(name: &str, pixel_count: usize) -> Self {
        Self {
            tracker: Tracker::new(),
            name: Tracked::new(name.to_owned()),
            opacity: Tracked::new(1.0),
            visible: Tracked::new(true),
            pixels: Tracked::new(vec![Color::TRANSPARENT; pixel_count]),
            next: Tracked::new(None),
        }
    }

    pub fn painted_pixels(&self) -> usize {
        self.pixels
            .borrow()
            .iter()
            .filter(|c| **c != Color::TRANSPARENT)
            .count()
    }
}

pub struct Canvas {
    tracker: Tracker,
    width: u32,
    height: u32,
    pub title: Tracked<String>,
    pub background: Tracked<Color>,
    pub first_layer: Tracked<Option<Rc<Layer>>>,
    pub tags: TrackedMap<String, String>,
}

trackable!(Canvas => tracker { title, background, first_layer, tags });

impl Canvas {
    pub fn new(title: &str, width: u32, height: u32, background: Color) -> Self {
        info!(
            "Creating canvas '{}' of size {}x{} with background {:?}",
            title, width, height, background
        );
        Self {
            tracker: Tracker::new(),
            width,
            height,
            title: Tracked::new(title.to_owned()),
            background: Tracked::new(background),
            first_layer: Tracked::new(None),
            tags: TrackedMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn pixel_count(&self) -> usize {
        match (self.width as usize).checked_mul(self.height as usize) {
            Some(count) => count,
            None => {
                error!(
                    width = self.width,
                    height = self.height,
                    "canvas too large, layers left empty"
                );
                0
            }
        }
    }

    /// Layers in stacking order, following the ring once.
    pub fn layers(&self) -> Vec<Rc<Layer>> {
        let mut layers = Vec::new();
        let Some(first) = self.first_layer.get() else {
            return layers;
        };
        let mut cursor = first.clone();
        loop {
            let next = cursor.next.get();
            layers.push(cursor);
            match next {
                Some(layer) if !Rc::ptr_eq(&layer, &first) => cursor = layer,
                _ => break,
            }
        }
        layers
    }

    pub fn layer(&self, name: &str) -> Option<Rc<Layer>> {
        self.layers().into_iter().find(|l| *l.name.borrow() == name)
    }

    /// Append a layer on top and close the ring.
    pub fn add_layer(&self, name: &str) -> Rc<Layer> {
        let layer = Rc::new(Layer::new(name, self.pixel_count()));
        let layers = self.layers();
        match (layers.first(), layers.last()) {
            (Some(first), Some(last)) => {
                last.next.set(Some(layer.clone()));
                layer.next.set(Some(first.clone()));
            }
            _ => {
                layer.next.set(Some(layer.clone()));
                self.first_layer.set(Some(layer.clone()));
            }
        }
        debug!(layer = name, count = layers.len() + 1, "layer added");
        layer
    }

    /// Unlink a layer from the ring. Returns false if it is not part of it.
    pub fn remove_layer(&self, name: &str) -> bool {
        let layers = self.layers();
        let Some(pos) = layers.iter().position(|l| *l.name.borrow() == name) else {
            warn!("Attempted to remove unknown layer '{}'", name);
            return false;
        };
        if layers.len() == 1 {
            self.first_layer.set(None);
        } else {
            let prev = &layers[(pos + layers.len() - 1) % layers.len()];
            let next = &layers[(pos + 1) % layers.len()];
            prev.next.set(Some(next.clone()));
            if pos == 0 {
                self.first_layer.set(Some(next.clone()));
            }
        }
        layers[pos].next.set(None);
        debug!(layer = name, "layer removed");
        true
    }

    fn is_valid_coordinate(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    fn coord_to_index(&self, x: u32, y: u32) -> Option<usize> {
        (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)
    }

    pub fn get_pixel(&self, layer: &Layer, x: u32, y: u32) -> Option<Color> {
        if !self.is_valid_coordinate(x, y) {
            warn!("Requested pixel at invalid coordinates ({}, {})", x, y);
            return None;
        }
        let index = self.coord_to_index(x, y)?;
        layer.pixels.borrow().get(index).copied()
    }

    pub fn set_pixel(&self, layer: &Layer, x: u32, y: u32, color: Color) -> bool {
        if !self.is_valid_coordinate(x, y) {
            trace!("Skipping pixel outside canvas ({}, {})", x, y);
            return false;
        }
        let Some(index) = self.coord_to_index(x, y) else {
            return false;
        };
        let mut written = false;
        layer.pixels.update(|pixels| {
            if let Some(pixel) = pixels.get_mut(index) {
                *pixel = color;
                written = true;
            }
        });
        written
    }

    /// Topmost visible, non-transparent color at (x, y), or the background.
    pub fn composite(&self, x: u32, y: u32) -> Option<Color> {
        if !self.is_valid_coordinate(x, y) {
            return None;
        }
        let top = self
            .layers()
            .into_iter()
            .rev()
            .filter(|l| l.visible.get() && l.opacity.get() > 0.0)
            .filter_map(|l| self.get_pixel(&l, x, y))
            .find(|c| *c != Color::TRANSPARENT);
        Some(top.unwrap_or_else(|| self.background.get()))
    }
}
