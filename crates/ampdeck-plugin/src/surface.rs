//! Registered host surfaces and their ephemeral per-surface state.
//!
//! Everything a surface owns (overlay, marquee, hold, memoised layout and
//! last image) lives in one [`Surface`] so that removal drops it all at once.

use std::collections::HashMap;

use ampdeck_proto::protocol::SurfaceKind;
use ampdeck_proto::settings::SurfaceSettings;

use crate::input::HoldState;
use crate::render::strip::{Overlay, ScrollState};

#[derive(Debug)]
pub struct Surface {
    pub kind: SurfaceKind,
    pub settings: SurfaceSettings,
    pub overlay: Option<Overlay>,
    pub scroll: Option<ScrollState>,
    pub hold: Option<HoldState>,
    /// Descriptor of the layout last sent to this strip.
    pub layout_key: Option<String>,
    /// Data URL last sent to this key.
    pub last_image: Option<String>,
}

impl Surface {
    pub fn new(kind: SurfaceKind, settings: SurfaceSettings) -> Self {
        Self {
            kind,
            settings,
            overlay: None,
            scroll: None,
            hold: None,
            layout_key: None,
            last_image: None,
        }
    }

    /// Forget what the host is showing so the next render resends it.
    pub fn invalidate(&mut self) {
        self.layout_key = None;
        self.last_image = None;
    }

    /// True when `url` differs from what the host already shows; records it.
    pub fn image_changed(&mut self, url: &str) -> bool {
        if self.last_image.as_deref() == Some(url) {
            return false;
        }
        self.last_image = Some(url.to_string());
        true
    }

    /// True when the layout for `key` still has to be sent; records it.
    pub fn layout_changed(&mut self, key: &str) -> bool {
        if self.layout_key.as_deref() == Some(key) {
            return false;
        }
        self.layout_key = Some(key.to_string());
        true
    }
}

/// Surfaces keyed by host context id.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: HashMap<String, Surface>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a surface.  Returns true when this was the
    /// first one.
    pub fn insert(&mut self, context: &str, surface: Surface) -> bool {
        let was_empty = self.surfaces.is_empty();
        if let Some(old) = self.surfaces.insert(context.to_string(), surface) {
            if let Some(hold) = old.hold {
                hold.cancel();
            }
        }
        was_empty
    }

    /// Remove a surface and everything it owns.  Returns true when none are
    /// left.
    pub fn remove(&mut self, context: &str) -> bool {
        if let Some(surface) = self.surfaces.remove(context) {
            if let Some(hold) = surface.hold {
                hold.cancel();
            }
        }
        self.surfaces.is_empty()
    }

    pub fn get(&self, context: &str) -> Option<&Surface> {
        self.surfaces.get(context)
    }

    pub fn get_mut(&mut self, context: &str) -> Option<&mut Surface> {
        self.surfaces.get_mut(context)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Surface)> {
        self.surfaces.iter_mut()
    }
}
