//! Data layers of the RDNA container and the mask used to select them.
//!
//! A mask filters both reads and writes: sections outside the mask are
//! skipped by their recorded byte length and never parsed. `BlendShapes`
//! is special: it has a mask bit but no section of its own — its payload
//! lives in length-prefixed sub-blocks inside the Behavior and Geometry
//! sections.

use std::fmt;
use std::str::FromStr;

/// A named, independently (de)serializable part of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Rig identity: name, archetype, LOD count, free-form metadata.
    Descriptor,
    /// Name tables and hierarchy: joints, meshes, blend-shape channels.
    Definition,
    /// Evaluation data: control mapping and the joint matrix.
    Behavior,
    /// Per-mesh vertex data.
    Geometry,
    /// Blend-shape channels and targets (the expensive sub-sections of
    /// Behavior and Geometry).
    BlendShapes,
}

impl Layer {
    /// All layers, in canonical container order.
    pub const ALL_LAYERS: [Layer; 5] = [
        Layer::Descriptor,
        Layer::Definition,
        Layer::Behavior,
        Layer::Geometry,
        Layer::BlendShapes,
    ];

    /// Bit used by [`LayerMask`].
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            Layer::Descriptor => 1 << 0,
            Layer::Definition => 1 << 1,
            Layer::Behavior => 1 << 2,
            Layer::Geometry => 1 << 3,
            Layer::BlendShapes => 1 << 4,
        }
    }

    /// Table-of-contents id for section layers.
    ///
    /// `BlendShapes` has no section of its own, so it has no id.
    #[inline]
    pub const fn section_id(self) -> Option<u32> {
        match self {
            Layer::Descriptor => Some(0),
            Layer::Definition => Some(1),
            Layer::Behavior => Some(2),
            Layer::Geometry => Some(3),
            Layer::BlendShapes => None,
        }
    }

    /// Inverse of [`Layer::section_id`]; `None` for unknown ids.
    #[inline]
    pub const fn from_section_id(id: u32) -> Option<Layer> {
        match id {
            0 => Some(Layer::Descriptor),
            1 => Some(Layer::Definition),
            2 => Some(Layer::Behavior),
            3 => Some(Layer::Geometry),
            _ => None,
        }
    }

    /// Key used for this layer in the JSON output.
    pub const fn json_key(self) -> &'static str {
        match self {
            Layer::Descriptor => "descriptor",
            Layer::Definition => "definition",
            Layer::Behavior => "behavior",
            Layer::Geometry => "geometry",
            Layer::BlendShapes => "blend_shapes",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Descriptor => "Descriptor",
            Layer::Definition => "Definition",
            Layer::Behavior => "Behavior",
            Layer::Geometry => "Geometry",
            Layer::BlendShapes => "BlendShapes",
        };
        f.write_str(name)
    }
}

/// A set of [`Layer`]s. Pure value type, no I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(u8);

impl LayerMask {
    /// Every layer.
    pub const ALL: LayerMask = LayerMask(
        Layer::Descriptor.bit()
            | Layer::Definition.bit()
            | Layer::Behavior.bit()
            | Layer::Geometry.bit()
            | Layer::BlendShapes.bit(),
    );

    /// Every layer except the expensive blend-shape sub-sections.
    ///
    /// Defined by set difference; future exclusions follow the same
    /// pattern rather than growing ad hoc flags.
    pub const ALL_EXCEPT_BLEND_SHAPES: LayerMask =
        Self::ALL.difference(LayerMask::single(Layer::BlendShapes));

    /// The empty mask. A read with it succeeds and populates nothing.
    #[inline]
    pub const fn empty() -> LayerMask {
        LayerMask(0)
    }

    /// Mask containing exactly one layer.
    #[inline]
    pub const fn single(layer: Layer) -> LayerMask {
        LayerMask(layer.bit())
    }

    #[inline]
    pub const fn contains(self, layer: Layer) -> bool {
        self.0 & layer.bit() != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn union(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }

    #[inline]
    pub const fn difference(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 & !other.0)
    }

    #[inline]
    pub const fn intersection(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 & other.0)
    }

    #[inline]
    pub fn insert(&mut self, layer: Layer) {
        self.0 |= layer.bit();
    }

    /// Iterate the contained layers in canonical order.
    pub fn layers(self) -> impl Iterator<Item = Layer> {
        Layer::ALL_LAYERS.into_iter().filter(move |l| self.contains(*l))
    }
}

impl From<Layer> for LayerMask {
    fn from(layer: Layer) -> Self {
        LayerMask::single(layer)
    }
}

impl fmt::Display for LayerMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            return f.write_str("all");
        }
        if *self == Self::ALL_EXCEPT_BLEND_SHAPES {
            return f.write_str("all-except-blend-shapes");
        }
        let mut first = true;
        for layer in self.layers() {
            if !first {
                f.write_str("+")?;
            }
            write!(f, "{}", layer)?;
            first = false;
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// Parse the named selections the transcode entry point accepts.
impl FromStr for LayerMask {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::ALL),
            "all-except-blend-shapes" => Ok(Self::ALL_EXCEPT_BLEND_SHAPES),
            "descriptor" => Ok(LayerMask::single(Layer::Descriptor)),
            "definition" => Ok(LayerMask::single(Layer::Definition)),
            "behavior" => Ok(LayerMask::single(Layer::Behavior)),
            "geometry" => Ok(LayerMask::single(Layer::Geometry)),
            other => Err(format!("unknown layer selection: {}", other)),
        }
    }
}
