//! Deterministic appearance per marker: `id mod COLORS.len()` picks the
//! colour, `id mod PALETTE.len()` picks the primitive and idle animation.

use crate::registry::MarkerId;

use super::IdleBehavior;

/// Procedural shapes used when no external asset is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Cube,
    Sphere,
    Cylinder,
    Cone,
    Torus,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Cube => "cube",
            Primitive::Sphere => "sphere",
            Primitive::Cylinder => "cylinder",
            Primitive::Cone => "cone",
            Primitive::Torus => "torus",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteEntry {
    pub primitive: Primitive,
    pub idle: IdleBehavior,
}

pub const PALETTE: [PaletteEntry; 5] = [
    PaletteEntry {
        primitive: Primitive::Cube,
        idle: IdleBehavior::Rotate {
            radians_per_sec: 1.2,
        },
    },
    PaletteEntry {
        primitive: Primitive::Sphere,
        idle: IdleBehavior::Pulse {
            amplitude: 0.15,
            frequency_hz: 0.8,
        },
    },
    PaletteEntry {
        primitive: Primitive::Cylinder,
        idle: IdleBehavior::Bob {
            amplitude_m: 0.01,
            frequency_hz: 0.5,
        },
    },
    PaletteEntry {
        primitive: Primitive::Cone,
        idle: IdleBehavior::Rotate {
            radians_per_sec: -0.9,
        },
    },
    PaletteEntry {
        primitive: Primitive::Torus,
        idle: IdleBehavior::Pulse {
            amplitude: 0.1,
            frequency_hz: 1.5,
        },
    },
];

/// One colour per marker of the default deployment, linear RGB in [0, 1].
pub const COLORS: [[f32; 3]; 10] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 0.5, 0.0],
    [0.5, 0.0, 0.5],
    [0.0, 0.5, 0.0],
    [0.5, 0.5, 0.5],
];

pub fn palette_entry(id: MarkerId) -> &'static PaletteEntry {
    &PALETTE[id.index() % PALETTE.len()]
}

pub fn marker_color(id: MarkerId) -> [f32; 3] {
    COLORS[id.index() % COLORS.len()]
}

/// Colour as 8-bit sRGB-ish triple for viewers that want bytes.
pub fn color_u8(color: [f32; 3]) -> [u8; 3] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}
