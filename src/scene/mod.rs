//! Overlay objects: appearance, idle animation and the per-marker pool.

pub mod asset;
pub mod idle;
pub mod object_pool;
pub mod palette;

pub use asset::{AssetLoader, MeshAsset, NoAssets, ObjAssetLoader};
pub use idle::{IdleBehavior, IdleOffset};
pub use object_pool::{Appearance, ObjectHandle, ObjectPool, ObjectPoolConfig, RenderItem, Shape};
pub use palette::{COLORS, PALETTE, PaletteEntry, Primitive};
