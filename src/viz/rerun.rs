//! Rerun-based visualization of the overlay scene.
//!
//! Entity hierarchy:
//!     status                 - Latest status message
//!     markers                - Found count and per-marker indicator grid
//!     world/
//!         markers/obj_<i>    - Object transform (tracked pose + idle animation)
//!         markers/obj_<i>/shape - Primitive or mesh vertices, in palette colour
//!     plots/
//!         active_count       - Number of tracked markers over time

use std::f32::consts::TAU;

use anyhow::{Context, Result};
use rerun::{RecordingStream, external::glam};

use crate::geometry::Pose;
use crate::scene::palette::color_u8;
use crate::scene::{Appearance, ObjectPool, Primitive, Shape};
use crate::tracking::ActiveSummary;
use crate::ui::{UiSync, indicator_row};

/// Segments used to draw round outlines (cone base, torus ring).
const RING_SEGMENTS: usize = 32;

pub struct RerunVisualizer {
    rec: RecordingStream,
    /// Objects whose shape is currently logged, indexed by marker id.
    shown: Vec<bool>,
}

impl RerunVisualizer {
    /// Spawn a viewer process and stream to it.
    pub fn new(app_name: &str) -> Result<Self> {
        let rec = rerun::RecordingStreamBuilder::new(app_name)
            .spawn()
            .context("failed to spawn rerun viewer")?;
        Ok(Self::with_recording(rec))
    }

    /// Use an existing recording stream (file sink, buffered, remote viewer).
    pub fn with_recording(rec: RecordingStream) -> Self {
        // WebXR reference space: X right, Y up, camera looks down -Z.
        rec.log_static("world", &rerun::ViewCoordinates::RUB()).ok();
        Self {
            rec,
            shown: Vec::new(),
        }
    }

    pub fn set_time(&self, time_secs: f64) {
        self.rec.set_duration_secs("time", time_secs);
    }

    /// Log every object of the pool for the current frame. Hidden objects
    /// that were visible last frame are cleared.
    pub fn log_frame(&mut self, time_secs: f64, pool: &ObjectPool) {
        self.set_time(time_secs);
        if self.shown.len() < pool.len() {
            self.shown.resize(pool.len(), false);
        }

        for handle in pool.handles() {
            let index = handle.id().index();
            let path = format!("world/markers/{}", handle.name());

            if !handle.is_visible() {
                if self.shown[index] {
                    self.rec
                        .log(path.as_str(), &rerun::Clear::recursive())
                        .ok();
                    self.shown[index] = false;
                }
                continue;
            }

            if !self.shown[index] {
                self.log_shape(&format!("{path}/shape"), handle.appearance());
                self.shown[index] = true;
            }

            let (world, scale) = handle.world_transform();
            self.rec
                .log(path.as_str(), &transform(&world, scale))
                .ok();
        }
    }

    /// Log the geometry of one object in its local frame.
    fn log_shape(&self, path: &str, appearance: &Appearance) {
        let color = color_u8(appearance.color);
        let half = (appearance.size_m / 2.0) as f32;

        match &appearance.shape {
            Shape::Primitive(Primitive::Cube) => {
                self.rec
                    .log(
                        path,
                        &rerun::Boxes3D::from_half_sizes([[half, half, half]])
                            .with_colors([color]),
                    )
                    .ok();
            }
            Shape::Primitive(Primitive::Sphere) => {
                self.rec
                    .log(
                        path,
                        &rerun::Ellipsoids3D::from_half_sizes([[half, half, half]])
                            .with_colors([color]),
                    )
                    .ok();
            }
            Shape::Primitive(Primitive::Cylinder) => {
                // Capsule along the local Z axis, centred on the object origin.
                self.rec
                    .log(
                        path,
                        &rerun::Capsules3D::from_lengths_and_radii([half], [half / 2.0])
                            .with_translations([[0.0, 0.0, -half / 2.0]])
                            .with_colors([color]),
                    )
                    .ok();
            }
            Shape::Primitive(Primitive::Cone) => {
                let apex = [0.0, half, 0.0];
                let base = ring(half, -half);
                let mut strips = vec![base.clone()];
                strips.extend(base.iter().step_by(RING_SEGMENTS / 8).map(|p| vec![*p, apex]));
                self.rec
                    .log(path, &rerun::LineStrips3D::new(strips).with_colors([color]))
                    .ok();
            }
            Shape::Primitive(Primitive::Torus) => {
                self.rec
                    .log(
                        path,
                        &rerun::LineStrips3D::new([ring(half * 0.75, 0.0)])
                            .with_radii([half * 0.25])
                            .with_colors([color]),
                    )
                    .ok();
            }
            Shape::Mesh(mesh) => {
                // Fit the model's largest dimension to the object size.
                let extent = mesh.extent().max();
                let fit = if extent > 0.0 {
                    appearance.size_m as f32 / extent
                } else {
                    1.0
                };
                let pts: Vec<[f32; 3]> = mesh
                    .vertices
                    .iter()
                    .map(|v| [v.x * fit, v.y * fit, v.z * fit])
                    .collect();
                self.rec
                    .log(
                        path,
                        &rerun::Points3D::new(pts)
                            .with_colors([color])
                            .with_radii([0.002f32]),
                    )
                    .ok();
            }
        }
    }
}

impl UiSync for RerunVisualizer {
    fn publish(&mut self, summary: &ActiveSummary) {
        let text = format!(
            "**{}**\n\n`{}`",
            summary.status_line(),
            indicator_row(summary)
        );
        self.rec
            .log(
                "markers",
                &rerun::TextDocument::new(text).with_media_type(rerun::MediaType::markdown()),
            )
            .ok();
        self.rec
            .log(
                "plots/active_count",
                &rerun::Scalars::new([summary.active_count as f64]),
            )
            .ok();
    }

    fn status(&mut self, message: &str, is_error: bool) {
        let text = if is_error {
            format!("**ERROR:** {message}")
        } else {
            message.to_string()
        };
        self.rec
            .log(
                "status",
                &rerun::TextDocument::new(text).with_media_type(rerun::MediaType::markdown()),
            )
            .ok();
    }
}

fn transform(pose: &Pose, scale: f64) -> rerun::Transform3D {
    let t = &pose.position;
    let q = &pose.rotation;
    let translation = glam::Vec3::new(t.x as f32, t.y as f32, t.z as f32);
    let rotation = glam::Quat::from_xyzw(
        q.coords.x as f32,
        q.coords.y as f32,
        q.coords.z as f32,
        q.w as f32,
    );
    rerun::Transform3D::from_translation_rotation(translation, rotation).with_scale(scale as f32)
}

/// Closed circle of radius `r` in the XZ plane at height `y`.
fn ring(r: f32, y: f32) -> Vec<[f32; 3]> {
    (0..=RING_SEGMENTS)
        .map(|i| {
            let a = TAU * i as f32 / RING_SEGMENTS as f32;
            [r * a.cos(), y, r * a.sin()]
        })
        .collect()
}
