use glam::{Mat4, Vec2, Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::sim::escaped_time;

const TAU: f64 = std::f64::consts::TAU;
const TAU32: f32 = std::f32::consts::TAU;

// Thickness of the laser-cut stock, world units.
const MATERIAL_THICKNESS: f32 = 6.0;

// Piece speeds are turns per 12 hours, so one turn is this many seconds.
const SECONDS_PER_TURN: f64 = 43_200.0;

// Offset that lines the escape wheel teeth up with the verge swing.
const ESCAPE_PHASE: f64 = 0.4;

#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct LineVertex {
    /// Position local to the owning piece, rotated/translated in the shader.
    pub position: Vec3,
    /// Index into the per-piece uniform array.
    pub piece: u32,
}

#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct PieceUniform {
    pub model: Mat4,
    pub color: Vec4,
}

#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct FrameUniforms {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    pub time: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PieceKind {
    /// Turning gear; speed in turns per 12 hours.
    Wheel { speed: f32 },
    /// Swings between its two full-engagement angles (radians) instead of
    /// turning.
    Verge { left_full_in: f32, right_full_in: f32 },
    /// Axles don't turn.
    Axle,
}

pub struct Piece {
    pub kind: PieceKind,
    pub center: Vec3,
    pub color: Vec3,
    /// Current rotation about the piece's z axis, set by `update_angles`.
    pub angle: f32,
}

/// Wireframe clock gear train: a meshed wheel chain, its escape wheel and
/// verge, and the axles the stack turns on. Purely a seeded stand-in for a
/// real cutting layout; geometry is face outlines plus struts through the
/// material, the way the cut parts are drawn.
pub struct GearTrain {
    pub pieces: Vec<Piece>,
    pub vertices: Vec<LineVertex>,
}

impl GearTrain {
    pub fn generate(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut train = Self {
            pieces: Vec::new(),
            vertices: Vec::new(),
        };

        let module = 3.0; // tooth size: pitch radius = module * teeth / 2
        let pinion_radius = module * 8.0 / 2.0;

        // Wheel chain from the hour wheel out to the escape wheel, each
        // driving the next through an eight-leaf pinion.
        let wheel_count = 4;
        let mut speed = 1.0_f32;
        let mut x = 0.0_f32;
        let mut previous_radius = 0.0_f32;
        let mut escape = (Vec3::ZERO, 0.0_f32);

        for index in 0..wheel_count {
            let teeth = rng.gen_range(30..=56);
            let radius = module * teeth as f32 / 2.0;

            if index > 0 {
                // Meshing distance: this wheel's pinion rides on the
                // previous wheel's rim.
                x += previous_radius + pinion_radius;
                speed *= previous_radius / pinion_radius;
            }

            // Alternate layers so neighboring wheels clear each other.
            let z = (index % 2) as f32 * MATERIAL_THICKNESS * 1.5;
            let center = Vec3::new(x, 0.0, z);

            let color = hsv_to_rgb(rng.gen_range(0.0..1.0), 0.7, 0.9);
            let piece = train.pieces.len() as u32;
            train.pieces.push(Piece {
                kind: PieceKind::Wheel { speed },
                center,
                color,
                angle: 0.0,
            });
            push_outline(
                &mut train.vertices,
                piece,
                &gear_points(teeth, radius - module, radius),
                0.0,
                MATERIAL_THICKNESS,
            );
            // Hub hole.
            push_outline(
                &mut train.vertices,
                piece,
                &circle_points(4.0, 20),
                0.0,
                MATERIAL_THICKNESS,
            );

            escape = (center, radius);
            previous_radius = radius;
        }

        // Verge pivoted above the escape wheel, swinging seven degrees to
        // either side of vertical.
        let (escape_center, escape_radius) = escape;
        let verge_center = escape_center + Vec3::new(0.0, escape_radius * 1.4, 0.0);
        let piece = train.pieces.len() as u32;
        train.pieces.push(Piece {
            kind: PieceKind::Verge {
                left_full_in: 7.0_f32.to_radians(),
                right_full_in: -7.0_f32.to_radians(),
            },
            center: verge_center,
            color: hsv_to_rgb(rng.gen_range(0.0..1.0), 0.7, 0.9),
            angle: 0.0,
        });
        push_verge(
            &mut train.vertices,
            piece,
            escape_radius,
            0.0,
            MATERIAL_THICKNESS,
        );

        // One axle per wheel, spanning past both faces of the stack.
        let axle_color = Vec3::splat(0.13);
        let wheel_centers: Vec<Vec3> = train
            .pieces
            .iter()
            .filter(|p| matches!(p.kind, PieceKind::Wheel { .. }))
            .map(|p| p.center)
            .collect();
        for center in wheel_centers {
            let piece = train.pieces.len() as u32;
            train.pieces.push(Piece {
                kind: PieceKind::Axle,
                center: Vec3::new(center.x, center.y, 0.0),
                color: axle_color,
                angle: 0.0,
            });
            push_outline(
                &mut train.vertices,
                piece,
                &circle_points(4.0, 20),
                -60.0,
                MATERIAL_THICKNESS * 2.5 + 80.0,
            );
        }

        train
    }

    /// Centroid of the wheel centers; the natural point to frame.
    pub fn center(&self) -> Vec3 {
        let wheels: Vec<Vec3> = self
            .pieces
            .iter()
            .filter(|p| matches!(p.kind, PieceKind::Wheel { .. }))
            .map(|p| p.center)
            .collect();
        if wheels.is_empty() {
            return Vec3::ZERO;
        }
        wheels.iter().copied().sum::<Vec3>() / wheels.len() as f32
    }

    /// Recompute every piece's rotation angle from simulated seconds.
    pub fn update_angles(&mut self, time: f64) {
        let escaped = escaped_time(time);
        let turn = (escaped - ESCAPE_PHASE) * TAU / SECONDS_PER_TURN;

        for piece in &mut self.pieces {
            piece.angle = match piece.kind {
                PieceKind::Wheel { speed } => (turn * f64::from(speed)) as f32,
                PieceKind::Verge {
                    left_full_in,
                    right_full_in,
                } => {
                    // One full tick-tock every two seconds, phase-matched to
                    // the escape wheel's step.
                    let span = ((time / 2.0 * TAU + 0.6).sin() / 2.0 + 0.5) as f32;
                    span * (left_full_in - right_full_in) + right_full_in
                }
                PieceKind::Axle => 0.0,
            };
        }
    }

    pub fn piece_uniforms(&self) -> Vec<PieceUniform> {
        self.pieces
            .iter()
            .map(|piece| PieceUniform {
                model: Mat4::from_translation(piece.center)
                    * Mat4::from_rotation_z(piece.angle),
                color: piece.color.extend(1.0),
            })
            .collect()
    }
}

fn polar(angle: f32, radius: f32) -> Vec2 {
    Vec2::new(angle.sin() * radius, angle.cos() * radius)
}

fn circle_points(radius: f32, facets: usize) -> Vec<Vec2> {
    (0..facets)
        .map(|i| polar(i as f32 / facets as f32 * TAU32, radius))
        .collect()
}

// Square-toothed silhouette: root land, radial flank, tip land, then the
// closing edge back to the next root.
fn gear_points(teeth: usize, root_radius: f32, tip_radius: f32) -> Vec<Vec2> {
    let mut points = Vec::with_capacity(teeth * 4);
    for i in 0..teeth {
        let base = i as f32 / teeth as f32 * TAU32;
        let quarter = TAU32 / teeth as f32 / 4.0;
        points.push(polar(base, root_radius));
        points.push(polar(base + quarter, root_radius));
        points.push(polar(base + quarter, tip_radius));
        points.push(polar(base + 3.0 * quarter, tip_radius));
    }
    points
}

fn push_segment(vertices: &mut Vec<LineVertex>, piece: u32, a: Vec3, b: Vec3) {
    vertices.push(LineVertex { position: a, piece });
    vertices.push(LineVertex { position: b, piece });
}

// Closed outline drawn on both faces of the stock, with a strut at every
// outline point joining them.
fn push_outline(vertices: &mut Vec<LineVertex>, piece: u32, points: &[Vec2], z0: f32, z1: f32) {
    let count = points.len();
    for i in 0..count {
        let a = points[i];
        let b = points[(i + 1) % count];
        push_segment(vertices, piece, a.extend(z0), b.extend(z0));
        push_segment(vertices, piece, a.extend(z1), b.extend(z1));
        push_segment(vertices, piece, a.extend(z0), a.extend(z1));
    }
}

// Anchor-shaped verge: two arms reaching down over the escape wheel with a
// short pallet at each tip.
fn push_verge(vertices: &mut Vec<LineVertex>, piece: u32, reach: f32, z0: f32, z1: f32) {
    let drop = reach * 0.5;
    let half_width = reach * 0.45;
    let pallet = reach * 0.12;

    let outline = [
        Vec2::new(-half_width - pallet, -drop - pallet),
        Vec2::new(-half_width, -drop),
        Vec2::new(0.0, 0.0),
        Vec2::new(half_width, -drop),
        Vec2::new(half_width + pallet, -drop - pallet),
    ];

    for z in [z0, z1] {
        for pair in outline.windows(2) {
            push_segment(vertices, piece, pair[0].extend(z), pair[1].extend(z));
        }
    }
    for point in outline {
        push_segment(vertices, piece, point.extend(z0), point.extend(z1));
    }
    // Pivot hole.
    push_outline(vertices, piece, &circle_points(4.0, 20), z0, z1);
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let i = (h * 6.0).floor() as i32;
    let f = h * 6.0 - i as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    let (r, g, b) = match i % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Vec3::new(r, g, b)
}
