use glam::{DMat4, DVec3};

/// One step of a transform chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    Translate(DVec3),
    Scale(DVec3),
    /// Rotation about `axis` by `angle` degrees.
    Rotate { axis: DVec3, angle: f64 },
    LookAt { origin: DVec3, target: DVec3, up: DVec3 },
    Matrix(DMat4),
}

impl TransformOp {
    pub fn to_matrix(&self) -> DMat4 {
        match *self {
            TransformOp::Translate(v) => DMat4::from_translation(v),
            TransformOp::Scale(v) => DMat4::from_scale(v),
            TransformOp::Rotate { axis, angle } => {
                let axis = axis.normalize_or_zero();
                if axis == DVec3::ZERO {
                    DMat4::IDENTITY
                } else {
                    DMat4::from_axis_angle(axis, angle.to_radians())
                }
            }
            TransformOp::LookAt { origin, target, up } => look_at(origin, target, up),
            TransformOp::Matrix(m) => m,
        }
    }
}

/// Camera-to-world matrix: local +z looks from `origin` toward `target`.
fn look_at(origin: DVec3, target: DVec3, up: DVec3) -> DMat4 {
    let dir = (target - origin).normalize_or_zero();
    let left = up.cross(dir).normalize_or_zero();
    let new_up = dir.cross(left);
    DMat4::from_cols(
        left.extend(0.0),
        new_up.extend(0.0),
        dir.extend(0.0),
        origin.extend(1.0),
    )
}

/// Chain of affine operations. Each appended operation is applied after the
/// ones before it: `[scale, translate]` scales first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transform {
    ops: Vec<TransformOp>,
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(mut self, x: f64, y: f64, z: f64) -> Self {
        self.ops.push(TransformOp::Translate(DVec3::new(x, y, z)));
        self
    }

    pub fn scale(mut self, x: f64, y: f64, z: f64) -> Self {
        self.ops.push(TransformOp::Scale(DVec3::new(x, y, z)));
        self
    }

    pub fn scale_uniform(self, s: f64) -> Self {
        self.scale(s, s, s)
    }

    pub fn rotate(mut self, axis: [f64; 3], angle: f64) -> Self {
        self.ops.push(TransformOp::Rotate {
            axis: DVec3::from_array(axis),
            angle,
        });
        self
    }

    pub fn look_at(mut self, origin: [f64; 3], target: [f64; 3], up: [f64; 3]) -> Self {
        self.ops.push(TransformOp::LookAt {
            origin: DVec3::from_array(origin),
            target: DVec3::from_array(target),
            up: DVec3::from_array(up),
        });
        self
    }

    /// Append a raw matrix given as rows.
    pub fn matrix(mut self, rows: [[f64; 4]; 4]) -> Self {
        self.ops
            .push(TransformOp::Matrix(DMat4::from_cols_array_2d(&rows).transpose()));
        self
    }

    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    /// Compose the chain into the renderer's native matrix form.
    pub fn to_native(&self) -> DMat4 {
        self.ops
            .iter()
            .fold(DMat4::IDENTITY, |acc, op| op.to_matrix() * acc)
    }
}
