use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Unit UV sphere whose vertex positions are rewritten every frame from the
/// current frequency-magnitude sample. Rest unit directions are captured once
/// at construction and never re-derived from the mutated positions, so the
/// deformation is exactly repeatable frame to frame. Normals stay at the rest
/// directions; only positions move.
pub struct SphereMesh {
    rest_directions: Vec<Vec3>,
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    dirty: bool,
}

/// Radial scale for one vertex: unity plus the byte magnitude scaled by the
/// sensitivity divisor.
pub fn deform_scale(magnitude: u8, sensitivity: f32) -> f32 {
    1.0 + magnitude as f32 / sensitivity
}

impl SphereMesh {
    pub fn new(sectors: u32, stacks: u32) -> Self {
        let mut rest_directions =
            Vec::with_capacity(((stacks + 1) * (sectors + 1)) as usize);

        for i in 0..=stacks {
            let polar = std::f32::consts::PI * i as f32 / stacks as f32;
            let y = polar.cos();
            let ring = polar.sin();
            for j in 0..=sectors {
                let azimuth = 2.0 * std::f32::consts::PI * j as f32 / sectors as f32;
                let dir = Vec3::new(ring * azimuth.cos(), y, ring * azimuth.sin());
                rest_directions.push(dir.normalize());
            }
        }

        let mut indices = Vec::new();
        for i in 0..stacks {
            let k1 = i * (sectors + 1);
            let k2 = k1 + sectors + 1;
            for j in 0..sectors {
                if i != 0 {
                    indices.extend_from_slice(&[k1 + j, k2 + j, k1 + j + 1]);
                }
                if i != stacks - 1 {
                    indices.extend_from_slice(&[k1 + j + 1, k2 + j, k2 + j + 1]);
                }
            }
        }

        let positions = rest_directions.clone();

        Self {
            rest_directions,
            positions,
            indices,
            dirty: true,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[allow(dead_code)]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Rewrite every vertex position as `rest_direction * scale`, where
    /// `scale = 1 + sample[i mod sample_len] / sensitivity`. Vertex count may
    /// exceed the sample length; indices wrap via modulo. An empty sample is
    /// a guarded no-op (idle animation only).
    pub fn apply_sample(&mut self, sample: &[u8], sensitivity: f32) {
        if sample.is_empty() {
            return;
        }
        for (i, pos) in self.positions.iter_mut().enumerate() {
            let scale = deform_scale(sample[i % sample.len()], sensitivity);
            *pos = self.rest_directions[i] * scale;
        }
        self.dirty = true;
    }

    /// Snap back to the rest sphere (new asset loaded).
    pub fn reset(&mut self) {
        self.positions.copy_from_slice(&self.rest_directions);
        self.dirty = true;
    }

    /// True once per mutation; the caller uploads the vertex buffer when set.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn vertex_data(&self) -> Vec<MeshVertex> {
        self.positions
            .iter()
            .zip(self.rest_directions.iter())
            .map(|(pos, dir)| MeshVertex {
                position: pos.to_array(),
                normal: dir.to_array(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-6
    }

    #[test]
    fn rest_directions_are_unit_length() {
        let mesh = SphereMesh::new(16, 16);
        for dir in &mesh.rest_directions {
            assert!((dir.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn vertex_and_index_counts() {
        let mesh = SphereMesh::new(16, 8);
        assert_eq!(mesh.vertex_count(), 17 * 9);
        assert_eq!(mesh.index_count() % 3, 0);
        // 2 pole stacks contribute 1 triangle per sector, the rest 2
        assert_eq!(mesh.index_count(), (2 * 16 + (8 - 2) * 16 * 2) * 3);
    }

    #[test]
    fn empty_sample_is_a_noop() {
        let mut mesh = SphereMesh::new(8, 8);
        mesh.take_dirty();
        let before = mesh.positions().to_vec();
        mesh.apply_sample(&[], 128.0);
        assert_eq!(mesh.positions(), &before[..]);
        assert!(!mesh.take_dirty());
    }

    #[test]
    fn silent_sample_restores_rest_shape() {
        let mut mesh = SphereMesh::new(8, 8);
        mesh.apply_sample(&[200; 16], 100.0);
        mesh.apply_sample(&[0; 16], 100.0);
        for (pos, dir) in mesh.positions().iter().zip(mesh.rest_directions.iter()) {
            assert!(close(*pos, *dir));
        }
    }

    #[test]
    fn wraps_sample_index_via_modulo() {
        let mut mesh = SphereMesh::new(8, 8);
        let sample = [0u8, 50, 100, 150];
        let sensitivity = 128.0;
        mesh.apply_sample(&sample, sensitivity);

        assert!(mesh.vertex_count() > sample.len());
        let last = mesh.vertex_count() - 1;
        let expected =
            mesh.rest_directions[last] * deform_scale(sample[last % sample.len()], sensitivity);
        assert!(close(mesh.positions()[last], expected));

        // A vertex wrapping onto a nonzero magnitude actually moves.
        let i = last - 1;
        let expected =
            mesh.rest_directions[i] * deform_scale(sample[i % sample.len()], sensitivity);
        assert!(close(mesh.positions()[i], expected));
        assert!(mesh.positions()[i].length() > 1.5);
    }

    #[test]
    fn deformation_does_not_drift() {
        let mut mesh = SphereMesh::new(8, 8);
        let sample: Vec<u8> = (0..16).map(|i| (i * 16) as u8).collect();

        mesh.apply_sample(&sample, 128.0);
        let first = mesh.positions().to_vec();
        mesh.apply_sample(&sample, 128.0);
        assert_eq!(mesh.positions(), &first[..]);
    }

    #[test]
    fn scale_is_monotonic_in_magnitude_and_inverse_sensitivity() {
        assert!(deform_scale(10, 128.0) < deform_scale(200, 128.0));
        assert!(deform_scale(100, 200.0) < deform_scale(100, 50.0));
        assert_eq!(deform_scale(0, 128.0), 1.0);
    }

    #[test]
    fn dirty_flag_set_once_per_mutation() {
        let mut mesh = SphereMesh::new(8, 8);
        assert!(mesh.take_dirty());
        assert!(!mesh.take_dirty());
        mesh.apply_sample(&[10; 4], 128.0);
        assert!(mesh.take_dirty());
        mesh.reset();
        assert!(mesh.take_dirty());
    }
}
