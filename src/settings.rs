/// User-tunable visual parameters. Read by the frame step every frame,
/// written only by input handling; each field is clamped to its legal range.
#[derive(Clone, Copy, Debug)]
pub struct VisualSettings {
    /// Sphere radius in world units, applied as a uniform model scale.
    pub radius: f32,
    /// Per-frame rotation increment around X (radians).
    pub rotation_speed_x: f32,
    /// Per-frame rotation increment around Y (radians).
    pub rotation_speed_y: f32,
    /// Frequency multiplier for the shader's normal-based coloring.
    pub color_intensity: f32,
    /// Divisor for byte magnitudes in the deformation scale. Lower = wilder.
    pub sensitivity: f32,
}

pub const RADIUS_RANGE: (f32, f32) = (0.5, 5.0);
pub const ROTATION_SPEED_RANGE: (f32, f32) = (0.001, 0.1);
pub const COLOR_INTENSITY_RANGE: (f32, f32) = (5.0, 20.0);
pub const SENSITIVITY_RANGE: (f32, f32) = (50.0, 255.0);

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            radius: 2.0,
            rotation_speed_x: 0.01,
            rotation_speed_y: 0.01,
            color_intensity: 10.0,
            sensitivity: 128.0,
        }
    }
}

impl VisualSettings {
    pub fn clamped(mut self) -> Self {
        self.radius = self.radius.clamp(RADIUS_RANGE.0, RADIUS_RANGE.1);
        self.rotation_speed_x = self
            .rotation_speed_x
            .clamp(ROTATION_SPEED_RANGE.0, ROTATION_SPEED_RANGE.1);
        self.rotation_speed_y = self
            .rotation_speed_y
            .clamp(ROTATION_SPEED_RANGE.0, ROTATION_SPEED_RANGE.1);
        self.color_intensity = self
            .color_intensity
            .clamp(COLOR_INTENSITY_RANGE.0, COLOR_INTENSITY_RANGE.1);
        self.sensitivity = self
            .sensitivity
            .clamp(SENSITIVITY_RANGE.0, SENSITIVITY_RANGE.1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_within_range() {
        let s = VisualSettings::default();
        let c = s.clamped();
        assert_eq!(s.radius, c.radius);
        assert_eq!(s.sensitivity, c.sensitivity);
        assert_eq!(s.color_intensity, c.color_intensity);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let s = VisualSettings {
            radius: 100.0,
            rotation_speed_x: 0.0,
            rotation_speed_y: 1.0,
            color_intensity: 0.0,
            sensitivity: 1.0,
        }
        .clamped();
        assert_eq!(s.radius, RADIUS_RANGE.1);
        assert_eq!(s.rotation_speed_x, ROTATION_SPEED_RANGE.0);
        assert_eq!(s.rotation_speed_y, ROTATION_SPEED_RANGE.1);
        assert_eq!(s.color_intensity, COLOR_INTENSITY_RANGE.0);
        assert_eq!(s.sensitivity, SENSITIVITY_RANGE.0);
    }
}
