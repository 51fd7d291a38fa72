//! GPU-side circle record, written into the storage buffer once per frame.

use crate::animator::Color;

/// Matches the `Circle` struct in `shader.wgsl`: a vec2f position followed
/// by a 16-byte-aligned vec4f color, hence the explicit padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CircleInstance {
    pos: [f32; 2],
    _pad: [f32; 2],
    color: [f32; 4],
}

impl CircleInstance {
    /// `pos` is the displayed normalized position; `color` is straight sRGB.
    /// The color is converted to linear and premultiplied here so the blur
    /// passes can filter it without darkening transparent regions.
    pub fn new(pos: [f32; 2], color: Color) -> Self {
        let a = color[3];
        Self {
            pos,
            _pad: [0.0; 2],
            color: [
                srgb_to_linear(color[0]) * a,
                srgb_to_linear(color[1]) * a,
                srgb_to_linear(color[2]) * a,
                a,
            ],
        }
    }
}

/// One sRGB channel to linear, per the piecewise sRGB EOTF.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_to_linear_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        // Mid grey: sRGB 0.5 is roughly linear 0.214.
        assert!((srgb_to_linear(0.5) - 0.2140).abs() < 1e-3);
    }

    #[test]
    fn test_instance_premultiplies_alpha() {
        let instance = CircleInstance::new([0.5, 0.5], [1.0, 1.0, 1.0, 0.5]);
        // Linear white premultiplied by 0.5.
        assert!((instance.color[0] - 0.5).abs() < 1e-6);
        assert_eq!(instance.color[3], 0.5);
    }

    #[test]
    fn test_instance_layout_matches_shader_struct() {
        assert_eq!(std::mem::size_of::<CircleInstance>(), 32);
    }
}
