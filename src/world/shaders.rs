//! GLSL sources for the full-screen quad
//!
//! The fragment source is a template: the ray march loop bound has to be a
//! compile-time constant, so `$DRAW_DISTANCE` is substituted per world.

/// Forwards `position` to clip space and `uv` to the `vUv` varying
pub const VERTEX_SOURCE: &str = include_str!("shaders/scene.vert");

/// Ray-marched scene, with the `$DRAW_DISTANCE` loop bound left unsubstituted
pub const FRAGMENT_TEMPLATE: &str = include_str!("shaders/scene.frag");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::DRAW_DISTANCE_TOKEN;

    #[test]
    fn test_template_has_single_token() {
        assert_eq!(FRAGMENT_TEMPLATE.matches(DRAW_DISTANCE_TOKEN).count(), 1);
    }

    #[test]
    fn test_vertex_interface() {
        assert!(VERTEX_SOURCE.contains("attribute vec2 position;"));
        assert!(VERTEX_SOURCE.contains("attribute vec2 uv;"));
        assert!(VERTEX_SOURCE.contains("varying vec2 vUv;"));
        assert!(FRAGMENT_TEMPLATE.contains("varying vec2 vUv;"));
    }
}
