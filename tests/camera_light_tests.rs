//! Camera and light tests
//!
//! Tests for:
//! - Projection selection and canvas aspect
//! - Per-frame inverse view-projection cache
//! - Sun and point light uniforms
//! - Sun shadow frustum fitting

use aether::errors::EngineError;
use aether::renderer::ShadowFit;
use aether::scene::camera::frustum_corners;
use aether::scene::light::fit_sun_projection;
use aether::scene::{CameraComponent, CameraProps, LightComponent, LightProps, Projection};
use glam::{Mat4, Quat, Vec3, Vec4Swizzles};

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn fixed_aspect_camera() -> CameraComponent {
    CameraComponent::new(CameraProps {
        projection: Projection::Perspective {
            fov_y: 1.0,
            aspect: 2.0,
        },
        use_canvas_aspect: false,
        ..CameraProps::default()
    })
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn canvas_aspect_needs_a_canvas() {
    let mut camera = CameraComponent::new(CameraProps::default());
    let result = camera.compute_uniform(Mat4::IDENTITY, None);
    assert!(matches!(result, Err(EngineError::CanvasRequired)));
    assert!(camera.inv_view_projection().is_none());
}

#[test]
fn fixed_aspect_works_without_canvas() {
    let mut camera = fixed_aspect_camera();
    assert!(camera.compute_uniform(Mat4::IDENTITY, None).is_ok());
    assert!(camera.inv_view_projection().is_some());
}

#[test]
fn canvas_aspect_matches_explicit_aspect() {
    let mut follows = CameraComponent::new(CameraProps {
        projection: Projection::Perspective {
            fov_y: 1.0,
            aspect: 1.0,
        },
        ..CameraProps::default()
    });
    let fixed = fixed_aspect_camera();

    let a = follows.projection_matrix(Some((1600, 800))).unwrap();
    let b = fixed.projection_matrix(None).unwrap();
    assert!(a.abs_diff_eq(b, EPSILON));

    // Zero height is clamped instead of dividing by zero.
    let degenerate = follows.projection_matrix(Some((100, 0))).unwrap();
    assert!(degenerate.is_finite());
    assert!(follows.compute_uniform(Mat4::IDENTITY, Some((100, 0))).is_ok());
}

#[test]
fn orthographic_follows_canvas_width() {
    let camera = CameraComponent::new(CameraProps {
        projection: Projection::Orthographic { x_mag: 1.0, y_mag: 2.0 },
        ..CameraProps::default()
    });
    let projection = camera.projection_matrix(Some((300, 100))).unwrap();

    // x_mag becomes y_mag * aspect = 6, so x = 6 maps to the clip edge.
    let clip = projection * glam::Vec4::new(6.0, 2.0, -1.0, 1.0);
    assert!(approx_eq(clip.x / clip.w, 1.0));
    assert!(approx_eq(clip.y / clip.w, 1.0));
}

#[test]
fn uniform_view_is_inverse_of_global() {
    let mut camera = fixed_aspect_camera();
    let global = Mat4::from_rotation_translation(Quat::from_rotation_y(0.5), Vec3::new(1.0, 2.0, 3.0));
    let uniform = camera.compute_uniform(global, None).unwrap();

    assert!((uniform.view * global).abs_diff_eq(Mat4::IDENTITY, EPSILON));
    assert!(
        (uniform.view_projection * uniform.inverse_view_projection).abs_diff_eq(Mat4::IDENTITY, 1e-4)
    );
    assert_eq!(camera.inv_view_projection(), Some(uniform.inverse_view_projection));
}

#[test]
fn begin_frame_clears_cached_projection() {
    let mut camera = fixed_aspect_camera();
    camera.compute_uniform(Mat4::IDENTITY, None).unwrap();
    assert!(camera.frustum_corners().is_some());

    camera.begin_frame();
    assert!(camera.inv_view_projection().is_none());
    assert!(camera.frustum_corners().is_none());
}

// ============================================================================
// Lights
// ============================================================================

#[test]
fn light_without_camera_projection_fails() {
    let fit = ShadowFit::default();
    let sun = LightComponent::new(LightProps::sun(Vec3::ONE, 1.0));
    let point = LightComponent::new(LightProps::point(Vec3::ONE, 1.0));

    assert!(matches!(
        sun.compute_uniform(Mat4::IDENTITY, None, &fit),
        Err(EngineError::MissingCameraProjection)
    ));
    assert!(matches!(
        point.compute_uniform(Mat4::IDENTITY, None, &fit),
        Err(EngineError::MissingCameraProjection)
    ));
}

#[test]
fn sun_encodes_normalized_direction_with_w_zero() {
    let sun = LightComponent::new(LightProps::sun(Vec3::new(1.0, 0.5, 0.25), 3.0));
    // Scaled transform: the direction must still come out unit length.
    let global = Mat4::from_scale_rotation_translation(
        Vec3::splat(4.0),
        Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
        Vec3::new(10.0, 10.0, 10.0),
    );
    let uniform = sun
        .compute_uniform(global, Some(Mat4::IDENTITY), &ShadowFit::default())
        .unwrap();

    assert!(approx_eq(uniform.direction_or_position.w, 0.0));
    let direction = uniform.direction_or_position.xyz();
    assert!(approx_eq(direction.length(), 1.0));
    assert!((direction - Vec3::NEG_Y).length() < 1e-4);
    assert_eq!(uniform.color, Vec3::new(1.0, 0.5, 0.25));
    assert!(approx_eq(uniform.power, 3.0));
}

#[test]
fn only_sun_lights_cast_shadows() {
    let sun = LightComponent::new(LightProps::sun(Vec3::ONE, 1.0).with_shadow());
    let point = LightComponent::new(LightProps::point(Vec3::ONE, 1.0).with_shadow());
    let plain = LightComponent::new(LightProps::sun(Vec3::ONE, 1.0));

    assert!(sun.casts_shadow());
    assert!(!point.casts_shadow());
    assert!(!plain.casts_shadow());
}

// ============================================================================
// Shadow fitting
// ============================================================================

#[test]
fn sun_fit_follows_the_camera() {
    let fit = ShadowFit::default();
    let direction = Vec3::new(0.2, -1.0, 0.1).normalize();
    let projection = Mat4::perspective_rh(0.8, 1.0, 0.1, 30.0);

    let here = (projection * Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y)).inverse();
    let there = (projection * Mat4::look_at_rh(Vec3::new(50.0, 0.0, 0.0), Vec3::new(50.0, 0.0, -1.0), Vec3::Y))
        .inverse();

    let a = fit_sun_projection(direction, here, &fit);
    let b = fit_sun_projection(direction, there, &fit);
    assert!(!a.abs_diff_eq(b, 1e-3));

    for (light_vp, inv) in [(a, here), (b, there)] {
        for corner in frustum_corners(inv) {
            let clip = light_vp * corner.extend(1.0);
            let ndc = clip.xyz() / clip.w;
            assert!(ndc.x.abs() <= 1.0 + 1e-3);
            assert!(ndc.y.abs() <= 1.0 + 1e-3);
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }
}

#[test]
fn frustum_corners_of_identity_are_the_ndc_box() {
    let corners = frustum_corners(Mat4::IDENTITY);
    assert!(corners[..4].iter().all(|c| approx_eq(c.z, 0.0)));
    assert!(corners[4..].iter().all(|c| approx_eq(c.z, 1.0)));
    assert!(corners.iter().all(|c| approx_eq(c.x.abs(), 1.0) && approx_eq(c.y.abs(), 1.0)));
}
