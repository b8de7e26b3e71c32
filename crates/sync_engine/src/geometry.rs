//! Rigid transforms and pinhole projection

use nalgebra::{Isometry3, Matrix3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

/// Isometry from a translation and a `[w, x, y, z]` quaternion
pub fn isometry(translation: [f64; 3], rotation_wxyz: [f64; 4]) -> Isometry3<f64> {
    let [w, x, y, z] = rotation_wxyz;
    Isometry3::from_parts(
        Translation3::new(translation[0], translation[1], translation[2]),
        UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
    )
}

/// Camera frame from lidar frame, through the global frame:
/// lidar -> ego (at lidar time) -> global -> ego (at camera time) -> camera
pub fn camera_from_lidar(
    lidar_calibration: &Isometry3<f64>,
    ego_at_lidar: &Isometry3<f64>,
    ego_at_camera: &Isometry3<f64>,
    camera_calibration: &Isometry3<f64>,
) -> Isometry3<f64> {
    camera_calibration.inverse() * ego_at_camera.inverse() * ego_at_lidar * lidar_calibration
}

/// A point projected into the image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePoint {
    pub u: f64,
    pub v: f64,
    /// Distance along the optical axis, meters
    pub depth: f64,
}

/// Pinhole camera
#[derive(Debug, Clone)]
pub struct Pinhole {
    k: Matrix3<f64>,
    width: f64,
    height: f64,
}

impl Pinhole {
    pub fn new(intrinsic: &[[f64; 3]; 3], width: u32, height: u32) -> Self {
        let r = intrinsic;
        Self {
            k: Matrix3::new(
                r[0][0], r[0][1], r[0][2], //
                r[1][0], r[1][1], r[1][2], //
                r[2][0], r[2][1], r[2][2],
            ),
            width: f64::from(width),
            height: f64::from(height),
        }
    }

    /// Project a camera-frame point; `None` when closer than `min_depth`
    /// or outside the image
    pub fn project(&self, point: &Point3<f64>, min_depth: f64) -> Option<ImagePoint> {
        let depth = point.z;
        if depth <= min_depth {
            return None;
        }
        let pixel: Vector3<f64> = self.k * point.coords / depth;
        let (u, v) = (pixel.x, pixel.y);
        if u < 0.0 || v < 0.0 || u >= self.width || v >= self.height {
            return None;
        }
        Some(ImagePoint { u, v, depth })
    }

    /// Transform then project a lidar cloud
    pub fn project_cloud(
        &self,
        points: impl Iterator<Item = [f32; 3]>,
        camera_from_lidar: &Isometry3<f64>,
        min_depth: f64,
    ) -> Vec<ImagePoint> {
        points
            .filter_map(|[x, y, z]| {
                let p = camera_from_lidar
                    .transform_point(&Point3::new(f64::from(x), f64::from(y), f64::from(z)));
                self.project(&p, min_depth)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const K: [[f64; 3]; 3] = [[1000.0, 0.0, 800.0], [0.0, 1000.0, 450.0], [0.0, 0.0, 1.0]];

    #[test]
    fn test_isometry_applies_rotation_then_translation() {
        // 90 degrees about z
        let half = std::f64::consts::FRAC_PI_4;
        let iso = isometry([1.0, 0.0, 0.0], [half.cos(), 0.0, 0.0, half.sin()]);
        let p = iso.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-9);
        assert!((p.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_center_and_bounds() {
        let cam = Pinhole::new(&K, 1600, 900);
        let center = cam.project(&Point3::new(0.0, 0.0, 10.0), 1.0).unwrap();
        assert!((center.u - 800.0).abs() < 1e-9);
        assert!((center.v - 450.0).abs() < 1e-9);
        assert_eq!(center.depth, 10.0);

        assert!(cam.project(&Point3::new(0.0, 0.0, 0.5), 1.0).is_none());
        assert!(cam.project(&Point3::new(0.0, 0.0, -5.0), 1.0).is_none());
        assert!(cam.project(&Point3::new(100.0, 0.0, 10.0), 1.0).is_none());
    }

    #[test]
    fn test_same_pose_chain_is_identity() {
        let calib = isometry([0.5, 0.0, 1.8], [1.0, 0.0, 0.0, 0.0]);
        let ego = isometry([600.0, 1600.0, 0.0], [1.0, 0.0, 0.0, 0.0]);
        let t = camera_from_lidar(&calib, &ego, &ego, &calib);
        let p = t.transform_point(&Point3::new(3.0, -2.0, 1.0));
        assert!((p - Point3::new(3.0, -2.0, 1.0)).norm() < 1e-9);
    }
}
