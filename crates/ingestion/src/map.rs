//! Map layers
//!
//! - Basemap raster: `<root>/maps/basemap/<location>.png`, 10 px per meter,
//!   image row 0 is the map's max-y edge
//! - Lane outlines: `<root>/maps/expansion/<location>.json` (optional)

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use contracts::{Bounds2, ContractError, GridMap, MapLayers, Polyline, SceneMap};
use image::GrayImage;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Basemap raster resolution, meters per pixel
pub const BASEMAP_RESOLUTION: f64 = 0.1;

/// `/map` cell size, meters
const SCENE_GRID_RESOLUTION: f64 = 0.5;

/// `/drivable_area` window, meters per side
const DRIVABLE_WINDOW: f64 = 64.0;

/// `/drivable_area` cell size, meters
const DRIVABLE_RESOLUTION: f64 = 0.2;

/// Map layers read from the dataset's `maps/` directory
#[derive(Debug, Clone)]
pub struct BasemapLayers {
    maps_dir: PathBuf,
}

impl BasemapLayers {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            maps_dir: root.as_ref().join("maps"),
        }
    }
}

impl MapLayers for BasemapLayers {
    fn load(&self, location: &str) -> Result<Box<dyn SceneMap>, ContractError> {
        let map_error = |message: String| ContractError::MapLoad {
            location: location.to_string(),
            message,
        };

        let raster_path = self.maps_dir.join("basemap").join(format!("{location}.png"));
        let raster = image::open(&raster_path)
            .map_err(|e| map_error(format!("{}: {e}", raster_path.display())))?
            .into_luma8();
        info!(
            location,
            width = raster.width(),
            height = raster.height(),
            "basemap loaded"
        );

        let expansion = self
            .maps_dir
            .join("expansion")
            .join(format!("{location}.json"));
        let lanes = load_lane_outlines(&expansion).map_err(map_error)?;

        Ok(Box::new(BasemapSceneMap { raster, lanes }))
    }
}

#[derive(Debug, Deserialize)]
struct Expansion {
    #[serde(default)]
    node: Vec<ExpansionNode>,
    #[serde(default)]
    polygon: Vec<ExpansionPolygon>,
    #[serde(default)]
    lane: Vec<ExpansionLane>,
}

#[derive(Debug, Deserialize)]
struct ExpansionNode {
    token: String,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct ExpansionPolygon {
    token: String,
    exterior_node_tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ExpansionLane {
    polygon_token: String,
}

/// Closed lane outlines; a missing expansion file yields none
fn load_lane_outlines(path: &Path) -> Result<Vec<Polyline>, String> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "no map expansion, semantic map will be empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(format!("{}: {e}", path.display())),
    };
    let expansion: Expansion = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("{}: {e}", path.display()))?;

    let nodes: HashMap<&str, [f64; 3]> = expansion
        .node
        .iter()
        .map(|n| (n.token.as_str(), [n.x, n.y, 0.0]))
        .collect();
    let polygons: HashMap<&str, &ExpansionPolygon> = expansion
        .polygon
        .iter()
        .map(|p| (p.token.as_str(), p))
        .collect();

    let outlines: Vec<Polyline> = expansion
        .lane
        .iter()
        .filter_map(|lane| polygons.get(lane.polygon_token.as_str()))
        .map(|polygon| {
            let mut line: Polyline = polygon
                .exterior_node_tokens
                .iter()
                .filter_map(|token| nodes.get(token.as_str()).copied())
                .collect();
            if let Some(first) = line.first().copied() {
                line.push(first);
            }
            line
        })
        .filter(|line| line.len() > 2)
        .collect();

    debug!(lanes = outlines.len(), "lane outlines loaded");
    Ok(outlines)
}

/// Raster + outlines of one location
pub struct BasemapSceneMap {
    raster: GrayImage,
    lanes: Vec<Polyline>,
}

impl BasemapSceneMap {
    #[cfg(test)]
    fn from_parts(raster: GrayImage, lanes: Vec<Polyline>) -> Self {
        Self { raster, lanes }
    }

    /// Occupancy of the raster pixel covering a world point; `None` off-map
    fn sample(&self, x: f64, y: f64) -> Option<i8> {
        let col = (x / BASEMAP_RESOLUTION).floor();
        let row_from_bottom = (y / BASEMAP_RESOLUTION).floor();
        if col < 0.0 || row_from_bottom < 0.0 {
            return None;
        }
        let (col, row_from_bottom) = (col as u32, row_from_bottom as u32);
        if col >= self.raster.width() || row_from_bottom >= self.raster.height() {
            return None;
        }
        let row = self.raster.height() - 1 - row_from_bottom;
        let luma = self.raster.get_pixel(col, row).0[0];
        // dark = occupied
        Some(((255 - u32::from(luma)) * 100 / 255) as i8)
    }

    fn resample(&self, bounds: &Bounds2, resolution: f64) -> GridMap {
        let width = (bounds.width() / resolution).ceil().max(0.0) as u32;
        let height = (bounds.height() / resolution).ceil().max(0.0) as u32;
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            let y = bounds.min[1] + (f64::from(row) + 0.5) * resolution;
            for col in 0..width {
                let x = bounds.min[0] + (f64::from(col) + 0.5) * resolution;
                data.push(self.sample(x, y).unwrap_or(-1));
            }
        }
        GridMap {
            resolution: resolution as f32,
            width,
            height,
            origin: bounds.min,
            data,
        }
    }

    fn raster_bounds(&self) -> Bounds2 {
        Bounds2 {
            min: [0.0, 0.0],
            max: [
                f64::from(self.raster.width()) * BASEMAP_RESOLUTION,
                f64::from(self.raster.height()) * BASEMAP_RESOLUTION,
            ],
        }
    }
}

impl SceneMap for BasemapSceneMap {
    fn scene_grid(&self, bounds: &Bounds2) -> GridMap {
        self.resample(bounds, SCENE_GRID_RESOLUTION)
    }

    fn semantic_lines(&self, bounds: &Bounds2) -> Vec<Polyline> {
        self.lanes
            .iter()
            .filter(|line| line.iter().any(|p| bounds.contains([p[0], p[1]])))
            .cloned()
            .collect()
    }

    fn drivable_area(&self, center: [f64; 2]) -> Option<GridMap> {
        if !self.raster_bounds().contains(center) {
            return None;
        }
        let half = DRIVABLE_WINDOW / 2.0;
        let window = Bounds2 {
            min: [center[0] - half, center[1] - half],
            max: [center[0] + half, center[1] + half],
        };
        Some(self.resample(&window, DRIVABLE_RESOLUTION))
    }
}

/// Map layers with no content
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankMap;

impl MapLayers for BlankMap {
    fn load(&self, _location: &str) -> Result<Box<dyn SceneMap>, ContractError> {
        Ok(Box::new(BlankMap))
    }
}

impl SceneMap for BlankMap {
    fn scene_grid(&self, _bounds: &Bounds2) -> GridMap {
        GridMap::empty(SCENE_GRID_RESOLUTION as f32)
    }

    fn semantic_lines(&self, _bounds: &Bounds2) -> Vec<Polyline> {
        Vec::new()
    }

    fn drivable_area(&self, _center: [f64; 2]) -> Option<GridMap> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ErrorClass;
    use image::Luma;

    /// 20 m x 10 m raster: left half black, right half white
    fn raster() -> GrayImage {
        GrayImage::from_fn(200, 100, |x, _| if x < 100 { Luma([0]) } else { Luma([255]) })
    }

    #[test]
    fn test_sample_flips_rows() {
        let mut img = raster();
        // bottom-left pixel (world y in [0, 0.1)) is white
        img.put_pixel(0, 99, Luma([255]));
        let map = BasemapSceneMap::from_parts(img, Vec::new());
        assert_eq!(map.sample(0.05, 0.05), Some(0));
        assert_eq!(map.sample(0.05, 9.95), Some(100));
        assert_eq!(map.sample(15.0, 5.0), Some(0));
        assert_eq!(map.sample(-1.0, 5.0), None);
        assert_eq!(map.sample(5.0, 10.5), None);
    }

    #[test]
    fn test_scene_grid_resamples_bounds() {
        let map = BasemapSceneMap::from_parts(raster(), Vec::new());
        let bounds = Bounds2 {
            min: [8.0, 2.0],
            max: [12.0, 4.0],
        };
        let grid = map.scene_grid(&bounds);
        assert_eq!((grid.width, grid.height), (8, 4));
        assert_eq!(grid.origin, [8.0, 2.0]);
        assert_eq!(grid.data[0], 100);
        assert_eq!(grid.data[7], 0);
    }

    #[test]
    fn test_drivable_area_off_map() {
        let map = BasemapSceneMap::from_parts(raster(), Vec::new());
        assert!(map.drivable_area([-50.0, 0.0]).is_none());
        let grid = map.drivable_area([10.0, 5.0]).unwrap();
        assert_eq!(grid.width, 320);
        // cells past the raster edge are unknown
        assert_eq!(grid.data[0], -1);
    }

    #[test]
    fn test_lane_outlines_from_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boston-seaport.json");
        std::fs::write(
            &path,
            r#"{
                "node": [
                    {"token": "n0", "x": 1.0, "y": 1.0},
                    {"token": "n1", "x": 2.0, "y": 1.0},
                    {"token": "n2", "x": 2.0, "y": 2.0}
                ],
                "polygon": [{"token": "p0", "exterior_node_tokens": ["n0", "n1", "n2"], "holes": []}],
                "lane": [{"token": "l0", "polygon_token": "p0"}]
            }"#,
        )
        .unwrap();
        let lanes = load_lane_outlines(&path).unwrap();
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].len(), 4);
        assert_eq!(lanes[0][0], lanes[0][3]);

        let map = BasemapSceneMap::from_parts(raster(), lanes);
        let near = Bounds2 { min: [0.0, 0.0], max: [1.5, 1.5] };
        let far = Bounds2 { min: [50.0, 50.0], max: [60.0, 60.0] };
        assert_eq!(map.semantic_lines(&near).len(), 1);
        assert!(map.semantic_lines(&far).is_empty());
    }

    #[test]
    fn test_missing_basemap_is_map_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BasemapLayers::new(dir.path())
            .load("singapore-onenorth")
            .err()
            .unwrap();
        assert!(matches!(err, ContractError::MapLoad { .. }));
        assert_eq!(err.class(), ErrorClass::DatasetIntegrity);
    }

    #[test]
    fn test_blank_map_is_empty() {
        let map = BlankMap.load("anywhere").unwrap();
        let bounds = Bounds2 { min: [0.0, 0.0], max: [1.0, 1.0] };
        assert!(map.scene_grid(&bounds).is_empty());
        assert!(map.semantic_lines(&bounds).is_empty());
        assert!(map.drivable_area([0.0, 0.0]).is_none());
    }
}
