//! Map layers contract
//!
//! Map layers are loaded once per scene location. Grids use the ROS
//! occupancy convention: row-major from the origin, `0` free, `100`
//! occupied, `-1` unknown.

use crate::ContractError;

/// Occupancy grid in the map frame
#[derive(Debug, Clone, PartialEq)]
pub struct GridMap {
    /// Meters per cell
    pub resolution: f32,
    pub width: u32,
    pub height: u32,
    /// World position of cell (0, 0), `[x, y]` meters
    pub origin: [f64; 2],
    pub data: Vec<i8>,
}

impl GridMap {
    pub fn empty(resolution: f32) -> Self {
        Self {
            resolution,
            width: 0,
            height: 0,
            origin: [0.0, 0.0],
            data: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Line strip in the map frame, `[x, y, z]` meters
pub type Polyline = Vec<[f64; 3]>;

/// Axis-aligned 2D bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Bounds2 {
    /// Bounds of a point set; `None` when empty
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for [x, y] in iter {
            bounds.min[0] = bounds.min[0].min(x);
            bounds.min[1] = bounds.min[1].min(y);
            bounds.max[0] = bounds.max[0].max(x);
            bounds.max[1] = bounds.max[1].max(y);
        }
        Some(bounds)
    }

    /// Grow by `margin` meters on every side
    pub fn expand(self, margin: f64) -> Self {
        Self {
            min: [self.min[0] - margin, self.min[1] - margin],
            max: [self.max[0] + margin, self.max[1] + margin],
        }
    }

    pub fn contains(&self, point: [f64; 2]) -> bool {
        point[0] >= self.min[0]
            && point[0] <= self.max[0]
            && point[1] >= self.min[1]
            && point[1] <= self.max[1]
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }
}

/// Map layer provider
pub trait MapLayers {
    /// Load the layers of one location
    ///
    /// # Errors
    /// `ContractError::MapLoad` when the location has no readable map.
    fn load(&self, location: &str) -> Result<Box<dyn SceneMap>, ContractError>;
}

/// Layers of one location
pub trait SceneMap {
    /// Occupancy grid covering `bounds`
    fn scene_grid(&self, bounds: &Bounds2) -> GridMap;

    /// Semantic outlines intersecting `bounds`
    fn semantic_lines(&self, bounds: &Bounds2) -> Vec<Polyline>;

    /// Drivable-area grid centered on an ego position; `None` when the map
    /// has no coverage there
    fn drivable_area(&self, center: [f64; 2]) -> Option<GridMap>;
}
