//! Flat shapes: planes, convex polygons and triangles

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TraceError},
    objects::{GeoPoint, Geometries, Geometry, Intersectable, Surface, SurfaceConfig, Surfaced},
    utils::{self, align_zero, is_zero, SerdeVector, ACCURACY},
    Point, Ray, Vec3,
};

/// Infinite plane through `q0`
#[derive(Debug, Clone)]
pub struct Plane {
    q0: Point,
    normal: Vec3,
    surface: Surface,
}
impl Plane {
    pub fn new(q0: Point, normal: Vec3) -> Result<Self> {
        Ok(Self {
            q0,
            normal: utils::try_unit(normal)?,
            surface: Surface::default(),
        })
    }

    /// Plane through three points; fails if they do not span a plane
    pub fn from_points(p1: Point, p2: Point, p3: Point) -> Result<Self> {
        let normal = (p2 - p1)
            .cross(&(p3 - p1))
            .try_normalize(ACCURACY)
            .ok_or(TraceError::DegeneratePlane)?;
        Ok(Self {
            q0: p1,
            normal,
            surface: Surface::default(),
        })
    }

    pub fn from_config(config: &PlaneConfig) -> Result<Self> {
        Ok(Self::new(config.point.into(), config.normal.into())?
            .with_surface(Surface::from_config(&config.surface)?))
    }

    pub fn q0(&self) -> Point {
        self.q0
    }

    pub fn unit_normal(&self) -> Vec3 {
        self.normal
    }

    /// Where `ray` crosses the plane, if ahead of its head and within `max_distance`
    fn crossing(&self, ray: &Ray, max_distance: f64) -> Option<Point> {
        let nv = align_zero(self.normal.dot(&ray.dir));
        if nv == 0.0 {
            return None;
        }
        let t = align_zero(self.normal.dot(&(self.q0 - ray.orig)) / nv);
        if t <= 0.0 || align_zero(t - max_distance) > 0.0 {
            return None;
        }
        Some(ray.get(t))
    }
}
impl Intersectable for Plane {
    fn find_geo_intersections(&self, ray: &Ray, max_distance: f64) -> Option<Vec<GeoPoint<'_>>> {
        self.crossing(ray, max_distance)
            .map(|p| vec![GeoPoint::new(self, p)])
    }
}
impl Geometry for Plane {
    fn normal(&self, _point: &Point) -> Vec3 {
        self.normal
    }

    fn surface(&self) -> &Surface {
        &self.surface
    }
}
impl Surfaced for Plane {
    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }
}

/// Convex planar polygon
///
/// Vertices must be coplanar, listed in order around the boundary, distinct, and no
/// three consecutive vertices may be collinear.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<Point>,
    plane: Plane,
    surface: Surface,
}
impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Result<Self> {
        let invalid = |msg: &str| TraceError::InvalidPolygon(msg.to_string());
        let len = vertices.len();
        if len < 3 {
            return Err(invalid("a polygon needs at least 3 vertices"));
        }
        for (i, a) in vertices.iter().enumerate() {
            if vertices[i + 1..].iter().any(|b| is_zero((a - b).norm())) {
                return Err(invalid("repeated vertex"));
            }
        }
        let plane = Plane::from_points(vertices[0], vertices[1], vertices[2])
            .map_err(|_| invalid("first three vertices are collinear"))?;
        if len == 3 {
            return Ok(Self {
                vertices,
                plane,
                surface: Surface::default(),
            });
        }

        let n = plane.normal;
        // Every corner turns the same way around the normal
        let turn = |edge1: &Vec3, edge2: &Vec3| -> Result<bool> {
            let c = edge1.cross(edge2);
            if c.norm() < ACCURACY {
                return Err(invalid("three consecutive vertices are collinear"));
            }
            Ok(c.dot(&n) > 0.0)
        };
        let mut edge1 = vertices[len - 1] - vertices[len - 2];
        let mut edge2 = vertices[0] - vertices[len - 1];
        let positive = turn(&edge1, &edge2)?;
        for i in 1..len {
            if !is_zero((vertices[i] - vertices[0]).dot(&n)) {
                return Err(invalid("vertices are not coplanar"));
            }
            edge1 = edge2;
            edge2 = vertices[i] - vertices[i - 1];
            if turn(&edge1, &edge2)? != positive {
                return Err(invalid("vertices are out of order or the polygon is not convex"));
            }
        }

        Ok(Self {
            vertices,
            plane,
            surface: Surface::default(),
        })
    }

    pub fn from_config(config: &PolygonConfig) -> Result<Self> {
        let vertices = config.vertices.iter().map(|v| Point::from(*v)).collect();
        Ok(Self::new(vertices)?.with_surface(Surface::from_config(&config.surface)?))
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Plane crossing that also lies strictly inside every edge.
    ///
    /// Each edge and the ray head span a side plane; the ray passes inside when its
    /// direction falls on the same side of all of them. A zero dot product means the
    /// crossing is on an edge, a vertex or an edge's continuation, and counts as a miss.
    fn crossing(&self, ray: &Ray, max_distance: f64) -> Option<Point> {
        let p = self.plane.crossing(ray, max_distance)?;
        let len = self.vertices.len();
        let mut sign = 0.0;
        for i in 0..len {
            let vi = self.vertices[i] - ray.orig;
            let vj = self.vertices[(i + 1) % len] - ray.orig;
            let side = vi.cross(&vj).try_normalize(ACCURACY)?;
            let d = align_zero(ray.dir.dot(&side));
            if d == 0.0 {
                return None;
            }
            if sign == 0.0 {
                sign = d.signum();
            } else if d.signum() != sign {
                return None;
            }
        }
        Some(p)
    }
}
impl Intersectable for Polygon {
    fn find_geo_intersections(&self, ray: &Ray, max_distance: f64) -> Option<Vec<GeoPoint<'_>>> {
        self.crossing(ray, max_distance)
            .map(|p| vec![GeoPoint::new(self, p)])
    }
}
impl Geometry for Polygon {
    fn normal(&self, _point: &Point) -> Vec3 {
        self.plane.normal
    }

    fn surface(&self) -> &Surface {
        &self.surface
    }
}
impl Surfaced for Polygon {
    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }
}

/// Triangle; its edges and vertices are not part of it
#[derive(Debug, Clone)]
pub struct Triangle {
    polygon: Polygon,
}
impl Triangle {
    pub fn new(p1: Point, p2: Point, p3: Point) -> Result<Self> {
        Ok(Self {
            polygon: Polygon::new(vec![p1, p2, p3])?,
        })
    }

    pub fn from_config(config: &TriangleConfig) -> Result<Self> {
        let [p1, p2, p3] = config.vertices.map(Point::from);
        Ok(Self::new(p1, p2, p3)?.with_surface(Surface::from_config(&config.surface)?))
    }

    pub fn vertices(&self) -> &[Point] {
        self.polygon.vertices()
    }
}
impl Intersectable for Triangle {
    fn find_geo_intersections(&self, ray: &Ray, max_distance: f64) -> Option<Vec<GeoPoint<'_>>> {
        self.polygon
            .crossing(ray, max_distance)
            .map(|p| vec![GeoPoint::new(self, p)])
    }
}
impl Geometry for Triangle {
    fn normal(&self, point: &Point) -> Vec3 {
        self.polygon.normal(point)
    }

    fn surface(&self) -> &Surface {
        &self.polygon.surface
    }
}
impl Surfaced for Triangle {
    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.polygon.surface
    }
}

/// Axis-aligned box built from six polygons sharing one surface.
///
/// `corner` is the top-left-front corner; the box extends along +x, -y and -z.
pub fn cuboid(
    corner: Point,
    width: f64,
    height: f64,
    depth: f64,
    surface: &Surface,
) -> Result<Geometries> {
    if width <= 0.0 || height <= 0.0 || depth <= 0.0 {
        return Err(TraceError::InvalidGeometry(
            "cuboid sides must be positive".to_string(),
        ));
    }
    let x = Vec3::new(width, 0.0, 0.0);
    let y = Vec3::new(0.0, height, 0.0);
    let z = Vec3::new(0.0, 0.0, depth);

    let p1 = corner;
    let p2 = p1 - y;
    let p3 = p2 + x;
    let p4 = p1 + x;
    let p5 = p3 - z;
    let p6 = p4 - z;
    let p7 = p5 - x;
    let p8 = p6 - x;

    let faces = [
        [p1, p2, p3, p4], // front
        [p4, p3, p5, p6], // right
        [p6, p5, p7, p8], // back
        [p8, p7, p2, p1], // left
        [p1, p4, p6, p8], // top
        [p2, p3, p5, p7], // bottom
    ];
    let mut geometries = Geometries::new();
    for face in faces {
        geometries.add(Polygon::new(face.to_vec())?.with_surface(surface.clone()));
    }
    Ok(geometries)
}

/// Plane Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaneConfig {
    pub point: SerdeVector,
    pub normal: SerdeVector,
    #[serde(flatten)]
    pub surface: SurfaceConfig,
}

/// Polygon Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonConfig {
    pub vertices: Vec<SerdeVector>,
    #[serde(flatten)]
    pub surface: SurfaceConfig,
}

/// Triangle Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleConfig {
    pub vertices: [SerdeVector; 3],
    #[serde(flatten)]
    pub surface: SurfaceConfig,
}

/// Cuboid Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuboidConfig {
    pub corner: SerdeVector,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    #[serde(flatten)]
    pub surface: SurfaceConfig,
}

pub fn cuboid_from_config(config: &CuboidConfig) -> Result<Geometries> {
    cuboid(
        config.corner.into(),
        config.width,
        config.height,
        config.depth,
        &Surface::from_config(&config.surface)?,
    )
}
