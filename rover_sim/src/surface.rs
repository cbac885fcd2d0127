// Drivable surface height: terrain plus runnable rocks.
//
// Small rocks (scale below `runnable_threshold`) are never collided with.
// Instead each one raises the ground locally as a hemisphere of radius
// `scale`, its center sunk `ramp_sink * scale` below the terrain at the rock.
// Only points within `ramp_reach * scale` of the rock's center are affected;
// the reported height is the max of the bare terrain and every contributing
// hemisphere. The wheels roll up and over these bumps through the suspension.
//
// `SurfaceQuery` borrows the height field and the current obstacle list, so
// it is built fresh wherever a surface lookup is needed (suspension hardpoints,
// external callers via `RoverSim::surface_height`).

use crate::config::ObstacleParams;
use crate::terrain::HeightField;
use crate::types::Obstacle;

pub struct SurfaceQuery<'a> {
    terrain: &'a HeightField,
    obstacles: &'a [Obstacle],
    params: &'a ObstacleParams,
}

impl<'a> SurfaceQuery<'a> {
    pub fn new(
        terrain: &'a HeightField,
        obstacles: &'a [Obstacle],
        params: &'a ObstacleParams,
    ) -> Self {
        Self {
            terrain,
            obstacles,
            params,
        }
    }

    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let mut height = self.terrain.elevation(x, z);
        for ob in self.obstacles {
            if let Some(bump) = self.ramp_height(ob, x, z) {
                height = height.max(bump);
            }
        }
        height
    }

    /// Height of one runnable rock's hemisphere at `(x, z)`, if the point is
    /// within its reach.
    fn ramp_height(&self, ob: &Obstacle, x: f32, z: f32) -> Option<f32> {
        let p = self.params;
        if !ob.is_runnable(p.runnable_threshold) {
            return None;
        }
        let dx = x - ob.x;
        let dz = z - ob.z;
        let d2 = dx * dx + dz * dz;
        let reach = p.ramp_reach * ob.scale;
        if d2 > reach * reach {
            return None;
        }
        let center = self.terrain.elevation(ob.x, ob.z) - p.ramp_sink * ob.scale;
        Some(center + (ob.scale * ob.scale - d2).max(0.0).sqrt())
    }
}
