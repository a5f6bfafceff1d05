// src/detection/types.rs
use crate::types::Frame;

#[derive(Debug, Clone, PartialEq)]
pub struct SteeringEstimate {
    /// Pixels, positive when the vanishing point is right of centre
    pub lateral_offset: f32,
    pub vanishing_x: f32,
    pub frame_width: usize,
    /// Number of intersections the median was taken over (0 = centre fallback)
    pub intersections: usize,
    pub debug_frame: Option<Frame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GravityEstimate {
    /// Pixels, positive when the dark-mass centroid is right of centre
    pub lateral_offset: f32,
    pub centroid_x: f32,
    pub frame_width: usize,
    pub debug_frame: Option<Frame>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WallFlag {
    pub detected: bool,
    pub debug_frame_right: Option<Frame>,
    pub debug_frame_left: Option<Frame>,
}

/// Any detector output, routed to its own slot in the shared state.
#[derive(Debug, Clone, PartialEq)]
pub enum Estimate {
    Steering(SteeringEstimate),
    Gravity(GravityEstimate),
    Wall(WallFlag),
}

impl From<SteeringEstimate> for Estimate {
    fn from(e: SteeringEstimate) -> Self {
        Estimate::Steering(e)
    }
}

impl From<GravityEstimate> for Estimate {
    fn from(e: GravityEstimate) -> Self {
        Estimate::Gravity(e)
    }
}

impl From<WallFlag> for Estimate {
    fn from(e: WallFlag) -> Self {
        Estimate::Wall(e)
    }
}
