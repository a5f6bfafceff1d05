// src/pipeline/shared_state.rs
//
// The single rendezvous between perception workers and the control loop.
// One mutex guards every slot and the stop flag; readers always get a
// full copy, so a snapshot never mixes fields from two publishes.

use parking_lot::Mutex;

use crate::detection::{Estimate, GravityEstimate, SteeringEstimate, WallFlag};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerceptionSnapshot {
    pub steering: Option<SteeringEstimate>,
    pub gravity: Option<GravityEstimate>,
    pub wall: Option<WallFlag>,
    pub stop_requested: bool,
}

#[derive(Debug, Default)]
pub struct SharedPerceptionState {
    inner: Mutex<PerceptionSnapshot>,
}

impl SharedPerceptionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot the estimate belongs to. Last writer wins.
    pub fn publish(&self, estimate: Estimate) {
        let mut state = self.inner.lock();
        match estimate {
            Estimate::Steering(e) => state.steering = Some(e),
            Estimate::Gravity(e) => state.gravity = Some(e),
            Estimate::Wall(e) => state.wall = Some(e),
        }
    }

    pub fn snapshot(&self) -> PerceptionSnapshot {
        self.inner.lock().clone()
    }

    pub fn request_stop(&self) {
        self.inner.lock().stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.inner.lock().stop_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    fn steering(offset: f32) -> SteeringEstimate {
        SteeringEstimate {
            lateral_offset: offset,
            vanishing_x: 120.0 + offset,
            frame_width: 240,
            intersections: 1,
            debug_frame: None,
        }
    }

    #[test]
    fn test_publish_routes_to_slot() {
        let state = SharedPerceptionState::new();
        state.publish(steering(5.0).into());
        state.publish(
            WallFlag {
                detected: true,
                ..WallFlag::default()
            }
            .into(),
        );
        let snap = state.snapshot();
        assert_eq!(snap.steering.unwrap().lateral_offset, 5.0);
        assert!(snap.wall.unwrap().detected);
        assert!(snap.gravity.is_none());
        assert!(!snap.stop_requested);
    }

    #[test]
    fn test_last_writer_wins() {
        let state = SharedPerceptionState::new();
        state.publish(steering(1.0).into());
        state.publish(steering(-7.0).into());
        assert_eq!(state.snapshot().steering.unwrap().lateral_offset, -7.0);
    }

    #[test]
    fn test_stop_flag_is_sticky() {
        let state = SharedPerceptionState::new();
        state.request_stop();
        state.publish(steering(0.0).into());
        assert!(state.stop_requested());
        assert!(state.snapshot().stop_requested);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        // Each writer publishes estimates whose two fields agree; a torn
        // read would show a mismatch.
        #[test]
        fn prop_snapshots_are_never_torn(writers in 2usize..6, rounds in 50usize..200) {
            let state = Arc::new(SharedPerceptionState::new());
            let handles: Vec<_> = (0..writers)
                .map(|w| {
                    let state = Arc::clone(&state);
                    thread::spawn(move || {
                        for r in 0..rounds {
                            let offset = (w * 1000 + r) as f32;
                            state.publish(steering(offset).into());
                        }
                    })
                })
                .collect();

            for _ in 0..rounds {
                if let Some(s) = state.snapshot().steering {
                    prop_assert_eq!(s.vanishing_x, 120.0 + s.lateral_offset);
                }
            }
            for h in handles {
                h.join().unwrap();
            }
        }
    }
}
