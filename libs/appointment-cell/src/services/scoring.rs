// libs/appointment-cell/src/services/scoring.rs
//
// Fixed-weight priority score for candidate slots. Higher is better; urgency
// dominates and the remaining factors only separate otherwise equal requests.

pub const URGENCY_WEIGHT: f64 = 0.5;
pub const SPECIALIZATION_WEIGHT: f64 = 0.25;
pub const PROXIMITY_WEIGHT: f64 = 0.15;
pub const WAIT_PENALTY_WEIGHT: f64 = 0.1;

pub const PREFERRED_DOCTOR_MATCH: f64 = 1.0;
pub const OTHER_DOCTOR_MATCH: f64 = 0.8;
pub const BOTH_LOCATED_PROXIMITY: f64 = 0.8;
pub const UNKNOWN_PROXIMITY: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreFactors {
    pub urgency: f64,
    pub specialization_match: f64,
    pub proximity: f64,
    /// Always zero for now. Reserved for penalizing far-future slots.
    pub wait_penalty: f64,
}

impl ScoreFactors {
    /// Factors for one doctor's candidates within a single request.
    pub fn for_candidate(urgency: i32, is_preferred_doctor: bool, both_located: bool) -> Self {
        Self {
            urgency: f64::from(urgency),
            specialization_match: if is_preferred_doctor {
                PREFERRED_DOCTOR_MATCH
            } else {
                OTHER_DOCTOR_MATCH
            },
            proximity: if both_located {
                BOTH_LOCATED_PROXIMITY
            } else {
                UNKNOWN_PROXIMITY
            },
            wait_penalty: 0.0,
        }
    }

    pub fn score(&self) -> f64 {
        self.urgency * URGENCY_WEIGHT
            + self.specialization_match * SPECIALIZATION_WEIGHT
            + self.proximity * PROXIMITY_WEIGHT
            + self.wait_penalty * WAIT_PENALTY_WEIGHT
    }
}
