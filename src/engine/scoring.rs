use serde::{Deserialize, Serialize};

use crate::models::installer::Availability;

const DISTANCE_WEIGHT: f64 = 0.40;
const AVAILABILITY_WEIGHT: f64 = 0.30;
const WORKLOAD_WEIGHT: f64 = 0.30;

const MAX_SUB_SCORE: f64 = 100.0;
const POINTS_PER_ACTIVE_JOB: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub distance_score: f64,
    pub availability_score: f64,
    pub workload_score: f64,
}

pub fn compute_score(
    distance_km: f64,
    radius_km: f64,
    availability: Availability,
    active_jobs: u32,
) -> (f64, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        distance_score: distance_score(distance_km, radius_km),
        availability_score: availability_score(availability),
        workload_score: workload_score(active_jobs),
    };

    let score = weighted_score(&breakdown);
    (score, breakdown)
}

pub fn weighted_score(breakdown: &ScoreBreakdown) -> f64 {
    (breakdown.distance_score * DISTANCE_WEIGHT)
        + (breakdown.availability_score * AVAILABILITY_WEIGHT)
        + (breakdown.workload_score * WORKLOAD_WEIGHT)
}

/// Linear falloff from 100 at the origin to 0 at the radius boundary.
fn distance_score(distance_km: f64, radius_km: f64) -> f64 {
    (MAX_SUB_SCORE - (distance_km / radius_km * MAX_SUB_SCORE)).max(0.0)
}

// Busy and unavailable score the same.
fn availability_score(availability: Availability) -> f64 {
    match availability {
        Availability::Available => MAX_SUB_SCORE,
        Availability::Busy | Availability::Unavailable => 50.0,
    }
}

fn workload_score(active_jobs: u32) -> f64 {
    (MAX_SUB_SCORE - f64::from(active_jobs) * POINTS_PER_ACTIVE_JOB).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::{compute_score, weighted_score};
    use crate::models::installer::Availability;

    #[test]
    fn closer_installer_gets_higher_score_when_other_factors_match() {
        let (near, _) = compute_score(1.0, 50.0, Availability::Available, 0);
        let (far, _) = compute_score(40.0, 50.0, Availability::Available, 0);

        assert!(near > far);
    }

    #[test]
    fn distance_score_reaches_zero_at_radius() {
        let (_, breakdown) = compute_score(50.0, 50.0, Availability::Available, 0);
        assert_eq!(breakdown.distance_score, 0.0);

        let (_, origin) = compute_score(0.0, 50.0, Availability::Available, 0);
        assert_eq!(origin.distance_score, 100.0);
    }

    #[test]
    fn busy_and_unavailable_score_the_same() {
        let (_, busy) = compute_score(5.0, 50.0, Availability::Busy, 0);
        let (_, unavailable) = compute_score(5.0, 50.0, Availability::Unavailable, 0);
        let (_, available) = compute_score(5.0, 50.0, Availability::Available, 0);

        assert_eq!(busy.availability_score, 50.0);
        assert_eq!(unavailable.availability_score, 50.0);
        assert_eq!(available.availability_score, 100.0);
    }

    #[test]
    fn each_active_job_costs_ten_points() {
        let (_, breakdown) = compute_score(5.0, 50.0, Availability::Available, 3);
        assert_eq!(breakdown.workload_score, 70.0);
    }

    #[test]
    fn workload_is_floored_at_zero() {
        let (_, breakdown) = compute_score(5.0, 50.0, Availability::Available, 11);
        assert_eq!(breakdown.workload_score, 0.0);
    }

    #[test]
    fn total_is_the_weighted_sum() {
        let (total, breakdown) = compute_score(12.5, 50.0, Availability::Busy, 2);

        let expected = 0.4 * breakdown.distance_score
            + 0.3 * breakdown.availability_score
            + 0.3 * breakdown.workload_score;
        assert!((total - expected).abs() < 1e-9);
        assert!((weighted_score(&breakdown) - total).abs() < 1e-9);
        // 0.4 * 75 + 0.3 * 50 + 0.3 * 80
        assert!((total - 69.0).abs() < 1e-9);
    }
}
