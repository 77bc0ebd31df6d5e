//! Installer recommendations for a job location.
//!
//! Candidates within the search radius are scored on distance, availability
//! and current workload, then ranked best first. Ranking is stable, so
//! candidates with equal scores keep the order they were supplied in.

use serde::Serialize;

use crate::engine::scoring::{compute_score, ScoreBreakdown};
use crate::geo::{haversine_km, GeoPoint};
use crate::models::installer::{Installer, JobCounts};

#[derive(Debug, Clone)]
pub struct Candidate {
    pub installer: Installer,
    pub job_counts: JobCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredInstaller {
    pub installer: Installer,
    pub job_counts: JobCounts,
    pub distance_km: f64,
    pub breakdown: ScoreBreakdown,
    pub total_score: f64,
    pub explanation: String,
}

/// Ranks `candidates` for a job at `origin`.
///
/// `radius_km` must already be validated as positive. Candidates without a
/// location, or farther away than the radius, are left out.
pub fn recommend(origin: &GeoPoint, radius_km: f64, candidates: Vec<Candidate>) -> Vec<ScoredInstaller> {
    let mut scored: Vec<ScoredInstaller> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let location = candidate.installer.location?;
            let distance_km = haversine_km(origin, &location);
            if distance_km > radius_km {
                return None;
            }

            let (total_score, breakdown) = compute_score(
                distance_km,
                radius_km,
                candidate.installer.availability,
                candidate.job_counts.active,
            );

            Some(ScoredInstaller {
                explanation: explain(&candidate, distance_km),
                installer: candidate.installer,
                job_counts: candidate.job_counts,
                distance_km,
                breakdown,
                total_score,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));

    for entry in &mut scored {
        entry.distance_km = round2(entry.distance_km);
        entry.total_score = round2(entry.total_score);
        entry.breakdown = ScoreBreakdown {
            distance_score: round2(entry.breakdown.distance_score),
            availability_score: round2(entry.breakdown.availability_score),
            workload_score: round2(entry.breakdown.workload_score),
        };
    }

    scored
}

fn explain(candidate: &Candidate, distance_km: f64) -> String {
    let active = candidate.job_counts.active;
    let jobs = if active == 1 { "job" } else { "jobs" };
    format!(
        "{distance_km:.2} km away, {}, {active} active {jobs}",
        candidate.installer.availability.as_str()
    )
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
