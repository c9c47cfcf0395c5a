//! Request timing collector.
//!
//! One [`Profiler`] is created at startup and shared by the services that time
//! their list paths. A background task calls [`Profiler::flush`] periodically,
//! which logs an average per key and resets the counters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileKey {
    GetHospitals,
    GetMoonlights,
    GetSurveySummary,
}

impl ProfileKey {
    pub const ALL: [ProfileKey; 3] = [
        ProfileKey::GetHospitals,
        ProfileKey::GetMoonlights,
        ProfileKey::GetSurveySummary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileKey::GetHospitals => "get_hospitals",
            ProfileKey::GetMoonlights => "get_moonlights",
            ProfileKey::GetSurveySummary => "get_survey_summary",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileData {
    pub count: u64,
    pub total: Duration,
}

impl ProfileData {
    pub fn average_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / self.count as f64
        }
    }
}

#[derive(Debug)]
pub struct Profiler {
    data: Mutex<HashMap<ProfileKey, ProfileData>>,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(
                ProfileKey::ALL
                    .into_iter()
                    .map(|k| (k, ProfileData::default()))
                    .collect(),
            ),
        }
    }

    // A panic while holding the lock leaves plain counters behind, which are
    // still safe to read and reset.
    fn lock(&self) -> MutexGuard<'_, HashMap<ProfileKey, ProfileData>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, key: ProfileKey, elapsed: Duration) {
        let mut data = self.lock();
        let entry = data.entry(key).or_default();
        entry.count += 1;
        entry.total += elapsed;
    }

    pub fn record_since(&self, key: ProfileKey, begin: Instant) {
        self.record(key, begin.elapsed());
    }

    pub fn snapshot(&self) -> Vec<(ProfileKey, ProfileData)> {
        let mut out: Vec<_> = self.lock().iter().map(|(k, d)| (*k, *d)).collect();
        out.sort_by_key(|(k, _)| *k);
        out
    }

    /// Logs one summary line per key and resets every counter.
    pub fn flush(&self) -> Vec<(ProfileKey, ProfileData)> {
        let mut data = self.lock();
        let mut drained: Vec<_> = data
            .iter_mut()
            .map(|(k, d)| (*k, std::mem::take(d)))
            .collect();
        drop(data);

        drained.sort_by_key(|(k, _)| *k);
        for (key, d) in &drained {
            tracing::info!(
                "profiling summary key={} count={} avg_ms={:.3}",
                key.as_str(),
                d.count,
                d.average_ms()
            );
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn records_accumulate_until_flushed() {
        let p = Profiler::new();
        p.record(ProfileKey::GetHospitals, Duration::from_millis(10));
        p.record(ProfileKey::GetHospitals, Duration::from_millis(30));

        let snap = p.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[0].0, ProfileKey::GetHospitals);
        assert_eq!(snap[0].1.count, 2);
        assert!((snap[0].1.average_ms() - 20.0).abs() < 1e-9);

        let flushed = p.flush();
        assert_eq!(flushed[0].1.count, 2);
        assert!(p.snapshot().iter().all(|(_, d)| d.count == 0));
    }

    #[test]
    fn empty_key_averages_zero() {
        assert_eq!(ProfileData::default().average_ms(), 0.0);
        assert_eq!(ProfileKey::GetSurveySummary.as_str(), "get_survey_summary");
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let p = Arc::new(Profiler::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let p = Arc::clone(&p);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        p.record(ProfileKey::GetMoonlights, Duration::from_millis(1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snap = p.snapshot();
        let moon = snap.iter().find(|(k, _)| *k == ProfileKey::GetMoonlights).unwrap();
        assert_eq!(moon.1.count, 800);
    }
}
