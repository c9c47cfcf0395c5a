use crate::dto::HealthRes;

/// Liveness reporting shared by every API surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Reports the service as alive.
    ///
    /// The check does not touch storage; a reachable process is a healthy one.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "moonlight is alive".into(),
        }
    }
}
