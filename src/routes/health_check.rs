//! Liveness probe, unchanged in shape from the teacher's own trivial 200.

use crate::response::ApiResponse;

#[tracing::instrument(name = "health check")]
pub async fn health_check() -> ApiResponse<()> {
    ApiResponse::success(())
}
