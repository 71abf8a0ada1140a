use serde::{Deserialize, Serialize};

// GET /health response format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub clients: usize, // dispensers currently tracked
    pub served: u64,
    pub rejected: u64,
}
