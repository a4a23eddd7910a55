use rand::seq::SliceRandom;
use uuid::Uuid;

/// Fallback when a palette is configured empty
const FALLBACK_COLOR: &str = "#3B82F6";

/// Fresh opaque id for a task or project.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Pick a random color from `palette`.
pub fn generate_color(palette: &[String]) -> String {
    palette
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| FALLBACK_COLOR.to_string())
}
