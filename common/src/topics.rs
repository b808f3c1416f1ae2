pub const DEFAULT_TOPIC_PREFIX: &str = "netatmo2mqtt/";
pub const DEFAULT_CLIENT_ID: &str = "netatmo2mqtt";

/// Lowercases a room name and turns every space into a hyphen.
pub fn slugify(name: &str) -> String {
    name.replace(' ', "-").to_lowercase()
}

pub fn room_topic(prefix: &str, slug: &str) -> String {
    format!("{prefix}{slug}")
}
