use serde::{Deserialize, Serialize};

/// RGBA color tuple (red, green, blue, alpha) with values in 0.0..=1.0.
pub type Rgba = (f32, f32, f32, f32);

/// Settings of the interactive window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub title: String,
    /// Maximum window size in pixels; `None` lets the windowing library decide.
    pub window_size: Option<(u32, u32)>,
    pub background: Rgba,
    /// Color of the triangle edges drawn over every surface; `None` hides them.
    pub edge_color: Option<Rgba>,
    /// Edge cylinder radius relative to the scene radius.
    pub edge_radius_factor: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "clothview".to_string(),
            window_size: None,
            background: (0.9, 0.9, 0.9, 1.0),
            edge_color: Some((0.1, 0.1, 0.1, 1.0)),
            edge_radius_factor: 0.0015,
        }
    }
}

/// Configuration for Rerun recording sessions.
///
/// Controls the application id, entity paths and default colors/sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerunConfig {
    // Labels
    pub session_name: String,
    pub entity_prefix: String,

    // Drawing defaults
    pub face_color: Rgba,
    pub edge_color: Rgba,
    pub edge_radius: f32,
    pub collider_color: Rgba,
}

impl RerunConfig {
    pub fn new() -> Self {
        Self {
            session_name: "clothview".to_string(),
            entity_prefix: "clothview".to_string(),

            face_color: (1.0, 0.6, 0.2, 1.0),
            edge_color: (0.0, 0.0, 0.0, 0.5),
            edge_radius: 0.002,
            collider_color: (0.3, 0.3, 1.0, 0.4),
        }
    }
}

impl Default for RerunConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.window_size, None);
        assert!(config.edge_color.is_some());

        let rerun = RerunConfig::default();
        assert_eq!(rerun.session_name, "clothview");
        assert_eq!(rerun.entity_prefix, "clothview");
    }

    #[test]
    fn test_partial_json() -> anyhow::Result<()> {
        let config: ViewerConfig =
            serde_json::from_str(r#"{ "title": "bunny", "window_size": [400, 300] }"#)?;
        assert_eq!(config.title, "bunny");
        assert_eq!(config.window_size, Some((400, 300)));
        assert_eq!(config.background, ViewerConfig::default().background);
        Ok(())
    }
}
