use std::path::{Path, PathBuf};

use bitflags::bitflags;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MAX_CASCADES: usize = 4;

/// Startup configuration, read once from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub projection: ProjectionSettings,
    pub scene: SceneSettings,
    pub skybox: SkyboxSettings,
    #[serde(default)]
    pub lighting: LightingSettings,
    #[serde(default)]
    pub shadows: ShadowSettings,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub debug: DebugSettings,
}

impl AppConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(path, &contents)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// `origin` is only used for diagnostics.
    pub fn from_json_str(origin: &Path, contents: &str) -> Result<Self, ConfigError> {
        let parse_error = |source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        };

        let value: serde_json::Value = serde_json::from_str(contents).map_err(parse_error)?;
        for (section, field) in [("scene", "directory"), ("skybox", "faces")] {
            if value.get(section).and_then(|s| s.get(field)).is_none() {
                return Err(ConfigError::MissingField {
                    path: origin.to_path_buf(),
                    field: if section == "scene" {
                        "scene.directory"
                    } else {
                        "skybox.faces"
                    },
                });
            }
        }

        let config: AppConfig = serde_json::from_value(value).map_err(parse_error)?;
        Ok(config.validate())
    }

    fn validate(mut self) -> Self {
        self.window = self.window.validate();
        self.camera = self.camera.validate();
        self.projection = self.projection.validate();
        self.scene = self.scene.validate();
        self.lighting = self.lighting.validate();
        self.shadows = self.shadows.validate();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSettings {
    #[serde(default = "WindowSettings::default_title")]
    pub title: String,
    #[serde(default = "WindowSettings::default_width")]
    pub width: u32,
    #[serde(default = "WindowSettings::default_height")]
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            width: Self::default_width(),
            height: Self::default_height(),
        }
    }
}

impl WindowSettings {
    fn validate(mut self) -> Self {
        if self.width == 0 || self.height == 0 {
            warn!("Window size must be greater than zero. Using default size.");
            self.width = Self::default_width();
            self.height = Self::default_height();
        }
        self
    }

    fn default_title() -> String {
        "wgpu temple".to_string()
    }

    const fn default_width() -> u32 {
        1280
    }

    const fn default_height() -> u32 {
        720
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    #[serde(default = "CameraSettings::default_position")]
    pub position: [f32; 3],
    #[serde(default = "CameraSettings::default_yaw_degrees")]
    pub yaw_degrees: f32,
    #[serde(default)]
    pub pitch_degrees: f32,
    #[serde(default = "CameraSettings::default_speed")]
    pub speed: f32,
    #[serde(default = "CameraSettings::default_min_speed")]
    pub min_speed: f32,
    #[serde(default = "CameraSettings::default_max_speed")]
    pub max_speed: f32,
    #[serde(default = "CameraSettings::default_look_sensitivity")]
    pub look_sensitivity: f32,
    #[serde(default = "CameraSettings::default_scroll_factor")]
    pub scroll_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Self::default_position(),
            yaw_degrees: Self::default_yaw_degrees(),
            pitch_degrees: 0.0,
            speed: Self::default_speed(),
            min_speed: Self::default_min_speed(),
            max_speed: Self::default_max_speed(),
            look_sensitivity: Self::default_look_sensitivity(),
            scroll_factor: Self::default_scroll_factor(),
        }
    }
}

impl CameraSettings {
    fn validate(mut self) -> Self {
        if !self.position.iter().all(|v| v.is_finite()) {
            warn!("Camera position must be finite. Using default position.");
            self.position = Self::default_position();
        }

        if !self.yaw_degrees.is_finite() || !self.pitch_degrees.is_finite() {
            warn!("Camera orientation must be finite. Using default orientation.");
            self.yaw_degrees = Self::default_yaw_degrees();
            self.pitch_degrees = 0.0;
        }

        if !(self.min_speed > 0.0 && self.max_speed >= self.min_speed) {
            warn!(
                "Camera speed limits [{}, {}] are invalid. Using default limits.",
                self.min_speed, self.max_speed
            );
            self.min_speed = Self::default_min_speed();
            self.max_speed = Self::default_max_speed();
        }

        if !self.speed.is_finite() {
            warn!("Camera speed must be finite. Using default speed.");
            self.speed = Self::default_speed();
        }
        let clamped = self.speed.clamp(self.min_speed, self.max_speed);
        if clamped != self.speed {
            warn!(
                "Camera speed {} outside [{}, {}]. Clamping to {}.",
                self.speed, self.min_speed, self.max_speed, clamped
            );
            self.speed = clamped;
        }

        if !(self.look_sensitivity > 0.0 && self.look_sensitivity.is_finite()) {
            warn!("Look sensitivity must be positive. Using default value.");
            self.look_sensitivity = Self::default_look_sensitivity();
        }

        if !(self.scroll_factor > 0.0 && self.scroll_factor.is_finite()) {
            warn!("Scroll factor must be positive. Using default value.");
            self.scroll_factor = Self::default_scroll_factor();
        }

        self
    }

    const fn default_position() -> [f32; 3] {
        [0.0, 1.0, 3.0]
    }

    const fn default_yaw_degrees() -> f32 {
        -90.0
    }

    const fn default_speed() -> f32 {
        2.5
    }

    const fn default_min_speed() -> f32 {
        0.1
    }

    const fn default_max_speed() -> f32 {
        20.0
    }

    const fn default_look_sensitivity() -> f32 {
        0.005
    }

    const fn default_scroll_factor() -> f32 {
        50.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionSettings {
    #[serde(default = "ProjectionSettings::default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "ProjectionSettings::default_near")]
    pub near: f32,
    #[serde(default = "ProjectionSettings::default_far")]
    pub far: f32,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            fov_degrees: Self::default_fov_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
        }
    }
}

impl ProjectionSettings {
    fn validate(mut self) -> Self {
        if !(self.fov_degrees > 1.0 && self.fov_degrees < 179.0) {
            warn!(
                "Field of view {} is out of range. Using default value.",
                self.fov_degrees
            );
            self.fov_degrees = Self::default_fov_degrees();
        }

        if !(self.near > 0.0 && self.far > self.near && self.far.is_finite()) {
            warn!(
                "Clip planes near={} far={} are invalid. Using default planes.",
                self.near, self.far
            );
            self.near = Self::default_near();
            self.far = Self::default_far();
        }

        self
    }

    const fn default_fov_degrees() -> f32 {
        45.0
    }

    const fn default_near() -> f32 {
        0.1
    }

    const fn default_far() -> f32 {
        100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSettings {
    pub directory: PathBuf,
    #[serde(default = "SceneSettings::default_model_file")]
    pub model_file: String,
    #[serde(default = "SceneSettings::default_lights_file")]
    pub lights_file: String,
    #[serde(default = "SceneSettings::default_texture_extension")]
    pub texture_extension: String,
    #[serde(default = "SceneSettings::default_default_material")]
    pub default_material: String,
    #[serde(default = "SceneSettings::default_light_material")]
    pub light_material: String,
    #[serde(default = "SceneSettings::default_texture_size")]
    pub texture_size: u32,
}

impl SceneSettings {
    /// Settings for `directory` with every optional field at its default.
    pub fn with_directory<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
            model_file: Self::default_model_file(),
            lights_file: Self::default_lights_file(),
            texture_extension: Self::default_texture_extension(),
            default_material: Self::default_default_material(),
            light_material: Self::default_light_material(),
            texture_size: Self::default_texture_size(),
        }
    }

    fn validate(mut self) -> Self {
        if self.texture_size == 0 || self.texture_size > 4096 {
            warn!(
                "Texture size {} is out of range. Using default value.",
                self.texture_size
            );
            self.texture_size = Self::default_texture_size();
        }

        if self.model_file.is_empty() {
            warn!("Model file name is empty. Using default name.");
            self.model_file = Self::default_model_file();
        }

        if self.default_material.is_empty() {
            warn!("Default material name is empty. Using default name.");
            self.default_material = Self::default_default_material();
        }

        self
    }

    fn default_model_file() -> String {
        "model.gltf".to_string()
    }

    fn default_lights_file() -> String {
        "lights.gltf".to_string()
    }

    fn default_texture_extension() -> String {
        "png".to_string()
    }

    fn default_default_material() -> String {
        "DefaultMaterial".to_string()
    }

    fn default_light_material() -> String {
        "light_source".to_string()
    }

    const fn default_texture_size() -> u32 {
        128
    }
}

/// Cube faces in `+X, -X, +Y, -Y, +Z, -Z` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkyboxSettings {
    pub faces: [PathBuf; 6],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightingSettings {
    /// Points toward the light.
    #[serde(default = "LightingSettings::default_direction")]
    pub direction: [f32; 3],
    #[serde(default = "LightingSettings::default_color")]
    pub color: [f32; 3],
    #[serde(default = "LightingSettings::default_intensity")]
    pub intensity: f32,
    #[serde(default = "LightingSettings::default_ambient")]
    pub ambient: f32,
    #[serde(default = "LightingSettings::default_point_color")]
    pub point_color: [f32; 3],
    #[serde(default = "LightingSettings::default_point_intensity")]
    pub point_intensity: f32,
    #[serde(default = "LightingSettings::default_point_range")]
    pub point_range: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            direction: Self::default_direction(),
            color: Self::default_color(),
            intensity: Self::default_intensity(),
            ambient: Self::default_ambient(),
            point_color: Self::default_point_color(),
            point_intensity: Self::default_point_intensity(),
            point_range: Self::default_point_range(),
        }
    }
}

impl LightingSettings {
    fn validate(mut self) -> Self {
        let direction = glam::Vec3::from(self.direction);
        if !direction.is_finite() || direction.length_squared() < 1e-8 {
            warn!("Light direction must be a non-zero vector. Using default direction.");
            self.direction = Self::default_direction();
        }

        if !(self.intensity >= 0.0 && self.intensity.is_finite()) {
            warn!("Light intensity must be non-negative. Using default value.");
            self.intensity = Self::default_intensity();
        }

        if !(0.0..=1.0).contains(&self.ambient) {
            warn!("Ambient term must lie in [0, 1]. Using default value.");
            self.ambient = Self::default_ambient();
        }

        if !(self.point_range > 0.0 && self.point_range.is_finite()) {
            warn!("Point light range must be positive. Using default value.");
            self.point_range = Self::default_point_range();
        }

        self
    }

    const fn default_direction() -> [f32; 3] {
        [-0.3, 1.0, 0.4]
    }

    const fn default_color() -> [f32; 3] {
        [1.0, 0.96, 0.9]
    }

    const fn default_intensity() -> f32 {
        1.0
    }

    const fn default_ambient() -> f32 {
        0.08
    }

    const fn default_point_color() -> [f32; 3] {
        [1.0, 0.7, 0.4]
    }

    const fn default_point_intensity() -> f32 {
        2.0
    }

    const fn default_point_range() -> f32 {
        6.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowSettings {
    #[serde(default = "ShadowSettings::default_cascade_count")]
    pub cascade_count: usize,
    #[serde(default = "ShadowSettings::default_map_size")]
    pub map_size: u32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            cascade_count: Self::default_cascade_count(),
            map_size: Self::default_map_size(),
        }
    }
}

impl ShadowSettings {
    fn validate(mut self) -> Self {
        if !(1..=MAX_CASCADES).contains(&self.cascade_count) {
            warn!(
                "Cascade count {} must lie in 1..={}. Using default value.",
                self.cascade_count, MAX_CASCADES
            );
            self.cascade_count = Self::default_cascade_count();
        }

        if self.map_size == 0 || !self.map_size.is_power_of_two() {
            warn!("Shadow map size must be a power of two. Using default value.");
            self.map_size = Self::default_map_size();
        }

        self
    }

    const fn default_cascade_count() -> usize {
        3
    }

    const fn default_map_size() -> u32 {
        2048
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub present_mode: PresentModeSetting,
}

impl RenderSettings {
    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let desired = self.present_mode.to_wgpu();
        if available.contains(&desired) {
            return desired;
        }

        warn!(
            "Requested present mode {:?} is not supported. Falling back to FIFO.",
            desired
        );

        if available.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            available
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeSetting {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
    AutoVsync,
    AutoNoVsync,
}

impl PresentModeSetting {
    fn to_wgpu(&self) -> wgpu::PresentMode {
        match self {
            PresentModeSetting::Fifo => wgpu::PresentMode::Fifo,
            PresentModeSetting::FifoRelaxed => wgpu::PresentMode::FifoRelaxed,
            PresentModeSetting::Immediate => wgpu::PresentMode::Immediate,
            PresentModeSetting::Mailbox => wgpu::PresentMode::Mailbox,
            PresentModeSetting::AutoVsync => wgpu::PresentMode::AutoVsync,
            PresentModeSetting::AutoNoVsync => wgpu::PresentMode::AutoNoVsync,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugSettings {
    #[serde(default)]
    pub light_markers: bool,
    #[serde(default)]
    pub cascade_colors: bool,
}

bitflags! {
    /// Debug visualisations forwarded to the shaders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugFlags: u32 {
        /// Overlay a billboard at every point light.
        const LIGHT_MARKERS = 1 << 0;
        /// Tint lit fragments by the cascade they sample.
        const CASCADE_COLORS = 1 << 1;
    }
}

impl DebugSettings {
    pub fn flags(&self) -> DebugFlags {
        let mut flags = DebugFlags::empty();
        flags.set(DebugFlags::LIGHT_MARKERS, self.light_markers);
        flags.set(DebugFlags::CASCADE_COLORS, self.cascade_colors);
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "scene": { "directory": "assets/temple" },
        "skybox": { "faces": ["px.png", "nx.png", "py.png", "ny.png", "pz.png", "nz.png"] }
    }"#;

    fn parse(json: &str) -> Result<AppConfig, ConfigError> {
        AppConfig::from_json_str(Path::new("test.json"), json)
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse(MINIMAL).unwrap();

        assert_eq!(config.scene.directory, PathBuf::from("assets/temple"));
        assert_eq!(config.scene.model_file, "model.gltf");
        assert_eq!(config.scene.texture_size, 128);
        assert_eq!(config.shadows.cascade_count, 3);
        assert_eq!(config.camera.look_sensitivity, 0.005);
        assert!(config.debug.flags().is_empty());
    }

    #[test]
    fn missing_scene_directory_is_fatal() {
        let json = r#"{
            "scene": {},
            "skybox": { "faces": ["a", "b", "c", "d", "e", "f"] }
        }"#;

        match parse(json) {
            Err(ConfigError::MissingField { field, .. }) => assert_eq!(field, "scene.directory"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_skybox_is_fatal() {
        let json = r#"{ "scene": { "directory": "x" } }"#;

        match parse(json) {
            Err(ConfigError::MissingField { field, .. }) => assert_eq!(field, "skybox.faces"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_fatal() {
        assert!(matches!(parse("{ not json"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let json = r#"{
            "camera": { "min_speed": 5.0, "max_speed": 1.0, "look_sensitivity": -1.0 },
            "projection": { "near": 10.0, "far": 1.0, "fov_degrees": 0.0 },
            "scene": { "directory": "x", "texture_size": 0 },
            "skybox": { "faces": ["a", "b", "c", "d", "e", "f"] },
            "shadows": { "cascade_count": 9, "map_size": 1000 }
        }"#;
        let config = parse(json).unwrap();
        let defaults_camera = CameraSettings::default();
        let defaults_projection = ProjectionSettings::default();

        assert_eq!(config.camera.min_speed, defaults_camera.min_speed);
        assert_eq!(config.camera.max_speed, defaults_camera.max_speed);
        assert_eq!(
            config.camera.look_sensitivity,
            defaults_camera.look_sensitivity
        );
        assert_eq!(config.projection.near, defaults_projection.near);
        assert_eq!(config.projection.far, defaults_projection.far);
        assert_eq!(
            config.projection.fov_degrees,
            defaults_projection.fov_degrees
        );
        assert_eq!(config.scene.texture_size, 128);
        assert_eq!(config.shadows.cascade_count, 3);
        assert_eq!(config.shadows.map_size, 2048);
    }

    #[test]
    fn speed_is_clamped_into_limits() {
        let json = r#"{
            "camera": { "speed": 100.0, "min_speed": 1.0, "max_speed": 10.0 },
            "scene": { "directory": "x" },
            "skybox": { "faces": ["a", "b", "c", "d", "e", "f"] }
        }"#;

        assert_eq!(parse(json).unwrap().camera.speed, 10.0);
    }

    #[test]
    fn debug_flags_follow_settings() {
        let settings = DebugSettings {
            light_markers: true,
            cascade_colors: false,
        };

        assert_eq!(settings.flags(), DebugFlags::LIGHT_MARKERS);
    }

    #[test]
    fn present_mode_falls_back_to_fifo_when_desired_missing() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
        };

        let available = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Immediate];

        assert_eq!(settings.present_mode(&available), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn present_mode_uses_first_available_when_fifo_missing() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
        };

        let available = [wgpu::PresentMode::Immediate];

        assert_eq!(
            settings.present_mode(&available),
            wgpu::PresentMode::Immediate
        );
    }
}
