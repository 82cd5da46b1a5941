//! Command-line argument parsing.

use anyhow::{Context, Result};
use clap::Parser;

use crate::interaction::SceneState;
use crate::params::{RecordingConfig, TimeOfDay, WaterParams, CAMERA_VIEWS};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Stonebridge")]
#[command(about = "Procedural stone-bridge river diorama", long_about = None)]
pub struct Args {
    /// Initial camera view (1-6)
    #[arg(long, value_name = "VIEW", default_value_t = 1,
          value_parser = clap::value_parser!(u8).range(1..=6))]
    pub view: u8,

    /// Lighting preset: day, sunset, night
    #[arg(long, value_name = "PRESET", default_value = "day")]
    pub time_of_day: String,

    /// Start with distance fog disabled
    #[arg(long)]
    pub no_fog: bool,

    /// Start with the water frozen
    #[arg(long)]
    pub paused: bool,

    /// Water surface segments along each axis
    #[arg(long, value_name = "N", default_value_t = 200)]
    pub water_segments: u32,

    /// Record frames to PNG (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,

    /// Seed for procedural scatter and textures
    #[arg(long, default_value_t = 7)]
    pub seed: u64,
}

impl Args {
    /// Zero-based index into the camera views
    pub fn view_index(&self) -> usize {
        (self.view as usize - 1).min(CAMERA_VIEWS.len() - 1)
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::parse(&self.time_of_day).unwrap_or_else(|| {
            log::warn!("Unknown time of day '{}', using day", self.time_of_day);
            TimeOfDay::Day
        })
    }

    /// Initial toggles as given on the command line
    pub fn scene_state(&self) -> SceneState {
        SceneState {
            time_of_day: self.time_of_day(),
            water_flowing: !self.paused,
            fog_enabled: !self.no_fog,
        }
    }

    pub fn water_params(&self) -> WaterParams {
        WaterParams::default().with_segments(self.water_segments)
    }

    /// Create recording configuration if recording mode is enabled
    pub fn create_recording_config(&self) -> Result<Option<RecordingConfig>> {
        let Some(duration) = self.record else {
            return Ok(None);
        };
        let config = RecordingConfig::new(duration);

        std::fs::create_dir_all(config.frames_dir())
            .with_context(|| format!("failed to create {}", config.frames_dir()))?;

        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["stonebridge"]);
        assert_eq!(args.view_index(), 0);
        assert_eq!(args.water_params().width_segments, 200);
        assert!(args.record.is_none());

        let state = args.scene_state();
        assert_eq!(state.time_of_day, TimeOfDay::Day);
        assert!(state.water_flowing);
        assert!(state.fog_enabled);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "stonebridge",
            "--view",
            "6",
            "--time-of-day",
            "night",
            "--no-fog",
            "--paused",
            "--water-segments",
            "64",
        ]);
        assert_eq!(args.view_index(), 5);
        assert_eq!(args.water_params().length_segments, 64);

        let state = args.scene_state();
        assert_eq!(state.time_of_day, TimeOfDay::Night);
        assert!(!state.water_flowing);
        assert!(!state.fog_enabled);
    }

    #[test]
    fn test_view_out_of_range_rejected() {
        assert!(Args::try_parse_from(["stonebridge", "--view", "7"]).is_err());
        assert!(Args::try_parse_from(["stonebridge", "--view", "0"]).is_err());
    }

    #[test]
    fn test_unknown_time_of_day_falls_back() {
        let args = Args::parse_from(["stonebridge", "--time-of-day", "dusk"]);
        assert_eq!(args.time_of_day(), TimeOfDay::Day);
    }
}
