//! River water: the wave field and the per-frame surface updater.

mod surface;
mod waves;

pub use surface::{
    background_swell, bank_distance, bank_fade, channel_dip, pier_disturbance, pier_intensity,
    smoothstep, RestSample, RestSnapshot, SurfaceUpdate, SurfaceUpdater, WATER_SURFACE_NAME,
};
pub use waves::{
    WaveConfigError, WaveField, WaveTrain, WaveTrainSpec, RIVER_WAVES, WAVE_TRAIN_COUNT,
};
