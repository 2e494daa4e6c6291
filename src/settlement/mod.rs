pub mod deposits;
pub mod returns;
pub mod scheduler;

pub use scheduler::{MixerHandle, MixerScheduler, MixerTasks, ScheduleConfig};
