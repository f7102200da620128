pub mod background;
pub mod clock;
pub mod plugin;
pub mod scheduler;
pub mod tween;

pub use clock::SystemClock;
pub use plugin::Plugin;
pub use scheduler::{Scheduler, SchedulerHandle};
