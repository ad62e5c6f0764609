mod launcher;
mod store;
mod types;

pub use launcher::{
    builtin_presets, find_preset, launch, launch_with_spawner, open_in_browser, plan_launch,
    resolve_presets, LaunchPlan, BROWSER_OPEN_DELAY,
};
pub use store::ProcessRegistry;
pub use types::{ProcessStatus, StopAllReport, StopOutcome, StopStatus, TrackedProcess};
