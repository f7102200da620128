use anyhow::Result;

use crate::core::scheduler::SchedulerHandle;
use crate::render::Renderer;

/// Something that draws on top of every frame.
pub trait Plugin: Send {
    fn name(&self) -> &str;

    /// Called once when the plugin is registered, with the frame lock held.
    /// Keep the handle for later `set_background` calls from other tasks;
    /// calling it from inside `setup` itself would deadlock.
    fn setup(&mut self, scheduler: &SchedulerHandle, renderer: &mut Renderer) -> Result<()>;

    /// Called once per redraw, after the background and clock are drawn.
    /// Draw failures are the plugin's to log; the frame carries on.
    fn update(&mut self, renderer: &mut Renderer);
}
