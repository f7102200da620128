/// Frame scheduler: decides when to redraw, runs the background crossfade
/// and calls plugins once per frame.
use anyhow::Context;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::core::clock::Clock;
use crate::core::plugin::Plugin;
use crate::core::tween::Tween;
use crate::render::color::BLACK;
use crate::render::{Anchor, RenderError, Renderer, TextStyle};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("redraw loop has stopped after a render failure")]
    Halted,
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Background image and its fade, always swapped together.
struct Backdrop {
    image: Option<Arc<RgbImage>>,
    fade: Tween,
    /// Set once a background has been supplied
    begun: bool,
    /// Brightness the background was last drawn at
    shown: f32,
}

impl Backdrop {
    fn empty(config: &SchedulerConfig, now: Instant) -> Self {
        Self {
            image: None,
            fade: Tween::new(config.fade_start, config.fade_end, config.fade_duration, now),
            begun: false,
            shown: config.fade_start,
        }
    }

    fn fading_in(image: Arc<RgbImage>, config: &SchedulerConfig, now: Instant) -> Self {
        Self {
            image: Some(image),
            fade: Tween::new(config.fade_start, config.fade_end, config.fade_duration, now),
            begun: true,
            shown: config.fade_start,
        }
    }

    /// True until the fade's end value has actually been drawn.
    fn animating(&self, now: Instant) -> bool {
        self.begun && !(self.fade.is_finished(now) && self.shown == self.fade.end())
    }
}

/// Everything a redraw touches; only ever used under `Shared::frame`.
struct Frame {
    renderer: Renderer,
    backdrop: Backdrop,
    plugins: Vec<Box<dyn Plugin>>,
    last_clock: String,
}

impl Frame {
    fn redraw(&mut self, clock: &dyn Clock) -> Result<(), RenderError> {
        let brightness = self.backdrop.fade.current(clock.now());
        self.backdrop.shown = brightness;
        match &self.backdrop.image {
            Some(image) => self.renderer.draw_image(image, brightness)?,
            None => self.renderer.clear(BLACK),
        }

        self.renderer.draw_string(
            &clock.clock_text(),
            &TextStyle::anchored(Anchor::TOP | Anchor::LEFT),
        )?;

        for plugin in &mut self.plugins {
            plugin.update(&mut self.renderer);
        }

        self.renderer.render()
    }
}

struct Shared {
    frame: Mutex<Frame>,
    wake: Notify,
    shutdown: AtomicBool,
    /// Set when the loop exits on a render error
    halted: AtomicBool,
    halt: Notify,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl Shared {
    fn lock_frame(&self) -> MutexGuard<'_, Frame> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }
}

/// Cloneable handle for code that needs to swap the background from
/// elsewhere, e.g. a network callback.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Replace the background, restart the crossfade and redraw before
    /// returning. Does nothing once shutdown has begun, and fails once the
    /// loop has halted.
    pub fn set_background(&self, image: RgbImage) -> Result<(), SchedulerError> {
        let shared = &self.shared;
        {
            let mut frame = shared.lock_frame();
            if shared.is_shutting_down() {
                debug!("Ignoring background after shutdown");
                return Ok(());
            }
            if shared.is_halted() {
                return Err(SchedulerError::Halted);
            }

            info!("New background {}x{}", image.width(), image.height());
            frame.backdrop =
                Backdrop::fading_in(Arc::new(image), &shared.config, shared.clock.now());
            frame.redraw(shared.clock.as_ref())?;
        }
        shared.wake.notify_one();
        Ok(())
    }
}

pub struct Scheduler {
    handle: SchedulerHandle,
    task: JoinHandle<Result<(), RenderError>>,
}

impl Scheduler {
    /// Take ownership of the renderer and start the redraw loop on the
    /// current tokio runtime.
    pub fn start(renderer: Renderer, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        let backdrop = Backdrop::empty(&config, clock.now());
        let shared = Arc::new(Shared {
            frame: Mutex::new(Frame {
                renderer,
                backdrop,
                plugins: Vec::new(),
                last_clock: String::new(),
            }),
            wake: Notify::new(),
            shutdown: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            halt: Notify::new(),
            clock,
            config,
        });

        info!(
            "Starting scheduler: idle timeout {:?}, fade {} -> {} over {:?}",
            shared.config.idle_timeout,
            shared.config.fade_start,
            shared.config.fade_end,
            shared.config.fade_duration
        );

        let task = tokio::spawn(run(Arc::clone(&shared)));
        Self {
            handle: SchedulerHandle { shared },
            task,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Resolves once the loop has halted on a render error. Never resolves
    /// for a loop that keeps running or is shut down cleanly.
    pub async fn halted(&self) {
        let shared = &self.handle.shared;
        loop {
            // registered before the flag check so a halt in between is not lost
            let notified = shared.halt.notified();
            if shared.is_halted() {
                return;
            }
            notified.await;
        }
    }

    /// Register a plugin and run its setup. Plugins are updated in the order
    /// they were added; a plugin whose setup fails is not registered.
    pub fn add_plugin(&self, mut plugin: Box<dyn Plugin>) -> anyhow::Result<()> {
        let mut frame = self.handle.shared.lock_frame();
        plugin
            .setup(&self.handle, &mut frame.renderer)
            .with_context(|| format!("Failed to set up plugin {}", plugin.name()))?;

        info!("Registered plugin {}", plugin.name());
        frame.plugins.push(plugin);
        Ok(())
    }

    /// Stop the loop and wait for it to exit. No redraw happens after this
    /// returns. Reports the error that stopped the loop early, if any.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        info!("Shutting down scheduler");
        let shared = &self.handle.shared;
        shared.shutdown.store(true, Ordering::SeqCst);
        shared.wake.notify_one();
        // wait out a set_background redraw that is already in flight
        drop(shared.lock_frame());

        self.task.await.context("Scheduler task panicked")??;
        info!("Scheduler stopped");
        Ok(())
    }
}

async fn run(shared: Arc<Shared>) -> Result<(), RenderError> {
    loop {
        if shared.is_shutting_down() {
            debug!("Scheduler loop exiting");
            return Ok(());
        }

        let idle = {
            let mut frame = shared.lock_frame();
            if shared.is_shutting_down() {
                continue;
            }

            let text = shared.clock.clock_text();
            let outcome = if text != frame.last_clock {
                debug!("Clock changed to {}", text);
                frame.last_clock = text;
                frame.redraw(shared.clock.as_ref())
            } else if frame.backdrop.animating(shared.clock.now()) {
                frame.redraw(shared.clock.as_ref())
            } else {
                Ok(())
            };

            if let Err(e) = outcome {
                error!("Redraw failed, stopping scheduler: {}", e);
                shared.halted.store(true, Ordering::SeqCst);
                shared.halt.notify_waiters();
                return Err(e);
            }

            !frame.backdrop.animating(shared.clock.now())
        };

        let wait = if idle {
            shared.config.idle_timeout
        } else {
            shared.config.frame_interval()
        };
        // either a wake-up or the timeout, both just re-check
        let _ = time::timeout(wait, shared.wake.notified()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BitmapFont;
    use crate::core::clock::testing::ManualClock;
    use crate::render::sink::testing::RecordingSink;
    use image::Rgb;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_config() -> SchedulerConfig {
        SchedulerConfig {
            idle_timeout: Duration::from_millis(10),
            fps: 200,
            ..SchedulerConfig::default()
        }
    }

    fn start(text: &str) -> (Scheduler, RecordingSink, Arc<ManualClock>) {
        let sink = RecordingSink::new(32, 32);
        let font = Arc::new(BitmapFont::builtin().unwrap());
        let renderer = Renderer::new(Box::new(sink.clone()), font, 1);
        let clock = Arc::new(ManualClock::new(text));
        let scheduler = Scheduler::start(renderer, clock.clone(), test_config());
        (scheduler, sink, clock)
    }

    async fn settle() {
        time::sleep(Duration::from_millis(60)).await;
    }

    #[tokio::test]
    async fn test_first_wake_draws_clock() {
        let (scheduler, sink, _clock) = start("9:41");
        settle().await;
        assert!(sink.presents() >= 1);
        // clock anchored top-left on a black frame is white
        assert_eq!(*sink.last_frame().get_pixel(1, 1), Rgb([255, 255, 255]));
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_without_changes() {
        let (scheduler, sink, _clock) = start("9:41");
        settle().await;
        let presents = sink.presents();
        settle().await;
        assert_eq!(sink.presents(), presents);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_clock_change_triggers_redraw() {
        let (scheduler, sink, clock) = start("9:41");
        settle().await;
        let presents = sink.presents();

        clock.set_text("9:42");
        settle().await;
        assert_eq!(sink.presents(), presents + 1);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_background_redraws_synchronously() {
        let (scheduler, sink, _clock) = start("9:41");
        let before = sink.presents();
        scheduler
            .handle()
            .set_background(RgbImage::from_pixel(8, 8, Rgb([255, 255, 255])))
            .unwrap();
        assert_eq!(sink.presents(), before + 1);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_crossfade_runs_then_idles() {
        let (scheduler, sink, clock) = start("9:41");
        scheduler
            .handle()
            .set_background(RgbImage::from_pixel(8, 8, Rgb([255, 255, 255])))
            .unwrap();
        // starts fully dark
        assert_eq!(*sink.last_frame().get_pixel(20, 20), Rgb([0, 0, 0]));

        settle().await;
        let during_fade = sink.presents();
        assert!(during_fade > 2, "only {during_fade} presents while fading");

        clock.advance(Duration::from_secs(2));
        settle().await;
        let after_fade = sink.presents();
        assert!(sink.last_frame().get_pixel(20, 20).0[0] >= 126);

        settle().await;
        assert_eq!(sink.presents(), after_fade);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_presents_after_shutdown() {
        let (scheduler, sink, _clock) = start("9:41");
        let handle = scheduler.handle();
        scheduler
            .handle()
            .set_background(RgbImage::from_pixel(8, 8, Rgb([90, 90, 90])))
            .unwrap();
        scheduler.shutdown().await.unwrap();

        let presents = sink.presents();
        handle
            .set_background(RgbImage::from_pixel(8, 8, Rgb([10, 10, 10])))
            .unwrap();
        settle().await;
        assert_eq!(sink.presents(), presents);
    }

    struct Stamp {
        color: Rgb<u8>,
        setups: Arc<AtomicUsize>,
        updates: Arc<AtomicUsize>,
    }

    impl Plugin for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        fn setup(&mut self, _: &SchedulerHandle, _: &mut Renderer) -> anyhow::Result<()> {
            self.setups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn update(&mut self, renderer: &mut Renderer) {
            self.updates.fetch_add(1, Ordering::SeqCst);
            renderer.set_pixel(31, 31, self.color).unwrap();
        }
    }

    fn stamp(color: Rgb<u8>, setups: &Arc<AtomicUsize>, updates: &Arc<AtomicUsize>) -> Box<Stamp> {
        Box::new(Stamp {
            color,
            setups: setups.clone(),
            updates: updates.clone(),
        })
    }

    #[tokio::test]
    async fn test_plugins_update_in_registration_order() {
        let (scheduler, sink, _clock) = start("9:41");
        let setups = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));
        scheduler
            .add_plugin(stamp(Rgb([255, 0, 0]), &setups, &updates))
            .unwrap();
        scheduler
            .add_plugin(stamp(Rgb([0, 0, 255]), &setups, &updates))
            .unwrap();
        assert_eq!(setups.load(Ordering::SeqCst), 2);

        scheduler
            .handle()
            .set_background(RgbImage::from_pixel(8, 8, Rgb([0, 0, 0])))
            .unwrap();
        assert!(updates.load(Ordering::SeqCst) >= 2);
        assert_eq!(*sink.last_frame().get_pixel(31, 31), Rgb([0, 0, 255]));
        scheduler.shutdown().await.unwrap();
    }

    struct Broken;

    impl Plugin for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn setup(&mut self, _: &SchedulerHandle, _: &mut Renderer) -> anyhow::Result<()> {
            anyhow::bail!("no data")
        }

        fn update(&mut self, _: &mut Renderer) {
            panic!("never registered");
        }
    }

    #[tokio::test]
    async fn test_failed_setup_is_not_registered() {
        let (scheduler, _sink, _clock) = start("9:41");
        assert!(scheduler.add_plugin(Box::new(Broken)).is_err());
        scheduler
            .handle()
            .set_background(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])))
            .unwrap();
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_halted_loop_rejects_backgrounds() {
        let (scheduler, sink, _clock) = start("9:4x");
        time::timeout(Duration::from_secs(1), scheduler.halted())
            .await
            .expect("loop should halt on the unknown glyph");

        let result = scheduler
            .handle()
            .set_background(RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])));
        assert!(matches!(result, Err(SchedulerError::Halted)));
        settle().await;
        assert_eq!(sink.presents(), 0);
        assert!(scheduler.shutdown().await.is_err());
    }

    #[tokio::test]
    async fn test_running_loop_is_not_halted() {
        let (scheduler, _sink, _clock) = start("9:41");
        assert!(
            time::timeout(Duration::from_millis(60), scheduler.halted())
                .await
                .is_err()
        );
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_render_error_stops_loop() {
        let (scheduler, sink, _clock) = start("9:4x");
        settle().await;
        assert_eq!(sink.presents(), 0);
        let err = scheduler.shutdown().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::UnknownGlyph('x'))
        ));
    }
}
