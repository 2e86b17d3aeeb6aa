//! # Client Loop
//!
//! One iteration: ask the server whether content changed, download and draw
//! it when it did, then sleep for as long as the server asked. Until the
//! first successful draw the registration screen stands in, so a fresh
//! device always shows its MAC address.
//!
//! No error escapes an iteration. Whatever fails is logged, the registration
//! screen is shown if nothing has been drawn yet, and the loop sleeps for the
//! default interval.

use crate::config::Config;
use crate::display::DisplayDriver;
use crate::error::{DisplayError, FetchError};
use crate::format;
use crate::identity::DeviceIdentity;
use crate::image::{MonoImage, Rotation};
use crate::protocol::{Poller, UpdateState};
use crate::registration;
use crate::transport::Transport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn, Instrument, Span};

/// Stop request shared between the signal handler and the loop.
///
/// A request never interrupts an iteration in progress; it only cuts the
/// following sleep short.
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolve once [`Shutdown::trigger`] has been called.
    pub async fn wait(&self) {
        while !self.is_triggered() {
            self.notify.notified().await;
        }
    }
}

pub struct Client<T, D> {
    poller: Poller<T>,
    display: D,
    identity: DeviceIdentity,
    state: UpdateState,
    first_run: bool,
    width: u32,
    height: u32,
    default_sleep: Duration,
    span: Span,
}

impl<T: Transport, D: DisplayDriver> Client<T, D> {
    pub fn new(
        poller: Poller<T>,
        display: D,
        identity: DeviceIdentity,
        config: &Config,
        span: Span,
    ) -> Self {
        Self {
            poller,
            display,
            identity,
            state: UpdateState::default(),
            first_run: true,
            width: config.display.width,
            height: config.display.height,
            default_sleep: Duration::from_secs(config.server.default_sleep_secs),
            span,
        }
    }

    pub fn state(&self) -> &UpdateState {
        &self.state
    }

    /// Run one iteration and return how long to sleep afterwards.
    pub async fn tick(&mut self) -> Duration {
        let span = self.span.clone();
        match self.iterate().instrument(span).await {
            Ok(sleep) => sleep,
            Err(e) => {
                let span = self.span.clone();
                let _entered = span.enter();
                error!("Error in main loop: {:#}", e);
                if self.first_run {
                    self.show_registration();
                    self.first_run = false;
                }
                self.default_sleep
            }
        }
    }

    async fn iterate(&mut self) -> anyhow::Result<Duration> {
        let check = self.poller.check_for_update(&mut self.state).await?;

        if check.needs_update {
            if let Err(e) = self.download_and_display(check.rotation).await {
                error!("Failed to download or display image: {}", e);
                if self.first_run {
                    self.show_registration();
                }
            }
            self.first_run = false;
        } else if self.first_run {
            info!("First run with no content yet, showing registration screen");
            self.show_registration();
            self.first_run = false;
        }

        info!("Sleeping for {} seconds", check.sleep_seconds);
        Ok(check.sleep())
    }

    /// Fetch, decode, orient and draw the current content.
    pub async fn download_and_display(&mut self, rotation: Rotation) -> Result<(), FetchError> {
        let payload = self.poller.fetch_payload().await?;
        let image = format::decode(&payload)?;
        info!("Decoded {}x{} image", image.width(), image.height());

        let image = image.rotated(rotation);
        if (image.width(), image.height()) != (self.width, self.height) {
            info!(
                "Resizing {}x{} to {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            );
        }
        let image = image.normalized(self.width, self.height);

        self.present(&image)?;
        info!("Display updated successfully");
        Ok(())
    }

    fn present(&mut self, image: &MonoImage) -> Result<(), DisplayError> {
        self.display.initialize()?;
        self.display.render(image)?;
        self.display.sleep()
    }

    /// Draw the registration screen; failures are logged and dropped.
    pub fn show_registration(&mut self) {
        info!("Showing registration screen for {}", self.identity.mac());
        let screen = registration::render(&self.identity, self.width, self.height);
        if let Err(e) = self.present(&screen) {
            warn!("Failed to show registration screen: {}", e);
        }
    }

    /// Loop until `shutdown` is triggered.
    pub async fn run(&mut self, shutdown: &Shutdown) {
        info!("ZivyObraz client started");
        while !shutdown.is_triggered() {
            let sleep = self.tick().await;
            if shutdown.is_triggered() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = shutdown.wait() => {}
            }
        }
        info!("Shutting down");
    }
}
