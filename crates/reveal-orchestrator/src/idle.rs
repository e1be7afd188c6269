// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Idle/attract controller.

```text
        idle timeout, not busy            attract max elapsed
Armed ─────────────────────────▶ Attract ───────────────────▶ Armed
  ▲  idle timeout, busy: re-arm     │ activity
  └─────────────────────────────────┘
suspend(): any ─▶ Suspended ─(activity/resume)─▶ Armed
disable(): any ─▶ Disabled (absorbing)
```

Each scheduled timer carries the generation it was armed under. Re-arming bumps
the generation and aborts the previous task, so a stale timer that still wakes
up finds a newer generation and does nothing.
*/

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::queue::BusySignal;
use crate::renderer::AttractOverlay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    Armed,
    Attract,
    Suspended,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleConfig {
    pub idle_timeout: Duration,
    pub attract_max: Duration,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(50),
            attract_max: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Idle,
    AttractMax,
}

struct IdleCore {
    state: IdleState,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct IdleInner {
    config: IdleConfig,
    busy: Arc<dyn BusySignal>,
    overlay: Arc<dyn AttractOverlay>,
    core: Mutex<IdleCore>,
}

/// Cheap to clone; all clones drive the same state machine
#[derive(Clone)]
pub struct IdleController {
    inner: Arc<IdleInner>,
}

impl std::fmt::Debug for IdleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleController")
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl IdleController {
    /// Starts in `Armed` without a running timer; call [`notify_activity`] to arm.
    ///
    /// [`notify_activity`]: IdleController::notify_activity
    pub fn new(config: IdleConfig, busy: Arc<dyn BusySignal>, overlay: Arc<dyn AttractOverlay>) -> Self {
        Self {
            inner: Arc::new(IdleInner {
                config,
                busy,
                overlay,
                core: Mutex::new(IdleCore {
                    state: IdleState::Armed,
                    generation: 0,
                    timer: None,
                }),
            }),
        }
    }

    pub fn state(&self) -> IdleState {
        self.inner.core.lock().state
    }

    pub fn is_disabled(&self) -> bool {
        self.state() == IdleState::Disabled
    }

    /// User input or queue activity: hide attract and restart the idle countdown
    pub fn notify_activity(&self) {
        let action = {
            let mut core = self.inner.core.lock();
            if core.state == IdleState::Disabled {
                return;
            }
            let action = OverlayAction::hide_if(core.state);
            core.state = IdleState::Armed;
            IdleInner::schedule(&self.inner, &mut core, TimerKind::Idle);
            action
        };
        self.inner.apply(action);
    }

    /// Presentation hidden: stop all timers until the next activity or [`resume`].
    ///
    /// [`resume`]: IdleController::resume
    pub fn suspend(&self) {
        let action = {
            let mut core = self.inner.core.lock();
            if core.state == IdleState::Disabled {
                return;
            }
            let action = OverlayAction::hide_if(core.state);
            IdleInner::cancel(&mut core);
            core.state = IdleState::Suspended;
            action
        };
        debug!(target: "reveal-orchestrator", "Idle controller suspended");
        self.inner.apply(action);
    }

    pub fn resume(&self) {
        if self.state() == IdleState::Suspended {
            self.notify_activity();
        }
    }

    /// One-way: nothing re-arms the controller afterwards
    pub fn disable(&self) {
        let action = {
            let mut core = self.inner.core.lock();
            if core.state == IdleState::Disabled {
                return;
            }
            let action = OverlayAction::hide_if(core.state);
            IdleInner::cancel(&mut core);
            core.state = IdleState::Disabled;
            action
        };
        info!(target: "reveal-orchestrator", "Idle/attract disabled");
        self.inner.apply(action);
    }
}

/// Overlay change decided under the core lock and applied after releasing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverlayAction {
    Show,
    Hide,
}

impl OverlayAction {
    fn hide_if(state: IdleState) -> Option<Self> {
        (state == IdleState::Attract).then_some(OverlayAction::Hide)
    }
}

impl IdleInner {
    fn apply(&self, action: Option<OverlayAction>) {
        match action {
            Some(OverlayAction::Show) => self.overlay.show(),
            Some(OverlayAction::Hide) => self.overlay.hide(),
            None => {}
        }
    }

    fn cancel(core: &mut IdleCore) {
        core.generation = core.generation.wrapping_add(1);
        if let Some(handle) = core.timer.take() {
            handle.abort();
        }
    }

    fn schedule(this: &Arc<Self>, core: &mut IdleCore, kind: TimerKind) {
        Self::cancel(core);
        let generation = core.generation;
        let delay = match kind {
            TimerKind::Idle => this.config.idle_timeout,
            TimerKind::AttractMax => this.config.attract_max,
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(target: "reveal-orchestrator", "No tokio runtime, idle timer not armed");
            return;
        };

        let weak: Weak<Self> = Arc::downgrade(this);
        core.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire(generation, kind);
            }
        }));
    }

    fn fire(self: Arc<Self>, generation: u64, kind: TimerKind) {
        let action = {
            let mut core = self.core.lock();
            if core.generation != generation {
                return;
            }
            // The firing task is the stored handle; drop it without aborting ourselves
            core.timer = None;

            match (core.state, kind) {
                (IdleState::Armed, TimerKind::Idle) => {
                    if self.busy.is_busy() {
                        debug!(target: "reveal-orchestrator", "Idle timer fired while busy, re-arming");
                        Self::schedule(&self, &mut core, TimerKind::Idle);
                        None
                    } else {
                        info!(target: "reveal-orchestrator", "Idle: showing attract overlay");
                        core.state = IdleState::Attract;
                        Self::schedule(&self, &mut core, TimerKind::AttractMax);
                        Some(OverlayAction::Show)
                    }
                }
                (IdleState::Attract, TimerKind::AttractMax) => {
                    debug!(target: "reveal-orchestrator", "Attract max on-screen time reached");
                    core.state = IdleState::Armed;
                    Self::schedule(&self, &mut core, TimerKind::Idle);
                    Some(OverlayAction::Hide)
                }
                _ => None,
            }
        };
        self.apply(action);
    }
}
