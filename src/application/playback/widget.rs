//! Audio Widget - 单个结果的多变体播放器
//!
//! 每个 widget 是一个独立的 actor：
//! - 同一时刻最多持有一个引擎实例，绑定到当前选中的变体
//! - 切换变体、替换变体列表或卸载时，先 pause 再 destroy 旧实例（错误忽略）
//! - 引擎事件是播放状态的唯一来源
//! - 开始播放时通过 `PlaybackArbiter` 广播，收到其他播放器的广播后自行暂停
//!
//! 每个引擎实例有自己的事件通道，替换实例时旧通道随之丢弃，
//! 旧实例的迟到事件不会影响新实例的状态。
//!
//! 当前实例放在句柄与 actor 共享的槽位中，丢弃句柄时可以同步释放。

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::arbiter::{ArbiterRegistration, PlaybackArbiter};
use crate::application::ports::{
    EngineError, EngineEvent, EngineEventReceiver, MediaEngine, MediaEngineFactory,
};
use crate::domain::playback::{format_clock, AudioVariant, PlayerId, StepDirection};

/// 播放器错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Player already unmounted")]
    Unmounted,

    #[error("No audio loaded")]
    NoActiveSession,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// 播放器状态快照
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub player: PlayerId,
    pub variants: Vec<AudioVariant>,
    pub selected: usize,
    pub ready: bool,
    pub playing: bool,
    pub elapsed_secs: f64,
    pub duration_secs: f64,
}

impl PlaybackSnapshot {
    fn idle(player: PlayerId, variants: Vec<AudioVariant>) -> Self {
        Self {
            player,
            variants,
            selected: 0,
            ready: false,
            playing: false,
            elapsed_secs: 0.0,
            duration_secs: 0.0,
        }
    }

    pub fn selected_variant(&self) -> Option<&AudioVariant> {
        self.variants.get(self.selected)
    }

    pub fn labels(&self) -> Vec<String> {
        self.variants.iter().map(AudioVariant::label).collect()
    }

    pub fn can_step_previous(&self) -> bool {
        self.selected > 0
    }

    pub fn can_step_next(&self) -> bool {
        self.selected + 1 < self.variants.len()
    }

    /// 当前变体的下载地址
    pub fn download_url(&self) -> Option<&str> {
        self.selected_variant().map(AudioVariant::locator)
    }

    /// `m:ss / m:ss`
    pub fn clock(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.elapsed_secs),
            format_clock(self.duration_secs)
        )
    }
}

enum WidgetCommand {
    Select {
        index: usize,
        reply: oneshot::Sender<bool>,
    },
    Step {
        direction: StepDirection,
        reply: oneshot::Sender<bool>,
    },
    TogglePlayback {
        reply: oneshot::Sender<Result<(), PlaybackError>>,
    },
    Seek {
        position_secs: f64,
        reply: oneshot::Sender<Result<(), PlaybackError>>,
    },
    SetVariants {
        variants: Vec<AudioVariant>,
        reply: oneshot::Sender<()>,
    },
    Unmount {
        reply: oneshot::Sender<()>,
    },
}

/// 当前引擎实例所在的槽位，句柄与 actor 共享
///
/// 锁只在同步代码中短暂持有，不跨越 await。
type SessionSlot = Arc<Mutex<Option<EngineSession>>>;

fn lock_slot(slot: &SessionSlot) -> MutexGuard<'_, Option<EngineSession>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// 播放器句柄
///
/// 丢弃句柄时在当前线程内立即暂停并销毁引擎；仲裁订阅随 actor 退出释放。
/// `unmount().await` 额外等待 actor 退出完成。
pub struct AudioWidget {
    player: PlayerId,
    commands: mpsc::UnboundedSender<WidgetCommand>,
    state: watch::Receiver<PlaybackSnapshot>,
    session: SessionSlot,
    worker: Option<JoinHandle<()>>,
}

impl AudioWidget {
    /// 挂载播放器
    ///
    /// 在返回前完成仲裁注册，变体列表非空时同步创建第一个变体的引擎。
    pub fn mount(
        variants: Vec<AudioVariant>,
        factory: Arc<dyn MediaEngineFactory>,
        arbiter: &PlaybackArbiter,
    ) -> Self {
        let registration = arbiter.register();
        let player = registration.player();
        let (state_tx, state_rx) = watch::channel(PlaybackSnapshot::idle(player, variants.clone()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let session: SessionSlot = Arc::new(Mutex::new(None));

        let mut actor = WidgetActor {
            factory,
            registration,
            variants,
            selected: 0,
            session: session.clone(),
            events: None,
            state: state_tx,
        };
        actor.open_session();

        tracing::debug!(player = %player, variants = actor.variants.len(), "Audio widget mounted");
        let worker = tokio::spawn(actor.run(command_rx));

        Self {
            player,
            commands: command_tx,
            state: state_rx,
            session,
            worker: Some(worker),
        }
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state.clone()
    }

    /// 切换到指定变体；越界返回 false 且不做任何改变
    pub async fn select(&self, index: usize) -> Result<bool, PlaybackError> {
        self.request(|reply| WidgetCommand::Select { index, reply })
            .await
    }

    /// 切换到上一个/下一个变体；到达边界时返回 false（不循环）
    pub async fn step(&self, direction: StepDirection) -> Result<bool, PlaybackError> {
        self.request(|reply| WidgetCommand::Step { direction, reply })
            .await
    }

    /// 播放/暂停切换，实际状态以引擎事件为准
    pub async fn toggle_playback(&self) -> Result<(), PlaybackError> {
        self.request(|reply| WidgetCommand::TogglePlayback { reply })
            .await?
    }

    pub async fn seek(&self, position_secs: f64) -> Result<(), PlaybackError> {
        self.request(|reply| WidgetCommand::Seek {
            position_secs,
            reply,
        })
        .await?
    }

    /// 替换变体列表
    pub async fn set_variants(&self, variants: Vec<AudioVariant>) -> Result<(), PlaybackError> {
        self.request(|reply| WidgetCommand::SetVariants { variants, reply })
            .await
    }

    /// 卸载：释放引擎并退出仲裁
    pub async fn unmount(mut self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(WidgetCommand::Unmount { reply }).is_ok() {
            let _ = done.await;
        }
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                tracing::warn!(player = %self.player, error = %e, "Audio widget task failed");
            }
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> WidgetCommand,
    ) -> Result<T, PlaybackError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| PlaybackError::Unmounted)?;
        response.await.map_err(|_| PlaybackError::Unmounted)
    }
}

impl Drop for AudioWidget {
    fn drop(&mut self) {
        let outgoing = lock_slot(&self.session).take();
        if outgoing.is_some() {
            tracing::debug!(player = %self.player, "Audio widget dropped, releasing engine");
        }
        drop(outgoing);
    }
}

/// 当前引擎实例及其播放状态
struct EngineSession {
    engine: Box<dyn MediaEngine>,
    ready: bool,
    playing: bool,
    elapsed_secs: f64,
    duration_secs: f64,
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if let Err(e) = self.engine.pause() {
            tracing::debug!(error = %e, "Pause before destroy failed");
        }
        if let Err(e) = self.engine.destroy() {
            tracing::debug!(error = %e, "Engine destroy failed");
        }
    }
}

struct WidgetActor {
    factory: Arc<dyn MediaEngineFactory>,
    registration: ArbiterRegistration,
    variants: Vec<AudioVariant>,
    selected: usize,
    session: SessionSlot,
    /// 当前实例的事件流，与槽位中的实例一一对应
    events: Option<EngineEventReceiver>,
    state: watch::Sender<PlaybackSnapshot>,
}

impl WidgetActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<WidgetCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(WidgetCommand::Unmount { reply }) => {
                        self.close_session();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = next_engine_event(&mut self.events) => {
                    if let Some(event) = event {
                        self.handle_engine_event(event);
                    }
                }
                other = self.registration.next_foreign_play() => match other {
                    Some(other) => self.yield_to(other),
                    None => {
                        tracing::debug!(player = %self.registration.player(), "Playback arbiter closed");
                        break;
                    }
                },
            }
        }

        self.close_session();
        tracing::debug!(player = %self.registration.player(), "Audio widget unmounted");
    }

    fn handle_command(&mut self, command: WidgetCommand) {
        match command {
            WidgetCommand::Select { index, reply } => {
                let _ = reply.send(self.select(index));
            }
            WidgetCommand::Step { direction, reply } => {
                let target = match direction {
                    StepDirection::Previous => self.selected.checked_sub(1),
                    StepDirection::Next => Some(self.selected + 1),
                };
                let moved = target.map(|index| self.select(index)).unwrap_or(false);
                let _ = reply.send(moved);
            }
            WidgetCommand::TogglePlayback { reply } => {
                let _ = reply.send(self.with_engine(|engine| engine.play_pause()));
            }
            WidgetCommand::Seek {
                position_secs,
                reply,
            } => {
                let _ = reply.send(self.with_engine(|engine| engine.seek_to(position_secs)));
            }
            WidgetCommand::SetVariants { variants, reply } => {
                self.set_variants(variants);
                let _ = reply.send(());
            }
            WidgetCommand::Unmount { reply } => {
                // run() 已处理，这里只为穷尽匹配
                let _ = reply.send(());
            }
        }
    }

    fn has_session(&self) -> bool {
        lock_slot(&self.session).is_some()
    }

    fn select(&mut self, index: usize) -> bool {
        if index >= self.variants.len() {
            return false;
        }
        if index != self.selected || !self.has_session() {
            self.selected = index;
            self.open_session();
        }
        true
    }

    fn set_variants(&mut self, variants: Vec<AudioVariant>) {
        let previous = self.current_locator().map(str::to_string);
        self.variants = variants;

        if self.variants.is_empty() {
            self.selected = 0;
            self.close_session();
            self.publish();
            return;
        }
        if self.selected >= self.variants.len() {
            self.selected = 0;
        }
        if !self.has_session() || self.current_locator() != previous.as_deref() {
            self.open_session();
        } else {
            self.publish();
        }
    }

    fn current_locator(&self) -> Option<&str> {
        self.variants.get(self.selected).map(AudioVariant::locator)
    }

    fn with_engine(
        &self,
        f: impl FnOnce(&mut dyn MediaEngine) -> Result<(), EngineError>,
    ) -> Result<(), PlaybackError> {
        let mut slot = lock_slot(&self.session);
        let session = slot.as_mut().ok_or(PlaybackError::NoActiveSession)?;
        f(session.engine.as_mut()).map_err(|e| {
            tracing::debug!(player = %self.registration.player(), error = %e, "Engine rejected command");
            PlaybackError::from(e)
        })
    }

    /// 为当前选中的变体创建新的引擎实例，旧实例先释放
    fn open_session(&mut self) {
        self.close_session();

        let Some(locator) = self.current_locator().map(str::to_string) else {
            self.publish();
            return;
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let engine = match self.factory.create(events_tx) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::warn!(player = %self.registration.player(), error = %e, "Failed to create engine");
                self.publish();
                return;
            }
        };

        let mut session = EngineSession {
            engine,
            ready: false,
            playing: false,
            elapsed_secs: 0.0,
            duration_secs: 0.0,
        };

        // 加载失败时保留实例，后续操作由引擎拒绝
        if let Err(e) = session.engine.load(&locator) {
            tracing::warn!(
                player = %self.registration.player(),
                locator = %locator,
                error = %e,
                "Failed to load audio"
            );
        }

        tracing::debug!(
            player = %self.registration.player(),
            variant = self.selected,
            locator = %locator,
            "Engine session opened"
        );
        *lock_slot(&self.session) = Some(session);
        self.events = Some(events_rx);
        self.publish();
    }

    fn close_session(&mut self) {
        self.events = None;
        // 先出锁再释放，销毁在锁外进行
        let outgoing = lock_slot(&self.session).take();
        if outgoing.is_some() {
            drop(outgoing);
            tracing::debug!(player = %self.registration.player(), "Engine session closed");
            self.publish();
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        let started = {
            let mut slot = lock_slot(&self.session);
            // 句柄已丢弃并释放了实例
            let Some(session) = slot.as_mut() else {
                return;
            };
            match event {
                EngineEvent::Ready { duration_secs } => {
                    session.ready = true;
                    session.duration_secs = duration_secs;
                    false
                }
                EngineEvent::Progress { position_secs } => {
                    session.elapsed_secs = position_secs;
                    false
                }
                // 播放结束不自动切换到下一个变体
                EngineEvent::Finished | EngineEvent::Paused => {
                    session.playing = false;
                    false
                }
                EngineEvent::PlayStarted => {
                    session.playing = true;
                    true
                }
            }
        };
        if started {
            self.registration.announce_playing();
        }
        self.publish();
    }

    /// 其他播放器开始播放：无条件暂停（pause 幂等）
    fn yield_to(&mut self, other: PlayerId) {
        let player = self.registration.player();
        let mut slot = lock_slot(&self.session);
        let Some(session) = slot.as_mut() else {
            return;
        };
        tracing::debug!(player = %player, other = %other, "Pausing for another player");
        if let Err(e) = session.engine.pause() {
            tracing::debug!(player = %player, error = %e, "Pause failed");
        }
    }

    fn publish(&self) {
        let mut snapshot =
            PlaybackSnapshot::idle(self.registration.player(), self.variants.clone());
        snapshot.selected = self.selected;
        if let Some(session) = lock_slot(&self.session).as_ref() {
            snapshot.ready = session.ready;
            snapshot.playing = session.playing;
            snapshot.elapsed_secs = session.elapsed_secs;
            snapshot.duration_secs = session.duration_secs;
        }
        self.state.send_replace(snapshot);
    }
}

/// 当前实例的下一个事件；没有实例或事件流已结束时永远挂起
async fn next_engine_event(events: &mut Option<EngineEventReceiver>) -> Option<EngineEvent> {
    let Some(receiver) = events.as_mut() else {
        return std::future::pending().await;
    };
    match receiver.recv().await {
        Some(event) => Some(event),
        None => {
            *events = None;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::{FakeEngineConfig, FakeMediaEngineFactory};
    use std::time::Duration;

    const A: &str = "http://localhost:8000/api/audio/a.wav";
    const B: &str = "http://localhost:8000/api/audio/b.wav";
    const C: &str = "http://localhost:8000/api/audio/c.wav";

    fn variants(locators: &[&str]) -> Vec<AudioVariant> {
        AudioVariant::from_locators(locators.iter().copied())
    }

    async fn wait_until(widget: &AudioWidget, predicate: impl FnMut(&PlaybackSnapshot) -> bool) {
        let mut rx = widget.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .expect("widget state did not converge")
            .expect("widget state channel closed");
    }

    async fn mount_ready(
        locators: &[&str],
        factory: &FakeMediaEngineFactory,
        arbiter: &PlaybackArbiter,
    ) -> AudioWidget {
        let widget = AudioWidget::mount(variants(locators), Arc::new(factory.clone()), arbiter);
        wait_until(&widget, |s| s.ready).await;
        widget
    }

    #[tokio::test]
    async fn test_mount_loads_first_variant() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A, B], &factory, &arbiter).await;

        let snapshot = widget.snapshot();
        assert_eq!(snapshot.selected, 0);
        assert_eq!(snapshot.download_url(), Some(A));
        assert_eq!(snapshot.duration_secs, 180.0);
        assert_eq!(snapshot.labels(), vec!["Variant 1", "Variant 2"]);
        assert_eq!(snapshot.clock(), "0:00 / 3:00");
        assert!(!snapshot.can_step_previous());
        assert!(snapshot.can_step_next());
        assert_eq!(factory.created_count(), 1);
        assert_eq!(factory.live_count(), 1);
    }

    #[tokio::test]
    async fn test_mount_without_variants_creates_no_engine() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = AudioWidget::mount(Vec::new(), Arc::new(factory.clone()), &arbiter);

        assert_eq!(factory.created_count(), 0);
        assert_eq!(
            widget.toggle_playback().await,
            Err(PlaybackError::NoActiveSession)
        );
        assert_eq!(widget.select(0).await, Ok(false));
    }

    #[tokio::test]
    async fn test_select_replaces_engine_once() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A, B], &factory, &arbiter).await;
        let first = factory.latest_for(A).unwrap();

        assert_eq!(widget.select(1).await, Ok(true));
        wait_until(&widget, |s| s.selected == 1 && s.ready).await;

        let old = factory.records()[0].clone();
        assert_eq!(old.instance_id, first.instance_id);
        assert!(old.destroyed);
        assert_eq!(old.destroy_calls, 1);
        assert_eq!(old.pause_calls, 1);
        assert_eq!(factory.latest_for(B).map(|r| r.destroyed), Some(false));
        assert_eq!(factory.live_count(), 1);

        // 选中当前变体不会重建实例
        assert_eq!(widget.select(1).await, Ok(true));
        assert_eq!(factory.created_count(), 2);

        widget.unmount().await;
        assert_eq!(factory.live_count(), 0);
        assert!(factory.records().iter().all(|r| r.destroy_calls == 1));
    }

    #[tokio::test]
    async fn test_out_of_range_select_is_ignored() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A, B], &factory, &arbiter).await;

        assert_eq!(widget.select(2).await, Ok(false));
        assert_eq!(widget.snapshot().selected, 0);
        assert_eq!(factory.created_count(), 1);
    }

    #[tokio::test]
    async fn test_step_stops_at_bounds() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A, B], &factory, &arbiter).await;

        assert_eq!(widget.step(StepDirection::Previous).await, Ok(false));
        assert_eq!(widget.step(StepDirection::Next).await, Ok(true));
        assert_eq!(widget.step(StepDirection::Next).await, Ok(false));
        let snapshot = widget.snapshot();
        assert_eq!(snapshot.selected, 1);
        assert!(snapshot.can_step_previous());
        assert!(!snapshot.can_step_next());
        assert_eq!(widget.step(StepDirection::Previous).await, Ok(true));
        assert_eq!(widget.snapshot().selected, 0);
        assert_eq!(factory.created_count(), 3);
    }

    #[tokio::test]
    async fn test_toggle_follows_engine_events() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A], &factory, &arbiter).await;

        widget.toggle_playback().await.unwrap();
        wait_until(&widget, |s| s.playing).await;
        assert_eq!(factory.audible_count(), 1);

        widget.toggle_playback().await.unwrap();
        wait_until(&widget, |s| !s.playing).await;
        assert_eq!(factory.audible_count(), 0);
    }

    #[tokio::test]
    async fn test_toggle_before_ready_is_inert() {
        let factory = FakeMediaEngineFactory::new(FakeEngineConfig {
            unreachable: vec![A.to_string()],
            ..Default::default()
        });
        let arbiter = PlaybackArbiter::new(16);
        let widget = AudioWidget::mount(variants(&[A]), Arc::new(factory.clone()), &arbiter);

        assert_eq!(
            widget.toggle_playback().await,
            Err(PlaybackError::Engine(EngineError::NotReady))
        );
        let snapshot = widget.snapshot();
        assert!(!snapshot.playing);
        assert!(!snapshot.ready);
        assert_eq!(factory.audible_count(), 0);
    }

    #[tokio::test]
    async fn test_progress_and_seek_update_clock() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A], &factory, &arbiter).await;
        let instance = factory.latest_for(A).unwrap().instance_id;

        factory.emit_progress(instance, 65.0);
        wait_until(&widget, |s| s.elapsed_secs == 65.0).await;
        assert_eq!(widget.snapshot().clock(), "1:05 / 3:00");

        widget.seek(90.0).await.unwrap();
        wait_until(&widget, |s| s.elapsed_secs == 90.0).await;
    }

    #[tokio::test]
    async fn test_finish_does_not_advance() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A, B], &factory, &arbiter).await;
        let instance = factory.latest_for(A).unwrap().instance_id;

        widget.toggle_playback().await.unwrap();
        wait_until(&widget, |s| s.playing).await;

        factory.emit_finished(instance);
        wait_until(&widget, |s| !s.playing).await;
        assert_eq!(widget.snapshot().selected, 0);
        assert_eq!(factory.created_count(), 1);
    }

    #[tokio::test]
    async fn test_only_one_widget_audible() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let first = mount_ready(&[A], &factory, &arbiter).await;
        let second = mount_ready(&[B], &factory, &arbiter).await;
        let third = mount_ready(&[C], &factory, &arbiter).await;

        first.toggle_playback().await.unwrap();
        wait_until(&first, |s| s.playing).await;
        assert_eq!(factory.audible_count(), 1);

        second.toggle_playback().await.unwrap();
        wait_until(&second, |s| s.playing).await;
        wait_until(&first, |s| !s.playing).await;
        assert_eq!(factory.audible_count(), 1);
        assert!(!third.snapshot().playing);

        third.toggle_playback().await.unwrap();
        wait_until(&third, |s| s.playing).await;
        wait_until(&second, |s| !s.playing).await;
        assert_eq!(factory.audible_count(), 1);
        assert!(!first.snapshot().playing);
    }

    #[tokio::test]
    async fn test_idle_widget_pauses_on_foreign_play() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let idle = mount_ready(&[A], &factory, &arbiter).await;
        let active = mount_ready(&[B], &factory, &arbiter).await;

        active.toggle_playback().await.unwrap();
        wait_until(&active, |s| s.playing).await;

        // 空闲的播放器同样收到 pause，不依赖本地的 playing 标记
        tokio::time::timeout(Duration::from_secs(2), async {
            while factory.latest_for(A).unwrap().pause_calls == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(factory.latest_for(A).unwrap().pause_calls, 1);
        assert!(!idle.snapshot().playing);
        assert!(active.snapshot().playing);
        assert_eq!(factory.audible_count(), 1);
    }

    #[tokio::test]
    async fn test_own_announcement_does_not_pause_self() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A], &factory, &arbiter).await;

        widget.toggle_playback().await.unwrap();
        wait_until(&widget, |s| s.playing).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(widget.snapshot().playing);
        assert_eq!(factory.latest_for(A).unwrap().pause_calls, 0);
    }

    #[tokio::test]
    async fn test_unmount_releases_engine_and_subscription() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A, B], &factory, &arbiter).await;
        assert_eq!(arbiter.listener_count(), 1);

        widget.toggle_playback().await.unwrap();
        wait_until(&widget, |s| s.playing).await;
        widget.unmount().await;

        let record = factory.latest_for(A).unwrap();
        assert!(record.destroyed);
        assert_eq!(record.destroy_calls, 1);
        assert_eq!(factory.audible_count(), 0);
        assert_eq!(arbiter.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_widget_releases_engine() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A], &factory, &arbiter).await;
        widget.toggle_playback().await.unwrap();
        wait_until(&widget, |s| s.playing).await;
        assert_eq!(factory.audible_count(), 1);

        drop(widget);
        // 丢弃时同步释放，无需等待 actor
        assert_eq!(factory.live_count(), 0);
        assert_eq!(factory.audible_count(), 0);
        let record = factory.latest_for(A).unwrap();
        assert!(record.destroyed);
        assert_eq!(record.pause_calls, 1);

        tokio::time::timeout(Duration::from_secs(2), async {
            while arbiter.listener_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(factory.records()[0].destroy_calls, 1);
    }

    #[tokio::test]
    async fn test_commands_after_unmount_fail() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A], &factory, &arbiter).await;
        let detached = AudioWidget {
            player: widget.player(),
            commands: widget.commands.clone(),
            state: widget.subscribe(),
            session: Arc::new(Mutex::new(None)),
            worker: None,
        };
        widget.unmount().await;

        assert_eq!(detached.select(0).await, Err(PlaybackError::Unmounted));
    }

    #[tokio::test]
    async fn test_set_variants() {
        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = mount_ready(&[A, B], &factory, &arbiter).await;
        widget.select(1).await.unwrap();
        wait_until(&widget, |s| s.ready).await;
        assert_eq!(factory.created_count(), 2);

        // 当前变体地址不变，不重建
        widget.set_variants(variants(&[C, B])).await.unwrap();
        assert_eq!(factory.created_count(), 2);
        assert_eq!(widget.snapshot().download_url(), Some(B));

        // 当前索引越界，回到 0
        widget.set_variants(variants(&[C])).await.unwrap();
        wait_until(&widget, |s| s.selected == 0 && s.ready).await;
        assert_eq!(factory.latest_for(C).map(|r| r.destroyed), Some(false));
        assert_eq!(factory.live_count(), 1);

        // 清空即释放
        widget.set_variants(Vec::new()).await.unwrap();
        assert_eq!(factory.live_count(), 0);
        assert!(widget.snapshot().variants.is_empty());
        assert_eq!(
            widget.toggle_playback().await,
            Err(PlaybackError::NoActiveSession)
        );
    }
}
