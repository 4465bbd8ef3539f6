use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};
use log::{debug, info, warn};

use penguin_core::{
    Color, EntityId, EntitySnapshot, HeldDirections, LocalEntity, MoveUpdate, Position, RemoteEntities, RemoteEntity,
    Viewport,
};
use penguin_transport::{
    Broadcaster, CodecKind, EntityStore, EventSource, InboundMessage, MovePayload, Subscription, TransportError,
    WireCodec,
};

use crate::error::{SendOperation, SyncError};
use crate::interpolate::RemoteInterpolator;
use crate::motion::LocalMotionController;
use crate::router::{Applied, EventRouter};
use crate::throttle::{ThrottleState, UpdateThrottler};

/// Everything a session needs to know up front.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub username: String,
    pub color: Color,
    pub spawn: Position,
    pub viewport: Viewport,
    /// Per-tick movement, shared by local motion and remote interpolation.
    pub step: f32,
    pub send_interval: Duration,
    /// Start the throttle window at registration instead of "never sent".
    pub prime_throttle: bool,
    pub channel: String,
    pub move_event: String,
    pub table: String,
    pub codec: CodecKind,
}

impl SessionOptions {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            color: Color::default(),
            spawn: Position::new(100.0, 100.0),
            viewport: Viewport::new(800.0, 600.0),
            step: 5.0,
            send_interval: Duration::from_millis(200),
            prime_throttle: false,
            channel: "movement".to_string(),
            move_event: "move".to_string(),
            table: "penguin".to_string(),
            codec: CodecKind::Json,
        }
    }
}

/// The external collaborators a session talks to.
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn EntityStore>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub events: Arc<dyn EventSource>,
}

impl Backend {
    /// Use one value for all three capabilities.
    pub fn shared<B>(backend: B) -> Self
    where
        B: EntityStore + Broadcaster + EventSource + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            store: backend.clone(),
            broadcaster: backend.clone(),
            events: backend,
        }
    }
}

/// Summary of one tick, mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub moved: bool,
    pub sent: bool,
    pub events_applied: usize,
    pub events_dropped: usize,
    pub remotes_in_motion: usize,
}

/// One participant's view of the shared space.
pub struct SyncSession {
    local: LocalEntity,
    remotes: RemoteEntities,
    motion: LocalMotionController,
    throttler: UpdateThrottler,
    interpolator: RemoteInterpolator,
    router: EventRouter,
    codec: Box<dyn WireCodec>,
    channel: String,
    move_event: String,
    inbox: Receiver<InboundMessage>,
    subscriptions: Vec<Subscription>,
    backend: Backend,
}

impl SyncSession {
    pub fn start(options: SessionOptions, backend: Backend) -> Result<Self, SyncError> {
        Self::start_at(options, backend, Instant::now())
    }

    /// Register, load the snapshot, and subscribe. `now` only matters when
    /// `prime_throttle` is set.
    pub fn start_at(options: SessionOptions, backend: Backend, now: Instant) -> Result<Self, SyncError> {
        if !options.viewport.is_usable() {
            return Err(SyncError::invalid_viewport(options.viewport));
        }
        let spawn = options.viewport.clamp(options.spawn);
        if !options.viewport.contains(&options.spawn) {
            debug!(
                "Spawn ({:.1}, {:.1}) clamped to ({:.1}, {:.1})",
                options.spawn.x, options.spawn.y, spawn.x, spawn.y
            );
        }
        let mut local = LocalEntity::new(options.username.clone(), options.color.clone(), spawn);

        let id = backend
            .store
            .register_entity(local.username(), local.color(), spawn)
            .map_err(SyncError::Registration)?;
        info!("Logged in as '{}' (entity {})", local.username(), id);
        local.assign_id(id.clone());

        let remotes = load_snapshot(backend.store.as_ref(), &id);

        let (queue, inbox) = unbounded();
        let subscriptions = vec![
            backend
                .events
                .subscribe_broadcast(&options.channel, &options.move_event, queue.clone()),
            backend.events.subscribe_change_feed(&options.table, queue),
        ];
        info!(
            "Subscribed to '{}'/'{}' and change feed '{}'",
            options.channel, options.move_event, options.table
        );

        let throttler = if options.prime_throttle {
            UpdateThrottler::primed(options.send_interval, now, spawn)
        } else {
            UpdateThrottler::new(options.send_interval, spawn)
        };
        debug!("Send window is {:?}", throttler.window());

        Ok(Self {
            local,
            remotes,
            motion: LocalMotionController::new(options.step, options.viewport),
            throttler,
            interpolator: RemoteInterpolator::new(options.step),
            router: EventRouter::new(&options.channel, &options.move_event, &options.table, options.codec),
            codec: options.codec.codec(),
            channel: options.channel,
            move_event: options.move_event,
            inbox,
            subscriptions,
            backend,
        })
    }

    pub fn id(&self) -> Option<&EntityId> {
        self.local.id()
    }

    pub fn local(&self) -> &LocalEntity {
        &self.local
    }

    pub fn remotes(&self) -> &RemoteEntities {
        &self.remotes
    }

    pub fn throttle_state(&self) -> &ThrottleState {
        self.throttler.state()
    }

    pub fn viewport(&self) -> Viewport {
        self.motion.viewport()
    }

    /// Run one tick: inbound events, local motion, throttled send, interpolation.
    pub fn tick(&mut self, held: HeldDirections, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        self.drain_inbox(&mut report);

        let next = self.motion.advance(self.local.position, held);
        report.moved = next != self.local.position;
        self.local.position = next;

        if let Some(position) = self.throttler.poll(self.local.position, now) {
            self.emit(position);
            report.sent = true;
        }

        report.remotes_in_motion = self.interpolator.advance(&mut self.remotes);
        report
    }

    pub fn handle_message(&mut self, message: &InboundMessage) -> Result<Applied, SyncError> {
        self.router.route(message, &self.local, &mut self.remotes)
    }

    pub fn handle_move(&mut self, update: MoveUpdate) -> Applied {
        self.router.apply_move(update, &self.local, &mut self.remotes)
    }

    pub fn handle_join(&mut self, snapshot: EntitySnapshot) -> Applied {
        self.router.apply_join(snapshot, &self.local, &mut self.remotes)
    }

    pub fn handle_leave(&mut self, id: &EntityId) -> Applied {
        self.router.apply_leave(id, &mut self.remotes)
    }

    /// The viewport changed; keep the local entity inside it. An unusable
    /// viewport is ignored and the old bounds stay in force.
    pub fn resize(&mut self, viewport: Viewport) {
        if !viewport.is_usable() {
            warn!("{}; keeping {:?}", SyncError::invalid_viewport(viewport), self.motion.viewport());
            return;
        }
        self.motion.set_viewport(viewport);
        self.local.position = viewport.clamp(self.local.position);
        debug!("Viewport resized to {}x{}", viewport.width, viewport.height);
    }

    /// Stop listening, then tell the store we are gone. Neither step can fail
    /// the caller.
    pub fn end(self) {
        for subscription in &self.subscriptions {
            self.backend.events.unsubscribe(*subscription);
        }
        if let Some(id) = self.local.id() {
            match self.backend.store.deregister_entity(id) {
                Ok(()) => info!("Session for '{}' ended", self.local.username()),
                Err(e) => warn!("Deregistration of {} failed: {}", id, e),
            }
        }
    }

    fn drain_inbox(&mut self, report: &mut TickReport) {
        while let Ok(message) = self.inbox.try_recv() {
            match self.router.route(&message, &self.local, &mut self.remotes) {
                Ok(Applied::Ignored(_)) => {}
                Ok(_) => report.events_applied += 1,
                Err(e) => {
                    warn!("Dropping inbound event: {}", e);
                    report.events_dropped += 1;
                }
            }
        }
    }

    /// Broadcast and persist independently; a failure in one does not stop
    /// the other, and nothing is rolled back.
    fn emit(&self, position: Position) {
        let Some(id) = self.local.id() else {
            return;
        };
        let payload = MovePayload {
            id: id.clone(),
            color: self.local.color().clone(),
            x: position.x,
            y: position.y,
        };
        debug!("Sending {} at ({:.1}, {:.1})", id, position.x, position.y);

        let broadcast = self
            .codec
            .encode(&payload)
            .map_err(TransportError::from)
            .and_then(|bytes| self.backend.broadcaster.broadcast(&self.channel, &self.move_event, &bytes));
        if let Err(source) = broadcast {
            warn!("{}", SyncError::Send { operation: SendOperation::Broadcast, source });
        }

        if let Err(source) = self.backend.store.persist_position(id, position) {
            warn!("{}", SyncError::Send { operation: SendOperation::Persist, source });
        }
    }
}

fn load_snapshot(store: &dyn EntityStore, own: &EntityId) -> RemoteEntities {
    let mut remotes = RemoteEntities::new();
    match store.list_other_entities(own) {
        Ok(rows) => {
            for row in rows {
                let position = row.position();
                if row.id.is_empty() || &row.id == own || !position.is_finite() {
                    warn!("Skipping unusable snapshot row {:?}", row.id);
                    continue;
                }
                remotes.insert_if_absent(RemoteEntity::new(row.id, row.color, position));
            }
            info!("Loaded {} existing entities", remotes.len());
        }
        Err(e) => warn!("{}; starting with no remote entities", SyncError::SnapshotRead(e)),
    }
    remotes
}
