//! Viewer registry: maps viewer ids to their notification channels.
//!
//! One registry exists per document session. Document code calls it with
//! either one viewer or all viewers as target; the rasterizer reports
//! painted tiles through it so every viewer's paint state stays in step.
//!
//! ```text
//!  notify_one(v, n) ──► channel[v].enqueue(n)
//!  notify_all(n)    ──► channel[*].enqueue(n)      (attach order)
//!  propagate_paint  ──► channel[*].record_paint
//!  flush_all        ──► channel[*].dispatch ──► DeliverySink
//! ```
//!
//! Unknown viewer ids are ignored everywhere: a detach racing with a
//! notification is expected.

use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use tilesync_core::{
    InvalidationRegion, Notification, NotificationKind, PaintedRegionTracker, Part, TileRect,
    ViewerId,
};

use crate::channel::{ChannelStats, NotificationChannel};
use crate::config::RegistryConfig;
use crate::sink::DeliverySink;

#[derive(Debug, Default)]
pub struct ChannelRegistry {
    config: RegistryConfig,
    channels: FxHashMap<ViewerId, NotificationChannel>,
    /// Viewer ids in attach order.
    order: Vec<ViewerId>,
}

impl ChannelRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            channels: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ───────────────────── lifecycle ─────────────────────

    /// Attach a viewer, or return its existing channel.
    ///
    /// A new channel starts with the painted area already recorded for the
    /// other viewers, so invalidations for regions they rendered into the
    /// shared document are not suppressed for it.
    pub fn attach(&mut self, viewer: ViewerId) -> &mut NotificationChannel {
        let seed = (self.config.seed_from_siblings && !self.channels.contains_key(&viewer))
            .then(|| self.painted_union());

        match self.channels.entry(viewer) {
            Entry::Occupied(entry) => {
                log::debug!("Viewer {viewer} already attached");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let mut channel = NotificationChannel::new(viewer, self.config.channel.clone());
                if let Some(seed) = seed {
                    channel.seed_paint(&seed);
                }
                self.order.push(viewer);
                log::info!("Viewer {viewer} attached ({} total)", self.order.len());
                entry.insert(channel)
            }
        }
    }

    /// Attach a viewer whose flushes go to `sink`.
    pub fn attach_with_sink(
        &mut self,
        viewer: ViewerId,
        sink: Box<dyn DeliverySink>,
    ) -> &mut NotificationChannel {
        let channel = self.attach(viewer);
        channel.set_sink(sink);
        channel
    }

    /// Detach a viewer, discarding whatever it had pending.
    pub fn detach(&mut self, viewer: ViewerId) -> bool {
        match self.channels.remove(&viewer) {
            Some(channel) => {
                self.order.retain(|id| *id != viewer);
                log::info!(
                    "Viewer {viewer} detached ({} pending discarded, {} remaining)",
                    channel.pending_len(),
                    self.order.len()
                );
                true
            }
            None => false,
        }
    }

    pub fn channel(&self, viewer: ViewerId) -> Option<&NotificationChannel> {
        self.channels.get(&viewer)
    }

    pub fn channel_mut(&mut self, viewer: ViewerId) -> Option<&mut NotificationChannel> {
        self.channels.get_mut(&viewer)
    }

    pub fn contains(&self, viewer: ViewerId) -> bool {
        self.channels.contains_key(&viewer)
    }

    /// Attached viewers in attach order.
    pub fn viewers(&self) -> &[ViewerId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // ───────────────────── notify ─────────────────────

    pub fn notify_one(&mut self, viewer: ViewerId, notification: Notification) {
        match self.channels.get_mut(&viewer) {
            Some(channel) => channel.enqueue(notification),
            None => log::debug!("notify_one: unknown viewer {viewer}, {} ignored", notification.kind()),
        }
    }

    pub fn notify_all(&mut self, notification: Notification) {
        for viewer in &self.order {
            if let Some(channel) = self.channels.get_mut(viewer) {
                channel.enqueue(notification.clone());
            }
        }
    }

    /// Raw-text entry point. Malformed payloads are logged and discarded.
    pub fn notify_one_raw(&mut self, viewer: ViewerId, kind: NotificationKind, payload: &str) {
        if let Some(notification) = parse_or_log(kind, payload) {
            self.notify_one(viewer, notification);
        }
    }

    /// Raw-text broadcast. Malformed payloads are logged and discarded.
    pub fn notify_all_raw(&mut self, kind: NotificationKind, payload: &str) {
        if let Some(notification) = parse_or_log(kind, payload) {
            self.notify_all(notification);
        }
    }

    /// Structured tile invalidation; no rectangle means `EMPTY`.
    pub fn invalidate_tiles(
        &mut self,
        viewer: ViewerId,
        rect: Option<TileRect>,
        part: Part,
        mode: i32,
    ) {
        let region = InvalidationRegion::from_parts(rect, part, mode);
        self.notify_one(viewer, Notification::invalidate_tiles(region));
    }

    pub fn invalidate_tiles_all(&mut self, rect: Option<TileRect>, part: Part, mode: i32) {
        let region = InvalidationRegion::from_parts(rect, part, mode);
        self.notify_all(Notification::invalidate_tiles(region));
    }

    // ───────────────────── paint state ─────────────────────

    /// Record a painted area on every attached channel.
    ///
    /// Viewers may look at the same document area, so a tile rendered for
    /// one of them makes the area valid-but-stale-able for all of them.
    /// Ignored when `origin` is not attached.
    pub fn propagate_paint(&mut self, origin: ViewerId, part: i32, rect: TileRect) {
        if !self.channels.contains_key(&origin) {
            log::debug!("propagate_paint: unknown viewer {origin} ignored");
            return;
        }
        log::trace!(
            "Viewer {origin} painted part {part} ({}, {}, {}, {})",
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
        for channel in self.channels.values_mut() {
            channel.record_paint(part, rect);
        }
    }

    /// Rasterizer hook, called right after a tile's pixels exist.
    ///
    /// The mode is not part of paint state.
    pub fn record_painted_tile(&mut self, viewer: ViewerId, part: i32, _mode: i32, rect: TileRect) {
        self.propagate_paint(viewer, part, rect);
    }

    fn painted_union(&self) -> PaintedRegionTracker {
        let mut union = PaintedRegionTracker::new();
        for channel in self.channels.values() {
            union.merge_from(channel.tracker());
        }
        union
    }

    // ───────────────────── flush ─────────────────────

    /// Drain one viewer's channel without going through its sink.
    pub fn flush(&mut self, viewer: ViewerId) -> Vec<Notification> {
        self.channels
            .get_mut(&viewer)
            .map(NotificationChannel::flush)
            .unwrap_or_default()
    }

    /// Idle tick: dispatch every channel to its sink, in attach order.
    ///
    /// Returns the number of notifications delivered.
    pub fn flush_all(&mut self) -> usize {
        let mut delivered = 0;
        for viewer in &self.order {
            if let Some(channel) = self.channels.get_mut(viewer) {
                delivered += channel.dispatch();
            }
        }
        delivered
    }

    /// Counters summed over attached channels.
    pub fn stats(&self) -> ChannelStats {
        let mut total = ChannelStats::default();
        for channel in self.channels.values() {
            total.accumulate(&channel.stats());
        }
        total
    }
}

fn parse_or_log(kind: NotificationKind, payload: &str) -> Option<Notification> {
    match Notification::parse(kind, payload) {
        Ok(notification) => Some(notification),
        Err(e) => {
            log::debug!("Discarding {kind} with payload {payload:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use tilesync_core::SignalKind;

    fn viewer(n: u128) -> ViewerId {
        ViewerId::from_u128(n)
    }

    #[test]
    fn test_attach_detach() {
        let mut registry = ChannelRegistry::default();
        registry.attach(viewer(1));
        registry.attach(viewer(2));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.viewers(), &[viewer(1), viewer(2)]);

        assert!(registry.detach(viewer(1)));
        assert!(!registry.detach(viewer(1)));
        assert_eq!(registry.viewers(), &[viewer(2)]);
    }

    #[test]
    fn test_attach_twice_keeps_channel() {
        let mut registry = ChannelRegistry::default();
        registry.attach(viewer(1)).enqueue(Notification::state_changed("X=1"));
        registry.propagate_paint(viewer(1), 0, TileRect::new(0, 0, 10, 10));
        let again = registry.attach(viewer(1));
        assert_eq!(again.pending_len(), 1);
        assert!(again.tracker().is_painted(0, &TileRect::new(0, 0, 10, 10)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.viewers(), &[viewer(1)]);
    }

    #[test]
    fn test_notify_unknown_viewer_is_noop() {
        let mut registry = ChannelRegistry::default();
        registry.notify_one(viewer(9), Notification::state_changed(""));
        registry.propagate_paint(viewer(9), 0, TileRect::new(0, 0, 10, 10));
        assert!(registry.is_empty());
        assert!(registry.flush(viewer(9)).is_empty());
    }

    #[test]
    fn test_notify_all_fans_out() {
        let mut registry = ChannelRegistry::default();
        registry.attach(viewer(1));
        registry.attach(viewer(2));
        registry.notify_all(Notification::signal(SignalKind::SetPart, "2"));
        assert_eq!(registry.flush(viewer(1)).len(), 1);
        assert_eq!(registry.flush(viewer(2)).len(), 1);
    }

    #[test]
    fn test_detach_leaves_others_pending() {
        let mut registry = ChannelRegistry::default();
        registry.attach(viewer(1));
        registry.attach(viewer(2));
        registry.notify_all(Notification::state_changed(""));
        registry.detach(viewer(1));
        assert_eq!(registry.flush(viewer(2)).len(), 1);
    }

    #[test]
    fn test_raw_malformed_discarded() {
        let mut registry = ChannelRegistry::default();
        registry.attach(viewer(1));
        registry.notify_one_raw(viewer(1), NotificationKind::InvalidateTiles, "1, 2, nope");
        assert!(registry.flush(viewer(1)).is_empty());
    }

    #[test]
    fn test_structured_overflow_discarded() {
        let mut registry = ChannelRegistry::default();
        registry.attach(viewer(1));
        registry.record_painted_tile(viewer(1), 0, 0, TileRect::new(i64::MAX - 5, 0, 100, 100));
        assert!(registry.channel(viewer(1)).unwrap().tracker().is_empty());

        registry.record_painted_tile(viewer(1), 0, 0, TileRect::new(0, 0, 256, 256));
        registry.invalidate_tiles(viewer(1), Some(TileRect::new(0, i64::MAX - 5, 10, 100)), Part::Index(0), 0);
        assert!(registry.flush(viewer(1)).is_empty());
    }

    #[test]
    fn test_paint_reaches_every_viewer() {
        let mut registry = ChannelRegistry::default();
        registry.attach(viewer(1));
        registry.attach(viewer(2));
        registry.record_painted_tile(viewer(1), 0, 0, TileRect::new(0, 0, 256, 256));
        assert!(registry.channel(viewer(2)).unwrap().tracker().is_painted(0, &TileRect::new(5, 5, 1, 1)));
    }

    #[test]
    fn test_attach_seeds_from_siblings() {
        let mut registry = ChannelRegistry::default();
        registry.attach(viewer(1));
        registry.propagate_paint(viewer(1), 3, TileRect::new(0, 0, 100, 100));
        let late = registry.attach(viewer(2));
        assert!(late.tracker().is_painted(3, &TileRect::new(50, 50, 1, 1)));
    }

    #[test]
    fn test_seeding_disabled() {
        let mut registry = ChannelRegistry::new(RegistryConfig {
            seed_from_siblings: false,
            ..RegistryConfig::default()
        });
        registry.attach(viewer(1));
        registry.propagate_paint(viewer(1), 0, TileRect::new(0, 0, 100, 100));
        assert!(registry.attach(viewer(2)).tracker().is_empty());
    }

    #[test]
    fn test_flush_all_delivers_per_viewer() {
        let sink = CollectingSink::new();
        let mut registry = ChannelRegistry::default();
        registry.attach_with_sink(viewer(1), Box::new(sink.clone()));
        registry.attach_with_sink(viewer(2), Box::new(sink.clone()));
        registry.notify_one(viewer(2), Notification::state_changed("X=1"));
        registry.notify_all(Notification::state_changed(""));

        assert_eq!(registry.flush_all(), 3);
        let batches = sink.take();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].viewer, viewer(1));
        assert_eq!(batches[1].viewer, viewer(2));
        assert_eq!(batches[1].len(), 2);

        assert_eq!(registry.flush_all(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_registry_stats() {
        let mut registry = ChannelRegistry::default();
        registry.attach(viewer(1));
        registry.attach(viewer(2));
        registry.notify_all(Notification::state_changed("X=1"));
        registry.notify_all(Notification::state_changed("X=1"));
        let stats = registry.stats();
        assert_eq!(stats.enqueued, 4);
        assert_eq!(stats.dropped, 2);
    }
}
