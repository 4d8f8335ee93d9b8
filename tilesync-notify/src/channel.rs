//! Per-viewer coalescing queue.
//!
//! Every notification lands in a pending slot. What a slot is keyed by
//! decides what merges with what:
//!
//! | Notification | Slot key | On a second event with the same key |
//! |--------------|----------|-------------------------------------|
//! | single-value signal | the signal kind | equal payload: dropped; else overwritten in place |
//! | `STATE_CHANGED` `name=value` | command name | same as above |
//! | `STATE_CHANGED` unstructured | none | always appended |
//! | `INVALIDATE_TILES` | part | region merge, see [`NotificationChannel::enqueue`] |
//!
//! Flush order is slot creation order. An overwritten slot keeps its
//! position, so the latest value is delivered where the first one was
//! queued.
//!
//! The channel is single-threaded: `enqueue` and `flush` are called from
//! the document thread only and never block.

use serde::{Deserialize, Serialize};
use tilesync_core::{
    CommandKey, InvalidationRegion, Message, Notification, PaintedRegionTracker, Part, Region,
    SignalKind, TileRect, ViewerId,
};

use crate::config::ChannelConfig;
use crate::protocol::FlushedBatch;
use crate::sink::DeliverySink;

/// Counters for monitoring channel health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Notifications offered to `enqueue`.
    pub enqueued: u64,
    /// Merged into or superseding an existing slot.
    pub coalesced: u64,
    /// Discarded as degenerate, unpainted or redundant.
    pub dropped: u64,
    /// Discarded while the channel was disabled.
    pub suppressed: u64,
    /// Notifications drained by flushes.
    pub flushed: u64,
    /// Flushes that drained at least one notification.
    pub flushes: u64,
}

impl ChannelStats {
    pub fn accumulate(&mut self, other: &ChannelStats) {
        self.enqueued += other.enqueued;
        self.coalesced += other.coalesced;
        self.dropped += other.dropped;
        self.suppressed += other.suppressed;
        self.flushed += other.flushed;
        self.flushes += other.flushes;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotKey {
    Signal(SignalKind),
    Command(CommandKey),
    /// Never matches another slot.
    Unkeyed,
    Tiles(Part),
    Empty,
}

impl SlotKey {
    fn is_tiles(&self) -> bool {
        matches!(self, SlotKey::Tiles(_) | SlotKey::Empty)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    key: SlotKey,
    notification: Notification,
}

impl Slot {
    fn rect(&self) -> Option<TileRect> {
        match self.notification.region() {
            Some(InvalidationRegion::Area(region)) => Some(region.rect),
            _ => None,
        }
    }
}

enum Outcome {
    Appended,
    Coalesced,
    Dropped,
}

pub struct NotificationChannel {
    viewer: ViewerId,
    config: ChannelConfig,
    /// Pending slots in creation order.
    pending: Vec<Slot>,
    tracker: PaintedRegionTracker,
    sink: Option<Box<dyn DeliverySink>>,
    /// Nesting depth of `disable()`.
    disabled: u32,
    latched: bool,
    sequence: u64,
    stats: ChannelStats,
}

impl NotificationChannel {
    pub fn new(viewer: ViewerId, config: ChannelConfig) -> Self {
        Self {
            viewer,
            config,
            pending: Vec::new(),
            tracker: PaintedRegionTracker::new(),
            sink: None,
            disabled: 0,
            latched: false,
            sequence: 0,
            stats: ChannelStats::default(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn DeliverySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn set_sink(&mut self, sink: Box<dyn DeliverySink>) {
        self.sink = Some(sink);
    }

    pub fn viewer(&self) -> ViewerId {
        self.viewer
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    // ───────────────────── enqueue ─────────────────────

    /// Coalesce a notification into the pending set. Never fails.
    ///
    /// Tile invalidations are first cropped to the painted area (when
    /// paint gating is on), then merged:
    ///
    /// 1. degenerate rectangles are discarded;
    /// 2. `EMPTY` replaces every pending tile slot and absorbs all later
    ///    invalidations until the next flush;
    /// 3. an all-parts region is unioned into the single all-parts slot,
    ///    and specific-part slots it now covers are removed;
    /// 4. a specific-part region covered by the all-parts slot is
    ///    discarded; otherwise it is unioned with every slot of the same
    ///    part it touches, or gets a slot of its own.
    pub fn enqueue(&mut self, notification: Notification) {
        self.stats.enqueued += 1;
        if self.disabled > 0 {
            self.stats.suppressed += 1;
            log::trace!("Viewer {}: {} suppressed (disabled)", self.viewer, notification.kind());
            return;
        }

        let kind = notification.kind();
        let outcome = match notification.message() {
            Message::Signal { kind, .. } => self.upsert(SlotKey::Signal(*kind), notification),
            Message::StateChanged(state) => match state.key() {
                Some(key) => self.upsert(SlotKey::Command(key.clone()), notification),
                None => self.push(SlotKey::Unkeyed, notification),
            },
            Message::InvalidateTiles(region) => {
                let region = *region;
                self.enqueue_region(region, notification.origin())
            }
        };

        match outcome {
            Outcome::Appended => log::trace!("Viewer {}: {kind} queued", self.viewer),
            Outcome::Coalesced => {
                self.stats.coalesced += 1;
                log::trace!("Viewer {}: {kind} coalesced", self.viewer);
            }
            Outcome::Dropped => {
                self.stats.dropped += 1;
                log::trace!("Viewer {}: {kind} dropped", self.viewer);
            }
        }
    }

    fn push(&mut self, key: SlotKey, notification: Notification) -> Outcome {
        self.pending.push(Slot { key, notification });
        Outcome::Appended
    }

    /// Last value wins, first position kept.
    fn upsert(&mut self, key: SlotKey, notification: Notification) -> Outcome {
        match self.pending.iter_mut().find(|slot| slot.key == key) {
            Some(slot) if slot.notification.message() == notification.message() => Outcome::Dropped,
            Some(slot) => {
                slot.notification = notification;
                Outcome::Coalesced
            }
            None => self.push(key, notification),
        }
    }

    fn enqueue_region(&mut self, region: InvalidationRegion, origin: Option<ViewerId>) -> Outcome {
        if region.is_degenerate() {
            return Outcome::Dropped;
        }
        if self.pending.iter().any(|slot| slot.key == SlotKey::Empty) {
            return Outcome::Dropped;
        }
        let region = if self.config.paint_gating {
            match self.tracker.filter(region) {
                Some(region) => region,
                None => return Outcome::Dropped,
            }
        } else {
            region
        };

        let outcome = match region {
            InvalidationRegion::Empty => {
                self.pending.retain(|slot| !slot.key.is_tiles());
                self.push(SlotKey::Empty, tile_notification(InvalidationRegion::Empty, origin))
            }
            InvalidationRegion::Area(area) => match area.part {
                Part::All => self.merge_all_parts(area, origin),
                Part::Index(_) => self.merge_part(area, origin),
            },
        };

        let tile_slots = self.pending.iter().filter(|slot| slot.key.is_tiles()).count();
        if tile_slots > self.config.max_region_slots {
            log::debug!(
                "Viewer {}: {tile_slots} tile slots exceed {}, collapsing to EMPTY",
                self.viewer,
                self.config.max_region_slots
            );
            self.pending.retain(|slot| !slot.key.is_tiles());
            self.push(SlotKey::Empty, tile_notification(InvalidationRegion::Empty, origin));
            return Outcome::Coalesced;
        }
        outcome
    }

    fn merge_all_parts(&mut self, area: Region, origin: Option<ViewerId>) -> Outcome {
        let key = SlotKey::Tiles(Part::All);
        let (merged, outcome) = match self.pending.iter().position(|slot| slot.key == key) {
            Some(pos) => {
                let rect = self.pending[pos].rect().map_or(area.rect, |r| r.union(&area.rect));
                let merged = area.with_rect(rect);
                self.pending[pos].notification =
                    tile_notification(InvalidationRegion::Area(merged), origin);
                (merged, Outcome::Coalesced)
            }
            None => {
                self.push(key, tile_notification(InvalidationRegion::Area(area), origin));
                (area, Outcome::Appended)
            }
        };

        self.pending.retain(|slot| {
            !matches!(slot.key, SlotKey::Tiles(Part::Index(_)))
                || !slot.rect().is_some_and(|rect| merged.rect.contains(&rect))
        });
        outcome
    }

    fn merge_part(&mut self, area: Region, origin: Option<ViewerId>) -> Outcome {
        let all_parts = SlotKey::Tiles(Part::All);
        let covered = self
            .pending
            .iter()
            .filter(|slot| slot.key == all_parts)
            .filter_map(Slot::rect)
            .any(|rect| rect.contains(&area.rect));
        if covered {
            return Outcome::Dropped;
        }

        // Union with every same-part slot the region touches. Growing the
        // rectangle can make it reach further slots, so repeat until stable.
        // The merged slot keeps the earliest position among those folded.
        let key = SlotKey::Tiles(area.part);
        let mut rect = area.rect;
        let mut merged_into: Option<usize> = None;
        loop {
            let hit = self.pending.iter().enumerate().find_map(|(i, slot)| {
                let other = slot.rect()?;
                (Some(i) != merged_into && slot.key == key && other.intersects_or_touches(&rect))
                    .then_some((i, other))
            });
            let Some((pos, other)) = hit else { break };
            rect = rect.union(&other);
            merged_into = match merged_into {
                None => Some(pos),
                Some(kept) if pos < kept => {
                    self.pending.remove(kept);
                    Some(pos)
                }
                Some(kept) => {
                    self.pending.remove(pos);
                    Some(kept)
                }
            };
        }

        match merged_into {
            Some(pos) => {
                self.pending[pos].notification =
                    tile_notification(InvalidationRegion::Area(area.with_rect(rect)), origin);
                Outcome::Coalesced
            }
            None => self.push(key, tile_notification(InvalidationRegion::Area(area), origin)),
        }
    }

    // ───────────────────── paint state ─────────────────────

    /// Record that this viewer now has pixels for `rect` on `part`.
    pub fn record_paint(&mut self, part: i32, rect: TileRect) {
        self.tracker.record_paint(part, rect);
    }

    /// Adopt painted area recorded elsewhere.
    pub fn seed_paint(&mut self, other: &PaintedRegionTracker) {
        self.tracker.merge_from(other);
    }

    pub fn tracker(&self) -> &PaintedRegionTracker {
        &self.tracker
    }

    // ───────────────────── suppression / latch ─────────────────────

    /// Drop incoming notifications until a matching [`enable`](Self::enable).
    /// Calls nest.
    pub fn disable(&mut self) {
        self.disabled += 1;
    }

    pub fn enable(&mut self) {
        self.disabled = self.disabled.saturating_sub(1);
    }

    pub fn is_enabled(&self) -> bool {
        self.disabled == 0
    }

    /// While latched, [`flush`](Self::flush) holds everything back.
    pub fn set_latched(&mut self, latched: bool) {
        self.latched = latched;
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    // ───────────────────── flush ─────────────────────

    /// Drain the pending set in slot creation order.
    ///
    /// Returns nothing and keeps the pending set while latched.
    pub fn flush(&mut self) -> Vec<Notification> {
        if self.latched {
            log::trace!("Viewer {}: flush held by latch ({} pending)", self.viewer, self.pending.len());
            return Vec::new();
        }
        self.force_flush()
    }

    /// Drain the pending set, ignoring the latch.
    pub fn force_flush(&mut self) -> Vec<Notification> {
        let drained: Vec<Notification> = self.pending.drain(..).map(|slot| slot.notification).collect();
        if !drained.is_empty() {
            self.stats.flushes += 1;
            self.stats.flushed += drained.len() as u64;
        }
        drained
    }

    /// Flush and hand a non-empty result to the sink.
    ///
    /// Returns the number of notifications delivered.
    pub fn dispatch(&mut self) -> usize {
        let notifications = self.flush();
        if notifications.is_empty() {
            return 0;
        }
        let batch = FlushedBatch::new(self.viewer, self.sequence, &notifications);
        self.sequence += 1;
        log::debug!("Viewer {}: delivering batch {} ({} entries)", self.viewer, batch.sequence, batch.len());
        match self.sink.as_mut() {
            Some(sink) => sink.deliver(batch),
            None => log::debug!("Viewer {}: no sink attached, batch dropped", self.viewer),
        }
        notifications.len()
    }

    /// Queued notifications, in flush order, without draining.
    pub fn pending(&self) -> impl Iterator<Item = &Notification> {
        self.pending.iter().map(|slot| &slot.notification)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }
}

impl std::fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("viewer", &self.viewer)
            .field("pending", &self.pending.len())
            .field("disabled", &self.disabled)
            .field("latched", &self.latched)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

fn tile_notification(region: InvalidationRegion, origin: Option<ViewerId>) -> Notification {
    let notification = Notification::invalidate_tiles(region);
    match origin {
        Some(origin) => notification.with_origin(origin),
        None => notification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilesync_core::NotificationKind;

    fn ungated() -> NotificationChannel {
        NotificationChannel::new(
            ViewerId::from_u128(1),
            ChannelConfig {
                paint_gating: false,
                ..ChannelConfig::default()
            },
        )
    }

    fn tiles(x: i64, y: i64, w: i64, h: i64, part: i32) -> Notification {
        Notification::invalidate_tiles(InvalidationRegion::area(
            TileRect::new(x, y, w, h),
            Part::from_wire(part),
            0,
        ))
    }

    fn payloads(notifications: &[Notification]) -> Vec<String> {
        notifications.iter().map(|n| n.payload().into_owned()).collect()
    }

    #[test]
    fn test_duplicate_signal_dropped() {
        let mut channel = ungated();
        channel.enqueue(Notification::signal(SignalKind::CursorVisible, "true"));
        channel.enqueue(Notification::signal(SignalKind::CursorVisible, "true"));
        assert_eq!(channel.flush().len(), 1);
        assert_eq!(channel.stats().dropped, 1);
    }

    #[test]
    fn test_signal_overwrite_keeps_position() {
        let mut channel = ungated();
        channel.enqueue(Notification::signal(SignalKind::CellFormula, "A"));
        channel.enqueue(Notification::signal(SignalKind::MousePointer, "Text"));
        channel.enqueue(Notification::signal(SignalKind::CellFormula, "B"));

        let flushed = channel.flush();
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[0].kind(), NotificationKind::Signal(SignalKind::CellFormula));
        assert_eq!(flushed[0].payload(), "B");
        assert_eq!(flushed[1].kind(), NotificationKind::Signal(SignalKind::MousePointer));
    }

    #[test]
    fn test_unstructured_state_never_coalesced() {
        let mut channel = ungated();
        channel.enqueue(Notification::state_changed(""));
        channel.enqueue(Notification::state_changed(".uno:Bold"));
        channel.enqueue(Notification::state_changed(""));
        assert_eq!(payloads(&channel.flush()), vec!["", ".uno:Bold", ""]);
    }

    #[test]
    fn test_structured_state_supersedes() {
        let mut channel = ungated();
        channel.enqueue(Notification::state_changed("X=20"));
        channel.enqueue(Notification::state_changed("Y=5"));
        channel.enqueue(Notification::state_changed("X=1"));
        assert_eq!(payloads(&channel.flush()), vec!["X=1", "Y=5"]);
    }

    #[test]
    fn test_tile_union_same_part() {
        let mut channel = ungated();
        channel.enqueue(tiles(0, 0, 239, 239, 0));
        channel.enqueue(tiles(0, 0, 239, 239, 0));
        channel.enqueue(tiles(-100, -50, 500, 650, 0));
        channel.enqueue(tiles(0, 0, -32767, -32767, 0));
        channel.enqueue(tiles(100, 100, 200, 200, 0));
        assert_eq!(payloads(&channel.flush()), vec!["0, 0, 400, 600, 0, 0"]);
    }

    #[test]
    fn test_parts_never_merge() {
        let mut channel = ungated();
        channel.enqueue(tiles(0, 0, 100, 100, 0));
        channel.enqueue(tiles(0, 0, 100, 100, 1));
        channel.enqueue(tiles(500, 500, 10, 10, 0));
        assert_eq!(
            payloads(&channel.flush()),
            vec!["0, 0, 100, 100, 0, 0", "0, 0, 100, 100, 1, 0", "500, 500, 10, 10, 0, 0"]
        );
    }

    #[test]
    fn test_bridging_region_folds_slots() {
        let mut channel = ungated();
        channel.enqueue(tiles(0, 0, 10, 10, 0));
        channel.enqueue(tiles(100, 0, 10, 10, 0));
        channel.enqueue(tiles(5, 0, 100, 10, 0));
        assert_eq!(payloads(&channel.flush()), vec!["0, 0, 110, 10, 0, 0"]);
    }

    #[test]
    fn test_bridging_keeps_earliest_position() {
        let mut channel = ungated();
        channel.enqueue(tiles(100, 0, 10, 10, 0));
        channel.enqueue(Notification::state_changed(""));
        channel.enqueue(tiles(0, 0, 10, 10, 0));
        channel.enqueue(tiles(5, 0, 100, 10, 0));
        assert_eq!(payloads(&channel.flush()), vec!["0, 0, 110, 10, 0, 0", ""]);
    }

    #[test]
    fn test_empty_absorbs() {
        let mut channel = ungated();
        channel.enqueue(Notification::state_changed(".uno:Bold=true"));
        channel.enqueue(tiles(0, 0, 10, 10, 0));
        channel.enqueue(Notification::invalidate_tiles(InvalidationRegion::Empty));
        channel.enqueue(tiles(50, 50, 10, 10, 3));
        assert_eq!(payloads(&channel.flush()), vec![".uno:Bold=true", "EMPTY"]);
    }

    #[test]
    fn test_all_parts_removes_covered_slots() {
        let mut channel = ungated();
        channel.enqueue(tiles(10, 10, 10, 10, 0));
        channel.enqueue(tiles(500, 500, 10, 10, 1));
        channel.enqueue(tiles(0, 0, 100, 100, -1));
        assert_eq!(
            payloads(&channel.flush()),
            vec!["500, 500, 10, 10, 1, 0", "0, 0, 100, 100, -1, 0"]
        );
    }

    #[test]
    fn test_all_parts_unions() {
        let mut channel = ungated();
        channel.enqueue(tiles(0, 0, 10, 10, -1));
        channel.enqueue(tiles(90, 90, 10, 10, -1));
        assert_eq!(payloads(&channel.flush()), vec!["0, 0, 100, 100, -1, 0"]);
    }

    #[test]
    fn test_specific_part_covered_by_all_parts() {
        let mut channel = ungated();
        channel.enqueue(tiles(0, 0, 100, 100, -1));
        channel.enqueue(tiles(10, 10, 10, 10, 4));
        assert_eq!(channel.flush().len(), 1);
    }

    #[test]
    fn test_touching_regions_merge() {
        let mut channel = ungated();
        channel.enqueue(tiles(0, 0, 100, 100, 0));
        channel.enqueue(tiles(100, 0, 50, 50, 0));
        assert_eq!(payloads(&channel.flush()), vec!["0, 0, 150, 100, 0, 0"]);

        // Corner contact only.
        channel.enqueue(tiles(0, 0, 10, 10, 0));
        channel.enqueue(tiles(10, 10, 10, 10, 0));
        assert_eq!(payloads(&channel.flush()), vec!["0, 0, 20, 20, 0, 0"]);

        // One pixel apart stays separate.
        channel.enqueue(tiles(0, 0, 10, 10, 0));
        channel.enqueue(tiles(11, 0, 10, 10, 0));
        assert_eq!(channel.flush().len(), 2);
    }

    #[test]
    fn test_specific_part_partly_covered_by_all_parts() {
        let mut channel = ungated();
        channel.enqueue(tiles(0, 0, 100, 100, -1));
        channel.enqueue(tiles(50, 50, 100, 100, 4));
        assert_eq!(
            payloads(&channel.flush()),
            vec!["0, 0, 100, 100, -1, 0", "50, 50, 100, 100, 4, 0"]
        );
    }

    #[test]
    fn test_empty_absorbs_all_parts() {
        let mut channel = ungated();
        channel.enqueue(Notification::invalidate_tiles(InvalidationRegion::Empty));
        channel.enqueue(tiles(0, 0, 100, 100, -1));
        assert_eq!(payloads(&channel.flush()), vec!["EMPTY"]);
        assert_eq!(channel.stats().dropped, 1);
    }

    #[test]
    fn test_redundant_regions_count_as_dropped() {
        let mut channel = ungated();
        channel.enqueue(tiles(0, 0, 100, 100, -1));
        channel.enqueue(tiles(10, 10, 10, 10, 2));
        channel.enqueue(Notification::invalidate_tiles(InvalidationRegion::Empty));
        channel.enqueue(tiles(10, 10, 10, 10, 2));
        let stats = channel.stats();
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.coalesced, 0);
    }

    #[test]
    fn test_overflowing_region_discarded() {
        let mut channel = ungated();
        channel.enqueue(tiles(0, 0, 10, 10, 0));
        channel.enqueue(tiles(i64::MAX - 1000, 0, 1000 + 1, 10, 0));
        assert_eq!(payloads(&channel.flush()), vec!["0, 0, 10, 10, 0, 0"]);
        assert_eq!(channel.stats().dropped, 1);
    }

    #[test]
    fn test_paint_gating() {
        let mut channel = NotificationChannel::new(ViewerId::from_u128(1), ChannelConfig::default());
        channel.enqueue(tiles(0, 0, 100, 100, 0));
        assert!(channel.flush().is_empty());

        channel.record_paint(0, TileRect::new(0, 0, 256, 256));
        channel.enqueue(tiles(200, 200, 100, 100, 0));
        assert_eq!(payloads(&channel.flush()), vec!["200, 200, 56, 56, 0, 0"]);
    }

    #[test]
    fn test_slot_limit_collapses_to_empty() {
        let mut channel = NotificationChannel::new(
            ViewerId::from_u128(1),
            ChannelConfig {
                paint_gating: false,
                max_region_slots: 2,
            },
        );
        channel.enqueue(tiles(0, 0, 1, 1, 0));
        channel.enqueue(tiles(0, 0, 1, 1, 1));
        channel.enqueue(tiles(0, 0, 1, 1, 2));
        assert_eq!(payloads(&channel.flush()), vec!["EMPTY"]);
    }

    #[test]
    fn test_disable_nests() {
        let mut channel = ungated();
        channel.disable();
        channel.disable();
        channel.enable();
        channel.enqueue(Notification::state_changed(""));
        assert!(!channel.is_enabled());
        channel.enable();
        channel.enqueue(Notification::state_changed("X=1"));
        assert_eq!(payloads(&channel.flush()), vec!["X=1"]);
        assert_eq!(channel.stats().suppressed, 1);
    }

    #[test]
    fn test_latch_holds_flush() {
        let mut channel = ungated();
        channel.set_latched(true);
        channel.enqueue(Notification::state_changed("X=1"));
        assert!(channel.flush().is_empty());
        assert_eq!(channel.pending_len(), 1);

        channel.set_latched(false);
        assert_eq!(channel.flush().len(), 1);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_force_flush_ignores_latch() {
        let mut channel = ungated();
        channel.set_latched(true);
        channel.enqueue(Notification::state_changed("X=1"));
        assert_eq!(channel.force_flush().len(), 1);
    }

    #[test]
    fn test_dispatch_to_sink() {
        let sink = crate::sink::CollectingSink::new();
        let mut channel = ungated().with_sink(Box::new(sink.clone()));
        assert_eq!(channel.dispatch(), 0);
        assert!(sink.is_empty());

        channel.enqueue(Notification::state_changed("X=1"));
        assert_eq!(channel.dispatch(), 1);
        channel.enqueue(Notification::state_changed("X=2"));
        channel.dispatch();

        let batches = sink.take();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].sequence, 0);
        assert_eq!(batches[1].sequence, 1);
        assert_eq!(batches[1].entries[0].payload, "X=2");
    }

    #[test]
    fn test_stats() {
        let mut channel = ungated();
        channel.enqueue(Notification::state_changed("X=1"));
        channel.enqueue(Notification::state_changed("X=2"));
        channel.enqueue(tiles(0, 0, 0, 0, 0));
        channel.flush();
        let stats = channel.stats();
        assert_eq!(stats.enqueued, 3);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.flushed, 1);
        assert_eq!(stats.flushes, 1);
    }
}
