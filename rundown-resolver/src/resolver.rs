//! Infinite-item continuity resolver
//!
//! A recompute walks the rundown's lines in order from a starting line and
//! writes one entry per registered source layer on every line it visits:
//!
//! 1. An explicit item on the layer wins. A finite item clears the layer's
//!    cursor, an infinite one becomes the new cursor.
//! 2. Without an explicit item, the cursor (if any) yields a continuation.
//! 3. Entering a new segment drops every `ToEndOfSegment` cursor.
//!
//! In [`Mode::Suffix`] the cursors are seeded from the published entry of the
//! line just before the start, and a layer stops propagating once its fresh
//! entry equals the published one on a later line that does not declare a new
//! infinite origin. The pass assumes lines after the start are unchanged since
//! the last publish; if it finds a line that was never published it redoes the
//! pass as [`Mode::RunToEnd`]. When the published entry before the start no
//! longer matches the rundown, every line is walked from the first one.
//!
//! All writes of a pass are staged and published as one new table version, so
//! readers see either the old or the new table, never a mix.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rundown_core::{
    EffectiveItem, EffectiveTable, Item, LineEffects, LineId, LineOrder, LinePosition, Rundown, SourceLayerId,
};
use tracing::{debug, info, warn};

use crate::cursor::{ActiveOrigin, LayerCursors};
use crate::{CancelToken, Error, Mode, ResolverConfig, Result};

/// Summary of a finished recompute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeReport {
    /// First line actually walked (`None` for an empty rundown or a prune-only call)
    pub start: Option<LineId>,
    pub mode: Mode,
    /// Lines walked
    pub lines_visited: usize,
    /// Lines whose entries differ from the previously published ones
    pub lines_changed: usize,
    /// True when a suffix pass stopped before the last line
    pub converged_early: bool,
    /// Lines whose entries were dropped
    pub pruned: usize,
    /// Table version after the call
    pub version: u64,
}

/// Computes and publishes effective items for a rundown
///
/// One resolver instance serves one rundown. Writers are serialized
/// internally; readers call [`snapshot`](Self::snapshot) at any time.
#[derive(Debug)]
pub struct ContinuityResolver {
    config: ResolverConfig,
    published: ArcSwap<EffectiveTable>,
    writer: Mutex<()>,
}

impl Default for ContinuityResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl ContinuityResolver {
    /// Creates a resolver with an empty table
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            published: ArcSwap::from_pointee(EffectiveTable::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The currently published table
    pub fn snapshot(&self) -> Arc<EffectiveTable> {
        self.published.load_full()
    }

    /// The published entries of one line
    pub fn line_effects(&self, line: &LineId) -> Option<Arc<LineEffects>> {
        self.published.load().line(line).cloned()
    }

    /// The published item in effect on a line and layer
    pub fn effective(&self, line: &LineId, layer: &SourceLayerId) -> Option<EffectiveItem> {
        self.published.load().effective(line, layer).cloned()
    }

    /// Recomputes effective items starting at `from` (or the first line)
    pub fn recompute(&self, rundown: &Rundown, from: Option<&LineId>, mode: Mode) -> Result<RecomputeReport> {
        self.recompute_with_cancel(rundown, from, mode, &CancelToken::new())
    }

    /// Like [`recompute`](Self::recompute), but abandons the pass once `cancel` is set
    pub fn recompute_with_cancel(
        &self,
        rundown: &Rundown,
        from: Option<&LineId>,
        mode: Mode,
        cancel: &CancelToken,
    ) -> Result<RecomputeReport> {
        self.run(rundown, from, mode, cancel, &[])
    }

    /// Drops the entries of lines that no longer exist
    pub fn forget_lines(&self, ids: &[LineId]) -> RecomputeReport {
        let _writer = self.writer.lock();
        let current = self.published.load_full();
        let mut next = (*current).clone();
        let pruned = ids.iter().filter(|id| next.remove_line(id).is_some()).count();
        if pruned > 0 {
            next.bump_version();
            debug!(pruned, version = next.version(), "forgot removed lines");
            self.published.store(Arc::new(next));
        }
        RecomputeReport {
            start: None,
            mode: Mode::Suffix,
            lines_visited: 0,
            lines_changed: 0,
            converged_early: false,
            pruned,
            version: self.published.load().version(),
        }
    }

    /// Runs a pass and publishes it; `removed` lines are dropped in the same version
    pub(crate) fn run(
        &self,
        rundown: &Rundown,
        from: Option<&LineId>,
        mode: Mode,
        cancel: &CancelToken,
        removed: &[LineId],
    ) -> Result<RecomputeReport> {
        let _writer = self.writer.lock();

        let order = LineOrder::build(rundown)?;
        let requested = match from {
            Some(id) => order.position(id).ok_or_else(|| Error::not_found("line", id))?,
            None => 0,
        };
        let current = self.published.load_full();
        let layers: Vec<&SourceLayerId> = rundown.source_layers.iter().map(|l| &l.id).collect();
        let registered: HashSet<&SourceLayerId> = layers.iter().copied().collect();

        debug!(
            rundown = %rundown.id,
            start = requested,
            lines = order.len(),
            ?mode,
            "recompute requested"
        );

        let walk = Walk {
            order: &order,
            layers: &layers,
            registered: &registered,
            current: &current,
            cancel,
            interval: self.config.cancel_check_interval.max(1),
        };

        let (start, cursors, walk_mode) = match seed(&order, &layers, &current, requested) {
            Some(cursors) => (requested, cursors, mode),
            None => {
                debug!(start = requested, "no usable published state before start, walking every line");
                (0, LayerCursors::default(), Mode::RunToEnd)
            }
        };

        let pass = match walk.run(start, cursors.clone(), walk_mode)? {
            Some(pass) => pass,
            None => {
                debug!(start, "suffix pass met unpublished line, redoing as run-to-end");
                walk.run(start, cursors, Mode::RunToEnd)?
                    .ok_or_else(|| Error::InvalidState("run-to-end pass reported divergence".to_string()))?
            }
        };

        let mut next = (*current).clone();
        let mut pruned = removed
            .iter()
            .filter(|id| order.position(id).is_none())
            .filter(|id| next.remove_line(id).is_some())
            .count();
        if start == 0 && !pass.converged_early && self.config.prune_orphans {
            pruned += next.retain_lines(|id| order.position(id).is_some());
        }

        let lines_changed = pass.writes.len();
        let report = |version| RecomputeReport {
            start: order.get(start).map(|p| p.line.id.clone()),
            mode,
            lines_visited: pass.visited,
            lines_changed,
            converged_early: pass.converged_early,
            pruned,
            version,
        };

        if lines_changed == 0 && pruned == 0 {
            debug!(visited = pass.visited, "recompute produced no changes");
            return Ok(report(current.version()));
        }

        for (id, effects) in pass.writes {
            next.set_line(id, effects);
        }
        next.bump_version();
        let version = next.version();
        self.published.store(Arc::new(next));

        info!(
            rundown = %rundown.id,
            visited = pass.visited,
            changed = lines_changed,
            pruned,
            version,
            "published effective items"
        );
        Ok(report(version))
    }
}

/// Staged result of one walk
struct Pass {
    writes: Vec<(LineId, LineEffects)>,
    visited: usize,
    converged_early: bool,
}

struct Walk<'a> {
    order: &'a LineOrder<'a>,
    layers: &'a [&'a SourceLayerId],
    registered: &'a HashSet<&'a SourceLayerId>,
    current: &'a EffectiveTable,
    cancel: &'a CancelToken,
    interval: usize,
}

impl<'a> Walk<'a> {
    /// Walks from `start`; `Ok(None)` means a converged layer hit a line with no published entry
    fn run(&self, start: usize, mut cursors: LayerCursors, mode: Mode) -> Result<Option<Pass>> {
        let mut writes = Vec::new();
        let mut visited = 0;
        let mut converged: HashSet<&SourceLayerId> = HashSet::new();
        let mut prev_segment = start
            .checked_sub(1)
            .and_then(|i| self.order.get(i))
            .map(|p| &p.segment.id);

        for pos in self.order.from_index(start) {
            if visited % self.interval == 0 && self.cancel.is_cancelled() {
                warn!(line = %pos.line.id, visited, "recompute cancelled, discarding pass");
                return Err(Error::Cancelled);
            }
            visited += 1;

            if prev_segment != Some(&pos.segment.id) {
                cursors.enter_segment(&pos.segment.id);
                prev_segment = Some(&pos.segment.id);
            }

            let explicit = explicit_items(pos, self.registered)?;
            let stored = self.current.line(&pos.line.id);
            let duration = pos.line.expected_duration_ms;
            let mut effects = LineEffects::new();

            for &layer in self.layers {
                let published = stored.and_then(|s| s.entry(layer));
                if converged.contains(layer) {
                    match published {
                        Some(entry) => {
                            effects.insert(layer.clone(), entry.clone());
                            continue;
                        }
                        None => return Ok(None),
                    }
                }

                let explicit_item = explicit.get(layer).copied();
                let fresh = match explicit_item {
                    Some(item) => {
                        if item.is_infinite() {
                            cursors.set(
                                layer.clone(),
                                ActiveOrigin::start(item, &pos.line.id, &pos.segment.id, duration),
                            );
                        } else {
                            cursors.clear(layer);
                        }
                        Some(EffectiveItem::explicit(item, &pos.line.id))
                    }
                    None => cursors.continue_layer(layer, duration),
                };

                if mode == Mode::Suffix && pos.index > start {
                    let introduces_origin = explicit_item.is_some_and(Item::is_infinite);
                    if !introduces_origin && published == Some(&fresh) {
                        converged.insert(layer);
                    }
                }
                effects.insert(layer.clone(), fresh);
            }

            if stored.map_or(true, |s| **s != effects) {
                writes.push((pos.line.id.clone(), effects));
            }

            if mode == Mode::Suffix && !self.layers.is_empty() && converged.len() == self.layers.len() {
                let converged_early = pos.index + 1 < self.order.len();
                debug!(line = %pos.line.id, visited, "all layers converged");
                return Ok(Some(Pass {
                    writes,
                    visited,
                    converged_early,
                }));
            }
        }

        Ok(Some(Pass {
            writes,
            visited,
            converged_early: false,
        }))
    }
}

/// Explicit items of a line by layer; the last declared item on a layer wins
fn explicit_items<'a>(
    pos: LinePosition<'a>,
    registered: &HashSet<&SourceLayerId>,
) -> Result<HashMap<&'a SourceLayerId, &'a Item>> {
    let mut explicit = HashMap::with_capacity(pos.line.items.len());
    for item in &pos.line.items {
        if !registered.contains(&item.layer) {
            return Err(Error::not_found("source layer", &item.layer));
        }
        item.validate()?;
        explicit.insert(&item.layer, item);
    }
    Ok(explicit)
}

/// Rebuilds the cursors in effect after the line before `start`
///
/// Returns `None` when the published entries there are missing or no longer
/// match the rundown, in which case the caller walks from the first line.
fn seed(
    order: &LineOrder<'_>,
    layers: &[&SourceLayerId],
    current: &EffectiveTable,
    start: usize,
) -> Option<LayerCursors> {
    let mut cursors = LayerCursors::default();
    if start == 0 {
        return Some(cursors);
    }

    let prev = order.get(start - 1)?;
    let stored = current.line(&prev.line.id)?;
    for &layer in layers {
        let Some(effect) = stored.entry(layer)? else {
            continue;
        };
        let (origin_pos, item) = order.item(&effect.origin)?;
        if &item.layer != layer || item.infinite_mode != effect.mode || origin_pos.line.id != effect.origin_line {
            return None;
        }
        if !item.is_infinite() {
            continue;
        }
        cursors.set(
            layer.clone(),
            ActiveOrigin {
                item: item.id.clone(),
                line: origin_pos.line.id.clone(),
                segment: origin_pos.segment.id.clone(),
                mode: item.infinite_mode,
                elapsed_ms: effect
                    .window
                    .elapsed_ms
                    .saturating_add(prev.line.expected_duration_ms),
            },
        );
    }
    Some(cursors)
}
