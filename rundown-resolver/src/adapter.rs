//! Edit-trigger adapter
//!
//! [`RundownSession`] owns a rundown and its resolver. Each [`Edit`] is
//! validated, applied and followed by a recompute from the right line in the
//! right mode while the rundown lock is held, so mutation + recompute pairs
//! never interleave. A failed recompute rolls the mutation back.

use parking_lot::Mutex;
use rundown_core::item::check_duration;
use rundown_core::{Content, InfiniteMode, Item, ItemId, Line, LineId, LineOrder, Rundown, SegmentId};
use tracing::{debug, warn};

use crate::{CancelToken, ContinuityResolver, Error, Mode, RecomputeReport, ResolverConfig, Result};

/// A rundown mutation that affects effective items
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "op", rename_all = "snake_case"))]
pub enum Edit {
    SetItemDuration { item: ItemId, duration_ms: i64 },
    SetItemInfiniteMode { item: ItemId, mode: InfiniteMode },
    SetItemContent { item: ItemId, content: Content },
    InsertItem { line: LineId, item: Item },
    RemoveItem { item: ItemId },
    SetLineDuration { line: LineId, duration_ms: u64 },
    InsertLine { segment: SegmentId, index: usize, line: Line },
    RemoveLine { line: LineId },
    MoveLine { line: LineId, segment: SegmentId, index: usize },
    /// Operator-issued re-run
    Recompute {
        #[cfg_attr(feature = "serde", serde(default))]
        from: Option<LineId>,
        #[cfg_attr(feature = "serde", serde(default))]
        run_to_end: bool,
    },
}

/// Where and how to recompute after an edit
#[derive(Debug)]
enum Trigger {
    Recompute {
        from: Option<LineId>,
        mode: Mode,
        /// Lines whose entries are dropped in the same publish
        removed: Vec<LineId>,
    },
    /// Only drop entries of a removed trailing line
    Forget(LineId),
}

/// A rundown together with its continuity resolver
#[derive(Debug)]
pub struct RundownSession {
    rundown: Mutex<Rundown>,
    resolver: ContinuityResolver,
}

impl RundownSession {
    /// Creates a session and resolves the whole rundown once
    pub fn new(rundown: Rundown, config: ResolverConfig) -> Result<Self> {
        let resolver = ContinuityResolver::new(config);
        resolver.recompute(&rundown, None, Mode::RunToEnd)?;
        Ok(Self {
            rundown: Mutex::new(rundown),
            resolver,
        })
    }

    /// The resolver publishing this session's effective items
    pub fn resolver(&self) -> &ContinuityResolver {
        &self.resolver
    }

    /// Runs `f` against the current rundown
    pub fn with_rundown<R>(&self, f: impl FnOnce(&Rundown) -> R) -> R {
        f(&self.rundown.lock())
    }

    /// Applies an edit and recomputes
    pub fn apply(&self, edit: Edit) -> Result<RecomputeReport> {
        self.apply_with_cancel(edit, &CancelToken::new())
    }

    /// Like [`apply`](Self::apply); a cancelled recompute rolls the edit back
    pub fn apply_with_cancel(&self, edit: Edit, cancel: &CancelToken) -> Result<RecomputeReport> {
        let mut rundown = self.rundown.lock();
        let backup = rundown.clone();
        debug!(?edit, "applying edit");

        let trigger = match mutate(&mut rundown, edit) {
            Ok(trigger) => trigger,
            Err(err) => {
                warn!(%err, "edit rejected");
                *rundown = backup;
                return Err(err);
            }
        };

        let result = match trigger {
            Trigger::Recompute { from, mode, removed } => {
                self.resolver.run(&rundown, from.as_ref(), mode, cancel, &removed)
            }
            Trigger::Forget(line) => Ok(self.resolver.forget_lines(&[line])),
        };
        if let Err(err) = &result {
            warn!(%err, "recompute failed, rolling edit back");
            *rundown = backup;
        }
        result
    }
}

/// Applies an edit to the rundown and decides how to recompute
fn mutate(rundown: &mut Rundown, edit: Edit) -> Result<Trigger> {
    let suffix = |line: LineId| Trigger::Recompute {
        from: Some(line),
        mode: Mode::Suffix,
        removed: Vec::new(),
    };
    let run_to_end = |line: Option<LineId>| Trigger::Recompute {
        from: line,
        mode: Mode::RunToEnd,
        removed: Vec::new(),
    };

    let trigger = match edit {
        Edit::SetItemDuration { item, duration_ms } => {
            let (line, target) = rundown.item_mut(&item).ok_or_else(|| Error::not_found("item", &item))?;
            check_duration(&item, target.infinite_mode, duration_ms)?;
            target.expected_duration_ms = duration_ms;
            suffix(line)
        }
        Edit::SetItemInfiniteMode { item, mode } => {
            let (line, target) = rundown.item_mut(&item).ok_or_else(|| Error::not_found("item", &item))?;
            check_duration(&item, mode, target.expected_duration_ms)?;
            target.infinite_mode = mode;
            suffix(line)
        }
        Edit::SetItemContent { item, content } => {
            let (line, target) = rundown.item_mut(&item).ok_or_else(|| Error::not_found("item", &item))?;
            target.content = content;
            suffix(line)
        }
        Edit::InsertItem { line, item } => {
            item.validate()?;
            if rundown.find_item(&item.id).is_some() {
                return Err(Error::InvalidState(format!("duplicate item id {}", item.id)));
            }
            let target = rundown.line_mut(&line).ok_or_else(|| Error::not_found("line", &line))?;
            target.items.push(item);
            suffix(line)
        }
        Edit::RemoveItem { item } => {
            let (line, _) = rundown.remove_item(&item)?;
            suffix(line)
        }
        Edit::SetLineDuration { line, duration_ms } => {
            let target = rundown.line_mut(&line).ok_or_else(|| Error::not_found("line", &line))?;
            target.expected_duration_ms = duration_ms;
            suffix(line)
        }
        Edit::InsertLine { segment, index, line } => {
            for item in &line.items {
                item.validate()?;
            }
            let id = line.id.clone();
            rundown.insert_line(&segment, index, line)?;
            run_to_end(Some(id))
        }
        Edit::RemoveLine { line } => {
            let next = removal_start(rundown, &line)?;
            rundown.remove_line(&line)?;
            match next {
                Some(next) => Trigger::Recompute {
                    from: Some(next),
                    mode: Mode::RunToEnd,
                    removed: vec![line],
                },
                None => Trigger::Forget(line),
            }
        }
        Edit::MoveLine { line, segment, index } => {
            let old = LineOrder::build(rundown)?
                .position(&line)
                .ok_or_else(|| Error::not_found("line", &line))?;
            rundown.move_line(&line, &segment, index)?;
            let order = LineOrder::build(rundown)?;
            let new = order
                .position(&line)
                .ok_or_else(|| Error::InvalidState(format!("line {line} lost while moving")))?;
            run_to_end(order.get(old.min(new)).map(|p| p.line.id.clone()))
        }
        Edit::Recompute { from, run_to_end } => Trigger::Recompute {
            from,
            mode: Mode::from_run_to_end(run_to_end),
            removed: Vec::new(),
        },
    };
    Ok(trigger)
}

/// The line that will sit at `line`'s position once it is removed
fn removal_start(rundown: &Rundown, line: &LineId) -> Result<Option<LineId>> {
    let order = LineOrder::build(rundown)?;
    let pos = order.position(line).ok_or_else(|| Error::not_found("line", line))?;
    Ok(order.get(pos + 1).map(|p| p.line.id.clone()))
}
