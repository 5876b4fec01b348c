//! Animation Phase Interpreter - timer-driven class/style phase chains.
//!
//! A chain is an ordered list of [`AnimPhase`]s. Each tick applies one phase,
//! schedules the next tick after the phase's duration, and picks the next
//! index: an explicit `goto_index` wins, then a numeric return from the
//! phase's start callback, then `index + 1`. Running off the end of the chain
//! stops it.
//!
//! # Tick order
//!
//! ```text
//! end(previous) -> [redirect? re-enter] -> stop if past end -> start(current)
//!   -> class/style -> schedule -> next index
//! ```
//!
//! An end callback returning an index redirects the chain synchronously, so
//! zero-duration "gate" phases can branch before anything visible happens.
//!
//! # Example
//!
//! ```ignore
//! use lighter::{AnimPhase, ClassAction};
//!
//! cmp.update_anim(vec![
//!     AnimPhase::new(100).class("fade-in"),
//!     AnimPhase::new(2000).class("visible"),
//!     AnimPhase::new(100).class("fade-out").goto(0),
//! ]);
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::host::{self, TimerId};
use crate::primitives::Cmp;
use crate::types::{ClassAction, ClassList, StyleMap};

// =============================================================================
// TYPES
// =============================================================================

/// Free-form key/value scratch state shared by one chain's callbacks.
#[derive(Default)]
pub struct AnimState {
    values: HashMap<String, Box<dyn Any>>,
}

impl AnimState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Any>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_string(), Box::new(value));
    }

    /// Typed read. `None` when the key is missing or holds another type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for AnimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Phase start/end callback. A returned index redirects the chain.
pub type PhaseFn = Rc<dyn Fn(&Cmp, &mut AnimState) -> Option<usize>>;

/// Computed next-phase index.
pub type GotoFn = Rc<dyn Fn(&Cmp, &mut AnimState) -> usize>;

/// Explicit next-phase index: literal or computed at tick time.
#[derive(Clone)]
pub enum GotoIndex {
    Index(usize),
    Computed(GotoFn),
}

impl fmt::Debug for GotoIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GotoIndex::Index(i) => f.debug_tuple("Index").field(i).finish(),
            GotoIndex::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// One phase of an animation chain.
#[derive(Clone, Default)]
pub struct AnimPhase {
    /// Milliseconds until the next tick.
    pub duration: u64,
    pub goto_index: Option<GotoIndex>,
    pub style: Option<StyleMap>,
    pub class: Option<ClassList>,
    /// Defaults to [`ClassAction::Replace`].
    pub class_action: Option<ClassAction>,
    pub phase_start: Option<PhaseFn>,
    pub phase_end: Option<PhaseFn>,
}

impl AnimPhase {
    pub fn new(duration: u64) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    pub fn class(mut self, class: impl Into<ClassList>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn action(mut self, action: ClassAction) -> Self {
        self.class_action = Some(action);
        self
    }

    pub fn style(mut self, style: impl Into<StyleMap>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn goto(mut self, index: usize) -> Self {
        self.goto_index = Some(GotoIndex::Index(index));
        self
    }

    pub fn goto_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &mut AnimState) -> usize + 'static,
    {
        self.goto_index = Some(GotoIndex::Computed(Rc::new(f)));
        self
    }

    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &mut AnimState) -> Option<usize> + 'static,
    {
        self.phase_start = Some(Rc::new(f));
        self
    }

    pub fn on_end<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cmp, &mut AnimState) -> Option<usize> + 'static,
    {
        self.phase_end = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for AnimPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimPhase")
            .field("duration", &self.duration)
            .field("goto_index", &self.goto_index)
            .field("class", &self.class)
            .field("class_action", &self.class_action)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

/// Per-node running chain.
pub(crate) struct AnimTimer {
    /// Distinguishes this application of a chain from any later one.
    generation: u64,
    chain: Rc<Vec<AnimPhase>>,
    cur_index: usize,
    /// Phase applied by the previous tick (its end callback runs next).
    prev_index: Option<usize>,
    scratch: Rc<RefCell<AnimState>>,
    timer: Option<TimerId>,
}

impl AnimTimer {
    pub(crate) fn cur_index(&self) -> usize {
        self.cur_index
    }

    pub(crate) fn is_ticking(&self) -> bool {
        self.timer.is_some()
    }
}

thread_local! {
    static NEXT_GENERATION: Cell<u64> = const { Cell::new(0) };
}

fn next_generation() -> u64 {
    NEXT_GENERATION.with(|g| {
        let id = g.get();
        g.set(id + 1);
        id
    })
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Replace a node's chain. The pending tick of the old chain is cancelled
/// first; an empty chain leaves the node idle.
pub fn update_anim(cmp: &Cmp, chain: Vec<AnimPhase>) {
    cancel_anim(cmp);
    if chain.is_empty() {
        return;
    }
    let generation = next_generation();
    cmp.borrow_mut().anim = Some(AnimTimer {
        generation,
        chain: Rc::new(chain),
        cur_index: 0,
        prev_index: None,
        scratch: Rc::new(RefCell::new(AnimState::new())),
        timer: None,
    });
    tracing::trace!(id = %cmp.id(), generation, "animation chain started");
    tick(cmp, generation);
}

/// Start the chain stored in the node's props, if any.
pub fn run_anims(cmp: &Cmp) {
    let chain = cmp.borrow().props.anim.clone();
    if let Some(chain) = chain {
        update_anim(cmp, chain);
    }
}

/// Stop a node's chain and clear its pending tick.
pub fn cancel_anim(cmp: &Cmp) {
    let previous = cmp.borrow_mut().anim.take();
    if let Some(AnimTimer {
        timer: Some(timer), ..
    }) = previous
    {
        host::clear_timeout(timer);
    }
}

/// Index the next tick will apply, while a chain is installed.
pub fn anim_index(cmp: &Cmp) -> Option<usize> {
    cmp.borrow().anim.as_ref().map(AnimTimer::cur_index)
}

/// True while a tick is scheduled.
pub fn is_animating(cmp: &Cmp) -> bool {
    cmp.borrow().anim.as_ref().is_some_and(AnimTimer::is_ticking)
}

// =============================================================================
// TICK
// =============================================================================

/// The chain applied as `generation` is still installed on a live node.
fn is_current(cmp: &Cmp, generation: u64) -> bool {
    let data = cmp.borrow();
    !data.is_removed() && data.anim.as_ref().is_some_and(|a| a.generation == generation)
}

fn tick(cmp: &Cmp, generation: u64) {
    loop {
        let (chain, cur, prev, scratch) = {
            let data = cmp.borrow();
            let Some(anim) = data.anim.as_ref() else { return };
            if anim.generation != generation {
                return;
            }
            (
                Rc::clone(&anim.chain),
                anim.cur_index,
                anim.prev_index,
                Rc::clone(&anim.scratch),
            )
        };

        // 1. Previous phase's end callback; a returned index re-enters here.
        let end_fn = prev.and_then(|i| chain.get(i)).and_then(|p| p.phase_end.clone());
        if let Some(end_fn) = end_fn {
            let redirect = end_fn(cmp, &mut scratch.borrow_mut());
            if !is_current(cmp, generation) {
                return;
            }
            if let Some(index) = redirect {
                tracing::trace!(id = %cmp.id(), from = cur, to = index, "phase end redirected chain");
                if let Some(anim) = cmp.borrow_mut().anim.as_mut() {
                    anim.cur_index = index;
                    anim.prev_index = None;
                }
                continue;
            }
        }

        // 2. Past the end: the chain is finished.
        let Some(phase) = chain.get(cur) else {
            if let Some(anim) = cmp.borrow_mut().anim.as_mut() {
                anim.timer = None;
                anim.prev_index = None;
            }
            tracing::trace!(id = %cmp.id(), "animation chain finished");
            return;
        };

        // 3. Start callback.
        let mut next_override = None;
        if let Some(start_fn) = phase.phase_start.clone() {
            next_override = start_fn(cmp, &mut scratch.borrow_mut());
            if !is_current(cmp, generation) {
                return;
            }
        }

        // 4. Mutations.
        if let Some(class) = &phase.class {
            cmp.apply_class(class, phase.class_action.unwrap_or_default());
        }
        if let Some(style) = &phase.style {
            cmp.apply_style(style);
        }

        // 6. Next index (computed before scheduling so a computed goto can
        //    still cancel the chain).
        let next = match &phase.goto_index {
            Some(GotoIndex::Index(index)) => *index,
            Some(GotoIndex::Computed(goto)) => {
                let index = goto(cmp, &mut scratch.borrow_mut());
                if !is_current(cmp, generation) {
                    return;
                }
                index
            }
            None => next_override.unwrap_or(cur + 1),
        };

        // 5. Schedule.
        let weak = cmp.downgrade();
        let timer = host::set_timeout(phase.duration, move || {
            if let Some(cmp) = weak.upgrade() {
                tick(&cmp, generation);
            }
        });
        let mut data = cmp.borrow_mut();
        match data.anim.as_mut() {
            Some(anim) if anim.generation == generation => {
                anim.timer = Some(timer);
                anim.prev_index = Some(cur);
                anim.cur_index = next;
            }
            _ => host::clear_timeout(timer),
        }
        tracing::trace!(id = %data.id, phase = cur, next, "animation tick");
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{add, Props};

    fn setup() -> Cmp {
        crate::reset_all();
        let root = host::create_element("main");
        host::append_child(host::body(), root);
        add(Props::new().id("anim").attach(root)).unwrap()
    }

    fn classes(cmp: &Cmp) -> String {
        host::get_attribute(cmp.elem(), "class").unwrap_or_default()
    }

    #[test]
    fn test_chain_applies_phases_in_order_and_stops() {
        let cmp = setup();
        update_anim(
            &cmp,
            vec![
                AnimPhase::new(10).class("a"),
                AnimPhase::new(10).class("b"),
                AnimPhase::new(10).class("c"),
            ],
        );
        assert_eq!(classes(&cmp), "a");
        host::advance(10);
        assert_eq!(classes(&cmp), "b");
        host::advance(10);
        assert_eq!(classes(&cmp), "c");
        host::advance(10);
        assert_eq!(classes(&cmp), "c");
        assert!(!is_animating(&cmp));
        assert_eq!(host::pending_timers(), 0);
    }

    #[test]
    fn test_goto_loops() {
        let cmp = setup();
        update_anim(
            &cmp,
            vec![
                AnimPhase::new(10).class("a"),
                AnimPhase::new(10).class("b"),
                AnimPhase::new(10).class("c").goto(0),
            ],
        );
        host::advance(30);
        assert_eq!(classes(&cmp), "a");
        assert!(is_animating(&cmp));
        assert_eq!(anim_index(&cmp), Some(1));
    }

    #[test]
    fn test_end_callback_redirects_synchronously() {
        let cmp = setup();
        update_anim(
            &cmp,
            vec![
                AnimPhase::new(0).on_end(|_, _| Some(2)),
                AnimPhase::new(10).class("skipped"),
                AnimPhase::new(10).class("target"),
            ],
        );
        host::run_pending();
        assert_eq!(classes(&cmp), "target");
    }

    #[test]
    fn test_start_callback_overrides_next_index() {
        let cmp = setup();
        update_anim(
            &cmp,
            vec![
                AnimPhase::new(10).class("a").on_start(|_, _| Some(2)),
                AnimPhase::new(10).class("b"),
                AnimPhase::new(10).class("c"),
            ],
        );
        host::advance(10);
        assert_eq!(classes(&cmp), "c");
    }

    #[test]
    fn test_computed_goto_reads_scratch_state() {
        let cmp = setup();
        let counter = AnimPhase::new(10)
            .on_start(|_, state| {
                let n = state.get::<u32>("n").copied().unwrap_or(0);
                state.set("n", n + 1);
                None
            })
            .goto_with(|_, state| if state.get::<u32>("n") == Some(&3) { 1 } else { 0 });
        update_anim(&cmp, vec![counter, AnimPhase::new(10).class("done")]);
        host::advance(30);
        assert_eq!(classes(&cmp), "done");
    }

    #[test]
    fn test_replacing_chain_cancels_pending_tick() {
        let cmp = setup();
        update_anim(&cmp, vec![AnimPhase::new(10).class("old"), AnimPhase::new(10).class("stale")]);
        update_anim(&cmp, vec![AnimPhase::new(50).class("new")]);
        host::advance(20);
        assert_eq!(classes(&cmp), "new");

        update_anim(&cmp, Vec::new());
        assert_eq!(anim_index(&cmp), None);
        assert_eq!(host::pending_timers(), 0);
    }

    #[test]
    fn test_removed_node_stops_ticking() {
        let cmp = setup();
        update_anim(&cmp, vec![AnimPhase::new(10).class("a"), AnimPhase::new(10).class("b")]);
        cmp.remove();
        assert_eq!(host::pending_timers(), 0);
    }
}
