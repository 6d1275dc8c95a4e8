use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::ir::{OpId, OpTree};
use crate::layout::{EdgeSet, LayoutStats, compute_layout, default_depth, route_edges};
use crate::transition::{
    Animator, ReconcileCounts, SceneBackend, SceneCommand, TickOutcome, TransitionPlan, Visibility,
    VisualRegistry, reconcile,
};

pub type LayoutHook = Box<dyn FnMut(&OpTree, &LayoutStats)>;
pub type AnimationHook = Box<dyn FnMut(&OpTree)>;

/// One interactive diagram: the op tree, the visuals drawn for it, and the
/// animations in flight. Every user action runs a full layout pass and then
/// reconciles visuals against it.
pub struct LayoutSession<B: SceneBackend> {
    tree: OpTree,
    config: LayoutConfig,
    registry: VisualRegistry,
    animator: Animator,
    backend: B,
    edges: EdgeSet,
    stats: LayoutStats,
    on_layout: Vec<LayoutHook>,
    on_animation_complete: Vec<AnimationHook>,
}

impl<B: SceneBackend> LayoutSession<B> {
    pub fn new(tree: OpTree, config: LayoutConfig, backend: B) -> Result<Self, LayoutError> {
        config.validate()?;
        Ok(Self {
            tree,
            config,
            registry: VisualRegistry::new(),
            animator: Animator::new(),
            backend,
            edges: EdgeSet::default(),
            stats: LayoutStats::default(),
            on_layout: Vec::new(),
            on_animation_complete: Vec::new(),
        })
    }

    pub fn tree(&self) -> &OpTree {
        &self.tree
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn stats(&self) -> &LayoutStats {
        &self.stats
    }

    pub fn edges(&self) -> &EdgeSet {
        &self.edges
    }

    pub fn registry(&self) -> &VisualRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Called after every layout pass, before visuals are touched.
    pub fn on_layout(&mut self, hook: impl FnMut(&OpTree, &LayoutStats) + 'static) {
        self.on_layout.push(Box::new(hook));
    }

    /// Called once all tweens started by an action have finished.
    pub fn on_animation_complete(&mut self, hook: impl FnMut(&OpTree) + 'static) {
        self.on_animation_complete.push(Box::new(hook));
    }

    /// Opens the tree to its default depth, folds configured op families and
    /// draws everything in place without animation.
    pub fn initial_pass(&mut self) -> Result<ReconcileCounts, LayoutError> {
        let depth = default_depth(&self.tree, &self.config);
        set_depth(&mut self.tree, depth);
        let patterns = self.config.initially_collapsed_names.clone();
        let folded: Vec<OpId> = self
            .tree
            .ids()
            .filter(|id| {
                let op = self.tree.get(*id);
                !op.children.is_empty()
                    && patterns.iter().any(|pattern| name_matches(pattern, &op.name))
            })
            .collect();
        for id in folded {
            if id != self.tree.root() {
                self.tree.get_mut(id).collapsed = true;
            }
        }
        tracing::debug!(depth, ops = self.tree.len(), "initial layout");
        self.stats = compute_layout(&mut self.tree, &self.config);
        self.draw(&TransitionPlan::default())
    }

    pub fn expand(&mut self, key: &str) -> Result<ReconcileCounts, LayoutError> {
        let id = self.tree.resolve(key)?;
        self.transition(|tree| set_collapsed(tree, id, false))
    }

    pub fn collapse(&mut self, key: &str) -> Result<ReconcileCounts, LayoutError> {
        let id = self.tree.resolve(key)?;
        self.transition(|tree| set_collapsed(tree, id, true))
    }

    /// Expands every op sharing `name`, e.g. all `TransformerBlock`s.
    pub fn expand_class(&mut self, name: &str) -> Result<ReconcileCounts, LayoutError> {
        self.transition(|tree| set_class(tree, name, false))
    }

    pub fn collapse_class(&mut self, name: &str) -> Result<ReconcileCounts, LayoutError> {
        self.transition(|tree| set_class(tree, name, true))
    }

    /// Expands everything above `depth` and collapses everything at or below it.
    pub fn collapse_to_depth(&mut self, depth: u32) -> Result<ReconcileCounts, LayoutError> {
        self.transition(|tree| set_depth(tree, depth))
    }

    /// Advances animations by one frame.
    pub fn tick(&mut self, dt_ms: f32) -> TickOutcome {
        let outcome = self.animator.tick(dt_ms, &mut self.backend);
        if outcome.completed > 0 && outcome.running == 0 {
            self.fire_animation_complete();
        }
        outcome
    }

    /// Jumps every running tween to its end state.
    pub fn finish_animations(&mut self) {
        if self.animator.finish_all(&mut self.backend) > 0 {
            self.fire_animation_complete();
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    fn transition(
        &mut self,
        change: impl FnOnce(&mut OpTree) -> bool,
    ) -> Result<ReconcileCounts, LayoutError> {
        let before = Visibility::capture(&self.tree);
        if !change(&mut self.tree) {
            tracing::debug!("action changed nothing; layout skipped");
            return Ok(ReconcileCounts::default());
        }
        self.stats = compute_layout(&mut self.tree, &self.config);
        let plan = TransitionPlan::between(&self.tree, &before);
        self.draw(&plan)
    }

    fn draw(&mut self, plan: &TransitionPlan) -> Result<ReconcileCounts, LayoutError> {
        self.edges = route_edges(&self.tree, &self.config);
        for hook in &mut self.on_layout {
            hook(&self.tree, &self.stats);
        }

        let batch = reconcile(&self.tree, &self.edges, &mut self.registry, plan, &self.config)?;
        for command in &batch.commands {
            if let SceneCommand::Despawn { handle } = command {
                self.animator.discard(*handle);
            }
            self.backend.apply(command);
        }
        let superseded = self.animator.start_batch(batch.tweens, &mut self.backend);
        if superseded > 0 {
            tracing::debug!(superseded, "replaced running tweens");
        }
        if !self.animator.is_animating() {
            self.fire_animation_complete();
        }
        Ok(batch.counts)
    }

    fn fire_animation_complete(&mut self) {
        for hook in &mut self.on_animation_complete {
            hook(&self.tree);
        }
    }
}

fn set_collapsed(tree: &mut OpTree, id: OpId, collapsed: bool) -> bool {
    let op = tree.get_mut(id);
    if op.children.is_empty() || op.collapsed == collapsed || (collapsed && op.parent.is_none()) {
        return false;
    }
    op.collapsed = collapsed;
    true
}

fn set_class(tree: &mut OpTree, name: &str, collapsed: bool) -> bool {
    let matching: Vec<OpId> = tree.ids().filter(|id| tree.get(*id).name == name).collect();
    let mut changed = false;
    for id in matching {
        changed |= set_collapsed(tree, id, collapsed);
    }
    changed
}

fn set_depth(tree: &mut OpTree, depth: u32) -> bool {
    let ids: Vec<OpId> = tree.ids().collect();
    let mut changed = false;
    for id in ids {
        let collapsed = tree.get(id).depth >= depth;
        changed |= set_collapsed(tree, id, collapsed);
    }
    changed
}

/// Exact match, or prefix match when the pattern ends in `*`.
fn name_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}
