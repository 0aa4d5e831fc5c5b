//! Graph cleaner.
//!
//! Rewrites a raw branch graph into its canonical form through four
//! transitions, each consuming one [`BranchGraph`] and returning a new one:
//!
//! ```text
//! Raw → orient → prune → merge (fixpoint) → compact → ... → orient → Stable
//! ```
//!
//! [`GraphCleaner::clean`] repeats the orient/prune/merge/compact round until
//! a round changes nothing, then orients once more. The resulting graph has
//! no merge points, no end branch shorter than the threshold, a single
//! connected component, and every end branch starts at its tip.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::classify::classify;
use crate::policy::SkeletonPolicyV1;
use crate::types::{Branch, BranchGraph, BranchId, PointId, PointSet};

/// Error type for cleaning.
///
/// Both variants mean the rewrite loop failed to shrink the graph, which the
/// transitions rule out. They surface bugs instead of spinning forever.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CleanError {
    /// The merge fixpoint kept finding merges.
    #[error("Merge did not converge after {passes} passes")]
    MergeDidNotConverge {
        /// Passes run before giving up.
        passes: usize,
    },
    /// The cleaning rounds kept changing the graph.
    #[error("Cleaning did not reach a fixpoint after {rounds} rounds")]
    RoundsDidNotConverge {
        /// Rounds run before giving up.
        rounds: usize,
    },
}

/// States of a graph moving through the cleaner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanStage {
    /// Straight out of the tracer.
    Raw,
    /// End branches start at their tip.
    Oriented,
    /// Short end branches removed.
    Pruned,
    /// No merge points left.
    Merged,
    /// Single component, no unreferenced points.
    Compacted,
    /// Fixpoint reached.
    Stable,
}

impl fmt::Display for CleanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Oriented => write!(f, "oriented"),
            Self::Pruned => write!(f, "pruned"),
            Self::Merged => write!(f, "merged"),
            Self::Compacted => write!(f, "compacted"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transitions
// ─────────────────────────────────────────────────────────────────────────────

/// Reverse end branches so they begin at their endpoint.
///
/// A branch whose first point is already an endpoint is left alone, so a
/// free-standing segment with two endpoints keeps its direction.
pub fn orient(graph: BranchGraph) -> BranchGraph {
    let classes = classify(&graph);
    let flip: BTreeSet<BranchId> = classes
        .end_pairs()
        .filter(|(end_point, branch_id)| {
            graph.branch(*branch_id).is_some_and(|b| {
                b.first()
                    .is_some_and(|first| first != *end_point && !classes.is_endpoint(first))
            })
        })
        .map(|(_, branch_id)| branch_id)
        .collect();

    if flip.is_empty() {
        return graph;
    }

    let (points, branches) = graph.into_parts();
    let branches = branches
        .into_iter()
        .enumerate()
        .map(|(i, b)| {
            if flip.contains(&BranchId::new(i)) {
                b.reversed()
            } else {
                b
            }
        })
        .collect();
    BranchGraph::new(points, branches)
}

/// Remove end branches with fewer than `min_points` points.
pub fn prune(graph: BranchGraph, min_points: usize) -> BranchGraph {
    let classes = classify(&graph);
    let doomed: BTreeSet<BranchId> = classes
        .unique_end_branches()
        .into_iter()
        .filter(|id| graph.branch(*id).is_some_and(|b| b.len() < min_points))
        .collect();

    if doomed.is_empty() {
        return graph;
    }

    tracing::debug!(removed = doomed.len(), "pruning short end branches");
    let (points, branches) = graph.into_parts();
    let branches = branches
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !doomed.contains(&BranchId::new(*i)))
        .map(|(_, b)| b)
        .collect();
    BranchGraph::new(points, branches)
}

/// Outcome of a single merge scan.
#[derive(Debug, Clone)]
pub struct MergePass {
    /// Graph after the scan.
    pub graph: BranchGraph,
    /// Merge points spliced in this scan.
    pub merged: usize,
    /// Merge points skipped because a branch was already spliced.
    pub deferred: usize,
}

/// Splice branches at every merge point once.
///
/// When a merge point's branch was already consumed by an earlier splice in
/// the same scan, that merge waits for the next scan.
pub fn merge_pass(graph: BranchGraph) -> MergePass {
    let classes = classify(&graph);
    let mut consumed: BTreeSet<BranchId> = BTreeSet::new();
    let mut spliced: Vec<Branch> = Vec::new();
    let mut deferred = 0;

    for &point in &classes.merge_points {
        let [a, b] = match classes.incident_branches(point) {
            [a, b] => [*a, *b],
            _ => continue,
        };
        if consumed.contains(&a) || consumed.contains(&b) {
            deferred += 1;
            continue;
        }
        let (Some(first), Some(second)) = (graph.branch(a), graph.branch(b)) else {
            continue;
        };
        spliced.push(splice(first, second, point));
        consumed.insert(a);
        consumed.insert(b);
    }

    let merged = spliced.len();
    if merged == 0 {
        return MergePass {
            graph,
            merged,
            deferred,
        };
    }

    let (points, branches) = graph.into_parts();
    let branches = branches
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !consumed.contains(&BranchId::new(*i)))
        .map(|(_, b)| b)
        .chain(spliced)
        .collect();

    MergePass {
        graph: BranchGraph::new(points, branches),
        merged,
        deferred,
    }
}

/// Join two branches meeting at `point` into one with `point` inside.
fn splice(first: &Branch, second: &Branch, point: PointId) -> Branch {
    let head = if first.first() == Some(point) {
        first.reversed()
    } else {
        first.clone()
    };
    let tail = if second.last() == Some(point) {
        second.reversed()
    } else {
        second.clone()
    };

    let mut points = head.into_points();
    points.extend(tail.points().iter().skip(1));
    Branch::new(points)
}

/// Run merge scans until no merge point remains.
///
/// Returns the merged graph and the number of scans that spliced something.
pub fn merge(mut graph: BranchGraph) -> Result<(BranchGraph, usize), CleanError> {
    // Every productive scan removes at least one branch.
    let limit = graph.num_branches();
    let mut passes = 0;

    loop {
        let pass = merge_pass(graph);
        graph = pass.graph;
        if pass.merged == 0 {
            return Ok((graph, passes));
        }
        passes += 1;
        tracing::trace!(
            pass = passes,
            merged = pass.merged,
            deferred = pass.deferred,
            "merge scan"
        );
        if passes > limit {
            return Err(CleanError::MergeDidNotConverge { passes });
        }
    }
}

/// Keep only the largest connected component and drop unreferenced points.
///
/// Components are ranked by distinct point count; ties go to the component
/// holding the lowest point id. Consecutive repeated points are collapsed,
/// branches left with fewer than two points are dropped, and so are
/// duplicates of an earlier branch in either direction. Surviving points are
/// renumbered densely in their previous order and keep their attributes.
pub fn compact(graph: BranchGraph) -> BranchGraph {
    let (points, branches) = graph.into_parts();

    let branches: Vec<Branch> = dedup_branches(branches);
    let Some(keep_root) = largest_component(points.len(), &branches) else {
        return BranchGraph::new(PointSet::new(), Vec::new());
    };

    let mut components = UnionFind::new(points.len());
    for branch in &branches {
        components.union_chain(branch.points());
    }
    let kept: Vec<Branch> = branches
        .into_iter()
        .filter(|b| {
            b.first()
                .is_some_and(|p| components.find(p.index()) == keep_root)
        })
        .collect();

    let mut used = vec![false; points.len()];
    for branch in &kept {
        for p in branch.points() {
            used[p.index()] = true;
        }
    }

    let mut remap: Vec<Option<PointId>> = vec![None; points.len()];
    let mut survivors = PointSet::new();
    for (id, point) in points.iter() {
        if used[id.index()] {
            remap[id.index()] = Some(survivors.push(point.clone()));
        }
    }

    let kept = kept
        .into_iter()
        .map(|b| {
            Branch::new(
                b.points()
                    .iter()
                    .filter_map(|p| remap[p.index()])
                    .collect(),
            )
        })
        .collect();

    BranchGraph::new(survivors, kept)
}

fn dedup_branches(branches: Vec<Branch>) -> Vec<Branch> {
    let mut seen: HashSet<Vec<PointId>> = HashSet::new();
    let mut out = Vec::with_capacity(branches.len());

    for branch in branches {
        let mut pts = branch.into_points();
        pts.dedup();
        if pts.len() < 2 {
            continue;
        }
        let reversed: Vec<PointId> = pts.iter().rev().copied().collect();
        if seen.contains(&pts) || seen.contains(&reversed) {
            continue;
        }
        seen.insert(pts.clone());
        out.push(Branch::new(pts));
    }

    out
}

/// Root of the largest component among referenced points.
fn largest_component(n: usize, branches: &[Branch]) -> Option<usize> {
    let mut components = UnionFind::new(n);
    let mut referenced = vec![false; n];
    for branch in branches {
        components.union_chain(branch.points());
        for p in branch.points() {
            referenced[p.index()] = true;
        }
    }

    // root -> (size, lowest point id)
    let mut sizes: BTreeMap<usize, (usize, usize)> = BTreeMap::new();
    for p in (0..n).filter(|p| referenced[*p]) {
        let entry = sizes.entry(components.find(p)).or_insert((0, p));
        entry.0 += 1;
    }

    sizes
        .into_iter()
        .max_by(|(_, (size_a, low_a)), (_, (size_b, low_b))| {
            size_a.cmp(size_b).then_with(|| low_b.cmp(low_a))
        })
        .map(|(root, _)| root)
}

/// Number of connected components formed by the branches of a graph.
pub fn component_count(graph: &BranchGraph) -> usize {
    let n = graph.num_points();
    let mut components = UnionFind::new(n);
    let mut referenced = vec![false; n];
    for branch in graph.branches() {
        components.union_chain(branch.points());
        for p in branch.points() {
            referenced[p.index()] = true;
        }
    }
    (0..n)
        .filter(|p| referenced[*p])
        .map(|p| components.find(p))
        .collect::<BTreeSet<_>>()
        .len()
}

/// Disjoint sets over dense point indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index becomes the root so roots are stable across runs.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }

    fn union_chain(&mut self, points: &[PointId]) {
        for pair in points.windows(2) {
            self.union(pair[0].index(), pair[1].index());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cleaner
// ─────────────────────────────────────────────────────────────────────────────

/// Ways a graph can fall short of the stable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StableViolation {
    /// A boundary point shared by exactly two branches.
    MergePoint {
        /// The point.
        point: PointId,
    },
    /// An end branch below the pruning threshold.
    ShortEndBranch {
        /// The branch.
        branch: BranchId,
        /// Its point count.
        points: usize,
    },
    /// An end branch that does not start at an endpoint.
    TipNotFirst {
        /// The branch.
        branch: BranchId,
    },
    /// More than one connected component.
    Disconnected {
        /// Number of components.
        components: usize,
    },
}

/// List every way `graph` violates the stable form for `min_points`.
pub fn stable_violations(graph: &BranchGraph, min_points: usize) -> Vec<StableViolation> {
    let classes = classify(graph);
    let mut violations: Vec<StableViolation> = classes
        .merge_points
        .iter()
        .map(|p| StableViolation::MergePoint { point: *p })
        .collect();

    for id in classes.unique_end_branches() {
        let Some(branch) = graph.branch(id) else {
            continue;
        };
        if branch.len() < min_points {
            violations.push(StableViolation::ShortEndBranch {
                branch: id,
                points: branch.len(),
            });
        }
        if !branch.first().is_some_and(|p| classes.is_endpoint(p)) {
            violations.push(StableViolation::TipNotFirst { branch: id });
        }
    }

    let components = component_count(graph);
    if components > 1 {
        violations.push(StableViolation::Disconnected { components });
    }
    violations
}

/// Result of cleaning a graph.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    /// The stable graph.
    pub graph: BranchGraph,
    /// Always [`CleanStage::Stable`] on success.
    pub stage: CleanStage,
    /// Cleaning rounds run, including the final no-op round.
    pub rounds: usize,
    /// End branches removed by pruning.
    pub pruned: usize,
    /// Productive merge scans across all rounds.
    pub merge_passes: usize,
}

/// Drives a branch graph to its stable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphCleaner {
    min_end_branch_points: usize,
}

impl GraphCleaner {
    /// Create a cleaner with a pruning threshold.
    pub fn new(min_end_branch_points: usize) -> Self {
        Self {
            min_end_branch_points,
        }
    }

    /// Create a cleaner from a policy.
    pub fn from_policy(policy: &SkeletonPolicyV1) -> Self {
        Self::new(policy.min_end_branch_points)
    }

    /// Pruning threshold.
    pub fn min_end_branch_points(&self) -> usize {
        self.min_end_branch_points
    }

    /// Clean a raw graph until it is stable.
    pub fn clean(&self, graph: BranchGraph) -> Result<CleanOutcome, CleanError> {
        let limit = graph.num_branches() + graph.num_points() + 2;
        let mut graph = graph;
        let mut rounds = 0;
        let mut pruned = 0;
        let mut merge_passes = 0;

        loop {
            let before = graph.clone();
            rounds += 1;

            graph = orient(graph);
            tracing::trace!(round = rounds, stage = %CleanStage::Oriented, branches = graph.num_branches());

            let count = graph.num_branches();
            graph = prune(graph, self.min_end_branch_points);
            pruned += count - graph.num_branches();
            tracing::trace!(round = rounds, stage = %CleanStage::Pruned, branches = graph.num_branches());

            let (merged, passes) = merge(graph)?;
            graph = merged;
            merge_passes += passes;
            tracing::trace!(round = rounds, stage = %CleanStage::Merged, branches = graph.num_branches());

            graph = compact(graph);
            tracing::trace!(
                round = rounds,
                stage = %CleanStage::Compacted,
                branches = graph.num_branches(),
                points = graph.num_points()
            );

            if graph == before {
                break;
            }
            if rounds >= limit {
                return Err(CleanError::RoundsDidNotConverge { rounds });
            }
        }

        let graph = orient(graph);
        tracing::debug!(
            rounds,
            pruned,
            merge_passes,
            branches = graph.num_branches(),
            points = graph.num_points(),
            "graph cleaning reached a fixpoint"
        );

        Ok(CleanOutcome {
            graph,
            stage: CleanStage::Stable,
            rounds,
            pruned,
            merge_passes,
        })
    }
}

impl Default for GraphCleaner {
    fn default() -> Self {
        Self::from_policy(&SkeletonPolicyV1::default())
    }
}
