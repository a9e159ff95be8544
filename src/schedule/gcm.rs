//! Global code motion.
//!
//! Click-style scheduling of data instructions onto the sequencing spine:
//! collect regions by predecessor topological order, build the dominator
//! tree (divergence destinations are dominated by the divergence node),
//! pin phi machinery, schedule early (shallowest region dominating all
//! producers), schedule late (LCA of the users, preferring the minimum
//! loop-nesting level on the path up to the early region), then serialize
//! each region's instructions in data-dependency order.
//!
//! Loop-nesting levels are currently the trivial all-zero assignment; the
//! late-scheduling rule that depends on them is kept in place so a natural
//! loop analysis over the dominator tree can plug in.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::asg::{AsgGraph, NodeId, NodeKind, predecessor_topological_order};

/// The serialized artifact of scheduling one functional: instructions
/// partitioned as constants | activation parameters | body, with the body
/// grouped by region in topological order.
#[derive(Debug)]
pub struct ScheduledInstructions {
    pub functional: NodeId,
    pub activation_parameters: Vec<NodeId>,
    pub constants: Vec<NodeId>,
    pub serialized_instructions: Vec<NodeId>,
}

impl ScheduledInstructions {
    /// The flat instruction order used by the interpreter:
    /// constants, then activation parameters, then the body.
    pub fn enumerate_for_interpretation(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.constants
            .iter()
            .chain(self.activation_parameters.iter())
            .chain(self.serialized_instructions.iter())
            .copied()
    }
}

/// Schedule a block definition. Captures and arguments form the activation
/// context, in that order.
pub fn schedule_block(graph: &AsgGraph, block_definition: NodeId) -> ScheduledInstructions {
    let mut activation_parameters = graph.inputs_attr(block_definition, "captures").to_vec();
    activation_parameters.extend_from_slice(graph.inputs_attr(block_definition, "arguments"));
    let exit_point = graph
        .optional_input_attr(block_definition, "exit_point")
        .expect("a block definition has an exit point");
    GlobalCodeMotion::new(graph, block_definition)
        .compute_for_regions(activation_parameters, predecessor_topological_order(graph, exit_point))
}

/// Schedule a top-level script (no activation parameters).
pub fn schedule_top_level_script(graph: &AsgGraph, script: NodeId) -> ScheduledInstructions {
    let exit_point = graph
        .optional_input_attr(script, "exit_point")
        .expect("a top-level script has an exit point");
    GlobalCodeMotion::new(graph, script)
        .compute_for_regions(Vec::new(), predecessor_topological_order(graph, exit_point))
}

struct GlobalCodeMotion<'g> {
    graph: &'g AsgGraph,
    functional: NodeId,

    regions: Vec<NodeId>,
    region_index: FxHashMap<NodeId, usize>,
    idoms: Vec<Option<usize>>,
    dominance_depths: Vec<Option<usize>>,
    loop_nesting_levels: Vec<usize>,

    activation_parameters: Vec<NodeId>,
    constants: Vec<NodeId>,
    data_instructions: Vec<NodeId>,
    data_index: FxHashMap<NodeId, usize>,
    user_lists: Vec<Vec<NodeId>>,

    pinned: Vec<bool>,
    early_schedule: Vec<usize>,
    schedule_regions: Vec<usize>,
}

impl<'g> GlobalCodeMotion<'g> {
    fn new(graph: &'g AsgGraph, functional: NodeId) -> Self {
        Self {
            graph,
            functional,
            regions: Vec::new(),
            region_index: FxHashMap::default(),
            idoms: Vec::new(),
            dominance_depths: Vec::new(),
            loop_nesting_levels: Vec::new(),
            activation_parameters: Vec::new(),
            constants: Vec::new(),
            data_instructions: Vec::new(),
            data_index: FxHashMap::default(),
            user_lists: Vec::new(),
            pinned: Vec::new(),
            early_schedule: Vec::new(),
            schedule_regions: Vec::new(),
        }
    }

    fn compute_for_regions(
        mut self,
        activation_parameters: Vec<NodeId>,
        regions: Vec<NodeId>,
    ) -> ScheduledInstructions {
        self.regions = regions;
        self.find_data_instructions(&activation_parameters);
        self.compute_user_lists();

        for (index, region) in self.regions.iter().enumerate() {
            self.region_index.insert(*region, index);
        }

        // The direct immediate dominators are missing the divergence
        // destinations; those are dominated by the divergence node itself.
        self.idoms = self
            .regions
            .iter()
            .map(|region| {
                self.graph
                    .direct_immediate_dominator(*region)
                    .and_then(|dominator| self.region_index.get(&dominator).copied())
            })
            .collect();
        for region_index in 0..self.regions.len() {
            let region = self.regions[region_index];
            for destination in self.graph.divergence_destinations(region) {
                let destination_index = self.region_index[&destination];
                debug_assert!(self.idoms[destination_index].is_none());
                self.idoms[destination_index] = Some(region_index);
            }
        }

        self.dominance_depths = vec![None; self.regions.len()];
        for index in 0..self.regions.len() {
            self.compute_dominance_depth_at(index);
        }

        self.compute_loop_nesting_levels();
        self.early_schedule_instructions();
        self.late_schedule_instructions();

        tracing::debug!(
            regions = self.regions.len(),
            instructions = self.data_instructions.len(),
            constants = self.constants.len(),
            "scheduled functional"
        );
        self.serialize_instructions()
    }

    // =========================================================================
    // Step B: data instruction discovery and classification
    // =========================================================================

    fn find_data_instructions(&mut self, activation_parameters: &[NodeId]) {
        let mut visited = FxHashSet::default();
        for parameter in activation_parameters {
            self.traverse_node(*parameter, &mut visited);
        }
        for region in self.regions.clone() {
            self.traverse_node(region, &mut visited);
        }
    }

    fn traverse_node(&mut self, node: NodeId, visited: &mut FxHashSet<NodeId>) {
        if !visited.insert(node) {
            return;
        }
        if !self.graph.is_constant_data_node(node) {
            for dependency in self.graph.scheduled_data_dependencies(node).collect::<Vec<_>>() {
                self.traverse_node(dependency, visited);
            }
        }

        let kind = self.graph.kind(node);
        if kind.is_pure_data() || kind.is_stateful_data() {
            if kind.is_activation_context_parameter() {
                self.activation_parameters.push(node);
            } else if self.graph.is_constant_data_node(node) {
                self.constants.push(node);
            } else {
                self.data_index.insert(node, self.data_instructions.len());
                self.data_instructions.push(node);
            }
        }
    }

    fn compute_user_lists(&mut self) {
        self.user_lists = vec![Vec::new(); self.data_instructions.len()];
        let mut user_sets: Vec<FxHashSet<NodeId>> =
            vec![FxHashSet::default(); self.data_instructions.len()];

        let users: Vec<NodeId> = self
            .regions
            .iter()
            .chain(self.data_instructions.iter())
            .copied()
            .collect();
        let graph = self.graph;
        for user in users {
            for dependency in graph.data_dependencies(user) {
                if let Some(index) = self.data_index.get(&dependency).copied() {
                    if user_sets[index].insert(user) {
                        self.user_lists[index].push(user);
                    }
                }
            }
        }
    }

    // =========================================================================
    // Step C/D: dominator depths and loop nesting
    // =========================================================================

    fn compute_dominance_depth_at(&mut self, index: usize) -> usize {
        if let Some(depth) = self.dominance_depths[index] {
            return depth;
        }
        let depth = match self.idoms[index] {
            Some(idom) => self.compute_dominance_depth_at(idom) + 1,
            None => 0,
        };
        self.dominance_depths[index] = Some(depth);
        depth
    }

    fn depth(&self, index: usize) -> usize {
        self.dominance_depths[index].expect("dominance depths are computed up front")
    }

    fn compute_loop_nesting_levels(&mut self) {
        self.loop_nesting_levels = vec![0; self.regions.len()];
    }

    // =========================================================================
    // Step E: early schedule
    // =========================================================================

    fn early_schedule_instructions(&mut self) {
        self.early_schedule = vec![0; self.data_instructions.len()];
        self.pinned = vec![false; self.data_instructions.len()];

        // Pin phi nodes to their convergence region and each phi value to
        // the predecessor region its value arrives from.
        for instruction in self.data_instructions.clone() {
            if self.graph.kind(instruction) != NodeKind::Phi {
                continue;
            }
            let convergence = self
                .graph
                .optional_input_attr(instruction, "predecessor")
                .expect("a phi is pinned to its convergence region");
            self.pin_instruction_to_region(instruction, convergence);
            for incoming in self.graph.inputs_attr(instruction, "values") {
                let predecessor = self
                    .graph
                    .optional_input_attr(*incoming, "predecessor")
                    .expect("a phi value is pinned to its predecessor region");
                self.pin_instruction_to_region(*incoming, predecessor);
            }
        }

        let mut visited = vec![false; self.data_instructions.len()];
        for index in 0..self.data_instructions.len() {
            self.early_visit_instruction(index, &mut visited);
        }
    }

    fn pin_instruction_to_region(&mut self, instruction: NodeId, region: NodeId) {
        let region_index = self.region_index[&region];
        let instruction_index = self.data_index[&instruction];
        debug_assert!(!self.pinned[instruction_index]);
        self.early_schedule[instruction_index] = region_index;
        self.pinned[instruction_index] = true;
    }

    fn early_visit_instruction(&mut self, instruction_index: usize, visited: &mut Vec<bool>) {
        if visited[instruction_index] {
            return;
        }
        visited[instruction_index] = true;
        let instruction = self.data_instructions[instruction_index];

        for dependency in self.graph.data_dependencies(instruction).collect::<Vec<_>>() {
            let Some(dependency_index) = self.data_index.get(&dependency).copied() else {
                continue;
            };
            self.early_visit_instruction(dependency_index, visited);

            if !self.pinned[instruction_index] {
                let dependency_depth = self.depth(self.early_schedule[dependency_index]);
                let instruction_depth = self.depth(self.early_schedule[instruction_index]);
                if instruction_depth < dependency_depth {
                    self.early_schedule[instruction_index] = self.early_schedule[dependency_index];
                }
            }
        }
    }

    // =========================================================================
    // Step F: late schedule
    // =========================================================================

    fn late_schedule_instructions(&mut self) {
        self.schedule_regions = self.early_schedule.clone();
        let mut visited = vec![false; self.data_instructions.len()];

        // Pinned instructions do not move; their users are still processed.
        // Mark every pinned instruction first so a user visit can never
        // reschedule one.
        for index in 0..self.data_instructions.len() {
            if self.pinned[index] {
                visited[index] = true;
            }
        }
        for index in 0..self.data_instructions.len() {
            if self.pinned[index] {
                for user in self.user_lists[index].clone() {
                    self.late_visit_instruction(user, &mut visited);
                }
            }
        }
        for index in 0..self.data_instructions.len() {
            if !visited[index] {
                self.late_visit_instruction(self.data_instructions[index], &mut visited);
            }
        }
    }

    fn late_visit_instruction(&mut self, instruction: NodeId, visited: &mut Vec<bool>) {
        let Some(instruction_index) = self.data_index.get(&instruction).copied() else {
            return;
        };
        if visited[instruction_index] {
            return;
        }
        visited[instruction_index] = true;

        let mut lca: Option<usize> = None;
        for user in self.user_lists[instruction_index].clone() {
            self.late_visit_instruction(user, visited);
            let user_block = self.block_index_of_instruction_user(user, instruction);
            lca = Some(self.compute_block_lca(lca, user_block));
        }

        // An instruction with no users keeps its early region.
        let Some(lca) = lca else {
            return;
        };

        // Walk from the LCA up toward the early region, picking the region
        // with the minimum loop-nesting level.
        let mut best_block = lca;
        let mut current = lca;
        while current != self.schedule_regions[instruction_index] {
            let Some(next) = self.idoms[current] else {
                break;
            };
            current = next;
            if self.loop_nesting_levels[current] < self.loop_nesting_levels[best_block] {
                best_block = current;
            }
        }
        self.schedule_regions[instruction_index] = best_block;
    }

    /// The region index in which `user` consumes `used_value`: a data
    /// instruction lives in its scheduled region, a sequencing node in its
    /// declared region of used values.
    fn block_index_of_instruction_user(&self, user: NodeId, used_value: NodeId) -> usize {
        if let Some(user_index) = self.data_index.get(&user) {
            return self.schedule_regions[*user_index];
        }
        let user_region = self
            .graph
            .region_of_used_value(user, used_value)
            .expect("a sequencing user declares the region of its used values");
        self.region_index[&user_region]
    }

    fn compute_block_lca(&self, a: Option<usize>, b: usize) -> usize {
        let Some(mut a) = a else {
            return b;
        };
        let mut b = b;

        // Climb until the same level
        while self.depth(a) > self.depth(b) {
            a = self.idoms[a].expect("a deeper region has a dominator");
        }
        while self.depth(b) > self.depth(a) {
            b = self.idoms[b].expect("a deeper region has a dominator");
        }

        // Climb until the same
        while a != b {
            a = self.idoms[a].expect("regions in one spine share a dominator");
            b = self.idoms[b].expect("regions in one spine share a dominator");
        }
        a
    }

    // =========================================================================
    // Step G/H: serialization
    // =========================================================================

    fn serialize_instructions(self) -> ScheduledInstructions {
        let mut per_region_instructions: Vec<Vec<NodeId>> =
            vec![Vec::new(); self.regions.len()];
        for (index, region_index) in self.schedule_regions.iter().enumerate() {
            per_region_instructions[*region_index].push(self.data_instructions[index]);
        }

        let mut serialized_instructions = Vec::new();
        for (region_index, region) in self.regions.iter().enumerate() {
            serialized_instructions.push(*region);
            serialized_instructions
                .extend(self.sort_region_instructions(&per_region_instructions[region_index]));
        }

        ScheduledInstructions {
            functional: self.functional,
            activation_parameters: self.activation_parameters,
            constants: self.constants,
            serialized_instructions,
        }
    }

    /// Topologically sort one region's instructions by data dependency,
    /// grouping phis first, ordinary instructions next, and phi-value
    /// writes last.
    fn sort_region_instructions(&self, instructions: &[NodeId]) -> Vec<NodeId> {
        let instruction_set: FxHashSet<NodeId> = instructions.iter().copied().collect();
        let mut visited = FxHashSet::default();
        let mut sorted_phis = Vec::new();
        let mut sorted_instructions = Vec::new();
        let mut sorted_phi_values = Vec::new();

        for instruction in instructions {
            self.sort_visit_instruction(
                *instruction,
                &instruction_set,
                &mut visited,
                &mut sorted_phis,
                &mut sorted_instructions,
                &mut sorted_phi_values,
            );
        }

        sorted_phis
            .into_iter()
            .chain(sorted_instructions)
            .chain(sorted_phi_values)
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn sort_visit_instruction(
        &self,
        instruction: NodeId,
        instruction_set: &FxHashSet<NodeId>,
        visited: &mut FxHashSet<NodeId>,
        sorted_phis: &mut Vec<NodeId>,
        sorted_instructions: &mut Vec<NodeId>,
        sorted_phi_values: &mut Vec<NodeId>,
    ) {
        if visited.contains(&instruction) || !instruction_set.contains(&instruction) {
            return;
        }
        visited.insert(instruction);

        for dependency in self.graph.data_dependencies(instruction) {
            self.sort_visit_instruction(
                dependency,
                instruction_set,
                visited,
                sorted_phis,
                sorted_instructions,
                sorted_phi_values,
            );
        }

        match self.graph.kind(instruction) {
            NodeKind::Phi => sorted_phis.push(instruction),
            NodeKind::PhiValue => sorted_phi_values.push(instruction),
            _ => sorted_instructions.push(instruction),
        }
    }
}
