//! The node meta-object protocol.
//!
//! Every graph node is defined by a schema of attribute descriptors
//! ([`AttrSpec`]); the schema drives construction, structural hashing and
//! equality (the basis of global value numbering), dependency iteration and
//! the dynamic-programming rewrites. Nodes live in an arena ([`AsgGraph`])
//! and refer to each other by integer handle ([`NodeId`]); handle identity
//! is node identity, while `unification_hash`/`unification_equals` provide
//! structural identity over kind + compared attributes + recursively
//! unified inputs.
//!
//! Misusing the construction protocol (excess positional values, unknown
//! attribute names, role/value mismatches) is a programming error and
//! panics with a descriptive message; all recoverable failures elsewhere in
//! the pipeline travel as error nodes or `Result`s.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::{FxHashSet, FxHasher};
use smol_str::SmolStr;

use crate::base::SourcePosition;

use super::derivation::Derivation;
use super::nodes::NodeKind;

// ============================================================================
// HANDLES
// ============================================================================

/// Arena handle of a node. Identity of the handle is identity of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// ============================================================================
// DATA VALUES
// ============================================================================

/// Opaque host objects embeddable as literal node payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostObject {
    Stdio,
}

/// A compile-time primitive implementation: given the graph, a reduction
/// derivation and the (already reduced) argument nodes, build the folded
/// replacement node.
pub type CompileTimeImpl = fn(&mut AsgGraph, Derivation, &[NodeId]) -> NodeId;

/// Plain payload of a data attribute.
#[derive(Debug, Clone)]
pub enum DataValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(SmolStr),
    Object(HostObject),
    CompileImpl(Option<CompileTimeImpl>),
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataValue::None, DataValue::None) => true,
            (DataValue::Bool(a), DataValue::Bool(b)) => a == b,
            (DataValue::Int(a), DataValue::Int(b)) => a == b,
            // Bit comparison keeps equality total and consistent with hashing.
            (DataValue::Float(a), DataValue::Float(b)) => a.to_bits() == b.to_bits(),
            (DataValue::Char(a), DataValue::Char(b)) => a == b,
            (DataValue::Str(a), DataValue::Str(b)) => a == b,
            (DataValue::Object(a), DataValue::Object(b)) => a == b,
            (DataValue::CompileImpl(a), DataValue::CompileImpl(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => std::ptr::fn_addr_eq(*a, *b),
                _ => false,
            },
            _ => false,
        }
    }
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            DataValue::None => {}
            DataValue::Bool(v) => v.hash(state),
            DataValue::Int(v) => v.hash(state),
            DataValue::Float(v) => v.to_bits().hash(state),
            DataValue::Char(v) => v.hash(state),
            DataValue::Str(v) => v.hash(state),
            DataValue::Object(v) => v.hash(state),
            DataValue::CompileImpl(_) => {}
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::None => write!(f, "nil"),
            DataValue::Bool(v) => write!(f, "{v}"),
            DataValue::Int(v) => write!(f, "{v}"),
            DataValue::Float(v) => write!(f, "{v}"),
            DataValue::Char(v) => write!(f, "${v}"),
            DataValue::Str(v) => write!(f, "'{v}'"),
            DataValue::Object(HostObject::Stdio) => write!(f, "Stdio"),
            DataValue::CompileImpl(_) => write!(f, "<compile-time impl>"),
        }
    }
}

// ============================================================================
// ATTRIBUTE DESCRIPTORS
// ============================================================================

/// Role of a construction attribute. The role decides how the attribute is
/// initialized, whether it carries node edges, and which dependency
/// iterators it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrRole {
    /// A plain value; may declare a default and a compared-for-unification flag.
    Data,
    /// Provenance; never compared for unification.
    SourceDerivation,
    /// Zero-or-one edge to a sequencing node. Filled by name, defaults to none.
    SequencingPredecessor,
    /// Ordered edges to sequencing nodes. Filled by name, defaults to empty.
    SequencingPredecessors,
    /// An edge into a sequencing region (branch target, block entry).
    SequencingDestination,
    /// A required edge to a pure-data producer.
    DataInput,
    /// A zero-or-one edge to a pure-data producer.
    OptionalDataInput,
    /// An ordered sequence of data edges.
    DataInputs,
}

impl AttrRole {
    fn is_predecessor(self) -> bool {
        matches!(
            self,
            AttrRole::SequencingPredecessor | AttrRole::SequencingPredecessors
        )
    }

    fn is_port(self) -> bool {
        matches!(
            self,
            AttrRole::DataInput
                | AttrRole::OptionalDataInput
                | AttrRole::DataInputs
                | AttrRole::SequencingDestination
        )
    }
}

/// One attribute descriptor. Schemas are static per node kind; the arrays
/// are declared in construction order (numbered attributes first,
/// sequencing predecessors last).
#[derive(Debug, Clone, Copy)]
pub struct AttrSpec {
    pub name: &'static str,
    pub role: AttrRole,
    /// Participates in unification hashing and equality.
    pub compared: bool,
    /// Port whose value the interpreter resolves before executing the node.
    pub interpreted: bool,
    /// Shown by `print_name_with_data_attributes` (data attributes only).
    pub printed: bool,
    pub default: Option<fn() -> DataValue>,
}

fn default_none() -> DataValue {
    DataValue::None
}

fn default_false() -> DataValue {
    DataValue::Bool(false)
}

fn default_zero() -> DataValue {
    DataValue::Int(0)
}

impl AttrSpec {
    pub const fn data(name: &'static str) -> Self {
        Self {
            name,
            role: AttrRole::Data,
            compared: true,
            interpreted: false,
            printed: true,
            default: None,
        }
    }

    pub const fn data_defaulting_to_none(name: &'static str) -> Self {
        Self {
            default: Some(default_none),
            ..Self::data(name)
        }
    }

    pub const fn name_attribute(name: &'static str) -> Self {
        Self {
            compared: false,
            default: Some(default_none),
            ..Self::data(name)
        }
    }

    pub const fn index_attribute(name: &'static str) -> Self {
        Self {
            default: Some(default_zero),
            ..Self::data(name)
        }
    }

    pub const fn flag(name: &'static str) -> Self {
        Self {
            default: Some(default_false),
            ..Self::data(name)
        }
    }

    pub const fn compile_impl(name: &'static str) -> Self {
        Self {
            compared: false,
            printed: false,
            default: Some(default_none),
            ..Self::data(name)
        }
    }

    pub const fn source() -> Self {
        Self {
            name: "source_derivation",
            role: AttrRole::SourceDerivation,
            compared: false,
            interpreted: false,
            printed: false,
            default: None,
        }
    }

    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            role: AttrRole::DataInput,
            compared: true,
            interpreted: true,
            printed: false,
            default: None,
        }
    }

    pub const fn input_not_interpreted(name: &'static str) -> Self {
        Self {
            interpreted: false,
            ..Self::input(name)
        }
    }

    pub const fn optional_input(name: &'static str) -> Self {
        Self {
            role: AttrRole::OptionalDataInput,
            ..Self::input(name)
        }
    }

    pub const fn inputs(name: &'static str) -> Self {
        Self {
            role: AttrRole::DataInputs,
            ..Self::input(name)
        }
    }

    pub const fn inputs_not_interpreted(name: &'static str) -> Self {
        Self {
            interpreted: false,
            ..Self::inputs(name)
        }
    }

    pub const fn destination(name: &'static str) -> Self {
        Self {
            role: AttrRole::SequencingDestination,
            ..Self::input(name)
        }
    }

    pub const fn destination_not_interpreted(name: &'static str) -> Self {
        Self {
            interpreted: false,
            ..Self::destination(name)
        }
    }

    pub const fn predecessor(name: &'static str) -> Self {
        Self {
            name,
            role: AttrRole::SequencingPredecessor,
            compared: true,
            interpreted: false,
            printed: false,
            default: None,
        }
    }

    pub const fn predecessors(name: &'static str) -> Self {
        Self {
            role: AttrRole::SequencingPredecessors,
            ..Self::predecessor(name)
        }
    }
}

// ============================================================================
// ATTRIBUTE VALUES
// ============================================================================

/// Storage of one construction attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Data(DataValue),
    Derivation(Derivation),
    Node(NodeId),
    OptionalNode(Option<NodeId>),
    Nodes(Vec<NodeId>),
}

impl AttrValue {
    /// Node edges carried by this attribute value, in order.
    pub fn node_inputs(&self) -> &[NodeId] {
        match self {
            AttrValue::Node(id) => std::slice::from_ref(id),
            AttrValue::OptionalNode(Some(id)) => std::slice::from_ref(id),
            AttrValue::OptionalNode(None) => &[],
            AttrValue::Nodes(ids) => ids,
            AttrValue::Data(_) | AttrValue::Derivation(_) => &[],
        }
    }
}

/// A construction argument: positional, or named after a declared attribute.
#[derive(Debug, Clone)]
pub enum Arg {
    Pos(AttrValue),
    Named(&'static str, AttrValue),
}

impl Arg {
    pub fn data(value: DataValue) -> Self {
        Arg::Pos(AttrValue::Data(value))
    }

    pub fn int(value: i64) -> Self {
        Self::data(DataValue::Int(value))
    }

    pub fn str(value: impl Into<SmolStr>) -> Self {
        Self::data(DataValue::Str(value.into()))
    }

    pub fn derivation(derivation: Derivation) -> Self {
        Arg::Pos(AttrValue::Derivation(derivation))
    }

    pub fn node(id: NodeId) -> Self {
        Arg::Pos(AttrValue::Node(id))
    }

    pub fn optional_node(id: Option<NodeId>) -> Self {
        Arg::Pos(AttrValue::OptionalNode(id))
    }

    pub fn nodes(ids: Vec<NodeId>) -> Self {
        Arg::Pos(AttrValue::Nodes(ids))
    }

    pub fn named_node(name: &'static str, id: NodeId) -> Self {
        Arg::Named(name, AttrValue::Node(id))
    }

    pub fn named_predecessor(name: &'static str, id: Option<NodeId>) -> Self {
        Arg::Named(name, AttrValue::OptionalNode(id))
    }

    pub fn named_nodes(name: &'static str, ids: Vec<NodeId>) -> Self {
        Arg::Named(name, AttrValue::Nodes(ids))
    }
}

// ============================================================================
// NODES AND THE GRAPH ARENA
// ============================================================================

/// One graph node: a kind tag, the construction attributes in schema order,
/// and lazily filled caches.
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    attrs: Box<[AttrValue]>,
    hash_cache: Cell<Option<u64>>,
    constant_cache: Cell<Option<bool>>,
    beta_cache: RefCell<Option<Rc<FxHashSet<NodeId>>>>,
}

/// The arena owning every node of a compilation.
#[derive(Debug, Default)]
pub struct AsgGraph {
    nodes: Vec<Node>,
}

impl AsgGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Construct a node of `kind` from positional and named attribute values.
    ///
    /// Missing positional values initialize from the descriptor's default;
    /// an attribute without a default rejects construction. Excess
    /// positional values and unknown names are construction errors.
    ///
    /// # Panics
    ///
    /// On any misuse of the construction protocol; see the module
    /// documentation.
    pub fn construct(&mut self, kind: NodeKind, args: Vec<Arg>) -> NodeId {
        let schema = kind.schema();
        if kind.is_abstract() {
            panic!("cannot construct abstract node kind {kind:?}");
        }

        let mut slots: Vec<Option<AttrValue>> = vec![None; schema.len()];
        let mut positional_index = 0;
        for arg in args {
            match arg {
                Arg::Pos(value) => {
                    if positional_index >= schema.len() {
                        panic!("excess number of construction arguments for {kind:?}");
                    }
                    slots[positional_index] = Some(value);
                    positional_index += 1;
                }
                Arg::Named(name, value) => {
                    let index = schema
                        .iter()
                        .position(|spec| spec.name == name)
                        .unwrap_or_else(|| {
                            panic!("failed to find attribute {name} in {kind:?}")
                        });
                    slots[index] = Some(value);
                }
            }
        }

        let mut attrs = Vec::with_capacity(schema.len());
        for (spec, slot) in schema.iter().zip(slots) {
            attrs.push(self.initialize_attribute(kind, spec, slot));
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            attrs: attrs.into_boxed_slice(),
            hash_cache: Cell::new(None),
            constant_cache: Cell::new(None),
            beta_cache: RefCell::new(None),
        });
        id
    }

    fn initialize_attribute(
        &self,
        kind: NodeKind,
        spec: &AttrSpec,
        value: Option<AttrValue>,
    ) -> AttrValue {
        let Some(value) = value else {
            return match spec.role {
                AttrRole::Data => match spec.default {
                    Some(default) => AttrValue::Data(default()),
                    None => panic!(
                        "cannot initialize attribute {}.{} without a default value",
                        kind.name(),
                        spec.name
                    ),
                },
                AttrRole::SequencingPredecessor => AttrValue::OptionalNode(None),
                AttrRole::SequencingPredecessors => AttrValue::Nodes(Vec::new()),
                _ => panic!(
                    "cannot initialize attribute {}.{} without a value",
                    kind.name(),
                    spec.name
                ),
            };
        };

        match (spec.role, value) {
            (AttrRole::Data, AttrValue::Data(data)) => AttrValue::Data(data),
            (AttrRole::SourceDerivation, AttrValue::Derivation(derivation)) => {
                AttrValue::Derivation(derivation)
            }
            (AttrRole::DataInput | AttrRole::SequencingDestination, AttrValue::Node(id)) => {
                AttrValue::Node(id)
            }
            (AttrRole::OptionalDataInput, AttrValue::Node(id)) => {
                AttrValue::OptionalNode(Some(id))
            }
            (AttrRole::OptionalDataInput, AttrValue::OptionalNode(id)) => {
                AttrValue::OptionalNode(id)
            }
            // Storing a pure-data node where a sequencing predecessor is
            // expected stores no predecessor at all.
            (AttrRole::SequencingPredecessor, AttrValue::Node(id)) => {
                AttrValue::OptionalNode(self.as_sequencing_node(id))
            }
            (AttrRole::SequencingPredecessor, AttrValue::OptionalNode(id)) => {
                AttrValue::OptionalNode(id.and_then(|id| self.as_sequencing_node(id)))
            }
            (AttrRole::SequencingPredecessors | AttrRole::DataInputs, AttrValue::Nodes(ids)) => {
                AttrValue::Nodes(ids)
            }
            (role, value) => panic!(
                "attribute {}.{} with role {role:?} cannot store {value:?}",
                kind.name(),
                spec.name
            ),
        }
    }

    fn as_sequencing_node(&self, id: NodeId) -> Option<NodeId> {
        if self.kind(id).is_pure_data() {
            None
        } else {
            Some(id)
        }
    }

    // =========================================================================
    // Attribute access
    // =========================================================================

    /// All construction attribute values in schema order.
    pub fn construction_attributes(&self, id: NodeId) -> &[AttrValue] {
        &self.node(id).attrs
    }

    pub fn attr(&self, id: NodeId, name: &str) -> &AttrValue {
        let node = self.node(id);
        let index = node
            .kind
            .schema()
            .iter()
            .position(|spec| spec.name == name)
            .unwrap_or_else(|| panic!("no attribute {name} on {:?}", node.kind));
        &node.attrs[index]
    }

    pub fn data_attr(&self, id: NodeId, name: &str) -> &DataValue {
        match self.attr(id, name) {
            AttrValue::Data(value) => value,
            other => panic!("attribute {name} is not a data attribute: {other:?}"),
        }
    }

    pub fn int_attr(&self, id: NodeId, name: &str) -> i64 {
        match self.data_attr(id, name) {
            DataValue::Int(value) => *value,
            other => panic!("attribute {name} is not an integer: {other:?}"),
        }
    }

    pub fn str_attr(&self, id: NodeId, name: &str) -> &SmolStr {
        match self.data_attr(id, name) {
            DataValue::Str(value) => value,
            other => panic!("attribute {name} is not a string: {other:?}"),
        }
    }

    pub fn bool_attr(&self, id: NodeId, name: &str) -> bool {
        match self.data_attr(id, name) {
            DataValue::Bool(value) => *value,
            other => panic!("attribute {name} is not a flag: {other:?}"),
        }
    }

    pub fn input_attr(&self, id: NodeId, name: &str) -> NodeId {
        match self.attr(id, name) {
            AttrValue::Node(node) => *node,
            other => panic!("attribute {name} is not a required edge: {other:?}"),
        }
    }

    pub fn optional_input_attr(&self, id: NodeId, name: &str) -> Option<NodeId> {
        match self.attr(id, name) {
            AttrValue::OptionalNode(node) => *node,
            AttrValue::Node(node) => Some(*node),
            other => panic!("attribute {name} is not an optional edge: {other:?}"),
        }
    }

    pub fn inputs_attr(&self, id: NodeId, name: &str) -> &[NodeId] {
        match self.attr(id, name) {
            AttrValue::Nodes(nodes) => nodes,
            other => panic!("attribute {name} is not an edge sequence: {other:?}"),
        }
    }

    /// The node's source-derivation attribute, when it declares one.
    pub fn derivation_of(&self, id: NodeId) -> Derivation {
        let node = self.node(id);
        for (spec, value) in node.kind.schema().iter().zip(node.attrs.iter()) {
            if spec.role == AttrRole::SourceDerivation {
                if let AttrValue::Derivation(derivation) = value {
                    return derivation.clone();
                }
            }
        }
        Derivation::None
    }

    pub fn position_of(&self, id: NodeId) -> SourcePosition {
        self.derivation_of(id).position(self)
    }

    // =========================================================================
    // Dependency iterators
    // =========================================================================

    fn dependencies_by(
        &self,
        id: NodeId,
        filter: fn(&AttrSpec) -> bool,
    ) -> impl Iterator<Item = NodeId> + '_ {
        let node = self.node(id);
        node.kind
            .schema()
            .iter()
            .zip(node.attrs.iter())
            .filter(move |(spec, _)| filter(spec))
            .flat_map(|(_, value)| value.node_inputs().iter().copied())
    }

    /// Edges to data producers.
    pub fn data_dependencies(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dependencies_by(id, |spec| {
            matches!(
                spec.role,
                AttrRole::DataInput | AttrRole::OptionalDataInput | AttrRole::DataInputs
            )
        })
    }

    /// Edges to sequencing predecessors.
    pub fn sequencing_dependencies(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dependencies_by(id, |spec| spec.role.is_predecessor())
    }

    /// Edges into sequencing regions (branch targets, block entries).
    pub fn destination_dependencies(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dependencies_by(id, |spec| spec.role == AttrRole::SequencingDestination)
    }

    /// Inputs whose values the interpreter must have resolved before
    /// executing this node, in descriptor order.
    pub fn interpretation_dependencies(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.dependencies_by(id, |spec| spec.role.is_port() && spec.interpreted)
    }

    /// Sequencing and data dependencies combined. The current taxonomy has
    /// no other edge classes.
    pub fn all_dependencies(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.sequencing_dependencies(id)
            .chain(self.data_dependencies(id))
    }

    /// Data dependencies as seen by the scheduler. Block definitions wall
    /// off their body: the scheduler of the enclosing functional never
    /// traverses into them.
    pub fn scheduled_data_dependencies(
        &self,
        id: NodeId,
    ) -> Box<dyn Iterator<Item = NodeId> + '_> {
        if self.kind(id) == NodeKind::BlockDefinition {
            Box::new(std::iter::empty())
        } else {
            Box::new(self.data_dependencies(id))
        }
    }

    // =========================================================================
    // Unification (GVN identity)
    // =========================================================================

    /// 64-bit structural hash: hash(kind) XOR the hashes of all compared
    /// attributes (edges hash by recursive unification hash). Cached per
    /// node after the first call.
    pub fn unification_hash(&self, id: NodeId) -> u64 {
        let node = self.node(id);
        if let Some(hash) = node.hash_cache.get() {
            return hash;
        }

        let mut hasher = FxHasher::default();
        node.kind.hash(&mut hasher);
        let mut hash = hasher.finish();

        for (spec, value) in node.kind.schema().iter().zip(node.attrs.iter()) {
            if spec.compared {
                hash ^= self.attribute_hash(value);
            }
        }
        node.hash_cache.set(Some(hash));
        hash
    }

    fn attribute_hash(&self, value: &AttrValue) -> u64 {
        match value {
            AttrValue::Data(data) => {
                let mut hasher = FxHasher::default();
                data.hash(&mut hasher);
                hasher.finish()
            }
            AttrValue::Node(id) => self.unification_hash(*id),
            AttrValue::OptionalNode(Some(id)) => self.unification_hash(*id),
            AttrValue::OptionalNode(None) => 0x9e3779b97f4a7c15,
            AttrValue::Nodes(ids) => {
                let mut hash = 0x51_7c_c1_b7_27_22_0a_95u64;
                for id in ids {
                    hash ^= self.unification_hash(*id);
                }
                hash
            }
            AttrValue::Derivation(_) => 0,
        }
    }

    /// Structural equality: kinds must match and each compared attribute
    /// must be equal (data by value, edges by recursive unification).
    pub fn unification_equals(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let node_a = self.node(a);
        let node_b = self.node(b);
        if node_a.kind != node_b.kind {
            return false;
        }

        for ((spec, value_a), value_b) in node_a
            .kind
            .schema()
            .iter()
            .zip(node_a.attrs.iter())
            .zip(node_b.attrs.iter())
        {
            if spec.compared && !self.attribute_equals(value_a, value_b) {
                return false;
            }
        }
        true
    }

    fn attribute_equals(&self, a: &AttrValue, b: &AttrValue) -> bool {
        match (a, b) {
            (AttrValue::Data(a), AttrValue::Data(b)) => a == b,
            (AttrValue::Node(a), AttrValue::Node(b)) => self.unification_equals(*a, *b),
            (AttrValue::OptionalNode(None), AttrValue::OptionalNode(None)) => true,
            (AttrValue::OptionalNode(Some(a)), AttrValue::OptionalNode(Some(b))) => {
                self.unification_equals(*a, *b)
            }
            (AttrValue::Nodes(a), AttrValue::Nodes(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(a, b)| self.unification_equals(*a, *b))
            }
            _ => false,
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    pub fn is_pure_data(&self, id: NodeId) -> bool {
        self.kind(id).is_pure_data()
    }

    pub fn is_sequencing(&self, id: NodeId) -> bool {
        self.kind(id).is_sequencing()
    }

    pub fn is_beta_replaceable(&self, id: NodeId) -> bool {
        self.kind(id).is_beta_replaceable()
    }

    /// Constant data: literals, or construction data all of whose data
    /// inputs are constant. Cached per node.
    pub fn is_constant_data_node(&self, id: NodeId) -> bool {
        let node = self.node(id);
        if let Some(cached) = node.constant_cache.get() {
            return cached;
        }

        let kind = node.kind;
        let result = if kind.is_literal() {
            true
        } else if !kind.is_construction_data() {
            false
        } else {
            self.data_dependencies(id)
                .all(|dependency| self.is_constant_data_node(dependency))
        };
        node.constant_cache.set(Some(result));
        result
    }

    /// The transitive set of beta-replaceable nodes reachable through this
    /// node's dependencies (including itself when beta-replaceable).
    /// Computed lazily and memoized.
    pub fn beta_replaceable_dependencies(&self, id: NodeId) -> Rc<FxHashSet<NodeId>> {
        if let Some(cached) = self.node(id).beta_cache.borrow().as_ref() {
            return cached.clone();
        }

        let mut set = FxHashSet::default();
        if self.is_beta_replaceable(id) {
            set.insert(id);
        }
        for dependency in self.all_dependencies(id) {
            if !set.contains(&dependency) {
                for element in self.beta_replaceable_dependencies(dependency).iter() {
                    set.insert(*element);
                }
            }
        }
        let set = Rc::new(set);
        *self.node(id).beta_cache.borrow_mut() = Some(set.clone());
        set
    }

    // =========================================================================
    // Sequencing structure
    // =========================================================================

    /// The direct immediate dominator of a sequencing node: its predecessor,
    /// or the divergence point for convergence nodes. Divergence
    /// destinations get their dominator assigned by the scheduler.
    pub fn direct_immediate_dominator(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::SequenceConvergence => self.optional_input_attr(id, "divergence"),
            kind if kind.has_single_predecessor() => {
                self.optional_input_attr(id, "predecessor")
            }
            _ => None,
        }
    }

    /// Destinations introduced by a divergence node (branch targets).
    pub fn divergence_destinations(&self, id: NodeId) -> Vec<NodeId> {
        if self.kind(id).is_divergence() {
            self.destination_dependencies(id).collect()
        } else {
            Vec::new()
        }
    }

    /// The region in which a sequencing node consumes `_used_value`.
    /// Returns, for most sequencing users, their predecessor region; a
    /// return consumes its value in its own region.
    pub fn region_of_used_value(&self, region: NodeId, _used_value: NodeId) -> Option<NodeId> {
        match self.kind(region) {
            NodeKind::SequenceReturn => Some(region),
            NodeKind::ConditionalBranch
            | NodeKind::SequenceBranchEnd
            | NodeKind::FxApplication
            | NodeKind::FxMessageSend => self.optional_input_attr(region, "predecessor"),
            _ => None,
        }
    }

    // =========================================================================
    // Printing
    // =========================================================================

    /// `Kind(attr = value, ...)` over the printed, non-default data
    /// attributes; flags print bare and only when set.
    pub fn print_name_with_data_attributes(&self, id: NodeId) -> String {
        let node = self.node(id);
        let mut result = node.kind.name().to_string();
        let mut printed_count = 0;
        for (spec, value) in node.kind.schema().iter().zip(node.attrs.iter()) {
            if spec.role != AttrRole::Data || !spec.printed {
                continue;
            }
            let AttrValue::Data(data) = value else {
                continue;
            };
            if let Some(default) = spec.default {
                if *data == default() {
                    continue;
                }
            }
            result.push(if printed_count == 0 { '(' } else { ',' });
            if printed_count > 0 {
                result.push(' ');
            }
            if let DataValue::Bool(_) = data {
                result.push_str(spec.name);
            } else {
                result.push_str(spec.name);
                result.push_str(" = ");
                result.push_str(&data.to_string());
            }
            printed_count += 1;
        }
        if printed_count != 0 {
            result.push(')');
        }
        result
    }
}

// ============================================================================
// PREDECESSOR TOPOLOGICAL ORDER
// ============================================================================

/// Topologically sort the sequencing spine by predecessor dependency,
/// starting from `start` (usually a functional's exit point).
pub fn predecessor_topological_order(graph: &AsgGraph, start: NodeId) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut visited = FxHashSet::default();
    visit_predecessors(graph, start, &mut visited, &mut order);
    order
}

fn visit_predecessors(
    graph: &AsgGraph,
    node: NodeId,
    visited: &mut FxHashSet<NodeId>,
    order: &mut Vec<NodeId>,
) {
    if !visited.insert(node) {
        return;
    }
    for predecessor in graph.sequencing_dependencies(node).collect::<Vec<_>>() {
        visit_predecessors(graph, predecessor, visited, order);
    }
    order.push(node);
}
