//! The node taxonomy: every concrete and abstract node kind, its ancestry,
//! and its attribute schema.
//!
//! Two parallel trees of kinds share the same machinery:
//! - **Syntax IR** mirrors the parse tree one-to-one (pure data).
//! - **Analyzed IR** carries resolved expressions, the sequencing spine and
//!   the phi machinery.
//!
//! The ancestry is shallow and explicit: pattern dispatch walks
//! [`NodeKind::parent`] from the most-derived kind toward [`NodeKind::Any`].
//! Abstract kinds exist only as dispatch targets and cannot be constructed.

use super::mop::AttrSpec;

/// The closed set of node kinds, abstract dispatch targets included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    // ------------------------------------------------------------------
    // Abstract kinds (dispatch targets only)
    // ------------------------------------------------------------------
    Any,
    Syntax,
    SyntaxLiteral,
    Analyzed,
    AnalyzedDataExpression,
    AnalyzedStatefulExpression,
    Literal,
    BetaReplaceable,
    SequencingAndData,
    Sequencing,
    SequenceDivergence,

    // ------------------------------------------------------------------
    // Syntax IR (one-to-one with the parse tree)
    // ------------------------------------------------------------------
    SyntaxError,
    SyntaxArgument,
    SyntaxArray,
    SyntaxLiteralArray,
    SyntaxBlock,
    SyntaxCascadeMessage,
    SyntaxLexicalSequence,
    SyntaxLocalVariable,
    SyntaxLiteralCharacter,
    SyntaxLiteralInteger,
    SyntaxLiteralFloat,
    SyntaxLiteralString,
    SyntaxLiteralSymbol,
    SyntaxApplication,
    SyntaxAssignment,
    SyntaxBinaryExpressionSequence,
    SyntaxIdentifierReference,
    SyntaxPragma,
    SyntaxMessageSend,
    SyntaxMessageCascade,
    SyntaxReturn,
    SyntaxSequence,

    // ------------------------------------------------------------------
    // Analyzed IR: pure-data expressions
    // ------------------------------------------------------------------
    Error,
    LiteralNil,
    LiteralFalse,
    LiteralTrue,
    LiteralInteger,
    LiteralFloat,
    LiteralCharacter,
    LiteralString,
    LiteralSymbol,
    LiteralObject,
    LiteralPrimitiveFunction,
    Argument,
    CapturedValue,
    Array,
    BlockDefinition,
    BlockInstance,
    Application,
    MessageSend,
    TopLevelScript,
    Phi,
    PhiValue,

    // ------------------------------------------------------------------
    // Analyzed IR: sequencing-and-data (observable effects)
    // ------------------------------------------------------------------
    FxApplication,
    FxMessageSend,

    // ------------------------------------------------------------------
    // Analyzed IR: pure sequencing
    // ------------------------------------------------------------------
    SequenceEntry,
    SequenceReturn,
    ConditionalBranch,
    SequenceBranchEnd,
    SequenceConvergence,

    // ------------------------------------------------------------------
    // Analyzed IR: stateful data
    // ------------------------------------------------------------------
    MutableArray,
}

// ============================================================================
// SCHEMAS
// ============================================================================

const NO_ATTRS: &[AttrSpec] = &[];

const SOURCE_ONLY: &[AttrSpec] = &[AttrSpec::source()];

const SYNTAX_ERROR: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::data("message"),
    AttrSpec::inputs("inner_nodes"),
];

const SYNTAX_NAMED: &[AttrSpec] = &[AttrSpec::source(), AttrSpec::data("name")];

const SYNTAX_ELEMENTS: &[AttrSpec] = &[AttrSpec::source(), AttrSpec::inputs("elements")];

const SYNTAX_BLOCK: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::inputs("arguments"),
    AttrSpec::input("body"),
];

const SYNTAX_CASCADE_MESSAGE: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("selector"),
    AttrSpec::inputs("arguments"),
];

const SYNTAX_LEXICAL_SEQUENCE: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::inputs("locals"),
    AttrSpec::inputs("pragmas"),
    AttrSpec::inputs("elements"),
];

const SYNTAX_VALUE: &[AttrSpec] = &[AttrSpec::source(), AttrSpec::data("value")];

const SYNTAX_APPLICATION: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("functional"),
    AttrSpec::inputs("arguments"),
];

const SYNTAX_ASSIGNMENT: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("store"),
    AttrSpec::input("value"),
];

const SYNTAX_MESSAGE_SEND: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::optional_input("receiver"),
    AttrSpec::input("selector"),
    AttrSpec::inputs("arguments"),
];

const SYNTAX_MESSAGE_CASCADE: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("receiver"),
    AttrSpec::inputs("messages"),
];

const SYNTAX_RETURN: &[AttrSpec] = &[AttrSpec::source(), AttrSpec::input("expression")];

const ERROR: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::data("message"),
    AttrSpec::inputs("inner_nodes"),
];

const LITERAL_VALUE: &[AttrSpec] = &[AttrSpec::source(), AttrSpec::data("value")];

const LITERAL_PRIMITIVE_FUNCTION: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::data("name"),
    AttrSpec::compile_impl("compile_time_implementation"),
    AttrSpec::flag("pure"),
    AttrSpec::flag("compile_time"),
    AttrSpec::flag("always_inline"),
];

const ARGUMENT: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::index_attribute("index"),
    AttrSpec::name_attribute("name"),
    AttrSpec::flag("is_implicit"),
];

const CAPTURED_VALUE: &[AttrSpec] = &[AttrSpec::source(), AttrSpec::index_attribute("index")];

const ELEMENTS: &[AttrSpec] = &[AttrSpec::source(), AttrSpec::inputs("elements")];

const BLOCK_DEFINITION: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::inputs_not_interpreted("captures"),
    AttrSpec::inputs_not_interpreted("arguments"),
    AttrSpec::destination_not_interpreted("entry_point"),
    AttrSpec::name_attribute("name"),
    AttrSpec::predecessor("exit_point"),
];

const BLOCK_INSTANCE: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::inputs("captured_values"),
    // The interpreter reads the definition node itself, never a runtime
    // value for it.
    AttrSpec::input_not_interpreted("definition"),
];

const APPLICATION: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("functional"),
    AttrSpec::inputs("arguments"),
];

const MESSAGE_SEND: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("receiver"),
    AttrSpec::input("selector"),
    AttrSpec::inputs("arguments"),
];

const TOP_LEVEL_SCRIPT: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::destination("entry_point"),
    AttrSpec::predecessor("exit_point"),
];

const PHI: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::inputs("values"),
    AttrSpec::predecessor("predecessor"),
];

const PHI_VALUE: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("value"),
    AttrSpec::predecessor("predecessor"),
];

const FX_APPLICATION: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("functional"),
    AttrSpec::inputs("arguments"),
    AttrSpec::predecessor("predecessor"),
];

const FX_MESSAGE_SEND: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("receiver"),
    AttrSpec::input("selector"),
    AttrSpec::inputs("arguments"),
    AttrSpec::predecessor("predecessor"),
];

const SEQUENCE_RETURN: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("value"),
    AttrSpec::predecessor("predecessor"),
];

const CONDITIONAL_BRANCH: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::input("condition"),
    AttrSpec::destination("true_destination"),
    AttrSpec::destination("false_destination"),
    AttrSpec::predecessor("predecessor"),
];

const SEQUENCE_BRANCH_END: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::predecessor("predecessor"),
    AttrSpec::predecessor("divergence"),
];

const SEQUENCE_CONVERGENCE: &[AttrSpec] = &[
    AttrSpec::source(),
    AttrSpec::predecessor("divergence"),
    AttrSpec::predecessors("predecessors"),
];

impl NodeKind {
    /// The attribute schema, in construction order.
    pub fn schema(self) -> &'static [AttrSpec] {
        match self {
            NodeKind::Any
            | NodeKind::Syntax
            | NodeKind::SyntaxLiteral
            | NodeKind::Analyzed
            | NodeKind::AnalyzedDataExpression
            | NodeKind::AnalyzedStatefulExpression
            | NodeKind::Literal
            | NodeKind::BetaReplaceable
            | NodeKind::SequencingAndData
            | NodeKind::Sequencing
            | NodeKind::SequenceDivergence => NO_ATTRS,

            NodeKind::SyntaxError => SYNTAX_ERROR,
            NodeKind::SyntaxArgument | NodeKind::SyntaxLocalVariable => SYNTAX_NAMED,
            NodeKind::SyntaxArray
            | NodeKind::SyntaxLiteralArray
            | NodeKind::SyntaxBinaryExpressionSequence
            | NodeKind::SyntaxSequence => SYNTAX_ELEMENTS,
            NodeKind::SyntaxBlock => SYNTAX_BLOCK,
            NodeKind::SyntaxCascadeMessage | NodeKind::SyntaxPragma => SYNTAX_CASCADE_MESSAGE,
            NodeKind::SyntaxLexicalSequence => SYNTAX_LEXICAL_SEQUENCE,
            NodeKind::SyntaxLiteralCharacter
            | NodeKind::SyntaxLiteralInteger
            | NodeKind::SyntaxLiteralFloat
            | NodeKind::SyntaxLiteralString
            | NodeKind::SyntaxLiteralSymbol
            | NodeKind::SyntaxIdentifierReference => SYNTAX_VALUE,
            NodeKind::SyntaxApplication => SYNTAX_APPLICATION,
            NodeKind::SyntaxAssignment => SYNTAX_ASSIGNMENT,
            NodeKind::SyntaxMessageSend => SYNTAX_MESSAGE_SEND,
            NodeKind::SyntaxMessageCascade => SYNTAX_MESSAGE_CASCADE,
            NodeKind::SyntaxReturn => SYNTAX_RETURN,

            NodeKind::Error => ERROR,
            NodeKind::LiteralNil | NodeKind::LiteralFalse | NodeKind::LiteralTrue => SOURCE_ONLY,
            NodeKind::LiteralInteger
            | NodeKind::LiteralFloat
            | NodeKind::LiteralCharacter
            | NodeKind::LiteralString
            | NodeKind::LiteralSymbol
            | NodeKind::LiteralObject => LITERAL_VALUE,
            NodeKind::LiteralPrimitiveFunction => LITERAL_PRIMITIVE_FUNCTION,
            NodeKind::Argument => ARGUMENT,
            NodeKind::CapturedValue => CAPTURED_VALUE,
            NodeKind::Array | NodeKind::MutableArray => ELEMENTS,
            NodeKind::BlockDefinition => BLOCK_DEFINITION,
            NodeKind::BlockInstance => BLOCK_INSTANCE,
            NodeKind::Application => APPLICATION,
            NodeKind::MessageSend => MESSAGE_SEND,
            NodeKind::TopLevelScript => TOP_LEVEL_SCRIPT,
            NodeKind::Phi => PHI,
            NodeKind::PhiValue => PHI_VALUE,

            NodeKind::FxApplication => FX_APPLICATION,
            NodeKind::FxMessageSend => FX_MESSAGE_SEND,

            NodeKind::SequenceEntry => SOURCE_ONLY,
            NodeKind::SequenceReturn => SEQUENCE_RETURN,
            NodeKind::ConditionalBranch => CONDITIONAL_BRANCH,
            NodeKind::SequenceBranchEnd => SEQUENCE_BRANCH_END,
            NodeKind::SequenceConvergence => SEQUENCE_CONVERGENCE,
        }
    }

    /// The ancestor kind for most-derived-first pattern dispatch.
    pub fn parent(self) -> Option<NodeKind> {
        match self {
            NodeKind::Any => None,
            NodeKind::Syntax | NodeKind::Analyzed => Some(NodeKind::Any),

            NodeKind::SyntaxLiteral => Some(NodeKind::Syntax),
            NodeKind::SyntaxLiteralCharacter
            | NodeKind::SyntaxLiteralInteger
            | NodeKind::SyntaxLiteralFloat
            | NodeKind::SyntaxLiteralString
            | NodeKind::SyntaxLiteralSymbol => Some(NodeKind::SyntaxLiteral),
            NodeKind::SyntaxError
            | NodeKind::SyntaxArgument
            | NodeKind::SyntaxArray
            | NodeKind::SyntaxLiteralArray
            | NodeKind::SyntaxBlock
            | NodeKind::SyntaxCascadeMessage
            | NodeKind::SyntaxLexicalSequence
            | NodeKind::SyntaxLocalVariable
            | NodeKind::SyntaxApplication
            | NodeKind::SyntaxAssignment
            | NodeKind::SyntaxBinaryExpressionSequence
            | NodeKind::SyntaxIdentifierReference
            | NodeKind::SyntaxPragma
            | NodeKind::SyntaxMessageSend
            | NodeKind::SyntaxMessageCascade
            | NodeKind::SyntaxReturn
            | NodeKind::SyntaxSequence => Some(NodeKind::Syntax),

            NodeKind::AnalyzedDataExpression
            | NodeKind::AnalyzedStatefulExpression
            | NodeKind::SequencingAndData
            | NodeKind::Sequencing => Some(NodeKind::Analyzed),
            NodeKind::Literal | NodeKind::BetaReplaceable => {
                Some(NodeKind::AnalyzedDataExpression)
            }
            NodeKind::SequenceDivergence => Some(NodeKind::Sequencing),

            NodeKind::Error
            | NodeKind::Array
            | NodeKind::BlockDefinition
            | NodeKind::BlockInstance
            | NodeKind::Application
            | NodeKind::MessageSend
            | NodeKind::TopLevelScript
            | NodeKind::Phi
            | NodeKind::PhiValue => Some(NodeKind::AnalyzedDataExpression),
            NodeKind::LiteralNil
            | NodeKind::LiteralFalse
            | NodeKind::LiteralTrue
            | NodeKind::LiteralInteger
            | NodeKind::LiteralFloat
            | NodeKind::LiteralCharacter
            | NodeKind::LiteralString
            | NodeKind::LiteralSymbol
            | NodeKind::LiteralObject
            | NodeKind::LiteralPrimitiveFunction => Some(NodeKind::Literal),
            NodeKind::Argument | NodeKind::CapturedValue => Some(NodeKind::BetaReplaceable),
            NodeKind::MutableArray => Some(NodeKind::AnalyzedStatefulExpression),

            NodeKind::FxApplication | NodeKind::FxMessageSend => Some(NodeKind::SequencingAndData),

            NodeKind::SequenceEntry
            | NodeKind::SequenceReturn
            | NodeKind::SequenceBranchEnd
            | NodeKind::SequenceConvergence => Some(NodeKind::Sequencing),
            NodeKind::ConditionalBranch => Some(NodeKind::SequenceDivergence),
        }
    }

    /// Whether `self` is `ancestor` or derives from it.
    pub fn is_kind_of(self, ancestor: NodeKind) -> bool {
        let mut kind = Some(self);
        while let Some(current) = kind {
            if current == ancestor {
                return true;
            }
            kind = current.parent();
        }
        false
    }

    pub fn is_abstract(self) -> bool {
        matches!(
            self,
            NodeKind::Any
                | NodeKind::Syntax
                | NodeKind::SyntaxLiteral
                | NodeKind::Analyzed
                | NodeKind::AnalyzedDataExpression
                | NodeKind::AnalyzedStatefulExpression
                | NodeKind::Literal
                | NodeKind::BetaReplaceable
                | NodeKind::SequencingAndData
                | NodeKind::Sequencing
                | NodeKind::SequenceDivergence
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Any => "Any",
            NodeKind::Syntax => "Syntax",
            NodeKind::SyntaxLiteral => "SyntaxLiteral",
            NodeKind::Analyzed => "Analyzed",
            NodeKind::AnalyzedDataExpression => "AnalyzedDataExpression",
            NodeKind::AnalyzedStatefulExpression => "AnalyzedStatefulExpression",
            NodeKind::Literal => "Literal",
            NodeKind::BetaReplaceable => "BetaReplaceable",
            NodeKind::SequencingAndData => "SequencingAndData",
            NodeKind::Sequencing => "Sequencing",
            NodeKind::SequenceDivergence => "SequenceDivergence",
            NodeKind::SyntaxError => "SyntaxError",
            NodeKind::SyntaxArgument => "SyntaxArgument",
            NodeKind::SyntaxArray => "SyntaxArray",
            NodeKind::SyntaxLiteralArray => "SyntaxLiteralArray",
            NodeKind::SyntaxBlock => "SyntaxBlock",
            NodeKind::SyntaxCascadeMessage => "SyntaxCascadeMessage",
            NodeKind::SyntaxLexicalSequence => "SyntaxLexicalSequence",
            NodeKind::SyntaxLocalVariable => "SyntaxLocalVariable",
            NodeKind::SyntaxLiteralCharacter => "SyntaxLiteralCharacter",
            NodeKind::SyntaxLiteralInteger => "SyntaxLiteralInteger",
            NodeKind::SyntaxLiteralFloat => "SyntaxLiteralFloat",
            NodeKind::SyntaxLiteralString => "SyntaxLiteralString",
            NodeKind::SyntaxLiteralSymbol => "SyntaxLiteralSymbol",
            NodeKind::SyntaxApplication => "SyntaxApplication",
            NodeKind::SyntaxAssignment => "SyntaxAssignment",
            NodeKind::SyntaxBinaryExpressionSequence => "SyntaxBinaryExpressionSequence",
            NodeKind::SyntaxIdentifierReference => "SyntaxIdentifierReference",
            NodeKind::SyntaxPragma => "SyntaxPragma",
            NodeKind::SyntaxMessageSend => "SyntaxMessageSend",
            NodeKind::SyntaxMessageCascade => "SyntaxMessageCascade",
            NodeKind::SyntaxReturn => "SyntaxReturn",
            NodeKind::SyntaxSequence => "SyntaxSequence",
            NodeKind::Error => "Error",
            NodeKind::LiteralNil => "LiteralNil",
            NodeKind::LiteralFalse => "LiteralFalse",
            NodeKind::LiteralTrue => "LiteralTrue",
            NodeKind::LiteralInteger => "LiteralInteger",
            NodeKind::LiteralFloat => "LiteralFloat",
            NodeKind::LiteralCharacter => "LiteralCharacter",
            NodeKind::LiteralString => "LiteralString",
            NodeKind::LiteralSymbol => "LiteralSymbol",
            NodeKind::LiteralObject => "LiteralObject",
            NodeKind::LiteralPrimitiveFunction => "LiteralPrimitiveFunction",
            NodeKind::Argument => "Argument",
            NodeKind::CapturedValue => "CapturedValue",
            NodeKind::Array => "Array",
            NodeKind::BlockDefinition => "BlockDefinition",
            NodeKind::BlockInstance => "BlockInstance",
            NodeKind::Application => "Application",
            NodeKind::MessageSend => "MessageSend",
            NodeKind::TopLevelScript => "TopLevelScript",
            NodeKind::Phi => "Phi",
            NodeKind::PhiValue => "PhiValue",
            NodeKind::FxApplication => "FxApplication",
            NodeKind::FxMessageSend => "FxMessageSend",
            NodeKind::SequenceEntry => "SequenceEntry",
            NodeKind::SequenceReturn => "SequenceReturn",
            NodeKind::ConditionalBranch => "ConditionalBranch",
            NodeKind::SequenceBranchEnd => "SequenceBranchEnd",
            NodeKind::SequenceConvergence => "SequenceConvergence",
            NodeKind::MutableArray => "MutableArray",
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Pure-data nodes have no side effects and no sequencing predecessor;
    /// their identity is structural.
    pub fn is_pure_data(self) -> bool {
        if self.is_kind_of(NodeKind::Syntax) {
            return true;
        }
        if self.is_kind_of(NodeKind::AnalyzedDataExpression) {
            return true;
        }
        false
    }

    /// Sequencing nodes form the acyclic control spine.
    pub fn is_sequencing(self) -> bool {
        self.is_kind_of(NodeKind::Sequencing) || self.is_kind_of(NodeKind::SequencingAndData)
    }

    pub fn is_syntax(self) -> bool {
        self.is_kind_of(NodeKind::Syntax)
    }

    pub fn is_literal(self) -> bool {
        self.is_kind_of(NodeKind::Literal)
    }

    pub fn is_beta_replaceable(self) -> bool {
        self.is_kind_of(NodeKind::BetaReplaceable)
    }

    /// Stateful data: no sequencing predecessor but observable identity.
    pub fn is_stateful_data(self) -> bool {
        self.is_kind_of(NodeKind::AnalyzedStatefulExpression)
    }

    /// Arguments and captured values live in the activation context.
    pub fn is_activation_context_parameter(self) -> bool {
        matches!(self, NodeKind::Argument | NodeKind::CapturedValue)
    }

    /// Construction data can be pre-evaluated when all inputs are constant.
    pub fn is_construction_data(self) -> bool {
        self == NodeKind::Array
    }

    pub fn is_divergence(self) -> bool {
        self.is_kind_of(NodeKind::SequenceDivergence)
    }

    /// Sequencing kinds whose immediate dominator is their predecessor.
    pub fn has_single_predecessor(self) -> bool {
        matches!(
            self,
            NodeKind::SequenceReturn
                | NodeKind::SequenceBranchEnd
                | NodeKind::ConditionalBranch
                | NodeKind::FxApplication
                | NodeKind::FxMessageSend
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestry_walks_to_any() {
        assert!(NodeKind::LiteralInteger.is_kind_of(NodeKind::Literal));
        assert!(NodeKind::LiteralInteger.is_kind_of(NodeKind::AnalyzedDataExpression));
        assert!(NodeKind::LiteralInteger.is_kind_of(NodeKind::Any));
        assert!(!NodeKind::LiteralInteger.is_kind_of(NodeKind::Syntax));
    }

    #[test]
    fn test_sequencing_classification() {
        assert!(NodeKind::SequenceEntry.is_sequencing());
        assert!(NodeKind::FxMessageSend.is_sequencing());
        assert!(!NodeKind::FxMessageSend.is_pure_data());
        assert!(!NodeKind::MessageSend.is_sequencing());
        assert!(NodeKind::MessageSend.is_pure_data());
    }

    #[test]
    fn test_stateful_data_is_neither_pure_nor_sequencing() {
        assert!(!NodeKind::MutableArray.is_pure_data());
        assert!(!NodeKind::MutableArray.is_sequencing());
        assert!(NodeKind::MutableArray.is_stateful_data());
    }

    #[test]
    fn test_beta_replaceable_kinds() {
        assert!(NodeKind::Argument.is_beta_replaceable());
        assert!(NodeKind::CapturedValue.is_beta_replaceable());
        assert!(!NodeKind::LiteralInteger.is_beta_replaceable());
    }

    #[test]
    fn test_every_concrete_kind_declares_a_source_derivation() {
        use super::super::mop::AttrRole;
        for kind in [
            NodeKind::SyntaxError,
            NodeKind::SyntaxMessageSend,
            NodeKind::Error,
            NodeKind::LiteralInteger,
            NodeKind::BlockDefinition,
            NodeKind::FxMessageSend,
            NodeKind::SequenceConvergence,
        ] {
            assert!(
                kind.schema()
                    .iter()
                    .any(|spec| spec.role == AttrRole::SourceDerivation),
                "{kind:?} has no source derivation attribute"
            );
        }
    }
}
