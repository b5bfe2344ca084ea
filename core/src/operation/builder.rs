use super::{
    BufferOperation, IntersectionOperation, MergeLayersOperation, OperationChain,
    OperationConfig, OperationOptions, OperationType, OptionsError, TrimOperation,
    UnionOperation,
};

/// Builds operation chains from a set of options
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    config: OperationConfig,
}

impl OperationBuilder {
    /// Parses the options. Fails if a numeric option is not a number.
    pub fn new(options: &OperationOptions) -> Result<Self, OptionsError> {
        Ok(Self::from_config(OperationConfig::try_from(options)?))
    }

    pub fn from_config(config: OperationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    /// Returns a chain containing every handler: buffer, union,
    /// intersection, trim and merge. The requested operation is only used
    /// for routing when the chain is processed.
    pub fn get_operation(&self, _operation: OperationType) -> OperationChain {
        let mut chain = OperationChain::new();
        chain
            .add_successor(BufferOperation::new(&self.config))
            .add_successor(UnionOperation::new(&self.config))
            .add_successor(IntersectionOperation::new(&self.config))
            .add_successor(TrimOperation::new(&self.config))
            .add_successor(MergeLayersOperation::new(&self.config));
        chain
    }
}
