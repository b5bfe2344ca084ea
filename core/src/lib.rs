//! Vector geometry operations on georeferenced layers. Operations are
//! assembled into an [`operation::OperationChain`] by an
//! [`operation::OperationBuilder`] and requests are routed to the handler
//! matching the requested [`operation::OperationType`].

pub mod datasource;
pub mod geometry;
pub mod operation;
