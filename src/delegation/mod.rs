//! Sub-agent delegation.
//!
//! A parent conversation hands a task to a child through the `delegate`
//! tool. The child is built from the base [`AgentProfile`](crate::agent::AgentProfile),
//! gets the restricted [`ChildToolKit`] plus the `report` sentinel, and runs
//! until it calls `report`. Children cannot delegate.

pub mod delegator;
pub mod kit;
pub mod report;

pub use delegator::{
    find_report, parent_tools, DelegateTool, DelegationRequest, Delegator, DELEGATE_TOOL_NAME,
    DELEGATION_PROMPT,
};
pub use kit::{ChildCapability, ChildToolKit};
pub use report::{report_tool, REPORT_TOOL_NAME};
