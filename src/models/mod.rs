pub mod approval;
pub mod context;
pub mod document;
pub mod serials;
pub mod workflow;

pub use approval::ApprovalState;
pub use context::RequestContext;
pub use document::{
    ids, HasHeaderId, HasId, HasTerminalUserId, Header, HeaderSerial, ImportLine, Line, LineSerial,
    NewHeader, NewHeaderSerial, NewImportLine, NewLine, NewLineSerial, NewRoute, NewTerminalLine,
    Route, TerminalLine, WorkflowParameter,
};
pub use serials::SerialSlots;
pub use workflow::Workflow;
