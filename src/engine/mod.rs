// ==========================================
// 金属材料质检流转系统 - 引擎层
// ==========================================
// 职责: 状态流转规则、实体守卫、流转执行与事件分发
// 红线: Engine 不拼 SQL, 所有拒绝必须输出原因
// ==========================================

pub mod error;
pub mod events;
pub mod guards;
pub mod rules;
pub mod store;
pub mod transition;

// 重导出核心引擎
pub use error::{TransitionError, TransitionErrorKind};
pub use events::{
    CompositeEventSink, NoOpEventSink, OptionalEventSink, TransitionEvent, TransitionEventSink,
};
pub use guards::{GuardFacts, GuardPolicy};
pub use rules::{allowed_targets, is_allowed};
pub use store::{LotSnapshot, LotStore, TransitionCommit, TransitionDecision};
pub use transition::{TransitionEngine, TransitionOutcome, DEFAULT_MAX_TRANSITION_RETRIES};
