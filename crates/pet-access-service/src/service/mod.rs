//! 业务服务层
//!
//! - `GrantIssueService`：授权物的发放策略（幂等复用、冲突重试、upsert 刷新）
//! - `GrantRedeemService`：授权物的校验与一次性消费（状态转移 + 副作用）

pub mod dto;
pub mod issue_service;
pub mod redeem_service;

pub use dto::{IssuedCode, IssuedToken, RedeemOutcome, RequestContext, ShareRedemption};
pub use issue_service::{CodeGenerator, GrantIssueService, RandomCodeGenerator, SequenceCodeGenerator};
pub use redeem_service::GrantRedeemService;
