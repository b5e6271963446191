// ドメイン層モジュール
pub mod collaboration;
pub mod link;
pub mod post;
pub mod reporting_window;

// 再エクスポート
pub use collaboration::{BrandAdvertiser, Campaign, Obligation, PostCampaign};
pub use link::{Link, LinkProduct, LinkPublisher};
pub use post::{Post, PostStatus};
pub use reporting_window::{
    REPORTING_OFFSET_WEEKS, RepairFilter, ReportingWindowUpdate, WriteStrategy, plan_updates,
    reporting_offset, shift_forward, unmatched_post_ids,
};
