// アプリケーション層モジュール
pub mod collab_lookup;
pub mod link_copy;
pub mod obligation_link_sync;
pub mod reporting_date_repair;

// 再エクスポート
pub use collab_lookup::{CollabLookup, ObligationBrand};
pub use link_copy::{LinkCopyError, LinkCopyJob, LinkCopyReport};
pub use obligation_link_sync::{
    ObligationLinkSyncError, ObligationLinkSyncJob, ObligationLinkSyncReport, extract_link_urls,
};
pub use reporting_date_repair::{
    RepairOptions, RepairReport, ReportingDateRepairError, ReportingDateRepairJob,
};
