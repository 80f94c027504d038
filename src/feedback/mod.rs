//! Engagement feedback: turn backend timelines into follow-up notices.

pub mod engagement;
pub mod notice;
pub mod processor;

pub use engagement::{EngagementEvent, EngagementRecord, FunnelSummary, derive_records};
pub use notice::{NoticeMailer, SmtpNoticeMailer, notice_html};
pub use processor::{FeedbackProcessor, FeedbackReport};
