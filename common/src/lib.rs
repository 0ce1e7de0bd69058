//! Summary Eval Common Library
//!
//! 評価パイプラインの純粋なロジック（I/Oなし）と共有型

pub mod types;
pub mod table;
#[cfg(feature = "excel")]
pub mod error;
pub mod video_id;
pub mod aggregate;
pub mod export;

pub use types::{round4, Cell, ParamValue, ScoreResult, Scores};
pub use table::{NamedTable, Table};
#[cfg(feature = "excel")]
pub use error::{Error, Result};
pub use video_id::{default_rules, normalize_video_id, normalize_with, IdRule};
pub use aggregate::{average_sheets, evaluation_sheets, summary_stats, SummaryStats};
