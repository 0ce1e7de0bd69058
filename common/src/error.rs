//! エラー型定義

use thiserror::Error;

/// 共通エラー型（ワークブック出力）
#[derive(Error, Debug)]
pub enum Error {
    #[error("Excel error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
