use summary_eval_common::ParamValue;

/// 統計データ（副表）の1行
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryRecord {
    /// 正規化済み動画ID
    pub video_id: String,
    /// Whisper温度
    pub param: ParamValue,
    /// 要約ファイルへの参照（内容そのものではない）
    pub content_ref: String,
}

/// 1件の照合結果
#[derive(Debug, Clone, PartialEq)]
pub enum ItemMatch<'a> {
    /// 同じIDの副表行がない
    Missing,
    Found {
        /// 温度ごとに採用した副表行（該当なしは None）
        variants: Vec<(ParamValue, Option<&'a SecondaryRecord>)>,
        /// 先勝ちで採用されなかった重複行数
        duplicates: usize,
    },
}

/// 照合の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    /// 副表に一致があった件数
    pub matched: usize,
    /// 一致がなかった件数
    pub missing: usize,
    /// 同じ（ID, 温度）の重複で採用されなかった副表行数
    pub duplicates: usize,
    /// 温度が数値でないため無視した副表行数
    pub invalid_params: usize,
}
