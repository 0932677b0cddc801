use serde::{Deserialize, Serialize};

/// AI 提取结果 (提取服务的输出契约)
///
/// 所有字段宽松解析: 模型偶尔会漏字段, 缺失一律取默认值而不是整体解析失败。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedPayload {
    #[serde(default)]
    pub header: PayloadHeader,
    #[serde(default)]
    pub lines: Vec<PayloadLine>,
    /// 由提取客户端在解析成功后附加
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// 单据头
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadHeader {
    #[serde(default, rename = "doConsecutive")]
    pub do_consecutive: Option<String>,
    /// YYYY-MM-DD, 解析失败时降级为处理日
    #[serde(default, rename = "doDate")]
    pub do_date: Option<String>,
    #[serde(default, rename = "doIssuerID")]
    pub do_issuer_id: Option<String>,
    #[serde(default, rename = "doIssuerName")]
    pub do_issuer_name: Option<String>,
    /// "FE" 或 "NC"
    #[serde(default, rename = "doType")]
    pub do_type: Option<String>,
    #[serde(default, rename = "doReceptorID")]
    pub do_receptor_id: Option<String>,
    #[serde(default, rename = "doReceptorAddress")]
    pub do_receptor_address: Option<String>,
    #[serde(default, rename = "doIssuerAddress")]
    pub do_issuer_address: Option<String>,
    #[serde(default, rename = "doAccount")]
    pub do_account: Option<String>,
    #[serde(default, rename = "CurrencyID")]
    pub currency_id: Option<String>,
}

/// 单据行
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadLine {
    #[serde(default)]
    pub sku_candidate: Option<String>,
    /// 同列堆叠的 CABYS 码, 只存储不参与匹配
    #[serde(default)]
    pub cabys_candidate: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub tax_amount: f64,
}

/// AI token 用量
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub candidates_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
}

impl TokenUsage {
    /// 审计注记用的摘要
    pub fn summary(&self) -> String {
        format!(
            "prompt={}, candidates={}, total={}",
            self.prompt_tokens, self.candidates_tokens, self.total_tokens
        )
    }
}
