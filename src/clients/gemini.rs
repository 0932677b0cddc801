use crate::clients::InvoiceExtractor;
use crate::config::ExtractorConfig;
use crate::payload::{ExtractedPayload, TokenUsage};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 提取提示词: "Código / Cód. CABYS" 列上下堆叠 SKU 和 CABYS, 要求分离
const EXTRACTION_PROMPT: &str = r#"Extract data from this Costa Rican invoice PDF.

Column "Código / Cód. CABYS" stacks SKU (e.g. 'GCP') and CABYS ('2413...'). Separate them.

Return JSON:
{
    "header": {
        "doConsecutive": "string",
        "doDate": "YYYY-MM-DD",
        "doIssuerID": "string",
        "doIssuerName": "string",
        "doType": "FE or NC",
        "doReceptorID": "string",
        "doIssuerAddress": "string",
        "doReceptorAddress": "string"
    },
    "lines": [
        {
            "sku_candidate": "string",
            "cabys_candidate": "string",
            "description": "string",
            "quantity": 0.0,
            "unit_price": 0.0,
            "discount_amount": 0.0,
            "tax_amount": 0.0
        }
    ]
}"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    #[serde(rename_all = "camelCase")]
    InlineData { mime_type: String, data: String },
    Text(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    temperature: f64,
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    /// 0 = 不做推理, 直接输出
    thinking_budget: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
    #[serde(default)]
    total_token_count: i64,
}

/// Gemini 发票提取客户端
pub struct GeminiExtractor {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn try_extract(&self, content: &[u8]) -> Result<ExtractedPayload, String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        mime_type: "application/pdf".to_string(),
                        data: BASE64.encode(content),
                    },
                    Part::Text(EXTRACTION_PROMPT.to_string()),
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.1,
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API error {}: {}", status, body));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| format!("response body unreadable: {}", e))?;

        let text = generated
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or("empty candidate list")?;

        let json_str = extract_json_object(strip_fences(text))?;
        let mut payload: ExtractedPayload = serde_json::from_str(json_str)
            .map_err(|e| format!("payload parse failed: {}", e))?;

        if let Some(usage) = generated.usage_metadata {
            debug!(
                prompt = usage.prompt_token_count,
                candidates = usage.candidates_token_count,
                total = usage.total_token_count,
                "Gemini token usage"
            );
            payload.usage = Some(TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                candidates_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            });
        }

        Ok(payload)
    }
}

#[async_trait]
impl InvoiceExtractor for GeminiExtractor {
    async fn extract(&self, content: &[u8]) -> Option<ExtractedPayload> {
        match self.try_extract(content).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("Gemini extraction failed: {}", e);
                None
            }
        }
    }
}

/// 去掉模型违抗指令加上的 markdown 围栏
fn strip_fences(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// 提取最外层 JSON 对象 (部分模型会在前后夹杂散文)
fn extract_json_object(s: &str) -> Result<&str, String> {
    let start = s.find('{').ok_or("no '{' in model output")?;
    let end = s.rfind('}').ok_or("no '}' in model output")?;
    if end <= start {
        return Err("malformed JSON in model output".to_string());
    }
    Ok(&s[start..=end])
}
