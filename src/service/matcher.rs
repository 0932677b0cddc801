use crate::db::queries;
use crate::models::{CatalogItem, Project};
use indexmap::IndexMap;
use sqlx::PgPool;
use std::collections::HashMap;

/// 未解析哨兵: 显式占位, 永不为 null, 下游按字符串相等分支
pub const UNKNOWN_SUPPLY: &str = "UNKNOWN";

/// 行匹配接受阈值 (0-100)
const LINE_FUZZY_THRESHOLD: u32 = 80;
/// 项目匹配接受阈值, 地址文本噪声大, 故意低于行阈值
const PROJECT_FUZZY_THRESHOLD: u32 = 75;

/// 行匹配方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchMethod {
    ExactSku,
    Fuzzy(u32),
    RawSku,
}

impl MatchMethod {
    pub fn label(&self) -> String {
        match self {
            MatchMethod::ExactSku => "Exact SKU".to_string(),
            MatchMethod::Fuzzy(score) => format!("Fuzzy {}%", score),
            MatchMethod::RawSku => "Raw SKU".to_string(),
        }
    }
}

/// 产品目录索引 (每次请求按租户重建, 反映最新目录状态)
pub struct CatalogIndex {
    /// 规范化 SKU -> ItemID, O(1) 精确查找, 冲突后写覆盖
    sku_index: HashMap<String, String>,
    /// 标题 -> ItemID, 模糊回退候选, 保加载顺序
    fuzzy_choices: IndexMap<String, String>,
}

impl CatalogIndex {
    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        let mut sku_index = HashMap::new();
        let mut fuzzy_choices = IndexMap::new();

        for item in items {
            if let Some(code) = &item.it_code {
                if !code.trim().is_empty() {
                    sku_index.insert(code.trim().to_uppercase(), item.item_id.clone());
                }
            }
            if let Some(title) = item.it_title {
                if !title.is_empty() {
                    fuzzy_choices.insert(title, item.item_id);
                }
            }
        }

        Self { sku_index, fuzzy_choices }
    }

    pub async fn load(pool: &PgPool, tenant: &str) -> Result<Self, sqlx::Error> {
        let items = queries::list_catalog_items(pool, tenant).await?;
        Ok(Self::from_items(items))
    }

    /// 两级解析一条明细行:
    ///
    /// 1. SKU 精确查找 (权威且廉价, 永远先试, 与描述质量无关)
    /// 2. 描述对全部标题做词序无关相似度, 最高分 >= 80 才接受
    /// 3. 否则返回原始 SKU 或 "UNKNOWN" 哨兵
    ///
    /// 第三条 CABYS 匹配轴曾被评估后删除: 增加延迟而精度无收益。
    pub fn match_line(
        &self,
        sku_candidate: Option<&str>,
        description: &str,
    ) -> (String, MatchMethod) {
        if let Some(sku) = sku_candidate {
            if !sku.trim().is_empty() {
                let clean_sku = sku.trim().to_uppercase();
                if let Some(item_id) = self.sku_index.get(&clean_sku) {
                    return (item_id.clone(), MatchMethod::ExactSku);
                }
            }
        }

        if !self.fuzzy_choices.is_empty() && !description.trim().is_empty() {
            let mut best: Option<(&String, u32)> = None;
            for (title, item_id) in &self.fuzzy_choices {
                let score = token_sort_ratio(description, title);
                if best.map_or(true, |(_, b)| score > b) {
                    best = Some((item_id, score));
                }
            }
            if let Some((item_id, score)) = best {
                if score >= LINE_FUZZY_THRESHOLD {
                    return (item_id.clone(), MatchMethod::Fuzzy(score));
                }
            }
        }

        let raw = sku_candidate
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SUPPLY);
        (raw.to_string(), MatchMethod::RawSku)
    }
}

/// 项目索引, 键为 "{title} {address}" 拼接
pub struct ProjectIndex {
    choices: IndexMap<String, String>,
}

impl ProjectIndex {
    pub fn from_projects(projects: Vec<Project>) -> Self {
        let mut choices = IndexMap::new();
        for project in projects {
            let key = format!(
                "{} {}",
                project.pj_title.as_deref().unwrap_or(""),
                project.pj_address.as_deref().unwrap_or("")
            );
            let key = key.trim().to_string();
            if !key.is_empty() {
                choices.insert(key, project.project_id);
            }
        }
        Self { choices }
    }

    pub async fn load(pool: &PgPool, tenant: &str) -> Result<Self, sqlx::Error> {
        let projects = queries::list_projects(pool, tenant).await?;
        Ok(Self::from_projects(projects))
    }

    /// 地址文本解析项目 id
    ///
    /// 空输入直接 None, 不做打分。地址常是候选键的子串,
    /// 所以用子串容忍相似度而非行匹配的词序算法。
    pub fn match_project(&self, address_text: &str) -> Option<String> {
        if address_text.trim().is_empty() || self.choices.is_empty() {
            return None;
        }

        let mut best: Option<(&String, u32)> = None;
        for (key, project_id) in &self.choices {
            let score = partial_ratio(address_text, key);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((project_id, score));
            }
        }

        match best {
            Some((project_id, score)) if score >= PROJECT_FUZZY_THRESHOLD => {
                Some(project_id.clone())
            }
            _ => None,
        }
    }
}

/// 词序无关相似度 (0-100): 两侧小写分词排序后拼接, 再取规范化编辑距离
pub fn token_sort_ratio(a: &str, b: &str) -> u32 {
    let ka = token_sort_key(a);
    let kb = token_sort_key(b);
    (strsim::normalized_levenshtein(&ka, &kb) * 100.0).round() as u32
}

fn token_sort_key(s: &str) -> String {
    let mut tokens: Vec<String> = s
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();
    tokens.sort();
    tokens.join(" ")
}

/// 子串容忍相似度 (0-100): 短串在长串上滑窗, 取最优窗口的规范化编辑距离
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    let ca: Vec<char> = a.to_lowercase().chars().collect();
    let cb: Vec<char> = b.to_lowercase().chars().collect();
    let (short, long) = if ca.len() <= cb.len() { (ca, cb) } else { (cb, ca) };

    if short.is_empty() {
        return 0;
    }

    let needle: String = short.iter().collect();
    let mut best = 0.0_f64;
    for start in 0..=(long.len() - short.len()) {
        let window: String = long[start..start + short.len()].iter().collect();
        let score = strsim::normalized_levenshtein(&needle, &window);
        if score > best {
            best = score;
        }
        if best >= 1.0 {
            break;
        }
    }

    (best * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, code: Option<&str>, title: Option<&str>) -> CatalogItem {
        CatalogItem {
            item_id: id.to_string(),
            it_code: code.map(String::from),
            it_title: title.map(String::from),
        }
    }

    fn project(id: &str, title: &str, address: &str) -> Project {
        Project {
            project_id: id.to_string(),
            pj_title: Some(title.to_string()),
            pj_address: Some(address.to_string()),
        }
    }

    #[test]
    fn exact_sku_ignores_case_and_whitespace() {
        let index = CatalogIndex::from_items(vec![item("ITEM001", Some("GCP"), Some("Cemento"))]);
        let (id, method) = index.match_line(Some("  gcp "), "");
        assert_eq!(id, "ITEM001");
        assert_eq!(method, MatchMethod::ExactSku);
    }

    #[test]
    fn exact_sku_takes_priority_over_fuzzy() {
        // 描述会高分命中 B, 但 SKU 权威, 必须先命中 A
        let index = CatalogIndex::from_items(vec![
            item("ITEM-A", Some("GCP"), Some("Generic Cement Product")),
            item("ITEM-B", None, Some("Cemento gris portland saco")),
        ]);
        let (id, method) = index.match_line(Some("gcp"), "Cemento gris portland saco");
        assert_eq!(id, "ITEM-A");
        assert_eq!(method, MatchMethod::ExactSku);
    }

    #[test]
    fn fuzzy_match_is_token_order_insensitive() {
        let index = CatalogIndex::from_items(vec![item(
            "ITEM002",
            None,
            Some("Varilla corrugada 12mm"),
        )]);
        let (id, method) = index.match_line(None, "12mm corrugada varilla");
        assert_eq!(id, "ITEM002");
        assert!(matches!(method, MatchMethod::Fuzzy(score) if score >= 80));
    }

    #[test]
    fn fuzzy_below_threshold_returns_sentinel_not_a_guess() {
        let index = CatalogIndex::from_items(vec![item(
            "ITEM003",
            None,
            Some("Tornillo punta broca 1/2"),
        )]);
        let (id, method) = index.match_line(None, "Pintura acrilica exterior blanca");
        assert_eq!(id, UNKNOWN_SUPPLY);
        assert_eq!(method, MatchMethod::RawSku);
    }

    #[test]
    fn unmatched_sku_survives_as_raw_value() {
        let index = CatalogIndex::from_items(vec![item("ITEM004", Some("ABC"), None)]);
        let (id, method) = index.match_line(Some("ZZZ-99"), "");
        assert_eq!(id, "ZZZ-99");
        assert_eq!(method, MatchMethod::RawSku);
    }

    #[test]
    fn empty_inputs_resolve_to_sentinel() {
        let index = CatalogIndex::from_items(vec![]);
        let (id, method) = index.match_line(None, "");
        assert_eq!(id, UNKNOWN_SUPPLY);
        assert_eq!(method, MatchMethod::RawSku);
    }

    #[test]
    fn sku_collision_resolves_to_last_loaded() {
        let index = CatalogIndex::from_items(vec![
            item("ITEM-OLD", Some("DUP"), None),
            item("ITEM-NEW", Some(" dup "), None),
        ]);
        let (id, _) = index.match_line(Some("DUP"), "");
        assert_eq!(id, "ITEM-NEW");
    }

    #[test]
    fn method_labels() {
        assert_eq!(MatchMethod::ExactSku.label(), "Exact SKU");
        assert_eq!(MatchMethod::Fuzzy(92).label(), "Fuzzy 92%");
        assert_eq!(MatchMethod::RawSku.label(), "Raw SKU");
    }

    #[test]
    fn project_match_tolerates_substring_address() {
        let index = ProjectIndex::from_projects(vec![
            project("PRJ01", "Torre Norte", "Avenida Central 450 San Jose"),
            project("PRJ02", "Bodega Sur", "Ruta 27 Santa Ana"),
        ]);
        let matched = index.match_project("Avenida Central 450 San Jose");
        assert_eq!(matched.as_deref(), Some("PRJ01"));
    }

    #[test]
    fn project_match_empty_input_short_circuits() {
        let index = ProjectIndex::from_projects(vec![project("PRJ01", "Torre Norte", "Centro")]);
        assert!(index.match_project("   ").is_none());
        assert!(ProjectIndex::from_projects(vec![]).match_project("Centro").is_none());
    }

    #[test]
    fn project_match_below_threshold_is_none() {
        let index = ProjectIndex::from_projects(vec![project(
            "PRJ01",
            "Torre Norte",
            "Avenida Central 450",
        )]);
        assert!(index.match_project("Playa Hermosa Guanacaste km 12").is_none());
    }

    #[test]
    fn projects_with_empty_key_are_skipped() {
        let index = ProjectIndex::from_projects(vec![
            Project {
                project_id: "PRJ-EMPTY".to_string(),
                pj_title: None,
                pj_address: Some("  ".to_string()),
            },
            project("PRJ02", "Bodega Sur", "Ruta 27"),
        ]);
        // 空键项目不参与打分, 唯一候选是 PRJ02
        assert_eq!(index.match_project("Bodega Sur Ruta 27").as_deref(), Some("PRJ02"));
    }

    #[test]
    fn token_sort_ratio_identical_sets_score_100() {
        assert_eq!(token_sort_ratio("cemento gris", "gris cemento"), 100);
    }

    #[test]
    fn partial_ratio_finds_embedded_match() {
        assert_eq!(partial_ratio("Ruta 27", "Bodega Sur Ruta 27 Santa Ana"), 100);
        assert_eq!(partial_ratio("", "algo"), 0);
    }
}
