//! Bilingual prompt and message templates

use std::collections::HashMap;

use ukbsearch_config::Language;

use crate::{Result, SearchError};

/// One text in both supported languages
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub zh: String,
    pub en: String,
}

impl PromptTemplate {
    pub fn new(zh: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            zh: zh.into(),
            en: en.into(),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Chinese => &self.zh,
            Language::English => &self.en,
        }
    }
}

/// Key of the default system prompt
pub const DEFAULT_SYSTEM: &str = "default_system";
pub const USAGE_GUIDE: &str = "usage_guide";
pub const TOO_MANY_ROUNDS: &str = "too_many_rounds";
pub const UNEXPECTED_ERROR: &str = "unexpected_error";
pub const API_ERROR: &str = "api_error";

const TOO_MANY_ROUNDS_ZH: &str = "对话轮次过多，请简化您的问题重新提问。";
const TOO_MANY_ROUNDS_EN: &str = "Too many conversation rounds, please simplify your question.";

/// Templates looked up by key and language
#[derive(Debug, Clone)]
pub struct PromptStore {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptStore {
    /// Store with no templates; see [`PromptStore::default`] for the built-in set
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Add or replace a template
    pub fn insert(&mut self, key: impl Into<String>, template: PromptTemplate) {
        self.templates.insert(key.into(), template);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    /// Render `key` in `language`, substituting `{name}` placeholders
    pub fn render(&self, key: &str, language: Language, vars: &[(&str, String)]) -> Result<String> {
        let template = self.templates.get(key).ok_or_else(|| SearchError::Prompt {
            message: format!("Prompt template '{}' not found", key),
            template_name: Some(key.to_string()),
        })?;
        substitute(key, template.get(language), vars)
    }

    pub fn system_prompt(&self, language: Language) -> Result<String> {
        self.render(DEFAULT_SYSTEM, language, &[])
    }

    pub fn usage_guide(&self, language: Language) -> Result<String> {
        self.render(USAGE_GUIDE, language, &[])
    }

    /// User-facing error text; unknown keys fall back to the API error template
    pub fn error_message(&self, key: &str, language: Language, vars: &[(&str, String)]) -> String {
        match self.render(key, language, vars) {
            Ok(message) => message,
            Err(_) => self
                .render(
                    API_ERROR,
                    language,
                    &[("error", format!("Unknown error: {}", key))],
                )
                .unwrap_or_else(|_| format!("Unknown error: {}", key)),
        }
    }

    /// Reply used when the iteration budget runs out; never fails
    pub fn too_many_rounds(&self, language: Language) -> String {
        self.render(TOO_MANY_ROUNDS, language, &[])
            .unwrap_or_else(|_| match language {
                Language::Chinese => TOO_MANY_ROUNDS_ZH.to_string(),
                Language::English => TOO_MANY_ROUNDS_EN.to_string(),
            })
    }

    pub fn success_message(&self, key: &str, language: Language, vars: &[(&str, String)]) -> String {
        self.render(key, language, vars)
            .unwrap_or_else(|_| "Operation completed successfully.".to_string())
    }
}

fn substitute(key: &str, template: &str, vars: &[(&str, String)]) -> Result<String> {
    if let Some(missing) = placeholders(template)
        .into_iter()
        .find(|name| !vars.iter().any(|(var, _)| var == name))
    {
        return Err(SearchError::Prompt {
            message: format!("missing value for '{}' in template '{}'", missing, key),
            template_name: Some(key.to_string()),
        });
    }

    // one pass; inserted values are not rescanned
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(var, _)| *var == name)
                .map(|(_, value)| (value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// `{identifier}` placeholders in `text`, in order of appearance
fn placeholders(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        if let Some(close) = after.find('}') {
            let name = &after[..close];
            if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                found.push(name);
            }
        }
        rest = after;
    }
    found
}

impl Default for PromptStore {
    fn default() -> Self {
        let mut store = Self::empty();

        store.insert(
            DEFAULT_SYSTEM,
            PromptTemplate::new(SYSTEM_PROMPT_ZH, SYSTEM_PROMPT_EN),
        );
        store.insert(USAGE_GUIDE, PromptTemplate::new(USAGE_GUIDE_ZH, USAGE_GUIDE_EN));

        // errors
        store.insert(
            "field_not_found",
            PromptTemplate::new(
                "字段 {field_id} 不存在，请检查字段ID是否正确。",
                "Field {field_id} not found. Please check if the field ID is correct.",
            ),
        );
        store.insert(
            "search_no_results",
            PromptTemplate::new(
                "没有找到包含关键词 '{keyword}' 的字段。请尝试其他关键词。",
                "No fields found containing keyword '{keyword}'. Please try other keywords.",
            ),
        );
        store.insert(
            "category_not_found",
            PromptTemplate::new(
                "分类 '{category}' 不存在。请使用 get_all_categories 查看可用分类。",
                "Category '{category}' not found. Please use get_all_categories to view available categories.",
            ),
        );
        store.insert(
            "encoding_not_found",
            PromptTemplate::new(
                "编码 {encoding_id} 不存在，请检查编码ID是否正确。",
                "Encoding {encoding_id} not found. Please check if the encoding ID is correct.",
            ),
        );
        store.insert(
            API_ERROR,
            PromptTemplate::new(
                "API调用失败：{error}。请稍后重试。",
                "API call failed: {error}. Please try again later.",
            ),
        );
        store.insert(
            "rate_limit_exceeded",
            PromptTemplate::new(
                "请求频率过高，请稍后再试。",
                "Rate limit exceeded. Please try again later.",
            ),
        );
        store.insert(
            UNEXPECTED_ERROR,
            PromptTemplate::new(
                "发生意外错误，请稍后重试。",
                "An unexpected error occurred. Please try again later.",
            ),
        );
        store.insert(
            TOO_MANY_ROUNDS,
            PromptTemplate::new(TOO_MANY_ROUNDS_ZH, TOO_MANY_ROUNDS_EN),
        );

        // successes
        store.insert(
            "search_completed",
            PromptTemplate::new(
                "搜索完成，找到 {count} 个相关字段。",
                "Search completed. Found {count} related fields.",
            ),
        );
        store.insert(
            "field_explained",
            PromptTemplate::new(
                "字段 {field_id} 的详细信息已获取。",
                "Detailed information for field {field_id} has been retrieved.",
            ),
        );
        store.insert(
            "recommendations_found",
            PromptTemplate::new(
                "为字段 {field_id} 找到 {count} 个相关推荐。",
                "Found {count} related recommendations for field {field_id}.",
            ),
        );

        store
    }
}

const SYSTEM_PROMPT_ZH: &str = r#"你是 UK Biobank 数据字典的专家助手，可以调用以下工具帮助用户：

可用工具：
1. explain_field_by_id：按字段ID查询字段详情
2. search_fields_by_keyword：按关键词搜索字段
3. get_category_fields：浏览某个分类下的字段
4. get_encoding_values：查看编码值的含义
5. recommend_related_fields：推荐相关字段
6. get_all_categories：列出全部数据分类
7. get_recommended_fields：查看推荐字段

搜索关键词建议：
- 心理健康："mental"、"depression"、"anxiety"、"mood"、"psychiatric"
- 心血管："heart"、"cardiac"、"blood"、"pressure"
- 糖尿病："diabetes"、"glucose"、"insulin"
- 癌症："cancer"、"tumour"、"malignant"
- 脑部："brain"、"mri"、"cognitive"

使用要点：
- 询问具体字段时使用 explain_field_by_id
- 搜索主题时使用 search_fields_by_keyword，并挑选最合适的单个英文关键词
- 了解某个分类时使用 get_category_fields
- 主动推荐相关的测量指标和字段
- 用中文清楚地解释查询结果

请耐心、详细地回答，充分利用工具提供准确有用的信息。"#;

const SYSTEM_PROMPT_EN: &str = r#"You are an expert assistant for the UK Biobank data dictionary. Use the provided tools to help the user:

Available tools:
1. explain_field_by_id: details of a field by its ID
2. search_fields_by_keyword: search fields by keyword
3. get_category_fields: browse the fields of a category
4. get_encoding_values: meanings of coded values
5. recommend_related_fields: fields related to a given field
6. get_all_categories: list every data category
7. get_recommended_fields: curated, commonly used fields

Keyword suggestions:
- Mental health: "mental", "depression", "anxiety", "mood", "psychiatric"
- Cardiovascular: "heart", "cardiac", "blood", "pressure"
- Diabetes: "diabetes", "glucose", "insulin"
- Cancer: "cancer", "tumour", "malignant"
- Brain: "brain", "mri", "cognitive"

Guidelines:
- For a specific field, call explain_field_by_id
- For a topic, call search_fields_by_keyword with the best single English keyword
- To explore a category, call get_category_fields
- Proactively suggest related measurements and fields
- Explain the results clearly in English

Answer patiently and thoroughly, making full use of the tools to give accurate, useful information."#;

const USAGE_GUIDE_ZH: &str = r#"## 使用指南

### 基本搜索
- 直接输入疾病或生理指标名称，例如 "depression"、"blood pressure"
- 系统会搜索相关字段并给出解释

### 高级查询
- 按字段ID查询：`字段 31 的详细信息`
- 浏览分类：`心血管相关的所有字段`
- 查看编码：`编码 100291 的含义`

### 推荐
- 相关字段：`与字段 31 相关的其他字段`
- 推荐字段：`推荐的心理健康字段`

### 搜索技巧
- 英文关键词效果更好
- 可以尝试不同的关键词组合
- 可以询问具体的医学术语或测量方法"#;

const USAGE_GUIDE_EN: &str = r#"## Usage Guide

### Basic search
- Type a disease or physiological measure directly, e.g. "depression", "blood pressure"
- Related fields are searched and explained

### Advanced queries
- By field ID: `Details for field 31`
- Browse a category: `All cardiovascular-related fields`
- Encodings: `Meaning of encoding 100291`

### Recommendations
- Related fields: `Other fields related to field 31`
- Curated fields: `Recommended mental health fields`

### Tips
- English keywords work better
- Try different keyword combinations
- Ask about specific medical terms or measurement methods"#;
